use glam::{vec2, vec3, UVec2, Vec2, Vec2Swizzles, Vec3, Vec3Swizzles};
#[cfg(target_arch = "spirv")]
use spirv_std::num_traits::Float;

use crate::{U32Ext, Vec2Ext};

/// Octahedral mapping between unit directions and the `-1.0 ..= 1.0` square.
///
/// Probes store their per-direction data as octahedral tiles, so that a
/// square texture covers the entire sphere with reasonably uniform texel
/// density.
pub struct Octahedral;

impl Octahedral {
    pub fn encode(dir: Vec3) -> Vec2 {
        let uv = dir.xy() / (dir.x.abs() + dir.y.abs() + dir.z.abs());

        if dir.z < 0.0 {
            (1.0 - uv.yx().abs()) * uv.sign_not_zero()
        } else {
            uv
        }
    }

    /// See: [`Self::encode()`].
    pub fn decode(coords: Vec2) -> Vec3 {
        let mut dir =
            vec3(coords.x, coords.y, 1.0 - coords.x.abs() - coords.y.abs());

        if dir.z < 0.0 {
            let xy = (1.0 - dir.yx().abs()) * dir.xy().sign_not_zero();

            dir.x = xy.x;
            dir.y = xy.y;
        }

        dir.normalize()
    }

    /// Returns octahedral coordinates of the center of given texel of a tile
    /// with given resolution (border excluded).
    pub fn texel_coords(texel: UVec2, resolution: u32) -> Vec2 {
        (texel.as_vec2() + 0.5) / (resolution as f32) * 2.0 - 1.0
    }

    /// Returns direction represented by the center of given texel.
    pub fn texel_direction(texel: UVec2, resolution: u32) -> Vec3 {
        Self::decode(Self::texel_coords(texel, resolution))
    }

    /// Compresses given direction into a single word (two unorm16s).
    pub fn pack(dir: Vec3) -> u32 {
        let uv = (Self::encode(dir) * 0.5 + 0.5).clamp(Vec2::ZERO, Vec2::ONE);
        let uv = (uv * 65535.0).round();

        u32::from_u16_pair(uv.x as u32, uv.y as u32)
    }

    /// See: [`Self::pack()`].
    pub fn unpack(bits: u32) -> Vec3 {
        let [x, y] = bits.to_u16_pair();
        let uv = vec2(x as f32, y as f32) / 65535.0;

        Self::decode(uv * 2.0 - 1.0)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use glam::uvec2;

    use super::*;

    const EPSILON: f32 = 0.0005;

    fn dirs() -> [Vec3; 8] {
        [
            Vec3::X,
            -Vec3::Y,
            Vec3::Z,
            -Vec3::Z,
            vec3(0.26, 0.53, 0.80).normalize(),
            vec3(-0.3, 0.1, -0.9).normalize(),
            vec3(0.7, -0.7, -0.1).normalize(),
            vec3(-0.01, -0.02, -1.0).normalize(),
        ]
    }

    #[test]
    fn encode_decode() {
        for dir in dirs() {
            let actual = Octahedral::decode(Octahedral::encode(dir));

            assert_relative_eq!(dir.x, actual.x, epsilon = EPSILON);
            assert_relative_eq!(dir.y, actual.y, epsilon = EPSILON);
            assert_relative_eq!(dir.z, actual.z, epsilon = EPSILON);
        }
    }

    #[test]
    fn pack_unpack() {
        for dir in dirs() {
            let actual = Octahedral::unpack(Octahedral::pack(dir));

            assert_relative_eq!(dir.x, actual.x, epsilon = 0.001);
            assert_relative_eq!(dir.y, actual.y, epsilon = 0.001);
            assert_relative_eq!(dir.z, actual.z, epsilon = 0.001);
        }
    }

    #[test]
    fn texel_coords() {
        let actual = Octahedral::texel_coords(uvec2(0, 0), 6);

        assert_relative_eq!(-5.0 / 6.0, actual.x, epsilon = EPSILON);
        assert_relative_eq!(-5.0 / 6.0, actual.y, epsilon = EPSILON);

        let actual = Octahedral::texel_coords(uvec2(5, 3), 6);

        assert_relative_eq!(5.0 / 6.0, actual.x, epsilon = EPSILON);
        assert_relative_eq!(1.0 / 6.0, actual.y, epsilon = EPSILON);

        // Central texels face towards +Z, corner texels towards -Z
        assert!(Octahedral::texel_direction(uvec2(2, 2), 6).z > 0.5);
        assert!(Octahedral::texel_direction(uvec2(0, 0), 6).z < -0.5);
    }
}
