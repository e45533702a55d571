use glam::{UVec2, Vec3, Vec4, Vec4Swizzles};

use crate::{Octahedral, Texels};

/// Resolution of the octahedral sky map.
pub const DDGI_SKY_RESOLUTION: u32 = 64;

/// Sky radiance, stored as an octahedral map so that rays escaping the scene
/// can look it up with a single bilinear fetch.
#[derive(Clone, Copy)]
pub struct SkyView<'a> {
    texels: Texels<'a, Vec4>,
}

impl<'a> SkyView<'a> {
    pub fn new(buffer: &'a [Vec4]) -> Self {
        Self {
            texels: Texels::new(
                buffer,
                UVec2::splat(DDGI_SKY_RESOLUTION),
            ),
        }
    }

    pub fn sample(&self, dir: Vec3) -> Vec3 {
        let uv = Octahedral::encode(dir) * 0.5 + 0.5;

        self.texels
            .sample_bilinear(uv * DDGI_SKY_RESOLUTION as f32)
            .xyz()
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use glam::vec3;

    use super::*;
    use crate::texel_pos;

    #[test]
    fn sample() {
        let size = UVec2::splat(DDGI_SKY_RESOLUTION);

        let buffer: Vec<_> = (0..DDGI_SKY_RESOLUTION * DDGI_SKY_RESOLUTION)
            .map(|idx| {
                let dir = Octahedral::texel_direction(
                    texel_pos(size, idx),
                    DDGI_SKY_RESOLUTION,
                );

                // Brighter towards +Y
                Vec3::splat(dir.y.max(0.0)).extend(1.0)
            })
            .collect();

        let sky = SkyView::new(&buffer);

        assert_relative_eq!(
            1.0,
            sky.sample(vec3(0.0, 1.0, 0.0)).x,
            epsilon = 0.05
        );

        assert_relative_eq!(
            0.0,
            sky.sample(vec3(0.0, -1.0, 0.0)).x,
            epsilon = 0.05
        );

        assert_relative_eq!(
            0.707,
            sky.sample(vec3(1.0, 1.0, 0.0).normalize()).x,
            epsilon = 0.05
        );
    }
}
