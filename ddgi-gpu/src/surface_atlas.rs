mod culling;
mod object;
mod sampling;

use bytemuck::{Pod, Zeroable};
use glam::{UVec3, UVec4, Vec3, Vec4, Vec4Swizzles};
#[cfg(target_arch = "spirv")]
use spirv_std::num_traits::Float;

pub use self::culling::*;
pub use self::object::*;
pub use self::sampling::*;

/// Tiles whose squared local normal component is below this don't get
/// sampled.
pub const SURFACE_ATLAS_TILE_NORMAL_THRESHOLD: f32 = 0.1;

/// Width (in chunks, per axis) of the culling workgroup.
pub const SURFACE_ATLAS_CULL_GROUP_SIZE: u32 = 4;

/// Number of objects the culling workgroup can cache in its shared memory;
/// objects above this limit are dropped for this frame.
pub const SURFACE_ATLAS_SHARED_CULL_SIZE: usize = 255;

#[repr(C)]
#[derive(Clone, Copy, Default, Pod, Zeroable)]
#[cfg_attr(not(target_arch = "spirv"), derive(Debug))]
pub struct SurfaceAtlasData {
    /// View position (xyz) and size of a single culling chunk (w)
    pub view_pos: Vec4,

    /// Atlas resolution (x), chunk resolution (y), number of objects (z) and
    /// capacity of the culled objects buffer (w)
    pub params: UVec4,

    /// Debug mode (x) and whether all tiles should be sampled regardless of
    /// the normal (y)
    pub flags: UVec4,
}

impl SurfaceAtlasData {
    pub fn view_pos(&self) -> Vec3 {
        self.view_pos.xyz()
    }

    pub fn chunk_size(&self) -> f32 {
        self.view_pos.w
    }

    pub fn resolution(&self) -> u32 {
        self.params.x
    }

    pub fn chunk_resolution(&self) -> u32 {
        self.params.y
    }

    pub fn objects_count(&self) -> u32 {
        self.params.z
    }

    pub fn culled_objects_capacity(&self) -> u32 {
        self.params.w
    }

    pub fn is_debug(&self) -> bool {
        self.flags.x != 0
    }

    pub fn sample_all_tiles(&self) -> bool {
        self.flags.y != 0
    }

    pub fn chunks_count(&self) -> u32 {
        let res = self.chunk_resolution();

        res * res * res
    }

    /// Returns coordinates of the chunk containing given point; points
    /// outside the culling volume get clamped to its edges.
    pub fn chunk_coords(&self, pos: Vec3) -> UVec3 {
        let res = self.chunk_resolution();

        let coords = (pos - self.view_pos()) / self.chunk_size()
            + (res as f32) * 0.5;

        coords
            .floor()
            .clamp(Vec3::ZERO, Vec3::splat((res - 1) as f32))
            .as_uvec3()
    }

    pub fn chunk_address(&self, coords: UVec3) -> u32 {
        let res = self.chunk_resolution();

        coords.z * res * res + coords.y * res + coords.x
    }

    /// Returns world-space bounds (min, max) of given range of chunks.
    pub fn chunks_bounds(&self, min: UVec3, size: u32) -> (Vec3, Vec3) {
        let offset = self.view_pos()
            - Vec3::splat((self.chunk_resolution() as f32) * 0.5 * self.chunk_size());

        let min = offset + min.as_vec3() * self.chunk_size();
        let max = min + Vec3::splat((size as f32) * self.chunk_size());

        (min, max)
    }
}

/// Returns whether given sphere touches given box.
pub fn sphere_intersects_box(
    center: Vec3,
    radius: f32,
    min: Vec3,
    max: Vec3,
) -> bool {
    let closest = center.clamp(min, max);

    closest.distance_squared(center) <= radius * radius
}

#[cfg(test)]
mod tests {
    use glam::{uvec3, uvec4, vec3, vec4};

    use super::*;

    fn data() -> SurfaceAtlasData {
        SurfaceAtlasData {
            view_pos: vec4(100.0, 0.0, 0.0, 50.0),
            params: uvec4(1024, 8, 0, 0),
            flags: UVec4::ZERO,
        }
    }

    #[test]
    fn chunk_coords() {
        let data = data();

        assert_eq!(uvec3(4, 4, 4), data.chunk_coords(vec3(100.0, 0.0, 0.0)));
        assert_eq!(uvec3(3, 4, 4), data.chunk_coords(vec3(99.0, 0.0, 0.0)));
        assert_eq!(uvec3(7, 0, 4), data.chunk_coords(vec3(1e5, -1e5, 1.0)));
        assert_eq!(uvec3(0, 0, 0), data.chunk_coords(vec3(-100.0, -200.0, -200.0)));

        assert_eq!(4 * 64 + 2 * 8 + 1, data.chunk_address(uvec3(1, 2, 4)));
        assert_eq!(512, data.chunks_count());
    }

    #[test]
    fn chunks_bounds() {
        let data = data();
        let (min, max) = data.chunks_bounds(uvec3(4, 4, 4), 1);

        assert_eq!(vec3(100.0, 0.0, 0.0), min);
        assert_eq!(vec3(150.0, 50.0, 50.0), max);

        let (min, max) = data.chunks_bounds(UVec3::ZERO, 8);

        assert_eq!(vec3(-100.0, -200.0, -200.0), min);
        assert_eq!(vec3(300.0, 200.0, 200.0), max);
    }

    #[test]
    fn sphere_intersects_box() {
        let min = Vec3::ZERO;
        let max = Vec3::ONE;

        assert!(super::sphere_intersects_box(vec3(0.5, 0.5, 0.5), 0.1, min, max));
        assert!(super::sphere_intersects_box(vec3(1.5, 0.5, 0.5), 0.5, min, max));
        assert!(!super::sphere_intersects_box(vec3(1.5, 1.5, 0.5), 0.5, min, max));
    }
}
