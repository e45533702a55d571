use bytemuck::{Pod, Zeroable};
use glam::{
    uvec2, IVec3, IVec4, Quat, UVec2, UVec3, UVec4, Vec2, Vec3, Vec4,
    Vec4Swizzles,
};

use crate::ProbeData;

/// Maximum number of probe cascades.
pub const DDGI_MAX_CASCADES: usize = 4;

/// Resolution of a single probe's irradiance tile, border excluded.
pub const DDGI_PROBE_RESOLUTION_IRRADIANCE: u32 = 6;

/// Resolution of a single probe's distance tile, border excluded.
pub const DDGI_PROBE_RESOLUTION_DISTANCE: u32 = 14;

/// Maximum number of probes traced and updated by a single dispatch; active
/// probes above this limit are processed in subsequent batches.
pub const DDGI_TRACE_RAYS_PROBES_COUNT_LIMIT: u32 = 4096;

/// Maximum number of rays traced per probe.
pub const DDGI_TRACE_RAYS_LIMIT: u32 = 256;

/// Workgroup width of the ray tracing pass.
pub const DDGI_TRACE_RAYS_GROUP_SIZE_X: u32 = 32;

/// Workgroup width of the probe classification pass.
pub const DDGI_PROBE_CLASSIFY_GROUP_SIZE: u32 = 32;

/// Distance reported for rays that escape into the sky.
pub const DDGI_SKY_DISTANCE: f32 = 1e27;

/// Per-frame constants shared by all stages of the probe pipeline.
#[repr(C)]
#[derive(Clone, Copy, Default, Pod, Zeroable)]
#[cfg_attr(not(target_arch = "spirv"), derive(Debug))]
pub struct DdgiData {
    /// Per cascade: grid origin (xyz) and probe spacing (w)
    pub origin_and_spacing: [Vec4; DDGI_MAX_CASCADES],

    /// Per cascade: toroidal scroll offset, in probes (xyz)
    pub scroll_offsets: [IVec4; DDGI_MAX_CASCADES],

    /// Probe counts per axis (xyz) and number of cascades (w)
    pub probes_counts: UVec4,

    /// Rotation applied to all probe rays this frame (quaternion)
    pub rays_rotation: Vec4,

    /// View position (xyz) and ray max distance (w)
    pub view_pos: Vec4,

    pub rays_count: u32,
    pub history_weight: f32,
    pub irradiance_gamma: f32,
    pub indirect_lighting_intensity: f32,
}

impl DdgiData {
    pub fn counts(&self) -> UVec3 {
        self.probes_counts.xyz()
    }

    pub fn cascades_count(&self) -> u32 {
        self.probes_counts.w
    }

    pub fn probes_per_cascade(&self) -> u32 {
        self.probes_counts.x * self.probes_counts.y * self.probes_counts.z
    }

    pub fn origin(&self, cascade: u32) -> Vec3 {
        self.origin_and_spacing[cascade as usize].xyz()
    }

    pub fn spacing(&self, cascade: u32) -> f32 {
        self.origin_and_spacing[cascade as usize].w
    }

    pub fn scroll_offset(&self, cascade: u32) -> IVec3 {
        self.scroll_offsets[cascade as usize].xyz()
    }

    pub fn view_pos(&self) -> Vec3 {
        self.view_pos.xyz()
    }

    pub fn ray_max_distance(&self) -> f32 {
        self.view_pos.w
    }

    pub fn rays_rotation(&self) -> Quat {
        Quat::from_vec4(self.rays_rotation)
    }

    /// Half-size of the probe grid, measured between the outermost probes.
    pub fn probes_extent(&self, cascade: u32) -> Vec3 {
        (self.counts() - 1).as_vec3() * self.spacing(cascade) * 0.5
    }

    /// Center of the (scrolled) probe grid.
    pub fn probes_center(&self, cascade: u32) -> Vec3 {
        self.origin(cascade)
            + self.scroll_offset(cascade).as_vec3() * self.spacing(cascade)
    }

    /// Converts logical probe coordinates into a linear index.
    pub fn probe_index(&self, coords: UVec3) -> u32 {
        let probes_per_plane = self.probes_counts.x * self.probes_counts.z;

        coords.y * probes_per_plane + coords.z * self.probes_counts.x + coords.x
    }

    /// See: [`Self::probe_index()`].
    pub fn probe_coords(&self, index: u32) -> UVec3 {
        let probes_per_plane = self.probes_counts.x * self.probes_counts.z;

        UVec3::new(
            index % self.probes_counts.x,
            index / probes_per_plane,
            (index / self.probes_counts.x) % self.probes_counts.z,
        )
    }

    /// Converts logical probe coordinates into index of the storage slot the
    /// probe occupies in given cascade.
    ///
    /// As the grid scrolls, probes keep their storage slots (and so their
    /// history) - only the probes that wrap around to the other side of the
    /// grid change their world-space meaning.
    pub fn scrolling_probe_index(&self, cascade: u32, coords: UVec3) -> u32 {
        let counts = self.counts().as_ivec3();
        let coords = coords.as_ivec3() + self.scroll_offset(cascade) + counts;

        // Equivalent to `coords % counts` when the scroll offset stays within
        // `-counts ..= counts`, but tolerant to larger offsets as well
        let coords = ((coords % counts) + counts) % counts;

        self.probe_index(coords.as_uvec3())
    }

    /// Returns un-relocated world position of the probe at given logical
    /// coordinates.
    pub fn probe_world_position(&self, cascade: u32, coords: UVec3) -> Vec3 {
        let spacing = self.spacing(cascade);

        self.probes_center(cascade) + coords.as_vec3() * spacing
            - self.probes_extent(cascade)
    }

    /// Returns index of the probe's slot in the probe data buffer.
    pub fn probe_slot(&self, cascade: u32, index: u32) -> usize {
        (cascade * self.probes_per_cascade() + index) as usize
    }

    /// Returns index of the storage slot occupied by the probe with given
    /// logical index.
    pub fn probe_physical_index(&self, cascade: u32, index: u32) -> u32 {
        self.scrolling_probe_index(cascade, self.probe_coords(index))
    }

    /// Reads data of the probe with given logical index.
    pub fn read_probe(
        &self,
        probes: &[UVec2],
        cascade: u32,
        index: u32,
    ) -> ProbeData {
        let index = self.probe_physical_index(cascade, index);

        ProbeData::read(probes, self.probe_slot(cascade, index))
    }

    /// Returns world position of the probe with given logical index,
    /// relocation included.
    pub fn probe_relocated_position(
        &self,
        cascade: u32,
        index: u32,
        probe: ProbeData,
    ) -> Vec3 {
        self.probe_world_position(cascade, self.probe_coords(index))
            + probe.world_offset(self.spacing(cascade))
    }

    /// Returns size (in texels) of the atlas storing all probes' tiles of
    /// given resolution.
    pub fn atlas_size(&self, resolution: u32) -> UVec2 {
        let tile = resolution + 2;

        uvec2(
            self.probes_counts.x * tile,
            self.probes_counts.y * self.probes_counts.z * tile
                * self.cascades_count(),
        )
    }

    /// Returns position of the top-left texel (border included) of the
    /// probe's tile inside the atlas.
    pub fn probe_tile_origin(
        &self,
        cascade: u32,
        index: u32,
        resolution: u32,
    ) -> UVec2 {
        let tile = resolution + 2;
        let rows_per_cascade = self.probes_counts.y * self.probes_counts.z;

        uvec2(
            index % self.probes_counts.x,
            index / self.probes_counts.x + cascade * rows_per_cascade,
        ) * tile
    }

    /// Returns position, in texel units, that corresponds to given octahedral
    /// coordinates inside the probe's tile.
    ///
    /// Texel centers lie at `.5` - the result can be fed straight into a
    /// bilinear filter.
    pub fn probe_atlas_pos(
        &self,
        cascade: u32,
        index: u32,
        octahedral_coords: Vec2,
        resolution: u32,
    ) -> Vec2 {
        let origin = self.probe_tile_origin(cascade, index, resolution);

        origin.as_vec2()
            + 1.0
            + (octahedral_coords * 0.5 + 0.5) * (resolution as f32)
    }
}

#[cfg(test)]
mod tests {
    use glam::{ivec4, uvec3, uvec4, vec2, vec3, vec4};

    use super::*;

    fn data() -> DdgiData {
        let mut data = DdgiData {
            probes_counts: uvec4(8, 4, 8, 2),
            ..Default::default()
        };

        data.origin_and_spacing[0] = vec4(0.0, 0.0, 0.0, 200.0);
        data.origin_and_spacing[1] = vec4(0.0, 0.0, 0.0, 400.0);
        data
    }

    #[test]
    fn probe_index_and_coords() {
        let data = data();

        assert_eq!(0, data.probe_index(UVec3::ZERO));
        assert_eq!(1, data.probe_index(uvec3(1, 0, 0)));
        assert_eq!(8, data.probe_index(uvec3(0, 0, 1)));
        assert_eq!(64, data.probe_index(uvec3(0, 1, 0)));
        assert_eq!(255, data.probe_index(uvec3(7, 3, 7)));

        for idx in 0..data.probes_per_cascade() {
            assert_eq!(idx, data.probe_index(data.probe_coords(idx)));
        }
    }

    #[test]
    fn scrolling_probe_index() {
        let mut data = data();
        let counts = data.counts().as_ivec3();

        for scroll in [
            ivec4(0, 0, 0, 0),
            ivec4(3, -1, 7, 0),
            ivec4(-7, 3, -8, 0),
            ivec4(8, -4, 1, 0),
        ] {
            data.scroll_offsets[1] = scroll;

            for idx in 0..data.probes_per_cascade() {
                let coords = data.probe_coords(idx);
                let scrolled =
                    data.probe_coords(data.scrolling_probe_index(1, coords));

                // Undoing the scroll yields the logical coordinates back
                let unscrolled = scrolled.as_ivec3() - scroll.truncate();
                let unscrolled = ((unscrolled % counts + counts) % counts).as_uvec3();

                assert_eq!(coords, unscrolled);
            }

            // Cascade 0 is not scrolled
            assert_eq!(
                data.probe_index(uvec3(1, 2, 3)),
                data.scrolling_probe_index(0, uvec3(1, 2, 3)),
            );
        }
    }

    #[test]
    fn probe_world_position() {
        let mut data = data();

        assert_eq!(
            vec3(-700.0, -300.0, -700.0),
            data.probe_world_position(0, UVec3::ZERO),
        );

        assert_eq!(
            vec3(700.0, 300.0, 700.0),
            data.probe_world_position(0, uvec3(7, 3, 7)),
        );

        data.scroll_offsets[0] = ivec4(1, 0, -2, 0);

        assert_eq!(
            vec3(-500.0, -300.0, -1100.0),
            data.probe_world_position(0, UVec3::ZERO),
        );
    }

    #[test]
    fn probe_tiles() {
        let data = data();

        assert_eq!(uvec2(64, 512), data.atlas_size(6));
        assert_eq!(uvec2(0, 0), data.probe_tile_origin(0, 0, 6));
        assert_eq!(uvec2(56, 0), data.probe_tile_origin(0, 7, 6));
        assert_eq!(uvec2(0, 8), data.probe_tile_origin(0, 8, 6));
        assert_eq!(uvec2(8, 256), data.probe_tile_origin(1, 1, 6));

        assert_eq!(
            Vec2::splat(4.0),
            data.probe_atlas_pos(0, 0, Vec2::ZERO, 6),
        );

        assert_eq!(
            vec2(1.0, 7.0),
            data.probe_atlas_pos(0, 0, vec2(-1.0, 1.0), 6),
        );
    }
}
