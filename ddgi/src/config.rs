use glam::{uvec2, uvec3, UVec2, UVec3};

use crate::gpu;
pub use crate::gpu::RelocationMode;

#[derive(Clone, Debug, PartialEq)]
pub struct DdgiConfig {
    /// Number of probe cascades; each next cascade covers a larger area with
    /// sparser probes.
    pub cascades: u32,

    /// Number of probes per axis, in each cascade.
    pub probes_counts: UVec3,

    /// Distance between neighbouring probes of the first cascade.
    pub probes_spacing: f32,

    /// Ratio between probe spacing of consecutive cascades.
    pub cascades_spacing_multiplier: f32,

    /// Number of rays traced per probe, per frame.
    pub rays_count: u32,

    /// How far probe rays can go before they're considered to hit the sky.
    pub ray_max_distance: f32,

    /// How much of the previous frame's irradiance and distance survives the
    /// temporal blend.
    pub history_weight: f32,

    /// Gamma applied to irradiance before blending; higher values reduce
    /// banding in dark areas.
    pub irradiance_gamma: f32,

    pub indirect_lighting_intensity: f32,
    pub relocation_mode: RelocationMode,

    /// How far (relative to probe spacing) sampling points get pushed away
    /// from surfaces.
    pub sampler_bias: f32,

    /// Resolution of each Global SDF cascade, in voxels per axis.
    pub sdf_resolution: u32,

    /// Number of Global SDF cascades.
    pub sdf_cascades: u32,

    /// Resolution of the surface atlas, in texels per axis.
    pub atlas_resolution: u32,

    /// Number of culling chunks per axis.
    pub atlas_chunk_resolution: u32,

    /// Half-size of the volume (centered around the view) that gets culled
    /// into chunks.
    pub atlas_view_distance: f32,

    /// Maximum number of objects registered in the surface atlas.
    pub atlas_max_objects: u32,

    /// Size of the culled-objects buffer, in words.
    pub atlas_culled_objects_capacity: u32,

    /// Highlights parts of the scene missing from the surface atlas.
    pub atlas_debug: bool,

    /// Samples all tiles of an object, regardless of the surface normal.
    pub atlas_sample_all_tiles: bool,

    /// Size of the screen the indirect lighting gets applied onto.
    pub viewport_size: UVec2,
}

impl DdgiConfig {
    /// Returns probe spacing of given cascade.
    pub fn cascade_spacing(&self, cascade: u32) -> f32 {
        self.probes_spacing
            * self.cascades_spacing_multiplier.powi(cascade as i32)
    }

    pub fn probes_per_cascade(&self) -> u32 {
        self.probes_counts.x * self.probes_counts.y * self.probes_counts.z
    }

    pub fn probes_count(&self) -> u32 {
        self.probes_per_cascade() * self.cascades
    }

    /// Returns size (in texels) of the atlas holding all probes' tiles of
    /// given resolution.
    pub fn probe_atlas_size(&self, resolution: u32) -> UVec2 {
        let data = gpu::DdgiData {
            probes_counts: self.probes_counts.extend(self.cascades),
            ..Default::default()
        };

        data.atlas_size(resolution)
    }

    /// Returns size of a single culling chunk.
    pub fn atlas_chunk_size(&self) -> f32 {
        2.0 * self.atlas_view_distance / (self.atlas_chunk_resolution as f32)
    }

    /// Returns a list of problems with this configuration; empty if the
    /// configuration is valid.
    pub fn validate(&self) -> Vec<String> {
        let mut problems = Vec::new();
        let max_binding_size =
            wgpu::Limits::default().max_storage_buffer_binding_size as u64;

        if self.cascades == 0
            || self.cascades > gpu::DDGI_MAX_CASCADES as u32
        {
            problems.push(format!(
                "cascades must be within 1..={}, got {}",
                gpu::DDGI_MAX_CASCADES,
                self.cascades,
            ));
        }

        // Probes get interpolated between pairs of neighbours along each axis
        if self.probes_counts.min_element() < 2 {
            problems.push(format!(
                "probes_counts must be at least 2 along each axis, got {}",
                self.probes_counts,
            ));
        }

        // Border passes dispatch one workgroup per probe
        if (self.probes_count() as u64) > (u16::MAX as u64) {
            problems.push(format!(
                "total number of probes must not exceed {}, got {}",
                u16::MAX,
                self.probes_count(),
            ));
        }

        if self.probes_spacing <= 0.0 {
            problems.push(format!(
                "probes_spacing must be positive, got {}",
                self.probes_spacing,
            ));
        }

        if self.cascades_spacing_multiplier < 1.0 {
            problems.push(format!(
                "cascades_spacing_multiplier must be at least 1.0, got {}",
                self.cascades_spacing_multiplier,
            ));
        }

        if self.rays_count < gpu::DDGI_TRACE_RAYS_GROUP_SIZE_X
            || self.rays_count > gpu::DDGI_TRACE_RAYS_LIMIT
            || self.rays_count % gpu::DDGI_TRACE_RAYS_GROUP_SIZE_X != 0
        {
            problems.push(format!(
                "rays_count must be a multiple of {} within {}..={}, got {}",
                gpu::DDGI_TRACE_RAYS_GROUP_SIZE_X,
                gpu::DDGI_TRACE_RAYS_GROUP_SIZE_X,
                gpu::DDGI_TRACE_RAYS_LIMIT,
                self.rays_count,
            ));
        }

        if self.ray_max_distance <= 0.0 {
            problems.push(format!(
                "ray_max_distance must be positive, got {}",
                self.ray_max_distance,
            ));
        }

        if !(0.0..1.0).contains(&self.history_weight) {
            problems.push(format!(
                "history_weight must be within 0.0..1.0, got {}",
                self.history_weight,
            ));
        }

        if self.irradiance_gamma <= 0.0 {
            problems.push(format!(
                "irradiance_gamma must be positive, got {}",
                self.irradiance_gamma,
            ));
        }

        if self.sdf_resolution < 2 {
            problems.push(format!(
                "sdf_resolution must be at least 2, got {}",
                self.sdf_resolution,
            ));
        }

        if self.sdf_cascades == 0
            || self.sdf_cascades > gpu::SDF_MAX_CASCADES as u32
        {
            problems.push(format!(
                "sdf_cascades must be within 1..={}, got {}",
                gpu::SDF_MAX_CASCADES,
                self.sdf_cascades,
            ));
        }

        let atlas_size = (self.atlas_resolution as u64).pow(2) * 16;

        if self.atlas_resolution == 0 || atlas_size > max_binding_size {
            problems.push(format!(
                "atlas_resolution must be non-zero and fit within a single \
                 storage buffer ({max_binding_size} bytes), got {}",
                self.atlas_resolution,
            ));
        }

        if self.atlas_chunk_resolution == 0
            || self.atlas_chunk_resolution % gpu::SURFACE_ATLAS_CULL_GROUP_SIZE
                != 0
        {
            problems.push(format!(
                "atlas_chunk_resolution must be a non-zero multiple of {}, got {}",
                gpu::SURFACE_ATLAS_CULL_GROUP_SIZE,
                self.atlas_chunk_resolution,
            ));
        }

        if self.atlas_view_distance <= 0.0 {
            problems.push(format!(
                "atlas_view_distance must be positive, got {}",
                self.atlas_view_distance,
            ));
        }

        if self.atlas_max_objects == 0 {
            problems.push("atlas_max_objects must be non-zero".into());
        }

        if self.atlas_culled_objects_capacity < 2 {
            problems.push(format!(
                "atlas_culled_objects_capacity must be at least 2, got {}",
                self.atlas_culled_objects_capacity,
            ));
        }

        if self.viewport_size.min_element() == 0 {
            problems.push(format!(
                "viewport_size must be non-zero, got {}",
                self.viewport_size,
            ));
        }

        problems
    }
}

impl Default for DdgiConfig {
    fn default() -> Self {
        Self {
            cascades: 4,
            probes_counts: uvec3(16, 8, 16),
            probes_spacing: 2.0,
            cascades_spacing_multiplier: 2.0,
            rays_count: 128,
            ray_max_distance: 100.0,
            history_weight: 0.95,
            irradiance_gamma: 5.0,
            indirect_lighting_intensity: 1.0,
            relocation_mode: RelocationMode::Lattice,
            sampler_bias: 0.2,
            sdf_resolution: 128,
            sdf_cascades: 4,
            atlas_resolution: 2048,
            atlas_chunk_resolution: 40,
            atlas_view_distance: 200.0,
            atlas_max_objects: 4096,
            atlas_culled_objects_capacity: 256 * 1024,
            atlas_debug: false,
            atlas_sample_all_tiles: false,
            viewport_size: uvec2(1280, 720),
        }
    }
}
