use std::mem;

use glam::{uvec4, vec4, UVec2, Vec4};
use log::debug;

use crate::{
    gpu, DdgiConfig, MappedUniformBuffer, StorageBuffer,
    SURFACE_ATLAS_MAX_RECORD_SIZE,
};

#[derive(Debug)]
pub struct DdgiBuffers {
    pub ddgi: MappedUniformBuffer<gpu::DdgiData>,
    pub sdf: MappedUniformBuffer<gpu::GlobalSdfData>,
    pub atlas: MappedUniformBuffer<gpu::SurfaceAtlasData>,
    pub view: MappedUniformBuffer<gpu::ViewData>,

    // Probes
    pub sdf_voxels: StorageBuffer,
    pub probes: StorageBuffer,
    pub active_probes: StorageBuffer,
    pub indirect_args: StorageBuffer,
    pub trace: StorageBuffer,
    pub irradiance: StorageBuffer,
    pub distance: StorageBuffer,
    pub sky: StorageBuffer,

    // Surface atlas
    pub atlas_objects: StorageBuffer,
    pub atlas_addresses: StorageBuffer,
    pub atlas_tiles: StorageBuffer,
    pub atlas_culled_chunks: StorageBuffer,
    pub atlas_culled_objects: StorageBuffer,
    pub atlas_depth: StorageBuffer,
    pub atlas_gbuffer: StorageBuffer,
    pub atlas_direct: StorageBuffer,
    pub atlas_lighting: StorageBuffer,

    // Screen
    pub screen_depth: StorageBuffer,
    pub screen_gbuffer: StorageBuffer,
    pub screen_output: StorageBuffer,
}

impl DdgiBuffers {
    pub fn new(device: &wgpu::Device, config: &DdgiConfig) -> Self {
        debug!("Initializing buffers");

        let texel = mem::size_of::<Vec4>();
        let word = mem::size_of::<u32>();
        let probes_per_cascade = config.probes_per_cascade() as usize;

        let texels_of = |size: UVec2| (size.x as usize) * (size.y as usize);

        let ddgi = MappedUniformBuffer::new_default(device, "ddgi_data");

        let sdf = MappedUniformBuffer::new(
            device,
            "ddgi_sdf",
            gpu::GlobalSdfData {
                params: uvec4(
                    config.sdf_resolution,
                    config.sdf_cascades,
                    0,
                    0,
                ),
                ..Default::default()
            },
        );

        let atlas = MappedUniformBuffer::new(
            device,
            "ddgi_atlas",
            gpu::SurfaceAtlasData {
                view_pos: vec4(0.0, 0.0, 0.0, config.atlas_chunk_size()),
                params: uvec4(
                    config.atlas_resolution,
                    config.atlas_chunk_resolution,
                    0,
                    config.atlas_culled_objects_capacity,
                ),
                flags: uvec4(
                    config.atlas_debug as u32,
                    config.atlas_sample_all_tiles as u32,
                    0,
                    0,
                ),
            },
        );

        let view = MappedUniformBuffer::new(
            device,
            "ddgi_view",
            gpu::ViewData {
                viewport: config.viewport_size.extend(0).extend(0),
                ..Default::default()
            },
        );

        // ---

        let sdf_voxels = StorageBuffer::new(
            device,
            "ddgi_sdf_voxels",
            (config.sdf_resolution as usize).pow(3)
                * (config.sdf_cascades as usize)
                * mem::size_of::<f32>(),
        );

        let probes = StorageBuffer::new(
            device,
            "ddgi_probes",
            (config.probes_count() as usize) * 2 * word,
        );

        // Counter, followed by the list
        let active_probes = StorageBuffer::new(
            device,
            "ddgi_active_probes",
            (1 + probes_per_cascade) * word,
        );

        let indirect_args = StorageBuffer::new_indirect(
            device,
            "ddgi_indirect_args",
            (gpu::batches_needed(config.probes_per_cascade())
                * gpu::DDGI_INDIRECT_ARGS_STRIDE) as usize
                * word,
        );

        let trace = StorageBuffer::new(
            device,
            "ddgi_trace",
            probes_per_cascade
                .min(gpu::DDGI_TRACE_RAYS_PROBES_COUNT_LIMIT as usize)
                * (gpu::DDGI_TRACE_RAYS_LIMIT as usize)
                * texel,
        );

        let irradiance = StorageBuffer::new(
            device,
            "ddgi_irradiance",
            texels_of(
                config.probe_atlas_size(gpu::DDGI_PROBE_RESOLUTION_IRRADIANCE),
            ) * texel,
        );

        let distance = StorageBuffer::new(
            device,
            "ddgi_distance",
            texels_of(
                config.probe_atlas_size(gpu::DDGI_PROBE_RESOLUTION_DISTANCE),
            ) * texel,
        );

        let sky = StorageBuffer::new(
            device,
            "ddgi_sky",
            texels_of(UVec2::splat(gpu::DDGI_SKY_RESOLUTION)) * texel,
        );

        // ---

        let max_objects = config.atlas_max_objects as usize;
        let atlas_texels = texels_of(UVec2::splat(config.atlas_resolution));

        let atlas_objects = StorageBuffer::new(
            device,
            "ddgi_atlas_objects",
            max_objects * (SURFACE_ATLAS_MAX_RECORD_SIZE as usize) * texel,
        );

        let atlas_addresses = StorageBuffer::new(
            device,
            "ddgi_atlas_addresses",
            max_objects * word,
        );

        let atlas_tiles = StorageBuffer::new(
            device,
            "ddgi_atlas_tiles",
            max_objects * gpu::SURFACE_ATLAS_TILES_PER_OBJECT * word,
        );

        let atlas_culled_chunks = StorageBuffer::new(
            device,
            "ddgi_atlas_culled_chunks",
            (config.atlas_chunk_resolution as usize).pow(3) * word,
        );

        let atlas_culled_objects = StorageBuffer::new(
            device,
            "ddgi_atlas_culled_objects",
            (config.atlas_culled_objects_capacity as usize) * word,
        );

        let atlas_depth = StorageBuffer::new(
            device,
            "ddgi_atlas_depth",
            atlas_texels * mem::size_of::<f32>(),
        );

        let atlas_gbuffer = StorageBuffer::new(
            device,
            "ddgi_atlas_gbuffer",
            atlas_texels * texel,
        );

        let atlas_direct = StorageBuffer::new(
            device,
            "ddgi_atlas_direct",
            atlas_texels * texel,
        );

        // Direct + indirect, rebuilt out of `atlas_direct` every frame
        let atlas_lighting = StorageBuffer::new(
            device,
            "ddgi_atlas_lighting",
            atlas_texels * texel,
        );

        // ---

        let screen_texels = (config.viewport_size.x as usize)
            * (config.viewport_size.y as usize);

        let screen_depth = StorageBuffer::new(
            device,
            "ddgi_screen_depth",
            screen_texels * mem::size_of::<f32>(),
        );

        let screen_gbuffer = StorageBuffer::new(
            device,
            "ddgi_screen_gbuffer",
            screen_texels * texel,
        );

        let screen_output = StorageBuffer::new(
            device,
            "ddgi_screen_output",
            screen_texels * texel,
        );

        Self {
            ddgi,
            sdf,
            atlas,
            view,
            sdf_voxels,
            probes,
            active_probes,
            indirect_args,
            trace,
            irradiance,
            distance,
            sky,
            atlas_objects,
            atlas_addresses,
            atlas_tiles,
            atlas_culled_chunks,
            atlas_culled_objects,
            atlas_depth,
            atlas_gbuffer,
            atlas_direct,
            atlas_lighting,
            screen_depth,
            screen_gbuffer,
            screen_output,
        }
    }

    pub fn flush(&mut self, queue: &wgpu::Queue) {
        self.ddgi.flush(queue);
        self.sdf.flush(queue);
        self.atlas.flush(queue);
        self.view.flush(queue);
    }
}
