use glam::uvec3;

use crate::{
    gpu, ComputePass, DdgiBuffers, DdgiConfig, Shaders, StorageBuffer,
};

/// Copies edges of each probe tile into its one-texel border, so that
/// bilinear filtering wraps around the octahedral map correctly.
#[derive(Debug)]
pub struct ProbeBordersPass {
    irradiance_rows: ComputePass<gpu::ProbeBordersPassParams>,
    irradiance_columns: ComputePass<gpu::ProbeBordersPassParams>,
    distance_rows: ComputePass<gpu::ProbeBordersPassParams>,
    distance_columns: ComputePass<gpu::ProbeBordersPassParams>,
}

impl ProbeBordersPass {
    pub fn new(
        device: &wgpu::Device,
        _: &DdgiConfig,
        shaders: &Shaders,
        buffers: &DdgiBuffers,
    ) -> Self {
        let pass = |label, atlas, shader| {
            build_pass(device, label, buffers, atlas, shader)
        };

        Self {
            irradiance_rows: pass(
                "probe_borders_irradiance_rows",
                &buffers.irradiance,
                &shaders.ddgi_update_borders_rows,
            ),
            irradiance_columns: pass(
                "probe_borders_irradiance_columns",
                &buffers.irradiance,
                &shaders.ddgi_update_borders_columns,
            ),
            distance_rows: pass(
                "probe_borders_distance_rows",
                &buffers.distance,
                &shaders.ddgi_update_borders_rows,
            ),
            distance_columns: pass(
                "probe_borders_distance_columns",
                &buffers.distance,
                &shaders.ddgi_update_borders_columns,
            ),
        }
    }

    pub fn run(&self, config: &DdgiConfig, encoder: &mut wgpu::CommandEncoder) {
        let tiles_count = config.probes_count();

        // One workgroup per tile:
        let size = uvec3(tiles_count, 1, 1);

        let irradiance = gpu::ProbeBordersPassParams {
            resolution: gpu::DDGI_PROBE_RESOLUTION_IRRADIANCE,
            tiles_count,
            ..Default::default()
        };

        let distance = gpu::ProbeBordersPassParams {
            resolution: gpu::DDGI_PROBE_RESOLUTION_DISTANCE,
            tiles_count,
            ..Default::default()
        };

        self.irradiance_rows.run(encoder, size, irradiance);
        self.irradiance_columns.run(encoder, size, irradiance);
        self.distance_rows.run(encoder, size, distance);
        self.distance_columns.run(encoder, size, distance);
    }
}

fn build_pass(
    device: &wgpu::Device,
    label: &str,
    buffers: &DdgiBuffers,
    atlas: &StorageBuffer,
    shader: &(wgpu::ShaderModule, &'static str),
) -> ComputePass<gpu::ProbeBordersPassParams> {
    ComputePass::builder(label)
        .bind([&buffers.ddgi, &atlas.bind_writable()])
        .build(device, shader)
}
