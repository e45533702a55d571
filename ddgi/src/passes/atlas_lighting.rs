use glam::uvec3;

use crate::{gpu, ComputePass, DdgiBuffers, DdgiConfig, Shaders};

#[derive(Debug)]
pub struct AtlasLightingPass {
    pass: ComputePass<gpu::AtlasLightingPassParams>,
}

impl AtlasLightingPass {
    pub fn new(
        device: &wgpu::Device,
        _: &DdgiConfig,
        shaders: &Shaders,
        buffers: &DdgiBuffers,
    ) -> Self {
        let pass = ComputePass::builder("atlas_lighting")
            .bind([
                &buffers.ddgi,
                &buffers.probes.bind_readable(),
                &buffers.irradiance.bind_readable(),
                &buffers.distance.bind_readable(),
            ])
            .bind([
                &buffers.atlas,
                &buffers.atlas_objects.bind_readable(),
                &buffers.atlas_tiles.bind_readable(),
                &buffers.atlas_depth.bind_readable(),
                &buffers.atlas_gbuffer.bind_readable(),
                &buffers.atlas_direct.bind_readable(),
                &buffers.atlas_lighting.bind_writable(),
            ])
            .build(device, &shaders.atlas_lighting);

        Self { pass }
    }

    pub fn run(
        &self,
        config: &DdgiConfig,
        encoder: &mut wgpu::CommandEncoder,
        tiles_count: u32,
        max_tile_size: u32,
    ) {
        if tiles_count == 0 {
            return;
        }

        // This pass uses 8x8 warps, one layer per tile:
        let groups = (max_tile_size + 7) / 8;
        let size = uvec3(groups, groups, tiles_count);

        let params = gpu::AtlasLightingPassParams {
            tiles_count,
            max_tile_size,
            bias: config.sampler_bias,
            _pad: 0,
        };

        self.pass.run(encoder, size, params);
    }
}
