use std::mem;

use glam::UVec3;

use crate::{gpu, ComputePass, DdgiBuffers, DdgiConfig, Shaders};

#[derive(Debug)]
pub struct AtlasCullingPass {
    pass: ComputePass,
}

impl AtlasCullingPass {
    pub fn new(
        device: &wgpu::Device,
        _: &DdgiConfig,
        shaders: &Shaders,
        buffers: &DdgiBuffers,
    ) -> Self {
        let pass = ComputePass::builder("atlas_culling")
            .bind([
                &buffers.atlas,
                &buffers.atlas_objects.bind_readable(),
                &buffers.atlas_addresses.bind_readable(),
                &buffers.atlas_culled_chunks.bind_writable(),
                &buffers.atlas_culled_objects.bind_writable(),
            ])
            .build(device, &shaders.atlas_cull);

        Self { pass }
    }

    pub fn run(
        &self,
        config: &DdgiConfig,
        buffers: &DdgiBuffers,
        encoder: &mut wgpu::CommandEncoder,
    ) {
        // Allocation counter
        buffers
            .atlas_culled_objects
            .clear(encoder, 0, mem::size_of::<u32>());

        let size = UVec3::splat(
            config.atlas_chunk_resolution / gpu::SURFACE_ATLAS_CULL_GROUP_SIZE,
        );

        self.pass.run(encoder, size, ());
    }
}
