use std::mem;

use glam::uvec3;

use crate::{
    gpu, Cascades, ComputePass, DdgiBuffers, DdgiConfig, Shaders,
};

/// Relocates probes away from geometry, (de)activates them and gathers the
/// active ones into a list.
#[derive(Debug)]
pub struct ProbeClassificationPass {
    pass: ComputePass<gpu::ProbeClassifyPassParams>,
}

impl ProbeClassificationPass {
    pub fn new(
        device: &wgpu::Device,
        _: &DdgiConfig,
        shaders: &Shaders,
        buffers: &DdgiBuffers,
    ) -> Self {
        let pass = ComputePass::builder("probe_classification")
            .bind([
                &buffers.ddgi,
                &buffers.sdf,
                &buffers.sdf_voxels.bind_readable(),
                &buffers.probes.bind_writable(),
                &buffers.active_probes.bind_writable(),
            ])
            .build(device, &shaders.ddgi_classify);

        Self { pass }
    }

    pub fn run(
        &self,
        config: &DdgiConfig,
        cascades: &Cascades,
        buffers: &DdgiBuffers,
        encoder: &mut wgpu::CommandEncoder,
        cascade: u32,
    ) {
        // Active probes counter
        buffers
            .active_probes
            .clear(encoder, 0, mem::size_of::<u32>());

        let groups = (config.probes_per_cascade()
            + gpu::DDGI_PROBE_CLASSIFY_GROUP_SIZE
            - 1)
            / gpu::DDGI_PROBE_CLASSIFY_GROUP_SIZE;

        self.pass.run(
            encoder,
            uvec3(groups, 1, 1),
            cascades.classify_params(config, cascade),
        );
    }
}
