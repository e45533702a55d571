use std::mem;

use crate::{gpu, ComputePass, DdgiBuffers, DdgiConfig, Shaders};

/// Blends this frame's rays into the probes' irradiance and distance tiles.
#[derive(Debug)]
pub struct ProbeUpdatingPass {
    irradiance_pass: ComputePass<gpu::ProbeBatchPassParams>,
    distance_pass: ComputePass<gpu::ProbeBatchPassParams>,
}

impl ProbeUpdatingPass {
    pub fn new(
        device: &wgpu::Device,
        _: &DdgiConfig,
        shaders: &Shaders,
        buffers: &DdgiBuffers,
    ) -> Self {
        let irradiance_pass =
            ComputePass::builder("probe_updating_irradiance")
                .bind([
                    &buffers.ddgi,
                    &buffers.probes.bind_readable(),
                    &buffers.active_probes.bind_readable(),
                    &buffers.trace.bind_readable(),
                    &buffers.irradiance.bind_writable(),
                ])
                .build(device, &shaders.ddgi_update_irradiance);

        let distance_pass = ComputePass::builder("probe_updating_distance")
            .bind([
                &buffers.ddgi,
                &buffers.probes.bind_readable(),
                &buffers.active_probes.bind_readable(),
                &buffers.trace.bind_readable(),
                &buffers.distance.bind_writable(),
            ])
            .build(device, &shaders.ddgi_update_distance);

        Self {
            irradiance_pass,
            distance_pass,
        }
    }

    pub fn run(
        &self,
        buffers: &DdgiBuffers,
        encoder: &mut wgpu::CommandEncoder,
        batch: u32,
        params: gpu::ProbeBatchPassParams,
    ) {
        // Update dispatch follows the tracing one
        let offset = batch * gpu::DDGI_INDIRECT_ARGS_STRIDE + 3;
        let offset = (offset as usize * mem::size_of::<u32>()) as u64;
        let args = buffers.indirect_args.buffer();

        self.irradiance_pass
            .run_indirect(encoder, args, offset, params);

        self.distance_pass.run_indirect(encoder, args, offset, params);
    }
}
