use glam::UVec3;

use crate::{gpu, ComputePass, DdgiBuffers, DdgiConfig, Shaders};

/// Turns the list of active probes (as produced by the classification pass)
/// into arguments for the indirect tracing and updating dispatches.
#[derive(Debug)]
pub struct IndirectArgsPass {
    pass: ComputePass<gpu::IndirectArgsPassParams>,
    batches_capacity: u32,
}

impl IndirectArgsPass {
    pub fn new(
        device: &wgpu::Device,
        config: &DdgiConfig,
        shaders: &Shaders,
        buffers: &DdgiBuffers,
    ) -> Self {
        let pass = ComputePass::builder("indirect_args")
            .bind([
                &buffers.ddgi,
                &buffers.active_probes.bind_readable(),
                &buffers.indirect_args.bind_writable(),
            ])
            .build(device, &shaders.ddgi_init_args);

        Self {
            pass,
            batches_capacity: gpu::batches_needed(config.probes_per_cascade()),
        }
    }

    pub fn batches_capacity(&self) -> u32 {
        self.batches_capacity
    }

    pub fn run(&self, encoder: &mut wgpu::CommandEncoder) {
        let params = gpu::IndirectArgsPassParams {
            batches_capacity: self.batches_capacity,
            ..Default::default()
        };

        self.pass.run(encoder, UVec3::ONE, params);
    }
}
