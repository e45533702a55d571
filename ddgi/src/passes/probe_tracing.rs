use std::mem;

use crate::{gpu, ComputePass, DdgiBuffers, DdgiConfig, Shaders};

#[derive(Debug)]
pub struct ProbeTracingPass {
    pass: ComputePass<gpu::ProbeBatchPassParams>,
}

impl ProbeTracingPass {
    pub fn new(
        device: &wgpu::Device,
        _: &DdgiConfig,
        shaders: &Shaders,
        buffers: &DdgiBuffers,
    ) -> Self {
        let pass = ComputePass::builder("probe_tracing")
            .bind([
                &buffers.ddgi,
                &buffers.sdf,
                &buffers.sdf_voxels.bind_readable(),
                &buffers.probes.bind_readable(),
                &buffers.active_probes.bind_readable(),
                &buffers.trace.bind_writable(),
                &buffers.sky.bind_readable(),
            ])
            .bind([
                &buffers.atlas,
                &buffers.atlas_objects.bind_readable(),
                &buffers.atlas_culled_chunks.bind_readable(),
                &buffers.atlas_culled_objects.bind_readable(),
                &buffers.atlas_depth.bind_readable(),
                &buffers.atlas_lighting.bind_readable(),
            ])
            .build(device, &shaders.ddgi_trace);

        Self { pass }
    }

    pub fn run(
        &self,
        buffers: &DdgiBuffers,
        encoder: &mut wgpu::CommandEncoder,
        batch: u32,
        params: gpu::ProbeBatchPassParams,
    ) {
        let offset = batch * gpu::DDGI_INDIRECT_ARGS_STRIDE;

        self.pass.run_indirect(
            encoder,
            buffers.indirect_args.buffer(),
            (offset as usize * mem::size_of::<u32>()) as u64,
            params,
        );
    }
}
