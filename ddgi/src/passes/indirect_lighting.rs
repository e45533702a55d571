use crate::{gpu, ComputePass, DdgiBuffers, DdgiConfig, Shaders};

#[derive(Debug)]
pub struct IndirectLightingPass {
    pass: ComputePass<gpu::ApplyPassParams>,
}

impl IndirectLightingPass {
    pub fn new(
        device: &wgpu::Device,
        _: &DdgiConfig,
        shaders: &Shaders,
        buffers: &DdgiBuffers,
    ) -> Self {
        let pass = ComputePass::builder("indirect_lighting")
            .bind([
                &buffers.ddgi,
                &buffers.probes.bind_readable(),
                &buffers.irradiance.bind_readable(),
                &buffers.distance.bind_readable(),
            ])
            .bind([
                &buffers.view,
                &buffers.screen_depth.bind_readable(),
                &buffers.screen_gbuffer.bind_readable(),
                &buffers.screen_output.bind_writable(),
            ])
            .build(device, &shaders.ddgi_apply);

        Self { pass }
    }

    pub fn run(&self, config: &DdgiConfig, encoder: &mut wgpu::CommandEncoder) {
        // This pass uses 8x8 warps:
        let size = (config.viewport_size + 7) / 8;

        let params = gpu::ApplyPassParams {
            bias: config.sampler_bias,
            ..Default::default()
        };

        self.pass.run(encoder, size.extend(1), params);
    }
}
