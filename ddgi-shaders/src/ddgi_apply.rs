use ddgi_gpu::prelude::*;

#[spirv(compute(threads(8, 8)))]
#[allow(clippy::too_many_arguments)]
pub fn main(
    #[spirv(global_invocation_id)] global_id: UVec3,
    #[spirv(push_constant)] params: &ApplyPassParams,
    #[spirv(descriptor_set = 0, binding = 0, uniform)] data: &DdgiData,
    #[spirv(descriptor_set = 0, binding = 1, storage_buffer)] probes: &[UVec2],
    #[spirv(descriptor_set = 0, binding = 2, storage_buffer)]
    irradiance: &[Vec4],
    #[spirv(descriptor_set = 0, binding = 3, storage_buffer)]
    distance: &[Vec4],
    #[spirv(descriptor_set = 1, binding = 0, uniform)] view: &ViewData,
    #[spirv(descriptor_set = 1, binding = 1, storage_buffer)] depth: &[f32],
    #[spirv(descriptor_set = 1, binding = 2, storage_buffer)]
    gbuffer: &[Vec4],
    #[spirv(descriptor_set = 1, binding = 3, storage_buffer)]
    output: &mut [Vec4],
) {
    let sampler = DdgiSampler::new(
        data,
        probes,
        Texels::new(
            irradiance,
            data.atlas_size(DDGI_PROBE_RESOLUTION_IRRADIANCE),
        ),
        Texels::new(distance, data.atlas_size(DDGI_PROBE_RESOLUTION_DISTANCE)),
    );

    apply_indirect_lighting(
        global_id.xy(),
        view,
        data,
        params.bias,
        &sampler,
        depth,
        gbuffer,
        output,
    );
}
