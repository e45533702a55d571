use ddgi_gpu::prelude::*;

#[spirv(compute(threads(1)))]
pub fn main(
    #[spirv(push_constant)] params: &IndirectArgsPassParams,
    #[spirv(descriptor_set = 0, binding = 0, uniform)] data: &DdgiData,
    #[spirv(descriptor_set = 0, binding = 1, storage_buffer)]
    active_probes: &[u32],
    #[spirv(descriptor_set = 0, binding = 2, storage_buffer)]
    args: &mut [u32],
) {
    let active_count = unsafe { *active_probes.index_unchecked(0) };

    build_indirect_args(
        active_count,
        data.rays_count,
        params.batches_capacity,
        args,
    );
}
