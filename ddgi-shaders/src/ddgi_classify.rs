use ddgi_gpu::prelude::*;

#[spirv(compute(threads(32)))]
pub fn main(
    #[spirv(global_invocation_id)] global_id: UVec3,
    #[spirv(push_constant)] params: &ProbeClassifyPassParams,
    #[spirv(descriptor_set = 0, binding = 0, uniform)] data: &DdgiData,
    #[spirv(descriptor_set = 0, binding = 1, uniform)] sdf: &GlobalSdfData,
    #[spirv(descriptor_set = 0, binding = 2, storage_buffer)]
    sdf_voxels: &[f32],
    #[spirv(descriptor_set = 0, binding = 3, storage_buffer)]
    probes: &mut [UVec2],
    #[spirv(descriptor_set = 0, binding = 4, storage_buffer)]
    active_probes: &mut [u32],
) {
    let sdf = GlobalSdfView::new(sdf, sdf_voxels);

    classify_probe(data, params, &sdf, probes, active_probes, global_id.x);
}
