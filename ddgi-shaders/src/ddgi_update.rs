//! Blends freshly traced rays into probes' irradiance and distance tiles.
//!
//! Each workgroup handles a single probe of the batch, each thread handles a
//! single texel of its tile.

use ddgi_gpu::prelude::*;

#[spirv(compute(threads(6, 6)))]
#[allow(clippy::too_many_arguments)]
pub fn irradiance(
    #[spirv(workgroup_id)] group_id: UVec3,
    #[spirv(local_invocation_id)] local_id: UVec3,
    #[spirv(push_constant)] params: &ProbeBatchPassParams,
    #[spirv(descriptor_set = 0, binding = 0, uniform)] data: &DdgiData,
    #[spirv(descriptor_set = 0, binding = 1, storage_buffer)] probes: &[UVec2],
    #[spirv(descriptor_set = 0, binding = 2, storage_buffer)]
    active_probes: &[u32],
    #[spirv(descriptor_set = 0, binding = 3, storage_buffer)] trace: &[Vec4],
    #[spirv(descriptor_set = 0, binding = 4, storage_buffer)]
    atlas: &mut [Vec4],
) {
    let atlas_size = data.atlas_size(DDGI_PROBE_RESOLUTION_IRRADIANCE);

    update_irradiance(
        data,
        params,
        probes,
        active_probes,
        trace,
        group_id.x,
        local_id.xy(),
        &mut TexelsMut::new(atlas, atlas_size),
    );
}

#[spirv(compute(threads(14, 14)))]
#[allow(clippy::too_many_arguments)]
pub fn distance(
    #[spirv(workgroup_id)] group_id: UVec3,
    #[spirv(local_invocation_id)] local_id: UVec3,
    #[spirv(push_constant)] params: &ProbeBatchPassParams,
    #[spirv(descriptor_set = 0, binding = 0, uniform)] data: &DdgiData,
    #[spirv(descriptor_set = 0, binding = 1, storage_buffer)] probes: &[UVec2],
    #[spirv(descriptor_set = 0, binding = 2, storage_buffer)]
    active_probes: &[u32],
    #[spirv(descriptor_set = 0, binding = 3, storage_buffer)] trace: &[Vec4],
    #[spirv(descriptor_set = 0, binding = 4, storage_buffer)]
    atlas: &mut [Vec4],
) {
    let atlas_size = data.atlas_size(DDGI_PROBE_RESOLUTION_DISTANCE);

    update_distance(
        data,
        params,
        probes,
        active_probes,
        trace,
        group_id.x,
        local_id.xy(),
        &mut TexelsMut::new(atlas, atlas_size),
    );
}
