use ddgi_gpu::prelude::*;

// Threads are laid out for the distance tiles (14 + 2 texels); smaller tiles
// leave the excess threads idle.

#[spirv(compute(threads(16, 2)))]
pub fn rows(
    #[spirv(workgroup_id)] group_id: UVec3,
    #[spirv(local_invocation_id)] local_id: UVec3,
    #[spirv(push_constant)] params: &ProbeBordersPassParams,
    #[spirv(descriptor_set = 0, binding = 0, uniform)] data: &DdgiData,
    #[spirv(descriptor_set = 0, binding = 1, storage_buffer)]
    atlas: &mut [Vec4],
) {
    if group_id.x >= params.tiles_count {
        return;
    }

    let atlas_size = data.atlas_size(params.resolution);

    update_border_rows(
        params,
        group_id.x,
        local_id.xy(),
        &mut TexelsMut::new(atlas, atlas_size),
    );
}

#[spirv(compute(threads(2, 16)))]
pub fn columns(
    #[spirv(workgroup_id)] group_id: UVec3,
    #[spirv(local_invocation_id)] local_id: UVec3,
    #[spirv(push_constant)] params: &ProbeBordersPassParams,
    #[spirv(descriptor_set = 0, binding = 0, uniform)] data: &DdgiData,
    #[spirv(descriptor_set = 0, binding = 1, storage_buffer)]
    atlas: &mut [Vec4],
) {
    if group_id.x >= params.tiles_count {
        return;
    }

    let atlas_size = data.atlas_size(params.resolution);

    update_border_columns(
        params,
        group_id.x,
        local_id.xy(),
        &mut TexelsMut::new(atlas, atlas_size),
    );
}
