use ddgi_gpu::prelude::*;

#[spirv(compute(threads(32, 1)))]
#[allow(clippy::too_many_arguments)]
pub fn main(
    #[spirv(global_invocation_id)] global_id: UVec3,
    #[spirv(push_constant)] params: &ProbeBatchPassParams,
    #[spirv(descriptor_set = 0, binding = 0, uniform)] data: &DdgiData,
    #[spirv(descriptor_set = 0, binding = 1, uniform)] sdf: &GlobalSdfData,
    #[spirv(descriptor_set = 0, binding = 2, storage_buffer)]
    sdf_voxels: &[f32],
    #[spirv(descriptor_set = 0, binding = 3, storage_buffer)] probes: &[UVec2],
    #[spirv(descriptor_set = 0, binding = 4, storage_buffer)]
    active_probes: &[u32],
    #[spirv(descriptor_set = 0, binding = 5, storage_buffer)]
    trace: &mut [Vec4],
    #[spirv(descriptor_set = 0, binding = 6, storage_buffer)] sky: &[Vec4],
    #[spirv(descriptor_set = 1, binding = 0, uniform)]
    atlas_data: &SurfaceAtlasData,
    #[spirv(descriptor_set = 1, binding = 1, storage_buffer)]
    atlas_objects: &[Vec4],
    #[spirv(descriptor_set = 1, binding = 2, storage_buffer)]
    atlas_culled_chunks: &[u32],
    #[spirv(descriptor_set = 1, binding = 3, storage_buffer)]
    atlas_culled_objects: &[u32],
    #[spirv(descriptor_set = 1, binding = 4, storage_buffer)]
    atlas_depth: &[f32],
    #[spirv(descriptor_set = 1, binding = 5, storage_buffer)]
    atlas_lighting: &[Vec4],
) {
    let sdf = GlobalSdfView::new(sdf, sdf_voxels);
    let sky = SkyView::new(sky);
    let atlas_size = UVec2::splat(atlas_data.resolution());

    let atlas = SurfaceAtlasView::new(
        atlas_data,
        atlas_objects,
        atlas_culled_chunks,
        atlas_culled_objects,
        Texels::new(atlas_depth, atlas_size),
        Texels::new(atlas_lighting, atlas_size),
    );

    trace_probe(
        global_id.xy(),
        data,
        params,
        &sdf,
        probes,
        active_probes,
        |dir| sky.sample(dir),
        |pos, normal, threshold| atlas.sample(pos, normal, threshold),
        trace,
    );
}
