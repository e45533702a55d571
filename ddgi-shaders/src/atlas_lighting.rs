use ddgi_gpu::prelude::*;

#[spirv(compute(threads(8, 8)))]
#[allow(clippy::too_many_arguments)]
pub fn main(
    #[spirv(global_invocation_id)] global_id: UVec3,
    #[spirv(push_constant)] params: &AtlasLightingPassParams,
    #[spirv(descriptor_set = 0, binding = 0, uniform)] data: &DdgiData,
    #[spirv(descriptor_set = 0, binding = 1, storage_buffer)] probes: &[UVec2],
    #[spirv(descriptor_set = 0, binding = 2, storage_buffer)]
    irradiance: &[Vec4],
    #[spirv(descriptor_set = 0, binding = 3, storage_buffer)]
    distance: &[Vec4],
    #[spirv(descriptor_set = 1, binding = 0, uniform)]
    atlas_data: &SurfaceAtlasData,
    #[spirv(descriptor_set = 1, binding = 1, storage_buffer)]
    atlas_objects: &[Vec4],
    #[spirv(descriptor_set = 1, binding = 2, storage_buffer)]
    atlas_tiles: &[u32],
    #[spirv(descriptor_set = 1, binding = 3, storage_buffer)]
    atlas_depth: &[f32],
    #[spirv(descriptor_set = 1, binding = 4, storage_buffer)]
    atlas_gbuffer: &[Vec4],
    #[spirv(descriptor_set = 1, binding = 5, storage_buffer)]
    atlas_direct: &[Vec4],
    #[spirv(descriptor_set = 1, binding = 6, storage_buffer)]
    atlas_lighting: &mut [Vec4],
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

    let atlas_size = UVec2::splat(atlas_data.resolution());

    apply_atlas_indirect_lighting(
        global_id.xy(),
        global_id.z,
        params,
        data,
        atlas_data,
        &sampler,
        atlas_objects,
        atlas_tiles,
        Texels::new(atlas_depth, atlas_size),
        Texels::new(atlas_gbuffer, atlas_size),
        Texels::new(atlas_direct, atlas_size),
        &mut TexelsMut::new(atlas_lighting, atlas_size),
    );
}
