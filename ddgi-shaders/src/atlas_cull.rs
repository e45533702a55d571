//! Builds per-chunk lists of surface atlas objects.
//!
//! Each workgroup covers a 4x4x4 block of chunks: first it collects objects
//! touching the whole block into workgroup memory, then every thread refines
//! that list against its own chunk.

use ddgi_gpu::prelude::*;

#[spirv(compute(threads(4, 4, 4)))]
#[allow(clippy::too_many_arguments)]
pub fn main(
    #[spirv(global_invocation_id)] global_id: UVec3,
    #[spirv(workgroup_id)] group_id: UVec3,
    #[spirv(local_invocation_index)] local_idx: u32,
    #[spirv(workgroup)] shared_count: &mut u32,
    #[spirv(workgroup)]
    shared_objects: &mut [u32; SURFACE_ATLAS_SHARED_CULL_SIZE],
    #[spirv(descriptor_set = 0, binding = 0, uniform)] data: &SurfaceAtlasData,
    #[spirv(descriptor_set = 0, binding = 1, storage_buffer)] objects: &[Vec4],
    #[spirv(descriptor_set = 0, binding = 2, storage_buffer)]
    object_addresses: &[u32],
    #[spirv(descriptor_set = 0, binding = 3, storage_buffer)]
    culled_chunks: &mut [u32],
    #[spirv(descriptor_set = 0, binding = 4, storage_buffer)]
    culled_objects: &mut [u32],
) {
    cull_reset(local_idx, shared_count);

    unsafe {
        spirv_std::arch::workgroup_memory_barrier_with_group_sync();
    }

    cull_group(
        local_idx,
        group_id,
        data,
        objects,
        object_addresses,
        shared_count,
        shared_objects,
    );

    unsafe {
        spirv_std::arch::workgroup_memory_barrier_with_group_sync();
    }

    cull_chunk(
        global_id,
        data,
        objects,
        *shared_count,
        shared_objects,
        culled_chunks,
        culled_objects,
    );
}
