//! Culling of surface atlas objects into chunks.
//!
//! Each workgroup handles a 4x4x4 block of chunks and runs in three phases,
//! separated by workgroup barriers:
//!
//! - [`cull_reset()`] - the first thread clears the shared counter,
//! - [`cull_group()`] - threads cooperatively test (strided) objects against
//!   the block's bounds, caching the survivors in shared memory,
//! - [`cull_chunk()`] - each thread tests the cached objects against its own
//!   chunk and appends them into the culled objects buffer.
//!
//! Both phases have a fixed capacity and both keep counting past it, so that
//! an overflow can be told apart from an empty chunk:
//!
//! - a block of chunks caches up to [`SURFACE_ATLAS_SHARED_CULL_SIZE`]
//!   objects; the rest is missing from all of the block's chunks, while the
//!   shared counter still ends up at the number of objects that touched the
//!   block,
//! - chunks that don't fit within the culled objects buffer get zero, while
//!   `culled_objects[0]` (the allocation counter) still grows past the
//!   buffer's capacity.
//!
//! Either way the missing objects simply don't bounce any light this frame.

use glam::{UVec3, Vec4};
use spirv_std::arch::IndexUnchecked;

use crate::{
    atomic_add, atomic_add_workgroup, sphere_intersects_box,
    SurfaceAtlasData, SurfaceAtlasObject, SURFACE_ATLAS_CULL_GROUP_SIZE,
    SURFACE_ATLAS_SHARED_CULL_SIZE,
};

/// Number of threads in the culling workgroup.
pub const SURFACE_ATLAS_CULL_GROUP_THREADS: u32 = SURFACE_ATLAS_CULL_GROUP_SIZE
    * SURFACE_ATLAS_CULL_GROUP_SIZE
    * SURFACE_ATLAS_CULL_GROUP_SIZE;

pub fn cull_reset(local_idx: u32, shared_count: &mut u32) {
    if local_idx == 0 {
        *shared_count = 0;
    }
}

/// Tests objects `local_idx`, `local_idx + 64`, ... against bounds of the
/// workgroup's block of chunks.
///
/// Objects above the shared cache's capacity are dropped, but still counted
/// into `shared_count`.
pub fn cull_group(
    local_idx: u32,
    group_id: UVec3,
    data: &SurfaceAtlasData,
    objects: &[Vec4],
    object_addresses: &[u32],
    shared_count: &mut u32,
    shared_objects: &mut [u32; SURFACE_ATLAS_SHARED_CULL_SIZE],
) {
    let (min, max) = data.chunks_bounds(
        group_id * SURFACE_ATLAS_CULL_GROUP_SIZE,
        SURFACE_ATLAS_CULL_GROUP_SIZE,
    );

    let mut idx = local_idx;

    while idx < data.objects_count() {
        let addr = unsafe { *object_addresses.index_unchecked(idx as usize) };
        let object = SurfaceAtlasObject::read(objects, addr);

        if sphere_intersects_box(object.center(), object.radius(), min, max) {
            let slot = atomic_add_workgroup(shared_count, 1) as usize;

            if slot < SURFACE_ATLAS_SHARED_CULL_SIZE {
                unsafe {
                    *shared_objects.index_unchecked_mut(slot) = addr;
                }
            }
        }

        idx += SURFACE_ATLAS_CULL_GROUP_THREADS;
    }
}

/// Tests cached objects against given chunk and stores the survivors.
///
/// `culled_objects[0]` is the allocation counter; each non-empty chunk gets
/// `[count, addr, addr, ...]` and `culled_chunks[chunk]` points at it. Empty
/// chunks and chunks that don't fit within the buffer get zero.
#[allow(clippy::too_many_arguments)]
pub fn cull_chunk(
    chunk: UVec3,
    data: &SurfaceAtlasData,
    objects: &[Vec4],
    shared_count: u32,
    shared_objects: &[u32; SURFACE_ATLAS_SHARED_CULL_SIZE],
    culled_chunks: &mut [u32],
    culled_objects: &mut [u32],
) {
    let res = data.chunk_resolution();

    if chunk.x >= res || chunk.y >= res || chunk.z >= res {
        return;
    }

    let (min, max) = data.chunks_bounds(chunk, 1);
    let cached = shared_count.min(SURFACE_ATLAS_SHARED_CULL_SIZE as u32);

    let mut count = 0;
    let mut idx = 0;

    while idx < cached {
        let addr = unsafe { *shared_objects.index_unchecked(idx as usize) };
        let object = SurfaceAtlasObject::read(objects, addr);

        if sphere_intersects_box(object.center(), object.radius(), min, max) {
            count += 1;
        }

        idx += 1;
    }

    let chunk_addr = data.chunk_address(chunk) as usize;

    if count == 0 {
        unsafe {
            *culled_chunks.index_unchecked_mut(chunk_addr) = 0;
        }

        return;
    }

    let base = 1 + atomic_add(
        unsafe { culled_objects.index_unchecked_mut(0) },
        count + 1,
    );

    if base + count + 1 > data.culled_objects_capacity() {
        unsafe {
            *culled_chunks.index_unchecked_mut(chunk_addr) = 0;
        }

        return;
    }

    unsafe {
        *culled_chunks.index_unchecked_mut(chunk_addr) = base;
        *culled_objects.index_unchecked_mut(base as usize) = count;
    }

    let mut slot = base + 1;
    let mut idx = 0;

    while idx < cached {
        let addr = unsafe { *shared_objects.index_unchecked(idx as usize) };
        let object = SurfaceAtlasObject::read(objects, addr);

        if sphere_intersects_box(object.center(), object.radius(), min, max) {
            unsafe {
                *culled_objects.index_unchecked_mut(slot as usize) = addr;
            }

            slot += 1;
        }

        idx += 1;
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use glam::{uvec3, uvec4, vec3, vec4, Vec3};

    use super::*;
    use crate::{affine_rows, encode_tile_offsets};

    /// Emulates the culling dispatch, workgroup by workgroup.
    pub(crate) fn cull_dispatch(
        data: &SurfaceAtlasData,
        objects: &[Vec4],
        object_addresses: &[u32],
    ) -> (Vec<u32>, Vec<u32>) {
        let mut culled_chunks = vec![u32::MAX; data.chunks_count() as usize];
        let mut culled_objects = vec![0; data.culled_objects_capacity() as usize];
        let groups = data.chunk_resolution() / SURFACE_ATLAS_CULL_GROUP_SIZE;

        for gz in 0..groups {
            for gy in 0..groups {
                for gx in 0..groups {
                    let group_id = uvec3(gx, gy, gz);
                    let mut shared_count = 123;
                    let mut shared_objects = [0; SURFACE_ATLAS_SHARED_CULL_SIZE];

                    for local_idx in 0..SURFACE_ATLAS_CULL_GROUP_THREADS {
                        cull_reset(local_idx, &mut shared_count);
                    }

                    for local_idx in 0..SURFACE_ATLAS_CULL_GROUP_THREADS {
                        cull_group(
                            local_idx,
                            group_id,
                            data,
                            objects,
                            object_addresses,
                            &mut shared_count,
                            &mut shared_objects,
                        );
                    }

                    for local_idx in 0..SURFACE_ATLAS_CULL_GROUP_THREADS {
                        let local_id = uvec3(
                            local_idx % 4,
                            (local_idx / 4) % 4,
                            local_idx / 16,
                        );

                        cull_chunk(
                            group_id * SURFACE_ATLAS_CULL_GROUP_SIZE + local_id,
                            data,
                            objects,
                            shared_count,
                            &shared_objects,
                            &mut culled_chunks,
                            &mut culled_objects,
                        );
                    }
                }
            }
        }

        (culled_chunks, culled_objects)
    }

    /// Builds objects buffer out of spheres (without any tiles).
    pub(crate) fn objects(spheres: &[Vec4]) -> (Vec<Vec4>, Vec<u32>) {
        let mut objects = Vec::new();
        let mut addresses = Vec::new();

        for &sphere in spheres {
            let object = SurfaceAtlasObject {
                bounds: sphere,
                tile_offsets: encode_tile_offsets([0; 6]),
                world_to_local: affine_rows(
                    glam::Affine3A::from_translation(-sphere.truncate()),
                ),
                extent: Vec3::splat(sphere.w),
            };

            addresses.push(objects.len() as u32);
            objects.extend(object.encode(6));
        }

        (objects, addresses)
    }

    fn data(objects_count: u32, capacity: u32) -> SurfaceAtlasData {
        SurfaceAtlasData {
            view_pos: vec4(0.0, 0.0, 0.0, 100.0),
            params: uvec4(512, 8, objects_count, capacity),
            flags: glam::UVec4::ZERO,
        }
    }

    #[test]
    fn cull() {
        let (objects, addresses) = objects(&[
            vec4(50.0, 50.0, 50.0, 10.0),
            vec4(0.0, 0.0, 0.0, 10.0),
            vec4(-350.0, 350.0, -350.0, 20.0),
        ]);

        let data = data(3, 1024);
        let (chunks, culled) = cull_dispatch(&data, &objects, &addresses);

        let lookup = |pos: Vec3| -> Vec<u32> {
            let addr = chunks[data.chunk_address(data.chunk_coords(pos)) as usize];

            if addr == 0 {
                return Vec::new();
            }

            let count = culled[addr as usize] as usize;

            culled[addr as usize + 1..addr as usize + 1 + count].to_vec()
        };

        assert!(chunks.iter().all(|&chunk| chunk != u32::MAX));

        assert_eq!(vec![addresses[0], addresses[1]], lookup(vec3(50.0, 50.0, 50.0)));
        assert_eq!(vec![addresses[1]], lookup(vec3(-50.0, -50.0, -50.0)));
        assert_eq!(vec![addresses[2]], lookup(vec3(-350.0, 350.0, -350.0)));
        assert_eq!(Vec::<u32>::new(), lookup(vec3(250.0, 250.0, 250.0)));

        // Sphere at the origin touches the 8 chunks around it, the other
        // ones touch a single chunk each
        let total: u32 = chunks
            .iter()
            .filter(|&&chunk| chunk != 0)
            .map(|&chunk| culled[chunk as usize])
            .sum();

        assert_eq!(10, total);
        assert_eq!(10 + 9, culled[0]);
    }

    #[test]
    fn shared_cache_overflow_keeps_first_objects() {
        let spheres = vec![vec4(50.0, 50.0, 50.0, 1.0); SURFACE_ATLAS_SHARED_CULL_SIZE + 45];
        let (objects, addresses) = objects(&spheres);
        let data = data(spheres.len() as u32, 4096);

        let mut shared_count = 0;
        let mut shared_objects = [0; SURFACE_ATLAS_SHARED_CULL_SIZE];

        for local_idx in 0..SURFACE_ATLAS_CULL_GROUP_THREADS {
            cull_group(
                local_idx,
                uvec3(1, 1, 1),
                &data,
                &objects,
                &addresses,
                &mut shared_count,
                &mut shared_objects,
            );
        }

        assert_eq!(spheres.len() as u32, shared_count);

        let (chunks, culled) = cull_dispatch(&data, &objects, &addresses);
        let addr = chunks[data.chunk_address(data.chunk_coords(vec3(50.0, 50.0, 50.0))) as usize];

        assert_ne!(0, addr);
        assert_eq!(SURFACE_ATLAS_SHARED_CULL_SIZE as u32, culled[addr as usize]);
        assert_eq!(SURFACE_ATLAS_SHARED_CULL_SIZE as u32 + 1, culled[0]);
    }

    #[test]
    fn overflow_yields_empty_chunks() {
        let (objects, addresses) = objects(&[vec4(0.0, 0.0, 0.0, 10.0)]);

        // Room for the counter and just three chunks
        let data = data(1, 1 + 3 * 2);
        let (chunks, culled) = cull_dispatch(&data, &objects, &addresses);

        let non_empty: Vec<_> = chunks.iter().filter(|&&chunk| chunk != 0).collect();

        assert_eq!(3, non_empty.len());

        for &&chunk in &non_empty {
            assert_eq!(1, culled[chunk as usize]);
            assert_eq!(addresses[0], culled[chunk as usize + 1]);
        }

        // The counter keeps going though, telling how much room was missing
        assert_eq!(8 * 2, culled[0]);
    }
}
