use std::fmt::Debug;
use std::hash::Hash;
use std::mem;

use derivative::Derivative;
use fxhash::FxHashMap;
use glam::{uvec2, vec3, vec4, Affine3A, Mat3A, UVec2, Vec3, Vec3A, Vec4};
use guillotiere::{size2, Allocation, AtlasAllocator};
use log::{trace, warn};

use crate::gpu;

const TILES: usize = gpu::SURFACE_ATLAS_TILES_PER_OBJECT;

/// Size of the largest possible object record, in words.
pub const SURFACE_ATLAS_MAX_RECORD_SIZE: u32 = gpu::SURFACE_ATLAS_OBJECT_SIZE
    + (TILES as u32) * gpu::SURFACE_ATLAS_TILE_SIZE;

/// Identifier of an object registered in the surface atlas.
pub trait ObjectId: Clone + Debug + Eq + Hash {}

impl<T> ObjectId for T where T: Clone + Debug + Eq + Hash {}

/// Object, as seen by the surface atlas: an oriented box with up to six
/// tiles, one per side.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SurfaceAtlasObjectDesc {
    /// Transforms the object's local space into world space
    pub transform: Affine3A,

    /// Half-size of the object's box, in local space
    pub extent: Vec3,

    /// Size, in texels, of the tile capturing each side of the object (in
    /// order: `+X`, `-X`, `+Y`, `-Y`, `+Z`, `-Z`); zero means no tile
    pub tile_sizes: [UVec2; TILES],
}

impl SurfaceAtlasObjectDesc {
    /// Creates an object with all six tiles, sized so that each covers its
    /// side with given texel density (texels per world unit).
    pub fn with_density(
        transform: Affine3A,
        extent: Vec3,
        density: f32,
        max_tile_size: u32,
    ) -> Self {
        let mut tile_sizes = [UVec2::ZERO; TILES];

        for (dir, tile_size) in tile_sizes.iter_mut().enumerate() {
            let (right, up, _) = tile_basis(dir as u32);

            let side = |axis: Vec3| {
                let world = transform.transform_vector3(axis * extent);
                let texels = (2.0 * world.length() * density).ceil() as u32;

                texels.clamp(1, max_tile_size)
            };

            *tile_size = uvec2(side(right), side(up));
        }

        Self {
            transform,
            extent,
            tile_sizes,
        }
    }
}

/// Tile that has been (re)allocated or whose object has moved, and so needs
/// to be rasterized again.
#[derive(Clone, Debug, PartialEq)]
pub struct DirtyTile<K> {
    pub object: K,

    /// See: [`SurfaceAtlasObjectDesc::tile_sizes`]
    pub direction: u32,

    /// Top-left texel of the tile inside the atlas
    pub origin: UVec2,

    /// Size of the tile, in texels
    pub size: UVec2,

    /// Transforms world space into the tile's view space, where the view
    /// looks towards `+Z`, xy span `-bounds / 2 ..= bounds / 2` and z spans
    /// `0 ..= bounds.z` (mapped to depth `0.0 ..= 1.0`)
    pub world_to_tile: Affine3A,

    pub view_bounds: Vec3,
}

/// Object records and lists, ready to be uploaded to the GPU.
#[derive(Clone, Debug, Default)]
pub struct SerializedSurfaceAtlas {
    /// Object records, each followed by its tiles
    pub objects: Vec<Vec4>,

    /// Address of each object's record
    pub addresses: Vec<u32>,

    /// Address of each tile's record
    pub tiles: Vec<u32>,

    /// Size of the largest tile, in texels
    pub max_tile_size: u32,
}

/// Registry of objects participating in the surface atlas, along with the
/// allocation of their tiles within the shared atlas texture.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct SurfaceAtlas<K>
where
    K: ObjectId,
{
    #[derivative(Debug = "ignore")]
    allocator: AtlasAllocator,
    resolution: u32,
    max_objects: u32,
    objects: FxHashMap<K, SurfaceAtlasEntry>,
    dirty_tiles: Vec<(K, u32)>,
    dirty: bool,
}

#[derive(Clone, Debug)]
struct SurfaceAtlasEntry {
    desc: SurfaceAtlasObjectDesc,
    tiles: [Option<Allocation>; TILES],
}

impl<K> SurfaceAtlas<K>
where
    K: ObjectId,
{
    pub fn new(resolution: u32, max_objects: u32) -> Self {
        Self {
            allocator: AtlasAllocator::new(size2(
                resolution as i32,
                resolution as i32,
            )),
            resolution,
            max_objects,
            objects: Default::default(),
            dirty_tiles: Default::default(),
            dirty: true,
        }
    }

    pub fn resolution(&self) -> u32 {
        self.resolution
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Whether objects have changed since the last [`Self::serialize()`].
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Creates or updates given object.
    ///
    /// Tiles get re-allocated only when their sizes change; an object that
    /// just moves keeps its tiles, which get marked for re-rasterization.
    pub fn set_object(&mut self, id: K, desc: SurfaceAtlasObjectDesc) {
        if let Some(entry) = self.objects.get_mut(&id) {
            if entry.desc == desc {
                return;
            }

            trace!("Updating object `{id:?}`");

            if entry.desc.tile_sizes != desc.tile_sizes {
                for tile in entry.tiles.iter_mut() {
                    if let Some(tile) = tile.take() {
                        self.allocator.deallocate(tile.id);
                    }
                }

                entry.tiles =
                    allocate_tiles(&mut self.allocator, &id, &desc.tile_sizes);
            }

            entry.desc = desc;
        } else {
            if self.objects.len() >= self.max_objects as usize {
                warn!(
                    "Cannot add object `{id:?}` - reached the limit of {} objects",
                    self.max_objects
                );
                return;
            }

            trace!("Adding object `{id:?}`");

            let tiles =
                allocate_tiles(&mut self.allocator, &id, &desc.tile_sizes);

            self.objects
                .insert(id.clone(), SurfaceAtlasEntry { desc, tiles });
        }

        self.mark_tiles_dirty(&id);
        self.dirty = true;
    }

    pub fn remove_object(&mut self, id: &K) {
        let Some(entry) = self.objects.remove(id) else {
            return;
        };

        trace!("Removing object `{id:?}`");

        for tile in entry.tiles.into_iter().flatten() {
            self.allocator.deallocate(tile.id);
        }

        self.dirty_tiles.retain(|(object, _)| object != id);
        self.dirty = true;
    }

    /// Changes the atlas' size, re-allocating all tiles.
    pub fn reconfigure(&mut self, resolution: u32, max_objects: u32) {
        self.allocator =
            AtlasAllocator::new(size2(resolution as i32, resolution as i32));

        self.resolution = resolution;
        self.max_objects = max_objects;
        self.dirty_tiles.clear();
        self.dirty = true;

        let ids: Vec<_> = self.objects.keys().cloned().collect();

        for id in ids {
            if let Some(entry) = self.objects.get_mut(&id) {
                entry.tiles = allocate_tiles(
                    &mut self.allocator,
                    &id,
                    &entry.desc.tile_sizes,
                );
            }

            self.mark_tiles_dirty(&id);
        }
    }

    /// Returns tiles that have to be rasterized again by the producer of the
    /// atlas' textures, clearing the list.
    pub fn dirty_tiles(&mut self) -> Vec<DirtyTile<K>> {
        mem::take(&mut self.dirty_tiles)
            .into_iter()
            .filter_map(|(object, direction)| {
                let entry = self.objects.get(&object)?;
                let tile = entry.tiles[direction as usize]?;
                let (world_to_tile, view_bounds) =
                    tile_view(&entry.desc, direction);

                Some(DirtyTile {
                    object,
                    direction,
                    origin: uvec2(
                        tile.rectangle.min.x as u32,
                        tile.rectangle.min.y as u32,
                    ),
                    size: entry.desc.tile_sizes[direction as usize],
                    world_to_tile,
                    view_bounds,
                })
            })
            .collect()
    }

    pub fn serialize(&mut self) -> SerializedSurfaceAtlas {
        self.dirty = false;

        let mut out = SerializedSurfaceAtlas::default();

        for entry in self.objects.values() {
            let addr = out.objects.len() as u32;
            let mut tile_offsets = [0; TILES];
            let mut tiles = Vec::new();
            let mut offset = gpu::SURFACE_ATLAS_OBJECT_SIZE;

            for (dir, tile) in entry.tiles.iter().enumerate() {
                let Some(tile) = tile else {
                    continue;
                };

                let size = entry.desc.tile_sizes[dir];
                let (world_to_tile, view_bounds) =
                    tile_view(&entry.desc, dir as u32);

                let tile = gpu::SurfaceAtlasTile {
                    atlas_rect: vec4(
                        tile.rectangle.min.x as f32,
                        tile.rectangle.min.y as f32,
                        size.x as f32,
                        size.y as f32,
                    ) / (self.resolution as f32),
                    world_to_local: gpu::affine_rows(world_to_tile),
                    view_bounds,
                };

                tile_offsets[dir] = offset;
                tiles.push(tile);
                out.tiles.push(addr + offset);
                out.max_tile_size = out.max_tile_size.max(size.max_element());
                offset += gpu::SURFACE_ATLAS_TILE_SIZE;
            }

            let object = gpu::SurfaceAtlasObject {
                bounds: bounding_sphere(&entry.desc),
                tile_offsets: gpu::encode_tile_offsets(tile_offsets),
                world_to_local: gpu::affine_rows(entry.desc.transform.inverse()),
                extent: entry.desc.extent,
            };

            out.objects.extend(object.encode(offset));

            for tile in tiles {
                out.objects.extend(tile.encode());
            }

            out.addresses.push(addr);
        }

        if out.addresses.len() > gpu::SURFACE_ATLAS_SHARED_CULL_SIZE {
            warn!(
                "Surface atlas has {} objects, but culling caches up to {} \
                 objects per block of chunks; crowded blocks will miss some",
                out.addresses.len(),
                gpu::SURFACE_ATLAS_SHARED_CULL_SIZE,
            );
        }

        out
    }

    fn mark_tiles_dirty(&mut self, id: &K) {
        let Some(entry) = self.objects.get(id) else {
            return;
        };

        self.dirty_tiles.retain(|(object, _)| object != id);

        for (dir, tile) in entry.tiles.iter().enumerate() {
            if tile.is_some() {
                self.dirty_tiles.push((id.clone(), dir as u32));
            }
        }
    }
}

fn allocate_tiles<K>(
    allocator: &mut AtlasAllocator,
    id: &K,
    sizes: &[UVec2; TILES],
) -> [Option<Allocation>; TILES]
where
    K: ObjectId,
{
    let mut tiles = [None; TILES];

    for (dir, size) in sizes.iter().enumerate() {
        if size.min_element() == 0 {
            continue;
        }

        tiles[dir] = allocator.allocate(size2(size.x as i32, size.y as i32));

        if tiles[dir].is_none() {
            warn!(
                "Cannot allocate tile {dir} of object `{id:?}` ({}x{}) - no \
                 more space in the atlas",
                size.x, size.y,
            );
        }
    }

    tiles
}

/// Returns the axes of given tile's view, in the object's local space:
/// right, up and forward (looking into the object).
fn tile_basis(dir: u32) -> (Vec3, Vec3, Vec3) {
    match dir {
        0 => (Vec3::Z, Vec3::Y, -Vec3::X),
        1 => (-Vec3::Z, Vec3::Y, Vec3::X),
        2 => (Vec3::X, -Vec3::Z, -Vec3::Y),
        3 => (Vec3::X, Vec3::Z, Vec3::Y),
        4 => (-Vec3::X, Vec3::Y, -Vec3::Z),
        _ => (Vec3::X, Vec3::Y, Vec3::Z),
    }
}

/// Returns world-to-tile transform and view bounds of given tile.
fn tile_view(desc: &SurfaceAtlasObjectDesc, dir: u32) -> (Affine3A, Vec3) {
    let (right, up, forward) = tile_basis(dir);
    let extent = |axis: Vec3| axis.abs().dot(desc.extent);

    let tile_from_local = Affine3A {
        matrix3: Mat3A::from_cols(
            Vec3A::from(right),
            Vec3A::from(up),
            Vec3A::from(forward),
        )
        .transpose(),
        translation: Vec3A::new(0.0, 0.0, extent(forward)),
    };

    let view_bounds =
        vec3(extent(right), extent(up), extent(forward)) * 2.0;

    (tile_from_local * desc.transform.inverse(), view_bounds)
}

fn bounding_sphere(desc: &SurfaceAtlasObjectDesc) -> Vec4 {
    let center = desc.transform.translation;
    let mut radius: f32 = 0.0;

    for corner in 0..8 {
        let sign = vec3(
            if corner & 1 == 0 { -1.0 } else { 1.0 },
            if corner & 2 == 0 { -1.0 } else { 1.0 },
            if corner & 4 == 0 { -1.0 } else { 1.0 },
        );

        let corner = desc.transform.transform_vector3(sign * desc.extent);

        radius = radius.max(corner.length());
    }

    Vec3::from(center).extend(radius)
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use glam::{Quat, Vec2, Vec4Swizzles};

    use super::*;

    fn desc(pos: Vec3, tile_size: u32) -> SurfaceAtlasObjectDesc {
        let mut tile_sizes = [UVec2::ZERO; TILES];

        tile_sizes[0] = UVec2::splat(tile_size);
        tile_sizes[2] = UVec2::splat(tile_size);

        SurfaceAtlasObjectDesc {
            transform: Affine3A::from_translation(pos),
            extent: Vec3::ONE,
            tile_sizes,
        }
    }

    #[test]
    fn set_object() {
        let mut target = SurfaceAtlas::new(64, 16);

        target.set_object(1, desc(Vec3::ZERO, 16));

        let tiles = target.dirty_tiles();

        assert_eq!(2, tiles.len());
        assert_eq!((1, 0), (tiles[0].object, tiles[0].direction));
        assert_eq!((1, 2), (tiles[1].object, tiles[1].direction));
        assert_eq!(UVec2::splat(16), tiles[0].size);
        assert!(target.dirty_tiles().is_empty());

        // Setting the same object again is a no-op
        target.serialize();
        target.set_object(1, desc(Vec3::ZERO, 16));

        assert!(!target.is_dirty());
        assert!(target.dirty_tiles().is_empty());
    }

    #[test]
    fn moved_object_keeps_its_tiles() {
        let mut target = SurfaceAtlas::new(64, 16);

        target.set_object(1, desc(Vec3::ZERO, 16));

        let before = target.dirty_tiles();

        target.set_object(1, desc(Vec3::X, 16));

        let after = target.dirty_tiles();

        assert!(target.is_dirty());
        assert_eq!(2, after.len());
        assert_eq!(before[0].origin, after[0].origin);
        assert_eq!(before[1].origin, after[1].origin);
        assert_ne!(before[0].world_to_tile, after[0].world_to_tile);
    }

    #[test]
    fn resized_object_gets_new_tiles() {
        let mut target = SurfaceAtlas::new(64, 16);

        // Fills the entire atlas
        target.set_object(1, desc(Vec3::ZERO, 32));
        target.set_object(2, desc(Vec3::ZERO, 32));
        target.dirty_tiles();

        target.set_object(1, desc(Vec3::ZERO, 8));

        let tiles = target.dirty_tiles();

        assert_eq!(2, tiles.len());
        assert!(tiles.iter().all(|tile| tile.object == 1));
        assert!(tiles.iter().all(|tile| tile.size == UVec2::splat(8)));
    }

    #[test]
    fn full_atlas() {
        let mut target = SurfaceAtlas::new(64, 16);

        target.set_object(1, desc(Vec3::ZERO, 32));
        target.set_object(2, desc(Vec3::ZERO, 32));
        target.set_object(3, desc(Vec3::ZERO, 32));

        let tiles = target.dirty_tiles();

        assert_eq!(4, tiles.len());
        assert!(tiles.iter().all(|tile| tile.object != 3));

        // Object without tiles is still registered
        let atlas = target.serialize();

        assert_eq!(3, atlas.addresses.len());
        assert_eq!(4, atlas.tiles.len());

        // ... and removing another object makes room for it
        target.remove_object(&1);
        target.set_object(3, desc(Vec3::ZERO, 16));

        let tiles = target.dirty_tiles();

        assert_eq!(2, tiles.len());
        assert!(tiles.iter().all(|tile| tile.object == 3));
    }

    #[test]
    fn max_objects() {
        let mut target = SurfaceAtlas::new(64, 2);

        target.set_object(1, desc(Vec3::ZERO, 4));
        target.set_object(2, desc(Vec3::ZERO, 4));
        target.set_object(3, desc(Vec3::ZERO, 4));

        assert_eq!(2, target.len());
    }

    #[test]
    fn reconfigure() {
        let mut target = SurfaceAtlas::new(64, 16);

        target.set_object(1, desc(Vec3::ZERO, 16));
        target.serialize();
        target.dirty_tiles();
        target.reconfigure(128, 16);

        assert!(target.is_dirty());
        assert_eq!(2, target.dirty_tiles().len());
        assert_eq!(128, target.resolution());
    }

    #[test]
    fn serialize() {
        let mut target = SurfaceAtlas::new(64, 16);

        target.set_object(
            1,
            SurfaceAtlasObjectDesc {
                transform: Affine3A::from_scale_rotation_translation(
                    Vec3::splat(2.0),
                    Quat::IDENTITY,
                    vec3(10.0, 0.0, 0.0),
                ),
                ..desc(Vec3::ZERO, 16)
            },
        );

        let atlas = target.serialize();

        assert!(!target.is_dirty());
        assert_eq!(vec![0], atlas.addresses);
        assert_eq!(16, atlas.max_tile_size);
        assert_eq!(36, SURFACE_ATLAS_MAX_RECORD_SIZE);

        assert_eq!(
            (gpu::SURFACE_ATLAS_OBJECT_SIZE + 2 * gpu::SURFACE_ATLAS_TILE_SIZE)
                as usize,
            atlas.objects.len(),
        );

        let object = gpu::SurfaceAtlasObject::read(&atlas.objects, 0);

        assert_relative_eq!(10.0, object.center().x);
        assert_relative_eq!(2.0 * 3.0f32.sqrt(), object.radius(), epsilon = 1e-5);
        assert_eq!(gpu::SURFACE_ATLAS_OBJECT_SIZE, object.tile_offset(0));
        assert_eq!(0, object.tile_offset(1));

        assert_eq!(
            gpu::SURFACE_ATLAS_OBJECT_SIZE + gpu::SURFACE_ATLAS_TILE_SIZE,
            object.tile_offset(2)
        );

        assert!(object
            .to_local(vec3(12.0, 2.0, -2.0))
            .abs_diff_eq(vec3(1.0, 1.0, -1.0), 1e-5));

        assert_eq!(
            vec![object.tile_offset(0), object.tile_offset(2)],
            atlas.tiles,
        );

        // The `+X` tile looks at the object from its `+X` side
        let tile = gpu::SurfaceAtlasTile::read(&atlas.objects, atlas.tiles[0]);

        assert!(tile.view_bounds.abs_diff_eq(Vec3::splat(2.0), 1e-5));
        assert!(tile.atlas_rect.zw().abs_diff_eq(Vec2::splat(0.25), 1e-5));

        assert!(tile
            .to_local(vec3(12.0, 0.0, 0.0))
            .abs_diff_eq(Vec3::ZERO, 1e-5));

        assert!(tile
            .to_local(vec3(8.0, 0.0, 0.0))
            .abs_diff_eq(vec3(0.0, 0.0, 2.0), 1e-5));

        assert!(tile
            .to_local_dir(-Vec3::X)
            .normalize()
            .abs_diff_eq(Vec3::Z, 1e-5));
    }

    #[test]
    fn dirty_tile_texels_land_on_the_object() {
        let mut target = SurfaceAtlas::new(64, 16);

        target.set_object(1, desc(vec3(0.0, 5.0, 0.0), 16));

        let atlas = target.serialize();
        let tiles = target.dirty_tiles();

        // `+Y` tile
        let tile = gpu::SurfaceAtlasTile::read(&atlas.objects, atlas.tiles[1]);

        assert_eq!(2, tiles[1].direction);

        let pos = gpu::tile_texel_world_pos(&tile, uvec2(8, 8), tiles[1].size, 0.0);

        // Top side of the object
        assert_relative_eq!(6.0, pos.y, epsilon = 1e-4);
        assert!(pos.x.abs() <= 1.0 && pos.z.abs() <= 1.0);

        let pos = gpu::tile_texel_world_pos(&tile, uvec2(8, 8), tiles[1].size, 1.0);

        // Bottom side of the object
        assert_relative_eq!(4.0, pos.y, epsilon = 1e-4);
    }

    #[test]
    fn with_density() {
        let desc = SurfaceAtlasObjectDesc::with_density(
            Affine3A::from_scale(vec3(1.0, 2.0, 4.0)),
            Vec3::ONE,
            4.0,
            24,
        );

        // +X side spans z (8 units) by y (4 units)
        assert_eq!(uvec2(24, 16), desc.tile_sizes[0]);

        // +Y side spans x (2 units) by z (8 units)
        assert_eq!(uvec2(8, 24), desc.tile_sizes[2]);
    }
}
