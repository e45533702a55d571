use glam::{vec4, Affine3A, UVec3, Vec3, Vec4, Vec4Swizzles};
use spirv_std::arch::IndexUnchecked;

use crate::U32Ext;

/// Size of object's header, in words (`Vec4`s).
pub const SURFACE_ATLAS_OBJECT_SIZE: u32 = 6;

/// Size of a single tile, in words (`Vec4`s).
pub const SURFACE_ATLAS_TILE_SIZE: u32 = 5;

/// Maximum number of tiles per object, one per each axis direction:
/// `+X`, `-X`, `+Y`, `-Y`, `+Z`, `-Z`.
pub const SURFACE_ATLAS_TILES_PER_OBJECT: usize = 6;

/// Object registered in the surface atlas.
///
/// Serialized as:
///
/// - `[0]` - bounding sphere (center + radius),
/// - `[1]` - tile offsets packed as six u16 (x, y, z) and record size (w),
/// - `[2..5]` - world-to-local transform, as rows,
/// - `[5]` - extent of the local-space box (xyz),
///
/// ... followed by the object's tiles (see [`SurfaceAtlasTile`]).
#[derive(Clone, Copy, Default)]
#[cfg_attr(not(target_arch = "spirv"), derive(Debug))]
pub struct SurfaceAtlasObject {
    pub bounds: Vec4,
    pub tile_offsets: UVec3,
    pub world_to_local: [Vec4; 3],
    pub extent: Vec3,
}

impl SurfaceAtlasObject {
    pub fn read(objects: &[Vec4], addr: u32) -> Self {
        let d0 = read(objects, addr);
        let d1 = read(objects, addr + 1);

        Self {
            bounds: d0,
            tile_offsets: UVec3::new(
                d1.x.to_bits(),
                d1.y.to_bits(),
                d1.z.to_bits(),
            ),
            world_to_local: [
                read(objects, addr + 2),
                read(objects, addr + 3),
                read(objects, addr + 4),
            ],
            extent: read(objects, addr + 5).xyz(),
        }
    }

    pub fn center(&self) -> Vec3 {
        self.bounds.xyz()
    }

    pub fn radius(&self) -> f32 {
        self.bounds.w
    }

    /// Returns offset (relative to the object's address) of the tile facing
    /// given direction; zero if there's no such tile.
    pub fn tile_offset(&self, dir: u32) -> u32 {
        let word = match dir / 2 {
            0 => self.tile_offsets.x,
            1 => self.tile_offsets.y,
            _ => self.tile_offsets.z,
        };

        let [lo, hi] = word.to_u16_pair();

        if dir % 2 == 0 {
            lo
        } else {
            hi
        }
    }

    pub fn to_local(&self, pos: Vec3) -> Vec3 {
        transform_point(self.world_to_local, pos)
    }

    pub fn to_local_dir(&self, dir: Vec3) -> Vec3 {
        transform_vector(self.world_to_local, dir)
    }

    /// Serializes this object's header; `record_size` is the size of the
    /// entire record (tiles included), in words.
    pub fn encode(&self, record_size: u32) -> [Vec4; SURFACE_ATLAS_OBJECT_SIZE as usize] {
        [
            self.bounds,
            vec4(
                f32::from_bits(self.tile_offsets.x),
                f32::from_bits(self.tile_offsets.y),
                f32::from_bits(self.tile_offsets.z),
                f32::from_bits(record_size),
            ),
            self.world_to_local[0],
            self.world_to_local[1],
            self.world_to_local[2],
            self.extent.extend(0.0),
        ]
    }
}

/// Packs per-direction tile offsets into three words, two u16 per word.
pub fn encode_tile_offsets(offsets: [u32; SURFACE_ATLAS_TILES_PER_OBJECT]) -> UVec3 {
    UVec3::new(
        u32::from_u16_pair(offsets[0], offsets[1]),
        u32::from_u16_pair(offsets[2], offsets[3]),
        u32::from_u16_pair(offsets[4], offsets[5]),
    )
}

/// Single directional tile of an object - an orthographic snapshot of the
/// object as seen from one side, kept in a rectangle of the atlas.
///
/// Serialized as:
///
/// - `[0]` - atlas rectangle, in UV (offset in xy, size in zw),
/// - `[1..4]` - world-to-local transform of the tile's view, as rows,
/// - `[4]` - size of the tile's view volume (xyz).
///
/// In the tile's local space the view looks towards `+Z`; xy span
/// `-size / 2 ..= size / 2` and z spans `0 ..= size.z`.
#[derive(Clone, Copy, Default)]
#[cfg_attr(not(target_arch = "spirv"), derive(Debug))]
pub struct SurfaceAtlasTile {
    pub atlas_rect: Vec4,
    pub world_to_local: [Vec4; 3],
    pub view_bounds: Vec3,
}

impl SurfaceAtlasTile {
    pub fn read(objects: &[Vec4], addr: u32) -> Self {
        Self {
            atlas_rect: read(objects, addr),
            world_to_local: [
                read(objects, addr + 1),
                read(objects, addr + 2),
                read(objects, addr + 3),
            ],
            view_bounds: read(objects, addr + 4).xyz(),
        }
    }

    pub fn to_local(&self, pos: Vec3) -> Vec3 {
        transform_point(self.world_to_local, pos)
    }

    pub fn to_local_dir(&self, dir: Vec3) -> Vec3 {
        transform_vector(self.world_to_local, dir)
    }

    pub fn encode(&self) -> [Vec4; SURFACE_ATLAS_TILE_SIZE as usize] {
        [
            self.atlas_rect,
            self.world_to_local[0],
            self.world_to_local[1],
            self.world_to_local[2],
            self.view_bounds.extend(0.0),
        ]
    }
}

/// Returns the direction a tile's view looks from, i.e. the outward normal of
/// the object's side captured by given tile.
pub fn tile_direction(dir: u32) -> Vec3 {
    let sign = if dir % 2 == 0 { 1.0 } else { -1.0 };

    match dir / 2 {
        0 => Vec3::new(sign, 0.0, 0.0),
        1 => Vec3::new(0.0, sign, 0.0),
        _ => Vec3::new(0.0, 0.0, sign),
    }
}

/// Encodes given transform as three rows of a 3x4 matrix.
pub fn affine_rows(xform: Affine3A) -> [Vec4; 3] {
    let m = xform.matrix3;
    let t = xform.translation;

    [
        vec4(m.x_axis.x, m.y_axis.x, m.z_axis.x, t.x),
        vec4(m.x_axis.y, m.y_axis.y, m.z_axis.y, t.y),
        vec4(m.x_axis.z, m.y_axis.z, m.z_axis.z, t.z),
    ]
}

pub fn transform_point(rows: [Vec4; 3], pos: Vec3) -> Vec3 {
    let pos = pos.extend(1.0);

    Vec3::new(rows[0].dot(pos), rows[1].dot(pos), rows[2].dot(pos))
}

pub fn transform_vector(rows: [Vec4; 3], dir: Vec3) -> Vec3 {
    Vec3::new(
        rows[0].xyz().dot(dir),
        rows[1].xyz().dot(dir),
        rows[2].xyz().dot(dir),
    )
}

fn read(objects: &[Vec4], addr: u32) -> Vec4 {
    unsafe { *objects.index_unchecked(addr as usize) }
}

#[cfg(test)]
mod tests {
    use glam::{vec3, Quat};

    use super::*;

    #[test]
    fn serialization() {
        let xform = Affine3A::from_rotation_translation(
            Quat::from_rotation_y(0.7),
            vec3(1.0, 2.0, 3.0),
        )
        .inverse();

        let object = SurfaceAtlasObject {
            bounds: vec4(1.0, 2.0, 3.0, 4.0),
            tile_offsets: encode_tile_offsets([6, 0, 11, 16, 0, 21]),
            world_to_local: affine_rows(xform),
            extent: vec3(1.0, 2.0, 3.0),
        };

        let tile = SurfaceAtlasTile {
            atlas_rect: vec4(0.25, 0.5, 0.125, 0.0625),
            world_to_local: affine_rows(Affine3A::IDENTITY),
            view_bounds: vec3(2.0, 4.0, 6.0),
        };

        let mut objects = vec![Vec4::ZERO; 3];

        objects.extend(object.encode(11));
        objects.extend(tile.encode());

        let actual = SurfaceAtlasObject::read(&objects, 3);

        assert_eq!(object.bounds, actual.bounds);
        assert_eq!(object.extent, actual.extent);
        assert_eq!(11, objects[4].w.to_bits());

        for (dir, offset) in [6, 0, 11, 16, 0, 21].into_iter().enumerate() {
            assert_eq!(offset, actual.tile_offset(dir as u32));
        }

        let actual_tile = SurfaceAtlasTile::read(&objects, 3 + actual.tile_offset(0));

        assert_eq!(tile.atlas_rect, actual_tile.atlas_rect);
        assert_eq!(tile.view_bounds, actual_tile.view_bounds);
    }

    #[test]
    fn transforms() {
        let world_to_local = Affine3A::from_rotation_translation(
            Quat::from_rotation_z(1.2),
            vec3(-5.0, 4.0, 0.5),
        );

        let rows = affine_rows(world_to_local);

        for pos in [Vec3::ZERO, vec3(1.0, -2.0, 3.0), vec3(-40.0, 0.5, 7.0)] {
            let expected = world_to_local.transform_point3(pos);

            assert!(expected.abs_diff_eq(transform_point(rows, pos), 1e-4));

            let expected = world_to_local.transform_vector3(pos);

            assert!(expected.abs_diff_eq(transform_vector(rows, pos), 1e-4));
        }
    }

    #[test]
    fn tile_direction() {
        assert_eq!(Vec3::X, super::tile_direction(0));
        assert_eq!(-Vec3::X, super::tile_direction(1));
        assert_eq!(Vec3::Y, super::tile_direction(2));
        assert_eq!(-Vec3::Y, super::tile_direction(3));
        assert_eq!(Vec3::Z, super::tile_direction(4));
        assert_eq!(-Vec3::Z, super::tile_direction(5));
    }
}
