use glam::{vec3, Vec2, Vec3, Vec3Swizzles, Vec4, Vec4Swizzles};
use spirv_std::arch::IndexUnchecked;
#[cfg(target_arch = "spirv")]
use spirv_std::num_traits::Float;

use crate::{
    bilinear_weights, F32Ext, SurfaceAtlasData, SurfaceAtlasObject,
    SurfaceAtlasTile, Texels, SURFACE_ATLAS_TILES_PER_OBJECT,
    SURFACE_ATLAS_TILE_NORMAL_THRESHOLD,
};

/// Read-side of the surface atlas: recovers lighting of the surface at given
/// world-space point out of the objects' tiles.
#[derive(Clone, Copy)]
pub struct SurfaceAtlasView<'a> {
    data: &'a SurfaceAtlasData,
    objects: &'a [Vec4],
    culled_chunks: &'a [u32],
    culled_objects: &'a [u32],
    depth: Texels<'a, f32>,
    lighting: Texels<'a, Vec4>,
}

impl<'a> SurfaceAtlasView<'a> {
    pub fn new(
        data: &'a SurfaceAtlasData,
        objects: &'a [Vec4],
        culled_chunks: &'a [u32],
        culled_objects: &'a [u32],
        depth: Texels<'a, f32>,
        lighting: Texels<'a, Vec4>,
    ) -> Self {
        Self {
            data,
            objects,
            culled_chunks,
            culled_objects,
            depth,
            lighting,
        }
    }

    /// Returns lighting (xyz) and its confidence (w) at given point.
    ///
    /// `threshold` is the tolerance (in world units) used when comparing the
    /// point against objects' bounds and tiles' depth.
    pub fn sample(&self, pos: Vec3, normal: Vec3, threshold: f32) -> Vec4 {
        let chunk = self.data.chunk_coords(pos);
        let chunk_addr = self.data.chunk_address(chunk);
        let addr = unsafe { *self.culled_chunks.index_unchecked(chunk_addr as usize) };

        if addr == 0 {
            return Vec4::ZERO;
        }

        let count = unsafe { *self.culled_objects.index_unchecked(addr as usize) };

        // Guards against chunks read while being rebuilt (e.g. when the view
        // moves fast); not a proof that the data is sound
        if count > self.data.objects_count() {
            return Vec4::ZERO;
        }

        let mut result = Vec4::ZERO;
        let mut has_objects = false;
        let mut idx = 0;

        while idx < count {
            let object_addr = unsafe {
                *self
                    .culled_objects
                    .index_unchecked((addr + 1 + idx) as usize)
            };

            idx += 1;

            let object = SurfaceAtlasObject::read(self.objects, object_addr);

            if pos.distance(object.center()) > object.radius() + threshold {
                continue;
            }

            let local_pos = object.to_local(pos).abs();

            if local_pos.cmpgt(object.extent + threshold).any() {
                continue;
            }

            has_objects = true;
            result += self.sample_object(object, object_addr, pos, normal, threshold);
        }

        if !has_objects {
            return Vec4::ZERO;
        }

        let mut color = result.xyz() / result.w.max(0.0001);

        if self.data.is_debug() && result.w < 0.5 {
            color = vec3(1.0, 0.0, 1.0);
        }

        color.extend(result.w)
    }

    fn sample_object(
        &self,
        object: SurfaceAtlasObject,
        object_addr: u32,
        pos: Vec3,
        normal: Vec3,
        threshold: f32,
    ) -> Vec4 {
        let local_normal = object.to_local_dir(normal).normalize_or_zero();
        let mut result = Vec4::ZERO;
        let mut dir = 0;

        while dir < SURFACE_ATLAS_TILES_PER_OBJECT as u32 {
            let tile_offset = object.tile_offset(dir);
            let component = axis(local_normal, dir / 2);

            let normal_weight = if self.data.sample_all_tiles() {
                1.0
            } else if (component > 0.0) == (dir % 2 == 0) {
                component.sqr()
            } else {
                0.0
            };

            let is_sampled = tile_offset != 0
                && (self.data.sample_all_tiles()
                    || normal_weight > SURFACE_ATLAS_TILE_NORMAL_THRESHOLD);

            if is_sampled {
                let tile =
                    SurfaceAtlasTile::read(self.objects, object_addr + tile_offset);

                result +=
                    self.sample_tile(tile, pos, normal, normal_weight, threshold);
            }

            dir += 1;
        }

        result
    }

    /// Returns weighted lighting (xyz) and the weight (w) of given tile.
    pub fn sample_tile(
        &self,
        tile: SurfaceAtlasTile,
        pos: Vec3,
        normal: Vec3,
        normal_weight: f32,
        threshold: f32,
    ) -> Vec4 {
        let tile_normal = tile.to_local_dir(normal).normalize_or_zero();
        let tile_weight = ((-tile_normal.z).saturate() - 0.2) / 0.8;

        if tile_weight <= 0.0 {
            return Vec4::ZERO;
        }

        let tile_pos = tile.to_local(pos);
        let tile_depth = tile_pos.z / tile.view_bounds.z;

        let mut uv = (tile_pos.xy() / tile.view_bounds.xy() + 0.5)
            .clamp(Vec2::ZERO, Vec2::ONE);

        uv.y = 1.0 - uv.y;
        uv = uv.min(Vec2::splat(0.999999));

        let atlas_uv = uv * tile.atlas_rect.zw() + tile.atlas_rect.xy();
        let atlas_pos = atlas_uv * (self.data.resolution() as f32);

        let (depths, frac) = self.depth.gather(atlas_pos);
        let depth_threshold = 2.0 * threshold / tile.view_bounds.z;

        let visibility = Vec4::new(
            depth_visibility(tile_depth, depths[0], depth_threshold),
            depth_visibility(tile_depth, depths[1], depth_threshold),
            depth_visibility(tile_depth, depths[2], depth_threshold),
            depth_visibility(tile_depth, depths[3], depth_threshold),
        );

        let weights = visibility * bilinear_weights(frac);
        let weight = normal_weight * tile_weight * weights.dot(Vec4::ONE);

        if weight <= 0.0 {
            return Vec4::ZERO;
        }

        let (samples, _) = self.lighting.gather(atlas_pos);

        let lighting = samples[0].xyz() * weights.x
            + samples[1].xyz() * weights.y
            + samples[2].xyz() * weights.z
            + samples[3].xyz() * weights.w;

        (lighting * normal_weight * tile_weight).extend(weight)
    }
}

fn depth_visibility(depth: f32, tile_depth: f32, threshold: f32) -> f32 {
    // Nothing has been rasterized there
    if tile_depth >= 1.0 {
        return 0.0;
    }

    1.0 - (((depth - tile_depth).abs() - threshold) / (0.5 * threshold))
        .saturate()
}

fn axis(v: Vec3, axis: u32) -> f32 {
    match axis {
        0 => v.x,
        1 => v.y,
        _ => v.z,
    }
}
