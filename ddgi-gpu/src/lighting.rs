use core::f32::consts::PI;

use bytemuck::{Pod, Zeroable};
use glam::{
    uvec2, vec2, Affine3A, Mat3A, Mat4, UVec2, UVec4, Vec3, Vec3A, Vec3Swizzles,
    Vec4, Vec4Swizzles,
};
use spirv_std::arch::IndexUnchecked;
#[cfg(target_arch = "spirv")]
use spirv_std::num_traits::Float;

use crate::{
    AtlasLightingPassParams, DdgiData, DdgiSampler, Octahedral,
    SurfaceAtlasData, SurfaceAtlasTile, Texels, TexelsMut,
};

/// Returns diffuse lighting reflected by a Lambertian surface lit with given
/// irradiance.
pub fn indirect_lighting(albedo: Vec3, irradiance: Vec3, intensity: f32) -> Vec3 {
    albedo / PI * irradiance * intensity
}

/// Surface attributes, as stored in the screen's and in the surface atlas'
/// G-buffers: albedo (xyz) and normal packed into `w`.
#[derive(Clone, Copy, Default)]
#[cfg_attr(not(target_arch = "spirv"), derive(Debug))]
pub struct GBufferEntry {
    pub albedo: Vec3,
    pub normal: Vec3,
}

impl GBufferEntry {
    pub fn pack(self) -> Vec4 {
        self.albedo.extend(f32::from_bits(Octahedral::pack(self.normal)))
    }

    pub fn unpack(d0: Vec4) -> Self {
        Self {
            albedo: d0.xyz(),
            normal: Octahedral::unpack(d0.w.to_bits()),
        }
    }
}

/// Camera used to reconstruct world-space positions from the depth buffer.
#[repr(C)]
#[derive(Clone, Copy, Default, Pod, Zeroable)]
#[cfg_attr(not(target_arch = "spirv"), derive(Debug))]
pub struct ViewData {
    pub clip_to_world: Mat4,

    /// Viewport size (xy)
    pub viewport: UVec4,
}

impl ViewData {
    pub fn viewport_size(&self) -> UVec2 {
        self.viewport.xy()
    }

    pub fn contains(&self, screen_pos: UVec2) -> bool {
        screen_pos.x < self.viewport.x && screen_pos.y < self.viewport.y
    }

    pub fn screen_to_idx(&self, screen_pos: UVec2) -> usize {
        (screen_pos.y * self.viewport.x + screen_pos.x) as usize
    }

    /// Reconstructs world-space position of the pixel's center at given
    /// (NDC) depth.
    pub fn world_pos(&self, screen_pos: UVec2, depth: f32) -> Vec3 {
        let size = self.viewport_size().as_vec2();
        let ndc = (screen_pos.as_vec2() + 0.5) / size * 2.0 - 1.0;
        let ndc = vec2(ndc.x, -ndc.y);
        let pos = self.clip_to_world * ndc.extend(depth).extend(1.0);

        pos.xyz() / pos.w
    }
}

/// Adds indirect lighting to a single pixel of the screen.
///
/// Pixels with depth of `1.0` have no geometry and are left untouched.
#[allow(clippy::too_many_arguments)]
pub fn apply_indirect_lighting(
    screen_pos: UVec2,
    view: &ViewData,
    data: &DdgiData,
    bias: f32,
    sampler: &DdgiSampler,
    depth: &[f32],
    gbuffer: &[Vec4],
    output: &mut [Vec4],
) {
    if !view.contains(screen_pos) {
        return;
    }

    let idx = view.screen_to_idx(screen_pos);
    let pixel_depth = unsafe { *depth.index_unchecked(idx) };

    if pixel_depth >= 1.0 {
        return;
    }

    let surface = GBufferEntry::unpack(unsafe { *gbuffer.index_unchecked(idx) });
    let pos = view.world_pos(screen_pos, pixel_depth);
    let irradiance = sampler.sample(pos, surface.normal, bias);

    let lighting = indirect_lighting(
        surface.albedo,
        irradiance,
        data.indirect_lighting_intensity,
    );

    unsafe {
        *output.index_unchecked_mut(idx) += lighting.extend(0.0);
    }
}

/// Computes lighting of a single texel of a surface atlas tile as its direct
/// lighting plus indirect lighting seen by the probes, closing the loop
/// between probes and the surface atlas: lighting gathered by the probes this
/// frame bounces off the tiles and gets picked up by the probes' rays next
/// frame.
///
/// `direct` is never written to, so running this kernel again with the same
/// probes yields the same `lighting`. Texels with depth of `1.0` (nothing
/// captured) receive their direct lighting as-is.
///
/// `tile_texel` is the texel within the tile, `tile_list_idx` indexes
/// `tiles` (addresses of tiles to process).
#[allow(clippy::too_many_arguments)]
pub fn apply_atlas_indirect_lighting(
    tile_texel: UVec2,
    tile_list_idx: u32,
    params: &AtlasLightingPassParams,
    data: &DdgiData,
    atlas: &SurfaceAtlasData,
    sampler: &DdgiSampler,
    objects: &[Vec4],
    tiles: &[u32],
    depth: Texels<f32>,
    gbuffer: Texels<Vec4>,
    direct: Texels<Vec4>,
    lighting: &mut TexelsMut<Vec4>,
) {
    if tile_list_idx >= params.tiles_count {
        return;
    }

    let tile_addr = unsafe { *tiles.index_unchecked(tile_list_idx as usize) };
    let tile = SurfaceAtlasTile::read(objects, tile_addr);
    let (origin, size) = tile_rect(&tile, atlas.resolution());

    if tile_texel.x >= size.x || tile_texel.y >= size.y {
        return;
    }

    let texel = origin + tile_texel;
    let texel_depth = depth.read(texel);
    let texel_direct = direct.read(texel);

    if texel_depth >= 1.0 {
        lighting.write(texel, texel_direct);
        return;
    }

    let surface = GBufferEntry::unpack(gbuffer.read(texel));
    let pos = tile_texel_world_pos(&tile, tile_texel, size, texel_depth);
    let irradiance = sampler.sample(pos, surface.normal, params.bias);

    let indirect = indirect_lighting(
        surface.albedo,
        irradiance,
        data.indirect_lighting_intensity,
    );

    lighting.write(texel, texel_direct + indirect.extend(0.0));
}

/// Returns position of tile's top-left texel and its size, in texels.
pub fn tile_rect(tile: &SurfaceAtlasTile, resolution: u32) -> (UVec2, UVec2) {
    let resolution = resolution as f32;
    let origin = (tile.atlas_rect.xy() * resolution).round();
    let size = (tile.atlas_rect.zw() * resolution).round();

    (
        uvec2(origin.x as u32, origin.y as u32),
        uvec2(size.x as u32, size.y as u32),
    )
}

/// Reconstructs world-space position of given tile's texel.
pub fn tile_texel_world_pos(
    tile: &SurfaceAtlasTile,
    tile_texel: UVec2,
    tile_size: UVec2,
    depth: f32,
) -> Vec3 {
    let uv = (tile_texel.as_vec2() + 0.5) / tile_size.as_vec2();
    let uv = vec2(uv.x, 1.0 - uv.y);
    let local = ((uv - 0.5) * tile.view_bounds.xy()).extend(depth * tile.view_bounds.z);

    let [r0, r1, r2] = tile.world_to_local;

    let world_to_local = Affine3A {
        matrix3: Mat3A::from_cols(
            Vec3A::new(r0.x, r1.x, r2.x),
            Vec3A::new(r0.y, r1.y, r2.y),
            Vec3A::new(r0.z, r1.z, r2.z),
        ),
        translation: Vec3A::new(r0.w, r1.w, r2.w),
    };

    world_to_local.inverse().transform_point3(local)
}
