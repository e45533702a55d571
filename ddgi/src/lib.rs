//! Real-time diffuse global illumination, built out of two caches that feed
//! each other:
//!
//! - cascades of irradiance probes, traced against the Global SDF every frame
//!   (see: [`Cascades`]),
//! - the surface atlas, which stores lit snapshots of scene objects that probe
//!   rays sample when they hit something (see: [`SurfaceAtlas`]).
//!
//! A frame goes:
//!
//! ```text
//! update(view_pos)
//!   -> write_global_sdf() / write_atlas_tile() / write_skybox() / write_screen()
//!   -> flush(queue)
//!   -> render_atlas_lighting(encoder)
//!   -> render(encoder)
//!   -> apply(encoder)
//! ```
//!
//! [`Ddgi::render_atlas_lighting()`] uses the probes from the previous frame;
//! this is what makes light bounce more than once.

mod buffers;
mod cascades;
mod config;
mod pass;
mod passes;
mod resources;
mod shaders;
mod surface_atlas;
mod utils;

use std::mem;

pub use ddgi_gpu as gpu;
use glam::{Mat4, UVec2, Vec3, Vec4};
use log::{debug, info};

pub(crate) use self::buffers::*;
pub use self::cascades::*;
pub use self::config::*;
pub(crate) use self::pass::*;
pub(crate) use self::passes::*;
pub(crate) use self::resources::*;
pub use self::shaders::*;
pub use self::surface_atlas::*;
pub use self::utils::*;

#[derive(Debug)]
pub struct Ddgi<K = u32>
where
    K: ObjectId,
{
    config: DdgiConfig,
    shaders: Shaders,
    cascades: Cascades,
    surface_atlas: SurfaceAtlas<K>,
    buffers: DdgiBuffers,
    passes: DdgiPasses,
    sky: Vec<Vec4>,
    sky_dirty: bool,
    tiles_count: u32,
    max_tile_size: u32,
    reset_blend: bool,
}

impl<K> Ddgi<K>
where
    K: ObjectId,
{
    /// Creates the renderer.
    ///
    /// Device must have been created with [`Self::required_features()`] and
    /// [`Self::required_limits()`].
    ///
    /// # Panics
    ///
    /// Panics if given configuration is invalid (see:
    /// [`DdgiConfig::validate()`]).
    pub fn new(
        device: &wgpu::Device,
        shaders: Shaders,
        config: DdgiConfig,
    ) -> Self {
        info!("Initializing");

        assert_valid(&config);

        let buffers = DdgiBuffers::new(device, &config);
        let passes = DdgiPasses::new(device, &config, &shaders, &buffers);

        debug!("Initialized");

        Self {
            cascades: Cascades::new(&config),
            surface_atlas: SurfaceAtlas::new(
                config.atlas_resolution,
                config.atlas_max_objects,
            ),
            config,
            shaders,
            buffers,
            passes,
            sky: Vec::new(),
            sky_dirty: false,
            tiles_count: 0,
            max_tile_size: 0,
            reset_blend: true,
        }
    }

    pub fn required_features() -> wgpu::Features {
        wgpu::Features::PUSH_CONSTANTS
    }

    pub fn required_limits() -> wgpu::Limits {
        wgpu::Limits {
            max_push_constant_size: 64,
            max_storage_buffers_per_shader_stage: 10,
            ..Default::default()
        }
    }

    pub fn config(&self) -> &DdgiConfig {
        &self.config
    }

    pub fn cascades(&self) -> &Cascades {
        &self.cascades
    }

    /// Changes the configuration, re-creating all GPU resources.
    ///
    /// Contents of the Global SDF, of the atlas' textures and of the screen
    /// are lost and have to be written again; all objects' tiles get marked
    /// as dirty.
    ///
    /// # Panics
    ///
    /// Panics if given configuration is invalid.
    pub fn reconfigure(&mut self, device: &wgpu::Device, config: DdgiConfig) {
        if config == self.config {
            return;
        }

        info!("Reconfiguring");

        assert_valid(&config);

        self.buffers = DdgiBuffers::new(device, &config);

        self.passes =
            DdgiPasses::new(device, &config, &self.shaders, &self.buffers);

        self.cascades = Cascades::new(&config);

        self.surface_atlas
            .reconfigure(config.atlas_resolution, config.atlas_max_objects);

        self.config = config;
        self.tiles_count = 0;
        self.max_tile_size = 0;
        self.reset_blend = true;
        self.sky_dirty = !self.sky.is_empty();
    }

    /// Moves the probe grids to follow given view position and prepares
    /// per-frame constants (such as this frame's rays rotation).
    pub fn update(&mut self, view_pos: Vec3) {
        self.cascades.update(view_pos);

        let rays_rotation = random_rotation(&mut rand::thread_rng());

        *self.buffers.ddgi =
            self.cascades
                .serialize(&self.config, view_pos, rays_rotation);

        self.buffers.atlas.view_pos =
            view_pos.extend(self.config.atlas_chunk_size());
    }

    /// Creates or updates an object of the surface atlas.
    ///
    /// Tiles that need to be rasterized again can be retrieved through
    /// [`Self::dirty_tiles()`].
    pub fn set_object(&mut self, id: K, desc: SurfaceAtlasObjectDesc) {
        self.surface_atlas.set_object(id, desc);
    }

    pub fn remove_object(&mut self, id: &K) {
        self.surface_atlas.remove_object(id);
    }

    pub fn surface_atlas(&self) -> &SurfaceAtlas<K> {
        &self.surface_atlas
    }

    /// Returns tiles that should be rasterized and uploaded through
    /// [`Self::write_atlas_tile()`].
    pub fn dirty_tiles(&mut self) -> Vec<DirtyTile<K>> {
        self.surface_atlas.dirty_tiles()
    }

    /// Uploads the Global SDF.
    ///
    /// Each cascade is described by its center (xyz) and half-extent (w);
    /// `voxels` contain all cascades, one after another, x-major.
    pub fn write_global_sdf(
        &mut self,
        queue: &wgpu::Queue,
        cascades: &[Vec4],
        voxels: &[f32],
    ) {
        assert!(
            !cascades.is_empty()
                && cascades.len() <= self.config.sdf_cascades as usize,
            "Expected 1..={} SDF cascades, got {}",
            self.config.sdf_cascades,
            cascades.len(),
        );

        let res = self.config.sdf_resolution as usize;

        assert_eq!(
            res * res * res * cascades.len(),
            voxels.len(),
            "Voxels don't match the SDF's resolution",
        );

        self.buffers.sdf.cascades[..cascades.len()].copy_from_slice(cascades);
        self.buffers.sdf.params.y = cascades.len() as u32;
        self.buffers.sdf_voxels.write(queue, 0, voxels);
    }

    /// Uploads a single rasterized tile of the surface atlas.
    ///
    /// `depth` (normalized so that `0.0` is the front of the tile's view
    /// volume and `1.0` is the back, also meaning "nothing"), `gbuffer` (see:
    /// [`gpu::GBufferEntry`]) and `direct` (direct lighting) contain the
    /// tile's texels, row by row.
    ///
    /// Direct lighting is kept aside and [`Self::render_atlas_lighting()`]
    /// adds indirect lighting onto it every frame, so tiles whose direct
    /// lighting didn't change don't have to be uploaded again.
    pub fn write_atlas_tile(
        &mut self,
        queue: &wgpu::Queue,
        tile: &DirtyTile<K>,
        depth: &[f32],
        gbuffer: &[Vec4],
        direct: &[Vec4],
    ) {
        let texels = (tile.size.x * tile.size.y) as usize;

        assert!(
            depth.len() == texels
                && gbuffer.len() == texels
                && direct.len() == texels,
            "Tile of {}x{} texels requires {texels} texels of each kind",
            tile.size.x,
            tile.size.y,
        );

        let width = tile.size.x as usize;
        let res = self.config.atlas_resolution as usize;

        for row in 0..(tile.size.y as usize) {
            let offset =
                (tile.origin.y as usize + row) * res + tile.origin.x as usize;

            let texels = (row * width)..((row + 1) * width);

            self.buffers.atlas_depth.write(
                queue,
                offset * mem::size_of::<f32>(),
                &depth[texels.clone()],
            );

            self.buffers.atlas_gbuffer.write(
                queue,
                offset * mem::size_of::<Vec4>(),
                &gbuffer[texels.clone()],
            );

            self.buffers.atlas_direct.write(
                queue,
                offset * mem::size_of::<Vec4>(),
                &direct[texels],
            );
        }
    }

    /// Uploads the entire surface atlas at once; see:
    /// [`Self::write_atlas_tile()`].
    pub fn write_atlas_textures(
        &mut self,
        queue: &wgpu::Queue,
        depth: &[f32],
        gbuffer: &[Vec4],
        direct: &[Vec4],
    ) {
        let texels = (self.config.atlas_resolution as usize).pow(2);

        assert!(
            depth.len() == texels
                && gbuffer.len() == texels
                && direct.len() == texels,
            "Atlas requires {texels} texels of each kind",
        );

        self.buffers.atlas_depth.write(queue, 0, depth);
        self.buffers.atlas_gbuffer.write(queue, 0, gbuffer);
        self.buffers.atlas_direct.write(queue, 0, direct);
    }

    /// Sets radiance coming from the sky, i.e. seen by rays that don't hit
    /// anything.
    pub fn write_skybox(&mut self, sky: impl Fn(Vec3) -> Vec3) {
        self.sky = bake_sky(sky);
        self.sky_dirty = true;
    }

    /// Uploads the screen indirect lighting gets applied onto.
    ///
    /// `depth` is the NDC depth (`1.0` meaning no geometry), `gbuffer`
    /// contains surface attributes (see: [`gpu::GBufferEntry`]) and `direct`
    /// is the direct lighting that [`Self::apply()`] adds onto.
    pub fn write_screen(
        &mut self,
        queue: &wgpu::Queue,
        clip_to_world: Mat4,
        depth: &[f32],
        gbuffer: &[Vec4],
        direct: &[Vec4],
    ) {
        let size = self.viewport_size();
        let texels = (size.x * size.y) as usize;

        assert!(
            depth.len() == texels
                && gbuffer.len() == texels
                && direct.len() == texels,
            "Viewport of {}x{} pixels requires {texels} pixels of each kind",
            size.x,
            size.y,
        );

        self.buffers.view.clip_to_world = clip_to_world;
        self.buffers.screen_depth.write(queue, 0, depth);
        self.buffers.screen_gbuffer.write(queue, 0, gbuffer);
        self.buffers.screen_output.write(queue, 0, direct);
    }

    /// Sends pending changes (objects, sky and per-frame constants) to the
    /// GPU.
    pub fn flush(&mut self, queue: &wgpu::Queue) {
        if self.surface_atlas.is_dirty() {
            let atlas = measure("flush.surface_atlas", || {
                self.surface_atlas.serialize()
            });

            if !atlas.objects.is_empty() {
                self.buffers.atlas_objects.write(queue, 0, &atlas.objects);
                self.buffers.atlas_addresses.write(queue, 0, &atlas.addresses);
            }

            if !atlas.tiles.is_empty() {
                self.buffers.atlas_tiles.write(queue, 0, &atlas.tiles);
            }

            self.buffers.atlas.params.z = atlas.addresses.len() as u32;
            self.tiles_count = atlas.tiles.len() as u32;
            self.max_tile_size = atlas.max_tile_size;
        }

        if mem::take(&mut self.sky_dirty) {
            self.buffers.sky.write(queue, 0, &self.sky);
        }

        self.buffers.flush(queue);
    }

    /// Rebuilds the surface atlas' lighting out of its direct lighting plus
    /// indirect lighting, as seen by the probes.
    pub fn render_atlas_lighting(&self, encoder: &mut wgpu::CommandEncoder) {
        self.passes.atlas_lighting.run(
            &self.config,
            encoder,
            self.tiles_count,
            self.max_tile_size,
        );
    }

    /// Culls the surface atlas, then traces and updates all probes.
    pub fn render(&mut self, encoder: &mut wgpu::CommandEncoder) {
        self.passes
            .atlas_culling
            .run(&self.config, &self.buffers, encoder);

        for cascade in 0..(self.cascades.len() as u32) {
            self.passes.probe_classification.run(
                &self.config,
                &self.cascades,
                &self.buffers,
                encoder,
                cascade,
            );

            self.passes.indirect_args.run(encoder);

            let reset_blend =
                self.reset_blend || self.cascades.get(cascade).reset;

            for batch in 0..self.passes.indirect_args.batches_capacity() {
                let params = gpu::ProbeBatchPassParams {
                    cascade,
                    probes_offset: batch
                        * gpu::DDGI_TRACE_RAYS_PROBES_COUNT_LIMIT,
                    reset_blend: reset_blend as u32,
                    _pad: 0,
                };

                self.passes
                    .probe_tracing
                    .run(&self.buffers, encoder, batch, params);

                self.passes
                    .probe_updating
                    .run(&self.buffers, encoder, batch, params);
            }
        }

        self.passes.probe_borders.run(&self.config, encoder);
        self.reset_blend = false;
    }

    /// Adds indirect lighting onto the screen's direct lighting; see:
    /// [`Self::output()`].
    pub fn apply(&self, encoder: &mut wgpu::CommandEncoder) {
        self.passes.indirect_lighting.run(&self.config, encoder);
    }

    /// Returns the screen's lighting (one `Vec4` per pixel, row by row), as
    /// produced by [`Self::apply()`].
    pub fn output(&self) -> &wgpu::Buffer {
        self.buffers.screen_output.buffer()
    }

    /// Returns the surface atlas' lighting, as produced by
    /// [`Self::render_atlas_lighting()`].
    pub fn atlas_lighting(&self) -> &wgpu::Buffer {
        self.buffers.atlas_lighting.buffer()
    }

    pub fn viewport_size(&self) -> UVec2 {
        self.config.viewport_size
    }
}

fn assert_valid(config: &DdgiConfig) {
    let problems = config.validate();

    assert!(
        problems.is_empty(),
        "Invalid configuration:\n- {}",
        problems.join("\n- "),
    );
}
