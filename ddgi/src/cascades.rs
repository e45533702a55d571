//! Placement of the probe grids.
//!
//! Each cascade's grid follows the view in whole-probe steps. Instead of
//! moving all probes (and throwing away their history), the grid gets
//! scrolled: the storage is addressed toroidally and only the planes of
//! probes that wrap around to the other side get reset.

use glam::{IVec3, Quat, UVec3, Vec3, Vec4};
use log::debug;

use crate::{gpu, DdgiConfig};

#[derive(Clone, Debug, Default)]
pub struct Cascade {
    /// Position the grid was centered at when it was last reset
    pub origin: Vec3,

    pub spacing: f32,

    /// Number of probes the grid has scrolled by since the last reset
    pub scroll: IVec3,

    /// Number of probe planes that wrapped around this frame, per axis
    pub scroll_clear: UVec3,

    /// Direction of this frame's scroll, per axis
    pub scroll_directions: IVec3,

    /// Whether the grid has been re-created from scratch this frame
    pub reset: bool,

    initialized: bool,
}

impl Cascade {
    fn update(&mut self, view_pos: Vec3, counts: UVec3) {
        self.scroll_clear = UVec3::ZERO;
        self.scroll_directions = IVec3::ZERO;

        let target = ((view_pos - self.origin) / self.spacing).round();
        let delta = target.as_ivec3() - self.scroll;

        let teleported = delta.abs().as_uvec3().cmpge(counts).any();

        if !self.initialized || teleported {
            self.origin = (view_pos / self.spacing).round() * self.spacing;
            self.scroll = IVec3::ZERO;
            self.reset = true;
            self.initialized = true;
            return;
        }

        self.reset = false;

        if delta != IVec3::ZERO {
            self.scroll += delta;
            self.scroll_clear = delta.abs().as_uvec3();
            self.scroll_directions = delta.signum();
        }
    }

    /// Returns world-space center of the grid.
    pub fn center(&self) -> Vec3 {
        self.origin + self.scroll.as_vec3() * self.spacing
    }
}

#[derive(Clone, Debug)]
pub struct Cascades {
    counts: UVec3,
    items: Vec<Cascade>,
}

impl Cascades {
    pub fn new(config: &DdgiConfig) -> Self {
        let items = (0..config.cascades)
            .map(|cascade| Cascade {
                spacing: config.cascade_spacing(cascade),
                ..Default::default()
            })
            .collect();

        Self {
            counts: config.probes_counts,
            items,
        }
    }

    pub fn update(&mut self, view_pos: Vec3) {
        for (idx, cascade) in self.items.iter_mut().enumerate() {
            cascade.update(view_pos, self.counts);

            if cascade.reset {
                debug!(
                    "Cascade {idx} reset; origin={}, spacing={}",
                    cascade.origin, cascade.spacing
                );
            } else if cascade.scroll_clear != UVec3::ZERO {
                debug!(
                    "Cascade {idx} scrolled; delta={}",
                    cascade.scroll_clear.as_ivec3() * cascade.scroll_directions
                );
            }
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, cascade: u32) -> &Cascade {
        &self.items[cascade as usize]
    }

    pub fn iter(&self) -> impl Iterator<Item = &Cascade> + '_ {
        self.items.iter()
    }

    pub fn serialize(
        &self,
        config: &DdgiConfig,
        view_pos: Vec3,
        rays_rotation: Quat,
    ) -> gpu::DdgiData {
        let mut data = gpu::DdgiData {
            probes_counts: config.probes_counts.extend(self.items.len() as u32),
            rays_rotation: Vec4::from(rays_rotation),
            view_pos: view_pos.extend(config.ray_max_distance),
            rays_count: config.rays_count,
            history_weight: config.history_weight,
            irradiance_gamma: config.irradiance_gamma,
            indirect_lighting_intensity: config.indirect_lighting_intensity,
            ..Default::default()
        };

        for (idx, cascade) in self.items.iter().enumerate() {
            data.origin_and_spacing[idx] = cascade.origin.extend(cascade.spacing);
            data.scroll_offsets[idx] = cascade.scroll.extend(0);
        }

        data
    }

    pub fn classify_params(
        &self,
        config: &DdgiConfig,
        cascade: u32,
    ) -> gpu::ProbeClassifyPassParams {
        let item = self.get(cascade);

        gpu::ProbeClassifyPassParams {
            cascade,
            relocation_mode: config.relocation_mode.to_u32(),
            reset: item.reset as u32,
            _pad: 0,
            scroll_clear: item.scroll_clear.extend(0),
            scroll_directions: item.scroll_directions.extend(0),
        }
    }
}
