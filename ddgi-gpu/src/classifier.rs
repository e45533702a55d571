use glam::{vec3, UVec2, UVec3, Vec3};
use spirv_std::arch::IndexUnchecked;
#[cfg(target_arch = "spirv")]
use spirv_std::num_traits::Float;

use crate::{
    atomic_add, DdgiData, ProbeClassifyPassParams, ProbeData, ProbeState,
    RelocationMode, Sdf,
};

/// Probes further away from the nearest surface than `spacing * this` are
/// deactivated.
pub const DDGI_DISTANCE_LIMIT: f32 = 1.5;

/// Probes can't be relocated further away than `spacing * this`.
pub const DDGI_RELOCATE_LIMIT: f32 = 0.6;

/// Relocating probe by more than `spacing * this` invalidates its history.
pub const DDGI_RELOCATE_ACTIVATION: f32 = 0.1;

/// Number of lattice candidates, per axis.
const LATTICE_SIZE: u32 = 4;

/// Decides the state and relocation offset of given probe and, if the probe
/// turns out to be useful, appends it into the active probes list.
///
/// `index` is the logical probe index within `params.cascade`;
/// `active_probes[0]` is the list's counter.
pub fn classify_probe(
    data: &DdgiData,
    params: &ProbeClassifyPassParams,
    sdf: &impl Sdf,
    probes: &mut [UVec2],
    active_probes: &mut [u32],
    index: u32,
) {
    if index >= data.probes_per_cascade() {
        return;
    }

    let cascade = params.cascade;
    let spacing = data.spacing(cascade);
    let coords = data.probe_coords(index);
    let slot =
        data.probe_slot(cascade, data.scrolling_probe_index(cascade, coords));

    let prev = if params.reset != 0
        || params.is_scrolled_in(coords, data.counts())
    {
        ProbeData::default()
    } else {
        ProbeData::read(probes, slot)
    };

    let base_pos = data.probe_world_position(cascade, coords);
    let prev_offset = prev.world_offset(spacing);

    let offset = match params.relocation_mode() {
        RelocationMode::Iterative => {
            relocate_iterative(sdf, base_pos, prev_offset, spacing)
        }
        RelocationMode::Lattice => relocate_lattice(sdf, base_pos, spacing),
    };

    let probe = match offset {
        Some(offset) => {
            let state = if prev.state.is_inactive()
                || offset.distance(prev_offset)
                    > DDGI_RELOCATE_ACTIVATION * spacing
            {
                ProbeState::ACTIVATED
            } else {
                ProbeState::ACTIVE
            };

            ProbeData::new(offset / spacing, state)
        }

        None => ProbeData::default(),
    };

    probe.write(probes, slot);

    if !probe.state.is_inactive() {
        let idx = atomic_add(
            unsafe { active_probes.index_unchecked_mut(0) },
            1,
        );

        unsafe {
            *active_probes.index_unchecked_mut(1 + idx as usize) = index;
        }
    }
}

/// Returns the distance below which a probe is considered to be embedded in
/// geometry.
pub fn surface_threshold(sdf: &impl Sdf, spacing: f32) -> f32 {
    (sdf.voxel_size(0) * 0.5).max(0.05 * spacing)
}

/// Nudges probe along the SDF gradient, continuing from its previous offset;
/// returns `None` if the probe should get deactivated.
pub fn relocate_iterative(
    sdf: &impl Sdf,
    base_pos: Vec3,
    prev_offset: Vec3,
    spacing: f32,
) -> Option<Vec3> {
    let threshold = surface_threshold(sdf, spacing);
    let relocate_limit = DDGI_RELOCATE_LIMIT * spacing;
    let (normal, distance) = sdf.sample_gradient(base_pos + prev_offset);

    if distance.abs() > DDGI_DISTANCE_LIMIT * spacing {
        return None;
    }

    let offset = if sdf.sample(base_pos) >= threshold {
        Vec3::ZERO
    } else if distance < threshold {
        prev_offset + normal * (distance.abs() + threshold)
    } else if distance > relocate_limit {
        Vec3::ZERO
    } else {
        prev_offset
    };

    Some(offset.clamp_length_max(relocate_limit))
}

/// Picks the offset which puts probe furthest away from geometry out of a
/// lattice of candidates around its base position; returns `None` if the
/// probe should get deactivated.
pub fn relocate_lattice(
    sdf: &impl Sdf,
    base_pos: Vec3,
    spacing: f32,
) -> Option<Vec3> {
    let threshold = surface_threshold(sdf, spacing);
    let relocate_limit = DDGI_RELOCATE_LIMIT * spacing;
    let distance = sdf.sample(base_pos);

    if distance.abs() > DDGI_DISTANCE_LIMIT * spacing {
        return None;
    }

    let mut best_distance = distance;
    let mut best_offset = Vec3::ZERO;
    let mut idx = 0;

    while idx < LATTICE_SIZE * LATTICE_SIZE * LATTICE_SIZE {
        let offset = lattice_offset(idx) * relocate_limit;
        let offset = offset.clamp_length_max(relocate_limit);
        let offset_distance = sdf.sample(base_pos + offset);

        if offset_distance > best_distance {
            best_distance = offset_distance;
            best_offset = offset;
        }

        idx += 1;
    }

    if best_distance < threshold {
        best_offset = Vec3::ZERO;
    }

    Some(best_offset)
}

/// Returns `idx`-th candidate of the relocation lattice, in `-1.0 ..= 1.0`.
fn lattice_offset(idx: u32) -> Vec3 {
    let coords = UVec3::new(
        idx % LATTICE_SIZE,
        (idx / LATTICE_SIZE) % LATTICE_SIZE,
        idx / (LATTICE_SIZE * LATTICE_SIZE),
    );

    let max = (LATTICE_SIZE - 1) as f32;

    vec3(coords.x as f32, coords.y as f32, coords.z as f32) / max * 2.0
        - 1.0
}
