use glam::{UVec2, Vec2, Vec3, Vec4, Vec4Swizzles};
use spirv_std::arch::IndexUnchecked;
#[cfg(target_arch = "spirv")]
use spirv_std::num_traits::Float;

use crate::{
    probe_ray_direction, trace_idx, DdgiData, F32Ext, Octahedral,
    ProbeBatchPassParams, TexelsMut, Vec3Ext, DDGI_DISTANCE_LIMIT,
    DDGI_PROBE_RESOLUTION_DISTANCE, DDGI_PROBE_RESOLUTION_IRRADIANCE,
    DDGI_TRACE_RAYS_LIMIT,
};

/// Fraction of rays that can hit backfaces before the probe is considered to
/// be stuck inside geometry.
pub const DDGI_BACKFACES_LIMIT: f32 = 0.1;

/// Exponent applied to ray weights when filtering distances.
pub const DDGI_DISTANCE_WEIGHT_EXPONENT: i32 = 10;

/// When the change in irradiance is larger than this (on any channel), the
/// history weight gets halved.
const FLICKER_DELTA_THRESHOLD: f32 = 0.5;

/// When the change in irradiance is larger than this (in length), only a
/// quarter of it is applied.
const FLICKER_DELTA_LIMIT: f32 = 2.0;

/// Updates a single texel of probe's irradiance tile.
///
/// `batch_probe_idx` is the probe's index within the batch (workgroup id),
/// `texel` is the texel within the tile, border excluded.
#[allow(clippy::too_many_arguments)]
pub fn update_irradiance(
    data: &DdgiData,
    params: &ProbeBatchPassParams,
    probes: &[UVec2],
    active_probes: &[u32],
    trace: &[Vec4],
    batch_probe_idx: u32,
    texel: UVec2,
    irradiance: &mut TexelsMut<Vec4>,
) {
    let Some(probe) =
        ProbeTexel::new(data, params, probes, active_probes, batch_probe_idx)
    else {
        return;
    };

    let resolution = DDGI_PROBE_RESOLUTION_IRRADIANCE;

    if texel.x >= resolution || texel.y >= resolution {
        return;
    }

    let dir = Octahedral::texel_direction(texel, resolution);
    let raw = gather_irradiance(data, trace, batch_probe_idx, dir);
    let raw = raw.truncate().powf_positive(1.0 / data.irradiance_gamma);

    let pos = probe.atlas_pos(data, texel, resolution);
    let prev = irradiance.read(pos).truncate();
    let out = blend_irradiance(raw, prev, probe.history_weight);

    irradiance.write(pos, out.extend(1.0));
}

/// Updates a single texel of probe's distance tile; see:
/// [`update_irradiance()`].
#[allow(clippy::too_many_arguments)]
pub fn update_distance(
    data: &DdgiData,
    params: &ProbeBatchPassParams,
    probes: &[UVec2],
    active_probes: &[u32],
    trace: &[Vec4],
    batch_probe_idx: u32,
    texel: UVec2,
    distance: &mut TexelsMut<Vec4>,
) {
    let Some(probe) =
        ProbeTexel::new(data, params, probes, active_probes, batch_probe_idx)
    else {
        return;
    };

    let resolution = DDGI_PROBE_RESOLUTION_DISTANCE;

    if texel.x >= resolution || texel.y >= resolution {
        return;
    }

    let dir = Octahedral::texel_direction(texel, resolution);
    let limit = DDGI_DISTANCE_LIMIT * data.spacing(params.cascade);
    let raw = gather_distance(data, trace, batch_probe_idx, dir, limit);

    let pos = probe.atlas_pos(data, texel, resolution);
    let prev = distance.read(pos).xy();
    let out = blend_distance(raw, prev, probe.history_weight, limit);

    distance.write(pos, out.extend(0.0).extend(0.0));
}

/// Probe being updated by the current workgroup.
struct ProbeTexel {
    cascade: u32,
    physical_index: u32,
    history_weight: f32,
}

impl ProbeTexel {
    fn new(
        data: &DdgiData,
        params: &ProbeBatchPassParams,
        probes: &[UVec2],
        active_probes: &[u32],
        batch_probe_idx: u32,
    ) -> Option<Self> {
        let active_idx = params.probes_offset + batch_probe_idx;

        if batch_probe_idx >= crate::DDGI_TRACE_RAYS_PROBES_COUNT_LIMIT
            || active_idx >= unsafe { *active_probes.index_unchecked(0) }
        {
            return None;
        }

        let index =
            unsafe { *active_probes.index_unchecked(1 + active_idx as usize) };

        let probe = data.read_probe(probes, params.cascade, index);

        // Freshly activated probes hold data of whatever has occupied their
        // slot before, so there's no history to blend with
        let history_weight =
            if params.reset_blend() || probe.state.is_activated() {
                0.0
            } else {
                data.history_weight
            };

        Some(Self {
            cascade: params.cascade,
            physical_index: data.probe_physical_index(params.cascade, index),
            history_weight,
        })
    }

    fn atlas_pos(&self, data: &DdgiData, texel: UVec2, resolution: u32) -> UVec2 {
        data.probe_tile_origin(self.cascade, self.physical_index, resolution)
            + 1
            + texel
    }
}

/// Integrates trace results over the hemisphere around `dir`.
///
/// Returns irradiance (xyz) and confidence (w); confidence is zero if too
/// many rays have hit backfaces, in which case irradiance is zero as well.
pub fn gather_irradiance(
    data: &DdgiData,
    trace: &[Vec4],
    batch_probe_idx: u32,
    dir: Vec3,
) -> Vec4 {
    let rays_count = data.rays_count.min(DDGI_TRACE_RAYS_LIMIT);
    let rotation = data.rays_rotation();
    let backfaces_limit = (DDGI_BACKFACES_LIMIT * rays_count as f32).floor() as u32;

    let mut sum = Vec3::ZERO;
    let mut sum_weight = 0.0;
    let mut backfaces = 0;
    let mut ray_idx = 0;

    while ray_idx < rays_count {
        let ray = unsafe {
            *trace.index_unchecked(trace_idx(batch_probe_idx, ray_idx))
        };

        if ray.w < 0.0 {
            backfaces += 1;
        } else {
            let ray_dir = probe_ray_direction(ray_idx, rays_count, rotation);
            let weight = dir.dot(ray_dir).max(0.0);

            sum += ray.truncate() * weight;
            sum_weight += weight;
        }

        ray_idx += 1;
    }

    if backfaces > backfaces_limit {
        return Vec4::ZERO;
    }

    let epsilon = (rays_count as f32) * 1e-9;

    (sum / (2.0 * sum_weight.max(epsilon))).extend(1.0)
}

/// Blends freshly gathered (gamma-encoded) irradiance with its history.
pub fn blend_irradiance(raw: Vec3, prev: Vec3, history_weight: f32) -> Vec3 {
    if history_weight <= 0.0 {
        return raw;
    }

    let mut raw = raw;
    let mut history_weight = history_weight;
    let delta = raw - prev;

    // Sudden change, e.g. a light getting turned on - let's converge faster
    if delta.abs().max_element() > FLICKER_DELTA_THRESHOLD {
        history_weight *= 0.5;
    }

    // Very sudden change, probably a single very bright ray - let's not trust
    // it fully until it's confirmed by the upcoming frames
    if delta.length() > FLICKER_DELTA_LIMIT {
        raw = prev + delta * 0.25;
    }

    raw + (prev - raw) * history_weight
}

/// Filters trace distances over the lobe around `dir`.
///
/// Returns mean distance (x) and mean squared distance (y); each ray's
/// distance is clamped to `0.0 ..= limit` before being accounted for.
pub fn gather_distance(
    data: &DdgiData,
    trace: &[Vec4],
    batch_probe_idx: u32,
    dir: Vec3,
    limit: f32,
) -> Vec2 {
    let rays_count = data.rays_count.min(DDGI_TRACE_RAYS_LIMIT);
    let rotation = data.rays_rotation();

    let mut sum = Vec2::ZERO;
    let mut sum_weight = 0.0;
    let mut ray_idx = 0;

    while ray_idx < rays_count {
        let ray = unsafe {
            *trace.index_unchecked(trace_idx(batch_probe_idx, ray_idx))
        };

        let ray_dir = probe_ray_direction(ray_idx, rays_count, rotation);
        let weight = dir.dot(ray_dir).max(0.0).powi(DDGI_DISTANCE_WEIGHT_EXPONENT);
        let distance = ray.w.clamp(0.0, limit);

        sum += Vec2::new(distance, distance.sqr()) * weight;
        sum_weight += weight;
        ray_idx += 1;
    }

    let epsilon = (rays_count as f32) * 1e-9;
    let result = sum / sum_weight.max(epsilon);

    clamp_distance(result, limit)
}

/// Blends freshly filtered distances with their history.
pub fn blend_distance(
    raw: Vec2,
    prev: Vec2,
    history_weight: f32,
    limit: f32,
) -> Vec2 {
    if history_weight <= 0.0 {
        return raw;
    }

    clamp_distance(raw + (prev - raw) * history_weight, limit)
}

fn clamp_distance(val: Vec2, limit: f32) -> Vec2 {
    Vec2::new(val.x.clamp(0.0, limit), val.y.clamp(0.0, limit.sqr()))
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use glam::{uvec2, uvec4, vec3, vec4, Quat};

    use super::*;
    use crate::{ProbeData, ProbeState, DDGI_SKY_DISTANCE};

    const SPACING: f32 = 200.0;

    fn data(rays_count: u32) -> DdgiData {
        let mut data = DdgiData {
            probes_counts: uvec4(2, 2, 2, 1),
            rays_rotation: Quat::IDENTITY.into(),
            rays_count,
            history_weight: 0.9,
            irradiance_gamma: 1.0,
            ..Default::default()
        };

        data.origin_and_spacing[0] = vec4(0.0, 0.0, 0.0, SPACING);
        data
    }

    fn trace(rays_count: u32, backfaces: u32) -> Vec<Vec4> {
        (0..DDGI_TRACE_RAYS_LIMIT)
            .map(|ray_idx| {
                if ray_idx >= rays_count {
                    Vec4::ZERO
                } else if ray_idx < backfaces {
                    vec4(0.0, 0.0, 0.0, -1.0)
                } else {
                    vec4(1.0, 2.0, 3.0, 150.0)
                }
            })
            .collect()
    }

    #[test]
    fn backfaces_limit() {
        for (rays_count, backfaces, expected_zero) in [
            (64, 5, false),
            (64, 6, false),
            (64, 7, true),
            (256, 23, false),
            (256, 25, false),
            (256, 26, true),
            (256, 28, true),
        ] {
            let data = data(rays_count);
            let trace = trace(rays_count, backfaces);

            for dir in [Vec3::X, -Vec3::Y, vec3(0.3, -0.4, 0.8).normalize()] {
                let actual = gather_irradiance(&data, &trace, 0, dir);

                if expected_zero {
                    assert_eq!(Vec4::ZERO, actual, "{rays_count} / {backfaces}");
                } else {
                    assert_eq!(1.0, actual.w, "{rays_count} / {backfaces}");
                    assert!(actual.x > 0.0, "{rays_count} / {backfaces}");
                }
            }
        }
    }

    #[test]
    fn gather_irradiance_is_normalized() {
        let data = data(256);
        let trace = trace(256, 0);
        let actual = gather_irradiance(&data, &trace, 0, Vec3::Z);

        // Uniform radiance gets halved by the normalization
        assert_relative_eq!(0.5, actual.x, epsilon = 1e-4);
        assert_relative_eq!(1.0, actual.y, epsilon = 1e-4);
        assert_relative_eq!(1.5, actual.z, epsilon = 1e-4);
    }

    #[test]
    fn blend_without_history() {
        let raw = vec3(0.25, 0.5, 0.75);

        for prev in [
            Vec3::ZERO,
            Vec3::splat(1e30),
            Vec3::splat(f32::NAN),
            Vec3::splat(f32::INFINITY),
        ] {
            assert_eq!(raw, blend_irradiance(raw, prev, 0.0));

            assert_eq!(
                raw.truncate(),
                blend_distance(raw.truncate(), prev.truncate(), 0.0, 300.0)
            );
        }
    }

    #[test]
    fn blend_with_history() {
        let actual = blend_irradiance(vec3(0.2, 0.2, 0.2), Vec3::ZERO, 0.5);

        assert!(actual.abs_diff_eq(vec3(0.1, 0.1, 0.1), 1e-6));

        // Large change halves the history weight
        let actual = blend_irradiance(vec3(1.0, 0.0, 0.0), Vec3::ZERO, 0.8);

        assert!(actual.abs_diff_eq(vec3(0.6, 0.0, 0.0), 1e-6));

        // Very large change gets damped as well
        let actual = blend_irradiance(vec3(4.0, 0.0, 0.0), Vec3::ZERO, 0.8);

        assert!(actual.abs_diff_eq(vec3(0.6, 0.0, 0.0), 1e-6));
    }

    #[test]
    fn distance_is_clamped() {
        let data = data(64);
        let limit = DDGI_DISTANCE_LIMIT * SPACING;

        for distance in [-1e27, -100.0, -1e-4, 0.0, 100.0, 299.0, 1e4, DDGI_SKY_DISTANCE] {
            let trace = vec![vec4(0.0, 0.0, 0.0, distance); DDGI_TRACE_RAYS_LIMIT as usize];

            for dir in [Vec3::X, Vec3::Y, -Vec3::Z] {
                let actual = gather_distance(&data, &trace, 0, dir, limit);

                assert!(actual.x >= 0.0 && actual.x <= limit, "{distance}");
                assert!(actual.y >= 0.0 && actual.y <= limit * limit, "{distance}");

                let expected = distance.clamp(0.0, limit);

                assert_relative_eq!(expected, actual.x, max_relative = 1e-4);
            }

            let blended = blend_distance(
                Vec2::new(limit, limit * limit),
                Vec2::splat(1e9),
                0.5,
                limit,
            );

            assert!(blended.x <= limit && blended.y <= limit * limit);
        }
    }

    #[test]
    fn update_irradiance_kernel() {
        let mut data = data(64);
        let params = ProbeBatchPassParams::default();
        let atlas_size = data.atlas_size(DDGI_PROBE_RESOLUTION_IRRADIANCE);
        let mut probes = vec![UVec2::ZERO; 8];
        let active_probes = [1, 3];
        let trace = trace(64, 0);

        ProbeData::new(Vec3::ZERO, ProbeState::ACTIVATED).write(&mut probes, 3);

        let mut atlas = vec![Vec4::splat(123.0); (atlas_size.x * atlas_size.y) as usize];

        for run in 0..2 {
            let mut irradiance = TexelsMut::new(&mut atlas, atlas_size);

            for y in 0..DDGI_PROBE_RESOLUTION_IRRADIANCE {
                for x in 0..DDGI_PROBE_RESOLUTION_IRRADIANCE {
                    update_irradiance(
                        &data,
                        &params,
                        &probes,
                        &active_probes,
                        &trace,
                        0,
                        uvec2(x, y),
                        &mut irradiance,
                    );
                }
            }

            if run == 0 {
                ProbeData::new(Vec3::ZERO, ProbeState::ACTIVE).write(&mut probes, 3);
                data.history_weight = 0.5;
            }
        }

        let tile = data.probe_tile_origin(0, 3, DDGI_PROBE_RESOLUTION_IRRADIANCE);
        let size = DDGI_PROBE_RESOLUTION_IRRADIANCE + 2;

        for y in 0..size {
            for x in 0..size {
                let pos = tile + uvec2(x, y);
                let val = atlas[(pos.y * atlas_size.x + pos.x) as usize];
                let is_border = x == 0 || y == 0 || x == size - 1 || y == size - 1;

                if is_border {
                    assert_eq!(Vec4::splat(123.0), val);
                } else {
                    assert_eq!(1.0, val.w);
                    assert!(val.x > 0.0 && val.x < 1.0);
                }
            }
        }
    }
}
