use glam::{UVec2, Vec3, Vec4};
use spirv_std::arch::IndexUnchecked;

use crate::{
    probe_ray_direction, DdgiData, ProbeBatchPassParams, Ray, Sdf,
    DDGI_SKY_DISTANCE, DDGI_TRACE_RAYS_LIMIT,
};

/// Traces a single ray of a single active probe and stores its outcome into
/// the trace buffer.
///
/// `global_id.x` is the ray's index, `global_id.y` is the probe's index
/// within the batch.
#[allow(clippy::too_many_arguments)]
pub fn trace_probe(
    global_id: UVec2,
    data: &DdgiData,
    params: &ProbeBatchPassParams,
    sdf: &impl Sdf,
    probes: &[UVec2],
    active_probes: &[u32],
    sky: impl Fn(Vec3) -> Vec3,
    surface: impl Fn(Vec3, Vec3, f32) -> Vec4,
    trace: &mut [Vec4],
) {
    let ray_idx = global_id.x;
    let batch_probe_idx = global_id.y;
    let active_idx = params.probes_offset + batch_probe_idx;

    if ray_idx >= data.rays_count.min(DDGI_TRACE_RAYS_LIMIT) {
        return;
    }

    if active_idx >= unsafe { *active_probes.index_unchecked(0) } {
        return;
    }

    let index = unsafe { *active_probes.index_unchecked(1 + active_idx as usize) };
    let probe = data.read_probe(probes, params.cascade, index);
    let origin = data.probe_relocated_position(params.cascade, index, probe);

    let direction =
        probe_ray_direction(ray_idx, data.rays_count, data.rays_rotation());

    let result = trace_probe_ray(
        sdf,
        Ray::new(origin, direction),
        data.ray_max_distance(),
        sky,
        surface,
    );

    unsafe {
        *trace.index_unchecked_mut(trace_idx(batch_probe_idx, ray_idx)) =
            result;
    }
}

/// Returns index of given ray's entry within the trace buffer.
pub fn trace_idx(batch_probe_idx: u32, ray_idx: u32) -> usize {
    (batch_probe_idx * DDGI_TRACE_RAYS_LIMIT + ray_idx) as usize
}

/// Traces a probe ray, returning radiance (xyz) and signed hit distance (w).
///
/// - ray that starts inside geometry yields no radiance and a negative
///   distance, marking it as a backface,
/// - ray that hits a surface yields radiance read from the surface atlas,
/// - ray that misses yields sky radiance and [`DDGI_SKY_DISTANCE`].
pub fn trace_probe_ray(
    sdf: &impl Sdf,
    ray: Ray,
    max_distance: f32,
    sky: impl Fn(Vec3) -> Vec3,
    surface: impl Fn(Vec3, Vec3, f32) -> Vec4,
) -> Vec4 {
    let hit = sdf.trace(ray, max_distance);

    if !hit.is_hit() {
        return sky(ray.direction()).extend(DDGI_SKY_DISTANCE);
    }

    let voxel_size = sdf.voxel_size(hit.cascade);

    if hit.time < voxel_size && hit.sdf <= 0.0 {
        // Keep the distance strictly negative even for rays that got stuck
        // right at their origin
        return Vec3::ZERO.extend(-(hit.time * 0.2).max(1e-4));
    }

    let radiance = surface(hit.position(ray), -ray.direction(), voxel_size);

    radiance.truncate().extend(hit.time + 0.5 * voxel_size)
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use glam::{uvec2, uvec4, vec3, vec4, Quat};

    use super::*;
    use crate::sdf::SphereSdf;
    use crate::ProbeData;

    fn sky(_: Vec3) -> Vec3 {
        vec3(0.1, 0.2, 0.3)
    }

    fn surface(_: Vec3, _: Vec3, _: f32) -> Vec4 {
        vec4(1.0, 0.5, 0.25, 1.0)
    }

    fn data(rays_count: u32) -> DdgiData {
        let mut data = DdgiData {
            probes_counts: uvec4(4, 4, 4, 1),
            rays_rotation: Quat::IDENTITY.into(),
            view_pos: vec4(0.0, 0.0, 0.0, 2000.0),
            rays_count,
            ..Default::default()
        };

        data.origin_and_spacing[0] = vec4(0.0, 0.0, 0.0, 100.0);
        data
    }

    #[test]
    fn miss() {
        let sdf = SphereSdf {
            center: vec3(1e6, 0.0, 0.0),
            radius: 10.0,
            voxel_size: 10.0,
        };

        let data = data(64);
        let params = ProbeBatchPassParams::default();
        let probes = vec![ProbeData::default().encode(); 64];
        let active_probes = [2, 5, 17];
        let mut trace = vec![Vec4::ONE; trace_idx(2, 0)];

        for probe in 0..2 {
            for ray in 0..DDGI_TRACE_RAYS_LIMIT {
                trace_probe(
                    uvec2(ray, probe),
                    &data,
                    &params,
                    &sdf,
                    &probes,
                    &active_probes,
                    sky,
                    surface,
                    &mut trace,
                );
            }
        }

        for probe in 0..2 {
            for ray in 0..DDGI_TRACE_RAYS_LIMIT {
                let result = trace[trace_idx(probe, ray)];

                if ray < 64 {
                    assert_eq!(vec4(0.1, 0.2, 0.3, DDGI_SKY_DISTANCE), result);
                } else {
                    // Rays above the budget are left untouched
                    assert_eq!(Vec4::ONE, result);
                }
            }
        }
    }

    #[test]
    fn hit() {
        let sdf = SphereSdf {
            center: vec3(500.0, 0.0, 0.0),
            radius: 100.0,
            voxel_size: 10.0,
        };

        let result = trace_probe_ray(
            &sdf,
            Ray::new(Vec3::ZERO, Vec3::X),
            2000.0,
            sky,
            surface,
        );

        assert_eq!(vec3(1.0, 0.5, 0.25), result.truncate());
        assert_abs_diff_eq!(405.0, result.w, epsilon = 2.5);
    }

    #[test]
    fn hit_beyond_max_distance() {
        let sdf = SphereSdf {
            center: vec3(500.0, 0.0, 0.0),
            radius: 100.0,
            voxel_size: 10.0,
        };

        let result = trace_probe_ray(
            &sdf,
            Ray::new(Vec3::ZERO, Vec3::X),
            200.0,
            sky,
            surface,
        );

        assert_eq!(vec4(0.1, 0.2, 0.3, DDGI_SKY_DISTANCE), result);
    }

    #[test]
    fn embedded() {
        let sdf = SphereSdf {
            center: Vec3::ZERO,
            radius: 100.0,
            voxel_size: 10.0,
        };

        let result = trace_probe_ray(
            &sdf,
            Ray::new(vec3(10.0, 0.0, 0.0), Vec3::Y),
            2000.0,
            sky,
            surface,
        );

        assert_eq!(Vec3::ZERO, result.truncate());
        assert!(result.w < 0.0);
    }
}
