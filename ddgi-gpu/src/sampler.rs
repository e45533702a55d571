use core::f32::consts::PI;

use glam::{UVec2, UVec3, Vec3, Vec4, Vec4Swizzles};
#[cfg(target_arch = "spirv")]
use spirv_std::num_traits::Float;

use crate::{
    DdgiData, F32Ext, Octahedral, Texels, Vec3Ext,
    DDGI_PROBE_RESOLUTION_DISTANCE, DDGI_PROBE_RESOLUTION_IRRADIANCE,
};

/// Probe weights below this are crushed towards zero.
const CRUSH_THRESHOLD: f32 = 0.2;

/// Read-side of the probe volume: blends irradiance of the probes
/// surrounding given point.
#[derive(Clone, Copy)]
pub struct DdgiSampler<'a> {
    data: &'a DdgiData,
    probes: &'a [UVec2],
    irradiance: Texels<'a, Vec4>,
    distance: Texels<'a, Vec4>,
}

impl<'a> DdgiSampler<'a> {
    pub fn new(
        data: &'a DdgiData,
        probes: &'a [UVec2],
        irradiance: Texels<'a, Vec4>,
        distance: Texels<'a, Vec4>,
    ) -> Self {
        Self {
            data,
            probes,
            irradiance,
            distance,
        }
    }

    /// Returns irradiance arriving at given point, blending all cascades that
    /// contain it.
    ///
    /// Points near the edge of a cascade get blended with the next cascade,
    /// points near the edge of the outermost cascade fade to black.
    pub fn sample(&self, pos: Vec3, normal: Vec3, bias: f32) -> Vec3 {
        let cascades_count = self.data.cascades_count();
        let mut cascade = 0;

        while cascade < cascades_count {
            let fade = self.cascade_fade(cascade, pos);

            if fade > 0.0 {
                let irradiance = self.sample_cascade(cascade, pos, normal, bias);

                if fade >= 1.0 {
                    return irradiance;
                }

                let next = if cascade + 1 < cascades_count {
                    self.sample_cascade(cascade + 1, pos, normal, bias)
                } else {
                    Vec3::ZERO
                };

                return next + (irradiance - next) * fade;
            }

            cascade += 1;
        }

        Vec3::ZERO
    }

    /// Returns how much given cascade covers given point: one inside, zero
    /// outside, linear over the last half-spacing near the edge.
    pub fn cascade_fade(&self, cascade: u32, pos: Vec3) -> f32 {
        let spacing = self.data.spacing(cascade);
        let extent = self.data.probes_extent(cascade);
        let center = self.data.probes_center(cascade);
        let edge_distance = (extent - (pos - center).abs()).min_element();

        (edge_distance / (spacing * 0.5)).saturate()
    }

    /// Returns irradiance arriving at given point, as seen by the probes of
    /// a single cascade.
    pub fn sample_cascade(
        &self,
        cascade: u32,
        pos: Vec3,
        normal: Vec3,
        bias: f32,
    ) -> Vec3 {
        let spacing = self.data.spacing(cascade);
        let counts = self.data.counts();
        let grid_min =
            self.data.probes_center(cascade) - self.data.probes_extent(cascade);

        let view_dir = (self.data.view_pos() - pos).normalize_or_zero();
        let biased_pos =
            pos + (normal * 0.2 + view_dir * 0.8) * (0.75 * spacing * bias);

        let base = ((pos - grid_min) / spacing)
            .floor()
            .max(Vec3::ZERO)
            .as_uvec3()
            .min(counts - 2);

        let base_pos = grid_min + base.as_vec3() * spacing;
        let alpha = ((biased_pos - base_pos) / spacing).clamp(Vec3::ZERO, Vec3::ONE);

        let mut sum = Vec3::ZERO;
        let mut sum_weight = 0.0;
        let mut corner = 0;

        while corner < 8 {
            let offset = corner_offset(corner);
            let coords = (base + offset).min(counts - 1);

            let weight = self.probe_weight(
                cascade, coords, offset, alpha, pos, biased_pos, normal,
            );

            if weight > 0.0 {
                let index = self.data.probe_index(coords);
                let physical = self.data.probe_physical_index(cascade, index);

                let uv = self.data.probe_atlas_pos(
                    cascade,
                    physical,
                    Octahedral::encode(normal),
                    DDGI_PROBE_RESOLUTION_IRRADIANCE,
                );

                let irradiance = self
                    .irradiance
                    .sample_bilinear(uv)
                    .xyz()
                    .powf_positive(self.data.irradiance_gamma * 0.5);

                sum += irradiance * weight;
                sum_weight += weight;
            }

            corner += 1;
        }

        if sum_weight <= 0.0 {
            return Vec3::ZERO;
        }

        let irradiance = sum / sum_weight;

        irradiance * irradiance * (2.0 * PI)
    }

    /// Returns weight of the probe at given coordinates when shading given
    /// point; inactive probes always get zero.
    #[allow(clippy::too_many_arguments)]
    pub fn probe_weight(
        &self,
        cascade: u32,
        coords: UVec3,
        offset: UVec3,
        alpha: Vec3,
        pos: Vec3,
        biased_pos: Vec3,
        normal: Vec3,
    ) -> f32 {
        let index = self.data.probe_index(coords);
        let probe = self.data.read_probe(self.probes, cascade, index);

        if probe.state.is_inactive() {
            return 0.0;
        }

        let probe_pos = self.data.probe_relocated_position(cascade, index, probe);

        // Smooth backface test
        let to_probe = (probe_pos - pos).normalize_or_zero();
        let mut weight = (to_probe.dot(normal) * 0.5 + 0.5).sqr();

        // Chebyshev visibility test
        let probe_to_biased = biased_pos - probe_pos;
        let biased_distance = probe_to_biased.length();

        let uv = self.data.probe_atlas_pos(
            cascade,
            self.data.probe_physical_index(cascade, index),
            Octahedral::encode(probe_to_biased.normalize_or_zero()),
            DDGI_PROBE_RESOLUTION_DISTANCE,
        );

        let moments = self.distance.sample_bilinear(uv).xy();

        if biased_distance > moments.x {
            let variance = (moments.x.sqr() - moments.y).abs();
            let chebyshev =
                variance / (variance + (biased_distance - moments.x).sqr());

            weight *= (chebyshev * chebyshev * chebyshev).max(0.05);
        }

        let mut weight = weight.max(0.000001);

        if weight < CRUSH_THRESHOLD {
            weight *= weight.sqr() / CRUSH_THRESHOLD.sqr();
        }

        let trilinear = trilinear_weights(offset, alpha);

        weight * (trilinear.x * trilinear.y * trilinear.z).max(0.001)
    }
}

fn corner_offset(corner: u32) -> UVec3 {
    UVec3::new(corner & 1, (corner >> 1) & 1, (corner >> 2) & 1)
}

fn trilinear_weights(offset: UVec3, alpha: Vec3) -> Vec3 {
    let offset = offset.as_vec3();

    (Vec3::ONE - alpha) * (Vec3::ONE - offset) + alpha * offset
}

#[cfg(test)]
pub(crate) mod tests {
    use approx::assert_relative_eq;
    use glam::{uvec3, uvec4, vec3, vec4};

    use super::*;
    use crate::{ProbeData, ProbeState};

    const SPACING: f32 = 100.0;

    pub(crate) struct Fixture {
        pub data: DdgiData,
        probes: Vec<UVec2>,
        irradiance: Vec<Vec4>,
        distance: Vec<Vec4>,
    }

    impl Fixture {
        pub fn new(cascades: u32) -> Self {
            let mut data = DdgiData {
                probes_counts: uvec4(4, 4, 4, cascades),
                view_pos: vec4(0.0, 0.0, 0.0, 1000.0),
                irradiance_gamma: 5.0,
                ..Default::default()
            };

            for cascade in 0..cascades {
                data.origin_and_spacing[cascade as usize] =
                    vec4(0.0, 0.0, 0.0, SPACING * (1 << cascade) as f32);
            }

            let probes = vec![UVec2::ZERO; (data.probes_per_cascade() * cascades) as usize];

            let irradiance_size = data.atlas_size(DDGI_PROBE_RESOLUTION_IRRADIANCE);
            let irradiance = vec![Vec4::ZERO; (irradiance_size.x * irradiance_size.y) as usize];

            // Nothing occludes anything
            let distance_size = data.atlas_size(DDGI_PROBE_RESOLUTION_DISTANCE);
            let distance = vec![
                vec4(1e4, 1e8, 0.0, 0.0);
                (distance_size.x * distance_size.y) as usize
            ];

            Self {
                data,
                probes,
                irradiance,
                distance,
            }
        }

        /// Activates all probes of given cascade and fills them with given
        /// (linear) irradiance.
        pub fn fill(&mut self, cascade: u32, state: ProbeState, irradiance: Vec3) {
            let size = self.data.atlas_size(DDGI_PROBE_RESOLUTION_IRRADIANCE);
            let tile = DDGI_PROBE_RESOLUTION_IRRADIANCE + 2;
            let stored = irradiance.powf(1.0 / self.data.irradiance_gamma);

            for index in 0..self.data.probes_per_cascade() {
                let slot = self.data.probe_slot(cascade, index);

                ProbeData::new(Vec3::ZERO, state).write(&mut self.probes, slot);

                let origin = self.data.probe_tile_origin(
                    cascade,
                    index,
                    DDGI_PROBE_RESOLUTION_IRRADIANCE,
                );

                for y in 0..tile {
                    for x in 0..tile {
                        let pos = origin + UVec2::new(x, y);

                        self.irradiance[(pos.y * size.x + pos.x) as usize] =
                            stored.extend(1.0);
                    }
                }
            }
        }

        pub fn sampler(&self) -> DdgiSampler<'_> {
            DdgiSampler::new(
                &self.data,
                &self.probes,
                Texels::new(
                    &self.irradiance,
                    self.data.atlas_size(DDGI_PROBE_RESOLUTION_IRRADIANCE),
                ),
                Texels::new(
                    &self.distance,
                    self.data.atlas_size(DDGI_PROBE_RESOLUTION_DISTANCE),
                ),
            )
        }
    }

    #[test]
    fn inactive_probes_have_no_weight() {
        let mut fixture = Fixture::new(1);

        fixture.fill(0, ProbeState::INACTIVE, Vec3::splat(10.0));

        let sampler = fixture.sampler();

        for pos in [
            vec3(0.0, 0.0, 0.0),
            vec3(-120.0, 30.0, 80.0),
            vec3(140.0, -140.0, 10.0),
        ] {
            for normal in [Vec3::X, -Vec3::Y, vec3(1.0, 1.0, -1.0).normalize()] {
                for coords in [uvec3(0, 0, 0), uvec3(1, 2, 3), uvec3(3, 3, 3)] {
                    let weight = sampler.probe_weight(
                        0,
                        coords,
                        UVec3::ZERO,
                        Vec3::splat(0.5),
                        pos,
                        pos + normal,
                        normal,
                    );

                    assert_eq!(0.0, weight);
                }

                assert_eq!(Vec3::ZERO, sampler.sample(pos, normal, 1.0));
            }
        }
    }

    #[test]
    fn uniform_irradiance() {
        let mut fixture = Fixture::new(1);

        fixture.fill(0, ProbeState::ACTIVE, Vec3::splat(0.5));

        let actual = fixture.sampler().sample(vec3(10.0, -20.0, 30.0), Vec3::Y, 1.0);

        assert_relative_eq!(0.5 * 2.0 * PI, actual.x, max_relative = 1e-3);
        assert_relative_eq!(0.5 * 2.0 * PI, actual.y, max_relative = 1e-3);
        assert_relative_eq!(0.5 * 2.0 * PI, actual.z, max_relative = 1e-3);
    }

    #[test]
    fn cascades_fade() {
        let mut fixture = Fixture::new(2);

        fixture.fill(0, ProbeState::ACTIVE, Vec3::splat(1.0));
        fixture.fill(1, ProbeState::ACTIVE, Vec3::splat(0.25));

        let sampler = fixture.sampler();

        // Cascade 0 spans -150 ..= 150, cascade 1 spans -300 ..= 300
        let expected0 = 2.0 * PI;
        let expected1 = 0.25 * 2.0 * PI;

        let inner = sampler.sample(vec3(0.0, 0.0, 0.0), Vec3::X, 1.0);
        let blended = sampler.sample(vec3(125.0, 0.0, 0.0), Vec3::X, 1.0);
        let outer = sampler.sample(vec3(200.0, 0.0, 0.0), Vec3::X, 1.0);
        let fading = sampler.sample(vec3(0.0, 250.0, 0.0), Vec3::X, 1.0);
        let outside = sampler.sample(vec3(0.0, 0.0, 400.0), Vec3::X, 1.0);

        assert_relative_eq!(expected0, inner.x, max_relative = 1e-3);

        assert_relative_eq!(
            0.5 * (expected0 + expected1),
            blended.x,
            max_relative = 1e-3
        );

        assert_relative_eq!(expected1, outer.x, max_relative = 1e-3);
        assert_relative_eq!(0.5 * expected1, fading.x, max_relative = 1e-3);
        assert_eq!(Vec3::ZERO, outside);
    }
}
