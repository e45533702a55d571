use bytemuck::{Pod, Zeroable};
use glam::{vec3, UVec3, UVec4, Vec3, Vec4, Vec4Swizzles};
use spirv_std::arch::IndexUnchecked;
#[cfg(target_arch = "spirv")]
use spirv_std::num_traits::Float;

use crate::{lerp, Ray};

/// Maximum number of cascades of the Global SDF.
pub const SDF_MAX_CASCADES: usize = 4;

/// Maximum number of steps taken by the sphere tracer.
pub const SDF_TRACE_MAX_STEPS: u32 = 128;

/// Scene representation that can be queried for distance to the nearest
/// surface.
///
/// Only [`Self::sample()`] and [`Self::voxel_size()`] are mandatory - the
/// remaining operations are derived from them.
pub trait Sdf {
    /// Returns signed distance to the nearest surface (negative inside).
    fn sample(&self, pos: Vec3) -> f32;

    /// Returns size of a single voxel of given cascade; this is the
    /// precision at which the field is known.
    fn voxel_size(&self, cascade: u32) -> f32;

    /// Returns index of the finest cascade containing given position.
    fn cascade_at(&self, _pos: Vec3) -> u32 {
        0
    }

    /// Returns normalized gradient (pointing away from the surface) and the
    /// signed distance at given position.
    fn sample_gradient(&self, pos: Vec3) -> (Vec3, f32) {
        let h = self.voxel_size(self.cascade_at(pos)) * 0.5;

        let gradient = vec3(
            self.sample(pos + vec3(h, 0.0, 0.0))
                - self.sample(pos - vec3(h, 0.0, 0.0)),
            self.sample(pos + vec3(0.0, h, 0.0))
                - self.sample(pos - vec3(0.0, h, 0.0)),
            self.sample(pos + vec3(0.0, 0.0, h))
                - self.sample(pos - vec3(0.0, 0.0, h)),
        );

        (gradient.normalize_or_zero(), self.sample(pos))
    }

    /// Marches given ray through the field up to `max_distance`.
    fn trace(&self, ray: Ray, max_distance: f32) -> SdfHit {
        let mut time = 0.0;
        let mut step = 0;

        while step < SDF_TRACE_MAX_STEPS && time < max_distance {
            let pos = ray.at(time);
            let cascade = self.cascade_at(pos);
            let distance = self.sample(pos);
            let threshold = self.voxel_size(cascade) * 0.25;

            if distance < threshold {
                return SdfHit {
                    time,
                    sdf: distance,
                    cascade,
                    normal: self.sample_gradient(pos).0,
                    is_hit: true,
                };
            }

            time += distance.max(threshold);
            step += 1;
        }

        SdfHit::none()
    }
}

#[derive(Clone, Copy, Default)]
#[cfg_attr(not(target_arch = "spirv"), derive(Debug))]
pub struct SdfHit {
    /// Distance along the ray at which the surface has been found
    pub time: f32,

    /// Value of the field at the hit point (non-positive means that the ray
    /// has been inside the geometry)
    pub sdf: f32,

    pub cascade: u32,
    pub normal: Vec3,
    pub is_hit: bool,
}

impl SdfHit {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn is_hit(&self) -> bool {
        self.is_hit
    }

    pub fn position(&self, ray: Ray) -> Vec3 {
        ray.at(self.time)
    }
}

/// Describes layout of the Global SDF's voxel buffer.
#[repr(C)]
#[derive(Clone, Copy, Default, Pod, Zeroable)]
#[cfg_attr(not(target_arch = "spirv"), derive(Debug))]
pub struct GlobalSdfData {
    /// Per cascade: center (xyz) and half-extent (w)
    pub cascades: [Vec4; SDF_MAX_CASCADES],

    /// Voxels per axis (x) and number of cascades (y)
    pub params: UVec4,
}

impl GlobalSdfData {
    pub fn resolution(&self) -> u32 {
        self.params.x
    }

    pub fn cascades_count(&self) -> u32 {
        self.params.y
    }

    pub fn center(&self, cascade: u32) -> Vec3 {
        self.cascades[cascade as usize].xyz()
    }

    pub fn extent(&self, cascade: u32) -> f32 {
        self.cascades[cascade as usize].w
    }

    pub fn voxel_size(&self, cascade: u32) -> f32 {
        2.0 * self.extent(cascade) / (self.resolution() as f32)
    }

    /// Returns the number of voxels across all cascades.
    pub fn voxels_count(&self) -> usize {
        let res = self.resolution() as usize;

        res * res * res * (self.cascades_count() as usize)
    }
}

/// Multi-cascade signed distance volume, sampled trilinearly.
///
/// Voxels are laid out cascade after cascade, each cascade in x-major order;
/// a voxel's value is the distance measured at its center.
#[derive(Clone, Copy)]
pub struct GlobalSdfView<'a> {
    data: &'a GlobalSdfData,
    voxels: &'a [f32],
}

impl<'a> GlobalSdfView<'a> {
    pub fn new(data: &'a GlobalSdfData, voxels: &'a [f32]) -> Self {
        Self { data, voxels }
    }

    fn contains(&self, cascade: u32, pos: Vec3) -> bool {
        let margin = self.data.voxel_size(cascade);
        let dist = (pos - self.data.center(cascade)).abs().max_element();

        dist < self.data.extent(cascade) - margin
    }

    fn voxel(&self, cascade: u32, x: u32, y: u32, z: u32) -> f32 {
        let res = self.data.resolution();
        let idx = cascade * res * res * res + z * res * res + y * res + x;

        unsafe { *self.voxels.index_unchecked(idx as usize) }
    }

    fn sample_cascade(&self, cascade: u32, pos: Vec3) -> f32 {
        let res = self.data.resolution();
        let voxel_size = self.data.voxel_size(cascade);

        let volume_min =
            self.data.center(cascade) - Vec3::splat(self.data.extent(cascade));

        let pos = ((pos - volume_min) / voxel_size - 0.5)
            .clamp(Vec3::ZERO, Vec3::splat((res - 1) as f32));

        let base = pos.floor().as_uvec3().min(UVec3::splat(res - 2));
        let frac = pos - base.as_vec3();

        let c000 = self.voxel(cascade, base.x, base.y, base.z);
        let c100 = self.voxel(cascade, base.x + 1, base.y, base.z);
        let c010 = self.voxel(cascade, base.x, base.y + 1, base.z);
        let c110 = self.voxel(cascade, base.x + 1, base.y + 1, base.z);
        let c001 = self.voxel(cascade, base.x, base.y, base.z + 1);
        let c101 = self.voxel(cascade, base.x + 1, base.y, base.z + 1);
        let c011 = self.voxel(cascade, base.x, base.y + 1, base.z + 1);
        let c111 = self.voxel(cascade, base.x + 1, base.y + 1, base.z + 1);

        let c00 = lerp(c000, c100, frac.x);
        let c10 = lerp(c010, c110, frac.x);
        let c01 = lerp(c001, c101, frac.x);
        let c11 = lerp(c011, c111, frac.x);

        lerp(lerp(c00, c10, frac.y), lerp(c01, c11, frac.y), frac.z)
    }
}

impl Sdf for GlobalSdfView<'_> {
    fn sample(&self, pos: Vec3) -> f32 {
        let mut cascade = 0;

        while cascade < self.data.cascades_count() {
            if self.contains(cascade, pos) {
                return self.sample_cascade(cascade, pos);
            }

            cascade += 1;
        }

        // Outside of all cascades we know nothing about the scene, so let's
        // report it as empty space
        self.data.extent(self.data.cascades_count() - 1)
    }

    fn voxel_size(&self, cascade: u32) -> f32 {
        self.data.voxel_size(cascade)
    }

    fn cascade_at(&self, pos: Vec3) -> u32 {
        let mut cascade = 0;

        while cascade < self.data.cascades_count() {
            if self.contains(cascade, pos) {
                return cascade;
            }

            cascade += 1;
        }

        self.data.cascades_count() - 1
    }
}

/// Analytic sphere, for tests of the code that consumes an [`Sdf`].
#[cfg(test)]
pub(crate) struct SphereSdf {
    pub center: Vec3,
    pub radius: f32,
    pub voxel_size: f32,
}

#[cfg(test)]
impl Sdf for SphereSdf {
    fn sample(&self, pos: Vec3) -> f32 {
        (pos - self.center).length() - self.radius
    }

    fn voxel_size(&self, _cascade: u32) -> f32 {
        self.voxel_size
    }
}
