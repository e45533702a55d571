use core::f32::consts::PI;

use glam::{vec3, Quat, Vec3};
#[cfg(target_arch = "spirv")]
use spirv_std::num_traits::Float;

use crate::F32Ext;

#[derive(Clone, Copy, Default)]
#[cfg_attr(not(target_arch = "spirv"), derive(Debug))]
pub struct Ray {
    origin: Vec3,
    direction: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self { origin, direction }
    }

    pub fn origin(&self) -> Vec3 {
        self.origin
    }

    pub fn direction(&self) -> Vec3 {
        self.direction
    }

    pub fn at(&self, time: f32) -> Vec3 {
        self.origin + self.direction * time
    }
}

/// Returns `idx`-th point out of `count` points distributed on a unit sphere
/// using the spherical Fibonacci lattice.
pub fn spherical_fibonacci(idx: u32, count: u32) -> Vec3 {
    let golden_ratio = (5.0f32.sqrt() * 0.5 + 0.5) - 1.0;
    let s = (idx as f32) * golden_ratio;
    let phi = 2.0 * PI * (s - s.floor());

    let cos_theta = 1.0 - (2.0 * (idx as f32) + 1.0) / (count as f32);
    let sin_theta = (1.0 - cos_theta.sqr()).saturate().sqrt();

    vec3(phi.cos() * sin_theta, phi.sin() * sin_theta, cos_theta)
}

/// Returns direction of the `idx`-th probe ray.
///
/// Directions follow a fixed lattice rotated by a per-frame random rotation,
/// so that over a couple of frames probes gather light from all directions
/// instead of the same `count` ones.
pub fn probe_ray_direction(idx: u32, count: u32, rotation: Quat) -> Vec3 {
    (rotation * spherical_fibonacci(idx, count)).normalize()
}
