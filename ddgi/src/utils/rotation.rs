use std::f32::consts::TAU;

use glam::Quat;
use rand::Rng;

/// Returns a rotation picked uniformly at random.
///
/// See: Ken Shoemake, Uniform Random Rotations, Graphics Gems III.
pub fn random_rotation(rng: &mut impl Rng) -> Quat {
    let u1: f32 = rng.gen();
    let u2: f32 = rng.gen::<f32>() * TAU;
    let u3: f32 = rng.gen::<f32>() * TAU;

    let a = (1.0 - u1).sqrt();
    let b = u1.sqrt();

    Quat::from_xyzw(a * u2.sin(), a * u2.cos(), b * u3.sin(), b * u3.cos())
}
