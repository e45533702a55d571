use glam::{UVec2, Vec3, Vec4};

use crate::gpu;

/// Bakes given sky function into an octahedral map of
/// [`gpu::DDGI_SKY_RESOLUTION`]² texels.
pub fn bake_sky(sky: impl Fn(Vec3) -> Vec3) -> Vec<Vec4> {
    let size = UVec2::splat(gpu::DDGI_SKY_RESOLUTION);

    (0..size.x * size.y)
        .map(|idx| {
            let dir = gpu::Octahedral::texel_direction(
                gpu::texel_pos(size, idx),
                gpu::DDGI_SKY_RESOLUTION,
            );

            sky(dir).extend(1.0)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use glam::vec3;

    use super::*;

    #[test]
    fn bake_sky() {
        let texels = super::bake_sky(|dir| {
            if dir.y > 0.0 {
                vec3(0.2, 0.4, 1.0)
            } else {
                Vec3::ZERO
            }
        });

        assert_eq!(
            (gpu::DDGI_SKY_RESOLUTION * gpu::DDGI_SKY_RESOLUTION) as usize,
            texels.len()
        );

        let sky = gpu::SkyView::new(&texels);

        assert_relative_eq!(1.0, sky.sample(Vec3::Y).z, epsilon = 1e-4);
        assert_relative_eq!(0.0, sky.sample(-Vec3::Y).z, epsilon = 1e-4);
    }
}
