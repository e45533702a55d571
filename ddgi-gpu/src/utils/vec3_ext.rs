use glam::Vec3;

pub trait Vec3Ext
where
    Self: Sized,
{
    /// Applies `pow(x, exp)` on each component, treating negative values as
    /// zeros.
    fn powf_positive(self, exp: f32) -> Self;
}

impl Vec3Ext for Vec3 {
    fn powf_positive(self, exp: f32) -> Self {
        self.max(Vec3::ZERO).powf(exp)
    }
}
