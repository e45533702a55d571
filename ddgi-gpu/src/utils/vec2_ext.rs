use glam::{vec2, Vec2};

use crate::F32Ext;

pub trait Vec2Ext
where
    Self: Sized,
{
    /// Like `signum()`, but returns `1.0` for zeros (including `-0.0`).
    fn sign_not_zero(self) -> Self;
}

impl Vec2Ext for Vec2 {
    fn sign_not_zero(self) -> Self {
        vec2(self.x.sign_not_zero(), self.y.sign_not_zero())
    }
}
