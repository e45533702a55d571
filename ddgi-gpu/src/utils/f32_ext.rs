#[cfg(target_arch = "spirv")]
use spirv_std::num_traits::Float;

pub trait F32Ext
where
    Self: Sized,
{
    fn sqr(self) -> Self;
    fn saturate(self) -> Self;
    fn sign_not_zero(self) -> Self;

    /// Encodes value from `-1.0 ..= 1.0` as a signed-normalized 16-bit
    /// integer; values outside of that range get clamped.
    fn to_snorm16(self) -> u32;

    /// See: [`Self::to_snorm16()`].
    fn from_snorm16(bits: u32) -> Self;
}

impl F32Ext for f32 {
    fn sqr(self) -> Self {
        self * self
    }

    fn saturate(self) -> Self {
        self.clamp(0.0, 1.0)
    }

    fn sign_not_zero(self) -> Self {
        if self >= 0.0 {
            1.0
        } else {
            -1.0
        }
    }

    fn to_snorm16(self) -> u32 {
        let val = (self.clamp(-1.0, 1.0) * 32767.0).round() as i32;

        (val as u32) & 0xffff
    }

    fn from_snorm16(bits: u32) -> Self {
        let bits = bits & 0xffff;

        // Sign-extend from 16 bits
        let val = if bits >= 0x8000 {
            bits as i32 - 0x10000
        } else {
            bits as i32
        };

        (val as f32 / 32767.0).max(-1.0)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    #[test]
    fn snorm16() {
        for val in [-1.0, -0.75, -0.33, 0.0, 0.001, 0.5, 0.9999, 1.0] {
            let actual = f32::from_snorm16(f32::to_snorm16(val));

            assert_abs_diff_eq!(val, actual, epsilon = 1.0 / 32767.0);
        }

        assert_eq!(1.0, f32::from_snorm16(f32::to_snorm16(123.0)));
        assert_eq!(-1.0, f32::from_snorm16(f32::to_snorm16(-123.0)));
        assert_eq!(-1.0, f32::from_snorm16(0x8000));
        assert_eq!(0.0, f32::from_snorm16(f32::to_snorm16(-0.0)));
    }
}
