use glam::{ivec2, uvec2, IVec2, UVec2, Vec2, Vec4};
use spirv_std::arch::IndexUnchecked;
#[cfg(target_arch = "spirv")]
use spirv_std::num_traits::Float;

/// Two-dimensional, row-major view over a storage buffer.
///
/// Probe atlases and the surface atlas are kept in storage buffers rather
/// than textures, so that the same code can read them on the GPU and in
/// CPU-side tests.
#[derive(Clone, Copy)]
pub struct Texels<'a, T> {
    data: &'a [T],
    size: UVec2,
}

impl<'a, T> Texels<'a, T>
where
    T: Copy,
{
    pub fn new(data: &'a [T], size: UVec2) -> Self {
        Self { data, size }
    }

    pub fn size(&self) -> UVec2 {
        self.size
    }

    pub fn read(&self, pos: UVec2) -> T {
        unsafe { *self.data.index_unchecked(texel_idx(self.size, pos)) }
    }

    /// Reads texel at given signed position, clamping it to the edges.
    pub fn read_clamped(&self, pos: IVec2) -> T {
        let pos = pos.clamp(IVec2::ZERO, self.size.as_ivec2() - 1);

        self.read(pos.as_uvec2())
    }

    /// Returns the 2x2 footprint used to bilinearly filter at given position
    /// (in texel units, texel centers lying at `.5`), along with the
    /// interpolation factors.
    ///
    /// Samples are ordered `[top-left, top-right, bottom-left, bottom-right]`.
    pub fn gather(&self, pos: Vec2) -> ([T; 4], Vec2) {
        let pos = pos - 0.5;
        let base = pos.floor();
        let frac = pos - base;
        let base = base.as_ivec2();

        let samples = [
            self.read_clamped(base),
            self.read_clamped(base + ivec2(1, 0)),
            self.read_clamped(base + ivec2(0, 1)),
            self.read_clamped(base + ivec2(1, 1)),
        ];

        (samples, frac)
    }
}

impl<'a> Texels<'a, Vec4> {
    /// Samples this view with a bilinear filter, clamping at the edges.
    pub fn sample_bilinear(&self, pos: Vec2) -> Vec4 {
        let ([s00, s10, s01, s11], frac) = self.gather(pos);
        let weights = bilinear_weights(frac);

        s00 * weights.x + s10 * weights.y + s01 * weights.z + s11 * weights.w
    }
}

/// Mutable counterpart of [`Texels`].
pub struct TexelsMut<'a, T> {
    data: &'a mut [T],
    size: UVec2,
}

impl<'a, T> TexelsMut<'a, T>
where
    T: Copy,
{
    pub fn new(data: &'a mut [T], size: UVec2) -> Self {
        Self { data, size }
    }

    pub fn size(&self) -> UVec2 {
        self.size
    }

    pub fn read(&self, pos: UVec2) -> T {
        unsafe { *self.data.index_unchecked(texel_idx(self.size, pos)) }
    }

    pub fn write(&mut self, pos: UVec2, val: T) {
        unsafe {
            *self.data.index_unchecked_mut(texel_idx(self.size, pos)) = val;
        }
    }
}

/// Returns weights of the `[top-left, top-right, bottom-left, bottom-right]`
/// samples of a 2x2 footprint.
pub fn bilinear_weights(frac: Vec2) -> Vec4 {
    Vec4::new(
        (1.0 - frac.x) * (1.0 - frac.y),
        frac.x * (1.0 - frac.y),
        (1.0 - frac.x) * frac.y,
        frac.x * frac.y,
    )
}

fn texel_idx(size: UVec2, pos: UVec2) -> usize {
    (pos.y * size.x + pos.x) as usize
}

/// Returns position of the `idx`-th texel in a `size`-wide, row-major layout.
pub fn texel_pos(size: UVec2, idx: u32) -> UVec2 {
    uvec2(idx % size.x, idx / size.x)
}
