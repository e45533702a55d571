pub trait U32Ext
where
    Self: Sized,
{
    /// Packs two 16-bit values into one word, `lo` occupying the lower half.
    fn from_u16_pair(lo: u32, hi: u32) -> Self;

    /// See: [`Self::from_u16_pair()`].
    fn to_u16_pair(self) -> [u32; 2];
}

impl U32Ext for u32 {
    fn from_u16_pair(lo: u32, hi: u32) -> Self {
        (lo & 0xffff) | ((hi & 0xffff) << 16)
    }

    fn to_u16_pair(self) -> [u32; 2] {
        [self & 0xffff, self >> 16]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_to_u16_pair() {
        assert_eq!([0xbabe, 0xcafe], u32::to_u16_pair(0xcafebabe));
        assert_eq!(0xcafebabe, u32::from_u16_pair(0xbabe, 0xcafe));
        assert_eq!([0xffff, 0], u32::to_u16_pair(u32::from_u16_pair(0xffff, 0)));

        // Values wider than 16 bits must not bleed into the other half
        assert_eq!([0x2345, 0x1], u32::from_u16_pair(0x12345, 0x1).to_u16_pair());
    }
}
