use glam::{uvec2, vec3, UVec2, Vec3};
use spirv_std::arch::IndexUnchecked;

use crate::{F32Ext, U32Ext};

/// State of a probe, as decided by the classifier.
#[repr(transparent)]
#[derive(Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(not(target_arch = "spirv"), derive(Debug))]
pub struct ProbeState(u32);

impl ProbeState {
    /// Probe is too far from any geometry to contribute - it's not traced,
    /// not updated and not sampled.
    pub const INACTIVE: Self = Self(0);

    /// Probe has just become active (or has been moved significantly); its
    /// history is discarded during the next blend.
    pub const ACTIVATED: Self = Self(1);

    /// Probe is active and accumulates history.
    pub const ACTIVE: Self = Self(2);

    pub fn new(val: u32) -> Self {
        Self(val)
    }

    pub fn get(self) -> u32 {
        self.0
    }

    pub fn is_inactive(self) -> bool {
        self == Self::INACTIVE
    }

    pub fn is_activated(self) -> bool {
        self == Self::ACTIVATED
    }
}

/// Per-probe state and relocation offset.
///
/// Stored as a pair of words: the offset is normalized by the probe spacing
/// and encoded as three snorm16s, the state occupies the remaining 16 bits.
#[derive(Clone, Copy, Default, PartialEq)]
#[cfg_attr(not(target_arch = "spirv"), derive(Debug))]
pub struct ProbeData {
    /// Relocation offset, normalized by spacing (`-1.0 ..= 1.0` per axis)
    pub offset: Vec3,
    pub state: ProbeState,
}

impl ProbeData {
    pub fn new(offset: Vec3, state: ProbeState) -> Self {
        Self { offset, state }
    }

    pub fn encode(self) -> UVec2 {
        uvec2(
            u32::from_u16_pair(
                self.offset.x.to_snorm16(),
                self.offset.y.to_snorm16(),
            ),
            u32::from_u16_pair(self.offset.z.to_snorm16(), self.state.get()),
        )
    }

    pub fn decode(data: UVec2) -> Self {
        let [x, y] = data.x.to_u16_pair();
        let [z, state] = data.y.to_u16_pair();

        Self {
            offset: vec3(
                f32::from_snorm16(x),
                f32::from_snorm16(y),
                f32::from_snorm16(z),
            ),
            state: ProbeState::new(state),
        }
    }

    pub fn read(buffer: &[UVec2], slot: usize) -> Self {
        Self::decode(unsafe { *buffer.index_unchecked(slot) })
    }

    pub fn write(self, buffer: &mut [UVec2], slot: usize) {
        unsafe {
            *buffer.index_unchecked_mut(slot) = self.encode();
        }
    }

    /// Returns relocation offset in world units.
    pub fn world_offset(self, spacing: f32) -> Vec3 {
        self.offset * spacing
    }
}
