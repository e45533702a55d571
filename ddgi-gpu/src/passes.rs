use bytemuck::{Pod, Zeroable};
use glam::{IVec3, IVec4, UVec3, UVec4, Vec4Swizzles};

#[repr(C)]
#[derive(Clone, Copy, Default, Pod, Zeroable)]
#[cfg_attr(not(target_arch = "spirv"), derive(Debug))]
pub struct ProbeClassifyPassParams {
    pub cascade: u32,

    /// See: [`RelocationMode`]
    pub relocation_mode: u32,

    /// Whether all probes should be treated as newly spawned (e.g. after the
    /// view has teleported)
    pub reset: u32,

    pub _pad: u32,

    /// Number of probe planes that have scrolled into the grid this frame,
    /// per axis
    pub scroll_clear: UVec4,

    /// Direction of this frame's scroll (`-1`, `0` or `1`), per axis
    pub scroll_directions: IVec4,
}

impl ProbeClassifyPassParams {
    pub fn relocation_mode(&self) -> RelocationMode {
        RelocationMode::from_u32(self.relocation_mode)
    }

    /// Returns whether probe at given logical coordinates has just wrapped
    /// around to the other side of the grid and so holds stale data.
    pub fn is_scrolled_in(&self, coords: UVec3, counts: UVec3) -> bool {
        let clear = self.scroll_clear.xyz();
        let dirs: IVec3 = self.scroll_directions.xyz();

        is_scrolled_in(coords.x, counts.x, clear.x, dirs.x)
            || is_scrolled_in(coords.y, counts.y, clear.y, dirs.y)
            || is_scrolled_in(coords.z, counts.z, clear.z, dirs.z)
    }
}

fn is_scrolled_in(coord: u32, count: u32, clear: u32, dir: i32) -> bool {
    if clear == 0 {
        false
    } else if dir > 0 {
        coord + clear >= count
    } else {
        coord < clear
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
#[cfg_attr(not(target_arch = "spirv"), derive(Debug))]
pub enum RelocationMode {
    /// Probes inside geometry get nudged along the SDF gradient, a bit every
    /// frame
    Iterative,

    /// Probes get moved to the best spot from a small lattice of candidates
    /// around their base position
    Lattice,
}

impl RelocationMode {
    pub fn from_u32(val: u32) -> Self {
        if val == 0 {
            Self::Iterative
        } else {
            Self::Lattice
        }
    }

    pub fn to_u32(self) -> u32 {
        match self {
            Self::Iterative => 0,
            Self::Lattice => 1,
        }
    }
}

/// Parameters of passes that work on a batch of active probes.
#[repr(C)]
#[derive(Clone, Copy, Default, Pod, Zeroable)]
#[cfg_attr(not(target_arch = "spirv"), derive(Debug))]
pub struct ProbeBatchPassParams {
    pub cascade: u32,

    /// Index of the batch's first probe within the active probes list
    pub probes_offset: u32,

    /// Whether temporal history should be discarded
    pub reset_blend: u32,

    pub _pad: u32,
}

impl ProbeBatchPassParams {
    pub fn reset_blend(&self) -> bool {
        self.reset_blend != 0
    }
}

#[repr(C)]
#[derive(Clone, Copy, Default, Pod, Zeroable)]
#[cfg_attr(not(target_arch = "spirv"), derive(Debug))]
pub struct IndirectArgsPassParams {
    /// Number of batches the indirect-args buffer has room for
    pub batches_capacity: u32,

    pub _pad0: u32,
    pub _pad1: u32,
    pub _pad2: u32,
}

#[repr(C)]
#[derive(Clone, Copy, Default, Pod, Zeroable)]
#[cfg_attr(not(target_arch = "spirv"), derive(Debug))]
pub struct ProbeBordersPassParams {
    /// Resolution of a single tile, border excluded
    pub resolution: u32,

    /// Number of tiles in the atlas
    pub tiles_count: u32,

    pub _pad0: u32,
    pub _pad1: u32,
}

#[repr(C)]
#[derive(Clone, Copy, Default, Pod, Zeroable)]
#[cfg_attr(not(target_arch = "spirv"), derive(Debug))]
pub struct AtlasLightingPassParams {
    /// Number of entries in the tiles list
    pub tiles_count: u32,

    /// Size of the largest tile, in texels
    pub max_tile_size: u32,

    /// See: [`ApplyPassParams::bias`]
    pub bias: f32,

    pub _pad: u32,
}

#[repr(C)]
#[derive(Clone, Copy, Default, Pod, Zeroable)]
#[cfg_attr(not(target_arch = "spirv"), derive(Debug))]
pub struct ApplyPassParams {
    /// How far (relative to probe spacing) the sampling point gets pushed
    /// away from the surface
    pub bias: f32,

    pub _pad0: u32,
    pub _pad1: u32,
    pub _pad2: u32,
}
