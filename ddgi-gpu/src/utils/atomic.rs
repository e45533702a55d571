//! Atomic counters used to append into shared buffers.
//!
//! On the host these functions are plain read-modify-writes - CPU-side
//! dispatch emulation runs threads one after another, so there's nothing to
//! race against.

#[cfg(target_arch = "spirv")]
use spirv_std::memory::{Scope, Semantics};

/// Adds `value` to `target` with device-wide visibility and returns the value
/// from before the addition.
#[cfg(target_arch = "spirv")]
pub fn atomic_add(target: &mut u32, value: u32) -> u32 {
    unsafe {
        spirv_std::arch::atomic_i_add::<
            u32,
            { Scope::Device as u32 },
            { Semantics::NONE.bits() },
        >(target, value)
    }
}

/// Adds `value` to `target` with workgroup-wide visibility and returns the
/// value from before the addition.
#[cfg(target_arch = "spirv")]
pub fn atomic_add_workgroup(target: &mut u32, value: u32) -> u32 {
    unsafe {
        spirv_std::arch::atomic_i_add::<
            u32,
            { Scope::Workgroup as u32 },
            { Semantics::NONE.bits() },
        >(target, value)
    }
}

#[cfg(not(target_arch = "spirv"))]
pub fn atomic_add(target: &mut u32, value: u32) -> u32 {
    let prev = *target;

    *target = prev.wrapping_add(value);
    prev
}

#[cfg(not(target_arch = "spirv"))]
pub fn atomic_add_workgroup(target: &mut u32, value: u32) -> u32 {
    atomic_add(target, value)
}
