//! Data layouts and algorithms shared by the DDGI shaders and the renderer.

#![cfg_attr(target_arch = "spirv", no_std)]
#![allow(clippy::len_without_is_empty)]
#![allow(clippy::manual_range_contains)]

mod border;
mod classifier;
mod ddgi;
mod indirect_args;
mod lighting;
mod octahedral;
mod passes;
mod probe;
mod ray;
mod sampler;
mod sdf;
mod sky;
mod surface_atlas;
mod texels;
mod tracer;
mod updater;
mod utils;

pub use self::border::*;
pub use self::classifier::*;
pub use self::ddgi::*;
pub use self::indirect_args::*;
pub use self::lighting::*;
pub use self::octahedral::*;
pub use self::passes::*;
pub use self::probe::*;
pub use self::ray::*;
pub use self::sampler::*;
pub use self::sdf::*;
pub use self::sky::*;
pub use self::surface_atlas::*;
pub use self::texels::*;
pub use self::tracer::*;
pub use self::updater::*;
pub use self::utils::*;

pub mod prelude {
    pub use spirv_std::arch::IndexUnchecked;
    pub use spirv_std::glam::*;
    #[cfg(target_arch = "spirv")]
    pub use spirv_std::num_traits::Float;
    pub use spirv_std::spirv;

    pub use crate::*;
}
