#![cfg_attr(target_arch = "spirv", no_std)]

pub mod atlas_cull;
pub mod atlas_lighting;
pub mod ddgi_apply;
pub mod ddgi_classify;
pub mod ddgi_init_args;
pub mod ddgi_trace;
pub mod ddgi_update;
pub mod ddgi_update_borders;
