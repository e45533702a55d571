use log::debug;

use crate::{DdgiBuffers, DdgiConfig, Shaders};

macro_rules! passes {
    ([ $( $name:ident => $class:ident, )* ]) => {
        $( mod $name; )*
        $( pub use self::$name::*; )*

        #[derive(Debug)]
        pub struct DdgiPasses {
            $( pub $name: $class, )*
        }

        impl DdgiPasses {
            pub fn new(
                device: &wgpu::Device,
                config: &DdgiConfig,
                shaders: &Shaders,
                buffers: &DdgiBuffers,
            ) -> Self {
                debug!("Initializing passes");

                Self {
                    $( $name: $class::new(device, config, shaders, buffers), )*
                }
            }
        }
    };
}

passes!([
    atlas_culling => AtlasCullingPass,
    atlas_lighting => AtlasLightingPass,
    indirect_args => IndirectArgsPass,
    indirect_lighting => IndirectLightingPass,
    probe_borders => ProbeBordersPass,
    probe_classification => ProbeClassificationPass,
    probe_tracing => ProbeTracingPass,
    probe_updating => ProbeUpdatingPass,
]);
