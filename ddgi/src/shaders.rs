use std::path::Path;
use std::{fs, io};

use log::info;

macro_rules! shaders {
    ([ $( $name:ident => $entry_point:literal, )* ]) => {
        /// Compiled shader modules, as produced by `ddgi-shader-builder`.
        #[derive(Debug)]
        pub struct Shaders {
            $( pub $name: (wgpu::ShaderModule, &'static str), )*
        }

        impl Shaders {
            /// Loads all shader modules from given directory.
            pub fn load(
                device: &wgpu::Device,
                dir: impl AsRef<Path>,
            ) -> io::Result<Self> {
                let dir = dir.as_ref();

                info!("Loading shaders from `{}`", dir.display());

                Ok(Self {
                    $(
                        $name: (
                            load(device, dir, stringify!($name))?,
                            $entry_point,
                        ),
                    )*
                })
            }
        }
    };
}

shaders!([
    atlas_cull => "atlas_cull::main",
    atlas_lighting => "atlas_lighting::main",
    ddgi_apply => "ddgi_apply::main",
    ddgi_classify => "ddgi_classify::main",
    ddgi_init_args => "ddgi_init_args::main",
    ddgi_trace => "ddgi_trace::main",
    ddgi_update_irradiance => "ddgi_update::irradiance",
    ddgi_update_distance => "ddgi_update::distance",
    ddgi_update_borders_rows => "ddgi_update_borders::rows",
    ddgi_update_borders_columns => "ddgi_update_borders::columns",
]);

fn load(
    device: &wgpu::Device,
    dir: &Path,
    id: &str,
) -> io::Result<wgpu::ShaderModule> {
    let path = dir.join(format!("{id}.spv"));
    let bytes = fs::read(&path)?;

    if bytes.len() % 4 != 0 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("`{}` is not a valid SPIR-V module", path.display()),
        ));
    }

    Ok(device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(&format!("ddgi_{id}")),
        source: wgpu::util::make_spirv(&bytes),
    }))
}
