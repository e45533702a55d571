//! Compiles `ddgi-shaders` into one SPIR-V module per entry point.
//!
//! Usage: `ddgi-shader-builder [output-dir]`; modules land in the output
//! directory (`target/ddgi-shaders` by default) as `<shader-id>.spv`, which is
//! what `ddgi::Shaders::load()` expects.

use std::error::Error;
use std::path::{Path, PathBuf};
use std::{env, fs};

use spirv_builder::{Capability, MetadataPrintout, SpirvBuilder};

fn main() -> Result<(), Box<dyn Error>> {
    let root = Path::new(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .ok_or("couldn't find workspace root")?;

    let crate_path = root.join("ddgi-shaders");

    let out_dir = env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| root.join("target").join("ddgi-shaders"));

    let result = SpirvBuilder::new(crate_path, "spirv-unknown-spv1.3")
        .multimodule(true)
        .print_metadata(MetadataPrintout::None)
        .capability(Capability::Int8)
        .build()?;

    fs::create_dir_all(&out_dir)?;

    for (shader_name, shader_path) in result.module.unwrap_multi() {
        let shader_id = shader_name.replace("::", "_");
        let shader_id = shader_id.strip_suffix("_main").unwrap_or(&shader_id);
        let target = out_dir.join(format!("{shader_id}.spv"));

        fs::copy(shader_path, &target)?;

        println!("{shader_id} ({shader_name}) -> {}", target.display());
    }

    Ok(())
}
