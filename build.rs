use std::env;

use anyhow::*;
use fs_extra::{copy_items, dir::CopyOptions};

fn main() -> Result<()> {
    // Tell Cargo to re-run `build.rs` if anything in `content/` changes. Cargo
    // does not expand globs itself so every file is listed individually.
    println!("cargo:rerun-if-changed=content");

    for entry in glob::glob("content/**/*")? {
        let path = entry?;

        if path.is_file() {
            println!("cargo:rerun-if-changed={}", path.display());
        }
    }

    // Copy the content directory to the build output directory, where the
    // engine looks for shaders, models, textures and the scene config.
    let out_dir = env::var("OUT_DIR")?;

    let copy_options = CopyOptions::new().overwrite(true);
    copy_items(&["content/"], out_dir, &copy_options)?;

    Ok(())
}
