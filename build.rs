use std::{env, path::PathBuf};

use anyhow::{Context, Result};
use fs_extra::{copy_items, dir::CopyOptions};

// Meshes and textures live in assets/ and are copied next to the build output.
fn main() -> Result<()> {
    println!("cargo:rerun-if-changed=assets");

    let manifest_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR")?);
    let assets = manifest_dir.join("assets");
    if !assets.exists() {
        return Ok(());
    }

    let out_dir = env::var("OUT_DIR")?;
    let options = CopyOptions {
        overwrite: true,
        ..CopyOptions::new()
    };
    copy_items(&[&assets], &out_dir, &options)
        .with_context(|| format!("could not copy {} to {out_dir}", assets.display()))?;
    Ok(())
}
