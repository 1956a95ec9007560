use std::{env, path::PathBuf};

use anyhow::Result;
use fs_extra::dir::{CopyOptions, copy};

/// Bundles `assets/` (the showcase model and its textures) with the build so the
/// native viewer finds it when started outside the crate directory.
fn main() -> Result<()> {
    println!("cargo:rerun-if-changed=assets");

    let manifest_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR")?);
    let assets = manifest_dir.join("assets");
    if !assets.is_dir() {
        return Ok(());
    }

    let out_dir = PathBuf::from(env::var("OUT_DIR")?);
    let options = CopyOptions {
        overwrite: true,
        ..CopyOptions::new()
    };
    copy(&assets, &out_dir, &options)?;
    println!(
        "cargo:rustc-env=VITRINE_ASSET_DIR={}",
        out_dir.join("assets").display()
    );

    Ok(())
}
