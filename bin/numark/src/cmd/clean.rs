//! Clean command - removes the output directory

use std::{fs, path::Path};

use color_eyre::eyre::{Result, WrapErr};

use super::load_config;

/// Remove the configured output directory. Returns whether anything was removed.
pub fn run(config_path: &Path) -> Result<bool> {
    let config = load_config(config_path)?;
    let output = config.output_path();

    if !output.exists() {
        println!("Nothing to clean: {} does not exist", output.display());
        return Ok(false);
    }

    fs::remove_dir_all(&output)
        .wrap_err_with(|| format!("Failed to remove {}", output.display()))?;

    tracing::info!(dir = %output.display(), "removed output directory");
    println!("Removed {}", output.display());
    Ok(true)
}
