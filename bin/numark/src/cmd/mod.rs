//! CLI command implementations.

pub mod build;
pub mod check;
pub mod clean;
pub mod dev;
pub mod new;

use std::path::Path;

use color_eyre::eyre::{Result, WrapErr, bail};
use numark_core::{Config, config::CONFIG_FILE_NAMES};

/// Load the configuration at `path`.
///
/// A missing file with one of the standard config names falls back to
/// discovery in its directory, so a site without any config file still
/// builds with defaults.
pub fn load_config(path: &Path) -> Result<Config> {
    if path.is_file() {
        return Config::load(path)
            .wrap_err_with(|| format!("Failed to load configuration from {}", path.display()));
    }

    let standard = path
        .file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| CONFIG_FILE_NAMES.contains(&n));
    if !standard {
        bail!("Configuration file not found: {}", path.display());
    }

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    Config::discover(dir).wrap_err("Failed to load configuration")
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_load_config_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("numark.toml");
        fs::write(&path, "title = \"From File\"\n").unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.title, "From File");
        assert_eq!(config.root, dir.path());
    }

    #[test]
    fn test_missing_standard_config_uses_defaults() {
        let dir = TempDir::new().unwrap();

        let config = load_config(&dir.path().join("numark.toml")).unwrap();
        assert_eq!(config.title, "My NuMark Site");
        assert_eq!(config.root, dir.path());
    }

    #[test]
    fn test_discovery_finds_other_formats() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("numark.yaml"), "title: From YAML\n").unwrap();

        let config = load_config(&dir.path().join("numark.toml")).unwrap();
        assert_eq!(config.title, "From YAML");
    }

    #[test]
    fn test_missing_custom_config_is_an_error() {
        let dir = TempDir::new().unwrap();
        assert!(load_config(&dir.path().join("site.toml")).is_err());
    }
}
