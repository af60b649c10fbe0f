//! Check command - validate configuration and content

use std::{fs, path::Path};

use color_eyre::eyre::{Result, bail};
use numark_core::{Config, ContentType, frontmatter::parse_frontmatter};
use numark_parser::MarkdownProcessor;
use walkdir::WalkDir;

use super::load_config;

/// Validation result.
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    fn add_error(&mut self, msg: impl Into<String>) {
        self.errors.push(msg.into());
    }

    fn add_warning(&mut self, msg: impl Into<String>) {
        self.warnings.push(msg.into());
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// Run the check command.
///
/// Unreadable files and malformed frontmatter are errors; a missing title or
/// an empty body is a warning. `strict` fails on warnings too.
pub fn run(config_path: &Path, strict: bool) -> Result<ValidationResult> {
    tracing::info!(?config_path, strict, "Checking configuration and content");

    println!("Checking configuration...");
    let config = match load_config(config_path) {
        Ok(config) => {
            println!("  ✓ Configuration valid");
            config
        }
        Err(e) => {
            println!("  ✗ Configuration invalid: {e:#}");
            bail!("Validation failed: {e:#}");
        }
    };

    let result = check(&config);

    println!();
    println!("Summary:");
    println!("  Errors:   {}", result.errors.len());
    println!("  Warnings: {}", result.warnings.len());

    if result.has_errors() {
        println!();
        println!("Errors:");
        for err in &result.errors {
            println!("  ✗ {err}");
        }
    }

    if result.has_warnings() {
        println!();
        println!("Warnings:");
        for warn in &result.warnings {
            println!("  ⚠ {warn}");
        }
    }

    if result.has_errors() {
        bail!("Validation failed with {} error(s)", result.errors.len());
    }

    if strict && result.has_warnings() {
        bail!(
            "Validation failed with {} warning(s) (strict mode)",
            result.warnings.len()
        );
    }

    println!();
    println!("✓ All checks passed");

    Ok(result)
}

/// Validate the site described by `config` without building it.
pub fn check(config: &Config) -> ValidationResult {
    let mut result = ValidationResult::default();

    let input = config.input_path();
    if input.is_dir() {
        println!("\nChecking content files...");
        validate_content_files(config, &input, &mut result);
    } else {
        result.add_error(format!("Content directory does not exist: {}", input.display()));
    }

    println!("\nChecking directories...");
    for (label, dir) in [
        ("Templates", config.templates_path()),
        ("Assets", config.assets_path()),
        ("Public", config.public_path()),
    ] {
        if dir.is_dir() {
            println!("  ✓ {label} directory found");
        } else {
            println!("  - {label} directory not found (optional)");
        }
    }

    if config.base_url.is_empty() && (config.generate_sitemap || config.generate_rss) {
        result.add_warning("base_url is not set; sitemap.xml and rss.xml will be skipped");
    }

    result
}

fn validate_content_files(config: &Config, dir: &Path, result: &mut ValidationResult) {
    let processor = MarkdownProcessor::from_config(config);
    let mut checked = 0;
    let mut failed = 0;

    for entry in WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file() && ContentType::from_path(e.path()).is_some())
    {
        let path = entry.path();
        checked += 1;

        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) => {
                result.add_error(format!("{}: Failed to read file: {e}", path.display()));
                failed += 1;
                continue;
            }
        };

        if config.markdown.frontmatter {
            if let Err(e) = parse_frontmatter(&raw, path) {
                result.add_error(format!("{}: {e}", path.display()));
                failed += 1;
                continue;
            }
        }

        for problem in processor.validate(&raw).errors {
            result.add_warning(format!("{}: {problem}", path.display()));
        }
    }

    if failed == 0 {
        println!("  ✓ All {checked} content files readable");
    } else {
        println!("  ✗ {failed}/{checked} content files have errors");
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    fn site() -> (TempDir, Config) {
        let dir = TempDir::new().unwrap();
        let config = Config {
            root: dir.path().to_path_buf(),
            base_url: "https://example.com".to_string(),
            ..Config::default()
        };
        fs::create_dir_all(config.input_path()).unwrap();
        (dir, config)
    }

    #[test]
    fn test_clean_site_passes() {
        let (dir, config) = site();
        fs::write(dir.path().join("content/ok.md"), "---\ntitle: Ok\n---\nBody\n").unwrap();

        let result = check(&config);
        assert!(!result.has_errors());
        assert!(!result.has_warnings());
    }

    #[test]
    fn test_missing_title_is_a_warning() {
        let (dir, config) = site();
        fs::write(dir.path().join("content/untitled.md"), "Just text\n").unwrap();

        let result = check(&config);
        assert!(!result.has_errors());
        assert_eq!(result.warnings.len(), 1);
        assert!(result.warnings[0].contains("Missing title"));
    }

    #[test]
    fn test_malformed_frontmatter_is_an_error() {
        let (dir, config) = site();
        fs::write(dir.path().join("content/bad.md"), "---\n- just\n- a list\n---\nBody\n").unwrap();

        let result = check(&config);
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].contains("bad.md"));
    }

    #[test]
    fn test_missing_content_dir_is_an_error() {
        let dir = TempDir::new().unwrap();
        let config = Config {
            root: dir.path().to_path_buf(),
            ..Config::default()
        };

        let result = check(&config);
        assert!(result.has_errors());
        assert!(result.has_warnings());
    }
}
