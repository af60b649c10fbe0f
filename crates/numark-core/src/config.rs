//! Site configuration management.
//!
//! Configuration is layered with the `config` crate: built-in defaults,
//! then the site's config file (TOML, JSON or YAML), then `NUMARK__*`
//! environment variables. Nested tables merge key by key.

use std::{
    collections::BTreeMap,
    path::{Component, Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// Config file names probed by [`Config::discover`], in order.
pub const CONFIG_FILE_NAMES: &[&str] = &["numark.toml", "numark.json", "numark.yaml", "numark.yml"];

/// Main configuration structure for NuMark.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Site title.
    #[serde(default = "default_title")]
    pub title: String,

    /// Site description for meta tags.
    #[serde(default = "default_description")]
    pub description: String,

    /// Site author name.
    #[serde(default)]
    pub author: String,

    /// Base URL for the site (e.g., "https://example.com"), no trailing slash.
    #[serde(default)]
    pub base_url: String,

    /// Document language code.
    #[serde(default = "default_language")]
    pub language: String,

    /// Directory holding Markdown content.
    #[serde(default = "default_input_dir")]
    pub input_dir: String,

    /// Output directory for the generated site.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    /// Directory scanned for file templates and layouts.
    #[serde(default = "default_templates_dir")]
    pub templates_dir: String,

    /// Directory holding themes (watched in development).
    #[serde(default = "default_themes_dir")]
    pub themes_dir: String,

    /// Directory holding stylesheets, images and scripts.
    #[serde(default = "default_assets_dir")]
    pub assets_dir: String,

    /// Directory copied verbatim over the output root.
    #[serde(default = "default_public_dir")]
    pub public_dir: String,

    /// Template used when neither frontmatter nor collection names one.
    #[serde(default = "default_name")]
    pub default_template: String,

    /// Layout used when frontmatter does not name one.
    #[serde(default = "default_name")]
    pub default_layout: String,

    /// Maximum excerpt length in characters.
    #[serde(default = "default_excerpt_length")]
    pub excerpt_length: usize,

    /// Display format for dates (`YYYY`, `MM`, `DD`, `HH`, `mm`, `ss`).
    #[serde(default = "default_date_format")]
    pub date_format: String,

    /// Accepted for compatibility; HTML is written unminified.
    #[serde(default = "default_true")]
    pub minify_html: bool,

    /// Minify processed stylesheets.
    #[serde(default = "default_true")]
    pub minify_css: bool,

    /// Accepted for compatibility; scripts are copied as-is.
    #[serde(default = "default_true")]
    pub minify_js: bool,

    /// Resize and re-encode raster images.
    #[serde(default = "default_true")]
    pub optimize_images: bool,

    /// Write `sitemap.xml` (requires `base_url`).
    #[serde(default = "default_true")]
    pub generate_sitemap: bool,

    /// Write `rss.xml` (requires `base_url`).
    #[serde(default = "default_true")]
    pub generate_rss: bool,

    /// Development mode: drafts are rendered and error pages carry details.
    #[serde(default)]
    pub development: bool,

    /// Development server settings.
    #[serde(default)]
    pub dev_server: DevServerConfig,

    /// SEO tag toggles.
    #[serde(default)]
    pub seo: SeoConfig,

    /// Named collections.
    #[serde(default = "default_collections")]
    pub collections: BTreeMap<String, CollectionConfig>,

    /// Markdown rendering options.
    #[serde(default)]
    pub markdown: MarkdownConfig,

    /// Theme settings.
    #[serde(default)]
    pub theme: ThemeConfig,

    /// Plugin names. Recorded but not loaded.
    #[serde(default)]
    pub plugins: Vec<String>,

    /// Directory relative paths are resolved against.
    #[serde(skip)]
    pub root: PathBuf,
}

/// Development server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DevServerConfig {
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,

    /// Open a browser after the first build.
    #[serde(default = "default_true")]
    pub open: bool,

    /// Inject the live-reload client and broadcast rebuilds.
    #[serde(default = "default_true")]
    pub livereload: bool,
}

/// SEO configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeoConfig {
    #[serde(default = "default_true")]
    pub generate_meta_tags: bool,

    #[serde(default = "default_true")]
    pub generate_open_graph: bool,

    #[serde(default = "default_true")]
    pub generate_twitter_card: bool,

    #[serde(default = "default_true")]
    pub generate_json_ld: bool,
}

/// Sort direction for a collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

/// Configuration for one named collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionConfig {
    /// Glob-style pattern describing the collection's files.
    #[serde(default)]
    pub pattern: String,

    /// Field pages are sorted by.
    #[serde(default = "default_sort_by")]
    pub sort_by: String,

    /// Sort direction.
    #[serde(default)]
    pub sort_order: SortOrder,

    /// Template for pages in this collection.
    #[serde(default)]
    pub template: Option<String>,

    /// Output path pattern, e.g. `/posts/:slug/`.
    #[serde(default)]
    pub permalink: Option<String>,
}

/// Markdown rendering configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkdownConfig {
    /// Tables, strikethrough, task lists and footnotes.
    #[serde(default = "default_true")]
    pub gfm: bool,

    /// Split a leading frontmatter block.
    #[serde(default = "default_true")]
    pub frontmatter: bool,

    /// Syntax-highlight fenced code blocks.
    #[serde(default = "default_true")]
    pub highlight: bool,

    /// Give headings `id` attributes matching the table of contents.
    #[serde(default = "default_true")]
    pub toc: bool,

    /// Wrap heading text in a self-link.
    #[serde(default = "default_true")]
    pub anchor_links: bool,
}

/// Theme configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThemeConfig {
    /// Theme name.
    #[serde(default = "default_name")]
    pub name: String,

    /// Extra stylesheet URLs linked from every page.
    #[serde(default)]
    pub custom_css: Vec<String>,

    /// Extra script URLs loaded on every page.
    #[serde(default)]
    pub custom_js: Vec<String>,
}

// Default value functions
fn default_title() -> String {
    "My NuMark Site".to_string()
}

fn default_description() -> String {
    "A modern static site built with NuMark".to_string()
}

fn default_language() -> String {
    "en".to_string()
}

fn default_input_dir() -> String {
    "content".to_string()
}

fn default_output_dir() -> String {
    "dist".to_string()
}

fn default_templates_dir() -> String {
    "templates".to_string()
}

fn default_themes_dir() -> String {
    "themes".to_string()
}

fn default_assets_dir() -> String {
    "assets".to_string()
}

fn default_public_dir() -> String {
    "public".to_string()
}

fn default_name() -> String {
    "default".to_string()
}

fn default_excerpt_length() -> usize {
    200
}

fn default_date_format() -> String {
    "YYYY-MM-DD".to_string()
}

fn default_true() -> bool {
    true
}

fn default_port() -> u16 {
    3000
}

fn default_host() -> String {
    "localhost".to_string()
}

/// Absolute, lexically normalized form of `path`. The path need not exist.
fn normalize_path(path: &Path) -> PathBuf {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    };

    let mut normalized = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other),
        }
    }
    normalized
}

fn default_sort_by() -> String {
    "date".to_string()
}

fn default_collections() -> BTreeMap<String, CollectionConfig> {
    BTreeMap::from([
        (
            "posts".to_string(),
            CollectionConfig {
                pattern: "posts/**/*.md".to_string(),
                sort_by: "date".to_string(),
                sort_order: SortOrder::Desc,
                template: Some("post".to_string()),
                permalink: Some("/posts/:slug/".to_string()),
            },
        ),
        (
            "pages".to_string(),
            CollectionConfig {
                pattern: "pages/**/*.md".to_string(),
                sort_by: "title".to_string(),
                sort_order: SortOrder::Asc,
                template: Some("page".to_string()),
                permalink: Some("/:slug/".to_string()),
            },
        ),
    ])
}

impl Default for Config {
    fn default() -> Self {
        Self {
            title: default_title(),
            description: default_description(),
            author: String::new(),
            base_url: String::new(),
            language: default_language(),
            input_dir: default_input_dir(),
            output_dir: default_output_dir(),
            templates_dir: default_templates_dir(),
            themes_dir: default_themes_dir(),
            assets_dir: default_assets_dir(),
            public_dir: default_public_dir(),
            default_template: default_name(),
            default_layout: default_name(),
            excerpt_length: default_excerpt_length(),
            date_format: default_date_format(),
            minify_html: true,
            minify_css: true,
            minify_js: true,
            optimize_images: true,
            generate_sitemap: true,
            generate_rss: true,
            development: false,
            dev_server: DevServerConfig::default(),
            seo: SeoConfig::default(),
            collections: default_collections(),
            markdown: MarkdownConfig::default(),
            theme: ThemeConfig::default(),
            plugins: Vec::new(),
            root: PathBuf::new(),
        }
    }
}

impl Default for DevServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            open: true,
            livereload: true,
        }
    }
}

impl Default for SeoConfig {
    fn default() -> Self {
        Self {
            generate_meta_tags: true,
            generate_open_graph: true,
            generate_twitter_card: true,
            generate_json_ld: true,
        }
    }
}

impl Default for MarkdownConfig {
    fn default() -> Self {
        Self {
            gfm: true,
            frontmatter: true,
            highlight: true,
            toc: true,
            anchor_links: true,
        }
    }
}

impl Default for ThemeConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            custom_css: Vec::new(),
            custom_js: Vec::new(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML, JSON or YAML file layered over the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(CoreError::config(format!(
                "Configuration file not found: {}",
                path.display()
            )));
        }

        let defaults = config::Config::try_from(&Config::default())?;
        let settings = config::Config::builder()
            .add_source(defaults)
            .add_source(config::File::from(path))
            .add_source(
                config::Environment::with_prefix("NUMARK")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| {
                CoreError::config_with_source(
                    format!("Failed to parse config file: {}", path.display()),
                    e,
                )
            })?;

        let mut config: Config = settings.try_deserialize()?;
        config.root = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        config.normalize();
        config.validate()?;

        tracing::debug!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Find a config file in `dir`, falling back to defaults rooted at `dir`.
    pub fn discover(dir: &Path) -> Result<Self> {
        for name in CONFIG_FILE_NAMES {
            let candidate = dir.join(name);
            if candidate.is_file() {
                return Self::load(&candidate);
            }
        }

        tracing::info!(dir = %dir.display(), "no config file found, using defaults");
        let mut config = Config {
            root: dir.to_path_buf(),
            ..Config::default()
        };
        config.normalize();
        config.validate()?;
        Ok(config)
    }

    /// Write the configuration to `path`, choosing the format by extension.
    pub fn save(&self, path: &Path) -> Result<()> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_lowercase();

        let content = match ext.as_str() {
            "toml" => toml::to_string_pretty(self)?,
            "json" => serde_json::to_string_pretty(self)?,
            "yaml" | "yml" => serde_yaml::to_string(self)?,
            other => {
                return Err(CoreError::config(format!(
                    "Unsupported config file format: .{other}"
                )));
            }
        };

        std::fs::write(path, content)?;
        Ok(())
    }

    fn normalize(&mut self) {
        if self.base_url.ends_with('/') {
            self.base_url = self.base_url.trim_end_matches('/').to_string();
        }
    }

    /// Validate the configuration, collecting every violation.
    pub fn validate(&self) -> Result<()> {
        let mut errors = Vec::new();

        if self.title.trim().is_empty() {
            errors.push("Site title is required".to_string());
        }
        if self.input_dir.trim().is_empty() {
            errors.push("Input directory is required".to_string());
        }
        if self.output_dir.trim().is_empty() {
            errors.push("Output directory is required".to_string());
        }

        for (name, collection) in &self.collections {
            if collection.pattern.trim().is_empty() {
                errors.push(format!("Collection '{name}' must have a pattern"));
            }
        }

        if self.dev_server.port == 0 {
            errors.push("Dev server port must be a number between 1 and 65535".to_string());
        }

        if let Some(conflict) = self.output_conflict() {
            errors.push(conflict);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(CoreError::Validation(errors))
        }
    }

    /// Fail if clearing the output directory would delete site sources.
    pub fn check_output_path(&self) -> Result<()> {
        match self.output_conflict() {
            Some(conflict) => Err(CoreError::Validation(vec![conflict])),
            None => Ok(()),
        }
    }

    /// The output directory must not be, or contain, the site root or a
    /// source directory.
    fn output_conflict(&self) -> Option<String> {
        if self.output_dir.trim().is_empty() {
            return None;
        }
        let output = normalize_path(&self.output_path());

        [
            ("site root", self.root.clone()),
            ("input", self.input_path()),
            ("templates", self.templates_path()),
            ("assets", self.assets_path()),
            ("public", self.public_path()),
        ]
        .into_iter()
        .find(|(_, dir)| normalize_path(dir).starts_with(&output))
        .map(|(label, dir)| {
            format!(
                "Output directory {} must not contain the {label} directory {}",
                output.display(),
                dir.display()
            )
        })
    }

    /// Resolve a configured directory against the config root.
    pub fn resolve(&self, dir: &str) -> PathBuf {
        let path = Path::new(dir);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    pub fn input_path(&self) -> PathBuf {
        self.resolve(&self.input_dir)
    }

    pub fn output_path(&self) -> PathBuf {
        self.resolve(&self.output_dir)
    }

    pub fn templates_path(&self) -> PathBuf {
        self.resolve(&self.templates_dir)
    }

    pub fn themes_path(&self) -> PathBuf {
        self.resolve(&self.themes_dir)
    }

    pub fn assets_path(&self) -> PathBuf {
        self.resolve(&self.assets_dir)
    }

    pub fn public_path(&self) -> PathBuf {
        self.resolve(&self.public_dir)
    }

    /// Look up a collection's settings by name.
    #[must_use]
    pub fn collection(&self, name: &str) -> Option<&CollectionConfig> {
        self.collections.get(name)
    }

    /// Get the full URL for a path.
    pub fn url_for(&self, path: &str) -> String {
        let base = self.base_url.trim_end_matches('/');
        let path = path.trim_start_matches('/');
        format!("{base}/{path}")
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn create_test_config() -> String {
        r#"
title = "Test Site"
base_url = "https://example.com/"
language = "de"
output_dir = "public"
excerpt_length = 120

[dev_server]
port = 4000

[collections.posts]
sort_order = "asc"

[collections.notes]
pattern = "notes/**/*.md"
sort_by = "title"
"#
        .to_string()
    }

    #[test]
    fn test_load_config() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let config_path = dir.path().join("numark.toml");
        let mut file = std::fs::File::create(&config_path).expect("create file");
        file.write_all(create_test_config().as_bytes())
            .expect("write");

        let config = Config::load(&config_path).expect("load config");

        assert_eq!(config.title, "Test Site");
        assert_eq!(config.base_url, "https://example.com");
        assert_eq!(config.language, "de");
        assert_eq!(config.output_dir, "public");
        assert_eq!(config.excerpt_length, 120);
        assert_eq!(config.dev_server.port, 4000);
        assert_eq!(config.dev_server.host, "localhost");
        assert_eq!(config.root, dir.path());
    }

    #[test]
    fn test_collections_merge_with_defaults() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let config_path = dir.path().join("numark.toml");
        std::fs::write(&config_path, create_test_config()).expect("write");

        let config = Config::load(&config_path).expect("load config");

        let posts = config.collection("posts").expect("posts");
        assert_eq!(posts.sort_order, SortOrder::Asc);
        assert_eq!(posts.pattern, "posts/**/*.md");
        assert_eq!(posts.permalink.as_deref(), Some("/posts/:slug/"));

        let notes = config.collection("notes").expect("notes");
        assert_eq!(notes.sort_by, "title");
        assert_eq!(notes.sort_order, SortOrder::Desc);
        assert!(config.collection("pages").is_some());
    }

    #[test]
    fn test_config_defaults() {
        let config = Config::default();

        assert_eq!(config.title, "My NuMark Site");
        assert_eq!(config.input_dir, "content");
        assert_eq!(config.output_dir, "dist");
        assert_eq!(config.excerpt_length, 200);
        assert_eq!(config.dev_server.port, 3000);
        assert!(config.optimize_images);
        assert!(!config.development);
        assert_eq!(config.collections.len(), 2);
        assert_eq!(
            config.collection("pages").map(|c| c.sort_order),
            Some(SortOrder::Asc)
        );
    }

    #[test]
    fn test_load_json_config() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let config_path = dir.path().join("numark.json");
        std::fs::write(
            &config_path,
            r#"{ "title": "Json Site", "theme": { "custom_css": ["/extra.css"] } }"#,
        )
        .expect("write");

        let config = Config::load(&config_path).expect("load config");
        assert_eq!(config.title, "Json Site");
        assert_eq!(config.theme.custom_css, vec!["/extra.css"]);
        assert_eq!(config.theme.name, "default");
    }

    #[test]
    fn test_invalid_sort_order_rejected() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let config_path = dir.path().join("numark.toml");
        std::fs::write(
            &config_path,
            r#"
[collections.posts]
sort_order = "sideways"
"#,
        )
        .expect("write");

        assert!(Config::load(&config_path).is_err());
    }

    #[test]
    fn test_validation_collects_all_errors() {
        let mut config = Config::default();
        config.title = String::new();
        config.output_dir = String::new();
        config.dev_server.port = 0;
        config
            .collections
            .insert("broken".to_string(), CollectionConfig {
                pattern: String::new(),
                sort_by: "date".to_string(),
                sort_order: SortOrder::Desc,
                template: None,
                permalink: None,
            });

        let err = config.validate().unwrap_err();
        match err {
            CoreError::Validation(errors) => {
                assert_eq!(errors.len(), 4);
                assert!(errors.contains(&"Site title is required".to_string()));
                assert!(errors.contains(&"Collection 'broken' must have a pattern".to_string()));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_url_for() {
        let config = Config {
            base_url: "https://example.com".to_string(),
            ..Config::default()
        };

        assert_eq!(
            config.url_for("/posts/hello"),
            "https://example.com/posts/hello"
        );
        assert_eq!(
            config.url_for("posts/hello"),
            "https://example.com/posts/hello"
        );
    }

    #[test]
    fn test_resolve_paths_against_root() {
        let config = Config {
            root: PathBuf::from("/site"),
            ..Config::default()
        };
        assert_eq!(config.input_path(), PathBuf::from("/site/content"));
        assert_eq!(config.output_path(), PathBuf::from("/site/dist"));
        assert_eq!(config.resolve("/abs/out"), PathBuf::from("/abs/out"));
    }

    #[test]
    fn test_output_dir_must_not_contain_sources() {
        for output_dir in [".", "", "./", "content", "..", "/site/../site", "public/.."] {
            let config = Config {
                root: PathBuf::from("/site"),
                output_dir: output_dir.to_string(),
                ..Config::default()
            };
            assert!(config.validate().is_err(), "{output_dir:?} accepted");
        }

        let config = Config {
            root: PathBuf::from("/site"),
            output_dir: "content/../dist".to_string(),
            ..Config::default()
        };
        assert!(config.validate().is_ok());
        assert!(config.check_output_path().is_ok());

        let config = Config {
            root: PathBuf::from("/site"),
            output_dir: "/site/assets".to_string(),
            ..Config::default()
        };
        let err = config.check_output_path().unwrap_err().to_string();
        assert!(err.contains("assets directory"));
    }

    #[test]
    fn test_discover_falls_back_to_defaults() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let config = Config::discover(dir.path()).expect("discover");
        assert_eq!(config.title, "My NuMark Site");
        assert_eq!(config.root, dir.path());
    }

    #[test]
    fn test_save_and_reload_yaml() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("numark.yaml");
        let config = Config {
            title: "Saved".to_string(),
            ..Config::default()
        };
        config.save(&path).expect("save");

        let loaded = Config::load(&path).expect("load");
        assert_eq!(loaded.title, "Saved");
        assert_eq!(loaded.collections.len(), 2);
    }

    #[test]
    fn test_config_not_found() {
        let result = Config::load(Path::new("/nonexistent/numark.toml"));
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("not found"));
    }
}
