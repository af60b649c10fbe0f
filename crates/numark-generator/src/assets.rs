//! Asset processing and management.
//!
//! Stylesheets go through the CSS transform chain, images are bounded and
//! re-encoded, scripts and everything else are copied. Every processed file
//! is recorded in an [`AssetManifest`].

use std::{
    collections::BTreeMap,
    fs,
    io::{BufWriter, Write},
    path::{Component, Path, PathBuf},
};

use image::{DynamicImage, ImageFormat, codecs::jpeg::JpegEncoder, imageops::FilterType};
use numark_core::Config;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::css::{self, CssError};

/// Output directory for processed assets, relative to the output root.
pub const ASSETS_DIR: &str = "assets";

/// Largest image dimensions kept after optimization.
pub const MAX_IMAGE_WIDTH: u32 = 1920;
pub const MAX_IMAGE_HEIGHT: u32 = 1080;

const JPEG_QUALITY: u8 = 85;

/// Asset processing errors.
#[derive(Debug, Error)]
pub enum AssetError {
    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to transform stylesheet {path}: {source}")]
    Css {
        path: PathBuf,
        #[source]
        source: CssError,
    },

    #[error("failed to process image {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("failed to write manifest: {0}")]
    Manifest(#[from] serde_json::Error),

    /// Invalid asset path.
    #[error("invalid asset path: {0}")]
    InvalidPath(PathBuf),
}

impl AssetError {
    fn io(path: &Path) -> impl FnOnce(std::io::Error) -> Self + '_ {
        move |source| Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    fn image(path: &Path) -> impl FnOnce(image::ImageError) -> Self + '_ {
        move |source| Self::Image {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Result type for asset operations.
pub type Result<T> = std::result::Result<T, AssetError>;

/// Maps source asset paths to processed output paths.
///
/// Keys are relative to the assets directory, values to the output root,
/// both `/`-separated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetManifest {
    assets: BTreeMap<String, String>,
}

impl AssetManifest {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, source: impl Into<String>, output: impl Into<String>) {
        self.assets.insert(source.into(), output.into());
    }

    /// Output path recorded for a source asset.
    #[must_use]
    pub fn get(&self, source: &str) -> Option<&str> {
        self.assets.get(source).map(String::as_str)
    }

    /// Public URL for a source asset.
    #[must_use]
    pub fn url_for(&self, source: &str) -> Option<String> {
        self.get(source.trim_start_matches('/'))
            .map(|output| format!("/{output}"))
    }

    #[must_use]
    pub fn assets(&self) -> &BTreeMap<String, String> {
        &self.assets
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    /// Serialize manifest to JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AssetKind {
    Stylesheet,
    Script,
    Image,
    Vector,
    Other,
}

impl AssetKind {
    fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "css" => Self::Stylesheet,
            "js" | "mjs" => Self::Script,
            "jpg" | "jpeg" | "png" | "gif" | "webp" => Self::Image,
            "svg" => Self::Vector,
            _ => Self::Other,
        }
    }

    /// Subdirectory under `assets/`, if the kind has one.
    fn dir(self) -> Option<&'static str> {
        match self {
            Self::Stylesheet => Some("css"),
            Self::Script => Some("js"),
            Self::Image | Self::Vector => Some("images"),
            Self::Other => None,
        }
    }
}

/// Asset pipeline options.
#[derive(Debug, Clone)]
pub struct AssetOptions {
    pub minify_css: bool,
    pub optimize_images: bool,
    pub max_width: u32,
    pub max_height: u32,
}

impl Default for AssetOptions {
    fn default() -> Self {
        Self {
            minify_css: true,
            optimize_images: true,
            max_width: MAX_IMAGE_WIDTH,
            max_height: MAX_IMAGE_HEIGHT,
        }
    }
}

impl AssetOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            minify_css: config.minify_css,
            optimize_images: config.optimize_images,
            ..Self::default()
        }
    }
}

/// Processes an assets directory into the output tree.
#[derive(Debug, Default)]
pub struct AssetProcessor {
    options: AssetOptions,
}

impl AssetProcessor {
    #[must_use]
    pub fn new(options: AssetOptions) -> Self {
        Self { options }
    }

    /// Process every file under `source_dir` into `output_root/assets`.
    ///
    /// Per-file failures are logged and left out of the manifest. Only a
    /// failure to write the synthesized files or the manifest is an error.
    pub fn process(&self, source_dir: &Path, output_root: &Path) -> Result<AssetManifest> {
        info!(
            source = %source_dir.display(),
            dest = %output_root.display(),
            "processing assets"
        );

        self.write_generated(output_root)?;

        let mut manifest = AssetManifest::new();
        if source_dir.is_dir() {
            for path in find_files(source_dir) {
                let relative = match relative_path(source_dir, &path) {
                    Ok(relative) => relative,
                    Err(e) => {
                        warn!(error = %e, "skipping asset");
                        continue;
                    }
                };

                match self.process_file(&path, &relative, output_root) {
                    Ok(output) => {
                        debug!(src = %relative, dest = %output, "processed asset");
                        manifest.add(relative, output);
                    }
                    Err(e) => warn!(path = %path.display(), error = %e, "failed to process asset"),
                }
            }
        } else {
            debug!("assets directory does not exist, skipping");
        }

        let manifest_path = output_root.join(ASSETS_DIR).join("manifest.json");
        fs::write(&manifest_path, manifest.to_json()?).map_err(AssetError::io(&manifest_path))?;

        info!(count = manifest.len(), "assets processed");
        Ok(manifest)
    }

    /// Write the synthesized `css/main.css` and `js/main.js`.
    fn write_generated(&self, output_root: &Path) -> Result<()> {
        let assets = output_root.join(ASSETS_DIR);

        let css_path = assets.join("css/main.css");
        let main_css = css::transform(css::MAIN_CSS, "main.css", self.options.minify_css)
            .map_err(|source| AssetError::Css {
                path: css_path.clone(),
                source,
            })?;
        write_file(&css_path, main_css.as_bytes())?;

        let js_path = assets.join("js/main.js");
        write_file(&js_path, MAIN_JS.as_bytes())?;
        Ok(())
    }

    /// Process one file, returning its output path relative to the output root.
    fn process_file(&self, path: &Path, relative: &str, output_root: &Path) -> Result<String> {
        let kind = AssetKind::from_path(path);
        let output = output_relative(kind, relative);
        let dest = output_root.join(&output);

        match kind {
            AssetKind::Stylesheet => {
                let source = fs::read_to_string(path).map_err(AssetError::io(path))?;
                let transformed = css::transform(&source, relative, self.options.minify_css)
                    .map_err(|source| AssetError::Css {
                        path: path.to_path_buf(),
                        source,
                    })?;
                write_file(&dest, transformed.as_bytes())?;
            }
            AssetKind::Image if self.options.optimize_images => {
                self.optimize_image(path, &dest)?;
            }
            AssetKind::Script | AssetKind::Image | AssetKind::Vector | AssetKind::Other => {
                copy_file(path, &dest)?;
            }
        }

        Ok(output)
    }

    /// Bound, re-encode and write a WebP sibling for JPEG and PNG sources.
    fn optimize_image(&self, src: &Path, dest: &Path) -> Result<()> {
        let img = image::open(src).map_err(AssetError::image(src))?;
        let img = self.bound(img);

        ensure_parent(dest)?;
        let ext = dest
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        if matches!(ext.as_str(), "jpg" | "jpeg") {
            let file = fs::File::create(dest).map_err(AssetError::io(dest))?;
            let mut writer = BufWriter::new(file);
            let encoder = JpegEncoder::new_with_quality(&mut writer, JPEG_QUALITY);
            img.to_rgb8()
                .write_with_encoder(encoder)
                .map_err(AssetError::image(dest))?;
            writer.flush().map_err(AssetError::io(dest))?;
        } else {
            img.save(dest).map_err(AssetError::image(dest))?;
        }

        if matches!(ext.as_str(), "jpg" | "jpeg" | "png") {
            let webp = dest.with_extension("webp");
            img.to_rgba8()
                .save_with_format(&webp, ImageFormat::WebP)
                .map_err(AssetError::image(&webp))?;
            debug!(path = %webp.display(), "wrote webp sibling");
        }

        Ok(())
    }

    /// Shrink to fit the configured bounds, never enlarging.
    fn bound(&self, img: DynamicImage) -> DynamicImage {
        let (max_w, max_h) = (self.options.max_width, self.options.max_height);
        if img.width() <= max_w && img.height() <= max_h {
            return img;
        }
        img.resize(max_w, max_h, FilterType::Lanczos3)
    }
}

fn find_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_entry(|e| {
            e.depth() == 0 || !e.file_name().to_string_lossy().starts_with('.')
        })
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(error = %e, "failed to read asset entry");
                None
            }
        })
        .filter(|e| e.file_type().is_file())
        .map(walkdir::DirEntry::into_path)
        .collect();
    files.sort();
    files
}

fn relative_path(base: &Path, path: &Path) -> Result<String> {
    let relative = path
        .strip_prefix(base)
        .map_err(|_| AssetError::InvalidPath(path.to_path_buf()))?;
    let segments: Vec<String> = relative
        .components()
        .map(|c| match c {
            Component::Normal(s) => Ok(s.to_string_lossy().into_owned()),
            _ => Err(AssetError::InvalidPath(path.to_path_buf())),
        })
        .collect::<Result<_>>()?;
    Ok(segments.join("/"))
}

/// `assets/<kind dir>/<relative>`, without repeating the kind directory.
fn output_relative(kind: AssetKind, relative: &str) -> String {
    match kind.dir() {
        Some(dir) if relative.split('/').next() == Some(dir) => {
            format!("{ASSETS_DIR}/{relative}")
        }
        Some(dir) => format!("{ASSETS_DIR}/{dir}/{relative}"),
        None => format!("{ASSETS_DIR}/{relative}"),
    }
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(AssetError::io(parent))?;
    }
    Ok(())
}

fn write_file(path: &Path, contents: &[u8]) -> Result<()> {
    ensure_parent(path)?;
    fs::write(path, contents).map_err(AssetError::io(path))
}

/// Copy a file, creating parent directories.
pub fn copy_file(source: &Path, dest: &Path) -> Result<()> {
    ensure_parent(dest)?;
    fs::copy(source, dest).map_err(AssetError::io(source))?;
    Ok(())
}

/// Copy a directory tree verbatim. Returns the number of files copied.
pub fn copy_tree(source: &Path, dest: &Path) -> Result<usize> {
    if !source.is_dir() {
        return Ok(0);
    }
    let mut copied = 0;
    for path in find_files(source) {
        let relative = relative_path(source, &path)?;
        copy_file(&path, &dest.join(&relative))?;
        copied += 1;
    }
    Ok(copied)
}

/// Baseline client behaviour for generated sites.
pub const MAIN_JS: &str = r##"// Main JavaScript for NuMark sites

function initDarkMode() {
  const toggle = document.querySelector('.dark-mode-toggle');
  const html = document.documentElement;
  const saved = localStorage.getItem('theme') || 'light';
  html.classList.toggle('dark', saved === 'dark');

  if (toggle) {
    toggle.addEventListener('click', () => {
      const isDark = html.classList.toggle('dark');
      localStorage.setItem('theme', isDark ? 'dark' : 'light');
    });
  }
}

function initSmoothScrolling() {
  document.querySelectorAll('a[href^="#"]').forEach((anchor) => {
    anchor.addEventListener('click', function (e) {
      const target = document.querySelector(this.getAttribute('href'));
      if (target) {
        e.preventDefault();
        target.scrollIntoView({ behavior: 'smooth', block: 'start' });
      }
    });
  });
}

document.addEventListener('DOMContentLoaded', () => {
  initDarkMode();
  initSmoothScrolling();
});
"##;
