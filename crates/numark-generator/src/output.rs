//! Output path resolution and writing.
//!
//! Every page is written as a directory with an implicit `index.html`, so
//! `/posts/hello/` is servable by any static file server.

use std::{
    fs, io,
    path::{Component, Path, PathBuf},
};

use chrono::{DateTime, Datelike, Utc};
use numark_core::slug::slugify;
use thiserror::Error;
use tracing::debug;

/// Slug that maps to the site root `index.html`.
pub const INDEX_SLUG: &str = "index";

/// Collection that never gets a listing page.
pub const DEFAULT_COLLECTION: &str = "pages";

/// Output writer errors.
#[derive(Debug, Error)]
pub enum OutputError {
    /// Failed to write or clear a path.
    #[error("output error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Result type for output operations.
pub type Result<T> = std::result::Result<T, OutputError>;

/// Where a page is written and the URL it is served at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    /// Path relative to the output root.
    pub path: PathBuf,

    /// Public URL path.
    pub url: String,
}

impl Route {
    fn from_dir(segments: &[String]) -> Self {
        if segments.is_empty() {
            return Self {
                path: PathBuf::from("index.html"),
                url: "/".to_string(),
            };
        }

        let mut path: PathBuf = segments.iter().collect();
        let last_is_file = segments
            .last()
            .is_some_and(|s| s.ends_with(".html") || s.ends_with(".htm"));

        if last_is_file {
            Self {
                url: format!("/{}", segments.join("/")),
                path,
            }
        } else {
            path.push("index.html");
            Self {
                url: format!("/{}/", segments.join("/")),
                path,
            }
        }
    }
}

/// Resolve a page's route.
///
/// The index slug always maps to the root. Otherwise a collection
/// permalink pattern, if given, decides the path; the fallback is
/// `<slug>/index.html`.
pub fn page_route(
    slug: &str,
    collection: &str,
    date: DateTime<Utc>,
    permalink: Option<&str>,
) -> Route {
    if slug == INDEX_SLUG {
        return Route::from_dir(&[]);
    }

    let expanded = match permalink.filter(|p| !p.trim().is_empty()) {
        Some(pattern) => expand_permalink(pattern, slug, collection, date),
        None => slug.to_string(),
    };

    Route::from_dir(&clean_segments(&expanded))
}

/// Substitute `:slug`, `:collection`, `:year`, `:month` and `:day`.
pub fn expand_permalink(pattern: &str, slug: &str, collection: &str, date: DateTime<Utc>) -> String {
    pattern
        .replace(":collection", collection)
        .replace(":slug", slug)
        .replace(":year", &format!("{:04}", date.year()))
        .replace(":month", &format!("{:02}", date.month()))
        .replace(":day", &format!("{:02}", date.day()))
}

/// Split into path segments, dropping empty, `.` and `..` parts.
fn clean_segments(path: &str) -> Vec<String> {
    Path::new(path)
        .components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect()
}

/// Route serving a public URL such as `/posts/hello/`.
pub fn url_route(url: &str) -> Route {
    Route::from_dir(&clean_segments(url))
}

/// Route for a collection listing: `<collection>/index.html`.
pub fn collection_route(name: &str) -> Route {
    Route::from_dir(&clean_segments(name))
}

/// Route for a tag listing: `tags/<slugified-tag>/index.html`.
pub fn tag_route(tag: &str) -> Route {
    Route::from_dir(&["tags".to_string(), slugify(tag)])
}

/// Route for a category listing: `categories/<slugified-category>/index.html`.
pub fn category_route(category: &str) -> Route {
    Route::from_dir(&["categories".to_string(), slugify(category)])
}

/// Writes generated files under the output root.
#[derive(Debug, Clone)]
pub struct OutputWriter {
    root: PathBuf,
}

impl OutputWriter {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Remove everything under the output root and recreate it.
    pub fn clear(&self) -> Result<()> {
        if self.root.exists() {
            debug!(dir = %self.root.display(), "cleaning output directory");
            fs::remove_dir_all(&self.root).map_err(|source| OutputError::Io {
                path: self.root.clone(),
                source,
            })?;
        }
        self.ensure_dir(&self.root)
    }

    /// Write `contents` at `relative`, creating parent directories.
    pub fn write(&self, relative: &Path, contents: impl AsRef<[u8]>) -> Result<PathBuf> {
        let path = self.root.join(relative);
        if let Some(parent) = path.parent() {
            self.ensure_dir(parent)?;
        }
        fs::write(&path, contents).map_err(|source| OutputError::Io {
            path: path.clone(),
            source,
        })?;
        debug!(path = %path.display(), "wrote file");
        Ok(path)
    }

    fn ensure_dir(&self, dir: &Path) -> Result<()> {
        fs::create_dir_all(dir).map_err(|source| OutputError::Io {
            path: dir.to_path_buf(),
            source,
        })
    }
}
