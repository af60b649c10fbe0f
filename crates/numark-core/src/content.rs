//! Content types and structures.

use std::path::{Component, Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::frontmatter::Frontmatter;

/// Average reading speed used for reading-time estimates.
pub const WORDS_PER_MINUTE: usize = 200;

/// Type of content source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    /// Markdown content (.md and .markdown files).
    Markdown,
    /// MDX content, rendered as plain Markdown.
    Mdx,
}

impl ContentType {
    /// Determine content type from file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "md" | "markdown" => Some(Self::Markdown),
            "mdx" => Some(Self::Mdx),
            _ => None,
        }
    }

    /// Determine content type from a file path.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }
}

/// A content file located relative to the input root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentPath {
    /// Full file path.
    pub path: PathBuf,

    /// Path relative to the input root, `/`-separated.
    pub relative: String,

    /// Stable page identity derived from `relative`.
    pub id: String,

    /// File name without extension.
    pub stem: String,

    /// First directory segment, if the file is nested.
    pub top_segment: Option<String>,

    /// Content type based on extension.
    pub content_type: ContentType,
}

impl ContentPath {
    /// Locate `path` under `root`. Returns `None` for non-content files or
    /// paths outside the root.
    pub fn from_path(path: &Path, root: &Path) -> Option<Self> {
        let content_type = ContentType::from_path(path)?;
        let rel = path.strip_prefix(root).ok()?;

        let segments: Vec<String> = rel
            .components()
            .filter_map(|c| match c {
                Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect();
        if segments.is_empty() {
            return None;
        }

        let relative = segments.join("/");
        let stem = path.file_stem()?.to_string_lossy().into_owned();
        let top_segment = (segments.len() > 1).then(|| segments[0].clone());

        Some(Self {
            path: path.to_path_buf(),
            id: page_id(&relative),
            relative,
            stem,
            top_segment,
            content_type,
        })
    }
}

/// Derive a page id from its relative path: every non-alphanumeric
/// character becomes `_`.
pub fn page_id(relative: &str) -> String {
    relative
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

/// Table of contents entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TocEntry {
    /// Heading level (1-6).
    pub level: u8,

    /// Heading text.
    pub text: String,

    /// Slug used as the heading id.
    pub slug: String,

    /// Fragment link, `#slug`.
    pub anchor: String,
}

impl TocEntry {
    pub fn new(level: u8, text: impl Into<String>, slug: impl Into<String>) -> Self {
        let slug = slug.into();
        Self {
            level,
            text: text.into(),
            anchor: format!("#{slug}"),
            slug,
        }
    }
}

/// Estimated reading time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadingTime {
    pub word_count: usize,
    pub minutes: usize,
    pub text: String,
}

impl ReadingTime {
    /// Minutes are `ceil(words / 200)`.
    pub fn from_word_count(word_count: usize) -> Self {
        let minutes = word_count.div_ceil(WORDS_PER_MINUTE);
        Self {
            word_count,
            minutes,
            text: format!("{minutes} min read"),
        }
    }
}

/// A parsed content document.
///
/// `html` is always rendered from `body`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContentDocument {
    /// Raw source text including frontmatter.
    pub raw: String,

    /// Parsed frontmatter metadata.
    pub frontmatter: Frontmatter,

    /// Markdown body without frontmatter.
    pub body: String,

    /// Rendered HTML.
    pub html: String,

    /// Explicit or derived excerpt.
    pub excerpt: String,

    pub word_count: usize,

    pub reading_time: ReadingTime,

    /// Table of contents extracted from headings.
    pub toc: Vec<TocEntry>,
}

/// A catalog entry: a document plus its derived site metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Page {
    /// Stable identity derived from the relative path.
    pub id: String,

    /// Source file path.
    pub file_path: PathBuf,

    /// Path relative to the input root, `/`-separated.
    pub relative_path: String,

    pub slug: String,

    /// Public URL, e.g. `/posts/hello/`.
    pub url: String,

    pub title: String,

    /// Markdown body.
    pub content: String,

    /// Rendered HTML body.
    pub html: String,

    pub frontmatter: Frontmatter,

    pub excerpt: String,

    pub word_count: usize,

    pub reading_time: ReadingTime,

    pub toc: Vec<TocEntry>,

    /// Template name.
    pub template: String,

    /// Layout name.
    pub layout: String,

    pub date: DateTime<Utc>,

    pub draft: bool,

    pub tags: Vec<String>,

    pub categories: Vec<String>,

    /// Collection the page belongs to.
    pub collection: String,
}

impl Page {
    /// Description for meta tags: frontmatter description, else excerpt.
    pub fn description(&self) -> &str {
        self.frontmatter
            .description
            .as_deref()
            .filter(|d| !d.trim().is_empty())
            .unwrap_or(&self.excerpt)
    }

    /// Author from frontmatter, if any.
    pub fn author(&self) -> Option<&str> {
        self.frontmatter.author.as_deref().filter(|a| !a.is_empty())
    }
}
