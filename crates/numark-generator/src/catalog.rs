//! Content discovery and collection organization.
//!
//! Walks the input directory, parses every Markdown-family file and groups
//! the resulting pages into sorted, named collections.

use std::{
    cmp::Ordering,
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
    sync::Arc,
    time::SystemTime,
};

use chrono::{DateTime, Utc};
use numark_core::{
    Config, ContentDocument, ContentPath, Page, SortOrder,
    content::ContentType,
    slug::slugify,
};
use numark_parser::MarkdownProcessor;
use rayon::prelude::*;
use thiserror::Error;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::output::{DEFAULT_COLLECTION, page_route};

/// Content catalog errors.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The input directory does not exist.
    #[error("input directory not found: {0}")]
    InputDirMissing(PathBuf),

    /// Failed to read a content file.
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Path is not a content file under the input root.
    #[error("invalid content path: {0}")]
    InvalidPath(PathBuf),
}

/// Result type for catalog operations.
pub type Result<T> = std::result::Result<T, CatalogError>;

/// Organized site content.
#[derive(Debug, Clone, Default)]
pub struct SiteContent {
    /// All pages indexed by id, drafts included.
    pub pages: BTreeMap<String, Arc<Page>>,

    /// Pages grouped by collection, each list sorted.
    pub collections: BTreeMap<String, Vec<Arc<Page>>>,
}

impl SiteContent {
    /// Look up a page by id.
    #[must_use]
    pub fn page(&self, id: &str) -> Option<&Arc<Page>> {
        self.pages.get(id)
    }

    /// Pages of a collection in sort order.
    #[must_use]
    pub fn collection(&self, name: &str) -> &[Arc<Page>] {
        self.collections.get(name).map_or(&[], Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}

/// Discovers content files and turns them into pages.
#[derive(Debug)]
pub struct ContentCatalog {
    config: Config,
    processor: MarkdownProcessor,
    input_dir: PathBuf,
}

impl ContentCatalog {
    /// Create a catalog for the configured input directory.
    #[must_use]
    pub fn new(config: Config) -> Self {
        let processor = MarkdownProcessor::from_config(&config);
        let input_dir = config.input_path();
        Self {
            config,
            processor,
            input_dir,
        }
    }

    /// Discover and organize all content.
    pub fn load(&self) -> Result<SiteContent> {
        let pages = self.discover()?;
        Ok(self.organize(pages))
    }

    /// Parse every content file under the input directory.
    ///
    /// Files that fail to load are logged and skipped. Pages come back in
    /// relative-path order.
    pub fn discover(&self) -> Result<Vec<Page>> {
        if !self.input_dir.is_dir() {
            return Err(CatalogError::InputDirMissing(self.input_dir.clone()));
        }

        info!(dir = %self.input_dir.display(), "discovering content");

        let files = self.find_content_files();
        info!(count = files.len(), "found content files");

        let pages: Vec<Page> = files
            .par_iter()
            .filter_map(|path| match self.load_page(path) {
                Ok(page) => Some(page),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "skipping content file");
                    None
                }
            })
            .collect();

        Ok(pages)
    }

    /// Find content files recursively, skipping hidden entries.
    fn find_content_files(&self) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = WalkDir::new(&self.input_dir)
            .follow_links(true)
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !is_hidden(e.path()))
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!(error = %e, "failed to read directory entry");
                    None
                }
            })
            .filter(|e| e.file_type().is_file() && ContentType::from_path(e.path()).is_some())
            .map(walkdir::DirEntry::into_path)
            .collect();

        files.sort();
        files
    }

    /// Read, parse and describe a single content file.
    pub fn load_page(&self, path: &Path) -> Result<Page> {
        debug!(path = %path.display(), "loading content file");

        let raw = fs::read_to_string(path).map_err(|source| CatalogError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let content_path = ContentPath::from_path(path, &self.input_dir)
            .ok_or_else(|| CatalogError::InvalidPath(path.to_path_buf()))?;
        let document = self.processor.process_file(&raw, path);
        let modified = fs::metadata(path).and_then(|m| m.modified()).ok();

        Ok(self.build_page(content_path, document, modified))
    }

    /// Derive page metadata from a parsed document.
    pub fn build_page(
        &self,
        content_path: ContentPath,
        document: ContentDocument,
        modified: Option<SystemTime>,
    ) -> Page {
        let fm = &document.frontmatter;

        let title = fm
            .title
            .clone()
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| content_path.stem.clone());

        let slug = [fm.slug.as_deref(), fm.title.as_deref()]
            .into_iter()
            .flatten()
            .map(slugify)
            .find(|s| !s.is_empty())
            .unwrap_or_else(|| slugify(&content_path.stem));

        let collection = fm
            .collection
            .clone()
            .filter(|c| !c.trim().is_empty())
            .or_else(|| content_path.top_segment.clone())
            .unwrap_or_else(|| DEFAULT_COLLECTION.to_string());

        let date = fm
            .parsed_date()
            .or_else(|| modified.map(DateTime::<Utc>::from))
            .unwrap_or_else(Utc::now);

        let collection_config = self.config.collection(&collection);
        let template = fm
            .template
            .clone()
            .filter(|t| !t.is_empty())
            .or_else(|| collection_config.and_then(|c| c.template.clone()))
            .unwrap_or_else(|| self.config.default_template.clone());
        let layout = fm
            .layout
            .clone()
            .filter(|l| !l.is_empty())
            .unwrap_or_else(|| self.config.default_layout.clone());

        let permalink = collection_config.and_then(|c| c.permalink.as_deref());
        let route = page_route(&slug, &collection, date, permalink);

        Page {
            id: content_path.id,
            file_path: content_path.path,
            relative_path: content_path.relative,
            slug,
            url: route.url,
            title,
            content: document.body,
            html: document.html,
            excerpt: document.excerpt,
            word_count: document.word_count,
            reading_time: document.reading_time,
            toc: document.toc,
            template,
            layout,
            date,
            draft: fm.draft,
            tags: fm.tags.clone(),
            categories: fm.categories.clone(),
            frontmatter: document.frontmatter,
            collection,
        }
    }

    /// Index pages by id and group them into sorted collections.
    ///
    /// Later pages replace earlier ones with the same id.
    pub fn organize(&self, pages: Vec<Page>) -> SiteContent {
        let mut content = SiteContent::default();
        for page in pages {
            content.pages.insert(page.id.clone(), Arc::new(page));
        }

        for page in content.pages.values() {
            content
                .collections
                .entry(page.collection.clone())
                .or_default()
                .push(Arc::clone(page));
        }

        for (name, pages) in &mut content.collections {
            let (sort_by, order) = self
                .config
                .collection(name)
                .map_or(("date", SortOrder::Desc), |c| {
                    (c.sort_by.as_str(), c.sort_order)
                });
            sort_pages(pages, sort_by, order);
        }

        info!(
            pages = content.pages.len(),
            collections = content.collections.len(),
            "content organized"
        );

        content
    }
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .is_some_and(|n| n.to_string_lossy().starts_with('.'))
}

/// Sort pages by a field. Ties fall back to page id.
pub fn sort_pages(pages: &mut [Arc<Page>], sort_by: &str, order: SortOrder) {
    pages.sort_by(|a, b| {
        let primary = compare_field(a, b, sort_by);
        let primary = match order {
            SortOrder::Asc => primary,
            SortOrder::Desc => primary.reverse(),
        };
        primary.then_with(|| a.id.cmp(&b.id))
    });
}

fn compare_field(a: &Page, b: &Page, field: &str) -> Ordering {
    match field {
        "date" => a.date.cmp(&b.date),
        "title" => a.title.to_lowercase().cmp(&b.title.to_lowercase()),
        "slug" => a.slug.cmp(&b.slug),
        "word_count" => a.word_count.cmp(&b.word_count),
        other => a.frontmatter.get(other).cmp(&b.frontmatter.get(other)),
    }
}
