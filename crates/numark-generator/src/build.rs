//! Build orchestration.
//!
//! A build is a fixed sequence of stages: discover and organize content,
//! clear the output, render pages, render index pages, write feeds, run the
//! asset pipeline, copy public files. Each stage completes before the next
//! starts. Only fatal errors stop a build; per-page and per-asset failures
//! are logged and counted.

use std::{
    collections::{BTreeMap, HashMap},
    path::Path,
    sync::Arc,
    time::Instant,
};

use chrono::{DateTime, Utc};
use numark_core::{Config, CoreError, Page, slug::slugify};
use rayon::prelude::*;
use thiserror::Error;
use tracing::{debug, info};

use crate::{
    assets::{self, AssetError, AssetOptions, AssetProcessor},
    catalog::{CatalogError, ContentCatalog, SiteContent},
    output::{
        DEFAULT_COLLECTION, OutputError, OutputWriter, Route, category_route, collection_route,
        tag_route, url_route,
    },
    render::{Listing, ListingKind, RenderContext, SiteData, TemplateRenderer},
    rss::RssGenerator,
    sitemap::SitemapGenerator,
};

/// Build errors. Every variant aborts the build.
#[derive(Debug, Error)]
pub enum BuildError {
    /// The configuration would make the build unsafe to run.
    #[error("configuration error: {0}")]
    Config(#[from] CoreError),

    /// Content could not be discovered.
    #[error("content error: {0}")]
    Catalog(#[from] CatalogError),

    /// The output directory could not be cleared or written.
    #[error("output error: {0}")]
    Output(#[from] OutputError),

    /// The asset pipeline could not write its files.
    #[error("asset error: {0}")]
    Asset(#[from] AssetError),
}

/// Result type for build operations.
pub type Result<T> = std::result::Result<T, BuildError>;

/// Production skips drafts and hides error details.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BuildMode {
    #[default]
    Production,
    Development,
}

impl BuildMode {
    pub fn from_config(config: &Config) -> Self {
        if config.development {
            Self::Development
        } else {
            Self::Production
        }
    }

    pub fn is_development(self) -> bool {
        self == Self::Development
    }

    /// Whether a page is rendered in this mode.
    pub fn includes(self, page: &Page) -> bool {
        !page.draft || self.is_development()
    }
}

/// Build statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildStats {
    /// Content pages written.
    pub pages: usize,

    /// Collection, tag and category pages written.
    pub index_pages: usize,

    /// Pages written as error documents.
    pub render_errors: usize,

    /// Assets recorded in the manifest.
    pub assets: usize,

    pub duration_ms: u64,
}

/// Pages grouped under a tag or category, keyed by slug.
#[derive(Debug, Default)]
struct Terms {
    order: Vec<(String, Vec<Arc<Page>>)>,
    index: HashMap<String, usize>,
}

impl Terms {
    fn add(&mut self, name: &str, page: &Arc<Page>) {
        let key = slugify(name);
        if key.is_empty() {
            return;
        }
        let idx = *self.index.entry(key).or_insert_with(|| {
            self.order.push((name.to_string(), Vec::new()));
            self.order.len() - 1
        });
        let pages = &mut self.order[idx].1;
        if !pages.iter().any(|p| p.id == page.id) {
            pages.push(Arc::clone(page));
        }
    }
}

/// Site builder that orchestrates the build process.
#[derive(Debug)]
pub struct Builder {
    config: Config,
    mode: BuildMode,
    renderer: TemplateRenderer,
    content: Option<SiteContent>,
}

impl Builder {
    /// Builder for `config`, with templates loaded from its templates directory.
    #[must_use]
    pub fn new(config: Config) -> Self {
        let mode = BuildMode::from_config(&config);
        let renderer = TemplateRenderer::from_config(&config, mode.is_development());
        Self {
            config,
            mode,
            renderer,
            content: None,
        }
    }

    /// Override the build mode. Resets registered templates.
    #[must_use]
    pub fn with_mode(mut self, mode: BuildMode) -> Self {
        self.mode = mode;
        self.renderer = TemplateRenderer::from_config(&self.config, mode.is_development());
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn mode(&self) -> BuildMode {
        self.mode
    }

    pub fn renderer(&self) -> &TemplateRenderer {
        &self.renderer
    }

    /// Register templates and layouts before building.
    pub fn renderer_mut(&mut self) -> &mut TemplateRenderer {
        &mut self.renderer
    }

    /// Content from the last successful build.
    pub fn content(&self) -> Option<&SiteContent> {
        self.content.as_ref()
    }

    /// Run the full build sequence.
    ///
    /// An output directory that overlaps the sources, or a discovery
    /// failure, returns before the output directory is touched.
    pub fn build(&mut self) -> Result<BuildStats> {
        let start = Instant::now();
        let output = OutputWriter::new(self.config.output_path());

        info!(
            input = %self.config.input_path().display(),
            output = %output.root().display(),
            mode = ?self.mode,
            "starting build"
        );

        self.config.check_output_path()?;
        let content = ContentCatalog::new(self.config.clone()).load()?;

        output.clear()?;

        let site = SiteData::from_config(&self.config, Utc::now());
        let collections = self.visible_collections(&content);
        let base = RenderContext::new(&self.config, &site, &collections);

        let mut stats = BuildStats::default();
        let mut sitemap = SitemapGenerator::new(&self.config);

        let pages: Vec<&Arc<Page>> = content
            .pages
            .values()
            .filter(|page| self.mode.includes(page))
            .collect();
        info!(count = pages.len(), "rendering pages");

        let results: Vec<_> = pages
            .par_iter()
            .map(|page| {
                let outcome = self.renderer.render(&page.template, &base.with_page(page));
                let failed = outcome.is_failed();
                output
                    .write(&url_route(&page.url).path, outcome.into_html())
                    .map(|_| failed)
            })
            .collect();

        for (page, result) in pages.iter().zip(results) {
            stats.render_errors += usize::from(result?);
            stats.pages += 1;
            sitemap.add_page(page);
        }

        for (kind, name, route, list) in self.listings(&collections) {
            let ctx = base.with_listing(Listing {
                kind,
                name: &name,
                pages: &list,
            });
            let outcome = self.renderer.render(kind.template_name(), &ctx);
            stats.render_errors += usize::from(outcome.is_failed());
            output.write(&route.path, outcome.into_html())?;
            stats.index_pages += 1;
            sitemap.add_listing(&route.url, newest(&list));
        }

        self.write_feeds(&output, &collections, &sitemap)?;

        let manifest = AssetProcessor::new(AssetOptions::from_config(&self.config))
            .process(&self.config.assets_path(), output.root())?;
        stats.assets = manifest.len();

        let public = assets::copy_tree(&self.config.public_path(), output.root())?;
        debug!(count = public, "copied public files");

        stats.duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
        self.content = Some(content);

        info!(
            pages = stats.pages,
            index_pages = stats.index_pages,
            render_errors = stats.render_errors,
            assets = stats.assets,
            duration_ms = stats.duration_ms,
            "build complete"
        );

        Ok(stats)
    }

    /// Collections with the pages this mode renders.
    fn visible_collections(&self, content: &SiteContent) -> BTreeMap<String, Vec<Arc<Page>>> {
        content
            .collections
            .iter()
            .map(|(name, pages)| {
                let visible = pages
                    .iter()
                    .filter(|p| self.mode.includes(p))
                    .cloned()
                    .collect();
                (name.clone(), visible)
            })
            .collect()
    }

    /// Collection indexes, then tag and category indexes.
    ///
    /// The default collection gets no index and does not contribute terms.
    /// Terms keep the order they are first seen in.
    fn listings(
        &self,
        collections: &BTreeMap<String, Vec<Arc<Page>>>,
    ) -> Vec<(ListingKind, String, Route, Vec<Arc<Page>>)> {
        let mut listings = Vec::new();
        let mut tags = Terms::default();
        let mut categories = Terms::default();

        for (name, pages) in collections {
            if name == DEFAULT_COLLECTION || pages.is_empty() {
                continue;
            }
            listings.push((
                ListingKind::Collection,
                name.clone(),
                collection_route(name),
                pages.clone(),
            ));

            for page in pages {
                for tag in &page.tags {
                    tags.add(tag, page);
                }
                for category in &page.categories {
                    categories.add(category, page);
                }
            }
        }

        for (name, pages) in tags.order {
            let route = tag_route(&name);
            listings.push((ListingKind::Tag, name, route, pages));
        }
        for (name, pages) in categories.order {
            let route = category_route(&name);
            listings.push((ListingKind::Category, name, route, pages));
        }

        listings
    }

    fn write_feeds(
        &self,
        output: &OutputWriter,
        collections: &BTreeMap<String, Vec<Arc<Page>>>,
        sitemap: &SitemapGenerator<'_>,
    ) -> Result<()> {
        if self.config.base_url.is_empty() {
            if self.config.generate_sitemap || self.config.generate_rss {
                debug!("base_url not set, skipping sitemap and RSS");
            }
            return Ok(());
        }

        if self.config.generate_sitemap {
            let path = output.write(Path::new("sitemap.xml"), sitemap.generate())?;
            info!(path = %path.display(), "generated sitemap");
        }

        if self.config.generate_rss {
            let items: Vec<Arc<Page>> = collections
                .iter()
                .filter(|(name, _)| name.as_str() != DEFAULT_COLLECTION)
                .flat_map(|(_, pages)| pages.iter().cloned())
                .collect();
            let xml = RssGenerator::new(&self.config).generate(&items);
            let path = output.write(Path::new("rss.xml"), xml)?;
            info!(path = %path.display(), "generated RSS feed");
        }

        Ok(())
    }
}

fn newest(pages: &[Arc<Page>]) -> Option<DateTime<Utc>> {
    pages.iter().map(|p| p.date).max()
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    fn site(dir: &Path) -> Config {
        Config {
            title: "Test Site".to_string(),
            base_url: "https://example.com".to_string(),
            optimize_images: false,
            root: dir.to_path_buf(),
            ..Config::default()
        }
    }

    fn write(dir: &Path, rel: &str, content: &str) {
        let path = dir.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_build_empty_site() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("content")).unwrap();

        let stats = Builder::new(site(dir.path())).build().unwrap();

        assert_eq!(stats.pages, 0);
        assert_eq!(stats.index_pages, 0);
        let dist = dir.path().join("dist");
        assert!(dist.join("sitemap.xml").exists());
        assert!(dist.join("rss.xml").exists());
        assert!(dist.join("assets/css/main.css").exists());
        assert!(dist.join("assets/js/main.js").exists());
    }

    #[test]
    fn test_build_with_content() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "content/posts/test-post.md",
            "---\ntitle: Test Post\ndate: 2024-01-14\ntags: [rust, web]\ncategories: [Dev]\n---\n\nHello, world!\n",
        );
        write(dir.path(), "content/pages/about.md", "---\ntitle: About\n---\nAbout us.\n");

        let mut builder = Builder::new(site(dir.path()));
        let stats = builder.build().unwrap();

        let dist = dir.path().join("dist");
        assert_eq!(stats.pages, 2);
        assert_eq!(stats.render_errors, 0);
        assert!(dist.join("posts/test-post/index.html").exists());
        assert!(dist.join("about/index.html").exists());
        assert!(dist.join("posts/index.html").exists());
        assert!(!dist.join("pages/index.html").exists());
        assert!(dist.join("tags/rust/index.html").exists());
        assert!(dist.join("tags/web/index.html").exists());
        assert!(dist.join("categories/dev/index.html").exists());
        assert_eq!(stats.index_pages, 4);
        assert_eq!(builder.content().map(SiteContent::len), Some(2));

        let sitemap = fs::read_to_string(dist.join("sitemap.xml")).unwrap();
        assert!(sitemap.contains("https://example.com/posts/test-post/"));
        assert!(sitemap.contains("https://example.com/tags/rust/"));
        let rss = fs::read_to_string(dist.join("rss.xml")).unwrap();
        assert!(rss.contains("Test Post"));
        assert!(!rss.contains("About"));
    }

    #[test]
    fn test_missing_input_leaves_output_untouched() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "dist/keep.txt", "previous build");

        let result = Builder::new(site(dir.path())).build();

        assert!(matches!(result, Err(BuildError::Catalog(_))));
        assert!(dir.path().join("dist/keep.txt").exists());
    }

    #[test]
    fn test_output_overlapping_sources_is_refused() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "content/post.md", "---\ntitle: Post\n---\nBody");
        let config = Config {
            output_dir: ".".to_string(),
            ..site(dir.path())
        };

        let result = Builder::new(config).build();

        assert!(matches!(result, Err(BuildError::Config(_))));
        assert!(dir.path().join("content/post.md").exists());
    }

    #[test]
    fn test_unreadable_file_does_not_stop_build() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "content/ok.md", "---\ntitle: Ok\n---\nStill here");
        fs::write(dir.path().join("content/bad.md"), [0xff, 0xfe, 0xfd]).unwrap();

        let stats = Builder::new(site(dir.path())).build().unwrap();

        assert_eq!(stats.pages, 1);
        let html = fs::read_to_string(dir.path().join("dist/ok/index.html")).unwrap();
        assert!(html.contains("Still here"));
        assert!(!dir.path().join("dist/bad").exists());
    }

    #[test]
    fn test_feeds_need_base_url() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "content/posts/a.md", "# A");
        let config = Config {
            base_url: String::new(),
            ..site(dir.path())
        };

        Builder::new(config).build().unwrap();

        assert!(!dir.path().join("dist/sitemap.xml").exists());
        assert!(!dir.path().join("dist/rss.xml").exists());
    }

    #[test]
    fn test_tags_merge_by_slug_in_first_seen_order() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "content/posts/a.md", "---\ntitle: A\ndate: 2024-01-02\ntags: [Rust, Zed]\n---\nA");
        write(dir.path(), "content/posts/b.md", "---\ntitle: B\ndate: 2024-01-01\ntags: [rust]\n---\nB");

        Builder::new(site(dir.path())).build().unwrap();

        let html = fs::read_to_string(dir.path().join("dist/tags/rust/index.html")).unwrap();
        assert!(html.contains("Tag: Rust"));
        assert!(html.contains("/posts/a/"));
        assert!(html.contains("/posts/b/"));
    }

    #[test]
    fn test_public_files_copied() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("content")).unwrap();
        write(dir.path(), "public/robots.txt", "User-agent: *");
        write(dir.path(), "public/img/favicon.ico", "icon");

        Builder::new(site(dir.path())).build().unwrap();

        let dist = dir.path().join("dist");
        assert_eq!(fs::read_to_string(dist.join("robots.txt")).unwrap(), "User-agent: *");
        assert!(dist.join("img/favicon.ico").exists());
    }

    #[test]
    fn test_build_mode() {
        let mut config = Config::default();
        assert_eq!(BuildMode::from_config(&config), BuildMode::Production);
        config.development = true;
        assert_eq!(BuildMode::from_config(&config), BuildMode::Development);

        let draft = Page {
            draft: true,
            ..Page::default()
        };
        assert!(!BuildMode::Production.includes(&draft));
        assert!(BuildMode::Development.includes(&draft));
    }
}
