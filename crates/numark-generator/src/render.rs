//! Template rendering with per-page failure isolation.
//!
//! A render never fails: template and layout errors, panics included, are
//! turned into an error document for the page being rendered.

use std::{
    any::Any,
    collections::BTreeMap,
    fs,
    panic::{self, AssertUnwindSafe},
    path::Path,
    sync::Arc,
};

use chrono::{DateTime, Utc};
use numark_core::{Config, Page};
use numark_parser::escape_html;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::{
    builtin, layout,
    template::{Result, Template, TemplateContext, TemplateError, TemplateRegistry},
};

/// Layout used when a page names none.
pub const DEFAULT_LAYOUT: &str = "default";

/// Site-level data available to every render.
#[derive(Debug, Clone, Serialize)]
pub struct SiteData {
    pub title: String,
    pub description: String,
    pub base_url: String,
    pub author: String,
    pub language: String,
    pub build_time: DateTime<Utc>,
}

impl SiteData {
    pub fn from_config(config: &Config, build_time: DateTime<Utc>) -> Self {
        Self {
            title: config.title.clone(),
            description: config.description.clone(),
            base_url: config.base_url.clone(),
            author: config.author.clone(),
            language: config.language.clone(),
            build_time,
        }
    }
}

/// Kind of index page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListingKind {
    Collection,
    Tag,
    Category,
}

impl ListingKind {
    /// Name of the template that renders this kind of listing.
    pub fn template_name(self) -> &'static str {
        match self {
            Self::Collection => "collection",
            Self::Tag => "tag",
            Self::Category => "category",
        }
    }

    /// Visible heading for a listing called `name`.
    pub fn heading(self, name: &str) -> String {
        match self {
            Self::Collection => name.to_string(),
            Self::Tag => format!("Tag: {name}"),
            Self::Category => format!("Category: {name}"),
        }
    }
}

/// An index page: a named list of pages.
#[derive(Debug, Clone, Copy)]
pub struct Listing<'a> {
    pub kind: ListingKind,
    pub name: &'a str,
    pub pages: &'a [Arc<Page>],
}

/// Everything a template can see.
#[derive(Debug, Clone, Copy)]
pub struct RenderContext<'a> {
    pub config: &'a Config,
    pub site: &'a SiteData,
    pub collections: &'a BTreeMap<String, Vec<Arc<Page>>>,
    pub page: Option<&'a Page>,
    pub listing: Option<Listing<'a>>,
}

impl<'a> RenderContext<'a> {
    pub fn new(
        config: &'a Config,
        site: &'a SiteData,
        collections: &'a BTreeMap<String, Vec<Arc<Page>>>,
    ) -> Self {
        Self {
            config,
            site,
            collections,
            page: None,
            listing: None,
        }
    }

    #[must_use]
    pub fn with_page(mut self, page: &'a Page) -> Self {
        self.page = Some(page);
        self
    }

    #[must_use]
    pub fn with_listing(mut self, listing: Listing<'a>) -> Self {
        self.listing = Some(listing);
        self
    }

    /// Document title: the page title, else the listing heading.
    pub fn title(&self) -> Option<String> {
        if let Some(page) = self.page {
            return Some(page.title.clone()).filter(|t| !t.is_empty());
        }
        self.listing.map(|l| l.kind.heading(l.name))
    }

    /// Format a date with the configured `date_format`.
    pub fn format_date(&self, date: DateTime<Utc>) -> String {
        format_date(date, &self.config.date_format)
    }

    /// Pages of a collection, empty if unknown.
    pub fn collection(&self, name: &str) -> &'a [Arc<Page>] {
        self.collections.get(name).map_or(&[], Vec::as_slice)
    }
}

/// Result of rendering one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderOutcome {
    Rendered(String),
    /// Rendering failed; `html` is the error document written in its place.
    Failed { html: String, error: String },
}

impl RenderOutcome {
    pub fn html(&self) -> &str {
        match self {
            Self::Rendered(html) | Self::Failed { html, .. } => html,
        }
    }

    pub fn into_html(self) -> String {
        match self {
            Self::Rendered(html) | Self::Failed { html, .. } => html,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// Renders pages through registered templates and layouts.
#[derive(Debug, Clone)]
pub struct TemplateRenderer {
    registry: TemplateRegistry,
    development: bool,
}

impl TemplateRenderer {
    /// Renderer with the built-in templates registered.
    #[must_use]
    pub fn new(development: bool) -> Self {
        let mut registry = TemplateRegistry::new();
        builtin::register(&mut registry);
        Self {
            registry,
            development,
        }
    }

    /// Built-ins plus the HTML templates found in the templates directory.
    pub fn from_config(config: &Config, development: bool) -> Self {
        let mut renderer = Self::new(development);
        renderer.load_templates(&config.templates_path());
        renderer
    }

    /// Register `*.html` under `dir` as templates and `dir/layouts/*.html`
    /// as layouts, keyed by file stem. Returns how many were loaded.
    pub fn load_templates(&mut self, dir: &Path) -> usize {
        if !dir.is_dir() {
            debug!(dir = %dir.display(), "templates directory not found");
            return 0;
        }

        let mut loaded = 0;
        for (name, source) in read_html_files(dir) {
            let template = Template::new(&name, source);
            let registered = self
                .registry
                .register_template(&name, move |ctx| template.render(&template_variables(ctx)));
            loaded += usize::from(log_registration(&name, registered));
        }

        for (name, source) in read_html_files(&dir.join("layouts")) {
            let template = Template::new(&name, source);
            let registered = self.registry.register_layout(&name, move |ctx, content| {
                let mut vars = template_variables(ctx);
                vars.insert("content", content);
                template.render(&vars)
            });
            loaded += usize::from(log_registration(&name, registered));
        }

        info!(count = loaded, dir = %dir.display(), "loaded templates");
        loaded
    }

    pub fn registry(&self) -> &TemplateRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut TemplateRegistry {
        &mut self.registry
    }

    pub fn is_development(&self) -> bool {
        self.development
    }

    /// Render `name` for the given context.
    ///
    /// Unknown templates fall back to the generic article template.
    pub fn render(&self, name: &str, ctx: &RenderContext<'_>) -> RenderOutcome {
        let body = match self.registry.template(name) {
            Some(template) => guarded(|| template(ctx)),
            None => {
                debug!(template = name, "template not registered, using default");
                Ok(builtin::article(ctx))
            }
        };

        match body.and_then(|body| self.wrap(ctx, &body)) {
            Ok(html) => RenderOutcome::Rendered(html),
            Err(error) => {
                warn!(template = name, error = %error, "render failed");
                RenderOutcome::Failed {
                    html: layout::error_document(ctx, &error, self.development),
                    error: error.to_string(),
                }
            }
        }
    }

    fn wrap(&self, ctx: &RenderContext<'_>, body: &str) -> Result<String> {
        let name = ctx
            .page
            .map(|p| p.layout.as_str())
            .filter(|l| !l.is_empty())
            .unwrap_or(DEFAULT_LAYOUT);

        match self.registry.layout(name) {
            Some(layout) => guarded(|| layout(ctx, body)),
            None => Ok(layout::default_shell(ctx, body)),
        }
    }
}

fn log_registration(name: &str, result: Result<()>) -> bool {
    match result {
        Ok(()) => {
            debug!(name, "registered template");
            true
        }
        Err(e) => {
            warn!(name, error = %e, "failed to register template");
            false
        }
    }
}

fn read_html_files(dir: &Path) -> Vec<(String, String)> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };

    let mut paths: Vec<_> = entries
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && p.extension().is_some_and(|e| e == "html"))
        .collect();
    paths.sort();

    paths
        .into_iter()
        .filter_map(|path| {
            let name = path.file_stem()?.to_string_lossy().into_owned();
            match fs::read_to_string(&path) {
                Ok(source) => Some((name, source)),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "failed to read template");
                    None
                }
            }
        })
        .collect()
}

/// Run a render function, converting a panic into an error.
fn guarded(f: impl FnOnce() -> Result<String>) -> Result<String> {
    panic::catch_unwind(AssertUnwindSafe(f))
        .unwrap_or_else(|payload| Err(TemplateError::Panic(panic_message(payload.as_ref()))))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Variables exposed to file templates. Text is escaped, HTML bodies are not.
pub fn template_variables(ctx: &RenderContext<'_>) -> TemplateContext {
    let site = ctx.site;
    let mut vars = TemplateContext::new()
        .with_var("site_title", escape_html(&site.title))
        .with_var("site_description", escape_html(&site.description))
        .with_var("site_base_url", escape_html(&site.base_url))
        .with_var("site_author", escape_html(&site.author))
        .with_var("site_language", escape_html(&site.language))
        .with_var("build_time", site.build_time.to_rfc3339());

    if let Some(page) = ctx.page {
        vars.insert("page_title", escape_html(&page.title));
        vars.insert("page_html", page.html.as_str());
        vars.insert("page_excerpt", escape_html(&page.excerpt));
        vars.insert("page_date", ctx.format_date(page.date));
        vars.insert("page_slug", escape_html(&page.slug));
        vars.insert("page_url", escape_html(&page.url));
        vars.insert("page_tags", builtin::tag_list(&page.tags));
        vars.insert("reading_time", escape_html(&page.reading_time.text));
    }

    if let Some(listing) = ctx.listing {
        vars.insert("listing_name", escape_html(listing.name));
        vars.insert("listing_items", builtin::page_list(ctx, listing.pages));
    }

    vars
}

/// Format a date using `YYYY MM DD HH mm ss` tokens.
pub fn format_date(date: DateTime<Utc>, pattern: &str) -> String {
    date.format(&chrono_pattern(pattern)).to_string()
}

/// Translate a `YYYY-MM-DD` style pattern into a chrono format string.
fn chrono_pattern(pattern: &str) -> String {
    const TOKENS: [(&str, &str); 6] = [
        ("YYYY", "%Y"),
        ("MM", "%m"),
        ("DD", "%d"),
        ("HH", "%H"),
        ("mm", "%M"),
        ("ss", "%S"),
    ];

    let mut out = String::with_capacity(pattern.len() * 2);
    let mut rest = pattern;

    'scan: while !rest.is_empty() {
        for (token, spec) in TOKENS {
            if let Some(tail) = rest.strip_prefix(token) {
                out.push_str(spec);
                rest = tail;
                continue 'scan;
            }
        }

        let mut chars = rest.chars();
        if let Some(c) = chars.next() {
            if c == '%' {
                out.push_str("%%");
            } else {
                out.push(c);
            }
        }
        rest = chars.as_str();
    }

    out
}
