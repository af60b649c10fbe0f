//! NuMark Generator Library
//!
//! Static site generation engine for NuMark.
//!
//! # Modules
//!
//! - [`catalog`] - Content discovery and collection organization
//! - [`template`] - Template registry and `{{ var }}` interpolation
//! - [`render`] - Rendering with per-page failure isolation
//! - [`builtin`] - Built-in page and listing templates
//! - [`layout`] - Default document shell and error documents
//! - [`output`] - Output routes and file writing
//! - [`css`] - `@apply` expansion and vendor prefixing
//! - [`assets`] - Asset pipeline and manifest
//! - [`rss`] - RSS feed generation
//! - [`sitemap`] - XML sitemap generation
//! - [`build`] - Build orchestration

pub mod assets;
pub mod build;
pub mod builtin;
pub mod catalog;
pub mod css;
pub mod layout;
pub mod output;
pub mod render;
pub mod rss;
pub mod sitemap;
pub mod template;

pub use assets::{AssetManifest, AssetOptions, AssetProcessor};
pub use build::{BuildError, BuildMode, BuildStats, Builder};
pub use catalog::{ContentCatalog, SiteContent};
pub use output::{OutputWriter, Route};
pub use render::{RenderContext, RenderOutcome, SiteData, TemplateRenderer};
pub use rss::RssGenerator;
pub use sitemap::SitemapGenerator;
pub use template::{Template, TemplateContext, TemplateError, TemplateRegistry};
