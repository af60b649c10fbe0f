//! NuMark Core Library
//!
//! Core types, configuration, and error handling for the NuMark static site generator.

pub mod config;
pub mod content;
pub mod error;
pub mod frontmatter;
pub mod slug;

pub use config::{CollectionConfig, Config, SortOrder};
pub use content::{ContentDocument, ContentPath, ContentType, Page, ReadingTime, TocEntry};
pub use error::{CoreError, Result};
pub use frontmatter::Frontmatter;
pub use slug::slugify;
