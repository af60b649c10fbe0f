//! NuMark Parser Library
//!
//! Turns raw Markdown with frontmatter into structured documents: body,
//! rendered HTML, excerpt, word count, reading time and table of contents.

pub mod escape;
pub mod excerpt;
mod fence;
pub mod markdown;
pub mod shortcode;
pub mod syntax;
pub mod toc;

pub use escape::escape_html;
pub use excerpt::{extract_excerpt, reading_time, strip_markdown, word_count};
pub use markdown::{MarkdownOptions, MarkdownProcessor, ParsedMarkdown, ValidationReport};
pub use shortcode::expand_shortcodes;
pub use syntax::SyntaxHighlighter;
pub use toc::extract_toc;
