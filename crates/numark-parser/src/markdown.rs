//! Markdown processor using pulldown-cmark.

use std::path::Path;

use numark_core::{
    Config,
    config::MarkdownConfig,
    content::{ContentDocument, ReadingTime, TocEntry},
    frontmatter::{Frontmatter, parse_frontmatter},
    slug::slugify,
};
use pulldown_cmark::{CodeBlockKind, CowStr, Event, Options, Parser, Tag, TagEnd, html};

use crate::{
    excerpt::{DEFAULT_EXCERPT_LENGTH, extract_excerpt, word_count},
    shortcode::expand_shortcodes,
    syntax::SyntaxHighlighter,
    toc::extract_toc,
};

/// Options controlling parsing and rendering.
#[derive(Debug, Clone)]
pub struct MarkdownOptions {
    pub gfm: bool,
    pub frontmatter: bool,
    pub highlight: bool,
    pub heading_ids: bool,
    pub anchor_links: bool,
    pub excerpt_length: usize,
}

impl Default for MarkdownOptions {
    fn default() -> Self {
        Self::from_markdown_config(&MarkdownConfig::default(), DEFAULT_EXCERPT_LENGTH)
    }
}

impl MarkdownOptions {
    fn from_markdown_config(markdown: &MarkdownConfig, excerpt_length: usize) -> Self {
        Self {
            gfm: markdown.gfm,
            frontmatter: markdown.frontmatter,
            highlight: markdown.highlight,
            heading_ids: markdown.toc || markdown.anchor_links,
            anchor_links: markdown.anchor_links,
            excerpt_length,
        }
    }

    /// Options from the site configuration.
    pub fn from_config(config: &Config) -> Self {
        Self::from_markdown_config(&config.markdown, config.excerpt_length)
    }
}

/// Result of splitting a raw document.
#[derive(Debug, Clone, Default)]
pub struct ParsedMarkdown {
    pub frontmatter: Frontmatter,
    pub body: String,
    pub excerpt: String,
    pub raw: String,
}

/// Outcome of [`MarkdownProcessor::validate`].
#[derive(Debug, Clone)]
pub struct ValidationReport {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub parsed: ParsedMarkdown,
}

/// Markdown processor with syntax highlighting support.
///
/// Parsing is a pure function of the input text and the options.
#[derive(Debug)]
pub struct MarkdownProcessor {
    options: MarkdownOptions,
    highlighter: SyntaxHighlighter,
}

impl Default for MarkdownProcessor {
    fn default() -> Self {
        Self::new(MarkdownOptions::default())
    }
}

impl MarkdownProcessor {
    pub fn new(options: MarkdownOptions) -> Self {
        Self {
            options,
            highlighter: SyntaxHighlighter::default(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(MarkdownOptions::from_config(config))
    }

    pub fn options(&self) -> &MarkdownOptions {
        &self.options
    }

    /// Split frontmatter from body. Never fails.
    pub fn parse(&self, raw: &str) -> ParsedMarkdown {
        self.parse_file(raw, Path::new("<input>"))
    }

    /// Like [`parse`](Self::parse), naming `path` in diagnostics.
    ///
    /// Malformed frontmatter is logged and the whole input becomes the body.
    pub fn parse_file(&self, raw: &str, path: &Path) -> ParsedMarkdown {
        let (frontmatter, body) = self.split(raw, path).unwrap_or_else(|e| {
            tracing::warn!(path = %path.display(), error = %e, "malformed frontmatter, treating input as body");
            (Frontmatter::default(), raw.trim().to_string())
        });

        let excerpt = match frontmatter.excerpt.as_deref() {
            Some(explicit) if !explicit.trim().is_empty() => explicit.trim().to_string(),
            _ => extract_excerpt(&body, self.options.excerpt_length),
        };

        ParsedMarkdown {
            frontmatter,
            body,
            excerpt,
            raw: raw.to_string(),
        }
    }

    fn split(&self, raw: &str, path: &Path) -> numark_core::Result<(Frontmatter, String)> {
        if self.options.frontmatter {
            parse_frontmatter(raw, path)
        } else {
            Ok((Frontmatter::default(), raw.trim().to_string()))
        }
    }

    /// Render a Markdown body to HTML, expanding button shortcodes first.
    pub fn render(&self, body: &str) -> String {
        let expanded = expand_shortcodes(body);
        self.render_markdown(&expanded)
    }

    /// Parse and render a document with all derived fields.
    pub fn process(&self, raw: &str) -> ContentDocument {
        self.process_file(raw, Path::new("<input>"))
    }

    /// Like [`process`](Self::process), naming `path` in diagnostics.
    pub fn process_file(&self, raw: &str, path: &Path) -> ContentDocument {
        let parsed = self.parse_file(raw, path);
        let html = self.render(&parsed.body);
        let words = word_count(&parsed.body);

        ContentDocument {
            raw: parsed.raw,
            html,
            excerpt: parsed.excerpt,
            word_count: words,
            reading_time: ReadingTime::from_word_count(words),
            toc: extract_toc(&parsed.body),
            body: parsed.body,
            frontmatter: parsed.frontmatter,
        }
    }

    /// Table of contents for a Markdown body.
    pub fn toc(&self, body: &str) -> Vec<TocEntry> {
        extract_toc(body)
    }

    /// Check a document for a title and a non-empty body.
    pub fn validate(&self, raw: &str) -> ValidationReport {
        let mut errors = Vec::new();

        if self.options.frontmatter {
            if let Err(e) = parse_frontmatter(raw, Path::new("<input>")) {
                errors.push(format!("Invalid frontmatter: {e}"));
            }
        }

        let parsed = self.parse(raw);
        if !parsed.frontmatter.has_title() {
            errors.push("Missing title in frontmatter".to_string());
        }
        if parsed.body.trim().is_empty() {
            errors.push("Content is empty".to_string());
        }

        ValidationReport {
            is_valid: errors.is_empty(),
            errors,
            parsed,
        }
    }

    fn pulldown_options(&self) -> Options {
        let mut options = Options::ENABLE_HEADING_ATTRIBUTES;
        if self.options.gfm {
            options.insert(Options::ENABLE_TABLES);
            options.insert(Options::ENABLE_FOOTNOTES);
            options.insert(Options::ENABLE_STRIKETHROUGH);
            options.insert(Options::ENABLE_TASKLISTS);
        }
        options
    }

    /// Rewrite headings and code blocks, then hand the stream to the
    /// stock HTML writer.
    fn render_markdown(&self, content: &str) -> String {
        let parser = Parser::new_ext(content, self.pulldown_options());
        let mut events: Vec<Event<'_>> = Vec::new();
        let mut heading: Option<HeadingCapture<'_>> = None;
        let mut code_block: Option<(Option<String>, String)> = None;

        for event in parser {
            if let Some((_, code)) = code_block.as_mut() {
                match event {
                    Event::Text(text) => code.push_str(&text),
                    Event::End(TagEnd::CodeBlock) => {
                        if let Some((lang, code)) = code_block.take() {
                            let highlighted = self.highlighter.highlight(&code, lang.as_deref());
                            events.push(Event::Html(CowStr::from(highlighted)));
                        }
                    }
                    _ => {}
                }
                continue;
            }

            match event {
                Event::Start(Tag::CodeBlock(kind)) if self.options.highlight => {
                    let lang = match kind {
                        CodeBlockKind::Fenced(info) => info
                            .split([' ', ',', '{'])
                            .next()
                            .filter(|l| !l.is_empty())
                            .map(str::to_string),
                        CodeBlockKind::Indented => None,
                    };
                    code_block = Some((lang, String::new()));
                }
                Event::Start(Tag::Heading { level, id, .. }) if self.options.heading_ids => {
                    heading = Some(HeadingCapture {
                        level: level as u8,
                        explicit_id: id.map(|i| i.to_string()),
                        text: String::new(),
                        inner: Vec::new(),
                    });
                }
                Event::End(TagEnd::Heading(_)) if heading.is_some() => {
                    if let Some(capture) = heading.take() {
                        capture.finish(self.options.anchor_links, &mut events);
                    }
                }
                other => match heading.as_mut() {
                    Some(capture) => {
                        if let Event::Text(text) | Event::Code(text) = &other {
                            capture.text.push_str(text);
                        }
                        capture.inner.push(other);
                    }
                    None => events.push(other),
                },
            }
        }

        let mut output = String::with_capacity(content.len() * 3 / 2);
        html::push_html(&mut output, events.into_iter());
        output
    }
}

struct HeadingCapture<'a> {
    level: u8,
    explicit_id: Option<String>,
    text: String,
    inner: Vec<Event<'a>>,
}

impl<'a> HeadingCapture<'a> {
    fn finish(self, anchor_links: bool, events: &mut Vec<Event<'a>>) {
        let level = self.level;
        let id = self.explicit_id.unwrap_or_else(|| slugify(&self.text));

        let open = if id.is_empty() {
            format!("<h{level}>")
        } else {
            format!("<h{level} id=\"{id}\">")
        };
        events.push(Event::Html(CowStr::from(open)));

        let linked = anchor_links && !id.is_empty();
        if linked {
            events.push(Event::Html(CowStr::from(format!(
                "<a href=\"#{id}\" class=\"anchor-link\">"
            ))));
        }
        events.extend(self.inner);
        if linked {
            events.push(Event::Html(CowStr::Borrowed("</a>")));
        }
        events.push(Event::Html(CowStr::from(format!("</h{level}>\n"))));
    }
}
