//! Table of contents extraction.

use std::sync::LazyLock;

use numark_core::{content::TocEntry, slug::slugify};
use regex::Regex;

use crate::{excerpt::strip_inline, fence::FenceTracker};

static HEADING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(#{1,6})\s+(.+)$").expect("valid heading regex"));

/// Scan ATX heading lines, skipping fenced code blocks.
pub fn extract_toc(markdown: &str) -> Vec<TocEntry> {
    let mut fence = FenceTracker::default();
    let mut entries = Vec::new();

    for line in markdown.lines() {
        if fence.is_code(line) {
            continue;
        }
        let Some(caps) = HEADING_RE.captures(line) else {
            continue;
        };

        let level = caps[1].len() as u8;
        let text = heading_text(&caps[2]);
        if text.is_empty() {
            continue;
        }
        let slug = slugify(&text);
        entries.push(TocEntry::new(level, text, slug));
    }

    entries
}

/// Heading text without a closing `#` sequence or inline markup.
fn heading_text(raw: &str) -> String {
    let trimmed = raw.trim();
    let without_closing = match trimmed.trim_end_matches('#') {
        rest if rest.len() < trimmed.len() && (rest.is_empty() || rest.ends_with(' ')) => rest,
        _ => trimmed,
    };
    strip_inline(without_closing)
}
