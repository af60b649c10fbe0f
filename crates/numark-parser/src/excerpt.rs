//! Plain-text excerpts and word counts.

use std::sync::LazyLock;

use numark_core::content::ReadingTime;
use regex::Regex;

/// Default excerpt length in characters.
pub const DEFAULT_EXCERPT_LENGTH: usize = 200;

struct Cleaner {
    pattern: Regex,
    replacement: &'static str,
}

// Images are stripped before links so `![alt](src)` does not leave `!alt`.
static CLEANERS: LazyLock<Vec<Cleaner>> = LazyLock::new(|| {
    [
        (r"#{1,6}\s+", ""),
        (r"\*\*(.*?)\*\*", "$1"),
        (r"\*(.*?)\*", "$1"),
        (r"`(.*?)`", "$1"),
        (r"!\[.*?\]\(.*?\)", ""),
        (r"\[(.*?)\]\(.*?\)", "$1"),
        (r"\s+", " "),
    ]
    .into_iter()
    .map(|(pattern, replacement)| Cleaner {
        pattern: Regex::new(pattern).expect("valid excerpt regex"),
        replacement,
    })
    .collect()
});

/// Strip Markdown syntax and collapse whitespace.
pub fn strip_markdown(markdown: &str) -> String {
    apply(markdown, &CLEANERS)
}

/// Like [`strip_markdown`], but leaves `#` runs alone.
pub fn strip_inline(text: &str) -> String {
    apply(text, &CLEANERS[1..])
}

fn apply(input: &str, cleaners: &[Cleaner]) -> String {
    let mut text = input.to_string();
    for cleaner in cleaners {
        text = cleaner
            .pattern
            .replace_all(&text, cleaner.replacement)
            .into_owned();
    }
    text.trim().to_string()
}

/// Extract a plain-text excerpt of at most `max_length` characters, plus
/// `...` when truncated.
pub fn extract_excerpt(markdown: &str, max_length: usize) -> String {
    let clean = strip_markdown(markdown);
    if clean.chars().count() <= max_length {
        return clean;
    }

    let truncated: String = clean.chars().take(max_length).collect();
    format!("{}...", truncated.trim_end())
}

/// Count words in the stripped text.
pub fn word_count(markdown: &str) -> usize {
    strip_markdown(markdown).split_whitespace().count()
}

/// Estimate reading time at 200 words per minute, rounded up.
pub fn reading_time(markdown: &str) -> ReadingTime {
    ReadingTime::from_word_count(word_count(markdown))
}
