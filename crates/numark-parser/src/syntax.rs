//! Syntax highlighting for code blocks.

use syntect::{highlighting::ThemeSet, html::highlighted_html_for_string, parsing::SyntaxSet};

use crate::escape::escape_html;

/// Theme used unless another is configured.
pub const DEFAULT_THEME: &str = "base16-ocean.dark";

/// Syntax highlighter using syntect.
#[derive(Debug)]
pub struct SyntaxHighlighter {
    syntax_set: SyntaxSet,
    theme_set: ThemeSet,
    theme: String,
}

impl Default for SyntaxHighlighter {
    fn default() -> Self {
        Self::new(DEFAULT_THEME)
    }
}

impl SyntaxHighlighter {
    /// Create a new syntax highlighter with the specified theme.
    pub fn new(theme: &str) -> Self {
        Self {
            syntax_set: SyntaxSet::load_defaults_newlines(),
            theme_set: ThemeSet::load_defaults(),
            theme: theme.to_string(),
        }
    }

    /// Highlight code with the given language.
    ///
    /// Unknown languages are highlighted as plain text; if highlighting
    /// fails the code is escaped into a `<pre><code>` block.
    pub fn highlight(&self, code: &str, lang: Option<&str>) -> String {
        let syntax = lang
            .and_then(|l| self.syntax_set.find_syntax_by_token(l))
            .unwrap_or_else(|| self.syntax_set.find_syntax_plain_text());

        let theme = self
            .theme_set
            .themes
            .get(&self.theme)
            .or_else(|| self.theme_set.themes.values().next());

        let Some(theme) = theme else {
            return fallback_block(code, lang);
        };

        match highlighted_html_for_string(code, &self.syntax_set, syntax, theme) {
            Ok(html) => html,
            Err(e) => {
                tracing::debug!(error = %e, "syntax highlighting failed");
                fallback_block(code, lang)
            }
        }
    }
}

/// Plain escaped code block.
pub fn fallback_block(code: &str, lang: Option<&str>) -> String {
    let lang_class = lang
        .map(|l| format!(" class=\"language-{}\"", escape_html(l)))
        .unwrap_or_default();
    format!("<pre><code{lang_class}>{}</code></pre>\n", escape_html(code))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_highlight_rust() {
        let highlighter = SyntaxHighlighter::default();
        let code = "fn main() {\n    println!(\"Hello\");\n}\n";
        let html = highlighter.highlight(code, Some("rust"));

        assert!(html.contains("<pre"));
        assert!(html.contains("fn"));
        assert!(html.contains("style="));
    }

    #[test]
    fn test_highlight_unknown_language() {
        let highlighter = SyntaxHighlighter::default();
        let html = highlighter.highlight("some code\n", Some("unknown_lang_xyz"));
        assert!(html.contains("some code"));
    }

    #[test]
    fn test_highlight_escapes_markup() {
        let highlighter = SyntaxHighlighter::default();
        let html = highlighter.highlight("<div>\n", None);
        assert!(html.contains("&lt;div&gt;"));
        assert!(!html.contains("<div>"));
    }

    #[test]
    fn test_fallback_block() {
        let html = fallback_block("a < b", Some("js"));
        assert_eq!(
            html,
            "<pre><code class=\"language-js\">a &lt; b</code></pre>\n"
        );
    }
}
