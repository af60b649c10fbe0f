//! Button shortcode expansion.
//!
//! `[Text](button:ACTION:PARAM)` becomes an HTML control before Markdown
//! conversion:
//!
//! | action     | output                                            |
//! |------------|---------------------------------------------------|
//! | `link`     | anchor opening PARAM in a new tab                 |
//! | `email`    | `mailto:` anchor                                  |
//! | `download` | anchor with a `download` attribute                |
//! | `alert`    | button calling `alert(PARAM)`                     |
//! | `scroll`   | button scrolling element PARAM into view          |
//! | `toggle`   | button calling `toggleElement(PARAM)`             |
//! | other      | button calling `ACTION(PARAM)`                    |

use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::fence::FenceTracker;

static BUTTON_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[([^\]]+)\]\(button:([^:]+):([^)]+)\)").expect("valid button regex")
});

/// Expand button shortcodes outside fenced code blocks.
pub fn expand_shortcodes(markdown: &str) -> String {
    if !markdown.contains("](button:") {
        return markdown.to_string();
    }

    let mut out = String::with_capacity(markdown.len());
    let mut prose = String::new();
    let mut fence = FenceTracker::default();

    for line in markdown.split_inclusive('\n') {
        if fence.is_code(line) {
            out.push_str(&BUTTON_RE.replace_all(&prose, render_button));
            prose.clear();
            out.push_str(line);
        } else {
            prose.push_str(line);
        }
    }
    out.push_str(&BUTTON_RE.replace_all(&prose, render_button));

    out
}

fn render_button(caps: &Captures<'_>) -> String {
    let text = &caps[1];
    let action = &caps[2];
    let param = attr(&caps[3]);

    match action {
        "link" => format!(
            r#"<a href="{param}" class="btn btn-primary" target="_blank" rel="noopener noreferrer">{text}</a>"#
        ),
        "email" => format!(r#"<a href="mailto:{param}" class="btn btn-secondary">{text}</a>"#),
        "download" => format!(r#"<a href="{param}" class="btn btn-outline" download>{text}</a>"#),
        "alert" => {
            let message = param.replace('\'', "\\'");
            format!(r#"<button class="btn btn-primary" onclick="alert('{message}')">{text}</button>"#)
        }
        "scroll" => format!(
            r#"<button class="btn btn-secondary" onclick="document.getElementById('{param}').scrollIntoView({{behavior: 'smooth'}})">{text}</button>"#
        ),
        "toggle" => format!(
            r#"<button class="btn btn-outline" onclick="toggleElement('{param}')">{text}</button>"#
        ),
        other => format!(
            r#"<button class="btn btn-primary" onclick="{}('{param}')">{text}</button>"#,
            attr(other)
        ),
    }
}

/// Keep attribute values inside their double quotes.
fn attr(value: &str) -> String {
    value.replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_link_button() {
        assert_eq!(
            expand_shortcodes("[Get Started](button:link:https://example.com)"),
            r#"<a href="https://example.com" class="btn btn-primary" target="_blank" rel="noopener noreferrer">Get Started</a>"#
        );
    }

    #[test]
    fn test_email_and_download() {
        assert_eq!(
            expand_shortcodes("[Mail](button:email:hi@example.com)"),
            r#"<a href="mailto:hi@example.com" class="btn btn-secondary">Mail</a>"#
        );
        assert_eq!(
            expand_shortcodes("[Get](button:download:file.pdf)"),
            r#"<a href="file.pdf" class="btn btn-outline" download>Get</a>"#
        );
    }

    #[test]
    fn test_alert_escapes_quotes() {
        assert_eq!(
            expand_shortcodes("[Hi](button:alert:It's here)"),
            r#"<button class="btn btn-primary" onclick="alert('It\'s here')">Hi</button>"#
        );
    }

    #[test]
    fn test_scroll_and_toggle() {
        assert_eq!(
            expand_shortcodes("[Down](button:scroll:footer)"),
            r#"<button class="btn btn-secondary" onclick="document.getElementById('footer').scrollIntoView({behavior: 'smooth'})">Down</button>"#
        );
        assert_eq!(
            expand_shortcodes("[Menu](button:toggle:nav)"),
            r#"<button class="btn btn-outline" onclick="toggleElement('nav')">Menu</button>"#
        );
    }

    #[test]
    fn test_unknown_action_calls_function() {
        assert_eq!(
            expand_shortcodes("[Go](button:launch:rocket)"),
            r#"<button class="btn btn-primary" onclick="launch('rocket')">Go</button>"#
        );
    }

    #[test]
    fn test_link_parameter_keeps_colons() {
        let html = expand_shortcodes("[A](button:link:http://x.com:8080/p)");
        assert!(html.contains(r#"href="http://x.com:8080/p""#));
    }

    #[test]
    fn test_ordinary_links_untouched() {
        let md = "See [docs](https://example.com) and text.";
        assert_eq!(expand_shortcodes(md), md);
    }

    #[test]
    fn test_fenced_code_untouched() {
        let md = "```\n[A](button:toggle:x)\n```\n[B](button:toggle:y)\n";
        let out = expand_shortcodes(md);
        assert!(out.contains("[A](button:toggle:x)"));
        assert!(out.contains("toggleElement('y')"));
    }
}
