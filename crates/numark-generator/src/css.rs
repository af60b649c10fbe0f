//! Stylesheet transforms: `@apply` utility expansion and vendor prefixing.

use std::sync::LazyLock;

use lightningcss::{
    stylesheet::{MinifyOptions, ParserOptions, PrinterOptions, StyleSheet},
    targets::{Browsers, Targets},
};
use regex::Regex;
use thiserror::Error;

/// Stylesheet transform errors.
#[derive(Debug, Error)]
pub enum CssError {
    /// `@apply` named a utility missing from the utility table.
    #[error("unknown utility class: {0}")]
    UnknownUtility(String),

    /// Unsupported `@apply` variant prefix.
    #[error("unknown variant: {0}")]
    UnknownVariant(String),

    /// The stylesheet could not be parsed or printed.
    #[error("css error: {0}")]
    Syntax(String),
}

pub type Result<T> = std::result::Result<T, CssError>;

static COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)/\*.*?\*/").expect("valid regex"));

/// A rule block without nested braces.
static BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([^{}]+)\{([^{}]*)\}").expect("valid regex"));

/// Run the full transform chain on one stylesheet.
pub fn transform(source: &str, filename: &str, minify: bool) -> Result<String> {
    let expanded = expand_apply(source)?;
    prefix(&expanded, filename, minify)
}

/// Fixed browser targets used for prefixing and lowering.
fn targets() -> Targets {
    Targets::from(Browsers {
        chrome: Some(90 << 16),
        firefox: Some(88 << 16),
        safari: Some(14 << 16),
        ..Browsers::default()
    })
}

/// Parse, add vendor prefixes for the target browsers and print.
pub fn prefix(source: &str, filename: &str, minify: bool) -> Result<String> {
    let options = ParserOptions {
        filename: filename.to_string(),
        ..ParserOptions::default()
    };
    let mut sheet =
        StyleSheet::parse(source, options).map_err(|e| CssError::Syntax(e.to_string()))?;

    sheet
        .minify(MinifyOptions {
            targets: targets(),
            ..MinifyOptions::default()
        })
        .map_err(|e| CssError::Syntax(e.to_string()))?;

    let printed = sheet
        .to_css(PrinterOptions {
            minify,
            targets: targets(),
            ..PrinterOptions::default()
        })
        .map_err(|e| CssError::Syntax(e.to_string()))?;

    Ok(printed.code)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Variant {
    dark: bool,
    pseudo: Option<&'static str>,
}

impl Variant {
    const BASE: Self = Self {
        dark: false,
        pseudo: None,
    };

    fn parse(prefixes: &[&str]) -> Result<Self> {
        let mut variant = Self::BASE;
        for prefix in prefixes {
            match *prefix {
                "dark" => variant.dark = true,
                "hover" => variant.pseudo = Some(":hover"),
                "focus" => variant.pseudo = Some(":focus"),
                other => return Err(CssError::UnknownVariant(other.to_string())),
            }
        }
        Ok(variant)
    }

    fn selector(self, selector: &str) -> String {
        selector
            .split(',')
            .map(|part| {
                let part = part.trim();
                let part = match self.pseudo {
                    Some(pseudo) => match part.find("::") {
                        Some(at) => format!("{}{pseudo}{}", &part[..at], &part[at..]),
                        None => format!("{part}{pseudo}"),
                    },
                    None => part.to_string(),
                };
                if self.dark {
                    format!(".dark {part}")
                } else {
                    part
                }
            })
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Replace `@apply` directives with the declarations of their utilities.
///
/// `hover:`, `focus:` and `dark:` variants become separate rules after the
/// block that applied them.
pub fn expand_apply(source: &str) -> Result<String> {
    let source = COMMENT.replace_all(source, "");
    if !source.contains("@apply") {
        return Ok(source.into_owned());
    }

    let mut out = String::with_capacity(source.len() * 2);
    let mut last = 0;

    for caps in BLOCK.captures_iter(&source) {
        let (Some(whole), Some(selector), Some(body)) = (caps.get(0), caps.get(1), caps.get(2))
        else {
            continue;
        };
        out.push_str(&source[last..whole.start()]);
        last = whole.end();

        if !body.as_str().contains("@apply") {
            out.push_str(whole.as_str());
            continue;
        }

        let raw_selector = selector.as_str();
        let trimmed = raw_selector.trim_start();
        let indent = &raw_selector[..raw_selector.len() - trimmed.len()];
        out.push_str(indent);
        out.push_str(&expand_block(trimmed.trim_end(), body.as_str())?);
    }

    out.push_str(&source[last..]);
    Ok(out)
}

fn expand_block(selector: &str, body: &str) -> Result<String> {
    let mut groups: Vec<(Variant, Vec<String>)> = vec![(Variant::BASE, Vec::new())];

    for statement in body.split(';').map(str::trim).filter(|s| !s.is_empty()) {
        let Some(classes) = statement.strip_prefix("@apply") else {
            groups[0].1.push(statement.to_string());
            continue;
        };

        for class in classes.split_whitespace() {
            let mut parts: Vec<&str> = class.split(':').collect();
            let name = parts.pop().unwrap_or_default();
            let variant = Variant::parse(&parts)?;
            let declarations =
                utility(name).ok_or_else(|| CssError::UnknownUtility(class.to_string()))?;

            match groups.iter_mut().find(|(v, _)| *v == variant) {
                Some((_, decls)) => decls.extend(declarations),
                None => groups.push((variant, declarations)),
            }
        }
    }

    let mut out = String::new();
    for (variant, decls) in groups {
        if decls.is_empty() {
            continue;
        }
        out.push_str(&format!(
            "{} {{ {}; }}\n",
            variant.selector(selector),
            decls.join("; ")
        ));
    }
    Ok(out)
}

fn decl(property: &str, value: &str) -> String {
    format!("{property}: {value}")
}

/// Declarations for a utility class.
fn utility(name: &str) -> Option<Vec<String>> {
    if let Some(decls) = static_utility(name) {
        return Some(decls.iter().map(|(p, v)| decl(p, v)).collect());
    }
    spacing_utility(name).or_else(|| color_utility(name))
}

fn static_utility(name: &str) -> Option<&'static [(&'static str, &'static str)]> {
    const TRANSITION_TIMING: (&str, &str) =
        ("transition-timing-function", "cubic-bezier(0.4, 0, 0.2, 1)");
    const TRANSITION_DURATION: (&str, &str) = ("transition-duration", "150ms");

    let decls: &'static [(&'static str, &'static str)] = match name {
        "block" => &[("display", "block")],
        "inline-block" => &[("display", "inline-block")],
        "inline-flex" => &[("display", "inline-flex")],
        "flex" => &[("display", "flex")],
        "hidden" => &[("display", "none")],
        "items-center" => &[("align-items", "center")],
        "max-w-none" => &[("max-width", "none")],
        "max-w-full" => &[("max-width", "100%")],
        "w-full" => &[("width", "100%")],
        "h-auto" => &[("height", "auto")],
        "overflow-x-auto" => &[("overflow-x", "auto")],
        "text-xs" => &[("font-size", "0.75rem"), ("line-height", "1rem")],
        "text-sm" => &[("font-size", "0.875rem"), ("line-height", "1.25rem")],
        "text-base" => &[("font-size", "1rem"), ("line-height", "1.5rem")],
        "text-lg" => &[("font-size", "1.125rem"), ("line-height", "1.75rem")],
        "text-xl" => &[("font-size", "1.25rem"), ("line-height", "1.75rem")],
        "text-2xl" => &[("font-size", "1.5rem"), ("line-height", "2rem")],
        "text-3xl" => &[("font-size", "1.875rem"), ("line-height", "2.25rem")],
        "text-4xl" => &[("font-size", "2.25rem"), ("line-height", "2.5rem")],
        "text-left" => &[("text-align", "left")],
        "text-center" => &[("text-align", "center")],
        "text-right" => &[("text-align", "right")],
        "text-white" => &[("color", "#fff")],
        "text-black" => &[("color", "#000")],
        "bg-white" => &[("background-color", "#fff")],
        "bg-transparent" => &[("background-color", "transparent")],
        "font-medium" => &[("font-weight", "500")],
        "font-semibold" => &[("font-weight", "600")],
        "font-bold" => &[("font-weight", "700")],
        "font-mono" => &[(
            "font-family",
            "ui-monospace, SFMono-Regular, Menlo, Monaco, Consolas, monospace",
        )],
        "italic" => &[("font-style", "italic")],
        "leading-relaxed" => &[("line-height", "1.625")],
        "underline" => &[("text-decoration-line", "underline")],
        "no-underline" => &[("text-decoration-line", "none")],
        "list-disc" => &[("list-style-type", "disc")],
        "list-decimal" => &[("list-style-type", "decimal")],
        "list-inside" => &[("list-style-position", "inside")],
        "border" => &[("border-width", "1px")],
        "border-l-4" => &[("border-left-width", "4px")],
        "border-t" => &[("border-top-width", "1px")],
        "border-collapse" => &[("border-collapse", "collapse")],
        "rounded" => &[("border-radius", "0.25rem")],
        "rounded-lg" => &[("border-radius", "0.5rem")],
        "rounded-full" => &[("border-radius", "9999px")],
        "shadow-md" => &[(
            "box-shadow",
            "0 4px 6px -1px rgb(0 0 0 / 0.1), 0 2px 4px -2px rgb(0 0 0 / 0.1)",
        )],
        "opacity-0" => &[("opacity", "0")],
        "opacity-100" => &[("opacity", "1")],
        "transition-colors" => &[
            (
                "transition-property",
                "color, background-color, border-color, text-decoration-color, fill, stroke",
            ),
            TRANSITION_TIMING,
            TRANSITION_DURATION,
        ],
        "transition-opacity" => &[
            ("transition-property", "opacity"),
            TRANSITION_TIMING,
            TRANSITION_DURATION,
        ],
        _ => return None,
    };
    Some(decls)
}

/// `p-4`, `mx-2`, `mb-0.5`: multiples of 0.25rem.
fn spacing_utility(name: &str) -> Option<Vec<String>> {
    let (prefix, amount) = name.split_once('-')?;
    let properties: &[&str] = match prefix {
        "p" => &["padding"],
        "px" => &["padding-left", "padding-right"],
        "py" => &["padding-top", "padding-bottom"],
        "pt" => &["padding-top"],
        "pr" => &["padding-right"],
        "pb" => &["padding-bottom"],
        "pl" => &["padding-left"],
        "m" => &["margin"],
        "mx" => &["margin-left", "margin-right"],
        "my" => &["margin-top", "margin-bottom"],
        "mt" => &["margin-top"],
        "mr" => &["margin-right"],
        "mb" => &["margin-bottom"],
        "ml" => &["margin-left"],
        _ => return None,
    };

    let steps: f64 = amount.parse().ok().filter(|s: &f64| s.is_finite() && *s >= 0.0)?;
    let value = if steps == 0.0 {
        "0".to_string()
    } else {
        format!("{}rem", steps * 0.25)
    };

    Some(properties.iter().map(|p| decl(p, &value)).collect())
}

/// `text-gray-700`, `bg-blue-100`, `border-gray-300`.
fn color_utility(name: &str) -> Option<Vec<String>> {
    let (property, rest) = if let Some(rest) = name.strip_prefix("text-") {
        ("color", rest)
    } else if let Some(rest) = name.strip_prefix("bg-") {
        ("background-color", rest)
    } else if let Some(rest) = name.strip_prefix("border-") {
        ("border-color", rest)
    } else {
        return None;
    };

    let (palette, shade) = rest.split_once('-')?;
    let shades: &[&str; 10] = match palette {
        "gray" => &GRAY,
        "blue" => &BLUE,
        "green" => &GREEN,
        _ => return None,
    };
    let index = match shade {
        "50" => 0,
        "100" => 1,
        "200" => 2,
        "300" => 3,
        "400" => 4,
        "500" => 5,
        "600" => 6,
        "700" => 7,
        "800" => 8,
        "900" => 9,
        _ => return None,
    };

    Some(vec![decl(property, shades[index])])
}

const GRAY: [&str; 10] = [
    "#f9fafb", "#f3f4f6", "#e5e7eb", "#d1d5db", "#9ca3af", "#6b7280", "#4b5563", "#374151",
    "#1f2937", "#111827",
];
const BLUE: [&str; 10] = [
    "#eff6ff", "#dbeafe", "#bfdbfe", "#93c5fd", "#60a5fa", "#3b82f6", "#2563eb", "#1d4ed8",
    "#1e40af", "#1e3a8a",
];
const GREEN: [&str; 10] = [
    "#f0fdf4", "#dcfce7", "#bbf7d0", "#86efac", "#4ade80", "#22c55e", "#16a34a", "#15803d",
    "#166534", "#14532d",
];

/// Base component styles for the synthesized `main.css`.
pub const MAIN_CSS: &str = r#"
.prose { @apply max-w-none; }
.prose h1 { @apply text-4xl font-bold mb-6 text-gray-900 dark:text-white; }
.prose h2 { @apply text-3xl font-semibold mb-4 text-gray-900 dark:text-white; }
.prose h3 { @apply text-2xl font-semibold mb-3 text-gray-900 dark:text-white; }
.prose p { @apply mb-4 text-gray-700 dark:text-gray-300 leading-relaxed; }
.prose a { @apply text-blue-600 dark:text-blue-400 hover:underline; }
.prose ul { @apply list-disc list-inside mb-4 text-gray-700 dark:text-gray-300; }
.prose ol { @apply list-decimal list-inside mb-4 text-gray-700 dark:text-gray-300; }
.prose blockquote { @apply border-l-4 border-gray-300 dark:border-gray-600 pl-4 italic text-gray-600 dark:text-gray-400 mb-4; }
.prose code { @apply bg-gray-100 dark:bg-gray-800 px-2 py-1 rounded text-sm font-mono; }
.prose pre { @apply bg-gray-100 dark:bg-gray-800 p-4 rounded-lg overflow-x-auto mb-4; }
.prose pre code { @apply bg-transparent p-0; }
.prose img { @apply max-w-full h-auto rounded-lg shadow-md; }
.prose table { @apply w-full border-collapse border border-gray-300 dark:border-gray-600 mb-4; }
.prose th, .prose td { @apply border border-gray-300 dark:border-gray-600 px-4 py-2 text-left; }
.prose th { @apply bg-gray-100 dark:bg-gray-800 font-semibold; }

/* Anchor links */
.anchor-link { @apply no-underline hover:underline; }
.anchor-link::before { content: '#'; @apply opacity-0 hover:opacity-100 transition-opacity mr-2; }

.tag { @apply inline-block bg-blue-100 dark:bg-blue-900 text-blue-800 dark:text-blue-200 px-2 py-1 rounded text-sm mr-2 mb-2; }
.nav-link { @apply text-gray-700 dark:text-gray-300 hover:text-blue-600 dark:hover:text-blue-400 transition-colors; }
.nav-link.active { @apply text-blue-600 dark:text-blue-400 font-semibold; }

.card { @apply bg-white dark:bg-gray-800 rounded-lg shadow-md p-6 mb-6; }
.card-title { @apply text-xl font-semibold mb-3 text-gray-900 dark:text-white; }
.card-content { @apply text-gray-700 dark:text-gray-300; }

.btn { @apply inline-flex items-center px-4 py-2 rounded-lg font-medium transition-colors; }
.btn-primary { @apply bg-blue-600 hover:bg-blue-700 text-white; }
.btn-secondary { @apply bg-gray-200 hover:bg-gray-300 text-gray-900 dark:bg-gray-700 dark:hover:bg-gray-600 dark:text-white; }

.dark-mode-toggle { @apply p-2 rounded-lg bg-gray-200 dark:bg-gray-700 hover:bg-gray-300 dark:hover:bg-gray-600 transition-colors; }

@media (max-width: 768px) {
  .prose h1 { @apply text-3xl; }
  .prose h2 { @apply text-2xl; }
  .prose h3 { @apply text-xl; }
}
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_basic_apply() {
        let css = expand_apply(".a { @apply p-4 font-bold; }").unwrap();
        assert!(css.contains(".a { padding: 1rem; font-weight: 700; }"));
        assert!(!css.contains("@apply"));
    }

    #[test]
    fn test_expand_keeps_plain_declarations() {
        let css = expand_apply(".a::before { content: '#'; @apply mr-2; }").unwrap();
        assert!(css.contains(".a::before { content: '#'; margin-right: 0.5rem; }"));
    }

    #[test]
    fn test_hover_and_dark_variants() {
        let css =
            expand_apply(".a::before { @apply opacity-0 hover:opacity-100 dark:hover:text-white; }")
                .unwrap();
        assert!(css.contains(".a::before { opacity: 0; }"));
        assert!(css.contains(".a:hover::before { opacity: 1; }"));
        assert!(css.contains(".dark .a:hover::before { color: #fff; }"));
    }

    #[test]
    fn test_variant_applies_to_each_selector() {
        let css = expand_apply(".x th, .x td { @apply dark:border-gray-600; }").unwrap();
        assert!(css.contains(".dark .x th, .dark .x td { border-color: #4b5563; }"));
    }

    #[test]
    fn test_nested_in_media_query() {
        let css = expand_apply("@media (max-width: 768px) {\n  .h { @apply text-3xl; }\n}").unwrap();
        assert!(css.starts_with("@media (max-width: 768px) {"));
        assert!(css.contains(".h { font-size: 1.875rem; line-height: 2.25rem; }"));
        assert!(css.trim_end().ends_with('}'));
    }

    #[test]
    fn test_unknown_utility_is_error() {
        let result = expand_apply(".a { @apply made-up-class; }");
        assert!(matches!(result, Err(CssError::UnknownUtility(name)) if name == "made-up-class"));

        let result = expand_apply(".a { @apply sm:p-4; }");
        assert!(matches!(result, Err(CssError::UnknownVariant(_))));
    }

    #[test]
    fn test_css_without_apply_passes_through() {
        let css = expand_apply("/* note */ body { color: red; }").unwrap();
        assert_eq!(css.trim(), "body { color: red; }");
    }

    #[test]
    fn test_spacing_scale() {
        assert_eq!(spacing_utility("p-0").unwrap(), vec!["padding: 0"]);
        assert_eq!(
            spacing_utility("py-1").unwrap(),
            vec!["padding-top: 0.25rem", "padding-bottom: 0.25rem"]
        );
        assert_eq!(spacing_utility("mb-0.5").unwrap(), vec!["margin-bottom: 0.125rem"]);
        assert!(spacing_utility("p-x").is_none());
    }

    #[test]
    fn test_prefixing_adds_vendor_prefixes() {
        let css = prefix(".a { user-select: none; }", "a.css", false).unwrap();
        assert!(css.contains("-webkit-user-select"));
    }

    #[test]
    fn test_main_css_transforms() {
        let css = transform(MAIN_CSS, "main.css", true).unwrap();
        assert!(css.contains(".prose"));
        assert!(css.contains(".dark"));
        assert!(!css.contains("@apply"));
    }
}
