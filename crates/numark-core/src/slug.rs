//! URL slug generation.

/// Turn arbitrary text into a URL slug.
///
/// Lowercases, drops everything but ASCII letters, digits, whitespace, `_`
/// and `-`, collapses runs of whitespace, `_` and `-` into one `-`, and
/// strips leading and trailing hyphens. Applying it twice changes nothing.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_separator = false;

    for c in text.trim().chars() {
        if c.is_ascii_alphanumeric() {
            if pending_separator && !slug.is_empty() {
                slug.push('-');
            }
            pending_separator = false;
            slug.push(c.to_ascii_lowercase());
        } else if c.is_whitespace() || c == '_' || c == '-' {
            pending_separator = true;
        }
    }

    slug
}
