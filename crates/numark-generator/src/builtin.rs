//! Built-in templates.

use std::sync::Arc;

use numark_core::{Page, TocEntry, slug::slugify};
use numark_parser::escape_html;

use crate::{
    render::{ListingKind, RenderContext},
    template::{Result, TemplateError, TemplateRegistry},
};

/// Related pages shown under a post.
const RELATED_LIMIT: usize = 4;

pub(crate) fn register(registry: &mut TemplateRegistry) {
    registry.insert_builtin("post", Arc::new(post));
    for kind in [ListingKind::Collection, ListingKind::Tag, ListingKind::Category] {
        registry.insert_builtin(kind.template_name(), Arc::new(listing));
    }
}

/// Generic article shell used when a template is not registered.
pub fn article(ctx: &RenderContext<'_>) -> String {
    let Some(page) = ctx.page else {
        return match ctx.listing {
            Some(listing) => listing_html(ctx, listing.kind, listing.name, listing.pages),
            None => "<article>\n<header>\n<h1>Untitled</h1>\n</header>\n</article>\n".to_string(),
        };
    };

    let title = if page.title.is_empty() {
        "Untitled".to_string()
    } else {
        escape_html(&page.title)
    };

    let mut html = format!("<article>\n<header>\n<h1>{title}</h1>\n");
    html.push_str(&time_tag(ctx, page));
    html.push_str("</header>\n<div class=\"content\">\n");
    html.push_str(&page.html);
    html.push_str("\n</div>\n");

    if !page.tags.is_empty() {
        html.push_str("<footer>\n<div class=\"tags\">");
        html.push_str(&tag_list(&page.tags));
        html.push_str("</div>\n</footer>\n");
    }

    html.push_str("</article>\n");
    html
}

fn post(ctx: &RenderContext<'_>) -> Result<String> {
    let page = ctx
        .page
        .ok_or_else(|| TemplateError::render("post template requires a page"))?;

    let mut html = String::from("<article class=\"prose post\">\n<header class=\"mb-8\">\n");
    html.push_str(&format!(
        "<h1 class=\"post-title\">{}</h1>\n",
        escape_html(&page.title)
    ));

    html.push_str("<div class=\"post-meta\">");
    html.push_str(&time_tag(ctx, page));
    if let Some(author) = page.author() {
        html.push_str(&format!("<span class=\"author\">by {}</span>", escape_html(author)));
    }
    if page.reading_time.minutes > 0 {
        html.push_str(&format!(
            "<span class=\"reading-time\">{}</span>",
            escape_html(&page.reading_time.text)
        ));
    }
    html.push_str("</div>\n");

    if !page.excerpt.is_empty() {
        html.push_str(&format!(
            "<p class=\"post-excerpt\">{}</p>\n",
            escape_html(&page.excerpt)
        ));
    }
    html.push_str("</header>\n");

    if !page.toc.is_empty() {
        html.push_str(&toc_nav(&page.toc));
    }

    html.push_str("<div class=\"content\">\n");
    html.push_str(&page.html);
    html.push_str("\n</div>\n<footer class=\"post-footer\">\n");

    if !page.tags.is_empty() {
        html.push_str("<div class=\"post-tags\"><h3>Tags</h3>");
        html.push_str(&term_links("tags", &page.tags));
        html.push_str("</div>\n");
    }
    if !page.categories.is_empty() {
        html.push_str("<div class=\"post-categories\"><h3>Categories</h3>");
        html.push_str(&term_links("categories", &page.categories));
        html.push_str("</div>\n");
    }

    let related: Vec<_> = ctx
        .collection(&page.collection)
        .iter()
        .filter(|p| p.id != page.id && !p.draft)
        .take(RELATED_LIMIT)
        .cloned()
        .collect();
    if !related.is_empty() {
        html.push_str("<div class=\"related\"><h3>Related</h3>\n");
        html.push_str(&page_list(ctx, &related));
        html.push_str("</div>\n");
    }

    html.push_str("</footer>\n</article>\n");
    Ok(html)
}

fn listing(ctx: &RenderContext<'_>) -> Result<String> {
    let listing = ctx
        .listing
        .ok_or_else(|| TemplateError::render("listing template requires a page list"))?;
    Ok(listing_html(ctx, listing.kind, listing.name, listing.pages))
}

fn listing_html(ctx: &RenderContext<'_>, kind: ListingKind, name: &str, pages: &[Arc<Page>]) -> String {
    format!(
        "<section class=\"listing listing-{}\">\n<h1>{}</h1>\n{}</section>\n",
        kind.template_name(),
        escape_html(&kind.heading(name)),
        page_list(ctx, pages)
    )
}

fn time_tag(ctx: &RenderContext<'_>, page: &Page) -> String {
    format!(
        "<time datetime=\"{}\">{}</time>",
        page.date.to_rfc3339(),
        escape_html(&ctx.format_date(page.date))
    )
}

fn toc_nav(toc: &[TocEntry]) -> String {
    let mut html = String::from("<nav class=\"toc\">\n<h2>Table of Contents</h2>\n<ul>\n");
    for entry in toc {
        html.push_str(&format!(
            "<li class=\"toc-level-{}\"><a href=\"{}\">{}</a></li>\n",
            entry.level,
            escape_html(&entry.anchor),
            escape_html(&entry.text)
        ));
    }
    html.push_str("</ul>\n</nav>\n");
    html
}

/// Terms with no slug have no index page, so they are not linked.
fn term_links(base: &str, terms: &[String]) -> String {
    let links: String = terms
        .iter()
        .map(|term| {
            let slug = slugify(term);
            if slug.is_empty() {
                format!("<span class=\"tag\">{}</span>", escape_html(term))
            } else {
                format!(
                    "<a class=\"tag\" href=\"/{base}/{slug}/\">{}</a>",
                    escape_html(term)
                )
            }
        })
        .collect();
    format!("<div class=\"tag-list\">{links}</div>")
}

/// Tags as escaped `<span class="tag">` elements.
pub fn tag_list(tags: &[String]) -> String {
    tags.iter()
        .map(|tag| format!("<span class=\"tag\">{}</span>", escape_html(tag)))
        .collect()
}

/// A list of page cards linking to each page.
pub fn page_list(ctx: &RenderContext<'_>, pages: &[Arc<Page>]) -> String {
    let mut html = String::from("<ul class=\"page-list\">\n");
    for page in pages {
        html.push_str(&format!(
            "<li class=\"card\"><a href=\"{}\"><h2 class=\"card-title\">{}</h2></a>{}<p class=\"card-content\">{}</p></li>\n",
            escape_html(&page.url),
            escape_html(&page.title),
            time_tag(ctx, page),
            escape_html(&page.excerpt)
        ));
    }
    html.push_str("</ul>\n");
    html
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_term_links_skip_unsluggable_terms() {
        let html = term_links("tags", &["日本語".to_string(), "Rust Lang".to_string()]);

        assert!(!html.contains("/tags//"));
        assert!(html.contains("<span class=\"tag\">日本語</span>"));
        assert!(html.contains("<a class=\"tag\" href=\"/tags/rust-lang/\">Rust Lang</a>"));
    }

    #[test]
    fn test_tag_list_escapes() {
        assert_eq!(tag_list(&["<b>".to_string()]), "<span class=\"tag\">&lt;b&gt;</span>");
    }
}
