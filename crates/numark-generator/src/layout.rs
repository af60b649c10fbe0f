//! Default HTML document shell and error document.

use numark_parser::escape_html;
use serde_json::json;

use crate::{render::RenderContext, template::TemplateError};

const GENERATOR: &str = "NuMark Static Site Generator";

/// Main stylesheet emitted by the asset pipeline.
pub const MAIN_CSS_URL: &str = "/assets/css/main.css";

/// Main script emitted by the asset pipeline.
pub const MAIN_JS_URL: &str = "/assets/js/main.js";

/// Wrap `content` in a complete HTML document.
pub fn default_shell(ctx: &RenderContext<'_>, content: &str) -> String {
    let site = ctx.site;
    let seo = &ctx.config.seo;
    let page = ctx.page;

    let title = match ctx.title() {
        Some(title) => format!("{} | {}", escape_html(&title), escape_html(&site.title)),
        None => escape_html(&site.title),
    };

    let mut head = Vec::new();
    head.push(format!("<title>{title}</title>"));

    if seo.generate_meta_tags {
        let description = page
            .map(|p| p.description())
            .filter(|d| !d.is_empty())
            .unwrap_or(&site.description);
        let author = page.and_then(|p| p.author()).unwrap_or(&site.author);
        head.push(meta_name("description", description));
        head.push(meta_name("author", author));
    }
    head.push(meta_name("generator", GENERATOR));

    if let Some(page) = page {
        let fm = &page.frontmatter;
        if let Some(canonical) = fm.canonical.as_deref().filter(|c| !c.is_empty()) {
            head.push(format!(
                "<link rel=\"canonical\" href=\"{}\">",
                escape_html(canonical)
            ));
        }
        if let Some(robots) = fm.robots.as_deref().filter(|r| !r.is_empty()) {
            head.push(meta_name("robots", robots));
        }
    }

    if seo.generate_open_graph {
        head.extend(open_graph_tags(ctx));
    }

    if seo.generate_twitter_card {
        head.push(meta_name("twitter:card", "summary_large_image"));
        if !site.author.is_empty() {
            head.push(meta_name("twitter:creator", &format!("@{}", site.author)));
        }
    }

    if seo.generate_json_ld {
        if let Some(script) = json_ld(ctx) {
            head.push(script);
        }
    }

    head.push(format!("<style>{CORE_CSS}</style>"));
    for href in &ctx.config.theme.custom_css {
        head.push(format!("<link rel=\"stylesheet\" href=\"{}\">", escape_html(href)));
    }
    head.push(format!("<link rel=\"stylesheet\" href=\"{MAIN_CSS_URL}\">"));

    let mut scripts = vec![format!("<script>{CORE_JS}</script>")];
    for src in &ctx.config.theme.custom_js {
        scripts.push(format!("<script src=\"{}\"></script>", escape_html(src)));
    }
    scripts.push(format!("<script src=\"{MAIN_JS_URL}\"></script>"));

    format!(
        r#"<!DOCTYPE html>
<html lang="{lang}">
<head>
  <meta charset="UTF-8">
  <meta name="viewport" content="width=device-width, initial-scale=1.0">
  <meta http-equiv="X-UA-Compatible" content="IE=edge">
  {head}
</head>
<body class="antialiased">
  <div id="root">
    <main class="container">
{content}
    </main>
  </div>
  {scripts}
</body>
</html>
"#,
        lang = escape_html(&site.language),
        head = head.join("\n  "),
        scripts = scripts.join("\n  "),
    )
}

/// Document shown in place of a page whose template or layout failed.
///
/// Details are only included in development.
pub fn error_document(ctx: &RenderContext<'_>, error: &TemplateError, development: bool) -> String {
    let mut content = format!(
        "<div class=\"error\">\n<h1>Template Error</h1>\n<p>An error occurred while rendering the template:</p>\n<pre><code>{}</code></pre>\n",
        escape_html(&error.to_string())
    );
    if development {
        content.push_str(&format!(
            "<details>\n<summary>Stack Trace</summary>\n<pre><code>{}</code></pre>\n</details>\n",
            escape_html(&format!("{error:#?}"))
        ));
    }
    content.push_str("</div>");
    default_shell(ctx, &content)
}

fn meta_name(name: &str, content: &str) -> String {
    format!(
        "<meta name=\"{name}\" content=\"{}\">",
        escape_html(content)
    )
}

fn meta_property(property: &str, content: &str) -> String {
    format!(
        "<meta property=\"{property}\" content=\"{}\">",
        escape_html(content)
    )
}

fn open_graph_tags(ctx: &RenderContext<'_>) -> Vec<String> {
    let mut tags = Vec::new();
    if let Some(title) = ctx.title() {
        tags.push(meta_property("og:title", &title));
    }

    if let Some(page) = ctx.page {
        if !page.excerpt.is_empty() {
            tags.push(meta_property("og:description", &page.excerpt));
        }
        if let Some(image) = page.frontmatter.image.as_deref().filter(|i| !i.is_empty()) {
            tags.push(meta_property("og:image", image));
        }
    }

    tags.push(meta_property("og:type", "article"));

    if let Some(page) = ctx.page {
        tags.push(meta_property("article:published_time", &page.date.to_rfc3339()));
        for tag in &page.tags {
            tags.push(meta_property("article:tag", tag));
        }
    }
    tags
}

fn json_ld(ctx: &RenderContext<'_>) -> Option<String> {
    let page = ctx.page?;
    let site = ctx.site;
    let author = page.author().unwrap_or(&site.author);

    let mut data = json!({
        "@context": "https://schema.org",
        "@type": "Article",
        "headline": page.title,
        "description": page.description(),
        "datePublished": page.date.to_rfc3339(),
        "url": ctx.config.url_for(&page.url),
        "keywords": page.tags,
    });
    if !author.is_empty() {
        data["author"] = json!({ "@type": "Person", "name": author });
    }
    if let Some(image) = page.frontmatter.image.as_deref() {
        data["image"] = json!(image);
    }

    let body = data.to_string().replace("</", "<\\/");
    Some(format!("<script type=\"application/ld+json\">{body}</script>"))
}

const CORE_CSS: &str = r#"
*{box-sizing:border-box}
body{margin:0;padding:0;font-family:-apple-system,BlinkMacSystemFont,'Segoe UI',Roboto,Oxygen,Ubuntu,Cantarell,sans-serif;line-height:1.6;color:#333;background-color:#fff}
.container{max-width:1200px;margin:0 auto;padding:0 1rem}
@media (min-width:640px){.container{padding:0 1.5rem}}
@media (min-width:1024px){.container{padding:0 2rem}}
.btn{display:inline-flex;align-items:center;justify-content:center;padding:.5rem 1rem;border:1px solid transparent;border-radius:.375rem;font-size:.875rem;font-weight:500;text-decoration:none;cursor:pointer;transition:all .2s ease-in-out;white-space:nowrap}
.btn:hover{transform:translateY(-1px);box-shadow:0 4px 12px rgba(0,0,0,.15)}
.btn-primary{background-color:#3b82f6;color:#fff;border-color:#3b82f6}
.btn-primary:hover{background-color:#2563eb;border-color:#2563eb}
.btn-secondary{background-color:#6b7280;color:#fff;border-color:#6b7280}
.btn-secondary:hover{background-color:#4b5563;border-color:#4b5563}
.btn-outline{background-color:transparent;color:#3b82f6;border-color:#3b82f6}
.btn-outline:hover{background-color:#3b82f6;color:#fff}
h1,h2,h3,h4,h5,h6{margin:0 0 1rem 0;font-weight:600;line-height:1.25}
h1{font-size:2.25rem}h2{font-size:1.875rem}h3{font-size:1.5rem}h4{font-size:1.25rem}h5{font-size:1.125rem}h6{font-size:1rem}
@media (max-width:640px){h1{font-size:1.875rem}h2{font-size:1.5rem}h3{font-size:1.25rem}}
p{margin:0 0 1rem 0}
img{max-width:100%;height:auto}
table{width:100%;border-collapse:collapse;margin:1rem 0}
th,td{padding:.75rem;text-align:left;border-bottom:1px solid #e5e7eb}
th{font-weight:600;background-color:#f9fafb}
.grid{display:grid;gap:1rem}
.grid-cols-1{grid-template-columns:repeat(1,minmax(0,1fr))}
.grid-cols-2{grid-template-columns:repeat(2,minmax(0,1fr))}
.grid-cols-3{grid-template-columns:repeat(3,minmax(0,1fr))}
.grid-cols-4{grid-template-columns:repeat(4,minmax(0,1fr))}
@media (max-width:768px){.grid-cols-2,.grid-cols-3,.grid-cols-4{grid-template-columns:repeat(1,minmax(0,1fr))}}
.text-center{text-align:center}.text-left{text-align:left}.text-right{text-align:right}
.hidden{display:none}
"#;

const CORE_JS: &str = r#"
function toggleElement(id){var el=document.getElementById(id);if(el){el.style.display=el.style.display==='none'?'':'none';}}
function smoothScrollTo(id){var el=document.getElementById(id);if(el){el.scrollIntoView({behavior:'smooth'});}}
function showNotification(message,type){
  type=type||'info';
  var colors={success:'#10b981',error:'#ef4444',warning:'#f59e0b',info:'#3b82f6'};
  var n=document.createElement('div');
  n.className='notification notification-'+type;
  n.textContent=message;
  n.style.cssText='position:fixed;top:20px;right:20px;padding:12px 24px;border-radius:8px;color:white;font-weight:500;z-index:1000;animation:slideIn .3s ease-out;';
  n.style.backgroundColor=colors[type]||colors.info;
  document.body.appendChild(n);
  setTimeout(function(){n.style.animation='slideOut .3s ease-in';setTimeout(function(){n.remove();},300);},3000);
}
(function(){
  var s=document.createElement('style');
  s.textContent='@keyframes slideIn{from{transform:translateX(100%);opacity:0}to{transform:translateX(0);opacity:1}}@keyframes slideOut{from{transform:translateX(0);opacity:1}to{transform:translateX(100%);opacity:0}}';
  document.head.appendChild(s);
})();
"#;

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::{TimeZone, Utc};
    use numark_core::{Config, Frontmatter, Page, ReadingTime};

    use super::*;
    use crate::render::SiteData;

    fn page() -> Page {
        let frontmatter = Frontmatter {
            canonical: Some("https://example.com/canon/".into()),
            robots: Some("noindex".into()),
            image: Some("/img/cover.png".into()),
            author: Some("Ada".into()),
            ..Frontmatter::default()
        };
        Page {
            id: "p".into(),
            file_path: "p.md".into(),
            relative_path: "p.md".into(),
            slug: "p".into(),
            url: "/p/".into(),
            title: "A \"quoted\" title".into(),
            content: String::new(),
            html: String::new(),
            frontmatter,
            excerpt: "Short </script> summary".into(),
            word_count: 0,
            reading_time: ReadingTime::default(),
            toc: Vec::new(),
            template: "default".into(),
            layout: "default".into(),
            date: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            draft: false,
            tags: vec!["x".into(), "y".into()],
            categories: Vec::new(),
            collection: "pages".into(),
        }
    }

    fn config() -> Config {
        let mut config = Config::default();
        config.title = "Site".into();
        config.author = "siteauthor".into();
        config.base_url = "https://example.com".into();
        config.theme.custom_css = vec!["/theme.css".into()];
        config.theme.custom_js = vec!["/theme.js".into()];
        config
    }

    #[test]
    fn test_shell_head_and_body() {
        let config = config();
        let site = SiteData::from_config(&config, Utc::now());
        let collections = BTreeMap::new();
        let page = page();
        let ctx = RenderContext::new(&config, &site, &collections).with_page(&page);

        let html = default_shell(&ctx, "<p>inner</p>");

        assert!(html.starts_with("<!DOCTYPE html>\n<html lang=\"en\">"));
        assert!(html.contains("<title>A &quot;quoted&quot; title | Site</title>"));
        assert!(html.contains("<meta name=\"author\" content=\"Ada\">"));
        assert!(html.contains("<meta name=\"generator\" content=\"NuMark Static Site Generator\">"));
        assert!(html.contains("<link rel=\"canonical\" href=\"https://example.com/canon/\">"));
        assert!(html.contains("<meta name=\"robots\" content=\"noindex\">"));
        assert!(html.contains("<meta property=\"og:image\" content=\"/img/cover.png\">"));
        assert!(html.contains("<meta property=\"article:tag\" content=\"y\">"));
        assert!(html.contains("<meta name=\"twitter:creator\" content=\"@siteauthor\">"));
        assert!(html.contains("application/ld+json"));
        assert!(!html.contains("Short </script>"));
        assert!(html.contains("<main class=\"container\">\n<p>inner</p>"));

        let theme_css = html.find("/theme.css").unwrap();
        let main_css = html.find(MAIN_CSS_URL).unwrap();
        assert!(theme_css < main_css);
        let theme_js = html.find("/theme.js").unwrap();
        let main_js = html.find(MAIN_JS_URL).unwrap();
        assert!(theme_js < main_js);
    }

    #[test]
    fn test_seo_toggles() {
        let mut config = config();
        config.seo.generate_open_graph = false;
        config.seo.generate_twitter_card = false;
        config.seo.generate_json_ld = false;
        config.seo.generate_meta_tags = false;
        let site = SiteData::from_config(&config, Utc::now());
        let collections = BTreeMap::new();
        let page = page();
        let ctx = RenderContext::new(&config, &site, &collections).with_page(&page);

        let html = default_shell(&ctx, "");
        assert!(!html.contains("og:"));
        assert!(!html.contains("twitter:"));
        assert!(!html.contains("ld+json"));
        assert!(!html.contains("name=\"description\""));
        assert!(html.contains("name=\"generator\""));
    }

    #[test]
    fn test_site_title_without_page() {
        let config = config();
        let site = SiteData::from_config(&config, Utc::now());
        let collections = BTreeMap::new();
        let ctx = RenderContext::new(&config, &site, &collections);

        let html = default_shell(&ctx, "");
        assert!(html.contains("<title>Site</title>"));
        assert!(!html.contains("article:published_time"));
    }

    #[test]
    fn test_error_document_escapes_message() {
        let config = config();
        let site = SiteData::from_config(&config, Utc::now());
        let collections = BTreeMap::new();
        let ctx = RenderContext::new(&config, &site, &collections);

        let error = TemplateError::render("<bad>");
        let html = error_document(&ctx, &error, false);
        assert!(html.contains("<h1>Template Error</h1>"));
        assert!(html.contains("<pre><code>&lt;bad&gt;</code></pre>"));
        assert!(!html.contains("<details>"));

        let html = error_document(&ctx, &error, true);
        assert!(html.contains("<summary>Stack Trace</summary>"));
    }
}
