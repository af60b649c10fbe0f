//! Sitemap generation.

use chrono::{DateTime, Utc};
use numark_core::{Config, Page};
use tracing::debug;

/// Change frequency for sitemap entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeFreq {
    Daily,
    Weekly,
    Monthly,
}

impl ChangeFreq {
    fn as_str(self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
        }
    }
}

/// A sitemap URL entry.
#[derive(Debug, Clone, PartialEq)]
pub struct SitemapUrl {
    /// Absolute URL.
    pub loc: String,
    pub lastmod: Option<DateTime<Utc>>,
    pub changefreq: ChangeFreq,
    /// Priority (0.0 to 1.0).
    pub priority: f32,
}

/// Collects URLs and renders `sitemap.xml`.
#[derive(Debug)]
pub struct SitemapGenerator<'a> {
    config: &'a Config,
    urls: Vec<SitemapUrl>,
}

impl<'a> SitemapGenerator<'a> {
    #[must_use]
    pub fn new(config: &'a Config) -> Self {
        Self {
            config,
            urls: Vec::new(),
        }
    }

    /// Add a rendered page.
    pub fn add_page(&mut self, page: &Page) {
        let (changefreq, priority) = if page.url == "/" {
            (ChangeFreq::Daily, 1.0)
        } else {
            (ChangeFreq::Monthly, 0.8)
        };

        self.urls.push(SitemapUrl {
            loc: self.config.url_for(&page.url),
            lastmod: Some(page.date),
            changefreq,
            priority,
        });
    }

    /// Add an index page; `lastmod` is its newest entry.
    pub fn add_listing(&mut self, url: &str, lastmod: Option<DateTime<Utc>>) {
        self.urls.push(SitemapUrl {
            loc: self.config.url_for(url),
            lastmod,
            changefreq: ChangeFreq::Weekly,
            priority: 0.5,
        });
    }

    #[must_use]
    pub fn urls(&self) -> &[SitemapUrl] {
        &self.urls
    }

    /// Render the collected URLs as XML.
    #[must_use]
    pub fn generate(&self) -> String {
        debug!(count = self.urls.len(), "generating sitemap");

        let mut xml = String::from(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
        xml.push('\n');
        xml.push_str(r#"<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">"#);
        xml.push('\n');

        for url in &self.urls {
            xml.push_str(&url_to_xml(url));
        }

        xml.push_str("</urlset>\n");
        xml
    }
}

fn url_to_xml(url: &SitemapUrl) -> String {
    let mut xml = String::from("  <url>\n");
    xml.push_str(&format!("    <loc>{}</loc>\n", escape_xml(&url.loc)));

    if let Some(lastmod) = &url.lastmod {
        xml.push_str(&format!(
            "    <lastmod>{}</lastmod>\n",
            lastmod.format("%Y-%m-%d")
        ));
    }

    xml.push_str(&format!(
        "    <changefreq>{}</changefreq>\n",
        url.changefreq.as_str()
    ));
    xml.push_str(&format!("    <priority>{:.1}</priority>\n", url.priority));
    xml.push_str("  </url>\n");
    xml
}

/// Escape special XML characters.
fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn config() -> Config {
        Config {
            base_url: "https://example.com".to_string(),
            ..Config::default()
        }
    }

    fn page(url: &str) -> Page {
        Page {
            url: url.to_string(),
            date: Utc.with_ymd_and_hms(2024, 2, 3, 0, 0, 0).unwrap(),
            ..Page::default()
        }
    }

    #[test]
    fn test_generate_sitemap() {
        let config = config();
        let mut generator = SitemapGenerator::new(&config);
        generator.add_page(&page("/about/"));
        generator.add_page(&page("/posts/post-1/"));
        generator.add_listing("/posts/", None);

        let xml = generator.generate();

        assert!(xml.starts_with(r#"<?xml version="1.0""#));
        assert!(xml.contains("<loc>https://example.com/about/</loc>"));
        assert!(xml.contains("<loc>https://example.com/posts/post-1/</loc>"));
        assert!(xml.contains("<lastmod>2024-02-03</lastmod>"));
        assert!(xml.contains("<changefreq>weekly</changefreq>"));
        assert_eq!(xml.matches("<url>").count(), 3);
    }

    #[test]
    fn test_home_page_priority() {
        let config = config();
        let mut generator = SitemapGenerator::new(&config);
        generator.add_page(&page("/"));

        let url = &generator.urls()[0];
        assert_eq!(url.loc, "https://example.com/");
        assert_eq!(url.priority, 1.0);
        assert_eq!(url.changefreq, ChangeFreq::Daily);
    }

    #[test]
    fn test_escape_xml() {
        assert_eq!(escape_xml("a & b"), "a &amp; b");
        assert_eq!(escape_xml("<tag>"), "&lt;tag&gt;");
    }
}
