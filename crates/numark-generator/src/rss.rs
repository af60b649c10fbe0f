//! RSS feed generation.

use std::sync::Arc;

use chrono::Utc;
use numark_core::{Config, Page};
use rss::{Channel, ChannelBuilder, GuidBuilder, Item, ItemBuilder};
use tracing::debug;

/// Maximum number of items in the feed.
pub const RSS_LIMIT: usize = 20;

/// Builds `rss.xml` from the site's dated content.
#[derive(Debug)]
pub struct RssGenerator<'a> {
    config: &'a Config,
    limit: usize,
}

impl<'a> RssGenerator<'a> {
    #[must_use]
    pub fn new(config: &'a Config) -> Self {
        Self {
            config,
            limit: RSS_LIMIT,
        }
    }

    #[must_use]
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Generate the feed XML. Pages are taken newest first.
    pub fn generate(&self, pages: &[Arc<Page>]) -> String {
        self.channel(pages).to_string()
    }

    fn channel(&self, pages: &[Arc<Page>]) -> Channel {
        let mut sorted: Vec<&Page> = pages.iter().map(AsRef::as_ref).collect();
        sorted.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| a.id.cmp(&b.id)));

        let items: Vec<Item> = sorted
            .into_iter()
            .take(self.limit)
            .map(|page| self.page_to_item(page))
            .collect();

        debug!(count = items.len(), "generating RSS feed");

        ChannelBuilder::default()
            .title(self.config.title.clone())
            .link(self.config.base_url.clone())
            .description(self.config.description.clone())
            .language(Some(self.config.language.clone()))
            .last_build_date(Some(Utc::now().to_rfc2822()))
            .generator(Some("NuMark".to_string()))
            .items(items)
            .build()
    }

    fn page_to_item(&self, page: &Page) -> Item {
        let link = self.config.url_for(&page.url);

        let guid = GuidBuilder::default()
            .value(link.clone())
            .permalink(true)
            .build();

        let categories: Vec<rss::Category> = page
            .tags
            .iter()
            .chain(&page.categories)
            .map(|name| rss::Category {
                name: name.clone(),
                domain: None,
            })
            .collect();

        let description = Some(page.description().to_string()).filter(|d| !d.is_empty());
        let author = page
            .author()
            .map(str::to_string)
            .or_else(|| Some(self.config.author.clone()).filter(|a| !a.is_empty()));

        ItemBuilder::default()
            .title(Some(page.title.clone()))
            .link(Some(link))
            .guid(Some(guid))
            .pub_date(Some(page.date.to_rfc2822()))
            .description(description)
            .author(author)
            .categories(categories)
            .build()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;

    fn config() -> Config {
        Config {
            title: "Test Blog".to_string(),
            base_url: "https://example.com".to_string(),
            description: "A test blog".to_string(),
            author: "Site Author".to_string(),
            ..Config::default()
        }
    }

    fn page(slug: &str, days: i64) -> Arc<Page> {
        let date = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::days(days);
        Arc::new(Page {
            id: format!("posts/{slug}"),
            slug: slug.to_string(),
            url: format!("/posts/{slug}/"),
            title: slug.to_string(),
            excerpt: format!("About {slug}"),
            date,
            tags: vec!["rust".to_string()],
            collection: "posts".to_string(),
            ..Page::default()
        })
    }

    #[test]
    fn test_generate_rss() {
        let config = config();
        let xml = RssGenerator::new(&config).generate(&[page("first", 0), page("second", 1)]);

        assert!(xml.contains("<title>Test Blog</title>"));
        assert!(xml.contains("<link>https://example.com</link>"));
        assert!(xml.contains("https://example.com/posts/first/"));
        assert!(xml.contains("<category>rust</category>"));
        assert!(xml.contains("<author>Site Author</author>"));
        assert!(xml.find("second").unwrap() < xml.find("first").unwrap());
    }

    #[test]
    fn test_rss_limit() {
        let config = config();
        let xml = RssGenerator::new(&config)
            .with_limit(1)
            .generate(&[page("older", 0), page("newer", 5)]);

        assert!(xml.contains("newer"));
        assert!(!xml.contains("older"));
    }
}
