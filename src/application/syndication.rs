//! RSS feed of the most recently approved plaques.

use std::sync::Arc;

use time::format_description::well_known::Rfc2822;

use crate::application::pagination::PageRequest;
use crate::application::repos::{PlaqueQueryFilter, PlaqueScope, PlaquesRepo, RepoError};
use crate::cache::{CacheKey, DerivedCache};

#[derive(Debug, Clone)]
pub struct FeedOptions {
    pub site_title: String,
    pub public_base_url: String,
    pub feed_size: u32,
}

impl From<&crate::config::SiteSettings> for FeedOptions {
    fn from(settings: &crate::config::SiteSettings) -> Self {
        Self {
            site_title: settings.title.clone(),
            public_base_url: settings.public_base_url.clone(),
            feed_size: settings.feed_size.get(),
        }
    }
}

#[derive(Clone)]
pub struct SyndicationService {
    plaques: Arc<dyn PlaquesRepo>,
    cache: DerivedCache,
    options: FeedOptions,
}

impl SyndicationService {
    pub fn new(plaques: Arc<dyn PlaquesRepo>, cache: DerivedCache, options: FeedOptions) -> Self {
        Self {
            plaques,
            cache,
            options,
        }
    }

    /// RSS 2.0 document, memoized until the next flush.
    pub async fn rss_feed(&self) -> Result<String, RepoError> {
        self.cache
            .get_or_compute(&CacheKey::Rss, || self.render_rss())
            .await
    }

    async fn render_rss(&self) -> Result<String, RepoError> {
        let base = normalize_public_site_url(&self.options.public_base_url);
        let page = self
            .plaques
            .list_plaques(
                PlaqueScope::Public,
                &PlaqueQueryFilter::default(),
                PageRequest::new(self.options.feed_size.max(1), None),
            )
            .await?;

        let mut items = String::new();
        for plaque in page.items {
            let pub_date = plaque
                .created_on
                .format(&Rfc2822)
                .unwrap_or_else(|_| plaque.created_on.to_string());
            let link = format!("{base}{}", plaque.title_page_url().trim_start_matches('/'));
            let image = plaque
                .img_url
                .as_deref()
                .map(|url| format!("<p><img src=\"{}\"/></p>", xml_escape(url)))
                .unwrap_or_default();
            items.push_str(&format!(
                "    <item>\n      <title>{}</title>\n      <link>{}</link>\n      <guid>{}</guid>\n      <pubDate>{}</pubDate>\n      <description><![CDATA[{}{}]]></description>\n    </item>\n",
                xml_escape(&plaque.title),
                xml_escape(&link),
                xml_escape(&link),
                pub_date,
                image,
                plaque.description.replace("]]>", "]]]]><![CDATA[>"),
            ));
        }

        Ok(format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<rss version=\"2.0\">\n  <channel>\n    <title>{}</title>\n    <link>{}</link>\n    <description>{}</description>\n{}  </channel>\n</rss>\n",
            xml_escape(&self.options.site_title),
            xml_escape(&base),
            xml_escape(&format!("Newest plaques on {}", self.options.site_title)),
            items
        ))
    }
}

fn normalize_public_site_url(url: &str) -> String {
    let trimmed = url.trim_end_matches('/');
    format!("{trimmed}/")
}

fn xml_escape(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
