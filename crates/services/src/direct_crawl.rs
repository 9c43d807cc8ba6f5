//! Keyless crawler: fetches each page over plain HTTP and converts the HTML
//! to text.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use html2text::from_read;
use regex::Regex;
use reqwest::Client;
use shared::collaborators::{
    CollaboratorError, CrawlLimits, CrawlPayload, CrawledPage, Crawler,
};
use std::sync::LazyLock;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::{html_decode, squash_whitespace, SHARED_HTTP};

const USER_AGENT: &str = "Mozilla/5.0 (compatible; DeepResearch/0.1)";
const TEXT_WIDTH: usize = 100;

static TITLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<title[^>]*>(.*?)</title>").expect("valid regex"));
static OG_TITLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<meta[^>]*property=["']og:title["'][^>]*content=["']([^"']+)["']"#)
        .expect("valid regex")
});

/// Page title, preferring Open Graph metadata over `<title>`.
pub fn extract_title(html: &str) -> Option<String> {
    OG_TITLE
        .captures(html)
        .or_else(|| TITLE.captures(html))
        .and_then(|c| c.get(1))
        .map(|m| squash_whitespace(&html_decode(m.as_str())))
        .filter(|t| !t.is_empty())
}

pub fn html_to_text(html: &str) -> String {
    from_read(html.as_bytes(), TEXT_WIDTH).trim().to_string()
}

pub struct DirectCrawler {
    http: Client,
}

impl DirectCrawler {
    pub fn new() -> Self {
        Self {
            http: SHARED_HTTP.clone(),
        }
    }

    async fn fetch_page(&self, url: &str) -> Result<CrawledPage> {
        let response = self
            .http
            .get(url)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .timeout(Duration::from_secs(20))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(anyhow!("page fetch failed with {}", response.status()));
        }
        let html = response.text().await?;
        let text = html_to_text(&html);
        if text.is_empty() {
            return Err(anyhow!("page did not return readable content"));
        }
        Ok(CrawledPage {
            title: extract_title(&html),
            url: url.to_string(),
            text,
            error: None,
        })
    }
}

impl Default for DirectCrawler {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Crawler for DirectCrawler {
    async fn crawl(&self, urls: &[String], limits: &CrawlLimits) -> Result<String> {
        if urls.is_empty() {
            return Err(CollaboratorError::NoInput { service: "direct crawl" }.into());
        }
        let batch = &urls[..urls.len().min(limits.max_urls)];
        info!(count = batch.len(), "crawling urls directly");

        let mut pages = Vec::with_capacity(batch.len());
        for url in batch {
            match self.fetch_page(url).await {
                Ok(page) => {
                    debug!(url = %url, chars = page.text.chars().count(), "page fetched");
                    pages.push(page);
                }
                Err(e) => {
                    warn!(url = %url, error = %e, "page fetch failed");
                    pages.push(CrawledPage {
                        title: None,
                        url: url.clone(),
                        text: String::new(),
                        error: Some(e.to_string()),
                    });
                }
            }
        }

        CrawlPayload::budgeted(pages, limits).to_json()
    }
}
