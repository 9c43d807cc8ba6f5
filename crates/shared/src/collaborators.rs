//! Interfaces to the external services the pipeline depends on.
//!
//! Stages only see these traits; concrete clients live in the `providers`
//! and `services` crates, and tests substitute in-memory fakes.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::budget::ContentBudget;
use crate::search_types::SearchResponse;

/// A language model call site: system instructions plus user content in,
/// final text out.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn invoke(&self, system: &str, user: &str) -> anyhow::Result<String>;
}

#[async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search(&self, query: &str) -> anyhow::Result<SearchResponse>;
}

/// Limits handed to a crawler for one batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrawlLimits {
    pub max_urls: usize,
    pub max_chars_per_article: usize,
    pub max_total_chars: usize,
}

impl CrawlLimits {
    pub fn budget(&self) -> ContentBudget {
        ContentBudget::new(self.max_chars_per_article, self.max_total_chars)
    }
}

#[async_trait]
pub trait Crawler: Send + Sync {
    /// Fetch all `urls` in one batch. Returns a JSON-encoded [`CrawlPayload`].
    async fn crawl(&self, urls: &[String], limits: &CrawlLimits) -> anyhow::Result<String>;
}

/// Formatted text for a batch of platform URLs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlatformExtract {
    pub text: String,
    /// How many of the requested URLs produced content.
    pub succeeded: usize,
}

#[async_trait]
pub trait RedditScraper: Send + Sync {
    async fn scrape_many(&self, urls: &[String]) -> anyhow::Result<PlatformExtract>;
}

#[async_trait]
pub trait TranscriptFetcher: Send + Sync {
    async fn transcripts_many(&self, urls: &[String]) -> anyhow::Result<PlatformExtract>;
}

/// One crawled page on the wire.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CrawledPage {
    #[serde(default)]
    pub title: Option<String>,
    pub url: String,
    #[serde(default)]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Crawl collaborator response body: `{"articles": [...]}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CrawlPayload {
    #[serde(default)]
    pub articles: Vec<CrawledPage>,
}

impl CrawlPayload {
    /// Apply the crawl budget to already-fetched pages. Pages pushed out by
    /// the total budget stay in the payload with an error so the gap is
    /// visible downstream.
    pub fn budgeted(pages: Vec<CrawledPage>, limits: &CrawlLimits) -> Self {
        let texts: Vec<&str> = pages
            .iter()
            .filter(|p| p.error.is_none())
            .map(|p| p.text.as_str())
            .collect();
        let mut fitted = limits.budget().fit(&texts).kept.into_iter();

        let articles = pages
            .into_iter()
            .map(|mut page| {
                if page.error.is_some() {
                    return page;
                }
                match fitted.next() {
                    Some(text) => page.text = text,
                    None => {
                        page.text = String::new();
                        page.error =
                            Some("dropped to stay within the crawl content budget".into());
                    }
                }
                page
            })
            .collect();
        Self { articles }
    }

    pub fn to_json(&self) -> anyhow::Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Failures raised by the concrete collaborator clients.
#[derive(Debug, thiserror::Error)]
pub enum CollaboratorError {
    #[error("{service} is not configured: {hint}")]
    MissingCredential {
        service: &'static str,
        hint: &'static str,
    },

    #[error("{service} returned HTTP {status}: {detail}")]
    Http {
        service: &'static str,
        status: u16,
        detail: String,
    },

    #[error("{service} response could not be parsed: {message}")]
    Malformed {
        service: &'static str,
        message: String,
    },

    #[error("{service} was called without any URLs")]
    NoInput { service: &'static str },
}
