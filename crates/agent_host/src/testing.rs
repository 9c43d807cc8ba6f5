//! In-memory collaborators for stage and pipeline tests.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use shared::collaborators::{
    CrawlLimits, CrawlPayload, CrawledPage, Crawler, LanguageModel, PlatformExtract,
    RedditScraper, SearchProvider, TranscriptFetcher,
};
use shared::search_types::{SearchHit, SearchResponse};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

pub fn crawl_limits() -> CrawlLimits {
    CrawlLimits {
        max_urls: 8,
        max_chars_per_article: 15_000,
        max_total_chars: 100_000,
    }
}

/// Replies from a fixed script, one per call. Records every call.
pub struct ScriptedModel {
    replies: Mutex<VecDeque<Result<String, String>>>,
    calls: Mutex<Vec<(String, String)>>,
}

impl ScriptedModel {
    pub fn replying(replies: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.iter().map(|r| Ok(r.to_string())).collect()),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(VecDeque::from([Err(message.to_string())])),
            calls: Mutex::new(Vec::new()),
        })
    }

    /// (system, user) pairs in call order.
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn invoke(&self, system: &str, user: &str) -> Result<String> {
        self.calls
            .lock()
            .unwrap()
            .push((system.to_string(), user.to_string()));
        match self.replies.lock().unwrap().pop_front() {
            Some(Ok(reply)) => Ok(reply),
            Some(Err(message)) => Err(anyhow!(message)),
            None => Err(anyhow!("model script exhausted")),
        }
    }
}

/// Returns two organic hits per query, or always fails.
pub struct FakeSearch {
    failure: Option<String>,
    queries: Mutex<Vec<String>>,
}

impl FakeSearch {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            failure: None,
            queries: Mutex::new(Vec::new()),
        })
    }

    pub fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            failure: Some(message.to_string()),
            queries: Mutex::new(Vec::new()),
        })
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl SearchProvider for FakeSearch {
    async fn search(&self, query: &str) -> Result<SearchResponse> {
        self.queries.lock().unwrap().push(query.to_string());
        if let Some(message) = &self.failure {
            return Err(anyhow!(message.clone()));
        }
        let slug: String = query
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
            .collect();
        Ok(SearchResponse {
            query: query.to_string(),
            organic: vec![
                SearchHit {
                    title: format!("{} overview", query),
                    url: format!("https://docs.example.com/{}", slug),
                    snippet: "An overview.".into(),
                },
                SearchHit {
                    title: format!("{} discussion", query),
                    url: format!("https://forum.example.org/{}", slug),
                    snippet: "A discussion.".into(),
                },
            ],
            ..SearchResponse::default()
        })
    }
}

/// Returns `text` for every requested URL, or always fails.
pub struct FakeCrawler {
    text: String,
    failure: Option<String>,
    batches: Mutex<Vec<Vec<String>>>,
}

impl FakeCrawler {
    pub fn with_text(text: &str) -> Arc<Self> {
        Arc::new(Self {
            text: text.to_string(),
            failure: None,
            batches: Mutex::new(Vec::new()),
        })
    }

    pub fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            text: String::new(),
            failure: Some(message.to_string()),
            batches: Mutex::new(Vec::new()),
        })
    }

    /// URL batches in call order.
    pub fn batches(&self) -> Vec<Vec<String>> {
        self.batches.lock().unwrap().clone()
    }
}

#[async_trait]
impl Crawler for FakeCrawler {
    async fn crawl(&self, urls: &[String], limits: &CrawlLimits) -> Result<String> {
        self.batches.lock().unwrap().push(urls.to_vec());
        if let Some(message) = &self.failure {
            return Err(anyhow!(message.clone()));
        }
        let pages = urls
            .iter()
            .take(limits.max_urls)
            .enumerate()
            .map(|(i, url)| CrawledPage {
                title: Some(format!("Article {}", i + 1)),
                url: url.clone(),
                text: self.text.clone(),
                error: None,
            })
            .collect();
        CrawlPayload::budgeted(pages, limits).to_json()
    }
}

/// Stands in for both platform scrapers: one line per URL.
pub struct FakePlatform {
    label: String,
    failure: Option<String>,
    batches: Mutex<Vec<Vec<String>>>,
}

impl FakePlatform {
    pub fn new(label: &str) -> Arc<Self> {
        Arc::new(Self {
            label: label.to_string(),
            failure: None,
            batches: Mutex::new(Vec::new()),
        })
    }

    pub fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            label: String::new(),
            failure: Some(message.to_string()),
            batches: Mutex::new(Vec::new()),
        })
    }

    pub fn batches(&self) -> Vec<Vec<String>> {
        self.batches.lock().unwrap().clone()
    }

    fn extract(&self, urls: &[String]) -> Result<PlatformExtract> {
        self.batches.lock().unwrap().push(urls.to_vec());
        if let Some(message) = &self.failure {
            return Err(anyhow!(message.clone()));
        }
        let text = urls
            .iter()
            .enumerate()
            .map(|(i, url)| format!("{} {}: {}", self.label, i + 1, url))
            .collect::<Vec<_>>()
            .join("\n");
        Ok(PlatformExtract {
            text,
            succeeded: urls.len(),
        })
    }
}

#[async_trait]
impl RedditScraper for FakePlatform {
    async fn scrape_many(&self, urls: &[String]) -> Result<PlatformExtract> {
        self.extract(urls)
    }
}

#[async_trait]
impl TranscriptFetcher for FakePlatform {
    async fn transcripts_many(&self, urls: &[String]) -> Result<PlatformExtract> {
        self.extract(urls)
    }
}
