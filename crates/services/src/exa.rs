//! Batch page extraction through the Exa contents API.

use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use shared::collaborators::{
    CollaboratorError, CrawlLimits, CrawlPayload, CrawledPage, Crawler,
};
use std::env;
use tracing::{info, warn};

use crate::SHARED_HTTP;

const EXA_CONTENTS_URL: &str = "https://api.exa.ai/contents";
const SERVICE: &str = "exa";

#[derive(Debug, Serialize)]
struct ContentsRequest<'a> {
    urls: &'a [String],
    text: TextOptions,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TextOptions {
    max_characters: usize,
}

#[derive(Debug, Deserialize)]
struct ContentsResponse {
    #[serde(default)]
    results: Vec<ContentsResult>,
    #[serde(default)]
    statuses: Vec<ContentsStatus>,
}

#[derive(Debug, Deserialize)]
struct ContentsResult {
    #[serde(default)]
    title: Option<String>,
    url: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ContentsStatus {
    id: String,
    #[serde(default)]
    status: String,
    #[serde(default)]
    error: Option<StatusError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatusError {
    #[serde(default)]
    tag: Option<String>,
    #[serde(default)]
    http_status_code: Option<u16>,
}

impl StatusError {
    fn describe(&self) -> String {
        match (&self.tag, self.http_status_code) {
            (Some(tag), Some(code)) => format!("{} (HTTP {})", tag, code),
            (Some(tag), None) => tag.clone(),
            (None, Some(code)) => format!("HTTP {}", code),
            (None, None) => "unknown error".to_string(),
        }
    }
}

/// Turn an Exa contents response into crawl records: successful results
/// first, then one error record per failed status without a result.
pub fn pages_from_response(body: &str) -> Result<Vec<CrawledPage>, CollaboratorError> {
    let response: ContentsResponse =
        serde_json::from_str(body).map_err(|e| CollaboratorError::Malformed {
            service: SERVICE,
            message: e.to_string(),
        })?;

    let mut pages: Vec<CrawledPage> = response
        .results
        .into_iter()
        .map(|r| CrawledPage {
            title: r.title.filter(|t| !t.trim().is_empty()),
            url: r.url,
            text: r.text.unwrap_or_default(),
            error: None,
        })
        .collect();

    for status in response.statuses {
        if status.status == "success" || pages.iter().any(|p| p.url == status.id) {
            continue;
        }
        let reason = status
            .error
            .as_ref()
            .map(StatusError::describe)
            .unwrap_or_else(|| status.status.clone());
        pages.push(CrawledPage {
            title: None,
            url: status.id,
            text: String::new(),
            error: Some(format!("crawl failed: {}", reason)),
        });
    }

    Ok(pages)
}

pub struct ExaCrawler {
    http: Client,
    api_key: Option<String>,
    endpoint: String,
}

impl ExaCrawler {
    pub fn new(api_key: Option<String>) -> Self {
        let api_key = api_key
            .filter(|k| !k.trim().is_empty())
            .or_else(|| env::var("EXA_API_KEY").ok());
        Self {
            http: SHARED_HTTP.clone(),
            api_key,
            endpoint: EXA_CONTENTS_URL.to_string(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[async_trait]
impl Crawler for ExaCrawler {
    async fn crawl(&self, urls: &[String], limits: &CrawlLimits) -> Result<String> {
        if urls.is_empty() {
            return Err(CollaboratorError::NoInput { service: SERVICE }.into());
        }
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(CollaboratorError::MissingCredential {
                service: SERVICE,
                hint: "set EXA_API_KEY or crawl.exa_api_key",
            })?;

        let batch = &urls[..urls.len().min(limits.max_urls)];
        if batch.len() < urls.len() {
            warn!(requested = urls.len(), kept = batch.len(), "crawl batch truncated");
        }
        info!(count = batch.len(), "crawling urls with exa");

        let req = ContentsRequest {
            urls: batch,
            text: TextOptions {
                max_characters: limits.max_chars_per_article,
            },
        };
        let resp = self
            .http
            .post(&self.endpoint)
            .header("x-api-key", api_key)
            .json(&req)
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            return Err(CollaboratorError::Http {
                service: SERVICE,
                status: status.as_u16(),
                detail: body.chars().take(300).collect(),
            }
            .into());
        }

        let pages = pages_from_response(&body)?;
        CrawlPayload::budgeted(pages, limits).to_json()
    }
}
