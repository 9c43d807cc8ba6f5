//! Reddit thread extraction through the public `.json` listing endpoint.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use shared::collaborators::{CollaboratorError, PlatformExtract, RedditScraper};
use shared::settings::PlatformSettings;
use std::time::Duration;
use tracing::{info, warn};

use crate::{section_divider, SHARED_HTTP};

const SERVICE: &str = "reddit";

#[derive(Debug, Clone, PartialEq)]
pub struct RedditComment {
    pub author: String,
    pub score: i64,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RedditPost {
    pub title: String,
    pub subreddit: String,
    pub author: String,
    pub score: i64,
    pub num_comments: u64,
    pub selftext: String,
    pub comments: Vec<RedditComment>,
}

impl RedditPost {
    pub fn format(&self, url: &str) -> String {
        let content = if self.selftext.trim().is_empty() {
            "No content"
        } else {
            self.selftext.trim()
        };
        let mut out = format!(
            "REDDIT POST: {}\nPost Link: {}\nSubreddit: r/{}\nAuthor: u/{}\nScore: {} | Comments: {}\n\nContent: {}\n\n",
            self.title, url, self.subreddit, self.author, self.score, self.num_comments, content
        );

        if self.comments.is_empty() {
            out.push_str("No comments found.");
        } else {
            out.push_str("TOP COMMENTS:\n\n");
            let comments: Vec<String> = self
                .comments
                .iter()
                .map(|c| format!("Author: {} | Score: {}\n{}", c.author, c.score, c.body))
                .collect();
            out.push_str(&comments.join("\n\n---\n\n"));
        }
        out
    }
}

/// Build the listing endpoint for a thread URL: query and fragment dropped,
/// `.json` appended.
pub fn json_endpoint(url: &str) -> String {
    let base = url.split(['?', '#']).next().unwrap_or(url);
    if base.ends_with(".json") {
        return base.to_string();
    }
    format!("{}.json", base.trim_end_matches('/'))
}

fn str_field(data: &Value, key: &str, fallback: &str) -> String {
    data.get(key)
        .and_then(Value::as_str)
        .unwrap_or(fallback)
        .to_string()
}

/// Parse a thread listing (`[post_listing, comment_listing]`), keeping the
/// `max_comments` highest-scored top-level comments.
pub fn parse_listing(listing: &Value, max_comments: usize) -> Result<RedditPost, CollaboratorError> {
    let post = listing
        .get(0)
        .and_then(|l| l.pointer("/data/children/0/data"))
        .ok_or_else(|| CollaboratorError::Malformed {
            service: SERVICE,
            message: "listing has no post data".into(),
        })?;

    let mut comments: Vec<RedditComment> = listing
        .get(1)
        .and_then(|l| l.pointer("/data/children"))
        .and_then(Value::as_array)
        .map(|children| {
            children
                .iter()
                .filter_map(|child| child.get("data"))
                .filter_map(|data| {
                    let body = data.get("body")?.as_str()?;
                    Some(RedditComment {
                        author: str_field(data, "author", "Anonymous"),
                        score: data.get("score").and_then(Value::as_i64).unwrap_or(0),
                        body: body.to_string(),
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    // stable sort keeps thread order among equal scores
    comments.sort_by(|a, b| b.score.cmp(&a.score));
    comments.truncate(max_comments);

    Ok(RedditPost {
        title: str_field(post, "title", "No title"),
        subreddit: str_field(post, "subreddit", "unknown"),
        author: str_field(post, "author", "Anonymous"),
        score: post.get("score").and_then(Value::as_i64).unwrap_or(0),
        num_comments: post.get("num_comments").and_then(Value::as_u64).unwrap_or(0),
        selftext: str_field(post, "selftext", ""),
        comments,
    })
}

pub struct RedditClient {
    http: Client,
    user_agent: String,
    max_comments: usize,
}

impl RedditClient {
    pub fn new(settings: &PlatformSettings) -> Self {
        Self {
            http: SHARED_HTTP.clone(),
            user_agent: settings.reddit_user_agent.clone(),
            max_comments: settings.max_reddit_comments,
        }
    }

    pub async fn fetch_post(&self, url: &str) -> Result<RedditPost> {
        let endpoint = json_endpoint(url);
        let resp = self
            .http
            .get(&endpoint)
            .header(reqwest::header::USER_AGENT, &self.user_agent)
            .timeout(Duration::from_secs(10))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(CollaboratorError::Http {
                service: SERVICE,
                status: status.as_u16(),
                detail: endpoint,
            }
            .into());
        }

        let listing: Value = resp.json().await?;
        Ok(parse_listing(&listing, self.max_comments)?)
    }
}

#[async_trait]
impl RedditScraper for RedditClient {
    async fn scrape_many(&self, urls: &[String]) -> Result<PlatformExtract> {
        if urls.is_empty() {
            return Err(anyhow!(CollaboratorError::NoInput { service: SERVICE }));
        }
        info!(count = urls.len(), "scraping reddit threads");

        let mut sections = Vec::with_capacity(urls.len());
        let mut succeeded = 0;
        for (i, url) in urls.iter().enumerate() {
            let body = match self.fetch_post(url).await {
                Ok(post) => {
                    succeeded += 1;
                    post.format(url)
                }
                Err(e) => {
                    warn!(url = %url, error = %e, "reddit fetch failed");
                    format!("Error fetching Reddit post: {}", e)
                }
            };
            sections.push(format!("POST {}: {}\n{}", i + 1, url, body));
        }

        info!(succeeded, total = urls.len(), "reddit scraping complete");
        Ok(PlatformExtract {
            text: sections.join(&section_divider()),
            succeeded,
        })
    }
}
