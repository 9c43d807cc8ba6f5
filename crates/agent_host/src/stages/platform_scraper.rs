use anyhow::Result;
use async_trait::async_trait;
use shared::collaborators::{PlatformExtract, RedditScraper, TranscriptFetcher};
use shared::stage::Stage;
use shared::state::{PipelineState, PlatformDigest};
use std::sync::Arc;
use tracing::{info, warn};

pub const REDDIT_HEADING: &str = "## REDDIT DISCUSSIONS";
pub const YOUTUBE_HEADING: &str = "## YOUTUBE TRANSCRIPTS";

/// Fetches Reddit threads and YouTube transcripts found during planning.
/// Each platform is one batched call, and a failure on one does not
/// affect the other.
pub struct PlatformScraper {
    reddit: Arc<dyn RedditScraper>,
    youtube: Arc<dyn TranscriptFetcher>,
}

struct PlatformSection {
    label: &'static str,
    text: String,
    attempted: usize,
    succeeded: usize,
    error: Option<String>,
}

impl PlatformSection {
    fn build(
        label: &'static str,
        heading: &str,
        urls: &[String],
        result: Option<Result<PlatformExtract>>,
    ) -> Self {
        let attempted = urls.len();
        match result {
            None => Self {
                label,
                text: format!("{}\n\nNo {} URLs were found for this query.", heading, label),
                attempted,
                succeeded: 0,
                error: None,
            },
            Some(Ok(extract)) => {
                let body = extract.text.trim();
                let text = if body.is_empty() {
                    format!("{}\n\nNo {} content could be extracted.", heading, label)
                } else {
                    format!("{}\n\n{}", heading, body)
                };
                Self {
                    label,
                    text,
                    attempted,
                    succeeded: extract.succeeded.min(attempted),
                    error: None,
                }
            }
            Some(Err(e)) => Self {
                label,
                text: format!(
                    "{}\n\nError extracting {} content from {} URL(s): {:#}",
                    heading, label, attempted, e
                ),
                attempted,
                succeeded: 0,
                error: Some(format!("{} scraping failed: {:#}", label, e)),
            },
        }
    }

    fn stats(&self) -> String {
        format!(
            "{}: {} attempted, {} succeeded",
            self.label, self.attempted, self.succeeded
        )
    }
}

impl PlatformScraper {
    /// Create a scraper over the two platform collaborators.
    pub fn new(reddit: Arc<dyn RedditScraper>, youtube: Arc<dyn TranscriptFetcher>) -> Self {
        Self { reddit, youtube }
    }

    async fn reddit_section(&self, urls: &[String]) -> PlatformSection {
        let result = if urls.is_empty() {
            None
        } else {
            info!(count = urls.len(), "scraping reddit");
            Some(self.reddit.scrape_many(urls).await)
        };
        PlatformSection::build("Reddit", REDDIT_HEADING, urls, result)
    }

    async fn youtube_section(&self, urls: &[String]) -> PlatformSection {
        let result = if urls.is_empty() {
            None
        } else {
            info!(count = urls.len(), "fetching youtube transcripts");
            Some(self.youtube.transcripts_many(urls).await)
        };
        PlatformSection::build("YouTube", YOUTUBE_HEADING, urls, result)
    }
}

#[async_trait]
impl Stage for PlatformScraper {
    fn id(&self) -> &'static str {
        "platform_scraper"
    }

    fn name(&self) -> &'static str {
        "Platform Scraping"
    }

    async fn run(&self, state: PipelineState) -> PipelineState {
        let sections = [
            self.reddit_section(&state.reddit_posts).await,
            self.youtube_section(&state.youtube_urls).await,
        ];

        let divider = format!("\n\n{}\n\n", "=".repeat(80));
        let content = sections
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join(&divider);
        let summary = sections
            .iter()
            .map(PlatformSection::stats)
            .collect::<Vec<_>>()
            .join(" | ");
        info!(summary = %summary, "platform scraping complete");

        let mut next = state
            .with_platform(PlatformDigest { content, summary })
            .with_step(self.name());
        for section in sections {
            if let Some(error) = section.error {
                warn!(platform = section.label, error = %error, "platform extraction failed");
                next = next.with_error(error);
            }
        }
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakePlatform;

    fn state_with(reddit: &[&str], youtube: &[&str]) -> PipelineState {
        let mut state = PipelineState::new("query");
        state.reddit_posts = reddit.iter().map(|s| s.to_string()).collect();
        state.youtube_urls = youtube.iter().map(|s| s.to_string()).collect();
        state
    }

    #[tokio::test]
    async fn test_both_platforms_scraped_in_one_batch_each() {
        let reddit = FakePlatform::new("REDDIT POST");
        let youtube = FakePlatform::new("YOUTUBE VIDEO");
        let stage = PlatformScraper::new(reddit.clone(), youtube.clone());

        let state = stage
            .run(state_with(
                &[
                    "https://www.reddit.com/r/rust/comments/a/one/",
                    "https://www.reddit.com/r/golang/comments/b/two/",
                ],
                &["https://youtu.be/dQw4w9WgXcQ"],
            ))
            .await;

        assert_eq!(reddit.batches().len(), 1);
        assert_eq!(reddit.batches()[0].len(), 2);
        assert_eq!(youtube.batches().len(), 1);

        assert!(state.platform_content.contains("## REDDIT DISCUSSIONS\n\nREDDIT POST"));
        assert!(state.platform_content.contains("## YOUTUBE TRANSCRIPTS\n\nYOUTUBE VIDEO"));
        assert_eq!(
            state.platform_summary,
            "Reddit: 2 attempted, 2 succeeded | YouTube: 1 attempted, 1 succeeded"
        );
        assert!(state.errors().is_empty());
    }

    #[tokio::test]
    async fn test_missing_inputs_produce_no_content_sections() {
        let reddit = FakePlatform::new("unused");
        let stage = PlatformScraper::new(reddit.clone(), FakePlatform::new("unused"));

        let state = stage.run(state_with(&[], &[])).await;
        assert!(reddit.batches().is_empty());
        assert!(state
            .platform_content
            .contains("## REDDIT DISCUSSIONS\n\nNo Reddit URLs were found"));
        assert!(state
            .platform_content
            .contains("## YOUTUBE TRANSCRIPTS\n\nNo YouTube URLs were found"));
        assert_eq!(
            state.platform_summary,
            "Reddit: 0 attempted, 0 succeeded | YouTube: 0 attempted, 0 succeeded"
        );
    }

    #[tokio::test]
    async fn test_one_platform_failing_does_not_block_the_other() {
        let stage = PlatformScraper::new(
            FakePlatform::failing("HTTP 429"),
            FakePlatform::new("YOUTUBE VIDEO"),
        );
        let state = stage
            .run(state_with(
                &["https://www.reddit.com/r/rust/comments/a/one/"],
                &["https://youtu.be/dQw4w9WgXcQ"],
            ))
            .await;

        assert!(state
            .platform_content
            .contains("## REDDIT DISCUSSIONS\n\nError extracting Reddit content from 1 URL(s): HTTP 429"));
        assert!(state.platform_content.contains("YOUTUBE VIDEO"));
        assert_eq!(
            state.platform_summary,
            "Reddit: 1 attempted, 0 succeeded | YouTube: 1 attempted, 1 succeeded"
        );
        assert_eq!(state.errors(), &["Reddit scraping failed: HTTP 429".to_string()]);
    }
}
