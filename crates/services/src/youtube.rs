//! YouTube transcript retrieval via the public timedtext endpoint.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use shared::collaborators::{CollaboratorError, PlatformExtract, TranscriptFetcher};
use std::sync::LazyLock;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::{html_decode, section_divider, squash_whitespace, SHARED_HTTP};

const TIMEDTEXT_URL: &str = "https://www.youtube.com/api/timedtext";
const LANGUAGES: [&str; 3] = ["en", "en-US", "en-GB"];

static VIDEO_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?:youtube\.com/watch\?(?:[^#\s]*&)?v=|youtu\.be/|youtube\.com/embed/|youtube\.com/v/|youtube\.com/shorts/)([A-Za-z0-9_-]+)",
    )
    .expect("valid regex")
});

static CAPTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)<text[^>]*?\bstart="([0-9.]+)"[^>]*>(.*?)</text>"#).expect("valid regex")
});

pub fn extract_video_id(url: &str) -> Option<String> {
    VIDEO_ID
        .captures(url)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// `MM:SS`; minutes keep counting past an hour.
pub fn format_timestamp(seconds: f64) -> String {
    let total = seconds.max(0.0) as u64;
    format!("{:02}:{:02}", total / 60, total % 60)
}

#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptSegment {
    pub start: f64,
    pub text: String,
}

pub fn parse_timedtext(xml: &str) -> Vec<TranscriptSegment> {
    CAPTION
        .captures_iter(xml)
        .filter_map(|caps| {
            let start = caps[1].parse::<f64>().ok()?;
            // captions arrive double-escaped ("&amp;#39;")
            let text = squash_whitespace(&html_decode(&html_decode(&caps[2])));
            (!text.is_empty()).then_some(TranscriptSegment { start, text })
        })
        .collect()
}

/// Render segments as `[MM:SS] text` lines, stopping after `max_words`.
/// A segment cut mid-way ends with "...".
pub fn format_transcript(segments: &[TranscriptSegment], max_words: usize) -> String {
    let mut lines = Vec::new();
    let mut word_count = 0;

    for segment in segments {
        let words: Vec<&str> = segment.text.split_whitespace().collect();
        let timestamp = format_timestamp(segment.start);
        if word_count + words.len() > max_words {
            let remaining = max_words - word_count;
            if remaining > 0 {
                lines.push(format!("[{}] {}...", timestamp, words[..remaining].join(" ")));
            }
            break;
        }
        lines.push(format!("[{}] {}", timestamp, segment.text));
        word_count += words.len();
    }

    lines.join("\n")
}

pub struct YouTubeClient {
    http: Client,
    max_words: usize,
}

impl YouTubeClient {
    pub fn new(max_words: usize) -> Self {
        Self {
            http: SHARED_HTTP.clone(),
            max_words,
        }
    }

    async fn fetch_segments(&self, video_id: &str) -> Result<Vec<TranscriptSegment>> {
        for lang in LANGUAGES {
            let resp = self
                .http
                .get(TIMEDTEXT_URL)
                .query(&[("lang", lang), ("v", video_id)])
                .timeout(Duration::from_secs(15))
                .send()
                .await?;
            if !resp.status().is_success() {
                debug!(video_id, lang, status = %resp.status(), "no captions for language");
                continue;
            }
            let segments = parse_timedtext(&resp.text().await?);
            if !segments.is_empty() {
                return Ok(segments);
            }
        }
        Err(anyhow!("No transcript available for this video"))
    }

    pub async fn transcript(&self, url: &str) -> Result<String> {
        let video_id = extract_video_id(url)
            .ok_or_else(|| anyhow!("Could not extract video ID from the provided URL"))?;
        let segments = self.fetch_segments(&video_id).await?;
        Ok(format!(
            "YOUTUBE VIDEO: {}\nVideo ID: {}\nTranscript (first {} words):\n\n{}",
            url,
            video_id,
            self.max_words,
            format_transcript(&segments, self.max_words)
        ))
    }
}

#[async_trait]
impl TranscriptFetcher for YouTubeClient {
    async fn transcripts_many(&self, urls: &[String]) -> Result<PlatformExtract> {
        if urls.is_empty() {
            return Err(CollaboratorError::NoInput { service: "youtube" }.into());
        }
        info!(count = urls.len(), "fetching youtube transcripts");

        let mut sections = Vec::with_capacity(urls.len());
        let mut succeeded = 0;
        for url in urls {
            let body = match self.transcript(url).await {
                Ok(text) => {
                    succeeded += 1;
                    text
                }
                Err(e) => {
                    warn!(url = %url, error = %e, "transcript fetch failed");
                    format!("Error fetching transcript: {}", e)
                }
            };
            sections.push(format!("URL: {}\n\n{}", url, body));
        }

        Ok(PlatformExtract {
            text: sections.join(&section_divider()),
            succeeded,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_video_id() {
        let cases = [
            ("https://www.youtube.com/watch?v=dQw4w9WgXcQ", "dQw4w9WgXcQ"),
            ("https://youtube.com/watch?feature=share&v=dQw4w9WgXcQ&t=10", "dQw4w9WgXcQ"),
            ("https://youtu.be/dQw4w9WgXcQ?si=abc", "dQw4w9WgXcQ"),
            ("https://www.youtube.com/embed/dQw4w9WgXcQ", "dQw4w9WgXcQ"),
            ("https://www.youtube.com/shorts/abcDEF12345", "abcDEF12345"),
        ];
        for (url, id) in cases {
            assert_eq!(extract_video_id(url).as_deref(), Some(id), "{}", url);
        }
        assert_eq!(extract_video_id("https://vimeo.com/123"), None);
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(0.0), "00:00");
        assert_eq!(format_timestamp(65.7), "01:05");
        assert_eq!(format_timestamp(3725.0), "62:05");
    }

    #[test]
    fn test_parse_timedtext() {
        let xml = r#"<?xml version="1.0" encoding="utf-8" ?><transcript>
            <text start="0.5" dur="2.1">Hello &amp;amp; welcome</text>
            <text start="2.6" dur="1.0">it&amp;#39;s
            a test</text>
            <text start="4" dur="1"></text>
        </transcript>"#;
        let segments = parse_timedtext(xml);
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].text, "Hello & welcome");
        assert_eq!(segments[1].start, 2.6);
        assert_eq!(segments[1].text, "it's a test");
    }

    #[test]
    fn test_format_transcript_caps_words() {
        let segments = vec![
            TranscriptSegment { start: 0.0, text: "one two three".into() },
            TranscriptSegment { start: 61.0, text: "four five six".into() },
            TranscriptSegment { start: 122.0, text: "seven".into() },
        ];
        let text = format_transcript(&segments, 5);
        assert_eq!(text, "[00:00] one two three\n[01:01] four five...");

        let exact = format_transcript(&segments, 3);
        assert_eq!(exact, "[00:00] one two three");
    }
}
