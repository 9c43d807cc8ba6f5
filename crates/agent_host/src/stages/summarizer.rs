//! Report writing: numbered sources, budgeted article text, and a
//! guaranteed `## Sources` section.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use regex::Regex;
use shared::budget::{char_len, truncate_chars, ContentBudget};
use shared::collaborators::LanguageModel;
use shared::settings::PipelineLimits;
use shared::stage::Stage;
use shared::state::{Article, PipelineState};
use std::sync::{Arc, LazyLock};
use tracing::{info, warn};
use url::Url;

use crate::prompts::{summarizer_user_message, SUMMARIZER_PROMPT};

const BLOCK_SEPARATOR: &str = "\n\n---\n\n";

static SOURCES_HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*#{1,3}\s*sources\s*:?\s*$").expect("valid regex"));

static ANY_HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*#{1,6}\s").expect("valid regex"));

/// One citable source; its position in the list is its citation number.
#[derive(Debug, Clone, PartialEq)]
pub struct Source {
    pub title: String,
    pub url: String,
}

/// Valid articles first, then Reddit threads, then YouTube videos.
pub fn build_sources(articles: &[&Article], reddit: &[String], youtube: &[String]) -> Vec<Source> {
    let articles = articles.iter().map(|a| Source {
        title: a.display_title().to_string(),
        url: a.url.clone(),
    });
    let reddit = reddit.iter().map(|url| Source {
        title: "Reddit Discussion".to_string(),
        url: url.clone(),
    });
    let youtube = youtube.iter().map(|url| Source {
        title: "YouTube Video".to_string(),
        url: url.clone(),
    });
    articles.chain(reddit).chain(youtube).collect()
}

/// The numbered list handed to the model.
pub fn render_source_list(sources: &[Source]) -> String {
    sources
        .iter()
        .enumerate()
        .map(|(i, s)| format!("{}. {} — {}", i + 1, s.title, s.url))
        .collect::<Vec<_>>()
        .join("\n")
}

fn is_well_formed(url: &str) -> bool {
    Url::parse(url)
        .map(|u| matches!(u.scheme(), "http" | "https") && u.host_str().is_some())
        .unwrap_or(false)
        && !url.contains(char::is_whitespace)
}

fn markdown_link(title: &str, url: &str) -> String {
    let title = title.replace('[', "\\[").replace(']', "\\]");
    let target = url.replace('(', "%28").replace(')', "%29");
    format!("[{}]({})", title, target)
}

/// The `## Sources` section appended to a report, with markdown links.
pub fn render_sources_section(sources: &[Source]) -> String {
    let mut out = String::from("## Sources\n");
    for (i, source) in sources.iter().enumerate() {
        let line = if is_well_formed(&source.url) {
            markdown_link(&source.title, &source.url)
        } else {
            format!("{} — {}", source.title, source.url)
        };
        out.push_str(&format!("\n{}. {}", i + 1, line));
    }
    out
}

/// True when the report's last heading is a Sources heading.
pub fn has_sources_heading(report: &str) -> bool {
    report
        .lines()
        .rev()
        .find(|line| ANY_HEADING.is_match(line))
        .is_some_and(|line| SOURCES_HEADING.is_match(line))
}

/// Capped article blocks joined into one payload. When the whole set is
/// over the total ceiling, only the first half of the articles is kept.
/// Returns the text and how many articles it covers.
pub fn assemble_articles(articles: &[&Article], limits: &PipelineLimits) -> (String, usize) {
    let per_article = ContentBudget::new(limits.report_article_chars, limits.report_total_chars);
    let blocks: Vec<String> = articles
        .iter()
        .enumerate()
        .map(|(i, a)| {
            format!(
                "ARTICLE {}: {}\nURL: {}\n\n{}",
                i + 1,
                a.display_title(),
                a.url,
                per_article.cap(a.text.trim())
            )
        })
        .collect();

    let joined_len = |blocks: &[String]| -> usize {
        blocks.iter().map(|b| char_len(b)).sum::<usize>()
            + char_len(BLOCK_SEPARATOR) * blocks.len().saturating_sub(1)
    };

    let mut used = blocks.len();
    if joined_len(&blocks) > limits.report_total_chars {
        used = (blocks.len() / 2).max(1);
        warn!(
            articles = blocks.len(),
            kept = used,
            "article text over budget; keeping the first half"
        );
    }

    let fitted = ContentBudget::new(limits.report_total_chars, limits.report_total_chars)
        .fit(&blocks[..used]);
    let used = fitted.kept.len();
    (fitted.kept.join(BLOCK_SEPARATOR), used)
}

/// Report written when no article has usable content. No model call is made.
pub fn no_content_report(user_input: &str, articles: &[Article], errors: &[String]) -> String {
    let mut out = format!(
        "# Research Report: {}\n\n## Error\n\nNo usable article content was retrieved, so a research report could not be written for this query.\n",
        user_input
    );

    out.push_str("\n### Article errors\n\n");
    if articles.is_empty() {
        out.push_str("- No articles were crawled.\n");
    }
    for article in articles {
        let reason = match article.error.as_deref().map(str::trim) {
            Some(error) if !error.is_empty() => error.to_string(),
            _ if article.text.trim().is_empty() => "no readable text".to_string(),
            _ => format!(
                "text too short to use ({} characters)",
                char_len(article.text.trim())
            ),
        };
        out.push_str(&format!("- {}: {}\n", article.url, reason));
    }

    if !errors.is_empty() {
        out.push_str("\n### Pipeline errors\n\n");
        for error in errors {
            out.push_str(&format!("- {}\n", error));
        }
    }
    out
}

/// Report written when the report model call fails.
pub fn failure_report(user_input: &str, error: &str) -> String {
    format!(
        "# Research Report: {}\n\n## Error\n\nThe report could not be generated: {}\n\nOriginal query: {}\n",
        user_input, error, user_input
    )
}

pub struct Summarizer {
    model: Arc<dyn LanguageModel>,
    limits: PipelineLimits,
}

impl Summarizer {
    /// Create a summarizer that writes reports with `model` under `limits`.
    pub fn new(model: Arc<dyn LanguageModel>, limits: PipelineLimits) -> Self {
        Self { model, limits }
    }

    async fn write_report(&self, state: &PipelineState, valid: &[&Article]) -> Result<String> {
        let sources = build_sources(valid, &state.reddit_posts, &state.youtube_urls);
        let (article_text, used) = assemble_articles(valid, &self.limits);
        let platform_excerpt = truncate_chars(
            state.platform_content.trim(),
            self.limits.platform_content_chars,
        );
        info!(
            sources = sources.len(),
            articles = used,
            chars = char_len(&article_text),
            "writing report"
        );

        let user_message = summarizer_user_message(
            state.user_input(),
            &render_source_list(&sources),
            &article_text,
            &platform_excerpt,
        );
        let report = self
            .model
            .invoke(SUMMARIZER_PROMPT, &user_message)
            .await
            .context("report model call failed")?;
        let report = report.trim();
        if report.is_empty() {
            bail!("report model returned an empty reply");
        }

        if has_sources_heading(report) {
            Ok(report.to_string())
        } else {
            Ok(format!("{}\n\n{}\n", report, render_sources_section(&sources)))
        }
    }
}

#[async_trait]
impl Stage for Summarizer {
    fn id(&self) -> &'static str {
        "summarizer"
    }

    fn name(&self) -> &'static str {
        "Summarization"
    }

    async fn run(&self, state: PipelineState) -> PipelineState {
        let valid: Vec<&Article> = state
            .articles
            .iter()
            .filter(|a| a.is_meaningful(self.limits.min_article_chars))
            .collect();

        if valid.is_empty() {
            warn!(articles = state.articles.len(), "no valid articles; writing error report");
            let report = no_content_report(state.user_input(), &state.articles, state.errors());
            return state
                .with_report(report)
                .with_error("Summarization skipped: no valid articles to summarize")
                .with_step(format!("{} (no content)", self.name()));
        }

        let result = self.write_report(&state, &valid).await;
        match result {
            Ok(report) => {
                info!(chars = char_len(&report), "report written");
                state.with_report(report).with_step(self.name())
            }
            Err(e) => {
                warn!(error = %e, "report generation failed");
                let message = format!("{:#}", e);
                let report = failure_report(state.user_input(), &message);
                state
                    .with_report(report)
                    .with_error(format!("Summarization failed: {}", message))
                    .with_step(format!("{} (failed)", self.name()))
            }
        }
    }
}
