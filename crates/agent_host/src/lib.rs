//! Research host: wires the language models, search, crawling and platform
//! scrapers into the four-stage research pipeline.
//!
//! A run goes Query Enhancement → Planning → Platform Scraping →
//! Summarization over one [`PipelineState`]. Every stage contains its own
//! failures, so [`ResearchHost::research`] always returns a state with a
//! report and the accumulated error log.

pub mod parsing;
pub mod pipeline;
pub mod prompts;
pub mod stages;
pub mod urls;

#[cfg(test)]
mod testing;

pub use pipeline::PipelineExecutor;

use providers::ProviderRouter;
use services::{DirectCrawler, ExaCrawler, RedditClient, SerperClient, YouTubeClient};
use shared::collaborators::{
    CrawlLimits, Crawler, LanguageModel, RedditScraper, SearchProvider, TranscriptFetcher,
};
use shared::events::StageEvent;
use shared::settings::{AppSettings, CrawlBackend, CrawlSettings};
use shared::state::PipelineState;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::info;

use stages::{Planner, PlatformScraper, QueryEnhancer, Summarizer};

/// External services the stages talk to.
#[derive(Clone)]
pub struct Collaborators {
    /// Query enhancement and URL selection
    pub research_model: Arc<dyn LanguageModel>,
    /// Final report writing
    pub report_model: Arc<dyn LanguageModel>,
    pub search: Arc<dyn SearchProvider>,
    pub crawler: Arc<dyn Crawler>,
    pub reddit: Arc<dyn RedditScraper>,
    pub youtube: Arc<dyn TranscriptFetcher>,
}

impl Collaborators {
    /// Live HTTP clients configured from settings. Missing credentials are
    /// reported when a client is first used, not here.
    pub fn from_settings(settings: &AppSettings) -> Self {
        let crawler: Arc<dyn Crawler> = match settings.crawl.backend {
            CrawlBackend::Exa => Arc::new(ExaCrawler::new(settings.crawl.exa_api_key.clone())),
            CrawlBackend::Direct => Arc::new(DirectCrawler::new()),
        };
        let research_model = ProviderRouter::new(settings.research_model.clone());
        let report_model = ProviderRouter::new(settings.report_model.clone());
        info!(
            research = research_model.active_provider().unwrap_or("none"),
            report = report_model.active_provider().unwrap_or("none"),
            crawl = ?settings.crawl.backend,
            "collaborators configured"
        );
        Self {
            research_model: Arc::new(research_model),
            report_model: Arc::new(report_model),
            search: Arc::new(SerperClient::new(&settings.search)),
            crawler,
            reddit: Arc::new(RedditClient::new(&settings.platforms)),
            youtube: Arc::new(YouTubeClient::new(settings.platforms.max_transcript_words)),
        }
    }
}

/// Per-batch crawl limits taken from the crawl settings.
pub fn crawl_limits(settings: &CrawlSettings) -> CrawlLimits {
    CrawlLimits {
        max_urls: settings.max_urls,
        max_chars_per_article: settings.max_chars_per_article,
        max_total_chars: settings.max_total_chars,
    }
}

/// Runs research queries through the full pipeline.
pub struct ResearchHost {
    executor: PipelineExecutor,
}

impl ResearchHost {
    /// Build the four stages over the given collaborators.
    pub fn new(settings: &AppSettings, collaborators: Collaborators) -> Self {
        let Collaborators {
            research_model,
            report_model,
            search,
            crawler,
            reddit,
            youtube,
        } = collaborators;

        let executor = PipelineExecutor::new(vec![
            Arc::new(QueryEnhancer::new(research_model.clone())),
            Arc::new(Planner::new(
                research_model,
                search,
                crawler,
                settings.limits.clone(),
                crawl_limits(&settings.crawl),
            )),
            Arc::new(PlatformScraper::new(reddit, youtube)),
            Arc::new(Summarizer::new(report_model, settings.limits.clone())),
        ]);
        Self { executor }
    }

    /// Build a host backed by the live HTTP clients.
    pub fn from_settings(settings: &AppSettings) -> Self {
        Self::new(settings, Collaborators::from_settings(settings))
    }

    /// Report stage progress on `sender`.
    pub fn with_events(mut self, sender: mpsc::UnboundedSender<StageEvent>) -> Self {
        self.executor = self.executor.with_events(sender);
        self
    }

    /// Stage ids in execution order.
    pub fn stage_ids(&self) -> Vec<&'static str> {
        self.executor.stage_ids()
    }

    /// Run one query through every stage. Always returns a state with a report.
    pub async fn research(&self, query: &str) -> PipelineState {
        info!(query = %query, "research started");
        self.executor.run(PipelineState::new(query.trim())).await
    }
}
