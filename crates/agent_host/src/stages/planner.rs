//! Planning: model-directed search, URL selection, and a single batch crawl.

use anyhow::{Context, Result};
use async_trait::async_trait;
use shared::budget::char_len;
use shared::collaborators::{CrawlLimits, CrawlPayload, Crawler, LanguageModel, SearchProvider};
use shared::settings::PipelineLimits;
use shared::stage::Stage;
use shared::state::{Article, PipelineState, Plan};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::parsing::{extract_search_requests, parse_url_selection, ParseError};
use crate::prompts::{planner_final_request, planner_turn, planner_user_message, PLANNER_PROMPT};
use crate::urls::{classify, normalize, select_diverse};

/// URLs chosen for crawling and platform scraping.
#[derive(Debug, Clone, Default, PartialEq)]
struct Selection {
    selected_urls: Vec<String>,
    reddit_posts: Vec<String>,
    youtube_urls: Vec<String>,
    reasoning: String,
}

/// Searches, selects URLs, and crawls them in one batch.
pub struct Planner {
    model: Arc<dyn LanguageModel>,
    search: Arc<dyn SearchProvider>,
    crawler: Arc<dyn Crawler>,
    limits: PipelineLimits,
    crawl_limits: CrawlLimits,
}

impl Planner {
    /// Create a planner that searches with `search` and crawls the selection with `crawler`.
    pub fn new(
        model: Arc<dyn LanguageModel>,
        search: Arc<dyn SearchProvider>,
        crawler: Arc<dyn Crawler>,
        limits: PipelineLimits,
        crawl_limits: CrawlLimits,
    ) -> Self {
        Self {
            model,
            search,
            crawler,
            limits,
            crawl_limits,
        }
    }

    /// Let the model search one query per turn until it answers without a
    /// search request. Returns that final reply.
    async fn search_loop(&self, user_input: &str, questions: &[String]) -> Result<String> {
        let mut transcript = planner_user_message(user_input, questions);

        for turn in 0..self.limits.max_planner_turns {
            let reply = self
                .model
                .invoke(PLANNER_PROMPT, &transcript)
                .await
                .context("planner model call failed")?;

            let requests = extract_search_requests(&reply);
            let Some(query) = requests.first() else {
                debug!(turn, "planner finished searching");
                return Ok(reply);
            };
            if requests.len() > 1 {
                debug!(requested = requests.len(), "running only the first search this turn");
            }

            info!(turn, query = %query, "planner search");
            let results = self
                .search
                .search(query)
                .await
                .with_context(|| format!("search for \"{}\" failed", query))?;
            transcript = planner_turn(&transcript, query, &results);
        }

        warn!(turns = self.limits.max_planner_turns, "planner turn limit reached");
        self.model
            .invoke(PLANNER_PROMPT, &planner_final_request(&transcript))
            .await
            .context("planner model call failed")
    }

    async fn select(&self, user_input: &str, questions: &[String]) -> Result<Selection> {
        let reply = self.search_loop(user_input, questions).await?;
        let parsed = parse_url_selection(&reply);
        if parsed.from_fallback {
            warn!(
                found = parsed.selected_urls.len(),
                "planner reply had no JSON selection; using URLs found in the text"
            );
        }

        let classified = classify(
            &parsed.selected_urls,
            &parsed.reddit_urls,
            &parsed.youtube_urls,
            &reply,
        );
        let selected_urls = select_diverse(
            &classified.general,
            self.limits.max_selected_urls,
            self.limits.max_per_domain,
        );
        info!(
            candidates = classified.general.len(),
            selected = selected_urls.len(),
            reddit = classified.reddit.len(),
            youtube = classified.youtube.len(),
            "urls selected"
        );

        Ok(Selection {
            selected_urls,
            reddit_posts: classified.reddit,
            youtube_urls: classified.youtube,
            reasoning: parsed.reasoning,
        })
    }

    async fn fetch(&self, urls: &[String]) -> Result<Vec<Article>> {
        let raw = self
            .crawler
            .crawl(urls, &self.crawl_limits)
            .await
            .context("crawl failed")?;
        let payload: CrawlPayload = serde_json::from_str(&raw)
            .map_err(|e| ParseError::InvalidJson(e.to_string()))
            .context("crawl returned an unreadable payload")?;
        Ok(articles_from_payload(
            payload,
            urls,
            self.limits.min_article_chars,
        ))
    }
}

fn url_key(url: &str) -> String {
    normalize(url.trim()).trim_end_matches('/').to_string()
}

/// Map crawl records to articles. Records with too little text are kept
/// with an error; requested URLs absent from the payload get a failed entry.
pub fn articles_from_payload(
    payload: CrawlPayload,
    requested: &[String],
    min_chars: usize,
) -> Vec<Article> {
    let mut articles: Vec<Article> = payload
        .articles
        .into_iter()
        .map(|page| {
            let mut article = Article {
                title: page.title.filter(|t| !t.trim().is_empty()),
                url: page.url,
                text: page.text,
                error: page.error.filter(|e| !e.trim().is_empty()),
            };
            let chars = char_len(article.text.trim());
            if article.error.is_none() && chars <= min_chars {
                article.error = Some(format!(
                    "extracted text too short ({} characters)",
                    chars
                ));
            }
            article
        })
        .collect();

    let returned: HashSet<String> = articles.iter().map(|a| url_key(&a.url)).collect();
    for url in requested {
        if !returned.contains(&url_key(url)) {
            articles.push(Article::failed(url.clone(), "no content returned"));
        }
    }
    articles
}

#[async_trait]
impl Stage for Planner {
    fn id(&self) -> &'static str {
        "planner"
    }

    fn name(&self) -> &'static str {
        "Planning"
    }

    async fn run(&self, state: PipelineState) -> PipelineState {
        let user_input = state.user_input().to_string();
        let mut questions: Vec<String> = state
            .followup_questions
            .iter()
            .filter(|q| !q.trim().is_empty())
            .take(self.limits.max_questions)
            .cloned()
            .collect();
        if questions.is_empty() {
            questions.push(user_input.clone());
        }
        let platform_questions: Vec<String> = questions
            .iter()
            .take(self.limits.platform_question_count)
            .cloned()
            .collect();

        let selection = match self.select(&user_input, &questions).await {
            Ok(selection) => selection,
            Err(e) => {
                warn!(error = %e, "planning failed");
                return state
                    .with_plan(Plan {
                        platform_questions,
                        ..Plan::default()
                    })
                    .with_error(format!("Planning failed: {:#}", e))
                    .with_step(format!("{} (failed)", self.name()));
            }
        };

        let plan = Plan {
            selected_urls: selection.selected_urls,
            articles: Vec::new(),
            reddit_posts: selection.reddit_posts,
            youtube_urls: selection.youtube_urls,
            platform_questions,
            reasoning: selection.reasoning,
        };
        if plan.selected_urls.is_empty() {
            warn!("no general URLs selected; skipping crawl");
            return state.with_plan(plan).with_step(self.name());
        }

        match self.fetch(&plan.selected_urls).await {
            Ok(articles) => {
                let valid = articles.iter().filter(|a| a.is_valid()).count();
                info!(articles = articles.len(), valid, "crawl complete");
                state
                    .with_plan(Plan { articles, ..plan })
                    .with_step(self.name())
            }
            Err(e) => {
                warn!(error = %e, "crawl failed");
                state
                    .with_plan(Plan {
                        selected_urls: Vec::new(),
                        ..plan
                    })
                    .with_error(format!("Planning failed: {:#}", e))
                    .with_step(format!("{} (failed)", self.name()))
            }
        }
    }
}
