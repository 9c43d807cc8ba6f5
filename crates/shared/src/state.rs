//! Shared state threaded through the research pipeline.
//!
//! A `PipelineState` is created once per query and handed from stage to
//! stage by value. Each stage writes its outputs through one of the
//! `with_*` methods, which only touch that stage's fields, so a stage
//! cannot clobber what an earlier stage produced.

use serde::{Deserialize, Serialize};

/// A crawled page as used by the report stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Article {
    #[serde(default)]
    pub title: Option<String>,
    pub url: String,
    #[serde(default)]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Article {
    pub fn new(title: Option<String>, url: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            title,
            url: url.into(),
            text: text.into(),
            error: None,
        }
    }

    /// An article that could not be retrieved.
    pub fn failed(url: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            title: None,
            url: url.into(),
            text: String::new(),
            error: Some(error.into()),
        }
    }

    pub fn has_error(&self) -> bool {
        self.error.as_deref().is_some_and(|e| !e.trim().is_empty())
    }

    /// No error recorded and some non-whitespace text.
    pub fn is_valid(&self) -> bool {
        !self.has_error() && !self.text.trim().is_empty()
    }

    /// Valid and longer than `min_chars` once trimmed.
    pub fn is_meaningful(&self, min_chars: usize) -> bool {
        self.is_valid() && self.text.trim().chars().count() > min_chars
    }

    /// Title for display, falling back to the URL.
    pub fn display_title(&self) -> &str {
        match self.title.as_deref().map(str::trim) {
            Some(title) if !title.is_empty() => title,
            _ => &self.url,
        }
    }
}

/// Output of the query enhancement stage.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Enhancement {
    pub enhanced_query: String,
    pub followup_questions: Vec<String>,
    pub clarification_questions: Vec<String>,
}

/// Output of the planning stage.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Plan {
    pub selected_urls: Vec<String>,
    pub articles: Vec<Article>,
    pub reddit_posts: Vec<String>,
    pub youtube_urls: Vec<String>,
    pub platform_questions: Vec<String>,
    pub reasoning: String,
}

/// Output of the platform scraping stage.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlatformDigest {
    pub content: String,
    pub summary: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineState {
    user_input: String,

    // Query enhancement
    pub enhanced_query: String,
    pub followup_questions: Vec<String>,
    pub clarification_questions: Vec<String>,

    // Planning
    pub selected_urls: Vec<String>,
    pub articles: Vec<Article>,
    pub reddit_posts: Vec<String>,
    pub youtube_urls: Vec<String>,
    pub platform_questions: Vec<String>,
    pub selection_reasoning: String,

    // Platform scraping
    pub platform_content: String,
    pub platform_summary: String,

    // Summarization
    pub report_markdown: String,

    // Meta
    errors: Vec<String>,
    pub step_info: String,
}

impl PipelineState {
    pub fn new(user_input: impl Into<String>) -> Self {
        Self {
            user_input: user_input.into(),
            ..Self::default()
        }
    }

    pub fn user_input(&self) -> &str {
        &self.user_input
    }

    /// Append-only error log, in the order errors were recorded.
    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.errors.push(error.into());
        self
    }

    pub fn with_step(mut self, step: impl Into<String>) -> Self {
        self.step_info = step.into();
        self
    }

    pub fn with_enhancement(self, enhancement: Enhancement) -> Self {
        Self {
            enhanced_query: enhancement.enhanced_query,
            followup_questions: enhancement.followup_questions,
            clarification_questions: enhancement.clarification_questions,
            ..self
        }
    }

    pub fn with_plan(self, plan: Plan) -> Self {
        Self {
            selected_urls: plan.selected_urls,
            articles: plan.articles,
            reddit_posts: plan.reddit_posts,
            youtube_urls: plan.youtube_urls,
            platform_questions: plan.platform_questions,
            selection_reasoning: plan.reasoning,
            ..self
        }
    }

    pub fn with_platform(self, digest: PlatformDigest) -> Self {
        Self {
            platform_content: digest.content,
            platform_summary: digest.summary,
            ..self
        }
    }

    pub fn with_report(self, report_markdown: impl Into<String>) -> Self {
        Self {
            report_markdown: report_markdown.into(),
            ..self
        }
    }

    pub fn valid_articles(&self) -> impl Iterator<Item = &Article> {
        self.articles.iter().filter(|a| a.is_valid())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_article_predicate() {
        assert!(Article::new(None, "https://a.com", "some text").is_valid());
        assert!(!Article::new(None, "https://a.com", "").is_valid());
        assert!(!Article::new(None, "https://a.com", "   \n").is_valid());
        assert!(!Article::failed("https://a.com", "timeout").is_valid());

        let mut with_text_and_error = Article::new(None, "https://a.com", "text");
        with_text_and_error.error = Some("partial".into());
        assert!(!with_text_and_error.is_valid());

        // A blank error string does not count as an error
        let mut blank_error = Article::new(None, "https://a.com", "text");
        blank_error.error = Some("  ".into());
        assert!(blank_error.is_valid());
    }

    #[test]
    fn test_meaningful_threshold() {
        let short = Article::new(None, "https://a.com", "x".repeat(50));
        let long = Article::new(None, "https://a.com", "x".repeat(51));
        assert!(!short.is_meaningful(50));
        assert!(long.is_meaningful(50));
    }

    #[test]
    fn test_display_title_falls_back_to_url() {
        let titled = Article::new(Some("Title".into()), "https://a.com", "t");
        let untitled = Article::new(Some("  ".into()), "https://b.com", "t");
        assert_eq!(titled.display_title(), "Title");
        assert_eq!(untitled.display_title(), "https://b.com");
    }

    #[test]
    fn test_stage_updates_do_not_clobber_other_fields() {
        let state = PipelineState::new("rust vs go")
            .with_enhancement(Enhancement {
                enhanced_query: "\"rust vs go\" comparison".into(),
                followup_questions: vec!["q1".into()],
                clarification_questions: vec![],
            })
            .with_error("first")
            .with_plan(Plan {
                selected_urls: vec!["https://a.com/".into()],
                ..Plan::default()
            })
            .with_error("second")
            .with_platform(PlatformDigest {
                content: "content".into(),
                summary: "summary".into(),
            })
            .with_report("# Report");

        assert_eq!(state.user_input(), "rust vs go");
        assert_eq!(state.enhanced_query, "\"rust vs go\" comparison");
        assert_eq!(state.followup_questions, vec!["q1".to_string()]);
        assert_eq!(state.selected_urls, vec!["https://a.com/".to_string()]);
        assert_eq!(state.platform_content, "content");
        assert_eq!(state.report_markdown, "# Report");
        assert_eq!(state.errors(), &["first".to_string(), "second".to_string()]);
    }

    #[test]
    fn test_state_serializes_with_all_fields() {
        let state = PipelineState::new("query").with_error("boom");
        let value = serde_json::to_value(&state).unwrap();
        assert_eq!(value["user_input"], "query");
        assert_eq!(value["errors"][0], "boom");
        assert_eq!(value["platform_content"], "");
    }
}
