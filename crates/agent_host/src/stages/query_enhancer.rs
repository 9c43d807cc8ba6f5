use anyhow::{Context, Result};
use async_trait::async_trait;
use shared::collaborators::LanguageModel;
use shared::stage::Stage;
use shared::state::{Enhancement, PipelineState};
use std::sync::Arc;
use tracing::{info, warn};

use crate::parsing::parse_enhancement;
use crate::prompts::{enhancer_user_message, QUERY_ENHANCER_PROMPT};

/// Rewrites the query neutrally and derives searchable follow-up questions.
pub struct QueryEnhancer {
    model: Arc<dyn LanguageModel>,
}

impl QueryEnhancer {
    /// Create an enhancer backed by `model`.
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }

    async fn enhance(&self, user_input: &str) -> Result<Enhancement> {
        let reply = self
            .model
            .invoke(QUERY_ENHANCER_PROMPT, &enhancer_user_message(user_input))
            .await
            .context("query enhancement model call failed")?;
        let parsed = parse_enhancement(&reply)?;

        let mut followup_questions = parsed.followup_questions;
        if followup_questions.is_empty() {
            followup_questions.push(parsed.enhanced_query.clone());
        }
        Ok(Enhancement {
            enhanced_query: parsed.enhanced_query,
            followup_questions,
            clarification_questions: parsed.clarification_questions,
        })
    }
}

#[async_trait]
impl Stage for QueryEnhancer {
    fn id(&self) -> &'static str {
        "query_enhancer"
    }

    fn name(&self) -> &'static str {
        "Query Enhancement"
    }

    async fn run(&self, state: PipelineState) -> PipelineState {
        let user_input = state.user_input().to_string();
        match self.enhance(&user_input).await {
            Ok(enhancement) => {
                info!(
                    questions = enhancement.followup_questions.len(),
                    clarifications = enhancement.clarification_questions.len(),
                    "query enhanced"
                );
                state.with_enhancement(enhancement).with_step(self.name())
            }
            Err(e) => {
                warn!(error = %e, "query enhancement failed; using the original query");
                state
                    .with_enhancement(Enhancement {
                        enhanced_query: user_input.clone(),
                        followup_questions: vec![user_input],
                        clarification_questions: Vec::new(),
                    })
                    .with_error(format!("Query enhancement failed: {:#}", e))
                    .with_step(format!("{} (fallback)", self.name()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedModel;

    #[tokio::test]
    async fn test_enhancement_success() {
        let model = ScriptedModel::replying(&[r#"{
            "enhanced_query": "Comparison of \"rust vs go\" for backend services",
            "followup_questions": ["What is Rust's concurrency model?", "How does Go handle HTTP?"],
            "clarification_questions": []
        }"#]);
        let stage = QueryEnhancer::new(model.clone());

        let state = stage.run(PipelineState::new("rust vs go")).await;
        assert_eq!(
            state.enhanced_query,
            "Comparison of \"rust vs go\" for backend services"
        );
        assert_eq!(state.followup_questions.len(), 2);
        assert!(state.errors().is_empty());
        assert_eq!(state.step_info, "Query Enhancement");

        let calls = model.calls();
        assert_eq!(calls[0].0, QUERY_ENHANCER_PROMPT);
        assert!(calls[0].1.contains("\"rust vs go\""));
    }

    #[tokio::test]
    async fn test_empty_followups_fall_back_to_enhanced_query() {
        let model = ScriptedModel::replying(&[
            r#"{"enhanced_query": "\"rust vs go\"", "followup_questions": ["", "  "]}"#,
        ]);
        let state = QueryEnhancer::new(model)
            .run(PipelineState::new("rust vs go"))
            .await;
        assert_eq!(state.followup_questions, vec!["\"rust vs go\"".to_string()]);
        assert!(state.errors().is_empty());
    }

    #[tokio::test]
    async fn test_unparseable_reply_falls_back_to_user_input() {
        let model = ScriptedModel::replying(&["Here are some thoughts about your query."]);
        let state = QueryEnhancer::new(model)
            .run(PipelineState::new("rust vs go"))
            .await;
        assert_eq!(state.enhanced_query, "rust vs go");
        assert_eq!(state.followup_questions, vec!["rust vs go".to_string()]);
        assert_eq!(state.errors().len(), 1);
        assert!(state.errors()[0].starts_with("Query enhancement failed"));
    }

    #[tokio::test]
    async fn test_model_failure_falls_back_and_keeps_prior_errors() {
        let state = PipelineState::new("rust vs go").with_error("earlier");
        let state = QueryEnhancer::new(ScriptedModel::failing("rate limited"))
            .run(state)
            .await;
        assert_eq!(state.followup_questions, vec!["rust vs go".to_string()]);
        assert_eq!(state.errors()[0], "earlier");
        assert!(state.errors()[1].contains("rate limited"));
    }
}
