pub mod budget;
pub mod collaborators;
pub mod events;
pub mod stage;
pub mod state;

pub mod settings {
    use anyhow::{Context, Result};
    use serde::{Deserialize, Serialize};
    use std::path::Path;

    #[derive(Debug, Clone, Default, Serialize, Deserialize)]
    pub struct ProviderAuth {
        #[serde(default)]
        pub api_key: Option<String>,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    #[serde(default)]
    pub struct ModelProvider {
        pub provider_preference: Vec<String>, // e.g., ["openai", "anthropic", "gemini", "local"]
        pub local_model: String,              // e.g., "llama3.2:3b" for Ollama
        pub openai_model: String,
        /// OpenAI-compatible endpoint; Groq works through "https://api.groq.com/openai"
        pub openai_base_url: Option<String>,
        pub anthropic_model: String,
        pub gemini_model: String,
        pub openai_auth: ProviderAuth,
        pub anthropic_auth: ProviderAuth,
        pub gemini_auth: ProviderAuth,
        /// Extra attempts per provider on failure before moving to the next one
        pub max_retries: u32,
        /// First retry delay; doubles on each further attempt
        pub retry_delay_ms: u64,
    }

    impl ModelProvider {
        /// Fast model for query rewriting and URL selection.
        pub fn research_default() -> Self {
            Self {
                provider_preference: vec![
                    "openai".into(),
                    "anthropic".into(),
                    "gemini".into(),
                    "local".into(),
                ],
                openai_model: "openai/gpt-oss-120b".into(),
                openai_base_url: Some("https://api.groq.com/openai".into()),
                ..Self::default()
            }
        }

        /// Long-context model for writing the final report.
        pub fn report_default() -> Self {
            Self {
                provider_preference: vec![
                    "gemini".into(),
                    "anthropic".into(),
                    "openai".into(),
                    "local".into(),
                ],
                ..Self::default()
            }
        }
    }

    impl Default for ModelProvider {
        fn default() -> Self {
            Self {
                provider_preference: vec!["anthropic".into(), "openai".into(), "gemini".into()],
                local_model: "llama3.2:3b".into(),
                openai_model: "gpt-4o-mini".into(),
                openai_base_url: None,
                anthropic_model: "claude-3-5-sonnet-20241022".into(),
                gemini_model: "gemini-2.5-flash".into(),
                openai_auth: ProviderAuth::default(),
                anthropic_auth: ProviderAuth::default(),
                gemini_auth: ProviderAuth::default(),
                max_retries: 2,
                retry_delay_ms: 750,
            }
        }
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    #[serde(default)]
    pub struct SearchSettings {
        pub serper_api_key: Option<String>,
        pub locale: String,
        pub language: String,
        pub results_per_query: usize,
    }

    impl Default for SearchSettings {
        fn default() -> Self {
            Self {
                serper_api_key: None,
                locale: "us".into(),
                language: "en".into(),
                results_per_query: 10,
            }
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum CrawlBackend {
        /// Exa contents API
        Exa,
        /// Plain HTTP fetch with HTML-to-text extraction
        Direct,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    #[serde(default)]
    pub struct CrawlSettings {
        pub backend: CrawlBackend,
        pub exa_api_key: Option<String>,
        pub max_urls: usize,
        pub max_chars_per_article: usize,
        pub max_total_chars: usize,
    }

    impl Default for CrawlSettings {
        fn default() -> Self {
            Self {
                backend: CrawlBackend::Exa,
                exa_api_key: None,
                max_urls: 8,
                max_chars_per_article: 15_000,
                max_total_chars: 100_000,
            }
        }
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    #[serde(default)]
    pub struct PlatformSettings {
        pub reddit_user_agent: String,
        pub max_reddit_comments: usize,
        pub max_transcript_words: usize,
    }

    impl Default for PlatformSettings {
        fn default() -> Self {
            Self {
                reddit_user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                                    (KHTML, like Gecko) Chrome/124.0 Safari/537.36"
                    .into(),
                max_reddit_comments: 5,
                max_transcript_words: 2_000,
            }
        }
    }

    /// Knobs that bound how much work and text each stage handles.
    #[derive(Debug, Clone, Serialize, Deserialize)]
    #[serde(default)]
    pub struct PipelineLimits {
        pub max_questions: usize,
        pub max_selected_urls: usize,
        pub max_per_domain: usize,
        pub platform_question_count: usize,
        /// Articles at or below this many characters are flagged, not used
        pub min_article_chars: usize,
        pub report_article_chars: usize,
        pub report_total_chars: usize,
        pub platform_content_chars: usize,
        pub max_planner_turns: usize,
    }

    impl Default for PipelineLimits {
        fn default() -> Self {
            Self {
                max_questions: 6,
                max_selected_urls: 8,
                max_per_domain: 2,
                platform_question_count: 3,
                min_article_chars: 50,
                report_article_chars: 12_000,
                report_total_chars: 80_000,
                platform_content_chars: 8_000,
                max_planner_turns: 12,
            }
        }
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    #[serde(default)]
    pub struct AppSettings {
        pub research_model: ModelProvider,
        pub report_model: ModelProvider,
        pub search: SearchSettings,
        pub crawl: CrawlSettings,
        pub platforms: PlatformSettings,
        pub limits: PipelineLimits,
    }

    impl Default for AppSettings {
        fn default() -> Self {
            Self {
                research_model: ModelProvider::research_default(),
                report_model: ModelProvider::report_default(),
                search: SearchSettings::default(),
                crawl: CrawlSettings::default(),
                platforms: PlatformSettings::default(),
                limits: PipelineLimits::default(),
            }
        }
    }

    impl AppSettings {
        /// Read settings from a JSON file. Missing fields take their defaults.
        pub fn load(path: &Path) -> Result<Self> {
            let bytes = std::fs::read(path)
                .with_context(|| format!("failed to read settings from {}", path.display()))?;
            let settings = serde_json::from_slice(&bytes)
                .with_context(|| format!("invalid settings file {}", path.display()))?;
            Ok(settings)
        }

        pub fn save(&self, path: &Path) -> Result<()> {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, serde_json::to_vec_pretty(self)?)?;
            Ok(())
        }
    }

}

pub mod agent_api {
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct ChatMessage {
        pub role: String, // "system" | "user" | "assistant"
        pub content: String,
    }

    impl ChatMessage {
        pub fn system(content: impl Into<String>) -> Self {
            Self {
                role: "system".into(),
                content: content.into(),
            }
        }

        pub fn user(content: impl Into<String>) -> Self {
            Self {
                role: "user".into(),
                content: content.into(),
            }
        }
    }
}

pub mod search_types {
    use serde::{Deserialize, Serialize};

    /// One organic search result.
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct SearchHit {
        pub title: String,
        pub url: String,
        pub snippet: String,
    }

    #[derive(Debug, Clone, Default, Serialize, Deserialize)]
    pub struct KnowledgeGraph {
        pub title: String,
        pub kind: Option<String>,
        pub description: Option<String>,
        pub attributes: Vec<(String, String)>,
    }

    #[derive(Debug, Clone, Default, Serialize, Deserialize)]
    pub struct SearchResponse {
        pub query: String,
        pub organic: Vec<SearchHit>,
        pub knowledge_graph: Option<KnowledgeGraph>,
        /// (question, answer snippet)
        pub people_also_ask: Vec<(String, String)>,
        pub related_searches: Vec<String>,
    }

    impl SearchResponse {
        /// Render the response as the digest the planning model reads.
        pub fn to_prompt_text(&self) -> String {
            let mut out = format!("Search Results for: {}\n\n", self.query);

            if let Some(kg) = &self.knowledge_graph {
                out.push_str("KNOWLEDGE GRAPH:\n");
                out.push_str(&format!("Title: {}\n", kg.title));
                if let Some(kind) = &kg.kind {
                    out.push_str(&format!("Type: {}\n", kind));
                }
                if let Some(description) = &kg.description {
                    out.push_str(&format!("Description: {}\n", description));
                }
                for (key, value) in &kg.attributes {
                    out.push_str(&format!("  - {}: {}\n", key, value));
                }
                out.push('\n');
            }

            if self.organic.is_empty() {
                out.push_str("No organic results.\n\n");
            } else {
                out.push_str("ORGANIC RESULTS:\n");
                for (i, hit) in self.organic.iter().enumerate() {
                    out.push_str(&format!(
                        "{}. {}\n   URL: {}\n   Snippet: {}\n\n",
                        i + 1,
                        hit.title,
                        hit.url,
                        hit.snippet
                    ));
                }
            }

            if !self.people_also_ask.is_empty() {
                out.push_str("PEOPLE ALSO ASK:\n");
                for (i, (question, answer)) in self.people_also_ask.iter().enumerate() {
                    out.push_str(&format!("{}. Q: {}\n   A: {}\n", i + 1, question, answer));
                }
                out.push('\n');
            }

            if !self.related_searches.is_empty() {
                out.push_str("RELATED SEARCHES:\n");
                for (i, related) in self.related_searches.iter().enumerate() {
                    out.push_str(&format!("{}. {}\n", i + 1, related));
                }
            }

            out
        }
    }

}
