use crate::anthropic::AnthropicClient;
use crate::gemini::GeminiClient;
use crate::ollama::OllamaClient;
use crate::openai::OpenAIClient;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use shared::agent_api::ChatMessage;
use shared::collaborators::LanguageModel;
use shared::settings::ModelProvider;
use std::time::Duration;
use tracing::{debug, warn};

enum ProviderClient {
    OpenAI(OpenAIClient),
    Anthropic(AnthropicClient),
    Gemini(GeminiClient),
    Local(OllamaClient),
}

impl ProviderClient {
    async fn generate(&self, messages: Vec<ChatMessage>) -> Result<String> {
        match self {
            ProviderClient::OpenAI(client) => client.generate(messages).await,
            ProviderClient::Anthropic(client) => client.generate(messages).await,
            ProviderClient::Gemini(client) => client.generate(messages).await,
            ProviderClient::Local(client) => client.generate(messages).await,
        }
    }
}

pub struct ProviderRouter {
    config: ModelProvider,
    retry_delay: Duration,
}

impl ProviderRouter {
    /// Create a router over the providers in `config`, tried in preference order.
    pub fn new(config: ModelProvider) -> Self {
        Self {
            retry_delay: Duration::from_millis(config.retry_delay_ms),
            config,
        }
    }

    /// Returns the name of the first preferred provider.
    pub fn active_provider(&self) -> Option<&str> {
        self.config.provider_preference.first().map(|s| s.as_str())
    }

    fn client_for(&self, provider: &str) -> Result<ProviderClient> {
        match provider {
            "local" => Ok(ProviderClient::Local(OllamaClient::new(
                self.config.local_model.clone(),
            ))),
            "openai" => OpenAIClient::from_auth(
                &self.config.openai_model,
                &self.config.openai_auth,
                self.config.openai_base_url.as_deref(),
            )
            .map(ProviderClient::OpenAI),
            "anthropic" => {
                AnthropicClient::from_auth(&self.config.anthropic_model, &self.config.anthropic_auth)
                    .map(ProviderClient::Anthropic)
            }
            "gemini" => GeminiClient::from_auth(&self.config.gemini_model, &self.config.gemini_auth)
                .map(ProviderClient::Gemini),
            other => Err(anyhow!("Unknown provider: {}", other)),
        }
    }

    pub async fn generate(&self, messages: Vec<ChatMessage>) -> Result<String> {
        let mut last_error = None;

        // Try providers in order of preference, falling back on failure
        for provider in self.config.provider_preference.iter() {
            let client = match self.client_for(provider) {
                Ok(client) => client,
                Err(e) => {
                    debug!(provider = %provider, error = %e, "provider unavailable");
                    last_error = Some(e);
                    continue;
                }
            };

            for attempt in 0..=self.config.max_retries {
                if attempt > 0 {
                    tokio::time::sleep(self.retry_delay * 2u32.pow(attempt - 1)).await;
                }
                match client.generate(messages.clone()).await {
                    Ok(response) => return Ok(response),
                    Err(e) => {
                        warn!(provider = %provider, attempt, error = %e, "model call failed");
                        last_error = Some(e);
                    }
                }
            }
        }

        Err(last_error.unwrap_or_else(|| anyhow!("No providers configured")))
    }
}

#[async_trait]
impl LanguageModel for ProviderRouter {
    async fn invoke(&self, system: &str, user: &str) -> Result<String> {
        self.generate(vec![ChatMessage::system(system), ChatMessage::user(user)])
            .await
    }
}
