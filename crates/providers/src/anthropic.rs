use anyhow::{anyhow, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use shared::agent_api::ChatMessage;
use shared::settings::ProviderAuth;
use std::env;

use crate::SHARED_HTTP;

#[derive(Debug, Serialize, Deserialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<AnthropicMessage>,
}

#[derive(Debug, Serialize, Deserialize)]
struct AnthropicMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct AnthropicContent {
    #[serde(rename = "type")]
    content_type: String,
    #[serde(default)]
    text: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContent>,
}

pub struct AnthropicClient {
    http: Client,
    auth_token: String,
    model: String,
}

/// Split system messages out; the messages API takes them as a top-level field.
fn split_system(messages: Vec<ChatMessage>) -> (Option<String>, Vec<AnthropicMessage>) {
    let mut system_prompt = String::new();
    let mut anthropic_messages = Vec::new();
    for m in messages {
        if m.role == "system" {
            if !system_prompt.is_empty() {
                system_prompt.push_str("\n\n");
            }
            system_prompt.push_str(&m.content);
        } else {
            anthropic_messages.push(AnthropicMessage {
                role: m.role,
                content: m.content,
            });
        }
    }
    let system = if system_prompt.trim().is_empty() {
        None
    } else {
        Some(system_prompt)
    };
    (system, anthropic_messages)
}

impl AnthropicClient {
    pub fn from_auth(model: &str, auth: &ProviderAuth) -> Result<Self> {
        let auth_token = match &auth.api_key {
            Some(api_key) if !api_key.trim().is_empty() => api_key.clone(),
            // Try environment variable as fallback
            _ => env::var("ANTHROPIC_API_KEY")
                .map_err(|_| anyhow!("No Anthropic authentication configured"))?,
        };

        Ok(Self {
            http: SHARED_HTTP.clone(),
            auth_token,
            model: model.to_string(),
        })
    }

    pub async fn generate(&self, messages: Vec<ChatMessage>) -> Result<String> {
        let url = "https://api.anthropic.com/v1/messages";
        let (system, anthropic_messages) = split_system(messages);

        let req = AnthropicRequest {
            model: self.model.clone(),
            max_tokens: 8192,
            system,
            messages: anthropic_messages,
        };

        let resp = self
            .http
            .post(url)
            .header("x-api-key", &self.auth_token)
            .header("anthropic-version", "2023-06-01")
            .header("Content-Type", "application/json")
            .json(&req)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            let detail: String = body.chars().take(800).collect();
            if detail.trim().is_empty() {
                return Err(anyhow!("anthropic error: {}", status));
            }
            return Err(anyhow!("anthropic error: {}\n{}", status, detail));
        }

        let body: AnthropicResponse = resp.json().await?;
        let text: String = body
            .content
            .iter()
            .filter(|c| c.content_type == "text")
            .map(|c| c.text.as_str())
            .collect();
        if text.trim().is_empty() {
            return Err(anyhow!("anthropic returned no text content"));
        }
        Ok(text)
    }
}
