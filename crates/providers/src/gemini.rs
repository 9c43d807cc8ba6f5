use anyhow::{anyhow, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use shared::agent_api::ChatMessage;
use shared::settings::ProviderAuth;
use std::env;

use crate::SHARED_HTTP;

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    role: String,
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiPart {
    text: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiCandidatePart {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiCandidateContent {
    #[serde(default)]
    parts: Vec<GeminiCandidatePart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiCandidateContent>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

pub struct GeminiClient {
    http: Client,
    auth_token: String,
    model: String,
}

fn to_request(messages: Vec<ChatMessage>) -> GeminiRequest {
    let mut system_instruction = None;
    let mut contents: Vec<GeminiContent> = Vec::new();
    for m in messages {
        if m.role == "system" {
            system_instruction = Some(GeminiContent {
                role: "system".to_string(),
                parts: vec![GeminiPart { text: m.content }],
            });
        } else {
            // Gemini expects roles: "user" | "model".
            let role = match m.role.as_str() {
                "assistant" => "model",
                other => other,
            };
            contents.push(GeminiContent {
                role: role.to_string(),
                parts: vec![GeminiPart { text: m.content }],
            });
        }
    }
    GeminiRequest {
        contents,
        system_instruction,
    }
}

impl GeminiClient {
    pub fn from_auth(model: &str, auth: &ProviderAuth) -> Result<Self> {
        let auth_token = match &auth.api_key {
            Some(api_key) if !api_key.trim().is_empty() => api_key.clone(),
            _ => env::var("GEMINI_API_KEY")
                .or_else(|_| env::var("GOOGLE_API_KEY"))
                .map_err(|_| anyhow!("No Gemini authentication configured"))?,
        };

        Ok(Self {
            http: SHARED_HTTP.clone(),
            auth_token,
            model: model.to_string(),
        })
    }

    pub async fn generate(&self, messages: Vec<ChatMessage>) -> Result<String> {
        let url = format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent",
            self.model
        );
        let req = to_request(messages);
        let resp = self
            .http
            .post(url)
            .header("x-goog-api-key", &self.auth_token)
            .json(&req)
            .send()
            .await?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            let body = body.trim();
            if body.is_empty() {
                return Err(anyhow!("gemini error: {}", status));
            }
            let detail: String = body.chars().take(800).collect();
            return Err(anyhow!("gemini error: {}\n{}", status, detail));
        }
        let body: GeminiResponse = resp.json().await?;
        let text: String = body
            .candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|c| c.parts.iter().map(|p| p.text.as_str()).collect())
            .unwrap_or_default();
        if text.trim().is_empty() {
            return Err(anyhow!("gemini returned no candidates"));
        }
        Ok(text)
    }
}
