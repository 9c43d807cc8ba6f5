//! Google search through the Serper API.

use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use shared::collaborators::{CollaboratorError, SearchProvider};
use shared::search_types::{KnowledgeGraph, SearchHit, SearchResponse};
use shared::settings::SearchSettings;
use std::env;
use tracing::{debug, info};

use crate::SHARED_HTTP;

const SERPER_URL: &str = "https://google.serper.dev/search";
const SERVICE: &str = "serper";

#[derive(Debug, Serialize)]
struct SerperRequest<'a> {
    q: &'a str,
    gl: &'a str,
    hl: &'a str,
    num: usize,
    autocorrect: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SerperResponse {
    #[serde(default)]
    organic: Vec<SerperOrganic>,
    #[serde(default)]
    knowledge_graph: Option<SerperKnowledgeGraph>,
    #[serde(default)]
    people_also_ask: Vec<SerperQuestion>,
    #[serde(default)]
    related_searches: Vec<SerperRelated>,
}

#[derive(Debug, Deserialize)]
struct SerperOrganic {
    #[serde(default)]
    title: String,
    #[serde(default)]
    link: String,
    #[serde(default)]
    snippet: String,
}

#[derive(Debug, Deserialize)]
struct SerperKnowledgeGraph {
    #[serde(default)]
    title: String,
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    attributes: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct SerperQuestion {
    #[serde(default)]
    question: String,
    #[serde(default)]
    snippet: String,
}

#[derive(Debug, Deserialize)]
struct SerperRelated {
    #[serde(default)]
    query: String,
}

/// Convert a raw Serper response body into a [`SearchResponse`].
pub fn parse_response(query: &str, body: &str) -> Result<SearchResponse, CollaboratorError> {
    let raw: SerperResponse =
        serde_json::from_str(body).map_err(|e| CollaboratorError::Malformed {
            service: SERVICE,
            message: e.to_string(),
        })?;

    let organic = raw
        .organic
        .into_iter()
        .filter(|r| !r.link.trim().is_empty())
        .map(|r| SearchHit {
            title: if r.title.is_empty() {
                "No title".to_string()
            } else {
                r.title
            },
            url: r.link,
            snippet: r.snippet,
        })
        .collect();

    let knowledge_graph = raw.knowledge_graph.map(|kg| KnowledgeGraph {
        title: kg.title,
        kind: kg.kind,
        description: kg.description,
        attributes: kg
            .attributes
            .into_iter()
            .map(|(key, value)| {
                let value = match value {
                    serde_json::Value::String(s) => s,
                    other => other.to_string(),
                };
                (key, value)
            })
            .collect(),
    });

    Ok(SearchResponse {
        query: query.to_string(),
        organic,
        knowledge_graph,
        people_also_ask: raw
            .people_also_ask
            .into_iter()
            .map(|q| (q.question, q.snippet))
            .collect(),
        related_searches: raw
            .related_searches
            .into_iter()
            .map(|r| r.query)
            .filter(|q| !q.is_empty())
            .collect(),
    })
}

pub struct SerperClient {
    http: Client,
    api_key: Option<String>,
    locale: String,
    language: String,
    num_results: usize,
    endpoint: String,
}

impl SerperClient {
    pub fn new(settings: &SearchSettings) -> Self {
        let api_key = settings
            .serper_api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| env::var("SERPER_API_KEY").ok());
        Self {
            http: SHARED_HTTP.clone(),
            api_key,
            locale: settings.locale.clone(),
            language: settings.language.clone(),
            num_results: settings.results_per_query,
            endpoint: SERPER_URL.to_string(),
        }
    }

    /// Point the client at a different endpoint (proxies, test servers).
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[async_trait]
impl SearchProvider for SerperClient {
    async fn search(&self, query: &str) -> Result<SearchResponse> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(CollaboratorError::MissingCredential {
                service: SERVICE,
                hint: "set SERPER_API_KEY or search.serper_api_key",
            })?;

        info!(query = %query, "searching with serper");
        let req = SerperRequest {
            q: query,
            gl: &self.locale,
            hl: &self.language,
            num: self.num_results,
            autocorrect: true,
        };
        let resp = self
            .http
            .post(&self.endpoint)
            .header("X-API-KEY", api_key)
            .json(&req)
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            return Err(CollaboratorError::Http {
                service: SERVICE,
                status: status.as_u16(),
                detail: body.chars().take(300).collect(),
            }
            .into());
        }

        let response = parse_response(query, &body)?;
        debug!(query = %query, hits = response.organic.len(), "serper search complete");
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = r#"{
        "searchParameters": {"q": "rust vs go"},
        "knowledgeGraph": {
            "title": "Rust",
            "type": "Programming language",
            "description": "A systems language.",
            "attributes": {"Designed by": "Graydon Hoare"}
        },
        "organic": [
            {"title": "Rust vs Go in 2024", "link": "https://blog.example.com/rust-vs-go", "snippet": "A comparison", "position": 1},
            {"title": "", "link": "https://docs.example.org/go", "snippet": "Go docs"},
            {"title": "No link", "snippet": "dropped"}
        ],
        "peopleAlsoAsk": [{"question": "Is Rust faster than Go?", "snippet": "Often."}],
        "relatedSearches": [{"query": "rust web frameworks"}]
    }"#;

    #[test]
    fn test_parse_response() {
        let response = parse_response("rust vs go", FIXTURE).unwrap();
        assert_eq!(response.organic.len(), 2);
        assert_eq!(response.organic[0].url, "https://blog.example.com/rust-vs-go");
        assert_eq!(response.organic[1].title, "No title");

        let kg = response.knowledge_graph.as_ref().unwrap();
        assert_eq!(kg.kind.as_deref(), Some("Programming language"));
        assert_eq!(
            kg.attributes,
            vec![("Designed by".to_string(), "Graydon Hoare".to_string())]
        );

        assert_eq!(response.people_also_ask[0].0, "Is Rust faster than Go?");
        assert_eq!(response.related_searches, vec!["rust web frameworks".to_string()]);
    }

    #[test]
    fn test_parse_empty_object() {
        let response = parse_response("q", "{}").unwrap();
        assert!(response.organic.is_empty());
        assert!(response.knowledge_graph.is_none());
    }

    #[test]
    fn test_parse_malformed_body() {
        let err = parse_response("q", "<html>").unwrap_err();
        assert!(matches!(err, CollaboratorError::Malformed { .. }));
    }

    #[tokio::test]
    async fn test_missing_key_is_an_error() {
        let mut client = SerperClient::new(&SearchSettings::default());
        client.api_key = None;
        let err = client.search("anything").await.unwrap_err();
        assert!(err.to_string().contains("serper is not configured"));
    }
}
