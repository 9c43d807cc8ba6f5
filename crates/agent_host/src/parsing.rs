//! Tolerant extraction of structured data from free-form model replies.

use regex::Regex;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::LazyLock;

use crate::urls::extract_urls;

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("model reply contained no JSON object")]
    NoJsonObject,

    #[error("model reply JSON did not match the expected shape: {0}")]
    InvalidJson(String),

    #[error("model reply is missing `{0}`")]
    MissingField(&'static str),
}

static SEARCH_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<search>(.*?)</search>").expect("valid regex"));

/// Every balanced `{...}` span in `text`, outermost first, in order of
/// appearance. Braces inside JSON strings are ignored. An opening brace
/// that never closes (stray code in prose) is skipped and scanning resumes
/// right after it.
pub fn json_objects(text: &str) -> Vec<&str> {
    let mut objects = Vec::new();
    let mut from = 0usize;
    loop {
        let unclosed = scan_objects(text, from, &mut objects);
        match unclosed {
            Some(open) => from = open + 1,
            None => return objects,
        }
    }
}

/// Collect balanced spans starting at byte `from`. Returns the position of
/// the outermost `{` still open at the end of the text, if any.
fn scan_objects<'a>(text: &'a str, from: usize, objects: &mut Vec<&'a str>) -> Option<usize> {
    let mut depth = 0usize;
    let mut start = from;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in text[from..].char_indices() {
        let i = from + i;
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' if depth > 0 => in_string = true,
            '{' => {
                if depth == 0 {
                    start = i;
                }
                depth += 1;
            }
            '}' if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    objects.push(&text[start..=i]);
                }
            }
            _ => {}
        }
    }
    (depth > 0).then_some(start)
}

/// First JSON object in `text` that deserializes as `T`.
pub fn parse_first<T: DeserializeOwned>(text: &str) -> Result<T, ParseError> {
    let candidates = json_objects(text);
    if candidates.is_empty() {
        return Err(ParseError::NoJsonObject);
    }
    let mut last_error = None;
    for candidate in candidates {
        match serde_json::from_str::<T>(candidate) {
            Ok(value) => return Ok(value),
            Err(e) => last_error = Some(e.to_string()),
        }
    }
    Err(ParseError::InvalidJson(last_error.unwrap_or_default()))
}

fn clean_list(items: Vec<String>) -> Vec<String> {
    items
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[derive(Debug, Deserialize)]
struct RawEnhancement {
    enhanced_query: Option<String>,
    followup_questions: Option<Vec<String>>,
    #[serde(default)]
    clarification_questions: Vec<String>,
}

/// Query enhancement reply, blank entries removed.
#[derive(Debug, Clone, PartialEq)]
pub struct EnhancementReply {
    pub enhanced_query: String,
    pub followup_questions: Vec<String>,
    pub clarification_questions: Vec<String>,
}

pub fn parse_enhancement(reply: &str) -> Result<EnhancementReply, ParseError> {
    let raw: RawEnhancement = parse_first(reply)?;
    let enhanced_query = raw
        .enhanced_query
        .map(|q| q.trim().to_string())
        .filter(|q| !q.is_empty())
        .ok_or(ParseError::MissingField("enhanced_query"))?;
    let followup_questions = raw
        .followup_questions
        .ok_or(ParseError::MissingField("followup_questions"))?;

    Ok(EnhancementReply {
        enhanced_query,
        followup_questions: clean_list(followup_questions),
        clarification_questions: clean_list(raw.clarification_questions),
    })
}

#[derive(Debug, Deserialize)]
struct RawSelection {
    selected_urls: Vec<String>,
    #[serde(default)]
    reddit_urls: Vec<String>,
    #[serde(default)]
    youtube_urls: Vec<String>,
    #[serde(default)]
    reasoning: String,
}

/// URL lists from the planner's final reply.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UrlSelection {
    pub selected_urls: Vec<String>,
    pub reddit_urls: Vec<String>,
    pub youtube_urls: Vec<String>,
    pub reasoning: String,
    /// True when no usable JSON was found and URLs were scraped from text.
    pub from_fallback: bool,
}

/// Parse the planner's final reply. When no object with `selected_urls`
/// parses, every URL in the raw text becomes a general candidate.
pub fn parse_url_selection(reply: &str) -> UrlSelection {
    match parse_first::<RawSelection>(reply) {
        Ok(raw) => UrlSelection {
            selected_urls: clean_list(raw.selected_urls),
            reddit_urls: clean_list(raw.reddit_urls),
            youtube_urls: clean_list(raw.youtube_urls),
            reasoning: raw.reasoning.trim().to_string(),
            from_fallback: false,
        },
        Err(_) => UrlSelection {
            selected_urls: extract_urls(reply),
            from_fallback: true,
            ..UrlSelection::default()
        },
    }
}

/// Queries the model asked to run, in order.
pub fn extract_search_requests(reply: &str) -> Vec<String> {
    SEARCH_TAG
        .captures_iter(reply)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|q| !q.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_objects_handles_nesting_and_strings() {
        let text = r#"Sure! {"a": {"b": "}"}, "c": "{"} trailing {"d": 1}"#;
        assert_eq!(
            json_objects(text),
            vec![r#"{"a": {"b": "}"}, "c": "{"}"#, r#"{"d": 1}"#]
        );
        assert!(json_objects("no braces here").is_empty());
        assert!(json_objects("{ unclosed").is_empty());
    }

    #[test]
    fn test_json_objects_escaped_quote() {
        let text = r#"{"q": "say \"hi\" }"}"#;
        assert_eq!(json_objects(text), vec![text]);
    }

    #[test]
    fn test_json_objects_skip_unclosed_brace_in_prose() {
        let text = "Entry point is `fn main() {` as usual.\n{\"a\": 1} and {\"b\": {\"c\": 2}}";
        assert_eq!(json_objects(text), vec!["{\"a\": 1}", "{\"b\": {\"c\": 2}}"]);
        assert!(json_objects("only { an opener").is_empty());
    }

    #[test]
    fn test_parse_url_selection_after_code_in_prose() {
        let reply = r#"A Rust server starts at fn main() { println!("hi");
        {"selected_urls": ["https://a.com"], "youtube_urls": ["https://youtu.be/dQw4w9WgXcQ"], "reasoning": "docs"}"#;
        let selection = parse_url_selection(reply);
        assert!(!selection.from_fallback);
        assert_eq!(selection.selected_urls, vec!["https://a.com"]);
        assert_eq!(selection.youtube_urls.len(), 1);
        assert_eq!(selection.reasoning, "docs");
    }

    #[test]
    fn test_parse_enhancement_from_fenced_reply() {
        let reply = "```json\n{\n  \"enhanced_query\": \"Research on \\\"rust vs go\\\"\",\n  \"followup_questions\": [\"What is Rust?\", \"  \", \"What is Go?\"]\n}\n```";
        let parsed = parse_enhancement(reply).unwrap();
        assert_eq!(parsed.enhanced_query, "Research on \"rust vs go\"");
        assert_eq!(parsed.followup_questions, vec!["What is Rust?", "What is Go?"]);
        assert!(parsed.clarification_questions.is_empty());
    }

    #[test]
    fn test_parse_enhancement_errors() {
        assert!(matches!(
            parse_enhancement("I cannot help with that."),
            Err(ParseError::NoJsonObject)
        ));
        assert!(matches!(
            parse_enhancement(r#"{"followup_questions": ["q"]}"#),
            Err(ParseError::MissingField("enhanced_query"))
        ));
        assert!(matches!(
            parse_enhancement(r#"{"enhanced_query": "q"}"#),
            Err(ParseError::MissingField("followup_questions"))
        ));
        assert!(matches!(
            parse_enhancement(r#"{"enhanced_query": 5}"#),
            Err(ParseError::InvalidJson(_))
        ));
    }

    #[test]
    fn test_parse_url_selection_skips_non_matching_objects() {
        let reply = r#"Searching {"note": "x"} done.
        {"selected_urls": ["https://a.com", ""], "reddit_urls": ["https://www.reddit.com/r/rust/comments/a/b/"], "reasoning": " good "}"#;
        let selection = parse_url_selection(reply);
        assert!(!selection.from_fallback);
        assert_eq!(selection.selected_urls, vec!["https://a.com"]);
        assert_eq!(selection.reddit_urls.len(), 1);
        assert!(selection.youtube_urls.is_empty());
        assert_eq!(selection.reasoning, "good");
    }

    #[test]
    fn test_parse_url_selection_falls_back_to_raw_urls() {
        let reply = "Best sources: https://a.com/x and https://b.com/y.";
        let selection = parse_url_selection(reply);
        assert!(selection.from_fallback);
        assert_eq!(selection.selected_urls, vec!["https://a.com/x", "https://b.com/y"]);
    }

    #[test]
    fn test_extract_search_requests() {
        let reply = "Let me look.\n<search> rust async runtimes </search>\n<SEARCH>tokio vs async-std</SEARCH><search>  </search>";
        assert_eq!(
            extract_search_requests(reply),
            vec!["rust async runtimes", "tokio vs async-std"]
        );
        assert!(extract_search_requests("final answer").is_empty());
    }
}
