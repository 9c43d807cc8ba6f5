//! Concrete collaborators for the research pipeline: web search, page
//! crawling, and Reddit / YouTube extraction.

pub mod direct_crawl;
pub mod exa;
pub mod reddit;
pub mod serper;
pub mod youtube;

pub use direct_crawl::DirectCrawler;
pub use exa::ExaCrawler;
pub use reddit::RedditClient;
pub use serper::SerperClient;
pub use youtube::YouTubeClient;

use regex::Regex;
use reqwest::Client;
use std::sync::LazyLock;
use std::time::Duration;

pub(crate) static SHARED_HTTP: LazyLock<Client> = LazyLock::new(|| {
    Client::builder()
        .timeout(Duration::from_secs(30))
        .pool_max_idle_per_host(2)
        .build()
        .expect("failed to build HTTP client")
});

/// Rule line between per-URL sections in formatted output.
pub(crate) fn section_divider() -> String {
    format!("\n\n{}\n\n", "=".repeat(80))
}

static NUMERIC_ENTITY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&#(x[0-9a-fA-F]+|[0-9]+);").expect("valid regex"));

pub(crate) fn html_decode(s: &str) -> String {
    let named = s
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&nbsp;", " ");
    let numeric = NUMERIC_ENTITY.replace_all(&named, |caps: &regex::Captures| {
        let code = &caps[1];
        let value = match code.strip_prefix('x') {
            Some(hex) => u32::from_str_radix(hex, 16).ok(),
            None => code.parse::<u32>().ok(),
        };
        value
            .and_then(char::from_u32)
            .map(String::from)
            .unwrap_or_else(|| caps[0].to_string())
    });
    // &amp; last so "&amp;lt;" decodes to "&lt;" rather than "<"
    numeric.replace("&amp;", "&")
}

/// Collapse runs of whitespace into single spaces.
pub(crate) fn squash_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
