//! URL post-processing: canonicalization, domain-diverse selection, and
//! routing of Reddit / YouTube links to their platform scrapers.

use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;
use url::Url;

const TRACKING_PARAMS: [&str; 5] = ["fbclid", "gclid", "ref", "source", "campaign_id"];

static URL_IN_TEXT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"https?://[^\s<>"'\]\}]+"#).expect("valid regex"));

static REDDIT_THREAD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https?://(?:www\.)?reddit\.com/r/[A-Za-z0-9_]+/comments/[A-Za-z0-9]+/[^/?#\s]+/?")
        .expect("valid regex")
});

static YOUTUBE_VIDEO: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^https?://(?:(?:www\.|m\.)?youtube\.com/(?:watch\?(?:[^#\s]*&)?v=|shorts/)|youtu\.be/)[A-Za-z0-9_-]{11}",
    )
    .expect("valid regex")
});

fn is_tracking_param(key: &str) -> bool {
    let key = key.to_ascii_lowercase();
    key.starts_with("utm_") || TRACKING_PARAMS.contains(&key.as_str())
}

/// Canonical form of `raw` for deduplication: fragment removed, tracking
/// parameters stripped, remaining parameters kept in order. Unparseable
/// input comes back unchanged.
pub fn normalize(raw: &str) -> String {
    let Ok(mut url) = Url::parse(raw) else {
        return raw.to_string();
    };
    url.set_fragment(None);

    let kept: Vec<String> = url
        .query()
        .unwrap_or_default()
        .split('&')
        .filter(|pair| !pair.is_empty())
        .filter(|pair| {
            let key = pair.split('=').next().unwrap_or_default();
            !is_tracking_param(key)
        })
        .map(str::to_string)
        .collect();

    if kept.is_empty() {
        url.set_query(None);
    } else {
        url.set_query(Some(&kept.join("&")));
    }
    url.to_string()
}

/// Lowercased host with a leading `www.` removed.
pub fn domain_key(raw: &str) -> String {
    let host = match Url::parse(raw) {
        Ok(url) => url.host_str().unwrap_or_default().to_string(),
        Err(_) => raw
            .split("://")
            .nth(1)
            .unwrap_or(raw)
            .split(['/', '?', '#'])
            .next()
            .unwrap_or_default()
            .to_string(),
    };
    let host = host.to_ascii_lowercase();
    host.strip_prefix("www.").map(str::to_string).unwrap_or(host)
}

fn has_web_scheme(url: &str) -> bool {
    let lower = url.to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Drop blank and non-http(s) entries and collapse duplicates by canonical
/// form, keeping the first original spelling.
pub fn dedupe(urls: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    urls.iter()
        .map(|u| u.trim())
        .filter(|u| !u.is_empty() && has_web_scheme(u))
        .filter(|u| seen.insert(normalize(u)))
        .map(str::to_string)
        .collect()
}

/// Pick at most `max_total` URLs with no more than `max_per_domain` from
/// any one domain. Domains are visited in first-seen order, so earlier
/// search results win.
pub fn select_diverse(urls: &[String], max_total: usize, max_per_domain: usize) -> Vec<String> {
    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, Vec<String>> = HashMap::new();
    for url in dedupe(urls) {
        let domain = domain_key(&url);
        if !groups.contains_key(&domain) {
            order.push(domain.clone());
        }
        groups.entry(domain).or_default().push(url);
    }

    let mut selected = Vec::new();
    for domain in order {
        for url in groups[&domain].iter().take(max_per_domain) {
            if selected.len() >= max_total {
                return selected;
            }
            selected.push(url.clone());
        }
    }
    selected
}

/// Strip sentence punctuation and any closing parenthesis that belongs to
/// the surrounding text rather than the URL.
fn trim_url_tail(mut url: &str) -> &str {
    loop {
        let trimmed = url.trim_end_matches(['.', ',', ';', ':', '!', '?']);
        let unbalanced = trimmed.matches(')').count() > trimmed.matches('(').count();
        match trimmed.strip_suffix(')') {
            Some(inner) if unbalanced => url = inner,
            _ => return trimmed,
        }
    }
}

/// Every http(s) URL in free text, trailing sentence punctuation trimmed.
/// Parentheses inside a URL are kept when they balance.
pub fn extract_urls(text: &str) -> Vec<String> {
    URL_IN_TEXT
        .find_iter(text)
        .map(|m| trim_url_tail(m.as_str()).to_string())
        .filter(|u| u.len() > "https://".len())
        .collect()
}

pub fn is_reddit_thread(url: &str) -> bool {
    REDDIT_THREAD.is_match(url.trim())
}

pub fn is_youtube_video(url: &str) -> bool {
    YOUTUBE_VIDEO.is_match(url.trim())
}

/// URL candidates split by destination.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClassifiedUrls {
    pub general: Vec<String>,
    pub reddit: Vec<String>,
    pub youtube: Vec<String>,
}

/// Route candidate URLs to general crawling or a platform scraper.
///
/// `tagged_*` are the lists the model labelled itself; `stray_text` is
/// scanned for platform links the model mentioned without tagging. Tagged
/// links that do not have the platform shape fall back to `general`.
/// Platform lists are deduplicated by canonical form.
pub fn classify(
    general: &[String],
    tagged_reddit: &[String],
    tagged_youtube: &[String],
    stray_text: &str,
) -> ClassifiedUrls {
    let stray = extract_urls(stray_text);
    let mut out = ClassifiedUrls::default();

    let mut reddit = Vec::new();
    let mut youtube = Vec::new();
    let mut candidates = Vec::new();

    for url in tagged_reddit {
        if is_reddit_thread(url) {
            reddit.push(url.trim().to_string());
        } else {
            candidates.push(url.clone());
        }
    }
    for url in tagged_youtube {
        if is_youtube_video(url) {
            youtube.push(url.trim().to_string());
        } else {
            candidates.push(url.clone());
        }
    }

    for url in general.iter().chain(candidates.iter()) {
        if is_reddit_thread(url) {
            reddit.push(url.trim().to_string());
        } else if is_youtube_video(url) {
            youtube.push(url.trim().to_string());
        } else {
            out.general.push(url.clone());
        }
    }

    for url in stray {
        if is_reddit_thread(&url) {
            reddit.push(url);
        } else if is_youtube_video(&url) {
            youtube.push(url);
        }
    }

    out.reddit = dedupe(&reddit);
    out.youtube = dedupe(&youtube);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_normalize_strips_tracking_and_fragment() {
        assert_eq!(
            normalize("https://a.com/x?id=1&utm_source=y#frag"),
            normalize("https://a.com/x?id=1")
        );
        assert_eq!(
            normalize("https://a.com/x?UTM_Medium=m&b=2&fbclid=z&a=1"),
            "https://a.com/x?b=2&a=1"
        );
        assert_eq!(normalize("https://a.com/x?ref=hn"), "https://a.com/x");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let inputs = [
            "https://Example.COM/path?q=rust&utm_campaign=x#top",
            "http://a.com",
            "https://a.com/x?gclid=1&gclid=2",
            "https://a.com/search?q=a%20b&source=web",
            "not a url",
            "",
            "mailto:someone@example.com",
        ];
        for input in inputs {
            let once = normalize(input);
            assert_eq!(normalize(&once), once, "{}", input);
        }
    }

    #[test]
    fn test_normalize_fails_open() {
        assert_eq!(normalize("not a url"), "not a url");
        assert_eq!(normalize("//missing-scheme.com/x"), "//missing-scheme.com/x");
    }

    #[test]
    fn test_domain_key() {
        assert_eq!(domain_key("https://WWW.Example.com/a"), "example.com");
        assert_eq!(domain_key("https://docs.example.com"), "docs.example.com");
        assert_eq!(domain_key("http://www.a.com:8080/x"), "a.com");
    }

    #[test]
    fn test_select_caps_single_domain() {
        let urls: Vec<String> = (0..10).map(|i| format!("https://same.com/page{}", i)).collect();
        let selected = select_diverse(&urls, 8, 2);
        assert_eq!(selected, strings(&["https://same.com/page0", "https://same.com/page1"]));
    }

    #[test]
    fn test_select_respects_total_and_domain_order() {
        let mut urls = Vec::new();
        for domain in ["a", "b", "c", "d", "e"] {
            for i in 0..3 {
                urls.push(format!("https://{}.com/{}", domain, i));
            }
        }
        let selected = select_diverse(&urls, 8, 2);
        assert_eq!(selected.len(), 8);
        let domains: Vec<String> = selected.iter().map(|u| domain_key(u)).collect();
        assert_eq!(
            domains,
            strings(&["a.com", "a.com", "b.com", "b.com", "c.com", "c.com", "d.com", "d.com"])
        );
    }

    #[test]
    fn test_select_groups_interleaved_domains() {
        let urls = strings(&[
            "https://a.com/1",
            "https://b.com/1",
            "https://a.com/2",
            "https://a.com/3",
            "https://b.com/2",
        ]);
        assert_eq!(
            select_diverse(&urls, 8, 2),
            strings(&["https://a.com/1", "https://a.com/2", "https://b.com/1", "https://b.com/2"])
        );
    }

    #[test]
    fn test_select_dedupes_keeping_first_original() {
        let urls = strings(&[
            "  ",
            "ftp://files.com/x",
            "https://www.a.com/x?utm_source=feed",
            "https://www.a.com/x",
            "https://a.com/y#section",
        ]);
        assert_eq!(
            select_diverse(&urls, 8, 2),
            strings(&["https://www.a.com/x?utm_source=feed", "https://a.com/y#section"])
        );
    }

    #[test]
    fn test_select_empty() {
        assert!(select_diverse(&[], 8, 2).is_empty());
    }

    #[test]
    fn test_extract_urls_from_text() {
        let text = "See https://a.com/x, and (https://b.org/y). Also <https://c.net/z>!";
        assert_eq!(
            extract_urls(text),
            strings(&["https://a.com/x", "https://b.org/y", "https://c.net/z"])
        );
    }

    #[test]
    fn test_extract_urls_keeps_balanced_parentheses() {
        let text = "Best source: https://en.wikipedia.org/wiki/Go_(programming_language) and https://a.com/x";
        assert_eq!(
            extract_urls(text),
            strings(&[
                "https://en.wikipedia.org/wiki/Go_(programming_language)",
                "https://a.com/x"
            ])
        );
        assert_eq!(
            extract_urls("(see https://en.wikipedia.org/wiki/Rust_(programming_language))."),
            strings(&["https://en.wikipedia.org/wiki/Rust_(programming_language)"])
        );
    }

    #[test]
    fn test_extract_urls_from_markdown_links() {
        let text = "Read [the guide](https://a.com/x) and [docs](https://b.org/y?q=1).";
        assert_eq!(
            extract_urls(text),
            strings(&["https://a.com/x", "https://b.org/y?q=1"])
        );
    }

    #[test]
    fn test_platform_shapes() {
        assert!(is_reddit_thread("https://www.reddit.com/r/rust/comments/abc123/rust_vs_go/"));
        assert!(is_reddit_thread("https://reddit.com/r/golang/comments/x1/title"));
        assert!(!is_reddit_thread("https://www.reddit.com/r/rust/"));
        assert!(!is_reddit_thread("https://notreddit.com/r/rust/comments/abc/t/"));

        assert!(is_youtube_video("https://www.youtube.com/watch?v=dQw4w9WgXcQ"));
        assert!(is_youtube_video("https://youtu.be/dQw4w9WgXcQ"));
        assert!(is_youtube_video("https://www.youtube.com/shorts/abcDEF12345"));
        assert!(!is_youtube_video("https://www.youtube.com/@channel"));
    }

    #[test]
    fn test_classify_partitions_without_skipping() {
        // adjacent platform links must all be routed
        let general = strings(&[
            "https://www.reddit.com/r/rust/comments/a1/one/",
            "https://www.reddit.com/r/rust/comments/a2/two/",
            "https://blog.com/post",
            "https://youtu.be/dQw4w9WgXcQ",
        ]);
        let classified = classify(&general, &[], &[], "");
        assert_eq!(classified.general, strings(&["https://blog.com/post"]));
        assert_eq!(classified.reddit.len(), 2);
        assert_eq!(classified.youtube, strings(&["https://youtu.be/dQw4w9WgXcQ"]));
    }

    #[test]
    fn test_classify_uses_tags_and_stray_matches() {
        let tagged_reddit = strings(&[
            "https://www.reddit.com/r/rust/comments/a1/one/",
            "https://www.reddit.com/r/rust/",
        ]);
        let stray = "I also liked https://www.reddit.com/r/rust/comments/a1/one/ and \
                     https://www.youtube.com/watch?v=dQw4w9WgXcQ.";
        let classified = classify(&[], &tagged_reddit, &[], stray);

        assert_eq!(
            classified.reddit,
            strings(&["https://www.reddit.com/r/rust/comments/a1/one/"])
        );
        assert_eq!(
            classified.youtube,
            strings(&["https://www.youtube.com/watch?v=dQw4w9WgXcQ"])
        );
        assert_eq!(classified.general, strings(&["https://www.reddit.com/r/rust/"]));
    }
}
