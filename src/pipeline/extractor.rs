//! Article Extractor
//!
//! Given a fetched HTML body, pulls out title/content/date/image using a
//! per-source selector set, falling back to JSON-LD and then a generic
//! selector chain. Detects blocked pages before attempting content
//! extraction.

use chrono::Utc;
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::pipeline::registry::{Extractor, Source};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedArticle {
    pub title: String,
    pub content: String,
    pub url: String,
    pub source: String,
    pub genre: String,
    pub article_date: String,
    pub request_date: String,
    pub image: Option<String>,
    pub is_empty: bool,
    pub blocked: bool,
    pub error: Option<String>,
}

const BLOCKED_MARKERS: &[&str] = &["blocked", "access denied"];

/// Turkish path-segment -> English genre label, recovered from the original
/// prototype's `get_genre_from_url`. A secondary, friendlier label kept
/// separate from `RawArticle.genre` (which stays the literal first path
/// segment) — useful for operator-facing logging, not persisted.
const GENRE_MAP: &[(&str, &str)] = &[
    ("spor", "Sports"),
    ("ekonomi", "Economy"),
    ("siyaset", "Politics"),
    ("gundem", "Current Affairs"),
    ("dunya", "World"),
    ("teknoloji", "Technology"),
    ("yasam", "Life"),
    ("saglik", "Health"),
    ("kultur-sanat", "Culture & Art"),
    ("egitim", "Education"),
    ("magazin", "Celebrity"),
    ("cevre", "Environment"),
    ("bilim", "Science"),
    ("otomobil", "Automotive"),
    ("turkiye", "Turkey"),
    ("sondakika", "Breaking News"),
    ("son-dakika", "Breaking News"),
    ("yazarlar", "Columnists"),
    ("video", "Video"),
    ("foto", "Photo"),
    ("seyahat", "Travel"),
    ("moda", "Fashion"),
    ("din", "Religion"),
    ("tarih", "History"),
    ("uzay", "Space"),
    ("oyun", "Gaming"),
    ("sanat", "Art"),
];

/// Friendly English genre label for a path segment, if the map has one.
pub fn friendly_genre(path_segment: &str) -> Option<&'static str> {
    GENRE_MAP
        .iter()
        .find(|(key, _)| *key == path_segment)
        .map(|(_, label)| *label)
}

/// An `ExtractedArticle` for a URL whose fetch itself failed (timeout,
/// connection refused, non-2xx). Spec §7: still written to the store with
/// `error` set and `is_empty=true`, rather than silently dropped.
pub fn network_error(source: &Source, url: &str, message: &str) -> ExtractedArticle {
    let request_date = Utc::now().to_rfc3339();
    ExtractedArticle {
        title: String::new(),
        content: String::new(),
        url: url.to_string(),
        source: source.slug.to_string(),
        genre: genre_for(source, url),
        article_date: request_date.clone(),
        request_date,
        image: None,
        is_empty: true,
        blocked: false,
        error: Some(message.to_string()),
    }
}

/// Extract an article from its fetched HTML body.
pub fn extract(source: &Source, url: &str, html: &str) -> ExtractedArticle {
    let document = Html::parse_document(html);
    let request_date = Utc::now().to_rfc3339();

    let mut title = select_first_text(&document, "h1, h2")
        .or_else(|| select_attr(&document, r#"meta[property="og:title"]"#, "content"))
        .or_else(|| select_attr(&document, r#"meta[name="title"]"#, "content"))
        .unwrap_or_else(|| "Untitled".to_string());

    let lowered_title = title.to_lowercase();
    if BLOCKED_MARKERS.iter().any(|m| lowered_title.contains(m)) {
        warn!(url, "page appears blocked by source");
        return ExtractedArticle {
            title,
            content: String::new(),
            url: url.to_string(),
            source: source.slug.to_string(),
            genre: "unknown".to_string(),
            article_date: request_date.clone(),
            request_date,
            image: None,
            is_empty: true,
            blocked: true,
            error: Some("Blocked by site".to_string()),
        };
    }

    // Dispatch order (spec §4.4): a source with its own custom selector set
    // skips JSON-LD entirely and goes straight to its dedicated selectors;
    // JSON-LD is only tried for sources left on the generic/JSON-LD path.
    let has_custom_extractor = !matches!(source.extractor, Extractor::Generic | Extractor::JsonLd);

    if !has_custom_extractor {
        if let Some(json_ld) = extract_json_ld(&document) {
            if let Some(article) = from_json_ld(source, url, &json_ld, &request_date) {
                return article;
            }
        }
    }

    if source.extractor == Extractor::Sendika {
        if let Some(sendika_title) = select_first_text(&document, "h3.title") {
            title = sendika_title;
        }
    }

    let content = extract_content(&document, source.extractor);
    let is_empty = content.trim().is_empty();
    let genre = genre_for(source, url);
    if matches!(source.extractor, Extractor::Generic) {
        if let Some(label) = friendly_genre(&genre) {
            tracing::debug!(genre = %genre, label, "friendly genre label");
        }
    }
    let image = select_attr(&document, r#"meta[property="og:image"]"#, "content")
        .or_else(|| select_attr(&document, r#"meta[name="twitter:image"]"#, "content"));
    let article_date = select_attr(&document, r#"meta[property="article:published_time"]"#, "content")
        .or_else(|| select_attr(&document, r#"meta[name="date"]"#, "content"))
        .or_else(|| select_attr(&document, r#"meta[name="publish_date"]"#, "content"))
        .or_else(|| select_attr(&document, r#"meta[name="article:modified_time"]"#, "content"))
        .unwrap_or_else(|| request_date.clone());

    ExtractedArticle {
        title,
        content,
        url: url.to_string(),
        source: source.slug.to_string(),
        genre,
        article_date,
        request_date,
        image,
        is_empty,
        blocked: false,
        error: None,
    }
}

fn extract_content(document: &Html, extractor: Extractor) -> String {
    let selectors: &[&str] = match extractor {
        Extractor::CnnTurk => &["section.detail-content p"],
        Extractor::Sabah => &[
            "div.newsDetailText div.newsBox p",
            "div.page.flex-grow-1 p",
            "div.page[data-page] p",
            "main p",
        ],
        Extractor::T24 => &["div[class*='3QVZl'] p"],
        Extractor::Ntv => &["div[class*='content-news-tag-selector'] p"],
        Extractor::Nefes => &["div.post-content p", "article p, main p"],
        Extractor::HaberSol => &[
            "div.article-content div.font-mukta p",
            "article p, div.field__item p, main p",
        ],
        Extractor::GazeteDuvar => &["div.content-text p", "article p, main p, div[class*='article-body'] p"],
        Extractor::Evrensel => &["div[class^='news-'] p", "div[class*='content'] p, article p, main p"],
        Extractor::Sendika => &["div#news p", "article p, main p"],
        Extractor::JsonLd | Extractor::Generic => &[
            "article p, div[class*='content'] p, div[class*='article-body'] p, div[class*='news'] p",
        ],
    };

    for selector_str in selectors {
        let paragraphs = select_all_text(document, selector_str);
        if !paragraphs.is_empty() {
            return paragraphs.join(" ");
        }
    }
    String::new()
}

fn genre_for(source: &Source, url: &str) -> String {
    if let Some(fixed) = source.genre_override {
        return fixed.to_string();
    }
    let Ok(parsed) = reqwest::Url::parse(url) else {
        return "unknown".to_string();
    };
    parsed
        .path_segments()
        .and_then(|mut segs| segs.next())
        .filter(|s| !s.is_empty())
        .unwrap_or("unknown")
        .to_lowercase()
}

fn extract_json_ld(document: &Html) -> Option<Value> {
    let selector = Selector::parse(r#"script[type="application/ld+json"]"#).ok()?;
    let node = document.select(&selector).next()?;
    let raw = node.text().collect::<String>();
    serde_json::from_str(&raw).ok()
}

fn from_json_ld(
    source: &Source,
    url: &str,
    data: &Value,
    request_date: &str,
) -> Option<ExtractedArticle> {
    let title = data.get("headline")?.as_str()?.to_string();
    let content = data
        .get("articleBody")
        .and_then(Value::as_str)
        .unwrap_or("")
        .trim()
        .to_string();
    let article_date = data
        .get("datePublished")
        .and_then(Value::as_str)
        .unwrap_or(request_date)
        .to_string();
    let is_empty = content.is_empty();

    Some(ExtractedArticle {
        title,
        content,
        url: url.to_string(),
        source: source.slug.to_string(),
        genre: genre_for(source, url),
        article_date,
        request_date: request_date.to_string(),
        image: None,
        is_empty,
        blocked: false,
        error: None,
    })
}

fn select_first_text(document: &Html, selector_str: &str) -> Option<String> {
    let selector = Selector::parse(selector_str).ok()?;
    document
        .select(&selector)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}

fn select_all_text(document: &Html, selector_str: &str) -> Vec<String> {
    let Ok(selector) = Selector::parse(selector_str) else {
        return Vec::new();
    };
    document
        .select(&selector)
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn select_attr(document: &Html, selector_str: &str, attr: &str) -> Option<String> {
    let selector = Selector::parse(selector_str).ok()?;
    document
        .select(&selector)
        .next()
        .and_then(|el| el.value().attr(attr))
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::registry::{default_sources, ListingMode};

    fn generic_source() -> Source {
        Source {
            slug: "generic_test",
            display_name: "Generic Test",
            base_url: "https://example.com/",
            listing: ListingMode::PaginatedHtml { listing_roots: vec![] },
            extractor: Extractor::Generic,
            genre_override: None,
        }
    }

    #[test]
    fn blocked_page_short_circuits_extraction() {
        let source = generic_source();
        let html = "<html><body><h1>Access Denied</h1></body></html>";
        let article = extract(&source, "https://example.com/haber/1", html);
        assert!(article.blocked);
        assert!(article.is_empty);
        assert_eq!(article.error.as_deref(), Some("Blocked by site"));
    }

    #[test]
    fn friendly_genre_maps_known_segments() {
        assert_eq!(friendly_genre("spor"), Some("Sports"));
        assert_eq!(friendly_genre("not-a-real-segment"), None);
    }

    #[test]
    fn generic_extraction_picks_up_content_div() {
        let source = generic_source();
        let html = r#"<html><body><h1>Some Title</h1><div class="content"><p>Hello</p><p>World</p></div></body></html>"#;
        let article = extract(&source, "https://example.com/gundem/2", html);
        assert_eq!(article.title, "Some Title");
        assert_eq!(article.content, "Hello World");
        assert!(!article.is_empty);
        assert_eq!(article.genre, "gundem");
    }

    #[test]
    fn generic_extraction_picks_up_article_tag_paragraphs() {
        let source = generic_source();
        let html = r#"<html><body><h1>Article Tag Title</h1><article><p>First</p><p>Second</p></article></body></html>"#;
        let article = extract(&source, "https://example.com/gundem/3", html);
        assert_eq!(article.content, "First Second");
        assert!(!article.is_empty);
    }

    #[test]
    fn title_falls_back_to_og_title_meta() {
        let source = generic_source();
        let html = r#"<html><head><meta property="og:title" content="Meta Title"></head><body><div class="content"><p>Body text here</p></div></body></html>"#;
        let article = extract(&source, "https://example.com/gundem/4", html);
        assert_eq!(article.title, "Meta Title");
    }

    #[test]
    fn title_falls_back_to_name_title_meta_when_no_og_title() {
        let source = generic_source();
        let html = r#"<html><head><meta name="title" content="Named Meta Title"></head><body><div class="content"><p>Body text here</p></div></body></html>"#;
        let article = extract(&source, "https://example.com/gundem/5", html);
        assert_eq!(article.title, "Named Meta Title");
    }

    #[test]
    fn genre_is_lowercased() {
        let source = generic_source();
        let html = r#"<html><body><h1>T</h1><div class="content"><p>X</p></div></body></html>"#;
        let article = extract(&source, "https://example.com/GUNDEM/1", html);
        assert_eq!(article.genre, "gundem");
    }

    #[test]
    fn haberturk_genre_is_always_unknown() {
        let sources = default_sources();
        let haberturk = sources.iter().find(|s| s.slug == "haberturk").unwrap();
        let html = r#"<html><body><h1>T</h1><div class="content"><p>X</p></div></body></html>"#;
        let article = extract(haberturk, "https://www.haberturk.com/ekonomi/1", html);
        assert_eq!(article.genre, "unknown");
    }

    #[test]
    fn network_error_yields_empty_article_with_message() {
        let source = generic_source();
        let article = network_error(&source, "https://example.com/haber/9", "request timed out");
        assert!(article.is_empty);
        assert!(article.content.is_empty());
        assert_eq!(article.error.as_deref(), Some("request timed out"));
        assert_eq!(article.genre, "haber");
    }

    #[test]
    fn json_ld_headline_and_body_take_priority() {
        let source = generic_source();
        let html = r#"<html><head><script type="application/ld+json">
            {"headline": "LD Title", "articleBody": "LD body text", "datePublished": "2024-01-01T00:00:00Z"}
        </script></head><body><h1>Other Title</h1></body></html>"#;
        let article = extract(&source, "https://example.com/dunya/3", html);
        assert_eq!(article.title, "LD Title");
        assert_eq!(article.content, "LD body text");
        assert_eq!(article.article_date, "2024-01-01T00:00:00Z");
    }
}
