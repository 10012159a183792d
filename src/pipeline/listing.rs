//! Listing Discoverer
//!
//! Derives candidate article URLs from a source's RSS feeds or from
//! paginated HTML listing pages, bounded by `max_candidates`.

use scraper::{Html, Selector};
use std::collections::HashSet;
use tracing::{info, warn};

use crate::config::IngestionConfig;
use crate::pipeline::fetcher::HttpFetcher;
use crate::pipeline::registry::{accepts_url, ListingMode, Source};

/// Discover candidate article URLs for a source, via whichever listing
/// mode the registry declares.
pub async fn discover(
    fetcher: &HttpFetcher,
    source: &Source,
    ingestion: &IngestionConfig,
) -> Vec<String> {
    match &source.listing {
        ListingMode::Rss { feed_urls } => {
            discover_rss(fetcher, feed_urls, ingestion.max_listing_candidates).await
        }
        ListingMode::PaginatedHtml { listing_roots } => {
            discover_paginated(fetcher, source.base_url, listing_roots, ingestion).await
        }
    }
}

async fn discover_rss(fetcher: &HttpFetcher, feed_urls: &[String], max: usize) -> Vec<String> {
    let mut links = Vec::new();
    let mut seen = HashSet::new();

    for feed_url in feed_urls {
        info!(url = %feed_url, "fetching RSS feed");
        let body = match fetcher.fetch(feed_url).await {
            Ok(body) => body,
            Err(e) => {
                warn!(url = %feed_url, error = %e, "failed to fetch feed, skipping");
                continue;
            }
        };

        let parsed = match feed_rs::parser::parse(body.as_bytes()) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(url = %feed_url, error = %e, "malformed feed, skipping");
                continue;
            }
        };

        for entry in parsed.entries {
            let Some(link) = entry.links.first().map(|l| l.href.clone()) else {
                continue;
            };
            if seen.insert(link.clone()) {
                links.push(link);
                if links.len() >= max {
                    return links;
                }
            }
        }
    }

    info!(count = links.len(), "discovered RSS article URLs");
    links
}

async fn discover_paginated(
    fetcher: &HttpFetcher,
    base_url: &str,
    listing_roots: &[String],
    ingestion: &IngestionConfig,
) -> Vec<String> {
    let link_selector = Selector::parse("a[href]").unwrap();
    let base_host = reqwest::Url::parse(base_url).ok().and_then(|u| u.host_str().map(String::from));

    let mut article_urls = HashSet::new();

    for root in listing_roots {
        let mut stagnant = 0u32;
        let mut prev_total = 0usize;

        for page in 1..=ingestion.max_pages {
            if article_urls.len() >= ingestion.max_listing_candidates {
                break;
            }

            let page_url = format!("{}?page={}", root, page);
            let body = match fetcher.fetch(&page_url).await {
                Ok(body) => body,
                Err(e) => {
                    warn!(url = %page_url, error = %e, "failed to fetch listing page");
                    break;
                }
            };

            let document = Html::parse_document(&body);
            for element in document.select(&link_selector) {
                let Some(href) = element.value().attr("href") else {
                    continue;
                };
                let Ok(full_url) = reqwest::Url::parse(base_url).and_then(|b| b.join(href)) else {
                    continue;
                };
                if full_url.host_str().map(String::from) != base_host {
                    continue;
                }
                let full_url = full_url.to_string();
                if accepts_url(&full_url) {
                    article_urls.insert(full_url);
                }
            }

            let current_total = article_urls.len();
            if current_total == prev_total {
                stagnant += 1;
            } else {
                stagnant = 0;
            }
            prev_total = current_total;

            if stagnant >= ingestion.stagnation_threshold {
                info!(source = %base_url, page, "stopping early after stagnant pages");
                break;
            }
        }
    }

    let mut urls: Vec<String> = article_urls.into_iter().collect();
    urls.truncate(ingestion.max_listing_candidates);
    info!(count = urls.len(), source = %base_url, "discovered listing URLs");
    urls
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rss_dedup_keeps_first_occurrence_order() {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for link in ["a", "b", "a", "c"] {
            if seen.insert(link) {
                out.push(link);
            }
        }
        assert_eq!(out, vec!["a", "b", "c"]);
    }
}
