//! Summarizer Adapter
//!
//! Turns a cluster of raw articles into one objectified article: a short
//! summary, a longer summary, and a category drawn from a fixed Turkish
//! taxonomy. Talks to an external LLM through a rotating pool of API
//! keys with bounded retries; a key that gets rate-limited is parked and
//! the next one in the pool takes over. Exhausting every retry never
//! fails the pipeline — it degrades to a placeholder string instead.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU32, Ordering};
use tokio::sync::Mutex;
use tokio::time::sleep;
use tracing::warn;
use uuid::Uuid;

use crate::config::SummarizerConfig;
use crate::pipeline::store::RawArticle;

pub const ERROR_PLACEHOLDER: &str = "Error during generation";

pub const CATEGORIES: &[&str] = &[
    "Siyaset",
    "Eğlence",
    "Spor",
    "Teknoloji",
    "Sağlık",
    "Çevre",
    "Bilim",
    "Eğitim",
    "Ekonomi",
    "Seyahat",
    "Moda",
    "Kültür",
    "Suç",
    "Yemek",
    "Yaşam Tarzı",
    "İş Dünyası",
    "Dünya Haberleri",
    "Oyun",
    "Otomotiv",
    "Sanat",
    "Tarih",
    "Uzay",
    "İlişkiler",
    "Din",
    "Ruh Sağlığı",
    "Magazin",
    "Genel",
];

const FALLBACK_CATEGORY: &str = "Genel";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectifiedArticle {
    pub article_id: String,
    pub title: String,
    #[serde(default)]
    pub content: String,
    pub summary: String,
    pub longer_summary: String,
    pub category: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub source: Vec<String>,
    pub location: Option<String>,
    #[serde(default)]
    pub popularity_score: u32,
    pub created_at: Option<String>,
    pub image: Option<String>,
    pub priority: Option<u32>,
}

/// Abstraction over the external generation call, so the retry/rotation
/// plumbing here never depends on a specific provider's request shape.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn generate(&self, api_key: &str, prompt: &str) -> anyhow::Result<String>;
}

/// HTTP-backed client posting to a single configurable endpoint, the key
/// passed as a bearer token. Swappable for a test double.
pub struct HttpLlmClient {
    endpoint: String,
    http: reqwest::Client,
}

impl HttpLlmClient {
    pub fn new(endpoint: String) -> Self {
        Self {
            endpoint,
            http: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl LlmClient for HttpLlmClient {
    async fn generate(&self, api_key: &str, prompt: &str) -> anyhow::Result<String> {
        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .json(&serde_json::json!({ "prompt": prompt }))
            .send()
            .await?;

        if response.status().as_u16() == 429 {
            anyhow::bail!("429 rate limited");
        }
        let response = response.error_for_status()?;
        let body: serde_json::Value = response.json().await?;
        Ok(body
            .get("text")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string())
    }
}

struct KeySlot {
    key: String,
    usage_count: AtomicU32,
    error_count: AtomicU32,
}

/// Round-robin pool of API keys with per-key usage/error counters.
pub struct KeyPool {
    slots: Vec<KeySlot>,
    cursor: Mutex<usize>,
}

impl KeyPool {
    pub fn new(keys: Vec<String>) -> Self {
        let slots = keys
            .into_iter()
            .map(|key| KeySlot {
                key,
                usage_count: AtomicU32::new(0),
                error_count: AtomicU32::new(0),
            })
            .collect();
        Self {
            slots,
            cursor: Mutex::new(0),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    async fn next_key(&self) -> Option<&str> {
        if self.slots.is_empty() {
            return None;
        }
        let mut cursor = self.cursor.lock().await;
        let idx = *cursor % self.slots.len();
        *cursor = (*cursor + 1) % self.slots.len();
        let slot = &self.slots[idx];
        slot.usage_count.fetch_add(1, Ordering::Relaxed);
        Some(slot.key.as_str())
    }

    fn record_error(&self, key: &str) {
        if let Some(slot) = self.slots.iter().find(|s| s.key == key) {
            slot.error_count.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// The key with the fewest errors, breaking ties by least used. Spec
    /// §4.9: the final retry picks the healthiest key instead of just the
    /// next one in rotation.
    fn healthiest(&self) -> Option<&str> {
        let slot = self.slots.iter().min_by_key(|s| {
            (
                s.error_count.load(Ordering::Relaxed),
                s.usage_count.load(Ordering::Relaxed),
            )
        })?;
        slot.usage_count.fetch_add(1, Ordering::Relaxed);
        Some(slot.key.as_str())
    }
}

pub struct SummarizerAdapter {
    client: Box<dyn LlmClient>,
    keys: KeyPool,
    config: SummarizerConfig,
}

impl SummarizerAdapter {
    pub fn new(client: Box<dyn LlmClient>, keys: KeyPool, config: SummarizerConfig) -> Self {
        Self { client, keys, config }
    }

    /// Generate text for a prompt, rotating keys on rate-limit and
    /// retrying on the configured backoff schedule. Never returns an
    /// error — an exhausted retry budget yields the placeholder string.
    pub async fn generate(&self, prompt: &str) -> String {
        if self.keys.is_empty() {
            warn!("no summarizer API keys configured, returning placeholder");
            return ERROR_PLACEHOLDER.to_string();
        }

        let mut attempt = 0;
        loop {
            let on_final_attempt = attempt >= self.config.max_retries;
            let api_key = if on_final_attempt {
                self.keys.healthiest()
            } else {
                self.keys.next_key().await
            };
            let Some(api_key) = api_key else {
                return ERROR_PLACEHOLDER.to_string();
            };

            match self.client.generate(api_key, prompt).await {
                Ok(text) => return text,
                Err(e) => {
                    warn!(attempt, error = %e, "generation attempt failed");
                    self.keys.record_error(api_key);
                    if on_final_attempt {
                        return ERROR_PLACEHOLDER.to_string();
                    }
                    let delay = self
                        .config
                        .backoff_schedule
                        .get(attempt)
                        .copied()
                        .unwrap_or_else(|| self.config.backoff_schedule.last().copied().unwrap());
                    sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    fn classify(&self, text: &str) -> String {
        text.lines()
            .find_map(|line| {
                CATEGORIES
                    .iter()
                    .find(|c| line.trim() == **c)
                    .map(|c| c.to_string())
            })
            .unwrap_or_else(|| FALLBACK_CATEGORY.to_string())
    }

    /// Build one objectified article from a cluster's raw members. Skips
    /// clusters with fewer than two articles that actually have content,
    /// returning `None` — a cluster that thin isn't worth objectifying.
    pub async fn objectify_cluster(&self, articles: &[RawArticle]) -> Option<ObjectifiedArticle> {
        let with_content: Vec<&RawArticle> = articles
            .iter()
            .filter(|a| !a.content.trim().is_empty())
            .collect();

        if with_content.len() < 2 {
            return None;
        }

        let combined = with_content
            .iter()
            .map(|a| format!("{}\n{}", a.title, a.content))
            .collect::<Vec<_>>()
            .join("\n\n---\n\n");

        let title_prompt = format!(
            "Aşağıdaki haber kümesi için 2-4 kelimelik nesnel bir başlık yaz:\n\n{}",
            combined
        );
        let summary_prompt = format!(
            "Aşağıdaki haber kümesi için tek cümlelik kısa bir özet yaz:\n\n{}",
            combined
        );
        let longer_summary_prompt = format!(
            "Aşağıdaki haber kümesi için birkaç paragraflık ayrıntılı bir özet yaz:\n\n{}",
            combined
        );
        let category_prompt = format!(
            "Aşağıdaki kategorilerden sadece birini seç: {}.\n\nHaber:\n{}",
            CATEGORIES.join(", "),
            combined
        );

        let title = self.generate(&title_prompt).await;
        let summary = self.generate(&summary_prompt).await;
        let longer_summary = self.generate(&longer_summary_prompt).await;
        let category_response = self.generate(&category_prompt).await;
        let category = self.classify(&category_response);

        let primary = with_content[0];
        Some(ObjectifiedArticle {
            article_id: Uuid::new_v4().to_string(),
            title,
            content: String::new(),
            summary,
            longer_summary,
            category,
            tags: Vec::new(),
            source: with_content.iter().map(|a| a.url.clone()).collect(),
            location: None,
            popularity_score: 0,
            created_at: Some(chrono::Utc::now().to_rfc3339()),
            image: primary.image.clone(),
            priority: None,
        })
    }
}
