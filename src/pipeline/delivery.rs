//! Delivery
//!
//! Ships an objectified article to the external backend as a single
//! multipart POST (a JSON "data" field, plus an optional image part).
//! Fire-and-forget: a delivery failure is logged and otherwise discarded
//! rather than failing the pipeline cycle, since the next cycle doesn't
//! retry individual deliveries and the source articles were already
//! durably grouped on disk.

use reqwest::multipart::{Form, Part};
use reqwest::Client;
use tracing::{info, warn};

use crate::pipeline::summarizer::ObjectifiedArticle;

pub struct DeliveryClient {
    http: Client,
    insert_url: Option<String>,
}

impl DeliveryClient {
    pub fn new(insert_url: Option<String>) -> Self {
        Self {
            http: Client::new(),
            insert_url,
        }
    }

    /// Truncate a field to `max_len` chars, matching the backend's column
    /// limits.
    fn truncate_field(value: &str, max_len: usize) -> String {
        if value.chars().count() > max_len {
            value.chars().take(max_len).collect()
        } else {
            value.to_string()
        }
    }

    fn prepare(article: &ObjectifiedArticle) -> ObjectifiedArticle {
        let mut prepared = article.clone();
        prepared.article_id = Self::truncate_field(&prepared.article_id, 100);
        prepared.category = Self::truncate_field(&prepared.category, 100);
        if let Some(location) = &prepared.location {
            prepared.location = Some(Self::truncate_field(location, 100));
        }
        prepared
    }

    /// Deliver one objectified article, with an optional image byte blob.
    /// Never returns an error to the caller — failures are logged and
    /// swallowed.
    pub async fn deliver(&self, article: &ObjectifiedArticle, image_bytes: Option<Vec<u8>>) {
        let Some(url) = &self.insert_url else {
            info!(article_id = %article.article_id, "no delivery URL configured, skipping");
            return;
        };

        let prepared = Self::prepare(article);
        let Ok(data_json) = serde_json::to_string(&prepared) else {
            warn!(article_id = %article.article_id, "failed to serialize article for delivery");
            return;
        };

        let mut form = Form::new().text("data", data_json);
        if let Some(bytes) = image_bytes {
            form = form.part("image", Part::bytes(bytes).file_name("image.jpg"));
        }

        match self.http.post(url).multipart(form).send().await {
            Ok(response) if response.status().as_u16() == 201 => {
                info!(article_id = %article.article_id, "delivered article");
            }
            Ok(response) => {
                warn!(
                    article_id = %article.article_id,
                    status = response.status().as_u16(),
                    "delivery rejected by backend"
                );
            }
            Err(e) => {
                warn!(article_id = %article.article_id, error = %e, "delivery request failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_article() -> ObjectifiedArticle {
        ObjectifiedArticle {
            article_id: "a".repeat(150),
            title: "Title".to_string(),
            content: String::new(),
            summary: "summary".to_string(),
            longer_summary: "longer summary".to_string(),
            category: "Genel".to_string(),
            tags: vec![],
            source: vec!["https://example.com/haber/1".to_string()],
            location: Some("b".repeat(150)),
            popularity_score: 0,
            created_at: None,
            image: None,
            priority: None,
        }
    }

    #[test]
    fn prepare_truncates_long_fields() {
        let article = sample_article();
        let prepared = DeliveryClient::prepare(&article);
        assert_eq!(prepared.article_id.len(), 100);
        assert_eq!(prepared.location.unwrap().len(), 100);
    }

    #[tokio::test]
    async fn deliver_without_url_is_a_silent_no_op() {
        let client = DeliveryClient::new(None);
        client.deliver(&sample_article(), None).await;
    }
}
