//! Exercises the Summarizer Adapter and Delivery Client together: a
//! qualifying cluster gets objectified and then actually posted to a
//! mocked backend as a multipart form.

use async_trait::async_trait;
use uuid::Uuid;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use veritas_scraper::config::SummarizerConfig;
use veritas_scraper::pipeline::delivery::DeliveryClient;
use veritas_scraper::pipeline::store::RawArticle;
use veritas_scraper::pipeline::summarizer::{KeyPool, LlmClient, SummarizerAdapter};

struct EchoClient;

#[async_trait]
impl LlmClient for EchoClient {
    async fn generate(&self, _api_key: &str, _prompt: &str) -> anyhow::Result<String> {
        Ok("Genel".to_string())
    }
}

fn article(title: &str, content: &str, url: &str) -> RawArticle {
    RawArticle {
        id: Uuid::new_v4().to_string(),
        title: title.to_string(),
        content: content.to_string(),
        url: url.to_string(),
        source: "ntv".to_string(),
        genre: "gundem".to_string(),
        article_date: "2026-07-27".to_string(),
        request_date: "2026-07-27".to_string(),
        image: None,
        is_empty: false,
        error: None,
    }
}

#[tokio::test]
async fn qualifying_cluster_is_objectified_and_delivered() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/insert"))
        .respond_with(ResponseTemplate::new(201))
        .mount(&server)
        .await;

    let config = SummarizerConfig {
        api_keys: vec!["key-a".to_string()],
        max_retries: 3,
        backoff_schedule: vec![std::time::Duration::from_millis(1)],
    };
    let keys = KeyPool::new(config.api_keys.clone());
    let summarizer = SummarizerAdapter::new(Box::new(EchoClient), keys, config);

    let articles = vec![
        article("Deprem oldu", "Büyük bir deprem meydana geldi.", "https://example.com/gundem/1"),
        article("Deprem haberi", "Sabah saatlerinde deprem oldu.", "https://example.com/gundem/2"),
    ];

    let objectified = summarizer.objectify_cluster(&articles).await.unwrap();
    assert_eq!(objectified.source.len(), 2);
    assert_eq!(objectified.category, "Genel");
    assert!(objectified.created_at.is_some());

    let delivery = DeliveryClient::new(Some(format!("{}/insert", server.uri())));
    delivery.deliver(&objectified, None).await;
}
