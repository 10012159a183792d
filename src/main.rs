use tracing_subscriber::EnvFilter;

use veritas_scraper::config::AppConfig;
use veritas_scraper::pipeline::delivery::DeliveryClient;
use veritas_scraper::pipeline::orchestrator::Orchestrator;
use veritas_scraper::pipeline::summarizer::{HttpLlmClient, KeyPool, SummarizerAdapter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .json()
        .init();

    let config = AppConfig::from_env()?;
    tracing::info!(environment = ?config.environment, "loaded configuration");

    let llm_endpoint = std::env::var("SUMMARIZER_ENDPOINT")
        .unwrap_or_else(|_| "https://generativelanguage.googleapis.com/v1/models/gemini:generate".to_string());
    let llm_client = Box::new(HttpLlmClient::new(llm_endpoint));
    let key_pool = KeyPool::new(config.summarizer.api_keys.clone());
    let summarizer = SummarizerAdapter::new(llm_client, key_pool, config.summarizer.clone());
    let delivery = DeliveryClient::new(config.delivery.insert_url.clone());

    let orchestrator = Orchestrator::new(config, summarizer, delivery)?;
    orchestrator.run_forever().await;

    Ok(())
}
