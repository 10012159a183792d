//! Application configuration module
//!
//! Provides centralized, environment-aware configuration with validation.

use std::time::Duration;
use thiserror::Error;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required configuration: {0}")]
    MissingRequired(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Production requires {0} to be set")]
    ProductionRequired(String),
}

/// Application environment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

impl Environment {
    pub fn from_env() -> Self {
        match std::env::var("ENVIRONMENT")
            .unwrap_or_default()
            .to_lowercase()
            .as_str()
        {
            "production" | "prod" => Self::Production,
            "staging" | "stage" => Self::Staging,
            _ => Self::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

/// Complete application configuration
#[derive(Clone)]
pub struct AppConfig {
    pub environment: Environment,
    pub paths: PathsConfig,
    pub clustering: ClusteringConfig,
    pub ingestion: IngestionConfig,
    pub encoder: EncoderConfig,
    pub summarizer: SummarizerConfig,
    pub orchestrator: OrchestratorConfig,
    pub delivery: DeliveryConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let environment = Environment::from_env();

        let config = Self {
            environment,
            paths: PathsConfig::from_env(),
            clustering: ClusteringConfig::from_env(),
            ingestion: IngestionConfig::from_env(),
            encoder: EncoderConfig::from_env(),
            summarizer: SummarizerConfig::from_env(environment)?,
            orchestrator: OrchestratorConfig::from_env(),
            delivery: DeliveryConfig::from_env(),
        };

        if environment.is_production() {
            config.validate_production()?;
        }

        Ok(config)
    }

    fn validate_production(&self) -> Result<(), ConfigError> {
        if self.summarizer.api_keys.is_empty() {
            return Err(ConfigError::ProductionRequired(
                "SUMMARIZER_API_KEYS".to_string(),
            ));
        }
        Ok(())
    }
}

/// Base directory and the subdirectory layout beneath it
#[derive(Clone)]
pub struct PathsConfig {
    pub base_dir: std::path::PathBuf,
}

impl PathsConfig {
    pub fn from_env() -> Self {
        Self {
            base_dir: std::env::var("BASE_DIR")
                .map(std::path::PathBuf::from)
                .unwrap_or_else(|_| std::path::PathBuf::from("./veritas_data")),
        }
    }

    pub fn pulled_articles_dir(&self) -> std::path::PathBuf {
        self.base_dir.join("pulled_articles")
    }

    pub fn grouped_articles_dir(&self) -> std::path::PathBuf {
        self.base_dir.join("grouped_articles_updated")
    }

    pub fn still_unmatched_dir(&self) -> std::path::PathBuf {
        self.grouped_articles_dir().join("still_unmatched")
    }

    pub fn embedding_cache_file(&self) -> std::path::PathBuf {
        self.base_dir.join("embedding_cache.json")
    }

    pub fn scraper_log_file(&self) -> std::path::PathBuf {
        self.base_dir.join("scraper_log.txt")
    }

    pub fn new_articles_log_file(&self) -> std::path::PathBuf {
        self.base_dir.join("new_articles_log.txt")
    }

    pub fn objectified_dir(&self) -> std::path::PathBuf {
        self.base_dir.join("objectified_jsons")
    }
}

/// Similarity thresholds and clustering knobs (spec canonical values, §9)
#[derive(Clone, Copy)]
pub struct ClusteringConfig {
    pub tau_match: f32,
    pub tau_internal: f32,
    pub min_word_count: usize,
    pub encode_batch_size: usize,
}

impl ClusteringConfig {
    pub fn from_env() -> Self {
        Self {
            tau_match: std::env::var("TAU_MATCH")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(0.75),
            tau_internal: std::env::var("TAU_INTERNAL")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(0.70),
            min_word_count: std::env::var("CLUSTERING_MIN_WORD_COUNT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(50),
            encode_batch_size: std::env::var("ENCODE_BATCH_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(32),
        }
    }
}

/// Listing/fetch knobs shared across all sources
#[derive(Clone, Copy)]
pub struct IngestionConfig {
    pub max_listing_candidates: usize,
    pub max_pages: u32,
    pub stagnation_threshold: u32,
    pub per_source_concurrency: usize,
    pub max_in_flight_sockets: usize,
    pub fetch_timeout: Duration,
}

impl IngestionConfig {
    pub fn from_env() -> Self {
        Self {
            max_listing_candidates: std::env::var("MAX_LISTING_CANDIDATES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(300),
            max_pages: std::env::var("MAX_LISTING_PAGES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(10),
            stagnation_threshold: std::env::var("STAGNATION_THRESHOLD")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(6),
            per_source_concurrency: std::env::var("PER_SOURCE_CONCURRENCY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(8),
            max_in_flight_sockets: std::env::var("MAX_IN_FLIGHT_SOCKETS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(64),
            fetch_timeout: Duration::from_secs(
                std::env::var("FETCH_TIMEOUT_SECS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(10),
            ),
        }
    }
}

/// Sentence-encoder configuration
#[derive(Clone)]
pub struct EncoderConfig {
    pub model_name: String,
    pub max_text_length: usize,
}

impl EncoderConfig {
    pub fn from_env() -> Self {
        Self {
            model_name: std::env::var("ENCODER_MODEL_NAME")
                .unwrap_or_else(|_| "paraphrase-multilingual-MiniLM-L12-v2".to_string()),
            max_text_length: std::env::var("ENCODER_MAX_TEXT_LENGTH")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(2000),
        }
    }
}

/// LLM summarizer configuration: a rotation pool of API keys, not a single key
#[derive(Clone)]
pub struct SummarizerConfig {
    pub api_keys: Vec<String>,
    pub max_retries: u32,
    pub backoff_schedule: Vec<Duration>,
}

impl SummarizerConfig {
    pub fn from_env(env: Environment) -> Result<Self, ConfigError> {
        let api_keys: Vec<String> = std::env::var("SUMMARIZER_API_KEYS")
            .unwrap_or_default()
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        if api_keys.is_empty() && env.is_production() {
            return Err(ConfigError::MissingRequired(
                "SUMMARIZER_API_KEYS".to_string(),
            ));
        }

        Ok(Self {
            api_keys,
            max_retries: std::env::var("SUMMARIZER_MAX_RETRIES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3),
            backoff_schedule: vec![
                Duration::from_secs(1),
                Duration::from_secs(3),
                Duration::from_secs(5),
            ],
        })
    }
}

/// Orchestrator cycle configuration
#[derive(Clone, Copy)]
pub struct OrchestratorConfig {
    pub cycle_interval: Duration,
}

impl OrchestratorConfig {
    pub fn from_env() -> Self {
        Self {
            cycle_interval: Duration::from_secs(
                std::env::var("CYCLE_INTERVAL_SECS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(900),
            ),
        }
    }
}

/// Outbound delivery to the external backend (out of scope, interface only)
#[derive(Clone)]
pub struct DeliveryConfig {
    pub insert_url: Option<String>,
}

impl DeliveryConfig {
    pub fn from_env() -> Self {
        Self {
            insert_url: std::env::var("INSERT_URL").ok(),
        }
    }
}

/// Helper function to get a required environment variable
pub fn require_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingRequired(key.to_string()))
}

/// Helper function to get an optional environment variable with a default
pub fn env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_detection() {
        assert_eq!(Environment::from_env(), Environment::Development);
    }

    #[test]
    fn test_clustering_defaults() {
        let c = ClusteringConfig::from_env();
        assert_eq!(c.tau_match, 0.75);
        assert_eq!(c.tau_internal, 0.70);
        assert_eq!(c.min_word_count, 50);
        assert_eq!(c.encode_batch_size, 32);
    }

    #[test]
    fn test_ingestion_defaults() {
        let c = IngestionConfig::from_env();
        assert_eq!(c.max_listing_candidates, 300);
        assert_eq!(c.max_pages, 10);
        assert_eq!(c.stagnation_threshold, 6);
    }

    #[test]
    fn test_summarizer_requires_keys_in_production() {
        let err = SummarizerConfig::from_env(Environment::Production);
        assert!(err.is_err());
    }

    #[test]
    fn test_summarizer_allows_no_keys_in_development() {
        let cfg = SummarizerConfig::from_env(Environment::Development).unwrap();
        assert!(cfg.api_keys.is_empty());
        assert_eq!(cfg.backoff_schedule.len(), 3);
    }
}
