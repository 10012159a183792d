//! veritas-scraper
//!
//! A continuously running news aggregation pipeline: ingest Turkish-language
//! articles from a registry of sources, embed and cluster articles that
//! refer to the same event, and hand off one objectified record per cluster
//! to an external backend.

pub mod config;
pub mod error;
pub mod pipeline;

pub use config::AppConfig;
pub use error::{PipelineError, Result};
