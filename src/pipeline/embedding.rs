//! Encoder Adapter + Embedding Cache
//!
//! Wraps a lazily-initialized `fastembed` multilingual sentence encoder and
//! a JSON-backed cache keyed by record id, so re-running a cycle never
//! re-encodes articles it has already embedded.

use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

use crate::config::EncoderConfig;
use crate::error::{PipelineError, Result};

#[derive(Debug, Default, Serialize, Deserialize)]
struct CacheFile {
    entries: HashMap<String, Vec<f32>>,
}

/// Persistent record-id -> embedding cache, backed by a single JSON file.
pub struct EmbeddingCache {
    path: PathBuf,
    entries: RwLock<HashMap<String, Vec<f32>>>,
}

impl EmbeddingCache {
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let entries = if path.exists() {
            let contents = std::fs::read_to_string(&path).map_err(|source| PipelineError::Io {
                path: path.display().to_string(),
                source,
            })?;
            let parsed: CacheFile = serde_json::from_str(&contents)?;
            parsed.entries
        } else {
            HashMap::new()
        };
        Ok(Self {
            path,
            entries: RwLock::new(entries),
        })
    }

    pub async fn get(&self, record_id: &str) -> Option<Vec<f32>> {
        self.entries.read().await.get(record_id).cloned()
    }

    pub async fn insert(&self, record_id: String, embedding: Vec<f32>) {
        self.entries.write().await.insert(record_id, embedding);
    }

    /// Write the full cache back to disk.
    pub async fn persist(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| PipelineError::Io {
                path: parent.display().to_string(),
                source,
            })?;
        }
        let entries = self.entries.read().await.clone();
        let file = CacheFile { entries };
        let bytes = serde_json::to_vec_pretty(&file)?;
        std::fs::write(&self.path, bytes).map_err(|source| PipelineError::Io {
            path: self.path.display().to_string(),
            source,
        })?;
        Ok(())
    }
}

/// Lazily-initialized multilingual sentence encoder.
pub struct Encoder {
    config: EncoderConfig,
    model: Arc<RwLock<Option<TextEmbedding>>>,
}

impl Encoder {
    pub fn new(config: EncoderConfig) -> Self {
        Self {
            config,
            model: Arc::new(RwLock::new(None)),
        }
    }

    async fn ensure_initialized(&self) -> Result<()> {
        {
            let model = self.model.read().await;
            if model.is_some() {
                return Ok(());
            }
        }

        info!(model = %self.config.model_name, "initializing sentence encoder");
        let options = InitOptions::new(EmbeddingModel::ParaphraseMLMiniLML12V2)
            .with_show_download_progress(true);
        let built = TextEmbedding::try_new(options)
            .map_err(|e| PipelineError::EncoderInit(e.to_string()))?;

        let mut model = self.model.write().await;
        *model = Some(built);
        Ok(())
    }

    /// Truncate to at most `max_text_length` bytes, backing off to the
    /// nearest preceding char boundary so Turkish multibyte characters
    /// (ç/ğ/ı/ö/ş/ü) never get sliced in half.
    fn truncate<'a>(&self, text: &'a str) -> &'a str {
        let max = self.config.max_text_length;
        if text.len() <= max {
            return text;
        }
        let mut end = max;
        while end > 0 && !text.is_char_boundary(end) {
            end -= 1;
        }
        &text[..end]
    }

    /// Encode texts in fixed-size batches, returning one vector per input
    /// text in the same order.
    pub async fn embed_batch(&self, texts: &[String], batch_size: usize) -> Result<Vec<Vec<f32>>> {
        self.ensure_initialized().await?;
        let model = self.model.read().await;
        let model = model.as_ref().ok_or(PipelineError::EncoderNotInitialized)?;

        let mut out = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(batch_size.max(1)) {
            let truncated: Vec<String> = chunk.iter().map(|t| self.truncate(t).to_string()).collect();
            let embeddings = model
                .embed(truncated, None)
                .map_err(|e| PipelineError::EncodeBatchFailed(e.to_string()))?;
            out.extend(embeddings);
        }
        Ok(out)
    }
}

/// Cosine similarity; returns 0.0 on dimension mismatch or a zero-norm vector.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn cosine_similarity_of_identical_vectors_is_one() {
        let v = vec![1.0, 2.0, 3.0];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_similarity_mismatched_dims_is_zero() {
        assert_eq!(cosine_similarity(&[1.0, 2.0], &[1.0]), 0.0);
    }

    #[test]
    fn cosine_similarity_zero_norm_is_zero() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    }

    #[tokio::test]
    async fn cache_round_trips_through_disk() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("embeddings.json");

        {
            let cache = EmbeddingCache::load(&path).unwrap();
            cache.insert("rec-1".to_string(), vec![0.1, 0.2, 0.3]).await;
            cache.persist().await.unwrap();
        }

        let reloaded = EmbeddingCache::load(&path).unwrap();
        let value = reloaded.get("rec-1").await.unwrap();
        assert_eq!(value, vec![0.1, 0.2, 0.3]);
    }

    #[tokio::test]
    async fn cache_miss_on_unknown_id() {
        let dir = tempdir().unwrap();
        let cache = EmbeddingCache::load(dir.path().join("embeddings.json")).unwrap();
        assert!(cache.get("unseen").await.is_none());
    }

    #[test]
    fn truncate_backs_off_to_a_char_boundary_mid_multibyte_char() {
        // 'a' is 1 byte, 'ğ' is 2 bytes in UTF-8 (3 bytes total); a max of
        // 2 lands in the middle of 'ğ' and must back off instead of
        // panicking on a byte slice that isn't a char boundary.
        let config = EncoderConfig {
            model_name: "test".to_string(),
            max_text_length: 2,
        };
        let encoder = Encoder::new(config);
        assert_eq!(encoder.truncate("ağ"), "a");
    }

    #[test]
    fn truncate_leaves_short_text_untouched() {
        let config = EncoderConfig {
            model_name: "test".to_string(),
            max_text_length: 2000,
        };
        let encoder = Encoder::new(config);
        assert_eq!(encoder.truncate("kısa metin"), "kısa metin");
    }
}
