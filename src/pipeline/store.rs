//! Article Store
//!
//! Persists extracted articles as individual JSON files and assigns each
//! a stable record id, so the Clustering Engine can refer to them without
//! re-reading full content.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::error::{PipelineError, Result};
use crate::pipeline::extractor::ExtractedArticle;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawArticle {
    pub id: String,
    pub title: String,
    pub content: String,
    pub url: String,
    pub source: String,
    pub genre: String,
    pub article_date: String,
    pub request_date: String,
    pub image: Option<String>,
    pub is_empty: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<ExtractedArticle> for RawArticle {
    fn from(a: ExtractedArticle) -> Self {
        RawArticle {
            id: Uuid::new_v4().to_string(),
            title: a.title,
            content: a.content,
            url: a.url,
            source: a.source,
            genre: a.genre,
            article_date: a.article_date,
            request_date: a.request_date,
            image: a.image,
            is_empty: a.is_empty,
            error: a.error,
        }
    }
}

/// Filesystem-safe slug of an article title, truncated to `max_len` chars.
fn filename_slug(title: &str, max_len: usize) -> String {
    title
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .take(max_len)
        .collect()
}

pub struct ArticleStore {
    root: PathBuf,
}

impl ArticleStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn filename_for(article: &RawArticle) -> String {
        let date_prefix: String = article.article_date.chars().take(10).collect();
        let slug = filename_slug(&article.title, 50);
        format!("{}_{}_{}.json", article.source, date_prefix, slug)
    }

    pub fn path_for(&self, article: &RawArticle) -> PathBuf {
        self.root.join(Self::filename_for(article))
    }

    /// Write an article as JSON, creating the store directory if needed.
    pub fn save(&self, article: &RawArticle) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.root).map_err(|source| PipelineError::Io {
            path: self.root.display().to_string(),
            source,
        })?;
        let path = self.path_for(article);
        let file = std::fs::File::create(&path).map_err(|source| PipelineError::Io {
            path: path.display().to_string(),
            source,
        })?;
        serde_json::to_writer_pretty(file, article)?;
        Ok(path)
    }

    pub fn load(&self, path: &Path) -> Result<RawArticle> {
        let contents = std::fs::read_to_string(path).map_err(|source| PipelineError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// All articles currently persisted in this store's directory.
    pub fn load_all(&self) -> Result<Vec<RawArticle>> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }
        let mut articles = Vec::new();
        let entries = std::fs::read_dir(&self.root).map_err(|source| PipelineError::Io {
            path: self.root.display().to_string(),
            source,
        })?;
        for entry in entries {
            let entry = entry.map_err(|source| PipelineError::Io {
                path: self.root.display().to_string(),
                source,
            })?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some("json") {
                articles.push(self.load(&path)?);
            }
        }
        Ok(articles)
    }
}
