//! URL Ledger
//!
//! Per-source append-only text file of already-seen URLs. The Listing
//! Discoverer's candidate set is filtered against the ledger before fetch;
//! only the difference is fetched and extracted.

use std::collections::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{PipelineError, Result};

/// Filesystem-safe slug for a source name: alphanumerics, `_`, `-` only.
pub fn safe_source_filename(source: &str) -> String {
    source
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
        .collect()
}

pub struct UrlLedger {
    root: PathBuf,
}

impl UrlLedger {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn ledger_path(&self, source_slug: &str) -> PathBuf {
        self.root
            .join(format!("{}_urls.txt", safe_source_filename(source_slug)))
    }

    /// URLs already recorded for this source.
    pub fn load(&self, source_slug: &str) -> Result<HashSet<String>> {
        let path = self.ledger_path(source_slug);
        if !path.exists() {
            return Ok(HashSet::new());
        }
        let contents = std::fs::read_to_string(&path).map_err(|source| PipelineError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Ok(contents
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect())
    }

    /// Append a single URL to the source's ledger file.
    pub fn append(&self, source_slug: &str, url: &str) -> Result<()> {
        std::fs::create_dir_all(&self.root).map_err(|source| PipelineError::Io {
            path: self.root.display().to_string(),
            source,
        })?;
        let path = self.ledger_path(source_slug);
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|source| PipelineError::Io {
                path: path.display().to_string(),
                source,
            })?;
        writeln!(file, "{}", url).map_err(|source| PipelineError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Ok(())
    }

    /// Filter `candidates` down to URLs not already present in the ledger.
    pub fn new_urls(&self, source_slug: &str, candidates: &[String]) -> Result<Vec<String>> {
        let known = self.load(source_slug)?;
        Ok(candidates
            .iter()
            .filter(|u| !known.contains(*u))
            .cloned()
            .collect())
    }

    pub fn path_for(&self, source_slug: &str) -> PathBuf {
        self.ledger_path(source_slug)
    }
}

pub fn ensure_dir(path: &Path) -> Result<()> {
    std::fs::create_dir_all(path).map_err(|source| PipelineError::Io {
        path: path.display().to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn safe_source_filename_strips_unsafe_chars() {
        assert_eq!(safe_source_filename("gazete duvar!"), "gazete_duvar_");
    }

    #[test]
    fn append_then_load_round_trips() {
        let dir = tempdir().unwrap();
        let ledger = UrlLedger::new(dir.path());
        ledger.append("ntv", "https://ntv.com.tr/a").unwrap();
        ledger.append("ntv", "https://ntv.com.tr/b").unwrap();

        let urls = ledger.load("ntv").unwrap();
        assert_eq!(urls.len(), 2);
        assert!(urls.contains("https://ntv.com.tr/a"));
    }

    #[test]
    fn new_urls_filters_known_entries() {
        let dir = tempdir().unwrap();
        let ledger = UrlLedger::new(dir.path());
        ledger.append("ntv", "https://ntv.com.tr/a").unwrap();

        let candidates = vec![
            "https://ntv.com.tr/a".to_string(),
            "https://ntv.com.tr/b".to_string(),
        ];
        let fresh = ledger.new_urls("ntv", &candidates).unwrap();
        assert_eq!(fresh, vec!["https://ntv.com.tr/b".to_string()]);
    }

    #[test]
    fn load_on_missing_file_is_empty_not_error() {
        let dir = tempdir().unwrap();
        let ledger = UrlLedger::new(dir.path());
        assert!(ledger.load("unseen_source").unwrap().is_empty());
    }
}
