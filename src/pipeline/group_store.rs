//! Group Store
//!
//! Filesystem layout for clustered articles: each semantic group lives in
//! its own `group_{n}/` directory; articles that haven't matched anything
//! yet live in `still_unmatched/`. Moves are idempotent — moving a file
//! onto itself is a no-op rather than an error.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{PipelineError, Result};
use crate::pipeline::store::RawArticle;

pub struct GroupStore {
    root: PathBuf,
}

const UNMATCHED_DIR_NAME: &str = "still_unmatched";

impl GroupStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn still_unmatched_dir(&self) -> PathBuf {
        self.root.join(UNMATCHED_DIR_NAME)
    }

    pub fn group_dir(&self, group_id: u32) -> PathBuf {
        self.root.join(format!("group_{}", group_id))
    }

    fn ensure_dir(path: &Path) -> Result<()> {
        std::fs::create_dir_all(path).map_err(|source| PipelineError::Io {
            path: path.display().to_string(),
            source,
        })
    }

    /// Ids of every `group_*` directory currently on disk.
    pub fn existing_group_ids(&self) -> Result<Vec<u32>> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }
        let mut ids = Vec::new();
        let entries = std::fs::read_dir(&self.root).map_err(|source| PipelineError::Io {
            path: self.root.display().to_string(),
            source,
        })?;
        for entry in entries {
            let entry = entry.map_err(|source| PipelineError::Io {
                path: self.root.display().to_string(),
                source,
            })?;
            if !entry.path().is_dir() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                if let Some(suffix) = name.strip_prefix("group_") {
                    if let Ok(id) = suffix.parse::<u32>() {
                        ids.push(id);
                    }
                }
            }
        }
        Ok(ids)
    }

    /// Next free group id: one past the highest existing id, or 1 if none.
    pub fn next_group_id(&self) -> Result<u32> {
        Ok(self.existing_group_ids()?.into_iter().max().unwrap_or(0) + 1)
    }

    fn load_dir_articles(&self, dir: &Path) -> Result<Vec<(PathBuf, RawArticle)>> {
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut out = Vec::new();
        let entries = std::fs::read_dir(dir).map_err(|source| PipelineError::Io {
            path: dir.display().to_string(),
            source,
        })?;
        for entry in entries {
            let entry = entry.map_err(|source| PipelineError::Io {
                path: dir.display().to_string(),
                source,
            })?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let contents = std::fs::read_to_string(&path).map_err(|source| PipelineError::Io {
                path: path.display().to_string(),
                source,
            })?;
            let article: RawArticle = serde_json::from_str(&contents)?;
            out.push((path, article));
        }
        Ok(out)
    }

    /// Every existing group's members, keyed by group id.
    pub fn load_all_groups(&self) -> Result<HashMap<u32, Vec<(PathBuf, RawArticle)>>> {
        let mut groups = HashMap::new();
        for id in self.existing_group_ids()? {
            groups.insert(id, self.load_dir_articles(&self.group_dir(id))?);
        }
        Ok(groups)
    }

    pub fn load_still_unmatched(&self) -> Result<Vec<(PathBuf, RawArticle)>> {
        self.load_dir_articles(&self.still_unmatched_dir())
    }

    fn move_into(&self, source_path: &Path, dest_dir: &Path) -> Result<PathBuf> {
        Self::ensure_dir(dest_dir)?;
        let Some(filename) = source_path.file_name() else {
            return Ok(source_path.to_path_buf());
        };
        let dest_path = dest_dir.join(filename);

        if paths_are_same_file(source_path, &dest_path) {
            return Ok(dest_path);
        }

        std::fs::rename(source_path, &dest_path).map_err(|source| PipelineError::Io {
            path: dest_path.display().to_string(),
            source,
        })?;
        Ok(dest_path)
    }

    pub fn move_to_group(&self, source_path: &Path, group_id: u32) -> Result<PathBuf> {
        self.move_into(source_path, &self.group_dir(group_id))
    }

    pub fn move_to_unmatched(&self, source_path: &Path) -> Result<PathBuf> {
        self.move_into(source_path, &self.still_unmatched_dir())
    }

    /// Marker file dropped inside a group directory once it's been
    /// objectified, so a later cycle never re-summarizes the same group.
    fn objectified_marker(&self, group_id: u32) -> PathBuf {
        self.group_dir(group_id).join(".objectified")
    }

    pub fn is_objectified(&self, group_id: u32) -> bool {
        self.objectified_marker(group_id).exists()
    }

    pub fn mark_objectified(&self, group_id: u32) -> Result<()> {
        let marker = self.objectified_marker(group_id);
        std::fs::write(&marker, b"").map_err(|source| PipelineError::Io {
            path: marker.display().to_string(),
            source,
        })
    }
}

fn paths_are_same_file(a: &Path, b: &Path) -> bool {
    match (std::fs::canonicalize(a), std::fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write_article(path: &Path, id: &str) {
        let article = RawArticle {
            id: id.to_string(),
            title: "T".to_string(),
            content: "C".to_string(),
            url: "https://example.com".to_string(),
            source: "src".to_string(),
            genre: "g".to_string(),
            article_date: "2026-07-27".to_string(),
            request_date: "2026-07-27".to_string(),
            image: None,
            is_empty: false,
            error: None,
        };
        std::fs::write(path, serde_json::to_string(&article).unwrap()).unwrap();
    }

    #[test]
    fn next_group_id_starts_at_one() {
        let dir = tempdir().unwrap();
        let store = GroupStore::new(dir.path());
        assert_eq!(store.next_group_id().unwrap(), 1);
    }

    #[test]
    fn next_group_id_continues_past_highest_existing() {
        let dir = tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("group_3")).unwrap();
        std::fs::create_dir_all(dir.path().join("group_7")).unwrap();
        let store = GroupStore::new(dir.path());
        assert_eq!(store.next_group_id().unwrap(), 8);
    }

    #[test]
    fn move_to_group_relocates_file() {
        let dir = tempdir().unwrap();
        let source_path = dir.path().join("pending.json");
        write_article(&source_path, "id-1");

        let store = GroupStore::new(dir.path());
        let dest = store.move_to_group(&source_path, 5).unwrap();

        assert!(!source_path.exists());
        assert!(dest.exists());
        assert_eq!(dest, dir.path().join("group_5").join("pending.json"));
    }

    #[test]
    fn move_onto_self_is_a_no_op() {
        let dir = tempdir().unwrap();
        let store = GroupStore::new(dir.path());
        let group_dir = store.group_dir(1);
        std::fs::create_dir_all(&group_dir).unwrap();
        let path = group_dir.join("already_here.json");
        write_article(&path, "id-2");

        let result = store.move_to_group(&path, 1).unwrap();
        assert_eq!(result, path);
        assert!(path.exists());
    }

    #[test]
    fn objectified_marker_round_trips() {
        let dir = tempdir().unwrap();
        let store = GroupStore::new(dir.path());
        assert!(!store.is_objectified(1));
        store.mark_objectified(1).unwrap();
        assert!(store.is_objectified(1));
    }

    #[test]
    fn load_all_groups_reads_every_group_directory() {
        let dir = tempdir().unwrap();
        let group1 = dir.path().join("group_1");
        std::fs::create_dir_all(&group1).unwrap();
        write_article(&group1.join("a.json"), "id-a");

        let store = GroupStore::new(dir.path());
        let groups = store.load_all_groups().unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[&1].len(), 1);
    }
}
