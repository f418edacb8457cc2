//! Per-article record persistence.
//!
//! A directory keyed by `{id}.json`. Saves are atomic and serve as the
//! pipeline's crash-resilience checkpoints: the orchestrator saves after
//! every stage, so a crash resumes from the last completed stage.

use std::path::{Path, PathBuf};

use super::ArticleRecord;
use crate::error::StorageError;
use crate::fsutil;

/// Directory-backed store of article records.
#[derive(Debug, Clone)]
pub struct RecordStore {
    dir: PathBuf,
}

impl RecordStore {
    /// Create a store rooted at `dir` (usually `data/processed_json`).
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The directory backing this store.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }

    /// Load the record with the given ID.
    pub fn load(&self, id: &str) -> Result<ArticleRecord, StorageError> {
        fsutil::load_json(&self.path_for(id))?.ok_or_else(|| StorageError::NotFound {
            id: id.to_string(),
        })
    }

    /// Save (atomically replace) a record.
    pub fn save(&self, record: &ArticleRecord) -> Result<(), StorageError> {
        fsutil::atomic_write_json(&self.path_for(&record.id), record)?;
        tracing::debug!(id = %record.id, "record checkpoint saved");
        Ok(())
    }

    /// List the IDs of every stored record, sorted.
    pub fn list_ids(&self) -> Result<Vec<String>, StorageError> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(e) => e,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(StorageError::Io {
                    path: self.dir.display().to_string(),
                    source,
                })
            }
        };

        let mut ids: Vec<String> = entries
            .filter_map(Result::ok)
            .filter_map(|entry| {
                let name = entry.file_name();
                let name = name.to_str()?;
                name.strip_suffix(".json").map(str::to_string)
            })
            .collect();
        ids.sort();
        Ok(ids)
    }

    /// Delete the record with the given ID. Deleting a missing record
    /// is not an error.
    pub fn delete(&self, id: &str) -> Result<(), StorageError> {
        match std::fs::remove_file(self.path_for(id)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StorageError::Io {
                path: self.path_for(id).display().to_string(),
                source,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (tempfile::TempDir, RecordStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = RecordStore::new(dir.path().join("processed_json"));
        (dir, store)
    }

    #[test]
    fn save_load_round_trip() {
        let (_guard, store) = store();
        let mut record = ArticleRecord::new("abc123");
        record.initial_title = Some("Hello".to_string());
        record.set_status("dedup", "UNIQUE_NO_HISTORY");

        store.save(&record).unwrap();
        let loaded = store.load("abc123").unwrap();

        assert_eq!(loaded.id, "abc123");
        assert_eq!(loaded.initial_title.as_deref(), Some("Hello"));
        assert_eq!(loaded.status("dedup"), Some("UNIQUE_NO_HISTORY"));
    }

    #[test]
    fn load_missing_is_not_found() {
        let (_guard, store) = store();
        let err = store.load("ghost").unwrap_err();
        assert!(matches!(err, StorageError::NotFound { .. }));
    }

    #[test]
    fn list_ids_sorted_and_filtered() {
        let (_guard, store) = store();
        store.save(&ArticleRecord::new("zeta")).unwrap();
        store.save(&ArticleRecord::new("alpha")).unwrap();
        // A stray non-JSON file is ignored.
        std::fs::write(store.dir().join("notes.txt"), "x").unwrap();

        assert_eq!(store.list_ids().unwrap(), vec!["alpha", "zeta"]);
    }

    #[test]
    fn list_ids_on_missing_dir_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = RecordStore::new(dir.path().join("never_created"));
        assert!(store.list_ids().unwrap().is_empty());
    }

    #[test]
    fn delete_is_idempotent() {
        let (_guard, store) = store();
        store.save(&ArticleRecord::new("gone")).unwrap();
        store.delete("gone").unwrap();
        store.delete("gone").unwrap();
        assert!(store.list_ids().unwrap().is_empty());
    }

    #[test]
    fn save_replaces_previous_checkpoint() {
        let (_guard, store) = store();
        let mut record = ArticleRecord::new("a1");
        store.save(&record).unwrap();

        record.final_page_h1 = Some("Title Set Once".to_string());
        store.save(&record).unwrap();

        let loaded = store.load("a1").unwrap();
        assert_eq!(loaded.final_page_h1.as_deref(), Some("Title Set Once"));
    }
}
