//! Atomic filesystem helpers shared by the stores.
//!
//! Every durable artifact (article records, the duplicate store, the
//! master index) is written with write-temp-then-rename so a crash
//! mid-write never truncates the previous version.

use std::path::Path;

use crate::error::StorageError;

/// Write `bytes` to `path` atomically.
///
/// The data is first written to a sibling `.tmp` file and then renamed
/// over the destination. Parent directories are created as needed.
pub fn atomic_write(path: &Path, bytes: &[u8]) -> Result<(), StorageError> {
    let io_err = |source| StorageError::Io {
        path: path.display().to_string(),
        source,
    };

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }

    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, bytes).map_err(|source| StorageError::Io {
        path: tmp.display().to_string(),
        source,
    })?;
    std::fs::rename(&tmp, path).map_err(io_err)?;
    Ok(())
}

/// Serialize `value` as pretty JSON and write it atomically.
pub fn atomic_write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<(), StorageError> {
    let bytes = serde_json::to_vec_pretty(value).map_err(|source| StorageError::Corrupt {
        path: path.display().to_string(),
        source,
    })?;
    atomic_write(path, &bytes)
}

/// Load and deserialize a JSON document, or `None` when the file is absent.
pub fn load_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Option<T>, StorageError> {
    let bytes = match std::fs::read(path) {
        Ok(b) => b,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(StorageError::Io {
                path: path.display().to_string(),
                source,
            })
        }
    };
    let value = serde_json::from_slice(&bytes).map_err(|source| StorageError::Corrupt {
        path: path.display().to_string(),
        source,
    })?;
    Ok(Some(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn atomic_write_creates_parents_and_leaves_no_tmp() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/deep/file.json");

        atomic_write(&path, b"{\"ok\":true}").unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"{\"ok\":true}");
        assert!(!path.with_extension("tmp").exists());
    }

    #[test]
    fn atomic_write_replaces_existing_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.json");

        atomic_write(&path, b"first").unwrap();
        atomic_write(&path, b"second").unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"second");
    }

    #[test]
    fn load_json_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let loaded: Option<serde_json::Value> = load_json(&dir.path().join("absent.json")).unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn json_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("value.json");
        let value = serde_json::json!({"articles": [1, 2, 3]});

        atomic_write_json(&path, &value).unwrap();
        let loaded: Option<serde_json::Value> = load_json(&path).unwrap();

        assert_eq!(loaded.unwrap(), value);
    }
}
