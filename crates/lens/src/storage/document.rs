//! Durable document persistence for job, batch, and run records.
//!
//! Writes go to a sibling temp file which is synced and then renamed over the
//! target, so a reader (or a resumed run after a crash) only ever observes the
//! previous complete document or the new complete document.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::StorageError;

pub fn ensure_directory(path: &Path) -> Result<(), StorageError> {
    if !path.exists() {
        std::fs::create_dir_all(path).map_err(|e| StorageError::CreateDirectory {
            path: path.to_path_buf(),
            source: e,
        })?;
    }
    Ok(())
}

fn temp_path_for(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("document");
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    path.with_file_name(format!(".{}.{}.tmp", name, &suffix[..8]))
}

/// Replaces `path` with `contents` using write-temp-then-rename.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), StorageError> {
    if let Some(parent) = path.parent() {
        ensure_directory(parent)?;
    }

    let temp_path = temp_path_for(path);
    let write_result = File::create(&temp_path).and_then(|mut file| {
        file.write_all(contents)?;
        file.sync_all()
    });
    if let Err(e) = write_result {
        let _ = std::fs::remove_file(&temp_path);
        return Err(StorageError::WriteFile {
            path: path.to_path_buf(),
            source: e,
        });
    }

    std::fs::rename(&temp_path, path).map_err(|e| {
        let _ = std::fs::remove_file(&temp_path);
        StorageError::Rename {
            from: temp_path.clone(),
            to: path.to_path_buf(),
            source: e,
        }
    })
}

pub fn save_yaml<T: Serialize>(path: &Path, value: &T) -> Result<(), StorageError> {
    let yaml = serde_yaml::to_string(value)?;
    write_atomic(path, yaml.as_bytes())
}

pub fn load_yaml<T: DeserializeOwned>(path: &Path) -> Result<T, StorageError> {
    let content = std::fs::read_to_string(path).map_err(|e| StorageError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;
    serde_yaml::from_str(&content).map_err(|e| StorageError::Parse {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Copies `from` to `to`, never moving the source. Returns the bytes copied.
pub fn copy_file(from: &Path, to: &Path) -> Result<u64, StorageError> {
    if let Some(parent) = to.parent() {
        ensure_directory(parent)?;
    }
    std::fs::copy(from, to).map_err(|e| StorageError::CopyFile {
        from: from.to_path_buf(),
        to: to.to_path_buf(),
        source: e,
    })
}
