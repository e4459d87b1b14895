use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::fetcher::{FetchedArtifact, Fetcher};
use crate::error::{CacheError, FetchError, StorageError};
use crate::source::SourceRef;
use crate::storage::{copy_file, ensure_directory, write_atomic};

pub const ARTIFACT_FILE: &str = "source.mp4";
pub const METADATA_FILE: &str = "metadata.json";

/// Result of satisfying a source from the cache (or a fresh fetch).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactInfo {
    pub source_id: String,
    pub file_path: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata_path: Option<PathBuf>,
    pub size_bytes: u64,
    pub size_mb: f64,
    pub cache_hit: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<f64>,
    pub fetched_at: DateTime<Utc>,
}

/// Append-only artifact store: `<root>/<source_id>/{source.mp4, metadata.json}`.
///
/// Entries are published by renaming a fully staged directory into place, so
/// an entry either has its artifact or does not exist. Nothing is evicted.
#[derive(Debug, Clone)]
pub struct DownloadCache {
    root: PathBuf,
}

impl DownloadCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn entry_dir(&self, source_id: &str) -> PathBuf {
        self.root.join(source_id)
    }

    pub fn contains(&self, source_id: &str) -> bool {
        self.entry_dir(source_id).join(ARTIFACT_FILE).is_file()
    }

    /// Copies the cached artifact for `source` into `destination_dir`,
    /// fetching it first on a miss. `source` may be a URL or a bare id.
    pub fn fetch_or_get_cached(
        &self,
        source: &str,
        destination_dir: &Path,
        fetcher: &dyn Fetcher,
    ) -> Result<ArtifactInfo, CacheError> {
        let source = SourceRef::parse(source)?;
        let _span = tracing::info_span!("cache.fetch", source_id = %source.source_id).entered();

        let cache_hit = self.contains(&source.source_id);
        if cache_hit {
            info!("Cache hit for {}", source.source_id);
        } else {
            info!("Cache miss for {}, fetching", source.source_id);
            self.populate(&source, fetcher)?;
        }

        let entry = self.entry_dir(&source.source_id);
        ensure_directory(destination_dir)?;

        let file_path = destination_dir.join(ARTIFACT_FILE);
        let size_bytes = copy_file(&entry.join(ARTIFACT_FILE), &file_path)?;

        let cached_metadata = entry.join(METADATA_FILE);
        let (metadata_path, sidecar) = if cached_metadata.is_file() {
            let destination = destination_dir.join(METADATA_FILE);
            copy_file(&cached_metadata, &destination)?;
            (Some(destination), read_sidecar(&cached_metadata))
        } else {
            (None, Sidecar::default())
        };

        Ok(ArtifactInfo {
            source_id: source.source_id,
            file_path,
            metadata_path,
            size_bytes,
            size_mb: size_in_mb(size_bytes),
            cache_hit,
            title: sidecar.title,
            duration_seconds: sidecar.duration,
            fetched_at: Utc::now(),
        })
    }

    fn populate(&self, source: &SourceRef, fetcher: &dyn Fetcher) -> Result<(), CacheError> {
        ensure_directory(&self.root)?;

        let suffix = uuid::Uuid::new_v4().simple().to_string();
        let staging = self
            .root
            .join(format!(".staging-{}-{}", source.source_id, &suffix[..8]));
        ensure_directory(&staging)?;

        let result = stage(source, &staging, fetcher).and_then(|()| self.publish(source, &staging));
        if staging.exists() {
            if let Err(e) = std::fs::remove_dir_all(&staging) {
                warn!("Failed to remove staging dir {}: {}", staging.display(), e);
            }
        }
        result
    }

    fn publish(&self, source: &SourceRef, staging: &Path) -> Result<(), CacheError> {
        let entry = self.entry_dir(&source.source_id);

        if entry.exists() {
            if self.contains(&source.source_id) {
                debug!("Entry for {} appeared while fetching, keeping it", source.source_id);
                return Ok(());
            }
            // Left behind without an artifact; never trusted.
            std::fs::remove_dir_all(&entry).map_err(|e| StorageError::WriteFile {
                path: entry.clone(),
                source: e,
            })?;
        }

        match std::fs::rename(staging, &entry) {
            Ok(()) => Ok(()),
            Err(_) if self.contains(&source.source_id) => Ok(()),
            Err(e) => Err(StorageError::Rename {
                from: staging.to_path_buf(),
                to: entry,
                source: e,
            }
            .into()),
        }
    }
}

/// Runs the fetcher and normalizes its output to the cache file names.
fn stage(source: &SourceRef, staging: &Path, fetcher: &dyn Fetcher) -> Result<(), CacheError> {
    let fetched = fetcher.fetch(source, staging)?;

    if !fetched.artifact_path.is_file() {
        return Err(FetchError::NoArtifact {
            source_id: source.source_id.clone(),
        }
        .into());
    }
    place(&fetched.artifact_path, &staging.join(ARTIFACT_FILE), staging)?;

    let metadata_target = staging.join(METADATA_FILE);
    match &fetched.metadata_path {
        Some(path) if path.is_file() => place(path, &metadata_target, staging)?,
        _ => write_sidecar(&fetched, &metadata_target)?,
    }

    Ok(())
}

fn place(from: &Path, to: &Path, staging: &Path) -> Result<(), FetchError> {
    if from == to {
        return Ok(());
    }
    if from.starts_with(staging) {
        std::fs::rename(from, to).map_err(|e| StorageError::Rename {
            from: from.to_path_buf(),
            to: to.to_path_buf(),
            source: e,
        })?;
    } else {
        copy_file(from, to)?;
    }
    Ok(())
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Sidecar {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    duration: Option<f64>,
}

fn write_sidecar(fetched: &FetchedArtifact, path: &Path) -> Result<(), FetchError> {
    if fetched.title.is_none() && fetched.duration_seconds.is_none() {
        return Ok(());
    }
    let sidecar = Sidecar {
        title: fetched.title.clone(),
        duration: fetched.duration_seconds,
    };
    let json = serde_json::to_vec_pretty(&sidecar).map_err(|e| StorageError::WriteFile {
        path: path.to_path_buf(),
        source: e.into(),
    })?;
    write_atomic(path, &json)?;
    Ok(())
}

/// Unknown or malformed sidecars just mean no title/duration.
fn read_sidecar(path: &Path) -> Sidecar {
    std::fs::read_to_string(path)
        .ok()
        .and_then(|content| serde_json::from_str(&content).ok())
        .unwrap_or_default()
}

fn size_in_mb(size_bytes: u64) -> f64 {
    let mb = size_bytes as f64 / (1024.0 * 1024.0);
    (mb * 100.0).round() / 100.0
}
