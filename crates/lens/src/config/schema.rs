use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::catalog::DuplicateCodePolicy;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub version: String,
    #[serde(default = "default_jobs_directory")]
    pub jobs_directory: PathBuf,
    #[serde(default = "default_batch_runs_directory")]
    pub batch_runs_directory: PathBuf,
    /// Root of the download cache.
    #[serde(default = "default_downloads_directory")]
    pub downloads_directory: PathBuf,
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog: Option<CatalogConfig>,
    #[serde(default)]
    pub resolver: ResolverConfig,
    #[serde(default)]
    pub batch: BatchConfig,
    /// External fetch collaborator. Without it the fetch step only serves cache hits.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fetch: Option<CommandConfig>,
    /// External step commands keyed by step name.
    #[serde(default)]
    pub steps: BTreeMap<String, CommandConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            jobs_directory: default_jobs_directory(),
            batch_runs_directory: default_batch_runs_directory(),
            downloads_directory: default_downloads_directory(),
            worker_count: default_worker_count(),
            catalog: None,
            resolver: ResolverConfig::default(),
            batch: BatchConfig::default(),
            fetch: None,
            steps: BTreeMap::new(),
        }
    }
}

fn data_root() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("lens")
}

fn default_jobs_directory() -> PathBuf {
    data_root().join("jobs")
}

fn default_batch_runs_directory() -> PathBuf {
    data_root().join("batch_runs")
}

fn default_downloads_directory() -> PathBuf {
    data_root().join("downloads")
}

fn default_worker_count() -> usize {
    num_cpus::get()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    pub path: PathBuf,
    #[serde(default)]
    pub duplicate_codes: DuplicateCodePolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    #[serde(default = "default_min_score")]
    pub min_score: f64,
    #[serde(default)]
    pub case_insensitive_suffixes: bool,
}

fn default_min_score() -> f64 {
    crate::catalog::DEFAULT_MIN_SCORE
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            min_score: default_min_score(),
            case_insensitive_suffixes: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    #[serde(default = "default_batch_size")]
    pub size: usize,
    #[serde(default = "default_pipeline_type")]
    pub pipeline_type: String,
}

fn default_batch_size() -> usize {
    100
}

fn default_pipeline_type() -> String {
    "audio-only".to_string()
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            size: default_batch_size(),
            pipeline_type: default_pipeline_type(),
        }
    }
}

/// An external program invocation. Arguments may contain `{placeholder}`s
/// filled in by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandConfig {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
}
