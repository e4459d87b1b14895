use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::config::{CatalogConfig, CommandConfig, Config, ResolverConfig};

/// The parts of [`Config`] the step executor needs.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub jobs_directory: PathBuf,
    pub downloads_directory: PathBuf,
    pub catalog: Option<CatalogConfig>,
    pub resolver: ResolverConfig,
    pub fetch: Option<CommandConfig>,
    pub steps: BTreeMap<String, CommandConfig>,
}

impl PipelineConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            jobs_directory: config.jobs_directory.clone(),
            downloads_directory: config.downloads_directory.clone(),
            catalog: config.catalog.clone(),
            resolver: config.resolver.clone(),
            fetch: config.fetch.clone(),
            steps: config.steps.clone(),
        }
    }
}
