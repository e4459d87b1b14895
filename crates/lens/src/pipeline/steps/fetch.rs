use std::path::Path;

use tracing::info;

use crate::cache::{DownloadCache, FetchedArtifact, Fetcher};
use crate::error::FetchError;
use crate::pipeline::context::StepContext;
use crate::pipeline::error::StepError;
use crate::pipeline::registry::StepHandler;
use crate::source::SourceRef;

/// Satisfies the job's source from the download cache, fetching on a miss,
/// and copies it into the job's `input/` directory.
pub struct FetchStep {
    cache: DownloadCache,
    fetcher: Box<dyn Fetcher>,
}

impl FetchStep {
    pub fn new(cache: DownloadCache, fetcher: Box<dyn Fetcher>) -> Self {
        Self { cache, fetcher }
    }

    /// A fetch step that can only serve cache hits.
    pub fn cache_only(cache: DownloadCache) -> Self {
        Self::new(cache, Box::new(Unconfigured))
    }
}

impl StepHandler for FetchStep {
    fn run(&self, ctx: &mut StepContext<'_>) -> Result<(), StepError> {
        let destination = ctx.input_dir();
        let artifact =
            self.cache
                .fetch_or_get_cached(&ctx.record.source_id, &destination, self.fetcher.as_ref())?;
        info!(
            "Fetched {} ({} MB, cache hit: {})",
            artifact.source_id, artifact.size_mb, artifact.cache_hit
        );
        ctx.record.outputs.artifact = Some(artifact);
        Ok(())
    }
}

struct Unconfigured;

impl Fetcher for Unconfigured {
    fn fetch(&self, source: &SourceRef, _output_dir: &Path) -> Result<FetchedArtifact, FetchError> {
        Err(FetchError::Collaborator {
            source_id: source.source_id.clone(),
            reason: "not cached and no fetch command is configured".to_string(),
        })
    }
}
