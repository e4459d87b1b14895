//! Download cache keyed by source id, plus the fetch collaborator seam.

mod fetcher;
mod store;

pub use fetcher::{CommandFetcher, FetchedArtifact, Fetcher};
pub use store::{ArtifactInfo, DownloadCache, ARTIFACT_FILE, METADATA_FILE};
