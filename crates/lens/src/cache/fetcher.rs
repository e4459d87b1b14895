use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::debug;

use crate::config::CommandConfig;
use crate::error::FetchError;
use crate::source::SourceRef;

use super::store::{ARTIFACT_FILE, METADATA_FILE};

/// What a fetch collaborator produced inside the directory it was given.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchedArtifact {
    pub artifact_path: PathBuf,
    pub metadata_path: Option<PathBuf>,
    pub title: Option<String>,
    pub duration_seconds: Option<f64>,
}

impl FetchedArtifact {
    pub fn new(artifact_path: impl Into<PathBuf>) -> Self {
        Self {
            artifact_path: artifact_path.into(),
            ..Default::default()
        }
    }
}

/// External collaborator that downloads one source into `output_dir`.
pub trait Fetcher: Send + Sync {
    fn fetch(&self, source: &SourceRef, output_dir: &Path) -> Result<FetchedArtifact, FetchError>;
}

impl<F> Fetcher for F
where
    F: Fn(&SourceRef, &Path) -> Result<FetchedArtifact, FetchError> + Send + Sync,
{
    fn fetch(&self, source: &SourceRef, output_dir: &Path) -> Result<FetchedArtifact, FetchError> {
        self(source, output_dir)
    }
}

/// Runs a configured program to fetch a source.
///
/// Arguments may use `{source_id}`, `{url}` and `{output_dir}`. The program is
/// expected to write `source.mp4` (and optionally `metadata.json`) into the
/// output directory.
#[derive(Debug, Clone)]
pub struct CommandFetcher {
    program: String,
    args: Vec<String>,
}

impl CommandFetcher {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    pub fn from_config(config: &CommandConfig) -> Self {
        Self::new(config.program.clone(), config.args.clone())
    }

    fn render_args(&self, source: &SourceRef, output_dir: &Path) -> Vec<String> {
        let output_dir = output_dir.to_string_lossy();
        self.args
            .iter()
            .map(|arg| {
                arg.replace("{source_id}", &source.source_id)
                    .replace("{url}", &source.url)
                    .replace("{output_dir}", &output_dir)
            })
            .collect()
    }
}

impl Fetcher for CommandFetcher {
    fn fetch(&self, source: &SourceRef, output_dir: &Path) -> Result<FetchedArtifact, FetchError> {
        let args = self.render_args(source, output_dir);
        debug!("Running fetch command {} {:?}", self.program, args);

        let output = Command::new(&self.program)
            .args(&args)
            .output()
            .map_err(|e| FetchError::Collaborator {
                source_id: source.source_id.clone(),
                reason: format!("failed to run '{}': {}", self.program, e),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(FetchError::Collaborator {
                source_id: source.source_id.clone(),
                reason: format!("'{}' exited with {}: {}", self.program, output.status, stderr.trim()),
            });
        }

        let metadata_path = output_dir.join(METADATA_FILE);
        Ok(FetchedArtifact {
            artifact_path: output_dir.join(ARTIFACT_FILE),
            metadata_path: metadata_path.is_file().then_some(metadata_path),
            title: None,
            duration_seconds: None,
        })
    }
}
