//! Image inspection and banner discovery for the extract-media step.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Reported when an image's dimensions cannot be read.
pub const DEFAULT_DIMENSIONS: (u32, u32) = (1920, 1080);

/// Banner candidates under a job's `input/` directory, in lookup order.
pub const BANNER_CANDIDATES: [&str; 3] = ["banner.jpg", "banner.jpeg", "banner.png"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaInfo {
    pub path: PathBuf,
    pub source_path: PathBuf,
    pub width: u32,
    pub height: u32,
    pub format: String,
}

pub trait MediaInspector: Send + Sync {
    /// Width and height, or `None` when the file can't be decoded.
    fn dimensions(&self, path: &Path) -> Option<(u32, u32)>;

    fn dimensions_or_default(&self, path: &Path) -> (u32, u32) {
        self.dimensions(path).unwrap_or(DEFAULT_DIMENSIONS)
    }
}

/// Reads dimensions from image headers via the `image` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageInspector;

impl MediaInspector for ImageInspector {
    fn dimensions(&self, path: &Path) -> Option<(u32, u32)> {
        match image::image_dimensions(path) {
            Ok(dims) => Some(dims),
            Err(e) => {
                debug!("Could not read dimensions of {}: {}", path.display(), e);
                None
            }
        }
    }
}

pub fn find_banner(input_dir: &Path) -> Option<PathBuf> {
    BANNER_CANDIDATES
        .iter()
        .map(|name| input_dir.join(name))
        .find(|path| path.is_file())
}
