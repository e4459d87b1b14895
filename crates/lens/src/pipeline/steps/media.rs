use crate::media::{find_banner, MediaInfo, MediaInspector};
use crate::pipeline::context::StepContext;
use crate::pipeline::error::StepError;
use crate::pipeline::registry::StepHandler;
use crate::storage::copy_file;

pub const BANNER_OUTPUT: &str = "banner.png";

/// Copies the job's banner image into `renders/` and records its dimensions.
pub struct ExtractMediaStep {
    inspector: Box<dyn MediaInspector>,
}

impl ExtractMediaStep {
    pub fn new(inspector: Box<dyn MediaInspector>) -> Self {
        Self { inspector }
    }
}

impl StepHandler for ExtractMediaStep {
    fn run(&self, ctx: &mut StepContext<'_>) -> Result<(), StepError> {
        let input = ctx.input_dir();
        let banner = find_banner(&input).ok_or_else(|| {
            StepError::Failed(format!("No banner image in {}", input.display()))
        })?;

        let target = ctx.renders_dir().join(BANNER_OUTPUT);
        copy_file(&banner, &target)?;

        let (width, height) = self.inspector.dimensions_or_default(&target);
        let format = banner
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_lowercase();

        ctx.record.outputs.media = Some(MediaInfo {
            path: target,
            source_path: banner,
            width,
            height,
            format,
        });
        Ok(())
    }
}
