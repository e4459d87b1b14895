use std::path::Path;

use tracing::info;

use crate::catalog::EntityResolver;
use crate::job::Insight;
use crate::pipeline::context::StepContext;
use crate::pipeline::error::StepError;
use crate::pipeline::registry::StepHandler;

/// Written by the insight-extraction step when it runs out of process.
pub const INSIGHT_FILE: &str = "insight.json";

/// Resolves the extracted entity mention against the catalog. Finding no
/// mention, or no match, still completes the step.
pub struct ResolveEntityStep {
    resolver: EntityResolver,
}

impl ResolveEntityStep {
    pub fn new(resolver: EntityResolver) -> Self {
        Self { resolver }
    }
}

impl StepHandler for ResolveEntityStep {
    fn run(&self, ctx: &mut StepContext<'_>) -> Result<(), StepError> {
        if ctx.record.outputs.insight.is_none() {
            ctx.record.outputs.insight = read_insight(&ctx.job_dir.join(INSIGHT_FILE))?;
        }

        let insight = ctx.record.outputs.insight.clone().unwrap_or_default();
        let name = insight.entity_name.as_deref().map(str::trim).unwrap_or("");
        let code = insight.entity_code.as_deref();

        let entity_match = if name.is_empty() && code.map_or(true, |c| c.trim().is_empty()) {
            None
        } else {
            self.resolver.resolve(name, code)
        };

        match &entity_match {
            Some(m) => info!(
                "Resolved '{}' to {} ({}, {:.1})",
                name, m.entity.id, m.strategy, m.score
            ),
            None => info!("No entity match for '{}'", name),
        }
        ctx.record.outputs.entity_match = entity_match;
        Ok(())
    }
}

fn read_insight(path: &Path) -> Result<Option<Insight>, StepError> {
    if !path.is_file() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(path)
        .map_err(|e| StepError::Failed(format!("Failed to read {}: {}", path.display(), e)))?;
    serde_json::from_str(&content)
        .map(Some)
        .map_err(|e| StepError::Failed(format!("Invalid insight in {}: {}", path.display(), e)))
}
