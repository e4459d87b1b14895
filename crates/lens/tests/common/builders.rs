//! Builders for creating test data programmatically.

#![allow(dead_code)]

use std::path::Path;
use std::sync::{Arc, Mutex};

use lens::catalog::DuplicateCodePolicy;
use lens::config::CatalogConfig;
use lens::{Catalog, Config, Step, StepError, StepRegistry};

/// Builder for one catalog row.
#[derive(Clone)]
pub struct EntityBuilder {
    id: String,
    code: String,
    name: String,
    slug: String,
    metadata: Option<String>,
}

impl EntityBuilder {
    pub fn new(id: &str, code: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            code: code.to_string(),
            name: name.to_string(),
            slug: name.to_lowercase().replace(' ', "-"),
            metadata: None,
        }
    }

    /// Attach a metadata JSON object (becomes the attribute bag).
    pub fn metadata(mut self, json: &str) -> Self {
        self.metadata = Some(json.to_string());
        self
    }
}

/// Builder for catalog CSV content.
#[derive(Default)]
pub struct CatalogBuilder {
    rows: Vec<EntityBuilder>,
}

impl CatalogBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entity(mut self, id: &str, code: &str, name: &str) -> Self {
        self.rows.push(EntityBuilder::new(id, code, name));
        self
    }

    pub fn row(mut self, row: EntityBuilder) -> Self {
        self.rows.push(row);
        self
    }

    pub fn to_csv(&self) -> String {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer
            .write_record(["cik_str", "symbol", "name", "slug", "metadata_json"])
            .unwrap();
        for row in &self.rows {
            writer
                .write_record([
                    row.id.as_str(),
                    row.code.as_str(),
                    row.name.as_str(),
                    row.slug.as_str(),
                    row.metadata.as_deref().unwrap_or(""),
                ])
                .unwrap();
        }
        String::from_utf8(writer.into_inner().unwrap()).unwrap()
    }

    pub fn build(&self) -> Catalog {
        Catalog::from_reader(self.to_csv().as_bytes(), DuplicateCodePolicy::Reject).unwrap()
    }

    pub fn write_to(&self, path: &Path) {
        std::fs::write(path, self.to_csv()).unwrap();
    }
}

/// The reference catalog most resolver tests run against.
pub fn sample_catalog() -> CatalogBuilder {
    CatalogBuilder::new()
        .row(EntityBuilder::new("320193", "AAPL", "Apple").metadata(r#"{"sector":"Technology"}"#))
        .entity("789019", "MSFT", "Microsoft Corporation")
        .entity("1067983", "BRK", "Berkshire Hathaway")
        .entity("886982", "GS", "Goldman Sachs Group")
        .entity("19617", "JPM", "JPMorgan Chase & Co.")
        .entity("1326801", "META", "Meta Platforms")
        .entity("500001", "X", "Alpha Industries")
        .entity("500002", "", "X")
}

/// Builder for `Config` instances rooted in a test directory.
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new(root: &Path) -> Self {
        let mut config = Config::default();
        config.jobs_directory = root.join("jobs");
        config.batch_runs_directory = root.join("runs");
        config.downloads_directory = root.join("cache");
        config.worker_count = 2;
        Self { config }
    }

    pub fn catalog(mut self, path: &Path) -> Self {
        self.config.catalog = Some(CatalogConfig {
            path: path.to_path_buf(),
            duplicate_codes: DuplicateCodePolicy::Reject,
        });
        self
    }

    pub fn min_score(mut self, score: f64) -> Self {
        self.config.resolver.min_score = score;
        self
    }

    pub fn batch_size(mut self, size: usize) -> Self {
        self.config.batch.size = size;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(&self.config).unwrap()
    }
}

/// Every step succeeds without doing anything.
pub fn completing_registry() -> StepRegistry {
    let mut registry = StepRegistry::new();
    for step in Step::ALL {
        registry.register_fn(step, |_ctx| Ok(()));
    }
    registry
}

/// Records (job id, step) for every invocation; `fail_on` makes that step fail.
pub fn recording_registry(
    calls: &Arc<Mutex<Vec<(String, Step)>>>,
    fail_on: Option<Step>,
) -> StepRegistry {
    let mut registry = StepRegistry::new();
    for step in Step::ALL {
        let calls = Arc::clone(calls);
        registry.register_fn(step, move |ctx| {
            calls.lock().unwrap().push((ctx.record.job_id.clone(), step));
            if Some(step) == fail_on {
                return Err(StepError::Failed(format!("{} exploded", step)));
            }
            Ok(())
        });
    }
    registry
}
