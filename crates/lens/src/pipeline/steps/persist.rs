use tracing::info;

use crate::catalog::EntityMatch;
use crate::job::{JobRecord, PersistReport};
use crate::pipeline::context::StepContext;
use crate::pipeline::error::StepError;
use crate::pipeline::registry::StepHandler;

/// External persistence collaborator (e.g. a database sync).
pub trait RecordSink: Send + Sync {
    fn persist(
        &self,
        record: &JobRecord,
        entity_match: Option<&EntityMatch>,
    ) -> Result<PersistReport, StepError>;
}

pub struct PersistRecordStep {
    sink: Box<dyn RecordSink>,
}

impl PersistRecordStep {
    pub fn new(sink: Box<dyn RecordSink>) -> Self {
        Self { sink }
    }
}

impl StepHandler for PersistRecordStep {
    fn run(&self, ctx: &mut StepContext<'_>) -> Result<(), StepError> {
        let report = self
            .sink
            .persist(&*ctx.record, ctx.record.outputs.entity_match.as_ref())?;
        info!("Persisted {} ({})", report.record_id, report.operation);
        ctx.record.outputs.persisted = Some(report);
        Ok(())
    }
}
