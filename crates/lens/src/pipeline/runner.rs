use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, info, info_span, warn};

use crate::batch::{Aggregate, BatchLog, BatchRecord, StatusCounts, BATCH_LOG_FILE};
use crate::cache::{CommandFetcher, DownloadCache};
use crate::catalog::{Catalog, EntityResolver};
use crate::job::{JobRecord, JobStore, Status, Step};
use crate::media::ImageInspector;
use crate::sanitize;
use crate::storage;

use super::config::PipelineConfig;
use super::context::StepContext;
use super::error::{PipelineError, StepError};
use super::progress::{ProgressEvent, ProgressReporter};
use super::registry::{StepHandler, StepRegistry};
use super::steps::{
    CommandSink, CommandStep, ExtractMediaStep, FetchStep, PersistRecordStep, ResolveEntityStep,
};

/// What happened to one job during [`Pipeline::run_job`].
#[derive(Debug, Clone)]
pub struct JobOutcome {
    pub record: JobRecord,
    /// Steps that were started, in order.
    pub executed: Vec<Step>,
    pub cancelled: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BatchSummary {
    pub batch_num: u32,
    pub jobs_run: usize,
    /// Jobs whose record could not be loaded or saved.
    pub errors: usize,
    pub cancelled: bool,
    pub stats: StatusCounts,
    pub status: Status,
}

/// Keeps a batch record in sync with its jobs while they run.
pub struct BatchTracker {
    path: PathBuf,
    record: BatchRecord,
}

impl BatchTracker {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, PipelineError> {
        let path = path.into();
        let record = storage::load_yaml(&path)?;
        Ok(Self { path, record })
    }

    pub fn record(&self) -> &BatchRecord {
        &self.record
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Copies the job's state into the batch, recomputes counters, saves.
    pub fn sync(&mut self, job: &JobRecord) -> Result<(), PipelineError> {
        if !self.record.update_job(job) {
            warn!(
                "Job {} is not part of batch {}",
                job.job_id, self.record.batch_num
            );
            return Ok(());
        }
        storage::save_yaml(&self.path, &self.record)?;
        Ok(())
    }
}

/// Runs job steps in their fixed order with resume, per-step persistence,
/// and cooperative cancellation.
pub struct Pipeline {
    store: JobStore,
    registry: StepRegistry,
    cancel: Arc<AtomicBool>,
}

impl Pipeline {
    /// Production constructor: built-in handlers plus configured commands.
    pub fn from_config(config: &PipelineConfig) -> Result<Self, PipelineError> {
        let mut registry = StepRegistry::new();

        let cache = DownloadCache::new(&config.downloads_directory);
        let fetch = match &config.fetch {
            Some(command) => FetchStep::new(cache, Box::new(CommandFetcher::from_config(command))),
            None => FetchStep::cache_only(cache),
        };
        registry.register(Step::Fetch, fetch);

        if let Some(catalog_config) = &config.catalog {
            let catalog = Catalog::load(&catalog_config.path, catalog_config.duplicate_codes)?;
            let resolver = EntityResolver::with_config(Arc::new(catalog), &config.resolver);
            registry.register(Step::ResolveEntity, ResolveEntityStep::new(resolver));
        }

        registry.register(
            Step::ExtractMedia,
            ExtractMediaStep::new(Box::new(ImageInspector)),
        );

        for (name, command) in &config.steps {
            // Step names were validated when the config was loaded.
            let Ok(step) = name.parse::<Step>() else {
                warn!("Ignoring command for unknown step '{}'", name);
                continue;
            };
            if step == Step::PersistRecord {
                let sink = CommandSink::from_config(command, &config.jobs_directory);
                registry.register(step, PersistRecordStep::new(Box::new(sink)));
            } else {
                registry.register(step, CommandStep::from_config(command));
            }
        }

        debug!("Pipeline handlers: {:?}", registry);
        Ok(Self::new(JobStore::new(&config.jobs_directory), registry))
    }

    pub fn new(store: JobStore, registry: StepRegistry) -> Self {
        Self {
            store,
            registry,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Shares an existing cancellation flag instead of a private one.
    pub fn with_cancellation_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = flag;
        self
    }

    pub fn store(&self) -> &JobStore {
        &self.store
    }

    pub fn registry(&self) -> &StepRegistry {
        &self.registry
    }

    /// Requests a stop before the next step starts. Running steps finish.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }

    /// Shared flag, e.g. for a signal handler.
    pub fn cancellation_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    /// Runs every non-terminal step of the job at `job_path`, in order,
    /// stopping at the first failure.
    ///
    /// Each transition is saved to the job file (and the batch, if tracked)
    /// before moving on, so a crash resumes at the first non-terminal step.
    pub fn run_job(
        &self,
        job_path: &Path,
        mut tracker: Option<&mut BatchTracker>,
        progress: &dyn ProgressReporter,
    ) -> Result<JobOutcome, PipelineError> {
        let mut record = self.store.load(job_path)?;
        let job_dir = job_path.parent().unwrap_or_else(|| Path::new(".")).to_path_buf();
        let _job_span = info_span!("job",
            job_id = %record.job_id,
            source_id = %record.source_id,
            file = %sanitize::redact_path(job_path),
        )
        .entered();

        let mut executed = Vec::new();
        for step in Step::ALL {
            if record.step_status(step).is_terminal() {
                continue;
            }
            if self.is_cancelled() {
                info!("Cancelled before {}", step);
                return Ok(JobOutcome {
                    record,
                    executed,
                    cancelled: true,
                });
            }

            let _step_span = info_span!("step", step = %step).entered();
            executed.push(step);

            record.set_status(step, Status::Processing);
            self.commit(&record, job_path, tracker.as_deref_mut())?;
            progress.report(ProgressEvent::StepStarted {
                job_id: record.job_id.clone(),
                step,
            });

            let result = match self.registry.get(step) {
                Some(handler) => {
                    let mut ctx = StepContext::new(&mut record, &job_dir, job_path);
                    run_handler(handler, &mut ctx)
                }
                None => Err(StepError::NoHandler(step)),
            };

            match result {
                Ok(()) => {
                    record.set_status(step, Status::Completed);
                    if record.last_error.as_ref().is_some_and(|f| f.step == step) {
                        record.last_error = None;
                    }
                    self.commit(&record, job_path, tracker.as_deref_mut())?;
                    progress.report(ProgressEvent::StepCompleted {
                        job_id: record.job_id.clone(),
                        step,
                    });
                }
                Err(e) => {
                    warn!("Step {} failed: {}", step, e);
                    record.record_failure(step, e.to_string());
                    self.commit(&record, job_path, tracker.as_deref_mut())?;
                    progress.report(ProgressEvent::StepFailed {
                        job_id: record.job_id.clone(),
                        step,
                        error: e.to_string(),
                    });
                    break;
                }
            }
        }

        info!("Job finished with status {}", record.status);
        progress.report(ProgressEvent::JobFinished {
            job_id: record.job_id.clone(),
            status: record.status,
        });

        Ok(JobOutcome {
            record,
            executed,
            cancelled: false,
        })
    }

    /// Runs every job of the batch at `batch_path`. A job that fails, or
    /// whose record is unusable, never stops the others.
    pub fn run_batch(&self, batch_path: &Path) -> Result<BatchSummary, PipelineError> {
        let mut tracker = BatchTracker::open(batch_path)?;
        let log = BatchLog::open(batch_path.with_file_name(BATCH_LOG_FILE));
        let batch_num = tracker.record().batch_num;
        let _batch_span = info_span!("batch", batch = batch_num).entered();

        let jobs: Vec<(String, PathBuf)> = tracker
            .record()
            .jobs
            .iter()
            .map(|j| (j.job_id.clone(), j.job_yaml.clone()))
            .collect();

        let mut jobs_run = 0;
        let mut errors = 0;
        let mut cancelled = false;
        for (job_id, job_path) in jobs {
            if self.is_cancelled() {
                cancelled = true;
                break;
            }
            match self.run_job(&job_path, Some(&mut tracker), &log) {
                Ok(outcome) => {
                    jobs_run += 1;
                    if outcome.cancelled {
                        cancelled = true;
                        break;
                    }
                }
                Err(e) => {
                    errors += 1;
                    warn!("Job {} could not be run: {}", job_id, e);
                    if let Err(log_err) = log.append(&format!("{} error: {}", job_id, e)) {
                        warn!("Could not append to batch log: {}", log_err);
                    }
                }
            }
        }

        tracker.record.recompute_aggregates();
        storage::save_yaml(&tracker.path, &tracker.record)?;
        if cancelled {
            if let Err(e) = log.append("Batch run cancelled") {
                warn!("Could not append to batch log: {}", e);
            }
        }

        let stats = *tracker.record().stats();
        info!(
            "Batch {} done: {} completed, {} failed, {} pending",
            batch_num, stats.completed, stats.failed, stats.pending
        );
        Ok(BatchSummary {
            batch_num,
            jobs_run,
            errors,
            cancelled,
            stats,
            status: tracker.record().status,
        })
    }

    fn commit(
        &self,
        record: &JobRecord,
        job_path: &Path,
        tracker: Option<&mut BatchTracker>,
    ) -> Result<(), PipelineError> {
        self.store.save(record, job_path)?;
        if let Some(tracker) = tracker {
            tracker.sync(record)?;
        }
        Ok(())
    }
}

/// Runs a handler, turning a panic into an ordinary step failure so the
/// worker thread survives and the batch keeps going.
fn run_handler(handler: &dyn StepHandler, ctx: &mut StepContext<'_>) -> Result<(), StepError> {
    match panic::catch_unwind(AssertUnwindSafe(|| handler.run(ctx))) {
        Ok(result) => result,
        Err(payload) => Err(StepError::Failed(format!(
            "step panicked: {}",
            panic_message(payload.as_ref())
        ))),
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        *msg
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.as_str()
    } else {
        "unknown panic"
    }
}
