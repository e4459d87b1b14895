use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::str::FromStr;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::{error, info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::EnvFilter;

use lens::batch::{dedup_source_ids, read_source_ids, refresh_run, RUN_FILE};
use lens::config::{default_config_path, load_config};
use lens::error::ConfigError;
use lens::pipeline::BatchTracker;
use lens::{
    BatchPlanner, Catalog, Config, EntityResolver, JobStore, Pipeline, PipelineConfig, RunRecord,
    SourceRef, Status,
};

#[derive(Parser)]
#[command(name = "lens")]
#[command(about = "Resumable batch pipeline for media sources with entity resolution")]
#[command(version)]
struct Cli {
    /// Config file (defaults to <config dir>/lens/config.json when present)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Partition a list of source ids into batches of jobs
    Plan {
        /// File with one source id or URL per line
        ids_file: PathBuf,
        run_name: String,
        #[arg(long)]
        batch_size: Option<usize>,
        #[arg(long)]
        pipeline_type: Option<String>,
    },
    /// Execute every batch of a planned run, resuming where it left off
    Run {
        run_dir: PathBuf,
        #[arg(long)]
        workers: Option<usize>,
    },
    /// Re-derive and print run and batch counters
    Status { run_dir: PathBuf },
    /// Override one step's status on a job (e.g. mark it skipped)
    SetStep {
        job_file: PathBuf,
        step: String,
        status: String,
        /// Batch file to recompute afterwards
        #[arg(long, value_name = "BATCH_YAML")]
        batch: Option<PathBuf>,
    },
    /// Resolve a name (and optional code) against the catalog
    Match {
        name: String,
        #[arg(long)]
        code: Option<String>,
        #[arg(long)]
        min_score: Option<f64>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.log_json);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr)))
        .with((!json).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr)));

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to install tracing subscriber: {}", e);
    }
    // The worker pool logs through the `log` facade.
    if let Err(e) = tracing_log::LogTracer::init() {
        eprintln!("Failed to bridge log records: {}", e);
    }
}

fn load_settings(path: Option<&Path>) -> lens::Result<Config> {
    if let Some(path) = path {
        return Ok(load_config(path)?);
    }
    match default_config_path() {
        Some(path) if path.is_file() => {
            info!("Using config {}", path.display());
            Ok(load_config(&path)?)
        }
        _ => Ok(Config::default()),
    }
}

fn run(cli: Cli) -> lens::Result<()> {
    let config = load_settings(cli.config.as_deref())?;

    match cli.command {
        Commands::Plan {
            ids_file,
            run_name,
            batch_size,
            pipeline_type,
        } => cmd_plan(&config, &ids_file, &run_name, batch_size, pipeline_type),
        Commands::Run { run_dir, workers } => cmd_run(&config, &run_dir, workers),
        Commands::Status { run_dir } => cmd_status(&config, &run_dir),
        Commands::SetStep {
            job_file,
            step,
            status,
            batch,
        } => cmd_set_step(&config, &job_file, &step, &status, batch.as_deref()),
        Commands::Match {
            name,
            code,
            min_score,
        } => cmd_match(&config, &name, code.as_deref(), min_score),
    }
}

fn cmd_plan(
    config: &Config,
    ids_file: &Path,
    run_name: &str,
    batch_size: Option<usize>,
    pipeline_type: Option<String>,
) -> lens::Result<()> {
    let lines = read_source_ids(ids_file)?;
    let mut parsed = Vec::with_capacity(lines.len());
    for line in &lines {
        parsed.push(SourceRef::parse(line)?.source_id);
    }

    let (source_ids, duplicates) = dedup_source_ids(parsed);
    if duplicates > 0 {
        warn!("Dropped {} duplicate source ids", duplicates);
    }

    let store = JobStore::new(&config.jobs_directory);
    let planner = BatchPlanner::new(&config.batch_runs_directory, store);
    let pipeline_type = pipeline_type.unwrap_or_else(|| config.batch.pipeline_type.clone());
    let run = planner.plan(
        &source_ids,
        batch_size.unwrap_or(config.batch.size),
        run_name,
        &pipeline_type,
    )?;

    println!(
        "Planned run '{}': {} jobs in {} batches",
        run.run_name, run.total_videos, run.total_batches
    );
    println!("{}", planner.run_dir(run_name).display());
    Ok(())
}

fn cmd_run(config: &Config, run_dir: &Path, workers: Option<usize>) -> lens::Result<()> {
    let run: RunRecord = lens::storage::load_yaml(&run_dir.join(RUN_FILE))?;
    let pipeline = Arc::new(Pipeline::from_config(&PipelineConfig::from_config(config))?);

    let cancel = pipeline.cancellation_flag();
    if let Err(e) = ctrlc::set_handler(move || {
        eprintln!("Cancelling after the current steps finish...");
        cancel.store(true, Ordering::SeqCst);
    }) {
        warn!("Could not install Ctrl-C handler: {}", e);
    }

    let worker_count = workers.unwrap_or(config.worker_count).clamp(1, run.batches.len().max(1));
    let pool = lens::worker::WorkerPool::new(Arc::clone(&pipeline), worker_count)?;
    for batch in &run.batches {
        pool.submit(batch.batch_file())?;
    }

    for _ in 0..run.batches.len() {
        let Some(outcome) = pool.recv_result() else {
            break;
        };
        match outcome.result {
            Ok(summary) => println!(
                "batch {:03}: {} ({} completed, {} failed, {} pending){}",
                summary.batch_num,
                summary.status,
                summary.stats.completed,
                summary.stats.failed,
                summary.stats.pending,
                if summary.cancelled { " [cancelled]" } else { "" }
            ),
            Err(e) => println!("{}: error: {}", outcome.batch_path.display(), e),
        }
    }
    pool.shutdown();
    pool.wait();

    let run = refresh_run(pipeline.store(), run_dir)?;
    print_run(&run);
    if pipeline.is_cancelled() {
        info!("Run cancelled; re-run to resume");
    }
    Ok(())
}

fn cmd_status(config: &Config, run_dir: &Path) -> lens::Result<()> {
    let store = JobStore::new(&config.jobs_directory);
    let run = refresh_run(&store, run_dir)?;
    print_run(&run);
    Ok(())
}

fn print_run(run: &RunRecord) {
    let stats = &run.stats;
    println!(
        "run '{}' [{}]: {} batches, {} jobs | batches: {} pending, {} processing, {} completed, {} failed, {} skipped",
        run.run_name,
        run.status,
        run.total_batches,
        run.total_videos,
        stats.pending,
        stats.processing,
        stats.completed,
        stats.failed,
        stats.skipped
    );
    for batch in &run.batches {
        println!(
            "  batch {:03}: {} ({} jobs)",
            batch.batch_num, batch.status, batch.job_count
        );
    }
}

fn cmd_set_step(
    config: &Config,
    job_file: &Path,
    step: &str,
    status: &str,
    batch: Option<&Path>,
) -> lens::Result<()> {
    let store = JobStore::new(&config.jobs_directory);
    let mut record = store.load(job_file)?;
    let status = Status::from_str(status)?;
    store.set_step_status(&mut record, step, status)?;
    store.save(&record, job_file)?;

    if let Some(batch) = batch {
        BatchTracker::open(batch)?.sync(&record)?;
    }

    println!("{}: {} -> {} (job {})", record.job_id, step, status, record.status);
    Ok(())
}

fn cmd_match(
    config: &Config,
    name: &str,
    code: Option<&str>,
    min_score: Option<f64>,
) -> lens::Result<()> {
    let catalog_config = config.catalog.as_ref().ok_or_else(|| ConfigError::Validation {
        message: "no catalog configured".to_string(),
    })?;
    let catalog = Catalog::load(&catalog_config.path, catalog_config.duplicate_codes)?;
    let resolver = EntityResolver::with_config(Arc::new(catalog), &config.resolver);
    let threshold = min_score.unwrap_or_else(|| resolver.min_score());

    match resolver.resolve_with_threshold(name, code, threshold) {
        Some(m) => println!(
            "{}\t{}\t{}\t{:.1}\t{}",
            m.entity.id, m.entity.code, m.entity.name, m.score, m.strategy
        ),
        None => println!("no match"),
    }
    Ok(())
}
