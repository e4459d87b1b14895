use std::path::Path;
use std::process::Command;

use tracing::debug;

use super::persist::RecordSink;
use crate::catalog::EntityMatch;
use crate::config::CommandConfig;
use crate::job::{JobRecord, PersistReport};
use crate::pipeline::context::StepContext;
use crate::pipeline::error::StepError;
use crate::pipeline::registry::StepHandler;

/// Fills `{job_dir}`, `{job_file}`, `{job_id}`, `{source_id}` and
/// `{entity_id}` (empty when unresolved).
fn render_args(
    args: &[String],
    record: &JobRecord,
    job_dir: &Path,
    job_file: &Path,
) -> Vec<String> {
    let job_dir = job_dir.to_string_lossy();
    let job_file = job_file.to_string_lossy();
    let entity_id = record
        .outputs
        .entity_match
        .as_ref()
        .map(|m| m.entity.id.as_str())
        .unwrap_or("");
    args.iter()
        .map(|arg| {
            arg.replace("{job_dir}", &job_dir)
                .replace("{job_file}", &job_file)
                .replace("{job_id}", &record.job_id)
                .replace("{source_id}", &record.source_id)
                .replace("{entity_id}", entity_id)
        })
        .collect()
}

/// Runs `program` in `cwd` and returns its stdout.
fn run_command(program: &str, args: &[String], cwd: &Path) -> Result<String, StepError> {
    debug!("Running {} {:?}", program, args);
    let output = Command::new(program)
        .args(args)
        .current_dir(cwd)
        .output()
        .map_err(|e| StepError::Command {
            program: program.to_string(),
            reason: e.to_string(),
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(StepError::Command {
            program: program.to_string(),
            reason: format!("exited with {}: {}", output.status, stderr.trim()),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// A step delegated to an external program, run inside the job directory.
/// The program must not edit `job.yaml`; it leaves results as files.
#[derive(Debug, Clone)]
pub struct CommandStep {
    program: String,
    args: Vec<String>,
}

impl CommandStep {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    pub fn from_config(config: &CommandConfig) -> Self {
        Self::new(config.program.clone(), config.args.clone())
    }
}

impl StepHandler for CommandStep {
    fn run(&self, ctx: &mut StepContext<'_>) -> Result<(), StepError> {
        crate::storage::ensure_directory(ctx.job_dir)?;
        let args = render_args(&self.args, &*ctx.record, ctx.job_dir, ctx.job_path);
        let stdout = run_command(&self.program, &args, ctx.job_dir)?;
        if !stdout.trim().is_empty() {
            debug!("{}: {}", self.program, stdout.trim());
        }
        Ok(())
    }
}

/// Persistence collaborator backed by a program that prints a JSON
/// `{record_id, operation, updated_at}` report on stdout.
#[derive(Debug, Clone)]
pub struct CommandSink {
    program: String,
    args: Vec<String>,
    jobs_directory: std::path::PathBuf,
}

impl CommandSink {
    pub fn from_config(config: &CommandConfig, jobs_directory: impl Into<std::path::PathBuf>) -> Self {
        Self {
            program: config.program.clone(),
            args: config.args.clone(),
            jobs_directory: jobs_directory.into(),
        }
    }
}

impl RecordSink for CommandSink {
    fn persist(
        &self,
        record: &JobRecord,
        _entity_match: Option<&EntityMatch>,
    ) -> Result<PersistReport, StepError> {
        let job_dir = self.jobs_directory.join(&record.job_id);
        let job_file = job_dir.join(crate::job::JOB_FILE);
        let args = render_args(&self.args, record, &job_dir, &job_file);
        let stdout = run_command(&self.program, &args, &job_dir)?;
        serde_json::from_str(stdout.trim()).map_err(|e| StepError::Command {
            program: self.program.clone(),
            reason: format!("invalid report on stdout: {}", e),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Entity, MatchStrategy};
    use std::path::PathBuf;

    fn record() -> JobRecord {
        JobRecord::new("abc_12ef", "abc", 1, "run", "audio-only")
    }

    #[test]
    fn test_render_args() {
        let mut record = record();
        let args = vec!["--dir={job_dir}".to_string(), "{job_id}:{source_id}:{entity_id}".to_string()];
        let rendered = render_args(&args, &record, Path::new("/jobs/abc_12ef"), Path::new("/jobs/abc_12ef/job.yaml"));
        assert_eq!(rendered, vec!["--dir=/jobs/abc_12ef", "abc_12ef:abc:"]);

        record.outputs.entity_match = Some(EntityMatch {
            entity: Entity {
                id: "320193".to_string(),
                code: "AAPL".to_string(),
                name: "Apple".to_string(),
                slug: "apple".to_string(),
                attributes: serde_json::Map::new(),
            },
            score: 100.0,
            strategy: MatchStrategy::ExactCode,
        });
        let rendered = render_args(&args[1..], &record, Path::new("/j"), Path::new("/j/job.yaml"));
        assert_eq!(rendered, vec!["abc_12ef:abc:320193"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_command_step_runs_in_job_dir() {
        let temp = tempfile::TempDir::new().unwrap();
        let job_dir = temp.path().join("abc_12ef");
        let job_path = job_dir.join("job.yaml");
        let mut record = record();
        let step = CommandStep::new("sh", vec!["-c".into(), "echo '{job_id}' > transcript.txt".into()]);

        let mut ctx = StepContext::new(&mut record, &job_dir, &job_path);
        step.run(&mut ctx).unwrap();
        assert_eq!(
            std::fs::read_to_string(job_dir.join("transcript.txt")).unwrap().trim(),
            "abc_12ef"
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_command_step_failure() {
        let temp = tempfile::TempDir::new().unwrap();
        let job_path = temp.path().join("job.yaml");
        let mut record = record();
        let step = CommandStep::new("sh", vec!["-c".into(), "exit 2".into()]);

        let mut ctx = StepContext::new(&mut record, temp.path(), &job_path);
        assert!(matches!(step.run(&mut ctx), Err(StepError::Command { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn test_command_sink_parses_report() {
        let temp = tempfile::TempDir::new().unwrap();
        let record = record();
        std::fs::create_dir_all(temp.path().join(&record.job_id)).unwrap();
        let config = CommandConfig {
            program: "sh".to_string(),
            args: vec![
                "-c".to_string(),
                r#"echo '{"record_id":"{job_id}","operation":"insert","updated_at":"2024-01-01T00:00:00Z"}'"#
                    .to_string(),
            ],
        };
        let sink = CommandSink::from_config(&config, temp.path());

        let report = sink.persist(&record, None).unwrap();
        assert_eq!(report.record_id, "abc_12ef");
        assert_eq!(report.operation, "insert");

        let bad = CommandSink::from_config(
            &CommandConfig {
                program: "sh".to_string(),
                args: vec!["-c".to_string(), "echo not-json".to_string()],
            },
            PathBuf::from(temp.path()),
        );
        assert!(bad.persist(&record, None).is_err());
    }
}
