use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::config::schema::Config;
use crate::error::ConfigError;
use crate::job::Step;

const SCHEMA_JSON: &str = include_str!("../../../../schema/config-v1.json");

/// `<config dir>/lens/config.json`, if the platform has a config dir.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("lens").join("config.json"))
}

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_config_from_str(&content)
}

pub fn load_config_from_str(content: &str) -> Result<Config, ConfigError> {
    let json_value: serde_json::Value = serde_json::from_str(content)?;

    validate_schema(&json_value)?;

    let config: Config = serde_json::from_value(json_value)?;

    validate_config(&config)?;

    Ok(config)
}

fn validate_schema(json_value: &serde_json::Value) -> Result<(), ConfigError> {
    let schema: serde_json::Value =
        serde_json::from_str(SCHEMA_JSON).map_err(|e| ConfigError::Validation {
            message: format!("Invalid embedded schema JSON: {}", e),
        })?;

    let validator = jsonschema::validator_for(&schema).map_err(|e| ConfigError::Validation {
        message: format!("Failed to compile JSON schema: {}", e),
    })?;

    let error_messages: Vec<String> = validator
        .iter_errors(json_value)
        .map(|e| e.to_string())
        .collect();
    if !error_messages.is_empty() {
        return Err(ConfigError::SchemaValidation {
            errors: error_messages.join("; "),
        });
    }

    Ok(())
}

fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.version != "1.0" {
        return Err(ConfigError::Validation {
            message: format!("Unsupported config version: {}", config.version),
        });
    }

    let min_score = config.resolver.min_score;
    if !(0.0..=100.0).contains(&min_score) {
        return Err(ConfigError::Validation {
            message: format!("resolver.min_score must be within 0..=100, got {}", min_score),
        });
    }

    if config.batch.size < 1 {
        return Err(ConfigError::Validation {
            message: "batch.size must be at least 1".to_string(),
        });
    }

    if config.worker_count < 1 {
        return Err(ConfigError::Validation {
            message: "worker_count must be at least 1".to_string(),
        });
    }

    for name in config.steps.keys() {
        let step = Step::from_str(name)?;
        if step.is_builtin() {
            return Err(ConfigError::Validation {
                message: format!("Step '{}' is built in and cannot be overridden", step),
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::DuplicateCodePolicy;

    #[test]
    fn test_load_minimal_config() {
        let config = load_config_from_str(r#"{ "version": "1.0" }"#).unwrap();
        assert_eq!(config.batch.size, 100);
        assert_eq!(config.batch.pipeline_type, "audio-only");
        assert_eq!(config.resolver.min_score, 80.0);
        assert!(!config.resolver.case_insensitive_suffixes);
        assert!(config.worker_count >= 1);
        assert!(config.catalog.is_none());
        assert!(config.steps.is_empty());
    }

    #[test]
    fn test_load_full_config() {
        let config_json = r#"
        {
            "version": "1.0",
            "jobs_directory": "/data/jobs",
            "batch_runs_directory": "/data/runs",
            "downloads_directory": "/data/cache",
            "worker_count": 3,
            "catalog": { "path": "/data/entities.csv", "duplicate_codes": "last-write-wins" },
            "resolver": { "min_score": 85, "case_insensitive_suffixes": true },
            "batch": { "size": 25, "pipeline_type": "full" },
            "fetch": { "program": "yt-dlp", "args": ["-o", "{output_dir}/source.mp4", "{url}"] },
            "steps": {
                "transcribe": { "program": "transcribe", "args": ["{job_dir}"] }
            }
        }
        "#;

        let config = load_config_from_str(config_json).unwrap();
        assert_eq!(config.jobs_directory, PathBuf::from("/data/jobs"));
        assert_eq!(config.worker_count, 3);
        let catalog = config.catalog.unwrap();
        assert_eq!(catalog.duplicate_codes, DuplicateCodePolicy::LastWriteWins);
        assert_eq!(config.resolver.min_score, 85.0);
        assert_eq!(config.batch.size, 25);
        assert_eq!(config.fetch.unwrap().args.len(), 3);
        assert_eq!(config.steps["transcribe"].program, "transcribe");
    }

    #[test]
    fn test_wrong_version_is_rejected() {
        let result = load_config_from_str(r#"{ "version": "2.0" }"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_version_fails_schema() {
        let result = load_config_from_str(r#"{ "worker_count": 2 }"#);
        assert!(matches!(result, Err(ConfigError::SchemaValidation { .. })));
    }

    #[test]
    fn test_threshold_out_of_range() {
        let result = load_config_from_str(r#"{ "version": "1.0", "resolver": { "min_score": 120 } }"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_zero_batch_size() {
        let result = load_config_from_str(r#"{ "version": "1.0", "batch": { "size": 0 } }"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_unknown_step_key() {
        let result = load_config_from_str(
            r#"{ "version": "1.0", "steps": { "summarize": { "program": "x" } } }"#,
        );
        assert!(matches!(result, Err(ConfigError::UnknownStep(_))));
    }

    #[test]
    fn test_builtin_step_cannot_be_overridden() {
        let result = load_config_from_str(
            r#"{ "version": "1.0", "steps": { "resolve-entity": { "program": "x" } } }"#,
        );
        assert!(matches!(result, Err(ConfigError::Validation { .. })));
    }

    #[test]
    fn test_invalid_json() {
        let result = load_config_from_str("{ not json");
        assert!(matches!(result, Err(ConfigError::ParseJson(_))));
    }

    #[test]
    fn test_missing_file() {
        let result = load_config("/nonexistent/lens/config.json");
        assert!(matches!(result, Err(ConfigError::ReadFile { .. })));
    }
}
