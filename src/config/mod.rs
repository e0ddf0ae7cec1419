//! Configuration module for the signature archiver.
//!
//! The archiver is configured via a TOML file, with support for environment
//! variable interpolation using `${VAR_NAME}` syntax.
//!
//! # Example
//!
//! ```toml
//! [processing_database]
//! type = "postgres"
//! url = "postgres://archiver:${PROCESSING_DB_PASSWORD}@db/processing"
//!
//! [archive_database]
//! type = "postgres"
//! url = "postgres://archiver:${ARCHIVE_DB_PASSWORD}@db/archive"
//!
//! [archive]
//! minimum_signature_lifetime_days = 14
//! ```

mod archive;
mod database;
mod observability;

use std::{path::Path, sync::LazyLock};

pub use archive::*;
pub use database::*;
pub use observability::*;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Root configuration for the signature archiver.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ArchiverConfig {
    /// Database holding live signatures, validations and queue status.
    #[serde(default)]
    pub processing_database: DatabaseConfig,

    /// Database receiving archived copies.
    #[serde(default)]
    pub archive_database: DatabaseConfig,

    /// Archive workflow settings.
    #[serde(default)]
    pub archive: ArchiveConfig,

    /// Observability configuration (logging, metrics).
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl ArchiverConfig {
    /// Load configuration from a TOML file.
    ///
    /// Environment variables in the format `${VAR_NAME}` are expanded.
    /// Missing required variables will cause an error.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::Io(e, path.as_ref().to_path_buf()))?;

        Self::from_str(&contents)
    }

    /// Parse configuration from a TOML string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(contents: &str) -> Result<Self, ConfigError> {
        let expanded = expand_env_vars(contents)?;

        // Pre-check so a missing cargo feature is reported by name instead of
        // as an "unknown variant" error.
        let raw: toml::Value = toml::from_str(&expanded).map_err(ConfigError::Parse)?;
        check_disabled_features(&raw)?;

        let config: ArchiverConfig = toml::from_str(&expanded).map_err(ConfigError::Parse)?;
        config.validate()?;

        Ok(config)
    }

    /// Validate the configuration for consistency and completeness.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.processing_database.is_none() {
            return Err(ConfigError::Validation(
                "processing_database must be configured".into(),
            ));
        }
        if self.archive_database.is_none() {
            return Err(ConfigError::Validation(
                "archive_database must be configured".into(),
            ));
        }

        self.processing_database.validate()?;
        self.archive_database.validate()?;
        self.archive.validate()?;

        Ok(())
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {1}: {0}")]
    Io(std::io::Error, std::path::PathBuf),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Environment variable not found: {0}")]
    EnvVarNotFound(String),

    #[error("Configuration validation error: {0}")]
    Validation(String),
}

/// Check for feature-gated configuration values before typed deserialization.
fn check_disabled_features(raw: &toml::Value) -> Result<(), ConfigError> {
    let mut issues: Vec<(String, &str)> = Vec::new();

    for section in ["processing_database", "archive_database"] {
        if let Some(type_val) = raw
            .get(section)
            .and_then(|v| v.get("type"))
            .and_then(|v| v.as_str())
        {
            check_database_feature(section, type_val, &mut issues);
        }
    }

    if raw
        .get("observability")
        .and_then(|v| v.get("metrics"))
        .and_then(|v| v.get("listen_address"))
        .is_some()
    {
        check_metrics_feature(&mut issues);
    }

    if issues.is_empty() {
        return Ok(());
    }

    let details = issues
        .iter()
        .map(|(msg, _)| msg.as_str())
        .collect::<Vec<_>>()
        .join("\n  - ");
    let mut features = issues.iter().map(|(_, feat)| *feat).collect::<Vec<_>>();
    features.dedup();

    Err(ConfigError::Validation(format!(
        "Configuration requires features not compiled in this build:\n  \
         - {details}\n\n\
         Rebuild with: cargo build --features {}\n\
         Or use the 'full' profile: cargo build --features full",
        features.join(",")
    )))
}

fn check_database_feature(_section: &str, type_val: &str, _issues: &mut Vec<(String, &str)>) {
    match type_val {
        #[cfg(not(feature = "database-sqlite"))]
        "sqlite" => _issues.push((
            format!("{_section} type 'sqlite' requires the 'database-sqlite' feature"),
            "database-sqlite",
        )),
        #[cfg(not(feature = "database-postgres"))]
        "postgres" => _issues.push((
            format!("{_section} type 'postgres' requires the 'database-postgres' feature"),
            "database-postgres",
        )),
        _ => {}
    }
}

fn check_metrics_feature(_issues: &mut Vec<(String, &str)>) {
    #[cfg(not(feature = "prometheus"))]
    _issues.push((
        "observability.metrics.listen_address requires the 'prometheus' feature".into(),
        "prometheus",
    ));
}

static ENV_VAR_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("env var pattern is valid"));

/// Expand environment variables in the format `${VAR_NAME}`.
/// Skips commented lines (lines where content before the variable is a comment).
fn expand_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut result = String::with_capacity(input.len());

    for line in input.lines() {
        let comment_pos = line.find('#');

        let mut line_result = String::with_capacity(line.len());
        let mut last_end = 0;

        for cap in ENV_VAR_PATTERN.captures_iter(line) {
            let Some(whole) = cap.get(0) else {
                continue;
            };

            if let Some(pos) = comment_pos
                && whole.start() >= pos
            {
                continue;
            }

            line_result.push_str(&line[last_end..whole.start()]);

            let var_name = &cap[1];
            let value = std::env::var(var_name)
                .map_err(|_| ConfigError::EnvVarNotFound(var_name.to_string()))?;
            line_result.push_str(&value);

            last_end = whole.end();
        }

        line_result.push_str(&line[last_end..]);
        result.push_str(&line_result);
        result.push('\n');
    }

    // Remove trailing newline if input didn't have one
    if !input.ends_with('\n') && result.ends_with('\n') {
        result.pop();
    }

    Ok(result)
}
