//! Archive workflow configuration.
//!
//! # Example
//!
//! ```toml
//! [archive]
//! archive_invalid_signatures_enabled = true
//! minimum_signature_lifetime_days = 14
//! intake_queues = ["signatures", "validations"]
//! interval_secs = 3600
//! store_timeout_secs = 60
//! batch_size = 1000
//!
//! [archive.lock]
//! enabled = true
//! lease_secs = 3600
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Upper bound on `minimum_signature_lifetime_days`.
pub const MAX_MINIMUM_SIGNATURE_LIFETIME_DAYS: u32 = 36_500;

/// Upper bound on `lock.lease_secs`.
pub const MAX_LEASE_SECS: u64 = 7 * 24 * 60 * 60;

/// Archive workflow configuration.
///
/// Resolved once per invocation and handed to the workflow unchanged.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ArchiveConfig {
    /// Copy expired records to the archive before deleting them.
    /// When false, records are deleted without being copied to the archive;
    /// applies to all four categories.
    /// Default: true
    #[serde(default = "default_true")]
    pub archive_invalid_signatures_enabled: bool,

    /// No record younger than this (by validation close) is ever touched.
    /// At most 36500 (100 years).
    /// Default: 14 days
    #[serde(default = "default_minimum_signature_lifetime_days")]
    pub minimum_signature_lifetime_days: u32,

    /// Intake queues that must report a "last emptied" time.
    /// Default: ["signatures", "validations"]
    #[serde(default = "default_intake_queues")]
    pub intake_queues: Vec<String>,

    /// How often the background worker runs (in seconds).
    /// Default: 3600 (hourly)
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// Upper bound on any single store operation (in seconds).
    /// Default: 60
    #[serde(default = "default_store_timeout_secs")]
    pub store_timeout_secs: u64,

    /// Rows per delete statement.
    /// Default: 1000
    #[serde(default = "default_batch_size")]
    pub batch_size: u32,

    /// Count what would be moved without writing anything.
    #[serde(default)]
    pub dry_run: bool,

    /// Job name used for logs and the job lease.
    #[serde(default = "default_job_name")]
    pub job_name: String,

    /// Single-run lease shared by all workers.
    #[serde(default)]
    pub lock: ArchiveLockConfig,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            archive_invalid_signatures_enabled: true,
            minimum_signature_lifetime_days: default_minimum_signature_lifetime_days(),
            intake_queues: default_intake_queues(),
            interval_secs: default_interval_secs(),
            store_timeout_secs: default_store_timeout_secs(),
            batch_size: default_batch_size(),
            dry_run: false,
            job_name: default_job_name(),
            lock: ArchiveLockConfig::default(),
        }
    }
}

impl ArchiveConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.intake_queues.is_empty() {
            return Err(ConfigError::Validation(
                "archive.intake_queues must name at least one queue".into(),
            ));
        }
        if self.intake_queues.iter().any(|q| q.trim().is_empty()) {
            return Err(ConfigError::Validation(
                "archive.intake_queues cannot contain empty names".into(),
            ));
        }
        if self.batch_size == 0 {
            return Err(ConfigError::Validation(
                "archive.batch_size must be greater than 0".into(),
            ));
        }
        if self.store_timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "archive.store_timeout_secs must be greater than 0".into(),
            ));
        }
        if self.interval_secs == 0 {
            return Err(ConfigError::Validation(
                "archive.interval_secs must be greater than 0".into(),
            ));
        }
        if self.job_name.is_empty() {
            return Err(ConfigError::Validation(
                "archive.job_name cannot be empty".into(),
            ));
        }
        if self.minimum_signature_lifetime_days > MAX_MINIMUM_SIGNATURE_LIFETIME_DAYS {
            return Err(ConfigError::Validation(format!(
                "archive.minimum_signature_lifetime_days must be at most {}",
                MAX_MINIMUM_SIGNATURE_LIFETIME_DAYS
            )));
        }
        if self.lock.lease_secs > MAX_LEASE_SECS {
            return Err(ConfigError::Validation(format!(
                "archive.lock.lease_secs must be at most {MAX_LEASE_SECS}"
            )));
        }
        if self.lock.enabled && self.lock.lease_secs == 0 {
            return Err(ConfigError::Validation(
                "archive.lock.lease_secs must be greater than 0 when the lock is enabled".into(),
            ));
        }
        Ok(())
    }

    pub fn minimum_signature_lifetime(&self) -> chrono::Duration {
        chrono::Duration::days(i64::from(self.minimum_signature_lifetime_days))
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_secs(self.store_timeout_secs)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

/// Job lease settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ArchiveLockConfig {
    /// Take a lease in the processing database before each run and skip the
    /// run if another worker holds it.
    /// Default: false
    #[serde(default)]
    pub enabled: bool,

    /// Lease lifetime (in seconds). A crashed holder's lease is taken over
    /// once this elapses. At most 604800 (one week).
    /// Default: 3600
    #[serde(default = "default_lease_secs")]
    pub lease_secs: u64,
}

impl Default for ArchiveLockConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            lease_secs: default_lease_secs(),
        }
    }
}

impl ArchiveLockConfig {
    /// Lease lifetime, saturating at `chrono::Duration::MAX` for unvalidated values.
    pub fn lease_ttl(&self) -> chrono::Duration {
        i64::try_from(self.lease_secs)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .unwrap_or(chrono::Duration::MAX)
    }
}

fn default_true() -> bool {
    true
}

fn default_minimum_signature_lifetime_days() -> u32 {
    14
}

fn default_intake_queues() -> Vec<String> {
    vec!["signatures".to_string(), "validations".to_string()]
}

fn default_interval_secs() -> u64 {
    3600
}

fn default_store_timeout_secs() -> u64 {
    60
}

fn default_batch_size() -> u32 {
    1000
}

fn default_job_name() -> String {
    "archive".to_string()
}

fn default_lease_secs() -> u64 {
    3600
}
