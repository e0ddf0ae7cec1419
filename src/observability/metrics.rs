//! Prometheus metrics for the archiver.
//!
//! Provides metrics for:
//! - Row counts of every processing and archive table
//! - Records added to and removed from each table
//! - Workflow runs, their duration and failing steps

#[cfg(feature = "prometheus")]
use std::sync::OnceLock;

#[cfg(feature = "prometheus")]
use metrics::{counter, gauge, histogram};
#[cfg(feature = "prometheus")]
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::config::MetricsConfig;

/// Global Prometheus handle for rendering metrics.
#[cfg(feature = "prometheus")]
static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Initialize the metrics system with the given configuration.
///
/// With `listen_address` set, a scrape endpoint is spawned onto the current
/// Tokio runtime.
#[cfg(feature = "prometheus")]
pub fn init_metrics(config: &MetricsConfig) -> Result<(), MetricsError> {
    if !config.enabled {
        return Ok(());
    }

    let builder = PrometheusBuilder::new()
        .set_buckets_for_metric(
            metrics_exporter_prometheus::Matcher::Suffix("_duration_seconds".to_string()),
            &config.duration_buckets_secs,
        )
        .map_err(|e| MetricsError::Setup(e.to_string()))?;

    let handle = match config.listen_address {
        Some(addr) => {
            let (recorder, exporter) = builder.with_http_listener(addr).build()?;
            let handle = recorder.handle();
            metrics::set_global_recorder(recorder)
                .map_err(|_| MetricsError::Setup("Metrics recorder already installed".into()))?;
            tokio::spawn(async move {
                if let Err(e) = exporter.await {
                    tracing::error!(error = ?e, "Prometheus exporter stopped");
                }
            });
            tracing::info!(%addr, "Prometheus metrics endpoint listening");
            handle
        }
        None => builder.install_recorder()?,
    };

    PROMETHEUS_HANDLE
        .set(handle)
        .map_err(|_| MetricsError::Setup("Metrics already initialized".to_string()))?;

    Ok(())
}

/// Initialize the metrics system (no-op without prometheus feature).
#[cfg(not(feature = "prometheus"))]
pub fn init_metrics(_config: &MetricsConfig) -> Result<(), MetricsError> {
    Ok(())
}

/// Render the current metrics in Prometheus text format.
///
/// Returns `None` when metrics were never initialized.
pub fn render_metrics() -> Option<String> {
    #[cfg(feature = "prometheus")]
    {
        PROMETHEUS_HANDLE.get().map(|handle| handle.render())
    }
    #[cfg(not(feature = "prometheus"))]
    {
        None
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Metric Recording Functions
// ─────────────────────────────────────────────────────────────────────────────

/// Record the row count of a table.
///
/// # Arguments
/// * `store` - The table name (e.g., "pending_signatures", "not_validated_signatures")
/// * `size` - The number of rows after the latest transition
pub fn record_store_size(store: &str, size: i64) {
    #[cfg(feature = "prometheus")]
    {
        gauge!("archive_store_size", "store" => store.to_string()).set(size as f64);
    }
    #[cfg(not(feature = "prometheus"))]
    {
        let _ = (store, size);
    }
}

/// Record records added to an archive table.
pub fn record_items_added(store: &str, count: u64) {
    #[cfg(feature = "prometheus")]
    {
        counter!(
            "archive_items_total",
            "store" => store.to_string(),
            "direction" => "added"
        )
        .increment(count);
    }
    #[cfg(not(feature = "prometheus"))]
    {
        let _ = (store, count);
    }
}

/// Record records removed from a processing table.
pub fn record_items_removed(store: &str, count: u64) {
    #[cfg(feature = "prometheus")]
    {
        counter!(
            "archive_items_total",
            "store" => store.to_string(),
            "direction" => "removed"
        )
        .increment(count);
    }
    #[cfg(not(feature = "prometheus"))]
    {
        let _ = (store, count);
    }
}

/// Record a finished workflow run.
///
/// # Arguments
/// * `status` - The run status (e.g., "ok", "skipped", "server_error")
/// * `duration_secs` - Wall time of the run
pub fn record_archive_run(status: &str, duration_secs: f64) {
    #[cfg(feature = "prometheus")]
    {
        counter!("archive_runs_total", "status" => status.to_string()).increment(1);
        histogram!("archive_run_duration_seconds").record(duration_secs);
    }
    #[cfg(not(feature = "prometheus"))]
    {
        let _ = (status, duration_secs);
    }
}

/// Record a failed workflow step.
pub fn record_archive_error(step: &str) {
    #[cfg(feature = "prometheus")]
    {
        counter!("archive_errors_total", "step" => step.to_string()).increment(1);
    }
    #[cfg(not(feature = "prometheus"))]
    {
        let _ = step;
    }
}

/// Metrics initialization errors.
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    #[error("Failed to set up metrics: {0}")]
    Setup(String),

    #[cfg(feature = "prometheus")]
    #[error("Failed to install metrics recorder: {0}")]
    Install(#[from] metrics_exporter_prometheus::BuildError),
}
