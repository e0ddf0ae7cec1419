//! Observability module providing logging, audit events and metrics.
//!
//! This module initializes and configures:
//! - Structured logging with configurable formats (pretty, compact, JSON)
//! - Audit events for every archive transition, emitted under the `audit` target
//! - Prometheus metrics for table sizes, moved records and workflow runs

pub mod audit;
pub mod metrics;
mod tracing_init;

pub use tracing_init::*;
