//! Moves closed signature and validation records from the processing
//! database into the archive database.
//!
//! A run derives a watermark from the intake queues, then for each record
//! category copies everything closed before it into the archive and deletes
//! it from processing storage. Orphaned validations are matched by secret key
//! rather than by timestamp alone, see [`OrphanReconciler`].

mod error;
mod mover;
mod orphans;
mod status;
mod watermark;
mod worker;
mod workflow;


pub use error::{ArchiveError, WatermarkError};
pub use mover::{MoveOutcome, RecordMover, TwoPassMover};
pub use orphans::{OrphanArchival, OrphanReconciler};
pub use status::{StatusCode, WorkflowOptions};
pub use watermark::{WatermarkCalculator, compute_watermark};
pub use worker::start_archive_worker;
pub use workflow::{ArchiveRunResult, ArchiveWorkflow};
