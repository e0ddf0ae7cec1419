mod common;
mod job_leases;
mod queue_status;
mod signatures;
mod validations;

pub use job_leases::SqliteJobLeaseRepo;
pub use queue_status::SqliteQueueStatusRepo;
pub use signatures::{SqliteProcessedSignatureStore, SqliteSignatureStore};
pub use validations::{SqliteProcessedValidationStore, SqliteValidationStore};
