mod common;
mod job_leases;
mod queue_status;
mod signatures;
mod validations;

pub use job_leases::PostgresJobLeaseRepo;
pub use queue_status::PostgresQueueStatusRepo;
pub use signatures::{PostgresProcessedSignatureStore, PostgresSignatureStore};
pub use validations::{PostgresProcessedValidationStore, PostgresValidationStore};
