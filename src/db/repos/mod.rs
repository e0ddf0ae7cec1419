mod job_leases;
mod queue_status;
mod records;
mod validations;

pub use job_leases::*;
pub use queue_status::*;
pub use records::*;
pub use validations::*;
