//! Scheduled archive-then-delete retention for signature collection.
//!
//! Signatures and validations arrive on two intake queues into a processing
//! database. Once a record's validation window has closed and both queues
//! have drained past it, [`archive::ArchiveWorkflow`] copies it into a
//! separate archive database and removes it from processing storage.

pub mod archive;
pub mod config;
pub mod db;
pub mod models;
pub mod observability;
