use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A validation submitted by a signer following the link in their email.
///
/// Stored in `validations` until it is matched with its pending signature,
/// and in `orphaned_validations` once it has been archived as unmatched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Validation {
    /// Validation ID
    pub vid: Uuid,
    pub secret_validation_key: String,
    pub timestamp_received_validation: DateTime<Utc>,
    pub timestamp_validation_close: DateTime<Utc>,
    pub client_ip: Option<String>,
    pub petition_id: String,
}

/// A validation that was matched and counted (or deliberately discarded).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessedValidation {
    #[serde(flatten)]
    pub validation: Validation,
    pub timestamp_processed_validation: DateTime<Utc>,
}
