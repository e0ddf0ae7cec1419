use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A signature submission.
///
/// The same shape is stored in `pending_signatures` while the signature waits
/// for its validation, and in `not_validated_signatures` once it has been
/// archived without ever being validated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    /// Signature ID
    pub sid: Uuid,
    /// Secret key linking the signature to its validation
    pub secret_validation_key: String,
    /// API key of the partner that submitted the signature
    pub source_api_key: String,
    pub petition_id: String,
    /// When the petition stops accepting signatures
    pub timestamp_petition_close: DateTime<Utc>,
    /// After this instant the signature can no longer be validated
    pub timestamp_validation_close: DateTime<Utc>,
    #[serde(flatten)]
    pub personal: PersonalData,
    pub timestamp_initiated_validation: DateTime<Utc>,
    pub timestamp_received_signature: DateTime<Utc>,
}

/// Personal fields entered by the signer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonalData {
    pub first_name: String,
    pub last_name: String,
    pub birth_date: Option<NaiveDate>,
    pub street_address: String,
    pub zip_code: String,
    pub city: String,
}

/// A signature that completed its workflow before the petition closed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessedSignature {
    #[serde(flatten)]
    pub signature: Signature,
    pub timestamp_processed_signature: DateTime<Utc>,
}
