use serde::{Deserialize, Serialize};

/// The four kinds of record moved from processing into archive storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordCategory {
    /// Pending signatures that were never validated before their validation closed
    InvalidSignatures,
    /// Validations with no matching pending signature
    OrphanedValidations,
    ProcessedSignatures,
    ProcessedValidations,
}

impl RecordCategory {
    pub const ALL: [RecordCategory; 4] = [
        RecordCategory::InvalidSignatures,
        RecordCategory::OrphanedValidations,
        RecordCategory::ProcessedSignatures,
        RecordCategory::ProcessedValidations,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RecordCategory::InvalidSignatures => "invalid_signatures",
            RecordCategory::OrphanedValidations => "orphaned_validations",
            RecordCategory::ProcessedSignatures => "processed_signatures",
            RecordCategory::ProcessedValidations => "processed_validations",
        }
    }

    /// Table in the processing database holding live records of this category.
    pub fn processing_table(&self) -> &'static str {
        match self {
            RecordCategory::InvalidSignatures => "pending_signatures",
            RecordCategory::OrphanedValidations => "validations",
            RecordCategory::ProcessedSignatures => "processed_signatures",
            RecordCategory::ProcessedValidations => "processed_validations",
        }
    }

    /// Append-only table in the archive database.
    pub fn archive_table(&self) -> &'static str {
        match self {
            RecordCategory::InvalidSignatures => "not_validated_signatures",
            RecordCategory::OrphanedValidations => "orphaned_validations",
            RecordCategory::ProcessedSignatures => "archived_processed_signatures",
            RecordCategory::ProcessedValidations => "archived_processed_validations",
        }
    }
}

impl std::fmt::Display for RecordCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
