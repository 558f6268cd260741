//! Typed error hierarchy for the maintenance planner.
//!
//! Three enums cover the three failure classes:
//! - `ValidationErrors`: malformed scheduling input, reported per field
//! - `StoreError`: integrity failures rejected by the domain store
//! - `SyncError`: persistence transport failures

use std::collections::BTreeMap;
use std::path::PathBuf;

use thiserror::Error;

/// Field-level validation failures, keyed by the offending input field.
///
/// Rejected requests never create entities; the map is handed back to the
/// caller so each message can be shown next to its field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Error)]
#[error("Invalid request: {}", render_fields(.fields))]
pub struct ValidationErrors {
    fields: BTreeMap<String, String>,
}

fn render_fields(fields: &BTreeMap<String, String>) -> String {
    fields
        .iter()
        .map(|(field, message)| format!("{}: {}", field, message))
        .collect::<Vec<_>>()
        .join("; ")
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a failure for `field`. The first message per field wins.
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.fields
            .entry(field.to_string())
            .or_insert_with(|| message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    pub fn fields(&self) -> &BTreeMap<String, String> {
        &self.fields
    }

    /// `Ok(())` when nothing was recorded, otherwise `Err(self)`.
    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

/// Integrity failures from the domain store. A rejected action leaves the
/// state untouched.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Unknown defect category '{category}' (expected ernstig, serieus or gering)")]
    UnknownSeverity { category: String },

    #[error("Element {id} not found")]
    ElementNotFound { id: String },

    #[error("Space {id} not found")]
    SpaceNotFound { id: String },

    #[error("Task {task_id} not found on element {element_id}")]
    TaskNotFound { element_id: String, task_id: String },

    #[error("Task group {id} not found")]
    TaskGroupNotFound { id: String },

    #[error("Offer group {id} not found")]
    OfferGroupNotFound { id: String },

    #[error("Inspection report {report_id} not found on element {element_id}")]
    InspectionReportNotFound {
        element_id: String,
        report_id: String,
    },

    #[error("{kind} with id {id} already exists")]
    DuplicateId { kind: &'static str, id: String },

    #[error(transparent)]
    Validation(#[from] ValidationErrors),
}

/// Failures at the persistence boundary. These never roll back in-memory
/// state.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Persistence endpoint returned status {status} for record {record_id}")]
    Status { status: u16, record_id: String },

    #[error("Record {record_id} not found")]
    RecordNotFound { record_id: String },

    #[error("Invalid record id '{record_id}'")]
    InvalidRecordId { record_id: String },

    #[error("Invalid persistence endpoint '{url}'")]
    InvalidUrl { url: String },

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to decode snapshot: {0}")]
    Decode(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_errors_keep_first_message_per_field() {
        let mut errors = ValidationErrors::new();
        errors.add("periodicityMonths", "must be a positive whole number");
        errors.add("periodicityMonths", "second message");
        errors.add("baseDate", "must be a valid date (YYYY-MM-DD)");

        assert_eq!(errors.len(), 2);
        assert_eq!(
            errors.get("periodicityMonths"),
            Some("must be a positive whole number")
        );
    }

    #[test]
    fn test_validation_errors_display_lists_fields() {
        let mut errors = ValidationErrors::new();
        errors.add("cost", "must be a positive number");
        let rendered = errors.to_string();
        assert!(rendered.contains("cost: must be a positive number"));
    }

    #[test]
    fn test_empty_validation_errors_into_result_is_ok() {
        assert!(ValidationErrors::new().into_result().is_ok());
    }

    #[test]
    fn test_store_error_unknown_severity_carries_category() {
        let err = StoreError::UnknownSeverity {
            category: "kritiek".to_string(),
        };
        match &err {
            StoreError::UnknownSeverity { category } => assert_eq!(category, "kritiek"),
            _ => panic!("Expected UnknownSeverity"),
        }
        assert!(err.to_string().contains("kritiek"));
    }

    #[test]
    fn test_store_error_converts_from_validation() {
        let mut errors = ValidationErrors::new();
        errors.add("name", "must not be empty");
        let err: StoreError = errors.into();
        assert!(matches!(err, StoreError::Validation(_)));
    }

    #[test]
    fn test_sync_error_status_is_matchable() {
        let err = SyncError::Status {
            status: 503,
            record_id: "abc".to_string(),
        };
        assert!(matches!(err, SyncError::Status { status: 503, .. }));
        assert!(err.to_string().contains("503"));
    }

    #[test]
    fn test_all_error_types_implement_std_error_trait() {
        fn assert_std_error<E: std::error::Error>(_: &E) {}
        assert_std_error(&ValidationErrors::new());
        assert_std_error(&StoreError::TaskGroupNotFound { id: "g".into() });
        assert_std_error(&SyncError::RecordNotFound {
            record_id: "r".into(),
        });
    }
}
