//! Error classifier
//!
//! Maps a [`MigrationIssue`] onto the per-record outcome lists. Known
//! categories are absorbed into the [`OutcomeLog`]; the unclassified
//! fallback only marks the entry not clean and is handed back to the caller.

use crate::error::{ReportError, Result};
use crate::types::MigrationIssue;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// Diagnostic recorded when no transformation model matched the record
pub const MODEL_UNRESOLVED_MESSAGE: &str =
    "Model definition missing for this record. Tune the model query for this record shape";

/// One `unexpected_value` entry
///
/// Field-level problems carry the offending value and serialize as a
/// `[field, value]` pair; record-level diagnostics are plain strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UnexpectedValue {
    Field(String, Value),
    Diagnostic(String),
}

/// Accumulated classification outcome for one record identity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutcomeLog {
    /// Field keys requiring human review
    pub manual_migration: Vec<String>,
    pub unexpected_value: Vec<UnexpectedValue>,
    pub missing_required_field: Vec<String>,
    /// Field keys dropped by the most recent lossy conversion
    pub lost_data: Vec<String>,
    /// True until the first issue of any category
    pub clean: bool,
}

impl Default for OutcomeLog {
    fn default() -> Self {
        Self {
            manual_migration: Vec::new(),
            unexpected_value: Vec::new(),
            missing_required_field: Vec::new(),
            lost_data: Vec::new(),
            clean: true,
        }
    }
}

impl OutcomeLog {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Record `issue` against `log`
///
/// Lists are appended in call order, except `lost_data` which is replaced by
/// the latest lossy conversion. `identity` is only used for diagnostics.
///
/// # Errors
/// [`ReportError::Unclassified`] for [`MigrationIssue::Unclassified`]. The
/// entry is marked not clean but no list is touched.
pub fn classify(issue: &MigrationIssue, log: &mut OutcomeLog, identity: &str) -> Result<()> {
    match issue {
        MigrationIssue::ManualMigrationRequired { field } => {
            log.manual_migration.push(field.clone());
        }
        MigrationIssue::UnexpectedValue { field, value } => {
            log.unexpected_value
                .push(UnexpectedValue::Field(field.clone(), value.clone()));
        }
        MigrationIssue::MissingRequiredField { field } => {
            log.missing_required_field.push(field.clone());
        }
        MigrationIssue::LossyConversion { missing } => {
            log.lost_data = missing.clone();
        }
        MigrationIssue::ModelUnresolved => {
            log.unexpected_value
                .push(UnexpectedValue::Diagnostic(MODEL_UNRESOLVED_MESSAGE.to_string()));
        }
        MigrationIssue::MissingKey { key } => {
            log.unexpected_value
                .push(UnexpectedValue::Diagnostic(format!("'{}'", key)));
        }
        MigrationIssue::Unclassified { message } => {
            log.clean = false;
            return Err(ReportError::Unclassified {
                identity: identity.to_string(),
                message: message.clone(),
            });
        }
    }

    log.clean = false;
    debug!(identity = %identity, category = issue.category(), "Classified migration issue");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn missing(field: &str) -> MigrationIssue {
        MigrationIssue::MissingRequiredField {
            field: field.to_string(),
        }
    }

    #[test]
    fn test_new_log_is_clean() {
        let log = OutcomeLog::new();
        assert!(log.clean);
        assert!(log.manual_migration.is_empty());
        assert!(log.unexpected_value.is_empty());
        assert!(log.missing_required_field.is_empty());
        assert!(log.lost_data.is_empty());
    }

    #[test]
    fn test_lists_append_in_call_order() {
        let mut log = OutcomeLog::new();

        classify(&missing("isbn"), &mut log, "1").unwrap();
        assert!(!log.clean);

        let manual = MigrationIssue::ManualMigrationRequired {
            field: "773__".into(),
        };
        classify(&manual, &mut log, "1").unwrap();
        classify(&missing("title"), &mut log, "1").unwrap();
        classify(&manual, &mut log, "1").unwrap();

        assert_eq!(log.missing_required_field, vec!["isbn", "title"]);
        assert_eq!(log.manual_migration, vec!["773__", "773__"]);
        assert!(!log.clean);
    }

    #[test]
    fn test_lossy_conversion_replaces_lost_data() {
        let mut log = OutcomeLog::new();

        let first = MigrationIssue::LossyConversion {
            missing: vec!["a".into(), "b".into()],
        };
        let second = MigrationIssue::LossyConversion {
            missing: vec!["c".into()],
        };
        classify(&first, &mut log, "7").unwrap();
        classify(&second, &mut log, "7").unwrap();

        assert_eq!(log.lost_data, vec!["c"]);
        assert!(!log.clean);
    }

    #[test]
    fn test_diagnostics_recorded_as_text() {
        let mut log = OutcomeLog::new();

        classify(&MigrationIssue::ModelUnresolved, &mut log, "9").unwrap();
        classify(&MigrationIssue::MissingKey { key: "245__".into() }, &mut log, "9").unwrap();

        assert_eq!(
            log.unexpected_value,
            vec![
                UnexpectedValue::Diagnostic(MODEL_UNRESOLVED_MESSAGE.to_string()),
                UnexpectedValue::Diagnostic("'245__'".to_string()),
            ]
        );
    }

    #[test]
    fn test_unclassified_is_reraised_and_marks_entry_dirty() {
        let mut log = OutcomeLog::new();
        let issue = MigrationIssue::Unclassified {
            message: "division by zero".into(),
        };

        let result = classify(&issue, &mut log, "262146");

        match result {
            Err(ReportError::Unclassified { identity, message }) => {
                assert_eq!(identity, "262146");
                assert_eq!(message, "division by zero");
            }
            other => panic!("Expected Unclassified, got {:?}", other),
        }
        assert!(!log.clean);
        assert_eq!(
            log,
            OutcomeLog {
                clean: false,
                ..OutcomeLog::new()
            }
        );
    }

    #[test]
    fn test_unexpected_value_wire_format() {
        let mut log = OutcomeLog::new();
        let issue = MigrationIssue::UnexpectedValue {
            field: "language".into(),
            value: json!("xx"),
        };
        classify(&issue, &mut log, "1").unwrap();
        classify(&MigrationIssue::MissingKey { key: "x".into() }, &mut log, "1").unwrap();

        let encoded = serde_json::to_value(&log.unexpected_value).unwrap();
        assert_eq!(encoded, json!([["language", "xx"], "'x'"]));

        let decoded: Vec<UnexpectedValue> = serde_json::from_value(encoded).unwrap();
        assert_eq!(decoded, log.unexpected_value);
    }
}
