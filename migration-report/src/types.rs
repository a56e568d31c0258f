//! Record identities and the transformation boundary model
//!
//! The MARC transformation itself lives outside this crate. For every input
//! item it hands over a [`TransformOutcome`]: the migrated payload (if any),
//! the field-level issues raised while mapping, and the fatal failure when no
//! record could be produced.

use migration_common::Error;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Record id assigned by the source catalogue
///
/// Ids are usually integers but some legacy dumps carry strings. JSON object
/// keys use the [`fmt::Display`] form, entries keep the typed value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    Number(u64),
    Text(String),
}

impl RecordId {
    /// Read an id from a JSON value (non-negative integer or non-empty string)
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_u64().map(RecordId::Number),
            Value::String(s) if !s.trim().is_empty() => Some(Self::from_text(s)),
            _ => None,
        }
    }

    /// Id from text, numeric when the text is a canonical integer
    ///
    /// `"42"` and `42` must address the same store entry, so both become
    /// `Number(42)`. Forms such as `"042"` stay text.
    pub fn from_text(text: &str) -> Self {
        match text.parse::<u64>() {
            Ok(n) if n.to_string() == text => RecordId::Number(n),
            _ => RecordId::Text(text.to_string()),
        }
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordId::Number(n) => write!(f, "{}", n),
            RecordId::Text(s) => f.write_str(s),
        }
    }
}

impl From<u64> for RecordId {
    fn from(n: u64) -> Self {
        RecordId::Number(n)
    }
}

impl From<&str> for RecordId {
    fn from(s: &str) -> Self {
        RecordId::from_text(s)
    }
}

/// Resolve the identity of an input item or payload
///
/// `recid` first, then the `legacy_recid` fallback used by dumps whose
/// primary id was lost in an early failure.
pub fn resolve_record_id(item: &Value) -> Option<RecordId> {
    item.get("recid")
        .and_then(RecordId::from_value)
        .or_else(|| item.get("legacy_recid").and_then(RecordId::from_value))
}

/// Record family being migrated, selected once per batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordType {
    /// Single bibliographic records keyed by recid
    Document,
    /// Recurring publications keyed by title
    Serial,
}

impl RecordType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::Document => "document",
            RecordType::Serial => "serial",
        }
    }

    /// Statistics document name inside the logs directory
    pub fn stats_file_name(&self) -> &'static str {
        match self {
            RecordType::Document => "stats_document.json",
            RecordType::Serial => "stats_serial.json",
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordType {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            // multipart monographs are logged exactly like documents
            "document" | "multipart" => Ok(RecordType::Document),
            "serial" => Ok(RecordType::Serial),
            other => Err(Error::InvalidInput(format!(
                "Unknown record type '{}' (expected document, multipart or serial)",
                other
            ))),
        }
    }
}

/// Classified issue raised by the transformation for one record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "category", rename_all = "snake_case")]
pub enum MigrationIssue {
    /// Field needs a human decision
    ManualMigrationRequired { field: String },
    /// Field value outside the expected shape or vocabulary
    UnexpectedValue {
        field: String,
        #[serde(default)]
        value: Value,
    },
    /// Mandatory field absent
    MissingRequiredField { field: String },
    /// Fields dropped to produce a valid record
    LossyConversion { missing: Vec<String> },
    /// No transformation model matched the record shape
    ModelUnresolved,
    /// Mapping looked up a key the input did not have
    MissingKey { key: String },
    /// Anything else
    Unclassified { message: String },
}

impl MigrationIssue {
    /// Taxonomy name of the issue
    pub fn category(&self) -> &'static str {
        match self {
            MigrationIssue::ManualMigrationRequired { .. } => "manual_migration_required",
            MigrationIssue::UnexpectedValue { .. } => "unexpected_value",
            MigrationIssue::MissingRequiredField { .. } => "missing_required_field",
            MigrationIssue::LossyConversion { .. } => "lossy_conversion",
            MigrationIssue::ModelUnresolved => "model_unresolved",
            MigrationIssue::MissingKey { .. } => "missing_key",
            MigrationIssue::Unclassified { .. } => "unclassified",
        }
    }

    /// MARC field key the issue refers to, if any
    pub fn field(&self) -> Option<&str> {
        match self {
            MigrationIssue::ManualMigrationRequired { field }
            | MigrationIssue::UnexpectedValue { field, .. }
            | MigrationIssue::MissingRequiredField { field } => Some(field.as_str()),
            MigrationIssue::MissingKey { key } => Some(key.as_str()),
            _ => None,
        }
    }
}

impl fmt::Display for MigrationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MigrationIssue::UnexpectedValue { field, value } => {
                write!(f, "unexpected value {} in field {}", value, field)
            }
            MigrationIssue::LossyConversion { missing } => {
                write!(f, "lossy conversion, lost fields: {}", missing.join(", "))
            }
            MigrationIssue::Unclassified { message } => write!(f, "unclassified: {}", message),
            other => match other.field() {
                Some(field) => write!(f, "{} in field {}", other.category(), field),
                None => f.write_str(other.category()),
            },
        }
    }
}

/// Everything the transformation reports for one input item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransformOutcome {
    /// Original input item, used to recover the identity
    pub item: Value,

    /// Migrated payload, absent when the record could not be produced
    #[serde(default)]
    pub record: Option<Value>,

    /// Non-fatal issues raised while mapping individual fields
    #[serde(default)]
    pub issues: Vec<MigrationIssue>,

    /// Fatal issue that prevented the record from being produced
    #[serde(default)]
    pub failure: Option<MigrationIssue>,
}
