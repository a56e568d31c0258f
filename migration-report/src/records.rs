//! Migrated record store and serial fan-out

use crate::error::{ReportError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Full migrated payloads keyed by record identity
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordStore {
    records: BTreeMap<String, Value>,
}

impl RecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `payload` under `identity`, returning the payload it replaced
    pub fn put(&mut self, identity: &str, payload: Value) -> Option<Value> {
        self.records.insert(identity.to_string(), payload)
    }

    pub fn get(&self, identity: &str) -> Option<&Value> {
        self.records.get(identity)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.records.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&String, &mut Value)> {
        self.records.iter_mut()
    }

    /// Fold a previously persisted store into this one, in-memory records win
    pub fn absorb(&mut self, persisted: RecordStore) -> usize {
        let mut absorbed = 0;
        for (identity, record) in persisted.records {
            if let std::collections::btree_map::Entry::Vacant(slot) = self.records.entry(identity) {
                slot.insert(record);
                absorbed += 1;
            }
        }
        absorbed
    }
}

/// One serial record narrowed to a single title
#[derive(Debug, Clone, PartialEq)]
pub struct SerialVariant {
    /// Title text, the identity of this variant
    pub title: String,
    /// ISSN carried by the payload, if any
    pub issn: Option<String>,
    /// Independent copy of the payload with `title` narrowed and `recid` removed
    pub record: Value,
}

/// Title text of a single `title` value
///
/// Accepts both the `{"title": "..."}` object produced by the serial model
/// and a bare string.
pub fn title_text(title: &Value) -> Option<&str> {
    match title {
        Value::String(s) => Some(s.as_str()),
        Value::Object(map) => map.get("title").and_then(Value::as_str),
        _ => None,
    }
}

/// Split a migrated serial payload into one variant per title
///
/// Every variant is built from its own deep copy of the payload; siblings
/// never share any part of the structure. The top-level `recid` is dropped
/// because serial records are keyed by title.
pub fn fan_out_serial(record: Value) -> Result<Vec<SerialVariant>> {
    let Value::Object(mut base) = record else {
        return Err(ReportError::Precondition(
            "serial record payload is not a JSON object".to_string(),
        ));
    };

    base.remove("recid");
    let titles = match base.remove("title") {
        Some(Value::Array(titles)) if titles.is_empty() => {
            return Err(ReportError::Precondition(
                "serial record has an empty title list".to_string(),
            ));
        }
        Some(Value::Array(titles)) => titles,
        Some(Value::Null) | None => {
            return Err(ReportError::Precondition(
                "serial record has no title".to_string(),
            ));
        }
        Some(single) => vec![single],
    };
    let issn = read_issn(&base)?;

    let mut variants = Vec::with_capacity(titles.len());
    for title in titles {
        let text = title_text(&title)
            .ok_or_else(|| {
                ReportError::Precondition(format!("serial title has no title text: {}", title))
            })?
            .to_string();

        let mut copy: Map<String, Value> = base.clone();
        copy.insert("title".to_string(), title);
        variants.push(SerialVariant {
            title: text,
            issn: issn.clone(),
            record: Value::Object(copy),
        });
    }
    Ok(variants)
}

fn read_issn(record: &Map<String, Value>) -> Result<Option<String>> {
    match record.get("issn") {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(issn)) => Ok(Some(issn.clone())),
        Some(other) => Err(ReportError::Precondition(format!(
            "serial issn is not a string: {}",
            other
        ))),
    }
}
