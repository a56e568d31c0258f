//! Record statistics store
//!
//! One entry per record identity (recid for documents, title for serials).
//! Registration is idempotent and classification only ever adds to an
//! entry, so a store reloaded from a previous run keeps growing.

use crate::classifier::{classify, OutcomeLog};
use crate::error::{ReportError, Result};
use crate::types::{MigrationIssue, RecordId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Access to the classification part of a statistics entry
pub trait StatsEntry {
    fn outcomes(&self) -> &OutcomeLog;
    fn outcomes_mut(&mut self) -> &mut OutcomeLog;
}

/// Statistics for one migrated document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentStats {
    pub recid: RecordId,
    #[serde(flatten)]
    pub outcomes: OutcomeLog,
}

impl DocumentStats {
    pub fn new(recid: RecordId) -> Self {
        Self {
            recid,
            outcomes: OutcomeLog::new(),
        }
    }
}

impl StatsEntry for DocumentStats {
    fn outcomes(&self) -> &OutcomeLog {
        &self.outcomes
    }

    fn outcomes_mut(&mut self) -> &mut OutcomeLog {
        &mut self.outcomes
    }
}

/// Kind of similarity relation between two serial titles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Similarity {
    /// Both entries carry the same non-null ISSN
    SameIssn,
    /// Fuzzy title ratio inside the reporting band
    SimilarTitle,
}

/// Cross-references to other serial titles flagged as probable duplicates
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Similars {
    pub same_issn: Vec<String>,
    pub similar_title: Vec<String>,
}

impl Similars {
    /// Add `title` under `kind`, returns false if it was already listed
    pub fn add(&mut self, kind: Similarity, title: &str) -> bool {
        let list = match kind {
            Similarity::SameIssn => &mut self.same_issn,
            Similarity::SimilarTitle => &mut self.similar_title,
        };
        if list.iter().any(|t| t == title) {
            return false;
        }
        list.push(title.to_string());
        true
    }
}

/// Statistics for one serial title
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerialStats {
    pub title: String,
    /// Always written, `null` when unknown. A missing key fails the load.
    #[serde(deserialize_with = "Option::deserialize")]
    pub issn: Option<String>,
    /// Ids of the documents attached to this title
    pub documents: Vec<RecordId>,
    pub similars: Similars,
    #[serde(flatten)]
    pub outcomes: OutcomeLog,
}

impl SerialStats {
    pub fn new(title: impl Into<String>, issn: Option<String>) -> Self {
        Self {
            title: title.into(),
            issn,
            documents: Vec::new(),
            similars: Similars::default(),
            outcomes: OutcomeLog::new(),
        }
    }

    /// Attach a child document, returns false if it was already attached
    pub fn add_document(&mut self, recid: RecordId) -> bool {
        if self.documents.contains(&recid) {
            return false;
        }
        self.documents.push(recid);
        true
    }
}

impl StatsEntry for SerialStats {
    fn outcomes(&self) -> &OutcomeLog {
        &self.outcomes
    }

    fn outcomes_mut(&mut self) -> &mut OutcomeLog {
        &mut self.outcomes
    }
}

/// Aggregate counts over a statistics store
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatsSummary {
    pub entries: usize,
    pub clean: usize,
    pub with_issues: usize,
    pub manual_migration: usize,
    pub unexpected_value: usize,
    pub missing_required_field: usize,
    pub lost_data: usize,
}

/// Identity-keyed statistics, serialized as a plain JSON object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatsStore<E> {
    entries: BTreeMap<String, E>,
}

impl<E> Default for StatsStore<E> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }
}

impl<E: StatsEntry> StatsStore<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the entry for `identity` unless it already exists
    ///
    /// Returns true when a new entry was created. Existing entries are left
    /// exactly as they are.
    pub fn register_with(&mut self, identity: &str, make: impl FnOnce() -> E) -> bool {
        if self.entries.contains_key(identity) {
            return false;
        }
        self.entries.insert(identity.to_string(), make());
        true
    }

    /// Classify `issue` against a registered identity
    pub fn record_outcome(&mut self, identity: &str, issue: &MigrationIssue) -> Result<()> {
        let entry = self
            .entries
            .get_mut(identity)
            .ok_or_else(|| ReportError::UnregisteredIdentity(identity.to_string()))?;
        classify(issue, entry.outcomes_mut(), identity)
    }

    pub fn get(&self, identity: &str) -> Option<&E> {
        self.entries.get(identity)
    }

    pub fn get_mut(&mut self, identity: &str) -> Option<&mut E> {
        self.entries.get_mut(identity)
    }

    pub fn contains(&self, identity: &str) -> bool {
        self.entries.contains_key(identity)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in identity order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &E)> {
        self.entries.iter()
    }

    /// Fold a previously persisted store into this one
    ///
    /// Entries already present in memory win; everything else is taken over
    /// unchanged. Returns the number of entries taken over.
    pub fn absorb(&mut self, persisted: StatsStore<E>) -> usize {
        let mut absorbed = 0;
        for (identity, entry) in persisted.entries {
            if let std::collections::btree_map::Entry::Vacant(slot) = self.entries.entry(identity) {
                slot.insert(entry);
                absorbed += 1;
            }
        }
        absorbed
    }

    pub fn summary(&self) -> StatsSummary {
        let mut summary = StatsSummary {
            entries: self.entries.len(),
            ..StatsSummary::default()
        };
        for entry in self.entries.values() {
            let log = entry.outcomes();
            if log.clean {
                summary.clean += 1;
            } else {
                summary.with_issues += 1;
            }
            summary.manual_migration += log.manual_migration.len();
            summary.unexpected_value += log.unexpected_value.len();
            summary.missing_required_field += log.missing_required_field.len();
            summary.lost_data += log.lost_data.len();
        }
        summary
    }
}
