//! Per-variant migration logs
//!
//! A [`MigrationLog`] owns the statistics store and the records store of one
//! run and knows how to load and save them. The variant is chosen once per
//! batch with [`open_log`]:
//! - [`DocumentLog`]: statistics keyed by recid, every classified issue
//!   recorded against the record.
//! - [`SerialLog`]: statistics keyed by title, built from the migrated
//!   payloads and completed by the clustering pass on save.

use crate::clustering::{cluster, TitleMatcher};
use crate::error::{ReportError, Result};
use crate::persister::ReportFiles;
use crate::records::{fan_out_serial, RecordStore};
use crate::stats::{DocumentStats, SerialStats, StatsStore, StatsSummary};
use crate::types::{MigrationIssue, RecordId, RecordType};
use migration_common::ReportConfig;
use serde::Serialize;
use serde_json::Value;
use std::path::Path;
use tracing::{debug, info};

/// Report over both stores after a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportSummary {
    pub record_type: RecordType,
    #[serde(flatten)]
    pub stats: StatsSummary,
    pub records: usize,
}

/// Shared interface of the document and serial variants
pub trait MigrationLog {
    fn record_type(&self) -> RecordType;

    /// Make sure `recid` has a statistics entry before it is processed
    fn register(&mut self, recid: &RecordId);

    /// Classify an issue raised while migrating `recid`
    fn record_outcome(&mut self, recid: &RecordId, issue: &MigrationIssue) -> Result<()>;

    /// Store the migrated payload of `recid`, returns the identities stored
    fn attach_record(&mut self, recid: &RecordId, record: Value) -> Result<Vec<String>>;

    /// Fold the persisted stores of earlier runs into this one
    fn load(&mut self) -> Result<()>;

    /// Finish the batch and persist both stores
    fn save(&mut self) -> Result<()>;

    fn records(&self) -> &RecordStore;

    fn files(&self) -> &ReportFiles;

    fn summary(&self) -> ReportSummary;
}

/// Pick the log implementation for a batch
pub fn open_log(record_type: RecordType, config: &ReportConfig) -> Box<dyn MigrationLog> {
    match record_type {
        RecordType::Document => Box::new(DocumentLog::new(&config.logs_dir)),
        RecordType::Serial => Box::new(SerialLog::new(&config.logs_dir)),
    }
}

/// Statistics keyed by document recid
#[derive(Debug)]
pub struct DocumentLog {
    files: ReportFiles,
    stats: StatsStore<DocumentStats>,
    records: RecordStore,
}

impl DocumentLog {
    pub fn new(logs_dir: &Path) -> Self {
        Self {
            files: ReportFiles::new(logs_dir, RecordType::Document),
            stats: StatsStore::new(),
            records: RecordStore::new(),
        }
    }

    pub fn stats(&self) -> &StatsStore<DocumentStats> {
        &self.stats
    }
}

impl MigrationLog for DocumentLog {
    fn record_type(&self) -> RecordType {
        RecordType::Document
    }

    fn register(&mut self, recid: &RecordId) {
        if self
            .stats
            .register_with(&recid.to_string(), || DocumentStats::new(recid.clone()))
        {
            debug!(recid = %recid, "Registered document");
        }
    }

    fn record_outcome(&mut self, recid: &RecordId, issue: &MigrationIssue) -> Result<()> {
        self.stats.record_outcome(&recid.to_string(), issue)
    }

    fn attach_record(&mut self, recid: &RecordId, record: Value) -> Result<Vec<String>> {
        let identity = recid.to_string();
        self.records.put(&identity, record);
        Ok(vec![identity])
    }

    fn load(&mut self) -> Result<()> {
        load_into(&self.files, &mut self.stats, &mut self.records)
    }

    fn save(&mut self) -> Result<()> {
        self.files.save(&self.stats, &self.records)?;
        Ok(())
    }

    fn records(&self) -> &RecordStore {
        &self.records
    }

    fn files(&self) -> &ReportFiles {
        &self.files
    }

    fn summary(&self) -> ReportSummary {
        ReportSummary {
            record_type: RecordType::Document,
            stats: self.stats.summary(),
            records: self.records.len(),
        }
    }
}

/// Statistics keyed by serial title
#[derive(Debug)]
pub struct SerialLog {
    files: ReportFiles,
    stats: StatsStore<SerialStats>,
    records: RecordStore,
    matcher: TitleMatcher,
}

impl SerialLog {
    pub fn new(logs_dir: &Path) -> Self {
        Self {
            files: ReportFiles::new(logs_dir, RecordType::Serial),
            stats: StatsStore::new(),
            records: RecordStore::new(),
            matcher: TitleMatcher::default(),
        }
    }

    pub fn stats(&self) -> &StatsStore<SerialStats> {
        &self.stats
    }
}

impl MigrationLog for SerialLog {
    fn record_type(&self) -> RecordType {
        RecordType::Serial
    }

    /// Serial identities are titles, only known once the payload arrives
    fn register(&mut self, _recid: &RecordId) {}

    /// Serial statistics are rebuilt from payloads during clustering, so
    /// classified issues are not recorded. Unclassified ones still surface.
    fn record_outcome(&mut self, recid: &RecordId, issue: &MigrationIssue) -> Result<()> {
        if let MigrationIssue::Unclassified { message } = issue {
            return Err(ReportError::Unclassified {
                identity: recid.to_string(),
                message: message.clone(),
            });
        }
        debug!(recid = %recid, category = issue.category(), "Serial issue not recorded");
        Ok(())
    }

    fn attach_record(&mut self, recid: &RecordId, record: Value) -> Result<Vec<String>> {
        let variants = fan_out_serial(record)?;
        let mut identities = Vec::with_capacity(variants.len());
        for variant in variants {
            let title = variant.title;
            let issn = variant.issn;
            self.stats
                .register_with(&title, || SerialStats::new(title.clone(), issn.clone()));
            if let Some(entry) = self.stats.get_mut(&title) {
                // first known ISSN wins, a null one is filled in later
                if entry.issn.is_none() && issn.is_some() {
                    debug!(title = %title, "Filled in missing ISSN");
                    entry.issn = issn;
                }
                entry.add_document(recid.clone());
            }
            self.records.put(&title, variant.record);
            identities.push(title);
        }
        debug!(recid = %recid, titles = identities.len(), "Attached serial record");
        Ok(identities)
    }

    fn load(&mut self) -> Result<()> {
        load_into(&self.files, &mut self.stats, &mut self.records)
    }

    fn save(&mut self) -> Result<()> {
        cluster(&mut self.records, &mut self.stats, &self.matcher)?;
        self.files.save(&self.stats, &self.records)?;
        Ok(())
    }

    fn records(&self) -> &RecordStore {
        &self.records
    }

    fn files(&self) -> &ReportFiles {
        &self.files
    }

    fn summary(&self) -> ReportSummary {
        ReportSummary {
            record_type: RecordType::Serial,
            stats: self.stats.summary(),
            records: self.records.len(),
        }
    }
}

fn load_into<E>(
    files: &ReportFiles,
    stats: &mut StatsStore<E>,
    records: &mut RecordStore,
) -> Result<()>
where
    E: crate::stats::StatsEntry + serde::de::DeserializeOwned,
{
    let persisted_stats = files.load_stats::<StatsStore<E>>()?.unwrap_or_default();
    let persisted_records = files.load_records::<RecordStore>()?.unwrap_or_default();
    let stats_loaded = stats.absorb(persisted_stats);
    let records_loaded = records.absorb(persisted_records);
    info!(
        stats = %files.stats_path().display(),
        entries = stats_loaded,
        records = records_loaded,
        "Loaded migration report"
    );
    Ok(())
}
