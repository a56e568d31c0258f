//! Batch driver
//!
//! Feeds transformation outcomes into a [`MigrationLog`] strictly in input
//! order, then saves. Classified issues are recorded and the batch moves on;
//! an unclassified one either aborts the batch before anything is saved or,
//! under [`FailurePolicy::Skip`], skips the record.

use crate::error::{ReportError, Result};
use crate::migration_log::{MigrationLog, ReportSummary};
use crate::types::{resolve_record_id, RecordId, TransformOutcome};
use migration_common::{FailurePolicy, ReportConfig};
use serde::Serialize;
use serde_json::Value;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

/// Counters for one batch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub sources: usize,
    pub items: usize,
    /// Records stored (after serial fan-out)
    pub attached: usize,
    /// Items whose transformation failed with a classified issue
    pub failed: usize,
    /// Items dropped by the skip policy
    pub skipped: usize,
}

/// Read one source file: a JSON array of transformation outcomes
pub fn read_source(path: &Path) -> Result<Vec<TransformOutcome>> {
    let file = File::open(path).map_err(migration_common::Error::from)?;
    let outcomes = serde_json::from_reader(BufReader::new(file))
        .map_err(migration_common::Error::from)?;
    Ok(outcomes)
}

pub struct Migrator {
    log: Box<dyn MigrationLog>,
    config: ReportConfig,
    only_recid: Option<RecordId>,
}

impl Migrator {
    pub fn new(log: Box<dyn MigrationLog>, config: ReportConfig) -> Self {
        Self {
            log,
            config,
            only_recid: None,
        }
    }

    /// Restrict the batch to a single record id
    pub fn only_recid(mut self, recid: Option<RecordId>) -> Self {
        self.only_recid = recid;
        self
    }

    pub fn log(&self) -> &dyn MigrationLog {
        self.log.as_ref()
    }

    /// Load earlier runs, process every source in order, then save
    pub fn run_sources(&mut self, sources: &[PathBuf]) -> Result<BatchSummary> {
        self.log.load()?;

        let mut summary = BatchSummary::default();
        for (idx, source) in sources.iter().enumerate() {
            info!(
                "Loading dump {} of {} ({})",
                idx + 1,
                sources.len(),
                source.display()
            );
            let outcomes = read_source(source)?;
            self.run_outcomes(outcomes, &mut summary)?;
            summary.sources += 1;
        }

        self.log.save()?;
        info!(
            items = summary.items,
            attached = summary.attached,
            failed = summary.failed,
            skipped = summary.skipped,
            "Batch complete"
        );
        Ok(summary)
    }

    /// Process outcomes without loading or saving
    pub fn run_outcomes(
        &mut self,
        outcomes: Vec<TransformOutcome>,
        summary: &mut BatchSummary,
    ) -> Result<()> {
        for outcome in outcomes {
            self.process(outcome, summary)?;
        }
        Ok(())
    }

    /// Process one item, applying the failure policy to unclassified errors
    pub fn process(&mut self, outcome: TransformOutcome, summary: &mut BatchSummary) -> Result<()> {
        let recid = resolve_record_id(&outcome.item)
            .or_else(|| outcome.record.as_ref().and_then(resolve_record_id))
            .ok_or(ReportError::MissingIdentity)?;

        if let Some(only) = &self.only_recid {
            if only != &recid {
                return Ok(());
            }
        }

        debug!(recid = %recid, "Processing item");
        summary.items += 1;
        self.log.register(&recid);

        match self.apply(&recid, outcome, summary) {
            Err(ReportError::Unclassified { identity, message })
                if self.config.failure_policy == FailurePolicy::Skip =>
            {
                warn!(recid = %identity, "Skipping record after unclassified error: {}", message);
                summary.skipped += 1;
                Ok(())
            }
            other => other,
        }
    }

    fn apply(
        &mut self,
        recid: &RecordId,
        outcome: TransformOutcome,
        summary: &mut BatchSummary,
    ) -> Result<()> {
        for issue in &outcome.issues {
            error!(
                recid = %recid,
                field = issue.field().unwrap_or("-"),
                "{}",
                issue
            );
            self.log.record_outcome(recid, issue)?;
        }

        match (outcome.failure, outcome.record) {
            (Some(failure), _) => {
                error!(recid = %recid, "[DATA ERROR]: {}", failure);
                self.log.record_outcome(recid, &failure)?;
                summary.failed += 1;
            }
            (None, Some(record)) => {
                let identities = self.log.attach_record(recid, record)?;
                summary.attached += identities.len();
                if self.config.write_previews {
                    self.write_previews(&identities)?;
                }
            }
            (None, None) => {
                return Err(ReportError::Precondition(format!(
                    "outcome for record {} has neither a record nor a failure",
                    recid
                )));
            }
        }
        Ok(())
    }

    fn write_previews(&self, identities: &[String]) -> Result<()> {
        for identity in identities {
            let Some(record) = self.log.records().get(identity) else {
                continue;
            };
            let folder = record
                .get("_migration")
                .and_then(|m| m.get("record_type"))
                .and_then(Value::as_str)
                .unwrap_or(self.log.record_type().as_str());
            self.log.files().write_preview(folder, identity, record)?;
        }
        Ok(())
    }

    /// Summary of both stores, including earlier runs
    pub fn report(&self) -> ReportSummary {
        self.log.summary()
    }
}
