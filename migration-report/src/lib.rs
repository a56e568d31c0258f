//! migration-report library interface
//!
//! Aggregates per-record outcomes of a bibliographic migration into a
//! persisted, query-ready report:
//! - [`classifier`]: issue taxonomy to per-record outcome lists
//! - [`stats`] / [`records`]: identity-keyed statistics and payload stores
//! - [`clustering`]: serial child linking and duplicate detection
//! - [`persister`]: JSON documents in the logs directory
//! - [`migration_log`]: document and serial variants behind one interface
//! - [`migrator`]: batch driver used by the command-line tool

pub mod classifier;
pub mod clustering;
pub mod error;
pub mod migration_log;
pub mod migrator;
pub mod persister;
pub mod records;
pub mod stats;
pub mod types;

pub use crate::error::{ReportError, Result};
pub use crate::migration_log::{open_log, DocumentLog, MigrationLog, ReportSummary, SerialLog};
pub use crate::migrator::{BatchSummary, Migrator};
pub use crate::types::{MigrationIssue, RecordId, RecordType, TransformOutcome};
