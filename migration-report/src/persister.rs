//! Report persistence
//!
//! Two JSON documents per logs directory: the variant's statistics file
//! (`stats_document.json` or `stats_serial.json`) and the shared
//! `records.json`. Files are opened, read or written, and closed within each
//! call. Writes go to a temporary sibling that is renamed into place, so an
//! interrupted save never leaves a truncated document behind.

use crate::types::RecordType;
use migration_common::Result;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::fs::File;
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Records document name, shared by both variants
pub const RECORDS_FILE_NAME: &str = "records.json";

/// Backing locations of one variant's report
#[derive(Debug, Clone)]
pub struct ReportFiles {
    logs_dir: PathBuf,
    stats_path: PathBuf,
    records_path: PathBuf,
}

impl ReportFiles {
    pub fn new(logs_dir: &Path, record_type: RecordType) -> Self {
        Self {
            logs_dir: logs_dir.to_path_buf(),
            stats_path: logs_dir.join(record_type.stats_file_name()),
            records_path: logs_dir.join(RECORDS_FILE_NAME),
        }
    }

    pub fn logs_dir(&self) -> &Path {
        &self.logs_dir
    }

    pub fn stats_path(&self) -> &Path {
        &self.stats_path
    }

    pub fn records_path(&self) -> &Path {
        &self.records_path
    }

    /// Read the statistics document, `None` on a first run
    pub fn load_stats<S: DeserializeOwned>(&self) -> Result<Option<S>> {
        read_json(&self.stats_path)
    }

    /// Read the records document, `None` on a first run
    pub fn load_records<R: DeserializeOwned>(&self) -> Result<Option<R>> {
        read_json(&self.records_path)
    }

    /// Write both documents, creating the logs directory if needed
    ///
    /// Both temporary files are written before either is renamed into
    /// place, so a failed write leaves the previous pair untouched.
    pub fn save<S: Serialize, R: Serialize>(&self, stats: &S, records: &R) -> Result<()> {
        std::fs::create_dir_all(&self.logs_dir)?;
        let stats_tmp = write_tmp(&self.stats_path, stats, false)?;
        let records_tmp = match write_tmp(&self.records_path, records, false) {
            Ok(path) => path,
            Err(e) => {
                let _ = std::fs::remove_file(&stats_tmp);
                return Err(e);
            }
        };
        std::fs::rename(&stats_tmp, &self.stats_path)?;
        std::fs::rename(&records_tmp, &self.records_path)?;
        info!(
            stats = %self.stats_path.display(),
            records = %self.records_path.display(),
            "Saved migration report"
        );
        Ok(())
    }

    /// Write a pretty-printed preview of one migrated record
    ///
    /// Lands in `<logs_dir>/<folder>/<name>.json`.
    pub fn write_preview(&self, folder: &str, name: &str, record: &Value) -> Result<PathBuf> {
        let dir = self.logs_dir.join(sanitize_file_name(folder));
        std::fs::create_dir_all(&dir)?;
        let path = dir.join(format!("{}.json", sanitize_file_name(name)));
        write_json(&path, record, true)?;
        debug!(path = %path.display(), "Wrote record preview");
        Ok(path)
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!(path = %path.display(), "No persisted document yet");
            return Ok(None);
        }
        Err(e) => return Err(e.into()),
    };
    let value = serde_json::from_reader(BufReader::new(file))?;
    Ok(Some(value))
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    PathBuf::from(tmp_name)
}

/// Serialize `value` next to `path`, returns the temporary file written
fn write_tmp<T: Serialize + ?Sized>(path: &Path, value: &T, pretty: bool) -> Result<PathBuf> {
    let tmp_path = tmp_path(path);
    let mut writer = BufWriter::new(File::create(&tmp_path)?);
    if pretty {
        serde_json::to_writer_pretty(&mut writer, value)?;
    } else {
        serde_json::to_writer(&mut writer, value)?;
    }
    writer.flush()?;
    Ok(tmp_path)
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T, pretty: bool) -> Result<()> {
    let tmp_path = write_tmp(path, value, pretty)?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

/// Make an identity usable as a file name
///
/// Serial identities are free-text titles and may contain path separators.
fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let trimmed = cleaned.trim().trim_matches('.');
    if trimmed.is_empty() {
        "_".to_string()
    } else {
        trimmed.to_string()
    }
}
