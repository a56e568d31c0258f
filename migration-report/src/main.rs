//! migration-report - Migration dry-run report tool
//!
//! Reads the outcomes produced by the record transformation, aggregates them
//! into the statistics and records documents of the logs directory, and
//! prints a summary. Runs against the same logs directory accumulate.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use migration_common::config::TomlConfig;
use migration_common::{FailurePolicy, ReportConfig};
use migration_report::{open_log, Migrator, RecordId, RecordType};
use serde_json::json;
use std::path::PathBuf;
use tracing::info;

/// Command-line arguments for migration-report
#[derive(Parser, Debug)]
#[command(name = "migration-report")]
#[command(about = "Aggregate bibliographic migration outcomes into a report")]
#[command(version)]
struct Args {
    /// TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding the report documents
    #[arg(short, long, global = true)]
    logs_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load transformation outcome dumps into the report
    Dryrun {
        /// JSON files, each an array of transformation outcomes
        #[arg(required = true)]
        sources: Vec<PathBuf>,

        /// Type of record to load (document, multipart or serial)
        #[arg(short = 'x', long, default_value = "document")]
        rectype: RecordType,

        /// Record ID to load (only this record is processed)
        #[arg(short, long)]
        recid: Option<String>,

        /// What to do on an unclassified error (abort or skip)
        #[arg(long)]
        failure_policy: Option<FailurePolicy>,

        /// Write a pretty-printed preview of every migrated record
        #[arg(long)]
        previews: bool,
    },

    /// Print the summary of the persisted report
    Summary {
        /// Type of record to summarize (document, multipart or serial)
        #[arg(short = 'x', long, default_value = "document")]
        rectype: RecordType,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    let toml_config =
        TomlConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    let mut config = ReportConfig::resolve(args.logs_dir.as_deref(), toml_config);

    migration_common::logging::init(&config.logging).context("Failed to initialize logging")?;

    info!("Starting migration-report v{}", env!("CARGO_PKG_VERSION"));
    info!("Logs directory: {}", config.logs_dir.display());

    match args.command {
        Command::Dryrun {
            sources,
            rectype,
            recid,
            failure_policy,
            previews,
        } => {
            if let Some(policy) = failure_policy {
                config.failure_policy = policy;
            }
            if previews {
                config.write_previews = true;
            }
            let logs_dir = config.logs_dir.clone();

            let log = open_log(rectype, &config);
            let mut migrator =
                Migrator::new(log, config).only_recid(recid.as_deref().map(RecordId::from_text));
            let batch = migrator
                .run_sources(&sources)
                .context("Migration report run failed")?;

            let output = json!({
                "batch": batch,
                "report": migrator.report(),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
            info!("Check completed. See the report in {}", logs_dir.display());
        }
        Command::Summary { rectype } => {
            let mut log = open_log(rectype, &config);
            log.load().context("Failed to load persisted report")?;
            println!("{}", serde_json::to_string_pretty(&log.summary())?);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_parse_dryrun_arguments() {
        let args = Args::try_parse_from([
            "migration-report",
            "--logs-dir",
            "/tmp/logs",
            "dryrun",
            "-x",
            "serial",
            "--failure-policy",
            "skip",
            "dump1.json",
            "dump2.json",
        ])
        .unwrap();

        assert_eq!(args.logs_dir, Some(PathBuf::from("/tmp/logs")));
        match args.command {
            Command::Dryrun {
                sources,
                rectype,
                failure_policy,
                previews,
                recid,
            } => {
                assert_eq!(sources.len(), 2);
                assert_eq!(rectype, RecordType::Serial);
                assert_eq!(failure_policy, Some(FailurePolicy::Skip));
                assert!(!previews);
                assert!(recid.is_none());
            }
            other => panic!("Expected dryrun, got {:?}", other),
        }
    }
}
