//! Command-line interface for carelog.
//!
//! This module provides the CLI structure and command definitions for the
//! `carelog` binary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    CategoriesCommand, ConfigCommand, CountsCommand, ExportCommand, ImportCommand, LogCommand,
    OutputFormat, RecordCommand, ResidentsCommand, StatusCommand,
};

use crate::logging::Verbosity;

/// carelog - Structured daily care records
///
/// Record observations about care facility residents (seizures, vitals,
/// meals, sleep and more) and keep per-category counts for the day.
#[derive(Debug, Parser)]
#[command(name = "carelog")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Record one observation for a resident
    Record(RecordCommand),

    /// Show per-category record counts
    Counts(CountsCommand),

    /// Show every record and the last-saved time (admin mode only)
    Log(LogCommand),

    /// Manage residents
    #[command(subcommand)]
    Residents(ResidentsCommand),

    /// Show or edit the category grid
    #[command(subcommand)]
    Categories(CategoriesCommand),

    /// Write the records as a browser storage dump
    Export(ExportCommand),

    /// Read records from a browser storage dump
    Import(ImportCommand),

    /// Show database status
    Status(StatusCommand),

    /// View configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> Verbosity {
        Verbosity::from_flags(self.verbose, self.quiet)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::Category;
    use clap::CommandFactory;

    #[test]
    fn test_cli_name() {
        let cli = Cli::command();
        assert_eq!(cli.get_name(), "carelog");
    }

    #[test]
    fn test_cli_verify() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_verbosity_flags() {
        let quiet = Cli::try_parse_from(["carelog", "-q", "-v", "status"]).unwrap();
        assert_eq!(quiet.verbosity(), Verbosity::Quiet);

        let normal = Cli::try_parse_from(["carelog", "status"]).unwrap();
        assert_eq!(normal.verbosity(), Verbosity::Normal);

        let trace = Cli::try_parse_from(["carelog", "-vv", "status"]).unwrap();
        assert_eq!(trace.verbosity(), Verbosity::Trace);
    }

    #[test]
    fn test_parse_record() {
        let cli = Cli::try_parse_from([
            "carelog",
            "record",
            "--resident",
            "user1",
            "--category",
            "vital",
            "--data",
            r#"{"systolic":120,"diastolic":80}"#,
            "--notes",
            "安定",
        ])
        .unwrap();
        let Command::Record(cmd) = cli.command else {
            panic!("expected record command");
        };
        assert_eq!(cmd.resident, "user1");
        assert_eq!(cmd.category, "vital");
        assert_eq!(cmd.notes.as_deref(), Some("安定"));
        assert_eq!(cmd.format, OutputFormat::Plain);
    }

    #[test]
    fn test_parse_counts_date() {
        let cli = Cli::try_parse_from(["carelog", "counts", "--date", "2025-07-11"]).unwrap();
        let Command::Counts(cmd) = cli.command else {
            panic!("expected counts command");
        };
        assert_eq!(cmd.date, chrono::NaiveDate::from_ymd_opt(2025, 7, 11));
        assert!(!cmd.all_time);
    }

    #[test]
    fn test_parse_counts_rejects_bad_date() {
        assert!(Cli::try_parse_from(["carelog", "counts", "--date", "11/07/2025"]).is_err());
    }

    #[test]
    fn test_parse_counts_resident_requires_all_time() {
        assert!(Cli::try_parse_from(["carelog", "counts", "--resident", "user1"]).is_err());
        assert!(
            Cli::try_parse_from(["carelog", "counts", "--all-time", "--resident", "user1"]).is_ok()
        );
    }

    #[test]
    fn test_parse_categories_set() {
        let cli = Cli::try_parse_from(["carelog", "categories", "set", "vital", "meal"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Categories(CategoriesCommand::Set { ref ids })
                if ids == &[Category::Vital, Category::Meal]
        ));
        assert!(Cli::try_parse_from(["carelog", "categories", "set", "bath"]).is_err());
    }

    #[test]
    fn test_parse_residents_rename() {
        let cli =
            Cli::try_parse_from(["carelog", "residents", "rename", "user1", "田中 太郎"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Residents(ResidentsCommand::Rename { .. })
        ));
    }

    #[test]
    fn test_parse_log_resident() {
        let cli = Cli::try_parse_from(["carelog", "log", "-r", "user1"]).unwrap();
        let Command::Log(cmd) = cli.command else {
            panic!("expected log command");
        };
        assert_eq!(cmd.resident.as_deref(), Some("user1"));
        assert!(Cli::try_parse_from(["carelog", "log", "-r", "user1", "--saved-at"]).is_err());
    }

    #[test]
    fn test_parse_with_config() {
        let cli = Cli::try_parse_from(["carelog", "-c", "/custom/config.toml", "status"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/custom/config.toml")));
    }

    #[test]
    fn test_parse_export_import() {
        let cli = Cli::try_parse_from(["carelog", "export", "dump.json"]).unwrap();
        assert!(matches!(cli.command, Command::Export(_)));
        let cli = Cli::try_parse_from(["carelog", "import", "dump.json"]).unwrap();
        assert!(matches!(cli.command, Command::Import(_)));
    }
}
