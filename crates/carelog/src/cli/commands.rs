//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Subcommand, ValueEnum};

use crate::category::Category;

/// Record command arguments.
#[derive(Debug, Args)]
pub struct RecordCommand {
    /// Resident id (e.g. user1)
    #[arg(short, long)]
    pub resident: String,

    /// Event category id (e.g. vital, meal, sleep)
    #[arg(short = 't', long = "category")]
    pub category: String,

    /// Payload fields as a JSON object (e.g. '{"systolic":120,"diastolic":80}')
    #[arg(short, long, default_value = "{}")]
    pub data: String,

    /// Free-text notes, stored as the payload's `notes` field
    #[arg(short, long)]
    pub notes: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "plain")]
    pub format: OutputFormat,
}

/// Counts command arguments.
#[derive(Debug, Args)]
pub struct CountsCommand {
    /// Day to count (YYYY-MM-DD, defaults to today)
    #[arg(short, long)]
    pub date: Option<NaiveDate>,

    /// Count all records regardless of date
    #[arg(long, conflicts_with = "date")]
    pub all_time: bool,

    /// Only count records about this resident (with --all-time)
    #[arg(short, long, requires = "all_time")]
    pub resident: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,
}

/// Log viewer arguments.
#[derive(Debug, Args)]
pub struct LogCommand {
    /// Only print the last-saved time
    #[arg(long)]
    pub saved_at: bool,

    /// Show one resident's records as a table
    #[arg(short, long, conflicts_with = "saved_at")]
    pub resident: Option<String>,
}

/// Resident directory commands.
#[derive(Debug, Subcommand)]
pub enum ResidentsCommand {
    /// List residents
    List {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Add a resident, or replace one with the same id
    Add {
        /// Resident id
        id: String,
        /// Display name
        name: String,
    },

    /// Rename a resident (admin mode only)
    Rename {
        /// Resident id
        id: String,
        /// New display name
        name: String,
    },
}

/// Category list commands.
#[derive(Debug, Subcommand)]
pub enum CategoriesCommand {
    /// Show the category grid
    List {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Offer only these categories, in this order (admin mode only)
    Set {
        /// Category ids
        #[arg(required = true, value_parser = parse_category)]
        ids: Vec<Category>,
    },

    /// Offer all ten categories again (admin mode only)
    Reset,
}

/// Export command arguments.
#[derive(Debug, Args)]
pub struct ExportCommand {
    /// File to write the browser storage dump to
    pub output: PathBuf,
}

/// Import command arguments.
#[derive(Debug, Args)]
pub struct ImportCommand {
    /// Browser storage dump to read
    pub input: PathBuf,
}

/// Status command arguments.
#[derive(Debug, Args)]
pub struct StatusCommand {
    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

fn parse_category(s: &str) -> Result<Category, String> {
    s.parse().map_err(|e: crate::Error| e.to_string())
}

/// Output format for commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Plain text output
    #[default]
    Plain,
    /// Formatted table
    Table,
    /// JSON output
    Json,
}
