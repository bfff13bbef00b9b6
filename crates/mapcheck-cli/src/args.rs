//! Command-line arguments.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use mapcheck_core::{Check, IntegrityConfig};

use crate::formatter::OutputFormat;

/// Schema mapping validator and integrity checker.
#[derive(Parser, Debug)]
#[command(name = "mapcheck")]
#[command(version, about = "Schema mapping validator and integrity checker", long_about = None)]
pub struct Args {
    /// Output format
    #[arg(long, default_value = "table", value_enum, global = true)]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Validate the schema mapping persisted in a file.
    Validate {
        /// Database file.
        file: PathBuf,
    },

    /// Run one integrity check and list its violations.
    Check {
        /// Check name (ec-profile, data-columns, nav-ids, ...).
        check: Check,

        /// Database file.
        file: PathBuf,

        /// Stop after this many violations.
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
        limit: Option<u64>,

        #[command(flatten)]
        integrity: IntegrityArgs,
    },

    /// Run a set of integrity checks and report pass/fail for each.
    QuickCheck {
        /// Database file.
        file: PathBuf,

        /// Checks to run, comma separated. Defaults to all of them.
        #[arg(long, value_delimiter = ',')]
        checks: Vec<Check>,

        #[command(flatten)]
        integrity: IntegrityArgs,
    },
}

/// Integrity checker settings shared by `check` and `quick-check`.
#[derive(clap::Args, Debug)]
pub struct IntegrityArgs {
    /// Instance id of the self-referential root row.
    #[arg(long, default_value_t = 1)]
    pub root_row_id: i64,

    /// Do not exempt the root row from the navigation id check.
    #[arg(long, conflicts_with = "root_row_id")]
    pub no_root_row: bool,

    /// Base table for the missing child rows check (repeatable).
    #[arg(long = "base-table")]
    pub base_tables: Vec<String>,
}

impl IntegrityArgs {
    /// Convert command-line arguments to checker configuration.
    pub fn into_config(self) -> IntegrityConfig {
        let config = if self.no_root_row {
            IntegrityConfig::new().without_root_row()
        } else {
            IntegrityConfig::new().with_root_row_id(self.root_row_id)
        };

        self.base_tables
            .into_iter()
            .fold(config, |config, table| config.with_child_row_base_table(table))
    }
}
