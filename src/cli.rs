//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::models::{ConfigTag, SourceSpec};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// compaction-summary - compare heap-compaction benchmark runs
///
/// Loads the per-configuration result CSVs (no_compact, manual_compact,
/// auto_compact), merges them, and prints a ranked summary of pages
/// reclaimed and GC timings. The full-precision summary is saved as CSV.
///
/// Examples:
///   compaction-summary
///   compaction-summary --data-dir bench/data --output bench/summary.csv
///   compaction-summary --source auto_compact=runs/auto_a.csv --source auto_compact=runs/auto_b.csv
///   compaction-summary --discover --format markdown --report SUMMARY.md
///   compaction-summary --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Directory holding results_<config>.csv files
    ///
    /// Defaults to `data` (or the config file's `general.data_dir`).
    #[arg(long, value_name = "DIR", env = "COMPACTION_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Output file for the full-precision summary CSV
    ///
    /// Defaults to `data/summary.csv`. Overwritten on every run.
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Result source for a configuration (repeatable)
    ///
    /// Replaces the default source of that configuration. Giving the same
    /// configuration several times merges all of its sources.
    /// Example: --source manual_compact=runs/manual.csv
    #[arg(long = "source", value_name = "CONFIG=PATH", value_parser = parse_source)]
    pub sources: Vec<SourceSpec>,

    /// Also pick up results_<config>_<suffix>.csv files in the data directory
    #[arg(long)]
    pub discover: bool,

    /// Also write the merged per-run dataset to this CSV file
    #[arg(long, value_name = "FILE")]
    pub combined_output: Option<PathBuf>,

    /// Report format (text, markdown, json)
    #[arg(long, value_name = "FORMAT")]
    pub format: Option<OutputFormat>,

    /// Write the report to a file instead of stdout
    #[arg(long, value_name = "FILE")]
    pub report: Option<PathBuf>,

    /// Decimal places for averages in the report
    #[arg(long, value_name = "DIGITS")]
    pub precision: Option<u32>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .compaction-summary.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (errors only)
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate a default .compaction-summary.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the report.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Aligned text table (default)
    #[default]
    Text,
    /// Markdown document
    Markdown,
    /// JSON document
    Json,
}

/// Parse a `CONFIG=PATH` source argument.
pub fn parse_source(s: &str) -> Result<SourceSpec, String> {
    let (config, path) = s
        .split_once('=')
        .ok_or_else(|| format!("expected CONFIG=PATH, got '{}'", s))?;

    let config: ConfigTag = config.parse()?;
    if path.is_empty() {
        return Err(format!("empty path for configuration '{}'", config));
    }

    Ok(SourceSpec::new(config, path))
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(ref data_dir) = self.data_dir {
            if data_dir.exists() && !data_dir.is_dir() {
                return Err(format!(
                    "Data path is not a directory: {}",
                    data_dir.display()
                ));
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    ///
    /// `config_verbose` is the config file's `general.verbose`; `--quiet`
    /// still wins over it.
    pub fn log_level(&self, config_verbose: bool) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose || config_verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
