//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.compaction-summary.toml` files.

use crate::analysis::MAX_DISPLAY_DECIMALS;
use crate::cli::OutputFormat;
use crate::models::{ConfigTag, SourceSpec};
use crate::sources::{apply_overrides, default_sources, merge_discovered, SourceScanner};
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default configuration file name.
pub const CONFIG_FILE_NAME: &str = ".compaction-summary.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Result source settings.
    #[serde(default)]
    pub sources: SourcesConfig,

    /// Report settings.
    #[serde(default)]
    pub report: ReportConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Directory holding the per-configuration result CSVs.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Full-precision summary output path.
    #[serde(default = "default_output")]
    pub output: PathBuf,

    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            output: default_output(),
            verbose: false,
        }
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_output() -> PathBuf {
    PathBuf::from("data/summary.csv")
}

/// Result source settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourcesConfig {
    /// Also load results_<config>_<suffix>.csv files found in the data dir.
    #[serde(default)]
    pub discover: bool,

    /// Source for no_compact, replacing `<data_dir>/results_no_compact.csv`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub no_compact: Option<PathBuf>,

    /// Source for manual_compact.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manual_compact: Option<PathBuf>,

    /// Source for auto_compact.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_compact: Option<PathBuf>,

    /// Additional sources as `{ config, path }` entries. Together with the
    /// keys above they replace the defaults of the configurations they name;
    /// every source given for one configuration is loaded.
    #[serde(default)]
    pub files: Vec<SourceSpec>,

    /// Write the merged per-run dataset here as well.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub combined_output: Option<PathBuf>,
}

/// Report settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Report format.
    #[serde(default)]
    pub format: OutputFormat,

    /// Decimal places for averages.
    #[serde(default = "default_precision")]
    pub precision: u32,

    /// Write the report to this file instead of stdout.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::default(),
            precision: default_precision(),
            path: None,
        }
    }
}

fn default_precision() -> u32 {
    2
}

impl SourcesConfig {
    fn path_for(&self, config: ConfigTag) -> Option<&PathBuf> {
        match config {
            ConfigTag::NoCompact => self.no_compact.as_ref(),
            ConfigTag::ManualCompact => self.manual_compact.as_ref(),
            ConfigTag::AutoCompact => self.auto_compact.as_ref(),
        }
    }

    /// Every configured source, named keys first.
    pub fn overrides(&self) -> Vec<SourceSpec> {
        ConfigTag::ALL
            .into_iter()
            .filter_map(|tag| {
                self.path_for(tag)
                    .map(|path| SourceSpec::new(tag, path.clone()))
            })
            .chain(self.files.iter().cloned())
            .collect()
    }

    /// Drop the configured sources of every configuration `sources` names
    /// and use `sources` for them instead.
    pub fn replace(&mut self, sources: &[SourceSpec]) {
        for source in sources {
            match source.config {
                ConfigTag::NoCompact => self.no_compact = None,
                ConfigTag::ManualCompact => self.manual_compact = None,
                ConfigTag::AutoCompact => self.auto_compact = None,
            }
        }
        self.files
            .retain(|file| !sources.iter().any(|s| s.config == file.config));
        self.files.extend(sources.iter().cloned());
    }
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(CONFIG_FILE_NAME);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings.
    /// This method only overrides config when CLI provides explicit values.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref data_dir) = args.data_dir {
            self.general.data_dir = data_dir.clone();
        }
        if let Some(ref output) = args.output {
            self.general.output = output.clone();
        }

        // CLI sources replace the configured ones per configuration
        if !args.sources.is_empty() {
            self.sources.replace(&args.sources);
        }
        if args.discover {
            self.sources.discover = true;
        }
        if let Some(ref combined) = args.combined_output {
            self.sources.combined_output = Some(combined.clone());
        }

        if let Some(format) = args.format {
            self.report.format = format;
        }
        if let Some(precision) = args.precision {
            self.report.precision = precision;
        }
        if let Some(ref path) = args.report {
            self.report.path = Some(path.clone());
        }

        // Flags always override
        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Check settings that only make sense once file and CLI are merged.
    pub fn validate(&self) -> Result<()> {
        if self.report.precision > MAX_DISPLAY_DECIMALS {
            bail!(
                "Precision must be between 0 and {}, got {}",
                MAX_DISPLAY_DECIMALS,
                self.report.precision
            );
        }

        let output = &self.general.output;
        if output.as_os_str().is_empty() {
            bail!("Output path must not be empty");
        }
        if self.report.path.as_ref() == Some(output) {
            bail!(
                "Report path must not be the summary output: {}",
                output.display()
            );
        }
        if self.sources.combined_output.as_ref() == Some(output) {
            bail!(
                "Combined output must not be the summary output: {}",
                output.display()
            );
        }

        Ok(())
    }

    /// Resolve the full list of sources to attempt, in order.
    pub fn resolve_sources(&self) -> Vec<SourceSpec> {
        let data_dir = &self.general.data_dir;
        let sources = apply_overrides(default_sources(data_dir), &self.sources.overrides());

        if self.sources.discover {
            merge_discovered(sources, SourceScanner::new(data_dir.clone()).scan())
        } else {
            sources
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
