//! Result source resolution.
//!
//! Works out which CSV files feed the pipeline: the fixed per-configuration
//! defaults, explicit overrides, and optionally every
//! `results_<config>[_<suffix>].csv` file found in the data directory.

use crate::models::{ConfigTag, SourceSpec};
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// The default source for every known configuration under `data_dir`.
pub fn default_sources(data_dir: &Path) -> Vec<SourceSpec> {
    ConfigTag::ALL
        .iter()
        .map(|tag| SourceSpec::new(*tag, data_dir.join(tag.default_file_name())))
        .collect()
}

/// Replace the sources of every configuration named in `overrides`.
///
/// Several overrides for one configuration all become sources for it; the
/// relative order of configurations is kept.
pub fn apply_overrides(defaults: Vec<SourceSpec>, overrides: &[SourceSpec]) -> Vec<SourceSpec> {
    let mut sources = Vec::new();

    for tag in ConfigTag::ALL {
        let replaced: Vec<_> = overrides.iter().filter(|o| o.config == tag).cloned().collect();
        if replaced.is_empty() {
            sources.extend(defaults.iter().filter(|d| d.config == tag).cloned());
        } else {
            sources.extend(replaced);
        }
    }

    sources
}

/// Append discovered sources that are not already listed.
pub fn merge_discovered(mut sources: Vec<SourceSpec>, discovered: Vec<SourceSpec>) -> Vec<SourceSpec> {
    for found in discovered {
        if !sources.iter().any(|s| s.path == found.path) {
            sources.push(found);
        }
    }
    sources
}

/// Map a result file name to its configuration.
///
/// Accepts `results_<config>.csv` and `results_<config>_<suffix>.csv`.
pub fn config_for_file_name(name: &str) -> Option<ConfigTag> {
    let stem = name.strip_prefix("results_")?.strip_suffix(".csv")?;

    ConfigTag::ALL.into_iter().find(|tag| {
        let label = tag.as_str();
        stem == label
            || stem
                .strip_prefix(label)
                .is_some_and(|rest| rest.starts_with('_') && rest.len() > 1)
    })
}

/// Scanner that discovers result files in a data directory.
pub struct SourceScanner {
    data_dir: PathBuf,
    max_depth: usize,
}

impl SourceScanner {
    /// Create a scanner that only looks at the top level of `data_dir`.
    pub fn new(data_dir: PathBuf) -> Self {
        Self {
            data_dir,
            max_depth: 1,
        }
    }

    /// Also descend into subdirectories up to `max_depth` levels.
    #[allow(dead_code)] // Builder utility
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth.max(1);
        self
    }

    /// Scan for result files, sorted by path.
    pub fn scan(&self) -> Vec<SourceSpec> {
        if !self.data_dir.is_dir() {
            debug!("Data directory not found: {}", self.data_dir.display());
            return Vec::new();
        }

        let mut found: Vec<SourceSpec> = WalkDir::new(&self.data_dir)
            .max_depth(self.max_depth)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    debug!("Cannot read entry: {}", e);
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file())
            .filter_map(|entry| {
                let name = entry.file_name().to_string_lossy();
                match config_for_file_name(&name) {
                    Some(tag) => Some(SourceSpec::new(tag, entry.path())),
                    None => {
                        debug!("Ignoring {}", entry.path().display());
                        None
                    }
                }
            })
            .collect();

        found.sort_by(|a, b| a.path.cmp(&b.path));
        found
    }
}
