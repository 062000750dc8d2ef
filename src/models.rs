//! Data models for the compaction summary.
//!
//! This module contains the core data structures used throughout the
//! pipeline for representing benchmark rows, loaded tables and the
//! per-configuration summary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Names of the five numeric columns every result row must carry.
pub const REQUIRED_COLUMNS: [&str; 5] = [
    "before_heap_pages",
    "after_heap_pages",
    "compact_time_s",
    "major_before_s",
    "major_after_s",
];

/// Experimental arm a benchmark run belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigTag {
    /// Compaction disabled
    NoCompact,
    /// `GC.compact` invoked explicitly between the two major GCs
    ManualCompact,
    /// Runtime auto-compaction enabled
    AutoCompact,
}

impl ConfigTag {
    /// All known configurations, in the order sources are attempted.
    pub const ALL: [ConfigTag; 3] = [
        ConfigTag::NoCompact,
        ConfigTag::ManualCompact,
        ConfigTag::AutoCompact,
    ];

    /// Label used in files, reports and as the grouping key.
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigTag::NoCompact => "no_compact",
            ConfigTag::ManualCompact => "manual_compact",
            ConfigTag::AutoCompact => "auto_compact",
        }
    }

    /// File name of the default result source for this configuration.
    pub fn default_file_name(&self) -> String {
        format!("results_{}.csv", self.as_str())
    }
}

impl fmt::Display for ConfigTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConfigTag {
    type Err = String;

    /// Exact match only; labels are not case-folded or trimmed.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ConfigTag::ALL
            .into_iter()
            .find(|tag| tag.as_str() == s)
            .ok_or_else(|| format!("unknown configuration '{}'", s))
    }
}

/// A result source and the configuration its rows belong to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSpec {
    pub config: ConfigTag,
    pub path: PathBuf,
}

impl SourceSpec {
    pub fn new(config: ConfigTag, path: impl Into<PathBuf>) -> Self {
        Self {
            config,
            path: path.into(),
        }
    }
}

/// A single benchmark run after schema normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultRow {
    /// Page counts are kept as read, so fractional or negative values
    /// survive into the summary.
    pub before_heap_pages: f64,
    pub after_heap_pages: f64,
    pub compact_time_s: f64,
    pub major_before_s: f64,
    pub major_after_s: f64,
    /// Configuration assigned by the loader.
    pub config: ConfigTag,
    /// Values of the source's non-required columns, aligned with
    /// the owning table's `extra_columns`.
    pub extras: Vec<String>,
}

impl ResultRow {
    /// Pages reclaimed by this run. Negative when the heap grew.
    pub fn pages_delta(&self) -> f64 {
        self.before_heap_pages - self.after_heap_pages
    }
}

/// Rows loaded from one source, all sharing one configuration.
#[derive(Debug, Clone)]
pub struct ResultTable {
    config: ConfigTag,
    source: String,
    extra_columns: Vec<String>,
    rows: Vec<ResultRow>,
}

impl ResultTable {
    /// Creates a table. Callers guarantee every row carries `config`.
    pub fn new(
        config: ConfigTag,
        source: String,
        extra_columns: Vec<String>,
        rows: Vec<ResultRow>,
    ) -> Self {
        Self {
            config,
            source,
            extra_columns,
            rows,
        }
    }

    pub fn config(&self) -> ConfigTag {
        self.config
    }

    /// Display name of the source the table was loaded from.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn extra_columns(&self) -> &[String] {
        &self.extra_columns
    }

    pub fn rows(&self) -> &[ResultRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[allow(dead_code)] // Pairs with len()
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Outcome of attempting to load one source.
#[derive(Debug, Clone)]
pub enum LoadOutcome {
    /// The source existed and was normalized into a table.
    Loaded(ResultTable),
    /// The source was not available; the pipeline moves on.
    Absent,
}

impl LoadOutcome {
    /// Returns the table if one was loaded.
    pub fn into_table(self) -> Option<ResultTable> {
        match self {
            LoadOutcome::Loaded(table) => Some(table),
            LoadOutcome::Absent => None,
        }
    }
}

/// A row of the merged dataset with its derived delta.
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedRow {
    pub row: ResultRow,
    pub pages_delta: f64,
    /// Extra column values aligned with the combined table's columns;
    /// `None` where the source lacked that column.
    pub extras: Vec<Option<String>>,
}

/// Every loaded row, concatenated in source order.
#[derive(Debug, Clone, Default)]
pub struct CombinedTable {
    /// Union of the sources' extra columns, in first-seen order.
    pub extra_columns: Vec<String>,
    pub rows: Vec<DerivedRow>,
}

impl CombinedTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[allow(dead_code)] // Pairs with len()
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Aggregated averages for one configuration.
///
/// Field order is the column order of the persisted summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRow {
    pub config: ConfigTag,
    pub before_pages_avg: f64,
    pub after_pages_avg: f64,
    pub delta_pages_avg: f64,
    pub compact_time_s_avg: f64,
    pub major_gc_before_s_avg: f64,
    pub major_gc_after_s_avg: f64,
    pub runs: usize,
}

impl SummaryRow {
    /// Share of the pre-compaction heap that was reclaimed, in percent.
    pub fn reclaimed_pct(&self) -> f64 {
        if self.before_pages_avg == 0.0 {
            0.0
        } else {
            self.delta_pages_avg / self.before_pages_avg * 100.0
        }
    }
}

/// Metadata about a generated report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    /// When the report was generated.
    pub generated_at: DateTime<Utc>,
    /// Sources that contributed rows.
    pub sources_loaded: Vec<String>,
    /// Sources that were missing or unreadable.
    pub sources_absent: Vec<String>,
    /// Rows in the merged dataset.
    pub total_rows: usize,
    /// Location of the persisted full-precision summary.
    pub summary_path: String,
    /// Decimal places the averages were rounded to.
    pub precision: u32,
}

/// One report line: a rounded summary row plus its reclaim share.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportRow {
    #[serde(flatten)]
    pub summary: SummaryRow,
    pub reclaimed_pct: f64,
}

/// The human-readable comparison report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub metadata: ReportMetadata,
    /// Ranked rows, most pages reclaimed first.
    pub rows: Vec<ReportRow>,
}
