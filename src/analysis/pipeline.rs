//! Pipeline driver.
//!
//! Loads every configured source, hands the tables to the aggregator and
//! persists the full-precision summary. A run fails only when not a single
//! source could be loaded.

use super::aggregator::{build_summary, round_for_display};
use crate::loader::load_results;
use crate::models::{CombinedTable, ResultTable, SourceSpec, SummaryRow};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// Fatal pipeline failures.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("No data found in any CSV ({attempted} sources attempted)")]
    NoData { attempted: usize },

    #[error("failed to create directory {path}: {source}")]
    CreateDir {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: csv::Error,
    },
}

/// Inputs for one pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Sources in the order they are attempted.
    pub sources: Vec<SourceSpec>,
    /// Where the full-precision summary is written.
    pub output: PathBuf,
    /// Where the merged per-row dataset is written, if anywhere.
    pub combined_output: Option<PathBuf>,
    /// Decimal places of the display copy.
    pub precision: u32,
}

/// Everything a run produced.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    /// Ranked summary at full precision, as persisted.
    pub summary: Vec<SummaryRow>,
    /// Same rows and order, averages rounded for display.
    pub display: Vec<SummaryRow>,
    /// Sources that contributed a table.
    pub loaded: Vec<SourceSpec>,
    /// Sources that were missing or unreadable.
    pub absent: Vec<SourceSpec>,
    /// Number of rows in the merged dataset.
    pub total_rows: usize,
}

/// Load every source, splitting them into loaded tables and absent sources.
pub fn load_all(sources: &[SourceSpec]) -> (Vec<(SourceSpec, ResultTable)>, Vec<SourceSpec>) {
    let mut loaded = Vec::new();
    let mut absent = Vec::new();

    for spec in sources {
        match load_results(&spec.path, spec.config).into_table() {
            Some(table) => {
                debug!("{} contributes {} rows to {}", table.source(), table.len(), table.config());
                loaded.push((spec.clone(), table));
            }
            None => absent.push(spec.clone()),
        }
    }

    (loaded, absent)
}

/// Run the whole pipeline.
///
/// Every source is attempted before the no-data check, and nothing is
/// written when it fails.
pub fn run_pipeline(options: &PipelineOptions) -> Result<PipelineOutput, PipelineError> {
    let (loaded, absent) = load_all(&options.sources);

    if loaded.is_empty() {
        return Err(PipelineError::NoData {
            attempted: options.sources.len(),
        });
    }

    let (specs, tables): (Vec<SourceSpec>, Vec<ResultTable>) = loaded.into_iter().unzip();
    let (combined, summary) = build_summary(&tables);
    info!(
        "Merged {} rows from {} sources into {} configurations",
        combined.len(),
        tables.len(),
        summary.len()
    );

    let display = round_for_display(&summary, options.precision);

    persist_summary(&options.output, &summary)?;
    info!("Saved summary: {}", options.output.display());

    if let Some(ref path) = options.combined_output {
        persist_combined(path, &combined)?;
        info!("Saved merged dataset: {}", path.display());
    }

    Ok(PipelineOutput {
        summary,
        display,
        loaded: specs,
        absent,
        total_rows: combined.len(),
    })
}

/// Write the summary as CSV, header included.
pub fn write_summary<W: Write>(writer: W, summary: &[SummaryRow]) -> csv::Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    if summary.is_empty() {
        csv_writer.write_record(SUMMARY_COLUMNS)?;
    }
    for row in summary {
        csv_writer.serialize(row)?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Column order of the persisted summary.
pub const SUMMARY_COLUMNS: [&str; 8] = [
    "config",
    "before_pages_avg",
    "after_pages_avg",
    "delta_pages_avg",
    "compact_time_s_avg",
    "major_gc_before_s_avg",
    "major_gc_after_s_avg",
    "runs",
];

/// Persist the summary to `path`, replacing any previous file.
pub fn persist_summary(path: &Path, summary: &[SummaryRow]) -> Result<(), PipelineError> {
    let file = create_output(path)?;
    write_summary(file, summary).map_err(|source| PipelineError::Write {
        path: path.display().to_string(),
        source,
    })
}

/// Write the merged dataset as CSV.
///
/// Columns: `config`, the five measurements, `pages_delta`, then every extra
/// source column. Cells a source did not have are left empty.
pub fn write_combined<W: Write>(writer: W, combined: &CombinedTable) -> csv::Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);

    let mut header = vec!["config".to_string()];
    header.extend(crate::models::REQUIRED_COLUMNS.iter().map(|c| c.to_string()));
    header.push("pages_delta".to_string());
    header.extend(combined.extra_columns.iter().cloned());
    csv_writer.write_record(&header)?;

    for derived in &combined.rows {
        let row = &derived.row;
        let mut record = vec![
            row.config.to_string(),
            row.before_heap_pages.to_string(),
            row.after_heap_pages.to_string(),
            row.compact_time_s.to_string(),
            row.major_before_s.to_string(),
            row.major_after_s.to_string(),
            derived.pages_delta.to_string(),
        ];
        record.extend(derived.extras.iter().map(|e| e.clone().unwrap_or_default()));
        csv_writer.write_record(&record)?;
    }

    csv_writer.flush()?;
    Ok(())
}

/// Persist the merged dataset to `path`, replacing any previous file.
pub fn persist_combined(path: &Path, combined: &CombinedTable) -> Result<(), PipelineError> {
    let file = create_output(path)?;
    write_combined(file, combined).map_err(|source| PipelineError::Write {
        path: path.display().to_string(),
        source,
    })
}

fn create_output(path: &Path) -> Result<fs::File, PipelineError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| PipelineError::CreateDir {
            path: parent.display().to_string(),
            source,
        })?;
    }

    debug!("Writing {}", path.display());
    fs::File::create(path).map_err(|e| PipelineError::Write {
        path: path.display().to_string(),
        source: e.into(),
    })
}
