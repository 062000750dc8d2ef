//! Report generation.
//!
//! Renders the ranked summary as an aligned text table, a Markdown document
//! or JSON. Every renderer works on the rounded display copy; the
//! full-precision summary is only ever persisted as CSV.

use crate::analysis::{round_to, PipelineOutput, SUMMARY_COLUMNS};
use crate::models::{Report, ReportMetadata, ReportRow, SummaryRow};
use anyhow::Result;
use chrono::Utc;
use std::path::Path;

/// Assemble a report from a finished pipeline run.
pub fn build_report(output: &PipelineOutput, summary_path: &Path, precision: u32) -> Report {
    let metadata = ReportMetadata {
        generated_at: Utc::now(),
        sources_loaded: output
            .loaded
            .iter()
            .map(|s| s.path.display().to_string())
            .collect(),
        sources_absent: output
            .absent
            .iter()
            .map(|s| s.path.display().to_string())
            .collect(),
        total_rows: output.total_rows,
        summary_path: summary_path.display().to_string(),
        precision,
    };

    // reclaim share comes from full precision, then gets rounded like the rest
    let rows = output
        .display
        .iter()
        .zip(&output.summary)
        .map(|(display, full)| ReportRow {
            summary: display.clone(),
            reclaimed_pct: round_to(full.reclaimed_pct(), precision),
        })
        .collect();

    Report { metadata, rows }
}

/// Render summary rows as an aligned text table without a row index.
///
/// Every column is right-aligned to its widest cell, header included.
pub fn render_text_table(rows: &[SummaryRow], precision: u32) -> String {
    let mut cells: Vec<Vec<String>> = vec![SUMMARY_COLUMNS.iter().map(|c| c.to_string()).collect()];
    cells.extend(rows.iter().map(|row| summary_cells(row, precision)));

    let widths: Vec<usize> = (0..SUMMARY_COLUMNS.len())
        .map(|col| cells.iter().map(|line| line[col].len()).max().unwrap_or(0))
        .collect();

    cells
        .iter()
        .map(|line| {
            line.iter()
                .zip(&widths)
                .map(|(cell, width)| format!("{:>width$}", cell, width = width))
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn summary_cells(row: &SummaryRow, precision: u32) -> Vec<String> {
    let p = precision as usize;
    vec![
        row.config.to_string(),
        format!("{:.p$}", row.before_pages_avg),
        format!("{:.p$}", row.after_pages_avg),
        format!("{:.p$}", row.delta_pages_avg),
        format!("{:.p$}", row.compact_time_s_avg),
        format!("{:.p$}", row.major_gc_before_s_avg),
        format!("{:.p$}", row.major_gc_after_s_avg),
        row.runs.to_string(),
    ]
}

/// Generate the plain-text report printed after a run.
pub fn generate_text_report(report: &Report) -> String {
    let rows: Vec<SummaryRow> = report.rows.iter().map(|r| r.summary.clone()).collect();

    let mut output = String::new();
    output.push_str("=== Compaction summary (averages) ===\n");
    output.push_str(&render_text_table(&rows, report.metadata.precision));
    output.push('\n');
    output
}

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &Report) -> String {
    let mut output = String::new();

    output.push_str("# Compaction Summary\n\n");
    output.push_str(&generate_metadata_section(&report.metadata));
    output.push_str(&generate_ranking_section(report));
    output.push_str(&generate_sources_section(&report.metadata));

    output
}

/// Generate the metadata section.
fn generate_metadata_section(metadata: &ReportMetadata) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!(
        "- **Generated:** {}\n",
        metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!(
        "- **Sources Loaded:** {}\n",
        metadata.sources_loaded.len()
    ));
    if !metadata.sources_absent.is_empty() {
        section.push_str(&format!(
            "- **Sources Missing:** {}\n",
            metadata.sources_absent.len()
        ));
    }
    section.push_str(&format!("- **Total Runs:** {}\n", metadata.total_rows));
    section.push_str(&format!(
        "- **Full-precision Summary:** `{}`\n",
        metadata.summary_path
    ));
    section.push('\n');

    section
}

/// Generate the ranking table, most pages reclaimed first.
fn generate_ranking_section(report: &Report) -> String {
    let p = report.metadata.precision as usize;
    let mut section = String::new();

    section.push_str("## Ranking\n\n");
    section.push_str(
        "| Rank | Config | Before (pages) | After (pages) | Reclaimed (pages) | Reclaimed (%) \
         | Compact (s) | Major GC before (s) | Major GC after (s) | Runs |\n",
    );
    section.push_str("|:---:|:---|---:|---:|---:|---:|---:|---:|---:|:---:|\n");

    for (i, row) in report.rows.iter().enumerate() {
        let s = &row.summary;
        section.push_str(&format!(
            "| {} | `{}` | {:.p$} | {:.p$} | {:.p$} | {:.p$} | {:.p$} | {:.p$} | {:.p$} | {} |\n",
            i + 1,
            s.config,
            s.before_pages_avg,
            s.after_pages_avg,
            s.delta_pages_avg,
            row.reclaimed_pct,
            s.compact_time_s_avg,
            s.major_gc_before_s_avg,
            s.major_gc_after_s_avg,
            s.runs,
        ));
    }
    section.push('\n');

    section
}

/// Generate the sources section.
fn generate_sources_section(metadata: &ReportMetadata) -> String {
    let mut section = String::new();

    section.push_str("## Sources\n\n");
    for source in &metadata.sources_loaded {
        section.push_str(&format!("- ✅ `{}`\n", source));
    }
    for source in &metadata.sources_absent {
        section.push_str(&format!("- ⚠️ `{}` (missing)\n", source));
    }
    section.push('\n');

    section
}

/// Generate a JSON report.
pub fn generate_json_report(report: &Report) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ConfigTag, SourceSpec};

    fn create_test_summary(config: ConfigTag, delta: f64, runs: usize) -> SummaryRow {
        SummaryRow {
            config,
            before_pages_avg: 1000.0 + delta,
            after_pages_avg: 1000.0,
            delta_pages_avg: delta,
            compact_time_s_avg: 0.0512,
            major_gc_before_s_avg: 0.2,
            major_gc_after_s_avg: 0.1,
            runs,
        }
    }

    fn create_test_output() -> PipelineOutput {
        let summary = vec![
            create_test_summary(ConfigTag::ManualCompact, 500.006, 5),
            create_test_summary(ConfigTag::NoCompact, 0.0, 5),
        ];
        PipelineOutput {
            display: crate::analysis::round_for_display(&summary, 2),
            summary,
            loaded: vec![
                SourceSpec::new(ConfigTag::NoCompact, "data/results_no_compact.csv"),
                SourceSpec::new(ConfigTag::ManualCompact, "data/results_manual_compact.csv"),
            ],
            absent: vec![SourceSpec::new(
                ConfigTag::AutoCompact,
                "data/results_auto_compact.csv",
            )],
            total_rows: 10,
        }
    }

    #[test]
    fn test_render_text_table_alignment() {
        let rows = vec![
            create_test_summary(ConfigTag::ManualCompact, 500.0, 5),
            create_test_summary(ConfigTag::NoCompact, 0.0, 12),
        ];
        let table = render_text_table(&rows, 2);
        let lines: Vec<_> = table.lines().collect();

        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("        config"));
        assert!(lines[1].starts_with("manual_compact"));
        assert!(lines[2].starts_with("    no_compact"));
        assert!(lines[1].contains("500.00"));
        assert!(lines[1].contains("0.05"));
        assert!(lines[2].ends_with("  12"));
        // every line has the same width
        assert!(lines.iter().all(|l| l.len() == lines[0].len()));
    }

    #[test]
    fn test_build_report_uses_display_copy() {
        let output = create_test_output();
        let report = build_report(&output, Path::new("data/summary.csv"), 2);

        assert_eq!(report.rows.len(), 2);
        assert_eq!(report.rows[0].summary.delta_pages_avg, 500.01);
        assert_eq!(report.rows[0].summary.config, ConfigTag::ManualCompact);
        assert_eq!(report.metadata.sources_absent.len(), 1);
        assert_eq!(report.metadata.total_rows, 10);
    }

    #[test]
    fn test_generate_text_report() {
        let report = build_report(&create_test_output(), Path::new("data/summary.csv"), 2);
        let text = generate_text_report(&report);

        assert!(text.starts_with("=== Compaction summary (averages) ==="));
        assert!(text.contains("delta_pages_avg"));
        assert!(text.contains("500.01"));
    }

    #[test]
    fn test_generate_markdown_report() {
        let report = build_report(&create_test_output(), Path::new("data/summary.csv"), 2);
        let markdown = generate_markdown_report(&report);

        assert!(markdown.contains("# Compaction Summary"));
        assert!(markdown.contains("## Ranking"));
        assert!(markdown.contains("| 1 | `manual_compact` |"));
        assert!(markdown.contains("Sources Missing:** 1"));
        assert!(markdown.contains("results_auto_compact.csv` (missing)"));
    }

    #[test]
    fn test_generate_json_report() {
        let report = build_report(&create_test_output(), Path::new("data/summary.csv"), 2);
        let json = generate_json_report(&report).unwrap();

        assert!(json.contains("\"generated_at\""));
        assert!(json.contains("\"delta_pages_avg\": 500.01"));
        assert!(json.contains("\"reclaimed_pct\""));
        assert!(json.contains("\"config\": \"manual_compact\""));
    }
}
