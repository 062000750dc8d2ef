//! Result aggregation and ranking.
//!
//! Each stage takes the previous stage's output: tables are combined,
//! deltas derived, rows grouped per configuration, groups summarized and
//! ranked, and finally a rounded copy is produced for display.

use crate::models::{CombinedTable, ConfigTag, DerivedRow, ResultTable, SummaryRow};
use std::collections::BTreeMap;

/// Concatenate loaded tables into one dataset.
///
/// Rows keep their source order and their configuration label; nothing is
/// deduplicated. Extra columns are unioned in first-seen order, and a row
/// whose source lacked one of them carries `None` there. `pages_delta` is
/// zero until [`derive_deltas`] runs.
pub fn combine(tables: &[ResultTable]) -> CombinedTable {
    let mut extra_columns: Vec<String> = Vec::new();
    for table in tables {
        for name in table.extra_columns() {
            if !extra_columns.contains(name) {
                extra_columns.push(name.clone());
            }
        }
    }

    let mut rows = Vec::with_capacity(tables.iter().map(ResultTable::len).sum());
    for table in tables {
        let positions: Vec<Option<usize>> = extra_columns
            .iter()
            .map(|name| table.extra_columns().iter().position(|c| c == name))
            .collect();

        for row in table.rows() {
            let extras = positions
                .iter()
                .map(|pos| pos.and_then(|i| row.extras.get(i).cloned()))
                .collect();
            rows.push(DerivedRow {
                row: row.clone(),
                pages_delta: 0.0,
                extras,
            });
        }
    }

    CombinedTable {
        extra_columns,
        rows,
    }
}

/// Fill in `pages_delta = before_heap_pages - after_heap_pages` per row.
///
/// The delta is signed; a heap that grew yields a negative value.
pub fn derive_deltas(mut combined: CombinedTable) -> CombinedTable {
    for derived in &mut combined.rows {
        derived.pages_delta = derived.row.pages_delta();
    }
    combined
}

/// Rows of one configuration.
#[derive(Debug, Clone)]
pub struct ConfigGroup<'a> {
    pub config: ConfigTag,
    pub rows: Vec<&'a DerivedRow>,
}

/// Group rows by configuration label.
///
/// Groups come out in ascending label order; this is the order ties keep
/// after ranking.
pub fn group_by_config(combined: &CombinedTable) -> Vec<ConfigGroup<'_>> {
    let mut grouped: BTreeMap<&'static str, ConfigGroup<'_>> = BTreeMap::new();

    for derived in &combined.rows {
        let config = derived.row.config;
        grouped
            .entry(config.as_str())
            .or_insert_with(|| ConfigGroup {
                config,
                rows: Vec::new(),
            })
            .rows
            .push(derived);
    }

    grouped.into_values().collect()
}

/// Average every measurement of a group.
///
/// `delta_pages_avg` is the mean of the per-row deltas, not the difference
/// of the two page means.
pub fn summarize_group(group: &ConfigGroup<'_>) -> SummaryRow {
    let runs = group.rows.len();
    let mean = |value: fn(&DerivedRow) -> f64| -> f64 {
        if runs == 0 {
            return 0.0;
        }
        group.rows.iter().map(|r| value(r)).sum::<f64>() / runs as f64
    };

    SummaryRow {
        config: group.config,
        before_pages_avg: mean(|r| r.row.before_heap_pages),
        after_pages_avg: mean(|r| r.row.after_heap_pages),
        delta_pages_avg: mean(|r| r.pages_delta),
        compact_time_s_avg: mean(|r| r.row.compact_time_s),
        major_gc_before_s_avg: mean(|r| r.row.major_before_s),
        major_gc_after_s_avg: mean(|r| r.row.major_after_s),
        runs,
    }
}

/// Summarize each group, keeping the grouping order.
pub fn summarize(groups: &[ConfigGroup<'_>]) -> Vec<SummaryRow> {
    groups.iter().map(summarize_group).collect()
}

/// Sort summaries by mean pages reclaimed, most first.
///
/// The sort is stable, so equal deltas keep their incoming order.
pub fn rank(mut summary: Vec<SummaryRow>) -> Vec<SummaryRow> {
    summary.sort_by(|a, b| b.delta_pages_avg.total_cmp(&a.delta_pages_avg));
    summary
}

/// Most decimal places a display copy can be rounded to.
pub const MAX_DISPLAY_DECIMALS: u32 = 10;

/// Round a value to `decimals` places, ties to even (`0.125` -> `0.12`).
///
/// `decimals` is capped at [`MAX_DISPLAY_DECIMALS`].
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals.min(MAX_DISPLAY_DECIMALS) as i32);
    (value * factor).round_ties_even() / factor
}

/// Copy of the ranked summary with the six averages rounded for display.
///
/// Order and `runs` are untouched.
pub fn round_for_display(summary: &[SummaryRow], decimals: u32) -> Vec<SummaryRow> {
    summary
        .iter()
        .map(|s| SummaryRow {
            config: s.config,
            before_pages_avg: round_to(s.before_pages_avg, decimals),
            after_pages_avg: round_to(s.after_pages_avg, decimals),
            delta_pages_avg: round_to(s.delta_pages_avg, decimals),
            compact_time_s_avg: round_to(s.compact_time_s_avg, decimals),
            major_gc_before_s_avg: round_to(s.major_gc_before_s_avg, decimals),
            major_gc_after_s_avg: round_to(s.major_gc_after_s_avg, decimals),
            runs: s.runs,
        })
        .collect()
}

/// Combine, derive, group, summarize and rank in one call.
pub fn build_summary(tables: &[ResultTable]) -> (CombinedTable, Vec<SummaryRow>) {
    let combined = derive_deltas(combine(tables));
    let summary = rank(summarize(&group_by_config(&combined)));
    (combined, summary)
}
