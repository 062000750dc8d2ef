//! Result loading and schema normalization.
//!
//! Reads one benchmark CSV per configuration and resolves whatever it
//! contains into the fixed [`ResultRow`] shape. Nothing in here is fatal:
//! a missing source is reported as [`LoadOutcome::Absent`], a missing column
//! is synthesized as zeros and a cell that does not parse as a number
//! becomes zero.

use crate::models::{ConfigTag, LoadOutcome, ResultRow, ResultTable, REQUIRED_COLUMNS};
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors raised while parsing a source that exists.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to open {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to read CSV from {path}: {source}")]
    Csv {
        path: String,
        #[source]
        source: csv::Error,
    },
}

/// What normalization had to repair in one source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizationReport {
    /// Required columns the header did not contain.
    pub missing_columns: Vec<&'static str>,
    /// Cells under required columns that were coerced to zero.
    pub coerced_cells: usize,
}

impl NormalizationReport {
    pub fn is_clean(&self) -> bool {
        self.missing_columns.is_empty() && self.coerced_cells == 0
    }
}

/// Load the result table for `config` from `path`.
///
/// A missing or unreadable source yields [`LoadOutcome::Absent`] with a
/// warning; the caller is expected to carry on with the other sources.
pub fn load_results(path: &Path, config: ConfigTag) -> LoadOutcome {
    if !path.exists() {
        warn!("Missing file: {}", path.display());
        return LoadOutcome::Absent;
    }

    match read_results(path, config) {
        Ok((table, report)) => {
            if !report.is_clean() {
                debug!(
                    "{}: synthesized columns {:?}, coerced {} cells to zero",
                    path.display(),
                    report.missing_columns,
                    report.coerced_cells
                );
            }
            info!("Loaded {} rows for {} from {}", table.len(), config, path.display());
            LoadOutcome::Loaded(table)
        }
        Err(e) => {
            warn!("Skipping unreadable source: {}", e);
            LoadOutcome::Absent
        }
    }
}

fn read_results(
    path: &Path,
    config: ConfigTag,
) -> Result<(ResultTable, NormalizationReport), LoadError> {
    let display = path.display().to_string();
    let file = File::open(path).map_err(|source| LoadError::Open {
        path: display.clone(),
        source,
    })?;
    parse_results(file, config, &display)
}

/// Parse CSV text into a normalized table.
///
/// The header row names the columns; column order is free. Rows shorter
/// than the header are tolerated and their missing cells treated as
/// non-numeric.
pub fn parse_results<R: Read>(
    reader: R,
    config: ConfigTag,
    source: &str,
) -> Result<(ResultTable, NormalizationReport), LoadError> {
    let csv_err = |e: csv::Error| LoadError::Csv {
        path: source.to_string(),
        source: e,
    };

    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers: Vec<String> = csv_reader
        .byte_headers()
        .map_err(csv_err)?
        .iter()
        .map(|h| String::from_utf8_lossy(h).into_owned())
        .collect();

    let layout = ColumnLayout::from_headers(&headers);
    let mut report = NormalizationReport {
        missing_columns: layout.missing(),
        coerced_cells: 0,
    };

    let mut rows = Vec::new();
    for record in csv_reader.byte_records() {
        let record = record.map_err(csv_err)?;
        let cell = |idx: Option<usize>| -> Option<String> {
            idx.and_then(|i| record.get(i))
                .map(|raw| String::from_utf8_lossy(raw).into_owned())
        };

        let numeric = |idx: Option<usize>, report: &mut NormalizationReport| {
            coerce(idx, cell(idx), parse_numeric, report)
        };
        let before_heap_pages = numeric(layout.before_heap_pages, &mut report);
        let after_heap_pages = numeric(layout.after_heap_pages, &mut report);
        let compact_time_s = numeric(layout.compact_time_s, &mut report);
        let major_before_s = numeric(layout.major_before_s, &mut report);
        let major_after_s = numeric(layout.major_after_s, &mut report);

        let extras = layout
            .extras
            .iter()
            .map(|(i, _)| cell(Some(*i)).unwrap_or_default())
            .collect();

        rows.push(ResultRow {
            before_heap_pages,
            after_heap_pages,
            compact_time_s,
            major_before_s,
            major_after_s,
            config,
            extras,
        });
    }

    let extra_columns = layout.extras.into_iter().map(|(_, name)| name).collect();
    let table = ResultTable::new(config, source.to_string(), extra_columns, rows);
    Ok((table, report))
}

/// Positions of the required columns within a header, plus the rest.
#[derive(Debug, Default)]
struct ColumnLayout {
    before_heap_pages: Option<usize>,
    after_heap_pages: Option<usize>,
    compact_time_s: Option<usize>,
    major_before_s: Option<usize>,
    major_after_s: Option<usize>,
    /// Pass-through columns with their position and final name.
    extras: Vec<(usize, String)>,
}

impl ColumnLayout {
    /// Repeated header names are renamed `name.1`, `name.2`, ... so a
    /// duplicate of a required column is carried through as an extra.
    fn from_headers(headers: &[String]) -> Self {
        let mut layout = Self::default();
        let mut seen: HashMap<&str, usize> = HashMap::new();

        for (i, header) in headers.iter().enumerate() {
            let count = seen.entry(header.as_str()).or_insert(0);
            let name = match *count {
                0 => header.clone(),
                n => format!("{}.{}", header, n),
            };
            *count += 1;

            let slot = match name.as_str() {
                "before_heap_pages" => Some(&mut layout.before_heap_pages),
                "after_heap_pages" => Some(&mut layout.after_heap_pages),
                "compact_time_s" => Some(&mut layout.compact_time_s),
                "major_before_s" => Some(&mut layout.major_before_s),
                "major_after_s" => Some(&mut layout.major_after_s),
                // `config` is assigned by the loader, never read from the source
                "config" => continue,
                _ => None,
            };
            match slot {
                Some(slot) => *slot = Some(i),
                None => layout.extras.push((i, name)),
            }
        }

        layout
    }

    fn missing(&self) -> Vec<&'static str> {
        let slots = [
            self.before_heap_pages,
            self.after_heap_pages,
            self.compact_time_s,
            self.major_before_s,
            self.major_after_s,
        ];
        REQUIRED_COLUMNS
            .iter()
            .zip(slots)
            .filter(|(_, slot)| slot.is_none())
            .map(|(name, _)| *name)
            .collect()
    }
}

/// Apply the defaulting rule for one required cell.
///
/// A synthesized column is zero without counting as a coercion.
fn coerce<T: Default>(
    idx: Option<usize>,
    raw: Option<String>,
    parse: fn(&str) -> Option<T>,
    report: &mut NormalizationReport,
) -> T {
    if idx.is_none() {
        return T::default();
    }
    match raw.as_deref().and_then(parse) {
        Some(value) => value,
        None => {
            report.coerced_cells += 1;
            T::default()
        }
    }
}

/// Parse a numeric cell. Anything `f64` accepts is kept as is, including
/// fractions, negatives and infinities; NaN counts as missing.
pub fn parse_numeric(raw: &str) -> Option<f64> {
    let value = raw.trim().parse::<f64>().ok()?;
    if value.is_nan() {
        None
    } else {
        Some(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const HEADER: &str =
        "run,before_heap_pages,after_heap_pages,compact_time_s,major_before_s,major_after_s";

    fn parse(csv: &str) -> (ResultTable, NormalizationReport) {
        parse_results(csv.as_bytes(), ConfigTag::ManualCompact, "test.csv").unwrap()
    }

    #[test]
    fn test_well_formed_source() {
        let csv = format!(
            "{}\n1,1200,900,0.05,0.2,0.1\n2,1300,1000,0.06,0.25,0.12\n",
            HEADER
        );
        let (table, report) = parse(&csv);

        assert!(report.is_clean());
        assert_eq!(table.len(), 2);
        assert_eq!(table.config(), ConfigTag::ManualCompact);
        assert_eq!(table.extra_columns(), &["run".to_string()]);

        let first = &table.rows()[0];
        assert_eq!(first.before_heap_pages, 1200.0);
        assert_eq!(first.after_heap_pages, 900.0);
        assert_eq!(first.compact_time_s, 0.05);
        assert_eq!(first.major_before_s, 0.2);
        assert_eq!(first.major_after_s, 0.1);
        assert_eq!(first.config, ConfigTag::ManualCompact);
        assert_eq!(first.extras, vec!["1".to_string()]);
    }

    #[test]
    fn test_column_order_is_free() {
        let csv = "major_after_s,after_heap_pages,major_before_s,before_heap_pages,compact_time_s\n\
                   0.3,40,0.2,100,0.1\n";
        let (table, report) = parse(csv);

        assert!(report.is_clean());
        let row = &table.rows()[0];
        assert_eq!(row.before_heap_pages, 100.0);
        assert_eq!(row.after_heap_pages, 40.0);
        assert_eq!(row.compact_time_s, 0.1);
        assert_eq!(row.major_before_s, 0.2);
        assert_eq!(row.major_after_s, 0.3);
    }

    #[test]
    fn test_missing_column_is_zero_filled() {
        let csv = "before_heap_pages,after_heap_pages,major_before_s,major_after_s\n\
                   100,40,0.2,0.1\n200,90,0.3,0.2\n";
        let (table, report) = parse(csv);

        assert_eq!(report.missing_columns, vec!["compact_time_s"]);
        assert_eq!(report.coerced_cells, 0);
        assert_eq!(table.len(), 2);
        assert!(table.rows().iter().all(|r| r.compact_time_s == 0.0));
        assert_eq!(table.rows()[1].before_heap_pages, 200.0);
    }

    #[test]
    fn test_non_numeric_cell_only_affects_itself() {
        let csv = format!("{}\n1,abc,40,n/a,0.2,0.1\n", HEADER);
        let (table, report) = parse(&csv);

        assert_eq!(report.coerced_cells, 2);
        let row = &table.rows()[0];
        assert_eq!(row.before_heap_pages, 0.0);
        assert_eq!(row.after_heap_pages, 40.0);
        assert_eq!(row.compact_time_s, 0.0);
        assert_eq!(row.major_before_s, 0.2);
        assert_eq!(row.major_after_s, 0.1);
    }

    #[test]
    fn test_empty_nan_and_short_rows() {
        let csv = format!("{}\n1,,40,NaN,inf\n", HEADER);
        let (table, report) = parse(&csv);

        let row = &table.rows()[0];
        assert_eq!(row.before_heap_pages, 0.0);
        assert_eq!(row.after_heap_pages, 40.0);
        assert_eq!(row.compact_time_s, 0.0);
        assert_eq!(row.major_before_s, f64::INFINITY);
        // short row: major_after_s cell is missing entirely
        assert_eq!(row.major_after_s, 0.0);
        assert_eq!(report.coerced_cells, 3);
    }

    #[test]
    fn test_parseable_values_are_kept() {
        let csv = "before_heap_pages,after_heap_pages,compact_time_s,major_before_s,major_after_s\n\
                   1200,12.5,-0.2,0.3,0.1\n\
                   -3,1.2e3,0.1,0.3,0.1\n";
        let (table, report) = parse(csv);

        assert!(report.is_clean());
        let first = &table.rows()[0];
        assert_eq!(first.after_heap_pages, 12.5);
        assert_eq!(first.compact_time_s, -0.2);
        assert_eq!(first.pages_delta(), 1187.5);

        let second = &table.rows()[1];
        assert_eq!(second.before_heap_pages, -3.0);
        assert_eq!(second.after_heap_pages, 1200.0);
        assert_eq!(second.pages_delta(), -1203.0);
    }

    #[test]
    fn test_huge_page_counts() {
        let csv = "before_heap_pages,after_heap_pages,compact_time_s,major_before_s,major_after_s\n\
                   9223372036854775808,1,0,0,0\n\
                   18446744073709551616,18446744073709551615,0,0,0\n";
        let (table, report) = parse(csv);

        assert!(report.is_clean());
        let delta = table.rows()[0].pages_delta();
        assert!(delta.is_finite());
        assert!(delta > 9.2e18);
        assert!(table.rows()[1].pages_delta().is_finite());
    }

    #[test]
    fn test_duplicate_required_header_is_passed_through() {
        let csv = "before_heap_pages,after_heap_pages,before_heap_pages,run,run\n\
                   100,40,7,1,2\n";
        let (table, _) = parse(csv);

        assert_eq!(
            table.extra_columns(),
            &[
                "before_heap_pages.1".to_string(),
                "run".to_string(),
                "run.1".to_string()
            ]
        );
        let row = &table.rows()[0];
        assert_eq!(row.before_heap_pages, 100.0);
        assert_eq!(
            row.extras,
            vec!["7".to_string(), "1".to_string(), "2".to_string()]
        );
    }

    #[test]
    fn test_header_only_source_is_empty_table() {
        let (table, _) = parse(&format!("{}\n", HEADER));
        assert!(table.is_empty());
    }

    #[test]
    fn test_growth_is_preserved() {
        let csv = format!("{}\n1,40,100,0,0,0\n", HEADER);
        let (table, _) = parse(&csv);
        assert_eq!(table.rows()[0].pages_delta(), -60.0);
    }

    #[test]
    fn test_parse_numeric() {
        assert_eq!(parse_numeric("1200"), Some(1200.0));
        assert_eq!(parse_numeric(" 1200 "), Some(1200.0));
        assert_eq!(parse_numeric("1.2e3"), Some(1200.0));
        assert_eq!(parse_numeric("12.5"), Some(12.5));
        assert_eq!(parse_numeric("-3"), Some(-3.0));
        assert_eq!(parse_numeric("-0.5"), Some(-0.5));
        assert_eq!(parse_numeric("inf"), Some(f64::INFINITY));
        assert_eq!(parse_numeric("NaN"), None);
        assert_eq!(parse_numeric(""), None);
        assert_eq!(parse_numeric("fast"), None);
    }

    #[test]
    fn test_load_missing_file_is_absent() {
        let temp_dir = TempDir::new().unwrap();
        let outcome = load_results(
            &temp_dir.path().join("results_no_compact.csv"),
            ConfigTag::NoCompact,
        );
        assert!(outcome.into_table().is_none());
    }

    #[test]
    fn test_load_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("results_auto_compact.csv");
        std::fs::write(&path, format!("{}\n1,500,200,0,0.1,0.1\n", HEADER)).unwrap();

        let table = load_results(&path, ConfigTag::AutoCompact)
            .into_table()
            .unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.rows()[0].config, ConfigTag::AutoCompact);
        assert_eq!(table.source(), path.display().to_string());
    }
}
