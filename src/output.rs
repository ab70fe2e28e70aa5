//! CSV report files

use crate::aggregate::{DetailRow, Report, SummaryRow};
use crate::error::Result;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Locations of a run's report files
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    /// `subnet,asn,asn_desc,country,count`
    pub summary: PathBuf,
    /// `original_line,subnet,asn,asn_desc,country`
    pub detail: PathBuf,
}

impl OutputPaths {
    /// Paths for a run: `<prefix>_<run_id>.csv` and `<prefix>_detailed_<run_id>.csv`
    pub fn for_run(dir: &Path, prefix: &str, run_id: &str) -> Self {
        Self {
            summary: dir.join(format!("{prefix}_{run_id}.csv")),
            detail: dir.join(format!("{prefix}_detailed_{run_id}.csv")),
        }
    }
}

fn write_rows<T: Serialize>(path: &Path, rows: &[T], header: &[&str]) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)?;
    // Written by hand so an empty report still gets its header
    writer.write_record(header)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Write the summary table
pub fn write_summary(path: &Path, rows: &[SummaryRow]) -> Result<()> {
    write_rows(path, rows, &["subnet", "asn", "asn_desc", "country", "count"])
}

/// Write the detail table
pub fn write_detail(path: &Path, rows: &[DetailRow]) -> Result<()> {
    write_rows(
        path,
        rows,
        &["original_line", "subnet", "asn", "asn_desc", "country"],
    )
}

/// Write both tables of a report
pub fn write_report(paths: &OutputPaths, report: &Report) -> Result<()> {
    write_summary(&paths.summary, &report.summary)?;
    write_detail(&paths.detail, &report.detail)
}
