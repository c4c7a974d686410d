//! Report emitter - CSV, Markdown, and console renderings
//!
//! Public interface:
//! - `CsvSink` - streaming per-query outcome CSV
//! - `read_outcomes()` - load an outcome CSV for re-aggregation
//! - `write_summary_csv()` / `write_markdown()` - aggregate outputs
//! - `print_summary()` - console table
//!
//! Formatting and rounding only; all numbers come from `metrics`.

mod console;
mod csv;
mod markdown;

use chrono::{DateTime, Utc};
use std::fs;
use std::path::Path;

use crate::error::Result;
use crate::metrics::BenchmarkReport;

pub use console::print_summary;
pub use csv::{
    escape_csv, read_outcomes, summary_csv, write_summary_csv, CsvSink, OUTCOME_HEADER,
    SUMMARY_HEADER,
};

/// Caveat attached to every report containing a harness-ranked tool
pub const RG_RANKING_CAVEAT: &str = "ripgrep does not rank results. Files are ordered by \
    per-file match count, ties by path. Treat its Hit@K and MRR as an approximation, \
    not a relevance ranking.";

/// Descriptive context printed above the numbers
#[derive(Debug, Clone)]
pub struct ReportContext {
    pub title: String,
    pub repo: String,
    pub query_set: String,
    pub mode: String,
    pub k: usize,
    pub runs: usize,
    /// How failures were treated, e.g. "excluded"
    pub failure_policy: String,
    pub generated: DateTime<Utc>,
}

/// Render the Markdown report to a string
pub fn render_markdown(
    context: &ReportContext,
    reports: &[BenchmarkReport],
    approximate: &[String],
) -> String {
    markdown::render(context, reports, approximate)
}

/// Write the Markdown report, creating parent directories
pub fn write_markdown(
    path: &Path,
    context: &ReportContext,
    reports: &[BenchmarkReport],
    approximate: &[String],
) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, render_markdown(context, reports, approximate))?;
    Ok(())
}
