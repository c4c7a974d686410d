//! Outcome and summary CSV files
//!
//! Outcome rows are written one per (query, tool) and flushed immediately.
//! The reader accepts files written here and the older harness layout
//! (`engine`, `rank`, `exit` columns, no `status`).

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::{BenchError, Result};
use crate::metrics::BenchmarkReport;
use crate::process::one_line;
use crate::runner::{OutcomeSink, OutcomeStatus, QueryOutcome};
use crate::search::SearchResult;

pub const OUTCOME_HEADER: &str =
    "id,tool,query_type,query,target_file,hit_rank,hit,latency_ms,status,exit_code,top_k,stderr";

pub const SUMMARY_HEADER: &str =
    "tool,runs,queries,failures,hit_at_k,mrr,latency_p50_ms,latency_p95_ms,latency_mean_ms";

/// Longest stderr excerpt kept per row
const STDERR_MAX_CHARS: usize = 200;

/// Escape a string for CSV output
pub fn escape_csv(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') || s.contains('\r') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

fn join_row(fields: &[String]) -> String {
    fields
        .iter()
        .map(|f| escape_csv(f))
        .collect::<Vec<_>>()
        .join(",")
}

fn create_parent(path: &Path) -> io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent),
        _ => Ok(()),
    }
}

/// Streaming outcome writer; one flushed line per outcome
pub struct CsvSink<W: Write> {
    writer: W,
    rows: usize,
}

impl CsvSink<BufWriter<File>> {
    /// Create (truncate) `path` and write the header
    pub fn create(path: &Path) -> io::Result<Self> {
        create_parent(path)?;
        let file = File::create(path)?;
        Self::new(BufWriter::new(file))
    }
}

impl<W: Write> CsvSink<W> {
    pub fn new(mut writer: W) -> io::Result<Self> {
        writeln!(writer, "{}", OUTCOME_HEADER)?;
        writer.flush()?;
        Ok(Self { writer, rows: 0 })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> OutcomeSink for CsvSink<W> {
    fn record(&mut self, outcome: &QueryOutcome) -> io::Result<()> {
        writeln!(self.writer, "{}", join_row(&outcome_fields(outcome)))?;
        self.writer.flush()?;
        self.rows += 1;
        Ok(())
    }
}

fn outcome_fields(outcome: &QueryOutcome) -> Vec<String> {
    let top_k = outcome
        .results
        .iter()
        .map(|r| r.file_path.to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("|");

    vec![
        outcome.id.clone(),
        outcome.tool.clone(),
        outcome.query_type.clone(),
        outcome.query.clone(),
        outcome.target_file.to_string_lossy().into_owned(),
        outcome.hit_rank.map(|r| r.to_string()).unwrap_or_default(),
        if outcome.hit_rank.is_some() { "1" } else { "0" }.to_string(),
        format!("{:.2}", outcome.latency_ms),
        outcome.status.as_str().to_string(),
        outcome.exit_code.map(|c| c.to_string()).unwrap_or_default(),
        top_k,
        one_line(&outcome.stderr, STDERR_MAX_CHARS),
    ]
}

// =============================================================================
// Reading
// =============================================================================

/// Split CSV text into records of fields, honoring quotes and `""` escapes
///
/// Each record carries the 1-based line it starts on.
fn parse_records(content: &str) -> Vec<(usize, Vec<String>)> {
    let mut records = Vec::new();
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut line = 1;
    let mut record_line = 1;
    let mut chars = content.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    field.push('"');
                }
                '"' => in_quotes = false,
                '\n' => {
                    line += 1;
                    field.push(c);
                }
                _ => field.push(c),
            }
            continue;
        }
        match c {
            '"' => in_quotes = true,
            ',' => fields.push(std::mem::take(&mut field)),
            '\r' => {}
            '\n' => {
                fields.push(std::mem::take(&mut field));
                let done = std::mem::take(&mut fields);
                if !(done.len() == 1 && done[0].is_empty()) {
                    records.push((record_line, done));
                }
                line += 1;
                record_line = line;
            }
            _ => field.push(c),
        }
    }
    if !field.is_empty() || !fields.is_empty() {
        fields.push(field);
        records.push((record_line, fields));
    }
    records
}

/// Column lookup by header name, with aliases
struct Columns {
    index: HashMap<String, usize>,
}

impl Columns {
    fn new(header: &[String]) -> Self {
        Self {
            index: header
                .iter()
                .enumerate()
                .map(|(i, h)| (h.trim().to_string(), i))
                .collect(),
        }
    }

    fn find(&self, names: &[&str]) -> Option<usize> {
        names.iter().find_map(|n| self.index.get(*n).copied())
    }

    fn get<'r>(&self, row: &'r [String], names: &[&str]) -> Option<&'r str> {
        self.find(names)
            .and_then(|i| row.get(i))
            .map(|s| s.as_str())
    }
}

/// Read an outcome CSV back into outcomes
pub fn read_outcomes(path: &Path) -> Result<Vec<QueryOutcome>> {
    let content = fs::read_to_string(path)?;
    let mut records = parse_records(&content).into_iter();

    let invalid = |line: usize, message: String| BenchError::InvalidOutcomeRow {
        path: path.to_path_buf(),
        line,
        message,
    };

    let (_, header) = records
        .next()
        .ok_or_else(|| invalid(1, "missing header".to_string()))?;
    let columns = Columns::new(&header);
    for required in [&["tool", "engine"][..], &["latency_ms"][..]] {
        if columns.find(required).is_none() {
            return Err(invalid(1, format!("missing column '{}'", required[0])));
        }
    }

    let mut outcomes = Vec::new();
    for (line, row) in records {
        let field = |names: &[&str]| columns.get(&row, names).unwrap_or("").trim().to_string();

        let tool = field(&["tool", "engine"]);
        if tool.is_empty() {
            return Err(invalid(line, "empty tool".to_string()));
        }

        let hit_rank = match field(&["hit_rank", "rank"]).as_str() {
            "" => None,
            raw => Some(
                raw.parse::<usize>()
                    .map_err(|_| invalid(line, format!("invalid hit_rank '{}'", raw)))?,
            ),
        };

        let latency_raw = field(&["latency_ms"]);
        let latency_ms = latency_raw
            .parse::<f64>()
            .map_err(|_| invalid(line, format!("invalid latency_ms '{}'", latency_raw)))?;

        let exit_code = field(&["exit_code", "exit"]).parse::<i32>().ok();

        let status = match field(&["status"]).as_str() {
            "" => legacy_status(&tool, exit_code),
            raw => raw.parse::<OutcomeStatus>().map_err(|e| invalid(line, e))?,
        };

        let results = field(&["top_k"])
            .split('|')
            .filter(|p| !p.is_empty())
            .enumerate()
            .map(|(i, p)| SearchResult {
                rank: i + 1,
                file_path: PathBuf::from(p),
                score: None,
                lines: Vec::new(),
            })
            .collect();

        outcomes.push(QueryOutcome {
            id: field(&["id"]),
            query_type: field(&["query_type"]),
            query: field(&["query"]),
            target_file: PathBuf::from(field(&["target_file", "targets"])),
            results,
            latency_ms,
            hit_rank,
            status,
            exit_code,
            stderr: field(&["stderr"]),
            tool,
        });
    }

    Ok(outcomes)
}

/// Status for rows written before the `status` column existed
fn legacy_status(tool: &str, exit_code: Option<i32>) -> OutcomeStatus {
    match exit_code {
        None | Some(0) => OutcomeStatus::Ok,
        Some(1) if tool == "rg" => OutcomeStatus::Ok,
        Some(_) => OutcomeStatus::Failed,
    }
}

// =============================================================================
// Summary
// =============================================================================

fn fmt_latency(value: Option<f64>) -> String {
    value
        .map(|v| format!("{:.2}", v))
        .unwrap_or_else(|| "n/a".to_string())
}

/// Summary CSV text, one row per tool
pub fn summary_csv(reports: &[BenchmarkReport]) -> String {
    let mut out = String::new();
    out.push_str(SUMMARY_HEADER);
    out.push('\n');
    for report in reports {
        let row = vec![
            report.tool.clone(),
            report.runs.to_string(),
            report.queries.to_string(),
            report.failures.to_string(),
            format!("{:.3}", report.hit_at_k),
            format!("{:.3}", report.mrr),
            fmt_latency(report.latency_p50_ms),
            fmt_latency(report.latency_p95_ms),
            fmt_latency(report.latency_mean_ms),
        ];
        out.push_str(&join_row(&row));
        out.push('\n');
    }
    out
}

pub fn write_summary_csv(path: &Path, reports: &[BenchmarkReport]) -> Result<()> {
    create_parent(path)?;
    fs::write(path, summary_csv(reports))?;
    Ok(())
}
