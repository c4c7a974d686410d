//! Semantic search adapter - `sgrep search --json`

use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::{normalize_path, ranked, SearchResponse, SearchStatus, SearchTool};
use crate::process::run_with_timeout;
use crate::query_set::LineRange;

/// One hit from sgrep's JSON output
#[derive(Debug, Clone, PartialEq)]
pub struct SgrepHit {
    pub path: String,
    pub score: Option<f64>,
    pub lines: Option<LineRange>,
}

pub struct SgrepTool {
    binary: PathBuf,
    repo: PathBuf,
    timeout: Duration,
}

impl SgrepTool {
    pub fn new(binary: impl Into<PathBuf>, repo: &Path, timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            repo: repo.to_path_buf(),
            timeout,
        }
    }

    fn args(&self, query: &str, limit: usize) -> Vec<String> {
        vec![
            "search".to_string(),
            "--json".to_string(),
            "-n".to_string(),
            limit.to_string(),
            "-p".to_string(),
            self.repo.to_string_lossy().into_owned(),
            query.to_string(),
        ]
    }
}

impl SearchTool for SgrepTool {
    fn name(&self) -> &'static str {
        "sgrep"
    }

    fn search(&self, query: &str, limit: usize) -> SearchResponse {
        let output = match run_with_timeout(&self.binary, &self.args(query, limit), None, self.timeout) {
            Ok(output) => output,
            Err(e) => {
                tracing::warn!(binary = %self.binary.display(), error = %e, "sgrep failed to start");
                return SearchResponse::spawn_failure(&e);
            }
        };

        if output.timed_out {
            return SearchResponse::from_process(&output, SearchStatus::TimedOut);
        }
        if !output.success() {
            let reason = match output.exit_code() {
                Some(code) => format!("exit code {}", code),
                None => "terminated by signal".to_string(),
            };
            return SearchResponse::from_process(&output, SearchStatus::Failed { reason });
        }

        match parse_hits(&output.stdout) {
            Ok(hits) => {
                let mut response = SearchResponse::from_process(&output, SearchStatus::Completed);
                response.results = ranked(
                    hits.into_iter().map(|hit| {
                        (
                            normalize_path(Path::new(&hit.path), &self.repo),
                            hit.score,
                            hit.lines.into_iter().collect(),
                        )
                    }),
                    limit,
                );
                response
            }
            Err(e) => SearchResponse::from_process(
                &output,
                SearchStatus::Failed {
                    reason: format!("invalid JSON output: {}", e),
                },
            ),
        }
    }
}

/// Parse sgrep's `--json` output
///
/// Accepts a bare array of hits or an object with a `results` array.
/// Empty output means no results. Hits without a recognizable path are
/// dropped; any other shape is an error.
pub fn parse_hits(stdout: &str) -> Result<Vec<SgrepHit>, serde_json::Error> {
    let raw = stdout.trim();
    if raw.is_empty() {
        return Ok(Vec::new());
    }

    let data: Value = serde_json::from_str(raw)?;
    let items = match &data {
        Value::Array(items) => items.as_slice(),
        Value::Object(map) => match map.get("results") {
            Some(Value::Array(items)) => items.as_slice(),
            _ => &[],
        },
        _ => &[],
    };

    Ok(items.iter().filter_map(hit_from_value).collect())
}

fn hit_from_value(item: &Value) -> Option<SgrepHit> {
    let path = ["path", "file", "filename"]
        .iter()
        .find_map(|key| item.get(*key).and_then(Value::as_str))
        .or_else(|| item.pointer("/location/path").and_then(Value::as_str))?;

    let line_of = |key: &str| {
        item.get(key)
            .or_else(|| item.get("location").and_then(|l| l.get(key)))
            .and_then(Value::as_u64)
            .map(|n| n as u32)
    };
    let lines = match (line_of("start_line"), line_of("end_line"), line_of("line")) {
        (Some(start), Some(end), _) => Some(LineRange::new(start, end)),
        (Some(line), None, _) | (None, None, Some(line)) => Some(LineRange::single(line)),
        _ => None,
    };

    Some(SgrepHit {
        path: path.to_string(),
        score: item.get("score").and_then(Value::as_f64),
        lines,
    })
}
