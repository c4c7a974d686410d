//! Search adapters - one capability interface over external search tools
//!
//! Each tool maps a query string to a ranked result list plus the
//! wall-clock latency of the call. The runner and metrics only see
//! `SearchTool`, so adding a third tool never touches them.

mod ripgrep;
mod sgrep;

pub use ripgrep::{keywordize, rank_by_match_count, RgStrategy, RipgrepTool};
pub use sgrep::{parse_hits, SgrepHit, SgrepTool};

use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::process::ProcessOutput;
use crate::query_set::LineRange;

/// One ranked hit, rank order preserved from the tool
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    /// 1-based rank
    pub rank: usize,
    pub file_path: PathBuf,
    pub score: Option<f64>,
    /// Matched line spans within the file, when the tool reports them
    pub lines: Vec<LineRange>,
}

/// How a single tool invocation ended
#[derive(Debug, Clone, PartialEq)]
pub enum SearchStatus {
    /// Tool answered; zero results is a legitimate answer
    Completed,
    /// Spawn failure, unexpected exit code, or unparseable output
    Failed { reason: String },
    /// Killed after the per-call timeout
    TimedOut,
}

impl SearchStatus {
    pub fn is_failure(&self) -> bool {
        !matches!(self, SearchStatus::Completed)
    }
}

/// Full response for one query against one tool
#[derive(Debug, Clone)]
pub struct SearchResponse {
    pub results: Vec<SearchResult>,
    pub latency: Duration,
    pub status: SearchStatus,
    pub exit_code: Option<i32>,
    pub stderr: String,
}

impl SearchResponse {
    pub fn latency_ms(&self) -> f64 {
        self.latency.as_secs_f64() * 1000.0
    }

    /// Response for a tool that could not be started at all
    pub fn spawn_failure(err: &io::Error) -> Self {
        Self {
            results: Vec::new(),
            latency: Duration::ZERO,
            status: SearchStatus::Failed {
                reason: format!("failed to start: {}", err),
            },
            exit_code: None,
            stderr: err.to_string(),
        }
    }

    /// Empty response carrying the process outcome; results are filled by the caller
    fn from_process(output: &ProcessOutput, status: SearchStatus) -> Self {
        Self {
            results: Vec::new(),
            latency: output.elapsed,
            status,
            exit_code: output.exit_code(),
            stderr: output.stderr.clone(),
        }
    }
}

/// Search tool interface - each external engine implements this
pub trait SearchTool: Send + Sync {
    /// Tool name written to outcome rows and reports
    fn name(&self) -> &'static str;

    /// Run one query, returning at most `limit` ranked results
    ///
    /// Never fails: process and parse problems are reported through
    /// `SearchResponse::status`.
    fn search(&self, query: &str, limit: usize) -> SearchResponse;

    /// Whether the ranking is derived by the harness rather than the tool
    fn ranking_is_approximate(&self) -> bool {
        false
    }
}

/// Resolve a tool-reported path against the repo root
///
/// Relative paths are joined to `repo`; existing files are canonicalized so
/// they compare equal to canonicalized targets.
pub fn normalize_path(path: &Path, repo: &Path) -> PathBuf {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        repo.join(path)
    };
    joined.canonicalize().unwrap_or(joined)
}

/// Turn `(path, score, lines)` tuples into ranked results capped at `limit`
fn ranked(
    items: impl IntoIterator<Item = (PathBuf, Option<f64>, Vec<LineRange>)>,
    limit: usize,
) -> Vec<SearchResult> {
    items
        .into_iter()
        .take(limit)
        .enumerate()
        .map(|(i, (file_path, score, lines))| SearchResult {
            rank: i + 1,
            file_path,
            score,
            lines,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_normalize_relative_path() {
        let temp = TempDir::new().unwrap();
        let repo = temp.path().canonicalize().unwrap();
        std::fs::create_dir_all(repo.join("src")).unwrap();
        std::fs::write(repo.join("src/lib.rs"), "").unwrap();

        assert_eq!(
            normalize_path(Path::new("./src/lib.rs"), &repo),
            repo.join("src/lib.rs")
        );
        assert_eq!(
            normalize_path(&repo.join("src/lib.rs"), Path::new("/elsewhere")),
            repo.join("src/lib.rs")
        );
    }

    #[test]
    fn test_normalize_missing_path_falls_back() {
        let path = normalize_path(Path::new("gone.rs"), Path::new("/no/such/repo"));
        assert_eq!(path, PathBuf::from("/no/such/repo/gone.rs"));
    }

    #[test]
    fn test_ranked_caps_and_numbers() {
        let items = (0..5).map(|i| (PathBuf::from(format!("f{}", i)), None, Vec::new()));
        let results = ranked(items, 3);
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].rank, 1);
        assert_eq!(results[2].file_path, PathBuf::from("f2"));
    }

    #[test]
    fn test_spawn_failure_is_failed() {
        let err = io::Error::new(io::ErrorKind::NotFound, "no such file");
        let response = SearchResponse::spawn_failure(&err);
        assert!(response.status.is_failure());
        assert!(response.results.is_empty());
    }
}
