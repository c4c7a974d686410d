//! Error taxonomy for the benchmark harness
//!
//! Only configuration-level problems are errors. A search tool that crashes,
//! times out, or prints garbage for one query is recorded on that query's
//! outcome (see `runner::OutcomeStatus`) and never surfaces here.

use std::path::PathBuf;

use thiserror::Error;

/// Fatal errors that stop a command before or during setup
#[derive(Debug, Error)]
pub enum BenchError {
    #[error("repository not found: {}", .0.display())]
    RepoNotFound(PathBuf),

    #[error("no indexable source files under {}", .0.display())]
    NoIndexableFiles(PathBuf),

    #[error("query set is empty: {0}")]
    EmptyQuerySet(String),

    #[error("invalid query record at {}:{line}: {message}", .path.display())]
    InvalidQueryRecord {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("invalid outcome row at {}:{line}: {message}", .path.display())]
    InvalidOutcomeRow {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("no benchmark runs to aggregate")]
    NoRuns,

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T, E = BenchError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_path() {
        let err = BenchError::RepoNotFound(PathBuf::from("/nope/repo"));
        assert_eq!(err.to_string(), "repository not found: /nope/repo");

        let err = BenchError::InvalidQueryRecord {
            path: PathBuf::from("queries.jsonl"),
            line: 7,
            message: "missing field `target_file`".to_string(),
        };
        assert!(err.to_string().starts_with("invalid query record at queries.jsonl:7"));
    }
}
