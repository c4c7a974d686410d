//! Agent tool-call benchmark
//!
//! Public interface:
//! - `AgentRunner::run()` - launch agent sessions and collect their stats
//! - `build_tasks()` - prompts for a preset/mode
//! - `parse_session()` / `find_session_file()` / `extract_thread_id()`
//!
//! Measures how many tool calls and tokens a coding agent spends answering
//! code-location questions with and without semantic search.

mod prompt;
mod session;

pub use prompt::{build_tasks, AgentTask, DEFAULT_QUERIES};
pub use session::{extract_thread_id, find_session_file, parse_session, parse_session_file, SessionStats};

use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::process::{one_line, run_with_timeout};

/// Default timeout for one agent session
pub const DEFAULT_AGENT_TIMEOUT: Duration = Duration::from_secs(900);

/// How queries are grouped into sessions and how strictly tools are dictated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum AgentPreset {
    /// One session per query, tool usage dictated
    PerQuery,
    /// One session for all queries, tool usage dictated
    Forced,
    /// One session for all queries, the agent picks its tools
    Natural,
}

impl fmt::Display for AgentPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AgentPreset::PerQuery => "per-query",
            AgentPreset::Forced => "forced",
            AgentPreset::Natural => "natural",
        })
    }
}

/// Whether the agent may use semantic search
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentMode {
    Sgrep,
    Rg,
}

impl fmt::Display for AgentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AgentMode::Sgrep => "sgrep",
            AgentMode::Rg => "rg",
        })
    }
}

/// Report label, e.g. `session_rg` or `per_query_sgrep`
pub fn report_label(preset: AgentPreset, mode: AgentMode) -> String {
    match preset {
        AgentPreset::PerQuery => format!("per_query_{}", mode),
        AgentPreset::Forced => format!("session_{}", mode),
        AgentPreset::Natural => format!("natural_{}", mode),
    }
}

/// Why one agent session produced no stats
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("failed to start {}: {source}", .binary.display())]
    Spawn {
        binary: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("agent exited with {code:?}: {stderr}")]
    Exit { code: Option<i32>, stderr: String },

    #[error("agent timed out after {0:?}")]
    TimedOut(Duration),

    #[error("no thread.started event in agent output")]
    MissingThreadId,

    #[error("session log not found for thread {0}")]
    SessionNotFound(String),

    #[error("failed to read session log {}: {source}", .path.display())]
    SessionRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Stats for one completed session
#[derive(Debug, Clone, Serialize)]
pub struct AgentRun {
    pub queries: Vec<String>,
    pub thread_id: String,
    pub session_path: PathBuf,
    #[serde(flatten)]
    pub stats: SessionStats,
    pub latency_ms: f64,
}

/// A session that failed, kept in the report
#[derive(Debug, Clone, Serialize)]
pub struct AgentFailure {
    pub queries: Vec<String>,
    pub error: String,
}

/// Per-query averages over completed sessions
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AgentSummary {
    /// Queries covered by completed sessions
    pub queries: usize,
    pub sessions: usize,
    pub failed_sessions: usize,
    pub avg_tool_calls_per_query: f64,
    pub avg_tokens_per_query: u64,
    pub avg_latency_ms_per_query: f64,
}

impl AgentSummary {
    pub fn from_runs(runs: &[AgentRun], failed_sessions: usize) -> Self {
        let queries: usize = runs.iter().map(|r| r.queries.len()).sum();
        if queries == 0 {
            return Self {
                failed_sessions,
                ..Self::default()
            };
        }
        let calls: usize = runs.iter().map(|r| r.stats.tool_calls_total).sum();
        let tokens: u64 = runs.iter().map(|r| r.stats.total_tokens).sum();
        let latency: f64 = runs.iter().map(|r| r.latency_ms).sum();

        Self {
            queries,
            sessions: runs.len(),
            failed_sessions,
            avg_tool_calls_per_query: round2(calls as f64 / queries as f64),
            avg_tokens_per_query: tokens / queries as u64,
            avg_latency_ms_per_query: round2(latency / queries as f64),
        }
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// JSON report for one preset/mode
#[derive(Debug, Clone, Serialize)]
pub struct AgentReport {
    pub repo: PathBuf,
    pub preset: AgentPreset,
    pub mode: AgentMode,
    pub generated: String,
    pub queries: Vec<String>,
    pub runs: Vec<AgentRun>,
    pub failures: Vec<AgentFailure>,
    pub summary: AgentSummary,
}

/// Launches the agent CLI and reads back its session logs
pub struct AgentRunner {
    binary: PathBuf,
    repo: PathBuf,
    sessions_dir: PathBuf,
    timeout: Duration,
}

impl AgentRunner {
    pub fn new(binary: impl Into<PathBuf>, repo: &Path, sessions_dir: &Path, timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            repo: repo.to_path_buf(),
            sessions_dir: sessions_dir.to_path_buf(),
            timeout,
        }
    }

    /// Run every task, continuing past failed sessions
    pub fn run(&self, preset: AgentPreset, mode: AgentMode, queries: &[String]) -> AgentReport {
        let mut runs = Vec::new();
        let mut failures = Vec::new();

        for task in build_tasks(preset, mode, queries) {
            match self.run_task(&task) {
                Ok(run) => {
                    tracing::info!(
                        thread_id = %run.thread_id,
                        tool_calls = run.stats.tool_calls_total,
                        tokens = run.stats.total_tokens,
                        "agent session complete"
                    );
                    runs.push(run);
                }
                Err(e) => {
                    tracing::warn!(error = %e, "agent session failed");
                    failures.push(AgentFailure {
                        queries: task.queries,
                        error: e.to_string(),
                    });
                }
            }
        }

        let summary = AgentSummary::from_runs(&runs, failures.len());
        AgentReport {
            repo: self.repo.clone(),
            preset,
            mode,
            generated: chrono::Utc::now().to_rfc3339(),
            queries: queries.to_vec(),
            runs,
            failures,
            summary,
        }
    }

    /// One agent session: exec, find its log, count tool calls
    pub fn run_task(&self, task: &AgentTask) -> Result<AgentRun, AgentError> {
        let args = vec![
            "exec".to_string(),
            "--json".to_string(),
            "-s".to_string(),
            "read-only".to_string(),
            "-C".to_string(),
            self.repo.to_string_lossy().into_owned(),
            task.prompt.clone(),
        ];

        let output = run_with_timeout(&self.binary, &args, None, self.timeout).map_err(|source| {
            AgentError::Spawn {
                binary: self.binary.clone(),
                source,
            }
        })?;
        if output.timed_out {
            return Err(AgentError::TimedOut(self.timeout));
        }
        if !output.success() {
            return Err(AgentError::Exit {
                code: output.exit_code(),
                stderr: one_line(&output.stderr, 200),
            });
        }

        let thread_id = extract_thread_id(&output.stdout).ok_or(AgentError::MissingThreadId)?;
        let session_path = find_session_file(&self.sessions_dir, &thread_id)
            .ok_or_else(|| AgentError::SessionNotFound(thread_id.clone()))?;
        let stats = parse_session_file(&session_path).map_err(|source| AgentError::SessionRead {
            path: session_path.clone(),
            source,
        })?;

        Ok(AgentRun {
            queries: task.queries.clone(),
            thread_id,
            session_path,
            stats,
            latency_ms: round2(output.elapsed_ms()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn agent_run(queries: usize, calls: usize, tokens: u64, latency_ms: f64) -> AgentRun {
        AgentRun {
            queries: (0..queries).map(|i| format!("q{}", i)).collect(),
            thread_id: "t".to_string(),
            session_path: PathBuf::from("/tmp/t.jsonl"),
            stats: SessionStats {
                tool_calls_total: calls,
                tool_calls_by_name: Default::default(),
                total_tokens: tokens,
            },
            latency_ms,
        }
    }

    #[test]
    fn test_summary_per_query_averages() {
        let runs = vec![agent_run(8, 10, 8000, 4000.0)];
        let summary = AgentSummary::from_runs(&runs, 0);

        assert_eq!(summary.queries, 8);
        assert_eq!(summary.sessions, 1);
        assert_eq!(summary.avg_tool_calls_per_query, 1.25);
        assert_eq!(summary.avg_tokens_per_query, 1000);
        assert_eq!(summary.avg_latency_ms_per_query, 500.0);
    }

    #[test]
    fn test_summary_without_runs() {
        let summary = AgentSummary::from_runs(&[], 2);
        assert_eq!(summary.queries, 0);
        assert_eq!(summary.failed_sessions, 2);
    }

    #[test]
    fn test_report_label() {
        assert_eq!(report_label(AgentPreset::Forced, AgentMode::Rg), "session_rg");
        assert_eq!(report_label(AgentPreset::PerQuery, AgentMode::Sgrep), "per_query_sgrep");
    }

    #[cfg(unix)]
    #[test]
    fn test_run_task_reads_session_log() {
        use std::fs;
        use std::os::unix::fs::PermissionsExt;
        use tempfile::TempDir;

        let temp = TempDir::new().unwrap();
        let sessions = temp.path().join("sessions/2026/02");
        fs::create_dir_all(&sessions).unwrap();
        fs::write(
            sessions.join("rollout-th-7.jsonl"),
            "{\"payload\":{\"type\":\"function_call\",\"name\":\"semantic_search\"}}\n",
        )
        .unwrap();

        let agent = temp.path().join("agent");
        fs::write(
            &agent,
            "#!/bin/sh\necho '{\"type\":\"thread.started\",\"thread_id\":\"th-7\"}'\n",
        )
        .unwrap();
        fs::set_permissions(&agent, fs::Permissions::from_mode(0o755)).unwrap();

        let runner = AgentRunner::new(
            &agent,
            temp.path(),
            &temp.path().join("sessions"),
            Duration::from_secs(10),
        );
        let report = runner.run(AgentPreset::Forced, AgentMode::Sgrep, &["where is auth".to_string()]);

        assert!(report.failures.is_empty());
        assert_eq!(report.runs.len(), 1);
        assert_eq!(report.runs[0].thread_id, "th-7");
        assert_eq!(report.runs[0].stats.tool_calls_total, 1);
        assert_eq!(report.summary.avg_tool_calls_per_query, 1.0);
    }

    #[cfg(unix)]
    #[test]
    fn test_missing_thread_id_is_failure() {
        use std::fs;
        use std::os::unix::fs::PermissionsExt;
        use tempfile::TempDir;

        let temp = TempDir::new().unwrap();
        let agent = temp.path().join("agent");
        fs::write(&agent, "#!/bin/sh\necho '{\"type\":\"turn.started\"}'\n").unwrap();
        fs::set_permissions(&agent, fs::Permissions::from_mode(0o755)).unwrap();

        let runner = AgentRunner::new(&agent, temp.path(), temp.path(), Duration::from_secs(10));
        let report = runner.run(AgentPreset::PerQuery, AgentMode::Rg, &["a".to_string(), "b".to_string()]);

        assert!(report.runs.is_empty());
        assert_eq!(report.failures.len(), 2);
        assert_eq!(report.summary.failed_sessions, 2);
    }
}
