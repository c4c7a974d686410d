//! Benchmark runner - query set in, per-query outcomes out
//!
//! Queries run one at a time. Each (query, tool) outcome is handed to the
//! sink as soon as it exists, so an interrupted run leaves valid partial
//! output behind.

use std::borrow::Cow;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::Result;
use crate::query_set::{comment_question, QueryRecord, QuerySource, Target};
use crate::search::{normalize_path, SearchResponse, SearchResult, SearchStatus, SearchTool};

/// Which text of a query record is searched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryMode {
    /// The bare symbol; records without one are skipped
    Keyword,
    /// Comment-derived text only; records without comment text are skipped
    Semantic,
    /// Comment-derived text when present, else identifier-derived text
    Mixed,
}

impl QueryMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryMode::Keyword => "keyword",
            QueryMode::Semantic => "semantic",
            QueryMode::Mixed => "mixed",
        }
    }
}

impl fmt::Display for QueryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome status as written to the CSV `status` column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeStatus {
    Ok,
    Failed,
    Timeout,
}

impl OutcomeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutcomeStatus::Ok => "ok",
            OutcomeStatus::Failed => "failed",
            OutcomeStatus::Timeout => "timeout",
        }
    }

    pub fn is_failure(&self) -> bool {
        *self != OutcomeStatus::Ok
    }
}

impl From<&SearchStatus> for OutcomeStatus {
    fn from(status: &SearchStatus) -> Self {
        match status {
            SearchStatus::Completed => OutcomeStatus::Ok,
            SearchStatus::Failed { .. } => OutcomeStatus::Failed,
            SearchStatus::TimedOut => OutcomeStatus::Timeout,
        }
    }
}

impl FromStr for OutcomeStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim() {
            "ok" => Ok(OutcomeStatus::Ok),
            "failed" => Ok(OutcomeStatus::Failed),
            "timeout" => Ok(OutcomeStatus::Timeout),
            other => Err(format!("unknown status '{}'", other)),
        }
    }
}

/// Result of one query against one tool
#[derive(Debug, Clone)]
pub struct QueryOutcome {
    pub id: String,
    pub tool: String,
    /// `keyword` or `semantic`: the kind of text that was searched
    pub query_type: String,
    pub query: String,
    pub target_file: PathBuf,
    /// Ranked results, capped at the runner limit
    pub results: Vec<SearchResult>,
    pub latency_ms: f64,
    /// First rank whose file matches a target; `None` is a miss
    pub hit_rank: Option<usize>,
    pub status: OutcomeStatus,
    pub exit_code: Option<i32>,
    pub stderr: String,
}

impl QueryOutcome {
    pub fn reciprocal_rank(&self) -> f64 {
        crate::metrics::reciprocal_rank(self.hit_rank)
    }
}

/// Receives outcomes as they complete
pub trait OutcomeSink {
    fn record(&mut self, outcome: &QueryOutcome) -> io::Result<()>;
}

impl OutcomeSink for Vec<QueryOutcome> {
    fn record(&mut self, outcome: &QueryOutcome) -> io::Result<()> {
        self.push(outcome.clone());
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Results evaluated per query (K)
    pub limit: usize,
    pub mode: QueryMode,
    /// Require a result's matched lines to overlap the target line range
    pub match_lines: bool,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            limit: 10,
            mode: QueryMode::Mixed,
            match_lines: false,
        }
    }
}

/// Everything one pass over a query set produced
#[derive(Debug, Clone, Default)]
pub struct RunOutput {
    pub outcomes: Vec<QueryOutcome>,
    /// Records with no usable text for the mode
    pub skipped: usize,
}

pub struct BenchmarkRunner<'a> {
    tools: &'a [Box<dyn SearchTool>],
    repo: PathBuf,
    config: RunnerConfig,
}

impl<'a> BenchmarkRunner<'a> {
    pub fn new(tools: &'a [Box<dyn SearchTool>], repo: &Path, config: RunnerConfig) -> Self {
        Self {
            tools,
            repo: repo.to_path_buf(),
            config,
        }
    }

    /// Run every query against every tool, streaming outcomes to `sink`
    ///
    /// Tool failures are recorded on the outcome; only a sink write error
    /// aborts the run.
    pub fn run(&self, queries: &[QueryRecord], sink: &mut dyn OutcomeSink) -> Result<RunOutput> {
        let mut output = RunOutput::default();

        for record in queries {
            let Some((query, query_type)) = query_for_mode(record, self.config.mode) else {
                output.skipped += 1;
                continue;
            };

            let targets: Vec<Target> = record
                .targets()
                .into_iter()
                .map(|t| Target {
                    path: normalize_path(&t.path, &self.repo),
                    line_range: t.line_range,
                })
                .collect();

            for tool in self.tools {
                let response = tool.search(&query, self.config.limit);
                let outcome = self.outcome(record, tool.name(), &query, query_type, &targets, response);

                if outcome.status.is_failure() {
                    tracing::warn!(
                        id = %outcome.id,
                        tool = %outcome.tool,
                        status = outcome.status.as_str(),
                        "query failed"
                    );
                } else {
                    tracing::debug!(
                        id = %outcome.id,
                        tool = %outcome.tool,
                        hit_rank = ?outcome.hit_rank,
                        latency_ms = outcome.latency_ms,
                        "query complete"
                    );
                }

                sink.record(&outcome)?;
                output.outcomes.push(outcome);
            }
        }

        if output.skipped > 0 {
            tracing::info!(
                skipped = output.skipped,
                mode = %self.config.mode,
                "records without text for this mode were skipped"
            );
        }
        Ok(output)
    }

    fn outcome(
        &self,
        record: &QueryRecord,
        tool: &str,
        query: &str,
        query_type: &str,
        targets: &[Target],
        response: SearchResponse,
    ) -> QueryOutcome {
        let status = OutcomeStatus::from(&response.status);
        let latency_ms = response.latency_ms();
        let mut results = response.results;
        results.truncate(self.config.limit);

        let hit_rank = if status.is_failure() {
            None
        } else {
            hit_rank(&results, targets, self.config.match_lines)
        };

        let stderr = match &response.status {
            SearchStatus::Failed { reason } if response.stderr.trim().is_empty() => reason.clone(),
            _ => response.stderr.clone(),
        };

        QueryOutcome {
            id: record.id.clone(),
            tool: tool.to_string(),
            query_type: query_type.to_string(),
            query: query.to_string(),
            target_file: targets
                .first()
                .map(|t| t.path.clone())
                .unwrap_or_else(|| record.target_file.clone()),
            results,
            latency_ms,
            hit_rank,
            status,
            exit_code: response.exit_code,
            stderr,
        }
    }
}

/// Text to search and its query type, or `None` when the record is skipped
///
/// Semantic mode searches only comment-derived text. Mixed mode prefers it
/// and falls back to `query_text`.
pub fn query_for_mode(record: &QueryRecord, mode: QueryMode) -> Option<(Cow<'_, str>, &'static str)> {
    match mode {
        QueryMode::Keyword => record
            .keyword
            .as_deref()
            .map(|k| (Cow::Borrowed(k), "keyword")),
        QueryMode::Semantic => comment_query(record).map(|q| (q, "semantic")),
        QueryMode::Mixed => comment_query(record)
            .map(|q| (q, "semantic"))
            .or_else(|| {
                let query_type = if record.has_natural_text() {
                    "semantic"
                } else {
                    "keyword"
                };
                Some((Cow::Borrowed(record.query_text.as_str()), query_type))
            }),
    }
}

/// Comment-derived search text, reusing `query_text` when it already is one
fn comment_query(record: &QueryRecord) -> Option<Cow<'_, str>> {
    let comment = record.comment_text.as_deref()?;
    if record.source == QuerySource::Comment || record.query_text == comment {
        return Some(Cow::Borrowed(record.query_text.as_str()));
    }
    let question = comment_question(comment);
    if question == record.query_text {
        Some(Cow::Borrowed(record.query_text.as_str()))
    } else {
        Some(Cow::Owned(question))
    }
}

/// First 1-based rank whose file is one of the targets
///
/// With `match_lines`, a result that reports line spans must overlap the
/// target's range; results without line data match on file alone.
pub fn hit_rank(results: &[SearchResult], targets: &[Target], match_lines: bool) -> Option<usize> {
    results
        .iter()
        .find(|result| {
            targets.iter().any(|target| {
                if result.file_path != target.path {
                    return false;
                }
                match (match_lines, target.line_range) {
                    (true, Some(range)) if !result.lines.is_empty() => {
                        result.lines.iter().any(|l| l.overlaps(&range))
                    }
                    _ => true,
                }
            })
        })
        .map(|result| result.rank)
}
