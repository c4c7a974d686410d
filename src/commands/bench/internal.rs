//! Internal implementation for bench command
//!
//! Metrics: Hit@K, MRR, latency p50/p95/mean, median over runs

use anyhow::{Context, Result};
use chrono::Utc;
use colored::Colorize;
use serde::Serialize;
use std::io;
use std::path::{Path, PathBuf};

use sgrep_bench::config::FailurePolicy;
use sgrep_bench::metrics::{aggregate_by_tool, summarize_by_tool, BenchmarkReport, RunSummary};
use sgrep_bench::paths;
use sgrep_bench::query_set::QueryRecord;
use sgrep_bench::report::{self, CsvSink, ReportContext};
use sgrep_bench::runner::{
    query_for_mode, BenchmarkRunner, OutcomeSink, QueryOutcome, RunnerConfig,
};
use sgrep_bench::search::SearchTool;

/// One benchmark invocation: every run over every tool
pub(crate) struct Suite<'a> {
    pub repo: &'a Path,
    pub queries: &'a [QueryRecord],
    pub tools: &'a [Box<dyn SearchTool>],
    pub runner: RunnerConfig,
    pub runs: usize,
    pub out: &'a Path,
    pub policy: FailurePolicy,
    /// Suppress per-query progress (JSON output)
    pub quiet: bool,
}

/// Where and how to emit the aggregate report
pub(crate) struct Outputs {
    pub title: String,
    pub repo: String,
    pub query_set: String,
    pub mode: String,
    pub k: usize,
    pub runs: usize,
    pub failure_policy: String,
    pub summary_csv: Option<PathBuf>,
    pub markdown: Option<PathBuf>,
    pub json: bool,
}

/// Streams outcomes to the CSV and prints one progress line each
struct ProgressSink<S> {
    inner: S,
    run: usize,
    runs: usize,
    total: usize,
    done: usize,
    quiet: bool,
}

impl<S: OutcomeSink> OutcomeSink for ProgressSink<S> {
    fn record(&mut self, outcome: &QueryOutcome) -> io::Result<()> {
        self.inner.record(outcome)?;
        self.done += 1;
        if !self.quiet {
            println!("{}", self.progress_line(outcome));
        }
        Ok(())
    }
}

impl<S> ProgressSink<S> {
    fn progress_line(&self, outcome: &QueryOutcome) -> String {
        let run = if self.runs > 1 {
            format!("run {}/{} ", self.run, self.runs)
        } else {
            String::new()
        };
        let result = if outcome.status.is_failure() {
            outcome.status.as_str().yellow().to_string()
        } else {
            match outcome.hit_rank {
                Some(rank) => format!("hit @{}", rank).green().to_string(),
                None => "miss".to_string(),
            }
        };
        format!(
            "   {}[{}/{}] {} {:<6} {:>7.0}ms  {}",
            run, self.done, self.total, outcome.id, outcome.tool, outcome.latency_ms, result
        )
    }
}

/// Outcomes one pass will produce; records skipped by the mode don't count
fn expected_outcomes(queries: &[QueryRecord], runner: &RunnerConfig, tools: usize) -> usize {
    queries
        .iter()
        .filter(|record| query_for_mode(record, runner.mode).is_some())
        .count()
        * tools
}

/// Run the suite `runs` times; returns per-run summaries
pub(crate) fn run_suite(suite: &Suite) -> Result<Vec<Vec<RunSummary>>> {
    let runner = BenchmarkRunner::new(suite.tools, suite.repo, suite.runner.clone());
    let mut summaries = Vec::with_capacity(suite.runs);

    for run in 1..=suite.runs {
        let csv_path = if suite.runs > 1 {
            paths::run_csv_path(suite.out, run)
        } else {
            suite.out.to_path_buf()
        };
        let csv = CsvSink::create(&csv_path)
            .with_context(|| format!("Failed to create outcome CSV: {}", csv_path.display()))?;

        let mut sink = ProgressSink {
            inner: csv,
            run,
            runs: suite.runs,
            total: expected_outcomes(suite.queries, &suite.runner, suite.tools.len()),
            done: 0,
            quiet: suite.quiet,
        };

        tracing::info!(run, runs = suite.runs, csv = %csv_path.display(), "starting run");
        let output = runner
            .run(suite.queries, &mut sink)
            .with_context(|| format!("Benchmark run {} failed", run))?;

        if output.skipped > 0 {
            tracing::warn!(
                skipped = output.skipped,
                mode = %suite.runner.mode,
                "query records without text for this mode were skipped"
            );
        }
        if output.outcomes.is_empty() {
            anyhow::bail!(
                "No queries usable in {} mode ({} skipped)",
                suite.runner.mode,
                output.skipped
            );
        }
        if !suite.quiet {
            println!("   Wrote {} rows to {}", output.outcomes.len(), csv_path.display());
        }

        summaries.push(summarize_by_tool(&output.outcomes, suite.runner.limit, suite.policy));
    }

    Ok(summaries)
}

#[derive(Serialize)]
struct JsonReport<'a> {
    title: &'a str,
    repo: &'a str,
    query_set: &'a str,
    mode: &'a str,
    k: usize,
    runs: usize,
    failure_policy: &'a str,
    generated: String,
    reports: &'a [BenchmarkReport],
    approximate_ranking: &'a [String],
    per_run: &'a [Vec<RunSummary>],
}

/// Aggregate per-run summaries and write every requested output
pub(crate) fn emit_reports(
    summaries: &[Vec<RunSummary>],
    approximate: &[String],
    outputs: &Outputs,
) -> Result<()> {
    let reports = aggregate_by_tool(summaries).context("Failed to aggregate runs")?;
    let context = ReportContext {
        title: outputs.title.clone(),
        repo: outputs.repo.clone(),
        query_set: outputs.query_set.clone(),
        mode: outputs.mode.clone(),
        k: outputs.k,
        runs: outputs.runs,
        failure_policy: outputs.failure_policy.clone(),
        generated: Utc::now(),
    };

    if let Some(path) = &outputs.summary_csv {
        report::write_summary_csv(path, &reports)
            .with_context(|| format!("Failed to write summary CSV: {}", path.display()))?;
    }
    if let Some(path) = &outputs.markdown {
        report::write_markdown(path, &context, &reports, approximate)
            .with_context(|| format!("Failed to write Markdown report: {}", path.display()))?;
    }

    if outputs.json {
        let json = JsonReport {
            title: &context.title,
            repo: &context.repo,
            query_set: &context.query_set,
            mode: &context.mode,
            k: context.k,
            runs: context.runs,
            failure_policy: &context.failure_policy,
            generated: context.generated.to_rfc3339(),
            reports: &reports,
            approximate_ranking: approximate,
            per_run: summaries,
        };
        println!("{}", serde_json::to_string_pretty(&json)?);
        return Ok(());
    }

    report::print_summary(&context, &reports, approximate);
    if let Some(path) = &outputs.summary_csv {
        println!("   Summary CSV: {}", path.display());
    }
    if let Some(path) = &outputs.markdown {
        println!("   Report: {}", path.display());
    }

    Ok(())
}
