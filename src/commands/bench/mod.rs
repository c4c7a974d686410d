//! Bench command - sgrep vs ripgrep over a query set
//!
//! Public interface:
//! - `execute()` - run the benchmark and emit reports
//!
//! The run loop and report emission live in `internal` and are shared
//! with the gold command.

mod internal;

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::time::Duration;

use sgrep_bench::config::HarnessConfig;
use sgrep_bench::query_set;
use sgrep_bench::runner::{QueryMode, RunnerConfig};
use sgrep_bench::search::{RipgrepTool, SearchTool, SgrepTool};

pub(crate) use internal::{emit_reports, run_suite, Outputs, Suite};

use super::{failure_policy, policy_label, require_repo, resolve_tool};

/// Options for benchmark execution
pub struct BenchOptions {
    pub repo: PathBuf,
    /// Query set JSONL
    pub queries: PathBuf,
    /// Outcome CSV; with several runs, run i goes to `<stem>.run<i>.csv`
    pub out: PathBuf,
    /// Override `bench.limit`
    pub limit: Option<usize>,
    pub mode: QueryMode,
    /// Override `bench.runs`
    pub runs: Option<usize>,
    /// Override `bench.timeout_secs`
    pub timeout_secs: Option<u64>,
    pub use_sgrep: bool,
    pub use_rg: bool,
    pub match_lines: bool,
    pub count_failures_as_misses: bool,
    pub summary_csv: Option<PathBuf>,
    pub markdown: Option<PathBuf>,
    pub json: bool,
}

/// Execute the sgrep vs ripgrep benchmark
pub fn execute(config: &HarnessConfig, options: BenchOptions) -> Result<()> {
    if !options.use_sgrep && !options.use_rg {
        anyhow::bail!("--tools must name at least one of: sgrep, rg");
    }

    let repo = require_repo(&options.repo)?;
    let queries = query_set::load(&options.queries)
        .with_context(|| format!("Failed to load query set: {}", options.queries.display()))?;

    let limit = options.limit.unwrap_or(config.bench.limit).max(1);
    let runs = options.runs.unwrap_or(config.bench.runs).max(1);
    let timeout = Duration::from_secs(options.timeout_secs.unwrap_or(config.bench.timeout_secs));
    let policy = failure_policy(config, options.count_failures_as_misses);

    let mut tools: Vec<Box<dyn SearchTool>> = Vec::new();
    if options.use_sgrep {
        let binary = resolve_tool("sgrep", &config.tools.sgrep);
        tools.push(Box::new(SgrepTool::new(binary, &repo, timeout)));
    }
    if options.use_rg {
        let binary = resolve_tool("rg", &config.tools.rg);
        tools.push(Box::new(RipgrepTool::new(binary, &repo, timeout)));
    }

    let runner = RunnerConfig {
        limit,
        mode: options.mode,
        match_lines: options.match_lines || config.bench.match_lines,
    };

    if !options.json {
        println!("🔬 sgrep vs ripgrep benchmark");
        println!("   Repo: {}", repo.display());
        println!(
            "   Queries: {} ({})",
            queries.len(),
            options.queries.display()
        );
        println!(
            "   Mode: {}, K={}, runs={}, timeout={}s",
            options.mode,
            limit,
            runs,
            timeout.as_secs()
        );
        println!();
    }

    let summaries = run_suite(&Suite {
        repo: &repo,
        queries: &queries,
        tools: &tools,
        runner,
        runs,
        out: &options.out,
        policy,
        quiet: options.json,
    })?;

    let approximate: Vec<String> = tools
        .iter()
        .filter(|t| t.ranking_is_approximate())
        .map(|t| t.name().to_string())
        .collect();

    emit_reports(
        &summaries,
        &approximate,
        &Outputs {
            title: "sgrep vs ripgrep".to_string(),
            repo: repo.display().to_string(),
            query_set: options.queries.display().to_string(),
            mode: options.mode.to_string(),
            k: limit,
            runs,
            failure_policy: policy_label(policy).to_string(),
            summary_csv: options.summary_csv,
            markdown: options.markdown,
            json: options.json,
        },
    )
}
