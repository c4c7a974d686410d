//! Gold command - curated queries with several acceptable answers
//!
//! sgrep gets the natural-language question. The rg baseline gets the
//! same question broken into keywords, each searched case-insensitively,
//! files ranked by total match count.

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::time::Duration;

use sgrep_bench::config::HarnessConfig;
use sgrep_bench::query_set;
use sgrep_bench::runner::{QueryMode, RunnerConfig};
use sgrep_bench::search::{RgStrategy, RipgrepTool, SearchTool, SgrepTool};

use super::bench::{emit_reports, run_suite, Outputs, Suite};
use super::{failure_policy, policy_label, require_repo, resolve_tool};

pub struct GoldOptions {
    pub repo: PathBuf,
    /// Gold JSONL (`query` + `answers`, or the regular query record layout)
    pub gold: PathBuf,
    pub out: PathBuf,
    pub limit: Option<usize>,
    pub timeout_secs: Option<u64>,
    pub markdown: Option<PathBuf>,
    pub json: bool,
}

pub fn execute(config: &HarnessConfig, options: GoldOptions) -> Result<()> {
    let repo = require_repo(&options.repo)?;
    let queries = query_set::load(&options.gold)
        .with_context(|| format!("Failed to load gold set: {}", options.gold.display()))?;

    let limit = options.limit.unwrap_or(config.bench.limit).max(1);
    let timeout = Duration::from_secs(options.timeout_secs.unwrap_or(config.bench.timeout_secs));
    let policy = failure_policy(config, false);

    let tools: Vec<Box<dyn SearchTool>> = vec![
        Box::new(SgrepTool::new(
            resolve_tool("sgrep", &config.tools.sgrep),
            &repo,
            timeout,
        )),
        Box::new(
            RipgrepTool::new(resolve_tool("rg", &config.tools.rg), &repo, timeout)
                .with_strategy(RgStrategy::Keywords),
        ),
    ];

    if !options.json {
        println!("🥇 Gold benchmark");
        println!("   Repo: {}", repo.display());
        println!("   Queries: {} ({})", queries.len(), options.gold.display());
        println!("   K={}, timeout={}s", limit, timeout.as_secs());
        println!();
    }

    let runner = RunnerConfig {
        limit,
        mode: QueryMode::Mixed,
        match_lines: config.bench.match_lines,
    };
    let summaries = run_suite(&Suite {
        repo: &repo,
        queries: &queries,
        tools: &tools,
        runner,
        runs: 1,
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
            title: "Gold benchmark: sgrep vs ripgrep".to_string(),
            repo: repo.display().to_string(),
            query_set: options.gold.display().to_string(),
            mode: "gold (question vs keywords)".to_string(),
            k: limit,
            runs: 1,
            failure_policy: policy_label(policy).to_string(),
            summary_csv: None,
            markdown: options.markdown,
            json: options.json,
        },
    )
}
