//! Agent command - tool calls and tokens with and without semantic search

use anyhow::{Context, Result};
use colored::Colorize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use sgrep_bench::agent::{report_label, AgentMode, AgentPreset, AgentRunner, DEFAULT_AGENT_TIMEOUT, DEFAULT_QUERIES};
use sgrep_bench::config::{expand_tool_path, HarnessConfig};
use sgrep_bench::paths;

use super::{require_repo, resolve_tool};

pub struct AgentOptions {
    pub repo: PathBuf,
    pub preset: AgentPreset,
    pub mode: AgentMode,
    /// One query per line; `#` lines and blanks are ignored
    pub queries_file: Option<PathBuf>,
    /// Default: `reports/codex_toolcall_<label>.json`
    pub out: Option<PathBuf>,
}

pub fn execute(config: &HarnessConfig, options: AgentOptions) -> Result<()> {
    let repo = require_repo(&options.repo)?;
    let queries = match &options.queries_file {
        Some(path) => load_queries(path)?,
        None => DEFAULT_QUERIES.iter().map(|q| q.to_string()).collect(),
    };
    if queries.is_empty() {
        anyhow::bail!("No queries to run");
    }

    let binary = resolve_tool("codex", &config.tools.codex);
    let sessions_dir = config
        .agent
        .sessions_dir
        .as_deref()
        .map(expand_tool_path)
        .unwrap_or_else(paths::agent_sessions_dir);
    let timeout = config
        .agent
        .timeout_secs
        .map(Duration::from_secs)
        .unwrap_or(DEFAULT_AGENT_TIMEOUT);

    let label = report_label(options.preset, options.mode);
    let out = match options.out {
        Some(path) => path,
        None => paths::agent_report_path(Path::new("."), &label),
    };

    println!("🤖 Agent tool-call benchmark ({})", label);
    println!("   Repo: {}", repo.display());
    println!("   Queries: {}", queries.len());
    println!("   Sessions: {}", sessions_dir.display());
    println!();

    let runner = AgentRunner::new(binary, &repo, &sessions_dir, timeout);
    let report = runner.run(options.preset, options.mode, &queries);

    if let Some(parent) = out.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
    }
    let json = serde_json::to_string_pretty(&report)?;
    fs::write(&out, json).with_context(|| format!("Failed to write agent report: {}", out.display()))?;

    let summary = &report.summary;
    println!("📊 {}", "Summary".bold());
    println!("   ├─ Sessions:          {} ok, {} failed", summary.sessions, summary.failed_sessions);
    println!("   ├─ Tool calls/query:  {:.2}", summary.avg_tool_calls_per_query);
    println!("   ├─ Tokens/query:      {}", summary.avg_tokens_per_query);
    println!("   └─ Latency/query:     {:.0}ms", summary.avg_latency_ms_per_query);
    for failure in &report.failures {
        println!("   {} {}", "✗".red(), failure.error);
    }
    println!();
    println!("{} Report written to {}", "✓".green(), out.display());

    Ok(())
}

fn load_queries(path: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read queries file: {}", path.display()))?;
    Ok(parse_queries(&content))
}

fn parse_queries(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}
