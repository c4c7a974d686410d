//! Summarize command - re-aggregate outcome CSVs from earlier runs

use anyhow::{Context, Result};
use std::path::PathBuf;

use sgrep_bench::config::HarnessConfig;
use sgrep_bench::metrics::summarize_by_tool;
use sgrep_bench::report::read_outcomes;

use super::bench::{emit_reports, Outputs};
use super::{failure_policy, policy_label};

/// Tools whose rank comes from the harness rather than the tool
const APPROXIMATE_RANKING: &[&str] = &["rg"];

pub struct SummarizeOptions {
    /// Each CSV is one run
    pub csv: Vec<PathBuf>,
    pub k: Option<usize>,
    pub count_failures_as_misses: bool,
    pub summary_csv: Option<PathBuf>,
    pub markdown: Option<PathBuf>,
    pub json: bool,
}

pub fn execute(config: &HarnessConfig, options: SummarizeOptions) -> Result<()> {
    let k = options.k.unwrap_or(config.bench.limit).max(1);
    let policy = failure_policy(config, options.count_failures_as_misses);

    let mut summaries = Vec::with_capacity(options.csv.len());
    let mut modes: Vec<String> = Vec::new();
    for path in &options.csv {
        let outcomes = read_outcomes(path)
            .with_context(|| format!("Failed to read outcome CSV: {}", path.display()))?;
        tracing::info!(path = %path.display(), rows = outcomes.len(), "loaded outcomes");

        for outcome in &outcomes {
            if !outcome.query_type.is_empty() && !modes.contains(&outcome.query_type) {
                modes.push(outcome.query_type.clone());
            }
        }
        summaries.push(summarize_by_tool(&outcomes, k, policy));
    }

    let mut approximate: Vec<String> = Vec::new();
    for summary in summaries.iter().flatten() {
        if APPROXIMATE_RANKING.contains(&summary.tool.as_str()) && !approximate.contains(&summary.tool) {
            approximate.push(summary.tool.clone());
        }
    }

    let query_set = options
        .csv
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ");

    emit_reports(
        &summaries,
        &approximate,
        &Outputs {
            title: "sgrep vs ripgrep (re-aggregated)".to_string(),
            repo: "n/a".to_string(),
            query_set,
            mode: if modes.is_empty() {
                "unknown".to_string()
            } else {
                modes.join("+")
            },
            k,
            runs: options.csv.len(),
            failure_policy: policy_label(policy).to_string(),
            summary_csv: options.summary_csv,
            markdown: options.markdown,
            json: options.json,
        },
    )
}
