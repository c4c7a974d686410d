//! Metrics aggregation - Hit@K, MRR, latency percentiles
//!
//! A `RunSummary` covers one tool over one pass of the query set. A
//! `BenchmarkReport` is the per-metric median over repeated passes.
//! Everything here is a pure function of its inputs.

use serde::Serialize;

use crate::config::FailurePolicy;
use crate::error::{BenchError, Result};
use crate::runner::QueryOutcome;

/// `1/rank` for a hit, `0` for a miss
pub fn reciprocal_rank(hit_rank: Option<usize>) -> f64 {
    match hit_rank {
        Some(rank) if rank >= 1 => 1.0 / rank as f64,
        _ => 0.0,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LatencyStats {
    pub p50_ms: f64,
    pub p95_ms: f64,
    pub mean_ms: f64,
}

impl LatencyStats {
    /// `None` when there are no samples ("no data")
    pub fn from_samples(samples: &[f64]) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }
        let mut sorted = samples.to_vec();
        sorted.sort_by(f64::total_cmp);

        Some(Self {
            p50_ms: median_sorted(&sorted),
            p95_ms: percentile(&sorted, 95.0),
            mean_ms: sorted.iter().sum::<f64>() / sorted.len() as f64,
        })
    }
}

/// Metrics for one tool over one run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub tool: String,
    /// Outcomes seen, including failures
    pub queries: usize,
    /// Outcomes in the Hit@K / MRR denominator
    pub evaluated: usize,
    pub failures: usize,
    pub k: usize,
    pub hit_at_k: f64,
    pub mrr: f64,
    pub latency: Option<LatencyStats>,
}

/// Summarize one tool's outcomes
///
/// Ranks beyond `k` count as misses. Under `FailurePolicy::Exclude`,
/// failed and timed-out outcomes leave every denominator and the latency
/// samples.
pub fn summarize<'a>(
    tool: &str,
    outcomes: impl IntoIterator<Item = &'a QueryOutcome>,
    k: usize,
    policy: FailurePolicy,
) -> RunSummary {
    let mut queries = 0;
    let mut failures = 0;
    let mut hits = 0;
    let mut rr_sum = 0.0;
    let mut latencies = Vec::new();

    for outcome in outcomes {
        queries += 1;
        let failed = outcome.status.is_failure();
        if failed {
            failures += 1;
            if policy == FailurePolicy::Exclude {
                continue;
            }
        }

        let rank = outcome.hit_rank.filter(|r| *r <= k && !failed);
        if rank.is_some() {
            hits += 1;
        }
        rr_sum += reciprocal_rank(rank);
        latencies.push(outcome.latency_ms);
    }

    let evaluated = latencies.len();
    let (hit_at_k, mrr) = if evaluated == 0 {
        (0.0, 0.0)
    } else {
        (hits as f64 / evaluated as f64, rr_sum / evaluated as f64)
    };

    RunSummary {
        tool: tool.to_string(),
        queries,
        evaluated,
        failures,
        k,
        hit_at_k,
        mrr,
        latency: LatencyStats::from_samples(&latencies),
    }
}

/// One summary per tool, in order of first appearance
pub fn summarize_by_tool(outcomes: &[QueryOutcome], k: usize, policy: FailurePolicy) -> Vec<RunSummary> {
    let mut tools: Vec<&str> = Vec::new();
    for outcome in outcomes {
        if !tools.contains(&outcome.tool.as_str()) {
            tools.push(&outcome.tool);
        }
    }

    tools
        .into_iter()
        .map(|tool| summarize(tool, outcomes.iter().filter(|o| o.tool == tool), k, policy))
        .collect()
}

/// Median across repeated runs of one tool
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BenchmarkReport {
    pub tool: String,
    pub runs: usize,
    /// Median outcome count per run
    pub queries: usize,
    /// Failures summed over all runs
    pub failures: usize,
    pub k: usize,
    pub hit_at_k: f64,
    pub mrr: f64,
    /// Latency medians over the runs that had latency data
    pub latency_p50_ms: Option<f64>,
    pub latency_p95_ms: Option<f64>,
    pub latency_mean_ms: Option<f64>,
}

/// Per-metric median over runs of the same tool
pub fn aggregate_runs(runs: &[RunSummary]) -> Result<BenchmarkReport> {
    let first = runs.first().ok_or(BenchError::NoRuns)?;

    let pick = |f: fn(&RunSummary) -> f64| -> Vec<f64> { runs.iter().map(f).collect() };
    let latency = |f: fn(&LatencyStats) -> f64| -> Option<f64> {
        let values: Vec<f64> = runs.iter().filter_map(|r| r.latency.as_ref().map(f)).collect();
        median(&values)
    };

    Ok(BenchmarkReport {
        tool: first.tool.clone(),
        runs: runs.len(),
        queries: median(&pick(|r| r.queries as f64)).unwrap_or(0.0).round() as usize,
        failures: runs.iter().map(|r| r.failures).sum(),
        k: first.k,
        hit_at_k: median(&pick(|r| r.hit_at_k)).unwrap_or(0.0),
        mrr: median(&pick(|r| r.mrr)).unwrap_or(0.0),
        latency_p50_ms: latency(|l| l.p50_ms),
        latency_p95_ms: latency(|l| l.p95_ms),
        latency_mean_ms: latency(|l| l.mean_ms),
    })
}

/// Group per-run summaries by tool and aggregate each group
///
/// Tool order follows the first run.
pub fn aggregate_by_tool(runs: &[Vec<RunSummary>]) -> Result<Vec<BenchmarkReport>> {
    if runs.is_empty() {
        return Err(BenchError::NoRuns);
    }

    let mut tools: Vec<&str> = Vec::new();
    for summary in runs.iter().flatten() {
        if !tools.contains(&summary.tool.as_str()) {
            tools.push(&summary.tool);
        }
    }

    tools
        .into_iter()
        .map(|tool| {
            let group: Vec<RunSummary> = runs
                .iter()
                .flatten()
                .filter(|s| s.tool == tool)
                .cloned()
                .collect();
            aggregate_runs(&group)
        })
        .collect()
}

/// Median of unsorted values; mean of the two middle values for even counts
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    Some(median_sorted(&sorted))
}

fn median_sorted(sorted: &[f64]) -> f64 {
    let n = sorted.len();
    if n % 2 == 1 {
        sorted[n / 2]
    } else {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    }
}

/// Nearest-rank percentile over sorted samples
fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let idx = ((sorted.len() as f64 - 1.0) * p / 100.0).round() as usize;
    sorted[idx.min(sorted.len() - 1)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::OutcomeStatus;
    use approx::assert_relative_eq;
    use std::path::PathBuf;

    fn outcome(tool: &str, hit_rank: Option<usize>, latency_ms: f64, status: OutcomeStatus) -> QueryOutcome {
        QueryOutcome {
            id: "q".to_string(),
            tool: tool.to_string(),
            query_type: "semantic".to_string(),
            query: "where".to_string(),
            target_file: PathBuf::from("/repo/a.rs"),
            results: Vec::new(),
            latency_ms,
            hit_rank,
            status,
            exit_code: Some(0),
            stderr: String::new(),
        }
    }

    fn run(tool: &str, hit_at_k: f64, p50: Option<f64>) -> RunSummary {
        RunSummary {
            tool: tool.to_string(),
            queries: 10,
            evaluated: 10,
            failures: 0,
            k: 10,
            hit_at_k,
            mrr: hit_at_k / 2.0,
            latency: p50.map(|p| LatencyStats {
                p50_ms: p,
                p95_ms: p * 2.0,
                mean_ms: p,
            }),
        }
    }

    #[test]
    fn test_rank_three_contributes_one_third() {
        let outcomes = vec![outcome("sgrep", Some(3), 10.0, OutcomeStatus::Ok)];
        let summary = summarize("sgrep", &outcomes, 10, FailurePolicy::Exclude);

        assert_relative_eq!(summary.mrr, 1.0 / 3.0);
        assert_relative_eq!(summary.hit_at_k, 1.0);
    }

    #[test]
    fn test_miss_counts_in_denominator() {
        let outcomes = vec![
            outcome("rg", Some(1), 5.0, OutcomeStatus::Ok),
            outcome("rg", None, 5.0, OutcomeStatus::Ok),
        ];
        let summary = summarize("rg", &outcomes, 10, FailurePolicy::Exclude);

        assert_eq!(summary.evaluated, 2);
        assert_relative_eq!(summary.hit_at_k, 0.5);
        assert_relative_eq!(summary.mrr, 0.5);
    }

    #[test]
    fn test_rank_beyond_k_is_miss() {
        let outcomes = vec![outcome("rg", Some(7), 5.0, OutcomeStatus::Ok)];
        let summary = summarize("rg", &outcomes, 5, FailurePolicy::Exclude);
        assert_eq!(summary.hit_at_k, 0.0);
        assert_eq!(summary.mrr, 0.0);
    }

    #[test]
    fn test_timeout_excluded_from_denominator() {
        let outcomes = vec![
            outcome("sgrep", Some(1), 20.0, OutcomeStatus::Ok),
            outcome("sgrep", None, 60_000.0, OutcomeStatus::Timeout),
        ];

        let excluded = summarize("sgrep", &outcomes, 10, FailurePolicy::Exclude);
        assert_eq!(excluded.failures, 1);
        assert_eq!(excluded.evaluated, 1);
        assert_relative_eq!(excluded.hit_at_k, 1.0);
        assert_relative_eq!(excluded.latency.unwrap().p95_ms, 20.0);

        let counted = summarize("sgrep", &outcomes, 10, FailurePolicy::CountAsMiss);
        assert_eq!(counted.evaluated, 2);
        assert_relative_eq!(counted.hit_at_k, 0.5);
    }

    #[test]
    fn test_empty_outcomes_have_no_latency_data() {
        let summary = summarize("sgrep", &[], 10, FailurePolicy::Exclude);
        assert_eq!(summary.hit_at_k, 0.0);
        assert_eq!(summary.mrr, 0.0);
        assert!(summary.latency.is_none());
    }

    #[test]
    fn test_all_failed_have_no_latency_data() {
        let outcomes = vec![outcome("rg", None, 3.0, OutcomeStatus::Failed)];
        let summary = summarize("rg", &outcomes, 10, FailurePolicy::Exclude);
        assert_eq!(summary.queries, 1);
        assert!(summary.latency.is_none());
    }

    #[test]
    fn test_latency_percentiles() {
        let samples: Vec<f64> = (1..=20).map(|i| i as f64).collect();
        let stats = LatencyStats::from_samples(&samples).unwrap();

        assert_relative_eq!(stats.p50_ms, 10.5);
        assert_relative_eq!(stats.p95_ms, 19.0);
        assert_relative_eq!(stats.mean_ms, 10.5);
    }

    #[test]
    fn test_median_of_three_runs() {
        let runs = vec![
            run("sgrep", 0.36, Some(40.0)),
            run("sgrep", 0.40, Some(44.0)),
            run("sgrep", 0.38, None),
        ];
        let report = aggregate_runs(&runs).unwrap();

        assert_eq!(report.runs, 3);
        assert_relative_eq!(report.hit_at_k, 0.38);
        assert_relative_eq!(report.mrr, 0.19);
        // Only the two runs with latency data count
        assert_relative_eq!(report.latency_p50_ms.unwrap(), 42.0);
    }

    #[test]
    fn test_aggregate_requires_runs() {
        assert!(matches!(aggregate_runs(&[]), Err(BenchError::NoRuns)));
        assert!(matches!(aggregate_by_tool(&[]), Err(BenchError::NoRuns)));
    }

    #[test]
    fn test_aggregate_by_tool_groups() {
        let runs = vec![
            vec![run("sgrep", 0.5, Some(10.0)), run("rg", 0.2, Some(2.0))],
            vec![run("sgrep", 0.7, Some(12.0)), run("rg", 0.2, Some(3.0))],
        ];
        let reports = aggregate_by_tool(&runs).unwrap();

        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].tool, "sgrep");
        assert_relative_eq!(reports[0].hit_at_k, 0.6);
        assert_eq!(reports[1].tool, "rg");
        assert_relative_eq!(reports[1].latency_p50_ms.unwrap(), 2.5);
    }

    #[test]
    fn test_summarize_is_idempotent() {
        let outcomes = vec![
            outcome("sgrep", Some(2), 12.0, OutcomeStatus::Ok),
            outcome("sgrep", None, 30.0, OutcomeStatus::Ok),
            outcome("sgrep", Some(1), 8.0, OutcomeStatus::Ok),
        ];
        let a = summarize_by_tool(&outcomes, 10, FailurePolicy::Exclude);
        let b = summarize_by_tool(&outcomes, 10, FailurePolicy::Exclude);
        assert_eq!(a, b);
    }

    #[test]
    fn test_nonzero_mrr_implies_hits() {
        let ranks = [None, Some(1), Some(4), Some(11), None, Some(10)];
        for k in [1, 3, 5, 10] {
            for window in 0..ranks.len() {
                let outcomes: Vec<QueryOutcome> = ranks[window..]
                    .iter()
                    .map(|r| outcome("rg", *r, 1.0, OutcomeStatus::Ok))
                    .collect();
                let summary = summarize("rg", &outcomes, k, FailurePolicy::Exclude);

                assert!((0.0..=1.0).contains(&summary.hit_at_k));
                assert!((0.0..=1.0).contains(&summary.mrr));
                if summary.mrr > 0.0 {
                    assert!(summary.hit_at_k > 0.0);
                }
            }
        }
    }
}
