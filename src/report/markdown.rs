//! Narrative Markdown report

use std::fmt::Write as _;

use super::{ReportContext, RG_RANKING_CAVEAT};
use crate::metrics::BenchmarkReport;

fn ms(value: Option<f64>) -> String {
    value
        .map(|v| format!("{:.1}", v))
        .unwrap_or_else(|| "no data".to_string())
}

/// Render the comparison report
///
/// `approximate` names tools whose ranking the harness derives itself; each
/// gets a caveat line.
pub fn render(context: &ReportContext, reports: &[BenchmarkReport], approximate: &[String]) -> String {
    let mut out = String::new();
    let k = reports.first().map(|r| r.k).unwrap_or(context.k);

    // Writing to a String cannot fail
    let _ = writeln!(out, "# {}", context.title);
    let _ = writeln!(out);
    let _ = writeln!(out, "## Context");
    let _ = writeln!(out);
    let _ = writeln!(out, "- Repository: `{}`", context.repo);
    let _ = writeln!(out, "- Query set: `{}`", context.query_set);
    let _ = writeln!(out, "- Mode: {}", context.mode);
    let _ = writeln!(out, "- Cutoff: top-{}", k);
    let _ = writeln!(out, "- Runs: {}", context.runs);
    let _ = writeln!(out, "- Generated: {}", context.generated.format("%Y-%m-%d %H:%M:%S UTC"));
    let _ = writeln!(out);

    let _ = writeln!(out, "## Results");
    let _ = writeln!(out);
    if context.runs > 1 {
        let _ = writeln!(out, "Each value is the median over {} runs.", context.runs);
        let _ = writeln!(out);
    }
    let _ = writeln!(
        out,
        "| Tool | Queries | Hit@{k} | MRR | p50 (ms) | p95 (ms) | mean (ms) |"
    );
    let _ = writeln!(out, "|---|---:|---:|---:|---:|---:|---:|");
    for report in reports {
        let _ = writeln!(
            out,
            "| {} | {} | {:.1}% | {:.3} | {} | {} | {} |",
            report.tool,
            report.queries,
            report.hit_at_k * 100.0,
            report.mrr,
            ms(report.latency_p50_ms),
            ms(report.latency_p95_ms),
            ms(report.latency_mean_ms),
        );
    }
    let _ = writeln!(out);

    let failures: Vec<String> = reports
        .iter()
        .map(|r| format!("{} {}", r.tool, r.failures))
        .collect();
    let _ = writeln!(
        out,
        "Failed or timed-out invocations ({}): {}.",
        context.failure_policy,
        failures.join(", ")
    );

    if !approximate.is_empty() {
        let _ = writeln!(out);
        for tool in approximate {
            let _ = writeln!(out, "> **Note ({}):** {}", tool, RG_RANKING_CAVEAT);
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn context(runs: usize) -> ReportContext {
        ReportContext {
            title: "sgrep vs rg".to_string(),
            repo: "/work/repo".to_string(),
            query_set: "queries.jsonl".to_string(),
            mode: "mixed".to_string(),
            k: 10,
            runs,
            failure_policy: "excluded".to_string(),
            generated: chrono::Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap(),
        }
    }

    fn report(tool: &str, latency: Option<f64>) -> BenchmarkReport {
        BenchmarkReport {
            tool: tool.to_string(),
            runs: 3,
            queries: 40,
            failures: 1,
            k: 10,
            hit_at_k: 0.375,
            mrr: 0.25,
            latency_p50_ms: latency,
            latency_p95_ms: latency,
            latency_mean_ms: latency,
        }
    }

    #[test]
    fn test_render_table_and_caveat() {
        let text = render(
            &context(3),
            &[report("sgrep", Some(41.3)), report("rg", Some(3.0))],
            &["rg".to_string()],
        );

        assert!(text.starts_with("# sgrep vs rg\n"));
        assert!(text.contains("- Generated: 2026-03-01 12:00:00 UTC"));
        assert!(text.contains("median over 3 runs"));
        assert!(text.contains("| sgrep | 40 | 37.5% | 0.250 | 41.3 | 41.3 | 41.3 |"));
        assert!(text.contains("sgrep 1, rg 1"));
        assert!(text.contains("**Note (rg):**"));
    }

    #[test]
    fn test_render_no_latency_data() {
        let text = render(&context(1), &[report("sgrep", None)], &[]);
        assert!(text.contains("| no data | no data | no data |"));
        assert!(!text.contains("median over"));
        assert!(!text.contains("Note"));
    }
}
