//! Console summary in the harness's boxed style

use colored::Colorize;

use super::{ReportContext, RG_RANKING_CAVEAT};
use crate::metrics::BenchmarkReport;

const RULE: &str = "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━";

fn ms(value: Option<f64>) -> String {
    value
        .map(|v| format!("{:.0}ms", v))
        .unwrap_or_else(|| "no data".to_string())
}

/// Print one block per tool
pub fn print_summary(context: &ReportContext, reports: &[BenchmarkReport], approximate: &[String]) {
    println!();
    println!("{}", RULE);
    let runs = if context.runs > 1 {
        format!(", median of {} runs", context.runs)
    } else {
        String::new()
    };
    println!(
        "📊 {} ({}, K={}{})",
        "Results".bold(),
        context.mode,
        context.k,
        runs
    );
    println!("{}", RULE);

    for report in reports {
        println!();
        println!("   {}", report.tool.bold());
        println!(
            "   ├─ Hit@{}:   {:.1}%",
            report.k,
            report.hit_at_k * 100.0
        );
        println!("   ├─ MRR:      {:.3}", report.mrr);
        println!(
            "   ├─ Latency:  p50 {} / p95 {} / mean {}",
            ms(report.latency_p50_ms),
            ms(report.latency_p95_ms),
            ms(report.latency_mean_ms)
        );
        let failures = if report.failures > 0 {
            report.failures.to_string().red().to_string()
        } else {
            report.failures.to_string().green().to_string()
        };
        println!(
            "   └─ Queries:  {} ({} failed, {})",
            report.queries, failures, context.failure_policy
        );
    }

    if !approximate.is_empty() {
        println!();
        println!(
            "   {} {} ({})",
            "⚠".yellow(),
            RG_RANKING_CAVEAT,
            approximate.join(", ")
        );
    }
    println!();
}
