//! Build a query set from a repository

use anyhow::{Context, Result};
use colored::Colorize;
use std::collections::BTreeMap;
use std::path::PathBuf;

use sgrep_bench::config::{HarnessConfig, SamplePolicy};
use sgrep_bench::query_set::{self, BuildMode, BuildOptions, QuerySource};

pub struct BuildQueriesOptions {
    pub repo: PathBuf,
    pub out: PathBuf,
    /// Override `queries.max_items`
    pub max_items: Option<usize>,
    pub mode: BuildMode,
    /// Override `queries.sample`
    pub sample: Option<SamplePolicy>,
    /// Override `queries.seed`
    pub seed: Option<u64>,
}

pub fn execute(config: &HarnessConfig, options: BuildQueriesOptions) -> Result<()> {
    let build_options = BuildOptions {
        max_items: options.max_items.unwrap_or(config.queries.max_items),
        mode: options.mode,
        sample: options.sample.unwrap_or(config.queries.sample),
        seed: options.seed.or(config.queries.seed),
    };

    println!("🔎 Building query set from {}", options.repo.display());
    tracing::info!(
        max_items = build_options.max_items,
        mode = ?build_options.mode,
        sample = ?build_options.sample,
        "building query set"
    );

    let records = query_set::build(&options.repo, &build_options)
        .with_context(|| format!("Failed to build query set from {}", options.repo.display()))?;
    query_set::save(&options.out, &records)
        .with_context(|| format!("Failed to write query set: {}", options.out.display()))?;

    let mut by_language: BTreeMap<&str, usize> = BTreeMap::new();
    for record in &records {
        *by_language
            .entry(record.language.as_deref().unwrap_or("unknown"))
            .or_default() += 1;
    }
    let from_comments = records
        .iter()
        .filter(|r| r.source == QuerySource::Comment)
        .count();
    let natural = records.iter().filter(|r| r.has_natural_text()).count();

    println!(
        "{} Wrote {} queries to {}",
        "✓".green(),
        records.len(),
        options.out.display()
    );
    println!(
        "   {} with natural-language text, {} from comment blocks",
        natural, from_comments
    );
    let languages = by_language
        .iter()
        .map(|(lang, n)| format!("{} {}", lang, n))
        .collect::<Vec<_>>()
        .join(", ");
    println!("   Languages: {}", languages);

    Ok(())
}
