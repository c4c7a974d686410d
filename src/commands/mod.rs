pub mod agent;
pub mod bench;
pub mod build_queries;
pub mod gold;
pub mod index;
pub mod summarize;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use sgrep_bench::config::{self, FailurePolicy, HarnessConfig};

/// Load `--config` if given, else `.sgrep-bench/config.toml` in the working directory
pub fn load_config(path: Option<&Path>) -> Result<HarnessConfig> {
    match path {
        Some(path) => config::load_from(path)
            .with_context(|| format!("Failed to load config: {}", path.display())),
        None => config::load(Path::new(".")).context("Failed to load .sgrep-bench/config.toml"),
    }
}

/// Expand a configured binary and warn when it is not on PATH
///
/// A missing tool is not fatal: its queries are recorded as failures.
pub fn resolve_tool(name: &str, raw: &str) -> PathBuf {
    let path = config::expand_tool_path(raw);
    if which::which(&path).is_err() {
        tracing::warn!(tool = name, path = %path.display(), "tool not found on PATH");
        eprintln!("⚠️  {} not found at '{}'; its queries will fail", name, path.display());
    }
    path
}

/// Fail early with a typed error when the repository is missing
pub fn require_repo(repo: &Path) -> Result<PathBuf> {
    if !repo.is_dir() {
        return Err(sgrep_bench::BenchError::RepoNotFound(repo.to_path_buf()).into());
    }
    repo.canonicalize()
        .with_context(|| format!("Failed to resolve repository: {}", repo.display()))
}

pub fn failure_policy(config: &HarnessConfig, count_failures_as_misses: bool) -> FailurePolicy {
    if count_failures_as_misses {
        FailurePolicy::CountAsMiss
    } else {
        config.bench.failure_policy
    }
}

pub fn policy_label(policy: FailurePolicy) -> &'static str {
    match policy {
        FailurePolicy::Exclude => "failures excluded",
        FailurePolicy::CountAsMiss => "failures counted as misses",
    }
}
