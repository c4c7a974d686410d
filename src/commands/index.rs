//! Index command - run sgrep's indexer and keep its profile output

use anyhow::{Context, Result};
use colored::Colorize;
use std::fs;
use std::path::Path;
use std::time::Duration;

use sgrep_bench::config::HarnessConfig;
use sgrep_bench::process::{one_line, run_with_timeout};

use super::{require_repo, resolve_tool};

/// Indexing a large repository takes far longer than one search
const DEFAULT_INDEX_TIMEOUT_SECS: u64 = 1800;

pub fn execute(config: &HarnessConfig, repo: &Path, out: &Path, timeout_secs: Option<u64>) -> Result<()> {
    let repo = require_repo(repo)?;
    let binary = resolve_tool("sgrep", &config.tools.sgrep);
    let timeout = Duration::from_secs(timeout_secs.unwrap_or(DEFAULT_INDEX_TIMEOUT_SECS));

    println!("📦 Indexing {} with sgrep", repo.display());
    let args = vec![
        "index".to_string(),
        "-p".to_string(),
        repo.to_string_lossy().into_owned(),
    ];
    let output = run_with_timeout(&binary, &args, None, timeout)
        .with_context(|| format!("Failed to start {}", binary.display()))?;

    if output.timed_out {
        anyhow::bail!("sgrep index timed out after {}s", timeout.as_secs());
    }
    if !output.success() {
        anyhow::bail!(
            "sgrep index exited with {:?}: {}",
            output.exit_code(),
            one_line(&output.stderr, 400)
        );
    }

    if let Some(parent) = out.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
    }
    fs::write(out, &output.stdout)
        .with_context(|| format!("Failed to write index profile: {}", out.display()))?;

    println!(
        "{} Indexed in {:.1}s, profile written to {}",
        "✓".green(),
        output.elapsed.as_secs_f64(),
        out.display()
    );
    Ok(())
}
