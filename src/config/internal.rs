//! Internal implementation for config module
//!
//! Handles .sgrep-bench/config.toml - harness configuration.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{BenchError, Result};

// =============================================================================
// Config Types
// =============================================================================

/// Harness configuration stored in .sgrep-bench/config.toml
/// All sections are optional with defaults
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HarnessConfig {
    #[serde(default)]
    pub tools: ToolsSection,
    #[serde(default)]
    pub bench: BenchSection,
    #[serde(default)]
    pub queries: QueriesSection,
    #[serde(default)]
    pub agent: AgentSection,
}

/// External executables
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsSection {
    /// Semantic search binary
    #[serde(default = "default_sgrep")]
    pub sgrep: String,
    /// Keyword search binary
    #[serde(default = "default_rg")]
    pub rg: String,
    /// Agent CLI used by the tool-call benchmark
    #[serde(default = "default_codex")]
    pub codex: String,
}

fn default_sgrep() -> String {
    "sgrep".to_string()
}
fn default_rg() -> String {
    "rg".to_string()
}
fn default_codex() -> String {
    "codex-kaioken".to_string()
}

impl Default for ToolsSection {
    fn default() -> Self {
        Self {
            sgrep: default_sgrep(),
            rg: default_rg(),
            codex: default_codex(),
        }
    }
}

/// How failed tool invocations count in aggregate metrics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// Failures leave the Hit@K / MRR denominators
    #[default]
    Exclude,
    /// Failures count as misses
    CountAsMiss,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchSection {
    /// Results evaluated per query (K in Hit@K)
    #[serde(default = "default_limit")]
    pub limit: usize,
    /// Per-invocation timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Repeated runs; the report takes the per-metric median
    #[serde(default = "default_runs")]
    pub runs: usize,
    #[serde(default)]
    pub failure_policy: FailurePolicy,
    /// Require result line spans to overlap the target line range
    #[serde(default)]
    pub match_lines: bool,
}

fn default_limit() -> usize {
    10
}
fn default_timeout_secs() -> u64 {
    60
}
fn default_runs() -> usize {
    1
}

impl Default for BenchSection {
    fn default() -> Self {
        Self {
            limit: default_limit(),
            timeout_secs: default_timeout_secs(),
            runs: default_runs(),
            failure_policy: FailurePolicy::default(),
            match_lines: false,
        }
    }
}

/// Candidate selection when more records exist than `max_items`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SamplePolicy {
    /// Keep the first records in file/line order
    #[default]
    Document,
    /// Shuffle candidates before selection
    Random,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueriesSection {
    #[serde(default = "default_max_items")]
    pub max_items: usize,
    #[serde(default)]
    pub sample: SamplePolicy,
    /// Seed for `sample = "random"`; unset means a fresh sample per invocation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

fn default_max_items() -> usize {
    100
}

impl Default for QueriesSection {
    fn default() -> Self {
        Self {
            max_items: default_max_items(),
            sample: SamplePolicy::default(),
            seed: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentSection {
    /// Session log directory (default: ~/.codex/sessions)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sessions_dir: Option<String>,
    /// Timeout for one agent run in seconds (default: 900)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

// =============================================================================
// Loading
// =============================================================================

/// Load config, falling back to defaults when the file is absent
pub fn load(path: &Path) -> Result<HarnessConfig> {
    if !path.exists() {
        return Ok(apply_env(HarnessConfig::default()));
    }
    load_required(path)
}

/// Load config from a file that must exist
pub fn load_required(path: &Path) -> Result<HarnessConfig> {
    let contents = fs::read_to_string(path).map_err(|e| {
        BenchError::Config(format!("failed to read {}: {}", path.display(), e))
    })?;
    let config = parse(&contents)
        .map_err(|e| BenchError::Config(format!("failed to parse {}: {}", path.display(), e)))?;
    validate(&config)?;
    Ok(apply_env(config))
}

fn parse(contents: &str) -> std::result::Result<HarnessConfig, toml::de::Error> {
    toml::from_str(contents)
}

fn validate(config: &HarnessConfig) -> Result<()> {
    if config.bench.limit == 0 {
        return Err(BenchError::Config("bench.limit must be at least 1".to_string()));
    }
    if config.bench.runs == 0 {
        return Err(BenchError::Config("bench.runs must be at least 1".to_string()));
    }
    if config.bench.timeout_secs == 0 {
        return Err(BenchError::Config(
            "bench.timeout_secs must be at least 1".to_string(),
        ));
    }
    if config.queries.max_items == 0 {
        return Err(BenchError::Config(
            "queries.max_items must be at least 1".to_string(),
        ));
    }
    Ok(())
}

fn apply_env(mut config: HarnessConfig) -> HarnessConfig {
    if let Ok(sgrep) = std::env::var(super::SGREP_PATH_ENV) {
        if !sgrep.trim().is_empty() {
            config.tools.sgrep = sgrep;
        }
    }
    config
}

/// Expand `~` and `$VARS`; unexpandable input is used as-is
pub fn expand_path(raw: &str) -> PathBuf {
    match shellexpand::full(raw) {
        Ok(expanded) => PathBuf::from(expanded.as_ref()),
        Err(_) => PathBuf::from(raw),
    }
}
