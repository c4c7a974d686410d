//! Config module - harness configuration
//!
//! Manages `.sgrep-bench/config.toml` for tool locations and benchmark
//! defaults. Every section is optional; a missing file means defaults.
//! Command-line flags override whatever is loaded here.
//!
//! # Example
//!
//! ```no_run
//! use sgrep_bench::config;
//! use std::path::Path;
//!
//! let config = config::load(Path::new("."))?;
//! println!("sgrep binary: {}", config.tools.sgrep);
//! println!("default limit: {}", config.bench.limit);
//! # Ok::<(), sgrep_bench::error::BenchError>(())
//! ```

mod internal;

use std::path::{Path, PathBuf};

use crate::error::Result;

pub use internal::{
    AgentSection, BenchSection, FailurePolicy, HarnessConfig, QueriesSection, SamplePolicy,
    ToolsSection,
};

/// Environment variable overriding the sgrep binary location
pub const SGREP_PATH_ENV: &str = "SGREP_PATH";

/// Load config from `{root}/.sgrep-bench/config.toml`
///
/// Returns defaults if the file doesn't exist. Applies env overrides.
pub fn load(root: &Path) -> Result<HarnessConfig> {
    internal::load(&crate::paths::config_path(root))
}

/// Load config from an explicit file path (must exist)
pub fn load_from(path: &Path) -> Result<HarnessConfig> {
    internal::load_required(path)
}

/// Resolve a configured tool path: expands `~` and env vars
pub fn expand_tool_path(raw: &str) -> PathBuf {
    internal::expand_path(raw)
}
