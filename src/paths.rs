//! Single source of truth for the harness filesystem layout.
//!
//! This module defines WHERE things live. It has no I/O, no validation,
//! no business logic.
//!
//! # Project-Level Paths (working directory)
//!
//! ```text
//! ./
//! ├── .sgrep-bench/
//! │   └── config.toml          # Harness config (optional)
//! └── reports/                 # Default output directory
//!     ├── *.csv                # Per-query outcomes, summaries
//!     ├── *.md                 # Narrative reports
//!     └── codex_toolcall_*.json
//! ```
//!
//! # User-Level Paths
//!
//! ```text
//! ~/.codex/sessions/           # Agent session logs (read-only input)
//! ```

use std::path::{Path, PathBuf};

/// Harness directory: `{root}/.sgrep-bench/`
pub fn harness_dir(root: &Path) -> PathBuf {
    root.join(".sgrep-bench")
}

/// Harness config: `{root}/.sgrep-bench/config.toml`
pub fn config_path(root: &Path) -> PathBuf {
    harness_dir(root).join("config.toml")
}

/// Default report directory: `{root}/reports/`
pub fn reports_dir(root: &Path) -> PathBuf {
    root.join("reports")
}

/// CSV path for one run of a repeated benchmark.
///
/// `reports/bench.csv` with run 2 becomes `reports/bench.run2.csv`.
pub fn run_csv_path(base: &Path, run: usize) -> PathBuf {
    let stem = base
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "bench".to_string());
    let ext = base
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
        .unwrap_or_else(|| "csv".to_string());
    base.with_file_name(format!("{}.run{}.{}", stem, run, ext))
}

/// Agent session logs: `~/.codex/sessions/`
pub fn agent_sessions_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".codex")
        .join("sessions")
}

/// Agent benchmark report: `{root}/reports/codex_toolcall_{label}.json`
pub fn agent_report_path(root: &Path, label: &str) -> PathBuf {
    reports_dir(root).join(format!("codex_toolcall_{}.json", label))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_path() {
        let path = config_path(Path::new("/work"));
        assert_eq!(path, Path::new("/work/.sgrep-bench/config.toml"));
    }

    #[test]
    fn test_run_csv_path() {
        let path = run_csv_path(Path::new("reports/bench_mixed.csv"), 2);
        assert_eq!(path, Path::new("reports/bench_mixed.run2.csv"));

        let path = run_csv_path(Path::new("out"), 1);
        assert_eq!(path, Path::new("out.run1.csv"));
    }

    #[test]
    fn test_agent_report_path() {
        let path = agent_report_path(Path::new("/work"), "session_rg");
        assert_eq!(path, Path::new("/work/reports/codex_toolcall_session_rg.json"));
    }
}
