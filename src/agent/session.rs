//! Agent session log parsing
//!
//! The agent CLI prints JSON events on stdout and writes a full session log
//! under its sessions directory. Stdout gives the thread id; the log gives
//! tool calls and token usage.

use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use walkdir::WalkDir;

/// Tool-call and token totals for one session
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SessionStats {
    pub tool_calls_total: usize,
    pub tool_calls_by_name: BTreeMap<String, usize>,
    pub total_tokens: u64,
}

/// Thread id from the first `thread.started` event on stdout
pub fn extract_thread_id(stdout: &str) -> Option<String> {
    stdout
        .lines()
        .filter_map(|line| serde_json::from_str::<Value>(line.trim()).ok())
        .find(|event| event.get("type").and_then(Value::as_str) == Some("thread.started"))
        .and_then(|event| event.get("thread_id").and_then(Value::as_str).map(str::to_string))
}

/// Most recently modified `*.jsonl` under `dir` whose name contains `thread_id`
pub fn find_session_file(dir: &Path, thread_id: &str) -> Option<PathBuf> {
    WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            let name = e.file_name().to_string_lossy();
            name.ends_with(".jsonl") && name.contains(thread_id)
        })
        .map(|e| {
            let modified = e
                .metadata()
                .ok()
                .and_then(|m| m.modified().ok())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            (modified, e.into_path())
        })
        .max_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)))
        .map(|(_, path)| path)
}

/// Count tool calls and peak token usage in a session log
///
/// Lines that are empty or not JSON are skipped.
pub fn parse_session<R: BufRead>(reader: R) -> SessionStats {
    let mut stats = SessionStats::default();

    for line in reader.lines().map_while(Result::ok) {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let Ok(event) = serde_json::from_str::<Value>(line) else {
            continue;
        };
        let Some(payload) = event.get("payload") else {
            continue;
        };

        match payload.get("type").and_then(Value::as_str) {
            Some("function_call") => {
                stats.tool_calls_total += 1;
                let name = payload
                    .get("name")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown");
                *stats.tool_calls_by_name.entry(name.to_string()).or_default() += 1;
            }
            Some("token_count") => {
                let total = payload
                    .pointer("/info/total_token_usage/total_tokens")
                    .and_then(Value::as_u64)
                    .unwrap_or(0);
                stats.total_tokens = stats.total_tokens.max(total);
            }
            _ => {}
        }
    }

    stats
}

pub fn parse_session_file(path: &Path) -> std::io::Result<SessionStats> {
    let file = File::open(path)?;
    Ok(parse_session(BufReader::new(file)))
}
