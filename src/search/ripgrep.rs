//! Keyword search adapter - ripgrep with a harness-derived ranking
//!
//! rg does not rank. Files are ordered by how many lines matched, ties by
//! path. This is an approximation and reports say so.

use regex::Regex;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

use super::{normalize_path, ranked, SearchResponse, SearchStatus, SearchTool};
use crate::process::{run_with_timeout, ProcessOutput};
use crate::query_set::LineRange;

/// Words dropped when turning a natural-language question into keywords
const STOPWORDS: &[&str] = &[
    "where", "is", "the", "a", "an", "and", "or", "to", "of", "in", "on", "for", "with", "does",
    "do", "how", "are", "be", "implemented", "handled", "what", "when", "why", "which", "what's",
    "its", "it", "this", "that", "via", "from", "into", "using", "use", "uses", "used", "only",
];

/// Keywords searched per query in keyword strategy
const MAX_KEYWORDS: usize = 3;

/// How a query becomes rg invocations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RgStrategy {
    /// One fixed-string search for the whole query
    Literal,
    /// Up to three case-insensitive searches for extracted keywords
    Keywords,
}

pub struct RipgrepTool {
    binary: PathBuf,
    repo: PathBuf,
    timeout: Duration,
    strategy: RgStrategy,
}

impl RipgrepTool {
    pub fn new(binary: impl Into<PathBuf>, repo: &Path, timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            repo: repo.to_path_buf(),
            timeout,
            strategy: RgStrategy::Literal,
        }
    }

    pub fn with_strategy(mut self, strategy: RgStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    fn literal_args(&self, query: &str) -> Vec<String> {
        vec![
            "-F".to_string(),
            "--no-heading".to_string(),
            "--line-number".to_string(),
            "--color=never".to_string(),
            "--".to_string(),
            query.to_string(),
            self.repo.to_string_lossy().into_owned(),
        ]
    }

    fn keyword_args(&self, keyword: &str) -> Vec<String> {
        vec![
            "-i".to_string(),
            "-n".to_string(),
            "--no-heading".to_string(),
            "--color=never".to_string(),
            "--".to_string(),
            keyword.to_string(),
            self.repo.to_string_lossy().into_owned(),
        ]
    }

    /// Run every invocation, merging output and summing latency
    fn run_all(&self, invocations: Vec<Vec<String>>, limit: usize) -> SearchResponse {
        let mut stdouts = Vec::new();
        let mut response = SearchResponse {
            results: Vec::new(),
            latency: Duration::ZERO,
            status: SearchStatus::Completed,
            exit_code: Some(0),
            stderr: String::new(),
        };

        for args in invocations {
            let output = match run_with_timeout(&self.binary, &args, None, self.timeout) {
                Ok(output) => output,
                Err(e) => {
                    tracing::warn!(binary = %self.binary.display(), error = %e, "rg failed to start");
                    return SearchResponse::spawn_failure(&e);
                }
            };
            response.latency += output.elapsed;

            if let Some(status) = classify(&output) {
                response.status = status;
                response.exit_code = output.exit_code();
                response.stderr = output.stderr;
                return response;
            }
            stdouts.push(output.stdout);
        }

        let outputs: Vec<&str> = stdouts.iter().map(String::as_str).collect();
        response.results = ranked(
            rank_by_match_count(&outputs)
                .into_iter()
                .map(|(path, count, lines)| {
                    (
                        normalize_path(Path::new(&path), &self.repo),
                        Some(count as f64),
                        lines.into_iter().map(LineRange::single).collect(),
                    )
                }),
            limit,
        );
        response
    }
}

/// Failure status for one rg call, `None` when it answered (exit 0 or 1)
fn classify(output: &ProcessOutput) -> Option<SearchStatus> {
    if output.timed_out {
        return Some(SearchStatus::TimedOut);
    }
    match output.exit_code() {
        Some(0) | Some(1) => None,
        Some(code) => Some(SearchStatus::Failed {
            reason: format!("exit code {}", code),
        }),
        None => Some(SearchStatus::Failed {
            reason: "terminated by signal".to_string(),
        }),
    }
}

impl SearchTool for RipgrepTool {
    fn name(&self) -> &'static str {
        "rg"
    }

    fn search(&self, query: &str, limit: usize) -> SearchResponse {
        let invocations = match self.strategy {
            RgStrategy::Literal => vec![self.literal_args(query)],
            RgStrategy::Keywords => keywordize(query)
                .iter()
                .map(|kw| self.keyword_args(kw))
                .collect(),
        };
        self.run_all(invocations, limit)
    }

    fn ranking_is_approximate(&self) -> bool {
        true
    }
}

fn token_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[A-Za-z0-9_\-]+").expect("Invalid token regex"))
}

/// First three unique non-stopword tokens longer than two characters
pub fn keywordize(query: &str) -> Vec<String> {
    let lowered = query.to_lowercase();
    let mut keywords: Vec<String> = Vec::new();
    for token in token_regex().find_iter(&lowered).map(|m| m.as_str()) {
        if token.len() <= 2 || STOPWORDS.contains(&token) {
            continue;
        }
        if !keywords.iter().any(|k| k == token) {
            keywords.push(token.to_string());
        }
        if keywords.len() >= MAX_KEYWORDS {
            break;
        }
    }
    keywords
}

/// Count matching lines per file across `path:line:text` outputs
///
/// Returns `(path, count, line numbers)` ordered by count descending, then
/// path ascending.
pub fn rank_by_match_count(outputs: &[&str]) -> Vec<(String, usize, Vec<u32>)> {
    let mut per_file: BTreeMap<&str, (usize, Vec<u32>)> = BTreeMap::new();

    for line in outputs.iter().flat_map(|out| out.lines()) {
        let mut parts = line.splitn(3, ':');
        let (Some(path), Some(line_no)) = (parts.next(), parts.next()) else {
            continue;
        };
        if path.is_empty() {
            continue;
        }
        let entry = per_file.entry(path).or_default();
        entry.0 += 1;
        if let Ok(n) = line_no.parse::<u32>() {
            entry.1.push(n);
        }
    }

    let mut counts: Vec<(String, usize, Vec<u32>)> = per_file
        .into_iter()
        .map(|(path, (count, lines))| (path.to_string(), count, lines))
        .collect();
    // Stable sort keeps the BTreeMap's path order among equal counts
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keywordize() {
        assert_eq!(
            keywordize("Where is the retry logic for HTTP uploads implemented?"),
            vec!["retry", "logic", "http"]
        );
        assert_eq!(keywordize("how is it done"), vec!["done"]);
        assert!(keywordize("where is it").is_empty());
        assert_eq!(keywordize("cache cache CACHE eviction"), vec!["cache", "eviction"]);
    }

    #[test]
    fn test_rank_by_match_count() {
        let out = "b.rs:1:x\na.rs:3:x\nc.rs:2:x\nc.rs:9:x\nnot a match line\n";
        let ranked = rank_by_match_count(&[out]);

        let paths: Vec<&str> = ranked.iter().map(|(p, _, _)| p.as_str()).collect();
        assert_eq!(paths, vec!["c.rs", "a.rs", "b.rs"]);
        assert_eq!(ranked[0].1, 2);
        assert_eq!(ranked[0].2, vec![2, 9]);
    }

    #[test]
    fn test_rank_merges_outputs() {
        let ranked = rank_by_match_count(&["a.rs:1:x\n", "b.rs:1:y\nb.rs:2:y\n", "a.rs:5:z\na.rs:6:z\n"]);
        assert_eq!(ranked[0].0, "a.rs");
        assert_eq!(ranked[0].1, 3);
        assert_eq!(ranked[1].0, "b.rs");
    }

    #[cfg(unix)]
    mod process {
        use super::super::*;
        use std::fs;
        use std::os::unix::fs::PermissionsExt;
        use tempfile::TempDir;

        fn fake_rg(dir: &Path, body: &str) -> PathBuf {
            let path = dir.join("rg");
            fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
            fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
            path
        }

        #[test]
        fn test_no_match_is_completed() {
            let temp = TempDir::new().unwrap();
            let binary = fake_rg(temp.path(), "exit 1");

            let tool = RipgrepTool::new(binary, temp.path(), Duration::from_secs(10));
            let response = tool.search("nothing here", 10);
            assert_eq!(response.status, SearchStatus::Completed);
            assert!(response.results.is_empty());
        }

        #[test]
        fn test_error_exit_is_failure() {
            let temp = TempDir::new().unwrap();
            let binary = fake_rg(temp.path(), "echo 'regex parse error' >&2; exit 2");

            let tool = RipgrepTool::new(binary, temp.path(), Duration::from_secs(10));
            let response = tool.search("(", 10);
            assert!(matches!(response.status, SearchStatus::Failed { .. }));
            assert_eq!(response.exit_code, Some(2));
        }

        #[test]
        fn test_keyword_strategy_merges_calls() {
            let temp = TempDir::new().unwrap();
            let repo = temp.path().canonicalize().unwrap();
            // Each call prints a hit for a file named after the keyword
            let binary = fake_rg(&repo, r#"kw="$6"; echo "$kw.rs:1:$kw"; echo "shared.rs:1:$kw""#);

            let tool = RipgrepTool::new(binary, &repo, Duration::from_secs(10))
                .with_strategy(RgStrategy::Keywords);
            let response = tool.search("where is token refresh handled", 10);

            assert_eq!(response.status, SearchStatus::Completed);
            assert_eq!(response.results[0].file_path, repo.join("shared.rs"));
            assert_eq!(response.results[0].score, Some(2.0));
            assert_eq!(response.results.len(), 3);
            assert!(tool.ranking_is_approximate());
        }
    }
}
