//! End-to-end: runner -> outcome CSV -> metrics, with scripted tools

use approx::assert_relative_eq;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use sgrep_bench::config::FailurePolicy;
use sgrep_bench::metrics::{aggregate_by_tool, summarize_by_tool};
use sgrep_bench::query_set::{LineRange, QuerySource};
use sgrep_bench::report::{read_outcomes, CsvSink};
use sgrep_bench::runner::{BenchmarkRunner, OutcomeStatus, QueryMode, QueryOutcome, RunnerConfig};
use sgrep_bench::search::{SearchResponse, SearchResult, SearchStatus, SearchTool};
use sgrep_bench::QueryRecord;
use tempfile::TempDir;

/// Answers each query from a fixed table; unknown queries fail
struct ScriptedTool {
    name: &'static str,
    answers: HashMap<String, (Vec<PathBuf>, u64)>,
}

impl SearchTool for ScriptedTool {
    fn name(&self) -> &'static str {
        self.name
    }

    fn search(&self, query: &str, limit: usize) -> SearchResponse {
        match self.answers.get(query) {
            Some((paths, latency_ms)) => SearchResponse {
                results: paths
                    .iter()
                    .take(limit)
                    .enumerate()
                    .map(|(i, p)| SearchResult {
                        rank: i + 1,
                        file_path: p.clone(),
                        score: None,
                        lines: Vec::new(),
                    })
                    .collect(),
                latency: Duration::from_millis(*latency_ms),
                status: SearchStatus::Completed,
                exit_code: Some(0),
                stderr: String::new(),
            },
            None => SearchResponse {
                results: Vec::new(),
                latency: Duration::from_millis(500),
                status: SearchStatus::Failed {
                    reason: "exit code 2".to_string(),
                },
                exit_code: Some(2),
                stderr: "boom".to_string(),
            },
        }
    }
}

struct Fixture {
    _temp: TempDir,
    root: PathBuf,
    queries: Vec<QueryRecord>,
}

fn fixture() -> Fixture {
    let temp = TempDir::new().unwrap();
    for name in ["a.rs", "b.rs", "c.rs", "d.rs", "noise.rs"] {
        fs::write(temp.path().join(name), "fn x() {}\n").unwrap();
    }
    let root = temp.path().canonicalize().unwrap();

    let queries = ["a.rs", "b.rs", "c.rs", "d.rs"]
        .iter()
        .enumerate()
        .map(|(i, file)| QueryRecord {
            id: format!("q{:04}", i),
            query_text: format!("Where is the code that handles case {}?", i),
            target_file: PathBuf::from(file),
            target_line_range: Some(LineRange::single(1)),
            source: QuerySource::Identifier,
            language: Some("rust".to_string()),
            symbol: Some("x".to_string()),
            keyword: Some("x".to_string()),
            comment_text: Some(format!("handles case {}", i)),
            alternate_targets: Vec::new(),
        })
        .collect();

    Fixture {
        _temp: temp,
        root,
        queries,
    }
}

fn scripted(root: &Path) -> ScriptedTool {
    let p = |name: &str| root.join(name);
    let mut answers = HashMap::new();
    // q0 rank 1, q1 rank 3, q2 miss, q3 fails
    answers.insert(
        "Where is the code that handles case 0?".to_string(),
        (vec![p("a.rs"), p("noise.rs")], 10),
    );
    answers.insert(
        "Where is the code that handles case 1?".to_string(),
        (vec![p("noise.rs"), p("a.rs"), p("b.rs")], 20),
    );
    answers.insert(
        "Where is the code that handles case 2?".to_string(),
        (vec![p("noise.rs")], 30),
    );
    ScriptedTool {
        name: "scripted",
        answers,
    }
}

#[test]
fn test_runner_metrics_exclude_failures() {
    let fx = fixture();
    let tools: Vec<Box<dyn SearchTool>> = vec![Box::new(scripted(&fx.root))];
    let runner = BenchmarkRunner::new(&tools, &fx.root, RunnerConfig::default());

    let mut sink: Vec<QueryOutcome> = Vec::new();
    let output = runner.run(&fx.queries, &mut sink).unwrap();

    assert_eq!(output.outcomes.len(), 4);
    assert_eq!(sink.len(), 4);
    let ranks: Vec<Option<usize>> = output.outcomes.iter().map(|o| o.hit_rank).collect();
    assert_eq!(ranks, vec![Some(1), Some(3), None, None]);
    assert_eq!(output.outcomes[3].status, OutcomeStatus::Failed);
    assert_eq!(output.outcomes[3].stderr, "boom");

    let summary = &summarize_by_tool(&output.outcomes, 10, FailurePolicy::Exclude)[0];
    assert_eq!(summary.failures, 1);
    assert_eq!(summary.evaluated, 3);
    assert_relative_eq!(summary.hit_at_k, 2.0 / 3.0, epsilon = 1e-9);
    assert_relative_eq!(summary.mrr, (1.0 + 1.0 / 3.0) / 3.0, epsilon = 1e-9);

    let latency = summary.latency.unwrap();
    assert_relative_eq!(latency.p50_ms, 20.0, epsilon = 1e-9);
    assert_relative_eq!(latency.mean_ms, 20.0, epsilon = 1e-9);
}

#[test]
fn test_failures_as_misses_and_cutoff() {
    let fx = fixture();
    let tools: Vec<Box<dyn SearchTool>> = vec![Box::new(scripted(&fx.root))];
    let runner = BenchmarkRunner::new(&tools, &fx.root, RunnerConfig::default());
    let output = runner.run(&fx.queries, &mut Vec::<QueryOutcome>::new()).unwrap();

    let summary = &summarize_by_tool(&output.outcomes, 10, FailurePolicy::CountAsMiss)[0];
    assert_eq!(summary.evaluated, 4);
    assert_relative_eq!(summary.hit_at_k, 0.5, epsilon = 1e-9);
    assert_relative_eq!(summary.mrr, (1.0 + 1.0 / 3.0) / 4.0, epsilon = 1e-9);

    // rank 3 falls outside K=2
    let summary = &summarize_by_tool(&output.outcomes, 2, FailurePolicy::Exclude)[0];
    assert_relative_eq!(summary.hit_at_k, 1.0 / 3.0, epsilon = 1e-9);
    assert_relative_eq!(summary.mrr, 1.0 / 3.0, epsilon = 1e-9);
}

#[test]
fn test_outcome_csv_reaggregates_identically() {
    let fx = fixture();
    let tools: Vec<Box<dyn SearchTool>> = vec![Box::new(scripted(&fx.root))];
    let runner = BenchmarkRunner::new(&tools, &fx.root, RunnerConfig::default());

    let csv_path = fx.root.join("reports/bench.csv");
    let mut sink = CsvSink::create(&csv_path).unwrap();
    let output = runner.run(&fx.queries, &mut sink).unwrap();
    assert_eq!(sink.rows(), 4);
    drop(sink);

    let reread = read_outcomes(&csv_path).unwrap();
    assert_eq!(reread.len(), 4);
    assert_eq!(reread[1].hit_rank, Some(3));
    assert_eq!(reread[3].status, OutcomeStatus::Failed);

    let live = summarize_by_tool(&output.outcomes, 10, FailurePolicy::Exclude);
    let from_csv = summarize_by_tool(&reread, 10, FailurePolicy::Exclude);
    assert_relative_eq!(live[0].hit_at_k, from_csv[0].hit_at_k, epsilon = 1e-9);
    assert_relative_eq!(live[0].mrr, from_csv[0].mrr, epsilon = 1e-9);
}

#[test]
fn test_median_over_runs() {
    let fx = fixture();
    let tools: Vec<Box<dyn SearchTool>> = vec![Box::new(scripted(&fx.root))];
    let runner = BenchmarkRunner::new(&tools, &fx.root, RunnerConfig::default());

    let runs: Vec<_> = (0..3)
        .map(|_| {
            let output = runner.run(&fx.queries, &mut Vec::<QueryOutcome>::new()).unwrap();
            summarize_by_tool(&output.outcomes, 10, FailurePolicy::Exclude)
        })
        .collect();
    let reports = aggregate_by_tool(&runs).unwrap();

    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].runs, 3);
    assert_eq!(reports[0].failures, 3);
    assert_relative_eq!(reports[0].hit_at_k, 2.0 / 3.0, epsilon = 1e-9);
}

#[test]
fn test_keyword_mode_searches_symbol() {
    let fx = fixture();
    let tools: Vec<Box<dyn SearchTool>> = vec![Box::new(scripted(&fx.root))];
    let config = RunnerConfig {
        mode: QueryMode::Keyword,
        ..RunnerConfig::default()
    };
    let runner = BenchmarkRunner::new(&tools, &fx.root, config);
    let output = runner.run(&fx.queries, &mut Vec::<QueryOutcome>::new()).unwrap();

    // "x" is not in the script, so every call fails but is still recorded
    assert_eq!(output.outcomes.len(), 4);
    assert!(output.outcomes.iter().all(|o| o.query == "x" && o.query_type == "keyword"));
    assert!(output.outcomes.iter().all(|o| o.status == OutcomeStatus::Failed));
}

#[cfg(unix)]
#[test]
fn test_sgrep_script_end_to_end() {
    use sgrep_bench::search::SgrepTool;
    use std::os::unix::fs::PermissionsExt;

    let fx = fixture();
    let script = fx.root.join("fake-sgrep");
    fs::write(
        &script,
        "#!/bin/sh\necho '[{\"path\":\"noise.rs\",\"score\":0.9},{\"path\":\"b.rs\",\"score\":0.5}]'\n",
    )
    .unwrap();
    fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();

    let tools: Vec<Box<dyn SearchTool>> =
        vec![Box::new(SgrepTool::new(&script, &fx.root, Duration::from_secs(10)))];
    let runner = BenchmarkRunner::new(&tools, &fx.root, RunnerConfig::default());
    let output = runner.run(&fx.queries, &mut Vec::<QueryOutcome>::new()).unwrap();

    let ranks: Vec<Option<usize>> = output.outcomes.iter().map(|o| o.hit_rank).collect();
    assert_eq!(ranks, vec![None, Some(2), None, None]);
    assert!(output.outcomes.iter().all(|o| o.status == OutcomeStatus::Ok));
    assert!(output.outcomes.iter().all(|o| o.tool == "sgrep"));
}

/// Records every query it is asked and answers with nothing
struct RecordingTool {
    seen: std::sync::Mutex<Vec<String>>,
}

impl SearchTool for RecordingTool {
    fn name(&self) -> &'static str {
        "recording"
    }

    fn search(&self, query: &str, _limit: usize) -> SearchResponse {
        self.seen.lock().unwrap().push(query.to_string());
        SearchResponse {
            results: Vec::new(),
            latency: Duration::from_millis(1),
            status: SearchStatus::Completed,
            exit_code: Some(0),
            stderr: String::new(),
        }
    }
}

fn sent_queries(repo: &Path, queries: &[QueryRecord], mode: QueryMode) -> Vec<(String, String)> {
    let tool = RecordingTool {
        seen: std::sync::Mutex::new(Vec::new()),
    };
    let tools: Vec<Box<dyn SearchTool>> = vec![Box::new(tool)];
    let config = RunnerConfig {
        mode,
        ..RunnerConfig::default()
    };
    let output = BenchmarkRunner::new(&tools, repo, config)
        .run(queries, &mut Vec::<QueryOutcome>::new())
        .unwrap();
    output
        .outcomes
        .into_iter()
        .map(|o| (o.query, o.query_type))
        .collect()
}

#[test]
fn test_semantic_template_set_searches_comment_text() {
    use sgrep_bench::query_set::{self, BuildMode, BuildOptions};

    let temp = TempDir::new().unwrap();
    fs::write(
        temp.path().join("auth.rs"),
        "// Verifies the bearer token against the session store\nfn check_token() {}\n",
    )
    .unwrap();
    let options = BuildOptions {
        mode: BuildMode::Semantic,
        ..BuildOptions::default()
    };
    let queries = query_set::build(temp.path(), &options).unwrap();
    assert_eq!(queries.len(), 1);
    assert_eq!(queries[0].query_text, "code for check token");

    let question = "Where is the code that Verifies the bearer token against the session store?";
    for mode in [QueryMode::Semantic, QueryMode::Mixed] {
        assert_eq!(
            sent_queries(temp.path(), &queries, mode),
            vec![(question.to_string(), "semantic".to_string())],
            "mode {}",
            mode
        );
    }
    assert_eq!(
        sent_queries(temp.path(), &queries, QueryMode::Keyword),
        vec![("check_token".to_string(), "keyword".to_string())]
    );
}
