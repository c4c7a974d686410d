//! Prompt construction for agent tool-call runs

use super::{AgentMode, AgentPreset};

/// Queries asked when no query file is given
pub const DEFAULT_QUERIES: &[&str] = &[
    "where is the websocket connection handled",
    "how does the authentication flow work",
    "where are API routes defined",
    "how is state management implemented",
    "where is the database schema defined",
    "how are errors handled globally",
    "where is the main entry point",
    "how does the caching layer work",
];

/// One agent session to launch
#[derive(Debug, Clone, PartialEq)]
pub struct AgentTask {
    pub queries: Vec<String>,
    pub prompt: String,
}

/// Sessions for a preset: one per query for `PerQuery`, otherwise one for all
pub fn build_tasks(preset: AgentPreset, mode: AgentMode, queries: &[String]) -> Vec<AgentTask> {
    match preset {
        AgentPreset::PerQuery => queries
            .iter()
            .map(|q| AgentTask {
                queries: vec![q.clone()],
                prompt: single_query_prompt(q, mode),
            })
            .collect(),
        AgentPreset::Forced | AgentPreset::Natural => vec![AgentTask {
            queries: queries.to_vec(),
            prompt: session_prompt(preset, mode, queries),
        }],
    }
}

fn single_query_prompt(query: &str, mode: AgentMode) -> String {
    let rules = match mode {
        AgentMode::Sgrep => {
            "Use the semantic_search tool exactly once. \
             Do not run any shell commands and do not read files."
        }
        AgentMode::Rg => {
            "Do NOT use semantic_search or sgrep. \
             Use rg to search for relevant keywords (2-3 rg commands). \
             Then read up to 3 files with sed -n '1,160p'."
        }
    };
    format!("Find: {}. {} Return top 3 file paths.", query, rules)
}

fn session_prompt(preset: AgentPreset, mode: AgentMode, queries: &[String]) -> String {
    let items = queries
        .iter()
        .enumerate()
        .map(|(i, q)| format!("{}. {}", i + 1, q))
        .collect::<Vec<_>>()
        .join("\n");

    let (rules, format) = match (preset, mode) {
        (AgentPreset::Natural, AgentMode::Sgrep) => (
            "Prefer semantic_search first if available, then use rg or read files only if needed. \
             Do not edit files. Keep tool calls minimal. \
             Return only the most relevant file paths for each query.",
            "Q1: <paths>",
        ),
        (AgentPreset::Natural, AgentMode::Rg) => (
            "Do NOT use semantic_search or sgrep. Use rg and read files as needed. \
             Do not edit files. Keep tool calls minimal. \
             Return only the most relevant file paths for each query.",
            "Q1: <paths>",
        ),
        (_, AgentMode::Sgrep) => (
            "For EACH query, use the semantic_search tool exactly once. \
             Do not run any shell commands and do not read files. \
             Return top 3 file paths for each query.",
            "Q1: <path1>, <path2>, <path3>",
        ),
        (_, AgentMode::Rg) => (
            "For EACH query, do NOT use semantic_search or sgrep. \
             Use rg to search (2-3 rg commands). \
             Then read up to 3 files with sed -n '1,160p'. \
             Return top 3 file paths for each query.",
            "Q1: <path1>, <path2>, <path3>",
        ),
    };

    format!(
        "Answer the following queries in order.\nRules: {}\n\nQueries:\n{}\n\nOutput format:\n{}\nQ2: ...",
        rules, items, format
    )
}
