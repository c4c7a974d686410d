//! Query set module - derive benchmark queries from a repository
//!
//! Public interface:
//! - `build()` - scan a repo and produce a bounded, deterministic query set
//! - `load()` / `save()` - newline-delimited JSON query set files
//! - `QueryRecord` - one query with its ground-truth target
//!
//! Extraction details (languages, comment parsing, identifier splitting)
//! are internal.

mod discovery;
mod extract;
mod internal;
mod language;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::config::SamplePolicy;
use crate::error::Result;

pub use extract::identifier_to_phrase;
pub use language::Language;

/// Inclusive 1-based line span, serialized as `[start, end]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "(u32, u32)", into = "(u32, u32)")]
pub struct LineRange {
    pub start: u32,
    pub end: u32,
}

impl LineRange {
    pub fn new(start: u32, end: u32) -> Self {
        Self {
            start: start.min(end),
            end: start.max(end),
        }
    }

    pub fn single(line: u32) -> Self {
        Self::new(line, line)
    }

    pub fn overlaps(&self, other: &LineRange) -> bool {
        self.start <= other.end && other.start <= self.end
    }
}

impl From<(u32, u32)> for LineRange {
    fn from((start, end): (u32, u32)) -> Self {
        Self::new(start, end)
    }
}

impl From<LineRange> for (u32, u32) {
    fn from(range: LineRange) -> Self {
        (range.start, range.end)
    }
}

/// Where a query's text came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuerySource {
    Identifier,
    Comment,
}

/// An additional acceptable answer (gold query sets)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Target {
    pub path: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_range: Option<LineRange>,
}

/// One benchmark query with its ground truth
///
/// Immutable once built. `query_text` is always present; `comment_text`
/// and `keyword` carry the alternative phrasings used by the semantic-only
/// and keyword benchmark modes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryRecord {
    pub id: String,
    pub query_text: String,
    pub target_file: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_line_range: Option<LineRange>,
    pub source: QuerySource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    /// Defined symbol for identifier-derived queries
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    /// Literal text for keyword search (the symbol itself)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keyword: Option<String>,
    /// Natural-language text taken from source comments
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment_text: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub alternate_targets: Vec<Target>,
}

impl QueryRecord {
    /// All acceptable targets, primary first
    pub fn targets(&self) -> Vec<Target> {
        let mut targets = vec![Target {
            path: self.target_file.clone(),
            line_range: self.target_line_range,
        }];
        targets.extend(self.alternate_targets.iter().cloned());
        targets
    }

    /// Whether the query carries natural language beyond the bare symbol
    pub fn has_natural_text(&self) -> bool {
        self.comment_text.is_some() || self.keyword.as_deref() != Some(self.query_text.as_str())
    }
}

/// How queries are derived from source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildMode {
    /// Definitions; text from the attached comment, else the split identifier
    Symbols,
    /// Standalone comment blocks of five or more words
    Comments,
    /// Definitions; text is `code for <split identifier>`
    Semantic,
}

/// Options for query set construction
#[derive(Debug, Clone)]
pub struct BuildOptions {
    pub max_items: usize,
    pub mode: BuildMode,
    pub sample: SamplePolicy,
    pub seed: Option<u64>,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            max_items: 100,
            mode: BuildMode::Symbols,
            sample: SamplePolicy::Document,
            seed: None,
        }
    }
}

/// Scan `repo` and build at most `options.max_items` query records
///
/// Fails with `Config` for a zero `max_items`, then `RepoNotFound`,
/// `NoIndexableFiles`, or `EmptyQuerySet`.
pub fn build(repo: &Path, options: &BuildOptions) -> Result<Vec<QueryRecord>> {
    internal::build(repo, options)
}

/// Load a newline-delimited JSON query set
///
/// Accepts the records written by `save()` as well as gold files using
/// `query` / `answers: [{path, start_line, end_line}]`.
pub fn load(path: &Path) -> Result<Vec<QueryRecord>> {
    internal::load(path)
}

/// `Where is the code that <comment>?`, the question built from a source comment
pub fn comment_question(comment: &str) -> String {
    internal::as_question(comment)
}

/// Write records as newline-delimited JSON, creating parent directories
pub fn save(path: &Path, records: &[QueryRecord]) -> Result<()> {
    internal::save(path, records)
}
