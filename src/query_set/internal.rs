//! Internal implementation for query_set module

use serde::Deserialize;
use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use super::discovery::{self, DiscoveredFile};
use super::extract::{self, attached_comment, comment_blocks, identifier_to_phrase, strip_symbol};
use super::{BuildMode, BuildOptions, LineRange, QueryRecord, QuerySource, Target};
use crate::config::SamplePolicy;
use crate::error::{BenchError, Result};

// =============================================================================
// Building
// =============================================================================

pub fn build(repo: &Path, options: &BuildOptions) -> Result<Vec<QueryRecord>> {
    if options.max_items == 0 {
        return Err(BenchError::Config("max_items must be at least 1".to_string()));
    }
    if !repo.is_dir() {
        return Err(BenchError::RepoNotFound(repo.to_path_buf()));
    }
    let root = repo.canonicalize()?;

    let files = discovery::find_files(&root);
    if files.is_empty() {
        return Err(BenchError::NoIndexableFiles(root));
    }
    tracing::info!(files = files.len(), repo = %root.display(), "scanning repository");

    let max_items = options.max_items;
    // Document order stops early; random sampling needs the whole population
    let cap = match options.sample {
        SamplePolicy::Document => Some(max_items.saturating_mul(3)),
        SamplePolicy::Random => None,
    };

    let mut candidates = Vec::new();
    for file in &files {
        if cap.is_some_and(|c| candidates.len() >= c) {
            break;
        }
        let content = match fs::read(&file.path) {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(e) => {
                tracing::warn!(path = %file.path.display(), error = %e, "skipping unreadable file");
                continue;
            }
        };
        let lines: Vec<&str> = content.lines().collect();

        match options.mode {
            BuildMode::Comments => collect_comment_records(file, &lines, &mut candidates),
            BuildMode::Symbols | BuildMode::Semantic => {
                collect_symbol_records(file, &lines, options.mode, &mut candidates)
            }
        }
    }

    if let Some(c) = cap {
        candidates.truncate(c);
    }

    if options.sample == SamplePolicy::Random {
        let mut rng = match options.seed {
            Some(seed) => fastrand::Rng::with_seed(seed),
            None => fastrand::Rng::new(),
        };
        rng.shuffle(&mut candidates);
    }

    let records = select(candidates, max_items);
    if records.is_empty() {
        return Err(BenchError::EmptyQuerySet(format!(
            "no queries could be derived from {}",
            root.display()
        )));
    }

    tracing::info!(records = records.len(), "query set built");
    Ok(records)
}

/// Natural-language records first, then keyword-only, capped and numbered
fn select(candidates: Vec<QueryRecord>, max_items: usize) -> Vec<QueryRecord> {
    let (natural, keyword_only): (Vec<_>, Vec<_>) =
        candidates.into_iter().partition(QueryRecord::has_natural_text);

    natural
        .into_iter()
        .chain(keyword_only)
        .take(max_items)
        .enumerate()
        .map(|(i, mut record)| {
            record.id = format!("q{:04}", i);
            record
        })
        .collect()
}

fn collect_comment_records(file: &DiscoveredFile, lines: &[&str], out: &mut Vec<QueryRecord>) {
    for block in comment_blocks(lines, file.language) {
        if !extract::is_query_worthy(&block) {
            continue;
        }
        out.push(QueryRecord {
            id: String::new(),
            query_text: block.text.clone(),
            target_file: file.path.clone(),
            target_line_range: Some(LineRange::new(block.start_line, block.end_line)),
            source: QuerySource::Comment,
            language: Some(file.language.name().to_string()),
            symbol: None,
            keyword: None,
            comment_text: Some(block.text),
            alternate_targets: Vec::new(),
        });
    }
}

fn collect_symbol_records(
    file: &DiscoveredFile,
    lines: &[&str],
    mode: BuildMode,
    out: &mut Vec<QueryRecord>,
) {
    let mut seen: HashSet<&str> = HashSet::new();

    for (idx, line) in lines.iter().enumerate() {
        let Some(symbol) = file.language.match_definition(line) else {
            continue;
        };
        // Overloads and re-declarations point at the same query
        if !seen.insert(symbol) {
            continue;
        }

        let comment = attached_comment(lines, idx, file.language)
            .map(|c| strip_symbol(&c, symbol))
            .filter(|c| !c.is_empty());
        let phrase = identifier_to_phrase(symbol);

        let query_text = match mode {
            BuildMode::Semantic => phrase.as_ref().map(|p| format!("code for {}", p)),
            _ => comment
                .as_deref()
                .map(as_question)
                .or_else(|| phrase.as_deref().map(as_question)),
        }
        .unwrap_or_else(|| symbol.to_string());

        out.push(QueryRecord {
            id: String::new(),
            query_text,
            target_file: file.path.clone(),
            target_line_range: Some(LineRange::single(idx as u32 + 1)),
            source: QuerySource::Identifier,
            language: Some(file.language.name().to_string()),
            symbol: Some(symbol.to_string()),
            keyword: Some(symbol.to_string()),
            comment_text: comment,
            alternate_targets: Vec::new(),
        });
    }
}

pub fn as_question(text: &str) -> String {
    let body = text.trim().trim_end_matches(['.', ':', ';', '?']);
    format!("Where is the code that {}?", body)
}

// =============================================================================
// JSONL I/O
// =============================================================================

/// Tolerant on-disk shape; older harness files use different field names
#[derive(Debug, Deserialize)]
struct RawRecord {
    #[serde(default)]
    id: Option<String>,
    #[serde(default, alias = "query", alias = "query_semantic")]
    query_text: Option<String>,
    #[serde(default, alias = "file")]
    target_file: Option<PathBuf>,
    #[serde(default)]
    target_line_range: Option<LineRange>,
    #[serde(default)]
    line: Option<u32>,
    #[serde(default)]
    source: Option<QuerySource>,
    #[serde(default, alias = "lang")]
    language: Option<String>,
    #[serde(default)]
    symbol: Option<String>,
    #[serde(default, alias = "query_keyword")]
    keyword: Option<String>,
    #[serde(default, alias = "comment")]
    comment_text: Option<String>,
    #[serde(default)]
    alternate_targets: Vec<Target>,
    #[serde(default)]
    answers: Vec<RawAnswer>,
}

#[derive(Debug, Deserialize)]
struct RawAnswer {
    path: PathBuf,
    #[serde(default)]
    start_line: Option<u32>,
    #[serde(default)]
    end_line: Option<u32>,
}

impl RawAnswer {
    fn into_target(self) -> Target {
        let line_range = match (self.start_line, self.end_line) {
            (Some(s), Some(e)) => Some(LineRange::new(s, e)),
            (Some(l), None) | (None, Some(l)) => Some(LineRange::single(l)),
            (None, None) => None,
        };
        Target {
            path: self.path,
            line_range,
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl RawRecord {
    fn into_record(self, index: usize) -> std::result::Result<QueryRecord, String> {
        let symbol = non_empty(self.symbol);
        let keyword = non_empty(self.keyword);
        let comment_text = non_empty(self.comment_text);

        let query_text = non_empty(self.query_text)
            .or_else(|| comment_text.clone())
            .or_else(|| keyword.clone())
            .ok_or_else(|| "record has no query text".to_string())?;

        let mut answers = self.answers.into_iter().map(RawAnswer::into_target);
        let (target_file, target_line_range, mut alternate_targets) = match self.target_file {
            Some(path) => (
                path,
                self.target_line_range.or(self.line.map(LineRange::single)),
                Vec::new(),
            ),
            None => {
                let first = answers
                    .next()
                    .ok_or_else(|| "record has no target file".to_string())?;
                (first.path, first.line_range, Vec::new())
            }
        };
        alternate_targets.extend(answers);
        alternate_targets.extend(self.alternate_targets);

        let source = self.source.unwrap_or(if symbol.is_some() || keyword.is_some() {
            QuerySource::Identifier
        } else {
            QuerySource::Comment
        });

        Ok(QueryRecord {
            id: non_empty(self.id).unwrap_or_else(|| format!("q{:04}", index)),
            query_text,
            target_file,
            target_line_range,
            source,
            language: non_empty(self.language),
            symbol,
            keyword,
            comment_text,
            alternate_targets,
        })
    }
}

pub fn load(path: &Path) -> Result<Vec<QueryRecord>> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let mut records = Vec::new();

    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let invalid = |message: String| BenchError::InvalidQueryRecord {
            path: path.to_path_buf(),
            line: i + 1,
            message,
        };
        let raw: RawRecord = serde_json::from_str(&line).map_err(|e| invalid(e.to_string()))?;
        let record = raw.into_record(records.len()).map_err(invalid)?;
        records.push(record);
    }

    if records.is_empty() {
        return Err(BenchError::EmptyQuerySet(format!(
            "{} contains no records",
            path.display()
        )));
    }
    Ok(records)
}

pub fn save(path: &Path, records: &[QueryRecord]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let mut writer = BufWriter::new(File::create(path)?);
    for record in records {
        serde_json::to_writer(&mut writer, record)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}
