//! Text extraction for query derivation
//!
//! Pure functions over source lines: comment lookup above a definition,
//! standalone comment blocks, and identifier splitting.

use regex::Regex;
use std::sync::OnceLock;

use super::language::Language;

/// Maximum comment lines collected above a definition
const MAX_COMMENT_LINES: usize = 8;

/// Minimum words for a comment attached to a definition
pub const MIN_ATTACHED_COMMENT_WORDS: usize = 3;

/// Minimum words for a standalone comment block to become a query
pub const MIN_BLOCK_COMMENT_WORDS: usize = 5;

/// A comment block with its 1-based line span
#[derive(Debug, Clone, PartialEq)]
pub struct CommentBlock {
    pub start_line: u32,
    pub end_line: u32,
    pub text: String,
}

fn whitespace_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("Invalid whitespace regex"))
}

fn separator_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[_\-]+").expect("Invalid separator regex"))
}

fn lower_upper_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"([a-z0-9])([A-Z])").expect("Invalid camel-case regex"))
}

fn acronym_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"([A-Z]+)([A-Z][a-z])").expect("Invalid acronym regex"))
}

fn collapse_whitespace(text: &str) -> String {
    whitespace_regex().replace_all(text, " ").trim().to_string()
}

fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Strip comment markers from one line of a block comment
fn strip_block_markers(line: &str) -> &str {
    line.trim()
        .trim_start_matches(['/', '*'])
        .trim_end_matches(['*', '/'])
        .trim()
}

/// Strip a line-comment marker, including doc-comment variants (`///`, `//!`, `##`)
fn strip_line_marker<'a>(line: &'a str, marker: &str) -> Option<&'a str> {
    let rest = line.trim().strip_prefix(marker)?;
    let first = marker.chars().next().unwrap_or('/');
    Some(rest.trim_start_matches(first).trim_start_matches('!').trim())
}

/// Attribute/decorator lines allowed between a comment and its definition
fn is_annotation(line: &str) -> bool {
    let t = line.trim();
    t.starts_with("#[") || t.starts_with('@')
}

/// Comment directly above the definition at `idx` (0-based)
///
/// Collects up to 8 consecutive line comments, or one block comment ending
/// just above them. Blank lines and annotations between the definition and
/// the comment are skipped. Comments shorter than 3 words are ignored.
pub fn attached_comment(lines: &[&str], idx: usize, lang: Language) -> Option<String> {
    let marker = lang.line_comment();
    let mut collected: Vec<String> = Vec::new();
    let mut i = idx;

    while i > 0 && collected.len() < MAX_COMMENT_LINES {
        i -= 1;
        let line = lines[i];
        let trimmed = line.trim();

        if trimmed.is_empty() || (collected.is_empty() && is_annotation(line)) {
            if !collected.is_empty() {
                break;
            }
            continue;
        }

        if let Some(text) = strip_line_marker(line, marker) {
            collected.insert(0, text.to_string());
            continue;
        }

        if lang.has_block_comments() && trimmed.ends_with("*/") {
            let mut block = Vec::new();
            let mut j = i as isize;
            while j >= 0 {
                let l = lines[j as usize];
                block.insert(0, strip_block_markers(l).to_string());
                if l.trim().starts_with("/*") {
                    break;
                }
                j -= 1;
            }
            let block_text = block.join(" ").trim().to_string();
            if !block_text.is_empty() {
                collected.insert(0, block_text);
            }
        }
        break;
    }

    if collected.is_empty() {
        return None;
    }
    let text = collapse_whitespace(&collected.join(" "));
    if word_count(&text) < MIN_ATTACHED_COMMENT_WORDS {
        return None;
    }
    Some(text)
}

/// All comment blocks in a file: runs of line comments and `/* */` blocks
pub fn comment_blocks(lines: &[&str], lang: Language) -> Vec<CommentBlock> {
    let marker = lang.line_comment();
    let mut blocks = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i];

        if strip_line_marker(line, marker).is_some() {
            let start = i;
            let mut texts = Vec::new();
            while i < lines.len() {
                match strip_line_marker(lines[i], marker) {
                    Some(text) => texts.push(text),
                    None => break,
                }
                i += 1;
            }
            let text = collapse_whitespace(&texts.join(" "));
            if !text.is_empty() {
                blocks.push(CommentBlock {
                    start_line: start as u32 + 1,
                    end_line: i as u32,
                    text,
                });
            }
            continue;
        }

        // Only blocks that open a line; `"src/*.rs"` inside code is not a comment
        if lang.has_block_comments() && line.trim_start().starts_with("/*") {
            if let Some(open) = line.find("/*") {
                let start = i;
                let after_open = &line[open + 2..];
                let mut texts: Vec<&str> = Vec::new();

                if let Some(close) = after_open.find("*/") {
                    texts.push(&after_open[..close]);
                    i += 1;
                } else {
                    texts.push(after_open);
                    i += 1;
                    while i < lines.len() {
                        let l = lines[i];
                        i += 1;
                        if let Some(close) = l.find("*/") {
                            texts.push(&l[..close]);
                            break;
                        }
                        texts.push(l);
                    }
                }

                let text = collapse_whitespace(
                    &texts
                        .iter()
                        .map(|t| strip_block_markers(t))
                        .filter(|t| !t.is_empty())
                        .collect::<Vec<_>>()
                        .join(" "),
                );
                if !text.is_empty() {
                    blocks.push(CommentBlock {
                        start_line: start as u32 + 1,
                        end_line: i as u32,
                        text,
                    });
                }
                continue;
            }
        }

        i += 1;
    }

    blocks
}

/// Whether a comment block is long enough to serve as a query
pub fn is_query_worthy(block: &CommentBlock) -> bool {
    word_count(&block.text) >= MIN_BLOCK_COMMENT_WORDS
}

/// Split an identifier into lower-case words joined by spaces
///
/// `getUserByEmail` -> `get user by email`, `HTTPResponse_code` ->
/// `http response code`. Returns `None` for fewer than two words.
pub fn identifier_to_phrase(symbol: &str) -> Option<String> {
    let spaced = separator_regex().replace_all(symbol, " ");
    let mut tokens = Vec::new();
    for part in spaced.split_whitespace() {
        let split = lower_upper_regex().replace_all(part, "${1} ${2}");
        let split = acronym_regex().replace_all(&split, "${1} ${2}");
        tokens.extend(split.split_whitespace().map(|t| t.to_lowercase()));
    }
    if tokens.len() < 2 {
        return None;
    }
    Some(tokens.join(" "))
}

/// Remove the symbol's own name from comment text
///
/// Keeps the query from trivially containing the identifier it targets.
pub fn strip_symbol(text: &str, symbol: &str) -> String {
    if symbol.is_empty() {
        return collapse_whitespace(text);
    }
    let pattern = format!("(?i){}", regex::escape(symbol));
    let without = match Regex::new(&pattern) {
        Ok(re) => re.replace_all(text, "").into_owned(),
        Err(_) => text.to_string(),
    };
    collapse_whitespace(&without)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(src: &str) -> Vec<&str> {
        src.lines().collect()
    }

    #[test]
    fn test_identifier_to_phrase() {
        assert_eq!(identifier_to_phrase("getUserByEmail").as_deref(), Some("get user by email"));
        assert_eq!(identifier_to_phrase("parse_config_file").as_deref(), Some("parse config file"));
        assert_eq!(identifier_to_phrase("HTTPResponse").as_deref(), Some("http response"));
        assert_eq!(identifier_to_phrase("load-env-vars").as_deref(), Some("load env vars"));
        assert_eq!(identifier_to_phrase("utf8Decode").as_deref(), Some("utf8 decode"));
        assert_eq!(identifier_to_phrase("main"), None);
        assert_eq!(identifier_to_phrase(""), None);
    }

    #[test]
    fn test_attached_line_comments() {
        let src = lines(
            "use x;\n\n/// Opens the websocket connection\n/// and retries on failure.\n#[inline]\npub fn connect() {}\n",
        );
        let comment = attached_comment(&src, 5, Language::Rust);
        assert_eq!(
            comment.as_deref(),
            Some("Opens the websocket connection and retries on failure.")
        );
    }

    #[test]
    fn test_attached_block_comment() {
        let src = lines("/**\n * Validates the session token\n * against the cache.\n */\nfunction check() {}\n");
        let comment = attached_comment(&src, 4, Language::JavaScript);
        assert_eq!(
            comment.as_deref(),
            Some("Validates the session token against the cache.")
        );
    }

    #[test]
    fn test_attached_comment_too_short() {
        let src = lines("# helper\ndef run():\n");
        assert_eq!(attached_comment(&src, 1, Language::Python), None);
    }

    #[test]
    fn test_attached_comment_stops_at_code() {
        let src = lines("x = 1\ndef run():\n");
        assert_eq!(attached_comment(&src, 1, Language::Python), None);
    }

    #[test]
    fn test_comment_blocks() {
        let src = lines(
            "// Reads the whole config file\n// into memory at startup.\nlet a = 1;\n/* one line block comment here */\n/*\n * Multi line block\n * comment body\n */\nfn x() {}\n",
        );
        let blocks = comment_blocks(&src, Language::Rust);

        assert_eq!(blocks.len(), 3);
        assert_eq!(
            blocks[0],
            CommentBlock {
                start_line: 1,
                end_line: 2,
                text: "Reads the whole config file into memory at startup.".to_string(),
            }
        );
        assert_eq!(blocks[1].start_line, 4);
        assert_eq!(blocks[1].end_line, 4);
        assert_eq!(blocks[1].text, "one line block comment here");
        assert_eq!(blocks[2].start_line, 5);
        assert_eq!(blocks[2].end_line, 8);
        assert_eq!(blocks[2].text, "Multi line block comment body");
    }

    #[test]
    fn test_query_worthy() {
        let block = CommentBlock {
            start_line: 1,
            end_line: 1,
            text: "too short here".to_string(),
        };
        assert!(!is_query_worthy(&block));
    }

    #[test]
    fn test_strip_symbol() {
        assert_eq!(
            strip_symbol("LoadConfig reads the config and loadconfig caches it", "loadConfig"),
            "reads the config and caches it"
        );
    }
}
