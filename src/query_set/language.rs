//! Source languages the query set builder understands

use regex::Regex;
use std::collections::HashMap;
use std::path::Path;
use std::sync::OnceLock;

/// Languages with definition patterns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    Python,
    JavaScript,
    TypeScript,
    Go,
    Rust,
    Java,
    Kotlin,
    CSharp,
    C,
    Cpp,
    ObjC,
    Swift,
    Ruby,
    Php,
}

impl Language {
    pub const ALL: [Language; 14] = [
        Language::Python,
        Language::JavaScript,
        Language::TypeScript,
        Language::Go,
        Language::Rust,
        Language::Java,
        Language::Kotlin,
        Language::CSharp,
        Language::C,
        Language::Cpp,
        Language::ObjC,
        Language::Swift,
        Language::Ruby,
        Language::Php,
    ];

    /// Detect language from file extension (case-insensitive)
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "py" => Some(Language::Python),
            "js" | "jsx" => Some(Language::JavaScript),
            "ts" | "tsx" => Some(Language::TypeScript),
            "go" => Some(Language::Go),
            "rs" => Some(Language::Rust),
            "java" => Some(Language::Java),
            "kt" => Some(Language::Kotlin),
            "cs" => Some(Language::CSharp),
            "c" | "h" => Some(Language::C),
            "cc" | "cpp" | "hpp" => Some(Language::Cpp),
            "m" | "mm" => Some(Language::ObjC),
            "swift" => Some(Language::Swift),
            "rb" => Some(Language::Ruby),
            "php" => Some(Language::Php),
            _ => None,
        }
    }

    /// Name used in query set records
    pub fn name(&self) -> &'static str {
        match self {
            Language::Python => "python",
            Language::JavaScript => "javascript",
            Language::TypeScript => "typescript",
            Language::Go => "go",
            Language::Rust => "rust",
            Language::Java => "java",
            Language::Kotlin => "kotlin",
            Language::CSharp => "csharp",
            Language::C => "c",
            Language::Cpp => "cpp",
            Language::ObjC => "objc",
            Language::Swift => "swift",
            Language::Ruby => "ruby",
            Language::Php => "php",
        }
    }

    /// Line comment marker
    pub fn line_comment(&self) -> &'static str {
        match self {
            Language::Python | Language::Ruby => "#",
            _ => "//",
        }
    }

    /// Whether `/* ... */` block comments exist
    pub fn has_block_comments(&self) -> bool {
        !matches!(self, Language::Python | Language::Ruby)
    }

    /// Compiled single-line definition patterns; group 1 is the symbol
    pub fn definition_patterns(&self) -> &'static [Regex] {
        static COMPILED: OnceLock<HashMap<Language, Vec<Regex>>> = OnceLock::new();
        COMPILED
            .get_or_init(|| {
                Language::ALL
                    .iter()
                    .map(|lang| {
                        let patterns = pattern_sources(*lang)
                            .iter()
                            .map(|p| Regex::new(p).expect("Invalid definition pattern"))
                            .collect();
                        (*lang, patterns)
                    })
                    .collect()
            })
            .get(self)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// First symbol defined on `line`, if any
    pub fn match_definition<'a>(&self, line: &'a str) -> Option<&'a str> {
        self.definition_patterns()
            .iter()
            .find_map(|re| re.captures(line).and_then(|c| c.get(1)))
            .map(|m| m.as_str())
    }
}

const IDENT: &str = "[A-Za-z_][A-Za-z0-9_]*";

fn pattern_sources(lang: Language) -> Vec<String> {
    let js_like = [
        format!(r"^\s*(?:export\s+)?(?:async\s+)?function\s+({IDENT})\s*\("),
        format!(r"^\s*(?:export\s+)?class\s+({IDENT})\b"),
        format!(r"^\s*(?:export\s+)?const\s+({IDENT})\s*=\s*(?:async\s+)?\("),
        format!(r"^\s*(?:export\s+)?const\s+({IDENT})\s*=\s*(?:async\s+)?\([^)]*\)\s*=>"),
    ];
    match lang {
        Language::Python => vec![
            format!(r"^\s*def\s+({IDENT})\s*\("),
            format!(r"^\s*class\s+({IDENT})\b"),
        ],
        Language::JavaScript => js_like.to_vec(),
        Language::TypeScript => {
            let mut patterns = js_like.to_vec();
            patterns.push(format!(r"^\s*(?:export\s+)?interface\s+({IDENT})\b"));
            patterns
        }
        Language::Go => vec![
            format!(r"^\s*func\s+(?:\([^)]*\)\s*)?({IDENT})\s*\("),
            format!(r"^\s*type\s+({IDENT})\s+struct\b"),
            format!(r"^\s*type\s+({IDENT})\s+interface\b"),
        ],
        Language::Rust => vec![
            format!(r"^\s*(?:pub(?:\([^)]*\))?\s+)?(?:async\s+)?(?:unsafe\s+)?fn\s+({IDENT})\s*[<(]"),
            format!(r"^\s*(?:pub(?:\([^)]*\))?\s+)?struct\s+({IDENT})\b"),
            format!(r"^\s*(?:pub(?:\([^)]*\))?\s+)?enum\s+({IDENT})\b"),
            format!(r"^\s*(?:pub(?:\([^)]*\))?\s+)?trait\s+({IDENT})\b"),
        ],
        Language::Java => vec![
            format!(r"^\s*(?:public\s+|private\s+|protected\s+)?(?:abstract\s+|final\s+)?class\s+({IDENT})\b"),
            format!(r"^\s*(?:public\s+)?interface\s+({IDENT})\b"),
        ],
        Language::Kotlin => vec![
            format!(r"^\s*(?:data\s+)?class\s+({IDENT})\b"),
            format!(r"^\s*fun\s+({IDENT})\s*\("),
        ],
        Language::CSharp => vec![
            format!(r"^\s*(?:public|private|internal|protected)?\s*class\s+({IDENT})\b"),
            format!(r"^\s*(?:public|private|internal|protected)?\s*interface\s+({IDENT})\b"),
        ],
        Language::C => vec![format!(
            r"^\s*[A-Za-z_][A-Za-z0-9_\*\s]+\s+\**({IDENT})\s*\([^;]*\)\s*\{{"
        )],
        Language::Cpp => vec![
            format!(r"^\s*[A-Za-z_][A-Za-z0-9_:<>\*\s]+\s+\**({IDENT})\s*\([^;]*\)\s*\{{"),
            format!(r"^\s*class\s+({IDENT})\b"),
            format!(r"^\s*struct\s+({IDENT})\b"),
        ],
        Language::ObjC => vec![
            format!(r"^\s*[-+]\s*\([^)]*\)\s*({IDENT})\b"),
            format!(r"^\s*@interface\s+({IDENT})\b"),
        ],
        Language::Swift => vec![
            format!(r"^\s*(?:public\s+|private\s+)?func\s+({IDENT})\s*[<(]"),
            format!(r"^\s*(?:public\s+|final\s+)?class\s+({IDENT})\b"),
            format!(r"^\s*(?:public\s+)?struct\s+({IDENT})\b"),
        ],
        Language::Ruby => vec![
            r"^\s*def\s+(?:self\.)?([A-Za-z_][A-Za-z0-9_!?]*)".to_string(),
            format!(r"^\s*class\s+({IDENT})\b"),
            format!(r"^\s*module\s+({IDENT})\b"),
        ],
        Language::Php => vec![
            format!(r"^\s*(?:public\s+|private\s+|protected\s+)?(?:static\s+)?function\s+({IDENT})\s*\("),
            format!(r"^\s*(?:abstract\s+|final\s+)?class\s+({IDENT})\b"),
        ],
    }
}
