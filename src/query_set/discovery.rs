use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use super::language::Language;

/// Directories never worth indexing
const SKIP_DIRS: &[&str] = &[
    ".git",
    "node_modules",
    "dist",
    "build",
    "target",
    "vendor",
    ".next",
    ".turbo",
    ".cache",
    "__pycache__",
    ".venv",
    "venv",
];

/// File discovery result - path and detected language
#[derive(Debug, Clone)]
pub struct DiscoveredFile {
    pub path: PathBuf,
    pub language: Language,
}

/// Find all indexable source files under `root`, sorted by path
pub fn find_files(root: &Path) -> Vec<DiscoveredFile> {
    let mut files = Vec::new();

    for entry in WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| {
            if e.depth() > 0 && e.file_type().is_dir() {
                if let Some(name) = e.file_name().to_str() {
                    return !SKIP_DIRS.contains(&name);
                }
            }
            true
        })
        .filter_map(|e| e.ok())
    {
        if !entry.file_type().is_file() {
            continue;
        }
        if let Some(language) = Language::from_path(entry.path()) {
            files.push(DiscoveredFile {
                path: entry.path().to_owned(),
                language,
            });
        }
    }

    // Sort files by path for document-order reproducibility
    files.sort_by(|a, b| a.path.cmp(&b.path));

    files
}
