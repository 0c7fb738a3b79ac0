/// Notebook discovery
///
/// Walks a working tree and returns every `.ipynb` file as a path relative to
/// the tree root, sorted. Hidden directories and Jupyter checkpoint folders
/// are never entered.
use anyhow::{Context, Result};
use glob::Pattern;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

const CHECKPOINT_DIR: &str = ".ipynb_checkpoints";

pub fn discover_notebooks(root: &Path, exclude: &[String]) -> Result<Vec<PathBuf>> {
    let patterns = exclude
        .iter()
        .map(|pattern| {
            Pattern::new(pattern)
                .with_context(|| format!("Invalid exclude pattern: {}", pattern))
        })
        .collect::<Result<Vec<_>>>()?;

    let mut notebooks = Vec::new();
    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !is_hidden(entry));

    for entry in walker {
        let entry = entry.with_context(|| format!("Failed to walk {}", root.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        if entry.path().extension().and_then(|e| e.to_str()) != Some("ipynb") {
            continue;
        }

        let relative = entry
            .path()
            .strip_prefix(root)
            .with_context(|| format!("{} is outside {}", entry.path().display(), root.display()))?
            .to_path_buf();

        let key = relative.to_string_lossy().replace('\\', "/");
        if patterns.iter().any(|p| p.matches(&key)) {
            tracing::debug!("Excluded notebook: {}", key);
            continue;
        }

        notebooks.push(relative);
    }

    notebooks.sort();
    Ok(notebooks)
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .map(|name| name.starts_with('.') || name == CHECKPOINT_DIR)
        .unwrap_or(false)
}
