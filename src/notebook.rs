/// Notebook reader
///
/// Loads nbformat v4 notebooks and returns the code cells as plain Python.
/// Interactive directives that only make sense inside a kernel are stripped
/// on the way: line magics, shell escapes, help queries and whole cell-magic
/// cells.
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::engine::ConvertError;

#[derive(Debug, Deserialize)]
struct RawNotebook {
    #[serde(default)]
    nbformat: Option<u32>,
    #[serde(default)]
    metadata: RawMetadata,
    #[serde(default)]
    cells: Vec<RawCell>,
}

#[derive(Debug, Default, Deserialize)]
struct RawMetadata {
    #[serde(default)]
    kernelspec: Option<RawKernelSpec>,
    #[serde(default)]
    language_info: Option<RawLanguageInfo>,
}

#[derive(Debug, Deserialize)]
struct RawKernelSpec {
    #[serde(default)]
    language: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawLanguageInfo {
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawCell {
    cell_type: String,
    #[serde(default)]
    source: CellSource,
}

/// nbformat allows the cell source as one string or as a list of lines
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CellSource {
    Text(String),
    Lines(Vec<String>),
}

impl Default for CellSource {
    fn default() -> Self {
        CellSource::Text(String::new())
    }
}

impl CellSource {
    fn into_text(self) -> String {
        match self {
            CellSource::Text(text) => text,
            CellSource::Lines(lines) => lines.concat(),
        }
    }
}

/// A notebook's code, ready for the engine
#[derive(Debug, Clone)]
pub struct Notebook {
    pub path: PathBuf,
    pub code_cells: Vec<String>,
}

/// Read and parse a notebook file
pub fn read_notebook(path: &Path) -> Result<Notebook, ConvertError> {
    let content = fs::read_to_string(path)
        .map_err(|e| ConvertError::Notebook(format!("{}: {}", path.display(), e)))?;
    let code_cells = parse_notebook(&content)?;
    Ok(Notebook {
        path: path.to_path_buf(),
        code_cells,
    })
}

/// Extract the code cells of a notebook document
pub fn parse_notebook(content: &str) -> Result<Vec<String>, ConvertError> {
    let raw: RawNotebook =
        serde_json::from_str(content).map_err(|e| ConvertError::Notebook(e.to_string()))?;

    if let Some(version) = raw.nbformat {
        if version < 4 {
            return Err(ConvertError::Notebook(format!(
                "nbformat {} is not supported, expected 4",
                version
            )));
        }
    }

    let language = raw
        .metadata
        .kernelspec
        .and_then(|spec| spec.language)
        .or_else(|| raw.metadata.language_info.and_then(|info| info.name));
    if let Some(language) = language {
        if !language.eq_ignore_ascii_case("python") {
            return Err(ConvertError::Notebook(format!(
                "kernel language '{}' is not Python",
                language
            )));
        }
    }

    Ok(raw
        .cells
        .into_iter()
        .filter(|cell| cell.cell_type == "code")
        .filter_map(|cell| strip_directives(&cell.source.into_text()))
        .collect())
}

/// Remove IPython-only syntax from a cell. Cell magics drop the whole cell.
///
/// Stripped lines become blank (or `pass` inside a block) so line numbers
/// stay aligned with the notebook.
fn strip_directives(cell: &str) -> Option<String> {
    if cell.trim_start().starts_with("%%") {
        return None;
    }

    let lines: Vec<String> = cell
        .split('\n')
        .map(|line| {
            let trimmed = line.trim_start();
            if is_directive(trimmed.trim_end()) {
                let indent = &line[..line.len() - trimmed.len()];
                if indent.is_empty() {
                    String::new()
                } else {
                    format!("{}pass", indent)
                }
            } else {
                line.to_string()
            }
        })
        .collect();

    Some(lines.join("\n"))
}

fn is_directive(line: &str) -> bool {
    if line.starts_with('%') || line.starts_with('!') {
        return true;
    }
    // `obj?`, `obj??`, `?obj`
    if let Some(rest) = line.strip_prefix('?') {
        return is_help_target(rest.trim_start_matches('?'));
    }
    if let Some(rest) = line.strip_suffix('?') {
        return is_help_target(rest.trim_end_matches('?'));
    }
    false
}

fn is_help_target(text: &str) -> bool {
    !text.is_empty()
        && text
            .chars()
            .all(|c| c.is_alphanumeric() || c == '_' || c == '.' || c == '*')
}
