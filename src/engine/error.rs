use thiserror::Error;

use super::types::TypeToken;

/// Per-notebook conversion failures.
///
/// These abort the conversion of one notebook; the batch logs them and
/// carries on with the next notebook.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConvertError {
    #[error("syntax error at line {line}, column {column}{}", cell_suffix(.cell))]
    Syntax {
        line: usize,
        column: usize,
        cell: Option<usize>,
    },

    #[error("unsupported pattern for '{name}' at line {line}: {reason}")]
    UnsupportedPattern {
        name: String,
        line: usize,
        reason: String,
    },

    #[error("'{name}' is annotated as {first} and as {second} (line {line})")]
    ConflictingAnnotation {
        name: String,
        first: TypeToken,
        second: TypeToken,
        line: usize,
    },

    #[error("role of '{0}' was already classified")]
    RoleAlreadyAssigned(String),

    #[error("'{0}' reached the rewriter without a role")]
    Unclassified(String),

    #[error("Python parser unavailable: {0}")]
    Parser(String),

    #[error("invalid notebook: {0}")]
    Notebook(String),
}

fn cell_suffix(cell: &Option<usize>) -> String {
    match cell {
        Some(index) => format!(" (code cell {})", index + 1),
        None => String::new(),
    }
}

impl ConvertError {
    /// Short machine-readable reason, used in skip summaries and logs
    pub fn kind(&self) -> &'static str {
        match self {
            ConvertError::Syntax { .. } => "SyntaxError",
            ConvertError::UnsupportedPattern { .. } => "UnsupportedPatternError",
            ConvertError::ConflictingAnnotation { .. } => "ConflictingAnnotation",
            ConvertError::RoleAlreadyAssigned(_) | ConvertError::Unclassified(_) => {
                "ClassificationError"
            }
            ConvertError::Parser(_) => "ParserError",
            ConvertError::Notebook(_) => "NotebookError",
        }
    }
}
