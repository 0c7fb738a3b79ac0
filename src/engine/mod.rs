//! Annotation extraction and tool synthesis
//!
//! Flatten → parse → scan → classify → {rewrite, synthesize}. Every stage is
//! synchronous and works on one notebook; the batch layer runs notebooks in
//! parallel.

pub mod classify;
pub mod descriptor;
pub mod error;
pub mod flatten;
pub mod parse;
pub mod rewrite;
pub mod scan;
pub mod types;

use tracing::{debug, warn};

pub use classify::{Diagnostic, Role};
pub use descriptor::{ContainerRef, DescriptorBatch, DescriptorError, ToolDescriptor};
pub use error::ConvertError;
pub use rewrite::ConvertedScript;
pub use scan::AnnotatedVariable;
pub use types::TypeToken;

/// Why a notebook produced no tool
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    NoAnnotationsFound,
    Failed(ConvertError),
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::NoAnnotationsFound => f.write_str("no annotated variables found"),
            SkipReason::Failed(err) => write!(f, "{}: {}", err.kind(), err),
        }
    }
}

/// Result of converting one notebook
#[derive(Debug, Clone)]
pub struct ConvertedNotebook {
    pub script: ConvertedScript,
    pub descriptor: ToolDescriptor,
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Debug, Clone)]
pub enum Conversion {
    Converted(Box<ConvertedNotebook>),
    Skipped(SkipReason),
}

/// Knobs the engine takes from configuration
#[derive(Debug, Clone, Default)]
pub struct EngineOptions {
    /// Modules whose imports are dropped from generated programs
    pub annotation_modules: Vec<String>,
}

/// Convert the code cells of one notebook.
///
/// `entry_command` is the path the generated program will have inside the
/// image. Notebooks without annotated variables are skipped, not failed.
pub fn convert_cells<S: AsRef<str>>(
    cells: &[S],
    entry_command: &str,
    options: &EngineOptions,
) -> Result<Conversion, ConvertError> {
    let flat = flatten::flatten(cells);
    if flat.is_empty() {
        return Ok(Conversion::Skipped(SkipReason::NoAnnotationsFound));
    }

    let module = parse::parse_module(&flat.source).map_err(|err| match err {
        ConvertError::Syntax { line, column, .. } => ConvertError::Syntax {
            line,
            column,
            cell: flat.cell_for_line(line.saturating_sub(1)),
        },
        other => other,
    })?;

    let mut variables = scan::scan(&module)?;
    if variables.is_empty() {
        return Ok(Conversion::Skipped(SkipReason::NoAnnotationsFound));
    }

    let diagnostics = classify::classify(&module, &mut variables)?;
    for diagnostic in &diagnostics {
        warn!(tool = entry_command, "{}", diagnostic);
    }

    let script = rewrite::rewrite(&module, &variables, &options.annotation_modules)?;
    let descriptor = descriptor::synthesize(&variables, entry_command);

    debug!(
        tool = entry_command,
        inputs = descriptor.inputs().len(),
        outputs = descriptor.outputs().len(),
        "Converted notebook"
    );

    Ok(Conversion::Converted(Box::new(ConvertedNotebook {
        script,
        descriptor,
        diagnostics,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn converted(cells: &[&str]) -> ConvertedNotebook {
        match convert_cells(cells, "/app/cwl/bin/nb", &EngineOptions::default()).unwrap() {
            Conversion::Converted(notebook) => *notebook,
            Conversion::Skipped(reason) => panic!("notebook skipped: {}", reason),
        }
    }

    #[test]
    fn test_no_cells_is_skipped() {
        let result = convert_cells::<&str>(&[], "cmd", &EngineOptions::default()).unwrap();
        assert!(matches!(
            result,
            Conversion::Skipped(SkipReason::NoAnnotationsFound)
        ));
    }

    #[test]
    fn test_unannotated_is_skipped() {
        let result =
            convert_cells(&["import os\nprint(os.getcwd())"], "cmd", &EngineOptions::default())
                .unwrap();
        assert!(matches!(
            result,
            Conversion::Skipped(SkipReason::NoAnnotationsFound)
        ));
    }

    #[test]
    fn test_end_to_end_flag_agreement() {
        let notebook = converted(&[
            "from ipython2cwl.iotypes import CWLFilePathInput, CWLFilePathOutput",
            "data: CWLFilePathInput = 'data.csv'\nresult: CWLFilePathOutput = 'result.csv'",
            "open(result, 'w').write(open(data).read())",
        ]);
        let input = &notebook.descriptor.inputs()[0];
        assert_eq!(input.binding.prefix, "--data");
        assert!(notebook
            .script
            .source()
            .contains(&format!("add_argument('{}'", input.binding.prefix)));
        assert_eq!(notebook.descriptor.outputs()[0].name, "result");
        assert_eq!(
            notebook.descriptor.inputs().len() + notebook.descriptor.outputs().len(),
            notebook.script.variables().len()
        );
    }

    #[test]
    fn test_syntax_error_names_cell() {
        let err = convert_cells(
            &["x: int = 1", "def broken(:\n    pass"],
            "cmd",
            &EngineOptions::default(),
        )
        .unwrap_err();
        match err {
            ConvertError::Syntax { cell, .. } => assert_eq!(cell, Some(1)),
            other => panic!("expected syntax error, got {:?}", other),
        }
    }

    #[test]
    fn test_diagnostics_are_returned() {
        let notebook = converted(&["data: CWLFilePath\ndata = 'x.csv'"]);
        assert_eq!(notebook.diagnostics.len(), 1);
    }

    #[test]
    fn test_skip_reason_display() {
        let reason = SkipReason::Failed(ConvertError::UnsupportedPattern {
            name: "x".to_string(),
            line: 1,
            reason: "chained".to_string(),
        });
        assert!(reason.to_string().starts_with("UnsupportedPatternError"));
    }
}
