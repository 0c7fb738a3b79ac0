//! Role classifier
//!
//! Decides whether each annotated variable is supplied on the command line or
//! produced by the program. Scalars are always inputs and stdout captures are
//! always outputs; path types follow the spelling's hint when there is one
//! and otherwise the shape of the initializer.

use std::collections::HashSet;
use std::fmt;

use serde::Serialize;

use super::error::ConvertError;
use super::parse::{InitializerShape, ScriptModule};
use super::scan::AnnotatedVariable;
use super::types::{RoleHint, TypeToken};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Role {
    Input,
    Output,
}

impl From<RoleHint> for Role {
    fn from(hint: RoleHint) -> Self {
        match hint {
            RoleHint::Input => Role::Input,
            RoleHint::Output => Role::Output,
        }
    }
}

/// Warning about a classification that is probably not what the author meant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub name: String,
    pub line: usize,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: '{}' {}", self.line, self.name, self.message)
    }
}

/// Classify every variable in order, returning the diagnostics raised.
pub fn classify(
    module: &ScriptModule,
    variables: &mut [AnnotatedVariable],
) -> Result<Vec<Diagnostic>, ConvertError> {
    let mut diagnostics = Vec::new();
    let mut inputs: HashSet<String> = HashSet::new();
    let mut stdout_seen = false;

    for variable in variables.iter_mut() {
        let role = decide(variable, &inputs, &mut diagnostics);

        if variable.declared_type == TypeToken::Stdout {
            if stdout_seen {
                return Err(ConvertError::UnsupportedPattern {
                    name: variable.name.clone(),
                    line: variable.line(),
                    reason: "a tool captures standard output at most once".to_string(),
                });
            }
            stdout_seen = true;
        }

        if role == Role::Input {
            inputs.insert(variable.name.clone());
            if !variable.declared_type.is_scalar() && reassigned_later(module, variable) {
                diagnostics.push(Diagnostic {
                    name: variable.name.clone(),
                    line: variable.line(),
                    message: "is an input path but is reassigned later in the notebook"
                        .to_string(),
                });
            }
        }

        variable.set_role(role)?;
    }

    Ok(diagnostics)
}

fn decide(
    variable: &AnnotatedVariable,
    inputs: &HashSet<String>,
    diagnostics: &mut Vec<Diagnostic>,
) -> Role {
    let token = variable.declared_type;
    if token.is_scalar() {
        return Role::Input;
    }
    if token == TypeToken::Stdout {
        return Role::Output;
    }

    let shape = variable.initializer.as_ref().map(|init| &init.shape);

    if let Some(hint) = variable.hint {
        match (hint, shape) {
            (RoleHint::Input, Some(InitializerShape::StringLiterals(_)))
            | (RoleHint::Input, Some(InitializerShape::Expression)) => {
                diagnostics.push(Diagnostic {
                    name: variable.name.clone(),
                    line: variable.line(),
                    message: "is declared as an input but has an initializer; \
                              the value is replaced by the command-line argument"
                        .to_string(),
                });
            }
            (RoleHint::Output, None) => {
                diagnostics.push(Diagnostic {
                    name: variable.name.clone(),
                    line: variable.line(),
                    message: "is declared as an output without a value".to_string(),
                });
            }
            (RoleHint::Output, Some(InitializerShape::BareName(source)))
                if inputs.contains(source) =>
            {
                diagnostics.push(Diagnostic {
                    name: variable.name.clone(),
                    line: variable.line(),
                    message: format!(
                        "is declared as an output but refers to the input '{}'",
                        source
                    ),
                });
            }
            _ => {}
        }
        return hint.into();
    }

    match shape {
        None => Role::Input,
        Some(InitializerShape::BareName(source)) if inputs.contains(source) => Role::Input,
        Some(InitializerShape::BareName(source)) => {
            diagnostics.push(Diagnostic {
                name: variable.name.clone(),
                line: variable.line(),
                message: format!(
                    "is classified as an output but initialized from '{}', \
                     which is not a command-line input",
                    source
                ),
            });
            Role::Output
        }
        Some(_) => Role::Output,
    }
}

fn reassigned_later(module: &ScriptModule, variable: &AnnotatedVariable) -> bool {
    module
        .statements()
        .iter()
        .skip(variable.statement + 1)
        .any(|statement| statement.assigns.iter().any(|name| name == &variable.name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::parse::parse_module;
    use crate::engine::scan::scan;

    fn classified(source: &str) -> (Vec<AnnotatedVariable>, Vec<Diagnostic>) {
        let module = parse_module(source).unwrap();
        let mut vars = scan(&module).unwrap();
        let diagnostics = classify(&module, &mut vars).unwrap();
        (vars, diagnostics)
    }

    fn roles(vars: &[AnnotatedVariable]) -> Vec<Role> {
        vars.iter().map(|v| v.role.unwrap()).collect()
    }

    #[test]
    fn test_scalars_and_output_path() {
        let (vars, diagnostics) = classified("x: int = 5\nout_file: CWLFilePath = \"result.txt\"\n");
        assert_eq!(roles(&vars), vec![Role::Input, Role::Output]);
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_scalars_are_never_outputs() {
        let source = "a: int = compute()\nb: List[float] = [1.0]\nc: bool = x\nd: CWLStringInput = 'x'\n";
        let (vars, _) = classified(source);
        assert!(vars.iter().all(|v| v.is_input()));
    }

    #[test]
    fn test_path_declaration_only_is_input() {
        let (vars, _) = classified("data: CWLFilePath\n");
        assert_eq!(roles(&vars), vec![Role::Input]);
    }

    #[test]
    fn test_path_from_input_is_input() {
        let (vars, diagnostics) = classified("src: CWLFilePath\ncopy: CWLFilePath = src\n");
        assert_eq!(roles(&vars), vec![Role::Input, Role::Input]);
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_path_from_other_name_is_output_with_diagnostic() {
        let (vars, diagnostics) = classified("name = 'a.csv'\nout: CWLFilePath = name\n");
        assert_eq!(roles(&vars), vec![Role::Output]);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].name, "out");
    }

    #[test]
    fn test_hint_wins() {
        let source = "a: CWLFilePathInput = 'default.csv'\nb: CWLFilePathOutput\nc: CWLDirectoryPathOutput = 'plots'\n";
        let (vars, diagnostics) = classified(source);
        assert_eq!(roles(&vars), vec![Role::Input, Role::Output, Role::Output]);
        let flagged: Vec<_> = diagnostics.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(flagged, vec!["a", "b"]);
    }

    #[test]
    fn test_stdout_is_output() {
        let (vars, _) = classified("log: CWLStdout = 'run.log'\n");
        assert_eq!(roles(&vars), vec![Role::Output]);
    }

    #[test]
    fn test_second_stdout_is_unsupported() {
        let module = parse_module("a: CWLStdout\nb: CWLStdout\n").unwrap();
        let mut vars = scan(&module).unwrap();
        let err = classify(&module, &mut vars).unwrap_err();
        assert_eq!(err.kind(), "UnsupportedPatternError");
    }

    #[test]
    fn test_reassigned_input_path() {
        let (vars, diagnostics) = classified("data: CWLFilePath\nprint(data)\ndata = 'other.csv'\n");
        assert!(vars[0].is_input());
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].message.contains("reassigned"));
    }

    #[test]
    fn test_classification_is_stable() {
        let source = "a: CWLFilePath = 'x'\nb: int = 1\nc: CWLFilePath\n";
        let (vars, _) = classified(source);
        let names: Vec<_> = vars.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
        assert_eq!(roles(&vars), vec![Role::Output, Role::Input, Role::Input]);
    }
}
