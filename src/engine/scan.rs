//! Annotation scanner
//!
//! Walks the top-level statements of a [`ScriptModule`] and keeps every
//! annotated assignment whose annotation is in the type table.

use std::collections::HashMap;

use tracing::debug;

use super::classify::Role;
use super::error::ConvertError;
use super::parse::{Initializer, InitializerShape, ScriptModule, Span, StatementKind};
use super::types::{self, RoleHint, TypeToken};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotatedVariable {
    pub name: String,
    pub declared_type: TypeToken,
    /// Filled in once by the classifier
    pub role: Option<Role>,
    /// Position among distinct annotated names, in source order
    pub order: usize,
    /// Span of the declaration that won
    pub source_span: Span,
    pub hint: Option<RoleHint>,
    pub initializer: Option<Initializer>,
    /// Index of the winning declaration in [`ScriptModule::statements`]
    pub statement: usize,
    /// Earlier declarations of the same name with the same type
    pub superseded: Vec<usize>,
}

impl AnnotatedVariable {
    /// Set the role. A variable is classified exactly once.
    pub fn set_role(&mut self, role: Role) -> Result<(), ConvertError> {
        if self.role.is_some() {
            return Err(ConvertError::RoleAlreadyAssigned(self.name.clone()));
        }
        self.role = Some(role);
        Ok(())
    }

    pub fn is_input(&self) -> bool {
        self.role == Some(Role::Input)
    }

    pub fn is_output(&self) -> bool {
        self.role == Some(Role::Output)
    }

    /// 1-based line of the winning declaration
    pub fn line(&self) -> usize {
        self.source_span.line + 1
    }

    /// String literal(s) the variable is initialized with, when known statically
    pub fn literal_paths(&self) -> Option<&[String]> {
        match self.initializer.as_ref().map(|init| &init.shape) {
            Some(InitializerShape::StringLiterals(values)) => Some(values),
            _ => None,
        }
    }

    /// File the runner captures standard output into
    pub fn capture_file(&self) -> String {
        match self.literal_paths() {
            Some([single]) => single.clone(),
            _ => format!("{}.stdout", self.name),
        }
    }
}

/// Collect annotated variables in source order.
///
/// A name annotated twice with the same type keeps its first slot in the
/// ordering and the last declaration; a different type is a conflict.
pub fn scan(module: &ScriptModule) -> Result<Vec<AnnotatedVariable>, ConvertError> {
    let mut variables: Vec<AnnotatedVariable> = Vec::new();
    let mut slots: HashMap<String, usize> = HashMap::new();

    for (index, statement) in module.statements().iter().enumerate() {
        let StatementKind::AnnotatedAssignment(assignment) = &statement.kind else {
            continue;
        };

        let Some(entry) = types::lookup(&assignment.annotation) else {
            debug!(
                "Ignoring '{}': annotation '{}' is not a tool type",
                assignment.target, assignment.annotation
            );
            continue;
        };

        if let Some(&slot) = slots.get(&assignment.target) {
            let existing = &mut variables[slot];
            if existing.declared_type != entry.token {
                return Err(ConvertError::ConflictingAnnotation {
                    name: assignment.target.clone(),
                    first: existing.declared_type,
                    second: entry.token,
                    line: statement.span.line + 1,
                });
            }
            existing.superseded.push(existing.statement);
            existing.statement = index;
            existing.source_span = statement.span;
            existing.hint = entry.hint;
            existing.initializer = assignment.value.clone();
            continue;
        }

        slots.insert(assignment.target.clone(), variables.len());
        variables.push(AnnotatedVariable {
            name: assignment.target.clone(),
            declared_type: entry.token,
            role: None,
            order: variables.len(),
            source_span: statement.span,
            hint: entry.hint,
            initializer: assignment.value.clone(),
            statement: index,
            superseded: Vec::new(),
        });
    }

    Ok(variables)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::parse::parse_module;

    fn scan_source(source: &str) -> Result<Vec<AnnotatedVariable>, ConvertError> {
        scan(&parse_module(source).unwrap())
    }

    #[test]
    fn test_scan_finds_table_annotations() {
        let vars = scan_source("x: int = 5\nout_file: CWLFilePath = \"result.txt\"\n").unwrap();
        assert_eq!(vars.len(), 2);
        assert_eq!(vars[0].name, "x");
        assert_eq!(vars[0].declared_type, TypeToken::Int);
        assert_eq!(vars[0].order, 0);
        assert_eq!(vars[1].name, "out_file");
        assert_eq!(vars[1].declared_type, TypeToken::File);
        assert_eq!(vars[1].order, 1);
        assert!(vars.iter().all(|v| v.role.is_none()));
    }

    #[test]
    fn test_unknown_annotations_are_not_annotated() {
        let vars = scan_source("import pandas as pd\ndf: pd.DataFrame = pd.DataFrame()\nn: int = 3\n").unwrap();
        assert_eq!(vars.len(), 1);
        assert_eq!(vars[0].name, "n");
        assert_eq!(vars[0].order, 0);
    }

    #[test]
    fn test_nested_annotations_are_ignored() {
        let vars = scan_source("def f():\n    x: int = 1\n\nclass A:\n    y: str = 'a'\n").unwrap();
        assert!(vars.is_empty());
    }

    #[test]
    fn test_same_type_reannotation_last_wins() {
        let vars = scan_source("a: int = 1\nb: str = 'x'\na: int = 2\n").unwrap();
        assert_eq!(vars.len(), 2);
        assert_eq!(vars[0].name, "a");
        assert_eq!(vars[0].order, 0);
        assert_eq!(vars[0].statement, 2);
        assert_eq!(vars[0].superseded, vec![0]);
        assert_eq!(vars[0].line(), 3);
        assert_eq!(vars[1].order, 1);
    }

    #[test]
    fn test_conflicting_reannotation() {
        let err = scan_source("a: int = 1\na: CWLFilePath = 'x'\n").unwrap_err();
        assert_eq!(
            err,
            ConvertError::ConflictingAnnotation {
                name: "a".to_string(),
                first: TypeToken::Int,
                second: TypeToken::File,
                line: 2,
            }
        );
    }

    #[test]
    fn test_set_role_once() {
        let mut vars = scan_source("x: int = 5\n").unwrap();
        vars[0].set_role(Role::Input).unwrap();
        assert!(vars[0].is_input());
        assert_eq!(
            vars[0].set_role(Role::Output),
            Err(ConvertError::RoleAlreadyAssigned("x".to_string()))
        );
        assert!(vars[0].is_input());
    }

    #[test]
    fn test_capture_file() {
        let vars = scan_source("log: CWLStdout = 'run.log'\nout: CWLStdout\n").unwrap();
        assert_eq!(vars[0].capture_file(), "run.log");
        assert_eq!(vars[1].capture_file(), "out.stdout");
    }
}
