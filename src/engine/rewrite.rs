//! Script rewriter
//!
//! Turns a classified [`ScriptModule`] into a standalone Python 3 program:
//! inputs come from an argparse prologue, outputs are reported in
//! `cwl.output.json` by an epilogue. The body is the original script with
//! byte-range edits applied to the top-level statements that declare tool
//! variables, so everything else is kept verbatim.

use super::classify::Role;
use super::error::ConvertError;
use super::parse::{InitializerShape, ScriptModule, StatementKind};
use super::scan::AnnotatedVariable;
use super::types::{flag_for, CliConvention, TypeToken};

/// Annotation modules whose imports are removed when the configuration lists none
pub const DEFAULT_ANNOTATION_MODULES: &[&str] = &["ipython2cwl.iotypes", "ipython2cwl"];

/// Name of the manifest the program writes for the runner
pub const OUTPUT_MANIFEST: &str = "cwl.output.json";

const PARSER: &str = "_repo2cwl_parser";
const ARGS: &str = "_repo2cwl_args";

/// A generated program and the variables it was generated from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertedScript {
    source: String,
    variables: Vec<AnnotatedVariable>,
}

impl ConvertedScript {
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn variables(&self) -> &[AnnotatedVariable] {
        &self.variables
    }
}

struct Edit {
    start: usize,
    end: usize,
    replacement: String,
}

/// Rewrite a module whose variables have all been classified.
pub fn rewrite(
    module: &ScriptModule,
    variables: &[AnnotatedVariable],
    annotation_modules: &[String],
) -> Result<ConvertedScript, ConvertError> {
    let mut edits = Vec::new();
    let mut future_imports = Vec::new();

    for variable in variables {
        let role = variable
            .role
            .ok_or_else(|| ConvertError::Unclassified(variable.name.clone()))?;

        let declarations = variable
            .superseded
            .iter()
            .copied()
            .chain(std::iter::once(variable.statement));

        for index in declarations {
            let statement = &module.statements()[index];
            let StatementKind::AnnotatedAssignment(assignment) = &statement.kind else {
                continue;
            };

            let replacement = match role {
                Role::Input => {
                    if let Some(reason) = assignment
                        .value
                        .as_ref()
                        .and_then(|value| unsupported_input_shape(&value.shape))
                    {
                        return Err(ConvertError::UnsupportedPattern {
                            name: variable.name.clone(),
                            line: statement.span.line + 1,
                            reason: reason.to_string(),
                        });
                    }
                    format!("{name} = {ARGS}.{name}", name = variable.name)
                }
                // A bare annotation binds nothing, so it must not clobber an earlier value
                Role::Output => match &assignment.value {
                    Some(value) => format!("{} = {}", variable.name, module.text(value.span)),
                    None => "pass".to_string(),
                },
            };

            edits.push(Edit {
                start: statement.span.start,
                end: statement.span.end,
                replacement,
            });
        }
    }

    for statement in module.statements() {
        match &statement.kind {
            StatementKind::FutureImport => {
                future_imports.push(module.text(statement.span).to_string());
                edits.push(Edit {
                    start: statement.span.start,
                    end: statement.span.end,
                    replacement: "pass".to_string(),
                });
            }
            StatementKind::Import { modules }
                if !modules.is_empty()
                    && modules
                        .iter()
                        .all(|module| is_annotation_module(module, annotation_modules)) =>
            {
                edits.push(Edit {
                    start: statement.span.start,
                    end: statement.span.end,
                    replacement: "pass".to_string(),
                });
            }
            _ => {}
        }
    }

    edits.sort_by_key(|edit| edit.start);

    let mut program = String::new();
    write_header(&mut program, &future_imports);
    write_prologue(&mut program, variables);
    write_body(&mut program, module.source(), &edits);
    write_epilogue(&mut program, variables);

    Ok(ConvertedScript {
        source: program,
        variables: variables.to_vec(),
    })
}

fn unsupported_input_shape(shape: &InitializerShape) -> Option<&'static str> {
    match shape {
        InitializerShape::Chained => {
            Some("chained assignment binds other names that would be lost")
        }
        InitializerShape::AssignmentExpression => {
            Some("assignment expression in the initializer binds other names that would be lost")
        }
        _ => None,
    }
}

fn is_annotation_module(module: &str, annotation_modules: &[String]) -> bool {
    let matches = |candidate: &str| {
        module == candidate
            || module
                .strip_prefix(candidate)
                .is_some_and(|rest| rest.starts_with('.'))
    };
    if annotation_modules.is_empty() {
        DEFAULT_ANNOTATION_MODULES.iter().any(|m| matches(*m))
    } else {
        annotation_modules.iter().any(|m| matches(m.as_str()))
    }
}

fn write_header(program: &mut String, future_imports: &[String]) {
    program.push_str("#!/usr/bin/env python3\n");
    program.push_str("\"\"\"\nDO NOT EDIT THIS FILE\nTHIS FILE IS AUTO-GENERATED BY repo2cwl\n\"\"\"\n");
    for import in future_imports {
        program.push_str(import);
        program.push('\n');
    }
    program.push_str("import argparse as _repo2cwl_argparse\n");
    program.push_str("import json as _repo2cwl_json\n");
    program.push_str("import os as _repo2cwl_os\n");
    program.push_str("import sys as _repo2cwl_sys\n\n");
}

fn write_prologue(program: &mut String, variables: &[AnnotatedVariable]) {
    // No implicit -h/--help: every flag belongs to a tool input
    program.push_str(&format!(
        "{PARSER} = _repo2cwl_argparse.ArgumentParser(add_help=False)\n"
    ));
    for variable in variables.iter().filter(|v| v.is_input()) {
        program.push_str(&add_argument(&variable.name, variable.declared_type));
        program.push('\n');
    }
    program.push_str(&format!("{ARGS} = {PARSER}.parse_args()\n\n"));
}

fn add_argument(name: &str, token: TypeToken) -> String {
    let flag = python_str(&flag_for(name));
    let dest = python_str(name);
    let converter = token.python_converter().unwrap_or("str");
    match token.cli_convention() {
        CliConvention::Switch => {
            format!("{PARSER}.add_argument({flag}, dest={dest}, action='store_true')")
        }
        CliConvention::Values => format!(
            "{PARSER}.add_argument({flag}, dest={dest}, type={converter}, nargs='+', required=True)"
        ),
        CliConvention::Value | CliConvention::NotAnArgument => format!(
            "{PARSER}.add_argument({flag}, dest={dest}, type={converter}, required=True)"
        ),
    }
}

fn write_body(program: &mut String, source: &str, edits: &[Edit]) {
    let mut cursor = 0;
    for edit in edits {
        program.push_str(&source[cursor..edit.start]);
        program.push_str(&edit.replacement);
        cursor = edit.end;
    }
    program.push_str(&source[cursor..]);
    if !program.ends_with('\n') {
        program.push('\n');
    }
}

fn write_epilogue(program: &mut String, variables: &[AnnotatedVariable]) {
    let outputs: Vec<&AnnotatedVariable> = variables.iter().filter(|v| v.is_output()).collect();
    if outputs.is_empty() {
        return;
    }

    program.push_str("\n_repo2cwl_sys.stdout.flush()\n\n\n");
    program.push_str("def _repo2cwl_output(kind, value):\n");
    program.push_str("    if value is None:\n");
    program.push_str("        return None\n");
    program.push_str("    if isinstance(value, (list, tuple)):\n");
    program.push_str("        return [_repo2cwl_output(kind, item) for item in value]\n");
    program.push_str("    return {'class': kind, 'path': _repo2cwl_os.path.abspath(str(value))}\n\n\n");
    program.push_str("_repo2cwl_outputs = {}\n");

    for variable in outputs {
        let kind = variable.declared_type.path_class().unwrap_or("File");
        let value = if variable.declared_type == TypeToken::Stdout {
            python_str(&variable.capture_file())
        } else {
            format!("globals().get({})", python_str(&variable.name))
        };
        program.push_str(&format!(
            "_repo2cwl_outputs[{}] = _repo2cwl_output({}, {})\n",
            python_str(&variable.name),
            python_str(kind),
            value
        ));
    }

    program.push_str(&format!(
        "with open({}, 'w') as _repo2cwl_handle:\n",
        python_str(OUTPUT_MANIFEST)
    ));
    program.push_str("    _repo2cwl_json.dump(_repo2cwl_outputs, _repo2cwl_handle)\n");
}

/// Single-quoted Python string literal
fn python_str(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('\'');
    for c in value.chars() {
        match c {
            '\\' => quoted.push_str("\\\\"),
            '\'' => quoted.push_str("\\'"),
            '\n' => quoted.push_str("\\n"),
            _ => quoted.push(c),
        }
    }
    quoted.push('\'');
    quoted
}
