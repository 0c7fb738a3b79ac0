//! Type mapping table
//!
//! Closed mapping between Python annotation spellings, the engine's
//! [`TypeToken`]s, CWL parameter types and the command-line convention each
//! token induces. The rewriter and the descriptor synthesizer both derive
//! flag names from [`flag_for`]; a generated program and its descriptor must
//! agree on them verbatim.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Capability carried by an annotated variable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeToken {
    File,
    Directory,
    Int,
    Float,
    String,
    Boolean,
    FileArray,
    DirectoryArray,
    IntArray,
    FloatArray,
    StringArray,
    Stdout,
}

/// How a token is passed on the generated program's command line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CliConvention {
    /// `--name VALUE`
    Value,
    /// `--name V1 V2 ...` (argparse `nargs='+'`, CWL array without item separator)
    Values,
    /// `--name` present means true
    Switch,
    /// Not a command-line argument
    NotAnArgument,
}

/// Role suggested by the spelling itself (`CWLFilePathInput`, `CWLFilePathOutput`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoleHint {
    Input,
    Output,
}

/// Result of a successful table lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableEntry {
    pub token: TypeToken,
    pub hint: Option<RoleHint>,
}

impl TypeToken {
    /// CWL parameter type
    pub fn cwl_type(self) -> &'static str {
        match self {
            TypeToken::File => "File",
            TypeToken::Directory => "Directory",
            TypeToken::Int => "int",
            TypeToken::Float => "float",
            TypeToken::String => "string",
            TypeToken::Boolean => "boolean",
            TypeToken::FileArray => "File[]",
            TypeToken::DirectoryArray => "Directory[]",
            TypeToken::IntArray => "int[]",
            TypeToken::FloatArray => "float[]",
            TypeToken::StringArray => "string[]",
            TypeToken::Stdout => "stdout",
        }
    }

    pub fn cli_convention(self) -> CliConvention {
        match self {
            TypeToken::File
            | TypeToken::Directory
            | TypeToken::Int
            | TypeToken::Float
            | TypeToken::String => CliConvention::Value,
            TypeToken::FileArray
            | TypeToken::DirectoryArray
            | TypeToken::IntArray
            | TypeToken::FloatArray
            | TypeToken::StringArray => CliConvention::Values,
            TypeToken::Boolean => CliConvention::Switch,
            TypeToken::Stdout => CliConvention::NotAnArgument,
        }
    }

    /// argparse `type=` converter for the token's values
    pub fn python_converter(self) -> Option<&'static str> {
        match self {
            TypeToken::Int | TypeToken::IntArray => Some("int"),
            TypeToken::Float | TypeToken::FloatArray => Some("float"),
            TypeToken::String
            | TypeToken::StringArray
            | TypeToken::File
            | TypeToken::FileArray
            | TypeToken::Directory
            | TypeToken::DirectoryArray => Some("str"),
            TypeToken::Boolean | TypeToken::Stdout => None,
        }
    }

    /// Primitive values can only ever be supplied, never produced
    pub fn is_scalar(self) -> bool {
        matches!(
            self,
            TypeToken::Int
                | TypeToken::Float
                | TypeToken::String
                | TypeToken::Boolean
                | TypeToken::IntArray
                | TypeToken::FloatArray
                | TypeToken::StringArray
        )
    }

    /// Tokens that may be classified as produced outputs
    pub fn is_output_eligible(self) -> bool {
        matches!(
            self,
            TypeToken::File
                | TypeToken::Directory
                | TypeToken::FileArray
                | TypeToken::DirectoryArray
                | TypeToken::Stdout
        )
    }

    pub fn is_array(self) -> bool {
        self.cli_convention() == CliConvention::Values
    }

    /// CWL `class` of the values reported for path-like outputs
    pub fn path_class(self) -> Option<&'static str> {
        match self {
            TypeToken::File | TypeToken::FileArray | TypeToken::Stdout => Some("File"),
            TypeToken::Directory | TypeToken::DirectoryArray => Some("Directory"),
            _ => None,
        }
    }

    fn array_of(self) -> Option<TypeToken> {
        match self {
            TypeToken::File => Some(TypeToken::FileArray),
            TypeToken::Directory => Some(TypeToken::DirectoryArray),
            TypeToken::Int => Some(TypeToken::IntArray),
            TypeToken::Float => Some(TypeToken::FloatArray),
            TypeToken::String => Some(TypeToken::StringArray),
            _ => None,
        }
    }
}

impl fmt::Display for TypeToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TypeToken::File => "File",
            TypeToken::Directory => "Directory",
            TypeToken::Int => "Int",
            TypeToken::Float => "Float",
            TypeToken::String => "String",
            TypeToken::Boolean => "Boolean",
            TypeToken::FileArray => "FileArray",
            TypeToken::DirectoryArray => "DirectoryArray",
            TypeToken::IntArray => "IntArray",
            TypeToken::FloatArray => "FloatArray",
            TypeToken::StringArray => "StringArray",
            TypeToken::Stdout => "Stdout",
        };
        f.pad(name)
    }
}

/// Qualifiers accepted in front of the CWL annotation names
const CWL_QUALIFIERS: &[&str] = &["ipython2cwl.iotypes.", "iotypes."];

/// Command-line flag for a variable. Shared by the rewriter and the synthesizer.
pub fn flag_for(name: &str) -> String {
    format!("--{}", name)
}

/// Look up an annotation's source text in the table.
///
/// Whitespace is insignificant. Unknown spellings return `None`: they are
/// treated as ordinary annotations, never guessed.
pub fn lookup(annotation: &str) -> Option<TableEntry> {
    let compact: String = annotation.chars().filter(|c| !c.is_whitespace()).collect();
    lookup_compact(&compact)
}

fn lookup_compact(text: &str) -> Option<TableEntry> {
    if let Some(inner) = strip_list(text) {
        let element = lookup_scalar(inner)?;
        let token = element.token.array_of()?;
        return Some(TableEntry {
            token,
            hint: element.hint,
        });
    }
    lookup_scalar(text)
}

fn strip_list(text: &str) -> Option<&str> {
    let text = text.strip_prefix("typing.").unwrap_or(text);
    let inner = text
        .strip_prefix("List[")
        .or_else(|| text.strip_prefix("list["))?;
    inner.strip_suffix(']')
}

fn lookup_scalar(text: &str) -> Option<TableEntry> {
    let builtin = match text {
        "int" => Some(TypeToken::Int),
        "float" => Some(TypeToken::Float),
        "str" => Some(TypeToken::String),
        "bool" => Some(TypeToken::Boolean),
        _ => None,
    };
    if let Some(token) = builtin {
        return Some(TableEntry { token, hint: None });
    }

    let name = CWL_QUALIFIERS
        .iter()
        .find_map(|q| text.strip_prefix(q))
        .unwrap_or(text);

    let (token, hint) = match name {
        "CWLIntInput" => (TypeToken::Int, None),
        "CWLFloatInput" => (TypeToken::Float, None),
        "CWLStringInput" => (TypeToken::String, None),
        "CWLBooleanInput" => (TypeToken::Boolean, None),
        "CWLFilePath" => (TypeToken::File, None),
        "CWLFilePathInput" => (TypeToken::File, Some(RoleHint::Input)),
        "CWLFilePathOutput" => (TypeToken::File, Some(RoleHint::Output)),
        "CWLDirectoryPath" => (TypeToken::Directory, None),
        "CWLDirectoryPathInput" => (TypeToken::Directory, Some(RoleHint::Input)),
        "CWLDirectoryPathOutput" => (TypeToken::Directory, Some(RoleHint::Output)),
        "CWLStdout" => (TypeToken::Stdout, Some(RoleHint::Output)),
        _ => return None,
    };
    Some(TableEntry { token, hint })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_spellings() {
        assert_eq!(lookup("int").unwrap().token, TypeToken::Int);
        assert_eq!(lookup("float").unwrap().token, TypeToken::Float);
        assert_eq!(lookup("str").unwrap().token, TypeToken::String);
        assert_eq!(lookup("bool").unwrap().token, TypeToken::Boolean);
    }

    #[test]
    fn test_cwl_spellings_carry_hints() {
        let entry = lookup("CWLFilePathInput").unwrap();
        assert_eq!(entry.token, TypeToken::File);
        assert_eq!(entry.hint, Some(RoleHint::Input));

        let entry = lookup("ipython2cwl.iotypes.CWLFilePathOutput").unwrap();
        assert_eq!(entry.token, TypeToken::File);
        assert_eq!(entry.hint, Some(RoleHint::Output));

        assert_eq!(lookup("CWLFilePath").unwrap().hint, None);
        assert_eq!(lookup("CWLStdout").unwrap().token, TypeToken::Stdout);
    }

    #[test]
    fn test_list_spellings() {
        assert_eq!(
            lookup("List[CWLFilePath]").unwrap().token,
            TypeToken::FileArray
        );
        assert_eq!(
            lookup("typing.List[ int ]").unwrap().token,
            TypeToken::IntArray
        );
        assert_eq!(lookup("list[str]").unwrap().token, TypeToken::StringArray);
        assert_eq!(
            lookup("List[CWLDirectoryPathOutput]").unwrap().hint,
            Some(RoleHint::Output)
        );
    }

    #[test]
    fn test_unknown_spellings_are_rejected() {
        assert!(lookup("Dict[str, int]").is_none());
        assert!(lookup("List[bool]").is_none());
        assert!(lookup("List[CWLStdout]").is_none());
        assert!(lookup("List[List[int]]").is_none());
        assert!(lookup("CWLFilePathz").is_none());
        assert!(lookup("pathlib.Path").is_none());
    }

    #[test]
    fn test_cli_conventions() {
        assert_eq!(TypeToken::File.cli_convention(), CliConvention::Value);
        assert_eq!(TypeToken::FileArray.cli_convention(), CliConvention::Values);
        assert_eq!(TypeToken::Boolean.cli_convention(), CliConvention::Switch);
        assert_eq!(
            TypeToken::Stdout.cli_convention(),
            CliConvention::NotAnArgument
        );
    }

    #[test]
    fn test_scalars_are_not_output_eligible() {
        for token in [
            TypeToken::Int,
            TypeToken::Float,
            TypeToken::String,
            TypeToken::Boolean,
            TypeToken::IntArray,
        ] {
            assert!(token.is_scalar());
            assert!(!token.is_output_eligible());
        }
        assert!(TypeToken::DirectoryArray.is_output_eligible());
    }

    #[test]
    fn test_flag_for() {
        assert_eq!(flag_for("out_file"), "--out_file");
    }
}
