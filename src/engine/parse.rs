/// Python front end
///
/// Parses a flattened notebook with the tree-sitter Python grammar and lowers
/// the tree into a [`ScriptModule`]: the ordered list of top-level statements
/// of the script's single global scope. Nested bodies stay opaque
/// ([`StatementKind::Compound`]); only top-level bindings are ever scanned.
use tree_sitter::{Node, Parser};

use super::error::ConvertError;

/// Byte range plus 0-indexed start position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub line: usize,
    pub column: usize,
}

impl Span {
    fn of(node: Node) -> Self {
        let position = node.start_position();
        Self {
            start: node.start_byte(),
            end: node.end_byte(),
            line: position.row,
            column: position.column,
        }
    }
}

/// Parsed script: source text plus its top-level statements in source order
#[derive(Debug, Clone)]
pub struct ScriptModule {
    source: String,
    statements: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    pub span: Span,
    pub kind: StatementKind,
    /// Names bound at module scope by this statement
    pub assigns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatementKind {
    /// `name: annotation [= value]` with a plain identifier target
    AnnotatedAssignment(AnnotatedAssignment),
    Assignment,
    AugmentedAssignment,
    /// `import a.b` / `from a.b import c`
    Import { modules: Vec<String> },
    /// `from __future__ import ...`, must stay at the top of a program
    FutureImport,
    /// def, class, if, for, while, with, try, match
    Compound,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotatedAssignment {
    pub target: String,
    pub annotation: String,
    pub value: Option<Initializer>,
}

/// Right-hand side of an annotated assignment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Initializer {
    pub span: Span,
    pub shape: InitializerShape,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InitializerShape {
    /// A bare reference to another name
    BareName(String),
    /// One string literal, or a list/tuple made only of string literals
    StringLiterals(Vec<String>),
    /// `x: T = y = value`
    Chained,
    /// The value contains `:=`, which binds further names
    AssignmentExpression,
    Expression,
}

impl ScriptModule {
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn statements(&self) -> &[Statement] {
        &self.statements
    }

    pub fn text(&self, span: Span) -> &str {
        &self.source[span.start..span.end]
    }
}

/// Parse a Python buffer.
///
/// Any error or missing node in the tree is a [`ConvertError::Syntax`] with a
/// 1-based position; the caller attaches the originating cell.
pub fn parse_module(source: &str) -> Result<ScriptModule, ConvertError> {
    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_python::LANGUAGE.into())
        .map_err(|e| ConvertError::Parser(e.to_string()))?;

    let tree = parser
        .parse(source, None)
        .ok_or_else(|| ConvertError::Parser("parser returned no tree".to_string()))?;
    let root = tree.root_node();

    if root.has_error() {
        let at = first_error(root).unwrap_or(root);
        let position = at.start_position();
        return Err(ConvertError::Syntax {
            line: position.row + 1,
            column: position.column + 1,
            cell: None,
        });
    }

    let mut cursor = root.walk();
    let statements = root
        .named_children(&mut cursor)
        .filter(|node| node.kind() != "comment")
        .map(|node| lower_statement(node, source))
        .collect();

    Ok(ScriptModule {
        source: source.to_string(),
        statements,
    })
}

fn first_error<'t>(node: Node<'t>) -> Option<Node<'t>> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    if !node.has_error() {
        return None;
    }
    let mut cursor = node.walk();
    let children: Vec<Node<'t>> = node.children(&mut cursor).collect();
    children.into_iter().find_map(first_error)
}

fn text<'s>(node: Node, source: &'s str) -> &'s str {
    &source[node.start_byte()..node.end_byte()]
}

fn named_children<'t>(node: Node<'t>) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor).collect()
}

fn lower_statement(node: Node, source: &str) -> Statement {
    let span = Span::of(node);
    let mut assigns = Vec::new();

    let kind = match node.kind() {
        "expression_statement" => {
            let children = named_children(node);
            match children.as_slice() {
                [inner] if inner.kind() == "assignment" => {
                    lower_assignment(*inner, source, &mut assigns)
                }
                [inner] if inner.kind() == "augmented_assignment" => {
                    if let Some(left) = inner.child_by_field_name("left") {
                        collect_targets(left, source, &mut assigns);
                    }
                    StatementKind::AugmentedAssignment
                }
                _ => StatementKind::Other,
            }
        }
        "future_import_statement" => StatementKind::FutureImport,
        "import_statement" => {
            let modules = named_children(node)
                .into_iter()
                .filter_map(|child| match child.kind() {
                    "dotted_name" => Some(text(child, source).to_string()),
                    "aliased_import" => child
                        .child_by_field_name("name")
                        .map(|name| text(name, source).to_string()),
                    _ => None,
                })
                .collect();
            StatementKind::Import { modules }
        }
        "import_from_statement" => {
            let modules = node
                .child_by_field_name("module_name")
                .map(|module| vec![text(module, source).to_string()])
                .unwrap_or_default();
            StatementKind::Import { modules }
        }
        "function_definition" | "class_definition" => {
            if let Some(name) = node.child_by_field_name("name") {
                assigns.push(text(name, source).to_string());
            }
            StatementKind::Compound
        }
        "for_statement" => {
            if let Some(left) = node.child_by_field_name("left") {
                collect_targets(left, source, &mut assigns);
            }
            StatementKind::Compound
        }
        "decorated_definition" | "if_statement" | "while_statement" | "try_statement"
        | "with_statement" | "match_statement" => StatementKind::Compound,
        _ => StatementKind::Other,
    };

    Statement {
        span,
        kind,
        assigns,
    }
}

fn lower_assignment(node: Node, source: &str, assigns: &mut Vec<String>) -> StatementKind {
    let left = node.child_by_field_name("left");
    let annotation = node.child_by_field_name("type");
    let right = node.child_by_field_name("right");

    if let Some(left) = left {
        collect_targets(left, source, assigns);
    }
    // Chained targets: `a = b = value`
    let mut next = right;
    while let Some(inner) = next.filter(|n| n.kind() == "assignment") {
        if let Some(left) = inner.child_by_field_name("left") {
            collect_targets(left, source, assigns);
        }
        next = inner.child_by_field_name("right");
    }

    match (left, annotation) {
        (Some(left), Some(annotation)) if left.kind() == "identifier" => {
            StatementKind::AnnotatedAssignment(AnnotatedAssignment {
                target: text(left, source).to_string(),
                annotation: text(annotation, source).to_string(),
                value: right.map(|value| Initializer {
                    span: Span::of(value),
                    shape: initializer_shape(value, source),
                }),
            })
        }
        (_, Some(_)) => StatementKind::Other,
        (_, None) => StatementKind::Assignment,
    }
}

fn collect_targets(node: Node, source: &str, names: &mut Vec<String>) {
    match node.kind() {
        "identifier" => names.push(text(node, source).to_string()),
        "pattern_list" | "tuple_pattern" | "list_pattern" | "list_splat_pattern" => {
            for child in named_children(node) {
                collect_targets(child, source, names);
            }
        }
        _ => {}
    }
}

fn initializer_shape(node: Node, source: &str) -> InitializerShape {
    if matches!(node.kind(), "assignment" | "augmented_assignment") {
        return InitializerShape::Chained;
    }
    if contains_kind(node, "named_expression") {
        return InitializerShape::AssignmentExpression;
    }

    match node.kind() {
        "identifier" => InitializerShape::BareName(text(node, source).to_string()),
        "parenthesized_expression" => match named_children(node).as_slice() {
            [inner] => initializer_shape(*inner, source),
            _ => InitializerShape::Expression,
        },
        "string" => match string_literal(node, source) {
            Some(value) => InitializerShape::StringLiterals(vec![value]),
            None => InitializerShape::Expression,
        },
        "list" | "tuple" | "expression_list" => {
            let items: Option<Vec<String>> = named_children(node)
                .into_iter()
                .map(|item| {
                    if item.kind() == "string" {
                        string_literal(item, source)
                    } else {
                        None
                    }
                })
                .collect();
            match items {
                Some(items) if !items.is_empty() => InitializerShape::StringLiterals(items),
                _ => InitializerShape::Expression,
            }
        }
        _ => InitializerShape::Expression,
    }
}

fn contains_kind(node: Node, kind: &str) -> bool {
    if node.kind() == kind {
        return true;
    }
    named_children(node)
        .into_iter()
        .any(|child| contains_kind(child, kind))
}

/// Value of a plain string literal; f-strings, bytes and escapes are not static paths
fn string_literal(node: Node, source: &str) -> Option<String> {
    let mut raw = false;
    let mut value = String::new();
    let mut cursor = node.walk();

    for child in node.children(&mut cursor) {
        match child.kind() {
            "string_start" => {
                let prefix: String = text(child, source)
                    .chars()
                    .take_while(|c| c.is_ascii_alphabetic())
                    .collect::<String>()
                    .to_ascii_lowercase();
                if prefix.contains('f') || prefix.contains('b') {
                    return None;
                }
                raw = prefix.contains('r');
            }
            "string_content" => {
                let content = text(child, source);
                if !raw && content.contains('\\') {
                    return None;
                }
                value.push_str(content);
            }
            "string_end" => {}
            _ => return None,
        }
    }

    Some(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn annotated(statement: &Statement) -> &AnnotatedAssignment {
        match &statement.kind {
            StatementKind::AnnotatedAssignment(assignment) => assignment,
            other => panic!("expected annotated assignment, got {:?}", other),
        }
    }

    #[test]
    fn test_top_level_statements_in_order() {
        let module = parse_module("import os\nx: int = 5\ny = x + 1\n# note\nprint(y)\n").unwrap();
        let kinds: Vec<_> = module.statements().iter().map(|s| &s.kind).collect();
        assert_eq!(kinds.len(), 4);
        assert_eq!(
            kinds[0],
            &StatementKind::Import {
                modules: vec!["os".to_string()]
            }
        );
        assert!(matches!(kinds[1], StatementKind::AnnotatedAssignment(_)));
        assert_eq!(kinds[2], &StatementKind::Assignment);
        assert_eq!(kinds[3], &StatementKind::Other);
    }

    #[test]
    fn test_annotated_assignment_parts() {
        let module = parse_module("out_file: CWLFilePath = \"result.txt\"\n").unwrap();
        let assignment = annotated(&module.statements()[0]);
        assert_eq!(assignment.target, "out_file");
        assert_eq!(assignment.annotation, "CWLFilePath");
        let value = assignment.value.as_ref().unwrap();
        assert_eq!(
            value.shape,
            InitializerShape::StringLiterals(vec!["result.txt".to_string()])
        );
        assert_eq!(module.text(value.span), "\"result.txt\"");
    }

    #[test]
    fn test_declaration_without_value() {
        let module = parse_module("data: CWLFilePathInput\n").unwrap();
        assert!(annotated(&module.statements()[0]).value.is_none());
    }

    #[test]
    fn test_initializer_shapes() {
        let source = "a: int = b\nc: int = d = 5\ne: int = (f := 3)\ng: List[str] = ['x', 'y']\nh: str = f'{a}'\n";
        let module = parse_module(source).unwrap();
        let shapes: Vec<_> = module
            .statements()
            .iter()
            .map(|s| annotated(s).value.as_ref().unwrap().shape.clone())
            .collect();
        assert_eq!(shapes[0], InitializerShape::BareName("b".to_string()));
        assert_eq!(shapes[1], InitializerShape::Chained);
        assert_eq!(shapes[2], InitializerShape::AssignmentExpression);
        assert_eq!(
            shapes[3],
            InitializerShape::StringLiterals(vec!["x".to_string(), "y".to_string()])
        );
        assert_eq!(shapes[4], InitializerShape::Expression);
    }

    #[test]
    fn test_nested_annotations_stay_opaque() {
        let source = "def f():\n    x: int = 1\n    return x\n\nif True:\n    y: int = 2\n";
        let module = parse_module(source).unwrap();
        assert_eq!(module.statements().len(), 2);
        assert!(module
            .statements()
            .iter()
            .all(|s| s.kind == StatementKind::Compound));
        assert_eq!(module.statements()[0].assigns, vec!["f".to_string()]);
    }

    #[test]
    fn test_attribute_target_is_not_a_binding() {
        let module = parse_module("self.x: int = 1\n").unwrap();
        assert_eq!(module.statements()[0].kind, StatementKind::Other);
    }

    #[test]
    fn test_assigns_cover_unpacking() {
        let module = parse_module("a, (b, c) = 1, (2, 3)\n").unwrap();
        assert_eq!(
            module.statements()[0].assigns,
            vec!["a".to_string(), "b".to_string(), "c".to_string()]
        );
    }

    #[test]
    fn test_imports() {
        let source = "from __future__ import annotations\nfrom ipython2cwl.iotypes import CWLFilePath\nimport numpy as np, os.path\n";
        let module = parse_module(source).unwrap();
        let kinds: Vec<_> = module.statements().iter().map(|s| s.kind.clone()).collect();
        assert_eq!(kinds[0], StatementKind::FutureImport);
        assert_eq!(
            kinds[1],
            StatementKind::Import {
                modules: vec!["ipython2cwl.iotypes".to_string()]
            }
        );
        assert_eq!(
            kinds[2],
            StatementKind::Import {
                modules: vec!["numpy".to_string(), "os.path".to_string()]
            }
        );
    }

    #[test]
    fn test_syntax_error_position() {
        let err = parse_module("x = 1\ny = (\n").unwrap_err();
        match err {
            ConvertError::Syntax { line, .. } => assert!(line >= 2),
            other => panic!("expected syntax error, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_source() {
        let module = parse_module("").unwrap();
        assert!(module.statements().is_empty());
    }
}
