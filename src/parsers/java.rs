//! Tree-sitter integration for Java sources.
//!
//! Helpers here only read syntax: declared names, declared types of
//! variables, and the shape of call receivers. Resolution policy lives in
//! `crate::resolver`.

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use tree_sitter::{Node, Parser, Tree};

use crate::errors::{ImpactError, Result};
use crate::resolver::{reduce_type_name, FileContext, MethodScope, Receiver, TypeScope};

/// Node kinds that declare a named type
pub const TYPE_DECLARATION_KINDS: &[&str] = &[
    "class_declaration",
    "interface_declaration",
    "enum_declaration",
    "record_declaration",
    "annotation_type_declaration",
];

/// Node kinds that declare a callable member
pub const METHOD_DECLARATION_KINDS: &[&str] = &[
    "method_declaration",
    "constructor_declaration",
    "compact_constructor_declaration",
];

/// A parsed Java source file
pub struct JavaAst {
    pub tree: Tree,
    pub path: PathBuf,
    pub source: String,
}

/// Parse Java source code into a tree-sitter AST
pub fn parse_source(content: &str, path: &Path) -> Result<JavaAst> {
    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_java::LANGUAGE.into())
        .map_err(|e| ImpactError::parse(path, format!("Failed to set Java grammar: {e}")))?;

    let tree = parser
        .parse(content, None)
        .ok_or_else(|| ImpactError::parse(path, "Failed to parse source code"))?;

    Ok(JavaAst {
        tree,
        path: path.to_path_buf(),
        source: content.to_string(),
    })
}

/// Read and parse a Java file, tolerating non UTF-8 bytes
pub fn parse_file(path: &Path) -> Result<JavaAst> {
    let bytes = std::fs::read(path).map_err(|e| ImpactError::io(path, e))?;
    parse_source(&String::from_utf8_lossy(&bytes), path)
}

/// Check if a parse tree has errors
pub fn has_parse_errors(tree: &Tree) -> bool {
    tree.root_node().has_error()
}

/// Get text for a tree-sitter node
pub fn node_text<'a>(node: &Node, source: &'a str) -> &'a str {
    &source[node.start_byte()..node.end_byte()]
}

/// Get the line number for a tree-sitter node (1-indexed)
pub fn node_line(node: &Node) -> usize {
    node.start_position().row + 1
}

pub fn is_type_declaration(node: &Node) -> bool {
    TYPE_DECLARATION_KINDS.contains(&node.kind())
}

pub fn is_method_declaration(node: &Node) -> bool {
    METHOD_DECLARATION_KINDS.contains(&node.kind())
}

fn field_text<'a>(node: &Node, field: &str, source: &'a str) -> Option<&'a str> {
    node.child_by_field_name(field)
        .map(|child| node_text(&child, source))
}

/// Names of all methods and constructors declared anywhere in the file
pub fn declared_method_names(ast: &JavaAst) -> BTreeSet<String> {
    let mut names = BTreeSet::new();
    collect_method_names(&ast.tree.root_node(), &ast.source, &mut names);
    names
}

fn collect_method_names(node: &Node, source: &str, names: &mut BTreeSet<String>) {
    if is_method_declaration(node) {
        if let Some(name) = field_text(node, "name", source) {
            names.insert(name.to_string());
        }
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        collect_method_names(&child, source, names);
    }
}

/// Package and single-type imports of the file
pub fn file_context(ast: &JavaAst) -> FileContext {
    let root = ast.tree.root_node();
    let mut package = None;
    let mut imports = Vec::new();

    let mut cursor = root.walk();
    for child in root.children(&mut cursor) {
        match child.kind() {
            "package_declaration" => {
                package = declared_name(&child, &ast.source);
            }
            "import_declaration" => {
                let text = node_text(&child, &ast.source);
                let is_static = child
                    .children(&mut child.walk())
                    .any(|c| c.kind() == "static");
                let is_wildcard = child
                    .children(&mut child.walk())
                    .any(|c| c.kind() == "asterisk");
                if !is_static && !is_wildcard {
                    if let Some(name) = import_name(text) {
                        imports.push(name);
                    }
                }
            }
            _ => {}
        }
    }

    FileContext::new(package, imports)
}

fn declared_name(node: &Node, source: &str) -> Option<String> {
    let mut cursor = node.walk();
    let found = node
        .children(&mut cursor)
        .find(|c| matches!(c.kind(), "scoped_identifier" | "identifier"))
        .map(|c| node_text(&c, source).split_whitespace().collect::<String>());
    found
}

fn import_name(text: &str) -> Option<String> {
    let name: String = text
        .trim()
        .trim_start_matches("import")
        .trim_end_matches(';')
        .split_whitespace()
        .collect();
    (!name.is_empty()).then_some(name)
}

/// Declared name of a type declaration node
pub fn type_declaration_name<'a>(node: &Node, source: &'a str) -> Option<&'a str> {
    field_text(node, "name", source)
}

/// Scope of a type declaration: fields, record components, superclass.
///
/// `qualified_name` is the already computed `pkg.Outer.Inner` name.
pub fn type_scope(node: &Node, source: &str, qualified_name: String) -> TypeScope {
    let mut scope = TypeScope::new(qualified_name);

    scope.superclass = node
        .child_by_field_name("superclass")
        .and_then(|superclass| {
            let mut cursor = superclass.walk();
            let found = superclass
                .named_children(&mut cursor)
                .next()
                .map(|t| reduce_type_name(node_text(&t, source)));
            found
        });

    if node.kind() == "record_declaration" {
        if let Some(parameters) = node.child_by_field_name("parameters") {
            collect_formal_parameters(&parameters, source, &mut scope.fields);
        }
    }

    if let Some(body) = node.child_by_field_name("body") {
        collect_fields(&body, source, &mut scope.fields);
    }
    scope
}

fn collect_fields(body: &Node, source: &str, fields: &mut HashMap<String, String>) {
    let mut cursor = body.walk();
    for member in body.named_children(&mut cursor) {
        match member.kind() {
            "field_declaration" | "constant_declaration" => {
                collect_declarators(&member, source, fields);
            }
            // enum members sit one level deeper
            "enum_body_declarations" => collect_fields(&member, source, fields),
            _ => {}
        }
    }
}

/// `Type a = .., b;` style declarations
fn collect_declarators(node: &Node, source: &str, into: &mut HashMap<String, String>) {
    let Some(type_node) = node.child_by_field_name("type") else {
        return;
    };
    let declared = node_text(&type_node, source);
    let mut cursor = node.walk();
    for declarator in node.children_by_field_name("declarator", &mut cursor) {
        let Some(name) = field_text(&declarator, "name", source) else {
            continue;
        };
        let resolved = if declared == "var" {
            // only `var x = new T(..)` tells us anything
            declarator
                .child_by_field_name("value")
                .filter(|value| value.kind() == "object_creation_expression")
                .and_then(|value| field_text(&value, "type", source))
        } else {
            Some(declared)
        };
        if let Some(type_text) = resolved {
            into.entry(name.to_string())
                .or_insert_with(|| reduce_type_name(type_text));
        }
    }
}

fn collect_formal_parameters(parameters: &Node, source: &str, into: &mut HashMap<String, String>) {
    let mut cursor = parameters.walk();
    for parameter in parameters.named_children(&mut cursor) {
        match parameter.kind() {
            "formal_parameter" => {
                if let (Some(type_text), Some(name)) = (
                    field_text(&parameter, "type", source),
                    field_text(&parameter, "name", source),
                ) {
                    into.insert(name.to_string(), reduce_type_name(type_text));
                }
            }
            "spread_parameter" => {
                let mut inner = parameter.walk();
                let children: Vec<Node> = parameter.named_children(&mut inner).collect();
                let type_node = children
                    .iter()
                    .find(|c| c.kind() != "modifiers" && c.kind() != "variable_declarator");
                let declarator = children.iter().find(|c| c.kind() == "variable_declarator");
                if let (Some(type_node), Some(declarator)) = (type_node, declarator) {
                    if let Some(name) = field_text(declarator, "name", source) {
                        into.insert(
                            name.to_string(),
                            reduce_type_name(node_text(type_node, source)),
                        );
                    }
                }
            }
            _ => {}
        }
    }
}

/// Parameters and local declarations of a method or constructor.
///
/// Locals are gathered from the whole body, including lambdas and
/// anonymous class bodies, but not from nested named types.
pub fn method_scope(method: &Node, source: &str) -> MethodScope {
    let mut scope = MethodScope::default();
    if let Some(parameters) = method.child_by_field_name("parameters") {
        collect_formal_parameters(&parameters, source, &mut scope.parameters);
    }
    if let Some(body) = method.child_by_field_name("body") {
        collect_locals(&body, source, &mut scope.locals);
    }
    scope
}

fn collect_locals(node: &Node, source: &str, locals: &mut HashMap<String, String>) {
    match node.kind() {
        "local_variable_declaration" => collect_declarators(node, source, locals),
        "enhanced_for_statement" | "resource" => {
            if let (Some(type_text), Some(name)) = (
                field_text(node, "type", source),
                field_text(node, "name", source),
            ) {
                let type_text = if type_text == "var" {
                    None
                } else {
                    Some(type_text)
                };
                if let Some(type_text) = type_text {
                    locals
                        .entry(name.to_string())
                        .or_insert_with(|| reduce_type_name(type_text));
                }
            }
        }
        "catch_formal_parameter" => {
            let mut cursor = node.walk();
            let catch_type = node
                .named_children(&mut cursor)
                .find(|c| c.kind() == "catch_type");
            if let (Some(catch_type), Some(name)) = (catch_type, field_text(node, "name", source))
            {
                // multi-catch keeps the first alternative
                let mut inner = catch_type.walk();
                let first = catch_type.named_children(&mut inner).next();
                if let Some(first) = first {
                    locals
                        .entry(name.to_string())
                        .or_insert_with(|| reduce_type_name(node_text(&first, source)));
                }
            }
        }
        _ => {}
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if !is_type_declaration(&child) {
            collect_locals(&child, source, locals);
        }
    }
}

/// Classify the receiver of a `method_invocation` node
pub fn receiver_of<'a>(invocation: &Node, source: &'a str) -> Receiver<'a> {
    let Some(object) = invocation.child_by_field_name("object") else {
        return Receiver::Implicit;
    };
    classify_receiver(&object, source)
}

fn classify_receiver<'a>(object: &Node, source: &'a str) -> Receiver<'a> {
    match object.kind() {
        "this" => Receiver::This,
        "super" => Receiver::Super,
        "identifier" => Receiver::Identifier(node_text(object, source)),
        "field_access" => {
            let target = object.child_by_field_name("object");
            let field = field_text(object, "field", source);
            match (target.map(|t| t.kind()), field) {
                (Some("this"), Some(field)) => Receiver::Identifier(field),
                _ => Receiver::Dotted(node_text(object, source)),
            }
        }
        "scoped_identifier" => Receiver::Dotted(node_text(object, source)),
        "object_creation_expression" => match field_text(object, "type", source) {
            Some(type_text) => Receiver::Typed(type_text),
            None => Receiver::Opaque,
        },
        "cast_expression" => match field_text(object, "type", source) {
            Some(type_text) => Receiver::Typed(type_text),
            None => Receiver::Opaque,
        },
        "parenthesized_expression" => {
            let mut cursor = object.walk();
            let inner = object.named_children(&mut cursor).next();
            match inner {
                Some(inner) => classify_receiver(&inner, source),
                None => Receiver::Opaque,
            }
        }
        _ => Receiver::Opaque,
    }
}
