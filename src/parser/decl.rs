//! Syntax-level extraction of the top-level Go declarations the generator
//! cares about: the package clause, imports, type specs and methods.
//!
//! Nothing here resolves names. Type expressions are kept as [`TypeExpr`]
//! and turned into semantic types by [`crate::model::loader`].

use std::path::{Path, PathBuf};
use tree_sitter::{Node, Tree};

use super::error::{ParseError, Result};

/// Declarations found in a single Go file
#[derive(Debug, Clone)]
pub struct FileSyntax {
    pub path: PathBuf,
    pub package_name: String,
    pub imports: Vec<Import>,
    pub types: Vec<TypeSpec>,
    pub methods: Vec<MethodSpec>,
}

/// Import statement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Import {
    pub path: String,
    pub alias: Option<String>,
}

/// `type Name T` or `type Name = T`
#[derive(Debug, Clone)]
pub struct TypeSpec {
    pub name: String,
    pub alias: bool,
    pub ty: TypeExpr,
}

/// A method declaration with its receiver's base type name
#[derive(Debug, Clone)]
pub struct MethodSpec {
    pub receiver: String,
    pub pointer_receiver: bool,
    pub name: String,
    pub params: Vec<ParamSpec>,
    pub results: Vec<ParamSpec>,
    pub variadic: bool,
}

#[derive(Debug, Clone)]
pub struct ParamSpec {
    pub name: Option<String>,
    pub ty: TypeExpr,
}

/// Unresolved type expression as written in source
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeExpr {
    Ident(String),
    Qualified { package: String, name: String },
    Pointer(Box<TypeExpr>),
    Slice(Box<TypeExpr>),
    Array { len: String, elem: Box<TypeExpr> },
    Map { key: Box<TypeExpr>, value: Box<TypeExpr> },
    /// Anything the generator never needs to look inside (struct, interface,
    /// func, chan and generic instantiations), kept as source text.
    Other(String),
}

/// Extract file information from parsed tree
pub fn extract_file_syntax(path: &Path, source: &str, tree: &Tree) -> Result<FileSyntax> {
    let root = tree.root_node();

    let package_name = extract_package_name(&root, source)
        .ok_or_else(|| ParseError::MissingPackageClause(path.to_path_buf()))?;

    let mut file = FileSyntax {
        path: path.to_path_buf(),
        package_name,
        imports: extract_imports(&root, source),
        types: Vec::new(),
        methods: Vec::new(),
    };

    let mut cursor = root.walk();
    for child in root.children(&mut cursor) {
        match child.kind() {
            "type_declaration" => extract_type_specs(&child, source, &mut file.types),
            "method_declaration" => {
                if let Some(method) = parse_method(&child, source) {
                    file.methods.push(method);
                }
            }
            _ => {}
        }
    }

    Ok(file)
}

/// Extract package name from source
fn extract_package_name(root: &Node, source: &str) -> Option<String> {
    let mut cursor = root.walk();

    for child in root.children(&mut cursor) {
        if child.kind() == "package_clause" {
            // package_identifier is a plain child of the clause, not a field
            let mut pkg_cursor = child.walk();
            for grandchild in child.children(&mut pkg_cursor) {
                if grandchild.kind() == "package_identifier" {
                    return Some(text(&grandchild, source).to_string());
                }
            }
        }
    }

    None
}

/// Extract imports from source
pub fn extract_imports(root: &Node, source: &str) -> Vec<Import> {
    let mut imports = Vec::new();
    let mut cursor = root.walk();

    for child in root.children(&mut cursor) {
        if child.kind() == "import_declaration" {
            extract_import_specs(&child, source, &mut imports);
        }
    }

    imports
}

/// Extract import specs from import declaration
fn extract_import_specs(node: &Node, source: &str, imports: &mut Vec<Import>) {
    let mut cursor = node.walk();

    for child in node.children(&mut cursor) {
        if child.kind() == "import_spec_list" {
            let mut spec_cursor = child.walk();
            for spec in child.children(&mut spec_cursor) {
                if spec.kind() == "import_spec" {
                    if let Some(import) = parse_import_spec(&spec, source) {
                        imports.push(import);
                    }
                }
            }
        } else if child.kind() == "import_spec" {
            if let Some(import) = parse_import_spec(&child, source) {
                imports.push(import);
            }
        }
    }
}

/// Parse a single import spec
fn parse_import_spec(spec: &Node, source: &str) -> Option<Import> {
    let path = spec
        .child_by_field_name("path")
        .map(|node| text(&node, source).trim_matches(|c| c == '"' || c == '`').to_string())
        .filter(|path| !path.is_empty())?;

    let alias = spec
        .child_by_field_name("name")
        .map(|node| text(&node, source).to_string());

    Some(Import { path, alias })
}

fn extract_type_specs(node: &Node, source: &str, types: &mut Vec<TypeSpec>) {
    let mut cursor = node.walk();

    for child in node.children(&mut cursor) {
        let alias = match child.kind() {
            "type_spec" => false,
            "type_alias" => true,
            _ => continue,
        };

        let name = child.child_by_field_name("name");
        let ty = child.child_by_field_name("type");
        if let (Some(name), Some(ty)) = (name, ty) {
            types.push(TypeSpec {
                name: text(&name, source).to_string(),
                alias,
                ty: parse_type(&ty, source),
            });
        }
    }
}

fn parse_method(node: &Node, source: &str) -> Option<MethodSpec> {
    let name = text(&node.child_by_field_name("name")?, source).to_string();

    let receiver_list = node.child_by_field_name("receiver")?;
    let mut cursor = receiver_list.walk();
    let receiver_decl = receiver_list
        .named_children(&mut cursor)
        .find(|n| n.kind() == "parameter_declaration")?;
    let (receiver, pointer_receiver) =
        receiver_base_name(&receiver_decl.child_by_field_name("type")?, source)?;

    let mut params = Vec::new();
    let mut variadic = false;
    if let Some(list) = node.child_by_field_name("parameters") {
        variadic = collect_params(&list, source, &mut params);
    }

    let mut results = Vec::new();
    if let Some(result) = node.child_by_field_name("result") {
        if result.kind() == "parameter_list" {
            collect_params(&result, source, &mut results);
        } else {
            results.push(ParamSpec {
                name: None,
                ty: parse_type(&result, source),
            });
        }
    }

    Some(MethodSpec {
        receiver,
        pointer_receiver,
        name,
        params,
        results,
        variadic,
    })
}

/// `*Service`, `Service` and `*Service[T]` all name `Service`.
fn receiver_base_name(node: &Node, source: &str) -> Option<(String, bool)> {
    match node.kind() {
        "type_identifier" => Some((text(node, source).to_string(), false)),
        "pointer_type" | "parenthesized_type" => {
            let inner = first_named_child(node)?;
            let (name, _) = receiver_base_name(&inner, source)?;
            Some((name, node.kind() == "pointer_type"))
        }
        "generic_type" => receiver_base_name(&node.child_by_field_name("type")?, source),
        _ => None,
    }
}

/// Flatten a parameter list so `(a, b int)` yields two params.
/// Returns whether the list ends in a variadic parameter.
fn collect_params(list: &Node, source: &str, params: &mut Vec<ParamSpec>) -> bool {
    let mut variadic = false;
    let mut cursor = list.walk();

    for decl in list.named_children(&mut cursor) {
        let is_variadic = match decl.kind() {
            "parameter_declaration" => false,
            "variadic_parameter_declaration" => true,
            _ => continue,
        };
        let Some(ty_node) = decl.child_by_field_name("type") else {
            continue;
        };

        let mut ty = parse_type(&ty_node, source);
        if is_variadic {
            ty = TypeExpr::Slice(Box::new(ty));
            variadic = true;
        }

        let mut name_cursor = decl.walk();
        let names: Vec<String> = decl
            .children_by_field_name("name", &mut name_cursor)
            .map(|n| text(&n, source).to_string())
            .collect();

        if names.is_empty() {
            params.push(ParamSpec { name: None, ty });
        } else {
            for name in names {
                params.push(ParamSpec {
                    name: Some(name),
                    ty: ty.clone(),
                });
            }
        }
    }

    variadic
}

/// Convert a type node into a [`TypeExpr`]
pub fn parse_type(node: &Node, source: &str) -> TypeExpr {
    let boxed = |field: &str| -> Option<Box<TypeExpr>> {
        node.child_by_field_name(field)
            .map(|n| Box::new(parse_type(&n, source)))
    };

    let parsed = match node.kind() {
        "type_identifier" => Some(TypeExpr::Ident(text(node, source).to_string())),
        "qualified_type" => {
            let package = node.child_by_field_name("package");
            let name = node.child_by_field_name("name");
            match (package, name) {
                (Some(package), Some(name)) => Some(TypeExpr::Qualified {
                    package: text(&package, source).to_string(),
                    name: text(&name, source).to_string(),
                }),
                _ => None,
            }
        }
        "pointer_type" => {
            first_named_child(node).map(|n| TypeExpr::Pointer(Box::new(parse_type(&n, source))))
        }
        "parenthesized_type" => first_named_child(node).map(|n| parse_type(&n, source)),
        "slice_type" => boxed("element").map(TypeExpr::Slice),
        "array_type" => {
            let len = node
                .child_by_field_name("length")
                .map(|n| text(&n, source).to_string());
            match (len, boxed("element")) {
                (Some(len), Some(elem)) => Some(TypeExpr::Array { len, elem }),
                _ => None,
            }
        }
        "map_type" => match (boxed("key"), boxed("value")) {
            (Some(key), Some(value)) => Some(TypeExpr::Map { key, value }),
            _ => None,
        },
        _ => None,
    };

    parsed.unwrap_or_else(|| TypeExpr::Other(text(node, source).to_string()))
}

fn first_named_child<'tree>(node: &Node<'tree>) -> Option<Node<'tree>> {
    let mut cursor = node.walk();
    let child = node.named_children(&mut cursor).find(|n| n.kind() != "comment");
    child
}

fn text<'a>(node: &Node, source: &'a str) -> &'a str {
    node.utf8_text(source.as_bytes()).unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::GoParser;

    fn parse(source: &str) -> FileSyntax {
        let mut parser = GoParser::new().unwrap();
        let tree = parser.parse(source).unwrap();
        extract_file_syntax(Path::new("service.go"), source, &tree).unwrap()
    }

    #[test]
    fn test_extract_package_and_imports() {
        let file = parse(
            r#"
package math

import (
    "net/http"
    m "example.com/app/models"
    _ "embed"
)

import "fmt"
"#,
        );

        assert_eq!(file.package_name, "math");
        assert_eq!(
            file.imports,
            vec![
                Import {
                    path: "net/http".to_string(),
                    alias: None
                },
                Import {
                    path: "example.com/app/models".to_string(),
                    alias: Some("m".to_string())
                },
                Import {
                    path: "embed".to_string(),
                    alias: Some("_".to_string())
                },
                Import {
                    path: "fmt".to_string(),
                    alias: None
                },
            ]
        );
    }

    #[test]
    fn test_missing_package_clause() {
        let mut parser = GoParser::new().unwrap();
        let source = "func main() {}\n";
        let tree = parser.parse(source).unwrap();
        let result = extract_file_syntax(Path::new("broken.go"), source, &tree);
        assert!(matches!(result, Err(ParseError::MissingPackageClause(_))));
    }

    #[test]
    fn test_extract_type_specs() {
        let file = parse(
            r#"
package math

type Service struct{}

type (
    SumArg struct { Values []int }
    Alias = SumArg
)
"#,
        );

        let names: Vec<(&str, bool)> = file
            .types
            .iter()
            .map(|t| (t.name.as_str(), t.alias))
            .collect();
        assert_eq!(
            names,
            vec![("Service", false), ("SumArg", false), ("Alias", true)]
        );
        assert_eq!(file.types[2].ty, TypeExpr::Ident("SumArg".to_string()));
    }

    #[test]
    fn test_extract_method_signature() {
        let file = parse(
            r#"
package math

func (s *Service) Sum(r *http.Request, arg map[string][]*Item, reply *[4]int) error {
    return nil
}

func (Service) Pair(a, b int) (int, error) { return 0, nil }

func helper() {}
"#,
        );

        assert_eq!(file.methods.len(), 2);

        let sum = &file.methods[0];
        assert_eq!(sum.receiver, "Service");
        assert!(sum.pointer_receiver);
        assert_eq!(sum.name, "Sum");
        assert_eq!(sum.params.len(), 3);
        assert_eq!(
            sum.params[0].ty,
            TypeExpr::Pointer(Box::new(TypeExpr::Qualified {
                package: "http".to_string(),
                name: "Request".to_string(),
            }))
        );
        assert_eq!(
            sum.params[1].ty,
            TypeExpr::Map {
                key: Box::new(TypeExpr::Ident("string".to_string())),
                value: Box::new(TypeExpr::Slice(Box::new(TypeExpr::Pointer(Box::new(
                    TypeExpr::Ident("Item".to_string())
                ))))),
            }
        );
        assert_eq!(
            sum.params[2].ty,
            TypeExpr::Pointer(Box::new(TypeExpr::Array {
                len: "4".to_string(),
                elem: Box::new(TypeExpr::Ident("int".to_string())),
            }))
        );
        assert_eq!(sum.results.len(), 1);
        assert_eq!(sum.results[0].ty, TypeExpr::Ident("error".to_string()));

        let pair = &file.methods[1];
        assert!(!pair.pointer_receiver);
        assert_eq!(pair.params.len(), 2);
        assert_eq!(pair.params[1].name.as_deref(), Some("b"));
        assert_eq!(pair.results.len(), 2);
    }

    #[test]
    fn test_variadic_and_literal_types() {
        let file = parse(
            r#"
package math

func (s *Service) Log(prefix interface{}, values ...string) {}
"#,
        );

        let log = &file.methods[0];
        assert!(log.variadic);
        assert_eq!(log.params[0].ty, TypeExpr::Other("interface{}".to_string()));
        assert_eq!(
            log.params[1].ty,
            TypeExpr::Slice(Box::new(TypeExpr::Ident("string".to_string())))
        );
        assert!(log.results.is_empty());
    }
}
