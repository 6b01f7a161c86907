pub mod decl;
pub mod error;

pub use decl::{FileSyntax, Import, MethodSpec, ParamSpec, TypeExpr, TypeSpec};
pub use error::{ParseError, Result};

use std::path::Path;
use tree_sitter::{Node, Parser, Tree};

/// Go language parser using tree-sitter
pub struct GoParser {
    parser: Parser,
}

impl GoParser {
    /// Create a new Go parser
    pub fn new() -> Result<Self> {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_go::LANGUAGE.into())
            .map_err(|e| ParseError::LanguageSetupFailed(e.to_string()))?;
        Ok(Self { parser })
    }

    /// Parse Go source code
    pub fn parse(&mut self, source: &str) -> Result<Tree> {
        self.parser.parse(source, None).ok_or(ParseError::ParseFailed)
    }

    /// Parse a Go file and extract its top-level declarations
    pub fn parse_file(&mut self, path: &Path) -> Result<FileSyntax> {
        let source = std::fs::read_to_string(path).map_err(|source| ParseError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let tree = self.parse(&source)?;
        if let Some(err) = first_syntax_error(&tree) {
            // tree-sitter recovers, so the declarations around the error are still usable
            tracing::warn!(file = %path.display(), "{}", err);
        }

        decl::extract_file_syntax(path, &source, &tree)
    }
}

/// Locate the first error or missing node in a tree, if any.
pub fn first_syntax_error(tree: &Tree) -> Option<ParseError> {
    let root = tree.root_node();
    if !root.has_error() {
        return None;
    }

    let node = find_error_node(root).unwrap_or(root);
    let point = node.start_position();
    let message = if node.is_missing() {
        format!("missing {}", node.kind())
    } else {
        "unexpected input".to_string()
    };

    Some(ParseError::SyntaxError {
        line: point.row + 1,
        column: point.column + 1,
        message,
    })
}

fn find_error_node(node: Node) -> Option<Node> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    if !node.has_error() {
        return None;
    }

    let mut cursor = node.walk();
    let children: Vec<Node> = node.children(&mut cursor).collect();
    children.into_iter().find_map(find_error_node)
}
