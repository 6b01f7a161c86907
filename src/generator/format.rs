//! Canonicalization pass over rendered Go source.
//!
//! The pass re-parses the text with tree-sitter, merges every import
//! declaration into a single sorted block and re-indents by bracket depth.
//! It covers the layout of generated clients, not all of gofmt.

use std::ops::Range;

use crate::parser::decl::extract_imports;
use crate::parser::{first_syntax_error, GoParser, Import, Result};

/// Canonicalize Go source. Fails when the text does not parse.
pub fn canonicalize(source: &str) -> Result<String> {
    let mut parser = GoParser::new()?;
    let tree = parser.parse(source)?;
    if let Some(err) = first_syntax_error(&tree) {
        return Err(err);
    }

    let root = tree.root_node();
    let mut imports = extract_imports(&root, source);
    imports.sort_by(|a, b| a.path.cmp(&b.path).then_with(|| a.alias.cmp(&b.alias)));
    imports.dedup();

    let mut ranges: Vec<Range<usize>> = Vec::new();
    let mut cursor = root.walk();
    for child in root.children(&mut cursor) {
        if child.kind() == "import_declaration" {
            ranges.push(child.byte_range());
        }
    }

    let mut merged = String::with_capacity(source.len());
    let mut last = 0;
    for (i, range) in ranges.iter().enumerate() {
        merged.push_str(&source[last..range.start]);
        if i == 0 {
            merged.push_str(&import_block(&imports));
        }
        last = range.end;
    }
    merged.push_str(&source[last..]);

    Ok(reindent(&merged))
}

fn import_block(imports: &[Import]) -> String {
    if imports.is_empty() {
        return String::new();
    }

    let mut block = String::from("import (\n");
    for import in imports {
        block.push('\t');
        if let Some(alias) = &import.alias {
            block.push_str(alias);
            block.push(' ');
        }
        block.push('"');
        block.push_str(&import.path);
        block.push_str("\"\n");
    }
    block.push(')');
    block
}

/// Indent with tabs by bracket depth, trim trailing space and collapse
/// runs of blank lines.
fn reindent(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut depth: usize = 0;
    let mut blank_run = false;

    for line in source.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            if !out.is_empty() && !blank_run {
                out.push('\n');
            }
            blank_run = true;
            continue;
        }
        blank_run = false;

        let closers = trimmed
            .chars()
            .take_while(|c| matches!(c, '}' | ')' | ']'))
            .count();
        let indent = depth.saturating_sub(closers);
        for _ in 0..indent {
            out.push('\t');
        }
        out.push_str(trimmed);
        out.push('\n');

        let next = depth as isize + bracket_delta(trimmed);
        depth = next.max(0) as usize;
    }

    while out.ends_with("\n\n") {
        out.pop();
    }
    if !out.ends_with('\n') {
        out.push('\n');
    }
    out
}

/// Net bracket change of one line, ignoring strings, runes and comments
fn bracket_delta(line: &str) -> isize {
    let mut delta = 0;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut prev = '\0';

    for c in line.chars() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' && q != '`' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            prev = c;
            continue;
        }

        match c {
            '/' if prev == '/' => break,
            '"' | '\'' | '`' => quote = Some(c),
            '{' | '(' | '[' => delta += 1,
            '}' | ')' | ']' => delta -= 1,
            _ => {}
        }
        prev = c;
    }

    delta
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::ParseError;

    #[test]
    fn test_merges_and_sorts_imports() {
        let source = "package client\n\nimport \"zeta/z\"\nimport (\n    b \"beta/b\"\n  \"alpha/a\"\n\"zeta/z\"\n)\n\nvar _ = a.X\n";
        let out = canonicalize(source).unwrap();

        assert_eq!(
            out,
            "package client\n\nimport (\n\t\"alpha/a\"\n\tb \"beta/b\"\n\t\"zeta/z\"\n)\n\nvar _ = a.X\n"
        );
    }

    #[test]
    fn test_reindents_blocks() {
        let source = "package client\n\n\n\nfunc F() {\n        if true {\nreturn\n   }\n}   \n\n\n";
        let out = canonicalize(source).unwrap();

        assert_eq!(
            out,
            "package client\n\nfunc F() {\n\tif true {\n\t\treturn\n\t}\n}\n"
        );
    }

    #[test]
    fn test_brackets_in_strings_and_comments_are_ignored() {
        assert_eq!(bracket_delta("x := \"{(\" // }"), 0);
        assert_eq!(bracket_delta("call(\"a\\\"{\", '}') {"), 1);
        assert_eq!(bracket_delta("}"), -1);
    }

    #[test]
    fn test_syntax_error_is_reported() {
        let result = canonicalize("package client\n\nfunc (c *Math) Sum(args ) (*, error) {\n");
        assert!(matches!(result, Err(ParseError::SyntaxError { .. })));
    }
}
