//! Generic tree-sitter front-end.
//!
//! Each grammar is described by a [`Config`]; the front-end parses with a fresh
//! `tree_sitter::Parser` per call and lowers the concrete tree into owned
//! [`SyntaxNode`]s (named nodes only, field names preserved).

use std::path::Path;

use tree_sitter::{Language, Node, Tree};

use super::{Frontend, SyntaxNode};
use crate::error::ParseError;

/// Language-specific configuration for tree-sitter parsing.
pub struct Config {
    /// The tree-sitter language.
    pub language: Language,
    /// Language name (e.g., "java").
    pub language_name: &'static str,
    /// File extensions handled (without dot).
    pub extensions: &'static [&'static str],
}

/// A front-end backed by a tree-sitter grammar.
pub struct TreeSitterFrontend {
    config: Config,
}

impl TreeSitterFrontend {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    fn parse_tree(&self, path: &Path, source: &str) -> Result<Tree, ParseError> {
        let mut parser = tree_sitter::Parser::new();
        parser.set_language(&self.config.language).map_err(|e| {
            ParseError::new(
                path,
                format!("cannot load {} grammar: {}", self.config.language_name, e),
            )
        })?;

        parser
            .parse(source, None)
            .ok_or_else(|| ParseError::new(path, "parser produced no tree"))
    }
}

impl Frontend for TreeSitterFrontend {
    fn language(&self) -> &'static str {
        self.config.language_name
    }

    fn extensions(&self) -> &'static [&'static str] {
        self.config.extensions
    }

    fn parse(&self, path: &Path, source: &str) -> Result<SyntaxNode, ParseError> {
        let tree = self.parse_tree(path, source)?;
        let root = tree.root_node();

        if root.has_error() {
            if let Some((line, message)) = first_error(root) {
                return Err(ParseError::new(path, message).at_line(line));
            }
            return Err(ParseError::new(path, "syntax error"));
        }

        Ok(lower(root))
    }
}

/// Locate the first ERROR or MISSING node in source order.
fn first_error(root: Node) -> Option<(usize, String)> {
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if node.is_missing() {
            return Some((node.start_position().row + 1, format!("missing {}", node.kind())));
        }
        if node.is_error() {
            return Some((node.start_position().row + 1, "syntax error".to_string()));
        }
        if !node.has_error() {
            continue;
        }
        for i in (0..node.child_count()).rev() {
            if let Some(child) = node.child(i) {
                stack.push(child);
            }
        }
    }
    None
}

fn convert(node: Node, field: Option<&'static str>) -> SyntaxNode {
    SyntaxNode::new(
        node.kind(),
        node.start_byte(),
        node.end_byte(),
        node.start_position().row + 1,
    )
    .with_field(field)
}

/// Lower a tree-sitter tree into owned nodes.
///
/// Walks with a `TreeCursor` and an explicit stack so deeply nested sources
/// cannot exhaust the thread stack.
pub fn lower(root: Node) -> SyntaxNode {
    let mut lowered = convert(root, None);
    let mut cursor = root.walk();
    if !cursor.goto_first_child() {
        return lowered;
    }

    // Open named ancestors of the cursor, excluding the root.
    let mut open: Vec<SyntaxNode> = Vec::new();

    loop {
        let node = cursor.node();
        if node.is_named() {
            open.push(convert(node, cursor.field_name()));
            if cursor.goto_first_child() {
                continue;
            }
            close(&mut open, &mut lowered);
        }

        loop {
            if cursor.goto_next_sibling() {
                break;
            }
            if !cursor.goto_parent() || cursor.node().id() == root.id() {
                return lowered;
            }
            close(&mut open, &mut lowered);
        }
    }
}

fn close(open: &mut Vec<SyntaxNode>, root: &mut SyntaxNode) {
    if let Some(done) = open.pop() {
        match open.last_mut() {
            Some(parent) => parent.push(done),
            None => root.push(done),
        }
    }
}
