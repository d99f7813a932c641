//! Conversion from a tree-sitter parse into owned nodes.

use super::{Position, Span, SyntaxNode};
use crate::lang::python::is_statement;
use std::collections::BTreeMap;
use std::sync::Arc;
use tree_sitter::{Node, Tree, TreeCursor};

struct CommentLine {
    text: String,
    own_line: bool,
}

pub(super) fn build(tree: &Tree, source: &Arc<str>) -> SyntaxNode {
    let mut cursor = tree.walk();
    let mut root = convert(&mut cursor, None, source);

    let mut comments = BTreeMap::new();
    index_comments(&root, source, &mut comments);
    attach_leading_comments(&mut root, &comments);
    root
}

fn convert(cursor: &mut TreeCursor<'_>, field: Option<&'static str>, source: &Arc<str>) -> SyntaxNode {
    let node = cursor.node();
    let mut children = Vec::new();

    if cursor.goto_first_child() {
        loop {
            let child_field = cursor.field_name();
            children.push(convert(cursor, child_field, source));
            if !cursor.goto_next_sibling() {
                break;
            }
        }
        cursor.goto_parent();
    }

    SyntaxNode {
        kind: node.kind(),
        field,
        named: node.is_named(),
        span: span_of(&node, source),
        children,
        leading_comments: Vec::new(),
        replacement: None,
        removed: Vec::new(),
        dirty: false,
        source: Arc::clone(source),
    }
}

fn span_of(node: &Node<'_>, source: &str) -> Span {
    Span {
        start_byte: node.start_byte(),
        end_byte: node.end_byte(),
        start: position_at(source, node.start_byte(), node.start_position()),
        end: position_at(source, node.end_byte(), node.end_position()),
    }
}

/// Tree-sitter columns count bytes; oracles count characters.
fn position_at(source: &str, byte: usize, point: tree_sitter::Point) -> Position {
    let line_start = byte - point.column;
    Position {
        line: point.row + 1,
        column: source[line_start..byte].chars().count(),
    }
}

fn index_comments(node: &SyntaxNode, source: &str, comments: &mut BTreeMap<usize, CommentLine>) {
    for node in node.descendants().filter(|n| n.is_comment()) {
        let start = node.span.start_byte;
        let line_start = source[..start].rfind('\n').map_or(0, |i| i + 1);
        comments.insert(
            node.span.start.line,
            CommentLine {
                text: source[node.span.bytes()].trim_end().to_string(),
                own_line: source[line_start..start].trim().is_empty(),
            },
        );
    }
}

fn attach_leading_comments(node: &mut SyntaxNode, comments: &BTreeMap<usize, CommentLine>) {
    if is_statement(node.kind) {
        let mut block = Vec::new();
        let mut line = node.span.start.line;
        while line > 1 {
            line -= 1;
            match comments.get(&line) {
                Some(comment) if comment.own_line => block.push(comment.text.clone()),
                _ => break,
            }
        }
        block.reverse();
        node.leading_comments = block;
    }

    for child in &mut node.children {
        attach_leading_comments(child, comments);
    }
}
