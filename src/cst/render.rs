//! Serialization of (possibly edited) nodes back to source text.
//!
//! Untouched nodes print as their original slice. Edited nodes print the
//! original text between their children, so only the edited parts change.
//! Removed children take their line with them when they were alone on it.

use super::{Span, SyntaxNode};

impl SyntaxNode {
    /// Renders the node to source text.
    pub fn render(&self) -> String {
        let mut out = String::new();
        self.render_into(&mut out);
        out
    }

    /// Appends the node's text to `out` and returns the source offset up to
    /// which original text has been consumed.
    pub(super) fn render_into(&self, out: &mut String) -> usize {
        if let Some(text) = &self.replacement {
            out.push_str(text);
            return self.span.end_byte;
        }
        if !self.dirty {
            out.push_str(&self.source[self.span.bytes()]);
            return self.span.end_byte;
        }

        let source = &*self.source;
        let mut cursor = self.span.start_byte;
        let mut previous_end: Option<usize> = None;
        let mut removed = self.removed.iter().peekable();

        for child in &self.children {
            while let Some(span) = removed.next_if(|s| s.start_byte < child.span.start_byte) {
                cursor = excise(source, span, previous_end, cursor, out);
                previous_end = Some(span.end_byte);
            }
            if child.span.start_byte > cursor {
                out.push_str(&source[cursor..child.span.start_byte]);
            }
            cursor = cursor.max(child.render_into(out));
            previous_end = Some(child.span.end_byte);
        }
        for span in removed {
            cursor = excise(source, span, previous_end, cursor, out);
            previous_end = Some(span.end_byte);
        }

        if self.span.end_byte > cursor {
            out.push_str(&source[cursor..self.span.end_byte]);
        }
        cursor.max(self.span.end_byte)
    }
}

/// Emits the text before a removed span and returns the new cursor.
fn excise(
    source: &str,
    span: &Span,
    previous_end: Option<usize>,
    cursor: usize,
    out: &mut String,
) -> usize {
    let range = removal_range(source, span, previous_end, cursor);
    if range.start > cursor {
        out.push_str(&source[cursor..range.start]);
    }
    range.end.max(cursor)
}

/// The bytes to drop for a removed span.
///
/// A node alone on its line(s) loses the whole line including the newline,
/// plus the blank lines separating it from the previous sibling. When the
/// line's indentation was already emitted by an ancestor, the blank lines
/// and indentation that follow are dropped instead so the next statement
/// keeps its column. A span sharing its line keeps the line, losing the
/// spaces around a `;` it carries or before a trailing comment.
fn removal_range(
    source: &str,
    span: &Span,
    previous_end: Option<usize>,
    cursor: usize,
) -> std::ops::Range<usize> {
    let text = &source[span.bytes()];
    let mut start = span.start_byte;
    let mut end = span.end_byte;
    if text.ends_with(';') {
        end += horizontal_space(&source[end..]);
    }
    if text.starts_with(';') {
        let floor = cursor.min(start);
        start = floor + source[floor..start].trim_end_matches([' ', '\t']).len();
    }

    let line_start = source[..start].rfind('\n').map_or(0, |i| i + 1);
    let line_end = source[end..].find('\n').map_or(source.len(), |i| end + i + 1);
    let leads_line = source[line_start..start].trim().is_empty();
    let rest = source[end..line_end].trim();
    if !(leads_line && rest.is_empty()) {
        if leads_line && rest.starts_with('#') {
            end += horizontal_space(&source[end..]);
        }
        return start..end;
    }

    if line_start < cursor {
        let mut next = line_end;
        while let Some(len) = blank_line(&source[next..]) {
            next += len;
        }
        return start..next + horizontal_space(&source[next..]);
    }

    start = line_start;
    if let Some(floor) = previous_end {
        while start > 0 {
            let prev_start = source[..start - 1].rfind('\n').map_or(0, |i| i + 1);
            if prev_start <= floor || !source[prev_start..start].trim().is_empty() {
                break;
            }
            start = prev_start;
        }
    }
    start..line_end
}

fn horizontal_space(text: &str) -> usize {
    text.find(|c: char| c != ' ' && c != '\t').unwrap_or(text.len())
}

/// Length of the first line of `text` if it is blank, newline included.
fn blank_line(text: &str) -> Option<usize> {
    let newline = text.find('\n')?;
    text[..newline].trim().is_empty().then_some(newline + 1)
}

#[cfg(test)]
mod tests {
    use crate::cst::{SyntaxNode, SyntaxTree};

    /// Removes the top-level statements at the given indices.
    fn remove_statements(source: &str, indices: &[usize]) -> String {
        let tree = SyntaxTree::parse(source, "t.py").unwrap();
        let root = tree.root().clone();
        let mut kept = Vec::new();
        let mut removed = Vec::new();
        for (i, child) in root.children().iter().enumerate() {
            if indices.contains(&i) {
                removed.push(*child.span());
            } else {
                kept.push(child.clone());
            }
        }
        let root = root.with_children(kept, removed);
        tree.with_root(root).render()
    }

    #[test]
    fn test_removing_statement_drops_its_line_and_leading_blank_lines() {
        let source = "\nfrom koza.cli_utils import get_koza_app\n\nkoza_app = get_koza_app(\"t\")\n\nprint(\"ok\")\n";
        assert_eq!(remove_statements(source, &[0, 1]), "\n\nprint(\"ok\")\n");
    }

    #[test]
    fn test_removing_first_statement_keeps_following_layout() {
        let source = "m = 1\n\nx = 2\n";
        assert_eq!(remove_statements(source, &[0]), "\nx = 2\n");
    }

    #[test]
    fn test_replaced_leaf_renders_new_text() {
        let tree = SyntaxTree::parse("label = row['Name']\n", "t.py").unwrap();
        let root = rename_all(tree.root(), "row", "record");
        assert_eq!(tree.with_root(root).render(), "label = record['Name']\n");
    }

    fn rename_all(node: &SyntaxNode, from: &str, to: &str) -> SyntaxNode {
        if node.kind() == "identifier" && node.text() == from {
            return node.clone().with_text(to);
        }
        if node.children().is_empty() {
            return node.clone();
        }
        let children = node
            .children()
            .iter()
            .map(|c| rename_all(c, from, to))
            .collect();
        node.with_children(children, Vec::new())
    }

    #[test]
    fn test_removing_first_statement_of_block_keeps_indentation() {
        let source = "def f():\n    x = 1\n    y = 2\n";
        let tree = SyntaxTree::parse(source, "t.py").unwrap();
        let root = drop_assignment(tree.root(), "x = 1");
        assert_eq!(tree.with_root(root).render(), "def f():\n    y = 2\n");
    }

    fn drop_assignment(node: &SyntaxNode, text: &str) -> SyntaxNode {
        if node.children().is_empty() {
            return node.clone();
        }
        let mut kept = Vec::new();
        let mut removed = Vec::new();
        for child in node.children() {
            if child.kind() == "expression_statement" && child.text() == text {
                removed.push(*child.span());
            } else {
                kept.push(drop_assignment(child, text));
            }
        }
        node.with_children(kept, removed)
    }

    #[test]
    fn test_removing_first_statement_of_block_drops_following_blank_lines() {
        let source = "def f():\n    x = 1\n\n    y = 2\n";
        let tree = SyntaxTree::parse(source, "t.py").unwrap();
        let root = drop_assignment(tree.root(), "x = 1");
        assert_eq!(tree.with_root(root).render(), "def f():\n    y = 2\n");
    }

    #[test]
    fn test_removing_statement_keeps_trailing_comment_at_line_start() {
        let source = "x = 1  # setup\nprint(1)\n";
        assert_eq!(remove_statements(source, &[0]), "# setup\nprint(1)\n");
    }

    #[test]
    fn test_removed_separator_takes_surrounding_spaces() {
        assert_eq!(remove_statements("a = 1; b = 2\n", &[1, 2]), "a = 1\n");
    }
}
