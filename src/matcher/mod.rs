//! Structural matching of patterns against syntax nodes.
//!
//! A [`Pattern`] describes a node shape; matching it against a node yields
//! the nodes bound by its captures. Matching is deterministic and never
//! fails with an error: a node of the wrong shape simply does not match.
//!
//! ## Example
//!
//! ```rust
//! use koza_refactor::cst::SyntaxTree;
//! use koza_refactor::matcher::{Pattern, extractall};
//!
//! // row["Field"]
//! let row_access = Pattern::kind("subscript")
//!     .field("value", Pattern::name("row"))
//!     .field("subscript", Pattern::string().capture("key"));
//!
//! let tree = SyntaxTree::parse("x = row['a'] or row['b']\n", "t.py")?;
//! let keys: Vec<_> = extractall(&row_access, tree.root())
//!     .iter()
//!     .map(|c| c.get("key").unwrap().text().into_owned())
//!     .collect();
//! assert_eq!(keys, ["'a'", "'b'"]);
//! # Ok::<(), koza_refactor::error::RefactorError>(())
//! ```

mod pattern;

pub use pattern::{FieldMatch, ListPattern, NodePattern, Pattern, TextMatch};

use crate::cst::SyntaxNode;
use crate::error::{RefactorError, Result};
use std::collections::HashMap;

/// Nodes bound by the captures of a successful match.
#[derive(Debug, Clone, Default)]
pub struct Captures<'t> {
    nodes: HashMap<String, &'t SyntaxNode>,
}

impl<'t> Captures<'t> {
    /// The node bound under `name`, if any.
    pub fn get(&self, name: &str) -> Option<&'t SyntaxNode> {
        self.nodes.get(name).copied()
    }

    /// The node bound under `name`; its absence is a contract violation.
    pub fn require(&self, name: &str) -> Result<&'t SyntaxNode> {
        self.get(name)
            .ok_or_else(|| RefactorError::contract(format!("capture '{name}' is not bound")))
    }

    /// The node bound under `name`, which must be of `kind`.
    pub fn require_kind(&self, name: &str, kind: &str) -> Result<&'t SyntaxNode> {
        let node = self.require(name)?;
        if node.kind() != kind {
            return Err(RefactorError::contract(format!(
                "capture '{name}' at line {} is a {}, expected {kind}",
                node.start().line,
                node.kind()
            )));
        }
        Ok(node)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn bind(&mut self, name: &str, node: &'t SyntaxNode) {
        self.nodes.insert(name.to_string(), node);
    }
}

impl Pattern {
    /// Matches this pattern against `node` itself.
    pub fn matches<'t>(&self, node: &'t SyntaxNode) -> Option<Captures<'t>> {
        let mut captures = Captures::default();
        self.match_into(node, &mut captures).then_some(captures)
    }

    /// Returns true if the pattern matches `node` itself.
    pub fn is_match(&self, node: &SyntaxNode) -> bool {
        self.matches(node).is_some()
    }

    fn match_into<'t>(&self, node: &'t SyntaxNode, captures: &mut Captures<'t>) -> bool {
        match self {
            Pattern::Any => true,
            Pattern::Node(shape) => shape.match_into(node, captures),
            Pattern::Capture { name, pattern } => {
                if pattern.match_into(node, captures) {
                    captures.bind(name, node);
                    true
                } else {
                    false
                }
            }
            Pattern::OneOf(alternatives) => {
                for alternative in alternatives {
                    let mut trial = captures.clone();
                    if alternative.match_into(node, &mut trial) {
                        *captures = trial;
                        return true;
                    }
                }
                false
            }
        }
    }
}

impl NodePattern {
    fn match_into<'t>(&self, node: &'t SyntaxNode, captures: &mut Captures<'t>) -> bool {
        if self.kind.is_some_and(|kind| kind != node.kind()) {
            return false;
        }
        if let Some(ref text) = self.text {
            if !text.is_match(&node.text()) {
                return false;
            }
        }
        if let Some(ref comment) = self.leading_comment {
            match node.leading_comments().last() {
                Some(line) if comment.is_match(line) => {}
                _ => return false,
            }
        }

        for (field, expected) in &self.fields {
            let matched = match expected {
                FieldMatch::One(pattern) => node
                    .child_by_field(field)
                    .is_some_and(|child| pattern.match_into(child, captures)),
                FieldMatch::List(list) => {
                    let children: Vec<_> = node.children_by_field(field).collect();
                    list.match_into(&children, captures)
                }
                FieldMatch::Absent => node.child_by_field(field).is_none(),
            };
            if !matched {
                return false;
            }
        }

        if let Some(ref list) = self.children {
            let children: Vec<_> = node.named_children().collect();
            if !list.match_into(&children, captures) {
                return false;
            }
        }
        true
    }
}

impl ListPattern {
    fn match_into<'t>(&self, nodes: &[&'t SyntaxNode], captures: &mut Captures<'t>) -> bool {
        let length_ok = if self.rest {
            nodes.len() >= self.items.len()
        } else {
            nodes.len() == self.items.len()
        };
        length_ok
            && self
                .items
                .iter()
                .zip(nodes)
                .all(|(pattern, node)| pattern.match_into(node, captures))
    }
}

/// Captures of the first match in `node`'s subtree, in pre-order.
pub fn extract<'t>(pattern: &Pattern, node: &'t SyntaxNode) -> Option<Captures<'t>> {
    node.descendants().find_map(|n| pattern.matches(n))
}

/// Captures of every match in the subtree, in pre-order.
pub fn extractall<'t>(pattern: &Pattern, subtree: &'t SyntaxNode) -> Vec<Captures<'t>> {
    subtree
        .descendants()
        .filter_map(|n| pattern.matches(n))
        .collect()
}

/// Every node in the subtree matched by `pattern`, in pre-order.
pub fn findall<'t>(pattern: &Pattern, subtree: &'t SyntaxNode) -> Vec<&'t SyntaxNode> {
    subtree
        .descendants()
        .filter(|n| pattern.is_match(n))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cst::SyntaxTree;

    fn first<'a>(tree: &'a SyntaxTree, kind: &str) -> &'a SyntaxNode {
        tree.root().descendants().find(|n| n.kind() == kind).unwrap()
    }

    #[test]
    fn test_literal_shape_with_captures() {
        let tree = SyntaxTree::parse("m = koza_app.get_map('genes')\n", "t.py").unwrap();
        let pattern = Pattern::kind("assignment")
            .field("left", Pattern::kind("identifier").capture("var"))
            .field(
                "right",
                Pattern::kind("call")
                    .field("function", Pattern::attribute("koza_app", "get_map"))
                    .field(
                        "arguments",
                        Pattern::kind("argument_list").children(vec![Pattern::string().capture("map")]),
                    ),
            );

        let captures = pattern.matches(first(&tree, "assignment")).unwrap();
        assert_eq!(captures.get("var").unwrap().text(), "m");
        assert_eq!(captures.get("map").unwrap().text(), "'genes'");
        assert_eq!(captures.len(), 2);
    }

    #[test]
    fn test_shape_mismatch_is_no_match() {
        let tree = SyntaxTree::parse("m = other.get_map('genes')\n", "t.py").unwrap();
        let pattern = Pattern::kind("call").field("function", Pattern::attribute("koza_app", "get_map"));
        assert!(pattern.matches(first(&tree, "call")).is_none());
        assert!(extract(&pattern, tree.root()).is_none());
    }

    #[test]
    fn test_exact_children_length() {
        let tree = SyntaxTree::parse("f(a, b)\n", "t.py").unwrap();
        let args = first(&tree, "argument_list");

        assert!(!Pattern::kind("argument_list").children(vec![Pattern::any()]).is_match(args));
        assert!(Pattern::kind("argument_list")
            .children(vec![Pattern::any(), Pattern::any()])
            .is_match(args));
        assert!(Pattern::kind("argument_list")
            .children_prefix(vec![Pattern::name("a")])
            .is_match(args));
    }

    #[test]
    fn test_one_of_first_alternative_wins() {
        let tree = SyntaxTree::parse("x\n", "t.py").unwrap();
        let pattern = Pattern::one_of(vec![
            Pattern::name("x").capture("first"),
            Pattern::kind("identifier").capture("second"),
        ]);
        let captures = pattern.matches(first(&tree, "identifier")).unwrap();
        assert!(captures.get("first").is_some());
        assert!(captures.get("second").is_none());
    }

    #[test]
    fn test_failed_alternative_leaves_no_captures() {
        let tree = SyntaxTree::parse("f(a)\n", "t.py").unwrap();
        let pattern = Pattern::one_of(vec![
            Pattern::kind("call")
                .field("function", Pattern::kind("identifier").capture("callee"))
                .field("arguments", Pattern::kind("argument_list").children(vec![])),
            Pattern::kind("call"),
        ]);
        let captures = pattern.matches(first(&tree, "call")).unwrap();
        assert!(captures.is_empty());
    }

    #[test]
    fn test_parenthesized_is_transparent() {
        let tree = SyntaxTree::parse("y = (x)\nz = x\n", "t.py").unwrap();
        let pattern = Pattern::kind("assignment").field("right", Pattern::parenthesized(Pattern::name("x")));
        assert_eq!(findall(&pattern, tree.root()).len(), 2);
    }

    #[test]
    fn test_extractall_in_pre_order() {
        let tree = SyntaxTree::parse("f(row['a'], g(row['b']))\nrow['c']\n", "t.py").unwrap();
        let pattern = Pattern::kind("subscript")
            .field("value", Pattern::name("row"))
            .field_list("subscript", ListPattern::exact(vec![Pattern::string().capture("key")]));
        let keys: Vec<_> = extractall(&pattern, tree.root())
            .iter()
            .map(|c| c.get("key").unwrap().text().into_owned())
            .collect();
        assert_eq!(keys, ["'a'", "'b'", "'c'"]);
    }

    #[test]
    fn test_without_field() {
        let tree = SyntaxTree::parse("while x:\n    pass\nelse:\n    pass\n", "t.py").unwrap();
        let node = first(&tree, "while_statement");
        assert!(!Pattern::kind("while_statement").without("alternative").is_match(node));
        assert!(Pattern::kind("while_statement").is_match(node));
    }

    #[test]
    fn test_leading_comment_prefix() {
        let tree = SyntaxTree::parse("# !DocumentClass here\nx = Gene()\n", "t.py").unwrap();
        let statement = first(&tree, "expression_statement");
        let marked = Pattern::kind("expression_statement")
            .leading_comment(TextMatch::Prefix("# !DocumentClass".into()));
        assert!(marked.is_match(statement));
    }

    #[test]
    fn test_text_regex() {
        let tree = SyntaxTree::parse("taxa_map = 1\nrow = 2\n", "t.py").unwrap();
        let maps = Pattern::kind("identifier").text_regex(r"_map$").unwrap();
        let found: Vec<_> = findall(&maps, tree.root()).iter().map(|n| n.text().into_owned()).collect();
        assert_eq!(found, ["taxa_map"]);

        let err = Pattern::any().text_regex("(").unwrap_err();
        assert!(matches!(err, RefactorError::Regex(_)));
    }

    #[test]
    fn test_require_kind_reports_contract_violation() {
        let tree = SyntaxTree::parse("x = 1\n", "t.py").unwrap();
        let pattern = Pattern::kind("assignment").field("right", Pattern::any().capture("value"));
        let captures = pattern.matches(first(&tree, "assignment")).unwrap();

        assert_eq!(captures.require_kind("value", "integer").unwrap().text(), "1");
        let err = captures.require_kind("value", "string").unwrap_err();
        assert!(matches!(err, RefactorError::Contract { .. }));
        assert!(captures.require("missing").is_err());
    }
}
