//! Which input columns a field value is derived from.

use crate::cst::SyntaxNode;
use crate::error::Result;
use crate::lang::python::string_value;
use crate::matcher::{ListPattern, Pattern, extractall};
use crate::oracle::TypeOracle;
use crate::transform::{Rule, RuleSet, Visit};
use std::collections::BTreeMap;
use tracing::trace;

/// `row["Column"]`, capturing the key literal as `source`.
pub fn row_access(record_variable: &str) -> Pattern {
    Pattern::kind("subscript")
        .field("value", Pattern::name(record_variable))
        .field_list(
            "subscript",
            ListPattern::exact(vec![Pattern::string().capture("source")]),
        )
}

/// Column keys read by assignments, keyed by the line of each key literal.
///
/// Filled once by [`AssignmentLedger::collect`] and read-only afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssignmentLedger {
    by_line: BTreeMap<usize, Vec<String>>,
}

impl AssignmentLedger {
    /// Records every row access in assignments outside `excluded` statements.
    pub fn collect(root: &SyntaxNode, record_variable: &str, excluded: &Pattern) -> Result<Self> {
        let access = row_access(record_variable);
        let rules = RuleSet::new().visit(
            Rule::on("ledger", Pattern::kind("assignment")).not_inside(excluded.clone()),
            |node, ledger: &mut AssignmentLedger| {
                for captures in extractall(&access, node) {
                    let literal = captures.require_kind("source", "string")?;
                    if let Some(value) = string_value(&literal.text()) {
                        ledger.record(literal.start().line, value);
                    }
                }
                Ok(Visit::SkipChildren)
            },
        );

        let mut ledger = AssignmentLedger::default();
        rules.walk(root, &mut ledger)?;
        trace!(lines = ledger.by_line.len(), "assignment ledger collected");
        Ok(ledger)
    }

    pub fn record(&mut self, line: usize, key: impl Into<String>) {
        self.by_line.entry(line).or_default().push(key.into());
    }

    /// Keys recorded on `line`, in appearance order.
    pub fn on_line(&self, line: usize) -> &[String] {
        self.by_line.get(&line).map_or(&[], Vec::as_slice)
    }

    pub fn is_empty(&self) -> bool {
        self.by_line.is_empty()
    }
}

/// The input columns `value` reads, or `None` if none can be found.
///
/// Row accesses anywhere inside the expression count, left to right. A bare
/// name is followed one hop to its definition line in the ledger.
pub fn resolve_sources(
    value: &SyntaxNode,
    access: &Pattern,
    ledger: &AssignmentLedger,
    oracle: &dyn TypeOracle,
) -> Result<Option<Vec<String>>> {
    let mut sources = Vec::new();

    for captures in extractall(access, value) {
        let literal = captures.require_kind("source", "string")?;
        if let Some(key) = string_value(&literal.text()) {
            sources.push(key.to_string());
        }
    }

    if value.kind() == "identifier" {
        if let Some(definition) = oracle.goto_definition(value.start())? {
            sources.extend(ledger.on_line(definition.line).iter().cloned());
        }
    }

    Ok((!sources.is_empty()).then_some(sources))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cst::{Position, SyntaxTree};
    use crate::oracle::StaticOracle;

    fn value_of<'a>(tree: &'a SyntaxTree, name: &str) -> &'a SyntaxNode {
        tree.root()
            .descendants()
            .find(|n| {
                n.kind() == "keyword_argument"
                    && n.child_by_field("name").is_some_and(|k| k.text() == name)
            })
            .and_then(|n| n.child_by_field("value"))
            .unwrap()
    }

    #[test]
    fn test_ledger_keys_by_literal_line() {
        let source = "a = row['label']\nb = row['x'] or (\n    row['y'])\nc = other['z']\n";
        let tree = SyntaxTree::parse(source, "t.py").unwrap();
        let ledger = AssignmentLedger::collect(tree.root(), "row", &Pattern::kind("never")).unwrap();

        assert_eq!(ledger.on_line(1), ["label"]);
        assert_eq!(ledger.on_line(2), ["x"]);
        assert_eq!(ledger.on_line(3), ["y"]);
        assert!(ledger.on_line(4).is_empty());
    }

    #[test]
    fn test_ledger_skips_excluded_statements() {
        let source = "def f():\n    a = row['a']\nb = row['b']\n";
        let tree = SyntaxTree::parse(source, "t.py").unwrap();
        let ledger =
            AssignmentLedger::collect(tree.root(), "row", &Pattern::kind("function_definition")).unwrap();

        assert!(ledger.on_line(2).is_empty());
        assert_eq!(ledger.on_line(3), ["b"]);
    }

    #[test]
    fn test_inline_sources_left_to_right() {
        let tree = SyntaxTree::parse("Gene(label=f(row[\"label\"]) or row['identifier'])\n", "t.py").unwrap();
        let sources = resolve_sources(
            value_of(&tree, "label"),
            &row_access("row"),
            &AssignmentLedger::default(),
            &StaticOracle::new(),
        )
        .unwrap();
        assert_eq!(sources.unwrap(), ["label", "identifier"]);
    }

    #[test]
    fn test_name_resolves_one_hop() {
        let source = "a = row['label']\nb = a\nGene(label=a, other=b)\n";
        let tree = SyntaxTree::parse(source, "t.py").unwrap();
        let access = row_access("row");
        let ledger = AssignmentLedger::collect(tree.root(), "row", &Pattern::kind("never")).unwrap();
        let oracle = StaticOracle::new()
            .with_definition(Position::new(3, 11), Position::new(1, 0))
            .with_definition(Position::new(3, 20), Position::new(2, 0));

        let label = resolve_sources(value_of(&tree, "label"), &access, &ledger, &oracle).unwrap();
        assert_eq!(label.unwrap(), ["label"]);

        let other = resolve_sources(value_of(&tree, "other"), &access, &ledger, &oracle).unwrap();
        assert_eq!(other, None);
    }

    #[test]
    fn test_non_literal_key_is_absent() {
        let tree = SyntaxTree::parse("Gene(label=row[key], id=f'{x}')\n", "t.py").unwrap();
        let oracle = StaticOracle::new();
        let ledger = AssignmentLedger::default();
        let access = row_access("row");

        assert_eq!(resolve_sources(value_of(&tree, "label"), &access, &ledger, &oracle).unwrap(), None);
        assert_eq!(resolve_sources(value_of(&tree, "id"), &access, &ledger, &oracle).unwrap(), None);
    }
}
