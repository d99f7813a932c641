//! Migration of transform scripts from the row-loop API to record functions.
//!
//! ```python
//! from koza.cli_utils import get_koza_app
//!
//! koza_app = get_koza_app("genes")
//! taxa = koza_app.get_map("taxa")
//!
//! while (row := koza_app.get_row()) is not None:
//!     koza_app.write(Gene(id=row["id"], in_taxon=taxa[row["taxon"]]))
//! ```
//!
//! becomes
//!
//! ```python
//! def transform_record(koza: Koza, record: dict[str, Any]):
//!     koza.write(Gene(id=record["id"], in_taxon=koza.lookup(record["taxon"], "taxa")))
//! ```
//!
//! All rules run in a single traversal. Map aliases are registered top-down
//! as their assignments are entered, so every later use of an alias in the
//! file is rewritten on the way back up.

pub mod patterns;

use crate::config::MigrationConfig;
use crate::cst::{Span, SyntaxNode, SyntaxTree};
use crate::error::{RefactorError, Result};
use crate::transform::{Rewrite, Rule, RuleSet, Transform, Visit};
use crate::matcher::Pattern;
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

/// Local variables bound to lookup maps, by variable name.
///
/// Values are the map name literals exactly as written, quotes included.
#[derive(Debug, Clone, Default)]
pub struct AliasTable {
    maps: HashMap<String, String>,
}

impl AliasTable {
    pub fn register(&mut self, alias: impl Into<String>, map: impl Into<String>) {
        self.maps.insert(alias.into(), map.into());
    }

    /// The map literal for `alias`.
    pub fn map_for(&self, alias: &str) -> Option<&str> {
        self.maps.get(alias).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.maps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.maps.is_empty()
    }
}

/// Rewrites a legacy transform to the record-function API.
#[derive(Debug, Clone, Default)]
pub struct KozaMigration {
    config: MigrationConfig,
}

impl KozaMigration {
    pub fn new(config: MigrationConfig) -> Self {
        Self { config }
    }

    /// Migrates a parsed tree, returning the rewritten source.
    pub fn migrate(&self, tree: SyntaxTree) -> Result<String> {
        let mut aliases = AliasTable::default();
        let root = self.rules().transform(tree.root(), &mut aliases)?;
        debug!(aliases = aliases.len(), path = %tree.path().display(), "migrated");
        Ok(match root {
            Some(root) => tree.with_root(root).render(),
            None => String::new(),
        })
    }

    /// Migrates source text.
    pub fn migrate_source(&self, source: &str) -> Result<String> {
        self.apply(source, Path::new("<source>"))
    }

    /// Migrates the file at `path`.
    pub fn migrate_file(&self, path: impl AsRef<Path>) -> Result<String> {
        self.migrate(SyntaxTree::from_file(path)?)
    }

    /// The rule catalogue, in firing order.
    pub fn rules(&self) -> RuleSet<'_, AliasTable> {
        let config = &self.config;
        let map_assignment = patterns::map_assignment(config);

        RuleSet::<AliasTable>::new()
            .visit(Rule::on("register-map", map_assignment.clone()), move |node, aliases| {
                register_alias(&map_assignment, node, aliases)?;
                Ok(Visit::Continue)
            })
            .leave(Rule::on("loop-to-function", patterns::row_loop(config)), move |_, updated, _| {
                loop_to_function(updated, &config.transform_signature).map(Rewrite::Replace)
            })
            .leave(Rule::on("rename-row", Pattern::name(&config.row_name)), move |_, updated, _| {
                Ok(Rewrite::Replace(updated.with_text(&config.record_name)))
            })
            .leave(Rule::on("subscript-lookup", Pattern::kind("subscript")), move |_, updated, aliases| {
                Ok(self.subscript_lookup(updated, aliases))
            })
            .leave(Rule::on("get-lookup", patterns::get_call()), move |_, updated, aliases| {
                Ok(self.get_lookup(updated, aliases))
            })
            .leave(Rule::on("drop-factory-import", patterns::factory_import(config)), move |_, _, _| {
                Ok(Rewrite::Remove)
            })
            .leave(Rule::on("drop-app", patterns::app_assignment(config)), move |_, _, _| {
                Ok(Rewrite::Remove)
            })
            .leave(Rule::on("drop-map", patterns::map_assignment(config)), move |_, _, _| {
                Ok(Rewrite::Remove)
            })
            .leave(
                Rule::on("rename-writer", Pattern::name(&config.app_name))
                    .inside(patterns::app_write(config)),
                move |_, updated, _| Ok(Rewrite::Replace(updated.with_text(&config.writer_name))),
            )
    }

    /// `m[k]` on a map alias becomes `koza.lookup(k, "map")`.
    fn subscript_lookup(&self, updated: SyntaxNode, aliases: &AliasTable) -> Rewrite {
        let Some(map) = alias_map(updated.child_by_field("value"), aliases) else {
            return Rewrite::Keep(updated);
        };
        let key = {
            let keys: Vec<&SyntaxNode> = updated.children_by_field("subscript").collect();
            match keys.as_slice() {
                [key] if key.kind() != "slice" => Some(key.text().into_owned()),
                _ => None,
            }
        };
        let Some(key) = key else {
            return Rewrite::Keep(updated);
        };
        let call = updated.synthesize("call", self.lookup_call(&key, map));
        Rewrite::Replace(call)
    }

    /// `m.get(k)` on a map alias becomes `koza.lookup(k, "map")`.
    fn get_lookup(&self, updated: SyntaxNode, aliases: &AliasTable) -> Rewrite {
        let receiver = updated
            .child_by_field("function")
            .and_then(|f| f.child_by_field("object"));
        let Some(map) = alias_map(receiver, aliases) else {
            return Rewrite::Keep(updated);
        };
        let key = {
            let args: Vec<&SyntaxNode> = updated
                .child_by_field("arguments")
                .map(|a| a.named_children().collect())
                .unwrap_or_default();
            match args.as_slice() {
                [arg] if is_positional(arg) => Some(arg.text().into_owned()),
                _ => None,
            }
        };
        let Some(key) = key else {
            return Rewrite::Keep(updated);
        };
        let call = updated.synthesize("call", self.lookup_call(&key, map));
        Rewrite::Replace(call)
    }

    fn lookup_call(&self, key: &str, map: &str) -> String {
        format!(
            "{}.{}({}, {})",
            self.config.writer_name, self.config.lookup_method, key, map
        )
    }
}

impl Transform for KozaMigration {
    fn apply(&self, source: &str, path: &Path) -> Result<String> {
        self.migrate(SyntaxTree::parse(source, path)?)
    }

    fn describe(&self) -> String {
        format!(
            "Migrate {} row loops to record functions",
            self.config.app_name
        )
    }
}

fn register_alias(pattern: &Pattern, statement: &SyntaxNode, aliases: &mut AliasTable) -> Result<()> {
    let captures = pattern
        .matches(statement)
        .ok_or_else(|| RefactorError::contract("map assignment no longer matches its pattern"))?;
    let alias = captures.require_kind("alias", "identifier")?.text();
    let map = captures.require_kind("map", "string")?.text();
    debug!(alias = %alias, map = %map, line = statement.start().line, "registered map alias");
    aliases.register(alias, map);
    Ok(())
}

fn alias_map<'a>(value: Option<&SyntaxNode>, aliases: &'a AliasTable) -> Option<&'a str> {
    let value = value.filter(|v| v.kind() == "identifier")?;
    aliases.map_for(&value.text())
}

fn is_positional(argument: &SyntaxNode) -> bool {
    !matches!(
        argument.kind(),
        "keyword_argument" | "list_splat" | "dictionary_splat" | "parenthesized_list_splat"
    )
}

/// Swaps the loop header for the function signature, keeping the body.
fn loop_to_function(updated: SyntaxNode, signature: &str) -> Result<SyntaxNode> {
    let children = updated.children();
    let colon = children
        .iter()
        .position(|c| !c.is_named() && c.kind() == ":")
        .ok_or_else(|| RefactorError::contract("while statement without ':'"))?;

    let header_span = Span::cover(children[0].span(), children[colon].span());
    let mut rebuilt = vec![updated.token(header_span, signature)];
    rebuilt.extend(children[colon + 1..].iter().cloned());
    Ok(updated.rebuild("function_definition", rebuilt))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn migrate(source: &str) -> String {
        KozaMigration::default().migrate_source(source).unwrap()
    }

    #[test]
    fn test_row_loop_becomes_function() {
        let source = "\n# A comment\nwhile (row := koza_app.get_row()) is not None:\n    pass\n        ";
        assert_eq!(
            migrate(source),
            "\n# A comment\ndef transform_record(koza: Koza, record: dict[str, Any]):\n    pass\n        "
        );
    }

    #[test]
    fn test_loop_body_is_migrated() {
        let source = "while (row := koza_app.get_row()) is not None:\n    x = row['a']\n    koza_app.write(x)\n";
        assert_eq!(
            migrate(source),
            "def transform_record(koza: Koza, record: dict[str, Any]):\n    x = record['a']\n    koza.write(x)\n"
        );
    }

    #[test]
    fn test_row_is_renamed() {
        assert_eq!(migrate("label = row['Name']"), "label = record['Name']");
    }

    #[test]
    fn test_writer_rename_only_inside_write_calls() {
        assert_eq!(migrate("koza_app.write(a, b, c)"), "koza.write(a, b, c)");
        assert_eq!(migrate("koza_app.next_row()\n"), "koza_app.next_row()\n");
    }

    #[test]
    fn test_get_with_extra_arguments_is_kept() {
        let source = "m = koza_app.get_map('t')\na = m.get('x', None)\nb = m.get(key=1)\nc = other.get('x')\n";
        assert_eq!(migrate(source), "a = m.get('x', None)\nb = m.get(key=1)\nc = other.get('x')\n");
    }

    #[test]
    fn test_multi_index_subscript_is_kept() {
        let source = "m = koza_app.get_map('t')\na = m[1, 2]\nb = m[1:2]\n";
        assert_eq!(migrate(source), "a = m[1, 2]\nb = m[1:2]\n");
    }

    #[test]
    fn test_alias_is_used_after_registration_only() {
        let source = "a = m['x']\nm = koza_app.get_map('t')\nb = m['x']\n";
        assert_eq!(migrate(source), "a = m['x']\nb = koza.lookup('x', 't')\n");
    }

    #[test]
    fn test_custom_names() {
        let config = MigrationConfig {
            writer_name: "io".to_string(),
            lookup_method: "find".to_string(),
            ..MigrationConfig::default()
        };
        let migration = KozaMigration::new(config);
        let out = migration
            .migrate_source("m = koza_app.get_map('t')\nkoza_app.write(m[row['k']])\n")
            .unwrap();
        assert_eq!(out, "io.write(io.find(record['k'], 't'))\n");
    }

    #[test]
    fn test_emptied_block_keeps_control_flow() {
        let source = "def f():\n    if x:\n        koza_app = get_koza_app('t')\n    return 1\n";
        assert_eq!(migrate(source), "def f():\n    if x:\n        pass\n    return 1\n");

        let source = "if x:\n    m = koza_app.get_map('t')\ny = m['a']\n";
        assert_eq!(migrate(source), "if x:\n    pass\ny = koza.lookup('a', 't')\n");

        let source = "while (row := koza_app.get_row()) is not None:\n    m = koza_app.get_map('t')\n";
        assert_eq!(
            migrate(source),
            "def transform_record(koza: Koza, record: dict[str, Any]):\n    pass\n"
        );
    }

    #[test]
    fn test_semicolon_joined_statements() {
        let out = migrate("m = koza_app.get_map('t'); y = m['a']\n");
        assert_eq!(out, "y = koza.lookup('a', 't')\n");
        assert!(SyntaxTree::parse(&out, "t.py").is_ok());
        assert_eq!(migrate(&out), out);

        assert_eq!(migrate("a = 1; m = koza_app.get_map('t')\n"), "a = 1\n");
    }

    #[test]
    fn test_blank_line_after_removed_block_statement() {
        let source = "def f():\n    m = koza_app.get_map('t')\n\n    y = m['a']\n";
        assert_eq!(migrate(source), "def f():\n    y = koza.lookup('a', 't')\n");
    }

    #[test]
    fn test_trailing_comment_of_removed_statement() {
        let source = "koza_app = get_koza_app('x')  # setup\nprint(1)\n";
        assert_eq!(migrate(source), "# setup\nprint(1)\n");
    }

    #[test]
    fn test_syntax_error_is_reported() {
        let err = KozaMigration::default().migrate_source("while (:\n").unwrap_err();
        assert!(matches!(err, RefactorError::Parse { .. }));
    }
}
