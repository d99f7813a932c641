//! Language abstraction over tree-sitter grammars.

pub mod python;

pub use python::Python;

use crate::error::{RefactorError, Result};
use std::path::Path;
use tree_sitter::{Language as TsLanguage, Parser, Tree};

/// A programming language whose sources can be parsed into a syntax tree.
pub trait Language: Send + Sync {
    /// Returns the name of the language.
    fn name(&self) -> &'static str;

    /// Returns the file extensions associated with this language.
    fn extensions(&self) -> &[&'static str];

    /// Returns the tree-sitter language grammar.
    fn grammar(&self) -> TsLanguage;

    /// Parses source code into a tree-sitter tree.
    ///
    /// `path` is only used to label errors. A tree that contains syntax
    /// errors is rejected rather than analysed partially.
    fn parse(&self, source: &str, path: &Path) -> Result<Tree> {
        let mut parser = Parser::new();
        parser
            .set_language(&self.grammar())
            .map_err(|e| RefactorError::Parse {
                path: path.to_path_buf(),
                message: format!("Failed to set language: {e}"),
            })?;

        let tree = parser
            .parse(source, None)
            .ok_or_else(|| RefactorError::Parse {
                path: path.to_path_buf(),
                message: "Failed to parse source".to_string(),
            })?;

        let root = tree.root_node();
        if root.has_error() {
            let position = first_error(root)
                .map(|p| format!(" at line {}, column {}", p.row + 1, p.column + 1))
                .unwrap_or_default();
            return Err(RefactorError::Parse {
                path: path.to_path_buf(),
                message: format!("Source contains syntax errors{position}"),
            });
        }

        Ok(tree)
    }

    /// Checks if this language handles the given file extension.
    fn matches_extension(&self, ext: &str) -> bool {
        self.extensions().iter().any(|e| e.eq_ignore_ascii_case(ext))
    }
}

fn first_error(node: tree_sitter::Node<'_>) -> Option<tree_sitter::Point> {
    if node.is_error() || node.is_missing() {
        return Some(node.start_position());
    }
    let mut cursor = node.walk();
    let children: Vec<_> = node.children(&mut cursor).collect();
    children
        .into_iter()
        .filter(|child| child.has_error())
        .find_map(first_error)
}
