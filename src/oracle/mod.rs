//! Type-inference oracles.
//!
//! Documentation extraction needs two answers it cannot get from syntax
//! alone: what a called name refers to, and where a variable was defined.
//! Both are behind [`TypeOracle`] so the analysis can run against a real
//! inference engine ([`JediOracle`]) or a fixed table ([`StaticOracle`]).

mod jedi;

pub use jedi::JediOracle;

use crate::cst::Position;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The symbol an expression resolves to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InferredSymbol {
    /// Fully-qualified name, when the symbol has one.
    pub full_name: Option<String>,
    /// Human-readable kind description, e.g. `class Gene`.
    pub description: String,
}

impl InferredSymbol {
    pub fn new(full_name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            full_name: Some(full_name.into()),
            description: description.into(),
        }
    }
}

/// Position-based queries against one source file.
///
/// Positions use 1-based lines and 0-based character columns. `Ok(None)`
/// means the oracle had no answer; `Err` means the oracle itself failed.
pub trait TypeOracle {
    /// Infers the symbol referenced at `position`.
    fn infer(&self, position: Position) -> Result<Option<InferredSymbol>>;

    /// Resolves the name at `position` to its definition site.
    fn goto_definition(&self, position: Position) -> Result<Option<Position>>;
}

/// An oracle answering from fixed tables.
#[derive(Debug, Clone, Default)]
pub struct StaticOracle {
    symbols: HashMap<Position, InferredSymbol>,
    definitions: HashMap<Position, Position>,
}

impl StaticOracle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answers `infer` at `position` with `symbol`.
    pub fn with_symbol(mut self, position: Position, symbol: InferredSymbol) -> Self {
        self.symbols.insert(position, symbol);
        self
    }

    /// Answers `goto_definition` at `usage` with `definition`.
    pub fn with_definition(mut self, usage: Position, definition: Position) -> Self {
        self.definitions.insert(usage, definition);
        self
    }
}

impl TypeOracle for StaticOracle {
    fn infer(&self, position: Position) -> Result<Option<InferredSymbol>> {
        Ok(self.symbols.get(&position).cloned())
    }

    fn goto_definition(&self, position: Position) -> Result<Option<Position>> {
        Ok(self.definitions.get(&position).copied())
    }
}

impl<T: TypeOracle + ?Sized> TypeOracle for &T {
    fn infer(&self, position: Position) -> Result<Option<InferredSymbol>> {
        (**self).infer(position)
    }

    fn goto_definition(&self, position: Position) -> Result<Option<Position>> {
        (**self).goto_definition(position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_oracle_answers_only_known_positions() {
        let oracle = StaticOracle::new()
            .with_symbol(
                Position::new(4, 11),
                InferredSymbol::new("biolink_model.datamodel.pydanticmodel_v2.Gene", "class Gene"),
            )
            .with_definition(Position::new(7, 14), Position::new(4, 4));

        let symbol = oracle.infer(Position::new(4, 11)).unwrap().unwrap();
        assert_eq!(symbol.description, "class Gene");
        assert!(oracle.infer(Position::new(4, 12)).unwrap().is_none());
        assert_eq!(
            oracle.goto_definition(Position::new(7, 14)).unwrap(),
            Some(Position::new(4, 4))
        );
    }
}
