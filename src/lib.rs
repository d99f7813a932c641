//! # Koza Refactor
//!
//! Structural analysis and rewriting of Koza transform scripts.
//!
//! This crate provides:
//! - An owned, losslessly renderable syntax tree for Python source ([`cst`])
//! - Declarative structural patterns with named captures ([`matcher`])
//! - A single-pass rule engine with ancestor guards and bottom-up rewrites ([`transform`])
//! - Documentation extraction for annotated class constructions ([`docs`])
//! - Migration of row-loop transforms to record functions ([`migrate`])
//! - Filename history of ingests in a git repository ([`history`])
//!
//! ## Quick Start
//!
//! ```rust
//! use koza_refactor::prelude::*;
//!
//! let migrated = KozaMigration::default().migrate_source("label = row['Name']\n")?;
//! assert_eq!(migrated, "label = record['Name']\n");
//! # Ok::<(), koza_refactor::error::RefactorError>(())
//! ```
//!
//! ## Documentation Extraction
//!
//! Marked statements are resolved through a [`oracle::TypeOracle`]. Any
//! implementation works; [`oracle::StaticOracle`] answers from a table:
//!
//! ```rust
//! use koza_refactor::prelude::*;
//!
//! let source = "# !DocumentClass\ngene = Gene(label=row['Name'])\n";
//! let tree = SyntaxTree::parse(source, "transform.py")?;
//! let oracle = StaticOracle::new().with_symbol(
//!     Position::new(2, 7),
//!     InferredSymbol::new("biolink_model.datamodel.pydanticmodel_v2.Gene", "class Gene"),
//! );
//!
//! let classes = DocumentationExtractor::new(DocumentationConfig::default(), &oracle).extract(&tree)?;
//! assert_eq!(classes[0].name, "Gene");
//! assert_eq!(classes[0].fields[0].parsed_source.as_deref(), Some(&["Name".to_string()][..]));
//! # Ok::<(), koza_refactor::error::RefactorError>(())
//! ```
//!
//! ## Ingest History
//!
//! ```rust,no_run
//! use koza_refactor::prelude::*;
//!
//! let service = HistoryService::open("./monarch-ingest")?;
//! let files = HistoryQuery::new("hgnc")
//!     .quiet(true)
//!     .execute(&service, &HistoryConfig::default(), &mut std::io::stdout())?;
//! println!("{} files", files.len());
//! # Ok::<(), koza_refactor::error::RefactorError>(())
//! ```

pub mod config;
pub mod cst;
pub mod diff;
pub mod docs;
pub mod error;
pub mod history;
pub mod lang;
pub mod matcher;
pub mod migrate;
pub mod oracle;
pub mod transform;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::config::{Config, DocumentationConfig, HistoryConfig, MigrationConfig, OracleConfig};
    pub use crate::cst::{Position, Span, SyntaxNode, SyntaxTree};
    pub use crate::docs::{
        AnnotationBlock, AssignmentLedger, DocumentationExtractor, DocumentedClass, DocumentedField,
        extract_documentation,
    };
    pub use crate::error::{RefactorError, Result};
    pub use crate::history::{HistoryQuery, HistoryService, LastModifiedCache};
    pub use crate::lang::{Language, Python};
    pub use crate::matcher::{Captures, ListPattern, Pattern, TextMatch, extract, extractall, findall};
    pub use crate::migrate::{AliasTable, KozaMigration};
    pub use crate::oracle::{InferredSymbol, JediOracle, StaticOracle, TypeOracle};
    pub use crate::transform::{Rewrite, Rule, RuleSet, Transform, Visit};
}

pub use prelude::*;
