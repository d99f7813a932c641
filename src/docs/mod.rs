//! Documentation extraction from annotated transform scripts.
//!
//! A statement preceded by the marker comment is inspected for calls that
//! construct schema classes. For every such call the extractor reports the
//! keyword arguments, where their values come from in the input row, any
//! constant value, and the labelled comments written above them.
//!
//! ```python
//! # !DocumentClass
//! gene = Gene(
//!     # note: symbols are upper-cased upstream
//!     symbol=row["Symbol"],
//!     category=["biolink:Gene"],
//! )
//! ```
//!
//! Whether a call constructs a schema class is decided by a [`TypeOracle`],
//! so aliases and module-qualified names are recognized too.

mod annotation;
mod provenance;

pub use annotation::{AnnotationBlock, comments_above};
pub use provenance::{AssignmentLedger, resolve_sources, row_access};

use crate::config::{Config, DocumentationConfig};
use crate::cst::{Position, SyntaxNode, SyntaxTree};
use crate::error::{RefactorError, Result};
use crate::lang::python::{SIMPLE_STATEMENT_KINDS, string_value};
use crate::matcher::{Pattern, TextMatch, findall};
use crate::oracle::{JediOracle, TypeOracle};
use crate::transform::{Rule, RuleSet, Visit};
use serde::Serialize;
use std::path::Path;
use tracing::{debug, warn};

/// One keyword argument of a documented class construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentedField {
    pub name: String,
    /// Input columns the value is read from.
    pub parsed_source: Option<Vec<String>>,
    /// The literal value, when the argument is a string constant.
    pub constant: Option<String>,
    pub annotations: AnnotationBlock,
}

/// A documented class construction, fields in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentedClass {
    pub name: String,
    pub fields: Vec<DocumentedField>,
}

/// Extracts [`DocumentedClass`]es from one file.
pub struct DocumentationExtractor<'o> {
    config: DocumentationConfig,
    oracle: &'o dyn TypeOracle,
}

struct Extraction {
    classes: Vec<DocumentedClass>,
}

impl<'o> DocumentationExtractor<'o> {
    pub fn new(config: DocumentationConfig, oracle: &'o dyn TypeOracle) -> Self {
        Self { config, oracle }
    }

    /// Statements whose directly preceding comment starts with the marker.
    pub fn marked_statement(&self) -> Pattern {
        Pattern::one_of(
            SIMPLE_STATEMENT_KINDS
                .iter()
                .map(|&kind| Pattern::kind(kind))
                .collect(),
        )
        .leading_comment(TextMatch::Prefix(self.config.marker.clone()))
    }

    /// Documented classes in order of appearance.
    pub fn extract(&self, tree: &SyntaxTree) -> Result<Vec<DocumentedClass>> {
        let marked = self.marked_statement();
        let ledger = AssignmentLedger::collect(tree.root(), &self.config.record_variable, &marked)?;
        let access = row_access(&self.config.record_variable);

        let rules = RuleSet::new().visit(
            Rule::on("documented-call", Pattern::kind("call"))
                .inside(marked)
                .not_inside(Pattern::kind("call")),
            |call, state: &mut Extraction| {
                if let Some(class) = self.document_call(call, &access, &ledger)? {
                    debug!(class = %class.name, fields = class.fields.len(), line = call.start().line, "documented class");
                    state.classes.push(class);
                }
                Ok(Visit::Continue)
            },
        );

        let mut state = Extraction { classes: Vec::new() };
        rules.walk(tree.root(), &mut state)?;
        Ok(state.classes)
    }

    fn document_call(
        &self,
        call: &SyntaxNode,
        access: &Pattern,
        ledger: &AssignmentLedger,
    ) -> Result<Option<DocumentedClass>> {
        let Some(position) = callee_position(call) else {
            return Ok(None);
        };
        let Some(symbol) = self.oracle.infer(position)? else {
            warn!(line = position.line, column = position.column, "no type inferred for marked call");
            return Ok(None);
        };

        let in_schema = symbol
            .full_name
            .as_deref()
            .is_some_and(|name| name.starts_with(&self.config.schema_namespace));
        let name = match symbol.description.strip_prefix(&self.config.class_tag) {
            Some(name) if in_schema => name,
            _ => return Ok(None),
        };

        let comments = findall(&Pattern::kind("comment"), call);
        let arguments = call
            .child_by_field("arguments")
            .filter(|a| a.kind() == "argument_list");
        let mut fields = Vec::new();
        for argument in arguments
            .into_iter()
            .flat_map(|a| a.named_children())
            .filter(|a| a.kind() == "keyword_argument")
        {
            fields.push(self.document_argument(argument, &comments, access, ledger)?);
        }

        Ok(Some(DocumentedClass {
            name: name.to_string(),
            fields,
        }))
    }

    fn document_argument(
        &self,
        argument: &SyntaxNode,
        comments: &[&SyntaxNode],
        access: &Pattern,
        ledger: &AssignmentLedger,
    ) -> Result<DocumentedField> {
        let keyword = argument
            .child_by_field("name")
            .filter(|k| k.kind() == "identifier")
            .ok_or_else(|| {
                RefactorError::contract(format!(
                    "keyword argument at line {} has no plain name",
                    argument.start().line
                ))
            })?;
        let value = argument.child_by_field("value").ok_or_else(|| {
            RefactorError::contract(format!(
                "keyword argument '{}' has no value",
                keyword.text()
            ))
        })?;

        Ok(DocumentedField {
            name: keyword.text().into_owned(),
            parsed_source: resolve_sources(value, access, ledger, self.oracle)?,
            constant: constant_value(value),
            annotations: AnnotationBlock::from_comment_lines(&comments_above(comments, argument)),
        })
    }
}

/// Extracts documentation from a file using Jedi for type inference.
pub fn extract_documentation(path: impl AsRef<Path>, config: &Config) -> Result<Vec<DocumentedClass>> {
    let path = path.as_ref();
    let tree = SyntaxTree::from_file(path)?;
    let oracle = JediOracle::for_file(path, &config.oracle)?;
    DocumentationExtractor::new(config.documentation.clone(), &oracle).extract(&tree)
}

/// Where to ask the oracle about a call's target: the name itself, or the
/// attribute name of a dotted callee.
fn callee_position(call: &SyntaxNode) -> Option<Position> {
    let function = call.child_by_field("function")?;
    match function.kind() {
        "identifier" => Some(function.start()),
        "attribute" => function.child_by_field("attribute").map(SyntaxNode::start),
        _ => None,
    }
}

/// A string literal, or a list holding exactly one string literal.
fn constant_value(value: &SyntaxNode) -> Option<String> {
    let literal = match value.kind() {
        "string" => value,
        "list" => {
            let mut elements = value.named_children();
            match (elements.next(), elements.next()) {
                (Some(only), None) if only.kind() == "string" => only,
                _ => return None,
            }
        }
        _ => return None,
    };
    string_value(&literal.text()).map(str::to_string)
}
