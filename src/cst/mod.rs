//! Owned concrete syntax tree.
//!
//! Tree-sitter trees are immutable and borrow their source, which makes them
//! awkward to rewrite. [`SyntaxTree`] copies the parse into owned
//! [`SyntaxNode`]s that keep:
//!
//! - the grammar kind and the field name under which the node hangs off its parent,
//! - every child in source order (anonymous tokens and comments included),
//! - a [`Span`] with byte offsets and 1-based line / 0-based column positions,
//! - the own-line comments directly above each statement.
//!
//! Rendering is lossless: an untouched node prints as its exact source slice,
//! and an edited node is stitched back together from the original text
//! between its children. See [`SyntaxNode::render`].
//!
//! ## Example
//!
//! ```rust
//! use koza_refactor::cst::SyntaxTree;
//!
//! let tree = SyntaxTree::parse("x = row['a']\n", "t.py")?;
//! let assignment = tree.root().descendants().find(|n| n.kind() == "assignment").unwrap();
//! assert_eq!(assignment.text(), "x = row['a']");
//! assert_eq!(assignment.start().line, 1);
//! # Ok::<(), koza_refactor::error::RefactorError>(())
//! ```

mod build;
mod render;

use crate::error::{RefactorError, Result};
use crate::lang::{Language, Python};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A position in source text: 1-based line, 0-based character column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    /// Creates a new position.
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

/// The source range covered by a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Span {
    pub start_byte: usize,
    pub end_byte: usize,
    pub start: Position,
    pub end: Position,
}

impl Span {
    /// The span from the start of `first` to the end of `last`.
    pub fn cover(first: &Span, last: &Span) -> Span {
        Span {
            start_byte: first.start_byte,
            end_byte: last.end_byte,
            start: first.start,
            end: last.end,
        }
    }

    /// Byte range into the source.
    pub fn bytes(&self) -> Range<usize> {
        self.start_byte..self.end_byte
    }
}

/// A node of the concrete syntax tree.
///
/// Nodes produced by a rewrite keep the span of the node they replaced, so
/// the text around them still renders from the original source.
#[derive(Debug, Clone)]
pub struct SyntaxNode {
    kind: &'static str,
    field: Option<&'static str>,
    named: bool,
    span: Span,
    children: Vec<SyntaxNode>,
    leading_comments: Vec<String>,
    replacement: Option<String>,
    removed: Vec<Span>,
    dirty: bool,
    source: Arc<str>,
}

impl SyntaxNode {
    /// The grammar kind, e.g. `call` or `identifier`.
    pub fn kind(&self) -> &'static str {
        self.kind
    }

    /// The field name this node occupies in its parent, if any.
    pub fn field(&self) -> Option<&'static str> {
        self.field
    }

    /// Returns false for anonymous tokens such as `(` or `=`.
    pub fn is_named(&self) -> bool {
        self.named
    }

    pub fn is_comment(&self) -> bool {
        self.kind == "comment"
    }

    pub fn span(&self) -> &Span {
        &self.span
    }

    pub fn start(&self) -> Position {
        self.span.start
    }

    pub fn end(&self) -> Position {
        self.span.end
    }

    /// All children in source order.
    pub fn children(&self) -> &[SyntaxNode] {
        &self.children
    }

    /// Named children, skipping comments.
    pub fn named_children(&self) -> impl Iterator<Item = &SyntaxNode> {
        self.children
            .iter()
            .filter(|c| c.named && !c.is_comment())
    }

    /// The first child stored under `field`.
    pub fn child_by_field(&self, field: &str) -> Option<&SyntaxNode> {
        self.children.iter().find(|c| c.field == Some(field))
    }

    /// Every child stored under `field`, in source order.
    pub fn children_by_field<'a>(&'a self, field: &'a str) -> impl Iterator<Item = &'a SyntaxNode> {
        self.children.iter().filter(move |c| c.field == Some(field))
    }

    /// Own-line comments immediately above this statement, top to bottom.
    ///
    /// Empty for nodes that are not statements.
    pub fn leading_comments(&self) -> &[String] {
        &self.leading_comments
    }

    /// Returns true once a rewrite touched this node or anything beneath it.
    pub fn is_edited(&self) -> bool {
        self.dirty
    }

    /// The node's source text, rendered if the node was edited.
    pub fn text(&self) -> Cow<'_, str> {
        if self.dirty {
            Cow::Owned(self.render())
        } else {
            Cow::Borrowed(&self.source[self.span.bytes()])
        }
    }

    /// Iterates over this node and all its descendants in pre-order.
    pub fn descendants(&self) -> Descendants<'_> {
        Descendants { stack: vec![self] }
    }

    /// Replaces the node's text, dropping its children.
    pub fn with_text(mut self, text: impl Into<String>) -> SyntaxNode {
        self.children.clear();
        self.removed.clear();
        self.replacement = Some(text.into());
        self.dirty = true;
        self
    }

    /// A new node of `kind` that renders as `text` in place of this node.
    pub fn synthesize(&self, kind: &'static str, text: impl Into<String>) -> SyntaxNode {
        SyntaxNode {
            kind,
            field: self.field,
            named: true,
            span: self.span,
            children: Vec::new(),
            leading_comments: Vec::new(),
            replacement: Some(text.into()),
            removed: Vec::new(),
            dirty: true,
            source: Arc::clone(&self.source),
        }
    }

    /// A new node of `kind` in place of this node, built from `children`.
    ///
    /// Children must lie inside this node's span and be in source order; the
    /// original text between them is kept.
    pub fn rebuild(&self, kind: &'static str, children: Vec<SyntaxNode>) -> SyntaxNode {
        SyntaxNode {
            kind,
            field: self.field,
            named: true,
            span: self.span,
            children,
            leading_comments: self.leading_comments.clone(),
            replacement: None,
            removed: Vec::new(),
            dirty: true,
            source: Arc::clone(&self.source),
        }
    }

    /// A token node for the text of `span`, replaced by `text`.
    pub fn token(&self, span: Span, text: impl Into<String>) -> SyntaxNode {
        SyntaxNode {
            kind: "token",
            field: None,
            named: false,
            span,
            children: Vec::new(),
            leading_comments: Vec::new(),
            replacement: Some(text.into()),
            removed: Vec::new(),
            dirty: true,
            source: Arc::clone(&self.source),
        }
    }

    /// Swaps in new children, recording the spans of children that were removed.
    pub(crate) fn with_children(&self, children: Vec<SyntaxNode>, removed: Vec<Span>) -> Self {
        let mut all_removed = self.removed.clone();
        all_removed.extend(removed);
        all_removed.sort_by_key(|s| s.start_byte);
        SyntaxNode {
            kind: self.kind,
            field: self.field,
            named: self.named,
            span: self.span,
            children,
            leading_comments: self.leading_comments.clone(),
            replacement: self.replacement.clone(),
            removed: all_removed,
            dirty: true,
            source: Arc::clone(&self.source),
        }
    }

    /// Marks the node as a replacement for `original`, taking over its place.
    pub(crate) fn placed_at(mut self, original: &SyntaxNode) -> Self {
        self.span = original.span;
        self.field = original.field;
        self.dirty = true;
        self
    }
}

/// Pre-order iterator over a subtree.
pub struct Descendants<'a> {
    stack: Vec<&'a SyntaxNode>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a SyntaxNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children.iter().rev());
        Some(node)
    }
}

/// A parsed source file.
#[derive(Debug, Clone)]
pub struct SyntaxTree {
    path: PathBuf,
    source: Arc<str>,
    root: SyntaxNode,
}

impl SyntaxTree {
    /// Parses Python source. `path` labels errors and oracle queries.
    pub fn parse(source: &str, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let tree = Python.parse(source, path)?;
        let source: Arc<str> = Arc::from(source);
        let root = build::build(&tree, &source);
        Ok(Self {
            path: path.to_path_buf(),
            source,
            root,
        })
    }

    /// Reads and parses a Python file.
    ///
    /// Files without a Python extension are rejected before reading.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(RefactorError::FileNotFound(path.to_path_buf()));
        }
        let is_python = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| Python.matches_extension(e));
        if !is_python {
            return Err(RefactorError::Parse {
                path: path.to_path_buf(),
                message: format!(
                    "not a {} source file (expected .{})",
                    Python.name(),
                    Python.extensions().join(", .")
                ),
            });
        }
        let source = std::fs::read_to_string(path)?;
        Self::parse(&source, path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn root(&self) -> &SyntaxNode {
        &self.root
    }

    /// Returns the tree with a rewritten root.
    pub fn with_root(self, root: SyntaxNode) -> Self {
        Self { root, ..self }
    }

    /// Renders the whole file, including text outside the root's span.
    pub fn render(&self) -> String {
        let mut out = String::with_capacity(self.source.len());
        out.push_str(&self.source[..self.root.span.start_byte]);
        let consumed = self.root.render_into(&mut out);
        if consumed < self.source.len() {
            out.push_str(&self.source[consumed..]);
        }
        out
    }
}
