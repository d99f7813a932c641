//! Declarative node shapes.

use crate::error::Result;
use crate::lang::python::is_plain_string;
use regex::Regex;
use std::fmt;

/// A description of a node shape to match.
///
/// Patterns are plain data: building one has no side effects and the same
/// pattern can be matched any number of times.
#[derive(Debug, Clone)]
pub enum Pattern {
    /// Matches any node.
    Any,
    /// Matches a node by kind, text, fields and children.
    Node(Box<NodePattern>),
    /// Binds the node matched by the inner pattern under a name.
    Capture { name: String, pattern: Box<Pattern> },
    /// Tries each alternative in order; the first match wins.
    OneOf(Vec<Pattern>),
}

/// The literal-shape part of a [`Pattern`].
#[derive(Debug, Clone, Default)]
pub struct NodePattern {
    pub(crate) kind: Option<&'static str>,
    pub(crate) text: Option<TextMatch>,
    pub(crate) fields: Vec<(&'static str, FieldMatch)>,
    pub(crate) children: Option<ListPattern>,
    pub(crate) leading_comment: Option<TextMatch>,
}

/// A predicate over a node's source text.
#[derive(Clone)]
pub enum TextMatch {
    Exact(String),
    Prefix(String),
    Predicate(fn(&str) -> bool),
    Regex(Regex),
}

impl TextMatch {
    pub fn is_match(&self, text: &str) -> bool {
        match self {
            TextMatch::Exact(expected) => text == expected,
            TextMatch::Prefix(prefix) => text.starts_with(prefix.as_str()),
            TextMatch::Predicate(predicate) => predicate(text),
            TextMatch::Regex(regex) => regex.is_match(text),
        }
    }
}

impl fmt::Debug for TextMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TextMatch::Exact(text) => write!(f, "Exact({text:?})"),
            TextMatch::Prefix(text) => write!(f, "Prefix({text:?})"),
            TextMatch::Predicate(_) => write!(f, "Predicate(..)"),
            TextMatch::Regex(regex) => write!(f, "Regex({:?})", regex.as_str()),
        }
    }
}

/// How the children stored under one field must look.
#[derive(Debug, Clone)]
pub enum FieldMatch {
    /// The first child under the field matches.
    One(Pattern),
    /// All children under the field match element-wise.
    List(ListPattern),
    /// No child is stored under the field.
    Absent,
}

/// An element-wise pattern over a sequence of nodes.
#[derive(Debug, Clone)]
pub struct ListPattern {
    pub(crate) items: Vec<Pattern>,
    pub(crate) rest: bool,
}

impl ListPattern {
    /// Exactly these elements.
    pub fn exact(items: Vec<Pattern>) -> Self {
        Self { items, rest: false }
    }

    /// These elements followed by any remaining ones.
    pub fn prefix(items: Vec<Pattern>) -> Self {
        Self { items, rest: true }
    }
}

impl Pattern {
    /// Matches any node.
    pub fn any() -> Self {
        Pattern::Any
    }

    /// Matches a node of the given kind.
    pub fn kind(kind: &'static str) -> Self {
        Pattern::Node(Box::new(NodePattern {
            kind: Some(kind),
            ..Default::default()
        }))
    }

    /// Matches an identifier with exactly this name.
    pub fn name(value: impl Into<String>) -> Self {
        Pattern::kind("identifier").text(value)
    }

    /// Matches a string literal without interpolation.
    pub fn string() -> Self {
        Pattern::kind("string").text_matching(is_plain_string)
    }

    /// Matches `object.attr` where both sides are plain names.
    pub fn attribute(object: impl Into<String>, attr: impl Into<String>) -> Self {
        Pattern::kind("attribute")
            .field("object", Pattern::name(object))
            .field("attribute", Pattern::name(attr))
    }

    /// Matches `inner` with or without surrounding parentheses.
    pub fn parenthesized(inner: Pattern) -> Self {
        let wrapped = Pattern::kind("parenthesized_expression").children(vec![inner.clone()]);
        Pattern::one_of(vec![inner, wrapped])
    }

    /// Tries each alternative in order.
    pub fn one_of(alternatives: Vec<Pattern>) -> Self {
        Pattern::OneOf(alternatives)
    }

    /// Binds whatever this pattern matches under `name`.
    pub fn capture(self, name: impl Into<String>) -> Self {
        Pattern::Capture {
            name: name.into(),
            pattern: Box::new(self),
        }
    }

    /// Requires the node text to equal `value`.
    pub fn text(self, value: impl Into<String>) -> Self {
        let value = value.into();
        self.refine(|p| p.text = Some(TextMatch::Exact(value.clone())))
    }

    /// Requires the node text to satisfy `predicate`.
    pub fn text_matching(self, predicate: fn(&str) -> bool) -> Self {
        self.refine(|p| p.text = Some(TextMatch::Predicate(predicate)))
    }

    /// Requires the node text to match the regular expression `pattern`.
    pub fn text_regex(self, pattern: &str) -> Result<Self> {
        let regex = Regex::new(pattern)?;
        Ok(self.refine(|p| p.text = Some(TextMatch::Regex(regex.clone()))))
    }

    /// Requires the first child under `field` to match `pattern`.
    pub fn field(self, field: &'static str, pattern: Pattern) -> Self {
        self.refine(|p| p.fields.push((field, FieldMatch::One(pattern.clone()))))
    }

    /// Requires the children under `field` to match `list` element-wise.
    pub fn field_list(self, field: &'static str, list: ListPattern) -> Self {
        self.refine(|p| p.fields.push((field, FieldMatch::List(list.clone()))))
    }

    /// Requires that nothing is stored under `field`.
    pub fn without(self, field: &'static str) -> Self {
        self.refine(|p| p.fields.push((field, FieldMatch::Absent)))
    }

    /// Requires exactly these named children (comments are skipped).
    pub fn children(self, items: Vec<Pattern>) -> Self {
        let list = ListPattern::exact(items);
        self.refine(|p| p.children = Some(list.clone()))
    }

    /// Requires the named children to start with these.
    pub fn children_prefix(self, items: Vec<Pattern>) -> Self {
        let list = ListPattern::prefix(items);
        self.refine(|p| p.children = Some(list.clone()))
    }

    /// Requires the comment line directly above the statement to match.
    pub fn leading_comment(self, comment: TextMatch) -> Self {
        self.refine(|p| p.leading_comment = Some(comment.clone()))
    }

    /// Applies a refinement to every literal shape reachable from this pattern.
    fn refine(self, f: impl Fn(&mut NodePattern)) -> Self {
        self.refine_with(&f)
    }

    fn refine_with(self, f: &dyn Fn(&mut NodePattern)) -> Self {
        match self {
            Pattern::Any => {
                let mut node = NodePattern::default();
                f(&mut node);
                Pattern::Node(Box::new(node))
            }
            Pattern::Node(mut node) => {
                f(&mut node);
                Pattern::Node(node)
            }
            Pattern::Capture { name, pattern } => Pattern::Capture {
                name,
                pattern: Box::new(pattern.refine_with(f)),
            },
            Pattern::OneOf(alternatives) => Pattern::OneOf(
                alternatives
                    .into_iter()
                    .map(|alt| alt.refine_with(f))
                    .collect(),
            ),
        }
    }
}
