//! Labelled comment annotations above keyword arguments.
//!
//! ```python
//! Gene(
//!     # note: deprecated since 2019, see the curation log
//!     # for details
//!     # source: Column B
//!     label=row["Name"],
//! )
//! ```
//!
//! Each label holds one value. A later line with the same label replaces
//! the value; unlabelled lines continue the most recent label.

use crate::cst::SyntaxNode;
use serde::Serialize;

const TYPE_LABEL: &str = "# type: ";
const SOURCE_LABEL: &str = "# source: ";
const NOTE_LABEL: &str = "# note: ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Label {
    Type,
    Source,
    Note,
}

impl Label {
    fn parse(line: &str) -> Option<(Label, &str)> {
        [
            (TYPE_LABEL, Label::Type),
            (SOURCE_LABEL, Label::Source),
            (NOTE_LABEL, Label::Note),
        ]
        .into_iter()
        .find_map(|(prefix, label)| line.strip_prefix(prefix).map(|rest| (label, rest)))
    }
}

/// Annotations attached to one documented field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AnnotationBlock {
    /// Curatorial notes.
    pub note: Option<String>,
    /// The input column(s) the field comes from, as written by the author.
    pub source: Option<String>,
    /// Expected type of the field.
    #[serde(rename = "type")]
    pub type_: Option<String>,
}

impl AnnotationBlock {
    /// Groups comment lines, top to bottom, into labelled values.
    ///
    /// Lines before the first label are dropped.
    pub fn from_comment_lines<S: AsRef<str>>(lines: &[S]) -> Self {
        let mut block = AnnotationBlock::default();
        let mut current = None;

        for line in lines {
            let line = line.as_ref();
            if let Some((label, value)) = Label::parse(line) {
                *block.slot(label) = Some(value.to_string());
                current = Some(label);
                continue;
            }
            let Some(label) = current else {
                continue;
            };
            if let Some(value) = block.slot(label).as_mut() {
                value.push(' ');
                value.push_str(line.get(2..).unwrap_or(""));
            }
        }

        block
    }

    /// Renders the block as labelled comment lines.
    pub fn to_comment_lines(&self) -> Vec<String> {
        [
            (TYPE_LABEL, &self.type_),
            (SOURCE_LABEL, &self.source),
            (NOTE_LABEL, &self.note),
        ]
        .into_iter()
        .filter_map(|(label, value)| value.as_ref().map(|v| format!("{label}{v}")))
        .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.note.is_none() && self.source.is_none() && self.type_.is_none()
    }

    fn slot(&mut self, label: Label) -> &mut Option<String> {
        match label {
            Label::Type => &mut self.type_,
            Label::Source => &mut self.source,
            Label::Note => &mut self.note,
        }
    }
}

/// The contiguous comment block directly above `target`, top to bottom.
///
/// `comments` are the comment nodes of the enclosing call. Scanning starts on
/// the line above the target and stops at the first line without a comment.
pub fn comments_above(comments: &[&SyntaxNode], target: &SyntaxNode) -> Vec<String> {
    let mut collected = Vec::new();
    let mut line = target.start().line;

    while line > 1 {
        line -= 1;
        match comments.iter().find(|c| c.start().line == line) {
            Some(comment) => collected.push(comment.text().into_owned()),
            None => break,
        }
    }

    collected.reverse();
    collected
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cst::SyntaxTree;
    use crate::matcher::{Pattern, findall};

    #[test]
    fn test_labels_and_continuations() {
        let block = AnnotationBlock::from_comment_lines(&[
            "# note: this is a note",
            "# that spans multiple lines",
            "# source: Column B",
        ]);
        assert_eq!(block.note.as_deref(), Some("this is a note that spans multiple lines"));
        assert_eq!(block.source.as_deref(), Some("Column B"));
        assert_eq!(block.type_, None);
    }

    #[test]
    fn test_repeated_label_overwrites() {
        let block = AnnotationBlock::from_comment_lines(&["# source: Column B", "# source: Column C"]);
        assert_eq!(block.source.as_deref(), Some("Column C"));
    }

    #[test]
    fn test_unknown_label_continues_current_group() {
        let block = AnnotationBlock::from_comment_lines(&[
            "# source: this is the source",
            "# value: this is about the value",
        ]);
        assert_eq!(
            block.source.as_deref(),
            Some("this is the source value: this is about the value")
        );
    }

    #[test]
    fn test_lines_before_first_label_are_dropped() {
        let block = AnnotationBlock::from_comment_lines(&["# free text", "# type: str"]);
        assert_eq!(block.type_.as_deref(), Some("str"));
        assert!(block.note.is_none());

        assert!(AnnotationBlock::from_comment_lines(&["# just a comment"]).is_empty());
    }

    #[test]
    fn test_to_comment_lines_round_trip() {
        let block = AnnotationBlock {
            note: Some("a b".into()),
            source: None,
            type_: Some("int".into()),
        };
        let lines = block.to_comment_lines();
        assert_eq!(lines, ["# type: int", "# note: a b"]);
        assert_eq!(AnnotationBlock::from_comment_lines(&lines), block);
    }

    #[test]
    fn test_comments_above_stops_at_gap() {
        let source = r#"Gene(
    # note: detached

    # note: attached
    # more
    label="x",
)
"#;
        let tree = SyntaxTree::parse(source, "t.py").unwrap();
        let comments = findall(&Pattern::kind("comment"), tree.root());
        let argument = tree
            .root()
            .descendants()
            .find(|n| n.kind() == "keyword_argument")
            .unwrap();

        assert_eq!(comments_above(&comments, argument), ["# note: attached", "# more"]);
    }
}
