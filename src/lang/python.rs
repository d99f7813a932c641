//! Python language support.
//!
//! Besides the grammar this module knows the few lexical details of Python
//! the analyses depend on: which node kinds are statements and how a string
//! literal's text maps to its value.

use super::Language;
use tree_sitter::Language as TsLanguage;

/// Python programming language.
pub struct Python;

impl Language for Python {
    fn name(&self) -> &'static str {
        "python"
    }

    fn extensions(&self) -> &[&'static str] {
        &["py", "pyi"]
    }

    fn grammar(&self) -> TsLanguage {
        tree_sitter_python::LANGUAGE.into()
    }
}

/// Node kinds that occupy a statement position.
pub const STATEMENT_KINDS: &[&str] = &[
    "expression_statement",
    "return_statement",
    "import_statement",
    "import_from_statement",
    "future_import_statement",
    "pass_statement",
    "assert_statement",
    "delete_statement",
    "raise_statement",
    "break_statement",
    "continue_statement",
    "global_statement",
    "nonlocal_statement",
    "type_alias_statement",
    "if_statement",
    "for_statement",
    "while_statement",
    "try_statement",
    "with_statement",
    "match_statement",
    "function_definition",
    "class_definition",
    "decorated_definition",
];

/// Indented statement body of a compound statement.
pub const BLOCK_KIND: &str = "block";

/// Token separating simple statements on one line.
pub const STATEMENT_SEPARATOR: &str = ";";

/// The statement standing in for a body left empty.
pub const EMPTY_BODY: &str = "pass";
pub const EMPTY_BODY_KIND: &str = "pass_statement";

/// Statement kinds that hold no nested block.
pub const SIMPLE_STATEMENT_KINDS: &[&str] = &["expression_statement", "return_statement"];

/// Returns true if nodes of this kind are statements.
pub fn is_statement(kind: &str) -> bool {
    STATEMENT_KINDS.contains(&kind)
}

/// Returns true for string literal text without interpolation or bytes prefix.
pub fn is_plain_string(text: &str) -> bool {
    let prefix_len = text.find(['"', '\'']).unwrap_or(text.len());
    let prefix = &text[..prefix_len];
    prefix_len < text.len()
        && prefix
            .chars()
            .all(|c| matches!(c, 'r' | 'R' | 'u' | 'U'))
}

/// Returns the value of a plain string literal, without prefix or quotes.
///
/// Escape sequences are kept as written.
pub fn string_value(text: &str) -> Option<&str> {
    if !is_plain_string(text) {
        return None;
    }
    let body = text.trim_start_matches(|c: char| c.is_ascii_alphabetic());
    for quote in ["\"\"\"", "'''", "\"", "'"] {
        if body.len() >= 2 * quote.len() && body.starts_with(quote) && body.ends_with(quote) {
            return Some(&body[quote.len()..body.len() - quote.len()]);
        }
    }
    None
}
