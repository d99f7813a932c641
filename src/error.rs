//! Error types for transform analysis and migration.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for analysis and rewrite operations.
#[derive(Error, Debug)]
pub enum RefactorError {
    #[error("Git error: {0}")]
    Git(#[from] git2::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    #[error("Tree-sitter parse error for {path}: {message}")]
    Parse { path: PathBuf, message: String },

    /// A node did not have the shape the calling code guarantees.
    #[error("Contract violation: {message}")]
    Contract { message: String },

    #[error("Type oracle failed: {message}")]
    Oracle { message: String },

    #[error("Repository not found at path: {0}")]
    RepoNotFound(PathBuf),

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl RefactorError {
    /// Shorthand for a contract violation.
    pub fn contract(message: impl Into<String>) -> Self {
        RefactorError::Contract {
            message: message.into(),
        }
    }

    /// Shorthand for an oracle failure.
    pub fn oracle(message: impl Into<String>) -> Self {
        RefactorError::Oracle {
            message: message.into(),
        }
    }
}

/// A specialized Result type for analysis and rewrite operations.
pub type Result<T> = std::result::Result<T, RefactorError>;
