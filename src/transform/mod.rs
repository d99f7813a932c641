//! Tree rewriting: the rule traversal engine and whole-source transforms.

mod rules;

pub use rules::{Rewrite, Rule, RuleSet, Visit};

use crate::diff::DiffSummary;
use crate::error::Result;
use std::path::Path;

/// A code transformation that can be applied to source files.
pub trait Transform: Send + Sync {
    /// Applies the transformation to the given source code.
    fn apply(&self, source: &str, path: &Path) -> Result<String>;

    /// Returns a description of the transformation.
    fn describe(&self) -> String;
}

/// Represents a change to be applied to a file.
#[derive(Debug, Clone)]
pub struct FileChange {
    pub path: std::path::PathBuf,
    pub original: String,
    pub transformed: String,
}

impl FileChange {
    /// Runs `transform` over the file at `path`.
    pub fn compute(transform: &dyn Transform, path: &Path) -> Result<Self> {
        let original = std::fs::read_to_string(path)?;
        let transformed = transform.apply(&original, path)?;
        Ok(Self {
            path: path.to_path_buf(),
            original,
            transformed,
        })
    }

    /// Returns true if the content was modified.
    pub fn is_modified(&self) -> bool {
        self.original != self.transformed
    }

    /// Unified diff of the change.
    pub fn diff(&self) -> String {
        crate::diff::unified_diff(&self.original, &self.transformed, &self.path)
    }

    /// Counts of inserted and deleted lines.
    pub fn summary(&self) -> DiffSummary {
        DiffSummary::from_diff(&self.original, &self.transformed)
    }
}
