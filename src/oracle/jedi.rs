//! Oracle backed by the Jedi static analyser.
//!
//! Each query runs a short Python helper in a subprocess that prints the Jedi
//! result as JSON on stdout.

use super::{InferredSymbol, TypeOracle};
use crate::config::OracleConfig;
use crate::cst::Position;
use crate::error::{RefactorError, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::trace;

const HELPER: &str = r#"
import json
import sys

import jedi

path, mode, line, column = sys.argv[1], sys.argv[2], int(sys.argv[3]), int(sys.argv[4])
environment = jedi.create_environment(sys.argv[5]) if len(sys.argv) > 5 else None
script = jedi.Script(path=path, environment=environment)
names = script.infer(line, column) if mode == "infer" else script.goto(line, column)
json.dump(
    [
        {"full_name": n.full_name, "description": n.description, "line": n.line, "column": n.column}
        for n in names
    ],
    sys.stdout,
)
"#;

/// Files whose presence marks a project root.
const PROJECT_MARKERS: &[&str] = &["pyproject.toml", "setup.py", ".git"];

#[derive(Debug, Deserialize)]
struct JediName {
    full_name: Option<String>,
    description: String,
    line: Option<usize>,
    column: Option<usize>,
}

/// Runs Jedi against one source file.
#[derive(Debug, Clone)]
pub struct JediOracle {
    python: String,
    path: PathBuf,
    environment: Option<PathBuf>,
}

impl JediOracle {
    /// An oracle for `path`, using the virtual environment from `config`
    /// resolved against the file's project root when it exists.
    pub fn for_file(path: impl AsRef<Path>, config: &OracleConfig) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(RefactorError::FileNotFound(path.to_path_buf()));
        }
        let path = path.canonicalize()?;
        let environment = config.environment.as_ref().and_then(|env| {
            let root = project_root(&path)?;
            Some(root.join(env)).filter(|p| p.exists())
        });
        Ok(Self {
            python: config.python.clone(),
            path,
            environment,
        })
    }

    /// The virtual environment queries run against, if any.
    pub fn environment(&self) -> Option<&Path> {
        self.environment.as_deref()
    }

    fn query(&self, mode: &str, position: Position) -> Result<Vec<JediName>> {
        trace!(mode, line = position.line, column = position.column, path = %self.path.display(), "jedi query");

        let mut command = Command::new(&self.python);
        command
            .arg("-c")
            .arg(HELPER)
            .arg(&self.path)
            .arg(mode)
            .arg(position.line.to_string())
            .arg(position.column.to_string());
        if let Some(ref environment) = self.environment {
            command.arg(environment);
        }

        let output = command
            .stdin(Stdio::null())
            .output()
            .map_err(|e| RefactorError::oracle(format!("failed to run {}: {}", self.python, e)))?;

        if !output.status.success() {
            return Err(RefactorError::oracle(format!(
                "jedi {} at {}:{}:{} exited with {}: {}",
                mode,
                self.path.display(),
                position.line,
                position.column,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        serde_json::from_slice(&output.stdout)
            .map_err(|e| RefactorError::oracle(format!("malformed jedi output: {}", e)))
    }
}

impl TypeOracle for JediOracle {
    fn infer(&self, position: Position) -> Result<Option<InferredSymbol>> {
        Ok(self
            .query("infer", position)?
            .into_iter()
            .next()
            .map(|name| InferredSymbol {
                full_name: name.full_name,
                description: name.description,
            }))
    }

    fn goto_definition(&self, position: Position) -> Result<Option<Position>> {
        Ok(self
            .query("goto", position)?
            .into_iter()
            .next()
            .and_then(|name| Some(Position::new(name.line?, name.column?))))
    }
}

/// The nearest ancestor directory of `path` that looks like a project root.
fn project_root(path: &Path) -> Option<PathBuf> {
    path.ancestors()
        .skip(1)
        .find(|dir| PROJECT_MARKERS.iter().any(|m| dir.join(m).exists()))
        .map(Path::to_path_buf)
}
