//! Tool configuration.
//!
//! Every sentinel name and path convention the tools rely on lives here, so a
//! project with different conventions can override them from a YAML or JSON
//! file. Missing keys fall back to the defaults.
//!
//! ```yaml
//! documentation:
//!   marker: "# !DocumentClass"
//! migration:
//!   app_name: koza_app
//! history:
//!   rename_similarity: 80
//! ```

use crate::error::{RefactorError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub documentation: DocumentationConfig,
    pub migration: MigrationConfig,
    pub history: HistoryConfig,
    pub oracle: OracleConfig,
}

/// Settings for documentation extraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentationConfig {
    /// Comment prefix that marks a statement for documentation.
    pub marker: String,
    /// Name of the variable holding the current input row.
    pub record_variable: String,
    /// Qualified-name prefix of the classes worth documenting.
    pub schema_namespace: String,
    /// Prefix of the oracle's description for a class.
    pub class_tag: String,
}

impl Default for DocumentationConfig {
    fn default() -> Self {
        Self {
            marker: "# !DocumentClass".to_string(),
            record_variable: "row".to_string(),
            schema_namespace: "biolink_model.datamodel.pydanticmodel_v2.".to_string(),
            class_tag: "class ".to_string(),
        }
    }
}

/// Names used by the legacy transform API and its replacement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MigrationConfig {
    pub app_name: String,
    pub factory: String,
    pub factory_module: String,
    pub row_name: String,
    pub record_name: String,
    pub writer_name: String,
    pub lookup_method: String,
    /// Header line of the function that replaces the row loop.
    pub transform_signature: String,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            app_name: "koza_app".to_string(),
            factory: "get_koza_app".to_string(),
            factory_module: "koza.cli_utils".to_string(),
            row_name: "row".to_string(),
            record_name: "record".to_string(),
            writer_name: "koza".to_string(),
            lookup_method: "lookup".to_string(),
            transform_signature: "def transform_record(koza: Koza, record: dict[str, Any]):"
                .to_string(),
        }
    }
}

/// Path conventions for the history query. `{tag}` is replaced by the ingest tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    pub source_directories: Vec<String>,
    pub documentation_file: String,
    /// Rename detection threshold, in percent.
    pub rename_similarity: u16,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            source_directories: vec![
                "src/monarch_ingest/ingests/{tag}".to_string(),
                "tests/unit/{tag}".to_string(),
            ],
            documentation_file: "docs/Sources/{tag}.md".to_string(),
            rename_similarity: 80,
        }
    }
}

impl HistoryConfig {
    /// The repository-relative paths associated with `tag`.
    pub fn paths_for(&self, tag: &str) -> Vec<String> {
        self.source_directories
            .iter()
            .chain(std::iter::once(&self.documentation_file))
            .map(|template| template.replace("{tag}", tag))
            .collect()
    }
}

/// How to run the type oracle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleConfig {
    /// Interpreter used to run the oracle helper.
    pub python: String,
    /// Virtual environment analysed against, relative to the project root.
    pub environment: Option<PathBuf>,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            python: "python3".to_string(),
            environment: Some(PathBuf::from(".venv")),
        }
    }
}

impl Config {
    /// Load config from a file, choosing the format by extension.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml" | "yml") => Self::from_yaml(path),
            Some("json") => Self::from_json(path),
            _ => Err(RefactorError::InvalidConfig(format!(
                "unsupported config format: {}",
                path.display()
            ))),
        }
    }

    /// Load config from a YAML file.
    pub fn from_yaml(path: impl AsRef<Path>) -> Result<Self> {
        let content = read_config(path.as_ref())?;
        Self::parse_yaml(&content)
    }

    /// Load config from a JSON file.
    pub fn from_json(path: impl AsRef<Path>) -> Result<Self> {
        let content = read_config(path.as_ref())?;
        let config: Config = serde_json::from_str(&content).map_err(|e| {
            RefactorError::InvalidConfig(format!("Failed to parse JSON config: {}", e))
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn parse_yaml(content: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(content).map_err(|e| {
            RefactorError::InvalidConfig(format!("Failed to parse YAML config: {}", e))
        })?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.history.rename_similarity > 100 {
            return Err(RefactorError::InvalidConfig(format!(
                "rename_similarity must be a percentage, got {}",
                self.history.rename_similarity
            )));
        }
        if self.documentation.marker.is_empty() {
            return Err(RefactorError::InvalidConfig(
                "documentation marker must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

fn read_config(path: &Path) -> Result<String> {
    if !path.exists() {
        return Err(RefactorError::FileNotFound(path.to_path_buf()));
    }
    std::fs::read_to_string(path).map_err(|e| {
        RefactorError::Io(std::io::Error::new(
            e.kind(),
            format!("Failed to read config file: {}", e),
        ))
    })
}
