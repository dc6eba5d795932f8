use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::errors::{ManifestError, Result};
use crate::template::FilenameTemplate;

/// What to do with a chunk whose stylesheet cannot be parsed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParseErrorPolicy {
    /// Log a warning and emit no manifest for the chunk
    #[default]
    Skip,
    /// Log a warning and emit an empty manifest for the chunk
    Empty,
    /// Fail the whole build
    Fail,
}

impl FromStr for ParseErrorPolicy {
    type Err = ManifestError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "skip" => Ok(Self::Skip),
            "empty" => Ok(Self::Empty),
            "fail" => Ok(Self::Fail),
            other => Err(ManifestError::config(format!(
                "Unknown parse error policy '{}'. Use skip, empty or fail",
                other
            ))),
        }
    }
}

impl fmt::Display for ParseErrorPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Skip => "skip",
            Self::Empty => "empty",
            Self::Fail => "fail",
        })
    }
}

/// Plugin options. Unknown keys are rejected when loading.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct PluginOptions {
    /// Template for manifest filenames; `None` selects `<stylesheet>.json`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_filename: Option<String>,

    pub parse_errors: ParseErrorPolicy,

    /// Treat errors the CSS parser recovers from as parse failures
    pub strict: bool,
}

impl PluginOptions {
    /// Load options from a YAML file
    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ManifestError::ConfigError {
            message: format!("Failed to read config file {}: {}", path.display(), e),
        })?;

        serde_yaml::from_str(&content).map_err(|e| ManifestError::ConfigError {
            message: format!("Failed to parse YAML config: {}", e),
        })
    }

    /// Load options from a JSON file
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ManifestError::ConfigError {
            message: format!("Failed to read config file {}: {}", path.display(), e),
        })?;

        serde_json::from_str(&content).map_err(|e| ManifestError::ConfigError {
            message: format!("Failed to parse JSON config: {}", e),
        })
    }

    /// Load options from a file (auto-detect format)
    pub fn from_file(path: &Path) -> Result<Self> {
        match path.extension().and_then(|s| s.to_str()) {
            Some("yaml") | Some("yml") => Self::from_yaml_file(path),
            Some("json") => Self::from_json_file(path),
            _ => Err(ManifestError::ConfigError {
                message: format!(
                    "Unsupported config file format: {}. Use .yaml, .yml, or .json",
                    path.display()
                ),
            }),
        }
    }

    /// Overlay values that were explicitly given elsewhere (CLI flags)
    pub fn merge(
        mut self,
        output_filename: Option<String>,
        parse_errors: Option<ParseErrorPolicy>,
        strict: bool,
    ) -> Self {
        if output_filename.is_some() {
            self.output_filename = output_filename;
        }
        if let Some(policy) = parse_errors {
            self.parse_errors = policy;
        }
        self.strict |= strict;
        self
    }

    /// Parse the configured template, if any
    pub fn template(&self) -> Result<Option<FilenameTemplate>> {
        self.output_filename
            .as_deref()
            .map(FilenameTemplate::parse)
            .transpose()
    }
}
