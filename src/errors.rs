use thiserror::Error;

/// Main error type for the css-class-manifest crate
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Pattern error: {0}")]
    Pattern(#[from] glob::PatternError),

    #[error("Glob error: {0}")]
    Glob(#[from] glob::GlobError),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("No files found matching the provided patterns")]
    NoFilesFound,

    #[error("Failed to parse stylesheet {path}: {message}")]
    ParseError { path: String, message: String },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Cannot resolve placeholder {placeholder} for chunk '{chunk}': {message}")]
    TemplateError {
        placeholder: String,
        chunk: String,
        message: String,
    },

    #[error("Asset '{file}' of chunk '{chunk}' is not available for hashing")]
    MissingAsset { chunk: String, file: String },

    #[error("Conflict: an asset with different content was already emitted as '{filename}'")]
    AssetConflict { filename: String },

    #[error("Failed to write output to {path}: {message}")]
    OutputError { path: String, message: String },
}

impl ManifestError {
    /// Shorthand for configuration failures
    pub fn config(message: impl Into<String>) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ManifestError>;
