//! Error types for gateflag-template.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise from loading or editing templates.
#[derive(Debug, Error)]
pub enum TemplateError {
    /// Filesystem error while loading a template.
    #[error("template io error at {path}: {source}")]
    Io { path: PathBuf, source: std::io::Error },

    /// The body is neither valid JSON nor valid YAML.
    #[error("template is not a JSON or YAML document: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// JSON re-serialization failed after an edit.
    #[error("template serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The structural path to the image reference does not exist.
    #[error("template has no `{path}` reference")]
    MissingImageRef { path: String },
}
