//! Error types for gateflag-core.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise from loading or writing the configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Underlying I/O failure (file not found, permission denied, etc.).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization error (write/save path).
    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// YAML parse error on load, with file path and line context from serde_yaml.
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// The config file did not exist at the expected path.
    #[error("config not found at {path}; run `gateflag init` first")]
    NotFound { path: PathBuf },

    /// `init` was asked to write over an existing file.
    #[error("config already exists at {path}")]
    AlreadyExists { path: PathBuf },

    /// The file parsed but describes an unusable setup.
    #[error("invalid config: {0}")]
    Invalid(String),
}
