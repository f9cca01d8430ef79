//! Error types for document binding and invocation

use thiserror::Error;

/// Result type for binding operations
pub type Result<T> = std::result::Result<T, BindError>;

/// Errors raised while building a client module or invoking an operation.
///
/// Unsupported schema constructs are not represented here: synthesis
/// degrades them to opaque fields locally instead of failing the build.
/// Naming collisions are resolved by deterministic suffixing during
/// assembly and never surface as errors.
#[derive(Error, Debug)]
pub enum BindError {
    #[error("unresolved reference: {pointer}")]
    UnresolvedReference { pointer: String },

    #[error("invalid document: {0}")]
    InvalidDocument(String),

    #[error("missing required parameter '{name}' for operation '{operation}'")]
    MissingParameter { name: String, operation: String },

    #[error("no resource group named '{0}'")]
    UnknownGroup(String),

    #[error("no operation named '{name}' in group '{group}'")]
    UnknownOperation { group: String, name: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
}
