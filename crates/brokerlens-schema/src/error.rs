/// Errors that can occur while loading or compiling schemas.
///
/// Validating a payload never fails with one of these; validation outcomes
/// are reported as [`crate::ValidationResult`].
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    /// The schema directory or a schema file could not be read.
    #[error("failed to load schema: {0}")]
    LoadFailed(String),

    /// The schema could not be compiled.
    #[error("failed to compile schema '{name}': {message}")]
    CompileFailed { name: String, message: String },

    /// The schema document is not valid JSON.
    #[error("schema is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SchemaError>;
