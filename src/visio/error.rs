/// Error types for Visio document operations.
use crate::opc::error::OpcError;
use thiserror::Error;

/// Result type for Visio document operations.
pub type Result<T> = std::result::Result<T, VisioError>;

/// Error types for Visio document operations.
#[derive(Error, Debug)]
pub enum VisioError {
    /// Package-level error (container, content types, relationships, allocation)
    #[error(transparent)]
    Opc(#[from] OpcError),

    /// Operation intentionally left unimplemented
    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    /// No page with the given handle, id or name
    #[error("Page not found: {0}")]
    PageNotFound(String),

    /// No shape with the given handle or id
    #[error("Shape not found: {0}")]
    ShapeNotFound(String),

    /// Invalid codec options
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl VisioError {
    /// XML error in the given part.
    pub fn xml(part: impl Into<String>, message: impl std::fmt::Display) -> Self {
        VisioError::Opc(OpcError::xml(part, message))
    }
}
