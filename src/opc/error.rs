/// Error types for OPC package operations
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OpcError {
    #[error("Malformed container: {0}")]
    MalformedContainer(String),

    #[error("XML error in '{part}': {message}")]
    Xml { part: String, message: String },

    #[error("Invalid pack URI: {0}")]
    InvalidPackUri(String),

    #[error("Part not found: {0}")]
    PartNotFound(String),

    #[error("Content type not found for partname: {0}")]
    UnresolvedContentType(String),

    #[error("No content type entry registered for: {0}")]
    ContentTypeNotFound(String),

    #[error("Relationship id '{r_id}' already exists in '{scope}'")]
    DuplicateRelationshipId { scope: String, r_id: String },

    #[error("Relationship not found: {0}")]
    RelationshipNotFound(String),

    #[error("Relationship '{r_id}' in '{scope}' targets missing part '{target}'")]
    DanglingRelationship {
        scope: String,
        r_id: String,
        target: String,
    },

    #[error("Allocated {kind} '{value}' collides with an existing entry")]
    AllocationConflict { kind: &'static str, value: String },

    #[error("Output already exists: {}", .0.display())]
    OutputConflict(PathBuf),

    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl OpcError {
    /// Build an [`OpcError::Xml`] for the given part from any displayable cause.
    pub fn xml(part: impl Into<String>, message: impl std::fmt::Display) -> Self {
        OpcError::Xml {
            part: part.into(),
            message: message.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, OpcError>;
