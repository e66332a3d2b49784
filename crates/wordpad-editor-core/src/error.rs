//! Error types for editor operations.

use thiserror::Error;

use crate::tree::NodeId;

/// Errors that can occur while editing a document.
///
/// Overlay teardown never surfaces these to the user; they are logged and
/// swallowed at the point of occurrence. Commands and configuration loading
/// return them to the caller.
#[derive(Error, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum EditorError {
    /// No node with this id exists in the document.
    #[error("node {0} not found")]
    NodeNotFound(NodeId),

    /// The node is not an image or table and cannot be wrapped.
    #[error("node {0} is not an embeddable object")]
    NotEmbeddable(NodeId),

    /// No layout geometry is available for the node.
    #[error("no geometry for node {0}")]
    NoGeometry(NodeId),

    /// A command was given arguments it cannot act on.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Configuration failed validation.
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for EditorError {
    fn from(e: serde_json::Error) -> Self {
        EditorError::Serialization(e.to_string())
    }
}
