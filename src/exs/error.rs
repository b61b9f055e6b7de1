//! Error types for the serializer.

use thiserror::Error;

/// Errors that can occur while serializing a tree.
///
/// Structural problems are detected before any output is produced.
#[derive(Debug, Error)]
pub enum SerializeError {
    /// The start node is not an element.
    #[error("Cannot serialize node {0}: not an element")]
    NotAnElement(usize),

    /// The tree contains a cycle.
    #[error("Cycle detected at node {0}")]
    Cycle(usize),

    /// A namespace URI is used without an in-scope prefix.
    #[error("No prefix declared for namespace {uri:?} (used by {name})")]
    UnknownNamespace { uri: String, name: String },

    /// Writing to the sink failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SerializeError {
    /// Create an unknown namespace error.
    pub fn unknown_namespace(uri: impl Into<String>, name: impl Into<String>) -> Self {
        Self::UnknownNamespace {
            uri: uri.into(),
            name: name.into(),
        }
    }
}
