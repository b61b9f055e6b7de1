//! Error types for the model loader.

use thiserror::Error;

use crate::exs::SerializeError;
use crate::xml::XmlError;

/// Errors that can occur while loading, navigating or saving a model.
#[derive(Debug, Error)]
pub enum LoaderError {
    /// A fragment is not well-formed XML.
    #[error("Cannot parse {path}: {source}")]
    ParseError {
        path: String,
        #[source]
        source: XmlError,
    },

    /// A link could not be resolved.
    #[error("Broken link: {0}")]
    BrokenLink(String),

    /// An identifier is already in use.
    #[error("Duplicate identifier: {0}")]
    DuplicateIdentifier(String),

    /// The element does not belong to any loaded fragment.
    #[error("Element is not part of a loaded fragment: {0}")]
    UnknownFragment(String),

    /// A viewpoint is already active in a different version.
    #[error("Viewpoint {name} is active in version {active}, cannot activate {requested}")]
    ViewpointConflict {
        name: String,
        active: String,
        requested: String,
    },

    /// A resource handler failed.
    #[error("IO error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The element has no identifier attribute.
    #[error("Element has no identifier: {0}")]
    MissingIdentifier(String),

    /// A requested identifier is malformed.
    #[error("Invalid identifier: {0:?}")]
    InvalidIdentifier(String),

    /// The entry point is not a diagram file.
    #[error("Invalid entry point {0}: expected an .aird file")]
    InvalidEntrypoint(String),

    /// No handler is registered for a resource.
    #[error("No such resource: {0}")]
    MissingResource(String),

    /// Duplicate identifiers were found on load.
    #[error("Refusing to save a corrupt model; pass `force` to override")]
    Corrupt,

    /// A fragment could not be serialized.
    #[error("Cannot serialize {path}: {source}")]
    Serialize {
        path: String,
        #[source]
        source: SerializeError,
    },

    /// A tree mutation was rejected.
    #[error(transparent)]
    Xml(#[from] XmlError),
}

impl LoaderError {
    /// Create an IO error for `path`.
    pub fn io(path: impl ToString, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_string(),
            source,
        }
    }

    /// Create a broken link error.
    pub fn broken_link(link: impl Into<String>) -> Self {
        Self::BrokenLink(link.into())
    }
}
