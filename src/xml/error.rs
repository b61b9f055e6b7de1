//! Error types for the XML element graph.

use thiserror::Error;

/// Errors raised while parsing or mutating a [`Document`](super::Document).
#[derive(Debug, Error)]
pub enum XmlError {
    /// The input is not well-formed XML.
    #[error("XML parse error at byte {position}: {message}")]
    Syntax { position: u64, message: String },

    /// A name could not be interpreted.
    #[error("Invalid XML name: {0:?}")]
    InvalidName(String),

    /// A namespace prefix was used without being declared.
    #[error("Undeclared namespace prefix: {0:?}")]
    UndeclaredPrefix(String),

    /// The node is not an element.
    #[error("Node {0} is not an element")]
    NotAnElement(usize),

    /// The document root cannot be moved or detached.
    #[error("The document root cannot be moved or detached")]
    RootNode,

    /// The mutation would make a node its own ancestor.
    #[error("Cannot move node {child} below its own descendant {parent}")]
    Cycle { parent: usize, child: usize },
}

impl XmlError {
    /// Create a syntax error.
    pub fn syntax(position: u64, message: impl Into<String>) -> Self {
        Self::Syntax {
            position,
            message: message.into(),
        }
    }

    /// Create an invalid name error.
    pub fn invalid_name(name: impl Into<String>) -> Self {
        Self::InvalidName(name.into())
    }
}
