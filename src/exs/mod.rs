//! An Eclipse-like XML serializer.
//!
//! Generic XML writers format documents very differently from the modeling
//! tool that owns the files, so a model saved by them shows spurious diffs even
//! when nothing changed. This module reproduces the tool's output byte for
//! byte:
//!
//! ```text
//! <?xml version="1.0" encoding="UTF-8"?>                  (declare_encoding)
//! <root xmlns:a="urn:a" id="1" name="first"
//!     longAttribute="pushed past line_length"            (depth + 2 indent)
//!     next="every later attribute wraps too">
//!   <child id="2"/>                                       (self-closed)
//!   <bodies>text stays inline</bodies>
//!   <semanticResources>
//!   </semanticResources>                                  (always expanded)
//! </root>
//! ```
//!
//! Escaping differs per position, see [`escape`].

mod error;
pub mod escape;
mod writer;

pub use error::SerializeError;

use std::io::Write;

use crate::xml::{Document, NodeId};
use writer::Job;

/// One level of indentation.
pub const INDENT: &str = "  ";

/// The platform line terminator.
pub const LINESEP: &str = if cfg!(windows) { "\r\n" } else { "\n" };

/// Default maximum line length before attributes wrap.
pub const LINE_LENGTH: usize = 80;

/// Tags that are never self-closed, even when empty.
pub const ALWAYS_EXPANDED_TAGS: &[&str] = &["bodies", "semanticResources"];

/// Options for [`serialize`] and [`write`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerializeOptions {
    /// Number of characters after which attributes are moved to their own line.
    /// Use `usize::MAX` to never wrap.
    pub line_length: usize,
    /// Also emit comments and processing instructions next to the start node.
    /// `None` means yes for the document root, no for any other element.
    pub siblings: Option<bool>,
    /// Prepend an XML declaration naming UTF-8.
    pub declare_encoding: bool,
}

impl Default for SerializeOptions {
    fn default() -> Self {
        Self {
            line_length: LINE_LENGTH,
            siblings: None,
            declare_encoding: false,
        }
    }
}

impl SerializeOptions {
    /// Options for writing a whole fragment file.
    pub fn document(line_length: usize) -> Self {
        Self {
            line_length,
            siblings: Some(true),
            declare_encoding: true,
        }
    }
}

/// Serialize the tree below `node` into a byte buffer.
pub fn serialize(doc: &Document, node: NodeId, options: &SerializeOptions) -> Result<Vec<u8>, SerializeError> {
    let job = Job::prepare(doc, node, options)?;
    let mut buf = Vec::new();
    job.emit(&mut buf)?;
    Ok(buf)
}

/// Serialize the tree below `node` into `sink`.
///
/// The tree is validated first, so a malformed tree leaves `sink` untouched.
/// I/O errors can still leave a partial write behind.
pub fn write<W: Write>(
    doc: &Document,
    node: NodeId,
    sink: W,
    options: &SerializeOptions,
) -> Result<(), SerializeError> {
    let job = Job::prepare(doc, node, options)?;
    let mut out = std::io::BufWriter::new(sink);
    job.emit(&mut out)?;
    out.flush()?;
    Ok(())
}

/// Serialize the tree below `node` as a string, without XML declaration.
pub fn to_string(doc: &Document, node: NodeId) -> Result<String, SerializeError> {
    let bytes = serialize(doc, node, &SerializeOptions::default())?;
    // Everything written comes from `&str` values.
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
