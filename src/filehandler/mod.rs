//! Resource handlers.
//!
//! A model is spread over files that live in one or more *resources*: a
//! project directory, an archive, an in-memory map. The loader never touches
//! the file system directly; it asks the handler registered for a resource to
//! open or create files by their `/`-separated path inside that resource.
//!
//! ```text
//! MelodyLoader
//!   ├── "\0"          → LocalFileHandler("/work/project")
//!   ├── "library"     → ZipFileHandler("library.zip")
//!   └── ...
//! ```

#[cfg(feature = "archive")]
mod archive;
mod local;
mod memory;

#[cfg(feature = "archive")]
pub use archive::ZipFileHandler;
pub use local::LocalFileHandler;
pub use memory::MemoryFileHandler;

use std::io::{self, Read, Write};

use serde::{Deserialize, Serialize};

/// Describes where a handler gets its files from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandlerInfo {
    /// Handler kind, e.g. `"local"`, `"memory"` or `"zip"`.
    pub kind: String,
    /// Location of the resource.
    pub url: String,
}

impl HandlerInfo {
    pub fn new(kind: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            url: url.into(),
        }
    }
}

/// Byte-stream access to the files of one resource.
///
/// Errors are plain [`io::Error`]s; callers attach the offending path.
pub trait FileHandler: Send + Sync {
    /// Open a file for reading.
    fn open(&self, path: &str) -> io::Result<Box<dyn Read + '_>>;

    /// Create or truncate a file for writing.
    ///
    /// Data is only guaranteed to be stored once the writer has been flushed
    /// and dropped.
    fn write(&self, path: &str) -> io::Result<Box<dyn Write + '_>>;

    /// Whether `path` exists and can be opened.
    fn exists(&self, path: &str) -> bool;

    /// Provenance of this resource.
    fn info(&self) -> HandlerInfo;

    /// Read a whole file.
    fn read_all(&self, path: &str) -> io::Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.open(path)?.read_to_end(&mut buf)?;
        Ok(buf)
    }
}

/// Split a handler path into its components, rejecting anything that would
/// leave the resource.
pub(crate) fn components(path: &str) -> io::Result<Vec<&str>> {
    let mut parts = Vec::new();
    for part in path.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                if parts.pop().is_none() {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidInput,
                        format!("path escapes the resource: {path}"),
                    ));
                }
            }
            part => parts.push(part),
        }
    }
    if parts.is_empty() {
        return Err(io::Error::new(io::ErrorKind::InvalidInput, "empty path"));
    }
    Ok(parts)
}
