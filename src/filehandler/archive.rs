//! Read-only access to files inside a zip archive.

use std::io::{self, Cursor, Read, Write};
use std::path::Path;

use parking_lot::Mutex;
use zip::ZipArchive;
use zip::result::ZipError;

use super::{FileHandler, HandlerInfo, components};

/// Handler for a zip archive, e.g. a packaged library project.
pub struct ZipFileHandler {
    archive: Mutex<ZipArchive<Cursor<Vec<u8>>>>,
    /// Directory inside the archive that holds the project.
    prefix: String,
    url: String,
}

impl ZipFileHandler {
    /// Open an archive from memory.
    pub fn from_bytes(bytes: Vec<u8>, url: impl Into<String>) -> io::Result<Self> {
        let archive = ZipArchive::new(Cursor::new(bytes)).map_err(zip_error)?;
        Ok(Self {
            archive: Mutex::new(archive),
            prefix: String::new(),
            url: url.into(),
        })
    }

    /// Open an archive file on disk.
    pub fn open_file(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        Self::from_bytes(bytes, format!("zip+file://{}", path.display()))
    }

    /// Resolve paths below `prefix` inside the archive.
    pub fn with_prefix(mut self, prefix: &str) -> Self {
        self.prefix = prefix.trim_matches('/').to_owned();
        self
    }

    fn entry_name(&self, path: &str) -> io::Result<String> {
        let path = components(path)?.join("/");
        Ok(if self.prefix.is_empty() {
            path
        } else {
            format!("{}/{path}", self.prefix)
        })
    }
}

fn zip_error(err: ZipError) -> io::Error {
    match err {
        ZipError::FileNotFound => io::Error::new(io::ErrorKind::NotFound, err),
        ZipError::Io(e) => e,
        other => io::Error::new(io::ErrorKind::InvalidData, other),
    }
}

impl FileHandler for ZipFileHandler {
    fn open(&self, path: &str) -> io::Result<Box<dyn Read + '_>> {
        let name = self.entry_name(path)?;
        let mut archive = self.archive.lock();
        let mut entry = archive.by_name(&name).map_err(zip_error)?;
        let mut content = Vec::with_capacity(entry.size() as usize);
        entry.read_to_end(&mut content)?;
        Ok(Box::new(Cursor::new(content)))
    }

    fn write(&self, path: &str) -> io::Result<Box<dyn Write + '_>> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            format!("zip archives are read-only: {path}"),
        ))
    }

    fn exists(&self, path: &str) -> bool {
        match self.entry_name(path) {
            Ok(name) => self.archive.lock().index_for_name(&name).is_some(),
            Err(_) => false,
        }
    }

    fn info(&self) -> HandlerInfo {
        HandlerInfo::new("zip", self.url.clone())
    }
}
