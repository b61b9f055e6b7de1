//! Files in a directory on disk.

use std::fs::{self, File};
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use super::{FileHandler, HandlerInfo, components};

/// Handler for a project directory.
#[derive(Debug, Clone)]
pub struct LocalFileHandler {
    root: PathBuf,
}

impl LocalFileHandler {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> io::Result<PathBuf> {
        let mut full = self.root.clone();
        full.extend(components(path)?);
        Ok(full)
    }
}

impl FileHandler for LocalFileHandler {
    fn open(&self, path: &str) -> io::Result<Box<dyn Read + '_>> {
        let file = File::open(self.resolve(path)?)?;
        Ok(Box::new(io::BufReader::new(file)))
    }

    fn write(&self, path: &str) -> io::Result<Box<dyn Write + '_>> {
        let full = self.resolve(path)?;
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent)?;
        }
        tracing::trace!(path = %full.display(), "opening file for writing");
        Ok(Box::new(BufWriter::new(File::create(full)?)))
    }

    fn exists(&self, path: &str) -> bool {
        self.resolve(path).map(|p| p.is_file()).unwrap_or(false)
    }

    fn info(&self) -> HandlerInfo {
        HandlerInfo::new("local", format!("file://{}", self.root.display()))
    }
}
