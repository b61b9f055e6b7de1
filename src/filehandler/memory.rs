//! Files held in memory.

use std::io::{self, Cursor, Read, Write};
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::Mutex;

use super::{FileHandler, HandlerInfo, components};

type Files = Arc<Mutex<IndexMap<String, Vec<u8>>>>;

/// Handler backed by a shared in-memory map.
///
/// Clones share the same files, so a test can keep a clone around to inspect
/// what the loader wrote.
#[derive(Debug, Clone, Default)]
pub struct MemoryFileHandler {
    files: Files,
}

impl MemoryFileHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a file.
    pub fn insert(&self, path: &str, content: impl Into<Vec<u8>>) {
        let key = normalize(path).unwrap_or_else(|_| path.to_owned());
        self.files.lock().insert(key, content.into());
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with_file(self, path: &str, content: impl Into<Vec<u8>>) -> Self {
        self.insert(path, content);
        self
    }

    /// Current content of a file.
    pub fn get(&self, path: &str) -> Option<Vec<u8>> {
        let key = normalize(path).ok()?;
        self.files.lock().get(&key).cloned()
    }

    /// All stored paths in insertion order.
    pub fn paths(&self) -> Vec<String> {
        self.files.lock().keys().cloned().collect()
    }
}

fn normalize(path: &str) -> io::Result<String> {
    Ok(components(path)?.join("/"))
}

impl FileHandler for MemoryFileHandler {
    fn open(&self, path: &str) -> io::Result<Box<dyn Read + '_>> {
        let content = self
            .get(path)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, format!("no such file: {path}")))?;
        Ok(Box::new(Cursor::new(content)))
    }

    fn write(&self, path: &str) -> io::Result<Box<dyn Write + '_>> {
        Ok(Box::new(MemoryWriter {
            files: Arc::clone(&self.files),
            path: normalize(path)?,
            buf: Vec::new(),
        }))
    }

    fn exists(&self, path: &str) -> bool {
        self.get(path).is_some()
    }

    fn info(&self) -> HandlerInfo {
        HandlerInfo::new("memory", "memory:")
    }
}

/// Buffers writes and stores them on flush and on drop.
struct MemoryWriter {
    files: Files,
    path: String,
    buf: Vec<u8>,
}

impl Write for MemoryWriter {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.files.lock().insert(self.path.clone(), self.buf.clone());
        Ok(())
    }
}

impl Drop for MemoryWriter {
    fn drop(&mut self) {
        let buf = std::mem::take(&mut self.buf);
        self.files.lock().insert(std::mem::take(&mut self.path), buf);
    }
}
