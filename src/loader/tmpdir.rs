//! Temporary on-disk copy of a project.

use std::io;
use std::ops::Deref;
use std::path::Path;

use tempfile::TempDir;

/// A temporary directory holding every fragment of a model.
///
/// The directory and its contents are removed when the guard is dropped.
#[derive(Debug)]
pub struct TempProjectDir {
    dir: TempDir,
}

impl TempProjectDir {
    pub(crate) fn new() -> io::Result<Self> {
        let dir = tempfile::Builder::new().prefix("melody-").tempdir()?;
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Remove the directory now, reporting errors instead of ignoring them.
    pub fn close(self) -> io::Result<()> {
        self.dir.close()
    }
}

impl Deref for TempProjectDir {
    type Target = Path;

    fn deref(&self) -> &Path {
        self.dir.path()
    }
}

impl AsRef<Path> for TempProjectDir {
    fn as_ref(&self) -> &Path {
        self.dir.path()
    }
}
