//! JSON-file backend.

use camino::{Utf8Path, Utf8PathBuf};
use footprint_fs::{read_if_exists, replace_file};

use super::backend::{BackendError, CollectionBackend};

/// Stores the unit as a single file.
///
/// Writes are staged beside the target and renamed into place, so a failed
/// write leaves the previous contents intact.
#[derive(Debug, Clone)]
pub struct FileBackend {
    path: Utf8PathBuf,
}

impl FileBackend {
    /// Store the unit at `path`. Parent directories are created on first write.
    pub fn new(path: impl Into<Utf8PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the unit on disk.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }
}

impl CollectionBackend for FileBackend {
    fn unit_name(&self) -> &str {
        self.path.as_str()
    }

    fn read(&self) -> Result<Option<Vec<u8>>, BackendError> {
        Ok(read_if_exists(&self.path)?)
    }

    fn write(&self, bytes: &[u8]) -> Result<(), BackendError> {
        Ok(replace_file(&self.path, bytes)?)
    }
}
