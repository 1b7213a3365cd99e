//! Filesystem-backed document store.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::traits::{ConfigStore, StoreError};

/// Stores each document as `<dir>/<name>.json`.
///
/// Writes go to a temporary file that is renamed into place, so a crash
/// mid-write leaves the previous snapshot intact.
#[derive(Clone, Debug)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Creates a store rooted at `dir`. The directory is created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Root directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.json"))
    }
}

fn backend(err: io::Error) -> StoreError {
    StoreError::Backend(err.to_string())
}

impl ConfigStore for FileStore {
    fn load(&self, name: &str) -> Result<Vec<u8>, StoreError> {
        fs::read(self.path(name)).map_err(|err| match err.kind() {
            io::ErrorKind::NotFound => StoreError::NotFound(name.to_string()),
            _ => backend(err),
        })
    }

    fn store(&mut self, name: &str, bytes: &[u8]) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir).map_err(backend)?;
        let path = self.path(name);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, bytes).map_err(backend)?;
        fs::rename(&tmp, &path).map_err(backend)?;
        log::trace!("[Store] Wrote {} bytes to {}", bytes.len(), path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_read() {
        let temp = tempfile::tempdir().unwrap();
        let dir = temp.path().join("cs-data");
        let mut store = FileStore::new(&dir);
        store.store("outputs", b"{\"count\":0}").unwrap();
        assert_eq!(store.load("outputs").unwrap(), b"{\"count\":0}");
        assert!(dir.join("outputs.json").exists());
        assert!(!dir.join("outputs.json.tmp").exists());
    }

    #[test]
    fn missing_document_is_not_found() {
        let temp = tempfile::tempdir().unwrap();
        let store = FileStore::new(temp.path());
        assert!(matches!(store.load("sensors"), Err(StoreError::NotFound(name)) if name == "sensors"));
    }
}
