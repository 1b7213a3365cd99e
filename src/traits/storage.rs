//! Persistence backend trait.

use thiserror::Error;

/// Errors reported by a [`ConfigStore`] backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Nothing has been stored under this name yet.
    #[error("no document named `{0}`")]
    NotFound(String),
    /// The backend failed to read or write.
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Key/document store that survives power loss.
///
/// Maps a resource name (for example `"outputs"`) to a serialized document.
/// Only entity managers touch the store, from their `init` and `store`
/// operations.
pub trait ConfigStore: Send {
    /// Loads the raw bytes stored under `name`.
    fn load(&self, name: &str) -> Result<Vec<u8>, StoreError>;

    /// Replaces the document stored under `name`.
    fn store(&mut self, name: &str, bytes: &[u8]) -> Result<(), StoreError>;
}
