//! Persisted entity documents.
//!
//! Each entity kind is stored as one JSON document under its resource name
//! (`"outputs"`, `"turnouts"`, `"sensors"`):
//!
//! ```json
//! { "count": 2, "entities": [
//!     { "id": 1, "pin": 16, "flags": 0, "state": false },
//!     { "id": 2, "pin": 17, "flags": 6, "state": true }
//! ] }
//! ```
//!
//! Turnouts add a `subtype` field carrying the turnout type. This module only
//! moves documents in and out of a [`ConfigStore`]; entity reconstruction and
//! restore policies live in [`crate::entity`].

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::traits::{ConfigStore, StoreError};

/// Errors moving an entity document through the store.
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// The backend failed.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// The document could not be encoded or decoded.
    #[error("malformed document: {0}")]
    Format(#[from] serde_json::Error),
    /// The collection holds more entities than the count field can express.
    #[error("too many entities to store: {0}")]
    TooMany(usize),
}

/// One persisted entity.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRecord {
    /// Entity id, unique within its kind.
    pub id: u16,
    /// GPIO pin or DCC accessory address.
    pub pin: u16,
    /// Kind-specific flag byte.
    #[serde(default)]
    pub flags: u8,
    /// Active state at the time of the snapshot.
    #[serde(default)]
    pub state: bool,
    /// Kind-specific subtype (turnout type).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtype: Option<u8>,
}

/// A full collection snapshot.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityDocument {
    /// Number of entities written.
    pub count: u16,
    /// The entities in enumeration order.
    #[serde(default)]
    pub entities: Vec<EntityRecord>,
}

impl EntityDocument {
    /// Builds a document, filling in the count.
    pub fn new(entities: Vec<EntityRecord>) -> Result<Self, PersistenceError> {
        let count =
            u16::try_from(entities.len()).map_err(|_| PersistenceError::TooMany(entities.len()))?;
        Ok(Self { count, entities })
    }

    /// Encodes the document as JSON bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, PersistenceError> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Decodes a document from JSON bytes.
    ///
    /// If `count` disagrees with the entity list, the list wins.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PersistenceError> {
        let document: EntityDocument = serde_json::from_slice(bytes)?;
        if usize::from(document.count) != document.entities.len() {
            log::warn!(
                "[Store] Document count {} does not match {} entities",
                document.count,
                document.entities.len()
            );
        }
        Ok(document)
    }
}

/// Reads the document stored under `name`.
pub fn load_document(
    store: &dyn ConfigStore,
    name: &str,
) -> Result<EntityDocument, PersistenceError> {
    let bytes = store.load(name)?;
    EntityDocument::from_bytes(&bytes)
}

/// Replaces the document stored under `name`, returning the entity count.
pub fn store_document(
    store: &mut dyn ConfigStore,
    name: &str,
    document: &EntityDocument,
) -> Result<u16, PersistenceError> {
    store.store(name, &document.to_bytes()?)?;
    Ok(document.count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::MemoryStore;

    fn record(id: u16, pin: u16) -> EntityRecord {
        EntityRecord {
            id,
            pin,
            flags: 0,
            state: false,
            subtype: None,
        }
    }

    #[test]
    fn document_layout() {
        let document = EntityDocument::new(vec![record(1, 16)]).unwrap();
        let json: serde_json::Value = serde_json::from_slice(&document.to_bytes().unwrap()).unwrap();
        assert_eq!(json["count"], 1);
        assert_eq!(json["entities"][0]["id"], 1);
        assert_eq!(json["entities"][0]["pin"], 16);
        assert_eq!(json["entities"][0]["state"], false);
        assert!(json["entities"][0].get("subtype").is_none());
    }

    #[test]
    fn missing_optional_fields_default() {
        let document =
            EntityDocument::from_bytes(br#"{"count":1,"entities":[{"id":3,"pin":4}]}"#).unwrap();
        assert_eq!(document.entities[0], record(3, 4));
    }

    #[test]
    fn garbage_is_a_format_error() {
        assert!(matches!(
            EntityDocument::from_bytes(b"not json"),
            Err(PersistenceError::Format(_))
        ));
    }

    #[test]
    fn store_then_load() {
        let mut store = MemoryStore::new();
        let document = EntityDocument::new(vec![record(1, 16), record(2, 17)]).unwrap();
        assert_eq!(store_document(&mut store, "outputs", &document).unwrap(), 2);
        assert_eq!(load_document(&store, "outputs").unwrap(), document);
    }

    #[test]
    fn missing_document_is_store_error() {
        let store = MemoryStore::new();
        assert!(matches!(
            load_document(&store, "sensors"),
            Err(PersistenceError::Store(StoreError::NotFound(_)))
        ));
    }
}
