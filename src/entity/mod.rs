//! Layout entities and the generic manager that owns them.
//!
//! Outputs, turnouts and sensors share one lifecycle: they are created or
//! reconfigured by id, driven active or inactive, listed in DCC++ status
//! lines and snapshotted to the store. [`EntityManager`] implements that
//! lifecycle once; each kind plugs in through the [`Entity`] trait.
//!
//! # Invariants
//!
//! - Ids are unique within a manager.
//! - A binding (GPIO pin or accessory address) is never shared by two
//!   entities of the same kind.
//! - GPIO bindings may not use a restricted pin or a pin claimed by another
//!   GPIO kind (see [`PinPolicy`]).
//! - A rejected create/update leaves the collection untouched.
//! - Active state is always resolved on create, update and load.
//!
//! # Example
//!
//! ```rust
//! use rs_cmdstation::entity::{EntityManager, Output, OutputConfig, OutputFlags, PinPolicy};
//! use rs_cmdstation::hal::MockHardware;
//!
//! let mut hw = MockHardware::new().hardware();
//! let mut outputs: EntityManager<Output> = EntityManager::new();
//!
//! let config = OutputConfig::new(16, OutputFlags::from_bits(0));
//! outputs.create_or_update(1, config, &PinPolicy::none(), &mut hw).unwrap();
//!
//! assert_eq!(outputs.set(1, true, &mut hw).as_deref(), Some("<Y 1 0>"));
//! assert_eq!(outputs.status_lines(), "<Y 1 16 0 1>");
//! ```

pub mod flags;
pub mod output;
pub mod sensor;
pub mod turnout;

pub use flags::{OutputFlags, RestorePolicy};
pub use output::{Output, OutputConfig};
pub use sensor::{Sensor, SensorConfig};
pub use turnout::{Turnout, TurnoutConfig, TurnoutType};

use core::fmt::Debug;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::persistence::{self, EntityDocument, EntityRecord, PersistenceError};
use crate::station::Hardware;
use crate::traits::{ConfigStore, StoreError};

/// Why a create/update was rejected.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EntityError {
    /// The pin is reserved for a system function.
    #[error("pin {0} is restricted")]
    RestrictedPin(u16),
    /// The pin or address already belongs to another entity.
    #[error("{pin} is already used by {owner}")]
    PinInUse {
        /// The contested pin or address.
        pin: u16,
        /// Owning entity, e.g. `sensor 3`.
        owner: String,
    },
    /// The configuration values are out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// No id above the highest existing one is left to assign.
    #[error("no free {0} id")]
    IdsExhausted(&'static str),
}

/// A pin held by some entity.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PinClaim {
    /// The claimed pin.
    pub pin: u16,
    /// Kind of the owning entity.
    pub kind: &'static str,
    /// Id of the owning entity.
    pub id: u16,
}

/// Pins a GPIO entity may not bind to.
///
/// Built fresh for each mutation from the configured restricted pins and
/// the claims of every other GPIO kind.
#[derive(Clone, Debug, Default)]
pub struct PinPolicy {
    restricted: Vec<u16>,
    claims: Vec<PinClaim>,
}

impl PinPolicy {
    /// A policy that allows every pin.
    pub fn none() -> Self {
        Self::default()
    }

    /// A policy rejecting the given system pins.
    pub fn restricted(pins: &[u16]) -> Self {
        Self {
            restricted: pins.to_vec(),
            claims: Vec::new(),
        }
    }

    /// Adds the pins held by another manager's entities.
    pub fn with_claims_of<E: Entity>(mut self, manager: &EntityManager<E>) -> Self {
        self.claims.extend(manager.claims());
        self
    }

    /// Checks that `pin` is free under this policy.
    pub fn check(&self, pin: u16) -> Result<(), EntityError> {
        if self.restricted.contains(&pin) {
            return Err(EntityError::RestrictedPin(pin));
        }
        match self.claims.iter().find(|claim| claim.pin == pin) {
            Some(claim) => Err(EntityError::PinInUse {
                pin,
                owner: format!("{} {}", claim.kind, claim.id),
            }),
            None => Ok(()),
        }
    }
}

/// JSON view of an entity for the web API.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityView {
    /// Entity id.
    pub id: u16,
    /// GPIO pin or accessory address.
    pub pin: u16,
    /// Raw flag byte.
    pub flags: u8,
    /// Human-readable flag summary.
    pub description: String,
    /// Current active state.
    pub active: bool,
    /// Turnout type, when applicable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtype: Option<u8>,
}

/// One kind of layout entity.
pub trait Entity: Sized + Debug {
    /// Singular name used in logs and conflict messages.
    const KIND: &'static str;

    /// Store resource name for the kind's document.
    const RESOURCE: &'static str;

    /// True if the binding is a GPIO pin subject to [`PinPolicy`].
    const GPIO: bool;

    /// Values accepted by create/update.
    type Config: Copy + Debug;

    /// Entity id.
    fn id(&self) -> u16;

    /// Bound pin or accessory address.
    fn binding(&self) -> u16;

    /// Current active state.
    fn is_active(&self) -> bool;

    /// Binding a configuration would claim.
    fn config_binding(config: &Self::Config) -> u16;

    /// Rejects out-of-range configuration before anything is touched.
    fn validate(_config: &Self::Config) -> Result<(), EntityError> {
        Ok(())
    }

    /// Builds a new entity and drives its hardware to the resolved state.
    fn create(id: u16, config: Self::Config, hw: &mut Hardware) -> Self;

    /// Reconfigures in place and re-resolves the active state.
    fn update(&mut self, config: Self::Config, hw: &mut Hardware);

    /// Rebuilds an entity from its persisted record.
    fn restore(record: &EntityRecord, hw: &mut Hardware) -> Result<Self, EntityError>;

    /// Snapshot for persistence.
    fn record(&self) -> EntityRecord;

    /// Drives the entity to `active`, returning the wire acknowledgement.
    fn set_active(&mut self, active: bool, hw: &mut Hardware) -> String;

    /// DCC++ list line for this entity.
    fn status_line(&self) -> String;

    /// Human-readable flag summary for the web API.
    fn describe(&self) -> String {
        String::new()
    }

    /// JSON view for the web API.
    fn view(&self) -> EntityView {
        let record = self.record();
        EntityView {
            id: record.id,
            pin: record.pin,
            flags: record.flags,
            description: self.describe(),
            active: self.is_active(),
            subtype: record.subtype,
        }
    }
}

/// Owns the collection of one entity kind.
#[derive(Debug)]
pub struct EntityManager<E: Entity> {
    entities: Vec<E>,
}

impl<E: Entity> Default for EntityManager<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Entity> EntityManager<E> {
    /// Creates an empty manager.
    pub fn new() -> Self {
        Self {
            entities: Vec::new(),
        }
    }

    /// Replaces the collection with the persisted one.
    ///
    /// A missing or unreadable document leaves the collection empty. Records
    /// that fail to restore or repeat an id are skipped. Returns the number
    /// of entities loaded.
    pub fn init(&mut self, store: &dyn ConfigStore, hw: &mut Hardware) -> usize {
        self.entities.clear();

        let document = match persistence::load_document(store, E::RESOURCE) {
            Ok(document) => document,
            Err(PersistenceError::Store(StoreError::NotFound(_))) => {
                log::info!("[{}] No stored {}", E::KIND, E::RESOURCE);
                return 0;
            }
            Err(err) => {
                log::warn!("[{}] Failed to load {}: {}", E::KIND, E::RESOURCE, err);
                return 0;
            }
        };

        for record in &document.entities {
            if self.position(record.id).is_some() {
                log::warn!("[{}] Skipping duplicate id {}", E::KIND, record.id);
                continue;
            }
            if let Some(owner) = self.owner_of(record.pin, record.id) {
                log::warn!(
                    "[{}] Skipping {} {}: {} already bound to {} {}",
                    E::KIND,
                    E::KIND,
                    record.id,
                    record.pin,
                    E::KIND,
                    owner.id()
                );
                continue;
            }
            match E::restore(record, hw) {
                Ok(entity) => self.entities.push(entity),
                Err(err) => log::warn!("[{}] Skipping {}: {}", E::KIND, record.id, err),
            }
        }

        log::info!("[{}] Loaded {} {}", E::KIND, self.entities.len(), E::RESOURCE);
        self.entities.len()
    }

    /// Writes the full collection, returning the number of entities stored.
    pub fn store(&self, store: &mut dyn ConfigStore) -> Result<u16, PersistenceError> {
        let document = EntityDocument::new(self.records())?;
        let count = persistence::store_document(store, E::RESOURCE, &document)?;
        log::debug!("[{}] Stored {} {}", E::KIND, count, E::RESOURCE);
        Ok(count)
    }

    /// Drops every entity without touching the store.
    pub fn clear(&mut self) {
        self.entities.clear();
    }

    /// Creates the entity or reconfigures the existing one with this id.
    ///
    /// Nothing changes when the configuration is rejected.
    pub fn create_or_update(
        &mut self,
        id: u16,
        config: E::Config,
        policy: &PinPolicy,
        hw: &mut Hardware,
    ) -> Result<(), EntityError> {
        E::validate(&config)?;

        let binding = E::config_binding(&config);
        if E::GPIO {
            policy.check(binding)?;
        }
        if let Some(owner) = self.owner_of(binding, id) {
            return Err(EntityError::PinInUse {
                pin: binding,
                owner: format!("{} {}", E::KIND, owner.id()),
            });
        }

        match self.position(id) {
            Some(index) => {
                self.entities[index].update(config, hw);
                log::debug!("[{}] {} updated: {:?}", E::KIND, id, config);
            }
            None => {
                self.entities.push(E::create(id, config, hw));
                log::debug!("[{}] {} created: {:?}", E::KIND, id, config);
            }
        }
        Ok(())
    }

    /// Removes the entity with this id. Returns false if it does not exist.
    pub fn remove(&mut self, id: u16) -> bool {
        match self.position(id) {
            Some(index) => {
                self.entities.remove(index);
                log::info!("[{}] Removed {}", E::KIND, id);
                true
            }
            None => false,
        }
    }

    /// Drives an entity, returning its acknowledgement or `None` if unknown.
    pub fn set(&mut self, id: u16, active: bool, hw: &mut Hardware) -> Option<String> {
        let index = self.position(id)?;
        Some(self.entities[index].set_active(active, hw))
    }

    /// Flips an entity's state. Returns false if it does not exist.
    pub fn toggle(&mut self, id: u16, hw: &mut Hardware) -> bool {
        match self.position(id) {
            Some(index) => {
                let entity = &mut self.entities[index];
                let active = !entity.is_active();
                entity.set_active(active, hw);
                true
            }
            None => false,
        }
    }

    /// Looks up an entity by id.
    pub fn get(&self, id: u16) -> Option<&E> {
        self.entities.iter().find(|entity| entity.id() == id)
    }

    /// Looks up an entity by id for in-place changes.
    pub fn get_mut(&mut self, id: u16) -> Option<&mut E> {
        self.entities.iter_mut().find(|entity| entity.id() == id)
    }

    /// Looks up an entity by its pin or address.
    pub fn find_by_binding(&self, binding: u16) -> Option<&E> {
        self.entities.iter().find(|entity| entity.binding() == binding)
    }

    /// Entities in enumeration order.
    pub fn iter(&self) -> impl Iterator<Item = &E> {
        self.entities.iter()
    }

    /// Entities in enumeration order, mutably.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut E> {
        self.entities.iter_mut()
    }

    /// Number of entities.
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Returns true if there are no entities.
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Smallest id above every existing id, or `None` once `u16::MAX` is taken.
    pub fn next_id(&self) -> Option<u16> {
        match self.entities.iter().map(Entity::id).max() {
            Some(max) => max.checked_add(1),
            None => Some(1),
        }
    }

    /// Concatenated DCC++ list lines. Empty when there are no entities.
    pub fn status_lines(&self) -> String {
        self.entities.iter().map(Entity::status_line).collect()
    }

    /// Snapshot records in enumeration order.
    pub fn records(&self) -> Vec<EntityRecord> {
        self.entities.iter().map(Entity::record).collect()
    }

    /// JSON views in enumeration order.
    pub fn views(&self) -> Vec<EntityView> {
        self.entities.iter().map(Entity::view).collect()
    }

    /// Bindings held by this manager's entities.
    pub fn claims(&self) -> impl Iterator<Item = PinClaim> + '_ {
        self.entities.iter().map(|entity| PinClaim {
            pin: entity.binding(),
            kind: E::KIND,
            id: entity.id(),
        })
    }

    fn position(&self, id: u16) -> Option<usize> {
        self.entities.iter().position(|entity| entity.id() == id)
    }

    /// Another entity (not `id`) already bound to `binding`.
    fn owner_of(&self, binding: u16, id: u16) -> Option<&E> {
        self.entities
            .iter()
            .find(|entity| entity.binding() == binding && entity.id() != id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::{MemoryStore, MockHardware};

    fn output(pin: u16, flags: u8) -> OutputConfig {
        OutputConfig::new(pin, OutputFlags::from_bits(flags))
    }

    // ========================================================================
    // Create / update
    // ========================================================================

    #[test]
    fn create_then_get_converges_on_last_call() {
        let mut hw = MockHardware::new().hardware();
        let mut outputs: EntityManager<Output> = EntityManager::new();
        let policy = PinPolicy::none();

        outputs.create_or_update(5, output(12, 0), &policy, &mut hw).unwrap();
        outputs.create_or_update(5, output(13, 7), &policy, &mut hw).unwrap();
        outputs.create_or_update(5, output(14, 1), &policy, &mut hw).unwrap();

        let entity = outputs.get(5).unwrap();
        assert_eq!(entity.pin(), 14);
        assert_eq!(entity.flags().bits(), 1);
        assert_eq!(outputs.len(), 1);
    }

    #[test]
    fn restricted_pin_rejected_without_mutation() {
        let mut hw = MockHardware::new().hardware();
        let mut outputs: EntityManager<Output> = EntityManager::new();
        let policy = PinPolicy::restricted(&[6, 7]);

        assert_eq!(
            outputs.create_or_update(1, output(6, 0), &policy, &mut hw),
            Err(EntityError::RestrictedPin(6))
        );
        assert!(outputs.is_empty());

        outputs.create_or_update(1, output(12, 0), &policy, &mut hw).unwrap();
        assert_eq!(
            outputs.create_or_update(1, output(7, 0), &policy, &mut hw),
            Err(EntityError::RestrictedPin(7))
        );
        assert_eq!(outputs.get(1).unwrap().pin(), 12);
    }

    #[test]
    fn same_kind_pin_conflict() {
        let mut hw = MockHardware::new().hardware();
        let mut outputs: EntityManager<Output> = EntityManager::new();
        let policy = PinPolicy::none();

        outputs.create_or_update(1, output(12, 0), &policy, &mut hw).unwrap();
        let err = outputs.create_or_update(2, output(12, 0), &policy, &mut hw).unwrap_err();
        assert_eq!(
            err,
            EntityError::PinInUse {
                pin: 12,
                owner: "output 1".to_string()
            }
        );
        assert_eq!(outputs.len(), 1);

        // Re-binding the owner to its own pin is fine
        outputs.create_or_update(1, output(12, 2), &policy, &mut hw).unwrap();
    }

    #[test]
    fn foreign_claims_block_pin() {
        let mut hw = MockHardware::new().hardware();
        let mut sensors: EntityManager<Sensor> = EntityManager::new();
        sensors
            .create_or_update(3, SensorConfig::new(21, true), &PinPolicy::none(), &mut hw)
            .unwrap();

        let mut outputs: EntityManager<Output> = EntityManager::new();
        let policy = PinPolicy::none().with_claims_of(&sensors);
        let err = outputs.create_or_update(1, output(21, 0), &policy, &mut hw).unwrap_err();
        assert!(matches!(err, EntityError::PinInUse { pin: 21, ref owner } if owner == "sensor 3"));
    }

    // ========================================================================
    // Remove / set / toggle
    // ========================================================================

    #[test]
    fn remove_twice_fails_second_time() {
        let mut hw = MockHardware::new().hardware();
        let mut outputs: EntityManager<Output> = EntityManager::new();
        outputs
            .create_or_update(1, output(12, 0), &PinPolicy::none(), &mut hw)
            .unwrap();

        assert!(outputs.remove(1));
        assert!(outputs.get(1).is_none());
        assert!(!outputs.remove(1));
    }

    #[test]
    fn set_unknown_is_none() {
        let mut hw = MockHardware::new().hardware();
        let mut outputs: EntityManager<Output> = EntityManager::new();
        assert!(outputs.set(9, true, &mut hw).is_none());
        assert!(!outputs.toggle(9, &mut hw));
    }

    #[test]
    fn toggle_flips_state() {
        let mut hw = MockHardware::new().hardware();
        let mut outputs: EntityManager<Output> = EntityManager::new();
        outputs
            .create_or_update(1, output(12, 0), &PinPolicy::none(), &mut hw)
            .unwrap();

        assert!(outputs.toggle(1, &mut hw));
        assert!(outputs.get(1).unwrap().is_active());
        assert!(outputs.toggle(1, &mut hw));
        assert!(!outputs.get(1).unwrap().is_active());
    }

    #[test]
    fn next_id_is_max_plus_one() {
        let mut hw = MockHardware::new().hardware();
        let mut turnouts: EntityManager<Turnout> = EntityManager::new();
        assert_eq!(turnouts.next_id(), Some(1));

        let policy = PinPolicy::none();
        turnouts
            .create_or_update(7, TurnoutConfig::new(10, TurnoutType::Left), &policy, &mut hw)
            .unwrap();
        turnouts
            .create_or_update(2, TurnoutConfig::new(11, TurnoutType::Left), &policy, &mut hw)
            .unwrap();
        assert_eq!(turnouts.next_id(), Some(8));
    }

    #[test]
    fn next_id_is_none_when_max_id_is_taken() {
        let mut hw = MockHardware::new().hardware();
        let mut turnouts: EntityManager<Turnout> = EntityManager::new();
        let config = TurnoutConfig::new(1, TurnoutType::Left);
        turnouts
            .create_or_update(u16::MAX, config, &PinPolicy::none(), &mut hw)
            .unwrap();

        assert_eq!(turnouts.next_id(), None);
        assert_eq!(turnouts.len(), 1);
    }

    // ========================================================================
    // Persistence
    // ========================================================================

    #[test]
    fn store_then_init_restores_per_policy() {
        let mock = MockHardware::new();
        let mut hw = mock.hardware();
        let mut store = MemoryStore::new();
        let policy = PinPolicy::none();

        let mut outputs: EntityManager<Output> = EntityManager::new();
        outputs.create_or_update(1, output(12, 0b000), &policy, &mut hw).unwrap();
        outputs.create_or_update(2, output(13, 0b110), &policy, &mut hw).unwrap();
        outputs.create_or_update(3, output(14, 0b010), &policy, &mut hw).unwrap();

        outputs.set(1, true, &mut hw);
        outputs.set(2, false, &mut hw);
        outputs.set(3, true, &mut hw);
        assert_eq!(outputs.store(&mut store).unwrap(), 3);

        let mut reloaded: EntityManager<Output> = EntityManager::new();
        assert_eq!(reloaded.init(&store, &mut hw), 3);

        assert!(reloaded.get(1).unwrap().is_active());
        assert!(reloaded.get(2).unwrap().is_active());
        assert!(!reloaded.get(3).unwrap().is_active());
        for (before, after) in outputs.iter().zip(reloaded.iter()) {
            assert_eq!(before.id(), after.id());
            assert_eq!(before.pin(), after.pin());
            assert_eq!(before.flags(), after.flags());
        }
    }

    #[test]
    fn init_with_missing_document_is_empty() {
        let mut hw = MockHardware::new().hardware();
        let store = MemoryStore::new();
        let mut outputs: EntityManager<Output> = EntityManager::new();
        assert_eq!(outputs.init(&store, &mut hw), 0);
        assert!(outputs.is_empty());
    }

    #[test]
    fn init_with_corrupt_document_is_empty() {
        let mut hw = MockHardware::new().hardware();
        let mut store = MemoryStore::new();
        store.insert("outputs", b"{ nope".to_vec());
        let mut outputs: EntityManager<Output> = EntityManager::new();
        assert_eq!(outputs.init(&store, &mut hw), 0);
    }

    #[test]
    fn init_skips_duplicate_ids() {
        let mut hw = MockHardware::new().hardware();
        let mut store = MemoryStore::new();
        store.insert(
            "outputs",
            br#"{"count":2,"entities":[{"id":1,"pin":12,"flags":0,"state":true},{"id":1,"pin":13,"flags":0,"state":false}]}"#.to_vec(),
        );
        let mut outputs: EntityManager<Output> = EntityManager::new();
        assert_eq!(outputs.init(&store, &mut hw), 1);
        assert_eq!(outputs.get(1).unwrap().pin(), 12);
    }

    #[test]
    fn clear_does_not_touch_store() {
        let mut hw = MockHardware::new().hardware();
        let mut store = MemoryStore::new();
        let mut outputs: EntityManager<Output> = EntityManager::new();
        outputs
            .create_or_update(1, output(12, 0), &PinPolicy::none(), &mut hw)
            .unwrap();
        outputs.store(&mut store).unwrap();

        outputs.clear();
        assert!(outputs.is_empty());
        assert_eq!(outputs.init(&store, &mut hw), 1);
    }

    #[test]
    fn empty_list_is_empty_string() {
        let outputs: EntityManager<Output> = EntityManager::new();
        assert_eq!(outputs.status_lines(), "");
    }
}
