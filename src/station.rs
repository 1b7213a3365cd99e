//! The command station context.
//!
//! [`CommandStation`] is the single top-level object built at startup. It
//! owns the [`CommandRegistry`] and a [`StationContext`] holding everything
//! handlers and tasks act on: the entity managers, the locomotive roster,
//! track power, the hardware collaborators and the store. Nothing is global;
//! handlers receive `&mut StationContext`, scheduler tasks receive
//! `&mut CommandStation`.
//!
//! # Example
//!
//! ```rust
//! use rs_cmdstation::frame::FrameExtractor;
//! use rs_cmdstation::{CommandStation, StationConfig};
//!
//! let mut station = CommandStation::with_mocks(StationConfig::default());
//! let mut extractor: FrameExtractor = FrameExtractor::new();
//!
//! let response = station.feed(&mut extractor, b"<Z 5 12 4><Z 5 1><Z>");
//! assert_eq!(response, "<O><Y 5 0><Y 5 12 4 1>");
//! ```

use std::collections::VecDeque;
use std::fmt;
use std::net::Ipv4Addr;

use crate::config::StationConfig;
use crate::entity::{
    EntityError, EntityManager, Output, OutputConfig, PinPolicy, Sensor, SensorConfig, Turnout,
    TurnoutConfig,
};
use crate::frame::FrameExtractor;
use crate::hal::{MemoryStore, MockHardware};
use crate::locomotive::Roster;
use crate::persistence::PersistenceError;
use crate::power::TrackPower;
use crate::registry::CommandRegistry;
use crate::tasks::StatusLeds;
use crate::traits::{ConfigStore, PinDriver, SystemInfo, TrackSignal};

/// Notifications retained for slow consumers.
pub const NOTIFICATION_CAPACITY: usize = 64;

/// The hardware collaborators the station drives.
pub struct Hardware {
    /// GPIO pins for outputs and sensors.
    pub pins: Box<dyn PinDriver>,
    /// Track signal driver.
    pub track: Box<dyn TrackSignal>,
    /// Platform information.
    pub system: Box<dyn SystemInfo>,
}

impl Hardware {
    /// Bundles the collaborators.
    pub fn new(
        pins: Box<dyn PinDriver>,
        track: Box<dyn TrackSignal>,
        system: Box<dyn SystemInfo>,
    ) -> Self {
        Self {
            pins,
            track,
            system,
        }
    }
}

impl fmt::Debug for Hardware {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hardware")
            .field("ops_enabled", &self.track.ops_enabled())
            .finish_non_exhaustive()
    }
}

/// Unsolicited messages (sensor transitions) for every connected client.
///
/// Each consumer keeps its own cursor, so the radio link and every TCP
/// client see every message once. When a consumer falls more than
/// [`NOTIFICATION_CAPACITY`] messages behind, the oldest are lost to it.
#[derive(Debug, Default)]
pub struct NotificationLog {
    entries: VecDeque<String>,
    next_seq: u64,
}

impl NotificationLog {
    /// Creates an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a message.
    pub fn push(&mut self, message: String) {
        if self.entries.len() == NOTIFICATION_CAPACITY {
            self.entries.pop_front();
        }
        self.entries.push_back(message);
        self.next_seq += 1;
    }

    /// Cursor for a consumer that only wants future messages.
    pub fn cursor(&self) -> u64 {
        self.next_seq
    }

    /// Messages after `cursor`, advancing it.
    pub fn since(&self, cursor: &mut u64) -> Vec<String> {
        let first = self.next_seq - self.entries.len() as u64;
        if *cursor < first {
            log::debug!("[Notify] Consumer missed {} messages", first - *cursor);
            *cursor = first;
        }
        let skip = usize::try_from(*cursor - first).unwrap_or(usize::MAX);
        let messages = self.entries.iter().skip(skip).cloned().collect();
        *cursor = self.next_seq;
        messages
    }
}

/// Build stamp shown after the version in the status banner.
///
/// Packaging scripts set `CMDSTATION_BUILD` (e.g. `"2026-10-16 14:02"`) at
/// compile time; local builds report `dev`.
pub const BUILD_STAMP: &str = match option_env!("CMDSTATION_BUILD") {
    Some(stamp) => stamp,
    None => "dev",
};

/// Entity counts written by [`StationContext::store_all`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StoreCounts {
    /// Turnouts stored.
    pub turnouts: u16,
    /// Sensors stored.
    pub sensors: u16,
    /// Outputs stored.
    pub outputs: u16,
}

/// Everything a command handler can read or change.
pub struct StationContext {
    /// Station configuration.
    pub config: StationConfig,
    /// Hardware collaborators.
    pub hw: Hardware,
    /// Persistent document store.
    pub store: Box<dyn ConfigStore>,
    /// GPIO outputs.
    pub outputs: EntityManager<Output>,
    /// Accessory-decoder turnouts.
    pub turnouts: EntityManager<Turnout>,
    /// GPIO sensors.
    pub sensors: EntityManager<Sensor>,
    /// Locomotives under throttle control.
    pub roster: Roster,
    /// Deferred track power request.
    pub power: TrackPower,
    /// Status LED colors.
    pub leds: StatusLeds,
    /// Unsolicited messages for clients.
    pub notifications: NotificationLog,
    /// Address reported in the status dump.
    pub network_address: Option<Ipv4Addr>,
    dirty: bool,
}

impl StationContext {
    /// Creates a context with empty managers.
    pub fn new(config: StationConfig, hw: Hardware, store: Box<dyn ConfigStore>) -> Self {
        Self {
            config,
            hw,
            store,
            outputs: EntityManager::new(),
            turnouts: EntityManager::new(),
            sensors: EntityManager::new(),
            roster: Roster::new(),
            power: TrackPower::new(),
            leds: StatusLeds::new(),
            notifications: NotificationLog::new(),
            network_address: None,
            dirty: false,
        }
    }

    /// Creates a context over fresh mock hardware and an in-memory store.
    pub fn with_mocks(config: StationConfig) -> Self {
        Self::new(config, MockHardware::new().hardware(), Box::new(MemoryStore::new()))
    }

    /// Loads every enabled manager from the store.
    pub fn init(&mut self) {
        self.turnouts.init(self.store.as_ref(), &mut self.hw);
        if self.config.features.outputs {
            self.outputs.init(self.store.as_ref(), &mut self.hw);
        }
        if self.config.features.sensors {
            self.sensors.init(self.store.as_ref(), &mut self.hw);
        }
        self.dirty = false;
    }

    /// Pin policy for outputs: restricted pins plus sensor pins.
    pub fn output_policy(&self) -> PinPolicy {
        PinPolicy::restricted(&self.config.pins.restricted).with_claims_of(&self.sensors)
    }

    /// Pin policy for sensors: restricted pins plus output pins.
    pub fn sensor_policy(&self) -> PinPolicy {
        PinPolicy::restricted(&self.config.pins.restricted).with_claims_of(&self.outputs)
    }

    /// Creates or reconfigures an output.
    pub fn create_output(&mut self, id: u16, config: OutputConfig) -> Result<(), EntityError> {
        let policy = self.output_policy();
        self.outputs
            .create_or_update(id, config, &policy, &mut self.hw)?;
        self.mark_dirty();
        Ok(())
    }

    /// Creates or reconfigures a sensor.
    pub fn create_sensor(&mut self, id: u16, config: SensorConfig) -> Result<(), EntityError> {
        let policy = self.sensor_policy();
        self.sensors
            .create_or_update(id, config, &policy, &mut self.hw)?;
        self.mark_dirty();
        Ok(())
    }

    /// Creates or reconfigures a turnout.
    pub fn create_turnout(&mut self, id: u16, config: TurnoutConfig) -> Result<(), EntityError> {
        self.turnouts
            .create_or_update(id, config, &PinPolicy::none(), &mut self.hw)?;
        self.mark_dirty();
        Ok(())
    }

    /// Drives an output, returning its acknowledgement.
    pub fn set_output(&mut self, id: u16, active: bool) -> Option<String> {
        let ack = self.outputs.set(id, active, &mut self.hw)?;
        self.mark_dirty();
        Some(ack)
    }

    /// Throws or closes a turnout, returning its acknowledgement.
    pub fn set_turnout(&mut self, id: u16, thrown: bool) -> Option<String> {
        let ack = self.turnouts.set(id, thrown, &mut self.hw)?;
        self.mark_dirty();
        Some(ack)
    }

    /// Writes every enabled manager to the store.
    ///
    /// Disabled kinds report zero. The dirty flag clears only when every
    /// write succeeds.
    pub fn store_all(&mut self) -> Result<StoreCounts, PersistenceError> {
        let store = self.store.as_mut();
        let counts = StoreCounts {
            turnouts: self.turnouts.store(store)?,
            sensors: if self.config.features.sensors {
                self.sensors.store(store)?
            } else {
                0
            },
            outputs: if self.config.features.outputs {
                self.outputs.store(store)?
            } else {
                0
            },
        };
        self.dirty = false;
        Ok(counts)
    }

    /// Drops every entity from memory. The store is untouched.
    pub fn clear_all(&mut self) {
        self.turnouts.clear();
        self.sensors.clear();
        self.outputs.clear();
        self.mark_dirty();
    }

    /// Full `<s>` status dump.
    pub fn status(&self) -> String {
        let mut status = format!(
            "<iDCC++ {}: V-{} / {}>",
            self.config.device.name,
            env!("CARGO_PKG_VERSION"),
            BUILD_STAMP
        );
        status.push_str(&TrackPower::state_for_dccpp(self.hw.track.as_ref()));
        status.push_str(&self.roster.status_lines());
        status.push_str(&self.turnouts.status_lines());
        if self.config.features.outputs {
            status.push_str(&self.outputs.status_lines());
        }
        if let Some(address) = self.network_address {
            status.push_str(&format!("<N1: {address}>"));
        }
        status
    }

    /// Publishes an unsolicited message to every client.
    pub fn notify(&mut self, message: String) {
        self.notifications.push(message);
    }

    /// Records that entity state changed since the last store.
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Returns true if entity state changed since the last store.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }
}

impl fmt::Debug for StationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StationContext")
            .field("outputs", &self.outputs.len())
            .field("turnouts", &self.turnouts.len())
            .field("sensors", &self.sensors.len())
            .field("locomotives", &self.roster.len())
            .field("dirty", &self.dirty)
            .finish_non_exhaustive()
    }
}

/// The registry plus the context it dispatches into.
#[derive(Debug)]
pub struct CommandStation {
    /// Command handlers.
    pub registry: CommandRegistry,
    /// Layout state and collaborators.
    pub ctx: StationContext,
}

impl CommandStation {
    /// Builds a station with the full command set for `config`.
    pub fn new(config: StationConfig, hw: Hardware, store: Box<dyn ConfigStore>) -> Self {
        let registry = CommandRegistry::with_default_handlers(&config);
        Self {
            registry,
            ctx: StationContext::new(config, hw, store),
        }
    }

    /// Builds a station over the given hardware and an in-memory store.
    pub fn with_hardware(config: StationConfig, hw: Hardware) -> Self {
        Self::new(config, hw, Box::new(MemoryStore::new()))
    }

    /// Builds a station over fresh mocks.
    pub fn with_mocks(config: StationConfig) -> Self {
        Self::with_hardware(config, MockHardware::new().hardware())
    }

    /// Loads persisted entities.
    pub fn init(&mut self) {
        self.ctx.init();
    }

    /// Dispatches one frame interior.
    pub fn dispatch(&mut self, frame: &str) -> String {
        self.registry.dispatch(&mut self.ctx, frame)
    }

    /// Feeds raw bytes from one input stream, returning all responses.
    pub fn feed<const N: usize>(&mut self, extractor: &mut FrameExtractor<N>, bytes: &[u8]) -> String {
        let registry = &self.registry;
        let ctx = &mut self.ctx;
        extractor.feed(bytes, |frame| registry.dispatch(ctx, frame))
    }
}
