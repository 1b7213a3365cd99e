//! # rs-cmdstation
//!
//! The core of a DCC++ model railroad command station: frame extraction,
//! command dispatch, persistent layout entities and a cooperative scheduler.
//!
//! ## Features
//!
//! - **DCC++ protocol**: `<...>` frames from any byte stream, one extractor per client
//! - **Command registry**: One handler per command identifier, duplicates rejected
//! - **Layout entities**: Outputs, turnouts and sensors with pin rules and JSON persistence
//! - **Locomotives**: Speed, direction and function state for the throttle commands
//! - **Programming track**: CV read, write and bit write with callback echo
//! - **Scheduler**: Round-robin tasks for power, sensors, status LEDs, radio and autosave
//!
//! ## Architecture
//!
//! The crate is structured to allow testing on desktop without hardware:
//!
//! - `traits` - Hardware, peripheral and storage abstractions
//! - `frame` - Byte stream to frame extraction
//! - `registry` - Command identifiers to handlers
//! - `handlers` - The DCC++ command set
//! - `entity` - Outputs, turnouts, sensors and their manager
//! - `station` - The context every handler and task works on
//! - `scheduler` / `tasks` - Periodic work
//! - `hal` - Concrete implementations (mocks for testing, file store)
//! - `services` - DCC++ over TCP and the JSON API (feature-gated)
//!
//! ## Example
//!
//! ```rust
//! use rs_cmdstation::{CommandStation, FrameExtractor, StationConfig};
//!
//! let mut station = CommandStation::with_mocks(StationConfig::default());
//! station.init();
//!
//! // Frames may arrive split across reads
//! let mut extractor: FrameExtractor = FrameExtractor::new();
//! assert_eq!(station.feed(&mut extractor, b"<Z 1 16"), "");
//! assert_eq!(station.feed(&mut extractor, b" 0>"), "<O>");
//!
//! // Or dispatch a frame interior directly
//! assert_eq!(station.dispatch("Z 1 1"), "<Y 1 0>");
//! assert!(station.ctx.is_dirty());
//! ```

#![warn(missing_docs)]

/// Station configuration: features, timing, pins, network and storage.
pub mod config;
/// Outputs, turnouts and sensors plus the generic manager that owns them.
pub mod entity;
/// Extraction of `<...>` frames from raw bytes.
pub mod frame;
/// Hardware abstraction layer with mock implementations for testing.
pub mod hal;
/// The DCC++ command handlers.
pub mod handlers;
/// Locomotive state and the roster.
pub mod locomotive;
/// JSON documents for persisted entities.
pub mod persistence;
/// Deferred track power requests.
pub mod power;
/// Command identifier to handler lookup.
pub mod registry;
/// Cooperative round-robin task scheduler.
pub mod scheduler;
/// Station context and the command station itself.
pub mod station;
/// Periodic tasks run by the scheduler.
pub mod tasks;
/// Core traits for hardware, peripherals and storage.
pub mod traits;

/// Network services for DCC++ over TCP and the JSON API (feature-gated).
#[cfg(feature = "net")]
pub mod services;

// Re-exports for convenience
pub use config::{
    DeviceConfig, FeatureConfig, NetConfig, PinConfig, StationConfig, StorageConfig, TimingConfig,
    WebConfig,
};
pub use entity::{
    Entity, EntityError, EntityManager, EntityView, Output, OutputConfig, OutputFlags, PinPolicy,
    RestorePolicy, Sensor, SensorConfig, Turnout, TurnoutConfig, TurnoutType,
};
pub use frame::FrameExtractor;
pub use locomotive::{Locomotive, Roster};
pub use persistence::PersistenceError;
pub use power::TrackPower;
pub use registry::{CommandError, CommandHandler, CommandRegistry, RegistryError};
pub use scheduler::{Action, Scheduler, Task, TaskState};
pub use station::{CommandStation, Hardware, NotificationLog, StationContext, StoreCounts};
pub use traits::{
    Clock, ConfigStore, PinDriver, PixelBus, Rgb, SerialPort, StoreError, SystemInfo, TrackSignal,
};
