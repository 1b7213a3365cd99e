//! Trait definitions for hardware, peripherals and persistence.
//!
//! This module defines the collaborator interfaces that allow rs-cmdstation to:
//! - Run on different hardware (ESP32 boards, desktop mocks)
//! - Persist layout entities to any key/document store
//! - Drive status LEDs and an auxiliary radio link from the scheduler
//!
//! # Submodules
//!
//! - `hardware`: GPIO pins, track signal driver, system info, clock
//! - `peripherals`: Status LED pixel bus and serial port
//! - `storage`: Persistent document store

pub mod hardware;
pub mod peripherals;
pub mod storage;

pub use hardware::*;
pub use peripherals::*;
pub use storage::*;
