//! Hardware abstraction traits for GPIO pins, the track signal driver and time.
//!
//! This module defines the narrow interfaces the command station consumes from
//! hardware it does not own. Entity managers drive pins through [`PinDriver`],
//! turnouts and locomotives reach the rails through [`TrackSignal`], and the
//! scheduler reads time from a [`Clock`].
//!
//! # Key Traits
//!
//! | Trait | Purpose |
//! |-------|---------|
//! | [`PinDriver`] | GPIO configuration, level writes and reads |
//! | [`TrackSignal`] | Track power, accessory packets, CV programming |
//! | [`SystemInfo`] | Free heap reporting for the `<F>` command |
//! | [`Clock`] | Monotonic millisecond time source |
//!
//! # Implementation
//!
//! For testing and desktop development, use the mock implementations
//! from [`crate::hal::mock`].
//!
//! # Example
//!
//! ```rust
//! use rs_cmdstation::traits::PinDriver;
//! use rs_cmdstation::hal::MockPins;
//!
//! let mut pins = MockPins::new();
//! pins.configure_output(16);
//! pins.write(16, true);
//! assert!(pins.level(16));
//! ```

/// GPIO pin driver.
///
/// Pin writes are synchronous and fire-and-forget: a pin that cannot be
/// driven is a wiring problem, not something the protocol can report.
///
/// # Example Implementation
///
/// ```rust,ignore
/// use rs_cmdstation::traits::PinDriver;
///
/// struct BoardPins { /* register handles */ }
///
/// impl PinDriver for BoardPins {
///     fn configure_output(&mut self, pin: u16) { /* set direction register */ }
///     fn configure_input(&mut self, pin: u16, pull_up: bool) { /* ... */ }
///     fn write(&mut self, pin: u16, high: bool) { /* set/clear output bit */ }
///     fn read(&self, pin: u16) -> bool { false }
/// }
/// ```
pub trait PinDriver: Send {
    /// Configures a pin as a push-pull output.
    fn configure_output(&mut self, pin: u16);

    /// Configures a pin as an input, optionally enabling the internal pull-up.
    fn configure_input(&mut self, pin: u16, pull_up: bool);

    /// Drives an output pin high or low.
    fn write(&mut self, pin: u16, high: bool);

    /// Reads the current level of an input pin.
    fn read(&self, pin: u16) -> bool;
}

/// Track signal driver: the DCC packet generator and its power stage.
///
/// The driver owns the OPS (main) and PROG (programming) outputs. The
/// command station only requests changes; packet timing is the driver's job.
pub trait TrackSignal: Send {
    /// Enables or disables the OPS track output.
    fn set_ops_output(&mut self, enabled: bool);

    /// Returns true if the OPS track output is currently energized.
    fn ops_enabled(&self) -> bool;

    /// Current draw on the OPS track in milliamps.
    fn ops_current_ma(&self) -> u32;

    /// Sends an accessory decoder packet for the given DCC address.
    fn send_accessory(&mut self, address: u16, thrown: bool);

    /// Broadcasts an emergency stop to every decoder.
    fn emergency_stop(&mut self);

    /// Reads a CV on the programming track.
    ///
    /// Returns `None` when the decoder did not acknowledge.
    fn read_cv(&mut self, cv: u16) -> Option<u8>;

    /// Writes and verifies a CV byte on the programming track.
    fn write_cv_byte(&mut self, cv: u16, value: u8) -> bool;

    /// Writes and verifies a single CV bit on the programming track.
    fn write_cv_bit(&mut self, cv: u16, bit: u8, value: bool) -> bool;

    /// Sends an unverified CV byte write on the main track (programming on main).
    fn write_ops_cv_byte(&mut self, address: u16, cv: u16, value: u8);

    /// Sends an unverified CV bit write on the main track.
    fn write_ops_cv_bit(&mut self, address: u16, cv: u16, bit: u8, value: bool);
}

/// Platform information used by diagnostic commands.
pub trait SystemInfo: Send {
    /// Free heap in bytes.
    fn free_heap_bytes(&self) -> u32;
}

/// Time source trait.
///
/// Provides monotonic time in milliseconds for the cooperative scheduler.
/// On desktop, this can wrap `std::time::Instant`. On embedded, use a
/// hardware timer.
///
/// # Example
///
/// ```rust
/// use rs_cmdstation::traits::Clock;
/// use rs_cmdstation::hal::MockClock;
///
/// let mut clock = MockClock::new();
/// assert_eq!(clock.now_ms(), 0);
///
/// clock.advance(100);
/// assert_eq!(clock.now_ms(), 100);
/// ```
pub trait Clock {
    /// Returns current time in milliseconds since an arbitrary epoch.
    ///
    /// Must be monotonically increasing.
    fn now_ms(&self) -> u64;
}
