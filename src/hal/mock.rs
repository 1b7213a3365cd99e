//! Mock implementations for testing without hardware.
//!
//! This module provides test doubles for every collaborator trait, enabling
//! development and testing on desktop without a command station board.
//!
//! Mocks that get boxed into a [`Hardware`] bundle or a task share their
//! state through an `Arc`, so a test can keep a clone and inspect or drive
//! the mock after handing it over.
//!
//! # Available Mocks
//!
//! | Mock | Trait | Purpose |
//! |------|-------|---------|
//! | [`MockPins`] | [`PinDriver`] | Records pin modes and levels, fakes inputs |
//! | [`MockTrackSignal`] | [`TrackSignal`] | Tracks power, accessory packets, CVs |
//! | [`MockSystemInfo`] | [`SystemInfo`] | Fixed free heap |
//! | [`MockPixelBus`] | [`PixelBus`] | Captures latched LED colors |
//! | [`MockSerial`] | [`SerialPort`] | Queued input, captured output |
//! | [`MockClock`] | [`Clock`] | Controllable time source |
//! | [`MemoryStore`] | [`ConfigStore`] | In-memory documents |
//!
//! # Example
//!
//! ```rust
//! use rs_cmdstation::hal::MockHardware;
//! use rs_cmdstation::{CommandStation, StationConfig};
//!
//! let mock = MockHardware::new();
//! let mut station = CommandStation::with_hardware(StationConfig::default(), mock.hardware());
//!
//! assert_eq!(station.dispatch("Z 1 16 0"), "<O>");
//! station.dispatch("Z 1 1");
//!
//! // Verify via the shared mock
//! assert!(mock.pins.level(16));
//! ```
//!
//! [`PinDriver`]: crate::traits::PinDriver
//! [`TrackSignal`]: crate::traits::TrackSignal
//! [`SystemInfo`]: crate::traits::SystemInfo
//! [`PixelBus`]: crate::traits::PixelBus
//! [`SerialPort`]: crate::traits::SerialPort
//! [`Clock`]: crate::traits::Clock
//! [`ConfigStore`]: crate::traits::ConfigStore

use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::station::Hardware;
use crate::traits::{
    Clock, ConfigStore, PinDriver, PixelBus, Rgb, SerialPort, StoreError, SystemInfo, TrackSignal,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ============================================================================
// Hardware Mocks
// ============================================================================

#[derive(Debug, Default)]
struct PinState {
    outputs: BTreeMap<u16, bool>,
    inputs: BTreeMap<u16, bool>,
    input_levels: BTreeMap<u16, bool>,
    writes: usize,
}

/// Mock GPIO driver.
///
/// Records output levels and input modes. Input levels are set by the test
/// with [`set_input`](Self::set_input).
///
/// # Example
///
/// ```rust
/// use rs_cmdstation::hal::MockPins;
/// use rs_cmdstation::traits::PinDriver;
///
/// let mut pins = MockPins::new();
/// pins.configure_input(21, true);
/// pins.set_input(21, true);
///
/// assert!(pins.read(21));
/// assert_eq!(pins.input_pull_up(21), Some(true));
/// ```
#[derive(Clone, Debug, Default)]
pub struct MockPins {
    state: Arc<Mutex<PinState>>,
}

impl MockPins {
    /// Creates a mock with no pins configured.
    pub fn new() -> Self {
        Self::default()
    }

    /// Last level written to a pin (false if never written).
    pub fn level(&self, pin: u16) -> bool {
        lock(&self.state).outputs.get(&pin).copied().unwrap_or(false)
    }

    /// Returns true if the pin was configured as an output.
    pub fn is_output(&self, pin: u16) -> bool {
        lock(&self.state).outputs.contains_key(&pin)
    }

    /// Pull-up setting of an input pin, if configured as input.
    pub fn input_pull_up(&self, pin: u16) -> Option<bool> {
        lock(&self.state).inputs.get(&pin).copied()
    }

    /// Sets the level an input pin will read.
    pub fn set_input(&self, pin: u16, level: bool) {
        lock(&self.state).input_levels.insert(pin, level);
    }

    /// Number of `write` calls.
    pub fn write_count(&self) -> usize {
        lock(&self.state).writes
    }
}

impl PinDriver for MockPins {
    fn configure_output(&mut self, pin: u16) {
        let mut state = lock(&self.state);
        state.inputs.remove(&pin);
        state.outputs.entry(pin).or_insert(false);
    }

    fn configure_input(&mut self, pin: u16, pull_up: bool) {
        let mut state = lock(&self.state);
        state.outputs.remove(&pin);
        state.inputs.insert(pin, pull_up);
    }

    fn write(&mut self, pin: u16, high: bool) {
        let mut state = lock(&self.state);
        state.outputs.insert(pin, high);
        state.writes += 1;
    }

    fn read(&self, pin: u16) -> bool {
        lock(&self.state).input_levels.get(&pin).copied().unwrap_or(false)
    }
}

/// A CV write sent on the main track.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OpsCvWrite {
    /// Locomotive address.
    pub address: u16,
    /// CV number.
    pub cv: u16,
    /// Bit number for bit writes.
    pub bit: Option<u8>,
    /// Byte value, or 0/1 for bit writes.
    pub value: u8,
}

#[derive(Debug, Default)]
struct TrackState {
    ops_enabled: bool,
    current_ma: u32,
    accessories: Vec<(u16, bool)>,
    estops: usize,
    cvs: BTreeMap<u16, u8>,
    programming_fails: bool,
    ops_writes: Vec<OpsCvWrite>,
}

/// Mock track signal driver.
///
/// Keeps a CV table standing in for the decoder on the programming track.
///
/// # Example
///
/// ```rust
/// use rs_cmdstation::hal::MockTrackSignal;
/// use rs_cmdstation::traits::TrackSignal;
///
/// let mut track = MockTrackSignal::new();
/// track.set_cv(1, 3);
/// assert_eq!(track.read_cv(1), Some(3));
///
/// track.fail_programming(true);
/// assert_eq!(track.read_cv(1), None);
/// ```
#[derive(Clone, Debug, Default)]
pub struct MockTrackSignal {
    state: Arc<Mutex<TrackState>>,
}

impl MockTrackSignal {
    /// Creates a powered-off mock with an empty CV table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the reported OPS current.
    pub fn set_current_ma(&self, current_ma: u32) {
        lock(&self.state).current_ma = current_ma;
    }

    /// Accessory packets sent so far as `(address, thrown)`.
    pub fn accessory_packets(&self) -> Vec<(u16, bool)> {
        lock(&self.state).accessories.clone()
    }

    /// Number of emergency stop broadcasts.
    pub fn estop_count(&self) -> usize {
        lock(&self.state).estops
    }

    /// Seeds a CV on the simulated programming-track decoder.
    pub fn set_cv(&self, cv: u16, value: u8) {
        lock(&self.state).cvs.insert(cv, value);
    }

    /// Current value of a simulated CV.
    pub fn cv(&self, cv: u16) -> Option<u8> {
        lock(&self.state).cvs.get(&cv).copied()
    }

    /// Makes every programming-track operation fail.
    pub fn fail_programming(&self, fail: bool) {
        lock(&self.state).programming_fails = fail;
    }

    /// CV writes sent on the main track.
    pub fn ops_writes(&self) -> Vec<OpsCvWrite> {
        lock(&self.state).ops_writes.clone()
    }
}

impl TrackSignal for MockTrackSignal {
    fn set_ops_output(&mut self, enabled: bool) {
        lock(&self.state).ops_enabled = enabled;
    }

    fn ops_enabled(&self) -> bool {
        lock(&self.state).ops_enabled
    }

    fn ops_current_ma(&self) -> u32 {
        lock(&self.state).current_ma
    }

    fn send_accessory(&mut self, address: u16, thrown: bool) {
        lock(&self.state).accessories.push((address, thrown));
    }

    fn emergency_stop(&mut self) {
        lock(&self.state).estops += 1;
    }

    fn read_cv(&mut self, cv: u16) -> Option<u8> {
        let state = lock(&self.state);
        if state.programming_fails {
            return None;
        }
        state.cvs.get(&cv).copied()
    }

    fn write_cv_byte(&mut self, cv: u16, value: u8) -> bool {
        let mut state = lock(&self.state);
        if state.programming_fails {
            return false;
        }
        state.cvs.insert(cv, value);
        true
    }

    fn write_cv_bit(&mut self, cv: u16, bit: u8, value: bool) -> bool {
        let mut state = lock(&self.state);
        if state.programming_fails || bit > 7 {
            return false;
        }
        let entry = state.cvs.entry(cv).or_insert(0);
        if value {
            *entry |= 1 << bit;
        } else {
            *entry &= !(1 << bit);
        }
        true
    }

    fn write_ops_cv_byte(&mut self, address: u16, cv: u16, value: u8) {
        lock(&self.state).ops_writes.push(OpsCvWrite {
            address,
            cv,
            bit: None,
            value,
        });
    }

    fn write_ops_cv_bit(&mut self, address: u16, cv: u16, bit: u8, value: bool) {
        lock(&self.state).ops_writes.push(OpsCvWrite {
            address,
            cv,
            bit: Some(bit),
            value: u8::from(value),
        });
    }
}

/// Mock platform info with a fixed free heap.
#[derive(Clone, Copy, Debug)]
pub struct MockSystemInfo {
    /// Reported free heap in bytes.
    pub free_heap: u32,
}

impl MockSystemInfo {
    /// Creates a mock reporting 180 kB free.
    pub fn new() -> Self {
        Self { free_heap: 180_000 }
    }

    /// Creates a mock reporting the given free heap.
    pub fn with_free_heap(mut self, bytes: u32) -> Self {
        self.free_heap = bytes;
        self
    }
}

impl Default for MockSystemInfo {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemInfo for MockSystemInfo {
    fn free_heap_bytes(&self) -> u32 {
        self.free_heap
    }
}

/// Handles to a full set of hardware mocks.
///
/// [`hardware`](Self::hardware) boxes clones into a [`Hardware`] bundle;
/// the handles kept here observe everything the station does.
#[derive(Clone, Debug, Default)]
pub struct MockHardware {
    /// GPIO mock.
    pub pins: MockPins,
    /// Track driver mock.
    pub track: MockTrackSignal,
    /// Platform info mock.
    pub system: MockSystemInfo,
}

impl MockHardware {
    /// Creates fresh mocks.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a hardware bundle sharing state with these handles.
    pub fn hardware(&self) -> Hardware {
        Hardware::new(
            Box::new(self.pins.clone()),
            Box::new(self.track.clone()),
            Box::new(self.system),
        )
    }
}

// ============================================================================
// Peripheral Mocks
// ============================================================================

#[derive(Debug, Default)]
struct PixelState {
    buffered: Vec<Rgb>,
    latched: Vec<Rgb>,
    shows: usize,
}

/// Mock LED strip.
///
/// # Example
///
/// ```rust
/// use rs_cmdstation::hal::MockPixelBus;
/// use rs_cmdstation::traits::{PixelBus, Rgb};
///
/// let mut bus = MockPixelBus::new(3);
/// bus.set_pixel(1, Rgb::GREEN);
/// assert_eq!(bus.latched(1), Rgb::OFF);
///
/// bus.show();
/// assert_eq!(bus.latched(1), Rgb::GREEN);
/// ```
#[derive(Clone, Debug)]
pub struct MockPixelBus {
    state: Arc<Mutex<PixelState>>,
}

impl MockPixelBus {
    /// Creates a strip of `len` dark pixels.
    pub fn new(len: usize) -> Self {
        Self {
            state: Arc::new(Mutex::new(PixelState {
                buffered: vec![Rgb::OFF; len],
                latched: vec![Rgb::OFF; len],
                shows: 0,
            })),
        }
    }

    /// Color last latched by `show` (off if out of range).
    pub fn latched(&self, index: usize) -> Rgb {
        lock(&self.state).latched.get(index).copied().unwrap_or(Rgb::OFF)
    }

    /// Number of `show` calls.
    pub fn show_count(&self) -> usize {
        lock(&self.state).shows
    }
}

impl PixelBus for MockPixelBus {
    fn len(&self) -> usize {
        lock(&self.state).buffered.len()
    }

    fn set_pixel(&mut self, index: usize, color: Rgb) {
        if let Some(pixel) = lock(&self.state).buffered.get_mut(index) {
            *pixel = color;
        }
    }

    fn pixel(&self, index: usize) -> Rgb {
        lock(&self.state).buffered.get(index).copied().unwrap_or(Rgb::OFF)
    }

    fn show(&mut self) {
        let mut state = lock(&self.state);
        state.latched = state.buffered.clone();
        state.shows += 1;
    }
}

#[derive(Debug, Default)]
struct SerialState {
    rx: VecDeque<u8>,
    tx: Vec<u8>,
}

/// Mock serial port.
///
/// # Example
///
/// ```rust
/// use rs_cmdstation::hal::MockSerial;
/// use rs_cmdstation::traits::SerialPort;
///
/// let mut serial = MockSerial::new();
/// serial.queue_input(b"<s>");
///
/// let mut buf = [0u8; 8];
/// assert_eq!(serial.read(&mut buf), 3);
/// assert_eq!(serial.read(&mut buf), 0);
/// ```
#[derive(Clone, Debug, Default)]
pub struct MockSerial {
    state: Arc<Mutex<SerialState>>,
}

impl MockSerial {
    /// Creates an idle port.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues bytes for the station to read.
    pub fn queue_input(&self, bytes: &[u8]) {
        lock(&self.state).rx.extend(bytes.iter().copied());
    }

    /// Bytes queued but not yet read.
    pub fn pending_input(&self) -> usize {
        lock(&self.state).rx.len()
    }

    /// Drains everything the station wrote, as text.
    pub fn take_output(&self) -> String {
        let bytes = std::mem::take(&mut lock(&self.state).tx);
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

impl SerialPort for MockSerial {
    fn read(&mut self, buf: &mut [u8]) -> usize {
        let mut state = lock(&self.state);
        let count = buf.len().min(state.rx.len());
        for (slot, byte) in buf.iter_mut().zip(state.rx.drain(..count)) {
            *slot = byte;
        }
        count
    }

    fn write(&mut self, bytes: &[u8]) {
        lock(&self.state).tx.extend_from_slice(bytes);
    }
}

/// Mock clock for testing.
///
/// Provides a controllable time source for testing time-dependent behavior.
///
/// # Example
///
/// ```rust
/// use rs_cmdstation::hal::MockClock;
/// use rs_cmdstation::traits::Clock;
///
/// let mut clock = MockClock::new();
/// assert_eq!(clock.now_ms(), 0);
///
/// clock.set(1000);
/// assert_eq!(clock.now_ms(), 1000);
///
/// clock.advance(500);
/// assert_eq!(clock.now_ms(), 1500);
/// ```
#[derive(Debug, Default)]
pub struct MockClock {
    current_ms: u64,
}

impl MockClock {
    /// Creates a new mock clock starting at 0ms.
    pub fn new() -> Self {
        Self { current_ms: 0 }
    }

    /// Sets the current time in milliseconds.
    pub fn set(&mut self, ms: u64) {
        self.current_ms = ms;
    }

    /// Advances the clock by the given duration.
    pub fn advance(&mut self, ms: u64) {
        self.current_ms += ms;
    }
}

impl Clock for MockClock {
    fn now_ms(&self) -> u64 {
        self.current_ms
    }
}

// ============================================================================
// Storage Mock
// ============================================================================

#[derive(Debug, Default)]
struct StoreState {
    documents: BTreeMap<String, Vec<u8>>,
    fail_writes: bool,
}

/// In-memory document store.
///
/// Clones share the same documents, so a test can "restart" a station by
/// building a new one over a clone of the old store.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<StoreState>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Places raw bytes under `name`.
    pub fn insert(&self, name: &str, bytes: Vec<u8>) {
        lock(&self.state).documents.insert(name.to_string(), bytes);
    }

    /// Raw bytes stored under `name`.
    pub fn get(&self, name: &str) -> Option<Vec<u8>> {
        lock(&self.state).documents.get(name).cloned()
    }

    /// Makes every `store` call fail.
    pub fn fail_writes(&self, fail: bool) {
        lock(&self.state).fail_writes = fail;
    }
}

impl ConfigStore for MemoryStore {
    fn load(&self, name: &str) -> Result<Vec<u8>, StoreError> {
        self.get(name)
            .ok_or_else(|| StoreError::NotFound(name.to_string()))
    }

    fn store(&mut self, name: &str, bytes: &[u8]) -> Result<(), StoreError> {
        let mut state = lock(&self.state);
        if state.fail_writes {
            return Err(StoreError::Backend(format!("write to `{name}` refused")));
        }
        state.documents.insert(name.to_string(), bytes.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pins_share_state_between_clones() {
        let pins = MockPins::new();
        let mut boxed: Box<dyn PinDriver> = Box::new(pins.clone());
        boxed.configure_output(4);
        boxed.write(4, true);
        assert!(pins.level(4));
        assert_eq!(pins.write_count(), 1);
    }

    #[test]
    fn reconfiguring_switches_direction() {
        let mut pins = MockPins::new();
        pins.configure_output(4);
        pins.configure_input(4, false);
        assert!(!pins.is_output(4));
        assert_eq!(pins.input_pull_up(4), Some(false));
    }

    #[test]
    fn cv_bit_write() {
        let mut track = MockTrackSignal::new();
        track.set_cv(29, 0b0000_0010);
        assert!(track.write_cv_bit(29, 5, true));
        assert_eq!(track.cv(29), Some(0b0010_0010));
        assert!(!track.write_cv_bit(29, 8, true));
    }

    #[test]
    fn serial_reads_in_chunks() {
        let mut serial = MockSerial::new();
        serial.queue_input(b"abcdef");
        let mut buf = [0u8; 4];
        assert_eq!(serial.read(&mut buf), 4);
        assert_eq!(&buf, b"abcd");
        assert_eq!(serial.read(&mut buf), 2);
        assert_eq!(&buf[..2], b"ef");
    }

    #[test]
    fn store_failure_is_backend_error() {
        let mut store = MemoryStore::new();
        store.fail_writes(true);
        assert!(matches!(
            store.store("outputs", b"{}"),
            Err(StoreError::Backend(_))
        ));
        assert!(matches!(store.load("outputs"), Err(StoreError::NotFound(_))));
    }
}
