//! Station configuration.
//!
//! Uses `heapless` strings and vectors so the same structures can be baked
//! into firmware, while remaining ergonomic on desktop. Every section has a
//! `Default` and `with_*` builders.
//!
//! # Example
//!
//! ```rust
//! use rs_cmdstation::config::{FeatureConfig, NetConfig, StationConfig};
//!
//! // Use defaults
//! let config = StationConfig::default();
//!
//! // Or customize
//! let config = StationConfig::default()
//!     .with_features(FeatureConfig::default().with_sensors(false))
//!     .with_net(NetConfig::default().with_port(2561));
//! ```

use heapless::String as HString;
use heapless::Vec as HVec;
use serde::{Deserialize, Serialize};

/// Maximum length for short config strings (names, hostnames)
pub const MAX_SHORT_STRING: usize = 64;

/// Maximum length for longer config strings (paths)
pub const MAX_LONG_STRING: usize = 128;

/// Maximum number of restricted pins
pub const MAX_RESTRICTED_PINS: usize = 32;

/// Type alias for short config strings
pub type ShortString = HString<MAX_SHORT_STRING>;

/// Type alias for longer config strings
pub type LongString = HString<MAX_LONG_STRING>;

/// Pins reserved by the ESP32 itself: UART0 (1, 3) and the SPI flash (6-11).
pub const DEFAULT_RESTRICTED_PINS: [u16; 8] = [1, 3, 6, 7, 8, 9, 10, 11];

// ============================================================================
// Helper for creating heapless strings
// ============================================================================

fn truncated<const N: usize>(s: &str) -> HString<N> {
    let mut hs = HString::new();
    // Walk chars so truncation never splits a UTF-8 sequence
    for c in s.chars() {
        if hs.push(c).is_err() {
            break;
        }
    }
    hs
}

/// Create a ShortString from a &str, truncating if too long
pub fn short_string(s: &str) -> ShortString {
    truncated(s)
}

/// Create a LongString from a &str, truncating if too long
pub fn long_string(s: &str) -> LongString {
    truncated(s)
}

// ============================================================================
// Main Config
// ============================================================================

/// Complete station configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StationConfig {
    /// Optional subsystems
    pub features: FeatureConfig,
    /// Scheduler task intervals
    pub timing: TimingConfig,
    /// Pin eligibility rules
    pub pins: PinConfig,
    /// DCC++ TCP listener
    pub net: NetConfig,
    /// JSON API server
    pub web: WebConfig,
    /// Persistence location
    pub storage: StorageConfig,
    /// Device identification
    pub device: DeviceConfig,
}

impl StationConfig {
    /// Set feature configuration
    pub fn with_features(mut self, features: FeatureConfig) -> Self {
        self.features = features;
        self
    }

    /// Set timing configuration
    pub fn with_timing(mut self, timing: TimingConfig) -> Self {
        self.timing = timing;
        self
    }

    /// Set pin configuration
    pub fn with_pins(mut self, pins: PinConfig) -> Self {
        self.pins = pins;
        self
    }

    /// Set TCP configuration
    pub fn with_net(mut self, net: NetConfig) -> Self {
        self.net = net;
        self
    }

    /// Set web configuration
    pub fn with_web(mut self, web: WebConfig) -> Self {
        self.web = web;
        self
    }

    /// Set storage configuration
    pub fn with_storage(mut self, storage: StorageConfig) -> Self {
        self.storage = storage;
        self
    }

    /// Set device configuration
    pub fn with_device(mut self, device: DeviceConfig) -> Self {
        self.device = device;
        self
    }
}

// ============================================================================
// Feature Config
// ============================================================================

/// Optional subsystems. These are read once at startup; tasks for disabled
/// features exit on their first step.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FeatureConfig {
    /// GPIO outputs (`Z` commands, outputs in status)
    pub outputs: bool,
    /// GPIO sensors (`S` commands, sensor polling)
    pub sensors: bool,
    /// Status LED strip
    pub status_led: bool,
    /// HC-12 auxiliary radio link
    pub radio: bool,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            outputs: true,
            sensors: true,
            status_led: true,
            radio: false,
        }
    }
}

impl FeatureConfig {
    /// Enable or disable outputs
    pub fn with_outputs(mut self, enabled: bool) -> Self {
        self.outputs = enabled;
        self
    }

    /// Enable or disable sensors
    pub fn with_sensors(mut self, enabled: bool) -> Self {
        self.sensors = enabled;
        self
    }

    /// Enable or disable the status LEDs
    pub fn with_status_led(mut self, enabled: bool) -> Self {
        self.status_led = enabled;
        self
    }

    /// Enable or disable the radio link
    pub fn with_radio(mut self, enabled: bool) -> Self {
        self.radio = enabled;
        self
    }
}

// ============================================================================
// Timing Config
// ============================================================================

/// Scheduler task intervals in milliseconds
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TimingConfig {
    /// Status LED refresh (and blink half-period)
    pub status_led_interval_ms: u32,
    /// Radio link poll/flush interval
    pub radio_interval_ms: u32,
    /// Track power check interval; power requests apply at this cadence
    pub power_check_interval_ms: u32,
    /// Sensor input poll interval
    pub sensor_poll_interval_ms: u32,
    /// Autosave interval for dirty entities (0 = disabled)
    pub autosave_interval_ms: u32,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            status_led_interval_ms: 450,
            radio_interval_ms: 250,
            power_check_interval_ms: 250,
            sensor_poll_interval_ms: 50,
            autosave_interval_ms: 0,
        }
    }
}

impl TimingConfig {
    /// Set the status LED interval
    pub fn with_status_led_interval_ms(mut self, ms: u32) -> Self {
        self.status_led_interval_ms = ms;
        self
    }

    /// Set the radio interval
    pub fn with_radio_interval_ms(mut self, ms: u32) -> Self {
        self.radio_interval_ms = ms;
        self
    }

    /// Set the power check interval
    pub fn with_power_check_interval_ms(mut self, ms: u32) -> Self {
        self.power_check_interval_ms = ms;
        self
    }

    /// Set the sensor poll interval
    pub fn with_sensor_poll_interval_ms(mut self, ms: u32) -> Self {
        self.sensor_poll_interval_ms = ms;
        self
    }

    /// Set the autosave interval (0 disables autosave)
    pub fn with_autosave_interval_ms(mut self, ms: u32) -> Self {
        self.autosave_interval_ms = ms;
        self
    }
}

// ============================================================================
// Pin Config
// ============================================================================

/// Pin eligibility rules shared by all GPIO entity kinds
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PinConfig {
    /// Pins bound to system functions that entities may never claim
    pub restricted: HVec<u16, MAX_RESTRICTED_PINS>,
}

impl Default for PinConfig {
    fn default() -> Self {
        let mut restricted = HVec::new();
        for pin in DEFAULT_RESTRICTED_PINS {
            let _ = restricted.push(pin);
        }
        Self { restricted }
    }
}

impl PinConfig {
    /// Start from an empty restricted list
    pub fn none() -> Self {
        Self {
            restricted: HVec::new(),
        }
    }

    /// Add a restricted pin (ignored once the list is full)
    pub fn with_restricted(mut self, pin: u16) -> Self {
        if !self.restricted.contains(&pin) {
            let _ = self.restricted.push(pin);
        }
        self
    }

    /// Check whether a pin is reserved for a system function
    pub fn is_restricted(&self, pin: u16) -> bool {
        self.restricted.contains(&pin)
    }
}

// ============================================================================
// Net / Web Config
// ============================================================================

/// DCC++ TCP listener configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NetConfig {
    /// Port to listen on (JMRI default is 2560)
    pub port: u16,
    /// Whether the listener is enabled
    pub enabled: bool,
}

impl Default for NetConfig {
    fn default() -> Self {
        Self {
            port: 2560,
            enabled: true,
        }
    }
}

impl NetConfig {
    /// Set the port
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Enable or disable the listener
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

/// JSON API server configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WebConfig {
    /// Port to listen on
    pub port: u16,
    /// Whether to enable CORS for all origins
    pub cors_permissive: bool,
    /// Whether web server is enabled
    pub enabled: bool,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            cors_permissive: true,
            enabled: true,
        }
    }
}

impl WebConfig {
    /// Set the port
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set CORS mode
    pub fn with_cors(mut self, permissive: bool) -> Self {
        self.cors_permissive = permissive;
        self
    }

    /// Enable or disable web server
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

// ============================================================================
// Storage / Device Config
// ============================================================================

/// Persistence location
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding one JSON document per entity kind
    pub path: LongString,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: long_string("cs-data"),
        }
    }
}

impl StorageConfig {
    /// Set the storage directory
    pub fn with_path(mut self, path: &str) -> Self {
        self.path = long_string(path);
        self
    }
}

/// Device identification configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Name reported in the `<iDCC++ ...>` status banner
    pub name: ShortString,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            name: short_string("rs-cmdstation"),
        }
    }
}

impl DeviceConfig {
    /// Set the device name
    pub fn with_name(mut self, name: &str) -> Self {
        self.name = short_string(name);
        self
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = StationConfig::default();
        assert_eq!(config.net.port, 2560);
        assert_eq!(config.web.port, 8080);
        assert!(config.features.outputs);
        assert!(config.features.sensors);
        assert!(!config.features.radio);
        assert_eq!(config.timing.autosave_interval_ms, 0);
    }

    #[test]
    fn default_restricted_pins() {
        let pins = PinConfig::default();
        for pin in DEFAULT_RESTRICTED_PINS {
            assert!(pins.is_restricted(pin));
        }
        assert!(!pins.is_restricted(16));
    }

    #[test]
    fn restricted_pin_builder_deduplicates() {
        let pins = PinConfig::none().with_restricted(4).with_restricted(4);
        assert_eq!(pins.restricted.len(), 1);
        assert!(pins.is_restricted(4));
    }

    #[test]
    fn short_string_truncation() {
        let long_input = "a".repeat(100);
        let s = short_string(&long_input);
        assert_eq!(s.len(), MAX_SHORT_STRING);
    }

    #[test]
    fn long_string_truncation() {
        let long_input = "b".repeat(200);
        let s = long_string(&long_input);
        assert_eq!(s.len(), MAX_LONG_STRING);
    }

    #[test]
    fn string_helpers_utf8_boundary() {
        // Each character is 3 bytes, so 64 bytes cannot hold a whole number of them
        let input = "\u{2603}".repeat(30);
        let s = short_string(&input);
        assert_eq!(s.len(), 63);
        assert!(core::str::from_utf8(s.as_bytes()).is_ok());
    }

    #[test]
    fn builder_pattern() {
        let config = StationConfig::default()
            .with_features(FeatureConfig::default().with_radio(true).with_outputs(false))
            .with_timing(TimingConfig::default().with_autosave_interval_ms(5000))
            .with_net(NetConfig::default().with_port(2561))
            .with_web(WebConfig::default().with_port(3000).with_cors(false))
            .with_storage(StorageConfig::default().with_path("/spiffs"))
            .with_device(DeviceConfig::default().with_name("Club Layout"));

        assert!(config.features.radio);
        assert!(!config.features.outputs);
        assert_eq!(config.timing.autosave_interval_ms, 5000);
        assert_eq!(config.net.port, 2561);
        assert_eq!(config.web.port, 3000);
        assert!(!config.web.cors_permissive);
        assert_eq!(config.storage.path.as_str(), "/spiffs");
        assert_eq!(config.device.name.as_str(), "Club Layout");
    }

    #[test]
    fn config_serializes_to_json() {
        let config = StationConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let back: StationConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.net.port, config.net.port);
        assert_eq!(back.pins.restricted, config.pins.restricted);
    }
}
