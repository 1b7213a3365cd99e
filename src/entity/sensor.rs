//! GPIO occupancy sensors polled by the scheduler.
//!
//! A sensor's active state mirrors its input pin. It is never restored from
//! the store: every sensor starts inactive and the poll task reports the
//! first real reading as a transition.

use crate::persistence::EntityRecord;
use crate::station::Hardware;

use super::{Entity, EntityError, EntityManager};

/// Flag bit marking the internal pull-up as enabled.
pub const SENSOR_FLAG_PULL_UP: u8 = 1 << 0;

/// Pin and pull-up setting for creating or reconfiguring a sensor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SensorConfig {
    /// GPIO input pin.
    pub pin: u16,
    /// Enable the internal pull-up.
    pub pull_up: bool,
}

impl SensorConfig {
    /// Creates a sensor configuration.
    pub const fn new(pin: u16, pull_up: bool) -> Self {
        Self { pin, pull_up }
    }
}

/// A GPIO input reporting block occupancy.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Sensor {
    id: u16,
    pin: u16,
    pull_up: bool,
    active: bool,
}

impl Sensor {
    /// Bound input pin.
    pub fn pin(&self) -> u16 {
        self.pin
    }

    /// Returns true if the internal pull-up is enabled.
    pub fn pull_up(&self) -> bool {
        self.pull_up
    }
}

impl Entity for Sensor {
    const KIND: &'static str = "sensor";
    const RESOURCE: &'static str = "sensors";
    const GPIO: bool = true;

    type Config = SensorConfig;

    fn id(&self) -> u16 {
        self.id
    }

    fn binding(&self) -> u16 {
        self.pin
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn config_binding(config: &SensorConfig) -> u16 {
        config.pin
    }

    fn create(id: u16, config: SensorConfig, hw: &mut Hardware) -> Self {
        hw.pins.configure_input(config.pin, config.pull_up);
        Self {
            id,
            pin: config.pin,
            pull_up: config.pull_up,
            active: false,
        }
    }

    fn update(&mut self, config: SensorConfig, hw: &mut Hardware) {
        self.pin = config.pin;
        self.pull_up = config.pull_up;
        self.active = false;
        hw.pins.configure_input(self.pin, self.pull_up);
    }

    fn restore(record: &EntityRecord, hw: &mut Hardware) -> Result<Self, EntityError> {
        let config = SensorConfig::new(record.pin, record.flags & SENSOR_FLAG_PULL_UP != 0);
        Ok(Self::create(record.id, config, hw))
    }

    fn record(&self) -> EntityRecord {
        EntityRecord {
            id: self.id,
            pin: self.pin,
            flags: if self.pull_up { SENSOR_FLAG_PULL_UP } else { 0 },
            state: self.active,
            subtype: None,
        }
    }

    /// Records a new reading. Only a change produces a `<Q id>` or `<q id>`
    /// notification.
    fn set_active(&mut self, active: bool, _hw: &mut Hardware) -> String {
        if self.active == active {
            return String::new();
        }
        self.active = active;
        log::info!(
            "[Sensor] Sensor({}) {}",
            self.id,
            if active { "ACTIVE" } else { "INACTIVE" }
        );
        format!("<{} {}>", if active { 'Q' } else { 'q' }, self.id)
    }

    fn status_line(&self) -> String {
        format!("<Q {} {} {}>", self.id, self.pin, u8::from(self.pull_up))
    }

    fn describe(&self) -> String {
        if self.pull_up { "pullUp" } else { "floating" }.to_string()
    }
}

impl EntityManager<Sensor> {
    /// Reads every sensor input, returning a notification per transition.
    pub fn poll(&mut self, hw: &mut Hardware) -> Vec<String> {
        let mut events = Vec::new();
        for sensor in self.iter_mut() {
            let reading = hw.pins.read(sensor.pin);
            let event = sensor.set_active(reading, hw);
            if !event.is_empty() {
                events.push(event);
            }
        }
        events
    }
}
