//! GPIO outputs driven by the `Z` command.

use crate::persistence::EntityRecord;
use crate::station::Hardware;

use super::{Entity, EntityError, OutputFlags};

/// Pin and flags for creating or reconfiguring an output.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OutputConfig {
    /// GPIO pin to drive.
    pub pin: u16,
    /// Polarity and restore policy.
    pub flags: OutputFlags,
}

impl OutputConfig {
    /// Creates an output configuration.
    pub const fn new(pin: u16, flags: OutputFlags) -> Self {
        Self { pin, flags }
    }
}

/// A GPIO pin the layout switches on and off (lights, signals, relays).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Output {
    id: u16,
    pin: u16,
    flags: OutputFlags,
    active: bool,
}

impl Output {
    /// Bound GPIO pin.
    pub fn pin(&self) -> u16 {
        self.pin
    }

    /// Flag byte.
    pub fn flags(&self) -> OutputFlags {
        self.flags
    }

    fn drive(&mut self, active: bool, hw: &mut Hardware) {
        self.active = active;
        hw.pins.write(self.pin, self.flags.level(active));
        log::info!(
            "[Output] Output({}) set to {}",
            self.id,
            if active { "On" } else { "Off" }
        );
    }
}

impl Entity for Output {
    const KIND: &'static str = "output";
    const RESOURCE: &'static str = "outputs";
    const GPIO: bool = true;

    type Config = OutputConfig;

    fn id(&self) -> u16 {
        self.id
    }

    fn binding(&self) -> u16 {
        self.pin
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn config_binding(config: &OutputConfig) -> u16 {
        config.pin
    }

    fn create(id: u16, config: OutputConfig, hw: &mut Hardware) -> Self {
        let mut output = Self {
            id,
            pin: config.pin,
            flags: config.flags,
            active: false,
        };
        hw.pins.configure_output(output.pin);
        output.drive(config.flags.restore_policy().on_create(), hw);
        output
    }

    fn update(&mut self, config: OutputConfig, hw: &mut Hardware) {
        self.pin = config.pin;
        self.flags = config.flags;
        hw.pins.configure_output(self.pin);
        self.drive(config.flags.restore_policy().on_create(), hw);
    }

    fn restore(record: &EntityRecord, hw: &mut Hardware) -> Result<Self, EntityError> {
        let flags = OutputFlags::from_bits(record.flags);
        let mut output = Self {
            id: record.id,
            pin: record.pin,
            flags,
            active: false,
        };
        hw.pins.configure_output(output.pin);
        output.drive(flags.restore_policy().on_load(record.state), hw);
        Ok(output)
    }

    fn record(&self) -> EntityRecord {
        EntityRecord {
            id: self.id,
            pin: self.pin,
            flags: self.flags.bits(),
            state: self.active,
            subtype: None,
        }
    }

    /// The acknowledgement carries the inverse of the new state, as DCC++
    /// clients expect.
    fn set_active(&mut self, active: bool, hw: &mut Hardware) -> String {
        self.drive(active, hw);
        format!("<Y {} {}>", self.id, u8::from(!self.active))
    }

    fn status_line(&self) -> String {
        format!(
            "<Y {} {} {} {}>",
            self.id,
            self.pin,
            self.flags.bits(),
            u8::from(self.active)
        )
    }

    fn describe(&self) -> String {
        self.flags.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::MockHardware;

    fn create(flags: u8) -> (MockHardware, Output) {
        let mock = MockHardware::new();
        let mut hw = mock.hardware();
        let output = Output::create(1, OutputConfig::new(16, OutputFlags::from_bits(flags)), &mut hw);
        (mock, output)
    }

    #[test]
    fn create_configures_and_drives_pin() {
        let (mock, output) = create(0);
        assert!(mock.pins.is_output(16));
        assert!(!output.is_active());
        assert!(!mock.pins.level(16));
    }

    #[test]
    fn inverted_output_idles_high() {
        let (mock, output) = create(OutputFlags::INVERTED);
        assert!(!output.is_active());
        assert!(mock.pins.level(16));
    }

    #[test]
    fn force_active_on_create() {
        let (mock, output) = create(0b110);
        assert!(output.is_active());
        assert!(mock.pins.level(16));
    }

    #[test]
    fn set_ack_is_inverted() {
        let (mock, mut output) = create(0);
        let mut hw = mock.hardware();
        assert_eq!(output.set_active(true, &mut hw), "<Y 1 0>");
        assert_eq!(output.set_active(false, &mut hw), "<Y 1 1>");
    }

    #[test]
    fn status_line_shows_actual_state() {
        let (mock, mut output) = create(4);
        let mut hw = mock.hardware();
        output.set_active(true, &mut hw);
        assert_eq!(output.status_line(), "<Y 1 16 4 1>");
    }

    #[test]
    fn update_moves_pin_and_resolves_state() {
        let (mock, mut output) = create(0);
        let mut hw = mock.hardware();
        output.set_active(true, &mut hw);

        output.update(OutputConfig::new(17, OutputFlags::from_bits(0)), &mut hw);
        assert_eq!(output.pin(), 17);
        assert!(!output.is_active());
        assert!(mock.pins.is_output(17));
    }

    #[test]
    fn restore_uses_persisted_state_only_when_not_forced() {
        let mock = MockHardware::new();
        let mut hw = mock.hardware();
        let record = EntityRecord {
            id: 4,
            pin: 18,
            flags: 0,
            state: true,
            subtype: None,
        };
        assert!(Output::restore(&record, &mut hw).unwrap().is_active());

        let forced_off = EntityRecord { flags: 0b010, ..record };
        assert!(!Output::restore(&forced_off, &mut hw).unwrap().is_active());
    }
}
