//! Turnouts addressed through DCC accessory decoders.
//!
//! DCC++ clients address turnouts either by linear accessory address or by
//! decoder board and output index:
//!
//! ```text
//! address = (board - 1) * 4 + index + 1        board >= 1, index 0..=3
//! board   = (address + 3) / 4
//! index   = address + 3 - board * 4
//! ```

use core::fmt;

use crate::persistence::EntityRecord;
use crate::station::Hardware;

use super::{Entity, EntityError};

/// Highest valid accessory address.
pub const MAX_ACCESSORY_ADDRESS: u16 = 2044;

/// Outputs per accessory decoder board.
pub const OUTPUTS_PER_BOARD: u16 = 4;

/// Converts board and index to a linear accessory address.
pub fn address_from_board(board: u16, index: u16) -> Result<u16, EntityError> {
    if board == 0 || index >= OUTPUTS_PER_BOARD {
        return Err(EntityError::InvalidConfig(format!(
            "board {board} index {index}"
        )));
    }
    let address = u32::from(board - 1) * u32::from(OUTPUTS_PER_BOARD) + u32::from(index) + 1;
    match u16::try_from(address) {
        Ok(address) if address <= MAX_ACCESSORY_ADDRESS => Ok(address),
        _ => Err(EntityError::InvalidConfig(format!(
            "board {board} index {index} is beyond address {MAX_ACCESSORY_ADDRESS}"
        ))),
    }
}

/// Splits a linear accessory address into board and index.
pub const fn board_from_address(address: u16) -> (u16, u16) {
    let board = (address + 3) / OUTPUTS_PER_BOARD;
    let index = address + 3 - board * OUTPUTS_PER_BOARD;
    (board, index)
}

/// Physical turnout geometry, reported to clients as the subtype.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TurnoutType {
    /// Left-hand.
    #[default]
    Left = 0,
    /// Right-hand.
    Right = 1,
    /// Wye.
    Wye = 2,
    /// Multi-way.
    Multi = 3,
}

impl TryFrom<u8> for TurnoutType {
    type Error = EntityError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(TurnoutType::Left),
            1 => Ok(TurnoutType::Right),
            2 => Ok(TurnoutType::Wye),
            3 => Ok(TurnoutType::Multi),
            other => Err(EntityError::InvalidConfig(format!("turnout type {other}"))),
        }
    }
}

impl fmt::Display for TurnoutType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TurnoutType::Left => "LEFT",
            TurnoutType::Right => "RIGHT",
            TurnoutType::Wye => "WYE",
            TurnoutType::Multi => "MULTI",
        })
    }
}

/// Address and geometry for creating or reconfiguring a turnout.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TurnoutConfig {
    /// Linear accessory address.
    pub address: u16,
    /// Geometry.
    pub kind: TurnoutType,
}

impl TurnoutConfig {
    /// Creates a turnout configuration.
    pub const fn new(address: u16, kind: TurnoutType) -> Self {
        Self { address, kind }
    }
}

/// A turnout thrown or closed through its accessory decoder.
///
/// Thrown state survives reconfiguration and restarts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Turnout {
    id: u16,
    address: u16,
    kind: TurnoutType,
    thrown: bool,
}

impl Turnout {
    /// Linear accessory address.
    pub fn address(&self) -> u16 {
        self.address
    }

    /// Turnout geometry.
    pub fn kind(&self) -> TurnoutType {
        self.kind
    }

    /// Changes the geometry only.
    pub fn set_kind(&mut self, kind: TurnoutType) {
        self.kind = kind;
    }

    /// Returns true if thrown.
    pub fn is_thrown(&self) -> bool {
        self.thrown
    }
}

impl Entity for Turnout {
    const KIND: &'static str = "turnout";
    const RESOURCE: &'static str = "turnouts";
    const GPIO: bool = false;

    type Config = TurnoutConfig;

    fn id(&self) -> u16 {
        self.id
    }

    fn binding(&self) -> u16 {
        self.address
    }

    fn is_active(&self) -> bool {
        self.thrown
    }

    fn config_binding(config: &TurnoutConfig) -> u16 {
        config.address
    }

    fn validate(config: &TurnoutConfig) -> Result<(), EntityError> {
        if config.address == 0 || config.address > MAX_ACCESSORY_ADDRESS {
            return Err(EntityError::InvalidConfig(format!(
                "accessory address {}",
                config.address
            )));
        }
        Ok(())
    }

    fn create(id: u16, config: TurnoutConfig, _hw: &mut Hardware) -> Self {
        Self {
            id,
            address: config.address,
            kind: config.kind,
            thrown: false,
        }
    }

    fn update(&mut self, config: TurnoutConfig, _hw: &mut Hardware) {
        self.address = config.address;
        self.kind = config.kind;
    }

    fn restore(record: &EntityRecord, _hw: &mut Hardware) -> Result<Self, EntityError> {
        let config = TurnoutConfig::new(
            record.pin,
            TurnoutType::try_from(record.subtype.unwrap_or_default())?,
        );
        Self::validate(&config)?;
        Ok(Self {
            id: record.id,
            address: config.address,
            kind: config.kind,
            thrown: record.state,
        })
    }

    fn record(&self) -> EntityRecord {
        EntityRecord {
            id: self.id,
            pin: self.address,
            flags: 0,
            state: self.thrown,
            subtype: Some(self.kind as u8),
        }
    }

    fn set_active(&mut self, thrown: bool, hw: &mut Hardware) -> String {
        self.thrown = thrown;
        hw.track.send_accessory(self.address, thrown);
        log::info!(
            "[Turnout] Turnout({}) {}",
            self.id,
            if thrown { "thrown" } else { "closed" }
        );
        format!("<H {} {}>", self.id, u8::from(thrown))
    }

    fn status_line(&self) -> String {
        let (board, index) = board_from_address(self.address);
        format!(
            "<H {} {} {} {}>",
            self.id,
            board,
            index,
            u8::from(self.thrown)
        )
    }

    fn describe(&self) -> String {
        self.kind.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::MockHardware;

    #[test]
    fn board_index_round_trip_over_all_addresses() {
        for address in 1..=MAX_ACCESSORY_ADDRESS {
            let (board, index) = board_from_address(address);
            assert!(board >= 1);
            assert!(index < OUTPUTS_PER_BOARD);
            assert_eq!(address_from_board(board, index), Ok(address));
        }
    }

    #[test]
    fn known_addresses() {
        assert_eq!(address_from_board(1, 0), Ok(1));
        assert_eq!(address_from_board(1, 3), Ok(4));
        assert_eq!(address_from_board(2, 0), Ok(5));
        assert_eq!(board_from_address(5), (2, 0));
    }

    #[test]
    fn invalid_board_or_index() {
        assert!(address_from_board(0, 0).is_err());
        assert!(address_from_board(1, 4).is_err());
        assert!(address_from_board(512, 0).is_err());
        assert!(address_from_board(u16::MAX, 3).is_err());
    }

    #[test]
    fn address_range_is_validated() {
        assert!(Turnout::validate(&TurnoutConfig::new(0, TurnoutType::Left)).is_err());
        assert!(Turnout::validate(&TurnoutConfig::new(2045, TurnoutType::Left)).is_err());
        assert!(Turnout::validate(&TurnoutConfig::new(2044, TurnoutType::Left)).is_ok());
    }

    #[test]
    fn throw_sends_accessory_packet() {
        let mock = MockHardware::new();
        let mut hw = mock.hardware();
        let mut turnout = Turnout::create(3, TurnoutConfig::new(6, TurnoutType::Wye), &mut hw);

        assert_eq!(turnout.set_active(true, &mut hw), "<H 3 1>");
        assert_eq!(mock.track.accessory_packets(), vec![(6, true)]);
        assert_eq!(turnout.status_line(), "<H 3 2 1 1>");
    }

    #[test]
    fn update_keeps_thrown_state() {
        let mock = MockHardware::new();
        let mut hw = mock.hardware();
        let mut turnout = Turnout::create(1, TurnoutConfig::new(1, TurnoutType::Left), &mut hw);
        turnout.set_active(true, &mut hw);
        turnout.update(TurnoutConfig::new(2, TurnoutType::Right), &mut hw);
        assert!(turnout.is_thrown());
        assert_eq!(turnout.address(), 2);
    }

    #[test]
    fn record_carries_subtype() {
        let mock = MockHardware::new();
        let mut hw = mock.hardware();
        let turnout = Turnout::create(1, TurnoutConfig::new(9, TurnoutType::Multi), &mut hw);
        let record = turnout.record();
        assert_eq!(record.subtype, Some(3));

        let restored = Turnout::restore(&record, &mut hw).unwrap();
        assert_eq!(restored, turnout);
    }

    #[test]
    fn restore_rejects_unknown_type() {
        let mock = MockHardware::new();
        let mut hw = mock.hardware();
        let record = EntityRecord {
            id: 1,
            pin: 9,
            flags: 0,
            state: false,
            subtype: Some(9),
        };
        assert!(Turnout::restore(&record, &mut hw).is_err());
    }
}
