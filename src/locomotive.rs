//! Locomotive roster for throttle and function commands.
//!
//! Locomotives are created lazily the first time a client addresses them and
//! live only in memory. Speeds use the 128-step scale: `0` is stop and
//! `1..=127` are running steps. An emergency stop is a separate flag that the
//! next speed command clears.
//!
//! # Function Bytes
//!
//! The legacy `<f loco byte [byte2]>` command packs function groups into
//! bit patterns. [`Locomotive::apply_function_bytes`] decodes them exactly:
//!
//! | Form | Test | Functions |
//! |------|------|-----------|
//! | `byte` | `byte & 0xB0 == 0xB0` | F5-F8 from bits 0-3 |
//! | `byte` | `byte & 0xA0 == 0xA0` | F9-F12 from bits 0-3 |
//! | `byte` | otherwise | F0 from bit 4, F1-F4 from bits 0-3 |
//! | `byte byte2` | `byte & 0xDE == 0xDE` | F13-F20 from `byte2` |
//! | `byte byte2` | otherwise | F21-F28 from `byte2` |
//!
//! Note that `0xDF` also passes the F13-F20 test; clients send `222` and
//! `223`, and both select the lower group.

/// Highest function number.
pub const MAX_FUNCTION: u8 = 28;

/// Highest 128-step speed.
pub const MAX_SPEED: u8 = 127;

/// Short addresses stop below this value.
pub const LONG_ADDRESS_START: u16 = 128;

/// DCC addressing mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AddressMode {
    /// 7-bit address.
    Short,
    /// 14-bit address.
    Long,
}

impl AddressMode {
    /// Mode a plain address implies.
    pub const fn for_address(address: u16) -> Self {
        if address < LONG_ADDRESS_START {
            AddressMode::Short
        } else {
            AddressMode::Long
        }
    }
}

/// One locomotive under throttle control.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Locomotive {
    address: u16,
    mode: AddressMode,
    speed: u8,
    forward: bool,
    functions: u32,
    estop: bool,
}

impl Locomotive {
    /// Creates a stopped, forward-facing locomotive.
    pub fn new(address: u16, mode: AddressMode) -> Self {
        Self {
            address,
            mode,
            speed: 0,
            forward: true,
            functions: 0,
            estop: false,
        }
    }

    /// DCC address.
    pub fn address(&self) -> u16 {
        self.address
    }

    /// Addressing mode.
    pub fn mode(&self) -> AddressMode {
        self.mode
    }

    /// Current 128-step speed.
    pub fn speed(&self) -> u8 {
        self.speed
    }

    /// Returns true when running forward.
    pub fn is_forward(&self) -> bool {
        self.forward
    }

    /// Returns true while emergency stopped.
    pub fn is_estopped(&self) -> bool {
        self.estop
    }

    /// Sets the speed step, clearing any emergency stop.
    pub fn set_speed(&mut self, speed: u8) {
        self.speed = speed.min(MAX_SPEED);
        self.estop = false;
    }

    /// Sets the travel direction.
    pub fn set_direction(&mut self, forward: bool) {
        self.forward = forward;
    }

    /// Stops immediately.
    pub fn emergency_stop(&mut self) {
        self.speed = 0;
        self.estop = true;
    }

    /// Reads one function. Out-of-range numbers read as off.
    pub fn function(&self, number: u8) -> bool {
        number <= MAX_FUNCTION && self.functions & (1 << number) != 0
    }

    /// Bitmask of F0..F28.
    pub fn functions(&self) -> u32 {
        self.functions
    }

    /// Sets one function. Returns false for numbers above F28.
    pub fn set_function(&mut self, number: u8, on: bool) -> bool {
        if number > MAX_FUNCTION {
            return false;
        }
        if on {
            self.functions |= 1 << number;
        } else {
            self.functions &= !(1 << number);
        }
        true
    }

    /// Decodes a legacy function byte pair.
    pub fn apply_function_bytes(&mut self, byte: u8, byte2: Option<u8>) {
        let (first, last, bits) = match byte2 {
            Some(bits) if byte & 0xDE == 0xDE => (13, 20, bits),
            Some(bits) => (21, 28, bits),
            None if byte & 0xB0 == 0xB0 => (5, 8, byte),
            None if byte & 0xA0 == 0xA0 => (9, 12, byte),
            None => {
                self.set_function(0, byte & 0x10 != 0);
                (1, 4, byte)
            }
        };

        for number in first..=last {
            self.set_function(number, bits & (1 << (number - first)) != 0);
        }
    }

    /// DCC++ throttle reply for register `register`.
    pub fn status_line(&self, register: usize) -> String {
        format!(
            "<T {} {} {}>",
            register,
            self.speed & 0x7F,
            u8::from(self.forward)
        )
    }
}

/// Every locomotive a client has addressed, in first-use order.
#[derive(Clone, Debug, Default)]
pub struct Roster {
    locomotives: Vec<Locomotive>,
}

impl Roster {
    /// Creates an empty roster.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the locomotive at `address`, adding it if unknown.
    pub fn get_or_create(&mut self, address: u16, mode: AddressMode) -> &mut Locomotive {
        let index = match self.locomotives.iter().position(|loco| loco.address == address) {
            Some(index) => index,
            None => {
                log::debug!("[Roster] Adding locomotive {address} ({mode:?})");
                self.locomotives.push(Locomotive::new(address, mode));
                self.locomotives.len() - 1
            }
        };
        &mut self.locomotives[index]
    }

    /// Looks up a locomotive by address.
    pub fn get(&self, address: u16) -> Option<&Locomotive> {
        self.locomotives.iter().find(|loco| loco.address == address)
    }

    /// Locomotives in first-use order.
    pub fn iter(&self) -> impl Iterator<Item = &Locomotive> {
        self.locomotives.iter()
    }

    /// Number of locomotives.
    pub fn len(&self) -> usize {
        self.locomotives.len()
    }

    /// Returns true if no locomotive has been addressed yet.
    pub fn is_empty(&self) -> bool {
        self.locomotives.is_empty()
    }

    /// Emergency-stops every locomotive.
    pub fn emergency_stop_all(&mut self) {
        for loco in &mut self.locomotives {
            loco.emergency_stop();
        }
    }

    /// Throttle lines for the status dump, indexed by roster position.
    pub fn status_lines(&self) -> String {
        self.locomotives
            .iter()
            .enumerate()
            .map(|(index, loco)| loco.status_line(index))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loco() -> Locomotive {
        Locomotive::new(3, AddressMode::Long)
    }

    fn on(loco: &Locomotive) -> Vec<u8> {
        (0..=MAX_FUNCTION).filter(|&n| loco.function(n)).collect()
    }

    // ========================================================================
    // Function decode
    // ========================================================================

    #[test]
    fn f0_to_f4_group() {
        let mut loco = loco();
        // 128 + 16 (F0) + 1 (F1) + 8 (F4)
        loco.apply_function_bytes(153, None);
        assert_eq!(on(&loco), vec![0, 1, 4]);

        loco.apply_function_bytes(128, None);
        assert!(on(&loco).is_empty());
    }

    #[test]
    fn f5_to_f8_group() {
        let mut loco = loco();
        loco.apply_function_bytes(0xB0 | 0b0101, None);
        assert_eq!(on(&loco), vec![5, 7]);
    }

    #[test]
    fn f9_to_f12_group() {
        let mut loco = loco();
        loco.apply_function_bytes(0xA0 | 0b1010, None);
        assert_eq!(on(&loco), vec![10, 12]);
    }

    #[test]
    fn f5_group_leaves_f0_alone() {
        let mut loco = loco();
        loco.set_function(0, true);
        loco.apply_function_bytes(0xB0, None);
        assert!(loco.function(0));
    }

    #[test]
    fn f13_to_f20_group() {
        let mut loco = loco();
        loco.apply_function_bytes(222, Some(0b1000_0001));
        assert_eq!(on(&loco), vec![13, 20]);
    }

    #[test]
    fn mask_overlap_selects_f13_for_223() {
        let mut loco = loco();
        loco.apply_function_bytes(223, Some(1));
        assert_eq!(on(&loco), vec![13]);
    }

    #[test]
    fn f21_to_f28_group() {
        let mut loco = loco();
        loco.apply_function_bytes(221, Some(0xFF));
        assert_eq!(on(&loco), (21..=28u8).collect::<Vec<_>>());
    }

    #[test]
    fn set_function_rejects_out_of_range() {
        let mut loco = loco();
        assert!(!loco.set_function(29, true));
        assert_eq!(loco.functions(), 0);
        assert!(!loco.function(29));
    }

    // ========================================================================
    // Speed and roster
    // ========================================================================

    #[test]
    fn speed_clears_estop() {
        let mut loco = loco();
        loco.set_speed(40);
        loco.emergency_stop();
        assert!(loco.is_estopped());
        assert_eq!(loco.speed(), 0);
        loco.set_speed(200);
        assert!(!loco.is_estopped());
        assert_eq!(loco.speed(), MAX_SPEED);
    }

    #[test]
    fn status_line_format() {
        let mut loco = loco();
        loco.set_speed(64);
        loco.set_direction(false);
        assert_eq!(loco.status_line(1), "<T 1 64 0>");
    }

    #[test]
    fn roster_creates_once() {
        let mut roster = Roster::new();
        roster.get_or_create(3, AddressMode::Long).set_speed(10);
        roster.get_or_create(3, AddressMode::Long).set_direction(false);
        roster.get_or_create(1234, AddressMode::Long);

        assert_eq!(roster.len(), 2);
        assert_eq!(roster.get(3).unwrap().speed(), 10);
        assert_eq!(roster.status_lines(), "<T 0 10 0><T 1 0 1>");
    }

    #[test]
    fn address_mode_boundary() {
        assert_eq!(AddressMode::for_address(127), AddressMode::Short);
        assert_eq!(AddressMode::for_address(128), AddressMode::Long);
    }
}
