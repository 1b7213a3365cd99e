//! Output flag byte and power-up restore policy.
//!
//! The `IFLAG` byte of the `<Z id pin iflag>` command packs three settings:
//!
//! | Bit | Name | Meaning |
//! |-----|------|---------|
//! | 0 | [`INVERTED`](OutputFlags::INVERTED) | `0` = active drives HIGH, `1` = active drives LOW |
//! | 1 | [`FORCE_STATE`](OutputFlags::FORCE_STATE) | `0` = restore previous state on power-up, `1` = force state per bit 2 |
//! | 2 | [`DEFAULT_ACTIVE`](OutputFlags::DEFAULT_ACTIVE) | With bit 1 set: `1` = force active, `0` = force inactive |
//!
//! All bit tests live here. Callers work with [`OutputFlags::inverted`] and
//! [`RestorePolicy`], never with raw masks.
//!
//! # Example
//!
//! ```rust
//! use rs_cmdstation::entity::{OutputFlags, RestorePolicy};
//!
//! let flags = OutputFlags::from_bits(0b110);
//! assert!(!flags.inverted());
//! assert_eq!(flags.restore_policy(), RestorePolicy::ForceActive);
//!
//! // Forced policies ignore the persisted state on load
//! assert!(flags.restore_policy().on_load(false));
//! ```

use core::fmt;

use serde::{Deserialize, Serialize};

/// Power-up and creation behavior of an output.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RestorePolicy {
    /// Restore the persisted state on power-up; inactive when first created.
    RestorePrevious,
    /// Always active on power-up and creation.
    ForceActive,
    /// Always inactive on power-up and creation.
    ForceInactive,
}

impl RestorePolicy {
    /// State an entity takes when it is created or reconfigured.
    pub const fn on_create(self) -> bool {
        matches!(self, RestorePolicy::ForceActive)
    }

    /// State an entity takes when it is reloaded from persistence.
    pub const fn on_load(self, persisted: bool) -> bool {
        match self {
            RestorePolicy::RestorePrevious => persisted,
            RestorePolicy::ForceActive => true,
            RestorePolicy::ForceInactive => false,
        }
    }

    /// Flag bits encoding this policy.
    pub const fn bits(self) -> u8 {
        match self {
            RestorePolicy::RestorePrevious => 0,
            RestorePolicy::ForceActive => OutputFlags::FORCE_STATE | OutputFlags::DEFAULT_ACTIVE,
            RestorePolicy::ForceInactive => OutputFlags::FORCE_STATE,
        }
    }
}

/// The raw `IFLAG` byte of an output.
///
/// Bits above bit 2 carry no meaning but are preserved so that a stored
/// value round-trips unchanged.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OutputFlags(u8);

impl OutputFlags {
    /// Active drives the pin LOW.
    pub const INVERTED: u8 = 1 << 0;
    /// Force the state on power-up instead of restoring it.
    pub const FORCE_STATE: u8 = 1 << 1;
    /// Forced state is active (only meaningful with `FORCE_STATE`).
    pub const DEFAULT_ACTIVE: u8 = 1 << 2;

    /// Wraps a raw flag byte.
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits)
    }

    /// Builds the flag byte from its decoded parts.
    pub const fn new(inverted: bool, policy: RestorePolicy) -> Self {
        let polarity = if inverted { Self::INVERTED } else { 0 };
        Self(polarity | policy.bits())
    }

    /// Raw flag byte.
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Returns true if active drives the pin LOW.
    pub const fn inverted(self) -> bool {
        self.0 & Self::INVERTED != 0
    }

    /// Decodes the power-up restore policy.
    pub const fn restore_policy(self) -> RestorePolicy {
        if self.0 & Self::FORCE_STATE == 0 {
            RestorePolicy::RestorePrevious
        } else if self.0 & Self::DEFAULT_ACTIVE != 0 {
            RestorePolicy::ForceActive
        } else {
            RestorePolicy::ForceInactive
        }
    }

    /// Pin level that represents `active` under this polarity.
    pub const fn level(self, active: bool) -> bool {
        active != self.inverted()
    }
}

impl From<u8> for OutputFlags {
    fn from(bits: u8) -> Self {
        Self::from_bits(bits)
    }
}

impl fmt::Display for OutputFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let polarity = if self.inverted() { "activeLow" } else { "activeHigh" };
        let restore = match self.restore_policy() {
            RestorePolicy::RestorePrevious => "restoreState",
            RestorePolicy::ForceActive => "forceActive",
            RestorePolicy::ForceInactive => "forceInactive",
        };
        write!(f, "{polarity},{restore}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ========================================================================
    // Exhaustive decode
    // ========================================================================

    #[test]
    fn every_meaningful_combination() {
        // (bits, inverted, policy, created, loaded-from-false, loaded-from-true)
        let table = [
            (0b000, false, RestorePolicy::RestorePrevious, false, false, true),
            (0b001, true, RestorePolicy::RestorePrevious, false, false, true),
            (0b010, false, RestorePolicy::ForceInactive, false, false, false),
            (0b011, true, RestorePolicy::ForceInactive, false, false, false),
            (0b100, false, RestorePolicy::RestorePrevious, false, false, true),
            (0b101, true, RestorePolicy::RestorePrevious, false, false, true),
            (0b110, false, RestorePolicy::ForceActive, true, true, true),
            (0b111, true, RestorePolicy::ForceActive, true, true, true),
        ];

        for (bits, inverted, policy, created, from_false, from_true) in table {
            let flags = OutputFlags::from_bits(bits);
            assert_eq!(flags.inverted(), inverted, "bits {bits:03b}");
            assert_eq!(flags.restore_policy(), policy, "bits {bits:03b}");
            assert_eq!(policy.on_create(), created, "bits {bits:03b}");
            assert_eq!(policy.on_load(false), from_false, "bits {bits:03b}");
            assert_eq!(policy.on_load(true), from_true, "bits {bits:03b}");
        }
    }

    #[test]
    fn high_bits_are_ignored_but_preserved() {
        let flags = OutputFlags::from_bits(0xF8 | 0b011);
        assert!(flags.inverted());
        assert_eq!(flags.restore_policy(), RestorePolicy::ForceInactive);
        assert_eq!(flags.bits(), 0xFB);
    }

    #[test]
    fn encode_matches_decode() {
        for inverted in [false, true] {
            for policy in [
                RestorePolicy::RestorePrevious,
                RestorePolicy::ForceActive,
                RestorePolicy::ForceInactive,
            ] {
                let flags = OutputFlags::new(inverted, policy);
                assert_eq!(flags.inverted(), inverted);
                assert_eq!(flags.restore_policy(), policy);
            }
        }
    }

    // ========================================================================
    // Pin levels
    // ========================================================================

    #[test]
    fn level_follows_polarity() {
        let normal = OutputFlags::from_bits(0);
        assert!(normal.level(true));
        assert!(!normal.level(false));

        let inverted = OutputFlags::from_bits(OutputFlags::INVERTED);
        assert!(!inverted.level(true));
        assert!(inverted.level(false));
    }

    #[test]
    fn display_is_readable() {
        assert_eq!(OutputFlags::from_bits(0).to_string(), "activeHigh,restoreState");
        assert_eq!(OutputFlags::from_bits(7).to_string(), "activeLow,forceActive");
    }

    #[test]
    fn serializes_as_plain_number() {
        let json = serde_json::to_string(&OutputFlags::from_bits(5)).unwrap();
        assert_eq!(json, "5");
    }
}
