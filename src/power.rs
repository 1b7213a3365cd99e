//! Deferred track power control.
//!
//! `<1>` and `<0>` only record a request. The power check task applies it to
//! the [`TrackSignal`] driver on its next interval, so a burst of power
//! commands costs at most one output change per interval.

use crate::traits::TrackSignal;

/// Requested and applied state of the OPS track output.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TrackPower {
    requested: Option<bool>,
}

impl TrackPower {
    /// Creates a controller with nothing pending.
    pub const fn new() -> Self {
        Self { requested: None }
    }

    /// Records a power request. The latest request wins.
    pub fn request(&mut self, enabled: bool) {
        self.requested = Some(enabled);
    }

    /// The request waiting for the next check, if any.
    pub fn pending(&self) -> Option<bool> {
        self.requested
    }

    /// Applies the pending request to the driver.
    ///
    /// Returns the new output state when it changed.
    pub fn apply(&mut self, track: &mut dyn TrackSignal) -> Option<bool> {
        let enabled = self.requested.take()?;
        if track.ops_enabled() == enabled {
            return None;
        }
        track.set_ops_output(enabled);
        log::info!("[Power] OPS track {}", if enabled { "enabled" } else { "disabled" });
        Some(enabled)
    }

    /// DCC++ power and current report: `<p1 OPS><a 120>`.
    pub fn state_for_dccpp(track: &dyn TrackSignal) -> String {
        format!(
            "<p{} OPS><a {}>",
            u8::from(track.ops_enabled()),
            track.ops_current_ma()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::MockTrackSignal;

    #[test]
    fn request_is_not_applied_immediately() {
        let mut track = MockTrackSignal::new();
        let mut power = TrackPower::new();

        power.request(true);
        assert!(!track.ops_enabled());
        assert_eq!(power.pending(), Some(true));

        assert_eq!(power.apply(&mut track), Some(true));
        assert!(track.ops_enabled());
        assert_eq!(power.pending(), None);
    }

    #[test]
    fn latest_request_wins() {
        let mut track = MockTrackSignal::new();
        let mut power = TrackPower::new();

        power.request(true);
        power.request(false);
        assert_eq!(power.apply(&mut track), None);
        assert!(!track.ops_enabled());
    }

    #[test]
    fn nothing_pending_is_noop() {
        let mut track = MockTrackSignal::new();
        let mut power = TrackPower::new();
        assert_eq!(power.apply(&mut track), None);
    }

    #[test]
    fn status_text() {
        let mut track = MockTrackSignal::new();
        track.set_current_ma(350);
        assert_eq!(TrackPower::state_for_dccpp(&track), "<p0 OPS><a 350>");
        track.set_ops_output(true);
        assert_eq!(TrackPower::state_for_dccpp(&track), "<p1 OPS><a 350>");
    }
}
