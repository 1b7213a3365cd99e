//! Applies deferred track power requests.

use crate::scheduler::{Action, Task};
use crate::station::{CommandStation, StationContext};

use super::{Led, LedColor};

/// Resumption point of [`PowerCheckTask`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PowerStep {
    /// Apply any pending request.
    Check,
}

/// Applies `<1>`/`<0>` requests to the track driver and mirrors the OPS
/// output on its status LED.
#[derive(Debug, Default)]
pub struct PowerCheckTask {
    interval_ms: u64,
}

impl PowerCheckTask {
    /// Creates the task.
    pub fn new() -> Self {
        Self::default()
    }

    fn sync_led(ctx: &mut StationContext) {
        let color = if ctx.hw.track.ops_enabled() {
            LedColor::Green
        } else {
            LedColor::Off
        };
        if ctx.leds.color(Led::OpsTrack) != color {
            ctx.leds.set(Led::OpsTrack, color);
        }
    }
}

impl Task for PowerCheckTask {
    type State = PowerStep;

    fn name(&self) -> &'static str {
        "power-check"
    }

    fn init(&mut self, station: &mut CommandStation) -> Action<PowerStep> {
        self.interval_ms = u64::from(station.ctx.config.timing.power_check_interval_ms);
        Self::sync_led(&mut station.ctx);
        Action::Continue(PowerStep::Check)
    }

    fn step(&mut self, _: PowerStep, station: &mut CommandStation, _elapsed_ms: u64) -> Action<PowerStep> {
        let ctx = &mut station.ctx;
        ctx.power.apply(ctx.hw.track.as_mut());
        Self::sync_led(ctx);
        Action::Sleep {
            ms: self.interval_ms,
            next: PowerStep::Check,
        }
    }
}
