//! Sensor input polling.

use crate::scheduler::{Action, Task};
use crate::station::CommandStation;

/// Resumption point of [`SensorPollTask`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SensorStep {
    /// Read every sensor input.
    Poll,
}

/// Reads sensor pins and publishes `<Q id>` / `<q id>` on each transition.
#[derive(Debug, Default)]
pub struct SensorPollTask {
    interval_ms: u64,
}

impl SensorPollTask {
    /// Creates the task.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Task for SensorPollTask {
    type State = SensorStep;

    fn name(&self) -> &'static str {
        "sensor-poll"
    }

    fn init(&mut self, station: &mut CommandStation) -> Action<SensorStep> {
        if !station.ctx.config.features.sensors {
            return Action::Exit;
        }
        self.interval_ms = u64::from(station.ctx.config.timing.sensor_poll_interval_ms);
        Action::Continue(SensorStep::Poll)
    }

    fn step(&mut self, _: SensorStep, station: &mut CommandStation, _elapsed_ms: u64) -> Action<SensorStep> {
        let ctx = &mut station.ctx;
        for event in ctx.sensors.poll(&mut ctx.hw) {
            log::debug!("[Sensors] {event}");
            ctx.notify(event);
        }
        Action::Sleep {
            ms: self.interval_ms,
            next: SensorStep::Poll,
        }
    }
}
