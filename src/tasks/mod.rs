//! Periodic scheduler tasks.
//!
//! | Task | Interval | Disabled when |
//! |------|----------|---------------|
//! | [`StatusLedTask`] | `status_led_interval_ms` | `features.status_led` is off |
//! | [`RadioTask`] | `radio_interval_ms` | `features.radio` is off |
//! | [`PowerCheckTask`] | `power_check_interval_ms` | never |
//! | [`SensorPollTask`] | `sensor_poll_interval_ms` | `features.sensors` is off |
//! | [`AutosaveTask`] | `autosave_interval_ms` | the interval is 0 |
//!
//! The LED and radio tasks own a peripheral and are spawned by the
//! platform; [`spawn_core_tasks`] adds the rest.

mod autosave;
mod power_check;
mod radio;
mod sensor_poll;
mod status_led;

pub use autosave::{AutosaveStep, AutosaveTask};
pub use power_check::{PowerCheckTask, PowerStep};
pub use radio::{RadioOutbox, RadioStep, RadioTask};
pub use sensor_poll::{SensorPollTask, SensorStep};
pub use status_led::{Led, LedColor, LedStep, StatusLedTask, StatusLeds, LED_COUNT};

use crate::scheduler::Scheduler;

/// Spawns the tasks that need no peripheral of their own.
pub fn spawn_core_tasks(scheduler: &mut Scheduler) {
    scheduler.spawn(PowerCheckTask::new());
    scheduler.spawn(SensorPollTask::new());
    scheduler.spawn(AutosaveTask::new());
}
