//! Periodic background store of changed entities.

use crate::scheduler::{Action, Task};
use crate::station::CommandStation;

/// Resumption point of [`AutosaveTask`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AutosaveStep {
    /// Store if anything changed.
    Save,
}

/// Stores every manager when the context is dirty.
///
/// Disabled unless `timing.autosave_interval_ms` is non-zero. A failed store
/// leaves the context dirty, so the next interval retries.
#[derive(Debug, Default)]
pub struct AutosaveTask {
    interval_ms: u64,
}

impl AutosaveTask {
    /// Creates the task.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Task for AutosaveTask {
    type State = AutosaveStep;

    fn name(&self) -> &'static str {
        "autosave"
    }

    fn init(&mut self, station: &mut CommandStation) -> Action<AutosaveStep> {
        self.interval_ms = u64::from(station.ctx.config.timing.autosave_interval_ms);
        if self.interval_ms == 0 {
            return Action::Exit;
        }
        Action::Sleep {
            ms: self.interval_ms,
            next: AutosaveStep::Save,
        }
    }

    fn step(&mut self, _: AutosaveStep, station: &mut CommandStation, _elapsed_ms: u64) -> Action<AutosaveStep> {
        if station.ctx.is_dirty() {
            match station.ctx.store_all() {
                Ok(counts) => log::info!(
                    "[Store] Autosaved {} turnouts, {} sensors, {} outputs",
                    counts.turnouts,
                    counts.sensors,
                    counts.outputs
                ),
                Err(err) => log::warn!("[Store] Autosave failed: {err}"),
            }
        }
        Action::Sleep {
            ms: self.interval_ms,
            next: AutosaveStep::Save,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TimingConfig;
    use crate::hal::{MemoryStore, MockHardware};
    use crate::scheduler::{Scheduler, TaskState};
    use crate::StationConfig;

    fn station(autosave_ms: u32) -> (MemoryStore, CommandStation) {
        let store = MemoryStore::new();
        let config = StationConfig::default()
            .with_timing(TimingConfig::default().with_autosave_interval_ms(autosave_ms));
        let station = CommandStation::new(
            config,
            MockHardware::new().hardware(),
            Box::new(store.clone()),
        );
        (store, station)
    }

    #[test]
    fn saves_only_when_dirty() {
        let (store, mut station) = station(1000);
        let mut scheduler = Scheduler::new();
        scheduler.spawn(AutosaveTask::new());
        scheduler.poll(&mut station, 0);

        scheduler.poll(&mut station, 1000);
        assert!(store.get("outputs").is_none());

        station.dispatch("Z 1 16 0");
        scheduler.poll(&mut station, 2000);
        assert!(store.get("outputs").is_some());
        assert!(!station.ctx.is_dirty());
    }

    #[test]
    fn failed_save_retries() {
        let (store, mut station) = station(1000);
        let mut scheduler = Scheduler::new();
        scheduler.spawn(AutosaveTask::new());
        scheduler.poll(&mut station, 0);

        store.fail_writes(true);
        station.dispatch("Z 1 16 0");
        scheduler.poll(&mut station, 1000);
        assert!(station.ctx.is_dirty());

        store.fail_writes(false);
        scheduler.poll(&mut station, 2000);
        assert!(!station.ctx.is_dirty());
    }

    #[test]
    fn zero_interval_disables() {
        let (_store, mut station) = station(0);
        let mut scheduler = Scheduler::new();
        scheduler.spawn(AutosaveTask::new());
        scheduler.poll(&mut station, 0);
        assert_eq!(scheduler.task_states()[0].1, TaskState::Exited);
    }
}
