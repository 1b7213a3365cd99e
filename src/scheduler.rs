//! Cooperative, timer-driven task scheduler.
//!
//! Every periodic job (status LEDs, the radio link, power checks, sensor
//! polling, autosave) is a [`Task`]: an explicit state enum plus a step
//! function. The scheduler owns no threads; the caller's update loop calls
//! [`Scheduler::poll`] with the current time and each ready task runs one
//! step to completion.
//!
//! # Task lifecycle
//!
//! ```text
//! Idle --init--> Running --step--> Sleeping(until) --time--> Running --> ...
//!   \
//!    +--init returns Exit--> Exited
//! ```
//!
//! `Exited` is only reachable from `init`, which is where a task checks its
//! feature flag. A step that returns [`Action::Exit`] sends the task back to
//! `Idle`, so it is re-initialized on the next pass.
//!
//! # Example
//!
//! ```rust
//! use rs_cmdstation::scheduler::{Action, Scheduler, Task, TaskState};
//! use rs_cmdstation::{CommandStation, StationConfig};
//!
//! struct Heartbeat {
//!     beats: u32,
//! }
//!
//! impl Task for Heartbeat {
//!     type State = ();
//!
//!     fn name(&self) -> &'static str {
//!         "heartbeat"
//!     }
//!
//!     fn init(&mut self, _station: &mut CommandStation) -> Action<()> {
//!         Action::Continue(())
//!     }
//!
//!     fn step(&mut self, _: (), _station: &mut CommandStation, _elapsed_ms: u64) -> Action<()> {
//!         self.beats += 1;
//!         Action::Sleep { ms: 1000, next: () }
//!     }
//! }
//!
//! let mut station = CommandStation::with_mocks(StationConfig::default());
//! let mut scheduler = Scheduler::new();
//! scheduler.spawn(Heartbeat { beats: 0 });
//!
//! scheduler.poll(&mut station, 0); // init
//! scheduler.poll(&mut station, 0); // first beat, then sleep
//! assert_eq!(scheduler.next_wake(), Some(1000));
//! assert_eq!(scheduler.task_states()[0].1, TaskState::Sleeping { until: 1000 });
//! ```

use core::fmt;

use crate::station::CommandStation;

/// What a task wants after a step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action<S> {
    /// Run again at `S` on the next pass.
    Continue(S),
    /// Sleep for `ms`, then resume at `next`.
    Sleep {
        /// Sleep duration in milliseconds.
        ms: u64,
        /// State to resume at.
        next: S,
    },
    /// Stop. Terminal only when returned from [`Task::init`].
    Exit,
}

/// A cooperative task.
///
/// Steps must not block: they run on the scheduler's single thread and
/// hold the station for their whole duration.
pub trait Task: Send {
    /// The task's resumption points.
    type State: Send;

    /// Name used in logs and diagnostics.
    fn name(&self) -> &'static str;

    /// Called once when the task first runs.
    ///
    /// Returning [`Action::Exit`] retires the task permanently.
    fn init(&mut self, station: &mut CommandStation) -> Action<Self::State>;

    /// Runs one step from `state`.
    ///
    /// `elapsed_ms` is the time since this task last ran.
    fn step(
        &mut self,
        state: Self::State,
        station: &mut CommandStation,
        elapsed_ms: u64,
    ) -> Action<Self::State>;
}

/// Externally visible task state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TaskState {
    /// Not yet initialized.
    Idle,
    /// Ready to step on the next pass.
    Running,
    /// Waiting for the clock.
    Sleeping {
        /// Wake time in milliseconds.
        until: u64,
    },
    /// Retired during init.
    Exited,
}

enum Phase<S> {
    Idle,
    Running(S),
    Sleeping { until: u64, next: S },
    Exited,
}

/// Object-safe view of a spawned task and its current phase.
///
/// Implemented for every [`Slot`], so tasks with different `State` types
/// can share one run queue.
trait ScheduledTask: Send {
    fn name(&self) -> &'static str;
    fn state(&self) -> TaskState;
    fn is_ready(&self, now_ms: u64) -> bool;
    fn run(&mut self, station: &mut CommandStation, now_ms: u64);
}

struct Slot<T: Task> {
    task: T,
    phase: Phase<T::State>,
    last_run_ms: u64,
}

impl<T: Task> Slot<T> {
    fn settle(&mut self, action: Action<T::State>, now_ms: u64, from_init: bool) {
        self.phase = match action {
            Action::Continue(next) => Phase::Running(next),
            Action::Sleep { ms, next } => Phase::Sleeping {
                until: now_ms.saturating_add(ms),
                next,
            },
            Action::Exit if from_init => {
                log::info!("[Scheduler] {} disabled", self.task.name());
                Phase::Exited
            }
            Action::Exit => {
                log::debug!("[Scheduler] {} restarting", self.task.name());
                Phase::Idle
            }
        };
    }
}

impl<T: Task> ScheduledTask for Slot<T> {
    fn name(&self) -> &'static str {
        self.task.name()
    }

    fn state(&self) -> TaskState {
        match &self.phase {
            Phase::Idle => TaskState::Idle,
            Phase::Running(_) => TaskState::Running,
            Phase::Sleeping { until, .. } => TaskState::Sleeping { until: *until },
            Phase::Exited => TaskState::Exited,
        }
    }

    fn is_ready(&self, now_ms: u64) -> bool {
        match &self.phase {
            Phase::Idle | Phase::Running(_) => true,
            Phase::Sleeping { until, .. } => *until <= now_ms,
            Phase::Exited => false,
        }
    }

    fn run(&mut self, station: &mut CommandStation, now_ms: u64) {
        let elapsed_ms = now_ms.saturating_sub(self.last_run_ms);
        self.last_run_ms = now_ms;
        match core::mem::replace(&mut self.phase, Phase::Exited) {
            Phase::Idle => {
                let action = self.task.init(station);
                self.settle(action, now_ms, true);
            }
            Phase::Running(state) | Phase::Sleeping { next: state, .. } => {
                let action = self.task.step(state, station, elapsed_ms);
                self.settle(action, now_ms, false);
            }
            Phase::Exited => {}
        }
    }
}

/// Round-robin runner for [`Task`]s.
#[derive(Default)]
pub struct Scheduler {
    tasks: Vec<Box<dyn ScheduledTask>>,
    cursor: usize,
    last_poll_ms: u64,
}

impl Scheduler {
    /// Creates an empty scheduler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a task. It initializes on the next poll.
    pub fn spawn<T: Task + 'static>(&mut self, task: T) {
        log::debug!("[Scheduler] Spawning {}", task.name());
        self.tasks.push(Box::new(Slot {
            task,
            phase: Phase::Idle,
            last_run_ms: self.last_poll_ms,
        }));
    }

    /// Number of spawned tasks, including exited ones.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Returns true if no tasks were spawned.
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Runs one step of every task ready at `now_ms`.
    ///
    /// The starting task rotates each pass so no task is always first.
    /// Returns the number of steps run.
    pub fn poll(&mut self, station: &mut CommandStation, now_ms: u64) -> usize {
        self.last_poll_ms = now_ms;
        let count = self.tasks.len();
        if count == 0 {
            return 0;
        }

        let start = self.cursor % count;
        let mut ran = 0;
        for offset in 0..count {
            let task = &mut self.tasks[(start + offset) % count];
            if task.is_ready(now_ms) {
                log::trace!("[Scheduler] Running {}", task.name());
                task.run(station, now_ms);
                ran += 1;
            }
        }
        self.cursor = (start + 1) % count;
        ran
    }

    /// Earliest time any task is ready, or `None` if every task exited.
    pub fn next_wake(&self) -> Option<u64> {
        self.tasks
            .iter()
            .filter_map(|task| match task.state() {
                TaskState::Idle | TaskState::Running => Some(self.last_poll_ms),
                TaskState::Sleeping { until } => Some(until),
                TaskState::Exited => None,
            })
            .min()
    }

    /// Name and state of every task, in spawn order.
    pub fn task_states(&self) -> Vec<(&'static str, TaskState)> {
        self.tasks
            .iter()
            .map(|task| (task.name(), task.state()))
            .collect()
    }
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("tasks", &self.task_states())
            .field("cursor", &self.cursor)
            .finish()
    }
}
