//! One command station shared by every network service.
//!
//! `SharedStation` wraps the [`CommandStation`] and its [`Scheduler`] so the
//! TCP listener, the JSON API and the update loop all act on the same layout.
//! Every command and every scheduler pass holds the station lock for its
//! whole run, which keeps handlers run-to-completion across services.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use rs_cmdstation::scheduler::Scheduler;
//! use rs_cmdstation::services::SharedStation;
//! use rs_cmdstation::{CommandStation, StationConfig};
//!
//! let station = CommandStation::with_mocks(StationConfig::default());
//! let shared = Arc::new(SharedStation::new(station, Scheduler::new()));
//!
//! assert_eq!(shared.dispatch("Z 1 16 0"), "<O>");
//! let outputs = shared.with_station(|station| station.ctx.outputs.len());
//! assert_eq!(outputs, 1);
//! ```

use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::frame::FrameExtractor;
use crate::hal::SystemClock;
use crate::persistence::PersistenceError;
use crate::scheduler::Scheduler;
use crate::station::{CommandStation, StoreCounts};
use crate::traits::Clock;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Thread-safe handle to the station and its scheduler.
///
/// Uses `Mutex` rather than `RwLock`: nearly every access mutates, and the
/// update loop writes every few milliseconds.
pub struct SharedStation {
    station: Mutex<CommandStation>,
    scheduler: Mutex<Scheduler>,
    clock: SystemClock,
}

impl SharedStation {
    /// Wraps a station and the scheduler that drives its tasks.
    pub fn new(station: CommandStation, scheduler: Scheduler) -> Self {
        Self {
            station: Mutex::new(station),
            scheduler: Mutex::new(scheduler),
            clock: SystemClock::new(),
        }
    }

    /// Milliseconds since the shared state was created.
    ///
    /// The time base for every scheduler pass.
    #[inline]
    pub fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    /// Runs `f` with exclusive access to the station.
    ///
    /// The closure form keeps the lock from being held across an `.await`.
    pub fn with_station<R, F>(&self, f: F) -> R
    where
        F: FnOnce(&mut CommandStation) -> R,
    {
        let mut guard = lock(&self.station);
        f(&mut guard)
    }

    /// Dispatches one frame interior.
    pub fn dispatch(&self, frame: &str) -> String {
        self.with_station(|station| station.dispatch(frame))
    }

    /// Feeds raw bytes from one client through its extractor.
    pub fn feed<const N: usize>(&self, extractor: &mut FrameExtractor<N>, bytes: &[u8]) -> String {
        self.with_station(|station| station.feed(extractor, bytes))
    }

    /// Cursor positioned after every notification published so far.
    pub fn notification_cursor(&self) -> u64 {
        self.with_station(|station| station.ctx.notifications.cursor())
    }

    /// Notifications published after `cursor`, advancing it.
    pub fn notifications_since(&self, cursor: &mut u64) -> Vec<String> {
        self.with_station(|station| station.ctx.notifications.since(cursor))
    }

    /// Runs one scheduler pass at the current time.
    pub fn tick(&self) -> usize {
        let now_ms = self.now_ms();
        let mut scheduler = lock(&self.scheduler);
        self.with_station(|station| scheduler.poll(station, now_ms))
    }

    /// Final save before the process exits.
    ///
    /// Only an enabled autosave writes here; otherwise unsaved edits are
    /// dropped exactly as on a power cycle. Returns `None` when nothing was
    /// written.
    pub fn shutdown(&self) -> Result<Option<StoreCounts>, PersistenceError> {
        self.with_station(|station| {
            let ctx = &mut station.ctx;
            if ctx.config.timing.autosave_interval_ms == 0 {
                if ctx.is_dirty() {
                    log::warn!("[Store] Discarding unsaved changes; send <E> to keep them");
                }
                return Ok(None);
            }
            if !ctx.is_dirty() {
                return Ok(None);
            }
            ctx.store_all().map(Some)
        })
    }
}

impl core::fmt::Debug for SharedStation {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SharedStation")
            .field("uptime_ms", &self.now_ms())
            .finish_non_exhaustive()
    }
}
