//! HC-12 auxiliary radio link.
//!
//! The radio carries the same DCC++ protocol as the TCP listener. Incoming
//! bytes go through the task's own [`FrameExtractor`]; responses, sensor
//! notifications and anything queued with [`RadioOutbox::send`] are written
//! back in one burst per interval.

use std::sync::{Arc, Mutex, PoisonError};

use crate::frame::FrameExtractor;
use crate::scheduler::{Action, Task};
use crate::station::CommandStation;
use crate::traits::SerialPort;

const READ_CHUNK: usize = 64;
/// Reads per receive step, so a streaming port still yields to other tasks.
const MAX_READS_PER_STEP: usize = 4;

/// Text waiting to go out over the radio.
///
/// Clone the handle to queue text from outside the scheduler.
#[derive(Clone, Debug, Default)]
pub struct RadioOutbox {
    pending: Arc<Mutex<String>>,
}

impl RadioOutbox {
    /// Creates an empty outbox.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues text for the next flush.
    pub fn send(&self, text: &str) {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_str(text);
    }

    /// Takes everything queued so far.
    pub fn take(&self) -> String {
        core::mem::take(&mut *self.pending.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

/// Resumption points of [`RadioTask`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RadioStep {
    /// Read and dispatch whatever arrived.
    Receive,
    /// Write buffered text.
    Flush,
}

/// Polls the radio UART and answers DCC++ frames received over it.
pub struct RadioTask {
    port: Box<dyn SerialPort>,
    extractor: FrameExtractor,
    outbox: RadioOutbox,
    cursor: u64,
    interval_ms: u64,
}

impl RadioTask {
    /// Creates the task over a serial port.
    pub fn new(port: Box<dyn SerialPort>) -> Self {
        Self {
            port,
            extractor: FrameExtractor::new(),
            outbox: RadioOutbox::new(),
            cursor: 0,
            interval_ms: 0,
        }
    }

    /// Handle for queueing outgoing text.
    pub fn outbox(&self) -> RadioOutbox {
        self.outbox.clone()
    }
}

impl Task for RadioTask {
    type State = RadioStep;

    fn name(&self) -> &'static str {
        "radio"
    }

    fn init(&mut self, station: &mut CommandStation) -> Action<RadioStep> {
        if !station.ctx.config.features.radio {
            return Action::Exit;
        }
        self.interval_ms = u64::from(station.ctx.config.timing.radio_interval_ms);
        self.cursor = station.ctx.notifications.cursor();
        log::info!("[HC12] Radio link active, polling every {} ms", self.interval_ms);
        Action::Sleep {
            ms: self.interval_ms,
            next: RadioStep::Receive,
        }
    }

    fn step(&mut self, state: RadioStep, station: &mut CommandStation, _elapsed_ms: u64) -> Action<RadioStep> {
        match state {
            RadioStep::Receive => {
                let mut buf = [0u8; READ_CHUNK];
                for _ in 0..MAX_READS_PER_STEP {
                    let count = self.port.read(&mut buf);
                    if count == 0 {
                        break;
                    }
                    let response = station.feed(&mut self.extractor, &buf[..count]);
                    if !response.is_empty() {
                        self.outbox.send(&response);
                    }
                }
                Action::Continue(RadioStep::Flush)
            }
            RadioStep::Flush => {
                for message in station.ctx.notifications.since(&mut self.cursor) {
                    self.outbox.send(&message);
                }
                let text = self.outbox.take();
                if !text.is_empty() {
                    log::trace!("[HC12] Sending {} bytes", text.len());
                    self.port.write(text.as_bytes());
                }
                Action::Sleep {
                    ms: self.interval_ms,
                    next: RadioStep::Receive,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FeatureConfig;
    use crate::hal::MockSerial;
    use crate::scheduler::{Scheduler, TaskState};
    use crate::StationConfig;

    fn radio_station() -> CommandStation {
        CommandStation::with_mocks(
            StationConfig::default().with_features(FeatureConfig::default().with_radio(true)),
        )
    }

    #[test]
    fn answers_frames_on_flush() {
        let serial = MockSerial::new();
        let mut station = radio_station();
        let mut scheduler = Scheduler::new();
        let task = RadioTask::new(Box::new(serial.clone()));
        let outbox = task.outbox();
        scheduler.spawn(task);

        scheduler.poll(&mut station, 0);
        serial.queue_input(b"<Z 1 16 0><Z 1 ");
        outbox.send("<hello>");

        scheduler.poll(&mut station, 250);
        assert_eq!(serial.take_output(), "");

        scheduler.poll(&mut station, 250);
        assert_eq!(serial.take_output(), "<hello><O>");

        serial.queue_input(b"1>");
        scheduler.poll(&mut station, 500);
        scheduler.poll(&mut station, 500);
        assert_eq!(serial.take_output(), "<Y 1 0>");
    }

    #[test]
    fn receive_step_reads_a_bounded_amount() {
        let serial = MockSerial::new();
        let mut station = radio_station();
        let mut scheduler = Scheduler::new();
        scheduler.spawn(RadioTask::new(Box::new(serial.clone())));
        scheduler.poll(&mut station, 0);

        let frames = "<F>".repeat(100);
        serial.queue_input(frames.as_bytes());

        scheduler.poll(&mut station, 250);
        let budget = MAX_READS_PER_STEP * READ_CHUNK;
        assert_eq!(serial.pending_input(), frames.len() - budget);

        // Flush answers every frame completed so far
        scheduler.poll(&mut station, 250);
        assert_eq!(serial.take_output(), "<f 180000>".repeat(budget / 3));

        scheduler.poll(&mut station, 500);
        scheduler.poll(&mut station, 500);
        assert_eq!(serial.pending_input(), 0);
        assert_eq!(serial.take_output(), "<f 180000>".repeat(100 - budget / 3));
    }

    #[test]
    fn forwards_notifications() {
        let serial = MockSerial::new();
        let mut station = radio_station();
        let mut scheduler = Scheduler::new();
        station.ctx.notify("<Q 7>".to_string());
        scheduler.spawn(RadioTask::new(Box::new(serial.clone())));

        scheduler.poll(&mut station, 0);
        station.ctx.notify("<q 7>".to_string());
        scheduler.poll(&mut station, 250);
        scheduler.poll(&mut station, 250);
        assert_eq!(serial.take_output(), "<q 7>");
    }

    #[test]
    fn disabled_by_default() {
        let mut station = CommandStation::with_mocks(StationConfig::default());
        let mut scheduler = Scheduler::new();
        scheduler.spawn(RadioTask::new(Box::new(MockSerial::new())));
        scheduler.poll(&mut station, 0);
        assert_eq!(scheduler.task_states()[0].1, TaskState::Exited);
    }
}
