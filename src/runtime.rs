use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::time::Duration;

use crossterm::event::{self, Event as CtEvent, KeyEvent};

pub const TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Unified event type consumed by the app runner
#[derive(Clone, Debug)]
pub enum TestEvent {
    Key(KeyEvent),
    Resize,
    /// One second passed on the schedule with this id
    Tick(u64),
}

/// Source of events (keyboard, resize, clock ticks)
pub trait EventSource: Send + 'static {
    /// Block for up to `timeout` waiting for an event.
    fn recv_timeout(&self, timeout: Duration) -> Result<TestEvent, RecvTimeoutError>;
}

/// Event source backed by an mpsc channel. The terminal reader thread and
/// the tick thread both feed the sending half.
pub struct ChannelEventSource {
    rx: Receiver<TestEvent>,
}

impl ChannelEventSource {
    pub fn new(rx: Receiver<TestEvent>) -> Self {
        Self { rx }
    }
}

impl EventSource for ChannelEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<TestEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Forward crossterm key and resize events into `tx` from a background thread.
pub fn spawn_terminal_reader(tx: Sender<TestEvent>) {
    std::thread::spawn(move || loop {
        let ev = match event::read() {
            Ok(CtEvent::Key(key)) => TestEvent::Key(key),
            Ok(CtEvent::Resize(_, _)) => TestEvent::Resize,
            Ok(_) => continue,
            Err(e) => {
                log::warn!("terminal reader stopped: {e}");
                break;
            }
        };
        if tx.send(ev).is_err() {
            break;
        }
    });
}

/// Something that delivers `tick()` calls to an engine once per second
/// while armed.
pub trait TickScheduler {
    /// Begin the recurring tick. Re-arming replaces any previous schedule.
    fn arm(&mut self);
    /// Cancel the recurring tick. Ticks the cancelled schedule already
    /// queued must fail [`TickScheduler::accepts`].
    fn disarm(&mut self);
    fn is_armed(&self) -> bool;
    /// Id of the current schedule. Bumped on every `arm`.
    fn schedule(&self) -> u64;

    /// Whether a tick tagged with `schedule` belongs to the live schedule.
    /// Ticks still queued from a cancelled schedule are refused.
    fn accepts(&self, schedule: u64) -> bool {
        self.is_armed() && schedule == self.schedule()
    }
}

/// Scheduler for tests and simulated clocks: records whether ticks are
/// wanted, and the caller invokes `tick()` by hand.
#[derive(Debug, Default, Clone)]
pub struct ManualTicks {
    armed: bool,
    arm_count: u64,
}

impl ManualTicks {
    pub fn new() -> Self {
        Self::default()
    }

    /// How many times a schedule has been started.
    pub fn arm_count(&self) -> u64 {
        self.arm_count
    }
}

impl TickScheduler for ManualTicks {
    fn arm(&mut self) {
        self.armed = true;
        self.arm_count += 1;
    }

    fn disarm(&mut self) {
        self.armed = false;
    }

    fn is_armed(&self) -> bool {
        self.armed
    }

    fn schedule(&self) -> u64 {
        self.arm_count
    }
}

/// Real timer: a background thread sends [`TestEvent::Tick`] into the
/// event channel every `interval`.
///
/// Each schedule owns its own cancel flag, so a thread left over from a
/// disarmed schedule exits on its next wake-up. A tick it sent just before
/// that carries the old schedule id and is refused by [`TickScheduler::accepts`].
pub struct ThreadTicker {
    tx: Sender<TestEvent>,
    interval: Duration,
    schedule: u64,
    cancel: Option<Arc<AtomicBool>>,
}

impl ThreadTicker {
    pub fn new(tx: Sender<TestEvent>, interval: Duration) -> Self {
        Self {
            tx,
            interval,
            schedule: 0,
            cancel: None,
        }
    }
}

impl TickScheduler for ThreadTicker {
    fn arm(&mut self) {
        self.disarm();
        self.schedule += 1;

        let schedule = self.schedule;
        let cancel = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&cancel);
        let tx = self.tx.clone();
        let interval = self.interval;

        std::thread::spawn(move || loop {
            std::thread::sleep(interval);
            if flag.load(Ordering::SeqCst) || tx.send(TestEvent::Tick(schedule)).is_err() {
                break;
            }
        });

        self.cancel = Some(cancel);
    }

    fn disarm(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel.store(true, Ordering::SeqCst);
        }
    }

    fn is_armed(&self) -> bool {
        self.cancel.is_some()
    }

    fn schedule(&self) -> u64 {
        self.schedule
    }
}

impl Drop for ThreadTicker {
    fn drop(&mut self) {
        self.disarm();
    }
}

/// Runner that advances the application one event at a time
pub struct Runner<E: EventSource> {
    event_source: E,
    poll_interval: Duration,
}

impl<E: EventSource> Runner<E> {
    pub fn new(event_source: E, poll_interval: Duration) -> Self {
        Self {
            event_source,
            poll_interval,
        }
    }

    /// Blocks up to the poll interval and returns the next event, or None
    /// when nothing arrived (or every sender is gone).
    pub fn step(&self) -> Option<TestEvent> {
        match self.event_source.recv_timeout(self.poll_interval) {
            Ok(ev) => Some(ev),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }
}
