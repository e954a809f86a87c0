use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::Duration;

use crossterm::event::{self, Event as CtEvent, KeyEvent};

/// Unified event type consumed by the validation screen loop.
#[derive(Clone, Debug)]
pub enum KioskEvent {
    Key(KeyEvent),
    Resize,
    Tick,
}

/// Source of terminal events (keyboard, resize, etc.).
pub trait KioskEventSource: Send + 'static {
    /// Block for up to `timeout` waiting for an event. `Err(Timeout)` means
    /// the window elapsed with nothing to deliver.
    fn recv_timeout(&self, timeout: Duration) -> Result<KioskEvent, RecvTimeoutError>;
}

/// Production event source backed by a crossterm reader thread.
pub struct CrosstermEventSource {
    rx: Receiver<KioskEvent>,
}

impl CrosstermEventSource {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();

        std::thread::spawn(move || loop {
            match event::read() {
                Ok(CtEvent::Key(key)) => {
                    if tx.send(KioskEvent::Key(key)).is_err() {
                        break;
                    }
                }
                Ok(CtEvent::Resize(_, _)) => {
                    if tx.send(KioskEvent::Resize).is_err() {
                        break;
                    }
                }
                Ok(_) => {}
                Err(_) => break,
            }
        });

        Self { rx }
    }
}

impl Default for CrosstermEventSource {
    fn default() -> Self {
        Self::new()
    }
}

impl KioskEventSource for CrosstermEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<KioskEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Channel-fed event source for driving the loop headlessly in tests.
pub struct TestEventSource {
    rx: Receiver<KioskEvent>,
}

impl TestEventSource {
    pub fn new(rx: Receiver<KioskEvent>) -> Self {
        Self { rx }
    }
}

impl KioskEventSource for TestEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<KioskEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Advances the screen one event at a time, synthesizing a `Tick` whenever
/// the tick interval passes without terminal input. The tick interval is the
/// input polling cadence, so pad polling and countdown both ride on it.
pub struct Runner<E: KioskEventSource> {
    event_source: E,
    tick_interval: Duration,
}

impl<E: KioskEventSource> Runner<E> {
    pub fn new(event_source: E, tick_interval: Duration) -> Self {
        Self {
            event_source,
            tick_interval,
        }
    }

    pub fn step(&self) -> KioskEvent {
        match self.event_source.recv_timeout(self.tick_interval) {
            Ok(ev) => ev,
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => {
                KioskEvent::Tick
            }
        }
    }
}
