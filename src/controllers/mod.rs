//! Background pin controllers.
//!
//! Each controller binds to one [`PinIo`](crate::pins::PinIo) instance and
//! layers a timing behavior on top of raw pin access: blinking, PWM, or
//! debounced input tracking. The output controllers run on their own
//! worker thread with a shared Stopped/Running/Stopping lifecycle; the
//! input controllers are event-driven and react to a device's interrupt
//! stream instead.

mod blink;
mod button;
mod group;
mod input;
mod pwm;

pub use blink::BlinkingPinController;
pub use button::ButtonInputController;
pub use group::{InputPinGroupController, PinGroupMode};
pub use input::InputPinController;
pub use pwm::PwmPinController;

use crate::error::{Error, Result};
use crate::events::lock;
use log::debug;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Lifecycle of a background controller (or the TCP server).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    Stopped,
    Running,
    Stopping,
}

const STOPPED: u8 = 0;
const RUNNING: u8 = 1;
const STOPPING: u8 = 2;

fn state_from(raw: u8) -> ControllerState {
    match raw {
        RUNNING => ControllerState::Running,
        STOPPING => ControllerState::Stopping,
        _ => ControllerState::Stopped,
    }
}

/// Interval at which `stop` re-checks whether the worker has exited.
const STOP_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Handle the worker loop uses to observe a pending stop request.
pub(crate) struct RunToken {
    state: Arc<AtomicU8>,
}

impl RunToken {
    /// `true` until `stop` has been requested; checked once per loop
    /// iteration.
    pub fn is_running(&self) -> bool {
        self.state.load(Ordering::SeqCst) == RUNNING
    }
}

/// Shared start/stop state machine for anything that runs a worker
/// thread.
///
/// `start` is legal only from `Stopped` and `stop` only from `Running`;
/// any other request fails with [`Error::InvalidState`]. The worker never
/// transitions the state itself: `stop` flags `Stopping` and waits (in
/// short sleeps) for the thread to exit before marking `Stopped`.
/// Concurrent `start`/`stop` calls on one instance serialize on an
/// internal lock.
pub(crate) struct BackgroundDriver {
    name: &'static str,
    state: Arc<AtomicU8>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl BackgroundDriver {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            state: Arc::new(AtomicU8::new(STOPPED)),
            worker: Mutex::new(None),
        }
    }

    pub fn state(&self) -> ControllerState {
        state_from(self.state.load(Ordering::SeqCst))
    }

    pub fn start<F>(&self, body: F) -> Result<()>
    where
        F: FnOnce(RunToken) + Send + 'static,
    {
        let mut worker = lock(&self.worker);
        if self.state.load(Ordering::SeqCst) != STOPPED {
            return Err(Error::InvalidState(format!(
                "cannot start {} while {:?}",
                self.name,
                self.state()
            )));
        }
        debug!("starting {} worker", self.name);
        self.state.store(RUNNING, Ordering::SeqCst);
        let token = RunToken {
            state: Arc::clone(&self.state),
        };
        let handle = thread::Builder::new()
            .name(self.name.to_string())
            .spawn(move || body(token));
        match handle {
            Ok(handle) => {
                *worker = Some(handle);
                Ok(())
            }
            Err(e) => {
                self.state.store(STOPPED, Ordering::SeqCst);
                Err(Error::Io(e))
            }
        }
    }

    pub fn stop(&self) -> Result<()> {
        let mut worker = lock(&self.worker);
        if self.state.load(Ordering::SeqCst) != RUNNING {
            return Err(Error::InvalidState(format!(
                "cannot stop {} while {:?}",
                self.name,
                self.state()
            )));
        }
        debug!("stopping {} worker", self.name);
        self.state.store(STOPPING, Ordering::SeqCst);
        if let Some(handle) = worker.take() {
            while !handle.is_finished() {
                thread::sleep(STOP_POLL_INTERVAL);
            }
            let _ = handle.join();
        }
        self.state.store(STOPPED, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn start_stop_cycle() {
        let driver = BackgroundDriver::new("test");
        assert_eq!(driver.state(), ControllerState::Stopped);
        driver
            .start(|token| {
                while token.is_running() {
                    thread::sleep(Duration::from_millis(1));
                }
            })
            .unwrap();
        assert_eq!(driver.state(), ControllerState::Running);
        driver.stop().unwrap();
        assert_eq!(driver.state(), ControllerState::Stopped);
    }

    #[test]
    fn double_start_is_rejected() {
        let driver = BackgroundDriver::new("test");
        driver
            .start(|token| {
                while token.is_running() {
                    thread::sleep(Duration::from_millis(1));
                }
            })
            .unwrap();
        assert!(matches!(
            driver.start(|_| {}),
            Err(Error::InvalidState(_))
        ));
        driver.stop().unwrap();
    }

    #[test]
    fn stop_when_stopped_is_rejected() {
        let driver = BackgroundDriver::new("test");
        assert!(matches!(driver.stop(), Err(Error::InvalidState(_))));
    }

    #[test]
    fn stop_waits_for_worker_exit() {
        let driver = BackgroundDriver::new("test");
        driver
            .start(|token| {
                while token.is_running() {
                    thread::sleep(Duration::from_millis(5));
                }
                // Simulate slow shutdown work after observing the flag.
                thread::sleep(Duration::from_millis(50));
            })
            .unwrap();
        let begun = Instant::now();
        driver.stop().unwrap();
        assert!(begun.elapsed() >= Duration::from_millis(50));
    }
}
