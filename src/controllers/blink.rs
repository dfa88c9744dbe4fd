//! Regular-interval on/off switching of one output pin.

use super::{BackgroundDriver, ControllerState};
use crate::error::{Error, Result};
use crate::pins::{pin_mask, PinIo};
use log::warn;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Smallest usable toggle interval; the output pins cannot usefully be
/// updated faster than this.
const MIN_INTERVAL_MS: u64 = 10;

/// Toggles one output pin between off and on at a fixed interval, e.g.
/// to blink an LED, starting from off.
pub struct BlinkingPinController {
    device: Arc<dyn PinIo>,
    pin: u8,
    interval: Duration,
    driver: BackgroundDriver,
}

impl BlinkingPinController {
    /// Binds a blink controller to an output pin. `interval_ms` is the
    /// time between toggles and must be at least 10 ms.
    pub fn new(device: Arc<dyn PinIo>, pin: u8, interval_ms: u64) -> Result<Self> {
        pin_mask(pin)?;
        if interval_ms < MIN_INTERVAL_MS {
            return Err(Error::ArgumentOutOfRange(format!(
                "blink interval {} ms too short (min {} ms)",
                interval_ms, MIN_INTERVAL_MS
            )));
        }
        Ok(Self {
            device,
            pin,
            interval: Duration::from_millis(interval_ms),
            driver: BackgroundDriver::new("blink controller"),
        })
    }

    /// The output pin this controller drives.
    pub fn pin(&self) -> u8 {
        self.pin
    }

    /// The toggle interval.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn state(&self) -> ControllerState {
        self.driver.state()
    }

    /// Spawns the worker thread. Fails with
    /// [`Error::InvalidState`](crate::Error::InvalidState) unless the
    /// controller is stopped.
    pub fn start(&self) -> Result<()> {
        let device = Arc::clone(&self.device);
        let pin = self.pin;
        let interval = self.interval;
        self.driver.start(move |token| {
            let mut enabled = false;
            while token.is_running() {
                if let Err(e) = device.set_output(pin, enabled) {
                    warn!("blink write to pin {} failed: {}", pin, e);
                }
                thread::sleep(interval);
                enabled = !enabled;
            }
        })
    }

    /// Stops the worker thread, blocking until it has exited.
    pub fn stop(&self) -> Result<()> {
        self.driver.stop()
    }
}
