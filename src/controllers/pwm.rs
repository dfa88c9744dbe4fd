//! Software pulse-width modulation on one output pin.

use super::{BackgroundDriver, ControllerState};
use crate::error::{Error, Result};
use crate::events::lock;
use crate::pins::{pin_mask, PinIo};
use log::warn;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

/// Smallest usable cycle period; the output pins cannot usefully be
/// updated faster than this.
const MIN_PERIOD_MS: u64 = 10;

#[derive(Debug, Clone, Copy)]
struct Timers {
    period_ms: u64,
    duty: f32,
    high_ms: u64,
    low_ms: u64,
}

fn compute_timers(period_ms: u64, duty: f32) -> Result<Timers> {
    if period_ms < MIN_PERIOD_MS {
        return Err(Error::ArgumentOutOfRange(format!(
            "PWM period {} ms too short (min {} ms)",
            period_ms, MIN_PERIOD_MS
        )));
    }
    if !(0.0..=1.0).contains(&duty) {
        return Err(Error::ArgumentOutOfRange(format!(
            "PWM duty {} out of range (0.0-1.0)",
            duty
        )));
    }
    let high_ms = (duty as f64 * period_ms as f64).round() as u64;
    Ok(Timers {
        period_ms,
        duty,
        high_ms,
        low_ms: period_ms - high_ms,
    })
}

/// Rapidly switches one output pin with a configurable duty cycle, e.g.
/// to drive a DC motor at variable speed from a purely digital output.
///
/// Per cycle the pin is held low for `period * (1 - duty)` and then high
/// for `period * duty`, skipping zero-length phases. Duty and period can
/// be changed while running; the new split takes effect at the next cycle
/// boundary.
pub struct PwmPinController {
    device: Arc<dyn PinIo>,
    pin: u8,
    timers: Arc<Mutex<Timers>>,
    driver: BackgroundDriver,
}

impl PwmPinController {
    /// Binds a PWM controller to an output pin. `period_ms` must be at
    /// least 10 ms and `duty` within `0.0..=1.0`.
    pub fn new(device: Arc<dyn PinIo>, pin: u8, period_ms: u64, duty: f32) -> Result<Self> {
        pin_mask(pin)?;
        let timers = compute_timers(period_ms, duty)?;
        Ok(Self {
            device,
            pin,
            timers: Arc::new(Mutex::new(timers)),
            driver: BackgroundDriver::new("pwm controller"),
        })
    }

    /// The output pin this controller drives.
    pub fn pin(&self) -> u8 {
        self.pin
    }

    /// The configured cycle period in milliseconds.
    pub fn period_ms(&self) -> u64 {
        lock(&self.timers).period_ms
    }

    /// The configured fraction of each period spent high.
    pub fn duty(&self) -> f32 {
        lock(&self.timers).duty
    }

    /// Reconfigures the duty cycle; applied at the next cycle boundary.
    pub fn set_duty(&self, duty: f32) -> Result<()> {
        let mut timers = lock(&self.timers);
        *timers = compute_timers(timers.period_ms, duty)?;
        Ok(())
    }

    /// Reconfigures the cycle period; applied at the next cycle boundary.
    pub fn set_period_ms(&self, period_ms: u64) -> Result<()> {
        let mut timers = lock(&self.timers);
        *timers = compute_timers(period_ms, timers.duty)?;
        Ok(())
    }

    pub fn state(&self) -> ControllerState {
        self.driver.state()
    }

    /// Spawns the worker thread. Fails with
    /// [`Error::InvalidState`](crate::Error::InvalidState) unless the
    /// controller is stopped.
    pub fn start(&self) -> Result<()> {
        let device = Arc::clone(&self.device);
        let timers = Arc::clone(&self.timers);
        let pin = self.pin;
        self.driver.start(move |token| {
            while token.is_running() {
                let (low_ms, high_ms) = {
                    let t = lock(&timers);
                    (t.low_ms, t.high_ms)
                };
                if low_ms > 0 {
                    if let Err(e) = device.set_output(pin, false) {
                        warn!("pwm write to pin {} failed: {}", pin, e);
                    }
                    thread::sleep(Duration::from_millis(low_ms));
                }
                if high_ms > 0 {
                    if let Err(e) = device.set_output(pin, true) {
                        warn!("pwm write to pin {} failed: {}", pin, e);
                    }
                    thread::sleep(Duration::from_millis(high_ms));
                }
            }
        })
    }

    /// Stops the worker thread, blocking until it has exited.
    pub fn stop(&self) -> Result<()> {
        self.driver.stop()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timer_split_rounds_duty() {
        let t = compute_timers(100, 0.2).unwrap();
        assert_eq!(t.high_ms, 20);
        assert_eq!(t.low_ms, 80);

        let t = compute_timers(100, 0.505).unwrap();
        assert_eq!(t.high_ms, 51);
        assert_eq!(t.low_ms, 49);
    }

    #[test]
    fn full_and_zero_duty_skip_a_phase() {
        let t = compute_timers(50, 0.0).unwrap();
        assert_eq!(t.high_ms, 0);
        assert_eq!(t.low_ms, 50);

        let t = compute_timers(50, 1.0).unwrap();
        assert_eq!(t.high_ms, 50);
        assert_eq!(t.low_ms, 0);
    }

    #[test]
    fn invalid_parameters_are_rejected() {
        assert!(compute_timers(5, 0.5).is_err());
        assert!(compute_timers(100, -0.1).is_err());
        assert!(compute_timers(100, 1.1).is_err());
    }
}
