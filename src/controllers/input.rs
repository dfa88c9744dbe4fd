//! Debounced tracking of a single input pin via the interrupt stream.

use crate::error::{Error, Result};
use crate::events::{lock, InputsChanged, ListenerId, ListenerRegistry, PinChanged};
use crate::pins::{pin_mask, IsrPinIo};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

struct Gate {
    interval: Duration,
    state: bool,
    last_change: Option<Instant>,
}

pub(super) struct InputShared {
    pin: u8,
    mask: u8,
    gate: Mutex<Gate>,
    pin_changed: ListenerRegistry<PinChanged>,
}

impl InputShared {
    fn on_inputs_changed(&self, event: &InputsChanged) {
        let state = event.states & self.mask != 0;
        let latched = event.latch & self.mask != 0;
        let mut gate = lock(&self.gate);
        // Accept when this pin raised the interrupt or its level moved,
        // and the gate interval has elapsed since the last accepted
        // update; everything else is contact bounce and is dropped.
        let gate_open = gate
            .last_change
            .map_or(true, |at| at.elapsed() >= gate.interval);
        if (latched || state != gate.state) && gate_open {
            gate.state = state;
            gate.last_change = Some(Instant::now());
            drop(gate);
            self.pin_changed.emit(&PinChanged {
                pin: self.pin,
                state,
            });
        }
    }
}

/// Tracks the state of one input pin from a device's interrupt stream,
/// suppressing changes that arrive faster than a configurable gate
/// interval (antibeat).
///
/// The bound device must have interrupt wiring enabled.
pub struct InputPinController {
    device: Arc<dyn IsrPinIo>,
    shared: Arc<InputShared>,
    subscription: ListenerId,
}

impl InputPinController {
    /// Binds to an input pin on an ISR-enabled device. `gate_ms` is the
    /// minimum time between accepted state changes.
    pub fn new(device: Arc<dyn IsrPinIo>, pin: u8, gate_ms: u64) -> Result<Self> {
        let mask = pin_mask(pin)?;
        if !device.is_isr_enabled() {
            return Err(Error::ArgumentOutOfRange(
                "device must have interrupt wiring enabled".to_string(),
            ));
        }
        let shared = Arc::new(InputShared {
            pin,
            mask,
            gate: Mutex::new(Gate {
                interval: Duration::from_millis(gate_ms),
                state: false,
                last_change: None,
            }),
            pin_changed: ListenerRegistry::new(),
        });
        let subscription = {
            let shared = Arc::clone(&shared);
            device.watch_inputs(Box::new(move |event| shared.on_inputs_changed(event)))
        };
        Ok(Self {
            device,
            shared,
            subscription,
        })
    }

    /// The input pin this controller tracks.
    pub fn pin(&self) -> u8 {
        self.shared.pin
    }

    /// The last accepted state of the pin.
    pub fn state(&self) -> bool {
        lock(&self.shared.gate).state
    }

    /// The configured gate interval in milliseconds.
    pub fn gate_ms(&self) -> u64 {
        lock(&self.shared.gate).interval.as_millis() as u64
    }

    /// Reconfigures the gate interval.
    pub fn set_gate_ms(&self, gate_ms: u64) {
        lock(&self.shared.gate).interval = Duration::from_millis(gate_ms);
    }

    /// Registers a callback fired on every accepted state change, on the
    /// interrupt delivery thread.
    pub fn watch_pin(&self, callback: Box<dyn Fn(&PinChanged) + Send>) -> ListenerId {
        self.shared.pin_changed.add(callback)
    }

    /// Removes a previously registered pin-changed callback.
    pub fn unwatch_pin(&self, id: ListenerId) -> bool {
        self.shared.pin_changed.remove(id)
    }
}

impl Drop for InputPinController {
    fn drop(&mut self) {
        self.device.unwatch_inputs(self.subscription);
    }
}
