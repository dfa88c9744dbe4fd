//! Debounced tracking of a masked group of input pins.

use crate::error::{Error, Result};
use crate::events::{lock, InputsChanged, ListenerId, ListenerRegistry, PinGroupChanged};
use crate::pins::IsrPinIo;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// How the pins of a group combine into one boolean.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinGroupMode {
    /// The group is set while at least one masked pin is set.
    Any,
    /// The group is set only while every masked pin is set.
    All,
}

struct Gate {
    interval: Duration,
    state: bool,
    last_change: Option<Instant>,
}

struct GroupShared {
    mask: u8,
    mode: PinGroupMode,
    gate: Mutex<Gate>,
    group_changed: ListenerRegistry<PinGroupChanged>,
}

impl GroupShared {
    fn group_state(&self, states: u8) -> bool {
        match self.mode {
            PinGroupMode::All => states & self.mask == self.mask,
            PinGroupMode::Any => states & self.mask != 0,
        }
    }

    fn on_inputs_changed(&self, event: &InputsChanged) {
        let state = self.group_state(event.states);
        let mut gate = lock(&self.gate);
        let gate_open = gate
            .last_change
            .map_or(true, |at| at.elapsed() >= gate.interval);
        if state != gate.state && gate_open {
            gate.state = state;
            gate.last_change = Some(Instant::now());
            drop(gate);
            self.group_changed.emit(&PinGroupChanged {
                mask: self.mask,
                state,
                latch: event.latch & self.mask,
            });
        }
    }
}

/// Tracks a masked set of input pins as one combined state, debounced
/// like [`InputPinController`](super::InputPinController).
///
/// The initial group state is seeded from the device's live inputs at
/// construction. The bound device must have interrupt wiring enabled.
pub struct InputPinGroupController {
    device: Arc<dyn IsrPinIo>,
    shared: Arc<GroupShared>,
    subscription: ListenerId,
}

impl InputPinGroupController {
    /// Binds to a pin group on an ISR-enabled device. `gate_ms` is the
    /// minimum time between accepted group transitions.
    pub fn new(
        device: Arc<dyn IsrPinIo>,
        mask: u8,
        mode: PinGroupMode,
        gate_ms: u64,
    ) -> Result<Self> {
        if !device.is_isr_enabled() {
            return Err(Error::ArgumentOutOfRange(
                "device must have interrupt wiring enabled".to_string(),
            ));
        }
        let shared = Arc::new(GroupShared {
            mask,
            mode,
            gate: Mutex::new(Gate {
                interval: Duration::from_millis(gate_ms),
                state: false,
                last_change: None,
            }),
            group_changed: ListenerRegistry::new(),
        });
        lock(&shared.gate).state = shared.group_state(device.get_inputs()?);
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

    /// The pin mask this group watches.
    pub fn mask(&self) -> u8 {
        self.shared.mask
    }

    /// The configured combination mode.
    pub fn mode(&self) -> PinGroupMode {
        self.shared.mode
    }

    /// The last accepted combined group state.
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

    /// Registers a callback fired on every accepted group transition, on
    /// the interrupt delivery thread.
    pub fn watch_group(&self, callback: Box<dyn Fn(&PinGroupChanged) + Send>) -> ListenerId {
        self.shared.group_changed.add(callback)
    }

    /// Removes a previously registered group callback.
    pub fn unwatch_group(&self, id: ListenerId) -> bool {
        self.shared.group_changed.remove(id)
    }
}

impl Drop for InputPinGroupController {
    fn drop(&mut self) {
        self.device.unwatch_inputs(self.subscription);
    }
}
