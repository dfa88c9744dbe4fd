//! An in-process replacement for the physical board.

use crate::error::Result;
use crate::events::{lock, ListenerId, ListenerRegistry};
use crate::pins::{pin_mask, PinIo};
use std::sync::Mutex;

/// Emulates a PiFace Digital board with two plain byte buffers and no
/// chip semantics.
///
/// Input reads keep the physical device's active-low convention (a stored
/// bit of 0 reads back as `true`), so code written against the emulator
/// behaves identically on hardware. Every mutation fires the matching
/// output-changed or input-changed callbacks synchronously, after the
/// buffer has been updated.
#[derive(Debug, Default)]
pub struct PiFaceEmulator {
    outputs: Mutex<u8>,
    inputs: Mutex<u8>,
    output_changed: ListenerRegistry<u8>,
    input_changed: ListenerRegistry<u8>,
}

impl PiFaceEmulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a callback fired with the new output byte after every
    /// output mutation.
    pub fn watch_outputs(&self, callback: Box<dyn Fn(&u8) + Send>) -> ListenerId {
        self.output_changed.add(callback)
    }

    /// Removes an output-changed callback.
    pub fn unwatch_outputs(&self, id: ListenerId) -> bool {
        self.output_changed.remove(id)
    }

    /// Registers a callback fired with the new input byte after every
    /// input mutation.
    pub fn watch_inputs(&self, callback: Box<dyn Fn(&u8) + Send>) -> ListenerId {
        self.input_changed.add(callback)
    }

    /// Removes an input-changed callback.
    pub fn unwatch_inputs(&self, id: ListenerId) -> bool {
        self.input_changed.remove(id)
    }
}

impl PinIo for PiFaceEmulator {
    fn get_output(&self, pin: u8) -> Result<bool> {
        let mask = pin_mask(pin)?;
        Ok(*lock(&self.outputs) & mask == mask)
    }

    fn get_outputs(&self) -> Result<u8> {
        Ok(*lock(&self.outputs))
    }

    fn set_output(&self, pin: u8, enabled: bool) -> Result<()> {
        let mask = pin_mask(pin)?;
        let value = {
            let mut outputs = lock(&self.outputs);
            if enabled {
                *outputs |= mask;
            } else {
                *outputs &= !mask;
            }
            *outputs
        };
        self.output_changed.emit(&value);
        Ok(())
    }

    fn set_outputs(&self, bits: u8) -> Result<()> {
        *lock(&self.outputs) = bits;
        self.output_changed.emit(&bits);
        Ok(())
    }

    fn get_input(&self, pin: u8) -> Result<bool> {
        let mask = pin_mask(pin)?;
        // Same active-low convention as the hardware's pull-up wiring.
        Ok(*lock(&self.inputs) & mask == 0)
    }

    fn get_inputs(&self) -> Result<u8> {
        Ok(*lock(&self.inputs))
    }

    fn set_input(&self, pin: u8, enabled: bool) -> Result<()> {
        let mask = pin_mask(pin)?;
        let value = {
            let mut inputs = lock(&self.inputs);
            if enabled {
                *inputs |= mask;
            } else {
                *inputs &= !mask;
            }
            *inputs
        };
        self.input_changed.emit(&value);
        Ok(())
    }

    fn set_inputs(&self, bits: u8) -> Result<()> {
        *lock(&self.inputs) = bits;
        self.input_changed.emit(&bits);
        Ok(())
    }
}
