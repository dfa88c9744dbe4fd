//! The pin capability interface shared by every device variant.

use crate::error::{Error, Result};
use crate::events::{InputsChanged, ListenerId};

/// Highest valid pin index on either port.
pub const PIN_MAX: u8 = 7;

/// Validates a pin index and returns its bit mask.
pub(crate) fn pin_mask(pin: u8) -> Result<u8> {
    if pin > PIN_MAX {
        return Err(Error::PinOutOfRange { pin });
    }
    Ok(1 << pin)
}

/// Get/set access to the 8 output and 8 input pins of a PiFace Digital
/// board, whether the board is physical, emulated, or reached over the
/// network.
///
/// Input reads follow the board's active-low wiring: a raw input bit of 0
/// reads back as `true` (switch pressed / line pulled low). The two
/// `set_input*` methods only succeed on variants that own their input
/// buffer (the emulator, or a remote client talking to one); a physical
/// device reports [`Error::Unsupported`].
pub trait PinIo: Send + Sync {
    /// Gets the state of a single output pin.
    fn get_output(&self, pin: u8) -> Result<bool>;

    /// Gets the bitmask containing the state of all output pins.
    fn get_outputs(&self) -> Result<u8>;

    /// Updates the state of a single output pin.
    fn set_output(&self, pin: u8, enabled: bool) -> Result<()>;

    /// Updates all output pins from a bitmask.
    fn set_outputs(&self, bits: u8) -> Result<()>;

    /// Gets the state of a single input pin (active-low: raw bit 0 reads
    /// as `true`).
    fn get_input(&self, pin: u8) -> Result<bool>;

    /// Gets the raw bitmask of all input pins.
    fn get_inputs(&self) -> Result<u8>;

    /// Updates the state of a single input pin (emulator-backed variants
    /// only).
    fn set_input(&self, pin: u8, enabled: bool) -> Result<()>;

    /// Updates all input pins from a bitmask (emulator-backed variants
    /// only).
    fn set_inputs(&self, bits: u8) -> Result<()>;
}

/// A [`PinIo`] device that can report input changes via a hardware
/// interrupt line.
pub trait IsrPinIo: PinIo {
    /// Whether interrupt wiring is active on this device instance.
    fn is_isr_enabled(&self) -> bool;

    /// Registers a callback invoked once per interrupt with the latch mask
    /// and the input snapshot. Delivery is synchronous on the edge
    /// detector's thread, in registration order.
    fn watch_inputs(&self, callback: Box<dyn Fn(&InputsChanged) + Send>) -> ListenerId;

    /// Removes a previously registered inputs-changed callback.
    fn unwatch_inputs(&self, id: ListenerId) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pin_mask_covers_valid_range() {
        for pin in 0..=PIN_MAX {
            assert_eq!(pin_mask(pin).unwrap(), 1u8 << pin);
        }
    }

    #[test]
    fn pin_mask_rejects_out_of_range() {
        for pin in [8u8, 9, 100, 255] {
            assert!(matches!(pin_mask(pin), Err(Error::PinOutOfRange { pin: p }) if p == pin));
        }
    }
}
