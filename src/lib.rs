//! # piface-spi
//!
//! A Rust crate for controlling the PiFace Digital expansion board — an
//! MCP23S17 16-bit I/O expander with 8 output and 8 input pins — over the
//! Raspberry Pi's SPI bus, with an in-process emulator and a TCP
//! client/server pair for remote control.
//!
//! ## Features
//!
//! *   Register-level SPI transport over `/dev/spidevX.Y` (mode 0,
//!     8 bits/word, 5 MHz).
//! *   [`PinIo`]: one get/set contract for the 8 output and 8 input pins,
//!     implemented by the physical device, the emulator, and the TCP
//!     client.
//! *   [`PiFaceDevice`]: the physical board, with optional interrupt
//!     wiring through a sysfs GPIO edge detector.
//! *   [`PiFaceEmulator`]: a drop-in in-process replacement for
//!     development and testing.
//! *   [`GpioEdgeDetector`]: turns kernel priority-edge notifications on
//!     a GPIO line into edge events.
//! *   Background pin controllers: blinking, software PWM, debounced
//!     single-pin and multi-pin input tracking, and
//!     click/double-click/hold detection.
//! *   [`PiFaceTcpServer`] / [`PiFaceTcpClient`]: drive any `PinIo`
//!     instance across the network with a 2-byte-header binary framing.
//!
//! ## Basic Usage
//!
//! ```no_run
//! use piface_spi::{PiFaceDevice, PinIo, Result};
//! use std::{thread, time::Duration};
//!
//! fn main() -> Result<()> {
//!     let device = PiFaceDevice::open()?;
//!     device.set_output(0, true)?;
//!     thread::sleep(Duration::from_millis(200));
//!     device.set_output(0, false)?;
//!
//!     if device.get_input(3)? {
//!         println!("switch 3 is pressed");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Blinking an LED in the background
//!
//! ```no_run
//! use piface_spi::controllers::BlinkingPinController;
//! use piface_spi::{PiFaceEmulator, Result};
//! use std::sync::Arc;
//! use std::{thread, time::Duration};
//!
//! fn main() -> Result<()> {
//!     let device = Arc::new(PiFaceEmulator::new());
//!     let blinker = BlinkingPinController::new(device, 0, 250)?;
//!     blinker.start()?;
//!     thread::sleep(Duration::from_secs(2));
//!     blinker.stop()?;
//!     Ok(())
//! }
//! ```
//!
//! ## Remote control
//!
//! ```no_run
//! use piface_spi::remote::{PiFaceTcpClient, PiFaceTcpServer};
//! use piface_spi::{PiFaceEmulator, PinIo, Result};
//! use std::sync::Arc;
//!
//! fn main() -> Result<()> {
//!     let device = Arc::new(PiFaceEmulator::new());
//!     let server = PiFaceTcpServer::new(device, "0.0.0.0:15432")?;
//!     server.start()?;
//!
//!     let client = PiFaceTcpClient::connect("127.0.0.1:15432")?;
//!     client.set_outputs(0xAA)?;
//!     assert_eq!(client.get_outputs()?, 0xAA);
//!     server.stop()?;
//!     Ok(())
//! }
//! ```
//!
//! ## Hardware Notes
//!
//! *   Input reads are active-low: the board's switches ground the input
//!     pins, so a raw register bit of 0 reads back as `true`. The
//!     emulator keeps the same convention.
//! *   Interrupt wiring expects the board's INTB line on a host GPIO
//!     (line 25 on a stock PiFace Digital) and uses the sysfs GPIO
//!     interface for edge detection, so the process needs write access to
//!     `/sys/class/gpio`.
//! *   Concurrent pin access from several threads on one device is
//!     serialized internally per register exchange, but read-modify-write
//!     sequences across calls are the caller's responsibility.

mod consts;
pub mod controllers;
mod device;
mod emulator;
mod error;
mod events;
mod isr;
mod pins;
pub mod remote;
mod spi;
mod sys;

pub use controllers::ControllerState;
pub use device::{DeviceConfig, InterruptConfig, PiFaceDevice, PullMode};
pub use emulator::PiFaceEmulator;
pub use error::{Error, Result};
pub use events::{
    ButtonAction, ButtonEvent, EdgeEvent, InputsChanged, ListenerId, ListenerRegistry, PinChanged,
    PinGroupChanged,
};
pub use isr::{EdgeDetectorOptions, EdgeMode, GpioEdgeDetector};
pub use pins::{IsrPinIo, PinIo, PIN_MAX};
pub use remote::{PiFaceTcpClient, PiFaceTcpServer};
pub use spi::{SpiConfig, SpiTransport};
