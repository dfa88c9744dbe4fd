//! The physical PiFace Digital device.

use crate::consts::{self, iocon, reg};
use crate::error::{Error, Result};
use crate::events::{lock, InputsChanged, ListenerId, ListenerRegistry};
use crate::isr::{EdgeDetectorOptions, EdgeMode, GpioEdgeDetector};
use crate::pins::{pin_mask, IsrPinIo, PinIo};
use crate::spi::{SpiConfig, SpiTransport};
use log::{debug, warn};
use std::sync::{Arc, Mutex};

/// Pull resistor configuration on the input port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PullMode {
    Off,
    PullUp,
    PullDown,
}

/// Interrupt wiring for a [`PiFaceDevice`].
#[derive(Debug, Clone)]
pub struct InterruptConfig {
    /// Input pins that raise the chip's interrupt line, as a bitmask.
    pub mask: u8,
    /// Host GPIO line the chip's interrupt output is wired to.
    pub pin: u8,
    /// Signal edge to detect on the host line.
    pub edge: EdgeMode,
    /// Edge detector options (sysfs root, poll timeout).
    pub detector: EdgeDetectorOptions,
}

impl Default for InterruptConfig {
    fn default() -> Self {
        Self {
            mask: 0xFF,
            pin: consts::DEFAULT_INTERRUPT_PIN,
            edge: EdgeMode::Falling,
            detector: EdgeDetectorOptions::default(),
        }
    }
}

impl InterruptConfig {
    /// Watches the given input pins, with the default host line and edge.
    pub fn new(mask: u8) -> Self {
        Self {
            mask,
            ..Default::default()
        }
    }

    /// Sets the host GPIO line.
    pub fn with_pin(mut self, pin: u8) -> Self {
        self.pin = pin;
        self
    }

    /// Sets the edge to detect.
    pub fn with_edge(mut self, edge: EdgeMode) -> Self {
        self.edge = edge;
        self
    }

    /// Sets the edge detector options.
    pub fn with_detector(mut self, detector: EdgeDetectorOptions) -> Self {
        self.detector = detector;
        self
    }
}

/// Configuration for opening a [`PiFaceDevice`].
#[derive(Debug, Clone, Default)]
pub struct DeviceConfig {
    /// SPI transport settings.
    pub spi: SpiConfig,
    /// Interrupt wiring; `None` leaves the chip's interrupts disabled.
    pub interrupts: Option<InterruptConfig>,
}

impl DeviceConfig {
    /// Uses the given spidev path with default speed and mode.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            spi: SpiConfig::new(path),
            interrupts: None,
        }
    }

    /// Enables interrupt wiring for the masked input pins.
    pub fn with_interrupts(mut self, interrupts: InterruptConfig) -> Self {
        self.interrupts = Some(interrupts);
        self
    }
}

// Register access and the output write-back cache share one lock so a
// read-modify-write on a single pin cannot interleave with another write.
struct Chip {
    spi: SpiTransport,
    // Last value written to Port A. The chip has no single-bit write, so
    // pin-level updates modify this cache and write it back whole;
    // re-reading the register instead would race with interrupts.
    output_cache: u8,
    pull_mode: PullMode,
}

struct Shared {
    chip: Mutex<Chip>,
    inputs_changed: ListenerRegistry<InputsChanged>,
}

impl Shared {
    fn write_register(&self, addr: u8, value: u8) -> Result<()> {
        lock(&self.chip).spi.write_register(addr, value)
    }

    fn read_register(&self, addr: u8) -> Result<u8> {
        lock(&self.chip).spi.read_register(addr)
    }
}

/// A physical PiFace Digital board on the SPI bus.
///
/// Opening the device configures the bus (mode 0, 8 bits/word, 5 MHz by
/// default) and initialises the MCP23S17: hardware addressing on, Port A
/// all-output and zeroed, Port B all-input with pull-ups enabled. With
/// interrupt wiring configured, input changes are reported through the
/// [`IsrPinIo`] listener registry.
pub struct PiFaceDevice {
    shared: Arc<Shared>,
    detector: Option<GpioEdgeDetector>,
}

impl PiFaceDevice {
    /// Opens the board on the default spidev path.
    pub fn open() -> Result<Self> {
        Self::open_with(DeviceConfig::default())
    }

    /// Opens the board on the given spidev path.
    pub fn open_path(path: impl Into<String>) -> Result<Self> {
        Self::open_with(DeviceConfig::new(path))
    }

    /// Opens the board with full configuration.
    pub fn open_with(config: DeviceConfig) -> Result<Self> {
        let spi = SpiTransport::open(&config.spi)?;
        let shared = Arc::new(Shared {
            chip: Mutex::new(Chip {
                spi,
                output_cache: 0,
                pull_mode: PullMode::Off,
            }),
            inputs_changed: ListenerRegistry::new(),
        });
        let device = Self {
            shared,
            detector: None,
        };
        device.initialize()?;

        let mut device = device;
        if let Some(interrupts) = config.interrupts {
            // Interrupt handling only engages with a nonzero mask and a
            // real edge to detect.
            if interrupts.mask > 0 && interrupts.edge != EdgeMode::None {
                device.attach_interrupts(&interrupts)?;
            }
        }
        Ok(device)
    }

    fn initialize(&self) -> Result<()> {
        debug!("initialising MCP23S17");
        self.shared.write_register(reg::IOCON, iocon::HAEN_ON)?;
        self.set_outputs(0)?;
        // Port A drives the outputs, Port B reads the inputs.
        self.shared.write_register(reg::IODIRA, 0x00)?;
        self.shared.write_register(reg::IODIRB, 0xFF)?;
        self.set_pull_mode(PullMode::PullUp)?;
        self.set_outputs(0)?;
        Ok(())
    }

    fn attach_interrupts(&mut self, config: &InterruptConfig) -> Result<()> {
        debug!(
            "enabling interrupts: mask=0x{:02X}, host line {}",
            config.mask, config.pin
        );
        self.shared.write_register(reg::GPINTENB, config.mask)?;
        let detector =
            GpioEdgeDetector::open_with(config.pin, config.edge, config.detector.clone())?;
        let shared = Arc::clone(&self.shared);
        detector.watch_edges(Box::new(move |_| {
            // Reading the latch and data registers also clears the chip's
            // interrupt condition (read-to-clear); the detector clears the
            // host-side condition itself.
            let latch = match shared.read_register(reg::INTFB) {
                Ok(latch) => latch,
                Err(e) => {
                    warn!("failed to read interrupt latch: {}", e);
                    return;
                }
            };
            let states = match shared.read_register(reg::GPIOB) {
                Ok(states) => states,
                Err(e) => {
                    warn!("failed to read input states: {}", e);
                    return;
                }
            };
            shared.inputs_changed.emit(&InputsChanged { latch, states });
        }));
        self.detector = Some(detector);
        Ok(())
    }

    /// Configures the pull resistors on the input port.
    ///
    /// Only [`PullMode::PullUp`] is exercised end to end; `PullDown`
    /// merely disables the pull-ups (the chip has no pull-downs) and makes
    /// `get_input` unavailable.
    pub fn set_pull_mode(&self, mode: PullMode) -> Result<()> {
        let value = match mode {
            PullMode::PullUp => 0xFF,
            PullMode::PullDown => 0x00,
            PullMode::Off => {
                return Err(Error::ArgumentOutOfRange(
                    "pull mode must be PullUp or PullDown".to_string(),
                ))
            }
        };
        let mut chip = lock(&self.shared.chip);
        chip.spi.write_register(reg::GPPUB, value)?;
        chip.pull_mode = mode;
        Ok(())
    }

    /// The currently configured pull mode.
    pub fn pull_mode(&self) -> PullMode {
        lock(&self.shared.chip).pull_mode
    }
}

impl PinIo for PiFaceDevice {
    fn get_output(&self, pin: u8) -> Result<bool> {
        let mask = pin_mask(pin)?;
        let mut chip = lock(&self.shared.chip);
        let state = chip.spi.read_register(reg::GPIOA)?;
        chip.output_cache = state;
        Ok(state & mask == mask)
    }

    fn get_outputs(&self) -> Result<u8> {
        let mut chip = lock(&self.shared.chip);
        let state = chip.spi.read_register(reg::GPIOA)?;
        chip.output_cache = state;
        Ok(state)
    }

    fn set_output(&self, pin: u8, enabled: bool) -> Result<()> {
        let mask = pin_mask(pin)?;
        let mut chip = lock(&self.shared.chip);
        let mut cache = chip.output_cache;
        if enabled {
            cache |= mask;
        } else {
            cache &= !mask;
        }
        chip.spi.write_register(reg::GPIOA, cache)?;
        chip.output_cache = cache;
        Ok(())
    }

    fn set_outputs(&self, bits: u8) -> Result<()> {
        let mut chip = lock(&self.shared.chip);
        chip.spi.write_register(reg::GPIOA, bits)?;
        chip.output_cache = bits;
        Ok(())
    }

    fn get_input(&self, pin: u8) -> Result<bool> {
        let mask = pin_mask(pin)?;
        let mut chip = lock(&self.shared.chip);
        match chip.pull_mode {
            PullMode::PullUp => {
                let state = chip.spi.read_register(reg::GPIOB)?;
                // Active-low wiring: a grounded (pressed) input reads 0.
                Ok(state & mask == 0)
            }
            mode => Err(Error::Unsupported(format!(
                "reading inputs with pull mode {:?} is not implemented",
                mode
            ))),
        }
    }

    fn get_inputs(&self) -> Result<u8> {
        self.shared.read_register(reg::GPIOB)
    }

    fn set_input(&self, _pin: u8, _enabled: bool) -> Result<()> {
        Err(Error::Unsupported(
            "input states of a physical device cannot be set".to_string(),
        ))
    }

    fn set_inputs(&self, _bits: u8) -> Result<()> {
        Err(Error::Unsupported(
            "input states of a physical device cannot be set".to_string(),
        ))
    }
}

impl IsrPinIo for PiFaceDevice {
    fn is_isr_enabled(&self) -> bool {
        self.detector.is_some()
    }

    fn watch_inputs(&self, callback: Box<dyn Fn(&InputsChanged) + Send>) -> ListenerId {
        self.shared.inputs_changed.add(callback)
    }

    fn unwatch_inputs(&self, id: ListenerId) -> bool {
        self.shared.inputs_changed.remove(id)
    }
}

impl Drop for PiFaceDevice {
    fn drop(&mut self) {
        // Best-effort teardown; each step proceeds regardless of the
        // previous one's outcome.
        if self.detector.is_some() {
            if let Err(e) = self.shared.write_register(reg::GPINTENB, 0) {
                warn!("failed to disable chip interrupts: {}", e);
            }
            self.detector = None;
        }
        if let Err(e) = self.set_outputs(0) {
            warn!("failed to zero outputs on close: {}", e);
        }
    }
}
