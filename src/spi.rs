//! Register-level SPI transport for the MCP23S17.
//!
//! Every register access is one synchronous full-duplex exchange of a
//! 3-byte frame `{command, register, value}`. The chip clocks a byte out
//! for every byte clocked in, so a read extracts the third received byte
//! and discards the two leading dummy bytes.

use crate::consts;
use crate::error::{Error, Result};
use crate::sys;
use log::{debug, trace};
use std::fs::{File, OpenOptions};
use std::os::unix::io::AsRawFd;

/// Configuration for opening the SPI transport.
#[derive(Debug, Clone)]
pub struct SpiConfig {
    /// Device path (e.g. `/dev/spidev0.0`).
    pub path: String,
    /// Clock speed in Hz.
    pub speed_hz: u32,
    /// SPI mode (0-3).
    pub mode: u8,
}

impl Default for SpiConfig {
    fn default() -> Self {
        Self {
            path: consts::DEFAULT_SPI_PATH.to_string(),
            speed_hz: consts::DEFAULT_SPEED_HZ,
            mode: 0,
        }
    }
}

impl SpiConfig {
    /// Creates a configuration for the given device path with default
    /// speed and mode.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    /// Sets the clock speed in Hz.
    pub fn with_speed(mut self, speed_hz: u32) -> Self {
        self.speed_hz = speed_hz;
        self
    }

    /// Sets the SPI mode (0-3).
    pub fn with_mode(mut self, mode: u8) -> Self {
        self.mode = mode;
        self
    }
}

/// An open spidev handle plus the fixed bus parameters it was configured
/// with.
#[derive(Debug)]
pub struct SpiTransport {
    file: File,
    speed_hz: u32,
}

impl SpiTransport {
    /// Opens the bus device and applies mode, word size, and speed.
    /// Construction fails if any of the three cannot be set.
    pub fn open(config: &SpiConfig) -> Result<Self> {
        debug!("opening SPI device {}", config.path);
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&config.path)
            .map_err(|source| Error::OpenFailed {
                path: config.path.clone(),
                source,
            })?;
        let fd = file.as_raw_fd();
        sys::spi_set_mode(fd, config.mode).map_err(|source| Error::SpiSetup {
            what: "mode",
            source,
        })?;
        sys::spi_set_bits_per_word(fd, 8).map_err(|source| Error::SpiSetup {
            what: "bits per word",
            source,
        })?;
        sys::spi_set_max_speed_hz(fd, config.speed_hz).map_err(|source| Error::SpiSetup {
            what: "max speed",
            source,
        })?;
        debug!(
            "opened {} (mode={}, speed={} kHz)",
            config.path,
            config.mode,
            config.speed_hz / 1000
        );
        Ok(Self {
            file,
            speed_hz: config.speed_hz,
        })
    }

    /// Writes one byte to a chip register.
    pub fn write_register(&mut self, addr: u8, value: u8) -> Result<()> {
        trace!("write reg 0x{:02X} = 0x{:02X}", addr, value);
        self.transfer([consts::CMD_WRITE, addr, value])?;
        Ok(())
    }

    /// Reads one byte from a chip register.
    pub fn read_register(&mut self, addr: u8) -> Result<u8> {
        let rx = self.transfer([consts::CMD_READ, addr, 0])?;
        trace!("read reg 0x{:02X} = 0x{:02X}", addr, rx[2]);
        Ok(rx[2])
    }

    fn transfer(&mut self, tx: [u8; 3]) -> Result<[u8; 3]> {
        let mut rx = [0u8; 3];
        sys::spi_transfer(self.file.as_raw_fd(), &tx, &mut rx, self.speed_hz)
            .map_err(Error::SpiTransfer)?;
        Ok(rx)
    }
}
