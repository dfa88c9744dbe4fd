use thiserror::Error;

/// Errors that can occur when driving a PiFace Digital board.
///
/// This enum covers all failure conditions across the SPI transport, the
/// sysfs edge detector, background pin controllers, and the TCP remote
/// protocol.
#[derive(Error, Debug)]
pub enum Error {
    /// General I/O error from the underlying platform call.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Failed to open a device or control file.
    #[error("failed to open '{path}': {source}")]
    OpenFailed {
        /// Path that could not be opened.
        path: String,
        /// Underlying OS error.
        source: std::io::Error,
    },
    /// Failed to configure a bus parameter (mode, word size, speed).
    #[error("failed to set SPI {what}: {source}")]
    SpiSetup {
        /// Parameter being configured.
        what: &'static str,
        /// Underlying OS error.
        source: std::io::Error,
    },
    /// A full-duplex bus exchange failed.
    #[error("SPI transfer failed: {0}")]
    SpiTransfer(std::io::Error),
    /// Pin number is outside the valid range for the board.
    #[error("pin {pin} out of range (0-7)")]
    PinOutOfRange {
        /// The invalid pin number.
        pin: u8,
    },
    /// Function argument is outside the valid range.
    #[error("argument out of range: {0}")]
    ArgumentOutOfRange(String),
    /// A lifecycle transition was requested from the wrong state.
    #[error("invalid state: {0}")]
    InvalidState(String),
    /// The operation is not supported by this device variant or mode.
    #[error("unsupported operation: {0}")]
    Unsupported(String),
    /// The remote peer sent a packet type outside the known set.
    #[error("unknown packet type 0x{0:02X}")]
    UnknownPacketType(u8),
    /// A wire frame ended before its declared payload.
    #[error("short frame: expected {expected} bytes, got {actual}")]
    ShortFrame {
        /// Bytes the frame header promised.
        expected: usize,
        /// Bytes actually available.
        actual: usize,
    },
    /// The remote peer closed the connection mid-exchange.
    #[error("peer disconnected")]
    Disconnected,
}

/// Result type alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
