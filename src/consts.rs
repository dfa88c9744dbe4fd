//! Internal constants, register addresses, and bit definitions.

/// Default spidev character device the PiFace Digital board hangs off.
pub const DEFAULT_SPI_PATH: &str = "/dev/spidev0.0";

/// Default SPI clock speed in Hz (5 MHz).
pub const DEFAULT_SPEED_HZ: u32 = 5_000_000;

/// Default host GPIO line wired to the board's interrupt output.
pub const DEFAULT_INTERRUPT_PIN: u8 = 25;

/// Default sysfs GPIO control directory.
pub const DEFAULT_GPIO_ROOT: &str = "/sys/class/gpio";

// --- SPI Frame Commands ---
// First byte of every 3-byte bus frame: device opcode 0x40 with the
// hardware-address bits zero and the R/W bit in bit 0.
pub const CMD_WRITE: u8 = 0x40;
pub const CMD_READ: u8 = 0x41;

// --- MCP23S17 Register Addresses (BANK=0 layout) ---
// See https://github.com/piface/pifacecommon/blob/master/pifacecommon/mcp23s17.py
#[allow(dead_code)]
pub mod reg {
    /// I/O direction A
    pub const IODIRA: u8 = 0x00;
    /// I/O direction B
    pub const IODIRB: u8 = 0x01;
    /// Input polarity A
    pub const IPOLA: u8 = 0x02;
    /// Input polarity B
    pub const IPOLB: u8 = 0x03;
    /// Interrupt enable A
    pub const GPINTENA: u8 = 0x04;
    /// Interrupt enable B
    pub const GPINTENB: u8 = 0x05;
    /// Interrupt compare default A
    pub const DEFVALA: u8 = 0x06;
    /// Interrupt compare default B
    pub const DEFVALB: u8 = 0x07;
    /// Interrupt control A
    pub const INTCONA: u8 = 0x08;
    /// Interrupt control B
    pub const INTCONB: u8 = 0x09;
    /// I/O configuration (mirrored at 0x0B)
    pub const IOCON: u8 = 0x0A;
    /// Port A pull-ups
    pub const GPPUA: u8 = 0x0C;
    /// Port B pull-ups
    pub const GPPUB: u8 = 0x0D;
    /// Interrupt flag A (which pin raised the interrupt)
    pub const INTFA: u8 = 0x0E;
    /// Interrupt flag B
    pub const INTFB: u8 = 0x0F;
    /// Interrupt capture A (port value at interrupt time)
    pub const INTCAPA: u8 = 0x10;
    /// Interrupt capture B
    pub const INTCAPB: u8 = 0x11;
    /// Port A data
    pub const GPIOA: u8 = 0x12;
    /// Port B data
    pub const GPIOB: u8 = 0x13;
    /// Output latch A
    pub const OLATA: u8 = 0x14;
    /// Output latch B
    pub const OLATB: u8 = 0x15;
}

// --- IOCON Register Flags ---
#[allow(dead_code)]
pub mod iocon {
    /// Split registers into two banks
    pub const BANK_ON: u8 = 0x80;
    /// Mirror the INTA/INTB pins
    pub const INT_MIRROR_ON: u8 = 0x40;
    /// Disable the incrementing address pointer
    pub const SEQOP_OFF: u8 = 0x20;
    /// Disable slew rate control on SDA
    pub const DISSLW_ON: u8 = 0x10;
    /// Enable hardware addressing
    pub const HAEN_ON: u8 = 0x08;
    /// Open-drain interrupt output
    pub const ODR_ON: u8 = 0x04;
    /// Active-high interrupt polarity
    pub const INTPOL_HIGH: u8 = 0x02;
}
