//! Remote control of a device over TCP.
//!
//! A [`PiFaceTcpServer`] fronts any [`PinIo`](crate::pins::PinIo)
//! instance (typically the physical device or the emulator) and serves a
//! minimal binary request/response protocol; a [`PiFaceTcpClient`]
//! implements `PinIo` by issuing those requests, so remote and local
//! devices are interchangeable to callers.

mod client;
mod protocol;
mod server;

pub use client::PiFaceTcpClient;
pub use protocol::PacketType;
pub use server::PiFaceTcpServer;
