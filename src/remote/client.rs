//! TCP client implementing the pin interface against a remote server.

use super::protocol::{self, PacketType};
use crate::error::{Error, Result};
use crate::events::lock;
use crate::pins::{pin_mask, PinIo};
use log::debug;
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::sync::Mutex;

/// Drives a remote PiFace device over TCP as if it were local.
///
/// Every [`PinIo`] call sends one request frame and blocks until the
/// matching response arrives; there is no pipelining, and concurrent
/// calls on one client serialize on an internal lock.
pub struct PiFaceTcpClient {
    stream: Mutex<TcpStream>,
}

impl PiFaceTcpClient {
    /// Connects to a server endpoint.
    pub fn connect(addr: impl ToSocketAddrs) -> Result<Self> {
        let stream = TcpStream::connect(addr)?;
        debug!("connected to {}", stream.peer_addr()?);
        Ok(Self {
            stream: Mutex::new(stream),
        })
    }

    /// Shuts the connection down. Further calls fail with an I/O error.
    pub fn disconnect(&self) -> Result<()> {
        lock(&self.stream).shutdown(Shutdown::Both)?;
        Ok(())
    }

    fn exchange(&self, packet_type: PacketType, payload: &[u8]) -> Result<Vec<u8>> {
        let mut stream = lock(&self.stream);
        protocol::write_request(&mut *stream, packet_type, payload)?;
        protocol::read_response(&mut *stream)
    }

    // Single-pin GET responses put 0 on the wire for a set pin.
    fn exchange_pin_state(&self, packet_type: PacketType, pin: u8) -> Result<bool> {
        pin_mask(pin)?;
        let response = self.exchange(packet_type, &[pin])?;
        if response.is_empty() {
            return Err(Error::ShortFrame {
                expected: 1,
                actual: 0,
            });
        }
        Ok(response[0] == 0)
    }

    fn exchange_states(&self, packet_type: PacketType) -> Result<u8> {
        let response = self.exchange(packet_type, &[])?;
        protocol::payload_byte(&response, 0)
    }
}

impl PinIo for PiFaceTcpClient {
    fn get_output(&self, pin: u8) -> Result<bool> {
        self.exchange_pin_state(PacketType::GetOutputPinState, pin)
    }

    fn get_outputs(&self) -> Result<u8> {
        self.exchange_states(PacketType::GetOutputPinStates)
    }

    fn set_output(&self, pin: u8, enabled: bool) -> Result<()> {
        pin_mask(pin)?;
        self.exchange(PacketType::SetOutputPinState, &[pin, enabled as u8])?;
        Ok(())
    }

    fn set_outputs(&self, bits: u8) -> Result<()> {
        self.exchange(PacketType::SetOutputPinStates, &[bits])?;
        Ok(())
    }

    fn get_input(&self, pin: u8) -> Result<bool> {
        self.exchange_pin_state(PacketType::GetInputPinState, pin)
    }

    fn get_inputs(&self) -> Result<u8> {
        self.exchange_states(PacketType::GetInputPinStates)
    }

    fn set_input(&self, pin: u8, enabled: bool) -> Result<()> {
        pin_mask(pin)?;
        self.exchange(PacketType::SetInputPinState, &[pin, enabled as u8])?;
        Ok(())
    }

    fn set_inputs(&self, bits: u8) -> Result<()> {
        self.exchange(PacketType::SetInputPinStates, &[bits])?;
        Ok(())
    }
}
