//! Wire framing for the TCP remote protocol.
//!
//! Requests are `{type: u8, length: u8, payload}`; responses reuse the
//! same framing without the type byte (the type is implicit from the
//! request being answered). Single-pin GET responses carry an inverted
//! boolean byte: `0` means the pin is set.

use crate::error::{Error, Result};
use log::trace;
use std::io::{Read, Write};

/// The eight request kinds a server dispatches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PacketType {
    GetOutputPinState = 0,
    GetOutputPinStates = 1,
    SetOutputPinState = 2,
    SetOutputPinStates = 3,
    GetInputPinState = 4,
    GetInputPinStates = 5,
    SetInputPinState = 6,
    SetInputPinStates = 7,
}

impl PacketType {
    /// Decodes a wire byte, failing on anything outside the known set.
    pub fn from_byte(byte: u8) -> Result<Self> {
        Ok(match byte {
            0 => PacketType::GetOutputPinState,
            1 => PacketType::GetOutputPinStates,
            2 => PacketType::SetOutputPinState,
            3 => PacketType::SetOutputPinStates,
            4 => PacketType::GetInputPinState,
            5 => PacketType::GetInputPinStates,
            6 => PacketType::SetInputPinState,
            7 => PacketType::SetInputPinStates,
            other => return Err(Error::UnknownPacketType(other)),
        })
    }
}

fn read_exact(reader: &mut impl Read, buf: &mut [u8]) -> Result<()> {
    reader.read_exact(buf).map_err(|e| {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            Error::Disconnected
        } else {
            Error::Io(e)
        }
    })
}

/// Writes one request frame.
pub(crate) fn write_request(
    writer: &mut impl Write,
    packet_type: PacketType,
    payload: &[u8],
) -> Result<()> {
    debug_assert!(payload.len() <= u8::MAX as usize);
    trace!("request {:?}, {} payload bytes", packet_type, payload.len());
    writer.write_all(&[packet_type as u8, payload.len() as u8])?;
    writer.write_all(payload)?;
    writer.flush()?;
    Ok(())
}

/// Reads one request frame's length and payload; the type byte has
/// already been consumed by the caller.
pub(crate) fn read_request_body(reader: &mut impl Read) -> Result<Vec<u8>> {
    let mut length = [0u8; 1];
    read_exact(reader, &mut length)?;
    let mut payload = vec![0u8; length[0] as usize];
    read_exact(reader, &mut payload)?;
    Ok(payload)
}

/// Writes one response frame.
pub(crate) fn write_response(writer: &mut impl Write, payload: &[u8]) -> Result<()> {
    debug_assert!(payload.len() <= u8::MAX as usize);
    trace!("response, {} payload bytes", payload.len());
    writer.write_all(&[payload.len() as u8])?;
    writer.write_all(payload)?;
    writer.flush()?;
    Ok(())
}

/// Reads one response frame.
pub(crate) fn read_response(reader: &mut impl Read) -> Result<Vec<u8>> {
    let mut length = [0u8; 1];
    read_exact(reader, &mut length)?;
    let mut payload = vec![0u8; length[0] as usize];
    read_exact(reader, &mut payload)?;
    Ok(payload)
}

/// Returns the payload byte at `index`, or a short-frame error.
pub(crate) fn payload_byte(payload: &[u8], index: usize) -> Result<u8> {
    payload.get(index).copied().ok_or(Error::ShortFrame {
        expected: index + 1,
        actual: payload.len(),
    })
}
