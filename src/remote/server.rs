//! TCP server exposing a bound device over the wire protocol.

use super::protocol::{self, PacketType};
use crate::controllers::{BackgroundDriver, ControllerState};
use crate::error::{Error, Result};
use crate::events::lock;
use crate::pins::PinIo;
use log::{debug, warn};
use std::io::Read;
use std::net::{SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

/// Sleep between accept/read attempts while idle.
const IDLE_SLEEP: Duration = Duration::from_millis(100);

#[derive(Debug, Default)]
struct Counters {
    messages: AtomicU64,
    responses: AtomicU64,
}

/// Serves one [`PinIo`] instance to remote clients, letting them drive
/// the device as if it were local.
///
/// The accept loop runs on a worker thread with the same
/// Stopped/Running/Stopping lifecycle as the pin controllers, and serves
/// one client at a time: a second client queues in the backlog until the
/// first disconnects. Per-message failures are answered with an empty
/// response and logged; an unrecognised packet type terminates that
/// connection only.
pub struct PiFaceTcpServer {
    device: Arc<dyn PinIo>,
    addr: SocketAddr,
    bound_addr: Arc<Mutex<Option<SocketAddr>>>,
    counters: Arc<Counters>,
    driver: BackgroundDriver,
}

impl PiFaceTcpServer {
    /// Binds a server to a device and a local endpoint. The listening
    /// socket is created by [`start`](Self::start).
    pub fn new(device: Arc<dyn PinIo>, addr: impl ToSocketAddrs) -> Result<Self> {
        let addr = addr
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| Error::ArgumentOutOfRange("no usable socket address".to_string()))?;
        Ok(Self {
            device,
            addr,
            bound_addr: Arc::new(Mutex::new(None)),
            counters: Arc::new(Counters::default()),
            driver: BackgroundDriver::new("tcp server"),
        })
    }

    /// The address actually bound, once running. Useful when the
    /// configured endpoint uses port 0.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        *lock(&self.bound_addr)
    }

    pub fn state(&self) -> ControllerState {
        self.driver.state()
    }

    /// Request frames fully read so far.
    pub fn messages_received(&self) -> u64 {
        self.counters.messages.load(Ordering::SeqCst)
    }

    /// Response frames written so far.
    pub fn responses_sent(&self) -> u64 {
        self.counters.responses.load(Ordering::SeqCst)
    }

    /// Binds the listening socket and spawns the accept loop. Fails with
    /// [`Error::InvalidState`] unless the server is stopped; a bind
    /// failure leaves the state unchanged.
    pub fn start(&self) -> Result<()> {
        if self.driver.state() != ControllerState::Stopped {
            return Err(Error::InvalidState(format!(
                "cannot start a server while {:?}",
                self.driver.state()
            )));
        }
        let listener = TcpListener::bind(self.addr)?;
        listener.set_nonblocking(true)?;
        *lock(&self.bound_addr) = Some(listener.local_addr()?);
        debug!("server listening on {}", listener.local_addr()?);

        let device = Arc::clone(&self.device);
        let counters = Arc::clone(&self.counters);
        let bound_addr = Arc::clone(&self.bound_addr);
        let started = self.driver.start(move |token| {
            while token.is_running() {
                match listener.accept() {
                    Ok((stream, peer)) => {
                        debug!("client connected from {}", peer);
                        if let Err(e) = serve_connection(&stream, &device, &counters, &token) {
                            warn!("connection to {} ended: {}", peer, e);
                        }
                        debug!("client {} disconnected", peer);
                    }
                    Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                        thread::sleep(IDLE_SLEEP);
                    }
                    Err(e) => {
                        warn!("accept failed: {}", e);
                        thread::sleep(IDLE_SLEEP);
                    }
                }
            }
            *lock(&bound_addr) = None;
        });
        if started.is_err() {
            *lock(&self.bound_addr) = None;
        }
        started
    }

    /// Stops the accept loop, blocking until the worker has exited. Fails
    /// with [`Error::InvalidState`] unless the server is running.
    pub fn stop(&self) -> Result<()> {
        self.driver.stop()
    }
}

fn serve_connection(
    mut stream: &TcpStream,
    device: &Arc<dyn PinIo>,
    counters: &Counters,
    token: &crate::controllers::RunToken,
) -> Result<()> {
    while token.is_running() {
        // Nonblocking probe for the next request so a stop request is
        // noticed while the client is idle.
        stream.set_nonblocking(true)?;
        let mut type_byte = [0u8; 1];
        match stream.read(&mut type_byte) {
            Ok(0) => return Ok(()),
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                thread::sleep(IDLE_SLEEP);
                continue;
            }
            Err(e) => return Err(Error::Io(e)),
        }
        stream.set_nonblocking(false)?;

        let packet_type = PacketType::from_byte(type_byte[0])?;
        let payload = protocol::read_request_body(&mut stream)?;
        counters.messages.fetch_add(1, Ordering::SeqCst);

        let mut response = Vec::new();
        if let Err(e) = dispatch(packet_type, &payload, device, &mut response) {
            // The request failed but the framing is intact; answer with
            // an empty response and keep serving this client.
            warn!("{:?} request failed: {}", packet_type, e);
            response.clear();
        }
        protocol::write_response(&mut stream, &response)?;
        counters.responses.fetch_add(1, Ordering::SeqCst);
    }
    Ok(())
}

fn dispatch(
    packet_type: PacketType,
    payload: &[u8],
    device: &Arc<dyn PinIo>,
    response: &mut Vec<u8>,
) -> Result<()> {
    match packet_type {
        PacketType::GetOutputPinState => {
            let pin = protocol::payload_byte(payload, 0)?;
            let state = device.get_output(pin)?;
            response.push(if state { 0 } else { 1 });
        }
        PacketType::GetOutputPinStates => {
            response.push(device.get_outputs()?);
        }
        PacketType::SetOutputPinState => {
            let pin = protocol::payload_byte(payload, 0)?;
            let enabled = protocol::payload_byte(payload, 1)? != 0;
            device.set_output(pin, enabled)?;
        }
        PacketType::SetOutputPinStates => {
            device.set_outputs(protocol::payload_byte(payload, 0)?)?;
        }
        PacketType::GetInputPinState => {
            let pin = protocol::payload_byte(payload, 0)?;
            let state = device.get_input(pin)?;
            response.push(if state { 0 } else { 1 });
        }
        PacketType::GetInputPinStates => {
            response.push(device.get_inputs()?);
        }
        PacketType::SetInputPinState => {
            let pin = protocol::payload_byte(payload, 0)?;
            let enabled = protocol::payload_byte(payload, 1)? != 0;
            device.set_input(pin, enabled)?;
        }
        PacketType::SetInputPinStates => {
            device.set_inputs(protocol::payload_byte(payload, 0)?)?;
        }
    }
    Ok(())
}
