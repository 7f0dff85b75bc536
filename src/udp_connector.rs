/// Unicast UDP sender towards one board
///
/// The connector never creates a socket of its own. It is initialised with a
/// weak handle on the manager's bound broadcast socket, so it can neither
/// close that socket nor keep it alive once the manager has dropped it.
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4, UdpSocket};
use std::sync::{Arc, Weak};

use crate::errors::{MultitorqueError, Result};

#[derive(Debug)]
pub struct UdpConnector {
    destination: SocketAddr,
    socket: Weak<UdpSocket>,
}

impl UdpConnector {
    pub fn new(address: Ipv4Addr, port: u16) -> Self {
        Self {
            destination: SocketAddr::V4(SocketAddrV4::new(address, port)),
            socket: Weak::new(),
        }
    }

    /// Adopt the shared socket used for sending
    pub fn init_data(&mut self, socket: &Arc<UdpSocket>) {
        self.socket = Arc::downgrade(socket);
    }

    pub fn send(&self, bytes: &[u8]) -> Result<usize> {
        let socket = self.socket.upgrade().ok_or(MultitorqueError::NotBound)?;
        Ok(socket.send_to(bytes, self.destination)?)
    }

    pub fn destination(&self) -> SocketAddr {
        self.destination
    }
}
