/// TCP request/reply channel to one board
use std::io::{Read, Write};
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4, TcpStream};
use std::time::Duration;

use crate::errors::{MultitorqueError, Result};

/// Blocking stream connector; `send`/`recv` are thin pass-throughs
#[derive(Debug)]
pub struct TcpConnector {
    peer: SocketAddr,
    read_timeout: Option<Duration>,
    stream: Option<TcpStream>,
}

impl TcpConnector {
    pub fn new(address: Ipv4Addr, port: u16) -> Self {
        Self {
            peer: SocketAddr::V4(SocketAddrV4::new(address, port)),
            read_timeout: None,
            stream: None,
        }
    }

    /// Bound every `recv` by `timeout`; `None` blocks indefinitely
    pub fn with_read_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.read_timeout = timeout;
        self
    }

    pub fn connect(&mut self) -> Result<()> {
        let stream = TcpStream::connect(self.peer).map_err(|e| {
            MultitorqueError::Transport(format!("connect to {} failed: {}", self.peer, e))
        })?;
        stream
            .set_read_timeout(self.read_timeout)
            .map_err(|e| MultitorqueError::Transport(format!("read timeout: {}", e)))?;
        // Frames are small request/reply pairs
        stream
            .set_nodelay(true)
            .map_err(|e| MultitorqueError::Transport(format!("nodelay: {}", e)))?;

        self.stream = Some(stream);
        Ok(())
    }

    pub fn send(&self, bytes: &[u8]) -> Result<usize> {
        let mut stream: &TcpStream = self.stream()?;
        Ok(stream.write(bytes)?)
    }

    /// Read what is available; an orderly shutdown by the peer is an error
    pub fn recv(&self, buffer: &mut [u8]) -> Result<usize> {
        let mut stream: &TcpStream = self.stream()?;
        match stream.read(buffer)? {
            0 if !buffer.is_empty() => Err(MultitorqueError::Transport(format!(
                "{} closed the connection",
                self.peer
            ))),
            received => Ok(received),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    fn stream(&self) -> Result<&TcpStream> {
        self.stream
            .as_ref()
            .ok_or_else(|| MultitorqueError::Transport(format!("{} not connected", self.peer)))
    }
}
