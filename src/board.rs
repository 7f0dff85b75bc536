/// One remote board: a TCP control channel, a UDP data channel and the
/// observers interested in that board's datagrams.
///
/// Each channel sits behind its own lock so a blocking TCP exchange never
/// holds up datagram dispatch for this or any other board.
use std::net::{Ipv4Addr, UdpSocket};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};

use crate::errors::{MultitorqueError, Result};
use crate::eth_manager::BoardId;
use crate::packet::PacketBuffer;
use crate::tcp_connector::TcpConnector;
use crate::udp_connector::UdpConnector;

/// Observer invoked on the receive thread for every datagram from its board
pub type UdpDatagramHandler = Box<dyn Fn(&PacketBuffer) + Send + Sync>;

/// Token returned on handler installation, used to remove it again
pub type HandlerId = u64;

pub struct Board {
    id: BoardId,
    address: Ipv4Addr,
    tcp_service: bool,
    udp_service: bool,
    tcp: Mutex<TcpConnector>,
    udp: RwLock<UdpConnector>,
    handlers: RwLock<Vec<(HandlerId, UdpDatagramHandler)>>,
    next_handler: AtomicU64,
}

impl Board {
    pub fn new(
        id: BoardId,
        address: Ipv4Addr,
        tcp_service: bool,
        tcp_port: u16,
        udp_service: bool,
        udp_port: u16,
    ) -> Self {
        Self {
            id,
            address,
            tcp_service,
            udp_service,
            tcp: Mutex::new(TcpConnector::new(address, tcp_port)),
            udp: RwLock::new(UdpConnector::new(address, udp_port)),
            handlers: RwLock::new(Vec::new()),
            next_handler: AtomicU64::new(0),
        }
    }

    pub fn with_tcp_read_timeout(self, timeout: Option<Duration>) -> Self {
        let tcp = self.tcp.into_inner().with_read_timeout(timeout);
        Self {
            tcp: Mutex::new(tcp),
            ..self
        }
    }

    /// Open the declared services; UDP only adopts the shared socket
    pub fn connect(&self, socket: &Arc<UdpSocket>) -> Result<()> {
        if self.tcp_service {
            let mut tcp = self.tcp.lock();
            log::info!("Board {} connecting to {}", self.id, tcp.peer());
            tcp.connect()?;
        }
        if self.udp_service {
            self.udp.write().init_data(socket);
        }
        Ok(())
    }

    pub fn send_tcp(&self, packet: &PacketBuffer) -> Result<usize> {
        self.require(self.tcp_service, "tcp")?;
        self.tcp.lock().send(packet.as_bytes())
    }

    /// Receive one reply into `packet`, updating its `size`
    pub fn recv_tcp(&self, packet: &mut PacketBuffer) -> Result<usize> {
        self.require(self.tcp_service, "tcp")?;
        let received = self.tcp.lock().recv(&mut packet.content)?;
        packet.size = received;
        Ok(received)
    }

    pub fn send_udp(&self, packet: &PacketBuffer) -> Result<usize> {
        self.require(self.udp_service, "udp")?;
        self.udp.read().send(packet.as_bytes())
    }

    pub fn install_udp_datagram_handler(&self, handler: UdpDatagramHandler) -> HandlerId {
        let token = self.next_handler.fetch_add(1, Ordering::Relaxed);
        self.handlers.write().push((token, handler));
        token
    }

    /// Drop the handler installed under `token`; false if it is already gone
    pub fn remove_udp_datagram_handler(&self, token: HandlerId) -> bool {
        let mut handlers = self.handlers.write();
        let before = handlers.len();
        handlers.retain(|(installed, _)| *installed != token);
        handlers.len() != before
    }

    /// Fan a datagram out to every handler in registration order
    pub fn on_udp_datagram(&self, packet: &PacketBuffer) {
        for (_, handler) in self.handlers.read().iter() {
            handler(packet);
        }
    }

    pub fn num_handlers(&self) -> usize {
        self.handlers.read().len()
    }

    pub fn id(&self) -> BoardId {
        self.id
    }

    pub fn address(&self) -> Ipv4Addr {
        self.address
    }

    pub fn has_tcp_service(&self) -> bool {
        self.tcp_service
    }

    pub fn has_udp_service(&self) -> bool {
        self.udp_service
    }

    fn require(&self, declared: bool, service: &'static str) -> Result<()> {
        if !declared {
            return Err(MultitorqueError::ServiceUnavailable {
                board: self.id,
                service,
            });
        }
        Ok(())
    }
}

impl std::fmt::Debug for Board {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Board")
            .field("id", &self.id)
            .field("address", &self.address)
            .field("tcp_service", &self.tcp_service)
            .field("udp_service", &self.udp_service)
            .field("handlers", &self.num_handlers())
            .finish()
    }
}
