/// Ethernet interface manager - boards, the shared UDP socket and the
/// receive thread
///
/// The manager owns one broadcast-capable UDP socket bound to the local
/// interface. Every board sends its streaming datagrams to that socket; the
/// receive thread attributes each datagram to a board by source address,
/// fans it out to the board's handlers and runs a liveness sweep over all
/// boards. TCP transactions run synchronously on the caller's thread.
///
/// # Lifecycle
/// `add_board`/`install_*` → `bind` → `connect_all` → `start_recv_thread`
/// → `stop_recv_thread` → drop. `connect_all` binds if needed. Dropping the
/// manager stops the thread before the socket is closed, so no handler runs
/// once destruction has begun.
///
/// # Locking
/// The board table is a `RwLock<Vec<Arc<Board>>>` held only long enough to
/// clone a board handle out of it; only `add_board` writes it. Socket I/O
/// and handler calls happen after the table lock is released, under the
/// board's own TCP, UDP or handler lock. Timeout handlers are always called
/// with no lock held.
use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr, SocketAddrV4, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::{Mutex, RwLock};

use crate::board::{Board, HandlerId};
use crate::config::ManagerConfig;
use crate::errors::{MultitorqueError, Result};
use crate::packet::PacketBuffer;
use crate::{DEFAULT_TIMEOUT, MAX_NUM_BOARDS};

/// Index of a board inside its manager, in registration order
pub type BoardId = usize;

/// Reported to the timeout handler when a poll sees no traffic at all
pub const NO_TRAFFIC_BOARD_ID: BoardId = 99;

/// Liveness callback, invoked with the silent board's id
pub type TimeoutHandler = Arc<dyn Fn(BoardId) + Send + Sync>;

struct Shared {
    local: SocketAddrV4,
    timeout: Duration,
    boards: RwLock<Vec<Arc<Board>>>,
    last_seen: Mutex<Vec<Instant>>,
    timeout_handler: RwLock<Option<TimeoutHandler>>,
    socket: RwLock<Option<Arc<UdpSocket>>>,
    running: AtomicBool,
}

impl Shared {
    fn socket(&self) -> Result<Arc<UdpSocket>> {
        self.socket.read().clone().ok_or(MultitorqueError::NotBound)
    }

    fn notify_timeout(&self, board: BoardId) {
        let handler = self.timeout_handler.read().clone();
        if let Some(handler) = handler {
            handler(board);
        }
    }

    fn recv_udp(&self, packet: &mut PacketBuffer) -> Result<usize> {
        let socket = self.socket()?;

        let (received, sender) = match socket.recv_from(&mut packet.content) {
            Ok(datagram) => datagram,
            Err(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) => {
                log::trace!("No datagram within {:?}", self.timeout);
                self.notify_timeout(NO_TRAFFIC_BOARD_ID);
                return Err(MultitorqueError::RecvTimeout);
            }
            Err(e) => return Err(e.into()),
        };
        packet.size = received;

        self.dispatch(sender, packet);
        self.sweep();

        Ok(received)
    }

    /// Hand the datagram to every board registered at the sender's address
    fn dispatch(&self, sender: SocketAddr, packet: &PacketBuffer) {
        let IpAddr::V4(sender_ip) = sender.ip() else {
            log::debug!("Ignoring datagram from non-IPv4 sender {}", sender);
            return;
        };

        let targets: Vec<Arc<Board>> = self
            .boards
            .read()
            .iter()
            .filter(|b| b.address() == sender_ip)
            .cloned()
            .collect();

        if targets.is_empty() {
            log::debug!("Datagram from unknown sender {}", sender);
            return;
        }

        for board in targets {
            if let Some(seen) = self.last_seen.lock().get_mut(board.id()) {
                *seen = Instant::now();
            }
            board.on_udp_datagram(packet);
        }
    }

    fn board(&self, board: BoardId) -> Result<Arc<Board>> {
        self.boards
            .read()
            .get(board)
            .cloned()
            .ok_or(MultitorqueError::InvalidBoardId(board))
    }

    fn sweep(&self) {
        let now = Instant::now();
        let expired: Vec<BoardId> = self
            .last_seen
            .lock()
            .iter()
            .enumerate()
            .filter(|(_, seen)| now.duration_since(**seen) > self.timeout)
            .map(|(id, _)| id)
            .collect();

        for board in expired {
            log::warn!("Board {} silent for more than {:?}", board, self.timeout);
            self.notify_timeout(board);
        }
    }

    fn receive_loop(&self) {
        let mut packet = PacketBuffer::new();
        while self.running.load(Ordering::Acquire) {
            match self.recv_udp(&mut packet) {
                Ok(_) | Err(MultitorqueError::RecvTimeout) => {}
                Err(e) => {
                    log::error!("UDP receive failed: {}", e);
                    // Keep the flag check periodic even if the socket errors immediately
                    thread::sleep(self.timeout);
                }
            }
        }
    }
}

pub struct EthInterfaceManager {
    shared: Arc<Shared>,
    recv_thread: Mutex<Option<JoinHandle<()>>>,
    tcp_read_timeout: Option<Duration>,
}

impl EthInterfaceManager {
    /// Manager for boards reached through `local_address:port`
    pub fn new(local_address: Ipv4Addr, port: u16) -> Self {
        Self {
            shared: Arc::new(Shared {
                local: SocketAddrV4::new(local_address, port),
                timeout: DEFAULT_TIMEOUT,
                boards: RwLock::new(Vec::with_capacity(MAX_NUM_BOARDS)),
                last_seen: Mutex::new(Vec::with_capacity(MAX_NUM_BOARDS)),
                timeout_handler: RwLock::new(None),
                socket: RwLock::new(None),
                running: AtomicBool::new(false),
            }),
            recv_thread: Mutex::new(None),
            tcp_read_timeout: None,
        }
    }

    /// Receive poll timeout, also the liveness threshold
    ///
    /// Only effective before the receive thread is started. A socket that is
    /// already bound picks up the new read timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        let Some(shared) = Arc::get_mut(&mut self.shared) else {
            log::warn!("Timeout change ignored while the receive thread runs");
            return self;
        };

        if let Some(socket) = shared.socket.get_mut() {
            if let Err(e) = socket.set_read_timeout(Some(timeout)) {
                log::warn!("Timeout change ignored, read timeout not applied: {}", e);
                return self;
            }
        }
        shared.timeout = timeout;
        self
    }

    /// Read timeout applied to the TCP channel of boards added afterwards
    pub fn with_tcp_read_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.tcp_read_timeout = timeout;
        self
    }

    /// Build a manager and register every configured board in file order
    pub fn from_config(config: &ManagerConfig) -> Result<Self> {
        config.validate()?;

        let manager = Self::new(config.local_ip()?, config.port)
            .with_timeout(config.timeout())
            .with_tcp_read_timeout(config.sensor.tcp_read_timeout());

        for board in &config.boards {
            manager.add_board(
                board.ip()?,
                board.tcp_service,
                board.tcp_port,
                board.udp_service,
                board.udp_port,
            )?;
        }
        Ok(manager)
    }

    /// Register a board; fails once `MAX_NUM_BOARDS` are configured
    pub fn add_board(
        &self,
        address: Ipv4Addr,
        tcp_service: bool,
        tcp_port: u16,
        udp_service: bool,
        udp_port: u16,
    ) -> Result<BoardId> {
        let mut boards = self.shared.boards.write();
        if boards.len() >= MAX_NUM_BOARDS {
            return Err(MultitorqueError::BoardLimitReached);
        }

        let id = boards.len();
        let board = Board::new(id, address, tcp_service, tcp_port, udp_service, udp_port)
            .with_tcp_read_timeout(self.tcp_read_timeout);
        boards.push(Arc::new(board));
        self.shared.last_seen.lock().push(Instant::now());

        log::debug!("Board {} added at {}", id, address);
        Ok(id)
    }

    /// Open the broadcast socket on the local interface; a no-op once bound
    pub fn bind(&self) -> Result<()> {
        let mut slot = self.shared.socket.write();
        if slot.is_some() {
            return Ok(());
        }

        let socket = UdpSocket::bind(self.shared.local).map_err(|e| {
            MultitorqueError::Transport(format!("bind {} failed: {}", self.shared.local, e))
        })?;
        socket
            .set_broadcast(true)
            .map_err(|e| MultitorqueError::Transport(format!("SO_BROADCAST: {}", e)))?;
        socket
            .set_read_timeout(Some(self.shared.timeout))
            .map_err(|e| MultitorqueError::Transport(format!("read timeout: {}", e)))?;

        let bound = socket.local_addr()?;
        log::info!("Broadcast socket bound on {}", bound);
        *slot = Some(Arc::new(socket));
        Ok(())
    }

    /// Bind, then connect every board in registration order
    ///
    /// Stops at the first board that fails and returns its error.
    pub fn connect_all(&self) -> Result<()> {
        self.bind()?;
        let socket = self.shared.socket()?;

        let boards = self.shared.boards.read().clone();
        for board in &boards {
            if let Err(e) = board.connect(&socket) {
                log::warn!("Board {} connect failed: {}", board.id(), e);
                return Err(e);
            }
        }
        Ok(())
    }

    /// Wait up to the poll timeout for one datagram and process it
    ///
    /// On timeout the handler is told [`NO_TRAFFIC_BOARD_ID`] and
    /// `RecvTimeout` is returned. On data the sender's boards get the
    /// datagram, then every board silent for longer than the timeout is
    /// reported to the handler.
    pub fn recv_udp(&self, packet: &mut PacketBuffer) -> Result<usize> {
        self.shared.recv_udp(packet)
    }

    /// Install the liveness callback and restart every board's silence clock
    pub fn install_timeout_handler<F>(&self, handler: F)
    where
        F: Fn(BoardId) + Send + Sync + 'static,
    {
        *self.shared.timeout_handler.write() = Some(Arc::new(handler));

        let now = Instant::now();
        for seen in self.shared.last_seen.lock().iter_mut() {
            *seen = now;
        }
    }

    /// Append a datagram observer for `board`, returning its removal token
    pub fn install_udp_datagram_handler<F>(&self, board: BoardId, handler: F) -> Result<HandlerId>
    where
        F: Fn(&PacketBuffer) + Send + Sync + 'static,
    {
        let board = self.shared.board(board)?;
        Ok(board.install_udp_datagram_handler(Box::new(handler)))
    }

    /// Remove an observer; `Ok(false)` if it was already removed
    pub fn remove_udp_datagram_handler(&self, board: BoardId, handler: HandlerId) -> Result<bool> {
        let board = self.shared.board(board)?;
        Ok(board.remove_udp_datagram_handler(handler))
    }

    pub fn num_udp_datagram_handlers(&self, board: BoardId) -> Result<usize> {
        Ok(self.shared.board(board)?.num_handlers())
    }

    pub fn send_tcp_from_board(&self, board: BoardId, packet: &PacketBuffer) -> Result<usize> {
        self.with_board(board, |b| b.send_tcp(packet))
    }

    pub fn recv_tcp_from_board(&self, board: BoardId, packet: &mut PacketBuffer) -> Result<usize> {
        self.with_board(board, |b| b.recv_tcp(packet))
    }

    pub fn send_udp_from_board(&self, board: BoardId, packet: &PacketBuffer) -> Result<usize> {
        self.with_board(board, |b| b.send_udp(packet))
    }

    /// Spawn the receive loop; requires a bound socket
    pub fn start_recv_thread(&self) -> Result<()> {
        self.shared.socket()?;

        let mut slot = self.recv_thread.lock();
        if slot.is_some() {
            return Ok(());
        }

        self.shared.running.store(true, Ordering::Release);
        let shared = Arc::clone(&self.shared);
        let handle = thread::Builder::new()
            .name("multitorque-recv".to_string())
            .spawn(move || shared.receive_loop())
            .map_err(|e| {
                self.shared.running.store(false, Ordering::Release);
                MultitorqueError::Transport(format!("receive thread: {}", e))
            })?;

        log::info!("Receive thread started");
        *slot = Some(handle);
        Ok(())
    }

    /// Clear the loop flag and join; safe when the thread never started
    ///
    /// Returns within roughly one poll timeout.
    pub fn stop_recv_thread(&self) {
        self.shared.running.store(false, Ordering::Release);

        if let Some(handle) = self.recv_thread.lock().take() {
            if handle.join().is_err() {
                log::error!("Receive thread panicked");
            }
            log::info!("Receive thread stopped");
        }
    }

    pub fn is_receiving(&self) -> bool {
        self.recv_thread.lock().is_some()
    }

    pub fn num_boards(&self) -> usize {
        self.shared.boards.read().len()
    }

    /// Address the broadcast socket is bound to
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.shared.socket()?.local_addr()?)
    }

    pub fn timeout(&self) -> Duration {
        self.shared.timeout
    }

    /// Run `f` on a board handle with the board table already released
    fn with_board<T>(&self, board: BoardId, f: impl FnOnce(&Board) -> Result<T>) -> Result<T> {
        let board = self.shared.board(board)?;
        f(&board)
    }
}

impl Drop for EthInterfaceManager {
    fn drop(&mut self) {
        self.stop_recv_thread();
        self.shared.socket.write().take();
    }
}
