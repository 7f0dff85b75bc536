/// Multitorque - force/torque sensor boards over Ethernet
///
/// This library implements the Multitorque wire protocol spoken by
/// six-axis force/torque sensor boards, and the host side of the link:
/// TCP request/reply for configuration, UDP for the sample stream.
///
/// # Layers
/// - `base_types`, `header`, `codec`, `messages`: the positional binary
///   codec and the 40-message catalog
/// - `tcp_connector`, `udp_connector`, `board`, `eth_manager`: sockets,
///   datagram fan-out and board liveness supervision
/// - `ft_sensor`: per-board facade (streaming data, calibration, network
///   and inventory configuration)
///
/// Logging goes through the `log` facade; no logger is installed here.

pub mod errors;
pub mod base_types;
pub mod header;
pub mod codec;
pub mod messages;
pub mod packet;
pub mod tcp_connector;
pub mod udp_connector;
pub mod board;
pub mod eth_manager;
pub mod ft_sensor;
pub mod netutil;
pub mod config;

use std::time::Duration;

pub use board::HandlerId;
pub use codec::{check_message_consistency, Decoded, WireMessage};
pub use config::{BoardConfig, ManagerConfig, SensorConfig};
pub use errors::{MultitorqueError, Result};
pub use eth_manager::{BoardId, EthInterfaceManager, NO_TRAFFIC_BOARD_ID};
pub use ft_sensor::{CalibrationLimits, FtSensor, FtSensorData, InventoryData, MacAddress};
pub use messages::{Message, MessageId, ProtocolVersion};
pub use packet::PacketBuffer;

/// Largest frame exchanged on either transport
pub const PACKET_MAX_SIZE: usize = 256;

/// Boards per manager
pub const MAX_NUM_BOARDS: usize = 4;

/// Value of the header version field
pub const ENCODING_TYPE: u8 = 1;

pub const PROTOCOL_VERSION: ProtocolVersion = ProtocolVersion::Release;

/// Receive poll timeout and liveness threshold
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(50);

/// Port boards listen on for both services
pub const DEFAULT_PORT: u16 = 64321;
