/// Error types for the Multitorque protocol and transport layers
///
/// Every failure in the core is reported through a return value; the only
/// asynchronous failure channel is the board liveness callback installed on
/// the `EthInterfaceManager`.
use std::io;

use crate::eth_manager::BoardId;

/// Result type alias for Multitorque operations
pub type Result<T> = std::result::Result<T, MultitorqueError>;

/// Multitorque error enumeration
///
/// Covers the failure modes of the stack:
/// - Codec capacity violations
/// - Socket setup and I/O failures
/// - Protocol-level violations (wrong reply, unknown id or enumerator)
/// - Hardware validation after offset calibration
#[derive(Debug, thiserror::Error)]
pub enum MultitorqueError {
    /// Buffer too small for the requested encode/decode
    #[error("Buffer too small: required {required}, available {available}")]
    BufferTooSmall { required: usize, available: usize },

    /// I/O error (socket send/receive failure)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Socket creation, option, bind or connect failure
    #[error("Transport error: {0}")]
    Transport(String),

    /// The board does not declare the requested service
    #[error("Board {board} has no {service} service")]
    ServiceUnavailable {
        board: BoardId,
        service: &'static str,
    },

    /// Board index outside the configured range
    #[error("Invalid board id: {0}")]
    InvalidBoardId(BoardId),

    /// The manager already holds the maximum number of boards
    #[error("Board limit reached ({} boards)", crate::MAX_NUM_BOARDS)]
    BoardLimitReached,

    /// UDP receive attempted before the broadcast socket was bound
    #[error("Broadcast socket not bound")]
    NotBound,

    /// No datagram arrived within the poll timeout
    #[error("UDP receive timed out")]
    RecvTimeout,

    /// Reply id differs from the one expected for the transaction
    #[error("Protocol mismatch: expected message id {expected}, got {actual}")]
    ProtocolMismatch { expected: u16, actual: u16 },

    /// Frame header carries an id outside the catalog
    #[error("Unknown message id: {0}")]
    UnknownMessageId(u16),

    /// Enumerated field decoded to a value with no matching enumerator
    #[error("Invalid {kind} value: {value}")]
    InvalidEnumValue { kind: &'static str, value: i32 },

    /// Residual force/torque after offset calibration exceeds its bound
    #[error("Calibration residual out of bounds")]
    CalibrationOutOfBounds,

    /// Configuration file could not be read or validated
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<toml::de::Error> for MultitorqueError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(err.to_string())
    }
}

impl MultitorqueError {
    /// Shorthand for the capacity check performed by every codec call
    pub(crate) fn check_capacity(required: usize, available: usize) -> Result<()> {
        if available < required {
            return Err(Self::BufferTooSmall {
                required,
                available,
            });
        }
        Ok(())
    }
}
