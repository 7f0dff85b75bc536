/// Message header codec
///
/// Every frame starts with one little-endian `u32`:
///
/// ```text
/// 31          20 19     16 15                 0
/// ┌─────────────┬─────────┬────────────────────┐
/// │ message id  │ version │ total frame size   │
/// │ 12 bits     │ 4 bits  │ 16 bits            │
/// └─────────────┴─────────┴────────────────────┘
/// ```
///
/// The size covers the header itself and is only known once the payload has
/// been serialised, so message encoders reserve the first 4 bytes and
/// backpatch them with [`pack_header_info`] as their final step.
use crate::errors::{MultitorqueError, Result};

/// Header length on the wire
pub const HEADER_SIZE: usize = 4;

const ID_MASK: u32 = 0x0fff;
const ID_SHIFT: u32 = 20;
const ENCODING_MASK: u32 = 0x0f;
const ENCODING_SHIFT: u32 = 16;
const SIZE_MASK: u32 = 0xffff;

/// Decoded frame header
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Header {
    /// Message id (12 bits significant)
    pub id: u16,
    /// Total frame size in bytes, header included
    pub size: u16,
    /// Encoding/protocol version (4 bits significant)
    pub encoding: u8,
}

impl Header {
    pub fn new(id: u16, size: u16, encoding: u8) -> Self {
        Self { id, size, encoding }
    }
}

/// Write the packed header into `binary`
///
/// Values wider than their bit field are masked. Cannot fail: the array type
/// guarantees the 4 bytes of capacity.
pub fn pack_header_info(id: u16, size: u16, encoding: u8, binary: &mut [u8; HEADER_SIZE]) -> usize {
    let value = ((u32::from(id) & ID_MASK) << ID_SHIFT)
        | ((u32::from(encoding) & ENCODING_MASK) << ENCODING_SHIFT)
        | (u32::from(size) & SIZE_MASK);

    *binary = value.to_le_bytes();
    HEADER_SIZE
}

/// Unpack a header from the start of `binary`
pub fn decode_header(binary: &[u8]) -> Result<(Header, usize)> {
    MultitorqueError::check_capacity(HEADER_SIZE, binary.len())?;

    let value = u32::from_le_bytes([binary[0], binary[1], binary[2], binary[3]]);
    let header = Header {
        id: ((value >> ID_SHIFT) & ID_MASK) as u16,
        size: (value & SIZE_MASK) as u16,
        encoding: ((value >> ENCODING_SHIFT) & ENCODING_MASK) as u8,
    };

    Ok((header, HEADER_SIZE))
}
