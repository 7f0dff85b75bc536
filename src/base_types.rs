/// Primitive codec - fixed-width scalars on a little-endian byte stream
///
/// Every scalar occupies a 32-bit aligned slot in the stream. Sub-32-bit
/// values only touch their own bytes but still advance the stream by 4, so
/// each type carries two numbers:
///
/// | Type              | Physical bytes | Stream advance |
/// |-------------------|----------------|----------------|
/// | bool, i8, u8      | 1              | 4              |
/// | i16, u16          | 2              | 4              |
/// | i32, u32, f32     | 4              | 4              |
/// | i64, u64, f64     | 8              | 8              |
///
/// The capacity check always uses the stream advance, so a `u8` cannot be
/// encoded into fewer than 4 bytes. Padding bytes of a slot are left
/// untouched on encode and ignored on decode.
///
/// `to_le_bytes`/`from_le_bytes` reduce to plain copies on little-endian
/// hosts and byte-swap on big-endian ones.
use crate::errors::{MultitorqueError, Result};

/// Size of one aligned stream slot
pub const SLOT_SIZE: usize = 4;

/// A scalar that can be placed on the Multitorque wire
pub trait WireScalar: Sized + Copy {
    /// Bytes actually written or read
    const PHYSICAL_BYTES: usize;

    /// Bytes the stream cursor advances by
    const STREAM_ADVANCE: usize;

    /// Encode at the start of `binary`, returning the stream advance
    fn encode(self, binary: &mut [u8]) -> Result<usize>;

    /// Decode from the start of `binary`, returning the value and the stream advance
    fn decode(binary: &[u8]) -> Result<(Self, usize)>;
}

macro_rules! impl_wire_scalar {
    ($($ty:ty => $advance:expr),* $(,)?) => {
        $(
            impl WireScalar for $ty {
                const PHYSICAL_BYTES: usize = std::mem::size_of::<$ty>();
                const STREAM_ADVANCE: usize = $advance;

                fn encode(self, binary: &mut [u8]) -> Result<usize> {
                    MultitorqueError::check_capacity(Self::STREAM_ADVANCE, binary.len())?;
                    binary[..Self::PHYSICAL_BYTES].copy_from_slice(&self.to_le_bytes());
                    Ok(Self::STREAM_ADVANCE)
                }

                fn decode(binary: &[u8]) -> Result<(Self, usize)> {
                    MultitorqueError::check_capacity(Self::STREAM_ADVANCE, binary.len())?;
                    let mut raw = [0u8; std::mem::size_of::<$ty>()];
                    raw.copy_from_slice(&binary[..Self::PHYSICAL_BYTES]);
                    Ok((<$ty>::from_le_bytes(raw), Self::STREAM_ADVANCE))
                }
            }
        )*
    };
}

impl_wire_scalar! {
    i8 => SLOT_SIZE,
    u8 => SLOT_SIZE,
    i16 => SLOT_SIZE,
    u16 => SLOT_SIZE,
    i32 => SLOT_SIZE,
    u32 => SLOT_SIZE,
    f32 => SLOT_SIZE,
    i64 => 8,
    u64 => 8,
    f64 => 8,
}

impl WireScalar for bool {
    const PHYSICAL_BYTES: usize = 1;
    const STREAM_ADVANCE: usize = SLOT_SIZE;

    fn encode(self, binary: &mut [u8]) -> Result<usize> {
        (self as u8).encode(binary)
    }

    fn decode(binary: &[u8]) -> Result<(Self, usize)> {
        let (raw, advance) = u8::decode(binary)?;
        Ok((raw != 0, advance))
    }
}
