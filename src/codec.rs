/// Message codec - positional field serialisation behind a frame header
///
/// Fields are not self-delimited: a message is its header followed by each
/// declared field at the running offset, so encoder and decoder must visit
/// the fields in exactly the same order. Message types only describe that
/// order (`encode_fields`/`decode_fields`); framing, capacity checks and the
/// header backpatch live here.
use crate::base_types::WireScalar;
use crate::errors::{MultitorqueError, Result};
use crate::header::{decode_header, pack_header_info, Header, HEADER_SIZE};
use crate::messages::MessageId;
use crate::ENCODING_TYPE;

/// Write cursor over a caller-supplied buffer
pub struct Encoder<'a> {
    binary: &'a mut [u8],
    offset: usize,
}

impl<'a> Encoder<'a> {
    pub fn new(binary: &'a mut [u8]) -> Self {
        Self { binary, offset: 0 }
    }

    /// Skip the header slot; its content is written by [`Encoder::finish`]
    pub fn reserve_header(&mut self) -> Result<()> {
        MultitorqueError::check_capacity(HEADER_SIZE, self.remaining())?;
        self.offset += HEADER_SIZE;
        Ok(())
    }

    /// Append one field at the running offset
    pub fn put<T: WireScalar>(&mut self, value: T) -> Result<()> {
        let written = value.encode(&mut self.binary[self.offset..])?;
        self.offset += written;
        Ok(())
    }

    /// Backpatch the header with the final frame size and return it
    pub fn finish(self, id: MessageId) -> usize {
        let mut head = [0u8; HEADER_SIZE];
        pack_header_info(id.as_u16(), self.offset as u16, ENCODING_TYPE, &mut head);
        self.binary[..HEADER_SIZE].copy_from_slice(&head);
        self.offset
    }

    pub fn position(&self) -> usize {
        self.offset
    }

    fn remaining(&self) -> usize {
        self.binary.len() - self.offset
    }
}

/// Read cursor over a received frame
pub struct Decoder<'a> {
    binary: &'a [u8],
    offset: usize,
}

impl<'a> Decoder<'a> {
    pub fn new(binary: &'a [u8]) -> Self {
        Self { binary, offset: 0 }
    }

    pub fn header(&mut self) -> Result<Header> {
        let (header, read) = decode_header(&self.binary[self.offset..])?;
        self.offset += read;
        Ok(header)
    }

    pub fn get<T: WireScalar>(&mut self) -> Result<T> {
        let (value, read) = T::decode(&self.binary[self.offset..])?;
        self.offset += read;
        Ok(value)
    }

    pub fn position(&self) -> usize {
        self.offset
    }
}

/// A decoded message together with the header it arrived with
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Decoded<M> {
    pub header: Header,
    pub message: M,
}

impl<M> Decoded<M> {
    pub fn map<N>(self, f: impl FnOnce(M) -> N) -> Decoded<N> {
        Decoded {
            header: self.header,
            message: f(self.message),
        }
    }

    /// Unwrap the message if the header carries `expected`
    ///
    /// A mismatch is logged and reported as `ProtocolMismatch`; the fields of
    /// a mismatched frame are never handed out.
    pub fn expect_id(self, expected: MessageId) -> Result<M> {
        if !check_message_consistency(self.header.id, expected.as_u16()) {
            return Err(MultitorqueError::ProtocolMismatch {
                expected: expected.as_u16(),
                actual: self.header.id,
            });
        }
        Ok(self.message)
    }
}

/// A catalog message with a fixed id and field order
pub trait WireMessage: Sized {
    const ID: MessageId;

    fn encode_fields(&self, encoder: &mut Encoder<'_>) -> Result<()>;

    fn decode_fields(decoder: &mut Decoder<'_>) -> Result<Self>;

    /// Encode header and fields, returning the frame length
    fn encode(&self, binary: &mut [u8]) -> Result<usize> {
        let mut encoder = Encoder::new(binary);
        encoder.reserve_header()?;
        self.encode_fields(&mut encoder)?;
        Ok(encoder.finish(Self::ID))
    }

    /// Decode header and fields, returning the message and bytes consumed
    ///
    /// The header id is not checked here; see [`Decoded::expect_id`].
    fn decode(binary: &[u8]) -> Result<(Decoded<Self>, usize)> {
        let mut decoder = Decoder::new(binary);
        let header = decoder.header()?;
        let message = Self::decode_fields(&mut decoder)?;
        Ok((Decoded { header, message }, decoder.position()))
    }
}

/// Compare a received message id with the one the transaction expects
pub fn check_message_consistency(actual_id: u16, expected_id: u16) -> bool {
    if actual_id != expected_id {
        log::error!(
            "Message consistency check failed: actual id {}, expected id {}",
            actual_id,
            expected_id
        );
        return false;
    }
    true
}
