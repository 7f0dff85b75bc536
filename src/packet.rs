/// Fixed-capacity packet buffer shared by every transport path
use crate::PACKET_MAX_SIZE;

/// Raw frame storage: `content` holds the bytes, `size` how many are valid
#[derive(Clone)]
pub struct PacketBuffer {
    pub content: [u8; PACKET_MAX_SIZE],
    pub size: usize,
}

impl PacketBuffer {
    pub fn new() -> Self {
        Self {
            content: [0u8; PACKET_MAX_SIZE],
            size: 0,
        }
    }

    /// Copy `bytes` in, truncating at capacity
    pub fn from_slice(bytes: &[u8]) -> Self {
        let mut packet = Self::new();
        let len = bytes.len().min(PACKET_MAX_SIZE);
        packet.content[..len].copy_from_slice(&bytes[..len]);
        packet.size = len;
        packet
    }

    /// The valid prefix of `content`
    pub fn as_bytes(&self) -> &[u8] {
        &self.content[..self.size.min(PACKET_MAX_SIZE)]
    }

    pub fn clear(&mut self) {
        self.content.fill(0);
        self.size = 0;
    }
}

impl Default for PacketBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for PacketBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PacketBuffer")
            .field("size", &self.size)
            .field("content", &self.as_bytes())
            .finish()
    }
}
