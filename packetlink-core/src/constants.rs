//! Constants and limits for the packet wire format

use serde::{Deserialize, Serialize};

/// First byte of every frame
pub const START_SYMBOL: u8 = 0x01;

/// Last byte of every frame
pub const END_SYMBOL: u8 = 0xAA;

/// Start symbol + module id + command + payload length (2 bytes)
pub const HEADER_LEN: usize = 5;

/// Flags (4 bytes) + checksum (2 bytes) + end symbol
pub const TRAILER_LEN: usize = 7;

/// Size of a frame carrying an empty payload
pub const FRAME_OVERHEAD: usize = HEADER_LEN + TRAILER_LEN;

/// Absolute protocol maximum for a payload, independent of any buffer
pub const MAX_PAYLOAD_LEN: usize = 1012;

/// Largest frame the protocol can describe
pub const MAX_FRAME_LEN: usize = MAX_PAYLOAD_LEN + FRAME_OVERHEAD;

/// Default ceiling on the block length a buffer pair may be generated with
pub const MAX_BLOCK_LEN: usize = 512;

/// Default block length used by channels and the CLI
pub const DEFAULT_BLOCK_LEN: usize = 128;

/// Default number of ticks a partial frame may stall before it is dropped
pub const DEFAULT_RX_TIMEOUT: u32 = 100;

/// Default command opcode of diagnostic log packets
pub const DEFAULT_LOG_CMD: u8 = 0xF0;

/// Byte offsets of the fixed header fields
pub(crate) mod offset {
    pub const START: usize = 0;
    pub const MODULE: usize = 1;
    pub const CMD: usize = 2;
    pub const LEN: usize = 3;
    pub const PAYLOAD: usize = 5;
}

/// Total frame length implied by a declared payload length
pub const fn frame_len(payload_len: usize) -> usize {
    FRAME_OVERHEAD + payload_len
}

/// Packet flags (4 bytes on the wire, big-endian)
///
/// Bit 0 marks a frame as a response rather than a command. The other named
/// bits are status bits set by command handlers on their responses; unnamed
/// bits are caller-defined and carried verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PacketFlags(u32);

impl PacketFlags {
    /// No flags set
    pub const NONE: u32 = 0;

    /// Frame is a response to an earlier command
    pub const RESPONSE: u32 = 1 << 0;

    /// Command arrived in a state where it cannot run
    pub const INVALID_STATE: u32 = 1 << 1;

    /// Command arguments were malformed
    pub const INVALID_ARGS: u32 = 1 << 2;

    /// Command opcode is unknown to the module
    pub const INVALID_CMD: u32 = 1 << 3;

    /// Operation is not permitted
    pub const ILLEGAL_OPERATION: u32 = 1 << 4;

    /// Handler ran out of memory building the response
    pub const MEMORY: u32 = 1 << 5;

    /// Handler failed for an unspecified reason
    pub const UNKNOWN_ERR: u32 = 1 << 6;

    /// Create flags from the raw word
    pub const fn new(flags: u32) -> Self {
        Self(flags)
    }

    /// Flags with only the response bit set
    pub const fn response() -> Self {
        Self(Self::RESPONSE)
    }

    /// Get the raw flags word
    pub const fn bits(&self) -> u32 {
        self.0
    }

    /// Check whether every bit of `mask` is set
    pub const fn contains(&self, mask: u32) -> bool {
        (self.0 & mask) == mask
    }

    /// Check if the frame is a response
    pub const fn is_response(&self) -> bool {
        (self.0 & Self::RESPONSE) != 0
    }

    /// Check if any handler status bit is set
    pub const fn has_status(&self) -> bool {
        const STATUS: u32 = PacketFlags::INVALID_STATE
            | PacketFlags::INVALID_ARGS
            | PacketFlags::INVALID_CMD
            | PacketFlags::ILLEGAL_OPERATION
            | PacketFlags::MEMORY
            | PacketFlags::UNKNOWN_ERR;
        (self.0 & STATUS) != 0
    }

    /// Return these flags with `mask` set
    pub const fn with(self, mask: u32) -> Self {
        Self(self.0 | mask)
    }

    /// Set the bits in `mask`
    pub fn insert(&mut self, mask: u32) {
        self.0 |= mask;
    }

    /// Clear the bits in `mask`
    pub fn remove(&mut self, mask: u32) {
        self.0 &= !mask;
    }
}

impl Default for PacketFlags {
    fn default() -> Self {
        Self(Self::NONE)
    }
}

impl From<u32> for PacketFlags {
    fn from(bits: u32) -> Self {
        Self(bits)
    }
}
