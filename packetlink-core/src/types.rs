//! Core packet types

use crate::constants::{frame_len, PacketFlags, MAX_PAYLOAD_LEN};
use crate::error::PacketError;
use crate::registry::ModuleRegistry;

/// A logical command or response message
///
/// The payload is a borrowed view into the buffer that holds it. A packet
/// decoded from a [`BufferPair`](crate::buffers::BufferPair) cannot outlive
/// the next flush, destroy or receive on that pair: all of those need
/// `&mut` access to the pair, which the borrow checker refuses while the
/// packet is alive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Packet<'a> {
    /// Routing tag of the target subsystem
    pub module_id: u8,

    /// Module-scoped opcode
    pub cmd: u8,

    /// Payload bytes
    pub payload: &'a [u8],

    /// Capacity ceiling of the buffer owning the payload
    pub payload_max: usize,

    /// Response indicator and status bits
    pub flags: PacketFlags,

    /// Validation faults accumulated while producing this packet
    pub error: PacketError,
}

impl<'a> Packet<'a> {
    /// Create a command packet whose payload is owned by `payload`
    pub fn new(module_id: u8, cmd: u8, payload: &'a [u8]) -> Self {
        Self {
            module_id,
            cmd,
            payload,
            payload_max: payload.len(),
            flags: PacketFlags::default(),
            error: PacketError::SUCCESS,
        }
    }

    /// Create a packet with explicit flags
    pub fn with_flags(module_id: u8, cmd: u8, payload: &'a [u8], flags: PacketFlags) -> Self {
        Self {
            flags,
            ..Self::new(module_id, cmd, payload)
        }
    }

    /// Number of payload bytes
    pub fn payload_len(&self) -> usize {
        self.payload.len()
    }

    /// Check if the packet is a response rather than a command
    pub fn is_response(&self) -> bool {
        self.flags.is_response()
    }

    /// Length of the wire frame for this packet
    pub fn encoded_len(&self) -> usize {
        frame_len(self.payload.len())
    }

    /// Check the packet against the protocol limits and `registry`
    ///
    /// Returns every violated constraint at once.
    pub fn validate(&self, registry: &ModuleRegistry) -> Result<(), PacketError> {
        let mut error = PacketError::SUCCESS;

        if self.payload.len() > MAX_PAYLOAD_LEN {
            error |= PacketError::LENGTH;
        }
        if self.payload.len() > self.payload_max {
            error |= PacketError::MEMORY;
        }
        if !registry.contains(self.module_id) {
            error |= PacketError::MODULE;
        }

        error.into_result(())
    }
}
