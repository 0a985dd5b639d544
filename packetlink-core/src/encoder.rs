//! Frame encoding

use crate::buffers::ProcessBuffer;
use crate::checksum::checksum16;
use crate::constants::{offset, PacketFlags, END_SYMBOL, START_SYMBOL};
use crate::error::PacketError;
use crate::registry::ModuleRegistry;
use crate::types::Packet;
use bytes::{BufMut, Bytes, BytesMut};

/// Encode `packet` into `out`, starting at cursor 0
///
/// The frame is laid out as follows (integers big-endian):
/// 1. Start symbol (1 byte): `0x01`
/// 2. Module id (1 byte)
/// 3. Command (1 byte)
/// 4. Payload length (2 bytes)
/// 5. Payload (payload length bytes)
/// 6. Flags (4 bytes)
/// 7. Checksum (2 bytes) over fields 2 through 6
/// 8. End symbol (1 byte): `0xAA`
///
/// On success the buffer cursor sits at the end of the frame and the frame
/// length is returned. `LENGTH`, `MEMORY` and `MODULE` are reported together
/// when more than one applies; `MEMORY` covers both a payload above
/// `payload_max` and a frame larger than `out`. A failed encode leaves the
/// buffer as it was; flushing it is up to the caller.
pub fn construct_frame(
    packet: &Packet<'_>,
    out: &mut ProcessBuffer,
    registry: &ModuleRegistry,
) -> Result<usize, PacketError> {
    let total = packet.encoded_len();

    let mut error = validation_error(packet, registry);
    if total > out.capacity() {
        error |= PacketError::MEMORY;
    }
    if !error.is_success() {
        return Err(error);
    }

    write_frame(&mut out.storage_mut()[..total], packet);
    out.set_len(total);
    Ok(total)
}

/// Encode `packet` into a freshly allocated frame
pub fn encode_frame(packet: &Packet<'_>, registry: &ModuleRegistry) -> Result<Bytes, PacketError> {
    packet.validate(registry)?;

    let mut buf = BytesMut::zeroed(packet.encoded_len());
    write_frame(&mut buf, packet);
    Ok(buf.freeze())
}

fn validation_error(packet: &Packet<'_>, registry: &ModuleRegistry) -> PacketError {
    match packet.validate(registry) {
        Ok(()) => PacketError::SUCCESS,
        Err(e) => e,
    }
}

/// Write every field of `packet` into `dst`, which is exactly one frame long
fn write_frame(dst: &mut [u8], packet: &Packet<'_>) {
    let payload_len = packet.payload_len();
    let flags_end = offset::PAYLOAD + payload_len + 4;

    {
        let mut head = &mut dst[..flags_end];
        head.put_u8(START_SYMBOL);
        head.put_u8(packet.module_id);
        head.put_u8(packet.cmd);
        head.put_u16(payload_len as u16);
        head.put_slice(packet.payload);
        head.put_u32(packet.flags.bits());
    }

    let checksum = checksum16(&dst[offset::MODULE..flags_end]);

    let mut tail = &mut dst[flags_end..];
    tail.put_u16(checksum);
    tail.put_u8(END_SYMBOL);
}

/// Builder for encoding standalone frames on a host
pub struct PacketBuilder {
    module_id: u8,
    cmd: u8,
    payload: Bytes,
    flags: u32,
}

impl PacketBuilder {
    /// Create a new builder addressed to `module_id`
    pub fn new(module_id: u8) -> Self {
        Self {
            module_id,
            cmd: 0,
            payload: Bytes::new(),
            flags: PacketFlags::NONE,
        }
    }

    /// Set the command opcode
    pub fn cmd(mut self, cmd: u8) -> Self {
        self.cmd = cmd;
        self
    }

    /// Set the payload
    pub fn payload(mut self, payload: Bytes) -> Self {
        self.payload = payload;
        self
    }

    /// Replace the flags word
    pub fn flags(mut self, flags: u32) -> Self {
        self.flags = flags;
        self
    }

    /// Mark as a response
    pub fn response(mut self) -> Self {
        self.flags |= PacketFlags::RESPONSE;
        self
    }

    /// Build and encode the frame
    pub fn build(self, registry: &ModuleRegistry) -> Result<Bytes, PacketError> {
        let packet = Packet::with_flags(
            self.module_id,
            self.cmd,
            &self.payload,
            PacketFlags::new(self.flags),
        );
        encode_frame(&packet, registry)
    }
}
