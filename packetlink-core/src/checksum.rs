//! 16-bit frame checksum

use crate::constants::{offset, HEADER_LEN, TRAILER_LEN};
use crate::error::PacketError;

/// Complemented 16-bit byte sum: `0xFFFF - (sum(bytes) mod 0x10000)`
pub fn checksum16(bytes: &[u8]) -> u16 {
    let sum = bytes
        .iter()
        .fold(0u16, |acc, &byte| acc.wrapping_add(u16::from(byte)));
    0xFFFF - sum
}

/// Checksum over the covered range of a complete frame
///
/// The range is module id through flags: the start symbol, the checksum
/// field itself and the end symbol are excluded.
pub fn frame_checksum(frame: &[u8]) -> Result<u16, PacketError> {
    if frame.len() < HEADER_LEN + TRAILER_LEN {
        return Err(PacketError::INCOMPLETE);
    }
    let covered_end = frame.len() - 3;
    Ok(checksum16(&frame[offset::MODULE..covered_end]))
}
