//! Frame decoding (strict mode)

use crate::checksum::checksum16;
use crate::constants::{
    frame_len, offset, PacketFlags, END_SYMBOL, HEADER_LEN, MAX_PAYLOAD_LEN, START_SYMBOL,
    TRAILER_LEN,
};
use crate::error::PacketError;
use crate::registry::ModuleRegistry;
use crate::types::Packet;
use bytes::Buf;

/// Decode and validate one frame at the start of `raw`
///
/// Validation short-circuits on the first failure, in this order:
/// 1. empty input: `INCOMPLETE`
/// 2. start symbol: `START_SYM`
/// 3. header or declared frame length not fully present: `INCOMPLETE`
///    (a declared payload above the protocol maximum is `LENGTH`)
/// 4. module id not in `registry`: `MODULE`
/// 5. recomputed checksum differs: `CHECKSUM`
/// 6. end symbol: `END_SYM`
///
/// Bytes after the declared frame are ignored. The returned packet's payload
/// borrows from `raw`.
pub fn parse_frame<'a>(raw: &'a [u8], registry: &ModuleRegistry) -> Result<Packet<'a>, PacketError> {
    let Some(&start) = raw.first() else {
        return Err(PacketError::INCOMPLETE);
    };
    if start != START_SYMBOL {
        return Err(PacketError::START_SYM);
    }

    let total = declared_frame_len(raw)?;
    if raw.len() < total {
        return Err(PacketError::INCOMPLETE);
    }
    let frame = &raw[..total];

    let module_id = frame[offset::MODULE];
    if !registry.contains(module_id) {
        return Err(PacketError::MODULE);
    }

    let payload_end = total - TRAILER_LEN;
    let flags_end = payload_end + 4;
    let mut tail = &frame[payload_end..];
    let flags = tail.get_u32();
    let transmitted = tail.get_u16();
    let end = tail.get_u8();

    let actual = checksum16(&frame[offset::MODULE..flags_end]);
    if actual != transmitted {
        return Err(PacketError::CHECKSUM);
    }

    if end != END_SYMBOL {
        return Err(PacketError::END_SYM);
    }

    let payload = &frame[offset::PAYLOAD..payload_end];
    Ok(Packet {
        module_id,
        cmd: frame[offset::CMD],
        payload,
        payload_max: payload.len(),
        flags: PacketFlags::new(flags),
        error: PacketError::SUCCESS,
    })
}

/// Decode one frame and report how many bytes it occupied
///
/// Useful for stream processing where the caller advances past the frame.
pub fn parse_frame_prefix<'a>(
    raw: &'a [u8],
    registry: &ModuleRegistry,
) -> Result<(Packet<'a>, usize), PacketError> {
    let packet = parse_frame(raw, registry)?;
    let consumed = packet.encoded_len();
    Ok((packet, consumed))
}

/// Total frame length declared by the header at the start of `raw`
///
/// Needs the whole fixed header; fails with `INCOMPLETE` otherwise and with
/// `LENGTH` when the declared payload exceeds the protocol maximum.
pub fn declared_frame_len(raw: &[u8]) -> Result<usize, PacketError> {
    if raw.len() < HEADER_LEN {
        return Err(PacketError::INCOMPLETE);
    }
    let payload_len = usize::from((&raw[offset::LEN..HEADER_LEN]).get_u16());
    if payload_len > MAX_PAYLOAD_LEN {
        return Err(PacketError::LENGTH);
    }
    Ok(frame_len(payload_len))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::PacketBuilder;
    use bytes::Bytes;

    const BASE: [u8; 14] = [
        0x01, 0x05, 0xCC, 0x00, 0x02, 0xFF, 0xFF, 0x00, 0x00, 0x00, 0x00, 0xFD, 0x2E, 0xAA,
    ];

    #[test]
    fn test_decode_base_frame() {
        let registry = ModuleRegistry::default();
        let packet = parse_frame(&BASE, &registry).unwrap();

        assert_eq!(packet.module_id, 5);
        assert_eq!(packet.cmd, 0xCC);
        assert_eq!(packet.payload, &[0xFF, 0xFF]);
        assert_eq!(packet.flags, PacketFlags::default());
        assert!(packet.error.is_success());
    }

    #[test]
    fn test_decode_empty_input() {
        let registry = ModuleRegistry::default();
        assert_eq!(parse_frame(&[], &registry), Err(PacketError::INCOMPLETE));
    }

    #[test]
    fn test_decode_short_frame() {
        let registry = ModuleRegistry::default();
        assert_eq!(
            parse_frame(&BASE[..13], &registry),
            Err(PacketError::INCOMPLETE)
        );
        assert_eq!(
            parse_frame(&BASE[..3], &registry),
            Err(PacketError::INCOMPLETE)
        );
    }

    #[test]
    fn test_decode_validation_order() {
        let registry = ModuleRegistry::default();

        let mut bad_start = BASE;
        bad_start[0] = 0x02;
        assert_eq!(parse_frame(&bad_start, &registry), Err(PacketError::START_SYM));

        // Module check precedes the checksum, which this edit also breaks
        let mut bad_module = BASE;
        bad_module[1] = 0x07;
        assert_eq!(parse_frame(&bad_module, &registry), Err(PacketError::MODULE));

        let mut bad_checksum = BASE;
        bad_checksum[12] = 0xF0;
        assert_eq!(parse_frame(&bad_checksum, &registry), Err(PacketError::CHECKSUM));

        let mut bad_end = BASE;
        bad_end[13] = 0xAB;
        assert_eq!(parse_frame(&bad_end, &registry), Err(PacketError::END_SYM));
    }

    #[test]
    fn test_decode_oversized_declaration() {
        let registry = ModuleRegistry::default();
        let raw = [0x01, 0x05, 0xCC, 0xFF, 0xFF, 0x00];
        assert_eq!(parse_frame(&raw, &registry), Err(PacketError::LENGTH));
    }

    #[test]
    fn test_trailing_bytes_ignored() {
        let registry = ModuleRegistry::default();
        let mut raw = BASE.to_vec();
        raw.extend_from_slice(&[0x01, 0x02, 0x03]);

        let (packet, consumed) = parse_frame_prefix(&raw, &registry).unwrap();
        assert_eq!(consumed, BASE.len());
        assert_eq!(packet.payload, &[0xFF, 0xFF]);
    }

    #[test]
    fn test_round_trip() {
        let registry = ModuleRegistry::default();
        let encoded = PacketBuilder::new(1)
            .cmd(0x42)
            .payload(Bytes::from_static(b"round trip"))
            .flags(0x8000_0001)
            .build(&registry)
            .unwrap();

        let decoded = parse_frame(&encoded, &registry).unwrap();
        assert_eq!(decoded.module_id, 1);
        assert_eq!(decoded.cmd, 0x42);
        assert_eq!(decoded.payload, b"round trip");
        assert_eq!(decoded.flags.bits(), 0x8000_0001);
        assert!(decoded.is_response());
    }
}
