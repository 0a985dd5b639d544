//! Fuzzing entry points for packetlink-core
//!
//! To use with cargo-fuzz:
//! 1. Install cargo-fuzz: cargo install cargo-fuzz
//! 2. Run fuzzer: cargo fuzz run fuzz_parse

use packetlink_core::{BufferPair, ModuleRegistry, PacketError, RxStatus};

pub fn fuzz_parse(data: &[u8]) {
    use packetlink_core::decoder::parse_frame;

    // Every module id is accepted so the checksum and end checks get exercised
    let registry = ModuleRegistry::from_range(0..=255);
    let _ = parse_frame(data, &registry);
}

pub fn fuzz_scan(data: &[u8]) {
    use packetlink_core::scanner::scan_stream;

    let _ = scan_stream(data, &ModuleRegistry::default());
}

/// Drive the receive path the way a channel does; the first byte picks the block length
pub fn fuzz_assembler(data: &[u8]) {
    let Some((&block, bytes)) = data.split_first() else {
        return;
    };

    let mut pair = BufferPair::new();
    if pair.generate(usize::from(block)).is_err() {
        return;
    }
    let registry = ModuleRegistry::default();

    for &byte in bytes {
        match pair.process_rx_byte(byte) {
            Ok(RxStatus::Pending) => {}
            Ok(RxStatus::Complete) => {
                let _ = pair.parse_packet(&registry);
                let _ = pair.flush();
            }
            Err(e) if e == PacketError::START_SYM => {}
            Err(_) => {
                let _ = pair.flush_rx();
            }
        }
    }
    let _ = pair.destroy();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fuzz_parse_empty() {
        fuzz_parse(&[]);
    }

    #[test]
    fn test_fuzz_parse_random() {
        fuzz_parse(&[0x01, 0x34, 0x56, 0x78, 0x9A, 0xBC]);
    }

    #[test]
    fn test_fuzz_scan_empty() {
        fuzz_scan(&[]);
    }

    #[test]
    fn test_fuzz_scan_random() {
        fuzz_scan(&[0x01; 1024]);
    }

    #[test]
    fn test_fuzz_assembler() {
        fuzz_assembler(&[]);
        fuzz_assembler(&[0]);
        fuzz_assembler(&[0, 0x01, 0x05, 0xCC, 0x00, 0x00, 0, 0, 0, 0, 0xFF, 0x2E, 0xAA, 0x01]);
        fuzz_assembler(&[4, 0x01, 0x05, 0xCC, 0xFF, 0xFF, 0x01, 0x01]);
    }
}
