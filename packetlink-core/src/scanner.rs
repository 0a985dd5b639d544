//! Stream scanner for captured or noisy input
//!
//! Unlike the [`RxAssembler`](crate::assembler::RxAssembler), which commits to
//! the first start symbol it sees, the scanner retries from the next candidate
//! whenever a frame fails to decode. It is meant for offline work on captures
//! where the stream may begin mid-frame or contain line noise.

use crate::constants::START_SYMBOL;
use crate::decoder::parse_frame_prefix;
use crate::error::PacketError;
use crate::registry::ModuleRegistry;
use crate::types::Packet;
use alloc::vec::Vec;

#[cfg(feature = "logging")]
use tracing::{debug, trace};

/// A frame found at a specific offset in the stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocatedFrame<'a> {
    /// Byte offset of the start symbol
    pub offset: usize,

    /// The decoded packet; its payload borrows the scanned data
    pub packet: Packet<'a>,

    /// Total size of the frame in bytes
    pub size: usize,
}

impl LocatedFrame<'_> {
    /// Raw frame bytes within `data`, the slice that was scanned
    pub fn raw<'d>(&self, data: &'d [u8]) -> &'d [u8] {
        &data[self.offset..self.offset + self.size]
    }
}

/// Scan a byte stream for valid frames, even if the stream is damaged
///
/// Every start symbol is a candidate. A candidate that decodes is collected
/// and scanning resumes after it; one that does not is skipped by a single
/// byte, so a frame hidden behind a false start is still found.
pub fn scan_stream<'a>(data: &'a [u8], registry: &ModuleRegistry) -> Vec<LocatedFrame<'a>> {
    scan_stream_with_stats(data, registry).0
}

/// Scan statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScanStats {
    /// Total bytes scanned
    pub bytes_scanned: usize,

    /// Number of valid frames found
    pub frames_found: usize,

    /// Number of start symbols tried
    pub candidates: usize,

    /// Number of candidates that failed to decode
    pub decode_failures: usize,

    /// Total bytes recovered (sum of all valid frame sizes)
    pub bytes_recovered: usize,

    /// Union of every decode fault seen
    pub errors: PacketError,
}

impl ScanStats {
    /// Calculate recovery rate as a percentage
    pub fn recovery_rate(&self) -> f64 {
        if self.bytes_scanned == 0 {
            0.0
        } else {
            (self.bytes_recovered as f64 / self.bytes_scanned as f64) * 100.0
        }
    }
}

/// Scan stream with statistics
pub fn scan_stream_with_stats<'a>(
    data: &'a [u8],
    registry: &ModuleRegistry,
) -> (Vec<LocatedFrame<'a>>, ScanStats) {
    let mut stats = ScanStats {
        bytes_scanned: data.len(),
        ..Default::default()
    };
    let mut results = Vec::new();
    let mut pos = 0;

    #[cfg(feature = "logging")]
    debug!("Starting stream scan of {} bytes", data.len());

    while let Some(rel) = find_start(&data[pos..]) {
        let offset = pos + rel;
        stats.candidates += 1;

        match parse_frame_prefix(&data[offset..], registry) {
            Ok((packet, size)) => {
                #[cfg(feature = "logging")]
                trace!(
                    "Frame at offset {}: module {} cmd {:#04x} ({} bytes)",
                    offset,
                    packet.module_id,
                    packet.cmd,
                    size
                );

                stats.bytes_recovered += size;
                results.push(LocatedFrame {
                    offset,
                    packet,
                    size,
                });
                pos = offset + size;
            }
            Err(e) => {
                #[cfg(feature = "logging")]
                trace!("No frame at offset {}: {}", offset, e);

                stats.decode_failures += 1;
                stats.errors |= e;
                pos = offset + 1;
            }
        }
    }

    stats.frames_found = results.len();

    #[cfg(feature = "logging")]
    debug!(
        "Scan complete: found {} valid frames out of {} bytes scanned",
        stats.frames_found, stats.bytes_scanned
    );

    (results, stats)
}

fn find_start(data: &[u8]) -> Option<usize> {
    memchr::memchr(START_SYMBOL, data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::PacketBuilder;
    use bytes::Bytes;

    fn build(module_id: u8, cmd: u8, payload: &'static [u8]) -> Bytes {
        PacketBuilder::new(module_id)
            .cmd(cmd)
            .payload(Bytes::from_static(payload))
            .build(&ModuleRegistry::default())
            .unwrap()
    }

    #[test]
    fn test_scan_clean_stream() {
        let registry = ModuleRegistry::default();
        let mut stream = Vec::new();
        stream.extend_from_slice(&build(0, 1, b"frame 1"));
        stream.extend_from_slice(&build(1, 2, b"frame 2"));
        stream.extend_from_slice(&build(5, 3, b"frame 3"));

        let results = scan_stream(&stream, &registry);

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].packet.cmd, 1);
        assert_eq!(results[1].packet.cmd, 2);
        assert_eq!(results[2].packet.cmd, 3);
        assert_eq!(results[2].packet.payload, b"frame 3");
        assert_eq!(results[1].offset, results[0].size);
    }

    #[test]
    fn test_scan_with_corruption() {
        let registry = ModuleRegistry::default();
        let frame1 = build(5, 1, b"frame 1");
        let frame2 = build(5, 2, b"frame 2");

        let mut stream = Vec::new();
        stream.extend_from_slice(&frame1);
        stream.extend_from_slice(b"\x01\x01GARBAGE DATA HERE!!!");
        stream.extend_from_slice(&frame2);

        let (results, stats) = scan_stream_with_stats(&stream, &registry);

        assert_eq!(results.len(), 2);
        assert_eq!(results[1].raw(&stream), &frame2[..]);
        assert!(stats.decode_failures >= 2);
        assert!(!stats.errors.is_success());
    }

    #[test]
    fn test_scan_missing_start() {
        let registry = ModuleRegistry::default();
        let mut stream = Vec::new();
        stream.extend_from_slice(&build(5, 1, b"frame 1"));
        stream.extend_from_slice(&build(5, 2, b"frame 2"));

        // Begin mid-way through the first frame
        let results = scan_stream(&stream[4..], &registry);

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].packet.cmd, 2);
    }

    #[test]
    fn test_scan_false_start_inside_candidate() {
        let registry = ModuleRegistry::default();
        // A lone start symbol directly before a real frame
        let mut stream = vec![START_SYMBOL];
        stream.extend_from_slice(&build(1, 0x10, &[]));

        let results = scan_stream(&stream, &registry);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].offset, 1);
    }

    #[test]
    fn test_scan_stats() {
        let registry = ModuleRegistry::default();
        let frame = build(0, 0, b"test");

        let (results, stats) = scan_stream_with_stats(&frame, &registry);

        assert_eq!(results.len(), 1);
        assert_eq!(stats.frames_found, 1);
        assert_eq!(stats.candidates, 1);
        assert_eq!(stats.bytes_scanned, frame.len());
        assert!(stats.recovery_rate() > 99.0);
    }

    #[test]
    fn test_scan_empty() {
        let (results, stats) = scan_stream_with_stats(&[], &ModuleRegistry::default());
        assert!(results.is_empty());
        assert_eq!(stats.recovery_rate(), 0.0);
    }
}
