//! Built-in self-test of the framing stack against known frames

use anyhow::{bail, Result};
use colored::*;
use packetlink_core::{
    constants::{PacketFlags, DEFAULT_BLOCK_LEN, START_SYMBOL},
    decoder::parse_frame,
    encoder::{construct_frame, encode_frame},
    BufferPair, LinkConfig, ModuleRegistry, Packet, PacketError, ProcessBuffer, RxAssembler,
};

/// Pass/fail counts, passed explicitly to every check
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tally {
    pub passed: usize,
    pub total: usize,
}

impl Tally {
    /// Record one check
    pub fn record(&mut self, name: &str, passed: bool, detail: Option<String>) -> bool {
        self.total += 1;
        if passed {
            self.passed += 1;
            println!("{} {}", "✓".green(), name);
        } else {
            match detail {
                Some(detail) => println!("{} {}: {}", "✗".red(), name, detail),
                None => println!("{} {}", "✗".red(), name),
            }
        }
        passed
    }

    /// Record a check that expects `result` to carry exactly `expected`
    pub fn check<T>(&mut self, name: &str, result: Result<T, PacketError>, expected: PacketError) -> bool {
        let actual = result.err().unwrap_or(PacketError::SUCCESS);
        let detail = (actual != expected).then(|| format!("expected {}, got {}", expected, actual));
        self.record(name, actual == expected, detail)
    }

    /// Fold in another tally
    pub fn merge(&mut self, other: Tally) {
        self.passed += other.passed;
        self.total += other.total;
    }

    pub fn all_passed(&self) -> bool {
        self.passed == self.total
    }
}

const BASE_FRAME: [u8; 14] = [
    0x01, 0x05, 0xCC, 0x00, 0x02, 0xFF, 0xFF, 0x00, 0x00, 0x00, 0x00, 0xFD, 0x2E, 0xAA,
];

const EMPTY_FRAME: [u8; 12] = [0x01, 0x05, 0xCC, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0xFF, 0x2E, 0xAA];

/// Feed `frame` through the receive side of `pair` and decode it
fn receive<'p>(pair: &'p mut BufferPair, frame: &[u8], registry: &ModuleRegistry) -> Result<Packet<'p>, PacketError> {
    pair.flush_rx()?;
    for &byte in frame {
        pair.process_rx_byte(byte)?;
    }
    let pair: &'p BufferPair = pair;
    pair.parse_packet(registry)
}

fn expect_frame(tally: &mut Tally, name: &str, packet: &Packet<'_>, config: &LinkConfig, expected: &[u8]) {
    match encode_frame(packet, &config.modules) {
        Ok(frame) => {
            let mismatch = frame
                .iter()
                .zip(expected)
                .position(|(a, b)| a != b)
                .map(|i| format!("mismatch at index {}: expected {:#04x}, got {:#04x}", i, expected[i], frame[i]))
                .or_else(|| {
                    (frame.len() != expected.len())
                        .then(|| format!("expected {} bytes, got {}", expected.len(), frame.len()))
                });
            tally.record(name, mismatch.is_none(), mismatch);
        }
        Err(e) => {
            tally.record(name, false, Some(e.to_string()));
        }
    }
}

/// Buffer lifecycle checks
pub fn lifecycle_checks(tally: &mut Tally, config: &LinkConfig) {
    let over = config.max_block_len + 1;
    let mut pair = BufferPair::from_config(config);
    tally.check(&format!("generate over maximum ({})", over), pair.generate(over), PacketError::MEMORY);
    tally.check("generate over maximum (2000)", pair.generate(2000), PacketError::MEMORY);
    tally.check("destroy after failed generate", pair.destroy(), PacketError::MEMORY);

    tally.check("generate", pair.generate(config.block_len), PacketError::SUCCESS);
    tally.check("generate twice", pair.generate(config.block_len), PacketError::STATE);
    tally.check("destroy", pair.destroy(), PacketError::SUCCESS);
    tally.check("destroy twice", pair.destroy(), PacketError::MEMORY);

    let mut pair = BufferPair::from_config(config);
    tally.check("destroy never generated", pair.destroy(), PacketError::MEMORY);

    let cycles = (0..1000).try_for_each(|_| {
        pair.generate(config.block_len)?;
        pair.destroy()
    });
    tally.check("1000 generate/destroy cycles", cycles, PacketError::SUCCESS);
}

/// Encoder checks
pub fn encode_checks(tally: &mut Tally, config: &LinkConfig) {
    expect_frame(
        tally,
        "encode command with payload",
        &Packet::new(5, 0xCC, &[0x01, 0x03, 0x05]),
        config,
        &[0x01, 0x05, 0xCC, 0x00, 0x03, 0x01, 0x03, 0x05, 0x00, 0x00, 0x00, 0x00, 0xFF, 0x22, 0xAA],
    );
    expect_frame(
        tally,
        "encode empty response",
        &Packet::with_flags(5, 0xCC, &[], PacketFlags::response()),
        config,
        &[0x01, 0x05, 0xCC, 0x00, 0x00, 0x00, 0x00, 0x00, 0x01, 0xFF, 0x2D, 0xAA],
    );
    expect_frame(
        tally,
        "encode response with payload",
        &Packet::with_flags(5, 0xCC, &[0xFF], PacketFlags::response()),
        config,
        &[0x01, 0x05, 0xCC, 0x00, 0x01, 0xFF, 0x00, 0x00, 0x00, 0x01, 0xFE, 0x2D, 0xAA],
    );

    let mut out = ProcessBuffer::new(DEFAULT_BLOCK_LEN + 12);
    let over_block = [0u8; DEFAULT_BLOCK_LEN + 1];
    tally.check(
        "encode payload over block length",
        construct_frame(&Packet::new(5, 0xCC, &over_block), &mut out, &config.modules),
        PacketError::MEMORY,
    );
    let over_protocol = [0u8; 1024];
    tally.check(
        "encode payload over protocol maximum",
        construct_frame(&Packet::new(5, 0xCC, &over_protocol), &mut out, &config.modules),
        PacketError::LENGTH | PacketError::MEMORY,
    );
    tally.check(
        "encode module 0",
        encode_frame(&Packet::new(0, 0xCC, &[]), &config.modules),
        PacketError::SUCCESS,
    );
    tally.check(
        "encode unknown module 10",
        encode_frame(&Packet::new(10, 0xCC, &[]), &config.modules),
        PacketError::MODULE,
    );
}

/// Decoder checks
pub fn decode_checks(tally: &mut Tally, config: &LinkConfig) {
    let registry = &config.modules;
    tally.check("decode valid frame", parse_frame(&BASE_FRAME, registry), PacketError::SUCCESS);

    let corruptions: [(&str, usize, u8, PacketError); 4] = [
        ("decode bad start symbol", 0, 0x02, PacketError::START_SYM),
        ("decode unknown module", 1, 0x07, PacketError::MODULE),
        ("decode bad checksum", 12, 0xF0, PacketError::CHECKSUM),
        ("decode bad end symbol", 13, 0xAB, PacketError::END_SYM),
    ];
    for (name, index, value, expected) in corruptions {
        let mut frame = BASE_FRAME;
        frame[index] = value;
        tally.check(name, parse_frame(&frame, registry), expected);
    }

    tally.check(
        "decode truncated frame",
        parse_frame(&BASE_FRAME[..BASE_FRAME.len() - 1], registry),
        PacketError::INCOMPLETE,
    );
}

/// Staged send packet checks
pub fn send_checks(tally: &mut Tally, config: &LinkConfig) {
    let mut pair = BufferPair::from_config(config);
    if !tally.check("generate for send", pair.generate(config.block_len), PacketError::SUCCESS) {
        return;
    }

    for name in ["send basic packet", "send basic packet again"] {
        let staged = match pair.send_packet() {
            Ok(staged) => staged,
            Err(e) => {
                tally.record(name, false, Some(e.to_string()));
                continue;
            }
        };
        staged.module_id = 5;
        staged.cmd = 0xCC;
        staged.flags = PacketFlags::default();
        if let Err(e) = staged.set_payload(&[0x01, 0x03, 0x05]) {
            tally.record(name, false, Some(e.to_string()));
            continue;
        }

        let sent = pair
            .construct_packet(&config.modules)
            .map(|frame| frame.len());
        tally.check(name, sent, PacketError::SUCCESS);
        tally.check("flush send buffer", pair.flush_tx(), PacketError::SUCCESS);
    }
}

/// Receive byte checks
pub fn rx_checks(tally: &mut Tally, config: &LinkConfig) {
    let mut pair = BufferPair::from_config(config);
    tally.check("receive without buffers", pair.process_rx_byte(START_SYMBOL), PacketError::MEMORY);

    let mut assembler = RxAssembler::new();
    let mut full = ProcessBuffer::new(1);
    let overflow = assembler
        .push(&mut full, START_SYMBOL)
        .and_then(|_| assembler.push(&mut full, 0x05));
    tally.check("receive buffer overflow", overflow, PacketError::MEMORY);

    if !tally.check("generate for receive", pair.generate(config.block_len), PacketError::SUCCESS) {
        return;
    }
    tally.check("receive valid start", pair.process_rx_byte(START_SYMBOL), PacketError::SUCCESS);
    tally.check("flush receive buffer", pair.flush_rx(), PacketError::SUCCESS);
    tally.check(
        "receive invalid start",
        pair.process_rx_byte(START_SYMBOL + 1),
        PacketError::START_SYM,
    );
}

/// Frames assembled byte by byte, then parsed
pub fn parse_checks(tally: &mut Tally, config: &LinkConfig) {
    let registry = &config.modules;
    let mut pair = BufferPair::from_config(config);
    if !tally.check("generate for parsing", pair.generate(config.block_len), PacketError::SUCCESS) {
        return;
    }

    tally.check(
        "parse valid packet without payload",
        receive(&mut pair, &EMPTY_FRAME, registry),
        PacketError::SUCCESS,
    );
    tally.check("parse valid packet", receive(&mut pair, &BASE_FRAME, registry), PacketError::SUCCESS);
    tally.check(
        "parse short packet",
        receive(&mut pair, &EMPTY_FRAME[..EMPTY_FRAME.len() - 1], registry),
        PacketError::INCOMPLETE,
    );

    let corruptions: [(&str, usize, u8, PacketError); 4] = [
        ("parse invalid start symbol", 0, 0x02, PacketError::START_SYM),
        ("parse invalid module", 1, 0x07, PacketError::MODULE),
        ("parse bad checksum", 12, 0xF0, PacketError::CHECKSUM),
        ("parse invalid end symbol", 13, 0xAB, PacketError::END_SYM),
    ];
    for (name, index, value, expected) in corruptions {
        let mut frame = BASE_FRAME;
        frame[index] = value;
        tally.check(name, receive(&mut pair, &frame, registry), expected);
    }

    let block_len = config.block_len;
    let expected: [(&str, &[u8], &[u8]); 2] = [
        ("parsed values without payload", &EMPTY_FRAME, &[]),
        ("parsed values with payload", &BASE_FRAME, &[0xFF, 0xFF]),
    ];
    for (name, frame, payload) in expected {
        match receive(&mut pair, frame, registry) {
            Ok(packet) => {
                let matches = packet.module_id == 0x05
                    && packet.cmd == 0xCC
                    && packet.payload == payload
                    && packet.payload_max == block_len
                    && packet.flags.bits() == PacketFlags::NONE
                    && packet.error.is_success();
                let detail = (!matches).then(|| format!("{:?}", packet));
                tally.record(name, matches, detail);
            }
            Err(e) => {
                tally.record(name, false, Some(e.to_string()));
            }
        }
    }
}

/// Every check
pub fn run(config: &LinkConfig) -> Tally {
    let mut tally = Tally::default();

    println!("\n=== Buffer Lifecycle ===");
    lifecycle_checks(&mut tally, config);
    println!("\n=== Encoding ===");
    encode_checks(&mut tally, config);
    println!("\n=== Decoding ===");
    decode_checks(&mut tally, config);
    println!("\n=== Send Packet ===");
    send_checks(&mut tally, config);
    println!("\n=== Process RX Byte ===");
    rx_checks(&mut tally, config);
    println!("\n=== Packet Parsing ===");
    parse_checks(&mut tally, config);

    tally
}

pub fn execute(config: &LinkConfig) -> Result<()> {
    let tally = run(config);

    println!("\nPassed {}/{} tests", tally.passed, tally.total);
    if !tally.all_passed() {
        bail!("{} self-test(s) failed", tally.total - tally.passed);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tally_counts() {
        let mut tally = Tally::default();
        assert!(tally.check("ok", Ok::<_, PacketError>(()), PacketError::SUCCESS));
        assert!(!tally.check("wrong", Err::<(), _>(PacketError::STATE), PacketError::MEMORY));
        assert_eq!(tally, Tally { passed: 1, total: 2 });

        let mut other = Tally::default();
        other.record("extra", true, None);
        tally.merge(other);
        assert_eq!(tally, Tally { passed: 2, total: 3 });
        assert!(!tally.all_passed());
    }

    #[test]
    fn test_selftest_passes_with_defaults() {
        let tally = run(&LinkConfig::default());
        assert!(tally.total > 40);
        assert!(tally.all_passed(), "{:?}", tally);
    }

    #[test]
    fn test_receive_suites_pass() {
        let config = LinkConfig::default();
        let mut tally = Tally::default();
        send_checks(&mut tally, &config);
        rx_checks(&mut tally, &config);
        parse_checks(&mut tally, &config);
        assert_eq!(tally.total, 21);
        assert!(tally.all_passed(), "{:?}", tally);
    }

    #[test]
    fn test_lifecycle_follows_config_maximum() {
        let config = LinkConfig {
            block_len: 900,
            max_block_len: 1000,
            ..LinkConfig::default()
        };
        let mut tally = Tally::default();
        lifecycle_checks(&mut tally, &config);
        assert!(tally.all_passed(), "{:?}", tally);
    }
}
