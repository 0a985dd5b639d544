use std::fs;
use tempfile::tempdir;

use bytes::Bytes;
use packetlink_cli::commands::replay;
use packetlink_core::{
    encoder::PacketBuilder, scanner::scan_stream, LinkConfig, ModuleRegistry, PacketError,
};

fn command(module_id: u8, cmd: u8, payload: &'static [u8]) -> Bytes {
    PacketBuilder::new(module_id)
        .cmd(cmd)
        .payload(Bytes::from_static(payload))
        .build(&ModuleRegistry::default())
        .unwrap()
}

#[test]
fn test_replay_echoes_commands() {
    let mut capture = Vec::new();
    capture.extend_from_slice(&command(5, 0x01, b"one"));
    capture.extend_from_slice(&command(1, 0x02, b"two"));

    let (report, replies) = replay::replay(&capture, Vec::new(), &LinkConfig::default()).unwrap();

    assert_eq!(report.commands, 2);
    assert_eq!(report.replies, 2);
    assert!(report.is_clean());

    let located = scan_stream(&replies, &ModuleRegistry::default());
    assert_eq!(located.len(), 2);
    assert!(located[0].packet.is_response());
    assert_eq!(located[0].packet.payload, b"one");
    assert_eq!(located[1].packet.payload, b"two");
}

#[test]
fn test_replay_counts_acks_and_faults() {
    let mut capture = Vec::new();
    capture.extend_from_slice(
        &PacketBuilder::new(0)
            .cmd(0x09)
            .response()
            .build(&ModuleRegistry::default())
            .unwrap(),
    );
    capture.extend_from_slice(b"\x00\x00");
    capture.extend_from_slice(&command(5, 0x03, b"three"));

    let (report, _) = replay::replay(&capture, Vec::new(), &LinkConfig::default()).unwrap();

    assert_eq!(report.acks, 1);
    assert_eq!(report.commands, 1);
    assert_eq!(report.rejected, 2);
    assert_eq!(report.errors, PacketError::START_SYM);
}

#[test]
fn test_replay_to_file() {
    let td = tempdir().unwrap();
    let output_path = td.path().join("replies.bin");

    replay::execute(
        &command(5, 0x01, b"file"),
        Some(output_path.to_str().unwrap()),
        &LinkConfig::default(),
    )
    .unwrap();

    let replies = fs::read(&output_path).unwrap();
    assert_eq!(replies.len(), 12 + 4);
    assert_eq!(&replies[5..9], b"file");
}

#[test]
fn test_replay_rejects_bad_config() {
    let config = LinkConfig {
        block_len: 2048,
        ..LinkConfig::default()
    };
    assert!(replay::replay(&[], Vec::new(), &config).is_err());
}
