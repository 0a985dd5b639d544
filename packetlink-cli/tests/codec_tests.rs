use std::fs;
use tempfile::tempdir;

use packetlink_cli::commands::{checksum, decode, encode};
use packetlink_cli::{load_config, parse_hex};
use packetlink_core::LinkConfig;

fn args(module_id: u8, cmd: u8, payload: &[u8]) -> encode::EncodeArgs {
    encode::EncodeArgs {
        module_id,
        cmd,
        payload: payload.to_vec(),
        ..Default::default()
    }
}

#[test]
fn test_encode_known_frame() {
    let frame = encode::encode(&args(5, 0xCC, &[1, 3, 5]), &LinkConfig::default()).unwrap();
    assert_eq!(hex::encode(&frame), "0105cc000301030500000000ff22aa");
}

#[test]
fn test_encode_response_flag() {
    let mut response = args(5, 0xCC, &[]);
    response.response = true;
    let frame = encode::encode(&response, &LinkConfig::default()).unwrap();
    assert_eq!(hex::encode(&frame), "0105cc000000000001ff2daa");
}

#[test]
fn test_encode_unknown_module() {
    let err = encode::encode(&args(7, 0x01, &[]), &LinkConfig::default()).unwrap_err();
    assert!(err.to_string().contains("MODULE"));
}

#[test]
fn test_encode_to_file_then_decode() {
    let td = tempdir().unwrap();
    let frame_path = td.path().join("frame.bin");

    encode::execute(
        &args(1, 0x42, b"payload"),
        Some(frame_path.to_str().unwrap()),
        &LinkConfig::default(),
    )
    .unwrap();

    let data = fs::read(&frame_path).unwrap();
    let decoded = decode::decode(&data, &LinkConfig::default()).unwrap();
    assert_eq!(decoded.module_id, 1);
    assert_eq!(decoded.cmd, 0x42);
    assert_eq!(decoded.payload, hex::encode(b"payload"));
    assert_eq!(decoded.size, data.len());
    assert!(!decoded.response);
}

#[test]
fn test_decode_reports_fault() {
    let data = parse_hex("0105cc0002ffff00000000fd2eab").unwrap();
    let err = decode::execute(&data, false, &LinkConfig::default()).unwrap_err();
    assert!(err.to_string().contains("END_SYM"));
}

#[test]
fn test_checksum_command() {
    let covered = parse_hex("05cc0003010305 00000000").unwrap();
    assert_eq!(checksum::compute(&covered, false).unwrap(), 0xFF22);

    let frame = parse_hex("0105cc000301030500000000ff22aa").unwrap();
    assert_eq!(checksum::compute(&frame, true).unwrap(), 0xFF22);
    assert!(checksum::compute(&frame[..5], true).is_err());
}

#[test]
fn test_load_config_file() {
    let td = tempdir().unwrap();
    let path = td.path().join("link.json");
    fs::write(&path, r#"{ "block_len": 64, "modules": [0, 9] }"#).unwrap();

    let config = load_config(Some(path.to_str().unwrap())).unwrap();
    assert_eq!(config.block_len, 64);
    assert_eq!(config.max_block_len, LinkConfig::default().max_block_len);
    assert!(config.modules.contains(9));
    assert!(!config.modules.contains(5));

    let frame = encode::encode(&args(9, 0x01, &[]), &config).unwrap();
    assert_eq!(decode::decode(&frame, &config).unwrap().module_id, 9);
}

#[test]
fn test_load_config_rejects_invalid() {
    let td = tempdir().unwrap();
    let path = td.path().join("link.json");
    fs::write(&path, r#"{ "block_len": 600 }"#).unwrap();

    assert!(load_config(Some(path.to_str().unwrap())).is_err());
    assert!(load_config(Some(td.path().join("missing.json").to_str().unwrap())).is_err());
}
