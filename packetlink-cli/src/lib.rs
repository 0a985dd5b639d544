//! Library entry for packetlink-cli used by integration tests and embedding.

pub mod commands;

// Re-export commands for convenience
pub use commands::*;

use anyhow::{Context, Result};
use packetlink_core::LinkConfig;
use std::fs;
use std::io::{self, Read};
use tracing::debug;

/// Load a link configuration from a JSON file, or the defaults when no path is given
///
/// Missing fields fall back to their defaults. The result is validated.
pub fn load_config(path: Option<&str>) -> Result<LinkConfig> {
    let config = match path {
        Some(path) => {
            let content = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path))?;
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path))?
        }
        None => LinkConfig::default(),
    };

    config.validate().with_context(|| "Invalid link configuration")?;
    debug!(
        "Link config: block {} (max {}), {} modules, rx timeout {}",
        config.block_len,
        config.max_block_len,
        config.modules.len(),
        config.rx_timeout
    );
    Ok(config)
}

/// Read a whole file, or stdin for `-`
pub fn read_input(input: &str) -> Result<Vec<u8>> {
    if input == "-" {
        let mut buf = Vec::new();
        io::stdin().read_to_end(&mut buf)?;
        Ok(buf)
    } else {
        fs::read(input).with_context(|| format!("Failed to read input file: {}", input))
    }
}

/// Parse a hex string, tolerating whitespace and an optional `0x` prefix
pub fn parse_hex(text: &str) -> Result<Vec<u8>> {
    let cleaned: String = text.split_whitespace().collect();
    let cleaned = strip_hex_prefix(&cleaned).unwrap_or(&cleaned);
    hex::decode(cleaned).with_context(|| format!("Invalid hex: {}", text))
}

/// Parse a decimal or `0x`-prefixed integer (clap value parser)
pub fn parse_u8(text: &str) -> std::result::Result<u8, String> {
    parse_int(text).and_then(|v| u8::try_from(v).map_err(|_| format!("{} does not fit in a byte", text)))
}

/// Parse a decimal or `0x`-prefixed integer (clap value parser)
pub fn parse_u32(text: &str) -> std::result::Result<u32, String> {
    parse_int(text)
}

fn strip_hex_prefix(text: &str) -> Option<&str> {
    text.strip_prefix("0x").or_else(|| text.strip_prefix("0X"))
}

fn parse_int(text: &str) -> std::result::Result<u32, String> {
    let parsed = match strip_hex_prefix(text) {
        Some(digits) => u32::from_str_radix(digits, 16),
        None => text.parse(),
    };
    parsed.map_err(|e| format!("Invalid number {}: {}", text, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_numbers() {
        assert_eq!(parse_u8("0xCC"), Ok(0xCC));
        assert_eq!(parse_u8("5"), Ok(5));
        assert!(parse_u8("256").is_err());
        assert_eq!(parse_u32("0x80000001"), Ok(0x8000_0001));
        assert!(parse_u32("nope").is_err());
    }

    #[test]
    fn test_parse_hex() {
        assert_eq!(parse_hex("01 05 cc").unwrap(), vec![0x01, 0x05, 0xCC]);
        assert_eq!(parse_hex("0x0105").unwrap(), vec![0x01, 0x05]);
        assert_eq!(parse_hex("0X0105").unwrap(), vec![0x01, 0x05]);
        assert!(parse_hex("0g").is_err());
    }

    #[test]
    fn test_default_config() {
        let config = load_config(None).unwrap();
        assert_eq!(config, LinkConfig::default());
    }
}
