use anyhow::{anyhow, Result};
use colored::*;
use packetlink_core::{decoder::parse_frame_prefix, LinkConfig, Packet};
use serde::Serialize;
use tracing::info;

/// JSON view of a decoded packet
#[derive(Debug, Serialize)]
pub struct DecodedPacket {
    pub module_id: u8,
    pub cmd: u8,
    pub flags: u32,
    pub response: bool,
    pub payload_len: usize,
    pub payload: String,
    pub size: usize,
}

impl DecodedPacket {
    pub fn from_packet(packet: &Packet<'_>, size: usize) -> Self {
        Self {
            module_id: packet.module_id,
            cmd: packet.cmd,
            flags: packet.flags.bits(),
            response: packet.is_response(),
            payload_len: packet.payload_len(),
            payload: hex::encode(packet.payload),
            size,
        }
    }
}

/// Decode the frame at the start of `data`
pub fn decode(data: &[u8], config: &LinkConfig) -> Result<DecodedPacket> {
    let (packet, size) =
        parse_frame_prefix(data, &config.modules).map_err(|e| anyhow!("Frame rejected: {}", e))?;
    Ok(DecodedPacket::from_packet(&packet, size))
}

pub fn execute(data: &[u8], json: bool, config: &LinkConfig) -> Result<()> {
    info!("Decoding {} bytes", data.len());

    let decoded = match decode(data, config) {
        Ok(decoded) => decoded,
        Err(e) => {
            println!("{} {}", "✗".red(), e);
            return Err(e);
        }
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&decoded)?);
        return Ok(());
    }

    println!("{} Valid frame ({} bytes)", "✓".green(), decoded.size);
    println!("Module:     {}", decoded.module_id);
    println!("Command:    {:#04x}", decoded.cmd);
    println!(
        "Flags:      {:#010x}{}",
        decoded.flags,
        if decoded.response { " (response)" } else { "" }
    );
    println!("Payload:    {} bytes", decoded.payload_len);
    if !decoded.payload.is_empty() {
        println!("            {}", decoded.payload);
    }
    if data.len() > decoded.size {
        println!("{} {} trailing bytes ignored", "!".yellow(), data.len() - decoded.size);
    }

    Ok(())
}
