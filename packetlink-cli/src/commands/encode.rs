use anyhow::{anyhow, Context, Result};
use bytes::Bytes;
use packetlink_core::{constants::PacketFlags, encoder::PacketBuilder, LinkConfig};
use std::fs;
use tracing::info;

/// Fields of the packet to encode
#[derive(Debug, Clone, Default)]
pub struct EncodeArgs {
    pub module_id: u8,
    pub cmd: u8,
    pub payload: Vec<u8>,
    pub flags: u32,
    pub response: bool,
}

/// Encode one frame; returns the frame bytes
pub fn encode(args: &EncodeArgs, config: &LinkConfig) -> Result<Bytes> {
    let mut builder = PacketBuilder::new(args.module_id)
        .cmd(args.cmd)
        .payload(Bytes::copy_from_slice(&args.payload))
        .flags(args.flags);
    if args.response {
        builder = builder.response();
    }

    builder.build(&config.modules).map_err(|e| {
        anyhow!(
            "Failed to encode module {} cmd {:#04x}: {}",
            args.module_id,
            args.cmd,
            e
        )
    })
}

pub fn execute(args: &EncodeArgs, output: Option<&str>, config: &LinkConfig) -> Result<()> {
    let frame = encode(args, config)?;
    let flags = PacketFlags::new(args.flags | if args.response { PacketFlags::RESPONSE } else { 0 });
    info!(
        "Encoded module {} cmd {:#04x} flags {:#010x}: {} bytes",
        args.module_id,
        args.cmd,
        flags.bits(),
        frame.len()
    );

    match output {
        Some(path) => {
            fs::write(path, &frame).with_context(|| format!("Failed to write output file: {}", path))?;
            info!("Frame written to: {}", path);
        }
        None => println!("{}", hex::encode(&frame)),
    }

    Ok(())
}
