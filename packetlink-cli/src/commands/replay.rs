//! Feed a capture through a device-side channel that echoes every command

use anyhow::{anyhow, Context, Result};
use colored::*;
use packetlink_core::{
    buffers::SendPacket,
    channel::{Channel, IoSink, PacketHandler, SliceSource},
    LinkConfig, Packet, PacketError, ProcessReport,
};
use std::fs::File;
use std::io::{BufWriter, Write};
use tracing::{debug, info};

/// Replies to every command with its own payload and counts acknowledgments
#[derive(Debug, Default)]
pub struct EchoHandler {
    pub acks: usize,
}

impl PacketHandler for EchoHandler {
    fn on_command(&mut self, request: &Packet<'_>, reply: &mut SendPacket) -> Result<(), PacketError> {
        debug!(
            "Echoing module {} cmd {:#04x} ({} bytes)",
            request.module_id,
            request.cmd,
            request.payload_len()
        );
        reply.set_payload(request.payload)
    }

    fn on_ack(&mut self, packet: &Packet<'_>) -> Result<(), PacketError> {
        debug!("Ack from module {} cmd {:#04x}", packet.module_id, packet.cmd);
        self.acks += 1;
        Ok(())
    }
}

/// Run `data` through a channel, writing replies to `writer`
pub fn replay<W: Write>(data: &[u8], writer: W, config: &LinkConfig) -> Result<(ProcessReport, W)> {
    let mut channel = Channel::new(config, SliceSource::new(data), IoSink::new(writer), EchoHandler::default())
        .map_err(|e| anyhow!("Failed to set up channel: {}", e))?;

    let report = channel.process_incoming();
    channel
        .shutdown()
        .map_err(|e| anyhow!("Failed to release buffers: {}", e))?;

    let (_, mut sink, _) = channel.into_parts();
    if let Some(e) = sink.take_error() {
        return Err(e).context("Failed to write replies");
    }
    Ok((report, sink.into_inner()))
}

pub fn execute(data: &[u8], output: Option<&str>, config: &LinkConfig) -> Result<()> {
    info!("Replaying {} bytes (block length {})", data.len(), config.block_len);

    let report = match output {
        Some(path) => {
            let file = File::create(path).with_context(|| format!("Failed to create output file: {}", path))?;
            let (report, mut writer) = replay(data, BufWriter::new(file), config)?;
            writer.flush()?;
            info!("Replies written to: {}", path);
            report
        }
        None => {
            let (report, replies) = replay(data, Vec::new(), config)?;
            if !replies.is_empty() {
                println!("{}", hex::encode(replies));
            }
            report
        }
    };

    println!("\n=== Replay Results ===");
    println!("Bytes processed:   {}", report.bytes);
    println!("Commands:          {}", report.commands);
    println!("Acks:              {}", report.acks);
    println!("Replies:           {}", report.replies);
    println!("Rejected:          {}", report.rejected);

    if report.is_clean() {
        println!("{} No framing faults", "✓".green());
    } else {
        println!("{} Faults seen: {}", "✗".red(), report.errors);
    }

    Ok(())
}
