use anyhow::{Context, Result};
use packetlink_core::{scanner::scan_stream_with_stats, LinkConfig};
use serde::{Deserialize, Serialize};
use std::fs;
use tracing::info;

#[derive(Debug, Serialize, Deserialize)]
pub struct RecoveredFrame {
    pub offset: usize,
    pub module_id: u8,
    pub cmd: u8,
    pub flags: u32,
    pub size: usize,
    pub payload: String,
}

pub fn execute(data: &[u8], output: Option<&str>, stats_only: bool, config: &LinkConfig) -> Result<()> {
    info!("Scanning {} bytes", data.len());

    let (located_frames, stats) = scan_stream_with_stats(data, &config.modules);

    // Print statistics
    println!("\n=== Scan Results ===");
    println!("Bytes scanned:     {} bytes", stats.bytes_scanned);
    println!("Start symbols:     {}", stats.candidates);
    println!("Valid frames:      {}", stats.frames_found);
    println!("Decode failures:   {}", stats.decode_failures);
    println!("Bytes recovered:   {} bytes", stats.bytes_recovered);
    println!("Recovery rate:     {:.2}%", stats.recovery_rate());
    if !stats.errors.is_success() {
        println!("Faults seen:       {}", stats.errors);
    }
    println!();

    if stats_only {
        return Ok(());
    }

    // Convert to JSON-friendly format
    let recovered: Vec<RecoveredFrame> = located_frames
        .iter()
        .map(|lf| RecoveredFrame {
            offset: lf.offset,
            module_id: lf.packet.module_id,
            cmd: lf.packet.cmd,
            flags: lf.packet.flags.bits(),
            size: lf.size,
            payload: hex::encode(lf.packet.payload),
        })
        .collect();

    if let Some(output_path) = output {
        let json = serde_json::to_string_pretty(&recovered)
            .with_context(|| "Failed to serialize recovered frames")?;

        fs::write(output_path, json)
            .with_context(|| format!("Failed to write output file: {}", output_path))?;

        info!("Recovered frames written to: {}", output_path);
    } else {
        println!("=== Recovered Frames ===");
        for frame in &recovered {
            println!(
                "Module {} cmd {:#04x} @ offset {}: {} bytes",
                frame.module_id, frame.cmd, frame.offset, frame.size
            );
        }
    }

    Ok(())
}
