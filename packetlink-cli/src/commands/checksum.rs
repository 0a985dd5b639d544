use anyhow::{anyhow, Result};
use packetlink_core::checksum::{checksum16, frame_checksum};

/// Checksum of `data`: the raw range, or the covered range of a whole frame
pub fn compute(data: &[u8], frame: bool) -> Result<u16> {
    if frame {
        frame_checksum(data).map_err(|e| anyhow!("Not a complete frame: {}", e))
    } else {
        Ok(checksum16(data))
    }
}

pub fn execute(data: &[u8], frame: bool) -> Result<()> {
    let checksum = compute(data, frame)?;
    println!("{:#06x}", checksum);
    Ok(())
}
