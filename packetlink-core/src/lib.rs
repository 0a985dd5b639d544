//! # Packetlink Core
//!
//! Wire-level framing for command/response links between a device and its host
//! over a byte stream (UART, USB CDC, pipes).
//!
//! ```text
//! START | module | cmd | len (u16 BE) | payload | flags (u32 BE) | checksum (u16 BE) | END
//! ```
//!
//! ## Modules
//!
//! - `constants`: Frame format constants, limits and packet flags
//! - `error`: Fault bit set and configuration errors
//! - `checksum`: 16-bit complement-of-sum checksum
//! - `registry`: Set of valid module ids
//! - `types`: Borrowed packet view
//! - `encoder`: Frame encoding
//! - `decoder`: Strict frame decoding
//! - `assembler`: Byte-at-a-time receive state machine
//! - `buffers`: Buffer pair lifecycle
//! - `channel`: Transport-facing driver and dispatch
//! - `queue`: Interrupt-safe receive queue
//! - `scanner`: Frame recovery from captured streams
//! - `config`: Link configuration

#![cfg_attr(not(feature = "std"), no_std)]
#![warn(missing_docs)]

extern crate alloc;

pub mod assembler;
pub mod buffers;
pub mod channel;
pub mod checksum;
pub mod config;
pub mod constants;
pub mod decoder;
pub mod encoder;
pub mod error;
pub mod queue;
pub mod registry;
pub mod scanner;
pub mod types;

// Re-export commonly used types
pub use assembler::{RxAssembler, RxState, RxStatus};
pub use buffers::{BufferPair, ProcessBuffer, SendPacket};
pub use channel::{ByteSink, ByteSource, Channel, PacketHandler, ProcessReport};
pub use config::LinkConfig;
pub use constants::PacketFlags;
pub use error::{ConfigError, PacketError};
pub use registry::ModuleRegistry;
pub use types::Packet;

/// Result type alias for Packetlink operations
pub type Result<T> = core::result::Result<T, PacketError>;
