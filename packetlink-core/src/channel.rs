//! Channel driver
//!
//! Binds a [`BufferPair`] to a byte transport and an application handler.
//! [`Channel::process_incoming`] drains the source one byte at a time; every
//! completed frame is decoded and dispatched, a reply is encoded and written
//! for commands, then both buffers are flushed. Framing faults are collected
//! in the returned [`ProcessReport`] and never stop the loop.

use crate::assembler::RxStatus;
use crate::buffers::{BufferPair, SendPacket};
use crate::config::LinkConfig;
use crate::constants::{PacketFlags, DEFAULT_LOG_CMD};
use crate::error::PacketError;
use crate::queue::RxQueue;
use crate::registry::ModuleRegistry;
use crate::types::Packet;
use alloc::collections::VecDeque;
use alloc::vec::Vec;
use core::fmt::{self, Write};

#[cfg(feature = "logging")]
use tracing::{debug, trace, warn};

/// Where received bytes come from
pub trait ByteSource {
    /// Bytes that can be read without waiting
    fn bytes_available(&self) -> usize;

    /// Read one byte, `None` when nothing is available
    fn read_byte(&mut self) -> Option<u8>;
}

/// Where encoded frames go
///
/// Writes are fire-and-forget at this layer; a sink that can fail keeps its
/// own error state (see [`IoSink`]).
pub trait ByteSink {
    /// Write a complete frame
    fn write_bytes(&mut self, bytes: &[u8]);
}

/// Application callbacks for decoded packets
pub trait PacketHandler {
    /// Handle a command
    ///
    /// `reply` arrives addressed to the request (same module id and command,
    /// `RESPONSE` flag set, empty payload). The handler may change any field.
    /// Returning an error suppresses the reply.
    fn on_command(&mut self, request: &Packet<'_>, reply: &mut SendPacket) -> Result<(), PacketError>;

    /// Handle a packet whose flags mark it as a response
    fn on_ack(&mut self, packet: &Packet<'_>) -> Result<(), PacketError>;
}

/// Byte source over a borrowed slice
#[derive(Debug, Clone)]
pub struct SliceSource<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> SliceSource<'a> {
    /// Read `data` from the beginning
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Bytes consumed so far
    pub fn position(&self) -> usize {
        self.pos
    }
}

impl ByteSource for SliceSource<'_> {
    fn bytes_available(&self) -> usize {
        self.data.len() - self.pos
    }

    fn read_byte(&mut self) -> Option<u8> {
        let byte = *self.data.get(self.pos)?;
        self.pos += 1;
        Some(byte)
    }
}

impl ByteSource for VecDeque<u8> {
    fn bytes_available(&self) -> usize {
        self.len()
    }

    fn read_byte(&mut self) -> Option<u8> {
        self.pop_front()
    }
}

impl<const N: usize> ByteSource for &RxQueue<N> {
    fn bytes_available(&self) -> usize {
        self.len()
    }

    fn read_byte(&mut self) -> Option<u8> {
        self.pop()
    }
}

impl ByteSink for Vec<u8> {
    fn write_bytes(&mut self, bytes: &[u8]) {
        self.extend_from_slice(bytes);
    }
}

/// Adapter writing frames to any [`std::io::Write`]
///
/// The first I/O error is kept and later writes are skipped.
#[cfg(feature = "std")]
#[derive(Debug)]
pub struct IoSink<W> {
    inner: W,
    written: usize,
    error: Option<std::io::Error>,
}

#[cfg(feature = "std")]
impl<W: std::io::Write> IoSink<W> {
    /// Wrap a writer
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            written: 0,
            error: None,
        }
    }

    /// Bytes successfully written
    pub fn written(&self) -> usize {
        self.written
    }

    /// Take the recorded I/O error, if any
    pub fn take_error(&mut self) -> Option<std::io::Error> {
        self.error.take()
    }

    /// Unwrap the writer
    pub fn into_inner(self) -> W {
        self.inner
    }
}

#[cfg(feature = "std")]
impl<W: std::io::Write> ByteSink for IoSink<W> {
    fn write_bytes(&mut self, bytes: &[u8]) {
        if self.error.is_some() {
            return;
        }
        match self.inner.write_all(bytes) {
            Ok(()) => self.written += bytes.len(),
            Err(e) => {
                #[cfg(feature = "logging")]
                warn!("Frame write failed: {}", e);
                self.error = Some(e);
            }
        }
    }
}

/// Outcome of one [`Channel::process_incoming`] pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProcessReport {
    /// Bytes read from the source
    pub bytes: usize,

    /// Commands dispatched to the handler
    pub commands: usize,

    /// Responses dispatched to the handler
    pub acks: usize,

    /// Reply frames written to the sink
    pub replies: usize,

    /// Frames or bytes rejected
    pub rejected: usize,

    /// Every fault seen during the pass
    pub errors: PacketError,
}

impl ProcessReport {
    /// True when the pass saw no fault
    pub fn is_clean(&self) -> bool {
        self.errors.is_success()
    }
}

/// One communication channel
pub struct Channel<S, K, H> {
    pair: BufferPair,
    registry: ModuleRegistry,
    log_cmd: u8,
    source: S,
    sink: K,
    handler: H,
}

impl<S: ByteSource, K: ByteSink, H: PacketHandler> Channel<S, K, H> {
    /// Build a channel and generate its buffer pair from `config`
    ///
    /// `config` is expected to be validated; a block length above its
    /// maximum surfaces here as `MEMORY`.
    pub fn new(config: &LinkConfig, source: S, sink: K, handler: H) -> Result<Self, PacketError> {
        let mut pair = BufferPair::from_config(config);
        pair.generate(config.block_len)?;
        Ok(Self::with_pair(pair, config.modules, source, sink, handler).with_log_cmd(config.log_cmd))
    }

    /// Build a channel around an existing pair
    pub fn with_pair(pair: BufferPair, registry: ModuleRegistry, source: S, sink: K, handler: H) -> Self {
        Self {
            pair,
            registry,
            log_cmd: DEFAULT_LOG_CMD,
            source,
            sink,
            handler,
        }
    }

    /// Set the command opcode used by [`log`](Self::log)
    pub fn with_log_cmd(mut self, log_cmd: u8) -> Self {
        self.log_cmd = log_cmd;
        self
    }

    /// Drain the source, dispatching every frame it completes
    pub fn process_incoming(&mut self) -> ProcessReport {
        let mut report = ProcessReport::default();
        if !self.pair.is_generated() {
            report.errors = PacketError::MEMORY;
            return report;
        }

        while self.source.bytes_available() > 0 {
            let Some(byte) = self.source.read_byte() else {
                break;
            };
            report.bytes += 1;

            match self.pair.process_rx_byte(byte) {
                Ok(RxStatus::Pending) => {}
                Ok(RxStatus::Complete) => self.dispatch(&mut report),
                Err(e) if e == PacketError::START_SYM => {
                    #[cfg(feature = "logging")]
                    debug!("Discarding byte {:#04x} outside a frame", byte);
                    report.rejected += 1;
                    report.errors |= e;
                }
                Err(e) => {
                    #[cfg(feature = "logging")]
                    warn!("Receive failed: {}; dropping partial frame", e);
                    report.rejected += 1;
                    report.errors |= e;
                    // Storage is known to exist, so the flush cannot fail
                    let flushed = self.pair.flush_rx();
                    debug_assert!(flushed.is_ok());
                }
            }
        }

        report
    }

    fn dispatch(&mut self, report: &mut ProcessReport) {
        let outcome = match self.pair.dispatch_parts(&self.registry) {
            Ok((request, _)) if request.is_response() => {
                #[cfg(feature = "logging")]
                trace!("Ack module {} cmd {:#04x}", request.module_id, request.cmd);
                report.acks += 1;
                self.handler.on_ack(&request).map(|()| false)
            }
            Ok((request, reply)) => {
                #[cfg(feature = "logging")]
                trace!(
                    "Command module {} cmd {:#04x} ({} byte payload)",
                    request.module_id,
                    request.cmd,
                    request.payload_len()
                );
                report.commands += 1;
                reply.prepare_reply(&request);
                self.handler.on_command(&request, reply).map(|()| true)
            }
            Err(e) => {
                #[cfg(feature = "logging")]
                warn!("Dropping frame: {}", e);
                report.rejected += 1;
                Err(e)
            }
        };

        match outcome {
            Ok(true) => match self.pair.construct_packet(&self.registry) {
                Ok(frame) => {
                    self.sink.write_bytes(frame);
                    report.replies += 1;
                }
                Err(e) => {
                    #[cfg(feature = "logging")]
                    warn!("Reply could not be encoded: {}", e);
                    report.errors |= e;
                }
            },
            Ok(false) => {}
            Err(e) => report.errors |= e,
        }

        // Storage is known to exist, so the flush cannot fail
        let flushed = self.pair.flush();
        debug_assert!(flushed.is_ok());
    }

    /// Encode and write one packet
    ///
    /// Returns the frame length.
    pub fn send(&mut self, module_id: u8, cmd: u8, payload: &[u8], flags: PacketFlags) -> Result<usize, PacketError> {
        let staged = self.pair.send_packet()?;
        staged.module_id = module_id;
        staged.cmd = cmd;
        staged.flags = flags;
        staged.set_payload(payload)?;
        self.send_packet()
    }

    /// Encode and write whatever is staged in [`send_buffer`](Self::send_buffer)
    pub fn send_packet(&mut self) -> Result<usize, PacketError> {
        let frame = self.pair.construct_packet(&self.registry)?;
        let len = frame.len();
        self.sink.write_bytes(frame);
        self.pair.flush_tx()?;

        #[cfg(feature = "logging")]
        trace!("Sent {} byte frame", len);

        Ok(len)
    }

    /// Send formatted diagnostic text as a log packet
    ///
    /// The packet goes to `module_id` with the configured log command and no
    /// flags. Text longer than the block length is not sent and yields
    /// `MEMORY`.
    pub fn log(&mut self, module_id: u8, args: fmt::Arguments<'_>) -> Result<usize, PacketError> {
        let staged = self.pair.send_packet()?;
        staged.module_id = module_id;
        staged.cmd = self.log_cmd;
        staged.flags = PacketFlags::default();
        staged.clear_payload();
        if staged.write_fmt(args).is_err() {
            staged.clear_payload();
            return Err(PacketError::MEMORY);
        }
        self.send_packet()
    }

    /// The outgoing packet, for staging a send
    pub fn send_buffer(&mut self) -> Result<&mut SendPacket, PacketError> {
        self.pair.send_packet()
    }

    /// Advance the stalled-frame clock
    pub fn tick(&mut self, ticks: u32) -> Result<(), PacketError> {
        self.pair.tick(ticks)
    }

    /// Release the buffer pair; the channel is unusable afterwards
    pub fn shutdown(&mut self) -> Result<(), PacketError> {
        self.pair.destroy()
    }

    /// Buffer pair
    pub fn pair(&self) -> &BufferPair {
        &self.pair
    }

    /// Valid module ids
    pub fn registry(&self) -> &ModuleRegistry {
        &self.registry
    }

    /// Byte source
    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    /// Byte sink
    pub fn sink(&self) -> &K {
        &self.sink
    }

    /// Byte sink
    pub fn sink_mut(&mut self) -> &mut K {
        &mut self.sink
    }

    /// Packet handler
    pub fn handler(&self) -> &H {
        &self.handler
    }

    /// Take the channel apart
    pub fn into_parts(self) -> (S, K, H) {
        (self.source, self.sink, self.handler)
    }
}
