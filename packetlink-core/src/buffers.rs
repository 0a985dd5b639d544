//! Buffer lifecycle management
//!
//! A [`BufferPair`] owns the send and receive storage of one channel. Storage
//! exists only between a successful [`generate`](BufferPair::generate) and the
//! matching [`destroy`](BufferPair::destroy); every operation on a pair that
//! has no storage fails with `MEMORY`.

use crate::assembler::{RxAssembler, RxState, RxStatus};
use crate::config::LinkConfig;
use crate::constants::{PacketFlags, DEFAULT_RX_TIMEOUT, FRAME_OVERHEAD, MAX_BLOCK_LEN};
use crate::decoder::parse_frame;
use crate::encoder::construct_frame;
use crate::error::PacketError;
use crate::registry::ModuleRegistry;
use crate::types::Packet;
use alloc::boxed::Box;
use alloc::vec;
use core::fmt;

#[cfg(feature = "logging")]
use tracing::{debug, warn};

/// Fixed-capacity raw byte storage for one direction of a channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessBuffer {
    buffer: Box<[u8]>,
    index: usize,
    elapsed: u32,
}

impl ProcessBuffer {
    /// Allocate a zeroed buffer of `capacity` bytes
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: vec![0u8; capacity].into_boxed_slice(),
            index: 0,
            elapsed: 0,
        }
    }

    /// Capacity fixed at allocation
    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// Cursor position: number of valid bytes
    pub fn len(&self) -> usize {
        self.index
    }

    /// True when the cursor is at zero
    pub fn is_empty(&self) -> bool {
        self.index == 0
    }

    /// Valid bytes, from zero to the cursor
    pub fn as_slice(&self) -> &[u8] {
        &self.buffer[..self.index]
    }

    /// Ticks since the last byte was appended
    pub fn elapsed(&self) -> u32 {
        self.elapsed
    }

    /// Append a byte at the cursor
    pub fn push(&mut self, byte: u8) -> Result<(), PacketError> {
        if self.index >= self.buffer.len() {
            return Err(PacketError::MEMORY);
        }
        self.buffer[self.index] = byte;
        self.index += 1;
        self.elapsed = 0;
        Ok(())
    }

    /// Reset the cursor and the elapsed counter; contents are left in place
    pub fn flush(&mut self) {
        self.index = 0;
        self.elapsed = 0;
    }

    pub(crate) fn storage_mut(&mut self) -> &mut [u8] {
        &mut self.buffer
    }

    pub(crate) fn set_len(&mut self, len: usize) {
        debug_assert!(len <= self.buffer.len());
        self.index = len;
    }

    pub(crate) fn advance_elapsed(&mut self, ticks: u32) -> u32 {
        self.elapsed = self.elapsed.saturating_add(ticks);
        self.elapsed
    }
}

/// The outgoing packet of a buffer pair
///
/// The payload area is allocated with the pair and sized to its block length;
/// nothing here allocates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendPacket {
    /// Routing tag of the target subsystem
    pub module_id: u8,

    /// Module-scoped opcode
    pub cmd: u8,

    /// Response indicator and status bits
    pub flags: PacketFlags,

    payload: Box<[u8]>,
    payload_len: usize,
}

impl SendPacket {
    fn new(payload_max: usize) -> Self {
        Self {
            module_id: 0,
            cmd: 0,
            flags: PacketFlags::default(),
            payload: vec![0u8; payload_max].into_boxed_slice(),
            payload_len: 0,
        }
    }

    /// Capacity of the payload area
    pub fn payload_max(&self) -> usize {
        self.payload.len()
    }

    /// Current payload
    pub fn payload(&self) -> &[u8] {
        &self.payload[..self.payload_len]
    }

    /// The whole payload area, for handlers that write in place before
    /// calling [`set_payload_len`](Self::set_payload_len)
    pub fn payload_area(&mut self) -> &mut [u8] {
        &mut self.payload
    }

    /// Declare how many bytes of the payload area are valid
    pub fn set_payload_len(&mut self, len: usize) -> Result<(), PacketError> {
        if len > self.payload.len() {
            return Err(PacketError::MEMORY);
        }
        self.payload_len = len;
        Ok(())
    }

    /// Copy `bytes` in as the payload
    pub fn set_payload(&mut self, bytes: &[u8]) -> Result<(), PacketError> {
        if bytes.len() > self.payload.len() {
            return Err(PacketError::MEMORY);
        }
        self.payload[..bytes.len()].copy_from_slice(bytes);
        self.payload_len = bytes.len();
        Ok(())
    }

    /// Append one byte to the payload
    pub fn push(&mut self, byte: u8) -> Result<(), PacketError> {
        self.extend_payload(&[byte])
    }

    /// Append `bytes` to the payload; nothing is written if they do not fit
    pub fn extend_payload(&mut self, bytes: &[u8]) -> Result<(), PacketError> {
        let end = self.payload_len + bytes.len();
        if end > self.payload.len() {
            return Err(PacketError::MEMORY);
        }
        self.payload[self.payload_len..end].copy_from_slice(bytes);
        self.payload_len = end;
        Ok(())
    }

    /// Drop the payload
    pub fn clear_payload(&mut self) {
        self.payload_len = 0;
    }

    /// Address this packet as the response to `request`
    ///
    /// Echoes module id and command, sets the response flag, empties the
    /// payload.
    pub fn prepare_reply(&mut self, request: &Packet<'_>) {
        self.module_id = request.module_id;
        self.cmd = request.cmd;
        self.flags = PacketFlags::response();
        self.payload_len = 0;
    }

    /// Borrowed view used for encoding
    pub fn as_packet(&self) -> Packet<'_> {
        Packet {
            module_id: self.module_id,
            cmd: self.cmd,
            payload: self.payload(),
            payload_max: self.payload.len(),
            flags: self.flags,
            error: PacketError::SUCCESS,
        }
    }
}

/// Formatted text appends to the payload; text that does not fit fails
/// with [`fmt::Error`]
impl fmt::Write for SendPacket {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.extend_payload(s.as_bytes()).map_err(|_| fmt::Error)
    }
}

#[derive(Debug)]
struct Storage {
    block_len: usize,
    send: SendPacket,
    tx: ProcessBuffer,
    rx: ProcessBuffer,
}

/// Send and receive storage plus receive state for one channel
#[derive(Debug)]
pub struct BufferPair {
    max_block_len: usize,
    rx_timeout: u32,
    storage: Option<Storage>,
    assembler: RxAssembler,
}

impl BufferPair {
    /// Create a pair in the not-generated state
    pub fn new() -> Self {
        Self {
            max_block_len: MAX_BLOCK_LEN,
            rx_timeout: DEFAULT_RX_TIMEOUT,
            storage: None,
            assembler: RxAssembler::new(),
        }
    }

    /// Create a not-generated pair with the limits of `config`
    pub fn from_config(config: &LinkConfig) -> Self {
        Self {
            max_block_len: config.max_block_len,
            rx_timeout: config.rx_timeout,
            ..Self::new()
        }
    }

    /// Set the stalled-frame timeout, in ticks
    pub fn with_rx_timeout(mut self, ticks: u32) -> Self {
        self.rx_timeout = ticks;
        self
    }

    /// Allocate both process buffers for payloads of up to `block_len` bytes
    ///
    /// Fails with `STATE` if already generated and `MEMORY` if `block_len`
    /// exceeds the configured maximum. A failed call leaves the pair as it
    /// was.
    pub fn generate(&mut self, block_len: usize) -> Result<(), PacketError> {
        let mut error = PacketError::SUCCESS;
        if self.storage.is_some() {
            error |= PacketError::STATE;
        }
        if block_len > self.max_block_len {
            error |= PacketError::MEMORY;
        }
        if !error.is_success() {
            #[cfg(feature = "logging")]
            warn!("Buffer generation failed for block length {}: {}", block_len, error);
            return Err(error);
        }

        let frame_capacity = block_len + FRAME_OVERHEAD;
        self.storage = Some(Storage {
            block_len,
            send: SendPacket::new(block_len),
            tx: ProcessBuffer::new(frame_capacity),
            rx: ProcessBuffer::new(frame_capacity),
        });
        self.assembler.reset();

        #[cfg(feature = "logging")]
        debug!("Generated buffer pair: block {} bytes, frame capacity {}", block_len, frame_capacity);

        Ok(())
    }

    /// Release both process buffers
    ///
    /// Fails with `MEMORY` if the pair holds no storage, whether it was never
    /// generated, generation failed, or it was already destroyed.
    pub fn destroy(&mut self) -> Result<(), PacketError> {
        match self.storage.take() {
            Some(_) => {
                self.assembler.reset();
                #[cfg(feature = "logging")]
                debug!("Destroyed buffer pair");
                Ok(())
            }
            None => Err(PacketError::MEMORY),
        }
    }

    /// True between a successful generate and the next destroy
    pub fn is_generated(&self) -> bool {
        self.storage.is_some()
    }

    /// Block length the pair was generated with
    pub fn block_len(&self) -> Option<usize> {
        self.storage.as_ref().map(|s| s.block_len)
    }

    /// Largest block length accepted by [`generate`](Self::generate)
    pub fn max_block_len(&self) -> usize {
        self.max_block_len
    }

    /// Receive-side assembly state
    pub fn rx_state(&self) -> RxState {
        self.assembler.state()
    }

    /// Receive process buffer, if generated
    pub fn rx_buffer(&self) -> Option<&ProcessBuffer> {
        self.storage.as_ref().map(|s| &s.rx)
    }

    /// Send process buffer, if generated
    pub fn tx_buffer(&self) -> Option<&ProcessBuffer> {
        self.storage.as_ref().map(|s| &s.tx)
    }

    /// Reset the send cursor
    pub fn flush_tx(&mut self) -> Result<(), PacketError> {
        let storage = self.storage.as_mut().ok_or(PacketError::MEMORY)?;
        storage.tx.flush();
        Ok(())
    }

    /// Reset the receive cursor and return the assembler to awaiting a start symbol
    pub fn flush_rx(&mut self) -> Result<(), PacketError> {
        let storage = self.storage.as_mut().ok_or(PacketError::MEMORY)?;
        storage.rx.flush();
        self.assembler.reset();
        Ok(())
    }

    /// Flush both directions
    pub fn flush(&mut self) -> Result<(), PacketError> {
        self.flush_tx()?;
        self.flush_rx()
    }

    /// Feed one received byte to the assembler
    pub fn process_rx_byte(&mut self, byte: u8) -> Result<RxStatus, PacketError> {
        let storage = self.storage.as_mut().ok_or(PacketError::MEMORY)?;
        self.assembler.push(&mut storage.rx, byte)
    }

    /// Decode the receive buffer
    ///
    /// Reports `INCOMPLETE` if fewer bytes than the declared frame length have
    /// been assembled. The returned packet borrows the receive buffer.
    pub fn parse_packet(&self, registry: &ModuleRegistry) -> Result<Packet<'_>, PacketError> {
        let storage = self.storage.as_ref().ok_or(PacketError::MEMORY)?;
        let mut packet = parse_frame(storage.rx.as_slice(), registry)?;
        packet.payload_max = storage.block_len;
        Ok(packet)
    }

    /// The outgoing packet, for staging before [`construct_packet`](Self::construct_packet)
    pub fn send_packet(&mut self) -> Result<&mut SendPacket, PacketError> {
        self.storage
            .as_mut()
            .map(|s| &mut s.send)
            .ok_or(PacketError::MEMORY)
    }

    /// Encode the staged send packet into the send buffer and return the frame
    pub fn construct_packet(&mut self, registry: &ModuleRegistry) -> Result<&[u8], PacketError> {
        let storage = self.storage.as_mut().ok_or(PacketError::MEMORY)?;
        let packet = storage.send.as_packet();
        construct_frame(&packet, &mut storage.tx, registry)?;
        Ok(storage.tx.as_slice())
    }

    /// Decoded request and outgoing packet at once, for dispatch
    pub(crate) fn dispatch_parts(
        &mut self,
        registry: &ModuleRegistry,
    ) -> Result<(Packet<'_>, &mut SendPacket), PacketError> {
        let storage = self.storage.as_mut().ok_or(PacketError::MEMORY)?;
        let Storage {
            block_len,
            send,
            rx,
            ..
        } = storage;
        let rx: &ProcessBuffer = rx;
        let mut packet = parse_frame(rx.as_slice(), registry)?;
        packet.payload_max = *block_len;
        Ok((packet, send))
    }

    /// Advance the stalled-frame clock by `ticks`
    ///
    /// Only a partially assembled frame ages. Once it has gone `rx_timeout`
    /// ticks without a new byte it is dropped and `INCOMPLETE` is returned.
    pub fn tick(&mut self, ticks: u32) -> Result<(), PacketError> {
        let storage = self.storage.as_mut().ok_or(PacketError::MEMORY)?;
        if !self.assembler.state().is_receiving() {
            return Ok(());
        }

        let elapsed = storage.rx.advance_elapsed(ticks);
        if elapsed < self.rx_timeout {
            return Ok(());
        }

        #[cfg(feature = "logging")]
        warn!(
            "Dropping stalled frame after {} ticks ({} bytes assembled)",
            elapsed,
            storage.rx.len()
        );

        storage.rx.flush();
        self.assembler.reset();
        Err(PacketError::INCOMPLETE)
    }
}

impl Default for BufferPair {
    fn default() -> Self {
        Self::new()
    }
}
