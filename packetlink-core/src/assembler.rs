//! Byte-at-a-time frame assembly

use crate::buffers::ProcessBuffer;
use crate::constants::{frame_len, offset, HEADER_LEN, MAX_PAYLOAD_LEN, START_SYMBOL, TRAILER_LEN};
use crate::error::PacketError;
use bytes::Buf;

/// Receive-side assembly state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RxState {
    /// Idle; the next byte must be the start symbol
    #[default]
    AwaitStart,
    /// Collecting module id, command and payload length
    CollectingHeader,
    /// Collecting payload bytes
    CollectingPayload,
    /// Collecting flags, checksum and end symbol
    CollectingTail,
    /// A whole frame is buffered and waits to be parsed and flushed
    Complete,
}

impl RxState {
    /// No frame in progress
    pub const fn is_idle(&self) -> bool {
        matches!(self, RxState::AwaitStart)
    }

    /// A frame has started but is not yet complete
    pub const fn is_receiving(&self) -> bool {
        matches!(
            self,
            RxState::CollectingHeader | RxState::CollectingPayload | RxState::CollectingTail
        )
    }

    /// A whole frame is buffered
    pub const fn is_complete(&self) -> bool {
        matches!(self, RxState::Complete)
    }
}

/// Outcome of feeding one byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RxStatus {
    /// Byte accepted, frame not finished
    Pending,
    /// Byte accepted and it was the last one of the frame
    Complete,
}

/// Frame assembler driving a receive [`ProcessBuffer`]
#[derive(Debug, Clone, Default)]
pub struct RxAssembler {
    state: RxState,
    expected_len: usize,
}

impl RxAssembler {
    /// Create an assembler awaiting a start symbol
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state
    pub fn state(&self) -> RxState {
        self.state
    }

    /// Total frame length, once the header has been read
    pub fn expected_len(&self) -> Option<usize> {
        match self.state {
            RxState::AwaitStart | RxState::CollectingHeader => None,
            _ => Some(self.expected_len),
        }
    }

    /// Return to awaiting a start symbol
    pub fn reset(&mut self) {
        self.state = RxState::AwaitStart;
        self.expected_len = 0;
    }

    /// Append `byte` to `buffer` and advance the state machine
    ///
    /// Errors:
    /// - `START_SYM`: a frame must begin with the start symbol; the byte is
    ///   discarded and the state stays `AwaitStart`
    /// - `MEMORY`: the buffer is full, or the declared length cannot fit it
    /// - `LENGTH`: the declared payload exceeds the protocol maximum
    ///
    /// A rejected header drops the partial frame: `buffer` is flushed and the
    /// state returns to `AwaitStart`, so the next start symbol begins a new
    /// frame.
    /// - `STATE`: the previous frame has not been flushed yet
    pub fn push(&mut self, buffer: &mut ProcessBuffer, byte: u8) -> Result<RxStatus, PacketError> {
        match self.state {
            RxState::Complete => return Err(PacketError::STATE),
            RxState::AwaitStart if byte != START_SYMBOL => return Err(PacketError::START_SYM),
            _ => {}
        }

        buffer.push(byte)?;
        let len = buffer.len();

        match self.state {
            RxState::AwaitStart => {
                self.state = RxState::CollectingHeader;
            }
            RxState::CollectingHeader if len == HEADER_LEN => {
                let payload_len = usize::from((&buffer.as_slice()[offset::LEN..HEADER_LEN]).get_u16());
                let expected = frame_len(payload_len);

                let mut error = PacketError::SUCCESS;
                if payload_len > MAX_PAYLOAD_LEN {
                    error |= PacketError::LENGTH;
                }
                if expected > buffer.capacity() {
                    error |= PacketError::MEMORY;
                }
                if !error.is_success() {
                    buffer.flush();
                    self.reset();
                    return Err(error);
                }

                self.expected_len = expected;
                self.state = if payload_len == 0 {
                    RxState::CollectingTail
                } else {
                    RxState::CollectingPayload
                };
            }
            RxState::CollectingPayload if len == self.expected_len - TRAILER_LEN => {
                self.state = RxState::CollectingTail;
            }
            RxState::CollectingTail if len == self.expected_len => {
                self.state = RxState::Complete;
                return Ok(RxStatus::Complete);
            }
            _ => {}
        }

        Ok(RxStatus::Pending)
    }
}
