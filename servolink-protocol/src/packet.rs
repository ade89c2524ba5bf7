//! Instruction packet encoding and status packet decoding
//!
//! Encoding builds a complete wire frame from an id, an instruction and its
//! parameter bytes. Decoding is a byte-fed state machine so the caller can
//! hand over whatever the transport produced, chunked or not, and get back
//! either a validated [`StatusPacket`] or one specific [`FrameError`].

use heapless::Vec;

use crate::instruction::{Instruction, BROADCAST_ID};
use crate::status::DeviceStatus;

/// Marker byte; every frame starts with two of these
pub const PACKET_HEADER: u8 = 0xFF;

/// Maximum number of parameter bytes in one frame
pub const MAX_PARAMS: usize = 250;

/// Maximum complete frame size (MARKER ×2 + ID + LENGTH + INSTRUCTION +
/// MAX_PARAMS + CHECKSUM)
pub const MAX_FRAME_SIZE: usize = 2 + 1 + 1 + 1 + MAX_PARAMS + 1;

/// Checksum over the frame bytes between the markers and the checksum slot
///
/// Complement of the truncated byte sum, so for any byte sequence `b`,
/// `(sum(b) + checksum(b)) & 0xFF == 0xFF`.
pub fn checksum(bytes: &[u8]) -> u8 {
    let mut sum = 0u8;
    for &byte in bytes {
        sum = sum.wrapping_add(byte);
    }
    !sum
}

/// Errors raised while encoding or decoding a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameError {
    /// A marker byte was not 0xFF
    HeaderMismatch { found: u8 },
    /// The response id differs from the addressed device
    IdMismatch { expected: u8, found: u8 },
    /// Length field below 2 or beyond the frame maximum
    BadLength { found: u8 },
    /// Trailing checksum byte does not match the frame contents
    ChecksumMismatch { expected: u8, found: u8 },
    /// The device reported a fault in its status byte
    DeviceFault(DeviceStatus),
    /// Not a single byte arrived within the transport timeout
    EmptyResponse,
    /// The frame started but ended short of its declared length
    TruncatedResponse,
    /// More parameter bytes than a frame can carry
    PayloadTooLarge,
    /// Encode target buffer smaller than the frame
    BufferTooSmall,
}

/// An instruction packet headed for the bus
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstructionPacket {
    /// Target device id, or [`BROADCAST_ID`]
    pub id: u8,
    /// Instruction code
    pub instruction: Instruction,
    params: Vec<u8, MAX_PARAMS>,
}

impl InstructionPacket {
    /// Build a packet from an id, an instruction and its parameter bytes
    pub fn new(id: u8, instruction: Instruction, params: &[u8]) -> Result<Self, FrameError> {
        let params = Vec::from_slice(params).map_err(|_| FrameError::PayloadTooLarge)?;
        Ok(Self {
            id,
            instruction,
            params,
        })
    }

    /// Parameter bytes
    pub fn params(&self) -> &[u8] {
        &self.params
    }

    /// Value of the wire LENGTH field: parameter count plus two
    pub fn length_byte(&self) -> u8 {
        self.params.len() as u8 + 2
    }

    /// Encode this packet into a byte buffer
    ///
    /// Returns the number of bytes written.
    pub fn encode(&self, buffer: &mut [u8]) -> Result<usize, FrameError> {
        let frame_len = self.params.len() + 6;
        if buffer.len() < frame_len {
            return Err(FrameError::BufferTooSmall);
        }

        buffer[0] = PACKET_HEADER;
        buffer[1] = PACKET_HEADER;
        buffer[2] = self.id;
        buffer[3] = self.length_byte();
        buffer[4] = self.instruction.code();
        buffer[5..5 + self.params.len()].copy_from_slice(&self.params);
        // Markers excluded from the sum.
        buffer[frame_len - 1] = checksum(&buffer[2..frame_len - 1]);

        Ok(frame_len)
    }

    /// Encode this packet into a heapless Vec
    pub fn encode_to_vec(&self) -> Result<Vec<u8, MAX_FRAME_SIZE>, FrameError> {
        let mut buffer = [0u8; MAX_FRAME_SIZE];
        let len = self.encode(&mut buffer)?;
        Vec::from_slice(&buffer[..len]).map_err(|_| FrameError::BufferTooSmall)
    }
}

/// A validated response with its device error byte already checked
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusPacket {
    /// Responding device id
    pub id: u8,
    /// Parameter bytes between the status byte and the checksum
    pub params: Vec<u8, MAX_PARAMS>,
}

/// State machine for parsing incoming status packets
///
/// Construct one per expected response. An expected id of [`BROADCAST_ID`]
/// accepts a response from any device. Every failure resets the parser and
/// discards the frame; there is no partial recovery.
#[derive(Debug, Clone)]
pub struct StatusParser {
    expected_id: u8,
    state: ParseState,
    id: u8,
    length: u8,
    status: u8,
    sum: u8,
    params: Vec<u8, MAX_PARAMS>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParseState {
    /// Waiting for the first marker byte
    Marker0,
    /// Waiting for the second marker byte
    Marker1,
    /// Waiting for the device id
    Id,
    /// Waiting for the LENGTH field
    Length,
    /// Waiting for the device status byte
    Status,
    /// Reading parameter bytes
    Params,
    /// Waiting for the trailing checksum
    Checksum,
}

impl StatusParser {
    /// Create a parser for a response from `expected_id`
    pub fn new(expected_id: u8) -> Self {
        Self {
            expected_id,
            state: ParseState::Marker0,
            id: 0,
            length: 0,
            status: 0,
            sum: 0,
            params: Vec::new(),
        }
    }

    /// Reset the parser state, keeping the expected id
    pub fn reset(&mut self) {
        self.state = ParseState::Marker0;
        self.id = 0;
        self.length = 0;
        self.status = 0;
        self.sum = 0;
        self.params.clear();
    }

    /// Feed a single byte to the parser
    ///
    /// Returns `Ok(Some(packet))` when a complete valid frame is parsed,
    /// `Ok(None)` when more bytes are needed, or `Err` on the first
    /// malformed byte.
    pub fn feed(&mut self, byte: u8) -> Result<Option<StatusPacket>, FrameError> {
        match self.state {
            ParseState::Marker0 => {
                if byte != PACKET_HEADER {
                    self.reset();
                    return Err(FrameError::HeaderMismatch { found: byte });
                }
                self.state = ParseState::Marker1;
                Ok(None)
            }
            ParseState::Marker1 => {
                if byte != PACKET_HEADER {
                    self.reset();
                    return Err(FrameError::HeaderMismatch { found: byte });
                }
                self.state = ParseState::Id;
                Ok(None)
            }
            ParseState::Id => {
                if self.expected_id != BROADCAST_ID && byte != self.expected_id {
                    let expected = self.expected_id;
                    self.reset();
                    return Err(FrameError::IdMismatch {
                        expected,
                        found: byte,
                    });
                }
                self.id = byte;
                self.sum = self.sum.wrapping_add(byte);
                self.state = ParseState::Length;
                Ok(None)
            }
            ParseState::Length => {
                if byte < 2 || byte as usize > MAX_PARAMS + 2 {
                    self.reset();
                    return Err(FrameError::BadLength { found: byte });
                }
                self.length = byte;
                self.sum = self.sum.wrapping_add(byte);
                self.state = ParseState::Status;
                Ok(None)
            }
            ParseState::Status => {
                self.status = byte;
                self.sum = self.sum.wrapping_add(byte);
                self.params.clear();
                self.state = if self.length == 2 {
                    ParseState::Checksum
                } else {
                    ParseState::Params
                };
                Ok(None)
            }
            ParseState::Params => {
                // Cannot overflow: LENGTH was bounded above.
                let _ = self.params.push(byte);
                self.sum = self.sum.wrapping_add(byte);
                if self.params.len() == self.length as usize - 2 {
                    self.state = ParseState::Checksum;
                }
                Ok(None)
            }
            ParseState::Checksum => {
                let expected = !self.sum;
                if byte != expected {
                    self.reset();
                    return Err(FrameError::ChecksumMismatch {
                        expected,
                        found: byte,
                    });
                }
                // The device fault is reported even though the checksum was
                // valid; the frame itself is sound, the device is not.
                if self.status != 0 {
                    let status = DeviceStatus::from_bits(self.status);
                    self.reset();
                    return Err(FrameError::DeviceFault(status));
                }
                let packet = StatusPacket {
                    id: self.id,
                    params: self.params.clone(),
                };
                self.reset();
                Ok(Some(packet))
            }
        }
    }

    /// Feed multiple bytes to the parser
    ///
    /// Returns the first complete frame found, if any; bytes after it are
    /// not consumed.
    pub fn feed_bytes(&mut self, bytes: &[u8]) -> Result<Option<StatusPacket>, FrameError> {
        for &byte in bytes {
            if let Some(packet) = self.feed(byte)? {
                return Ok(Some(packet));
            }
        }
        Ok(None)
    }
}
