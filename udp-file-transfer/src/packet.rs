//! Wire-format definitions for data frames and acknowledgements.
//!
//! Two kinds of datagram cross the wire:
//! - a [`Frame`] from sender to receiver, carrying one chunk of the file;
//! - an [`Ack`] from receiver to sender, echoing a sequence number.
//!
//! No I/O happens here; this is pure data transformation.
//!
//! # Wire format
//!
//! All multi-byte integers are **big-endian**.
//!
//! ```text
//! Data frame
//!  0               1               2               3
//!  0 1 2 3 4 5 6 7 0 1 2 3 4 5 6 7 0 1 2 3 4 5 6 7 0 1 2 3 4 5 6 7
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                        Sequence Number                        |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |   Final (0/1) |            Payload ...                        |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//!
//! Acknowledgement
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                        Sequence Number                        |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! ```
//!
//! Frame header size: [`FRAME_HEADER_LEN`] = 5 bytes, ack size: [`ACK_LEN`] = 4 bytes.

use std::fmt;

use thiserror::Error;

/// Byte length of the fixed-size data frame header.
pub const FRAME_HEADER_LEN: usize = 5;

/// Byte length of an acknowledgement datagram.
pub const ACK_LEN: usize = 4;

/// Largest chunk a sender may put in one frame.
pub const MAX_CHUNK_SIZE: usize = 1000;

/// Largest datagram either endpoint ever needs to receive.
pub const MAX_DATAGRAM: usize = FRAME_HEADER_LEN + MAX_CHUNK_SIZE;

const OFF_SEQ: usize = 0;
const OFF_FINAL: usize = 4;

// ---------------------------------------------------------------------------
// Sequence numbers
// ---------------------------------------------------------------------------

/// A frame sequence number.
///
/// Numbering starts at [`SeqNum::FIRST`]. [`SeqNum::NONE`] (zero) never
/// appears on a data frame; it stands for "nothing accepted yet" and is what
/// a receiver echoes if the very first frame it sees is corrupt.
///
/// After `u32::MAX` the counter wraps to 1, skipping zero. Stop-and-wait
/// only ever compares a frame with its immediate predecessor, so the wrap
/// never makes two in-play numbers collide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct SeqNum(pub u32);

impl SeqNum {
    pub const NONE: SeqNum = SeqNum(0);
    pub const FIRST: SeqNum = SeqNum(1);

    /// The sequence number that follows `self`.
    pub fn next(self) -> SeqNum {
        match self.0.checked_add(1) {
            Some(n) => SeqNum(n),
            None => SeqNum::FIRST,
        }
    }
}

impl fmt::Display for SeqNum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Frame
// ---------------------------------------------------------------------------

/// One chunk of the transferred stream, as sent from client to server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub seq: SeqNum,
    /// Set only on the last chunk of the stream.
    pub is_final: bool,
    pub payload: Vec<u8>,
}

impl Frame {
    /// Serialise this frame into a newly allocated byte vector.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(FRAME_HEADER_LEN + self.payload.len());
        buf.extend_from_slice(&self.seq.0.to_be_bytes());
        buf.push(u8::from(self.is_final));
        buf.extend_from_slice(&self.payload);
        buf
    }

    /// Parse a [`Frame`] from a raw datagram.
    pub fn decode(buf: &[u8]) -> Result<Self, PacketError> {
        if buf.len() < FRAME_HEADER_LEN {
            return Err(PacketError::BufferTooShort {
                needed: FRAME_HEADER_LEN,
                got: buf.len(),
            });
        }
        if buf.len() > MAX_DATAGRAM {
            return Err(PacketError::Oversized(buf.len()));
        }

        let seq = read_seq(&buf[OFF_SEQ..OFF_SEQ + 4]);
        let is_final = match buf[OFF_FINAL] {
            0 => false,
            1 => true,
            other => return Err(PacketError::BadFinalFlag(other)),
        };

        Ok(Frame {
            seq,
            is_final,
            payload: buf[FRAME_HEADER_LEN..].to_vec(),
        })
    }
}

// ---------------------------------------------------------------------------
// Ack
// ---------------------------------------------------------------------------

/// An acknowledgement, echoing the sequence number the receiver settled on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ack {
    pub seq: SeqNum,
}

impl Ack {
    pub fn encode(&self) -> [u8; ACK_LEN] {
        self.seq.0.to_be_bytes()
    }

    pub fn decode(buf: &[u8]) -> Result<Self, PacketError> {
        if buf.len() != ACK_LEN {
            return Err(PacketError::BadAckLength(buf.len()));
        }
        Ok(Ack { seq: read_seq(buf) })
    }
}

fn read_seq(bytes: &[u8]) -> SeqNum {
    let mut raw = [0u8; 4];
    raw.copy_from_slice(&bytes[..4]);
    SeqNum(u32::from_be_bytes(raw))
}

/// Errors that can arise when parsing a raw datagram.
///
/// Both endpoints treat an undecodable datagram as a corrupt one.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PacketError {
    #[error("datagram too short: need {needed} bytes, got {got}")]
    BufferTooShort { needed: usize, got: usize },
    #[error("acknowledgement must be exactly 4 bytes, got {0}")]
    BadAckLength(usize),
    #[error("final-flag byte must be 0 or 1, got {0}")]
    BadFinalFlag(u8),
    #[error("datagram of {0} bytes exceeds the 1005-byte frame limit")]
    Oversized(usize),
}
