//! Finite-state-machine types for both endpoints.
//!
//! ```text
//!  Sender
//!                  chunk              send (not lost)
//!  ReadChunk ───────────────▶ Send ───────────────▶ AwaitAck
//!     │  ▲                    ▲  │ lost                │
//!     │  │                    │  └──┘                  │ timeout / corrupt /
//!     │  │                    └────────────────────────┤ duplicate ack
//!     │  └─────────────────────────────────────────────┘ ack accepted
//!     │ no more chunks
//!     ▼
//!   Done
//!
//!  Receiver
//!               datagram                        ack decided
//!  AwaitFrame ──────────▶ Process ──────────────▶ Respond
//!     ▲    │                                          │
//!     │    │ idle timeout after final frame           │ sent or lost
//!     │    ▼                                          │
//!     │  Complete                                     │
//!     └───────────────────────────────────────────────┘
//! ```
//!
//! Transitions are implemented in [`crate::sender`] and [`crate::receiver`].
//! Calling a transition from a state that does not accept it yields
//! [`InvalidTransition`] and leaves the machine untouched.

use std::fmt;

use thiserror::Error;

use crate::packet::{Ack, Frame, PacketError};

/// States of the sending endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SenderState {
    /// Waiting for the next chunk from the byte-stream source.
    #[default]
    ReadChunk,
    /// `frame` is ready to go out. `attempts` counts earlier transmissions
    /// of the same frame, including ones the fault injector swallowed.
    Send { frame: Frame, attempts: u32 },
    /// `frame` is on the wire; waiting for its acknowledgement.
    AwaitAck { frame: Frame, attempts: u32 },
    /// The whole stream has been acknowledged.
    Done,
}

impl SenderState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::ReadChunk => "ReadChunk",
            Self::Send { .. } => "Send",
            Self::AwaitAck { .. } => "AwaitAck",
            Self::Done => "Done",
        }
    }
}

impl fmt::Display for SenderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// States of the receiving endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ReceiverState {
    #[default]
    AwaitFrame,
    /// A datagram arrived; `datagram` is its decoding result.
    Process {
        datagram: Result<Frame, PacketError>,
    },
    /// The frame has been dealt with; `ack` is the reply to send.
    Respond { ack: Ack },
    /// The final frame was accepted and the peer has gone quiet.
    Complete,
}

impl ReceiverState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::AwaitFrame => "AwaitFrame",
            Self::Process { .. } => "Process",
            Self::Respond { .. } => "Respond",
            Self::Complete => "Complete",
        }
    }
}

impl fmt::Display for ReceiverState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A transition was requested from a state that does not allow it.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("cannot handle {event} in state {state}")]
pub struct InvalidTransition {
    pub state: &'static str,
    pub event: &'static str,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::SeqNum;

    #[test]
    fn initial_states() {
        assert_eq!(SenderState::default(), SenderState::ReadChunk);
        assert_eq!(ReceiverState::default(), ReceiverState::AwaitFrame);
    }

    #[test]
    fn display_uses_state_name() {
        let s = ReceiverState::Respond {
            ack: Ack { seq: SeqNum(3) },
        };
        assert_eq!(s.to_string(), "Respond");
        assert_eq!(SenderState::Done.to_string(), "Done");
    }

    #[test]
    fn invalid_transition_message() {
        let e = InvalidTransition {
            state: "Done",
            event: "ack",
        };
        assert_eq!(e.to_string(), "cannot handle ack in state Done");
    }
}
