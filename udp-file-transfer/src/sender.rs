//! Stop-and-wait send-side state machine.
//!
//! [`Sender`] tracks sequence numbers and the single in-flight frame.
//! It does **not** touch the socket or the input file; [`crate::client`]
//! feeds it events and performs whatever I/O the resulting state calls for.
//!
//! # Stop-and-Wait contract
//! - At most **one** frame is in flight at any moment.
//! - The sequence number advances only on an ack that echoes the in-flight
//!   frame's number *and* differs from the previously accepted echo.
//! - Every failure (simulated loss, timeout, corrupt ack, stale ack) leads
//!   back to [`SenderState::Send`] with the same frame.

use std::fmt;

use crate::packet::{Ack, Frame, PacketError, SeqNum};
use crate::state::{InvalidTransition, SenderState};
use crate::stream::Chunk;

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// What happened to a send attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// The fault injector dropped the frame; nothing goes on the wire.
    Lost,
    /// The frame must now be transmitted (see [`Sender::in_flight`]).
    Transmit { retransmission: bool },
}

/// How an inbound acknowledgement was judged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckOutcome {
    Accepted,
    Corrupt,
    /// Echo of an older number; the receiver did not advance.
    Duplicate,
}

// ---------------------------------------------------------------------------
// Statistics
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SenderStats {
    /// Every transmission attempt, including ones lost to the injector.
    pub packets_sent: u64,
    pub retransmissions: u64,
    /// Every datagram received while awaiting an ack.
    pub acks_received: u64,
    pub duplicate_acks: u64,
    pub timeouts: u64,
}

impl fmt::Display for SenderStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "+---------------STATS---------------+")?;
        writeln!(f, "Total Packets Transmitted: {}", self.packets_sent)?;
        writeln!(f, "Retransmitted Packets: {}", self.retransmissions)?;
        writeln!(f, "Total ACK Received: {}", self.acks_received)?;
        writeln!(f, "Duplicate ACK Received: {}", self.duplicate_acks)?;
        write!(f, "Total # Of Timeouts: {}", self.timeouts)
    }
}

// ---------------------------------------------------------------------------
// Sender
// ---------------------------------------------------------------------------

/// Stop-and-wait send-side state for one transfer.
#[derive(Debug, Default)]
pub struct Sender {
    state: SenderState,
    /// Sequence number of the chunk being sent or awaiting acknowledgement.
    current_seq: SeqNum,
    /// Echo carried by the last accepted ack; [`SeqNum::NONE`] before any.
    last_acked: SeqNum,
    stats: SenderStats,
}

impl Sender {
    pub fn new() -> Self {
        Self {
            current_seq: SeqNum::FIRST,
            ..Self::default()
        }
    }

    pub fn state(&self) -> &SenderState {
        &self.state
    }

    pub fn stats(&self) -> &SenderStats {
        &self.stats
    }

    pub fn current_seq(&self) -> SeqNum {
        self.current_seq
    }

    pub fn last_acked(&self) -> SeqNum {
        self.last_acked
    }

    pub fn is_done(&self) -> bool {
        self.state == SenderState::Done
    }

    /// The frame that is on the wire awaiting its ack, if any.
    pub fn in_flight(&self) -> Option<&Frame> {
        match &self.state {
            SenderState::AwaitAck { frame, .. } => Some(frame),
            _ => None,
        }
    }

    /// `ReadChunk` → `Send`, or → `Done` when the source is exhausted.
    pub fn on_chunk(&mut self, chunk: Option<Chunk>) -> Result<(), InvalidTransition> {
        match self.take_state() {
            SenderState::ReadChunk => {
                self.state = match chunk {
                    Some(chunk) => SenderState::Send {
                        frame: Frame {
                            seq: self.current_seq,
                            is_final: chunk.is_last,
                            payload: chunk.bytes,
                        },
                        attempts: 0,
                    },
                    None => {
                        log::debug!("input exhausted");
                        SenderState::Done
                    }
                };
                Ok(())
            }
            other => Err(self.reject(other, "chunk")),
        }
    }

    /// Leave `Send`. `lost` is the fault injector's verdict on this attempt.
    ///
    /// A lost frame counts as an immediate timeout and stays in `Send`.
    pub fn on_send(&mut self, lost: bool) -> Result<SendOutcome, InvalidTransition> {
        match self.take_state() {
            SenderState::Send { frame, attempts } => {
                self.stats.packets_sent += 1;
                let seq = frame.seq;
                if lost {
                    log::info!("Lost Packet #{seq}");
                    log::info!("Timeout for Packet #{seq}");
                    self.stats.timeouts += 1;
                    self.state = SenderState::Send {
                        frame,
                        attempts: attempts.saturating_add(1),
                    };
                    return Ok(SendOutcome::Lost);
                }

                let retransmission = attempts > 0;
                if retransmission {
                    log::info!("Retransmitted Packet #{seq}");
                    self.stats.retransmissions += 1;
                } else {
                    log::info!("Sent Packet #{seq}");
                }
                self.state = SenderState::AwaitAck {
                    frame,
                    attempts: attempts.saturating_add(1),
                };
                Ok(SendOutcome::Transmit { retransmission })
            }
            other => Err(self.reject(other, "send")),
        }
    }

    /// `AwaitAck` → `Send`: no ack arrived in time.
    pub fn on_timeout(&mut self) -> Result<(), InvalidTransition> {
        match self.take_state() {
            SenderState::AwaitAck { frame, attempts } => {
                log::info!("Timeout for Packet #{}", frame.seq);
                self.stats.timeouts += 1;
                self.state = SenderState::Send { frame, attempts };
                Ok(())
            }
            other => Err(self.reject(other, "ack timeout")),
        }
    }

    /// Judge an inbound datagram while in `AwaitAck`.
    ///
    /// `ack` is the decoding result; an undecodable datagram is handled the
    /// same as one the fault injector marked `corrupt`.
    pub fn on_ack(
        &mut self,
        ack: Result<Ack, PacketError>,
        corrupt: bool,
    ) -> Result<AckOutcome, InvalidTransition> {
        match self.take_state() {
            SenderState::AwaitAck { frame, attempts } => {
                self.stats.acks_received += 1;

                let ack = match ack {
                    Ok(ack) if !corrupt => ack,
                    Ok(_) => {
                        log::info!("Received a Corrupt ACK");
                        self.state = SenderState::Send { frame, attempts };
                        return Ok(AckOutcome::Corrupt);
                    }
                    Err(e) => {
                        log::info!("Received a Corrupt ACK");
                        log::debug!("undecodable ack: {e}");
                        self.state = SenderState::Send { frame, attempts };
                        return Ok(AckOutcome::Corrupt);
                    }
                };

                if ack.seq == self.last_acked || ack.seq != frame.seq {
                    log::info!("Received Ack #{} (Duplicate)", ack.seq);
                    self.stats.duplicate_acks += 1;
                    self.state = SenderState::Send { frame, attempts };
                    return Ok(AckOutcome::Duplicate);
                }

                log::info!("Received Ack #{}", ack.seq);
                self.last_acked = ack.seq;
                self.current_seq = frame.seq.next();
                self.state = SenderState::ReadChunk;
                Ok(AckOutcome::Accepted)
            }
            other => Err(self.reject(other, "ack")),
        }
    }

    fn take_state(&mut self) -> SenderState {
        std::mem::take(&mut self.state)
    }

    /// Put `state` back and describe the refused event.
    fn reject(&mut self, state: SenderState, event: &'static str) -> InvalidTransition {
        let err = InvalidTransition {
            state: state.name(),
            event,
        };
        self.state = state;
        err
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(bytes: &[u8], is_last: bool) -> Option<Chunk> {
        Some(Chunk {
            bytes: bytes.to_vec(),
            is_last,
        })
    }

    fn ack(seq: u32) -> Result<Ack, PacketError> {
        Ok(Ack { seq: SeqNum(seq) })
    }

    /// Sender with `bytes` loaded and sitting in `AwaitAck`.
    fn sent(bytes: &[u8], is_last: bool) -> Sender {
        let mut s = Sender::new();
        s.on_chunk(chunk(bytes, is_last)).unwrap();
        s.on_send(false).unwrap();
        s
    }

    #[test]
    fn initial_state() {
        let s = Sender::new();
        assert_eq!(s.state(), &SenderState::ReadChunk);
        assert_eq!(s.current_seq(), SeqNum::FIRST);
        assert_eq!(s.last_acked(), SeqNum::NONE);
        assert!(s.in_flight().is_none());
    }

    #[test]
    fn attempt_counter_saturates_on_endless_retries() {
        let mut s = Sender::new();
        s.on_chunk(chunk(b"x", true)).unwrap();
        let SenderState::Send { frame, .. } = s.state().clone() else {
            panic!("expected Send");
        };
        s.state = SenderState::Send {
            frame: frame.clone(),
            attempts: u32::MAX,
        };

        assert_eq!(s.on_send(true).unwrap(), SendOutcome::Lost);
        assert_eq!(
            s.state(),
            &SenderState::Send {
                frame: frame.clone(),
                attempts: u32::MAX
            }
        );
        assert_eq!(
            s.on_send(false).unwrap(),
            SendOutcome::Transmit {
                retransmission: true
            }
        );
        assert_eq!(
            s.state(),
            &SenderState::AwaitAck {
                frame,
                attempts: u32::MAX
            }
        );
    }

    #[test]
    fn chunk_becomes_frame_with_current_seq() {
        let mut s = Sender::new();
        s.on_chunk(chunk(b"abc", true)).unwrap();
        assert_eq!(
            s.state(),
            &SenderState::Send {
                frame: Frame {
                    seq: SeqNum(1),
                    is_final: true,
                    payload: b"abc".to_vec()
                },
                attempts: 0
            }
        );
    }

    #[test]
    fn exhausted_source_finishes() {
        let mut s = Sender::new();
        s.on_chunk(None).unwrap();
        assert!(s.is_done());
        assert_eq!(s.stats(), &SenderStats::default());
    }

    #[test]
    fn clean_exchange_advances() {
        let mut s = sent(b"one", false);
        assert_eq!(s.in_flight().map(|f| f.seq), Some(SeqNum(1)));

        assert_eq!(s.on_ack(ack(1), false).unwrap(), AckOutcome::Accepted);
        assert_eq!(s.state(), &SenderState::ReadChunk);
        assert_eq!(s.current_seq(), SeqNum(2));
        assert_eq!(s.last_acked(), SeqNum(1));

        s.on_chunk(chunk(b"two", true)).unwrap();
        assert_eq!(
            s.on_send(false).unwrap(),
            SendOutcome::Transmit {
                retransmission: false
            }
        );
        assert_eq!(s.on_ack(ack(2), false).unwrap(), AckOutcome::Accepted);
        s.on_chunk(None).unwrap();
        assert!(s.is_done());

        let st = s.stats();
        assert_eq!(st.packets_sent, 2);
        assert_eq!(st.acks_received, 2);
        assert_eq!(st.retransmissions, 0);
        assert_eq!(st.duplicate_acks, 0);
        assert_eq!(st.timeouts, 0);
    }

    #[test]
    fn lost_frame_is_local_timeout_then_retransmission() {
        let mut s = Sender::new();
        s.on_chunk(chunk(b"x", true)).unwrap();

        assert_eq!(s.on_send(true).unwrap(), SendOutcome::Lost);
        assert!(matches!(s.state(), SenderState::Send { attempts: 1, .. }));
        assert!(s.in_flight().is_none());

        assert_eq!(
            s.on_send(false).unwrap(),
            SendOutcome::Transmit {
                retransmission: true
            }
        );
        assert_eq!(s.stats().packets_sent, 2);
        assert_eq!(s.stats().timeouts, 1);
        assert_eq!(s.stats().retransmissions, 1);
    }

    #[test]
    fn timeout_returns_to_send_with_same_frame() {
        let mut s = sent(b"data", false);
        s.on_timeout().unwrap();
        match s.state() {
            SenderState::Send { frame, attempts } => {
                assert_eq!(frame.seq, SeqNum(1));
                assert_eq!(frame.payload, b"data");
                assert_eq!(*attempts, 1);
            }
            other => panic!("unexpected state {other}"),
        }
        assert_eq!(s.stats().timeouts, 1);
    }

    #[test]
    fn corrupt_ack_is_a_failure() {
        let mut s = sent(b"data", false);
        assert_eq!(s.on_ack(ack(1), true).unwrap(), AckOutcome::Corrupt);
        assert!(matches!(s.state(), SenderState::Send { .. }));
        assert_eq!(s.current_seq(), SeqNum(1));
        assert_eq!(s.stats().acks_received, 1);
        assert_eq!(s.stats().duplicate_acks, 0);
    }

    #[test]
    fn undecodable_ack_counts_as_corrupt() {
        let mut s = sent(b"data", false);
        let bad = Ack::decode(&[1, 2]);
        assert_eq!(s.on_ack(bad, false).unwrap(), AckOutcome::Corrupt);
        assert_eq!(s.current_seq(), SeqNum(1));
    }

    #[test]
    fn stale_ack_never_counts_as_progress() {
        let mut s = sent(b"a", false);
        s.on_ack(ack(1), false).unwrap();
        s.on_chunk(chunk(b"b", true)).unwrap();
        s.on_send(false).unwrap();

        // Receiver re-acked the previous frame.
        assert_eq!(s.on_ack(ack(1), false).unwrap(), AckOutcome::Duplicate);
        assert_eq!(s.current_seq(), SeqNum(2));
        assert_eq!(s.last_acked(), SeqNum(1));
        assert_eq!(s.stats().duplicate_acks, 1);
    }

    #[test]
    fn echo_of_nothing_is_duplicate_for_first_frame() {
        let mut s = sent(b"a", false);
        assert_eq!(s.on_ack(ack(0), false).unwrap(), AckOutcome::Duplicate);
        assert_eq!(s.current_seq(), SeqNum::FIRST);
    }

    #[test]
    fn unexpected_ack_number_is_rejected() {
        let mut s = sent(b"a", false);
        assert_eq!(s.on_ack(ack(9), false).unwrap(), AckOutcome::Duplicate);
        assert_eq!(s.current_seq(), SeqNum::FIRST);
    }

    #[test]
    fn permanent_stale_acks_never_advance() {
        let mut s = sent(b"a", false);
        let mut previous = 0;
        for _ in 0..50 {
            assert_eq!(s.on_ack(ack(0), false).unwrap(), AckOutcome::Duplicate);
            assert!(s.stats().duplicate_acks > previous);
            previous = s.stats().duplicate_acks;
            s.on_send(false).unwrap();
        }
        assert_eq!(s.current_seq(), SeqNum::FIRST);
        assert_eq!(s.stats().retransmissions, 50);
    }

    #[test]
    fn wrong_state_is_refused_and_state_kept() {
        let mut s = Sender::new();
        let err = s.on_ack(ack(1), false).unwrap_err();
        assert_eq!(
            err,
            InvalidTransition {
                state: "ReadChunk",
                event: "ack"
            }
        );
        assert_eq!(s.state(), &SenderState::ReadChunk);

        let mut s = sent(b"a", true);
        assert!(s.on_chunk(None).is_err());
        assert!(s.on_send(false).is_err());
        assert!(s.in_flight().is_some());
    }

    #[test]
    fn stats_block_format() {
        let stats = SenderStats {
            packets_sent: 5,
            retransmissions: 2,
            acks_received: 3,
            duplicate_acks: 1,
            timeouts: 2,
        };
        let text = stats.to_string();
        assert!(text.starts_with("+---------------STATS---------------+"));
        assert!(text.contains("Total Packets Transmitted: 5"));
        assert!(text.contains("Retransmitted Packets: 2"));
        assert!(text.contains("Duplicate ACK Received: 1"));
        assert!(text.ends_with("Total # Of Timeouts: 2"));
    }
}
