//! Stop-and-wait receive-side state machine.
//!
//! [`Receiver`] decides, for every inbound datagram, whether its payload is
//! new data to deliver and which sequence number the reply should echo:
//!
//! | Frame                 | Payload     | Ack echoes        | Counter          |
//! |-----------------------|-------------|-------------------|------------------|
//! | corrupt / undecodable | dropped     | last accepted seq | `duplicate_acks` |
//! | seq == last accepted  | dropped     | its own seq       | `duplicate_packets` |
//! | anything else         | delivered   | its own seq       | -                |
//!
//! A duplicate that arrives intact is re-acknowledged without bumping
//! `duplicate_acks`; only corruption-driven re-acks count there.
//!
//! Like [`crate::sender::Sender`], this type does no I/O; [`crate::server`]
//! owns the socket and the output file.

use std::fmt;

use crate::packet::{Ack, Frame, PacketError, SeqNum};
use crate::state::{InvalidTransition, ReceiverState};

/// Verdict on a processed frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// New data; the caller must append these bytes to the output.
    Accepted(Vec<u8>),
    Duplicate,
    Corrupt,
}

/// What an idle timeout means for the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdleOutcome {
    /// The final frame was accepted earlier; the transfer is over.
    Complete,
    /// The peer went quiet before the final frame arrived.
    PeerSilent,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReceiverStats {
    pub packets_received: u64,
    pub duplicate_packets: u64,
    /// Acks actually handed to the socket (lost ones excluded).
    pub acks_sent: u64,
    /// Re-acks of the previous frame caused by corruption.
    pub duplicate_acks: u64,
}

impl fmt::Display for ReceiverStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Total Packets Received: {}", self.packets_received)?;
        writeln!(f, "Duplicate Packets Received: {}", self.duplicate_packets)?;
        writeln!(f, "Total ACK Sent: {}", self.acks_sent)?;
        write!(f, "Duplicate ACK Sent: {}", self.duplicate_acks)
    }
}

/// Receive-side state for one transfer.
#[derive(Debug, Default)]
pub struct Receiver {
    state: ReceiverState,
    /// [`SeqNum::NONE`] until the first frame is accepted.
    last_accepted: SeqNum,
    transfer_complete: bool,
    /// Set once the first ack has gone out; before that the receiver waits
    /// indefinitely for its peer.
    idle_engaged: bool,
    stats: ReceiverStats,
}

impl Receiver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &ReceiverState {
        &self.state
    }

    pub fn stats(&self) -> &ReceiverStats {
        &self.stats
    }

    pub fn last_accepted(&self) -> SeqNum {
        self.last_accepted
    }

    pub fn transfer_complete(&self) -> bool {
        self.transfer_complete
    }

    pub fn idle_timeout_engaged(&self) -> bool {
        self.idle_engaged
    }

    /// `AwaitFrame` → `Process`.
    pub fn on_datagram(
        &mut self,
        datagram: Result<Frame, PacketError>,
    ) -> Result<(), InvalidTransition> {
        match self.take_state() {
            ReceiverState::AwaitFrame => {
                self.stats.packets_received += 1;
                self.state = ReceiverState::Process { datagram };
                Ok(())
            }
            other => Err(self.reject(other, "datagram")),
        }
    }

    /// `Process` → `Respond`. `corrupt` is the fault injector's verdict.
    pub fn on_process(&mut self, corrupt: bool) -> Result<Delivery, InvalidTransition> {
        let datagram = match self.take_state() {
            ReceiverState::Process { datagram } => datagram,
            other => return Err(self.reject(other, "process")),
        };

        let frame = match datagram {
            Ok(frame) if !corrupt => frame,
            other => {
                log::info!("Received a Corrupt Packet");
                if let Err(e) = other {
                    log::debug!("undecodable frame: {e}");
                }
                self.stats.duplicate_acks += 1;
                self.state = ReceiverState::Respond {
                    ack: Ack {
                        seq: self.last_accepted,
                    },
                };
                return Ok(Delivery::Corrupt);
            }
        };

        // Only the immediate predecessor counts as a duplicate. Anything
        // older can only show up on a path that reorders, which stop-and-wait
        // over a single UDP flow does not expect.
        let delivery = if frame.seq == self.last_accepted {
            log::info!("Received Packet #{} (Duplicate)", frame.seq);
            self.stats.duplicate_packets += 1;
            Delivery::Duplicate
        } else {
            log::info!("Received Packet #{}", frame.seq);
            self.last_accepted = frame.seq;
            if frame.is_final {
                log::debug!("final frame #{} accepted", frame.seq);
                self.transfer_complete = true;
            }
            Delivery::Accepted(frame.payload)
        };

        self.state = ReceiverState::Respond {
            ack: Ack { seq: frame.seq },
        };
        Ok(delivery)
    }

    /// `Respond` → `AwaitFrame`. Returns the ack to transmit, or `None`
    /// when the fault injector decided it is `lost`.
    pub fn on_respond(&mut self, lost: bool) -> Result<Option<Ack>, InvalidTransition> {
        match self.take_state() {
            ReceiverState::Respond { ack } => {
                self.state = ReceiverState::AwaitFrame;
                if lost {
                    log::info!("Lost ACK #{}", ack.seq);
                    return Ok(None);
                }
                log::info!("Sent ACK #{}", ack.seq);
                self.stats.acks_sent += 1;
                self.idle_engaged = true;
                Ok(Some(ack))
            }
            other => Err(self.reject(other, "respond")),
        }
    }

    /// The idle timeout fired while in `AwaitFrame`.
    ///
    /// Moves to `Complete` if the final frame has been accepted; otherwise
    /// the state is left alone and [`IdleOutcome::PeerSilent`] is returned.
    pub fn on_idle_timeout(&mut self) -> Result<IdleOutcome, InvalidTransition> {
        match self.take_state() {
            ReceiverState::AwaitFrame if self.transfer_complete => {
                self.state = ReceiverState::Complete;
                Ok(IdleOutcome::Complete)
            }
            ReceiverState::AwaitFrame => {
                self.state = ReceiverState::AwaitFrame;
                Ok(IdleOutcome::PeerSilent)
            }
            other => Err(self.reject(other, "idle timeout")),
        }
    }

    fn take_state(&mut self) -> ReceiverState {
        std::mem::take(&mut self.state)
    }

    fn reject(&mut self, state: ReceiverState, event: &'static str) -> InvalidTransition {
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

    fn frame(seq: u32, is_final: bool, payload: &[u8]) -> Result<Frame, PacketError> {
        Ok(Frame {
            seq: SeqNum(seq),
            is_final,
            payload: payload.to_vec(),
        })
    }

    /// Feed one datagram through Process and Respond (ack not lost).
    fn exchange(
        r: &mut Receiver,
        datagram: Result<Frame, PacketError>,
        corrupt: bool,
    ) -> (Delivery, Option<Ack>) {
        r.on_datagram(datagram).unwrap();
        let delivery = r.on_process(corrupt).unwrap();
        let ack = r.on_respond(false).unwrap();
        (delivery, ack)
    }

    fn ack(seq: u32) -> Option<Ack> {
        Some(Ack { seq: SeqNum(seq) })
    }

    #[test]
    fn initial_state() {
        let r = Receiver::new();
        assert_eq!(r.state(), &ReceiverState::AwaitFrame);
        assert_eq!(r.last_accepted(), SeqNum::NONE);
        assert!(!r.transfer_complete());
        assert!(!r.idle_timeout_engaged());
    }

    #[test]
    fn new_frame_is_delivered_and_acked() {
        let mut r = Receiver::new();
        let (d, a) = exchange(&mut r, frame(1, false, b"hello"), false);
        assert_eq!(d, Delivery::Accepted(b"hello".to_vec()));
        assert_eq!(a, ack(1));
        assert_eq!(r.last_accepted(), SeqNum(1));
        assert!(r.idle_timeout_engaged());
        assert_eq!(r.state(), &ReceiverState::AwaitFrame);
    }

    #[test]
    fn duplicate_frame_is_acked_but_not_delivered() {
        let mut r = Receiver::new();
        exchange(&mut r, frame(1, false, b"hello"), false);
        let (d, a) = exchange(&mut r, frame(1, false, b"hello"), false);
        assert_eq!(d, Delivery::Duplicate);
        assert_eq!(a, ack(1));

        let st = r.stats();
        assert_eq!(st.packets_received, 2);
        assert_eq!(st.duplicate_packets, 1);
        // Intact duplicates never count as duplicate acks.
        assert_eq!(st.duplicate_acks, 0);
        assert_eq!(st.acks_sent, 2);
    }

    #[test]
    fn corrupt_frame_reacks_previous_seq() {
        let mut r = Receiver::new();
        exchange(&mut r, frame(1, false, b"a"), false);
        let (d, a) = exchange(&mut r, frame(2, true, b"b"), true);
        assert_eq!(d, Delivery::Corrupt);
        assert_eq!(a, ack(1));
        assert_eq!(r.last_accepted(), SeqNum(1));
        assert!(!r.transfer_complete(), "final flag of a corrupt frame is ignored");
        assert_eq!(r.stats().duplicate_acks, 1);
        assert_eq!(r.stats().duplicate_packets, 0);
    }

    #[test]
    fn corrupt_first_frame_echoes_none() {
        let mut r = Receiver::new();
        let (d, a) = exchange(&mut r, frame(1, false, b"a"), true);
        assert_eq!(d, Delivery::Corrupt);
        assert_eq!(a, ack(0));
    }

    #[test]
    fn undecodable_datagram_is_corrupt() {
        let mut r = Receiver::new();
        let (d, _) = exchange(&mut r, Frame::decode(&[1, 2]), false);
        assert_eq!(d, Delivery::Corrupt);
        assert_eq!(r.stats().duplicate_acks, 1);
    }

    #[test]
    fn lost_ack_is_not_counted_and_does_not_engage_idle() {
        let mut r = Receiver::new();
        r.on_datagram(frame(1, false, b"a")).unwrap();
        r.on_process(false).unwrap();
        assert_eq!(r.on_respond(true).unwrap(), None);
        assert_eq!(r.stats().acks_sent, 0);
        assert!(!r.idle_timeout_engaged());
        assert_eq!(r.state(), &ReceiverState::AwaitFrame);
    }

    #[test]
    fn corruption_counted_even_when_reack_lost() {
        let mut r = Receiver::new();
        r.on_datagram(frame(1, false, b"a")).unwrap();
        r.on_process(true).unwrap();
        r.on_respond(true).unwrap();
        assert_eq!(r.stats().duplicate_acks, 1);
        assert_eq!(r.stats().acks_sent, 0);
    }

    #[test]
    fn idle_after_final_frame_completes() {
        let mut r = Receiver::new();
        exchange(&mut r, frame(1, false, b"a"), false);
        exchange(&mut r, frame(2, true, b"b"), false);
        assert!(r.transfer_complete());

        assert_eq!(r.on_idle_timeout().unwrap(), IdleOutcome::Complete);
        assert_eq!(r.state(), &ReceiverState::Complete);
    }

    #[test]
    fn idle_before_final_frame_is_peer_silent() {
        let mut r = Receiver::new();
        exchange(&mut r, frame(1, false, b"a"), false);
        assert_eq!(r.on_idle_timeout().unwrap(), IdleOutcome::PeerSilent);
        assert_eq!(r.state(), &ReceiverState::AwaitFrame);
    }

    #[test]
    fn completion_is_sticky_across_duplicate_final() {
        let mut r = Receiver::new();
        exchange(&mut r, frame(1, true, b"only"), false);
        let (d, _) = exchange(&mut r, frame(1, true, b"only"), false);
        assert_eq!(d, Delivery::Duplicate);
        assert!(r.transfer_complete());
    }

    #[test]
    fn delivered_payloads_appear_once() {
        let mut r = Receiver::new();
        let mut out = Vec::new();
        let script = [
            (frame(1, false, b"ab"), false),
            (frame(1, false, b"ab"), false),
            (frame(2, false, b"cd"), true),
            (frame(2, false, b"cd"), false),
            (frame(2, false, b"cd"), false),
            (frame(3, true, b"e"), false),
        ];
        for (datagram, corrupt) in script {
            if let (Delivery::Accepted(bytes), _) = exchange(&mut r, datagram, corrupt) {
                out.extend(bytes);
            }
        }
        assert_eq!(out, b"abcde");
        assert_eq!(r.stats().duplicate_packets, 2);
        assert_eq!(r.stats().duplicate_acks, 1);
    }

    #[test]
    fn wrong_state_is_refused() {
        let mut r = Receiver::new();
        assert_eq!(
            r.on_process(false).unwrap_err(),
            InvalidTransition {
                state: "AwaitFrame",
                event: "process"
            }
        );
        r.on_datagram(frame(1, false, b"a")).unwrap();
        assert!(r.on_datagram(frame(2, false, b"b")).is_err());
        assert!(r.on_idle_timeout().is_err());
        assert!(matches!(r.state(), ReceiverState::Process { .. }));
    }
}
