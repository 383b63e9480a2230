//! Protocol timeouts.
//!
//! Stop-and-wait needs exactly two clocks:
//! - the sender's **ack timeout**, how long it waits for an acknowledgement
//!   before retransmitting the same frame;
//! - the receiver's **idle timeout**, engaged once it has sent its first ack.
//!   When it fires after the final frame was accepted the transfer is over;
//!   when it fires before, the sender has gone away mid-transfer.
//!
//! Neither clock backs off. The ack timeout must stay well below the idle
//! timeout, or the receiver gives up between two retransmissions.

use std::time::Duration;

/// Default wait for an acknowledgement before retransmitting.
pub const ACK_TIMEOUT: Duration = Duration::from_millis(200);

/// Default receiver idle period that ends a session.
pub const IDLE_TIMEOUT: Duration = Duration::from_secs(1);

/// Adjustable timeout parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub ack: Duration,
    pub idle: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            ack: ACK_TIMEOUT,
            idle: IDLE_TIMEOUT,
        }
    }
}
