//! Receiving endpoint: drives a [`Receiver`] over a UDP socket.
//!
//! One server handles exactly one transfer and then returns. It waits
//! indefinitely for the first frame; after its first ack goes out, every
//! receive is bounded by the idle timeout. The session ends when that
//! timeout fires after the final frame was accepted.

use std::fmt;
use std::io;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use rand::Rng;
use thiserror::Error;
use tokio::fs::File;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::config::ServerConfig;
use crate::packet::Frame;
use crate::receiver::{Delivery, IdleOutcome, Receiver, ReceiverStats};
use crate::simulator::FaultInjector;
use crate::socket::{Recv, Socket};
use crate::state::{InvalidTransition, ReceiverState};

/// Fatal server-side failures. Transient protocol faults never surface here.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("unable to create UDP socket")]
    Socket(#[source] io::Error),
    #[error("file creation failed for {}", .path.display())]
    Create {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("unable to write file")]
    Write(#[source] io::Error),
    #[error("packet not received")]
    Recv(#[source] io::Error),
    #[error("unable to send acknowledgement")]
    Send(#[source] io::Error),
    #[error("packet not received: peer silent for {0:?} before the final frame")]
    PeerSilent(Duration),
    #[error(transparent)]
    Transition(#[from] InvalidTransition),
}

/// Outcome of a completed session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerReport {
    pub stats: ReceiverStats,
    /// First frame to completion, not counting the closing idle period.
    pub elapsed: Duration,
}

impl fmt::Display for ServerReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "+---------------STATS---------------+")?;
        writeln!(f, "Elapsed Time: {}ms", self.elapsed.as_millis())?;
        write!(f, "{}", self.stats)
    }
}

/// Bind, create the output file, and serve one transfer into it.
pub async fn run(config: &ServerConfig) -> Result<ServerReport, ServerError> {
    let socket = Socket::bind(config.bind).await.map_err(ServerError::Socket)?;
    let mut output = File::create(&config.output)
        .await
        .map_err(|source| ServerError::Create {
            path: config.output.clone(),
            source,
        })?;
    let mut faults = FaultInjector::from_seed(config.seed);

    log::info!(
        "listening on {}, writing to {}",
        socket.local_addr,
        config.output.display()
    );
    serve(&socket, config, &mut output, &mut faults).await
}

/// Receive one transfer on `socket`, appending accepted payloads to `output`.
pub async fn serve<W, G>(
    socket: &Socket,
    config: &ServerConfig,
    output: &mut W,
    faults: &mut FaultInjector<G>,
) -> Result<ServerReport, ServerError>
where
    W: AsyncWrite + Unpin,
    G: Rng,
{
    let mut receiver = Receiver::new();
    let mut first_frame_at: Option<Instant> = None;
    let mut peer = None;

    loop {
        match receiver.state() {
            ReceiverState::AwaitFrame => {
                let timeout = receiver
                    .idle_timeout_engaged()
                    .then_some(config.timeouts.idle);
                let received = socket.recv_from(timeout).await.map_err(ServerError::Recv)?;
                match received {
                    Recv::TimedOut => match receiver.on_idle_timeout()? {
                        IdleOutcome::Complete => {}
                        IdleOutcome::PeerSilent => {
                            return Err(ServerError::PeerSilent(config.timeouts.idle))
                        }
                    },
                    Recv::Datagram { bytes, from } => {
                        first_frame_at.get_or_insert_with(Instant::now);
                        peer = Some(from);
                        receiver.on_datagram(Frame::decode(&bytes))?;
                    }
                }
            }
            ReceiverState::Process { .. } => {
                let corrupt = faults.should_trigger(config.rates.corruption);
                if let Delivery::Accepted(bytes) = receiver.on_process(corrupt)? {
                    output.write_all(&bytes).await.map_err(ServerError::Write)?;
                }
            }
            ReceiverState::Respond { .. } => {
                let lost = faults.should_trigger(config.rates.loss);
                if let (Some(ack), Some(to)) = (receiver.on_respond(lost)?, peer) {
                    socket
                        .send_to(&ack.encode(), to)
                        .await
                        .map_err(ServerError::Send)?;
                }
            }
            ReceiverState::Complete => break,
        }
    }

    output.flush().await.map_err(ServerError::Write)?;

    let elapsed = first_frame_at
        .map(|t| t.elapsed().saturating_sub(config.timeouts.idle))
        .unwrap_or_default();
    Ok(ServerReport {
        stats: *receiver.stats(),
        elapsed,
    })
}
