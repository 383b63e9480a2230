//! Sending endpoint: drives a [`Sender`] over a UDP socket.
//!
//! The loop looks at the machine's state, performs the one piece of I/O that
//! state calls for, and feeds the result back as an event:
//!
//! | State       | I/O                                  | Event            |
//! |-------------|--------------------------------------|------------------|
//! | `ReadChunk` | read next chunk from the input       | `on_chunk`       |
//! | `Send`      | roll for loss, maybe send the frame  | `on_send`        |
//! | `AwaitAck`  | receive with the ack timeout         | `on_ack` / `on_timeout` |
//! | `Done`      | -                                    | -                |

use std::io;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::path::PathBuf;

use rand::Rng;
use thiserror::Error;
use tokio::fs::File;
use tokio::io::{AsyncRead, BufReader};

use crate::config::ClientConfig;
use crate::packet::Ack;
use crate::sender::{SendOutcome, Sender, SenderStats};
use crate::simulator::FaultInjector;
use crate::socket::{Recv, Socket};
use crate::state::{InvalidTransition, SenderState};
use crate::stream::ChunkReader;

/// Fatal client-side failures. Transient protocol faults never surface here.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("unable to create UDP socket")]
    Socket(#[source] io::Error),
    #[error("unable to open {}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("unable to read file")]
    Read(#[source] io::Error),
    #[error("segment not sent")]
    Send(#[source] io::Error),
    #[error("unable to receive acknowledgement")]
    Recv(#[source] io::Error),
    #[error(transparent)]
    Transition(#[from] InvalidTransition),
}

/// Send the file named in `config` and return the sender's statistics.
pub async fn run(config: &ClientConfig) -> Result<SenderStats, ClientError> {
    let file = File::open(&config.input)
        .await
        .map_err(|source| ClientError::Open {
            path: config.input.clone(),
            source,
        })?;

    let local: SocketAddr = if config.server.is_ipv4() {
        (Ipv4Addr::UNSPECIFIED, 0).into()
    } else {
        (Ipv6Addr::UNSPECIFIED, 0).into()
    };
    let socket = Socket::bind(local).await.map_err(ClientError::Socket)?;
    let mut faults = FaultInjector::from_seed(config.seed);

    log::info!(
        "sending {} to {} in chunks of {} bytes",
        config.input.display(),
        config.server,
        config.chunk_size
    );
    transfer(&socket, config, BufReader::new(file), &mut faults).await
}

/// Transfer everything `input` yields to `config.server` over `socket`.
///
/// Returns once the final frame has been acknowledged. There is no retry
/// limit: a peer that never answers keeps this future busy until dropped.
pub async fn transfer<R, G>(
    socket: &Socket,
    config: &ClientConfig,
    input: R,
    faults: &mut FaultInjector<G>,
) -> Result<SenderStats, ClientError>
where
    R: AsyncRead + Unpin,
    G: Rng,
{
    let mut sender = Sender::new();
    let mut reader = ChunkReader::new(input, config.chunk_size);

    loop {
        match sender.state() {
            SenderState::ReadChunk => {
                let chunk = reader.next_chunk().await.map_err(ClientError::Read)?;
                sender.on_chunk(chunk)?;
            }
            SenderState::Send { .. } => {
                let lost = faults.should_trigger(config.rates.loss);
                match sender.on_send(lost)? {
                    // Nothing was awaited; let the runtime breathe before retrying.
                    SendOutcome::Lost => tokio::task::yield_now().await,
                    SendOutcome::Transmit { .. } => {
                        if let Some(frame) = sender.in_flight() {
                            socket
                                .send_to(&frame.encode(), config.server)
                                .await
                                .map_err(ClientError::Send)?;
                        }
                    }
                }
            }
            SenderState::AwaitAck { .. } => {
                let received = socket
                    .recv_from(Some(config.timeouts.ack))
                    .await
                    .map_err(ClientError::Recv)?;
                match received {
                    Recv::TimedOut => sender.on_timeout()?,
                    Recv::Datagram { bytes, .. } => {
                        let corrupt = faults.should_trigger(config.rates.corruption);
                        sender.on_ack(Ack::decode(&bytes), corrupt)?;
                    }
                }
            }
            SenderState::Done => break,
        }
    }

    log::debug!("transfer acknowledged up to #{}", sender.last_acked());
    Ok(*sender.stats())
}
