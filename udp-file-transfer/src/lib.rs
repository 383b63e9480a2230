//! `udp-file-transfer`: stop-and-wait reliable file transfer over UDP.
//!
//! # Architecture
//!
//! ```text
//!  input file                                         output file
//!      │                                                   ▲
//!  ┌───▼─────────┐   data frames    ┌─────────────────┐    │
//!  │   client    │─────────────────▶│     server      │────┘
//!  │  (Sender)   │◀─────────────────│   (Receiver)    │
//!  └───┬─────────┘       acks       └────────┬────────┘
//!      │ loss on send, corruption on recv    │ corruption on recv, loss on send
//!  ┌───▼──────────┐                 ┌────────▼────────┐
//!  │ FaultInjector│                 │  FaultInjector  │
//!  └──────────────┘                 └─────────────────┘
//! ```
//!
//! Each module has a single responsibility:
//! - [`packet`]: wire format (serialise / deserialise)
//! - [`state`]: finite-state-machine types
//! - [`sender`]: stop-and-wait send-side state machine
//! - [`receiver`]: stop-and-wait receive-side state machine
//! - [`simulator`]: seedable loss/corruption fault injector
//! - [`socket`]: async UDP socket abstraction
//! - [`stream`]: chunked input reader with end-of-stream lookahead
//! - [`timer`]: ack and idle timeouts
//! - [`config`]: validated endpoint settings
//! - [`client`]: drives a sender over a socket
//! - [`server`]: drives a receiver over a socket

pub mod client;
pub mod config;
pub mod packet;
pub mod receiver;
pub mod sender;
pub mod server;
pub mod simulator;
pub mod socket;
pub mod state;
pub mod stream;
pub mod timer;

pub use client::ClientError;
pub use config::{ClientConfig, ConfigError, FaultRates, ServerConfig, DEFAULT_PORT};
pub use server::{ServerError, ServerReport};
