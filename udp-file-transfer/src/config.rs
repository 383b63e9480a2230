//! Validated endpoint configuration.
//!
//! Everything here is checked before a socket is opened or a file touched,
//! so a bad value stops the process with one diagnostic and no partial
//! transfer.

use std::net::SocketAddr;
use std::path::PathBuf;

use thiserror::Error;

use crate::packet::MAX_CHUNK_SIZE;
use crate::simulator::{Rate, RateError};
use crate::socket;
use crate::timer::Timeouts;

/// Well-known port the server listens on.
pub const DEFAULT_PORT: u16 = 22600;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {which} rate")]
    InvalidRate {
        which: &'static str,
        #[source]
        source: RateError,
    },
    #[error("invalid chunk size {0}: must be between 1 and 1000")]
    InvalidChunkSize(usize),
    #[error("unknown host {host}")]
    UnresolvableHost {
        host: String,
        #[source]
        source: std::io::Error,
    },
}

/// Probabilities fed to an endpoint's fault injector.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FaultRates {
    pub loss: Rate,
    pub corruption: Rate,
}

impl FaultRates {
    pub fn new(loss: f64, corruption: f64) -> Result<Self, ConfigError> {
        let loss = Rate::new(loss).map_err(|source| ConfigError::InvalidRate {
            which: "loss",
            source,
        })?;
        let corruption = Rate::new(corruption).map_err(|source| ConfigError::InvalidRate {
            which: "corruption",
            source,
        })?;
        Ok(Self { loss, corruption })
    }
}

/// Settings for the sending side.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub server: SocketAddr,
    pub input: PathBuf,
    pub chunk_size: usize,
    pub rates: FaultRates,
    pub timeouts: Timeouts,
    /// Fixed RNG seed; `None` draws from OS entropy.
    pub seed: Option<u64>,
}

impl ClientConfig {
    /// Validate the raw values and resolve `host`.
    pub async fn new(
        host: &str,
        port: u16,
        input: PathBuf,
        chunk_size: usize,
        rates: FaultRates,
    ) -> Result<Self, ConfigError> {
        let chunk_size = validate_chunk_size(chunk_size)?;
        let server = socket::resolve(host, port)
            .await
            .map_err(|source| ConfigError::UnresolvableHost {
                host: host.to_owned(),
                source,
            })?;
        Ok(Self {
            server,
            input,
            chunk_size,
            rates,
            timeouts: Timeouts::default(),
            seed: None,
        })
    }

    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }
}

/// Settings for the receiving side.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind: SocketAddr,
    pub output: PathBuf,
    pub rates: FaultRates,
    pub timeouts: Timeouts,
    pub seed: Option<u64>,
}

impl ServerConfig {
    pub fn new(bind: SocketAddr, output: PathBuf, rates: FaultRates) -> Self {
        Self {
            bind,
            output,
            rates,
            timeouts: Timeouts::default(),
            seed: None,
        }
    }

    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }
}

pub fn validate_chunk_size(n: usize) -> Result<usize, ConfigError> {
    if (1..=MAX_CHUNK_SIZE).contains(&n) {
        Ok(n)
    } else {
        Err(ConfigError::InvalidChunkSize(n))
    }
}
