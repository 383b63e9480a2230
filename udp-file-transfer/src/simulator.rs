//! Fault injection for simulated loss and corruption.
//!
//! The transport underneath is a real UDP socket on a usually well-behaved
//! network, so the protocol's recovery paths would rarely run on their own.
//! Each endpoint therefore rolls the dice at every point where the network
//! could misbehave:
//!
//! | Endpoint | Event                 | Rate used          |
//! |----------|-----------------------|--------------------|
//! | Sender   | data frame goes out   | `loss_rate`        |
//! | Sender   | ack comes in          | `corruption_rate`  |
//! | Receiver | data frame comes in   | `corruption_rate`  |
//! | Receiver | ack goes out          | `loss_rate`        |
//!
//! Every decision is an independent Bernoulli draw from the injector's own
//! RNG. Seed it with [`FaultInjector::seeded`] to make a run reproducible.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;

/// A probability in `[0.0, 1.0]`.
///
/// Validated on construction so [`FaultInjector::should_trigger`] never sees
/// an out-of-range value.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
pub struct Rate(f64);

impl Rate {
    pub const NEVER: Rate = Rate(0.0);
    pub const ALWAYS: Rate = Rate(1.0);

    pub fn new(p: f64) -> Result<Self, RateError> {
        if (0.0..=1.0).contains(&p) {
            Ok(Rate(p))
        } else {
            Err(RateError(p))
        }
    }

    pub fn get(self) -> f64 {
        self.0
    }
}

impl std::str::FromStr for Rate {
    type Err = RateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let p: f64 = s.trim().parse().map_err(|_| RateError(f64::NAN))?;
        Rate::new(p)
    }
}

/// A rate outside `[0.0, 1.0]` (or not a number at all).
#[derive(Debug, Clone, Copy, Error, PartialEq)]
#[error("rate must be between 0 and 1, got {0}")]
pub struct RateError(pub f64);

/// Decides, one event at a time, whether a simulated fault happens.
#[derive(Debug, Clone)]
pub struct FaultInjector<R = StdRng> {
    rng: R,
}

impl FaultInjector<StdRng> {
    /// Injector whose decisions are fully determined by `seed`.
    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }

    /// Injector seeded from OS entropy.
    pub fn from_entropy() -> Self {
        Self::new(StdRng::from_entropy())
    }

    /// [`seeded`](Self::seeded) when a seed is given, otherwise
    /// [`from_entropy`](Self::from_entropy).
    pub fn from_seed(seed: Option<u64>) -> Self {
        match seed {
            Some(seed) => {
                log::debug!("fault injector seeded with {seed}");
                Self::seeded(seed)
            }
            None => Self::from_entropy(),
        }
    }
}

impl<R: Rng> FaultInjector<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }

    /// Independent draw that returns `true` with probability `rate`.
    pub fn should_trigger(&mut self, rate: Rate) -> bool {
        self.rng.gen_bool(rate.get())
    }
}
