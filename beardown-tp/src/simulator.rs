//! Lossy channel simulator for deterministic testing.
//!
//! Real networks drop, corrupt, duplicate and delay datagrams.  To exercise
//! the reliability mechanisms without depending on actual network conditions,
//! datagrams pass through a [`Channel`].  The [`Simulator`] channel applies a
//! configurable fault model:
//!
//! | Fault            | Description                                          |
//! |------------------|------------------------------------------------------|
//! | Packet loss      | Drop a datagram with probability `loss_rate`.        |
//! | Corruption       | Flip one bit past the header, `corruption_rate`.     |
//! | Duplication      | Deliver a datagram twice, `duplicate_rate`.          |
//! | Delay            | Hold a datagram for a duration drawn from `delay`.   |
//!
//! Every random decision comes from an injected [`StdRng`], so a seed
//! replays the exact same fault sequence.

use std::ops::Range;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;

use crate::packet::HEADER_LEN;

/// One copy of a datagram that survived the channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transit {
    pub bytes: Vec<u8>,
    /// How long the copy spends in transit.
    pub delay: Duration,
}

impl Transit {
    /// A copy delivered immediately.
    pub fn now(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            delay: Duration::ZERO,
        }
    }
}

/// An unreliable datagram channel.
///
/// `transmit` returns every copy of `datagram` that reaches the far side:
/// none (lost), one, or several (duplicated), each possibly altered or late.
pub trait Channel {
    fn transmit(&mut self, datagram: &[u8]) -> Vec<Transit>;
}

/// Configuration for the fault-injection model.
///
/// All probabilities are in the range `[0.0, 1.0]`.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulatorConfig {
    /// Probability that a datagram is silently dropped.
    pub loss_rate: f64,
    /// Probability that a surviving datagram has one bit flipped.
    pub corruption_rate: f64,
    /// Probability that a surviving datagram is delivered twice.
    pub duplicate_rate: f64,
    /// Transit delay range; an empty range means no delay.
    pub delay: Range<Duration>,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        // No faults: a transparent pass-through.
        Self {
            loss_rate: 0.0,
            corruption_rate: 0.0,
            duplicate_rate: 0.0,
            delay: Duration::ZERO..Duration::ZERO,
        }
    }
}

impl SimulatorConfig {
    /// Reject probabilities outside `[0, 1]` and inverted delay ranges.
    pub fn validate(&self) -> Result<(), SimulatorError> {
        for (name, value) in [
            ("loss_rate", self.loss_rate),
            ("corruption_rate", self.corruption_rate),
            ("duplicate_rate", self.duplicate_rate),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(SimulatorError::InvalidRate { name, value });
            }
        }
        if self.delay.start > self.delay.end {
            return Err(SimulatorError::InvalidDelay {
                start: self.delay.start,
                end: self.delay.end,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimulatorError {
    #[error("{name} must be within [0, 1], got {value}")]
    InvalidRate { name: &'static str, value: f64 },
    #[error("delay range {start:?}..{end:?} is inverted")]
    InvalidDelay { start: Duration, end: Duration },
}

/// Counters of what the simulator did to the traffic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SimulatorStats {
    pub packets_sent: u64,
    pub packets_lost: u64,
    pub packets_corrupted: u64,
    pub packets_duplicated: u64,
    pub packets_delayed: u64,
}

/// A fault-injecting [`Channel`].
#[derive(Debug)]
pub struct Simulator {
    config: SimulatorConfig,
    rng: StdRng,
    stats: SimulatorStats,
}

impl Simulator {
    /// Seeded simulator; the same seed replays the same faults.
    pub fn with_seed(config: SimulatorConfig, seed: u64) -> Result<Self, SimulatorError> {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    /// Simulator seeded from OS entropy.
    pub fn from_entropy(config: SimulatorConfig) -> Result<Self, SimulatorError> {
        Self::with_rng(config, StdRng::from_entropy())
    }

    pub fn with_rng(config: SimulatorConfig, rng: StdRng) -> Result<Self, SimulatorError> {
        config.validate()?;
        Ok(Self {
            config,
            rng,
            stats: SimulatorStats::default(),
        })
    }

    /// Loss-free, fault-free channel.
    pub fn perfect() -> Self {
        Self {
            config: SimulatorConfig::default(),
            rng: StdRng::seed_from_u64(0),
            stats: SimulatorStats::default(),
        }
    }

    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    pub fn stats(&self) -> &SimulatorStats {
        &self.stats
    }

    /// Flip one random bit at or after [`HEADER_LEN`], leaving the header
    /// (and so the stored checksum) untouched.  Header-only datagrams pass
    /// unchanged.
    fn corrupt(&mut self, bytes: &mut [u8]) -> bool {
        if bytes.len() <= HEADER_LEN {
            return false;
        }
        let pos = self.rng.gen_range(HEADER_LEN..bytes.len());
        let bit = self.rng.gen_range(0..8);
        bytes[pos] ^= 1 << bit;
        true
    }

    fn draw_delay(&mut self) -> Duration {
        if self.config.delay.is_empty() {
            return Duration::ZERO;
        }
        self.rng.gen_range(self.config.delay.clone())
    }
}

impl Channel for Simulator {
    fn transmit(&mut self, datagram: &[u8]) -> Vec<Transit> {
        self.stats.packets_sent += 1;

        if self.rng.gen_bool(self.config.loss_rate) {
            self.stats.packets_lost += 1;
            log::trace!("[sim] dropped {} bytes", datagram.len());
            return Vec::new();
        }

        let mut bytes = datagram.to_vec();
        if self.rng.gen_bool(self.config.corruption_rate) && self.corrupt(&mut bytes) {
            self.stats.packets_corrupted += 1;
            log::trace!("[sim] corrupted {} bytes", bytes.len());
        }

        let copies = if self.rng.gen_bool(self.config.duplicate_rate) {
            self.stats.packets_duplicated += 1;
            2
        } else {
            1
        };

        (0..copies)
            .map(|_| {
                let delay = self.draw_delay();
                if !delay.is_zero() {
                    self.stats.packets_delayed += 1;
                }
                Transit {
                    bytes: bytes.clone(),
                    delay,
                }
            })
            .collect()
    }
}
