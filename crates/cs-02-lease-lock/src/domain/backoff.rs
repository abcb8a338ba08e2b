//! Polling backoff for callers that want to wait on a contended lease
//!
//! Exponential growth from `initial` up to `max`, with each delay scaled by
//! a random factor in [0.5, 1.5) so that pollers released by the same
//! holder do not retry in lockstep.

use rand::Rng;
use std::time::Duration;

/// Backoff schedule parameters
#[derive(Clone, Debug, PartialEq)]
pub struct BackoffPolicy {
    pub initial: Duration,
    pub max: Duration,
    pub multiplier: u32,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            initial: Duration::from_millis(10),
            max: Duration::from_millis(250),
            multiplier: 2,
        }
    }
}

impl BackoffPolicy {
    /// Iterator-like state for one wait loop.
    pub fn schedule(&self) -> Backoff {
        Backoff {
            policy: self.clone(),
            current: self.initial,
        }
    }
}

/// Running backoff state
#[derive(Debug)]
pub struct Backoff {
    policy: BackoffPolicy,
    current: Duration,
}

impl Backoff {
    /// Un-jittered delay for the next attempt; advances the schedule.
    pub fn next_base_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = self
            .current
            .saturating_mul(self.policy.multiplier.max(1))
            .min(self.policy.max);
        delay
    }

    /// Jittered delay for the next attempt; advances the schedule.
    pub fn next_delay(&mut self) -> Duration {
        let base = self.next_base_delay();
        let factor = rand::thread_rng().gen_range(0.5..1.5);
        base.mul_f64(factor)
    }
}
