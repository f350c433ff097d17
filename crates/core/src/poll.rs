//! Bounded polling
//!
//! The harness waits on out-of-process work (cluster readiness, consumer
//! results) with a fixed attempt count and a fixed delay between attempts.
//! The bound is part of the contract: a poll never retries past
//! `attempts`, and never sleeps after the final attempt.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Attempt bound and inter-attempt delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollPolicy {
    /// Maximum number of attempts, at least 1
    pub attempts: u32,
    /// Delay between consecutive attempts, in milliseconds
    pub interval_ms: u64,
}

impl PollPolicy {
    /// Readiness polling: 5 attempts, 1 second apart.
    pub const READINESS: PollPolicy = PollPolicy {
        attempts: 5,
        interval_ms: 1000,
    };

    /// Consumer result collection: 60 attempts, 5 seconds apart.
    pub const RESULTS: PollPolicy = PollPolicy {
        attempts: 60,
        interval_ms: 5000,
    };

    /// Create a policy
    pub fn new(attempts: u32, interval: Duration) -> Self {
        PollPolicy {
            attempts,
            interval_ms: interval.as_millis() as u64,
        }
    }

    /// Delay between attempts
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

/// Terminal state of a bounded poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome<T, P> {
    /// The probe succeeded on attempt `attempts` (1-based)
    Ready {
        /// Value produced by the successful probe
        value: T,
        /// Attempts used
        attempts: u32,
    },
    /// Every attempt failed; `last` is what the final probe observed
    Exhausted {
        /// Observation from the final attempt
        last: P,
        /// Attempts used, equal to the policy bound
        attempts: u32,
    },
}

/// Result of a single probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Probe<T, P> {
    /// Condition met
    Done(T),
    /// Condition not met yet, with what was observed
    Pending(P),
}

/// Run `probe` until it reports `Done` or the policy is exhausted.
///
/// Probe errors propagate immediately; only `Pending` is retried.
pub fn poll_bounded<T, P, E, F>(policy: PollPolicy, mut probe: F) -> Result<PollOutcome<T, P>, E>
where
    F: FnMut(u32) -> Result<Probe<T, P>, E>,
{
    let attempts = policy.attempts.max(1);
    let mut attempt = 1;
    loop {
        match probe(attempt)? {
            Probe::Done(value) => {
                return Ok(PollOutcome::Ready {
                    value,
                    attempts: attempt,
                })
            }
            Probe::Pending(last) => {
                if attempt >= attempts {
                    debug!(
                        target: "harness::poll",
                        attempts = attempt,
                        interval_ms = policy.interval_ms,
                        "Polling bound exhausted"
                    );
                    return Ok(PollOutcome::Exhausted {
                        last,
                        attempts: attempt,
                    });
                }
            }
        }
        attempt += 1;
        if !policy.interval().is_zero() {
            std::thread::sleep(policy.interval());
        }
    }
}
