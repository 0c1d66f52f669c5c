//! Retry configuration for operations against the storage backend.
//!
//! This is shared between this crate and `skystash-download`, which owns the
//! retry loops around byte transfers.
use backoff::backoff::Backoff as BackoffTrait;
use backoff::ExponentialBackoff;
use std::time::Duration;

/// Configuration for automatic retrying of transient failures.
#[derive(Debug, Clone)]
pub struct Retry {
    /// Number of retries (not counting the first try) for transient errors.
    /// Zero to disable retries entirely. (default 3)
    pub retries: u32,

    /// Maximum interval between retries (default 30s)
    pub max_delay: Duration,

    /// Factor for delay: 2 ^ retry * delay_factor.  The default of 1s gives
    /// delays of 1s, 2s, 4s for the default retry count.
    pub delay_factor: Duration,

    /// Randomization factor applied as
    /// delay = delay * random([1 - randomization_factor; 1 + randomization_factor]).
    /// Zero (the default) keeps the delays exact.
    pub randomization_factor: f64,
}

impl Default for Retry {
    fn default() -> Self {
        Self {
            retries: 3,
            max_delay: Duration::from_secs(30),
            delay_factor: Duration::from_secs(1),
            randomization_factor: 0.0,
        }
    }
}

/// Backoff tracker for a single, possibly-retried operation.  This is a thin
/// wrapper around [backoff::ExponentialBackoff] that counts retries instead of
/// elapsed time.
#[derive(Debug)]
pub struct Backoff<'a> {
    retry: &'a Retry,
    tries: u32,
    backoff: ExponentialBackoff,
}

impl<'a> Backoff<'a> {
    pub fn new(retry: &Retry) -> Backoff {
        let mut backoff = ExponentialBackoff {
            max_elapsed_time: None, // we count retries instead
            max_interval: retry.max_delay,
            initial_interval: retry.delay_factor,
            multiplier: 2.0,
            randomization_factor: retry.randomization_factor,
            ..Default::default()
        };
        backoff.reset();
        Backoff {
            retry,
            tries: 0,
            backoff,
        }
    }

    /// Return the next backoff interval or, if the operation should not be
    /// retried, None.
    pub fn next_backoff(&mut self) -> Option<Duration> {
        self.tries += 1;
        if self.tries > self.retry.retries {
            None
        } else {
            self.backoff.next_backoff()
        }
    }
}
