//! # Manager runtime configuration.
//!
//! Provides [`ManagerConfig`], the timing knobs of the two processing loops.
//! The defaults reproduce the classic fixed intervals: a 100 ms scheduling
//! tick, 100 ms polling granularity, and a 6 s start/stop ceiling.
//!
//! ## Field semantics
//! - `tick`: pause between scheduling-loop iterations
//! - `poll`: granularity of every polling wait (start/stop handshake,
//!   `wait_empty`, command-drain checks)
//! - `handshake`: ceiling for a loop to report running/stopped during
//!   `start()`/`stop()`; exceeding it is a fatal
//!   [`RuntimeError`](crate::RuntimeError), not a retryable condition

use std::time::Duration;

/// Timing configuration for the manager's processing loops.
///
/// All fields are public for flexibility. Prefer the clamped accessors in
/// loop code to avoid zero-interval busy spins.
#[derive(Clone, Debug)]
pub struct ManagerConfig {
    /// Pause between scheduling-loop iterations.
    ///
    /// Each iteration calls `schedule()` on every scheduling-enabled
    /// participant, then drains the command queue, then sleeps this long.
    pub tick: Duration,

    /// Granularity of polling waits (handshakes, `wait_empty`).
    pub poll: Duration,

    /// Maximum wait for a loop to report running/stopped.
    pub handshake: Duration,
}

impl ManagerConfig {
    /// Scheduling tick clamped to a 1 ms minimum.
    #[inline]
    pub fn tick_clamped(&self) -> Duration {
        self.tick.max(Duration::from_millis(1))
    }

    /// Polling interval clamped to a 1 ms minimum.
    #[inline]
    pub fn poll_clamped(&self) -> Duration {
        self.poll.max(Duration::from_millis(1))
    }
}

impl Default for ManagerConfig {
    /// Default configuration:
    ///
    /// - `tick = 100ms` (scheduling interval)
    /// - `poll = 100ms` (polling granularity)
    /// - `handshake = 6s` (start/stop ceiling)
    fn default() -> Self {
        Self {
            tick: Duration::from_millis(100),
            poll: Duration::from_millis(100),
            handshake: Duration::from_secs(6),
        }
    }
}
