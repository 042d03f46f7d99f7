//! Redial Backoff
//!
//! Exponential backoff for redial attempts: 1s before the second attempt,
//! doubling after each failure, capped at 60s, retrying forever. Optional
//! jitter spreads redials from many publishers hitting the same daemon;
//! it is off by default so the delay sequence is exact.

use std::time::Duration;

use rand::Rng;

use crate::config::ReconnectSettings;

/// Backoff schedule for one reconnection episode.
///
/// Create a fresh policy when a connection is lost; the delay sequence
/// restarts from the initial delay.
#[derive(Debug)]
pub struct BackoffPolicy {
    settings: ReconnectSettings,
    current_delay: Duration,
    attempt_count: u32,
}

impl BackoffPolicy {
    /// Create a new policy from the given settings.
    #[must_use]
    pub const fn new(settings: ReconnectSettings) -> Self {
        let initial_delay = settings.initial_delay;
        Self {
            settings,
            current_delay: initial_delay,
            attempt_count: 0,
        }
    }

    /// Get the delay to sleep before the next dial attempt.
    ///
    /// Redialing never gives up, so this always yields a delay; the
    /// caller decides when to stop (shutdown).
    pub fn next_delay(&mut self) -> Duration {
        self.attempt_count = self.attempt_count.saturating_add(1);

        let delay = self.apply_jitter(self.current_delay);

        #[allow(clippy::cast_precision_loss)]
        let scaled = (self.current_delay.as_millis() as f64 * self.settings.multiplier).round();
        let next_millis = if scaled.is_finite() && scaled > 0.0 {
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            {
                scaled as u128
            }
        } else {
            0
        };
        let capped = next_millis.min(self.settings.max_delay.as_millis());
        self.current_delay = Duration::from_millis(u64::try_from(capped).unwrap_or(u64::MAX));

        delay
    }

    /// Reset the schedule after a successful connection.
    pub const fn reset(&mut self) {
        self.current_delay = self.settings.initial_delay;
        self.attempt_count = 0;
    }

    /// Number of delays handed out since the last reset.
    #[must_use]
    pub const fn attempt_count(&self) -> u32 {
        self.attempt_count
    }

    fn apply_jitter(&self, duration: Duration) -> Duration {
        if self.settings.jitter_factor <= 0.0 {
            return duration;
        }

        #[allow(clippy::cast_precision_loss)]
        let base_millis = duration.as_millis() as f64;
        let jitter_range = base_millis * self.settings.jitter_factor;
        let mut rng = rand::rng();
        let jitter: f64 = rng.random_range(-jitter_range..=jitter_range);
        let adjusted_millis = (base_millis + jitter).max(1.0);

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let adjusted_u64 = adjusted_millis as u64;
        Duration::from_millis(adjusted_u64)
    }
}
