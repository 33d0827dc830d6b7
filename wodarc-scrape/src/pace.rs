//! Adaptive pacing between requests.
//!
//! Steady-state delays carry random jitter and an occasional longer pause so
//! the traffic pattern stays unpredictable. Errors trigger exponential
//! backoff capped at five minutes, and the steady delay relaxes back toward
//! the configured minimum after a stretch of successes.

use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, info, warn};

pub struct AdaptiveLimiter {
    min_delay: f64,
    max_delay: f64,
    current_delay: f64,
    consecutive_errors: u32,
    requests_since_error: u32,
}

impl AdaptiveLimiter {
    pub fn new(min_delay_secs: f64, max_delay_secs: f64) -> Self {
        Self {
            min_delay: min_delay_secs,
            max_delay: max_delay_secs,
            current_delay: min_delay_secs,
            consecutive_errors: 0,
            requests_since_error: 0,
        }
    }

    /// Wait with random jitter before the next request.
    pub async fn wait(&mut self) {
        let delay = {
            use rand::Rng;
            let mut rng = rand::thread_rng();
            let jitter: f64 = rng.gen_range(0.5..=1.5);
            let mut secs = self.current_delay * jitter;
            // Occasionally add a longer pause, like a person wandering off.
            if rng.gen_bool(0.1) {
                let extra: f64 = rng.gen_range(2.0..=5.0);
                debug!(extra_secs = extra, "pace.long_pause");
                secs += extra;
            }
            Duration::from_secs_f64(secs)
        };
        sleep(delay).await;
        self.note_success();
    }

    /// Exponential backoff after an error; sleeps for the computed duration.
    pub async fn backoff(&mut self) {
        let pause = self.note_error();
        warn!(
            backoff_secs = pause.as_secs(),
            attempt = self.consecutive_errors,
            "pace.backoff"
        );
        sleep(pause).await;
    }

    /// Reset the error streak after a confirmed success.
    pub fn reset_errors(&mut self) {
        if self.consecutive_errors > 0 {
            info!("pace.recovered");
        }
        self.consecutive_errors = 0;
    }

    fn note_success(&mut self) {
        self.requests_since_error += 1;
        // Gradually relax toward the configured minimum.
        if self.requests_since_error > 10 && self.current_delay > self.min_delay {
            self.current_delay = (self.current_delay * 0.95).max(self.min_delay);
        }
    }

    fn note_error(&mut self) -> Duration {
        self.consecutive_errors += 1;
        self.requests_since_error = 0;
        // The cap is reached by the fifth error; clamping the shift keeps
        // long streaks from overflowing.
        let pause = ((1u64 << self.consecutive_errors.min(5)) * 10).min(300);
        self.current_delay = (self.current_delay * 1.5).min(self.max_delay * 2.0);
        Duration::from_secs(pause)
    }

    #[cfg(test)]
    fn current_delay_secs(&self) -> f64 {
        self.current_delay
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_grows_exponentially_and_caps() {
        let mut limiter = AdaptiveLimiter::new(3.0, 7.0);
        assert_eq!(limiter.note_error(), Duration::from_secs(20));
        assert_eq!(limiter.note_error(), Duration::from_secs(40));
        assert_eq!(limiter.note_error(), Duration::from_secs(80));
        assert_eq!(limiter.note_error(), Duration::from_secs(160));
        assert_eq!(limiter.note_error(), Duration::from_secs(300));
        assert_eq!(limiter.note_error(), Duration::from_secs(300));
    }

    #[test]
    fn errors_inflate_steady_delay_up_to_twice_max() {
        let mut limiter = AdaptiveLimiter::new(3.0, 7.0);
        for _ in 0..20 {
            limiter.note_error();
        }
        assert!(limiter.current_delay_secs() <= 14.0);
        assert!(limiter.current_delay_secs() > 3.0);
    }

    #[test]
    fn successes_relax_delay_back_to_minimum() {
        let mut limiter = AdaptiveLimiter::new(3.0, 7.0);
        limiter.note_error();
        let inflated = limiter.current_delay_secs();
        for _ in 0..200 {
            limiter.note_success();
        }
        assert!(limiter.current_delay_secs() < inflated);
        assert_eq!(limiter.current_delay_secs(), 3.0);
    }

    #[test]
    fn reset_clears_error_streak() {
        let mut limiter = AdaptiveLimiter::new(3.0, 7.0);
        limiter.note_error();
        limiter.note_error();
        limiter.reset_errors();
        // Next error starts the exponential sequence over.
        assert_eq!(limiter.note_error(), Duration::from_secs(20));
    }
}
