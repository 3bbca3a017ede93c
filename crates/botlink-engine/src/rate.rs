use std::time::Duration;

use tokio::time::Instant;

/// Token bucket that starts full and refills at `rate` tokens per second.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    max_tokens: f64,
    tokens: f64,
    refill_interval: Duration,
    last_update: Instant,
}

impl RateLimiter {
    /// A rate of 0 is treated as 1 token per second.
    pub fn new(rate: u32) -> Self {
        let rate = rate.max(1);
        Self {
            max_tokens: f64::from(rate),
            tokens: f64::from(rate),
            refill_interval: Duration::from_secs(1) / rate,
            last_update: Instant::now(),
        }
    }

    /// Take a token if one is available.
    pub fn try_acquire(&mut self) -> bool {
        self.refill();
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Tokens currently available (rounded down).
    pub fn available(&mut self) -> u32 {
        self.refill();
        self.tokens as u32
    }

    pub fn rate(&self) -> u32 {
        self.max_tokens as u32
    }

    fn refill(&mut self) {
        let now = Instant::now();
        let elapsed = now.saturating_duration_since(self.last_update);
        if elapsed.is_zero() {
            return;
        }
        self.last_update = now;
        let gained = elapsed.as_secs_f64() / self.refill_interval.as_secs_f64();
        self.tokens = (self.tokens + gained).min(self.max_tokens);
    }
}
