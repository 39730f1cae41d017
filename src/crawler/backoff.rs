use std::time::Duration;

/// Retry delay that doubles per attempt up to a ceiling
#[derive(Debug, Clone, Copy)]
pub struct ExponentialBackoff {
    base_ms: u64,
    max_ms: u64,
}

impl ExponentialBackoff {
    pub const fn new(base_ms: u64, max_ms: u64) -> Self {
        Self { base_ms, max_ms }
    }

    /// Delay before retry number `attempt` (0-based)
    pub fn delay(&self, attempt: u32) -> Duration {
        let exponential_delay = self
            .base_ms
            .saturating_mul(2u64.saturating_pow(attempt.min(20)));
        Duration::from_millis(exponential_delay.min(self.max_ms))
    }
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self::new(250, 4_000)
    }
}
