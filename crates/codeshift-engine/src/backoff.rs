//! Bounded exponential backoff for oracle calls

use codeshift_core::Error;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Retries after the first attempt. Zero disables retrying.
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub multiplier: f64,
    pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 500,
            multiplier: 2.0,
            max_delay_ms: 10_000,
        }
    }
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Delay before retry number `attempt` (0-based): base * multiplier^attempt, capped.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let scaled = self.base_delay_ms as f64 * self.multiplier.max(1.0).powi(attempt as i32);
        let ms = if scaled.is_finite() {
            (scaled as u64).min(self.max_delay_ms)
        } else {
            self.max_delay_ms
        };
        Duration::from_millis(ms)
    }

    /// `failed_attempts` counts consecutive failures already retried.
    pub fn should_retry(&self, failed_attempts: u32, error: &Error) -> bool {
        failed_attempts < self.max_retries && error.is_retryable()
    }
}
