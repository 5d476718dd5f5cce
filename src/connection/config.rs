//! Connection options

use std::time::Duration;

use crate::error::ValidationError;

/// Bounded exponential backoff used between (re)connect attempts
#[derive(Debug, Clone, PartialEq)]
pub struct ReconnectPolicy {
    /// Attempts after the first failure before giving up
    pub max_attempts: u32,

    /// Delay before the first retry
    pub initial_backoff: Duration,

    /// Upper bound for any single delay
    pub max_backoff: Duration,

    /// Growth factor between consecutive delays
    pub multiplier: f64,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_backoff: Duration::from_millis(250),
            max_backoff: Duration::from_secs(10),
            multiplier: 2.0,
        }
    }
}

impl ReconnectPolicy {
    /// Delay before retry number `attempt` (1-based)
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(32) as i32;
        let scaled = self.initial_backoff.as_secs_f64() * self.multiplier.powi(exponent);
        let capped = scaled.min(self.max_backoff.as_secs_f64());
        Duration::from_secs_f64(capped.max(0.0))
    }

    /// Set maximum attempts
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Set initial backoff
    pub fn initial_backoff(mut self, delay: Duration) -> Self {
        self.initial_backoff = delay;
        self
    }

    /// Set maximum backoff
    pub fn max_backoff(mut self, delay: Duration) -> Self {
        self.max_backoff = delay;
        self
    }
}

/// Options applied when opening the signaling channel
///
/// Must be set before `connect`; changing them requires a new connect cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionOptions {
    /// Reconnect after unexpected channel loss
    pub auto_reconnect: bool,

    /// Retry schedule
    pub reconnect: ReconnectPolicy,
}

impl Default for ConnectionOptions {
    fn default() -> Self {
        Self {
            auto_reconnect: true,
            reconnect: ReconnectPolicy::default(),
        }
    }
}

impl ConnectionOptions {
    /// Enable or disable auto-reconnect
    pub fn auto_reconnect(mut self, enabled: bool) -> Self {
        self.auto_reconnect = enabled;
        self
    }

    /// Set the retry schedule
    pub fn reconnect_policy(mut self, policy: ReconnectPolicy) -> Self {
        self.reconnect = policy;
        self
    }

    /// Validate option values
    pub fn validate(&self) -> Result<(), ValidationError> {
        let policy = &self.reconnect;
        if !(policy.multiplier.is_finite() && policy.multiplier >= 1.0) {
            return Err(ValidationError::InvalidOption {
                field: "reconnect.multiplier",
                reason: format!("must be >= 1.0, got {}", policy.multiplier),
            });
        }
        if policy.initial_backoff > policy.max_backoff {
            return Err(ValidationError::InvalidOption {
                field: "reconnect.initial_backoff",
                reason: "exceeds max_backoff".into(),
            });
        }
        Ok(())
    }
}
