use std::time::Duration;

/// Backoff schedule for polling the gateway.
#[derive(Debug, Clone, PartialEq)]
pub struct PollConfig {
    /// Delay before the second query.
    pub initial_delay: Duration,
    /// Upper bound for a single delay.
    pub max_delay: Duration,
    /// Factor applied to the delay after every pending answer.
    pub multiplier: f64,
    /// Total time spent waiting before giving up with a pending result.
    pub max_wait: Duration,
    /// Limit for a single gateway call.
    pub query_timeout: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
            multiplier: 2.0,
            max_wait: Duration::from_secs(120),
            query_timeout: Duration::from_secs(10),
        }
    }
}

impl PollConfig {
    /// Shortest pause between two gateway queries.
    pub const MIN_DELAY: Duration = Duration::from_millis(100);

    /// Largest accepted backoff multiplier.
    pub const MAX_MULTIPLIER: f64 = 10.0;

    /// Returns true if `multiplier` is a usable backoff factor.
    pub fn is_valid_multiplier(multiplier: f64) -> bool {
        multiplier.is_finite() && (1.0..=Self::MAX_MULTIPLIER).contains(&multiplier)
    }

    /// Returns the delay before the second query, never below [`Self::MIN_DELAY`].
    pub fn first_delay(&self) -> Duration {
        self.initial_delay.max(Self::MIN_DELAY)
    }

    /// Returns the delay that follows `delay`.
    ///
    /// The result stays within `MIN_DELAY..=max(max_delay, MIN_DELAY)` for any
    /// multiplier, including non-finite ones.
    pub fn next_delay(&self, delay: Duration) -> Duration {
        Duration::try_from_secs_f64(delay.as_secs_f64() * self.multiplier)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
            .max(Self::MIN_DELAY)
    }
}

/// Payment settings.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentConfig {
    /// Subject line shown on the gateway's payment page.
    pub subject: String,
    pub poll: PollConfig,
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            subject: "Fresh grocery order".to_string(),
            poll: PollConfig::default(),
        }
    }
}
