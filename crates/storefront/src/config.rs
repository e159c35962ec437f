//! Application configuration loaded from environment variables.

use std::str::FromStr;
use std::time::Duration;

use checkout::SettlementConfig;
use domain::Money;
use payment::{PaymentConfig, PollConfig};

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Storefront configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `DATABASE_URL`: PostgreSQL connection string (no default)
/// - `DATABASE_MAX_CONNECTIONS`: pool size (default: `5`)
/// - `REDIS_URL`: Redis connection string for carts (no default)
/// - `TRANSIT_FEE_CENTS`: flat transit fee (default: `1000`)
/// - `PAYMENT_SUBJECT`: subject on the gateway payment page
/// - `PAYMENT_POLL_INITIAL_DELAY_MS` (default: `1000`),
///   `PAYMENT_POLL_MAX_DELAY_MS` (default: `10000`),
///   `PAYMENT_POLL_MULTIPLIER` (default: `2.0`),
///   `PAYMENT_POLL_MAX_WAIT_SECS` (default: `120`),
///   `PAYMENT_QUERY_TIMEOUT_SECS` (default: `10`)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `LOG_FORMAT`: `text` or `json` (default: `text`)
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub redis_url: Option<String>,
    pub transit_fee_cents: i64,
    pub payment_subject: String,
    pub poll: PollConfig,
    pub log_level: String,
    pub log_format: LogFormat,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration from any key lookup, falling back to defaults.
    ///
    /// Values that fail to parse are ignored.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        Self {
            database_url: lookup("DATABASE_URL"),
            database_max_connections: parse_var(&lookup, "DATABASE_MAX_CONNECTIONS")
                .unwrap_or(defaults.database_max_connections),
            redis_url: lookup("REDIS_URL"),
            transit_fee_cents: parse_var(&lookup, "TRANSIT_FEE_CENTS")
                .filter(|cents: &i64| *cents >= 0)
                .unwrap_or(defaults.transit_fee_cents),
            payment_subject: lookup("PAYMENT_SUBJECT").unwrap_or(defaults.payment_subject),
            poll: PollConfig {
                initial_delay: parse_var(&lookup, "PAYMENT_POLL_INITIAL_DELAY_MS")
                    .map(Duration::from_millis)
                    .filter(|delay| *delay >= PollConfig::MIN_DELAY)
                    .unwrap_or(defaults.poll.initial_delay),
                max_delay: parse_var(&lookup, "PAYMENT_POLL_MAX_DELAY_MS")
                    .map(Duration::from_millis)
                    .filter(|delay| *delay >= PollConfig::MIN_DELAY)
                    .unwrap_or(defaults.poll.max_delay),
                multiplier: parse_var(&lookup, "PAYMENT_POLL_MULTIPLIER")
                    .filter(|m: &f64| PollConfig::is_valid_multiplier(*m))
                    .unwrap_or(defaults.poll.multiplier),
                max_wait: parse_var(&lookup, "PAYMENT_POLL_MAX_WAIT_SECS")
                    .map(Duration::from_secs)
                    .unwrap_or(defaults.poll.max_wait),
                query_timeout: parse_var(&lookup, "PAYMENT_QUERY_TIMEOUT_SECS")
                    .map(Duration::from_secs)
                    .unwrap_or(defaults.poll.query_timeout),
            },
            log_level: lookup("RUST_LOG").unwrap_or(defaults.log_level),
            log_format: match lookup("LOG_FORMAT").as_deref().map(str::trim) {
                Some(f) if f.eq_ignore_ascii_case("json") => LogFormat::Json,
                _ => LogFormat::Text,
            },
        }
    }

    /// Settlement settings derived from this configuration.
    pub fn settlement(&self) -> SettlementConfig {
        SettlementConfig {
            transit_fee: Money::from_cents(self.transit_fee_cents),
        }
    }

    /// Payment settings derived from this configuration.
    pub fn payment(&self) -> PaymentConfig {
        PaymentConfig {
            subject: self.payment_subject.clone(),
            poll: self.poll.clone(),
        }
    }
}

fn parse_var<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    lookup(key).and_then(|value| value.trim().parse().ok())
}

impl Default for Config {
    fn default() -> Self {
        let payment = PaymentConfig::default();
        Self {
            database_url: None,
            database_max_connections: 5,
            redis_url: None,
            transit_fee_cents: SettlementConfig::default().transit_fee.cents(),
            payment_subject: payment.subject,
            poll: payment.poll,
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn from_pairs(pairs: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_default_values() {
        let config = Config::default();
        assert_eq!(config.transit_fee_cents, 1000);
        assert_eq!(config.database_max_connections, 5);
        assert_eq!(config.log_level, "info");
        assert_eq!(config.log_format, LogFormat::Text);
        assert!(config.database_url.is_none());
    }

    #[test]
    fn test_empty_lookup_gives_defaults() {
        assert_eq!(from_pairs(&[]), Config::default());
    }

    #[test]
    fn test_values_are_read() {
        let config = from_pairs(&[
            ("DATABASE_URL", "postgres://localhost/shop"),
            ("REDIS_URL", "redis://localhost"),
            ("TRANSIT_FEE_CENTS", "500"),
            ("PAYMENT_POLL_INITIAL_DELAY_MS", "250"),
            ("PAYMENT_POLL_MAX_WAIT_SECS", "30"),
            ("LOG_FORMAT", "JSON"),
        ]);
        assert_eq!(config.database_url.as_deref(), Some("postgres://localhost/shop"));
        assert_eq!(config.redis_url.as_deref(), Some("redis://localhost"));
        assert_eq!(config.settlement().transit_fee.cents(), 500);
        assert_eq!(config.poll.initial_delay, Duration::from_millis(250));
        assert_eq!(config.payment().poll.max_wait, Duration::from_secs(30));
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn test_unusable_poll_settings_fall_back() {
        for multiplier in ["inf", "NaN", "1e300", "0"] {
            let config = from_pairs(&[("PAYMENT_POLL_MULTIPLIER", multiplier)]);
            assert_eq!(config.poll.multiplier, 2.0, "multiplier {multiplier}");
        }

        let config = from_pairs(&[
            ("PAYMENT_POLL_INITIAL_DELAY_MS", "0"),
            ("PAYMENT_POLL_MAX_DELAY_MS", "0"),
        ]);
        assert_eq!(config.poll.initial_delay, Duration::from_secs(1));
        assert_eq!(config.poll.max_delay, Duration::from_secs(10));
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let config = from_pairs(&[
            ("TRANSIT_FEE_CENTS", "-5"),
            ("PAYMENT_POLL_MULTIPLIER", "0.5"),
            ("DATABASE_MAX_CONNECTIONS", "many"),
        ]);
        assert_eq!(config.transit_fee_cents, 1000);
        assert_eq!(config.poll.multiplier, 2.0);
        assert_eq!(config.database_max_connections, 5);
    }
}
