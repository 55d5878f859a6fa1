use crate::aggregator::{AggregateOptions, RatePolicy};
use crate::coerce::DecimalSeparator;
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;
use std::{env, time::Duration};
use tracing::warn;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub upstream_base_url: Option<String>,
    pub fetch_timeout: Duration,
    pub period_days: u32,
    pub separator: DecimalSeparator,
    pub rate_policy: RatePolicy,
    /// `None` disables the background refresh task.
    pub refresh_interval: Option<Duration>,
    pub fallback_data_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            upstream_base_url: None,
            fetch_timeout: Duration::from_secs(30),
            period_days: 30,
            separator: DecimalSeparator::Dot,
            rate_policy: RatePolicy::PreferUpstream,
            refresh_interval: Some(Duration::from_secs(300)),
            fallback_data_path: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let text = |key: &str| lookup(key).map(|value| value.trim().to_string()).filter(|value| !value.is_empty());

        let fetch_timeout_secs = parsed(&text, "FETCH_TIMEOUT_SECS", defaults.fetch_timeout.as_secs());
        let refresh_secs = parsed(
            &text,
            "REFRESH_INTERVAL_SECS",
            defaults.refresh_interval.map_or(0, |interval| interval.as_secs()),
        );

        Self {
            port: parsed(&text, "PORT", defaults.port),
            upstream_base_url: text("UPSTREAM_BASE_URL"),
            fetch_timeout: Duration::from_secs(fetch_timeout_secs.max(1)),
            period_days: parsed(&text, "PERIOD_DAYS", defaults.period_days),
            separator: parsed(&text, "DECIMAL_SEPARATOR", defaults.separator),
            rate_policy: parsed(&text, "RATE_POLICY", defaults.rate_policy),
            refresh_interval: (refresh_secs > 0).then(|| Duration::from_secs(refresh_secs)),
            fallback_data_path: text("FALLBACK_DATA_PATH").map(PathBuf::from),
        }
    }

    pub fn aggregate_options(&self) -> AggregateOptions {
        AggregateOptions {
            separator: self.separator,
            rate_policy: self.rate_policy,
        }
    }
}

fn parsed<T>(text: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: FromStr,
    T::Err: Display,
{
    match text(key) {
        None => default,
        Some(raw) => raw.parse().unwrap_or_else(|err| {
            warn!("ignoring invalid {key}={raw}: {err}");
            default
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(pairs: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_without_environment() {
        let config = config(&[]);
        assert_eq!(config.port, 8080);
        assert!(config.upstream_base_url.is_none());
        assert_eq!(config.fetch_timeout, Duration::from_secs(30));
        assert_eq!(config.refresh_interval, Some(Duration::from_secs(300)));
        assert_eq!(config.rate_policy, RatePolicy::PreferUpstream);
    }

    #[test]
    fn reads_overrides() {
        let config = config(&[
            ("PORT", "9090"),
            ("UPSTREAM_BASE_URL", " https://ads.example.com "),
            ("DECIMAL_SEPARATOR", "comma"),
            ("RATE_POLICY", "recompute"),
            ("REFRESH_INTERVAL_SECS", "0"),
            ("FALLBACK_DATA_PATH", "data/fixture.json"),
        ]);
        assert_eq!(config.port, 9090);
        assert_eq!(config.upstream_base_url.as_deref(), Some("https://ads.example.com"));
        assert_eq!(config.separator, DecimalSeparator::Comma);
        assert_eq!(config.rate_policy, RatePolicy::Recompute);
        assert_eq!(config.refresh_interval, None);
        assert_eq!(config.fallback_data_path, Some(PathBuf::from("data/fixture.json")));
    }

    #[test]
    fn invalid_values_fall_back_to_defaults() {
        let config = config(&[("PORT", "eighty"), ("RATE_POLICY", "guess"), ("UPSTREAM_BASE_URL", "  ")]);
        assert_eq!(config.port, 8080);
        assert_eq!(config.rate_policy, RatePolicy::PreferUpstream);
        assert!(config.upstream_base_url.is_none());
    }
}
