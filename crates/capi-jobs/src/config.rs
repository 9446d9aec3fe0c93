//! Polling defaults and their environment overrides.

use std::time::Duration;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(300);
/// Shortest interval honoured; anything below is raised to it.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Interval between job fetches and the wall-clock budget of one `resolve` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollingConfig {
    pub interval: Duration,
    pub timeout: Duration,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            timeout: DEFAULT_POLL_TIMEOUT,
        }
    }
}

impl PollingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval.max(MIN_POLL_INTERVAL);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Reads `CF_POLL_INTERVAL_MS` and `CF_POLL_TIMEOUT_SECS`; unset or unparseable values
    /// keep the defaults, as does an interval of zero.
    pub fn from_env() -> Self {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    fn from_vars(get: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(ms) = get("CF_POLL_INTERVAL_MS")
            .and_then(|v| v.trim().parse::<u64>().ok())
            .filter(|ms| *ms > 0)
        {
            config = config.with_interval(Duration::from_millis(ms));
        }
        if let Some(secs) = get("CF_POLL_TIMEOUT_SECS").and_then(|v| v.trim().parse::<u64>().ok())
        {
            config.timeout = Duration::from_secs(secs);
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn env_overrides_and_fallbacks() {
        let vars: HashMap<&str, &str> = [
            ("CF_POLL_INTERVAL_MS", "250"),
            ("CF_POLL_TIMEOUT_SECS", "ten"),
        ]
        .into_iter()
        .collect();
        let config = PollingConfig::from_vars(|k| vars.get(k).map(|v| v.to_string()));
        assert_eq!(config.interval, Duration::from_millis(250));
        assert_eq!(config.timeout, DEFAULT_POLL_TIMEOUT);
    }

    #[test]
    fn builder_overrides_defaults() {
        let config = PollingConfig::new()
            .with_interval(Duration::from_millis(10))
            .with_timeout(Duration::from_secs(2));
        assert_eq!(config.interval, Duration::from_millis(10));
        assert_eq!(config.timeout, Duration::from_secs(2));
        assert_eq!(PollingConfig::default().interval, DEFAULT_POLL_INTERVAL);
    }

    #[test]
    fn zero_interval_never_busy_polls() {
        let vars: HashMap<&str, &str> = [("CF_POLL_INTERVAL_MS", "0")].into_iter().collect();
        let config = PollingConfig::from_vars(|k| vars.get(k).map(|v| v.to_string()));
        assert_eq!(config.interval, DEFAULT_POLL_INTERVAL);

        let vars: HashMap<&str, &str> = [("CF_POLL_INTERVAL_MS", "1")].into_iter().collect();
        let config = PollingConfig::from_vars(|k| vars.get(k).map(|v| v.to_string()));
        assert_eq!(config.interval, MIN_POLL_INTERVAL);

        let config = PollingConfig::new().with_interval(Duration::ZERO);
        assert_eq!(config.interval, MIN_POLL_INTERVAL);
    }
}
