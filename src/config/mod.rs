// Configuration module

use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Base address of the firewall service, e.g. `http://localhost:8080`
    pub firewall_url: String,
    pub poll_interval_ms: u64,
    pub burst_delay_ms: u64,
    /// Number of threat log entries rendered by the dashboard
    pub log_display_limit: usize,
    /// Unset means the transport's own default applies
    pub request_timeout_secs: Option<u64>,
}

impl Config {
    pub fn from_env() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::Environment::default().try_parsing(true))
            .build()?;

        config.try_deserialize()
    }

    pub fn with_firewall_url(mut self, url: impl Into<String>) -> Self {
        self.firewall_url = url.into();
        self
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn burst_delay(&self) -> Duration {
        Duration::from_millis(self.burst_delay_ms)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            firewall_url: "http://localhost:8080".to_string(),
            poll_interval_ms: 5000,
            burst_delay_ms: 50,
            log_display_limit: 20,
            request_timeout_secs: None,
        }
    }
}
