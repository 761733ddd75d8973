//! Pipeline and transport configuration types.

use std::time::Duration;

use serde::Deserialize;

use crate::middleware::LogLevel;

/// Which optional stages a pipeline includes.
///
/// The charset stage is always present.
///
/// # Example
///
/// ```
/// use wirekit::config::PipelineConfig;
///
/// let config: PipelineConfig = serde_json::from_str(r#"{"logging": true}"#).expect("config");
/// assert!(config.logging);
/// assert!(config.content_decoding);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Decode compressed response bodies.
    pub content_decoding: bool,
    /// Persist cookies across calls.
    pub cookie_support: bool,
    /// Log requests and responses.
    pub logging: bool,
    /// Level for the logging stage; `None` means [`LogLevel::Debug`].
    pub log_level: Option<LogLevel>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            content_decoding: true,
            cookie_support: true,
            logging: false,
            log_level: None,
        }
    }
}

impl PipelineConfig {
    /// Create a new configuration builder.
    #[must_use]
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::default()
    }

    /// Level the logging stage runs at.
    #[must_use]
    pub fn effective_log_level(&self) -> LogLevel {
        self.log_level.unwrap_or_default()
    }
}

/// Builder for [`PipelineConfig`].
#[derive(Debug, Clone, Default)]
pub struct PipelineConfigBuilder {
    content_decoding: Option<bool>,
    cookie_support: Option<bool>,
    logging: Option<bool>,
    log_level: Option<LogLevel>,
}

impl PipelineConfigBuilder {
    /// Enable or disable response decoding.
    #[must_use]
    pub const fn content_decoding(mut self, enabled: bool) -> Self {
        self.content_decoding = Some(enabled);
        self
    }

    /// Enable or disable cookie persistence.
    #[must_use]
    pub const fn cookie_support(mut self, enabled: bool) -> Self {
        self.cookie_support = Some(enabled);
        self
    }

    /// Enable or disable request/response logging.
    #[must_use]
    pub const fn logging(mut self, enabled: bool) -> Self {
        self.logging = Some(enabled);
        self
    }

    /// Set the logging level.
    #[must_use]
    pub const fn log_level(mut self, level: LogLevel) -> Self {
        self.log_level = Some(level);
        self
    }

    /// Build the configuration.
    #[must_use]
    pub fn build(self) -> PipelineConfig {
        let defaults = PipelineConfig::default();
        PipelineConfig {
            content_decoding: self.content_decoding.unwrap_or(defaults.content_decoding),
            cookie_support: self.cookie_support.unwrap_or(defaults.cookie_support),
            logging: self.logging.unwrap_or(defaults.logging),
            log_level: self.log_level.or(defaults.log_level),
        }
    }
}

/// Configuration for the outbound HTTP transport.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Timeout for a whole exchange.
    pub timeout: Duration,
    /// Connection timeout duration.
    pub connect_timeout: Duration,
    /// Maximum idle connections per host.
    pub pool_idle_per_host: usize,
    /// Idle connection timeout.
    pub pool_idle_timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            pool_idle_per_host: 32,
            pool_idle_timeout: Duration::from_secs(90),
        }
    }
}

impl TransportConfig {
    /// Create a new configuration builder.
    #[must_use]
    pub fn builder() -> TransportConfigBuilder {
        TransportConfigBuilder::default()
    }
}

/// Builder for [`TransportConfig`].
#[derive(Debug, Clone, Default)]
pub struct TransportConfigBuilder {
    timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
    pool_idle_per_host: Option<usize>,
    pool_idle_timeout: Option<Duration>,
}

impl TransportConfigBuilder {
    /// Set the exchange timeout.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the connection timeout.
    #[must_use]
    pub const fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Set the maximum idle connections per host.
    #[must_use]
    pub const fn pool_idle_per_host(mut self, count: usize) -> Self {
        self.pool_idle_per_host = Some(count);
        self
    }

    /// Set the idle connection timeout.
    #[must_use]
    pub const fn pool_idle_timeout(mut self, timeout: Duration) -> Self {
        self.pool_idle_timeout = Some(timeout);
        self
    }

    /// Build the configuration.
    #[must_use]
    pub fn build(self) -> TransportConfig {
        let defaults = TransportConfig::default();
        TransportConfig {
            timeout: self.timeout.unwrap_or(defaults.timeout),
            connect_timeout: self.connect_timeout.unwrap_or(defaults.connect_timeout),
            pool_idle_per_host: self
                .pool_idle_per_host
                .unwrap_or(defaults.pool_idle_per_host),
            pool_idle_timeout: self.pool_idle_timeout.unwrap_or(defaults.pool_idle_timeout),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_pipeline_config() {
        let config = PipelineConfig::default();
        assert!(config.content_decoding);
        assert!(config.cookie_support);
        assert!(!config.logging);
        assert_eq!(config.effective_log_level(), LogLevel::Debug);
    }

    #[test]
    fn pipeline_builder_overrides() {
        let config = PipelineConfig::builder()
            .cookie_support(false)
            .logging(true)
            .log_level(LogLevel::Info)
            .build();

        assert!(config.content_decoding);
        assert!(!config.cookie_support);
        assert!(config.logging);
        assert_eq!(config.effective_log_level(), LogLevel::Info);
    }

    #[test]
    fn pipeline_config_deserializes_with_defaults() {
        let config: PipelineConfig =
            serde_json::from_str(r#"{"content_decoding": false, "log_level": "warning"}"#)
                .expect("config");

        assert!(!config.content_decoding);
        assert!(config.cookie_support);
        assert_eq!(config.log_level, Some(LogLevel::Warn));

        let err = serde_json::from_str::<PipelineConfig>(r#"{"log_level": "loud"}"#);
        assert!(err.is_err());
    }

    #[test]
    fn default_transport_config() {
        let config = TransportConfig::default();
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
        assert_eq!(config.pool_idle_per_host, 32);
    }

    #[test]
    fn transport_builder_overrides() {
        let config = TransportConfig::builder()
            .timeout(Duration::from_secs(60))
            .connect_timeout(Duration::from_secs(5))
            .pool_idle_per_host(16)
            .build();

        assert_eq!(config.timeout, Duration::from_secs(60));
        assert_eq!(config.connect_timeout, Duration::from_secs(5));
        assert_eq!(config.pool_idle_per_host, 16);
    }
}
