//! Configuration loading — TOML file with environment variable overrides.
//!
//! Looks for `pulsehub.toml` in the working directory. Every field has a
//! sensible default so the file is optional. Environment variables take
//! precedence over file values.

use serde::Deserialize;

use pulsehub_adapter_log_kafka::LogConfig;
use pulsehub_adapter_queue_lapin::QueueConfig;
use pulsehub_adapter_relay_redis::RelayConfig;
use pulsehub_app::engine::EngineConfig;

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// WebSocket/HTTP server settings.
    pub server: ServerConfig,
    /// Database settings.
    pub database: DatabaseConfig,
    /// Log broker settings.
    pub kafka: KafkaConfig,
    /// Queue broker settings.
    pub amqp: AmqpConfig,
    /// Relay channel settings.
    pub relay: RelaySection,
    /// Liveness supervisor settings.
    pub liveness: LivenessConfig,
    /// Automation engine settings.
    pub engine: EngineSection,
    /// Logging settings.
    pub logging: LoggingConfig,
}

/// Listener configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind to (e.g. `0.0.0.0`).
    pub host: String,
    /// TCP port.
    pub port: u16,
}

/// `SQLite` database configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// `SQLite` connection URL or file path.
    pub url: String,
}

/// Log broker (Kafka) configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct KafkaConfig {
    /// Comma-separated bootstrap servers.
    pub brokers: String,
    /// Consumer group id.
    pub group_id: String,
    /// Topics carrying domain events.
    pub topics: Vec<String>,
}

/// Queue broker (AMQP) configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct AmqpConfig {
    /// AMQP connection URL.
    pub url: String,
    /// Queue carrying device status updates.
    pub status_queue: String,
    /// Queue carrying direct automation triggers.
    pub trigger_queue: String,
    /// Queue device commands are published to.
    pub command_queue: String,
}

/// Relay channel (Redis pub/sub) configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct RelaySection {
    /// Redis connection URL.
    pub url: String,
    /// Pub/sub channel name.
    pub channel: String,
}

/// Liveness supervisor configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LivenessConfig {
    /// Seconds between probe sweeps.
    pub interval_secs: u64,
}

/// Automation engine configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct EngineSection {
    /// When set, a rule that executed within this many seconds is skipped.
    /// Unset keeps the at-least-once re-trigger behavior on redelivery.
    pub suppress_repeat_secs: Option<u64>,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

impl Config {
    /// Load configuration from `pulsehub.toml` (if present) then apply
    /// environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML file exists but is malformed.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::from_file("pulsehub.toml")?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(ConfigError::Parse),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("PULSEHUB_HOST") {
            self.server.host = val;
        }
        if let Ok(val) = std::env::var("PULSEHUB_PORT") {
            if let Ok(port) = val.parse() {
                self.server.port = port;
            }
        }
        if let Ok(val) = std::env::var("PULSEHUB_BIND") {
            if let Some((host, port)) = val.rsplit_once(':') {
                self.server.host = host.to_string();
                if let Ok(port) = port.parse() {
                    self.server.port = port;
                }
            }
        }
        if let Ok(val) = std::env::var("PULSEHUB_DATABASE_URL") {
            self.database.url = val;
        }
        if let Ok(val) = std::env::var("PULSEHUB_KAFKA_BROKERS") {
            self.kafka.brokers = val;
        }
        if let Ok(val) = std::env::var("PULSEHUB_KAFKA_GROUP") {
            self.kafka.group_id = val;
        }
        if let Ok(val) = std::env::var("PULSEHUB_AMQP_URL") {
            self.amqp.url = val;
        }
        if let Ok(val) = std::env::var("PULSEHUB_REDIS_URL") {
            self.relay.url = val;
        }
        if let Ok(val) = std::env::var("PULSEHUB_RELAY_CHANNEL") {
            self.relay.channel = val;
        }
        if let Ok(val) = std::env::var("PULSEHUB_LOG") {
            self.logging.filter = val;
        }
        if let Ok(val) = std::env::var("RUST_LOG") {
            self.logging.filter = val;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Validation("port must be non-zero".to_string()));
        }
        if self.liveness.interval_secs == 0 {
            return Err(ConfigError::Validation(
                "liveness interval must be non-zero".to_string(),
            ));
        }
        if self.kafka.topics.is_empty() {
            return Err(ConfigError::Validation(
                "at least one kafka topic is required".to_string(),
            ));
        }
        Ok(())
    }

    /// Return the `host:port` bind address.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Log broker settings in the adapter's shape.
    #[must_use]
    pub fn log_config(&self) -> LogConfig {
        LogConfig {
            brokers: self.kafka.brokers.clone(),
            group_id: self.kafka.group_id.clone(),
            topics: self.kafka.topics.clone(),
        }
    }

    /// Queue broker settings in the adapter's shape.
    #[must_use]
    pub fn queue_config(&self) -> QueueConfig {
        QueueConfig {
            url: self.amqp.url.clone(),
            status_queue: self.amqp.status_queue.clone(),
            trigger_queue: self.amqp.trigger_queue.clone(),
            command_queue: self.amqp.command_queue.clone(),
        }
    }

    /// Relay settings in the adapter's shape.
    #[must_use]
    pub fn relay_config(&self) -> RelayConfig {
        RelayConfig {
            url: self.relay.url.clone(),
            channel: self.relay.channel.clone(),
        }
    }

    /// Engine settings in the application's shape.
    #[must_use]
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            suppress_repeat: self
                .engine
                .suppress_repeat_secs
                .map(std::time::Duration::from_secs),
        }
    }

    /// Interval between liveness sweeps.
    #[must_use]
    pub fn liveness_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.liveness.interval_secs)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 4000,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite:pulsehub.db?mode=rwc".to_string(),
        }
    }
}

impl Default for KafkaConfig {
    fn default() -> Self {
        Self {
            brokers: "localhost:9092".to_string(),
            group_id: "pulsehub-notifications".to_string(),
            topics: vec![
                "device-events".to_string(),
                "sensor-events".to_string(),
                "automation-events".to_string(),
            ],
        }
    }
}

impl Default for AmqpConfig {
    fn default() -> Self {
        Self {
            url: "amqp://localhost:5672/%2f".to_string(),
            status_queue: "device-status".to_string(),
            trigger_queue: "automation-triggers".to_string(),
            command_queue: "device-commands".to_string(),
        }
    }
}

impl Default for RelaySection {
    fn default() -> Self {
        Self {
            url: "redis://localhost:6379".to_string(),
            channel: "pulsehub:notifications".to_string(),
        }
    }
}

impl Default for LivenessConfig {
    fn default() -> Self {
        Self { interval_secs: 30 }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "pulsehubd=info,pulsehub=info".to_string(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse failure.
    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
    /// File I/O failure.
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    /// Semantic validation failure.
    #[error("invalid configuration: {0}")]
    Validation(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_produce_sensible_defaults() {
        let config = Config::default();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 4000);
        assert_eq!(config.database.url, "sqlite:pulsehub.db?mode=rwc");
        assert_eq!(config.kafka.topics.len(), 3);
        assert_eq!(config.amqp.command_queue, "device-commands");
        assert_eq!(config.relay.channel, "pulsehub:notifications");
        assert_eq!(config.liveness.interval_secs, 30);
        assert!(config.engine.suppress_repeat_secs.is_none());
    }

    #[test]
    fn should_parse_minimal_toml() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.server.port, 4000);
    }

    #[test]
    fn should_parse_full_toml() {
        let toml = "
            [server]
            host = '127.0.0.1'
            port = 9090

            [database]
            url = 'sqlite:test.db'

            [kafka]
            brokers = 'kafka-1:9092,kafka-2:9092'
            group_id = 'test-group'
            topics = ['device-events']

            [amqp]
            url = 'amqp://broker:5672/%2f'
            status_queue = 'status'
            trigger_queue = 'triggers'
            command_queue = 'commands'

            [relay]
            url = 'redis://cache:6379'
            channel = 'test:notifications'

            [liveness]
            interval_secs = 10

            [engine]
            suppress_repeat_secs = 5

            [logging]
            filter = 'debug'
        ";
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.kafka.group_id, "test-group");
        assert_eq!(config.kafka.topics, vec!["device-events"]);
        assert_eq!(config.amqp.command_queue, "commands");
        assert_eq!(config.relay.channel, "test:notifications");
        assert_eq!(config.liveness.interval_secs, 10);
        assert_eq!(config.engine.suppress_repeat_secs, Some(5));
        assert_eq!(config.logging.filter, "debug");
    }

    #[test]
    fn should_parse_partial_toml_with_defaults() {
        let toml = "
            [kafka]
            brokers = 'kafka:9092'
        ";
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.kafka.brokers, "kafka:9092");
        assert_eq!(config.kafka.group_id, "pulsehub-notifications");
        assert_eq!(config.server.port, 4000);
    }

    #[test]
    fn should_return_default_when_file_not_found() {
        let config = Config::from_file("nonexistent.toml").unwrap();
        assert_eq!(config.server.port, 4000);
    }

    #[test]
    fn should_reject_zero_port() {
        let mut config = Config::default();
        config.server.port = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn should_reject_zero_liveness_interval() {
        let mut config = Config::default();
        config.liveness.interval_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn should_reject_empty_topic_list() {
        let mut config = Config::default();
        config.kafka.topics.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn should_format_bind_addr() {
        let config = Config::default();
        assert_eq!(config.bind_addr(), "0.0.0.0:4000");
    }

    #[test]
    fn should_map_engine_suppress_window_to_duration() {
        let mut config = Config::default();
        config.engine.suppress_repeat_secs = Some(5);
        assert_eq!(
            config.engine_config().suppress_repeat,
            Some(std::time::Duration::from_secs(5))
        );
    }

    #[test]
    fn should_report_parse_error_for_invalid_toml() {
        let result: Result<Config, _> = toml::from_str("invalid {{{");
        assert!(result.is_err());
    }
}
