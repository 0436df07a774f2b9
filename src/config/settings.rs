use std::env;
use std::time::Duration;

use config::{Config, ConfigBuilder, ConfigError, Environment, File};
use config::builder::DefaultState;
use serde::Deserialize;

/// Queue variables from the previous deployment, mapped onto channel
/// settings. They act as defaults: config files and `DISPATCHER_*`
/// variables take precedence.
const LEGACY_CHANNEL_VARS: [(&str, &str); 4] = [
    ("INCOMING_QUEUE", "channels.incoming"),
    ("NOTIFIER_QUEUE", "channels.notifier"),
    ("WEBMENTION_QUEUE", "channels.webmention"),
    ("WEBMENTION_TOPIC", "channels.webmention"),
];

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub redis: RedisConfig,
    #[serde(default)]
    pub channels: ChannelsConfig,
    #[serde(default)]
    pub consumer: ConsumerConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub otel: OtelConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    #[serde(default = "default_redis_url")]
    pub url: String,
    /// Approximate cap on outbound stream length (`XADD MAXLEN ~`)
    #[serde(default = "default_stream_maxlen")]
    pub stream_maxlen: usize,
    /// Initial reconnect delay in milliseconds
    #[serde(default = "default_backoff_initial_delay_ms")]
    pub backoff_initial_delay_ms: u64,
    /// Maximum reconnect delay in milliseconds
    #[serde(default = "default_backoff_max_delay_ms")]
    pub backoff_max_delay_ms: u64,
}

/// Raw channel mappings. Validated into a
/// [`ChannelMap`](super::ChannelMap) at startup.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChannelsConfig {
    pub incoming: Option<String>,
    pub notifier: Option<String>,
    pub webmention: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConsumerConfig {
    /// Consumer group reading the incoming stream
    #[serde(default = "default_group")]
    pub group: String,
    /// Consumer name within the group
    #[serde(default = "default_consumer_name")]
    pub name: String,
    /// Maximum entries read per batch
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// How long a read blocks waiting for new entries, in milliseconds
    #[serde(default = "default_block_ms")]
    pub block_ms: u64,
    /// Unacknowledged entries idle this long are redelivered, in milliseconds
    #[serde(default = "default_claim_idle_ms")]
    pub claim_idle_ms: u64,
    /// How often to look for entries to redeliver, in milliseconds
    #[serde(default = "default_claim_interval_ms")]
    pub claim_interval_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FetchConfig {
    /// Budget for fetching a document, measured from the start of the run
    #[serde(default = "default_fetch_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OtelConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_otel_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_service_name")]
    pub service_name: String,
    #[serde(default = "default_sampling_ratio")]
    pub sampling_ratio: f64,
    /// Emit logs as JSON lines instead of human-readable text
    #[serde(default)]
    pub json_logs: bool,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8082
}

fn default_redis_url() -> String {
    "redis://localhost:6379".to_string()
}

fn default_stream_maxlen() -> usize {
    10_000
}

fn default_backoff_initial_delay_ms() -> u64 {
    100
}

fn default_backoff_max_delay_ms() -> u64 {
    30_000 // 30 seconds
}

fn default_group() -> String {
    "mention-dispatcher".to_string()
}

fn default_consumer_name() -> String {
    env::var("HOSTNAME").unwrap_or_else(|_| format!("dispatcher-{}", uuid::Uuid::new_v4()))
}

fn default_batch_size() -> usize {
    10
}

fn default_block_ms() -> u64 {
    5_000
}

fn default_claim_idle_ms() -> u64 {
    60_000 // 1 minute
}

fn default_claim_interval_ms() -> u64 {
    15_000
}

fn default_fetch_timeout_ms() -> u64 {
    3_000
}

fn default_user_agent() -> String {
    "mention-dispatcher (+https://github.com/tkrehbiel/spiritriot-dispatcher-service)".to_string()
}

fn default_otel_endpoint() -> String {
    "http://localhost:4317".to_string()
}

fn default_service_name() -> String {
    "mention-dispatcher".to_string()
}

fn default_sampling_ratio() -> f64 {
    1.0
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        // Load .env file if exists
        let _ = dotenvy::dotenv();

        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let mut builder = Config::builder();
        for (var, key) in LEGACY_CHANNEL_VARS {
            if let Ok(value) = env::var(var) {
                builder = builder.set_default(key, value)?;
            }
        }

        let builder = builder
            // Load config file if exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // DISPATCHER_REDIS__URL, DISPATCHER_CHANNELS__WEBMENTION, ...
            .add_source(
                Environment::with_prefix("DISPATCHER")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        Self::from_builder(builder)
    }

    /// Build settings from an already assembled source stack.
    pub fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self, ConfigError> {
        builder.build()?.try_deserialize()
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl FetchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: default_redis_url(),
            stream_maxlen: default_stream_maxlen(),
            backoff_initial_delay_ms: default_backoff_initial_delay_ms(),
            backoff_max_delay_ms: default_backoff_max_delay_ms(),
        }
    }
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            group: default_group(),
            name: default_consumer_name(),
            batch_size: default_batch_size(),
            block_ms: default_block_ms(),
            claim_idle_ms: default_claim_idle_ms(),
            claim_interval_ms: default_claim_interval_ms(),
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_fetch_timeout_ms(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for OtelConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: default_otel_endpoint(),
            service_name: default_service_name(),
            sampling_ratio: default_sampling_ratio(),
            json_logs: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let settings = Settings::default();
        assert_eq!(settings.server.port, 8082);
        assert_eq!(settings.redis.url, "redis://localhost:6379");
        assert_eq!(settings.fetch.timeout(), Duration::from_secs(3));
        assert!(settings.fetch.user_agent.contains("mention-dispatcher"));
        assert!(settings.channels.incoming.is_none());
        assert!(!settings.otel.enabled);
    }

    #[test]
    fn test_from_builder_with_overrides() {
        let builder = Config::builder()
            .set_override("channels.incoming", "posts:incoming")
            .unwrap()
            .set_override("channels.webmention", "posts:webmention")
            .unwrap()
            .set_override("fetch.timeout_ms", 1500)
            .unwrap()
            .set_override("consumer.batch_size", 3)
            .unwrap();

        let settings = Settings::from_builder(builder).unwrap();
        assert_eq!(settings.channels.incoming.as_deref(), Some("posts:incoming"));
        assert_eq!(settings.channels.webmention.as_deref(), Some("posts:webmention"));
        assert!(settings.channels.notifier.is_none());
        assert_eq!(settings.fetch.timeout_ms, 1500);
        assert_eq!(settings.consumer.batch_size, 3);
        // Untouched sections fall back to defaults
        assert_eq!(settings.consumer.block_ms, 5_000);
        assert_eq!(settings.server_addr(), "0.0.0.0:8082");
    }
}
