use std::fmt;
use std::time::Duration;

use rdkafka::ClientConfig;
use serde::Deserialize;

use crate::error::{KafkaError, Result};

/// Default `client.id` when none is configured.
pub const DEFAULT_CLIENT_ID: &str = "brokerlens";

/// Connection settings for a Kafka cluster.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KafkaConfig {
    /// Bootstrap servers, `host:port`.
    pub brokers: Vec<String>,
    #[serde(default, alias = "client_id")]
    pub client_id: Option<String>,
    #[serde(default)]
    pub sasl: Option<KafkaSaslConfig>,
    /// Use TLS towards the brokers.
    #[serde(default)]
    pub ssl: bool,
    /// Timeout for metadata, watermark and group-list requests.
    #[serde(default = "default_metadata_timeout_ms", alias = "metadata_timeout_ms")]
    pub metadata_timeout_ms: u64,
    /// How long a peek waits for the next record before treating the
    /// stream as ended.
    #[serde(default = "default_peek_idle_timeout_ms", alias = "peek_idle_timeout_ms")]
    pub peek_idle_timeout_ms: u64,
    /// How long a peek waits for its transient group to be assigned
    /// partitions. The idle window only starts once it is.
    #[serde(default = "default_peek_join_timeout_ms", alias = "peek_join_timeout_ms")]
    pub peek_join_timeout_ms: u64,
    /// Delete the transient peek group once the peek is done.
    #[serde(default = "default_true", alias = "delete_peek_groups")]
    pub delete_peek_groups: bool,
}

/// SASL credentials.
#[derive(Clone, Deserialize)]
pub struct KafkaSaslConfig {
    pub mechanism: SaslMechanism,
    pub username: String,
    pub password: String,
}

impl fmt::Debug for KafkaSaslConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KafkaSaslConfig")
            .field("mechanism", &self.mechanism)
            .field("username", &self.username)
            .field(
                "password",
                &format_args!("<redacted:{} bytes>", self.password.len()),
            )
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum SaslMechanism {
    #[serde(rename = "plain", alias = "PLAIN")]
    Plain,
    #[serde(rename = "scram-sha-256", alias = "SCRAM-SHA-256")]
    ScramSha256,
    #[serde(rename = "scram-sha-512", alias = "SCRAM-SHA-512")]
    ScramSha512,
}

impl SaslMechanism {
    /// Value for librdkafka's `sasl.mechanisms`.
    pub fn as_rdkafka(self) -> &'static str {
        match self {
            SaslMechanism::Plain => "PLAIN",
            SaslMechanism::ScramSha256 => "SCRAM-SHA-256",
            SaslMechanism::ScramSha512 => "SCRAM-SHA-512",
        }
    }
}

impl std::str::FromStr for SaslMechanism {
    type Err = KafkaError;

    fn from_str(value: &str) -> Result<Self> {
        match value.to_ascii_lowercase().as_str() {
            "plain" => Ok(SaslMechanism::Plain),
            "scram-sha-256" => Ok(SaslMechanism::ScramSha256),
            "scram-sha-512" => Ok(SaslMechanism::ScramSha512),
            other => Err(KafkaError::Config(format!(
                "unsupported SASL mechanism: {other}"
            ))),
        }
    }
}

impl KafkaConfig {
    /// Config with defaults for everything but the bootstrap servers.
    pub fn new(brokers: Vec<String>) -> Self {
        Self {
            brokers,
            client_id: None,
            sasl: None,
            ssl: false,
            metadata_timeout_ms: default_metadata_timeout_ms(),
            peek_idle_timeout_ms: default_peek_idle_timeout_ms(),
            peek_join_timeout_ms: default_peek_join_timeout_ms(),
            delete_peek_groups: true,
        }
    }

    pub fn client_id(&self) -> &str {
        self.client_id.as_deref().unwrap_or(DEFAULT_CLIENT_ID)
    }

    pub fn metadata_timeout(&self) -> Duration {
        Duration::from_millis(self.metadata_timeout_ms)
    }

    pub fn peek_idle_timeout(&self) -> Duration {
        Duration::from_millis(self.peek_idle_timeout_ms)
    }

    pub fn peek_join_timeout(&self) -> Duration {
        Duration::from_millis(self.peek_join_timeout_ms)
    }

    /// Value for librdkafka's `security.protocol`.
    pub fn security_protocol(&self) -> &'static str {
        match (self.sasl.is_some(), self.ssl) {
            (true, true) => "SASL_SSL",
            (true, false) => "SASL_PLAINTEXT",
            (false, true) => "SSL",
            (false, false) => "PLAINTEXT",
        }
    }

    /// Base rdkafka configuration shared by admin, producer and consumers.
    pub fn client_config(&self) -> Result<ClientConfig> {
        let brokers: Vec<&str> = self
            .brokers
            .iter()
            .map(|b| b.trim())
            .filter(|b| !b.is_empty())
            .collect();
        if brokers.is_empty() {
            return Err(KafkaError::Config(
                "at least one broker address is required".to_string(),
            ));
        }

        let mut config = ClientConfig::new();
        config
            .set("bootstrap.servers", brokers.join(","))
            .set("client.id", self.client_id())
            .set("security.protocol", self.security_protocol());

        if let Some(sasl) = &self.sasl {
            config
                .set("sasl.mechanisms", sasl.mechanism.as_rdkafka())
                .set("sasl.username", &sasl.username)
                .set("sasl.password", &sasl.password);
        }

        Ok(config)
    }
}

fn default_metadata_timeout_ms() -> u64 {
    10_000
}

fn default_peek_idle_timeout_ms() -> u64 {
    5_000
}

fn default_peek_join_timeout_ms() -> u64 {
    15_000
}

fn default_true() -> bool {
    true
}
