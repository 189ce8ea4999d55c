//! Broker-agnostic vocabulary shared by every adapter.
//!
//! Anything broker-specific travels in a `metadata` map whose shape callers
//! must not rely on.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub use brokerlens_kafka::TopicPartitionAssignment;

/// Summary of a queue (RabbitMQ) or topic (Kafka).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueueInfo {
    pub name: String,
    /// Always `None` for Kafka, which has no notion of ready messages.
    pub messages_ready: Option<u64>,
    /// Always `None` for Kafka.
    pub messages_unacknowledged: Option<u64>,
    pub consumers: Option<u64>,
    pub state: String,
    pub metadata: Map<String, Value>,
}

/// Settings for a queue or topic to be created. Fields a broker has no use
/// for are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueOptions {
    pub durable: bool,
    pub auto_delete: bool,
    /// Kafka partition count, default 1.
    pub partitions: Option<i32>,
    /// Kafka replication factor, default 1.
    pub replication_factor: Option<i32>,
    /// RabbitMQ queue arguments or Kafka topic configs.
    pub arguments: Map<String, Value>,
}

impl Default for QueueOptions {
    fn default() -> Self {
        Self {
            durable: true,
            auto_delete: false,
            partitions: None,
            replication_factor: None,
            arguments: Map::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayloadEncoding {
    String,
    Base64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MessageProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    /// Declared message type; selects the validation schema.
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub message_type: Option<String>,
    /// Seconds since the epoch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub headers: Map<String, Value>,
}

/// A message read without being consumed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Message {
    /// The payload as text, or base64 when `payload_encoding` says so.
    pub payload: String,
    pub payload_encoding: PayloadEncoding,
    pub properties: MessageProperties,
    pub metadata: Map<String, Value>,
}

/// What to publish and where.
///
/// `destination` is an exchange for RabbitMQ (empty for the default
/// exchange) and a topic for Kafka. `routing_key` doubles as the Kafka
/// record key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishParams {
    #[serde(alias = "exchange", alias = "topic")]
    pub destination: String,
    #[serde(default)]
    pub routing_key: String,
    pub payload: String,
    #[serde(default)]
    pub message_type: Option<String>,
    #[serde(default)]
    pub correlation_id: Option<String>,
    #[serde(default)]
    pub headers: Option<Map<String, Value>>,
    /// Validate against the `message_type` schema before sending.
    #[serde(default)]
    pub validate: bool,
    /// RabbitMQ vhost; ignored by Kafka.
    #[serde(default = "default_scope", alias = "vhost")]
    pub scope: String,
}

fn default_scope() -> String {
    "/".to_string()
}

impl PublishParams {
    pub fn new(destination: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            destination: destination.into(),
            routing_key: String::new(),
            payload: payload.into(),
            message_type: None,
            correlation_id: None,
            headers: None,
            validate: false,
            scope: default_scope(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PublishResult {
    pub published: bool,
    /// False when the broker accepted the message but no destination
    /// matched it.
    pub routed: bool,
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PurgeResult {
    pub messages_purged: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthStatus {
    pub healthy: bool,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl HealthStatus {
    pub fn unreachable(message: impl Into<String>) -> Self {
        Self {
            healthy: false,
            status: "unreachable".to_string(),
            message: Some(message.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Overview {
    pub broker: String,
    pub version: Option<String>,
    pub cluster_name: Option<String>,
    pub queue_count: u64,
    pub consumer_count: Option<u64>,
    pub connection_count: Option<u64>,
    pub message_count: Option<u64>,
    pub metadata: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConsumerInfo {
    pub consumer_id: String,
    /// Queue name, or the comma-separated assigned topics for Kafka.
    pub queue: Option<String>,
    /// Kafka consumer group.
    pub group: Option<String>,
    pub client: Option<String>,
    pub host: Option<String>,
    pub metadata: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConnectionInfo {
    pub name: String,
    pub user: Option<String>,
    pub vhost: Option<String>,
    pub state: Option<String>,
    pub protocol: Option<String>,
    pub peer_host: Option<String>,
    pub peer_port: Option<u16>,
    pub channels: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExchangeInfo {
    pub name: String,
    pub kind: String,
    pub durable: bool,
    pub auto_delete: bool,
    pub metadata: Map<String, Value>,
}

/// Settings for an exchange to be created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeOptions {
    #[serde(alias = "type")]
    pub kind: String,
    #[serde(default = "default_true")]
    pub durable: bool,
    #[serde(default)]
    pub auto_delete: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BindingInfo {
    pub source: String,
    pub destination: String,
    pub destination_type: String,
    pub routing_key: String,
    pub metadata: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConsumerGroupSummary {
    pub group_id: String,
    pub state: String,
    pub protocol_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConsumerGroupMember {
    pub member_id: String,
    pub client_id: String,
    pub host: String,
    pub assignments: Vec<TopicPartitionAssignment>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConsumerGroupInfo {
    pub group_id: String,
    pub state: String,
    pub protocol: String,
    pub members: Vec<ConsumerGroupMember>,
}
