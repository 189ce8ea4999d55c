//! Management API payloads, in the shapes RabbitMQ returns them.
//!
//! Only the fields brokerlens reads are modelled; everything else the broker
//! sends is ignored during deserialization.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// `GET /api/queues/{vhost}` and `GET /api/queues/{vhost}/{name}`.
#[derive(Debug, Clone, Deserialize)]
pub struct RabbitQueue {
    pub name: String,
    pub vhost: String,
    #[serde(default)]
    pub durable: bool,
    #[serde(default)]
    pub auto_delete: bool,
    #[serde(default)]
    pub exclusive: bool,
    #[serde(default, rename = "type")]
    pub queue_type: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub node: Option<String>,
    #[serde(default)]
    pub messages: Option<u64>,
    #[serde(default)]
    pub messages_ready: Option<u64>,
    #[serde(default)]
    pub messages_unacknowledged: Option<u64>,
    #[serde(default)]
    pub consumers: Option<u64>,
    #[serde(default)]
    pub memory: Option<u64>,
    #[serde(default, deserialize_with = "object_or_empty")]
    pub arguments: Map<String, Value>,
}

/// One element of `POST /api/queues/{vhost}/{name}/get`.
#[derive(Debug, Clone, Deserialize)]
pub struct RabbitMessage {
    pub payload: String,
    /// `string` or `base64`.
    pub payload_encoding: String,
    #[serde(default)]
    pub payload_bytes: Option<u64>,
    #[serde(default)]
    pub redelivered: bool,
    #[serde(default)]
    pub exchange: String,
    #[serde(default)]
    pub routing_key: String,
    #[serde(default)]
    pub message_count: Option<u64>,
    #[serde(default, deserialize_with = "object_or_default")]
    pub properties: RabbitProperties,
}

/// AMQP basic properties.
///
/// Used both when reading peeked messages and when publishing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RabbitProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub message_type: Option<String>,
    /// Seconds since the epoch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_mode: Option<u8>,
    #[serde(
        default,
        deserialize_with = "object_or_empty",
        skip_serializing_if = "Map::is_empty"
    )]
    pub headers: Map<String, Value>,
}

/// Body of `POST /api/exchanges/{vhost}/{name}/publish`.
#[derive(Debug, Clone, Serialize)]
pub struct PublishRequest<'a> {
    pub properties: &'a RabbitProperties,
    pub routing_key: &'a str,
    pub payload: &'a str,
    pub payload_encoding: &'static str,
}

/// Response of the publish endpoint.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PublishResponse {
    pub routed: bool,
}

/// `GET /api/exchanges/{vhost}`.
#[derive(Debug, Clone, Deserialize)]
pub struct RabbitExchange {
    pub name: String,
    pub vhost: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub durable: bool,
    #[serde(default)]
    pub auto_delete: bool,
    #[serde(default)]
    pub internal: bool,
    #[serde(default, deserialize_with = "object_or_empty")]
    pub arguments: Map<String, Value>,
}

/// `GET /api/bindings/{vhost}` and `GET /api/queues/{vhost}/{name}/bindings`.
#[derive(Debug, Clone, Deserialize)]
pub struct RabbitBinding {
    pub source: String,
    pub vhost: String,
    pub destination: String,
    pub destination_type: String,
    #[serde(default)]
    pub routing_key: String,
    #[serde(default)]
    pub properties_key: Option<String>,
    #[serde(default, deserialize_with = "object_or_empty")]
    pub arguments: Map<String, Value>,
}

/// `GET /api/overview`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RabbitOverview {
    #[serde(default)]
    pub cluster_name: Option<String>,
    #[serde(default)]
    pub rabbitmq_version: Option<String>,
    #[serde(default)]
    pub erlang_version: Option<String>,
    #[serde(default)]
    pub management_version: Option<String>,
    #[serde(default)]
    pub node: Option<String>,
    #[serde(default)]
    pub object_totals: ObjectTotals,
    #[serde(default)]
    pub queue_totals: QueueTotals,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ObjectTotals {
    #[serde(default)]
    pub connections: u64,
    #[serde(default)]
    pub channels: u64,
    #[serde(default)]
    pub exchanges: u64,
    #[serde(default)]
    pub queues: u64,
    #[serde(default)]
    pub consumers: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct QueueTotals {
    #[serde(default)]
    pub messages: Option<u64>,
    #[serde(default)]
    pub messages_ready: Option<u64>,
    #[serde(default)]
    pub messages_unacknowledged: Option<u64>,
}

/// `GET /api/consumers/{vhost}`.
#[derive(Debug, Clone, Deserialize)]
pub struct RabbitConsumer {
    pub consumer_tag: String,
    pub queue: QueueRef,
    #[serde(default, deserialize_with = "object_or_default")]
    pub channel_details: ChannelDetails,
    #[serde(default)]
    pub ack_required: bool,
    #[serde(default)]
    pub exclusive: bool,
    #[serde(default)]
    pub prefetch_count: u64,
    #[serde(default)]
    pub active: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QueueRef {
    pub name: String,
    #[serde(default)]
    pub vhost: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChannelDetails {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub connection_name: Option<String>,
    #[serde(default)]
    pub peer_host: Option<String>,
    #[serde(default)]
    pub peer_port: Option<u16>,
    #[serde(default)]
    pub user: Option<String>,
}

/// `GET /api/connections`.
#[derive(Debug, Clone, Deserialize)]
pub struct RabbitConnection {
    pub name: String,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub vhost: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub channels: Option<u64>,
    #[serde(default)]
    pub protocol: Option<String>,
    #[serde(default)]
    pub peer_host: Option<String>,
    #[serde(default)]
    pub peer_port: Option<u16>,
    #[serde(default)]
    pub connected_at: Option<i64>,
}

/// `GET /api/health/checks/alarms`, for both 200 and 503 answers.
#[derive(Debug, Clone, Deserialize)]
pub struct AlarmsCheck {
    pub status: String,
    #[serde(default)]
    pub reason: Option<String>,
}

impl AlarmsCheck {
    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}

/// Outcome of `DELETE /api/queues/{vhost}/{name}/contents`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct PurgeOutcome {
    #[serde(default)]
    pub message_count: u64,
}

// The management API renders empty property and argument tables as `[]`
// instead of `{}`.
fn object_or_empty<'de, D>(deserializer: D) -> Result<Map<String, Value>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Object(map) => Ok(map),
        _ => Ok(Map::new()),
    }
}

fn object_or_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + serde::de::DeserializeOwned,
{
    match Value::deserialize(deserializer)? {
        value @ Value::Object(_) => serde_json::from_value(value).map_err(serde::de::Error::custom),
        _ => Ok(T::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_with_empty_properties_array() {
        let raw = r#"{
            "payload_bytes": 2,
            "redelivered": false,
            "exchange": "",
            "routing_key": "orders",
            "message_count": 0,
            "properties": [],
            "payload": "{}",
            "payload_encoding": "string"
        }"#;
        let msg: RabbitMessage = serde_json::from_str(raw).unwrap();
        assert!(msg.properties.message_type.is_none());
        assert!(msg.properties.headers.is_empty());
        assert_eq!(msg.routing_key, "orders");
    }

    #[test]
    fn message_properties_are_read() {
        let raw = r#"{
            "payload": "{\"orderId\":\"ORD-1\"}",
            "payload_encoding": "string",
            "exchange": "amq.topic",
            "routing_key": "test.order",
            "properties": {
                "type": "order.created",
                "correlation_id": "c-1",
                "message_id": "m-1",
                "timestamp": 1700000000,
                "content_type": "application/json",
                "headers": {"x-source": "billing"}
            }
        }"#;
        let msg: RabbitMessage = serde_json::from_str(raw).unwrap();
        assert_eq!(msg.properties.message_type.as_deref(), Some("order.created"));
        assert_eq!(msg.properties.timestamp, Some(1_700_000_000));
        assert_eq!(msg.properties.headers["x-source"], "billing");
    }

    #[test]
    fn queue_counts_may_be_absent() {
        let raw = r#"{"name":"q","vhost":"/","arguments":[]}"#;
        let queue: RabbitQueue = serde_json::from_str(raw).unwrap();
        assert_eq!(queue.messages_ready, None);
        assert!(queue.arguments.is_empty());
    }

    #[test]
    fn publish_properties_skip_empty_fields() {
        let props = RabbitProperties {
            message_type: Some("order.created".to_string()),
            ..RabbitProperties::default()
        };
        let json = serde_json::to_value(&props).unwrap();
        assert_eq!(json, serde_json::json!({"type": "order.created"}));
    }
}
