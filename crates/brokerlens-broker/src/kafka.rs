use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use brokerlens_kafka::{
    GroupDescription, KafkaClient, KafkaConfig, KafkaError, KafkaRecord, PartitionWatermarks,
    TopicMetadata, TopicSpec,
};
use serde_json::{json, Map, Value};
use tracing::debug;

use crate::adapter::BrokerAdapter;
use crate::capability::{ConsumerGroupsCapability, ConsumersCapability, OverviewCapability};
use crate::error::Result;
use crate::types::{
    ConsumerGroupInfo, ConsumerGroupMember, ConsumerGroupSummary, ConsumerInfo, HealthStatus,
    Message, MessageProperties, Overview, PayloadEncoding, PublishParams, PublishResult,
    PurgeResult, QueueInfo, QueueOptions,
};

/// Record headers that map onto message properties.
const TYPE_HEADER: &str = "type";
const CORRELATION_ID_HEADER: &str = "correlation_id";
const MESSAGE_ID_HEADER: &str = "message_id";
const CONTENT_TYPE_HEADER: &str = "content_type";

/// Adapter over a Kafka cluster.
///
/// Topics stand in for queues. Kafka offers no way to list client
/// connections, so the connections capability is absent.
#[derive(Debug)]
pub struct KafkaAdapter {
    client: KafkaClient,
}

impl KafkaAdapter {
    /// Build the adapter. Connections are opened on first use.
    pub fn new(config: KafkaConfig) -> Result<Self> {
        Ok(Self {
            client: KafkaClient::new(config)?,
        })
    }

    pub fn client(&self) -> &KafkaClient {
        &self.client
    }
}

#[async_trait]
impl BrokerAdapter for KafkaAdapter {
    fn broker_name(&self) -> &'static str {
        "kafka"
    }

    async fn list_queues(&self, _vhost: &str) -> Result<Vec<QueueInfo>> {
        let topics = self.client.list_topics().await?;
        Ok(topics.iter().map(|t| topic_info(t, None)).collect())
    }

    async fn get_queue(&self, _vhost: &str, name: &str) -> Result<QueueInfo> {
        let metadata = self.client.topic_metadata(name).await?;
        let watermarks = self.client.watermarks_of(&metadata).await?;
        Ok(topic_info(&metadata, Some(watermarks.as_slice())))
    }

    async fn create_queue(&self, _vhost: &str, name: &str, options: &QueueOptions) -> Result<()> {
        let mut spec = TopicSpec::new(name);
        if let Some(partitions) = options.partitions {
            spec.partitions = partitions;
        }
        if let Some(replication_factor) = options.replication_factor {
            spec.replication_factor = replication_factor;
        }
        for (key, value) in &options.arguments {
            spec.config.insert(key.clone(), value_to_string(value));
        }
        self.client.create_topic(&spec).await?;
        Ok(())
    }

    async fn delete_queue(&self, _vhost: &str, name: &str) -> Result<()> {
        self.client.delete_topic(name).await?;
        Ok(())
    }

    async fn purge_queue(&self, _vhost: &str, name: &str) -> Result<PurgeResult> {
        let purge = self.client.purge_topic(name).await?;
        Ok(PurgeResult {
            messages_purged: u64::try_from(purge.records_deleted).unwrap_or(0),
        })
    }

    async fn peek_messages(&self, _vhost: &str, name: &str, count: usize) -> Result<Vec<Message>> {
        let records = self.client.peek(name, count).await?;
        Ok(records.iter().map(record_message).collect())
    }

    async fn publish(&self, params: &PublishParams) -> Result<PublishResult> {
        let headers = record_headers(params);
        let key = Some(params.routing_key.as_str()).filter(|k| !k.is_empty());
        let (partition, offset) = self
            .client
            .produce(&params.destination, key, params.payload.as_bytes(), &headers)
            .await?;

        let mut metadata = Map::new();
        metadata.insert("partition".into(), json!(partition));
        metadata.insert("offset".into(), json!(offset));
        Ok(PublishResult {
            published: true,
            routed: true,
            metadata,
        })
    }

    async fn check_health(&self) -> Result<HealthStatus> {
        let cluster = self.client.cluster().await?;
        debug!(brokers = cluster.brokers.len(), "kafka metadata reachable");
        Ok(HealthStatus {
            healthy: !cluster.brokers.is_empty(),
            status: if cluster.brokers.is_empty() {
                "degraded".to_string()
            } else {
                "ok".to_string()
            },
            message: Some(format!("{} broker(s) reachable", cluster.brokers.len())),
        })
    }

    async fn disconnect(&self) {
        self.client.disconnect().await;
    }

    fn overview(&self) -> Option<&dyn OverviewCapability> {
        Some(self)
    }

    fn consumers(&self) -> Option<&dyn ConsumersCapability> {
        Some(self)
    }

    fn consumer_groups(&self) -> Option<&dyn ConsumerGroupsCapability> {
        Some(self)
    }
}

#[async_trait]
impl OverviewCapability for KafkaAdapter {
    async fn get_overview(&self) -> Result<Overview> {
        let cluster = self.client.cluster().await?;
        let brokers: Vec<Value> = cluster
            .brokers
            .iter()
            .map(|b| json!({"id": b.id, "host": b.host, "port": b.port}))
            .collect();
        let mut metadata = Map::new();
        metadata.insert("brokers".into(), Value::Array(brokers));
        metadata.insert("origin_broker_id".into(), json!(cluster.origin_broker_id));
        metadata.insert("partition_count".into(), json!(cluster.partition_count));
        Ok(Overview {
            broker: "kafka".to_string(),
            version: None,
            cluster_name: cluster.cluster_id,
            queue_count: cluster.topic_count as u64,
            consumer_count: None,
            connection_count: None,
            message_count: None,
            metadata,
        })
    }
}

#[async_trait]
impl ConsumersCapability for KafkaAdapter {
    /// Members of every consumer group, one entry per member.
    async fn list_consumers(&self, _vhost: &str) -> Result<Vec<ConsumerInfo>> {
        let mut consumers = Vec::new();
        for group in self.client.list_groups().await? {
            let description = match self.client.describe_group(&group.group_id).await {
                Ok(description) => description,
                // The group emptied out between the two calls.
                Err(KafkaError::GroupNotFound(_)) => continue,
                Err(err) => return Err(err.into()),
            };
            consumers.extend(group_consumers(&description));
        }
        Ok(consumers)
    }
}

#[async_trait]
impl ConsumerGroupsCapability for KafkaAdapter {
    async fn list_consumer_groups(&self) -> Result<Vec<ConsumerGroupSummary>> {
        let groups = self.client.list_groups().await?;
        Ok(groups
            .into_iter()
            .map(|g| ConsumerGroupSummary {
                group_id: g.group_id,
                state: g.state,
                protocol_type: g.protocol_type,
            })
            .collect())
    }

    async fn describe_consumer_group(&self, group_id: &str) -> Result<ConsumerGroupInfo> {
        let description = self.client.describe_group(group_id).await?;
        Ok(ConsumerGroupInfo {
            group_id: description.group_id,
            state: description.state,
            protocol: description.protocol,
            members: description
                .members
                .into_iter()
                .map(|m| ConsumerGroupMember {
                    member_id: m.member_id,
                    client_id: m.client_id,
                    host: m.host,
                    assignments: m.assignments,
                })
                .collect(),
        })
    }
}

fn topic_info(topic: &TopicMetadata, watermarks: Option<&[PartitionWatermarks]>) -> QueueInfo {
    let mut metadata = Map::new();
    metadata.insert("partitions".into(), json!(topic.partitions.len()));
    let replication_factor = topic.partitions.first().map(|p| p.replicas.len());
    metadata.insert("replication_factor".into(), json!(replication_factor));

    if let Some(watermarks) = watermarks {
        let total: i64 = watermarks.iter().map(PartitionWatermarks::retained).sum();
        metadata.insert("messages".into(), json!(total));
        let details: Vec<Value> = topic
            .partitions
            .iter()
            .map(|p| {
                let wm = watermarks.iter().find(|w| w.partition == p.id);
                json!({
                    "id": p.id,
                    "leader": p.leader,
                    "replicas": p.replicas,
                    "isr": p.isr,
                    "low": wm.map(|w| w.low),
                    "high": wm.map(|w| w.high),
                })
            })
            .collect();
        metadata.insert("partition_details".into(), Value::Array(details));
    }

    QueueInfo {
        name: topic.name.clone(),
        messages_ready: None,
        messages_unacknowledged: None,
        consumers: None,
        state: "active".to_string(),
        metadata,
    }
}

fn record_message(record: &KafkaRecord) -> Message {
    let (payload, payload_encoding) = match record.payload.as_deref() {
        None => (String::new(), PayloadEncoding::String),
        Some(bytes) => match std::str::from_utf8(bytes) {
            Ok(text) => (text.to_string(), PayloadEncoding::String),
            Err(_) => (BASE64.encode(bytes), PayloadEncoding::Base64),
        },
    };

    let mut headers = Map::new();
    for (key, value) in &record.headers {
        let value = match value.as_deref() {
            None => Value::Null,
            Some(bytes) => match std::str::from_utf8(bytes) {
                Ok(text) => Value::String(text.to_string()),
                Err(_) => Value::String(BASE64.encode(bytes)),
            },
        };
        headers.insert(key.clone(), value);
    }

    let mut metadata = Map::new();
    metadata.insert("topic".into(), json!(record.topic));
    metadata.insert("partition".into(), json!(record.partition));
    metadata.insert("offset".into(), json!(record.offset));
    metadata.insert(
        "key".into(),
        json!(record
            .key
            .as_deref()
            .map(|k| String::from_utf8_lossy(k).into_owned())),
    );
    metadata.insert("timestamp_ms".into(), json!(record.timestamp));

    Message {
        payload,
        payload_encoding,
        properties: MessageProperties {
            correlation_id: record.header_str(CORRELATION_ID_HEADER).map(str::to_string),
            message_id: record.header_str(MESSAGE_ID_HEADER).map(str::to_string),
            message_type: record.header_str(TYPE_HEADER).map(str::to_string),
            timestamp: record.timestamp.map(|ms| ms.div_euclid(1000)),
            content_type: record.header_str(CONTENT_TYPE_HEADER).map(str::to_string),
            headers,
        },
        metadata,
    }
}

fn record_headers(params: &PublishParams) -> Vec<(String, String)> {
    let mut headers = Vec::new();
    if let Some(message_type) = &params.message_type {
        headers.push((TYPE_HEADER.to_string(), message_type.clone()));
    }
    if let Some(correlation_id) = &params.correlation_id {
        headers.push((CORRELATION_ID_HEADER.to_string(), correlation_id.clone()));
    }
    if let Some(extra) = &params.headers {
        for (key, value) in extra {
            headers.push((key.clone(), value_to_string(value)));
        }
    }
    headers
}

fn group_consumers(group: &GroupDescription) -> Vec<ConsumerInfo> {
    group
        .members
        .iter()
        .map(|member| {
            let topics: Vec<&str> = member
                .assignments
                .iter()
                .map(|a| a.topic.as_str())
                .collect();
            let mut metadata = Map::new();
            metadata.insert("state".into(), json!(group.state));
            metadata.insert("assignments".into(), json!(member.assignments));
            ConsumerInfo {
                consumer_id: member.member_id.clone(),
                queue: (!topics.is_empty()).then(|| topics.join(",")),
                group: Some(group.group_id.clone()),
                client: Some(member.client_id.clone()),
                host: Some(member.host.clone()),
                metadata,
            }
        })
        .collect()
}

/// Strings as-is; anything else as compact JSON.
fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
