//! Owned snapshots of cluster state returned by [`crate::KafkaClient`].

use std::collections::BTreeMap;

use rdkafka::message::{Headers, Message};
use rdkafka::metadata::{Metadata, MetadataTopic};

use crate::assignment::TopicPartitionAssignment;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerNode {
    pub id: i32,
    pub host: String,
    pub port: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionMetadata {
    pub id: i32,
    pub leader: i32,
    pub replicas: Vec<i32>,
    pub isr: Vec<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicMetadata {
    pub name: String,
    pub partitions: Vec<PartitionMetadata>,
}

impl TopicMetadata {
    pub(crate) fn from_rdkafka(topic: &MetadataTopic) -> Self {
        Self {
            name: topic.name().to_string(),
            partitions: topic
                .partitions()
                .iter()
                .map(|p| PartitionMetadata {
                    id: p.id(),
                    leader: p.leader(),
                    replicas: p.replicas().to_vec(),
                    isr: p.isr().to_vec(),
                })
                .collect(),
        }
    }

    pub fn partition_ids(&self) -> Vec<i32> {
        self.partitions.iter().map(|p| p.id).collect()
    }
}

/// Low and high watermark of one partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartitionWatermarks {
    pub partition: i32,
    pub low: i64,
    pub high: i64,
}

impl PartitionWatermarks {
    /// Records currently retained in the partition.
    pub fn retained(&self) -> i64 {
        (self.high - self.low).max(0)
    }
}

/// Cluster-wide snapshot for overview reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterMetadata {
    pub cluster_id: Option<String>,
    /// Broker that answered the metadata request.
    pub origin_broker_id: i32,
    pub brokers: Vec<BrokerNode>,
    pub topic_count: usize,
    pub partition_count: usize,
}

impl ClusterMetadata {
    pub(crate) fn from_rdkafka(metadata: &Metadata, cluster_id: Option<String>) -> Self {
        let user_topics: Vec<&MetadataTopic> = metadata
            .topics()
            .iter()
            .filter(|t| !is_internal_topic(t.name()))
            .collect();
        Self {
            cluster_id,
            origin_broker_id: metadata.orig_broker_id(),
            brokers: metadata
                .brokers()
                .iter()
                .map(|b| BrokerNode {
                    id: b.id(),
                    host: b.host().to_string(),
                    port: b.port(),
                })
                .collect(),
            topic_count: user_topics.len(),
            partition_count: user_topics.iter().map(|t| t.partitions().len()).sum(),
        }
    }
}

/// Settings for a topic to be created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicSpec {
    pub name: String,
    pub partitions: i32,
    pub replication_factor: i32,
    pub config: BTreeMap<String, String>,
}

impl TopicSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            partitions: 1,
            replication_factor: 1,
            config: BTreeMap::new(),
        }
    }
}

/// Outcome of a derived purge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TopicPurge {
    pub partitions: usize,
    pub records_deleted: i64,
}

/// A record read by a peek, detached from the consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KafkaRecord {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
    pub key: Option<Vec<u8>>,
    pub payload: Option<Vec<u8>>,
    /// Milliseconds since the epoch.
    pub timestamp: Option<i64>,
    pub headers: Vec<(String, Option<Vec<u8>>)>,
}

impl KafkaRecord {
    pub(crate) fn from_message<M: Message>(message: &M) -> Self {
        let headers = message
            .headers()
            .map(|headers| {
                headers
                    .iter()
                    .map(|h| (h.key.to_string(), h.value.map(<[u8]>::to_vec)))
                    .collect()
            })
            .unwrap_or_default();
        Self {
            topic: message.topic().to_string(),
            partition: message.partition(),
            offset: message.offset(),
            key: message.key().map(<[u8]>::to_vec),
            payload: message.payload().map(<[u8]>::to_vec),
            timestamp: message.timestamp().to_millis(),
            headers,
        }
    }

    /// Value of the first header named `key`, if it is valid UTF-8.
    pub fn header_str(&self, key: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k == key)
            .and_then(|(_, v)| v.as_deref())
            .and_then(|v| std::str::from_utf8(v).ok())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupSummary {
    pub group_id: String,
    pub state: String,
    pub protocol_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupMember {
    pub member_id: String,
    pub client_id: String,
    pub host: String,
    pub assignments: Vec<TopicPartitionAssignment>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupDescription {
    pub group_id: String,
    pub state: String,
    pub protocol: String,
    pub protocol_type: String,
    pub members: Vec<GroupMember>,
}

/// Topics whose names start with `__` belong to the cluster itself.
pub fn is_internal_topic(name: &str) -> bool {
    name.starts_with("__")
}
