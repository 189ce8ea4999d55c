use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures_util::future::try_join_all;
use rdkafka::admin::{AdminClient, AdminOptions, NewTopic, TopicReplication};
use rdkafka::client::DefaultClientContext;
use rdkafka::message::{Header, OwnedHeaders};
use rdkafka::producer::{FutureProducer, FutureRecord, Producer};
use rdkafka::types::RDKafkaErrorCode;
use rdkafka::{Offset, TopicPartitionList};
use tracing::{debug, info, warn};

use crate::assignment::decode_member_assignment;
use crate::config::KafkaConfig;
use crate::error::{KafkaError, Result};
use crate::model::{
    is_internal_topic, ClusterMetadata, GroupDescription, GroupMember, GroupSummary, KafkaRecord,
    PartitionWatermarks, TopicMetadata, TopicPurge, TopicSpec,
};
use crate::{peek, purge};

type Admin = AdminClient<DefaultClientContext>;

#[derive(Default)]
struct Handles {
    admin: Option<Arc<Admin>>,
    producer: Option<FutureProducer>,
}

/// Kafka client owning one admin connection and one producer.
///
/// Both handles are created on first use and shared by every later call
/// until [`KafkaClient::disconnect`] releases them. Peek consumers are
/// per-call and never shared.
pub struct KafkaClient {
    config: KafkaConfig,
    handles: Mutex<Handles>,
}

impl std::fmt::Debug for KafkaClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let handles = self.lock();
        f.debug_struct("KafkaClient")
            .field("config", &self.config)
            .field("admin_connected", &handles.admin.is_some())
            .field("producer_connected", &handles.producer.is_some())
            .finish()
    }
}

impl KafkaClient {
    /// Build a client. No connection is made until the first call.
    pub fn new(config: KafkaConfig) -> Result<Self> {
        config.client_config()?;
        Ok(Self {
            config,
            handles: Mutex::new(Handles::default()),
        })
    }

    pub fn config(&self) -> &KafkaConfig {
        &self.config
    }

    /// Whether the admin or producer connection is currently open.
    pub fn is_connected(&self) -> bool {
        let handles = self.lock();
        handles.admin.is_some() || handles.producer.is_some()
    }

    fn lock(&self) -> MutexGuard<'_, Handles> {
        self.handles.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn admin(&self) -> Result<Arc<Admin>> {
        let mut handles = self.lock();
        if let Some(admin) = &handles.admin {
            return Ok(Arc::clone(admin));
        }
        let admin: Admin = self.config.client_config()?.create()?;
        let admin = Arc::new(admin);
        handles.admin = Some(Arc::clone(&admin));
        info!(brokers = %self.config.brokers.join(","), "kafka admin connection created");
        Ok(admin)
    }

    fn producer(&self) -> Result<FutureProducer> {
        let mut handles = self.lock();
        if let Some(producer) = &handles.producer {
            return Ok(producer.clone());
        }
        let producer: FutureProducer = self
            .config
            .client_config()?
            .set("message.timeout.ms", self.config.metadata_timeout_ms.to_string())
            .create()?;
        handles.producer = Some(producer.clone());
        info!(brokers = %self.config.brokers.join(","), "kafka producer created");
        Ok(producer)
    }

    fn admin_options(&self) -> AdminOptions {
        AdminOptions::new().request_timeout(Some(self.config.metadata_timeout()))
    }

    /// All user topics with their partition layout, in cluster enumeration
    /// order. Per-topic metadata is fetched concurrently.
    pub async fn list_topics(&self) -> Result<Vec<TopicMetadata>> {
        let admin = self.admin()?;
        let timeout = self.config.metadata_timeout();

        let names = {
            let admin = Arc::clone(&admin);
            tokio::task::spawn_blocking(move || -> Result<Vec<String>> {
                let metadata = admin.inner().fetch_metadata(None, timeout)?;
                Ok(metadata
                    .topics()
                    .iter()
                    .map(|t| t.name().to_string())
                    .filter(|name| !is_internal_topic(name))
                    .collect())
            })
            .await??
        };

        let fetches = names.into_iter().map(|name| {
            let admin = Arc::clone(&admin);
            async move {
                tokio::task::spawn_blocking(move || -> Result<TopicMetadata> {
                    let metadata = admin.inner().fetch_metadata(Some(&name), timeout)?;
                    find_topic(&metadata, &name)
                })
                .await?
            }
        });
        try_join_all(fetches).await
    }

    /// Partition layout of one topic, or [`KafkaError::TopicNotFound`].
    pub async fn topic_metadata(&self, topic: &str) -> Result<TopicMetadata> {
        let admin = self.admin()?;
        let timeout = self.config.metadata_timeout();
        let topic = topic.to_string();
        tokio::task::spawn_blocking(move || -> Result<TopicMetadata> {
            // All-topics request, so an unknown name is never auto-created.
            let metadata = admin.inner().fetch_metadata(None, timeout)?;
            find_topic(&metadata, &topic)
        })
        .await?
    }

    /// Low and high watermark of every partition of `topic`.
    pub async fn watermarks(&self, topic: &str) -> Result<Vec<PartitionWatermarks>> {
        let metadata = self.topic_metadata(topic).await?;
        self.watermarks_of(&metadata).await
    }

    /// Watermarks for the partitions of already fetched topic metadata.
    pub async fn watermarks_of(&self, metadata: &TopicMetadata) -> Result<Vec<PartitionWatermarks>> {
        let admin = self.admin()?;
        let metadata = metadata.clone();
        let timeout = self.config.metadata_timeout();
        tokio::task::spawn_blocking(move || -> Result<Vec<PartitionWatermarks>> {
            metadata
                .partitions
                .iter()
                .map(|p| -> Result<PartitionWatermarks> {
                    let (low, high) = admin
                        .inner()
                        .fetch_watermarks(&metadata.name, p.id, timeout)?;
                    Ok(PartitionWatermarks {
                        partition: p.id,
                        low,
                        high,
                    })
                })
                .collect()
        })
        .await?
    }

    pub async fn create_topic(&self, spec: &TopicSpec) -> Result<()> {
        let admin = self.admin()?;
        let mut topic = NewTopic::new(
            &spec.name,
            spec.partitions,
            TopicReplication::Fixed(spec.replication_factor),
        );
        for (key, value) in &spec.config {
            topic = topic.set(key, value);
        }
        let options = self
            .admin_options()
            .operation_timeout(Some(self.config.metadata_timeout()));
        let results = admin.create_topics([&topic], &options).await?;
        check_admin_results(results)?;
        info!(topic = %spec.name, partitions = spec.partitions, "topic created");
        Ok(())
    }

    pub async fn delete_topic(&self, topic: &str) -> Result<()> {
        let admin = self.admin()?;
        let options = self
            .admin_options()
            .operation_timeout(Some(self.config.metadata_timeout()));
        let results = admin.delete_topics(&[topic], &options).await?;
        check_admin_results(results)?;
        info!(topic = %topic, "topic deleted");
        Ok(())
    }

    /// Delete every record below each partition's current high watermark.
    ///
    /// Kafka has no purge primitive. Watermarks are read first and the
    /// deletion is issued afterwards, so records produced in between
    /// survive; the operation is not atomic across partitions.
    pub async fn purge_topic(&self, topic: &str) -> Result<TopicPurge> {
        let metadata = self.topic_metadata(topic).await?;
        let partitions = metadata.partitions.len();
        let watermarks = self.watermarks_of(&metadata).await?;

        let mut before = TopicPartitionList::new();
        let mut records_deleted = 0;
        for wm in watermarks.iter().filter(|wm| wm.retained() > 0) {
            before.add_partition_offset(topic, wm.partition, Offset::Offset(wm.high))?;
            records_deleted += wm.retained();
        }
        if before.count() == 0 {
            debug!(topic = %topic, "nothing to purge");
            return Ok(TopicPurge {
                partitions,
                records_deleted: 0,
            });
        }

        let admin = self.admin()?;
        let timeout = self.config.metadata_timeout();
        tokio::task::spawn_blocking(move || purge::delete_records(&admin, &before, timeout))
            .await??;
        info!(topic = %topic, records_deleted, "topic purged");
        Ok(TopicPurge {
            partitions,
            records_deleted,
        })
    }

    /// Read up to `count` records from the start of `topic` without
    /// committing offsets. Returns early when every partition is drained or
    /// no record arrives within the peek idle timeout.
    pub async fn peek(&self, topic: &str, count: usize) -> Result<Vec<KafkaRecord>> {
        if count == 0 {
            return Ok(Vec::new());
        }
        let metadata = self.topic_metadata(topic).await?;
        let admin = self.admin()?;
        peek::peek(
            &self.config,
            admin,
            topic,
            metadata.partitions.len(),
            count,
        )
        .await
    }

    /// Produce one record and wait for its delivery report.
    ///
    /// Returns the partition and offset the record landed on.
    pub async fn produce(
        &self,
        topic: &str,
        key: Option<&str>,
        payload: &[u8],
        headers: &[(String, String)],
    ) -> Result<(i32, i64)> {
        let producer = self.producer()?;
        let headers = headers.iter().fold(OwnedHeaders::new(), |acc, (k, v)| {
            acc.insert(Header {
                key: k.as_str(),
                value: Some(v.as_str()),
            })
        });

        let mut record = FutureRecord::<str, [u8]>::to(topic)
            .payload(payload)
            .headers(headers);
        if let Some(key) = key {
            record = record.key(key);
        }

        let (partition, offset) = producer
            .send(record, self.config.metadata_timeout())
            .await
            .map_err(|(err, _)| KafkaError::from(err))?;
        debug!(topic = %topic, partition, offset, "record delivered");
        Ok((partition, offset))
    }

    pub async fn list_groups(&self) -> Result<Vec<GroupSummary>> {
        let admin = self.admin()?;
        let timeout = self.config.metadata_timeout();
        tokio::task::spawn_blocking(move || -> Result<Vec<GroupSummary>> {
            let list = admin.inner().fetch_group_list(None, timeout)?;
            Ok(list
                .groups()
                .iter()
                .map(|g| GroupSummary {
                    group_id: g.name().to_string(),
                    state: g.state().to_string(),
                    protocol_type: g.protocol_type().to_string(),
                })
                .collect())
        })
        .await?
    }

    /// Describe one group with decoded member assignments.
    ///
    /// An unknown group, reported by the cluster as `Dead`, is a
    /// [`KafkaError::GroupNotFound`].
    pub async fn describe_group(&self, group_id: &str) -> Result<GroupDescription> {
        let admin = self.admin()?;
        let timeout = self.config.metadata_timeout();
        let group_id = group_id.to_string();
        tokio::task::spawn_blocking(move || -> Result<GroupDescription> {
            let list = admin.inner().fetch_group_list(Some(&group_id), timeout)?;
            let described = list
                .groups()
                .iter()
                .map(|group| GroupDescription {
                    group_id: group.name().to_string(),
                    state: group.state().to_string(),
                    protocol: group.protocol().to_string(),
                    protocol_type: group.protocol_type().to_string(),
                    members: group
                        .members()
                        .iter()
                        .map(|m| GroupMember {
                            member_id: m.id().to_string(),
                            client_id: m.client_id().to_string(),
                            host: m.client_host().to_string(),
                            assignments: decode_member_assignment(m.assignment()),
                        })
                        .collect(),
                })
                .collect();
            live_group(described, &group_id)
        })
        .await?
    }

    /// Broker list and topic counts; doubles as the connectivity probe.
    pub async fn cluster(&self) -> Result<ClusterMetadata> {
        let admin = self.admin()?;
        let timeout = self.config.metadata_timeout();
        tokio::task::spawn_blocking(move || -> Result<ClusterMetadata> {
            let metadata = admin.inner().fetch_metadata(None, timeout)?;
            let cluster_id = admin.inner().fetch_cluster_id(timeout);
            Ok(ClusterMetadata::from_rdkafka(&metadata, cluster_id))
        })
        .await?
    }

    /// Release the admin and producer connections.
    ///
    /// Pending deliveries are flushed first. Failures are logged and never
    /// returned; calling this again, or before any connection exists, is a
    /// no-op.
    pub async fn disconnect(&self) {
        let (admin, producer) = {
            let mut handles = self.lock();
            (handles.admin.take(), handles.producer.take())
        };

        if let Some(producer) = producer {
            let timeout = self.config.metadata_timeout();
            match tokio::task::spawn_blocking(move || producer.flush(timeout)).await {
                Ok(Ok(())) => debug!("kafka producer flushed"),
                Ok(Err(err)) => warn!(error = %err, "failed to flush kafka producer"),
                Err(err) => warn!(error = %err, "failed to flush kafka producer"),
            }
        }
        if let Some(admin) = admin {
            // The admin client's polling thread is joined on drop.
            if let Err(err) = tokio::task::spawn_blocking(move || drop(admin)).await {
                warn!(error = %err, "failed to close kafka admin connection");
            }
        }
    }
}

fn find_topic(metadata: &rdkafka::metadata::Metadata, name: &str) -> Result<TopicMetadata> {
    let topic = metadata
        .topics()
        .iter()
        .find(|t| t.name() == name)
        .ok_or_else(|| KafkaError::TopicNotFound(name.to_string()))?;
    match topic.error() {
        None => Ok(TopicMetadata::from_rdkafka(topic)),
        Some(err) => {
            let code = RDKafkaErrorCode::from(err);
            if code == RDKafkaErrorCode::UnknownTopicOrPartition {
                Err(KafkaError::TopicNotFound(name.to_string()))
            } else {
                Err(KafkaError::Admin {
                    name: name.to_string(),
                    code: code.to_string(),
                })
            }
        }
    }
}

/// The described group named `group_id`, unless the cluster reports it
/// `Dead` or left it out.
fn live_group(groups: Vec<GroupDescription>, group_id: &str) -> Result<GroupDescription> {
    groups
        .into_iter()
        .find(|g| g.group_id == group_id)
        .filter(|g| g.state != "Dead")
        .ok_or_else(|| KafkaError::GroupNotFound(group_id.to_string()))
}

fn check_admin_results(
    results: Vec<std::result::Result<String, (String, RDKafkaErrorCode)>>,
) -> Result<()> {
    for result in results {
        if let Err((name, code)) = result {
            return Err(KafkaError::Admin {
                name,
                code: code.to_string(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_rejects_empty_broker_list() {
        let err = KafkaClient::new(KafkaConfig::new(Vec::new())).unwrap_err();
        assert!(matches!(err, KafkaError::Config(_)));
    }

    #[test]
    fn construction_is_lazy() {
        let client = KafkaClient::new(KafkaConfig::new(vec!["127.0.0.1:1".to_string()])).unwrap();
        assert!(!client.is_connected());
        assert!(format!("{client:?}").contains("admin_connected: false"));
    }

    #[tokio::test]
    async fn disconnect_without_connections_is_noop() {
        let client = KafkaClient::new(KafkaConfig::new(vec!["127.0.0.1:1".to_string()])).unwrap();
        client.disconnect().await;
        client.disconnect().await;
        assert!(!client.is_connected());
    }

    #[test]
    fn admin_rejections_carry_item_name() {
        let err = check_admin_results(vec![
            Ok("a".to_string()),
            Err(("b".to_string(), RDKafkaErrorCode::TopicAlreadyExists)),
        ])
        .unwrap_err();
        match err {
            KafkaError::Admin { name, .. } => assert_eq!(name, "b"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    fn group(group_id: &str, state: &str) -> GroupDescription {
        GroupDescription {
            group_id: group_id.to_string(),
            state: state.to_string(),
            protocol: "range".to_string(),
            protocol_type: "consumer".to_string(),
            members: Vec::new(),
        }
    }

    #[test]
    fn dead_group_is_not_found() {
        let err = live_group(vec![group("billing", "Dead")], "billing").unwrap_err();
        assert!(matches!(err, KafkaError::GroupNotFound(ref g) if g == "billing"));
    }

    #[test]
    fn absent_group_is_not_found() {
        let err = live_group(vec![group("other", "Stable")], "billing").unwrap_err();
        assert!(matches!(err, KafkaError::GroupNotFound(_)));
        assert!(matches!(
            live_group(Vec::new(), "billing"),
            Err(KafkaError::GroupNotFound(_))
        ));
    }

    #[test]
    fn live_group_is_selected_by_name() {
        let found = live_group(
            vec![group("other", "Stable"), group("billing", "Empty")],
            "billing",
        )
        .unwrap();
        assert_eq!(found.group_id, "billing");
        assert_eq!(found.state, "Empty");
    }

    #[test]
    fn peek_of_zero_records_makes_no_connection() {
        let client = KafkaClient::new(KafkaConfig::new(vec!["127.0.0.1:1".to_string()])).unwrap();
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let records = rt.block_on(client.peek("orders", 0)).unwrap();
        assert!(records.is_empty());
        assert!(!client.is_connected());
    }
}
