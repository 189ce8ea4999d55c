//! Client behaviour against librdkafka's in-process mock cluster.

use std::time::Duration;

use brokerlens_kafka::{KafkaClient, KafkaConfig, KafkaError};
use rdkafka::consumer::{BaseConsumer, Consumer};
use rdkafka::mocking::MockCluster;
use rdkafka::ClientConfig;

type Cluster<'c> = MockCluster<'c, rdkafka::producer::DefaultProducerContext>;

fn config_for(cluster: &Cluster<'_>) -> KafkaConfig {
    let mut config = KafkaConfig::new(vec![cluster.bootstrap_servers()]);
    config.client_id = Some("brokerlens-test".to_string());
    config.metadata_timeout_ms = 5_000;
    config.peek_idle_timeout_ms = 10_000;
    // The mock cluster cannot delete groups.
    config.delete_peek_groups = false;
    config
}

fn client_for(cluster: &Cluster<'_>) -> KafkaClient {
    KafkaClient::new(config_for(cluster)).unwrap()
}

/// User topic names in the order the cluster enumerates them.
fn enumerated_topics(servers: String) -> Vec<String> {
    let consumer: BaseConsumer = ClientConfig::new()
        .set("bootstrap.servers", servers)
        .create()
        .unwrap();
    let metadata = consumer
        .fetch_metadata(None, Duration::from_secs(5))
        .unwrap();
    metadata
        .topics()
        .iter()
        .map(|t| t.name().to_string())
        .filter(|name| !name.starts_with("__"))
        .collect()
}

#[tokio::test(flavor = "multi_thread")]
async fn list_keeps_cluster_enumeration_order() {
    let cluster = MockCluster::new(1).unwrap();
    for name in ["zeta", "alpha", "mike", "delta", "kilo", "bravo"] {
        cluster.create_topic(name, 2, 1).unwrap();
    }
    let client = client_for(&cluster);

    let listed: Vec<String> = client
        .list_topics()
        .await
        .unwrap()
        .into_iter()
        .map(|t| t.name)
        .collect();
    let servers = cluster.bootstrap_servers();
    let expected = tokio::task::spawn_blocking(move || enumerated_topics(servers))
        .await
        .unwrap();
    assert_eq!(listed.len(), 6);
    assert_eq!(listed, expected);
    client.disconnect().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn lists_topics_with_partition_layout() {
    let cluster = MockCluster::new(1).unwrap();
    cluster.create_topic("orders", 3, 1).unwrap();
    cluster.create_topic("payments", 1, 1).unwrap();
    let client = client_for(&cluster);

    let mut topics = client.list_topics().await.unwrap();
    topics.sort_by(|a, b| a.name.cmp(&b.name));
    let summary: Vec<(String, usize)> = topics
        .iter()
        .map(|t| (t.name.clone(), t.partitions.len()))
        .collect();
    assert_eq!(
        summary,
        vec![("orders".to_string(), 3), ("payments".to_string(), 1)]
    );
    assert!(client.is_connected());

    client.disconnect().await;
    assert!(!client.is_connected());
}

#[tokio::test(flavor = "multi_thread")]
async fn unknown_topic_is_a_domain_error() {
    let cluster = MockCluster::new(1).unwrap();
    cluster.create_topic("orders", 1, 1).unwrap();
    let client = client_for(&cluster);

    let err = client.topic_metadata("missing").await.unwrap_err();
    assert!(matches!(err, KafkaError::TopicNotFound(ref t) if t == "missing"));
    client.disconnect().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn produced_records_move_the_high_watermark() {
    let cluster = MockCluster::new(1).unwrap();
    cluster.create_topic("orders", 1, 1).unwrap();
    let client = client_for(&cluster);

    for i in 0..3 {
        let payload = format!(r#"{{"orderId":"ORD-{i}"}}"#);
        let (partition, offset) = client
            .produce("orders", Some("k"), payload.as_bytes(), &[])
            .await
            .unwrap();
        assert_eq!(partition, 0);
        assert_eq!(offset, i);
    }

    let watermarks = client.watermarks("orders").await.unwrap();
    assert_eq!(watermarks.len(), 1);
    assert_eq!(watermarks[0].high, 3);
    assert_eq!(watermarks[0].retained(), 3);
    client.disconnect().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn peek_stops_at_count_and_at_end_of_topic() {
    let cluster = MockCluster::new(1).unwrap();
    cluster.create_topic("orders", 1, 1).unwrap();
    let client = client_for(&cluster);

    let headers = vec![("type".to_string(), "order.created".to_string())];
    for i in 0..3 {
        let payload = format!(r#"{{"orderId":"ORD-{i}"}}"#);
        client
            .produce("orders", None, payload.as_bytes(), &headers)
            .await
            .unwrap();
    }

    let two = client.peek("orders", 2).await.unwrap();
    assert_eq!(two.len(), 2);
    assert_eq!(two[0].offset, 0);
    assert_eq!(two[0].header_str("type"), Some("order.created"));
    assert_eq!(two[0].payload.as_deref(), Some(&br#"{"orderId":"ORD-0"}"#[..]));

    // A fresh group each time, so the second peek starts from the beginning
    // and ends when the single partition is drained.
    let all = client.peek("orders", 10).await.unwrap();
    assert_eq!(all.len(), 3);
    assert_eq!(all[2].offset, 2);
    client.disconnect().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn peek_waits_out_a_rebalance_longer_than_the_idle_window() {
    let cluster = MockCluster::new(1).unwrap();
    cluster.create_topic("orders", 1, 1).unwrap();
    let mut config = config_for(&cluster);
    // Shorter than the group join delay of the mock cluster.
    config.peek_idle_timeout_ms = 1_000;
    let client = KafkaClient::new(config).unwrap();

    client
        .produce("orders", None, br#"{"orderId":"ORD-1"}"#, &[])
        .await
        .unwrap();

    let records = client.peek("orders", 5).await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].offset, 0);
    client.disconnect().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn watermarks_of_fetched_metadata_match_by_name_lookup() {
    let cluster = MockCluster::new(1).unwrap();
    cluster.create_topic("orders", 2, 1).unwrap();
    let client = client_for(&cluster);
    client.produce("orders", Some("k"), b"{}", &[]).await.unwrap();

    let metadata = client.topic_metadata("orders").await.unwrap();
    let reused = client.watermarks_of(&metadata).await.unwrap();
    let looked_up = client.watermarks("orders").await.unwrap();
    assert_eq!(reused, looked_up);
    assert_eq!(reused.iter().map(|w| w.retained()).sum::<i64>(), 1);
    client.disconnect().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn peek_of_empty_topic_returns_nothing() {
    let cluster = MockCluster::new(1).unwrap();
    cluster.create_topic("empty", 1, 1).unwrap();
    let client = client_for(&cluster);

    let records = client.peek("empty", 5).await.unwrap();
    assert!(records.is_empty());
    client.disconnect().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn peek_of_missing_topic_fails_before_joining_a_group() {
    let cluster = MockCluster::new(1).unwrap();
    let client = client_for(&cluster);

    let err = client.peek("missing", 5).await.unwrap_err();
    assert!(matches!(err, KafkaError::TopicNotFound(_)));
    client.disconnect().await;
}
