use async_trait::async_trait;
use brokerlens_rabbitmq::model::{
    RabbitBinding, RabbitConnection, RabbitConsumer, RabbitExchange, RabbitMessage,
    RabbitProperties, RabbitQueue,
};
use brokerlens_rabbitmq::{QueueDeclare, RabbitClient, RabbitConfig};
use serde_json::{json, Map, Value};
use tracing::debug;

use crate::adapter::BrokerAdapter;
use crate::capability::{
    ConnectionsCapability, ConsumersCapability, OverviewCapability, TopologyCapability,
};
use crate::error::Result;
use crate::types::{
    BindingInfo, ConnectionInfo, ConsumerInfo, ExchangeInfo, ExchangeOptions, HealthStatus,
    Message, MessageProperties, Overview, PayloadEncoding, PublishParams, PublishResult,
    PurgeResult, QueueInfo, QueueOptions,
};

/// Adapter over the RabbitMQ management API.
///
/// Implements every optional capability.
#[derive(Debug, Clone)]
pub struct RabbitAdapter {
    client: RabbitClient,
}

impl RabbitAdapter {
    pub fn new(config: &RabbitConfig) -> Result<Self> {
        Ok(Self {
            client: RabbitClient::new(config)?,
        })
    }

    pub fn from_client(client: RabbitClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &RabbitClient {
        &self.client
    }
}

#[async_trait]
impl BrokerAdapter for RabbitAdapter {
    fn broker_name(&self) -> &'static str {
        "rabbitmq"
    }

    async fn list_queues(&self, vhost: &str) -> Result<Vec<QueueInfo>> {
        let queues = self.client.list_queues(vhost).await?;
        Ok(queues.into_iter().map(queue_info).collect())
    }

    async fn get_queue(&self, vhost: &str, name: &str) -> Result<QueueInfo> {
        Ok(queue_info(self.client.get_queue(vhost, name).await?))
    }

    async fn create_queue(&self, vhost: &str, name: &str, options: &QueueOptions) -> Result<()> {
        let declare = QueueDeclare {
            durable: options.durable,
            auto_delete: options.auto_delete,
            arguments: options.arguments.clone(),
        };
        self.client.create_queue(vhost, name, &declare).await?;
        Ok(())
    }

    async fn delete_queue(&self, vhost: &str, name: &str) -> Result<()> {
        self.client.delete_queue(vhost, name).await?;
        Ok(())
    }

    async fn purge_queue(&self, vhost: &str, name: &str) -> Result<PurgeResult> {
        let outcome = self.client.purge_queue(vhost, name).await?;
        Ok(PurgeResult {
            messages_purged: outcome.message_count,
        })
    }

    async fn peek_messages(&self, vhost: &str, name: &str, count: usize) -> Result<Vec<Message>> {
        if count == 0 {
            return Ok(Vec::new());
        }
        let messages = self.client.get_messages(vhost, name, count).await?;
        Ok(messages.into_iter().map(message).collect())
    }

    async fn publish(&self, params: &PublishParams) -> Result<PublishResult> {
        let properties = RabbitProperties {
            correlation_id: params.correlation_id.clone(),
            message_type: params.message_type.clone(),
            headers: params.headers.clone().unwrap_or_default(),
            ..RabbitProperties::default()
        };
        let response = self
            .client
            .publish(
                &params.scope,
                &params.destination,
                &params.routing_key,
                &params.payload,
                &properties,
            )
            .await?;
        Ok(PublishResult {
            published: true,
            routed: response.routed,
            metadata: Map::new(),
        })
    }

    async fn check_health(&self) -> Result<HealthStatus> {
        let check = self.client.check_alarms().await?;
        debug!(status = %check.status, "rabbitmq alarms check");
        Ok(HealthStatus {
            healthy: check.is_ok(),
            status: check.status,
            message: check.reason,
        })
    }

    async fn disconnect(&self) {
        // Stateless HTTP; nothing to release.
    }

    fn overview(&self) -> Option<&dyn OverviewCapability> {
        Some(self)
    }

    fn consumers(&self) -> Option<&dyn ConsumersCapability> {
        Some(self)
    }

    fn connections(&self) -> Option<&dyn ConnectionsCapability> {
        Some(self)
    }

    fn topology(&self) -> Option<&dyn TopologyCapability> {
        Some(self)
    }
}

#[async_trait]
impl OverviewCapability for RabbitAdapter {
    async fn get_overview(&self) -> Result<Overview> {
        let overview = self.client.overview().await?;
        let totals = &overview.object_totals;
        let mut metadata = Map::new();
        metadata.insert("erlang_version".into(), json!(overview.erlang_version));
        metadata.insert(
            "management_version".into(),
            json!(overview.management_version),
        );
        metadata.insert("node".into(), json!(overview.node));
        metadata.insert("channels".into(), json!(totals.channels));
        metadata.insert("exchanges".into(), json!(totals.exchanges));
        metadata.insert(
            "messages_ready".into(),
            json!(overview.queue_totals.messages_ready),
        );
        metadata.insert(
            "messages_unacknowledged".into(),
            json!(overview.queue_totals.messages_unacknowledged),
        );
        Ok(Overview {
            broker: "rabbitmq".to_string(),
            version: overview.rabbitmq_version.clone(),
            cluster_name: overview.cluster_name.clone(),
            queue_count: totals.queues,
            consumer_count: Some(totals.consumers),
            connection_count: Some(totals.connections),
            message_count: overview.queue_totals.messages,
            metadata,
        })
    }
}

#[async_trait]
impl ConsumersCapability for RabbitAdapter {
    async fn list_consumers(&self, vhost: &str) -> Result<Vec<ConsumerInfo>> {
        let consumers = self.client.list_consumers(vhost).await?;
        Ok(consumers.into_iter().map(consumer_info).collect())
    }
}

#[async_trait]
impl ConnectionsCapability for RabbitAdapter {
    async fn list_connections(&self) -> Result<Vec<ConnectionInfo>> {
        let connections = self.client.list_connections().await?;
        Ok(connections.into_iter().map(connection_info).collect())
    }
}

#[async_trait]
impl TopologyCapability for RabbitAdapter {
    async fn list_exchanges(&self, vhost: &str) -> Result<Vec<ExchangeInfo>> {
        let exchanges = self.client.list_exchanges(vhost).await?;
        Ok(exchanges.into_iter().map(exchange_info).collect())
    }

    async fn create_exchange(
        &self,
        vhost: &str,
        name: &str,
        options: &ExchangeOptions,
    ) -> Result<()> {
        self.client
            .create_exchange(vhost, name, &options.kind, options.durable, options.auto_delete)
            .await?;
        Ok(())
    }

    async fn delete_exchange(&self, vhost: &str, name: &str) -> Result<()> {
        self.client.delete_exchange(vhost, name).await?;
        Ok(())
    }

    async fn list_bindings(&self, vhost: &str, queue: Option<&str>) -> Result<Vec<BindingInfo>> {
        let bindings = match queue {
            Some(queue) => self.client.list_queue_bindings(vhost, queue).await?,
            None => self.client.list_bindings(vhost).await?,
        };
        Ok(bindings.into_iter().map(binding_info).collect())
    }

    async fn create_binding(
        &self,
        vhost: &str,
        exchange: &str,
        queue: &str,
        routing_key: &str,
    ) -> Result<()> {
        self.client
            .create_binding(vhost, exchange, queue, routing_key)
            .await?;
        Ok(())
    }

    async fn delete_binding(
        &self,
        vhost: &str,
        exchange: &str,
        queue: &str,
        properties_key: &str,
    ) -> Result<()> {
        self.client
            .delete_binding(vhost, exchange, queue, properties_key)
            .await?;
        Ok(())
    }
}

fn queue_info(queue: RabbitQueue) -> QueueInfo {
    let mut metadata = Map::new();
    metadata.insert("vhost".into(), json!(queue.vhost));
    metadata.insert("durable".into(), json!(queue.durable));
    metadata.insert("auto_delete".into(), json!(queue.auto_delete));
    metadata.insert("exclusive".into(), json!(queue.exclusive));
    metadata.insert("type".into(), json!(queue.queue_type));
    metadata.insert("node".into(), json!(queue.node));
    metadata.insert("messages".into(), json!(queue.messages));
    metadata.insert("memory".into(), json!(queue.memory));
    metadata.insert("arguments".into(), Value::Object(queue.arguments));
    QueueInfo {
        name: queue.name,
        messages_ready: queue.messages_ready,
        messages_unacknowledged: queue.messages_unacknowledged,
        consumers: queue.consumers,
        state: queue.state.unwrap_or_else(|| "unknown".to_string()),
        metadata,
    }
}

fn message(msg: RabbitMessage) -> Message {
    let payload_encoding = if msg.payload_encoding == "base64" {
        PayloadEncoding::Base64
    } else {
        PayloadEncoding::String
    };
    let mut metadata = Map::new();
    metadata.insert("exchange".into(), json!(msg.exchange));
    metadata.insert("routing_key".into(), json!(msg.routing_key));
    metadata.insert("redelivered".into(), json!(msg.redelivered));
    if let Some(bytes) = msg.payload_bytes {
        metadata.insert("payload_bytes".into(), json!(bytes));
    }
    if let Some(remaining) = msg.message_count {
        metadata.insert("message_count".into(), json!(remaining));
    }
    let props = msg.properties;
    Message {
        payload: msg.payload,
        payload_encoding,
        properties: MessageProperties {
            correlation_id: props.correlation_id,
            message_id: props.message_id,
            message_type: props.message_type,
            timestamp: props.timestamp,
            content_type: props.content_type,
            headers: props.headers,
        },
        metadata,
    }
}

fn consumer_info(consumer: RabbitConsumer) -> ConsumerInfo {
    let channel = consumer.channel_details;
    let mut metadata = Map::new();
    metadata.insert("ack_required".into(), json!(consumer.ack_required));
    metadata.insert("exclusive".into(), json!(consumer.exclusive));
    metadata.insert("prefetch_count".into(), json!(consumer.prefetch_count));
    metadata.insert("active".into(), json!(consumer.active));
    metadata.insert("channel".into(), json!(channel.name));
    metadata.insert("user".into(), json!(channel.user));
    ConsumerInfo {
        consumer_id: consumer.consumer_tag,
        queue: Some(consumer.queue.name),
        group: None,
        client: channel.connection_name,
        host: channel.peer_host,
        metadata,
    }
}

fn connection_info(conn: RabbitConnection) -> ConnectionInfo {
    ConnectionInfo {
        name: conn.name,
        user: conn.user,
        vhost: conn.vhost,
        state: conn.state,
        protocol: conn.protocol,
        peer_host: conn.peer_host,
        peer_port: conn.peer_port,
        channels: conn.channels,
    }
}

fn exchange_info(exchange: RabbitExchange) -> ExchangeInfo {
    let mut metadata = Map::new();
    metadata.insert("vhost".into(), json!(exchange.vhost));
    metadata.insert("internal".into(), json!(exchange.internal));
    metadata.insert("arguments".into(), Value::Object(exchange.arguments));
    ExchangeInfo {
        name: exchange.name,
        kind: exchange.kind,
        durable: exchange.durable,
        auto_delete: exchange.auto_delete,
        metadata,
    }
}

fn binding_info(binding: RabbitBinding) -> BindingInfo {
    let mut metadata = Map::new();
    metadata.insert("vhost".into(), json!(binding.vhost));
    metadata.insert("properties_key".into(), json!(binding.properties_key));
    metadata.insert("arguments".into(), Value::Object(binding.arguments));
    BindingInfo {
        source: binding.source,
        destination: binding.destination,
        destination_type: binding.destination_type,
        routing_key: binding.routing_key,
        metadata,
    }
}

#[cfg(test)]
mod tests {
    use mockito::{Matcher, Server};
    use serde_json::json;

    use super::*;
    use crate::capability::{capabilities, Capability};
    use crate::BrokerError;

    fn adapter_for(server: &Server) -> RabbitAdapter {
        RabbitAdapter::new(&RabbitConfig {
            url: server.url(),
            username: "guest".to_string(),
            password: "guest".to_string(),
        })
        .unwrap()
    }

    #[test]
    fn exposes_everything_but_consumer_groups() {
        let adapter = RabbitAdapter::new(&RabbitConfig {
            url: "http://localhost:15672".to_string(),
            username: "guest".to_string(),
            password: "guest".to_string(),
        })
        .unwrap();
        assert_eq!(
            capabilities(&adapter),
            vec![
                Capability::Overview,
                Capability::Consumers,
                Capability::Connections,
                Capability::Topology
            ]
        );
    }

    #[tokio::test]
    async fn queues_keep_counts_and_move_details_to_metadata() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/api/queues/%2F")
            .with_status(200)
            .with_body(
                json!([{
                    "name": "orders",
                    "vhost": "/",
                    "durable": true,
                    "type": "classic",
                    "state": "running",
                    "messages": 3,
                    "messages_ready": 2,
                    "messages_unacknowledged": 1,
                    "consumers": 0,
                    "arguments": {"x-queue-type": "classic"}
                }])
                .to_string(),
            )
            .create_async()
            .await;

        let queues = adapter_for(&server).list_queues("/").await.unwrap();
        mock.assert_async().await;
        assert_eq!(queues.len(), 1);
        let queue = &queues[0];
        assert_eq!(queue.name, "orders");
        assert_eq!(queue.messages_ready, Some(2));
        assert_eq!(queue.messages_unacknowledged, Some(1));
        assert_eq!(queue.state, "running");
        assert_eq!(queue.metadata["type"], "classic");
        assert_eq!(queue.metadata["arguments"]["x-queue-type"], "classic");
    }

    #[tokio::test]
    async fn peek_maps_properties_and_routing() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/api/queues/%2F/orders/get")
            .match_body(Matcher::PartialJson(
                json!({"count": 2, "ackmode": "ack_requeue_true"}),
            ))
            .with_status(200)
            .with_body(
                json!([
                    {
                        "payload": "{\"orderId\":\"ORD-1\"}",
                        "payload_encoding": "string",
                        "exchange": "amq.topic",
                        "routing_key": "test.order",
                        "redelivered": true,
                        "properties": {"type": "order.created", "timestamp": 1700000000}
                    },
                    {
                        "payload": "AAEC",
                        "payload_encoding": "base64",
                        "exchange": "",
                        "routing_key": "orders",
                        "properties": []
                    }
                ])
                .to_string(),
            )
            .create_async()
            .await;

        let messages = adapter_for(&server)
            .peek_messages("/", "orders", 2)
            .await
            .unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].payload_encoding, PayloadEncoding::String);
        assert_eq!(
            messages[0].properties.message_type.as_deref(),
            Some("order.created")
        );
        assert_eq!(messages[0].properties.timestamp, Some(1_700_000_000));
        assert_eq!(messages[0].metadata["routing_key"], "test.order");
        assert_eq!(messages[1].payload_encoding, PayloadEncoding::Base64);
        assert!(messages[1].properties.message_type.is_none());
    }

    #[tokio::test]
    async fn peek_of_zero_sends_nothing() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", Matcher::Any)
            .expect(0)
            .create_async()
            .await;
        let messages = adapter_for(&server)
            .peek_messages("/", "orders", 0)
            .await
            .unwrap();
        assert!(messages.is_empty());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn publish_passes_routed_flag_through() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/api/exchanges/%2F/amq.topic/publish")
            .match_body(Matcher::PartialJson(json!({
                "routing_key": "test.order",
                "payload": "{}",
                "payload_encoding": "string",
                "properties": {"type": "order.created", "headers": {"x-source": "cli"}}
            })))
            .with_status(200)
            .with_body(r#"{"routed":false}"#)
            .create_async()
            .await;

        let mut params = PublishParams::new("amq.topic", "{}");
        params.routing_key = "test.order".to_string();
        params.message_type = Some("order.created".to_string());
        let mut headers = Map::new();
        headers.insert("x-source".into(), json!("cli"));
        params.headers = Some(headers);

        let result = adapter_for(&server).publish(&params).await.unwrap();
        mock.assert_async().await;
        assert!(result.published);
        assert!(!result.routed);
    }

    #[tokio::test]
    async fn failing_health_check_is_data() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/api/health/checks/alarms")
            .with_status(503)
            .with_body(r#"{"status":"failed","reason":"memory alarm on rabbit@node1"}"#)
            .create_async()
            .await;

        let health = adapter_for(&server).check_health().await.unwrap();
        assert!(!health.healthy);
        assert_eq!(health.status, "failed");
        assert_eq!(
            health.message.as_deref(),
            Some("memory alarm on rabbit@node1")
        );
    }

    #[tokio::test]
    async fn protocol_errors_keep_broker_text() {
        let mut server = Server::new_async().await;
        server
            .mock("PUT", "/api/queues/%2F/orders")
            .with_status(400)
            .with_body(r#"{"error":"bad_request","reason":"inequivalent arg 'durable'"}"#)
            .create_async()
            .await;

        let err = adapter_for(&server)
            .create_queue("/", "orders", &QueueOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, BrokerError::Rabbit(_)));
        let text = err.to_string();
        assert!(text.contains("400"));
        assert!(text.contains("inequivalent arg 'durable'"));
    }

    #[tokio::test]
    async fn overview_totals_are_normalized() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/api/overview")
            .with_status(200)
            .with_body(
                json!({
                    "cluster_name": "rabbit@node1",
                    "rabbitmq_version": "3.13.0",
                    "object_totals": {"queues": 4, "consumers": 2, "connections": 1, "channels": 1, "exchanges": 8},
                    "queue_totals": {"messages": 10, "messages_ready": 7, "messages_unacknowledged": 3}
                })
                .to_string(),
            )
            .create_async()
            .await;

        let adapter = adapter_for(&server);
        let overview = adapter.overview().unwrap().get_overview().await.unwrap();
        assert_eq!(overview.broker, "rabbitmq");
        assert_eq!(overview.version.as_deref(), Some("3.13.0"));
        assert_eq!(overview.queue_count, 4);
        assert_eq!(overview.connection_count, Some(1));
        assert_eq!(overview.message_count, Some(10));
    }

    #[tokio::test]
    async fn queue_bindings_use_queue_endpoint() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/api/queues/%2F/orders/bindings")
            .with_status(200)
            .with_body(
                json!([{
                    "source": "amq.topic",
                    "vhost": "/",
                    "destination": "orders",
                    "destination_type": "queue",
                    "routing_key": "order.*",
                    "properties_key": "order.*",
                    "arguments": {}
                }])
                .to_string(),
            )
            .create_async()
            .await;

        let adapter = adapter_for(&server);
        let bindings = adapter
            .topology()
            .unwrap()
            .list_bindings("/", Some("orders"))
            .await
            .unwrap();
        mock.assert_async().await;
        assert_eq!(bindings[0].routing_key, "order.*");
        assert_eq!(bindings[0].metadata["properties_key"], "order.*");
    }
}
