//! In-memory adapter that records what the pipeline asks of it.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use brokerlens_broker::{
    BrokerAdapter, BrokerError, HealthStatus, Message, MessageProperties, PayloadEncoding,
    PublishParams, PublishResult, PurgeResult, QueueInfo, QueueOptions, Result,
};
use brokerlens_schema::{SchemaEntry, SchemaValidator};
use serde_json::{json, Map};

#[derive(Default)]
pub struct FakeAdapter {
    pub messages: Vec<Message>,
    pub routed: bool,
    pub publish_calls: AtomicUsize,
    pub published: Mutex<Vec<PublishParams>>,
    pub health_delay: Option<Duration>,
    pub health_error: Option<String>,
}

impl FakeAdapter {
    pub fn with_messages(messages: Vec<Message>) -> Self {
        Self {
            messages,
            routed: true,
            ..Self::default()
        }
    }

    pub fn publish_count(&self) -> usize {
        self.publish_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BrokerAdapter for FakeAdapter {
    fn broker_name(&self) -> &'static str {
        "fake"
    }

    async fn list_queues(&self, _vhost: &str) -> Result<Vec<QueueInfo>> {
        Ok(Vec::new())
    }

    async fn get_queue(&self, _vhost: &str, name: &str) -> Result<QueueInfo> {
        Err(BrokerError::Config(format!("no queue {name}")))
    }

    async fn create_queue(&self, _vhost: &str, _name: &str, _options: &QueueOptions) -> Result<()> {
        Ok(())
    }

    async fn delete_queue(&self, _vhost: &str, _name: &str) -> Result<()> {
        Ok(())
    }

    async fn purge_queue(&self, _vhost: &str, _name: &str) -> Result<PurgeResult> {
        Ok(PurgeResult::default())
    }

    async fn peek_messages(&self, _vhost: &str, _name: &str, count: usize) -> Result<Vec<Message>> {
        Ok(self.messages.iter().take(count).cloned().collect())
    }

    async fn publish(&self, params: &PublishParams) -> Result<PublishResult> {
        self.publish_calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut published) = self.published.lock() {
            published.push(params.clone());
        }
        Ok(PublishResult {
            published: true,
            routed: self.routed,
            metadata: Map::new(),
        })
    }

    async fn check_health(&self) -> Result<HealthStatus> {
        if let Some(delay) = self.health_delay {
            tokio::time::sleep(delay).await;
        }
        match &self.health_error {
            Some(message) => Err(BrokerError::Config(message.clone())),
            None => Ok(HealthStatus {
                healthy: true,
                status: "ok".to_string(),
                message: None,
            }),
        }
    }

    async fn disconnect(&self) {}
}

/// A text message with an optional declared type.
pub fn text_message(payload: &str, message_type: Option<&str>) -> Message {
    Message {
        payload: payload.to_string(),
        payload_encoding: PayloadEncoding::String,
        properties: MessageProperties {
            message_type: message_type.map(str::to_string),
            ..MessageProperties::default()
        },
        metadata: Map::new(),
    }
}

pub fn binary_message() -> Message {
    Message {
        payload: "/wAQ".to_string(),
        payload_encoding: PayloadEncoding::Base64,
        properties: MessageProperties::default(),
        metadata: Map::new(),
    }
}

/// Validator holding `order.created`, which requires `orderId` and a
/// numeric `amount`.
pub fn order_validator() -> SchemaValidator {
    SchemaValidator::new(vec![SchemaEntry::new(
        "order.created",
        json!({
            "type": "object",
            "required": ["orderId", "amount"],
            "properties": {
                "orderId": {"type": "string"},
                "amount": {"type": "number"}
            }
        }),
    )])
}
