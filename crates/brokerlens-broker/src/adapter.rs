use async_trait::async_trait;

use crate::capability::{
    ConnectionsCapability, ConsumerGroupsCapability, ConsumersCapability, OverviewCapability,
    TopologyCapability,
};
use crate::error::Result;
use crate::types::{
    HealthStatus, Message, PublishParams, PublishResult, PurgeResult, QueueInfo, QueueOptions,
};

/// Operations every broker supports.
///
/// `vhost` scopes RabbitMQ calls and is ignored by Kafka. Optional
/// operation groups are reached through the capability accessors, which
/// return `None` unless the adapter implements that group; callers probe
/// them instead of switching on the broker type.
#[async_trait]
pub trait BrokerAdapter: Send + Sync {
    /// Short broker family name for display, e.g. `rabbitmq`.
    fn broker_name(&self) -> &'static str;

    async fn list_queues(&self, vhost: &str) -> Result<Vec<QueueInfo>>;

    async fn get_queue(&self, vhost: &str, name: &str) -> Result<QueueInfo>;

    async fn create_queue(&self, vhost: &str, name: &str, options: &QueueOptions) -> Result<()>;

    async fn delete_queue(&self, vhost: &str, name: &str) -> Result<()>;

    async fn purge_queue(&self, vhost: &str, name: &str) -> Result<PurgeResult>;

    /// Read up to `count` messages without removing them.
    async fn peek_messages(&self, vhost: &str, name: &str, count: usize) -> Result<Vec<Message>>;

    /// Send one message. Performs no validation of its own.
    async fn publish(&self, params: &PublishParams) -> Result<PublishResult>;

    async fn check_health(&self) -> Result<HealthStatus>;

    /// Release long-lived connections. Best effort; never fails.
    async fn disconnect(&self);

    fn overview(&self) -> Option<&dyn OverviewCapability> {
        None
    }

    fn consumers(&self) -> Option<&dyn ConsumersCapability> {
        None
    }

    fn connections(&self) -> Option<&dyn ConnectionsCapability> {
        None
    }

    fn topology(&self) -> Option<&dyn TopologyCapability> {
        None
    }

    fn consumer_groups(&self) -> Option<&dyn ConsumerGroupsCapability> {
        None
    }
}
