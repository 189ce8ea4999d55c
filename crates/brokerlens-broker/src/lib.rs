//! Broker-agnostic adapters for brokerlens.
//!
//! [`BrokerAdapter`] is the operation set every broker supports. Optional
//! operation groups live in [`capability`] and are discovered per adapter
//! instance with [`supports`] or [`capabilities`]. Concrete adapters:
//! - [`RabbitAdapter`] over the RabbitMQ management API
//! - [`KafkaAdapter`] over an rdkafka admin/producer pair
//!
//! [`create_adapter`] builds the right one from a [`BrokerConfig`].

pub mod adapter;
pub mod capability;
pub mod config;
pub mod error;
pub mod kafka;
pub mod rabbit;
pub mod types;

pub use adapter::BrokerAdapter;
pub use capability::{
    capabilities, supports, Capability, ConnectionsCapability, ConsumerGroupsCapability,
    ConsumersCapability, OverviewCapability, TopologyCapability,
};
pub use config::BrokerConfig;
pub use error::{BrokerError, Result};
pub use kafka::KafkaAdapter;
pub use rabbit::RabbitAdapter;
pub use types::*;

/// Build the adapter for `config`. No connection is opened yet.
pub fn create_adapter(config: &BrokerConfig) -> Result<Box<dyn BrokerAdapter>> {
    let adapter: Box<dyn BrokerAdapter> = match config {
        BrokerConfig::Rabbitmq(rabbit) => Box::new(RabbitAdapter::new(rabbit)?),
        BrokerConfig::Kafka(kafka) => Box::new(KafkaAdapter::new(kafka.clone())?),
    };
    tracing::debug!(broker = adapter.broker_name(), "adapter created");
    Ok(adapter)
}
