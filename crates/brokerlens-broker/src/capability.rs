//! Optional operation groups and the probe that discovers them.

use std::fmt;

use async_trait::async_trait;
use serde::Serialize;

use crate::adapter::BrokerAdapter;
use crate::error::Result;
use crate::types::{
    BindingInfo, ConnectionInfo, ConsumerGroupInfo, ConsumerGroupSummary, ConsumerInfo,
    ExchangeInfo, ExchangeOptions, Overview,
};

#[async_trait]
pub trait OverviewCapability: Send + Sync {
    async fn get_overview(&self) -> Result<Overview>;
}

#[async_trait]
pub trait ConsumersCapability: Send + Sync {
    async fn list_consumers(&self, vhost: &str) -> Result<Vec<ConsumerInfo>>;
}

#[async_trait]
pub trait ConnectionsCapability: Send + Sync {
    async fn list_connections(&self) -> Result<Vec<ConnectionInfo>>;
}

/// Exchanges and bindings.
#[async_trait]
pub trait TopologyCapability: Send + Sync {
    async fn list_exchanges(&self, vhost: &str) -> Result<Vec<ExchangeInfo>>;

    async fn create_exchange(
        &self,
        vhost: &str,
        name: &str,
        options: &ExchangeOptions,
    ) -> Result<()>;

    async fn delete_exchange(&self, vhost: &str, name: &str) -> Result<()>;

    /// All bindings in `vhost`, or only those of `queue`.
    async fn list_bindings(&self, vhost: &str, queue: Option<&str>) -> Result<Vec<BindingInfo>>;

    async fn create_binding(
        &self,
        vhost: &str,
        exchange: &str,
        queue: &str,
        routing_key: &str,
    ) -> Result<()>;

    async fn delete_binding(
        &self,
        vhost: &str,
        exchange: &str,
        queue: &str,
        properties_key: &str,
    ) -> Result<()>;
}

#[async_trait]
pub trait ConsumerGroupsCapability: Send + Sync {
    async fn list_consumer_groups(&self) -> Result<Vec<ConsumerGroupSummary>>;

    async fn describe_consumer_group(&self, group_id: &str) -> Result<ConsumerGroupInfo>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    Overview,
    Consumers,
    Connections,
    Topology,
    ConsumerGroups,
}

impl Capability {
    pub const ALL: [Capability; 5] = [
        Capability::Overview,
        Capability::Consumers,
        Capability::Connections,
        Capability::Topology,
        Capability::ConsumerGroups,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Capability::Overview => "overview",
            Capability::Consumers => "consumers",
            Capability::Connections => "connections",
            Capability::Topology => "topology",
            Capability::ConsumerGroups => "consumer_groups",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether `adapter` exposes `capability`.
pub fn supports(adapter: &dyn BrokerAdapter, capability: Capability) -> bool {
    match capability {
        Capability::Overview => adapter.overview().is_some(),
        Capability::Consumers => adapter.consumers().is_some(),
        Capability::Connections => adapter.connections().is_some(),
        Capability::Topology => adapter.topology().is_some(),
        Capability::ConsumerGroups => adapter.consumer_groups().is_some(),
    }
}

/// Every capability `adapter` exposes, in [`Capability::ALL`] order.
pub fn capabilities(adapter: &dyn BrokerAdapter) -> Vec<Capability> {
    Capability::ALL
        .into_iter()
        .filter(|c| supports(adapter, *c))
        .collect()
}
