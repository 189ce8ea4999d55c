//! Every adapter and pipeline operation as a named tool.
//!
//! Tools take a JSON object of arguments and return plain JSON. Arguments
//! are defaulted here (`vhost` is `/`, `count` is 5) before they reach the
//! adapter. Tools that need an optional capability are only offered when
//! the wrapped adapter provides it.

use std::time::Duration;

use brokerlens_broker::{
    supports, BrokerAdapter, BrokerError, Capability, ExchangeOptions, PublishParams,
    QueueOptions,
};
use brokerlens_pipeline::{
    check_health, inspect_queue, publish_message, validate_message, DEFAULT_INSPECT_COUNT,
};
use brokerlens_schema::SchemaValidator;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    #[error("tool '{tool}' needs the {capability} capability, which {broker} does not provide")]
    Unsupported {
        tool: String,
        capability: Capability,
        broker: &'static str,
    },

    #[error("invalid arguments for '{tool}': {message}")]
    InvalidArguments { tool: String, message: String },

    /// The broker call itself failed.
    #[error(transparent)]
    Broker(#[from] BrokerError),

    #[error("failed to encode result: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Catalogue entry for one tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ToolSpec {
    pub name: &'static str,
    pub description: &'static str,
    /// Capability the adapter must provide, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capability: Option<Capability>,
}

const fn tool(name: &'static str, description: &'static str) -> ToolSpec {
    ToolSpec {
        name,
        description,
        capability: None,
    }
}

const fn capability_tool(
    name: &'static str,
    description: &'static str,
    capability: Capability,
) -> ToolSpec {
    ToolSpec {
        name,
        description,
        capability: Some(capability),
    }
}

const CATALOGUE: &[ToolSpec] = &[
    tool("list_queues", "List queues (RabbitMQ) or topics (Kafka)"),
    tool("get_queue", "Show one queue or topic"),
    tool("create_queue", "Create a queue or topic"),
    tool("delete_queue", "Delete a queue or topic"),
    tool("purge_queue", "Remove every message from a queue or topic"),
    tool("peek_messages", "Read messages without consuming them"),
    tool(
        "inspect_queue",
        "Peek messages and validate each against its declared type's schema",
    ),
    tool(
        "publish_message",
        "Publish a JSON message, optionally validating it first",
    ),
    tool("validate_message", "Validate a payload against a named schema"),
    tool("list_schemas", "List loaded schemas"),
    tool("get_schema", "Show one schema document"),
    tool("check_health", "Check broker health"),
    capability_tool("get_overview", "Cluster overview", Capability::Overview),
    capability_tool("list_consumers", "List consumers", Capability::Consumers),
    capability_tool(
        "list_connections",
        "List client connections",
        Capability::Connections,
    ),
    capability_tool("list_exchanges", "List exchanges", Capability::Topology),
    capability_tool("create_exchange", "Create an exchange", Capability::Topology),
    capability_tool("delete_exchange", "Delete an exchange", Capability::Topology),
    capability_tool(
        "list_bindings",
        "List bindings, optionally for one queue",
        Capability::Topology,
    ),
    capability_tool(
        "create_binding",
        "Bind a queue to an exchange",
        Capability::Topology,
    ),
    capability_tool(
        "delete_binding",
        "Remove a queue binding",
        Capability::Topology,
    ),
    capability_tool(
        "list_consumer_groups",
        "List consumer groups",
        Capability::ConsumerGroups,
    ),
    capability_tool(
        "describe_consumer_group",
        "Show a consumer group with decoded member assignments",
        Capability::ConsumerGroups,
    ),
];

/// Dispatches named tools to one adapter and one schema validator.
pub struct ToolRegistry {
    adapter: Box<dyn BrokerAdapter>,
    validator: SchemaValidator,
}

impl ToolRegistry {
    pub fn new(adapter: Box<dyn BrokerAdapter>, validator: SchemaValidator) -> Self {
        Self { adapter, validator }
    }

    pub fn adapter(&self) -> &dyn BrokerAdapter {
        self.adapter.as_ref()
    }

    pub fn validator(&self) -> &SchemaValidator {
        &self.validator
    }

    /// Every tool, whether or not this adapter supports it.
    pub fn catalogue() -> &'static [ToolSpec] {
        CATALOGUE
    }

    pub fn spec(name: &str) -> Option<&'static ToolSpec> {
        CATALOGUE.iter().find(|spec| spec.name == name)
    }

    pub fn is_available(&self, spec: &ToolSpec) -> bool {
        spec.capability
            .is_none_or(|capability| supports(self.adapter.as_ref(), capability))
    }

    /// Tools the wrapped adapter can serve, in catalogue order.
    pub fn available(&self) -> Vec<&'static ToolSpec> {
        CATALOGUE
            .iter()
            .filter(|spec| self.is_available(spec))
            .collect()
    }

    /// Release the adapter's connections.
    pub async fn shutdown(&self) {
        self.adapter.disconnect().await;
    }

    /// Run tool `name` with `args`, a JSON object or null.
    pub async fn invoke(&self, name: &str, args: Value) -> Result<Value, ToolError> {
        let spec = Self::spec(name).ok_or_else(|| ToolError::UnknownTool(name.to_string()))?;
        if let Some(capability) = spec.capability {
            if !supports(self.adapter.as_ref(), capability) {
                return Err(self.unsupported(name, capability));
            }
        }
        let args = if args.is_null() { json!({}) } else { args };
        debug!(tool = %name, broker = self.adapter.broker_name(), "invoking tool");

        let adapter = self.adapter.as_ref();
        match name {
            "list_queues" => {
                let a: ScopeArgs = parse(name, args)?;
                encode(adapter.list_queues(&a.vhost).await?)
            }
            "get_queue" => {
                let a: QueueArgs = parse(name, args)?;
                encode(adapter.get_queue(&a.vhost, &a.queue).await?)
            }
            "create_queue" => {
                let a: CreateQueueArgs = parse(name, args)?;
                adapter.create_queue(&a.vhost, &a.queue, &a.options).await?;
                Ok(json!({"queue": a.queue, "created": true}))
            }
            "delete_queue" => {
                let a: QueueArgs = parse(name, args)?;
                adapter.delete_queue(&a.vhost, &a.queue).await?;
                Ok(json!({"queue": a.queue, "deleted": true}))
            }
            "purge_queue" => {
                let a: QueueArgs = parse(name, args)?;
                encode(adapter.purge_queue(&a.vhost, &a.queue).await?)
            }
            "peek_messages" => {
                let a: PeekArgs = parse(name, args)?;
                encode(adapter.peek_messages(&a.vhost, &a.queue, a.count).await?)
            }
            "inspect_queue" => {
                let a: PeekArgs = parse(name, args)?;
                encode(inspect_queue(adapter, &self.validator, &a.vhost, &a.queue, a.count).await?)
            }
            "publish_message" => {
                let params: PublishParams = parse(name, args)?;
                encode(publish_message(adapter, &self.validator, &params).await?)
            }
            "validate_message" => {
                let a: ValidateArgs = parse(name, args)?;
                let payload = match a.payload {
                    Value::String(text) => text,
                    other => other.to_string(),
                };
                encode(validate_message(&self.validator, &a.schema, &payload))
            }
            "list_schemas" => {
                let schemas: Vec<Value> = self
                    .validator
                    .entries()
                    .iter()
                    .map(|entry| {
                        json!({
                            "name": entry.name,
                            "version": entry.version,
                            "title": entry.title,
                            "description": entry.description,
                        })
                    })
                    .collect();
                Ok(Value::Array(schemas))
            }
            "get_schema" => {
                let a: SchemaArgs = parse(name, args)?;
                let entry = self.validator.get(&a.name).ok_or_else(|| ToolError::InvalidArguments {
                    tool: name.to_string(),
                    message: format!("schema not found: {}", a.name),
                })?;
                encode(entry)
            }
            "check_health" => {
                let a: HealthArgs = parse(name, args)?;
                let timeout = a.timeout_ms.map(Duration::from_millis);
                encode(check_health(adapter, timeout).await)
            }
            "get_overview" => {
                let overview = self.capable(name, Capability::Overview, adapter.overview())?;
                encode(overview.get_overview().await?)
            }
            "list_consumers" => {
                let a: ScopeArgs = parse(name, args)?;
                let consumers = self.capable(name, Capability::Consumers, adapter.consumers())?;
                encode(consumers.list_consumers(&a.vhost).await?)
            }
            "list_connections" => {
                let connections =
                    self.capable(name, Capability::Connections, adapter.connections())?;
                encode(connections.list_connections().await?)
            }
            "list_exchanges" => {
                let a: ScopeArgs = parse(name, args)?;
                let topology = self.capable(name, Capability::Topology, adapter.topology())?;
                encode(topology.list_exchanges(&a.vhost).await?)
            }
            "create_exchange" => {
                let a: CreateExchangeArgs = parse(name, args)?;
                let topology = self.capable(name, Capability::Topology, adapter.topology())?;
                topology
                    .create_exchange(&a.vhost, &a.exchange, &a.options)
                    .await?;
                Ok(json!({"exchange": a.exchange, "created": true}))
            }
            "delete_exchange" => {
                let a: ExchangeArgs = parse(name, args)?;
                let topology = self.capable(name, Capability::Topology, adapter.topology())?;
                topology.delete_exchange(&a.vhost, &a.exchange).await?;
                Ok(json!({"exchange": a.exchange, "deleted": true}))
            }
            "list_bindings" => {
                let a: BindingListArgs = parse(name, args)?;
                let topology = self.capable(name, Capability::Topology, adapter.topology())?;
                encode(topology.list_bindings(&a.vhost, a.queue.as_deref()).await?)
            }
            "create_binding" => {
                let a: BindingArgs = parse(name, args)?;
                let topology = self.capable(name, Capability::Topology, adapter.topology())?;
                topology
                    .create_binding(&a.vhost, &a.exchange, &a.queue, &a.routing_key)
                    .await?;
                Ok(json!({
                    "exchange": a.exchange,
                    "queue": a.queue,
                    "routing_key": a.routing_key,
                    "created": true
                }))
            }
            "delete_binding" => {
                let a: DeleteBindingArgs = parse(name, args)?;
                let topology = self.capable(name, Capability::Topology, adapter.topology())?;
                topology
                    .delete_binding(&a.vhost, &a.exchange, &a.queue, &a.properties_key)
                    .await?;
                Ok(json!({"exchange": a.exchange, "queue": a.queue, "deleted": true}))
            }
            "list_consumer_groups" => {
                let groups =
                    self.capable(name, Capability::ConsumerGroups, adapter.consumer_groups())?;
                encode(groups.list_consumer_groups().await?)
            }
            "describe_consumer_group" => {
                let a: GroupArgs = parse(name, args)?;
                let groups =
                    self.capable(name, Capability::ConsumerGroups, adapter.consumer_groups())?;
                encode(groups.describe_consumer_group(&a.group_id).await?)
            }
            other => Err(ToolError::UnknownTool(other.to_string())),
        }
    }

    fn capable<'a, T: ?Sized>(
        &self,
        tool: &str,
        capability: Capability,
        found: Option<&'a T>,
    ) -> Result<&'a T, ToolError> {
        found.ok_or_else(|| self.unsupported(tool, capability))
    }

    fn unsupported(&self, tool: &str, capability: Capability) -> ToolError {
        ToolError::Unsupported {
            tool: tool.to_string(),
            capability,
            broker: self.adapter.broker_name(),
        }
    }
}

fn parse<T: DeserializeOwned>(tool: &str, args: Value) -> Result<T, ToolError> {
    serde_json::from_value(args).map_err(|err| ToolError::InvalidArguments {
        tool: tool.to_string(),
        message: err.to_string(),
    })
}

fn encode<T: Serialize>(value: T) -> Result<Value, ToolError> {
    Ok(serde_json::to_value(value)?)
}

fn default_vhost() -> String {
    "/".to_string()
}

fn default_count() -> usize {
    DEFAULT_INSPECT_COUNT
}

/// Properties key of a binding with an empty routing key and no arguments.
fn default_properties_key() -> String {
    "~".to_string()
}

#[derive(Deserialize)]
struct ScopeArgs {
    #[serde(default = "default_vhost")]
    vhost: String,
}

#[derive(Deserialize)]
struct QueueArgs {
    #[serde(default = "default_vhost")]
    vhost: String,
    #[serde(alias = "name", alias = "topic")]
    queue: String,
}

#[derive(Deserialize)]
struct CreateQueueArgs {
    #[serde(default = "default_vhost")]
    vhost: String,
    #[serde(alias = "name", alias = "topic")]
    queue: String,
    #[serde(flatten)]
    options: QueueOptions,
}

#[derive(Deserialize)]
struct PeekArgs {
    #[serde(default = "default_vhost")]
    vhost: String,
    #[serde(alias = "name", alias = "topic")]
    queue: String,
    #[serde(default = "default_count")]
    count: usize,
}

#[derive(Deserialize)]
struct ValidateArgs {
    #[serde(alias = "schema_name", alias = "message_type")]
    schema: String,
    payload: Value,
}

#[derive(Deserialize)]
struct SchemaArgs {
    name: String,
}

#[derive(Deserialize)]
struct HealthArgs {
    #[serde(default)]
    timeout_ms: Option<u64>,
}

#[derive(Deserialize)]
struct ExchangeArgs {
    #[serde(default = "default_vhost")]
    vhost: String,
    #[serde(alias = "name")]
    exchange: String,
}

#[derive(Deserialize)]
struct CreateExchangeArgs {
    #[serde(default = "default_vhost")]
    vhost: String,
    #[serde(alias = "name")]
    exchange: String,
    #[serde(flatten)]
    options: ExchangeOptions,
}

#[derive(Deserialize)]
struct BindingListArgs {
    #[serde(default = "default_vhost")]
    vhost: String,
    #[serde(default)]
    queue: Option<String>,
}

#[derive(Deserialize)]
struct BindingArgs {
    #[serde(default = "default_vhost")]
    vhost: String,
    exchange: String,
    queue: String,
    #[serde(default)]
    routing_key: String,
}

#[derive(Deserialize)]
struct DeleteBindingArgs {
    #[serde(default = "default_vhost")]
    vhost: String,
    exchange: String,
    queue: String,
    #[serde(default = "default_properties_key")]
    properties_key: String,
}

#[derive(Deserialize)]
struct GroupArgs {
    #[serde(alias = "group")]
    group_id: String,
}
