//! Inspect, validate and publish messages across RabbitMQ and Kafka.
//!
//! # Crate Structure
//!
//! - [`rabbitmq`]: RabbitMQ management API client
//! - [`kafka`]: Kafka admin, producer and transient-consumer client
//! - [`schema`]: named JSON Schema validation
//! - [`broker`]: broker-agnostic adapters and optional capabilities
//! - [`pipeline`]: inspect and validate-then-publish workflows
//! - [`tools`]: every operation as a named tool taking and returning JSON

pub mod rabbitmq {
    pub use brokerlens_rabbitmq::*;
}

pub mod kafka {
    pub use brokerlens_kafka::*;
}

pub mod schema {
    pub use brokerlens_schema::*;
}

pub mod broker {
    pub use brokerlens_broker::*;
}

pub mod pipeline {
    pub use brokerlens_pipeline::*;
}

pub mod tools;

pub use tools::{ToolError, ToolRegistry, ToolSpec};
