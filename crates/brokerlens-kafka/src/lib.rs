//! Kafka client for brokerlens.
//!
//! Wraps `rdkafka` behind a small owned client:
//! - one admin connection and one producer, created lazily on first use
//!   and released by [`KafkaClient::disconnect`]
//! - topic CRUD, metadata and watermark queries
//! - peek through a transient, uniquely named consumer group
//! - derived purge (delete records up to each partition's high watermark)
//! - consumer group listing with decoded member assignments
//!
//! The member assignment decoder lives in [`assignment`] and has no
//! dependency on a running cluster.

pub mod assignment;
pub mod client;
pub mod config;
pub mod error;
pub mod model;
mod peek;
mod purge;

pub use assignment::{decode_member_assignment, TopicPartitionAssignment};
pub use client::KafkaClient;
pub use config::{KafkaConfig, KafkaSaslConfig, SaslMechanism};
pub use error::{KafkaError, Result};
pub use model::{
    BrokerNode, ClusterMetadata, GroupDescription, GroupMember, GroupSummary, KafkaRecord,
    PartitionMetadata, PartitionWatermarks, TopicMetadata, TopicPurge, TopicSpec,
};
