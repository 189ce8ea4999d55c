//! RabbitMQ management HTTP API client.
//!
//! Speaks the broker's management plugin surface over HTTP Basic auth:
//! - queue, exchange and binding CRUD
//! - non-destructive message peek (`ackmode: ack_requeue_true`)
//! - publish through an exchange
//! - overview, consumers, connections and the alarms health check
//!
//! Responses are returned in the broker's own shapes (see [`model`]); the
//! broker adapter layer is responsible for normalizing them.

pub mod client;
pub mod error;
pub mod model;
pub mod path;

pub use client::{QueueDeclare, RabbitClient, RabbitConfig};
pub use error::{RabbitError, Result};
pub use path::{encode_segment, encode_vhost};
