use brokerlens_kafka::KafkaConfig;
use brokerlens_rabbitmq::RabbitConfig;
use serde::Deserialize;
use serde_json::Value;

use crate::error::{BrokerError, Result};

/// Which broker to talk to and how to reach it.
///
/// Deserializes from `{"broker": "rabbitmq", url, username, password}` or
/// `{"broker": "kafka", brokers, clientId?, sasl?, ssl?}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "broker", rename_all = "lowercase")]
pub enum BrokerConfig {
    Rabbitmq(RabbitConfig),
    Kafka(KafkaConfig),
}

impl BrokerConfig {
    pub fn from_json(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text)
            .map_err(|err| BrokerError::Config(format!("invalid broker configuration: {err}")))?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self> {
        match value.get("broker") {
            Some(Value::String(kind)) if kind == "rabbitmq" || kind == "kafka" => {}
            Some(Value::String(kind)) => {
                return Err(BrokerError::Config(format!(
                    "unsupported broker type: {kind}"
                )))
            }
            Some(other) => {
                return Err(BrokerError::Config(format!(
                    "unsupported broker type: {other}"
                )))
            }
            None => {
                return Err(BrokerError::Config(
                    "broker type is required".to_string(),
                ))
            }
        }
        serde_json::from_value(value)
            .map_err(|err| BrokerError::Config(format!("invalid broker configuration: {err}")))
    }

    /// Broker family name, matching [`crate::BrokerAdapter::broker_name`].
    pub fn broker_name(&self) -> &'static str {
        match self {
            BrokerConfig::Rabbitmq(_) => "rabbitmq",
            BrokerConfig::Kafka(_) => "kafka",
        }
    }
}
