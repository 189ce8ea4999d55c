use brokerlens_kafka::KafkaError;
use brokerlens_rabbitmq::RabbitError;

/// Errors returned by broker adapters.
///
/// Protocol errors pass through untouched so callers see the broker's own
/// error text.
#[derive(Debug, thiserror::Error)]
pub enum BrokerError {
    #[error(transparent)]
    Rabbit(#[from] RabbitError),

    #[error(transparent)]
    Kafka(#[from] KafkaError),

    /// The broker configuration is unusable.
    #[error("{0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, BrokerError>;
