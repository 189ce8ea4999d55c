use rdkafka::error::KafkaError as ClientError;

/// Errors returned by the Kafka client.
#[derive(Debug, thiserror::Error)]
pub enum KafkaError {
    /// The underlying rdkafka client reported a failure.
    #[error(transparent)]
    Client(#[from] ClientError),

    /// The requested topic does not exist.
    #[error("topic '{0}' not found")]
    TopicNotFound(String),

    /// The requested consumer group does not exist.
    #[error("consumer group '{0}' not found")]
    GroupNotFound(String),

    /// The cluster rejected an admin operation for one item.
    #[error("admin operation on '{name}' failed: {code}")]
    Admin { name: String, code: String },

    /// A blocking metadata task panicked or was cancelled.
    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    /// The client configuration is unusable.
    #[error("invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, KafkaError>;
