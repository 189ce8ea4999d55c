use std::fmt;

use brokerlens::broker::BrokerError;
use brokerlens::kafka::KafkaError;
use brokerlens::rabbitmq::RabbitError;
use brokerlens::schema::SchemaError;
use brokerlens::ToolError;

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const HEALTH_CHECK_FAILED: i32 = 30;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn broker_error(context: &str, err: BrokerError) -> CliError {
    let code = match &err {
        BrokerError::Rabbit(RabbitError::Request(source)) if source.is_timeout() => TIMEOUT,
        BrokerError::Rabbit(RabbitError::Request(_)) => TRANSPORT_ERROR,
        BrokerError::Rabbit(RabbitError::EmptyVhost | RabbitError::Config(_)) => USAGE,
        BrokerError::Rabbit(_) => FAILURE,
        BrokerError::Kafka(KafkaError::Client(_)) => TRANSPORT_ERROR,
        BrokerError::Kafka(KafkaError::Config(_)) => USAGE,
        BrokerError::Kafka(KafkaError::Task(_)) => INTERNAL,
        BrokerError::Kafka(_) => FAILURE,
        BrokerError::Config(_) => USAGE,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn tool_error(context: &str, err: ToolError) -> CliError {
    match err {
        ToolError::Broker(err) => broker_error(context, err),
        ToolError::Encode(err) => CliError::new(INTERNAL, format!("{context}: {err}")),
        other => CliError::new(USAGE, format!("{context}: {other}")),
    }
}

pub fn schema_error(context: &str, err: SchemaError) -> CliError {
    let code = match err {
        SchemaError::LoadFailed(_) => FAILURE,
        SchemaError::CompileFailed { .. } | SchemaError::InvalidJson(_) => DATA_INVALID,
    };
    CliError::new(code, format!("{context}: {err}"))
}
