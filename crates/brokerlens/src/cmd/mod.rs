use std::path::PathBuf;

use clap::{Args, Subcommand};

use crate::exit::{CliError, CliResult, USAGE};

mod context;
pub mod health;
pub mod inspect;
pub mod publish;
pub mod schemas;
pub mod tools;
pub mod version;

pub use context::{block_on, BrokerKind, ConnectionArgs, Context};

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List the tool catalogue and which tools this broker supports.
    Tools(ToolsArgs),
    /// Invoke one tool with JSON arguments.
    Call(CallArgs),
    /// Peek messages and validate them against their schemas.
    Inspect(InspectArgs),
    /// Publish a JSON message, optionally validating it first.
    Publish(PublishArgs),
    /// Validate a payload against a schema without a broker.
    Validate(ValidateArgs),
    /// List loaded schemas, or show one.
    Schemas(SchemasArgs),
    /// Check broker health.
    Health(HealthArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, context: &Context) -> CliResult<i32> {
    match command {
        Command::Tools(args) => tools::list(args, context),
        Command::Call(args) => tools::call(args, context),
        Command::Inspect(args) => inspect::run(args, context),
        Command::Publish(args) => publish::run(args, context),
        Command::Validate(args) => schemas::validate(args, context),
        Command::Schemas(args) => schemas::show(args, context),
        Command::Health(args) => health::run(args, context),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct ToolsArgs {
    /// Include tools the broker does not support.
    #[arg(long)]
    pub all: bool,
}

#[derive(Args, Debug)]
pub struct CallArgs {
    /// Tool name, e.g. `list_queues`.
    pub tool: String,
    /// Tool arguments as a JSON object.
    #[arg(long, default_value = "{}")]
    pub args: String,
}

#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Queue (RabbitMQ) or topic (Kafka).
    pub queue: String,
    /// RabbitMQ vhost.
    #[arg(long, default_value = "/")]
    pub vhost: String,
    /// Messages to peek.
    #[arg(long, default_value_t = brokerlens::pipeline::DEFAULT_INSPECT_COUNT)]
    pub count: usize,
    /// Exit with status 60 when any message fails validation.
    #[arg(long)]
    pub strict: bool,
}

#[derive(Args, Debug)]
pub struct PublishArgs {
    /// Exchange (RabbitMQ, empty for the default exchange) or topic (Kafka).
    pub destination: String,
    /// Routing key, or the record key for Kafka.
    #[arg(long, default_value = "")]
    pub routing_key: String,
    /// JSON payload.
    #[arg(long, conflicts_with = "file")]
    pub payload: Option<String>,
    /// Read the payload from a file.
    #[arg(long, conflicts_with = "payload")]
    pub file: Option<PathBuf>,
    /// Declared message type; selects the validation schema.
    #[arg(long = "type", value_name = "TYPE")]
    pub message_type: Option<String>,
    #[arg(long)]
    pub correlation_id: Option<String>,
    /// Extra header, repeatable.
    #[arg(long = "header", value_name = "KEY=VALUE")]
    pub headers: Vec<String>,
    /// Validate against the `--type` schema and refuse to send on failure.
    #[arg(long)]
    pub validate: bool,
    /// RabbitMQ vhost.
    #[arg(long, default_value = "/")]
    pub vhost: String,
}

#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Schema name.
    #[arg(long)]
    pub schema: String,
    /// JSON payload.
    #[arg(long, conflicts_with = "file")]
    pub payload: Option<String>,
    /// Read the payload from a file.
    #[arg(long, conflicts_with = "payload")]
    pub file: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct SchemasArgs {
    /// Show this schema's document instead of listing.
    pub name: Option<String>,
}

#[derive(Args, Debug)]
pub struct HealthArgs {
    /// Give up after this long (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub timeout: String,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

/// The payload from `--payload` or `--file`.
pub fn read_payload(payload: Option<String>, file: Option<PathBuf>) -> CliResult<String> {
    match (payload, file) {
        (Some(payload), _) => Ok(payload),
        (None, Some(path)) => std::fs::read_to_string(&path).map_err(|err| {
            CliError::new(
                crate::exit::FAILURE,
                format!("failed to read {}: {err}", path.display()),
            )
        }),
        (None, None) => Err(CliError::new(USAGE, "one of --payload or --file is required")),
    }
}
