use std::future::Future;
use std::path::PathBuf;

use brokerlens::broker::{create_adapter, BrokerConfig};
use brokerlens::kafka::{KafkaConfig, KafkaSaslConfig, SaslMechanism};
use brokerlens::rabbitmq::RabbitConfig;
use brokerlens::schema::{load_schema_dir, CompileStrategy, SchemaConfig, SchemaValidator};
use brokerlens::ToolRegistry;
use clap::{Args, ValueEnum};
use tracing::info;

use crate::exit::{broker_error, schema_error, CliError, CliResult, INTERNAL, USAGE};
use crate::output::OutputFormat;

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum BrokerKind {
    Rabbitmq,
    Kafka,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum SchemaStrategy {
    /// Compile as-is and skip schemas that fail.
    Quarantine,
    /// Drop non-standard keywords before compiling.
    Strip,
}

impl From<SchemaStrategy> for CompileStrategy {
    fn from(strategy: SchemaStrategy) -> Self {
        match strategy {
            SchemaStrategy::Quarantine => CompileStrategy::Quarantine,
            SchemaStrategy::Strip => CompileStrategy::StripUnknownKeywords,
        }
    }
}

/// Broker connection and schema settings, from flags or the environment.
#[derive(Args, Debug, Clone)]
pub struct ConnectionArgs {
    /// Broker to talk to.
    #[arg(long, env = "BROKERLENS_BROKER", value_name = "BROKER", global = true)]
    pub broker: Option<BrokerKind>,

    /// RabbitMQ management API base URL.
    #[arg(
        long,
        env = "RABBITMQ_URL",
        default_value = "http://localhost:15672",
        global = true
    )]
    pub rabbitmq_url: String,

    #[arg(long, env = "RABBITMQ_USERNAME", default_value = "guest", global = true)]
    pub rabbitmq_username: String,

    #[arg(
        long,
        env = "RABBITMQ_PASSWORD",
        default_value = "guest",
        hide_env_values = true,
        hide_default_value = true,
        global = true
    )]
    pub rabbitmq_password: String,

    /// Kafka bootstrap servers, comma-separated.
    #[arg(
        long,
        env = "KAFKA_BROKERS",
        value_delimiter = ',',
        default_value = "localhost:9092",
        global = true
    )]
    pub kafka_brokers: Vec<String>,

    #[arg(long, env = "KAFKA_CLIENT_ID", global = true)]
    pub kafka_client_id: Option<String>,

    /// plain, scram-sha-256 or scram-sha-512.
    #[arg(long, env = "KAFKA_SASL_MECHANISM", global = true)]
    pub kafka_sasl_mechanism: Option<String>,

    #[arg(long, env = "KAFKA_SASL_USERNAME", global = true)]
    pub kafka_sasl_username: Option<String>,

    #[arg(long, env = "KAFKA_SASL_PASSWORD", hide_env_values = true, global = true)]
    pub kafka_sasl_password: Option<String>,

    /// Use TLS towards the Kafka brokers.
    #[arg(long, env = "KAFKA_SSL", global = true)]
    pub kafka_ssl: bool,

    /// Directory of JSON Schema files.
    #[arg(long, env = "BROKERLENS_SCHEMA_DIR", value_name = "DIR", global = true)]
    pub schema_dir: Option<PathBuf>,

    #[arg(long, value_name = "STRATEGY", default_value = "quarantine", global = true)]
    pub schema_strategy: SchemaStrategy,
}

impl ConnectionArgs {
    pub fn broker_config(&self) -> CliResult<BrokerConfig> {
        let kind = self.broker.ok_or_else(|| {
            CliError::new(
                USAGE,
                "no broker selected; pass --broker or set BROKERLENS_BROKER",
            )
        })?;
        match kind {
            BrokerKind::Rabbitmq => Ok(BrokerConfig::Rabbitmq(RabbitConfig {
                url: self.rabbitmq_url.clone(),
                username: self.rabbitmq_username.clone(),
                password: self.rabbitmq_password.clone(),
            })),
            BrokerKind::Kafka => {
                let mut config = KafkaConfig::new(self.kafka_brokers.clone());
                config.client_id = self.kafka_client_id.clone();
                config.ssl = self.kafka_ssl;
                config.sasl = self.kafka_sasl()?;
                Ok(BrokerConfig::Kafka(config))
            }
        }
    }

    fn kafka_sasl(&self) -> CliResult<Option<KafkaSaslConfig>> {
        let Some(mechanism) = &self.kafka_sasl_mechanism else {
            return Ok(None);
        };
        let mechanism: SaslMechanism = mechanism
            .parse()
            .map_err(|err| CliError::new(USAGE, format!("{err}")))?;
        match (&self.kafka_sasl_username, &self.kafka_sasl_password) {
            (Some(username), Some(password)) => Ok(Some(KafkaSaslConfig {
                mechanism,
                username: username.clone(),
                password: password.clone(),
            })),
            _ => Err(CliError::new(
                USAGE,
                "SASL needs both --kafka-sasl-username and --kafka-sasl-password",
            )),
        }
    }

    pub fn schema_config(&self) -> SchemaConfig {
        SchemaConfig {
            strategy: self.schema_strategy.into(),
            ..SchemaConfig::default()
        }
    }
}

pub struct Context {
    pub format: OutputFormat,
    pub connection: ConnectionArgs,
}

impl Context {
    /// Load and compile the schema directory, if one is configured.
    ///
    /// Runs before any async runtime exists: compilation may resolve remote
    /// references with a blocking HTTP client.
    pub fn validator(&self) -> CliResult<SchemaValidator> {
        let config = self.connection.schema_config();
        let Some(dir) = &self.connection.schema_dir else {
            return Ok(SchemaValidator::with_config(Vec::new(), config));
        };
        let entries = load_schema_dir(dir, &config)
            .map_err(|err| schema_error("failed to load schemas", err))?;
        let validator = SchemaValidator::with_config(entries, config);
        info!(
            dir = %dir.display(),
            loaded = validator.len(),
            quarantined = validator.quarantined().len(),
            "schemas loaded"
        );
        Ok(validator)
    }

    /// Adapter plus validator. No connection is opened yet.
    pub fn registry(&self) -> CliResult<ToolRegistry> {
        let validator = self.validator()?;
        let config = self.connection.broker_config()?;
        let adapter =
            create_adapter(&config).map_err(|err| broker_error("invalid broker settings", err))?;
        Ok(ToolRegistry::new(adapter, validator))
    }
}

/// Drive `future` to completion on a fresh multi-thread runtime.
pub fn block_on<F: Future>(future: F) -> CliResult<F::Output> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| CliError::new(INTERNAL, format!("failed to start runtime: {err}")))?;
    Ok(runtime.block_on(future))
}
