mod cmd;
mod exit;
mod logging;
mod output;

use clap::Parser;

use crate::cmd::{Command, ConnectionArgs, Context};
use crate::logging::{init_logging, LogArgs};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(
    name = "brokerlens",
    version,
    about = "Inspect, validate and publish across RabbitMQ and Kafka"
)]
struct Cli {
    /// Output format. Defaults to table on a terminal, json otherwise.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    #[command(flatten)]
    log: LogArgs,

    #[command(flatten)]
    connection: ConnectionArgs,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(&cli.log);

    let context = Context {
        format: cli.format.unwrap_or_else(OutputFormat::default_for_stdout),
        connection: cli.connection,
    };

    match cmd::run(cli.command, &context) {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}
