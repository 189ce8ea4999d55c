use std::time::Duration;

use brokerlens::pipeline::check_health;

use crate::cmd::{block_on, Context, HealthArgs};
use crate::exit::{CliError, CliResult, HEALTH_CHECK_FAILED, SUCCESS, USAGE};
use crate::output::print;

/// Exits 30 when the broker is not healthy.
pub fn run(args: HealthArgs, context: &Context) -> CliResult<i32> {
    let timeout = parse_timeout(&args.timeout)?;
    let registry = context.registry()?;
    let status = block_on(async {
        let status = check_health(registry.adapter(), Some(timeout)).await;
        registry.shutdown().await;
        status
    })?;

    print(&status, context.format)?;
    Ok(if status.healthy {
        SUCCESS
    } else {
        HEALTH_CHECK_FAILED
    })
}

fn parse_timeout(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "timeout must not be empty"));
    }

    let (number, millis) = match input.strip_suffix("ms") {
        Some(number) => (number, true),
        None => (input.strip_suffix('s').unwrap_or(input), false),
    };
    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid timeout value: {input}")))?;
    if value == 0 {
        return Err(CliError::new(USAGE, "timeout must be greater than zero"));
    }

    Ok(if millis {
        Duration::from_millis(value)
    } else {
        Duration::from_secs(value)
    })
}
