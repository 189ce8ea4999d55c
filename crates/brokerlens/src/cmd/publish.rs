use brokerlens::broker::PublishParams;
use brokerlens::pipeline::publish_message;
use serde_json::{Map, Value};

use crate::cmd::{block_on, read_payload, Context, PublishArgs};
use crate::exit::{broker_error, CliError, CliResult, DATA_INVALID, SUCCESS, USAGE};
use crate::output::print;

pub fn run(args: PublishArgs, context: &Context) -> CliResult<i32> {
    let payload = read_payload(args.payload, args.file)?;
    let headers = parse_headers(&args.headers)?;

    let mut params = PublishParams::new(args.destination, payload);
    params.routing_key = args.routing_key;
    params.message_type = args.message_type;
    params.correlation_id = args.correlation_id;
    params.headers = (!headers.is_empty()).then_some(headers);
    params.validate = args.validate;
    params.scope = args.vhost;

    let registry = context.registry()?;
    let outcome = block_on(async {
        let outcome = publish_message(registry.adapter(), registry.validator(), &params).await;
        registry.shutdown().await;
        outcome
    })?;
    let outcome = outcome.map_err(|err| broker_error("publish failed", err))?;

    print(&outcome, context.format)?;
    if !outcome.published {
        return Ok(DATA_INVALID);
    }
    Ok(SUCCESS)
}

/// `KEY=VALUE` pairs into a header map. Later keys win.
fn parse_headers(raw: &[String]) -> CliResult<Map<String, Value>> {
    let mut headers = Map::new();
    for pair in raw {
        let (key, value) = pair
            .split_once('=')
            .filter(|(key, _)| !key.is_empty())
            .ok_or_else(|| CliError::new(USAGE, format!("header must be KEY=VALUE: {pair}")))?;
        headers.insert(key.to_string(), Value::String(value.to_string()));
    }
    Ok(headers)
}
