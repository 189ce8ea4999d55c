use brokerlens::pipeline::inspect_queue;

use crate::cmd::{block_on, Context, InspectArgs};
use crate::exit::{broker_error, CliError, CliResult, DATA_INVALID, INTERNAL, SUCCESS};
use crate::output::print_inspection;

pub fn run(args: InspectArgs, context: &Context) -> CliResult<i32> {
    let registry = context.registry()?;
    let outcome = block_on(async {
        let outcome = inspect_queue(
            registry.adapter(),
            registry.validator(),
            &args.vhost,
            &args.queue,
            args.count,
        )
        .await;
        registry.shutdown().await;
        outcome
    })?;
    let result = outcome.map_err(|err| broker_error("inspect failed", err))?;

    let value = serde_json::to_value(&result)
        .map_err(|err| CliError::new(INTERNAL, format!("failed to encode output: {err}")))?;
    print_inspection(&value, context.format);

    if args.strict && result.summary.invalid > 0 {
        return Ok(DATA_INVALID);
    }
    Ok(SUCCESS)
}
