use brokerlens::pipeline::validate_message;

use crate::cmd::{read_payload, Context, SchemasArgs, ValidateArgs};
use crate::exit::{CliError, CliResult, DATA_INVALID, FAILURE, SUCCESS};
use crate::output::print;

/// Validate a payload offline. Exits 60 when it does not conform.
pub fn validate(args: ValidateArgs, context: &Context) -> CliResult<i32> {
    let payload = read_payload(args.payload, args.file)?;
    let validator = context.validator()?;
    let result = validate_message(&validator, &args.schema, &payload);
    print(&result, context.format)?;
    Ok(if result.valid { SUCCESS } else { DATA_INVALID })
}

pub fn show(args: SchemasArgs, context: &Context) -> CliResult<i32> {
    let validator = context.validator()?;
    match args.name {
        Some(name) => {
            let entry = validator
                .get(&name)
                .ok_or_else(|| CliError::new(FAILURE, format!("schema not found: {name}")))?;
            print(entry, context.format)?;
        }
        None => {
            let rows: Vec<serde_json::Value> = validator
                .entries()
                .iter()
                .map(|entry| {
                    serde_json::json!({
                        "name": entry.name,
                        "version": entry.version,
                        "title": entry.title,
                    })
                })
                .collect();
            print(&rows, context.format)?;
            for name in validator.quarantined() {
                tracing::warn!(schema = %name, "schema quarantined");
            }
        }
    }
    Ok(SUCCESS)
}
