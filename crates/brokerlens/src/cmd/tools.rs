use brokerlens::ToolRegistry;
use serde::Serialize;
use serde_json::Value;

use crate::cmd::{block_on, CallArgs, Context, ToolsArgs};
use crate::exit::{tool_error, CliError, CliResult, SUCCESS, USAGE};
use crate::output::{print, print_inspection};

#[derive(Serialize)]
struct ToolRow {
    name: &'static str,
    capability: Option<String>,
    /// Unknown when no broker is configured.
    available: Option<bool>,
    description: &'static str,
}

/// Print the catalogue. Without a configured broker every tool is listed
/// with unknown availability.
pub fn list(args: ToolsArgs, context: &Context) -> CliResult<i32> {
    let registry = match context.connection.broker {
        Some(_) => Some(context.registry()?),
        None => None,
    };

    let rows: Vec<ToolRow> = ToolRegistry::catalogue()
        .iter()
        .map(|spec| ToolRow {
            name: spec.name,
            capability: spec.capability.map(|c| c.to_string()),
            available: registry.as_ref().map(|r| r.is_available(spec)),
            description: spec.description,
        })
        .filter(|row| args.all || row.available != Some(false))
        .collect();

    if let Some(registry) = &registry {
        block_on(registry.shutdown())?;
    }
    print(&rows, context.format)?;
    Ok(SUCCESS)
}

pub fn call(args: CallArgs, context: &Context) -> CliResult<i32> {
    let tool_args: Value = serde_json::from_str(&args.args)
        .map_err(|err| CliError::new(USAGE, format!("--args is not valid JSON: {err}")))?;
    if !tool_args.is_object() && !tool_args.is_null() {
        return Err(CliError::new(USAGE, "--args must be a JSON object"));
    }
    if ToolRegistry::spec(&args.tool).is_none() {
        return Err(CliError::new(USAGE, format!("unknown tool: {}", args.tool)));
    }

    let registry = context.registry()?;
    let outcome = block_on(async {
        let outcome = registry.invoke(&args.tool, tool_args).await;
        registry.shutdown().await;
        outcome
    })?;
    let value = outcome.map_err(|err| tool_error(&args.tool, err))?;

    if args.tool == "inspect_queue" {
        print_inspection(&value, context.format);
    } else {
        print(&value, context.format)?;
    }
    Ok(SUCCESS)
}
