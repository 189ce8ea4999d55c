use std::io::IsTerminal;

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::exit::{CliError, CliResult, INTERNAL};

#[derive(Clone, Debug, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

/// Print any serializable result in `format`.
pub fn print<T: Serialize>(value: &T, format: OutputFormat) -> CliResult<()> {
    let value = serde_json::to_value(value)
        .map_err(|err| CliError::new(INTERNAL, format!("failed to encode output: {err}")))?;
    print_value(&value, format);
    Ok(())
}

pub fn print_value(value: &Value, format: OutputFormat) {
    match format {
        OutputFormat::Json => println!("{value}"),
        OutputFormat::Pretty => println!(
            "{}",
            serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
        ),
        OutputFormat::Table => println!("{}", render_table(value)),
    }
}

/// Arrays of objects become one row per element; a single object becomes
/// a field/value listing. Nested values are shown as compact JSON.
pub fn render_table(value: &Value) -> String {
    match value {
        Value::Array(items) if items.iter().all(Value::is_object) => {
            if items.is_empty() {
                return "(none)".to_string();
            }
            let columns = column_names(items);
            let mut table = new_table();
            table.set_header(columns.iter().map(|c| c.to_uppercase()));
            for item in items {
                table.add_row(columns.iter().map(|c| cell(item.get(c.as_str()))));
            }
            table.to_string()
        }
        Value::Object(fields) => {
            let mut table = new_table();
            table.set_header(vec!["FIELD", "VALUE"]);
            for (key, field) in fields {
                table.add_row(vec![key.clone(), cell(Some(field))]);
            }
            table.to_string()
        }
        other => cell(Some(other)),
    }
}

fn new_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Keys in first-seen order across all rows.
fn column_names(items: &[Value]) -> Vec<String> {
    let mut columns: Vec<String> = Vec::new();
    for fields in items.iter().filter_map(Value::as_object) {
        for key in fields.keys() {
            if !columns.iter().any(|c| c == key) {
                columns.push(key.clone());
            }
        }
    }
    columns
}

fn cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => "-".to_string(),
        Some(Value::String(text)) => text.clone(),
        Some(Value::Object(map)) if map.is_empty() => "-".to_string(),
        Some(other) => other.to_string(),
    }
}

/// Inspection results get a per-message table plus the summary line.
pub fn print_inspection(value: &Value, format: OutputFormat) {
    if format != OutputFormat::Table {
        print_value(value, format);
        return;
    }

    let empty = Vec::new();
    let messages = value["messages"].as_array().unwrap_or(&empty);
    let mut table = new_table();
    table.set_header(vec!["#", "STATUS", "TYPE", "ERRORS", "PAYLOAD"]);
    for (index, message) in messages.iter().enumerate() {
        let errors: Vec<String> = message["errors"]
            .as_array()
            .map(|errors| errors.iter().map(error_line).collect())
            .unwrap_or_default();
        table.add_row(vec![
            (index + 1).to_string(),
            cell(Some(&message["status"])),
            cell(message["message"]["properties"].get("type")),
            errors.join("\n"),
            cell(Some(&message["message"]["payload"])),
        ]);
    }
    println!("queue: {}", cell(Some(&value["queue"])));
    println!("{table}");
    println!("{}", summary_line(value["summary"].as_object()));
}

fn error_line(error: &Value) -> String {
    let path = error["path"].as_str().unwrap_or_default();
    let message = error["message"].as_str().unwrap_or_default();
    if path.is_empty() {
        message.to_string()
    } else {
        format!("{path}: {message}")
    }
}

fn summary_line(summary: Option<&Map<String, Value>>) -> String {
    let count = |key: &str| {
        summary
            .and_then(|s| s.get(key))
            .and_then(Value::as_u64)
            .unwrap_or(0)
    };
    format!(
        "total={} valid={} invalid={} noSchema={} skipped={}",
        count("total"),
        count("valid"),
        count("invalid"),
        count("noSchema"),
        count("skipped")
    )
}
