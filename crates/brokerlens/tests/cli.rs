#![cfg(feature = "cli")]

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use serde_json::Value;

fn unique_temp_dir(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "brokerlens-{tag}-{}-{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time should be after epoch")
            .as_nanos()
    ));
    std::fs::create_dir_all(&dir).expect("temp dir should be creatable");
    dir
}

fn schema_dir(tag: &str) -> PathBuf {
    let dir = unique_temp_dir(tag);
    std::fs::write(
        dir.join("order.created.schema.json"),
        r#"{
            "$id": "order.created",
            "title": "Order created",
            "version": "1.2.0",
            "x-category": "orders",
            "type": "object",
            "required": ["orderId", "amount"],
            "properties": {
                "orderId": { "type": "string" },
                "amount": { "type": "number" }
            }
        }"#,
    )
    .expect("schema should be writable");
    std::fs::write(dir.join("broken.json"), "{ not json").expect("file should be writable");
    dir
}

fn brokerlens(args: &[&str], schemas: Option<&Path>) -> Output {
    let mut command = Command::new(env!("CARGO_BIN_EXE_brokerlens"));
    command
        .env_remove("BROKERLENS_BROKER")
        .env_remove("BROKERLENS_SCHEMA_DIR")
        .args(["--log-level", "error", "--format", "json"]);
    if let Some(dir) = schemas {
        command.arg("--schema-dir").arg(dir);
    }
    command.args(args).output().expect("brokerlens should run")
}

fn stdout_json(output: &Output) -> Value {
    serde_json::from_slice(&output.stdout).expect("stdout should be JSON")
}

#[test]
fn version_prints_package_version() {
    let output = brokerlens(&["version"], None);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(
        stdout.trim(),
        format!("brokerlens {}", env!("CARGO_PKG_VERSION"))
    );
}

#[test]
fn validate_accepts_conforming_payload() {
    let dir = schema_dir("validate-ok");
    let output = brokerlens(
        &[
            "validate",
            "--schema",
            "order.created",
            "--payload",
            r#"{"orderId":"ORD-1","amount":10}"#,
        ],
        Some(&dir),
    );
    assert!(output.status.success());
    assert_eq!(stdout_json(&output)["valid"], true);
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn validate_rejection_exits_60_with_errors() {
    let dir = schema_dir("validate-bad");
    let output = brokerlens(
        &[
            "validate",
            "--schema",
            "order.created",
            "--payload",
            r#"{"orderId":"ORD-1"}"#,
        ],
        Some(&dir),
    );
    assert_eq!(output.status.code(), Some(60));
    let result = stdout_json(&output);
    assert_eq!(result["valid"], false);
    assert!(!result["errors"].as_array().unwrap().is_empty());
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn validate_reports_invalid_json_as_data() {
    let dir = schema_dir("validate-json");
    let output = brokerlens(
        &["validate", "--schema", "order.created", "--payload", "{oops"],
        Some(&dir),
    );
    assert_eq!(output.status.code(), Some(60));
    let result = stdout_json(&output);
    assert_eq!(result["errors"].as_array().unwrap().len(), 1);
    assert!(result["errors"][0]["message"]
        .as_str()
        .unwrap()
        .contains("invalid JSON"));
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn schemas_lists_loaded_documents_and_skips_broken_files() {
    let dir = schema_dir("schemas");
    let output = brokerlens(&["schemas"], Some(&dir));
    assert!(output.status.success());
    let schemas = stdout_json(&output);
    let schemas = schemas.as_array().unwrap();
    assert_eq!(schemas.len(), 1);
    assert_eq!(schemas[0]["name"], "order.created");
    assert_eq!(schemas[0]["version"], "1.2.0");

    let output = brokerlens(&["schemas", "order.created"], Some(&dir));
    assert!(output.status.success());
    assert_eq!(stdout_json(&output)["schema"]["x-category"], "orders");

    let output = brokerlens(&["schemas", "missing"], Some(&dir));
    assert_eq!(output.status.code(), Some(1));
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn tools_without_broker_lists_full_catalogue() {
    let output = brokerlens(&["tools"], None);
    assert!(output.status.success());
    let tools = stdout_json(&output);
    let tools = tools.as_array().unwrap();
    assert_eq!(tools.len(), 23);
    assert!(tools.iter().all(|t| t["available"].is_null()));
}

#[test]
fn kafka_tools_omit_connections_and_topology() {
    let output = brokerlens(&["--broker", "kafka", "tools"], None);
    assert!(output.status.success());
    let tools = stdout_json(&output);
    let names: Vec<&str> = tools
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|t| t["name"].as_str())
        .collect();
    assert!(names.contains(&"list_consumer_groups"));
    assert!(names.contains(&"get_overview"));
    assert!(!names.contains(&"list_connections"));
    assert!(!names.contains(&"create_binding"));

    let output = brokerlens(&["--broker", "kafka", "tools", "--all"], None);
    let tools = stdout_json(&output);
    let connections = tools
        .as_array()
        .unwrap()
        .iter()
        .find(|t| t["name"] == "list_connections")
        .unwrap()
        .clone();
    assert_eq!(connections["available"], false);
}

#[test]
fn rejected_publish_exits_60_before_contacting_the_broker() {
    let dir = schema_dir("publish");
    // Nothing listens here; a send attempt would fail with a transport error.
    let output = brokerlens(
        &[
            "--broker",
            "rabbitmq",
            "--rabbitmq-url",
            "http://127.0.0.1:9",
            "publish",
            "amq.topic",
            "--routing-key",
            "test.order",
            "--type",
            "order.created",
            "--validate",
            "--payload",
            r#"{"orderId":"ORD-1"}"#,
        ],
        Some(&dir),
    );
    assert_eq!(output.status.code(), Some(60));
    let outcome = stdout_json(&output);
    assert_eq!(outcome["published"], false);
    assert_eq!(outcome["validation"]["valid"], false);
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn broker_commands_require_a_broker() {
    let output = brokerlens(&["health"], None);
    assert_eq!(output.status.code(), Some(64));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("no broker selected"));
}

#[test]
fn unknown_tool_is_a_usage_error() {
    let output = brokerlens(&["--broker", "kafka", "call", "drop_everything"], None);
    assert_eq!(output.status.code(), Some(64));
}
