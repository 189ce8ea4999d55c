use brokerlens_schema::{SchemaValidator, ValidationResult};
use serde_json::Value;

/// Parse `payload` and validate it against `schema_name`.
///
/// A payload that is not JSON yields a single "invalid JSON" error.
pub fn validate_message(
    validator: &SchemaValidator,
    schema_name: &str,
    payload: &str,
) -> ValidationResult {
    match serde_json::from_str::<Value>(payload) {
        Ok(value) => validator.validate(schema_name, &value),
        Err(err) => ValidationResult::invalid_json(&err),
    }
}
