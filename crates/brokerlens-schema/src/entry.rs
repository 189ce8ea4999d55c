use serde::Serialize;
use serde_json::Value;

/// Version assumed for schema documents that do not declare one.
pub const DEFAULT_SCHEMA_VERSION: &str = "1.0.0";

/// A loaded JSON Schema document and its catalogue details.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchemaEntry {
    /// Unique identifier; payloads select a schema by this name.
    pub name: String,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub schema: Value,
}

impl SchemaEntry {
    pub fn new(name: impl Into<String>, schema: Value) -> Self {
        let version = string_field(&schema, "version")
            .unwrap_or_else(|| DEFAULT_SCHEMA_VERSION.to_string());
        Self {
            name: name.into(),
            version,
            title: string_field(&schema, "title"),
            description: string_field(&schema, "description"),
            schema,
        }
    }

    /// Build an entry named after the document's `$id`, or `fallback_name`
    /// when it has none.
    pub fn from_document(fallback_name: &str, schema: Value) -> Self {
        let name = string_field(&schema, "$id").unwrap_or_else(|| fallback_name.to_string());
        Self::new(name, schema)
    }
}

fn string_field(schema: &Value, key: &str) -> Option<String> {
    schema
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// One schema violation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    /// JSON pointer to the offending value; empty for the document root.
    pub path: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Outcome of validating one payload against one schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<ValidationError>,
}

impl ValidationResult {
    pub fn passed() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
        }
    }

    pub fn failed(errors: Vec<ValidationError>) -> Self {
        Self {
            valid: false,
            errors,
        }
    }

    /// The single-error result for a name with no loaded schema.
    pub fn schema_not_found(name: &str) -> Self {
        Self::failed(vec![ValidationError::new(
            "",
            format!("schema not found: {name}"),
        )])
    }

    /// The single-error result for a payload that does not parse.
    pub fn invalid_json(err: &serde_json::Error) -> Self {
        Self::failed(vec![ValidationError::new(
            "",
            format!("invalid JSON: {err}"),
        )])
    }
}
