use std::collections::HashMap;

use jsonschema::{Draft, Validator};
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::{CompileStrategy, SchemaConfig};
use crate::entry::{SchemaEntry, ValidationError, ValidationResult};
use crate::error::{Result, SchemaError};
use crate::strip::strip_unknown_keywords;

/// Name-keyed registry of compiled JSON Schema validators.
///
/// Entries keep their load order. A schema that fails to compile is kept
/// out of the registry and reported by [`SchemaValidator::quarantined`];
/// the remaining schemas load and validate normally.
pub struct SchemaValidator {
    entries: Vec<SchemaEntry>,
    validators: HashMap<String, Validator>,
    quarantined: Vec<String>,
    config: SchemaConfig,
}

impl SchemaValidator {
    /// Create an empty validator with default config.
    pub fn empty() -> Self {
        Self::with_config(Vec::new(), SchemaConfig::default())
    }

    /// Compile `entries` with the default strategy.
    pub fn new(entries: Vec<SchemaEntry>) -> Self {
        Self::with_config(entries, SchemaConfig::default())
    }

    /// Compile `entries`, quarantining every schema that fails to compile.
    pub fn with_config(entries: Vec<SchemaEntry>, config: SchemaConfig) -> Self {
        let mut validator = Self {
            entries: Vec::with_capacity(entries.len()),
            validators: HashMap::with_capacity(entries.len()),
            quarantined: Vec::new(),
            config,
        };
        for entry in entries {
            let name = entry.name.clone();
            if let Err(err) = validator.register(entry) {
                warn!(schema = %name, error = %err, "quarantining schema");
                validator.quarantined.push(name);
            }
        }
        debug!(
            loaded = validator.entries.len(),
            quarantined = validator.quarantined.len(),
            "schemas compiled"
        );
        validator
    }

    /// Compile and add one schema, replacing any schema with the same name.
    pub fn register(&mut self, entry: SchemaEntry) -> Result<()> {
        let compiled = compile(&entry, self.config.strategy)?;
        self.validators.insert(entry.name.clone(), compiled);
        match self.entries.iter_mut().find(|e| e.name == entry.name) {
            Some(existing) => *existing = entry,
            None => self.entries.push(entry),
        }
        Ok(())
    }

    /// Validate `payload` against the schema called `name`.
    ///
    /// Every violation is reported, not just the first. An unknown name
    /// yields a failed result rather than an error.
    pub fn validate(&self, name: &str, payload: &Value) -> ValidationResult {
        let Some(validator) = self.validators.get(name) else {
            return ValidationResult::schema_not_found(name);
        };

        let errors: Vec<ValidationError> = validator
            .iter_errors(payload)
            .map(|err| ValidationError::new(err.instance_path().as_str(), err.to_string()))
            .collect();
        if errors.is_empty() {
            ValidationResult::passed()
        } else {
            ValidationResult::failed(errors)
        }
    }

    pub fn has_schema(&self, name: &str) -> bool {
        self.validators.contains_key(name)
    }

    /// Names of the loaded schemas, in load order.
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.name.as_str()).collect()
    }

    pub fn get(&self, name: &str) -> Option<&SchemaEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    pub fn entries(&self) -> &[SchemaEntry] {
        &self.entries
    }

    /// Names of schemas that failed to compile.
    pub fn quarantined(&self) -> &[String] {
        &self.quarantined
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn config(&self) -> &SchemaConfig {
        &self.config
    }
}

impl Default for SchemaValidator {
    fn default() -> Self {
        Self::empty()
    }
}

impl std::fmt::Debug for SchemaValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaValidator")
            .field("schemas", &self.names())
            .field("quarantined", &self.quarantined)
            .field("config", &self.config)
            .finish()
    }
}

fn compile(entry: &SchemaEntry, strategy: CompileStrategy) -> Result<Validator> {
    let compiled = match strategy {
        CompileStrategy::StripUnknownKeywords => {
            let mut document = entry.schema.clone();
            strip_unknown_keywords(&mut document);
            build(&document)
        }
        CompileStrategy::Quarantine => build(&entry.schema),
    };
    compiled.map_err(|err| SchemaError::CompileFailed {
        name: entry.name.clone(),
        message: err.to_string(),
    })
}

fn build(document: &Value) -> std::result::Result<Validator, jsonschema::ValidationError<'static>> {
    jsonschema::options().with_draft(Draft::Draft7).build(document)
}
