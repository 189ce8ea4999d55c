use brokerlens_broker::{BrokerAdapter, PublishParams, Result};
use brokerlens_schema::{SchemaValidator, ValidationError, ValidationResult};
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use tracing::{debug, info};

/// Whether validation ran before a publish, and how it went.
///
/// Serializes as `null` when not attempted, otherwise as
/// `{"valid": bool, "errors": [...]}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationOutcome {
    NotAttempted,
    Passed,
    Failed(Vec<ValidationError>),
}

impl ValidationOutcome {
    fn from_result(result: ValidationResult) -> Self {
        if result.valid {
            ValidationOutcome::Passed
        } else {
            ValidationOutcome::Failed(result.errors)
        }
    }

    pub fn as_result(&self) -> Option<ValidationResult> {
        match self {
            ValidationOutcome::NotAttempted => None,
            ValidationOutcome::Passed => Some(ValidationResult::passed()),
            ValidationOutcome::Failed(errors) => Some(ValidationResult::failed(errors.clone())),
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, ValidationOutcome::Failed(_))
    }
}

impl Serialize for ValidationOutcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.as_result().serialize(serializer)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PublishOutcome {
    pub published: bool,
    /// The broker's routed flag; false whenever nothing was sent.
    pub routed: bool,
    pub validation: ValidationOutcome,
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
}

impl PublishOutcome {
    fn rejected(validation: ValidationOutcome) -> Self {
        Self {
            published: false,
            routed: false,
            validation,
            metadata: Map::new(),
        }
    }
}

/// Publish `params.payload` to `params.destination`.
///
/// The payload must parse as JSON. When `params.validate` is set and a
/// message type is given, the payload must also pass that type's schema.
/// A rejected payload is returned as `published: false` and the adapter
/// is never called.
pub async fn publish_message(
    adapter: &dyn BrokerAdapter,
    validator: &SchemaValidator,
    params: &PublishParams,
) -> Result<PublishOutcome> {
    let payload = match serde_json::from_str::<Value>(&params.payload) {
        Ok(payload) => payload,
        Err(err) => {
            debug!(destination = %params.destination, error = %err, "payload is not JSON");
            let result = ValidationResult::invalid_json(&err);
            return Ok(PublishOutcome::rejected(ValidationOutcome::Failed(
                result.errors,
            )));
        }
    };

    let validation = match (params.validate, params.message_type.as_deref()) {
        (true, Some(message_type)) => {
            let outcome = if validator.has_schema(message_type) {
                ValidationOutcome::from_result(validator.validate(message_type, &payload))
            } else {
                ValidationOutcome::Failed(ValidationResult::schema_not_found(message_type).errors)
            };
            if outcome.is_failed() {
                debug!(
                    destination = %params.destination,
                    message_type = %message_type,
                    "payload rejected by validation"
                );
                return Ok(PublishOutcome::rejected(outcome));
            }
            outcome
        }
        _ => ValidationOutcome::NotAttempted,
    };

    let result = adapter.publish(params).await?;
    info!(
        broker = adapter.broker_name(),
        destination = %params.destination,
        routing_key = %params.routing_key,
        routed = result.routed,
        "message published"
    );
    Ok(PublishOutcome {
        published: result.published,
        routed: result.routed,
        validation,
        metadata: result.metadata,
    })
}
