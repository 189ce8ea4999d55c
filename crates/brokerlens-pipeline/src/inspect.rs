use brokerlens_broker::{BrokerAdapter, Message, PayloadEncoding, Result};
use brokerlens_schema::{SchemaValidator, ValidationError, ValidationResult};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

/// How one inspected message fared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum InspectStatus {
    Valid,
    Invalid,
    /// No declared type, or no schema for the declared type.
    NoSchema,
    /// Binary payload; validation not attempted.
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InspectedMessage {
    pub message: Message,
    pub status: InspectStatus,
    /// Schema the payload was checked against.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ValidationError>,
}

/// Per-status counts. `valid + invalid + no_schema + skipped == total`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct InspectSummary {
    pub total: usize,
    pub valid: usize,
    pub invalid: usize,
    #[serde(rename = "noSchema")]
    pub no_schema: usize,
    pub skipped: usize,
}

impl InspectSummary {
    fn record(&mut self, status: InspectStatus) {
        self.total += 1;
        match status {
            InspectStatus::Valid => self.valid += 1,
            InspectStatus::Invalid => self.invalid += 1,
            InspectStatus::NoSchema => self.no_schema += 1,
            InspectStatus::Skipped => self.skipped += 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InspectResult {
    pub queue: String,
    pub messages: Vec<InspectedMessage>,
    pub summary: InspectSummary,
}

/// Peek up to `count` messages from `queue` and validate each one against
/// the schema named by its declared type.
pub async fn inspect_queue(
    adapter: &dyn BrokerAdapter,
    validator: &SchemaValidator,
    vhost: &str,
    queue: &str,
    count: usize,
) -> Result<InspectResult> {
    let peeked = adapter.peek_messages(vhost, queue, count).await?;

    let mut summary = InspectSummary::default();
    let messages: Vec<InspectedMessage> = peeked
        .into_iter()
        .map(|message| {
            let inspected = inspect_message(validator, message);
            summary.record(inspected.status);
            inspected
        })
        .collect();

    debug!(
        queue = %queue,
        total = summary.total,
        valid = summary.valid,
        invalid = summary.invalid,
        no_schema = summary.no_schema,
        skipped = summary.skipped,
        "queue inspected"
    );
    Ok(InspectResult {
        queue: queue.to_string(),
        messages,
        summary,
    })
}

fn inspect_message(validator: &SchemaValidator, message: Message) -> InspectedMessage {
    if message.payload_encoding == PayloadEncoding::Base64 {
        return verdict(message, InspectStatus::Skipped, None, Vec::new());
    }

    let payload = match serde_json::from_str::<Value>(&message.payload) {
        Ok(payload) => payload,
        Err(err) => {
            let errors = ValidationResult::invalid_json(&err).errors;
            return verdict(message, InspectStatus::Invalid, None, errors);
        }
    };

    let Some(schema) = message.properties.message_type.clone() else {
        return verdict(message, InspectStatus::NoSchema, None, Vec::new());
    };
    if !validator.has_schema(&schema) {
        let errors = ValidationResult::schema_not_found(&schema).errors;
        return verdict(message, InspectStatus::NoSchema, Some(schema), errors);
    }

    let result = validator.validate(&schema, &payload);
    let status = if result.valid {
        InspectStatus::Valid
    } else {
        InspectStatus::Invalid
    };
    verdict(message, status, Some(schema), result.errors)
}

fn verdict(
    message: Message,
    status: InspectStatus,
    schema: Option<String>,
    errors: Vec<ValidationError>,
) -> InspectedMessage {
    InspectedMessage {
        message,
        status,
        schema,
        errors,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::fake::{binary_message, order_validator, text_message, FakeAdapter};

    fn assert_sums(summary: &InspectSummary) {
        assert_eq!(
            summary.valid + summary.invalid + summary.no_schema + summary.skipped,
            summary.total
        );
    }

    #[tokio::test]
    async fn valid_invalid_and_untyped_are_counted() {
        let adapter = FakeAdapter::with_messages(vec![
            text_message(r#"{"orderId":"ORD-1","amount":10}"#, Some("order.created")),
            text_message(r#"{"orderId":"ORD-2"}"#, Some("order.created")),
            text_message(r#"{"note":"hello"}"#, None),
        ]);
        let result = inspect_queue(&adapter, &order_validator(), "/", "orders", 10)
            .await
            .unwrap();

        assert_eq!(result.queue, "orders");
        assert_eq!(
            result.summary,
            InspectSummary {
                total: 3,
                valid: 1,
                invalid: 1,
                no_schema: 1,
                skipped: 0,
            }
        );
        assert_sums(&result.summary);
        assert!(result.messages[1].errors[0].message.contains("amount"));
        assert!(result.messages[2].errors.is_empty());
    }

    #[tokio::test]
    async fn binary_bad_json_and_unknown_type() {
        let adapter = FakeAdapter::with_messages(vec![
            binary_message(),
            text_message("{not json", Some("order.created")),
            text_message("{}", Some("payment.failed")),
        ]);
        let result = inspect_queue(&adapter, &order_validator(), "/", "orders", 10)
            .await
            .unwrap();

        let statuses: Vec<InspectStatus> = result.messages.iter().map(|m| m.status).collect();
        assert_eq!(
            statuses,
            vec![
                InspectStatus::Skipped,
                InspectStatus::Invalid,
                InspectStatus::NoSchema
            ]
        );
        assert_sums(&result.summary);
        assert!(result.messages[1].errors[0].message.contains("invalid JSON"));
        assert_eq!(
            result.messages[2].errors[0].message,
            "schema not found: payment.failed"
        );
    }

    #[tokio::test]
    async fn count_limits_the_peek() {
        let adapter = FakeAdapter::with_messages(vec![
            text_message("{}", None),
            text_message("{}", None),
            text_message("{}", None),
        ]);
        let result = inspect_queue(&adapter, &order_validator(), "/", "orders", 2)
            .await
            .unwrap();
        assert_eq!(result.summary.total, 2);
        assert_sums(&result.summary);
    }

    #[tokio::test]
    async fn summary_serializes_no_schema_in_camel_case() {
        let adapter = FakeAdapter::with_messages(vec![text_message("{}", None)]);
        let result = inspect_queue(&adapter, &order_validator(), "/", "orders", 5)
            .await
            .unwrap();
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(
            value["summary"],
            json!({"total": 1, "valid": 0, "invalid": 0, "noSchema": 1, "skipped": 0})
        );
        assert_eq!(value["messages"][0]["status"], "noSchema");
    }
}
