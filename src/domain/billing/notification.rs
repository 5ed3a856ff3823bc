//! Inbound processor notification payload.
//!
//! Only the fields the reconciliation flow reads are extracted; the raw JSON
//! is kept for the ledger.

use serde_json::Value;

use crate::domain::foundation::ValidationError;

/// Parsed webhook notification body.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentNotification {
    /// `type`, or the legacy `topic` field.
    pub event_type: String,
    pub action: Option<String>,
    /// `data.id`: the processor's payment id.
    pub external_id: Option<String>,
    pub external_reference: Option<String>,
    pub metadata: Option<Value>,
    /// Self-reported status; never used when the gateway returns one.
    pub status: Option<String>,
    pub raw: Value,
}

impl PaymentNotification {
    /// Parses a notification body.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the body is not a JSON object.
    pub fn parse(body: &[u8]) -> Result<Self, ValidationError> {
        let raw: Value = serde_json::from_slice(body)
            .map_err(|e| ValidationError::invalid_format("body", e.to_string()))?;
        Self::from_value(raw)
    }

    pub fn from_value(raw: Value) -> Result<Self, ValidationError> {
        if !raw.is_object() {
            return Err(ValidationError::invalid_format("body", "expected a JSON object"));
        }

        let event_type = string_field(&raw, "type")
            .or_else(|| string_field(&raw, "topic"))
            .unwrap_or_default();
        let external_id = raw
            .get("data")
            .and_then(|data| scalar_string(data.get("id")))
            .or_else(|| resource_id(&raw));
        let status = string_field(&raw, "status")
            .or_else(|| raw.get("data").and_then(|d| string_field(d, "status")));

        Ok(Self {
            event_type,
            action: string_field(&raw, "action"),
            external_id,
            external_reference: string_field(&raw, "external_reference"),
            metadata: raw.get("metadata").filter(|m| m.is_object()).cloned(),
            status,
            raw,
        })
    }

    /// Returns true if the notification concerns a payment.
    pub fn is_payment_related(&self) -> bool {
        self.event_type.eq_ignore_ascii_case("payment")
            || self
                .action
                .as_deref()
                .map_or(false, |a| a.to_ascii_lowercase().starts_with("payment."))
    }

    /// `metadata.payment_id`, if the payload carries one.
    pub fn metadata_payment_id(&self) -> Option<String> {
        self.metadata
            .as_ref()
            .and_then(|m| scalar_string(m.get("payment_id")))
    }
}

fn string_field(value: &Value, key: &str) -> Option<String> {
    scalar_string(value.get(key))
}

/// Accepts ids sent either as strings or as numbers.
fn scalar_string(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Legacy feed notifications carry `resource: ".../payments/<id>"` instead of `data.id`.
fn resource_id(raw: &Value) -> Option<String> {
    let resource = string_field(raw, "resource")?;
    resource
        .rsplit('/')
        .next()
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_payment_notification() {
        let body = json!({
            "type": "payment",
            "action": "payment.updated",
            "data": { "id": "123456" },
            "external_reference": "ref-1",
            "metadata": { "payment_id": "p-1", "business_id": "b-1" }
        });
        let n = PaymentNotification::parse(body.to_string().as_bytes()).unwrap();

        assert_eq!(n.event_type, "payment");
        assert_eq!(n.external_id.as_deref(), Some("123456"));
        assert_eq!(n.external_reference.as_deref(), Some("ref-1"));
        assert_eq!(n.metadata_payment_id().as_deref(), Some("p-1"));
        assert!(n.is_payment_related());
    }

    #[test]
    fn numeric_data_id_is_accepted() {
        let n = PaymentNotification::from_value(json!({ "type": "payment", "data": { "id": 42 } })).unwrap();
        assert_eq!(n.external_id.as_deref(), Some("42"));
    }

    #[test]
    fn topic_is_used_when_type_is_missing() {
        let n = PaymentNotification::from_value(json!({
            "topic": "payment",
            "resource": "https://api.example.com/v1/payments/777"
        }))
        .unwrap();
        assert_eq!(n.event_type, "payment");
        assert_eq!(n.external_id.as_deref(), Some("777"));
    }

    #[test]
    fn payment_action_counts_as_payment_related() {
        let n = PaymentNotification::from_value(json!({ "action": "payment.created", "data": { "id": "1" } })).unwrap();
        assert!(n.is_payment_related());
    }

    #[test]
    fn other_types_are_not_payment_related() {
        let n = PaymentNotification::from_value(json!({ "type": "merchant_order", "data": { "id": "1" } })).unwrap();
        assert!(!n.is_payment_related());
    }

    #[test]
    fn nested_status_is_read() {
        let n = PaymentNotification::from_value(json!({ "type": "payment", "data": { "id": "1", "status": "approved" } })).unwrap();
        assert_eq!(n.status.as_deref(), Some("approved"));
    }

    #[test]
    fn invalid_json_is_rejected() {
        assert!(PaymentNotification::parse(b"not json").is_err());
        assert!(PaymentNotification::parse(b"[1,2]").is_err());
    }
}
