use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::constants::Action;

/// Error body attached to a failed VIS response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisErrorBody {
    pub number: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl std::fmt::Display for VisErrorBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.number)?;
        if let Some(reason) = &self.reason {
            write!(f, " {reason}")?;
        }
        if let Some(message) = &self.message {
            write!(f, ": {message}")?;
        }
        Ok(())
    }
}

/// Envelope for every VIS request, response and notification.
///
/// Fields a given action does not use are omitted on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub action: Action,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscription_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<VisErrorBody>,
}

impl Message {
    fn request(action: Action, request_id: impl Into<String>) -> Self {
        Self {
            action,
            request_id: Some(request_id.into()),
            path: None,
            subscription_id: None,
            value: None,
            timestamp: None,
            error: None,
        }
    }

    /// One-shot read of `path`.
    pub fn get(request_id: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            path: Some(path.into()),
            ..Self::request(Action::Get, request_id)
        }
    }

    /// Standing subscription to `path` (may contain `*` segments).
    pub fn subscribe(request_id: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            path: Some(path.into()),
            ..Self::request(Action::Subscribe, request_id)
        }
    }

    /// Cancels the subscription identified by `subscription_id`.
    pub fn unsubscribe(request_id: impl Into<String>, subscription_id: impl Into<String>) -> Self {
        Self {
            subscription_id: Some(subscription_id.into()),
            ..Self::request(Action::Unsubscribe, request_id)
        }
    }

    /// Whether this is a server push rather than a reply to a request.
    pub fn is_notification(&self) -> bool {
        self.action == Action::Subscription
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_request_shape() {
        let msg = Message::get("r1", "Attribute.Vehicle.VehicleIdentification.VIN");
        let json: Value = serde_json::to_value(&msg).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "action": "get",
                "requestId": "r1",
                "path": "Attribute.Vehicle.VehicleIdentification.VIN"
            })
        );
    }

    #[test]
    fn unsubscribe_carries_subscription_id_only() {
        let msg = Message::unsubscribe("r2", "sub-7");
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains(r#""subscriptionId":"sub-7""#));
        assert!(!json.contains("path"));
        assert!(!json.contains("value"));
    }

    #[test]
    fn parses_notification() {
        let text = r#"{"action":"subscription","subscriptionId":"42","value":{"lat":48.1},"timestamp":1700000000}"#;
        let msg: Message = serde_json::from_str(text).unwrap();
        assert!(msg.is_notification());
        assert_eq!(msg.subscription_id.as_deref(), Some("42"));
        assert_eq!(msg.value, Some(serde_json::json!({"lat": 48.1})));
        assert_eq!(msg.timestamp, Some(1_700_000_000));
        assert!(msg.request_id.is_none());
    }

    #[test]
    fn parses_error_response() {
        let text = r#"{"action":"get","requestId":"r9","error":{"number":404,"reason":"invalid_path","message":"no such signal"}}"#;
        let msg: Message = serde_json::from_str(text).unwrap();
        let err = msg.error.unwrap();
        assert_eq!(err.number, 404);
        assert_eq!(err.to_string(), "404 invalid_path: no such signal");
    }

    #[test]
    fn error_display_without_details() {
        let err = VisErrorBody {
            number: 500,
            reason: None,
            message: None,
        };
        assert_eq!(err.to_string(), "500");
    }
}
