//! Routes incoming VIS messages to the handles that asked for them.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, trace, warn};

use vis_relay_protocol::constants::WS_MAX_MESSAGE_SIZE;
use vis_relay_protocol::{Action, Message};

use crate::handle::DataSlot;

/// A request waiting for its response.
struct Pending {
    action: Action,
    slot: Arc<DataSlot>,
}

/// Correlation tables shared between the client and its read pump.
#[derive(Default)]
pub(crate) struct Router {
    /// requestId → originating handle.
    pending: Mutex<HashMap<String, Pending>>,
    /// subscriptionId → subscribed handle.
    subscriptions: Mutex<HashMap<String, Arc<DataSlot>>>,
}

impl Router {
    pub(crate) async fn track(&self, request_id: String, action: Action, slot: Arc<DataSlot>) {
        self.pending
            .lock()
            .await
            .insert(request_id, Pending { action, slot });
    }

    pub(crate) async fn forget(&self, request_id: &str) {
        self.pending.lock().await.remove(request_id);
    }

    /// Stops routing notifications for `subscription_id`.
    pub(crate) async fn drop_subscription(&self, subscription_id: &str) {
        self.subscriptions.lock().await.remove(subscription_id);
    }

    #[cfg(test)]
    pub(crate) async fn pending_len(&self) -> usize {
        self.pending.lock().await.len()
    }

    /// Handles one text frame from the server.
    pub(crate) async fn dispatch(&self, text: &str) {
        if text.len() > WS_MAX_MESSAGE_SIZE {
            warn!("message too large ({} bytes), dropping", text.len());
            return;
        }

        let raw: Value = match serde_json::from_str(text) {
            Ok(v) => v,
            Err(e) => {
                warn!("failed to parse message: {e}");
                return;
            }
        };
        let msg: Message = match serde_json::from_value(raw.clone()) {
            Ok(m) => m,
            Err(e) => {
                warn!("unrecognised VIS message: {e}");
                return;
            }
        };

        trace!(action = ?msg.action, request_id = ?msg.request_id, "received message");

        if msg.is_notification() {
            self.route_notification(&msg, &raw).await;
        } else {
            self.route_response(msg, &raw).await;
        }
    }

    async fn route_notification(&self, msg: &Message, raw: &Value) {
        let Some(sub_id) = msg.subscription_id.as_deref() else {
            warn!("notification without subscriptionId, dropping");
            return;
        };

        let slot = self.subscriptions.lock().await.get(sub_id).cloned();
        match slot {
            Some(slot) => slot.deliver(raw),
            None => debug!(subscription_id = %sub_id, "notification for unknown subscription"),
        }
    }

    async fn route_response(&self, msg: Message, raw: &Value) {
        let Some(request_id) = msg.request_id.as_deref() else {
            warn!(action = ?msg.action, "response without requestId, dropping");
            return;
        };

        let Some(pending) = self.pending.lock().await.remove(request_id) else {
            debug!(request_id, "response to unknown request");
            return;
        };

        if let Some(err) = &msg.error {
            warn!(
                path = %pending.slot.path(),
                action = ?pending.action,
                error = %err,
                "VIS request failed"
            );
            return;
        }

        match pending.action {
            Action::Get => pending.slot.deliver(raw),
            Action::Subscribe => {
                let Some(sub_id) = msg.subscription_id else {
                    warn!(path = %pending.slot.path(), "subscribe response without subscriptionId");
                    return;
                };
                debug!(path = %pending.slot.path(), subscription_id = %sub_id, "subscribed");
                pending.slot.set_subscription_id(Some(sub_id.clone()));
                self.subscriptions
                    .lock()
                    .await
                    .insert(sub_id, pending.slot.clone());
                if msg.value.is_some() {
                    pending.slot.deliver(raw);
                }
            }
            Action::Unsubscribe => {
                debug!(path = %pending.slot.path(), "unsubscribed");
            }
            Action::Subscription | Action::UnsubscribeAll => {
                debug!(action = ?pending.action, "ignoring response");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use serde_json::json;

    use crate::handle::{DataHandle, slot_of as handle_slot};
    use crate::{DataAccessor, DataSubscription};

    fn slot_of<H: DataHandle>(h: &H) -> Arc<DataSlot> {
        handle_slot(h).clone()
    }

    #[tokio::test]
    async fn get_response_reaches_accessor() {
        let router = Router::default();
        let vin = DataAccessor::new("Attribute.Vehicle.VehicleIdentification.VIN").unwrap();
        router
            .track("r1".into(), Action::Get, slot_of(&vin))
            .await;

        router
            .dispatch(r#"{"action":"get","requestId":"r1","value":"WVW123"}"#)
            .await;

        assert_eq!(vin.get_value(Duration::ZERO).await.unwrap(), json!("WVW123"));
        assert!(router.pending.lock().await.is_empty());
    }

    #[tokio::test]
    async fn notifications_follow_acknowledged_subscription() {
        let router = Router::default();
        let lat = DataSubscription::new("Signal.Emulator.telemetry.lat").unwrap();
        router
            .track("r2".into(), Action::Subscribe, slot_of(&lat))
            .await;

        router
            .dispatch(r#"{"action":"subscribe","requestId":"r2","subscriptionId":"77"}"#)
            .await;
        assert_eq!(lat.subscription_id().as_deref(), Some("77"));

        router
            .dispatch(r#"{"action":"subscription","subscriptionId":"77","value":51.5}"#)
            .await;
        assert_eq!(lat.get_value(Duration::ZERO).await.unwrap(), json!(51.5));
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_subscription_is_dropped() {
        let router = Router::default();
        let lat = DataSubscription::new("Signal.Emulator.telemetry.lat").unwrap();
        router
            .track("r3".into(), Action::Subscribe, slot_of(&lat))
            .await;
        router
            .dispatch(r#"{"action":"subscribe","requestId":"r3","subscriptionId":"1"}"#)
            .await;

        router
            .dispatch(r#"{"action":"subscription","subscriptionId":"2","value":0}"#)
            .await;

        assert!(matches!(
            lat.get_value(Duration::from_secs(1)).await,
            Err(crate::ClientError::Timeout { .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn error_response_leaves_handle_waiting() {
        let router = Router::default();
        let vin = DataAccessor::new("Attribute.Vehicle.VehicleIdentification.VIN").unwrap();
        router.track("r4".into(), Action::Get, slot_of(&vin)).await;

        router
            .dispatch(r#"{"action":"get","requestId":"r4","error":{"number":404,"reason":"invalid_path"}}"#)
            .await;

        assert!(router.pending.lock().await.is_empty());
        assert!(vin.get_value(Duration::from_secs(1)).await.is_err());
    }

    #[tokio::test]
    async fn dropped_subscription_stops_delivery() {
        let router = Router::default();
        let speed = DataSubscription::new("Signal.Emulator.telemetry.veh_speed").unwrap();
        router
            .track("r5".into(), Action::Subscribe, slot_of(&speed))
            .await;
        router
            .dispatch(r#"{"action":"subscribe","requestId":"r5","subscriptionId":"9"}"#)
            .await;

        router.drop_subscription("9").await;
        assert!(router.subscriptions.lock().await.is_empty());
    }

    #[tokio::test]
    async fn malformed_and_oversized_messages_ignored() {
        let router = Router::default();
        router.dispatch("not valid json {{{").await;
        router.dispatch(r#"{"action":"teleport"}"#).await;
        router.dispatch(r#"{"action":"get","value":1}"#).await;

        let huge = "x".repeat(WS_MAX_MESSAGE_SIZE + 1);
        router.dispatch(&huge).await;
    }
}
