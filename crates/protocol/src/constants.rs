use std::time::Duration;

use serde::{Deserialize, Serialize};

/// VIS endpoint used when none is configured.
pub const DEFAULT_VIS_URL: &str = "wss://wwwivi:8088/";

/// Attribute holding the vehicle identification number.
pub const VIN_PATH: &str = "Attribute.Vehicle.VehicleIdentification.VIN";

/// Read deadline: if nothing arrives within this window (no pong, no
/// response, no notification), the connection is considered dead.
pub const WS_PONG_WAIT: Duration = Duration::from_secs(60);

/// How often to send keepalive pings.
pub const WS_PING_PERIOD: Duration = Duration::from_secs(15);

/// Maximum accepted message size in bytes (16 MB).
pub const WS_MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024;

/// Capacity of the outbound frame queue.
pub const WS_WRITE_QUEUE: usize = 64;

/// VIS action carried in every message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Action {
    Get,
    Subscribe,
    /// Server push for an active subscription.
    Subscription,
    Unsubscribe,
    UnsubscribeAll,
}
