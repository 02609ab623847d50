use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Kind of payload carried by a [`BridgeMessage`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    /// Kinematic state, plant list and frame for the vision/RL backend
    Observation,
    CameraFeed,
    /// Sent once when the engine resets so the backend can start a new episode
    Reset,
}

/// Envelope for every outbound message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BridgeMessage {
    #[serde(rename = "type")]
    pub kind: MessageType,
    pub data: Value,
    pub timestamp: DateTime<Utc>,
    /// Identifies one engine instance across reconnects
    pub session: Uuid,
}

impl BridgeMessage {
    pub fn new(kind: MessageType, data: Value, session: Uuid) -> Self {
        Self {
            kind,
            data,
            timestamp: Utc::now(),
            session,
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}

/// Frames larger than this are rejected on read
pub const MAX_FRAME_BYTES: usize = 10_000_000;

/// Length-prefixed framing: big-endian u32 byte count followed by the JSON body
pub fn encode_frame(body: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(body.len() + 4);
    out.extend_from_slice(&(body.len() as u32).to_be_bytes());
    out.extend_from_slice(body);
    out
}
