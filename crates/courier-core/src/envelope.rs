// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Live-channel envelopes.
//!
//! Client -> Server (JSON):
//! ```json
//! {"type": "ping"}
//! {"type": "ack"}
//! {"type": "signaling", "call_id": 7, "data": "<opaque>"}
//! ```
//!
//! Server -> Client (JSON):
//! ```json
//! {"type": "pong", "time": 1760000000}
//! {"type": "signaling", "call_id": 7, "from_user_id": 1, "data": "<opaque>"}
//! {"type": "error", "error": "call not found"}
//! {"type": "new_message", "message": {...}, "pts": 12}
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::CourierError;
use crate::types::{CallId, Message, PeerType, UserId};

/// Inbound frame, decoded from the `type` discriminator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEnvelope {
    /// Liveness probe from the client.
    Ping,
    /// Delivery confirmation.
    Ack,
    /// Opaque call-setup payload for the other call participant.
    Signaling { call_id: CallId, data: String },
    /// Missing or unknown `type`. Logged and dropped.
    Unrecognized { kind: Option<String> },
}

/// Why an inbound frame could not be decoded.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    /// Not a JSON object.
    #[error("malformed frame: {0}")]
    Malformed(String),
    /// Known `type` with missing or mistyped fields.
    #[error("invalid {kind} frame: {reason}")]
    Incomplete { kind: &'static str, reason: String },
}

impl From<DecodeError> for CourierError {
    fn from(e: DecodeError) -> Self {
        CourierError::Validation(e.to_string())
    }
}

#[derive(Deserialize)]
struct SignalingFields {
    call_id: CallId,
    data: String,
}

impl ClientEnvelope {
    /// Decode one text frame.
    pub fn decode(text: &str) -> Result<Self, DecodeError> {
        let value: serde_json::Value =
            serde_json::from_str(text).map_err(|e| DecodeError::Malformed(e.to_string()))?;
        let Some(object) = value.as_object() else {
            return Err(DecodeError::Malformed("expected a JSON object".to_string()));
        };

        let kind = match object.get("type").and_then(|t| t.as_str()) {
            Some(kind) => kind,
            None => return Ok(Self::Unrecognized { kind: None }),
        };

        match kind {
            "ping" => Ok(Self::Ping),
            "ack" => Ok(Self::Ack),
            "signaling" => {
                let fields: SignalingFields =
                    serde_json::from_value(value.clone()).map_err(|e| {
                        DecodeError::Incomplete {
                            kind: "signaling",
                            reason: e.to_string(),
                        }
                    })?;
                Ok(Self::Signaling {
                    call_id: fields.call_id,
                    data: fields.data,
                })
            }
            other => Ok(Self::Unrecognized {
                kind: Some(other.to_string()),
            }),
        }
    }
}

/// Outbound frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEnvelope {
    Pong {
        time: i64,
    },
    Signaling {
        call_id: CallId,
        from_user_id: UserId,
        data: String,
    },
    Error {
        error: String,
    },
    NewMessage {
        message: Message,
        pts: Option<i64>,
    },
    EditMessage {
        message: Message,
    },
    DeleteMessages {
        message_ids: Vec<i64>,
    },
    ReadHistory {
        peer_id: i64,
        peer_type: PeerType,
        max_id: i64,
    },
}

impl ServerEnvelope {
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            error: message.into(),
        }
    }
}
