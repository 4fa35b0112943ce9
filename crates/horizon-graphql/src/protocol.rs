//! Wire format of the `graphql-subscriptions` WebSocket protocol.
//!
//! Every frame is a JSON text message with a `type` discriminator:
//!
//! | Direction | `type` | Fields |
//! |-----------|--------|--------|
//! | client -> server | `connection_init` | `payload` |
//! | client -> server | `start` | `id`, `payload: {query, variables}` |
//! | client -> server | `stop` | `id` |
//! | server -> client | `connection_ack`, `ka`, `init_fail` | `payload?` |
//! | server -> client | `data` | `id`, `payload: {data}` |
//! | server -> client | `error`, `subscription_fail` | `id`, `payload?` |
//! | server -> client | `subscription_success`, `complete` | `id` |

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;
use crate::request::GraphQLRequest;

/// WebSocket subprotocol negotiated for the subscription socket.
pub const SUBPROTOCOL: &str = "graphql-subscriptions";

/// A message sent from the client to the server.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Opens the handshake.
    ConnectionInit {
        /// Connection parameters, usually the configured headers.
        payload: Value,
    },
    /// Starts a channel.
    Start {
        /// Channel id.
        id: String,
        /// The operation to run.
        payload: GraphQLRequest,
    },
    /// Stops a channel.
    Stop {
        /// Channel id.
        id: String,
    },
}

impl ClientMessage {
    /// Encode as a JSON text frame.
    pub fn to_text(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// The `type` discriminator of a server message.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum MessageType {
    /// `connection_ack`: handshake completed.
    ConnectionAck,
    /// `ka`: keep-alive.
    KeepAlive,
    /// `data`: a result for a channel.
    Data,
    /// `error`: a channel failed.
    Error,
    /// `subscription_fail`: a channel could not be started.
    SubscriptionFail,
    /// `init_fail`: the handshake was rejected.
    InitFail,
    /// `subscription_success`: a channel was started.
    SubscriptionSuccess,
    /// `complete`: the server finished a channel.
    Complete,
    /// Anything else.
    Other(String),
}

impl MessageType {
    /// The wire name of this type.
    pub fn as_str(&self) -> &str {
        match self {
            Self::ConnectionAck => "connection_ack",
            Self::KeepAlive => "ka",
            Self::Data => "data",
            Self::Error => "error",
            Self::SubscriptionFail => "subscription_fail",
            Self::InitFail => "init_fail",
            Self::SubscriptionSuccess => "subscription_success",
            Self::Complete => "complete",
            Self::Other(other) => other,
        }
    }
}

impl From<String> for MessageType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "connection_ack" => Self::ConnectionAck,
            "ka" => Self::KeepAlive,
            "data" => Self::Data,
            "error" => Self::Error,
            "subscription_fail" => Self::SubscriptionFail,
            "init_fail" => Self::InitFail,
            "subscription_success" => Self::SubscriptionSuccess,
            "complete" => Self::Complete,
            _ => Self::Other(value),
        }
    }
}

/// A message received from the server.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ServerMessage {
    /// Message type.
    #[serde(rename = "type")]
    pub kind: MessageType,
    /// Channel id, for channel-scoped messages.
    #[serde(default)]
    pub id: Option<String>,
    /// Message payload.
    #[serde(default)]
    pub payload: Option<Value>,
}

impl ServerMessage {
    /// Decode a JSON text frame.
    pub fn from_text(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// The `payload.data` value of a `data` message.
    pub fn data(&self) -> Value {
        self.payload
            .as_ref()
            .and_then(|payload| payload.get("data"))
            .cloned()
            .unwrap_or(Value::Null)
    }

    /// Best-effort extraction of a server-supplied error message.
    ///
    /// Understands `payload.message`, `payload.errors[0].message`,
    /// `payload[0].message` and a bare string payload.
    pub fn error_text(&self) -> Option<String> {
        let payload = self.payload.as_ref()?;
        let message = match payload {
            Value::String(text) => Some(text.as_str()),
            Value::Array(entries) => entries.first().and_then(|e| e.get("message")?.as_str()),
            Value::Object(map) => map.get("message").and_then(Value::as_str).or_else(|| {
                map.get("errors")?
                    .as_array()?
                    .first()?
                    .get("message")?
                    .as_str()
            }),
            _ => None,
        };
        message.map(str::to_owned)
    }
}
