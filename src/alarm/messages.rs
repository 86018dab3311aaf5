//! Alarm Channel Messages
//!
//! Frames exchanged with the alarm endpoint and the events delivered to
//! listeners.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Inbound message type for a newly raised alarm
pub const ALARM_TRIGGERED: &str = "ALARM_TRIGGERED";
/// Inbound message type for a changed alarm
pub const ALARM_UPDATED: &str = "ALARM_UPDATED";
/// Inbound message type for a cleared alarm
pub const ALARM_RESOLVED: &str = "ALARM_RESOLVED";

/// Inbound frame `{ type, data, timestamp }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlarmEnvelope {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub data: Value,
    /// ISO-8601 string or epoch millis, depending on the server
    #[serde(default)]
    pub timestamp: Option<Value>,
}

/// Outbound frames
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ClientMessage {
    /// Keep-alive probe
    Ping,
}

impl ClientMessage {
    pub fn to_text(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Event delivered to channel listeners
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    Connected,
    Disconnected { code: Option<u16>, reason: String },
    Error { message: String },
    AlarmTriggered(Value),
    AlarmUpdated(Value),
    AlarmResolved(Value),
    /// Every parsed inbound frame, known type or not
    Message(AlarmEnvelope),
    /// Reconnect attempts exhausted; only an explicit connect restarts
    GaveUp { attempts: u32 },
}

/// Listener key for [`ChannelEvent`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Connected,
    Disconnected,
    Error,
    AlarmTriggered,
    AlarmUpdated,
    AlarmResolved,
    Message,
    GaveUp,
}

impl ChannelEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            ChannelEvent::Connected => EventKind::Connected,
            ChannelEvent::Disconnected { .. } => EventKind::Disconnected,
            ChannelEvent::Error { .. } => EventKind::Error,
            ChannelEvent::AlarmTriggered(_) => EventKind::AlarmTriggered,
            ChannelEvent::AlarmUpdated(_) => EventKind::AlarmUpdated,
            ChannelEvent::AlarmResolved(_) => EventKind::AlarmResolved,
            ChannelEvent::Message(_) => EventKind::Message,
            ChannelEvent::GaveUp { .. } => EventKind::GaveUp,
        }
    }
}

/// Events produced by one inbound text frame.
///
/// A known type yields its typed event followed by [`ChannelEvent::Message`];
/// an unknown type yields only the latter.
pub fn decode_frame(text: &str) -> Result<Vec<ChannelEvent>, serde_json::Error> {
    let envelope: AlarmEnvelope = serde_json::from_str(text)?;

    let typed = match envelope.kind.as_str() {
        ALARM_TRIGGERED => Some(ChannelEvent::AlarmTriggered(envelope.data.clone())),
        ALARM_UPDATED => Some(ChannelEvent::AlarmUpdated(envelope.data.clone())),
        ALARM_RESOLVED => Some(ChannelEvent::AlarmResolved(envelope.data.clone())),
        other => {
            tracing::warn!(kind = %other, "Unknown alarm message type");
            None
        }
    };

    Ok(typed
        .into_iter()
        .chain(std::iter::once(ChannelEvent::Message(envelope)))
        .collect())
}
