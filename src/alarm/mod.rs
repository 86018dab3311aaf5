//! Real-time Alarms
//!
//! ## Architecture
//!
//! - **messages**: inbound `{type, data, timestamp}` frames, the ping frame
//!   and the events delivered to listeners
//! - **listeners**: per-kind listener registry with panic isolation
//! - **channel**: WebSocket client with heartbeat and capped exponential
//!   backoff
//! - **board**: active-alarm list kept current by channel events

pub mod board;
pub mod channel;
pub mod listeners;
pub mod messages;

pub use board::{AlarmBoard, AlarmFilter, AlarmSummary};
pub use channel::{backoff_delay, AlarmChannel, ChannelOptions, ChannelStatus, MANUAL_DISCONNECT_REASON};
pub use listeners::{Listener, ListenerRegistry, Subscription};
pub use messages::{decode_frame, AlarmEnvelope, ChannelEvent, ClientMessage, EventKind};
