//! # Warden
//!
//! Client library for an IoT monitoring console: an authenticated REST
//! pipeline with single-flight token refresh and a real-time alarm channel.
//!
//! ## Features
//!
//! - **Token refresh**: concurrent calls rejected with an expired access
//!   token share one refresh and are replayed in order
//! - **Typed API**: users, roles, menus, devices, alarm rules, alarm
//!   monitoring, notification channels, dictionaries and files
//! - **Real-time alarms**: WebSocket channel with heartbeat and capped
//!   exponential backoff, fanned out to typed listeners
//! - **Session state**: persisted credentials, dictionary cache and alarm
//!   board, reset together on sign-out
//!
//! ## Modules
//!
//! - [`http`]: request pipeline, transport and refresh gate
//! - [`api`]: typed endpoint groups
//! - [`alarm`]: alarm channel, listener registry and alarm board
//! - [`session`]: credential storage and session lifecycle
//! - [`dict`]: dictionary cache
//! - [`context`]: wiring of the above for one user
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use warden::{AlarmStatus, ChannelEvent, Config, Console, EventKind};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let console = Console::open(Config::load_default())?;
//!
//!     // Seed the board, then keep it current from the channel
//!     console.alarm_board().load_active(None, Some(100)).await?;
//!     console.attach_board();
//!     console.alarm_channel().subscribe(EventKind::AlarmTriggered, |event| {
//!         if let ChannelEvent::AlarmTriggered(data) = event {
//!             println!("new alarm: {}", data);
//!         }
//!     });
//!     console.alarm_channel().connect();
//!
//!     let open = console
//!         .alarm_board()
//!         .alarms()
//!         .into_iter()
//!         .filter(|a| a.status == AlarmStatus::Active)
//!         .count();
//!     println!("{} unacknowledged alarms", open);
//!
//!     Ok(())
//! }
//! ```

pub mod alarm;
pub mod api;
pub mod config;
pub mod context;
pub mod dict;
pub mod http;
pub mod session;

// Re-export top-level types for convenience
pub use alarm::{
    AlarmBoard, AlarmChannel, AlarmFilter, AlarmSummary, ChannelEvent, ChannelOptions,
    ChannelStatus, EventKind, Subscription,
};

pub use api::alarms::{AlarmEvent, AlarmStatus, Severity};
pub use api::{OptionItem, PageQuery, PageResult};

pub use config::{ApiConfig, Config, ConfigError, LoggingConfig, RealtimeConfig, SessionConfig};

pub use context::{Console, ConsoleError};

pub use dict::DictCache;

pub use http::{ApiClient, ApiError, ApiRequest, ApiResult, FileDownload};

pub use session::{
    FileStore, KeyValueStore, MemoryStore, Session, SessionEvent, SessionScoped, TokenStore,
};
