//! Console Context
//!
//! Wires one session to the services that depend on it: the API client, the
//! dictionary cache, the alarm channel and the alarm board. Every
//! session-scoped service is registered with the session so a sign-out or an
//! expired refresh token resets all of them together.

use std::sync::Arc;

use crate::alarm::{AlarmBoard, AlarmChannel, ChannelOptions, Subscription};
use crate::config::Config;
use crate::dict::DictCache;
use crate::http::{ApiClient, ApiError};
use crate::session::{FileStore, MemoryStore, Session, StoreError, TokenStore};

#[derive(Debug, thiserror::Error)]
pub enum ConsoleError {
    #[error("Failed to open credential store: {0}")]
    Store(#[from] StoreError),

    #[error("Failed to create API client: {0}")]
    Client(#[from] ApiError),
}

/// Everything an embedding application needs for one signed-in user
pub struct Console {
    config: Config,
    session: Arc<Session>,
    client: ApiClient,
    dicts: Arc<DictCache>,
    channel: Arc<AlarmChannel>,
    board: Arc<AlarmBoard>,
}

impl Console {
    /// Console with credentials persisted under the configured data directory
    pub fn open(config: Config) -> Result<Self, ConsoleError> {
        let path = config.session.store_path();
        let persistent = FileStore::open(&path)?;
        tracing::info!(path = ?path, "Credential store opened");

        let session = Arc::new(Session::new(TokenStore::new(
            Arc::new(persistent),
            Arc::new(MemoryStore::new()),
        )));
        let client = ApiClient::new(&config.api, session)?;
        Ok(Self::with_client(config, client))
    }

    /// Console around an existing client; the client's session is used
    pub fn with_client(config: Config, client: ApiClient) -> Self {
        let session = Arc::clone(client.session());

        let dicts = Arc::new(DictCache::new(client.clone()));
        let channel = Arc::new(AlarmChannel::new(ChannelOptions::from_config(
            &config.realtime,
            client.base_url(),
        )));
        let board = Arc::new(AlarmBoard::new(client.clone()));

        session.register(&dicts);
        session.register(&channel);
        session.register(&board);

        tracing::debug!(
            api = %client.base_url(),
            alarms = %channel.url(),
            "Console initialized"
        );

        Self {
            config,
            session,
            client,
            dicts,
            channel,
            board,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub fn dicts(&self) -> &DictCache {
        &self.dicts
    }

    pub fn alarm_channel(&self) -> &AlarmChannel {
        &self.channel
    }

    pub fn alarm_board(&self) -> &AlarmBoard {
        &self.board
    }

    /// Keep the board current from the channel
    pub fn attach_board(&self) -> Vec<Subscription> {
        self.board.attach(&self.channel)
    }
}
