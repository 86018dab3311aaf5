//! Client Session
//!
//! Owns the stored credentials and everything that must be thrown away when
//! the user signs out or the session expires.
//!
//! ## Architecture
//!
//! - **KeyValueStore**: persistent (file) and volatile (memory) storage
//! - **TokenStore**: access/refresh tokens routed by the remember-me flag
//! - **Session**: credentials, current location, session-scoped services and
//!   session events
//!
//! Session-scoped services (dictionary cache, alarm board, alarm channel)
//! register themselves with [`Session::register`] and are reset together with
//! the credentials.

mod store;
mod tokens;

pub use store::{FileStore, KeyValueStore, MemoryStore, StoreError};
pub use tokens::TokenStore;

use parking_lot::{Mutex, RwLock};
use std::sync::{Arc, Weak};
use tokio::sync::broadcast;

/// Capacity of the session event channel
const EVENT_CAPACITY: usize = 16;

/// A service whose state belongs to the signed-in user
pub trait SessionScoped: Send + Sync {
    /// Drop all user-specific state
    fn reset(&self);
}

/// Session lifecycle notifications
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    LoggedIn,
    LoggedOut,
    /// Credentials are gone; the user has to sign in again
    LoginRequired {
        message: String,
        /// Login path carrying the current location as return path
        redirect: String,
    },
}

/// Credentials plus session-scoped state
pub struct Session {
    tokens: TokenStore,
    location: RwLock<String>,
    scoped: RwLock<Vec<Weak<dyn SessionScoped>>>,
    events: broadcast::Sender<SessionEvent>,
    /// Bumped on every reset; guards token writes racing a reset
    epoch: Mutex<u64>,
}

impl Session {
    pub fn new(tokens: TokenStore) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Self {
            tokens,
            location: RwLock::new("/".to_string()),
            scoped: RwLock::new(Vec::new()),
            events,
            epoch: Mutex::new(0),
        }
    }

    /// Session backed by memory only
    pub fn in_memory() -> Self {
        Self::new(TokenStore::new(
            Arc::new(MemoryStore::new()),
            Arc::new(MemoryStore::new()),
        ))
    }

    pub fn tokens(&self) -> &TokenStore {
        &self.tokens
    }

    pub fn is_logged_in(&self) -> bool {
        self.tokens.access_token().is_some()
    }

    /// Number of resets so far
    pub fn epoch(&self) -> u64 {
        *self.epoch.lock()
    }

    /// Store a refreshed token pair unless the session was reset since `epoch`.
    ///
    /// Returns `false` when the pair was discarded.
    pub(crate) fn store_refreshed(
        &self,
        epoch: u64,
        access: &str,
        refresh: &str,
    ) -> Result<bool, StoreError> {
        let current = self.epoch.lock();
        if *current != epoch {
            return Ok(false);
        }

        self.tokens
            .set_tokens(access, refresh, self.tokens.remember_me())?;
        Ok(true)
    }

    /// Record where the user currently is, used as the post-login return path
    pub fn set_location(&self, location: impl Into<String>) {
        *self.location.write() = location.into();
    }

    pub fn location(&self) -> String {
        self.location.read().clone()
    }

    /// Register a service to be reset with the session.
    ///
    /// Only a weak reference is kept; services dropped by their owner are
    /// skipped.
    pub fn register<S: SessionScoped + 'static>(&self, service: &Arc<S>) {
        let service: Arc<dyn SessionScoped> = service.clone();
        let weak = Arc::downgrade(&service);
        let mut scoped = self.scoped.write();
        scoped.retain(|s| s.strong_count() > 0);
        scoped.push(weak);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub(crate) fn notify(&self, event: SessionEvent) {
        // No receivers is fine
        let _ = self.events.send(event);
    }

    /// Clear credentials and reset every session-scoped service
    pub fn reset(&self) {
        {
            let mut epoch = self.epoch.lock();
            *epoch += 1;
            if let Err(e) = self.tokens.clear() {
                tracing::error!(error = %e, "Failed to clear stored credentials");
            }
        }

        let services: Vec<_> = self.scoped.read().iter().filter_map(Weak::upgrade).collect();
        for service in services {
            service.reset();
        }

        tracing::info!("Session state reset");
    }

    /// Reset the session and ask the user to sign in again
    pub fn expire(&self, message: &str) {
        tracing::warn!(message = %message, "Session expired");
        self.reset();

        self.notify(SessionEvent::LoginRequired {
            message: message.to_string(),
            redirect: login_redirect(&self.location()),
        });
    }
}

/// Login path that returns to `location` after signing in
pub fn login_redirect(location: &str) -> String {
    format!("/login?redirect={}", urlencoding::encode(location))
}
