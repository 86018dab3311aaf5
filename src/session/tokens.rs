//! Token Storage
//!
//! Access/refresh token pair plus the remember-me flag. With remember-me the
//! tokens go to the persistent store, otherwise to the session store; the
//! flag itself always lives in the persistent store.

use std::sync::Arc;

use super::store::{KeyValueStore, StoreError};

const ACCESS_TOKEN_KEY: &str = "access_token";
const REFRESH_TOKEN_KEY: &str = "refresh_token";
const REMEMBER_ME_KEY: &str = "remember_me";

/// Credential storage routed by the remember-me flag
#[derive(Clone)]
pub struct TokenStore {
    persistent: Arc<dyn KeyValueStore>,
    session: Arc<dyn KeyValueStore>,
}

impl TokenStore {
    pub fn new(persistent: Arc<dyn KeyValueStore>, session: Arc<dyn KeyValueStore>) -> Self {
        Self {
            persistent,
            session,
        }
    }

    /// The persistent store, shared with other long-lived caches
    pub fn persistent(&self) -> &Arc<dyn KeyValueStore> {
        &self.persistent
    }

    pub fn remember_me(&self) -> bool {
        self.persistent
            .get(REMEMBER_ME_KEY)
            .map(|v| v == "true")
            .unwrap_or(false)
    }

    fn active(&self) -> &dyn KeyValueStore {
        if self.remember_me() {
            self.persistent.as_ref()
        } else {
            self.session.as_ref()
        }
    }

    pub fn access_token(&self) -> Option<String> {
        self.active().get(ACCESS_TOKEN_KEY).filter(|t| !t.is_empty())
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.active().get(REFRESH_TOKEN_KEY).filter(|t| !t.is_empty())
    }

    /// Store a new token pair
    pub fn set_tokens(&self, access: &str, refresh: &str, remember: bool) -> Result<(), StoreError> {
        self.persistent
            .set(REMEMBER_ME_KEY, if remember { "true" } else { "false" })?;

        let (target, other) = if remember {
            (&self.persistent, &self.session)
        } else {
            (&self.session, &self.persistent)
        };

        target.set(ACCESS_TOKEN_KEY, access)?;
        target.set(REFRESH_TOKEN_KEY, refresh)?;
        other.remove(ACCESS_TOKEN_KEY)?;
        other.remove(REFRESH_TOKEN_KEY)?;

        Ok(())
    }

    /// Remove tokens from both stores; the remember-me flag is kept
    pub fn clear(&self) -> Result<(), StoreError> {
        for store in [&self.persistent, &self.session] {
            store.remove(ACCESS_TOKEN_KEY)?;
            store.remove(REFRESH_TOKEN_KEY)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::store::MemoryStore;

    fn stores() -> (Arc<MemoryStore>, Arc<MemoryStore>, TokenStore) {
        let persistent = Arc::new(MemoryStore::new());
        let session = Arc::new(MemoryStore::new());
        let tokens = TokenStore::new(persistent.clone(), session.clone());
        (persistent, session, tokens)
    }

    #[test]
    fn test_remember_me_routes_to_persistent() {
        let (persistent, session, tokens) = stores();

        tokens.set_tokens("a1", "r1", true).unwrap();

        assert_eq!(persistent.get(ACCESS_TOKEN_KEY).as_deref(), Some("a1"));
        assert_eq!(session.get(ACCESS_TOKEN_KEY), None);
        assert_eq!(tokens.access_token().as_deref(), Some("a1"));
        assert_eq!(tokens.refresh_token().as_deref(), Some("r1"));
        assert!(tokens.remember_me());
    }

    #[test]
    fn test_switching_flag_moves_tokens() {
        let (persistent, session, tokens) = stores();

        tokens.set_tokens("a1", "r1", true).unwrap();
        tokens.set_tokens("a2", "r2", false).unwrap();

        assert_eq!(persistent.get(ACCESS_TOKEN_KEY), None);
        assert_eq!(session.get(ACCESS_TOKEN_KEY).as_deref(), Some("a2"));
        assert_eq!(tokens.access_token().as_deref(), Some("a2"));
        assert!(!tokens.remember_me());
    }

    #[test]
    fn test_clear_keeps_flag() {
        let (_, _, tokens) = stores();

        tokens.set_tokens("a1", "r1", true).unwrap();
        tokens.clear().unwrap();

        assert_eq!(tokens.access_token(), None);
        assert_eq!(tokens.refresh_token(), None);
        assert!(tokens.remember_me());
    }
}
