//! Dictionary Cache
//!
//! Lookup tables (`code → items`) fetched from `/api/v1/dicts/{code}/items`
//! and persisted under the `dict_cache` key so they survive restarts.
//!
//! Concurrent loads of the same code share one in-flight request. A failed
//! load caches nothing and hands the error to every waiter.

use futures_util::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

use crate::api::dicts::DictItemOption;
use crate::http::{ApiClient, ApiResult};
use crate::session::{KeyValueStore, SessionScoped};

/// Persistent store key of the cached table
pub const DICT_CACHE_KEY: &str = "dict_cache";

type SharedLoad = Shared<BoxFuture<'static, ApiResult<Vec<DictItemOption>>>>;

/// Session-scoped dictionary table
#[derive(Clone)]
pub struct DictCache {
    inner: Arc<DictInner>,
}

struct DictInner {
    client: ApiClient,
    store: Arc<dyn KeyValueStore>,
    state: Mutex<DictState>,
}

#[derive(Default)]
struct DictState {
    table: HashMap<String, Vec<DictItemOption>>,
    inflight: HashMap<String, SharedLoad>,
    /// Bumped on clear; loads started before a clear do not write back
    generation: u64,
}

impl DictCache {
    /// Cache persisted in the client's persistent store
    pub fn new(client: ApiClient) -> Self {
        let store = Arc::clone(client.session().tokens().persistent());
        Self::with_store(client, store)
    }

    pub fn with_store(client: ApiClient, store: Arc<dyn KeyValueStore>) -> Self {
        let table = match store.get(DICT_CACHE_KEY) {
            Some(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Discarding unreadable dictionary cache");
                HashMap::new()
            }),
            None => HashMap::new(),
        };

        Self {
            inner: Arc::new(DictInner {
                client,
                store,
                state: Mutex::new(DictState {
                    table,
                    ..Default::default()
                }),
            }),
        }
    }

    /// Items of `code`, fetching them on first use
    pub async fn load(&self, code: &str) -> ApiResult<Vec<DictItemOption>> {
        let load = {
            let mut state = self.inner.state.lock();

            if let Some(items) = state.table.get(code) {
                return Ok(items.clone());
            }

            match state.inflight.get(code) {
                Some(load) => load.clone(),
                None => {
                    let inner = Arc::clone(&self.inner);
                    let generation = state.generation;
                    let owned = code.to_string();
                    let load = async move { inner.fetch(owned, generation).await }
                        .boxed()
                        .shared();
                    state.inflight.insert(code.to_string(), load.clone());
                    load
                }
            }
        };

        load.await
    }

    /// Cached items of `code`, empty when not loaded
    pub fn items(&self, code: &str) -> Vec<DictItemOption> {
        self.inner
            .state
            .lock()
            .table
            .get(code)
            .cloned()
            .unwrap_or_default()
    }

    /// Label of `value` in a loaded dictionary
    pub fn label(&self, code: &str, value: &str) -> Option<String> {
        self.inner
            .state
            .lock()
            .table
            .get(code)?
            .iter()
            .find(|item| item.matches(value))
            .map(|item| item.label.clone())
    }

    pub fn contains(&self, code: &str) -> bool {
        self.inner.state.lock().table.contains_key(code)
    }

    /// Drop one dictionary so the next load refetches it
    pub fn remove(&self, code: &str) {
        let removed = self.inner.state.lock().table.remove(code).is_some();
        if removed {
            self.inner.persist();
        }
    }

    /// Drop every dictionary
    pub fn clear(&self) {
        {
            let mut state = self.inner.state.lock();
            state.table.clear();
            state.inflight.clear();
            state.generation += 1;
        }

        if let Err(e) = self.inner.store.remove(DICT_CACHE_KEY) {
            tracing::warn!(error = %e, "Failed to remove dictionary cache");
        }
    }
}

impl DictInner {
    async fn fetch(
        self: Arc<Self>,
        code: String,
        generation: u64,
    ) -> ApiResult<Vec<DictItemOption>> {
        let result = self.client.dicts().items(&code).await;

        let stored = {
            let mut state = self.state.lock();
            if state.generation != generation {
                false
            } else {
                state.inflight.remove(&code);
                match &result {
                    Ok(items) => {
                        state.table.insert(code.clone(), items.clone());
                        true
                    }
                    Err(_) => false,
                }
            }
        };

        match &result {
            Ok(items) if stored => {
                tracing::debug!(code = %code, items = items.len(), "Dictionary loaded");
                self.persist();
            }
            Ok(_) => {}
            Err(e) => tracing::warn!(code = %code, error = %e, "Dictionary load failed"),
        }

        result
    }

    fn persist(&self) {
        let serialized = serde_json::to_string(&self.state.lock().table);

        let outcome = match serialized {
            Ok(raw) => self.store.set(DICT_CACHE_KEY, &raw).map_err(|e| e.to_string()),
            Err(e) => Err(e.to_string()),
        };
        if let Err(e) = outcome {
            tracing::warn!(error = %e, "Failed to persist dictionary cache");
        }
    }
}

impl SessionScoped for DictCache {
    fn reset(&self) {
        self.clear();
    }
}
