//! Scripted transport for pipeline tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::Arc;

use super::transport::{PreparedRequest, RawResponse, Transport, TransportError};

type Handler = dyn Fn(&PreparedRequest) -> Result<RawResponse, TransportError> + Send + Sync;

/// Records every request and answers through a handler closure.
///
/// The request is recorded on the first poll; the handler runs after one
/// yield.
pub struct MockTransport {
    handler: Box<Handler>,
    requests: Mutex<Vec<PreparedRequest>>,
}

impl MockTransport {
    pub fn new<F>(handler: F) -> Arc<Self>
    where
        F: Fn(&PreparedRequest) -> Result<RawResponse, TransportError> + Send + Sync + 'static,
    {
        Arc::new(Self {
            handler: Box::new(handler),
            requests: Mutex::new(Vec::new()),
        })
    }

    /// Answer every request with a successful envelope around `data`
    pub fn ok(data: Value) -> Arc<Self> {
        Self::new(move |_| Ok(envelope("00000", data.clone(), "")))
    }

    pub fn requests(&self) -> Vec<PreparedRequest> {
        self.requests.lock().clone()
    }

    pub fn last(&self) -> PreparedRequest {
        self.requests
            .lock()
            .last()
            .cloned()
            .expect("no request recorded")
    }

    /// Requests whose URL ends with `suffix`
    pub fn count(&self, suffix: &str) -> usize {
        self.requests
            .lock()
            .iter()
            .filter(|r| r.url.ends_with(suffix))
            .count()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn execute(&self, request: PreparedRequest) -> Result<RawResponse, TransportError> {
        self.requests.lock().push(request.clone());
        // Stay pending for one poll so concurrent callers overlap
        tokio::task::yield_now().await;
        (self.handler)(&request)
    }
}

/// JSON envelope response with HTTP 200
pub fn envelope(code: &str, data: Value, msg: &str) -> RawResponse {
    RawResponse {
        status: 200,
        headers: vec![("content-type".to_string(), "application/json".to_string())],
        body: serde_json::to_vec(&json!({ "code": code, "data": data, "msg": msg }))
            .expect("serializable envelope"),
    }
}
