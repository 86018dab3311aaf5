//! Authenticated API Client
//!
//! Sends [`ApiRequest`]s through a [`Transport`], attaching the stored bearer
//! token and interpreting the result envelope.
//!
//! ## Token refresh
//!
//! A call rejected with "access token invalid" is parked in the
//! [`RefreshGate`]. The first parked call opens a refresh cycle, which runs in
//! a spawned task so that dropping a caller cannot leave the gate stuck. When
//! the refresh succeeds every parked call is replayed with the new token in
//! the order it was parked; when it fails every parked call is rejected and
//! the session is expired once.
//!
//! A "refresh token invalid" response on any call ends the session at once:
//! parked calls are rejected and a refresh still in flight is fenced by the
//! session epoch, so its late result never restores credentials.

use futures_util::future::join_all;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::oneshot;
use uuid::Uuid;

use super::download::FileDownload;
use super::envelope::{Envelope, ResultCode};
use super::error::{ApiError, ApiResult};
use super::refresh::RefreshGate;
use super::request::{ApiRequest, Auth};
use super::transport::{HttpTransport, PreparedRequest, RawResponse, Transport};
use crate::api::auth::{LoginResult, REFRESH_TOKEN_PATH};
use crate::config::ApiConfig;
use crate::session::Session;

const SESSION_EXPIRED_MESSAGE: &str = "Session expired, please sign in again";
const SYSTEM_ERROR_MESSAGE: &str = "System error";

/// Decoded response payload
#[derive(Debug)]
pub(crate) enum Reply {
    Data(Value),
    Binary(RawResponse),
}

/// What a single response means for the pipeline
enum Outcome {
    Done(Reply),
    AccessTokenExpired,
    RefreshTokenExpired(String),
}

/// A call waiting for the refresh to finish
struct PendingRetry {
    request: ApiRequest,
    reply: oneshot::Sender<ApiResult<Reply>>,
}

/// Cloneable handle to the request pipeline
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    base_url: String,
    transport: Arc<dyn Transport>,
    session: Arc<Session>,
    gate: RefreshGate<PendingRetry>,
}

impl ApiClient {
    /// Client over `reqwest` configured from `config`
    pub fn new(config: &ApiConfig, session: Arc<Session>) -> ApiResult<Self> {
        let transport = HttpTransport::new(config.request_timeout())?;
        Ok(Self::with_transport(
            &config.base_url,
            Arc::new(transport),
            session,
        ))
    }

    pub fn with_transport(
        base_url: &str,
        transport: Arc<dyn Transport>,
        session: Arc<Session>,
    ) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                base_url: base_url.trim_end_matches('/').to_string(),
                transport,
                session,
                gate: RefreshGate::new(),
            }),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.inner.session
    }

    /// Number of token refreshes started by this client
    pub fn refresh_cycles(&self) -> u64 {
        self.inner.gate.cycles()
    }

    /// Send `request` and decode the envelope's `data`
    pub async fn call<T: DeserializeOwned>(&self, request: ApiRequest) -> ApiResult<T> {
        match self.execute(request).await? {
            Reply::Data(data) => Ok(serde_json::from_value(data)?),
            Reply::Binary(_) => Err(ApiError::Decode(
                "expected a JSON envelope, got a file".to_string(),
            )),
        }
    }

    /// Send `request`, discarding any `data`
    pub async fn call_unit(&self, request: ApiRequest) -> ApiResult<()> {
        self.execute(request).await.map(|_| ())
    }

    /// Send `request` expecting a file payload
    pub async fn download(&self, request: ApiRequest) -> ApiResult<FileDownload> {
        match self.execute(request.binary()).await? {
            Reply::Binary(response) => Ok(FileDownload::from_response(response)),
            Reply::Data(_) => Err(ApiError::Decode(
                "expected a file, got a JSON envelope".to_string(),
            )),
        }
    }

    pub(crate) async fn execute(&self, request: ApiRequest) -> ApiResult<Reply> {
        let (response, token) = self.dispatch(&request).await?;

        match self.interpret(&request, response)? {
            Outcome::Done(reply) => Ok(reply),
            Outcome::RefreshTokenExpired(message) => Err(self.end_session(&message)),
            Outcome::AccessTokenExpired => {
                if request.auth == Auth::None {
                    return Err(ApiError::Unauthorized);
                }

                let current = self.inner.session.tokens().access_token();
                if current.is_some() && current != token {
                    tracing::debug!(path = %request.path, "Token changed while in flight, replaying");
                    return self.replay(request).await;
                }

                self.refresh_and_retry(request).await
            }
        }
    }

    /// Park `request` until the running (or a new) refresh completes
    async fn refresh_and_retry(&self, request: ApiRequest) -> ApiResult<Reply> {
        let (reply, receiver) = oneshot::channel();
        let path = request.path.clone();
        let epoch = self.inner.session.epoch();

        if let Some(cycle) = self.inner.gate.enqueue(PendingRetry { request, reply }) {
            tracing::info!(path = %path, cycle, "Access token expired, refreshing");
            let client = self.clone();
            tokio::spawn(async move { client.run_refresh_cycle(cycle, epoch).await });
        } else {
            tracing::debug!(path = %path, "Refresh in progress, request queued");
        }

        receiver
            .await
            .unwrap_or_else(|_| Err(ApiError::RefreshFailed("refresh task ended".to_string())))
    }

    async fn run_refresh_cycle(&self, cycle: u64, epoch: u64) {
        let result = self.refresh_tokens(epoch).await;
        let queued = self.inner.gate.complete(cycle);

        match result {
            Ok(()) => {
                tracing::info!(queued = queued.len(), "Token refreshed, replaying requests");

                let replays = queued.into_iter().map(|pending| {
                    let client = self.clone();
                    async move {
                        let result = client.replay(pending.request).await;
                        // Caller may have given up
                        let _ = pending.reply.send(result);
                    }
                });
                join_all(replays).await;
            }
            Err(err) => {
                tracing::warn!(error = %err, queued = queued.len(), "Token refresh failed");

                let (failure, message) = match err {
                    ApiError::SessionExpired(message) => {
                        (ApiError::SessionExpired(message.clone()), message)
                    }
                    other => (
                        ApiError::RefreshFailed(other.to_string()),
                        SESSION_EXPIRED_MESSAGE.to_string(),
                    ),
                };
                // Already ended elsewhere when the epoch moved on
                if self.inner.session.epoch() == epoch {
                    self.inner.session.expire(&message);
                }

                for pending in queued {
                    let _ = pending.reply.send(Err(failure.clone()));
                }
            }
        }
    }

    /// Exchange the refresh token for a new token pair and store it, unless
    /// the session was reset after `epoch`
    async fn refresh_tokens(&self, epoch: u64) -> ApiResult<()> {
        let tokens = self.inner.session.tokens();
        let refresh_token = tokens
            .refresh_token()
            .ok_or_else(|| ApiError::RefreshFailed("no refresh token stored".to_string()))?;

        let request = ApiRequest::post(REFRESH_TOKEN_PATH)
            .query("refreshToken", &refresh_token)
            .without_auth();
        let (response, _) = self.dispatch(&request).await?;

        match self.interpret(&request, response)? {
            Outcome::Done(Reply::Data(data)) => {
                let result: LoginResult = serde_json::from_value(data)?;
                let refresh = if result.refresh_token.is_empty() {
                    refresh_token
                } else {
                    result.refresh_token
                };
                if self
                    .inner
                    .session
                    .store_refreshed(epoch, &result.access_token, &refresh)?
                {
                    Ok(())
                } else {
                    tracing::info!("Session ended during refresh, new tokens discarded");
                    Err(ApiError::SessionExpired(SESSION_EXPIRED_MESSAGE.to_string()))
                }
            }
            Outcome::Done(Reply::Binary(_)) => Err(ApiError::Decode(
                "refresh returned a file".to_string(),
            )),
            Outcome::AccessTokenExpired => Err(ApiError::RefreshFailed(
                "refresh request rejected".to_string(),
            )),
            Outcome::RefreshTokenExpired(message) => Err(ApiError::SessionExpired(message)),
        }
    }

    /// Send `request` once more; a second token rejection is final
    async fn replay(&self, request: ApiRequest) -> ApiResult<Reply> {
        let (response, _) = self.dispatch(&request).await?;

        match self.interpret(&request, response)? {
            Outcome::Done(reply) => Ok(reply),
            Outcome::AccessTokenExpired => Err(ApiError::Unauthorized),
            Outcome::RefreshTokenExpired(message) => Err(self.end_session(&message)),
        }
    }

    /// Expire the session and reject every parked call
    fn end_session(&self, message: &str) -> ApiError {
        let error = ApiError::SessionExpired(message.to_string());
        self.inner.session.expire(message);

        let parked = self.inner.gate.abort();
        if !parked.is_empty() {
            tracing::debug!(parked = parked.len(), "Rejecting calls parked for refresh");
        }
        for pending in parked {
            let _ = pending.reply.send(Err(error.clone()));
        }

        error
    }

    /// Send one request, returning the response and the token it carried
    async fn dispatch(&self, request: &ApiRequest) -> ApiResult<(RawResponse, Option<String>)> {
        let token = match request.auth {
            Auth::Bearer => self.inner.session.tokens().access_token(),
            Auth::None => None,
        };

        let mut headers = Vec::new();
        if let Some(token) = &token {
            headers.push(("Authorization".to_string(), format!("Bearer {}", token)));
        }

        let prepared = PreparedRequest {
            method: request.method.clone(),
            url: format!("{}{}", self.inner.base_url, request.path),
            query: request.query.clone(),
            headers,
            body: request.body.clone(),
        };

        let request_id = Uuid::new_v4();
        let started = Instant::now();
        tracing::debug!(
            request_id = %request_id,
            method = %request.method,
            path = %request.path,
            "Sending request"
        );

        match self.inner.transport.execute(prepared).await {
            Ok(response) => {
                tracing::debug!(
                    request_id = %request_id,
                    status = response.status,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Response received"
                );
                Ok((response, token))
            }
            Err(e) => {
                tracing::warn!(
                    request_id = %request_id,
                    path = %request.path,
                    error = %e,
                    "Request failed"
                );
                Err(e.into())
            }
        }
    }

    fn interpret(&self, request: &ApiRequest, response: RawResponse) -> ApiResult<Outcome> {
        if request.binary && response.is_success() && !response.is_json() {
            return Ok(Outcome::Done(Reply::Binary(response)));
        }

        if response.is_success() && response.body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Outcome::Done(Reply::Data(Value::Null)));
        }

        let envelope: Envelope = match serde_json::from_slice(&response.body) {
            Ok(envelope) => envelope,
            Err(e) if response.is_success() => return Err(ApiError::Decode(e.to_string())),
            Err(_) => {
                return Err(ApiError::Http {
                    status: response.status,
                    message: response.body_preview(),
                })
            }
        };

        match envelope.result_code() {
            ResultCode::Success => Ok(Outcome::Done(Reply::Data(envelope.data))),
            ResultCode::AccessTokenInvalid => Ok(Outcome::AccessTokenExpired),
            ResultCode::RefreshTokenInvalid => Ok(Outcome::RefreshTokenExpired(
                envelope.message_or(SESSION_EXPIRED_MESSAGE),
            )),
            code => Err(ApiError::Business {
                code: code.as_str().to_string(),
                message: envelope.message_or(SYSTEM_ERROR_MESSAGE),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::mock::{envelope, MockTransport};
    use crate::http::transport::TransportError;
    use crate::session::SessionEvent;
    use async_trait::async_trait;
    use serde_json::json;
    use std::time::Duration;

    fn session_with(access: &str, refresh: &str) -> Arc<Session> {
        let session = Arc::new(Session::in_memory());
        session.tokens().set_tokens(access, refresh, false).unwrap();
        session
    }

    fn client(transport: Arc<MockTransport>, session: Arc<Session>) -> ApiClient {
        ApiClient::with_transport("http://console.test/", transport, session)
    }

    fn refreshed() -> Result<RawResponse, TransportError> {
        Ok(envelope(
            "00000",
            json!({ "accessToken": "new", "refreshToken": "r2", "tokenType": "Bearer", "expiresIn": 7200 }),
            "",
        ))
    }

    #[tokio::test]
    async fn test_concurrent_expiry_refreshes_once_and_replays_in_order() {
        let session = session_with("old", "r1");
        let transport = MockTransport::new(|req| {
            if req.url.ends_with(REFRESH_TOKEN_PATH) {
                return refreshed();
            }
            match req.header("Authorization") {
                Some("Bearer new") => Ok(envelope("00000", json!(req.query_value("n")), "")),
                _ => Ok(envelope("A0230", Value::Null, "Access token expired")),
            }
        });
        let client = client(transport.clone(), session.clone());

        let calls = (0..5).map(|n| {
            let client = client.clone();
            async move {
                client
                    .call::<String>(ApiRequest::get("/api/v1/devices").query("n", n))
                    .await
            }
        });
        let results = join_all(calls).await;

        for (n, result) in results.into_iter().enumerate() {
            assert_eq!(result.unwrap(), n.to_string());
        }
        assert_eq!(transport.count(REFRESH_TOKEN_PATH), 1);
        assert_eq!(client.refresh_cycles(), 1);

        let replayed: Vec<_> = transport
            .requests()
            .into_iter()
            .filter(|r| r.header("Authorization") == Some("Bearer new"))
            .map(|r| r.query_value("n").unwrap().to_string())
            .collect();
        assert_eq!(replayed, vec!["0", "1", "2", "3", "4"]);

        let refresh = transport
            .requests()
            .into_iter()
            .find(|r| r.url.ends_with(REFRESH_TOKEN_PATH))
            .unwrap();
        assert_eq!(refresh.query_value("refreshToken"), Some("r1"));
        assert_eq!(refresh.header("Authorization"), None);
        assert_eq!(session.tokens().refresh_token().as_deref(), Some("r2"));
    }

    #[tokio::test]
    async fn test_refresh_failure_rejects_all_and_expires_once() {
        let session = session_with("old", "r1");
        session.set_location("/alarm/monitoring");
        let mut events = session.subscribe();

        let transport = MockTransport::new(|req| {
            if req.url.ends_with(REFRESH_TOKEN_PATH) {
                Ok(envelope("B0001", Value::Null, "Refresh service unavailable"))
            } else {
                Ok(envelope("A0230", Value::Null, ""))
            }
        });
        let client = client(transport.clone(), session.clone());

        let calls = (0..3).map(|_| client.call::<Value>(ApiRequest::get("/api/v1/users/me")));
        let results = join_all(calls).await;

        for result in results {
            assert!(matches!(result, Err(ApiError::RefreshFailed(_))));
        }
        assert_eq!(transport.count(REFRESH_TOKEN_PATH), 1);
        assert!(!session.is_logged_in());
        assert_eq!(client.inner.gate.pending(), 0);
        assert!(!client.inner.gate.is_refreshing());

        assert_eq!(
            events.try_recv().unwrap(),
            SessionEvent::LoginRequired {
                message: SESSION_EXPIRED_MESSAGE.to_string(),
                redirect: "/login?redirect=%2Falarm%2Fmonitoring".to_string(),
            }
        );
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_rejected_refresh_token_expires_session() {
        let session = session_with("old", "r1");
        let transport = MockTransport::new(|req| {
            if req.url.ends_with(REFRESH_TOKEN_PATH) {
                Ok(envelope("A0231", Value::Null, "Refresh token expired"))
            } else {
                Ok(envelope("A0230", Value::Null, ""))
            }
        });
        let client = client(transport, session.clone());
        let mut events = session.subscribe();

        let result = client.call::<Value>(ApiRequest::get("/api/v1/roles/options")).await;

        assert_eq!(
            result.unwrap_err(),
            ApiError::SessionExpired("Refresh token expired".to_string())
        );
        assert!(!session.is_logged_in());
        assert!(matches!(
            events.try_recv(),
            Ok(SessionEvent::LoginRequired { message, .. }) if message == "Refresh token expired"
        ));
        assert!(events.try_recv().is_err());
    }

    /// Slow refresh on `/parked`, while `/ended` is answered with
    /// "refresh token invalid" before the refresh returns
    struct SlowRefresh {
        inner: Arc<MockTransport>,
    }

    #[async_trait]
    impl Transport for SlowRefresh {
        async fn execute(&self, request: PreparedRequest) -> Result<RawResponse, TransportError> {
            if request.url.ends_with(REFRESH_TOKEN_PATH) {
                tokio::time::sleep(Duration::from_millis(100)).await;
            } else if request.url.ends_with("/ended") {
                tokio::time::sleep(Duration::from_millis(30)).await;
            }
            self.inner.execute(request).await
        }
    }

    #[tokio::test]
    async fn test_refresh_token_invalid_during_refresh_ends_session() {
        let session = session_with("old", "r1");
        let mut events = session.subscribe();
        let mock = MockTransport::new(|req| {
            if req.url.ends_with(REFRESH_TOKEN_PATH) {
                refreshed()
            } else if req.url.ends_with("/ended") {
                Ok(envelope("A0231", Value::Null, "Refresh token expired"))
            } else {
                Ok(envelope("A0230", Value::Null, ""))
            }
        });
        let client = ApiClient::with_transport(
            "http://console.test",
            Arc::new(SlowRefresh {
                inner: mock.clone(),
            }),
            session.clone(),
        );

        let (parked, ended) = tokio::join!(
            client.call::<Value>(ApiRequest::get("/parked")),
            client.call::<Value>(ApiRequest::get("/ended")),
        );

        let expired = ApiError::SessionExpired("Refresh token expired".to_string());
        assert_eq!(parked.unwrap_err(), expired);
        assert_eq!(ended.unwrap_err(), expired);

        // Let the refresh return; its tokens must not revive the session
        tokio::time::sleep(Duration::from_millis(150)).await;

        assert_eq!(mock.count(REFRESH_TOKEN_PATH), 1);
        assert!(!session.is_logged_in());
        assert_eq!(session.tokens().refresh_token(), None);
        assert!(!client.inner.gate.is_refreshing());
        assert!(matches!(
            events.try_recv(),
            Ok(SessionEvent::LoginRequired { .. })
        ));
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_missing_refresh_token_fails_refresh() {
        let session = Arc::new(Session::in_memory());
        session.tokens().set_tokens("old", "", false).unwrap();
        let transport = MockTransport::new(|_| Ok(envelope("A0230", Value::Null, "")));
        let client = client(transport.clone(), session.clone());

        let result = client.call::<Value>(ApiRequest::get("/api/v1/menus/routes")).await;

        assert!(matches!(result, Err(ApiError::RefreshFailed(_))));
        assert_eq!(transport.count(REFRESH_TOKEN_PATH), 0);
        assert!(!session.is_logged_in());
    }

    #[tokio::test]
    async fn test_refresh_token_invalid_on_normal_call() {
        let session = session_with("old", "r1");
        let mut events = session.subscribe();
        let transport = MockTransport::new(|_| Ok(envelope("A0231", Value::Null, "")));
        let client = client(transport.clone(), session.clone());

        let result = client.call::<Value>(ApiRequest::get("/api/v1/devices")).await;

        assert_eq!(
            result.unwrap_err(),
            ApiError::SessionExpired(SESSION_EXPIRED_MESSAGE.to_string())
        );
        assert_eq!(transport.count(REFRESH_TOKEN_PATH), 0);
        assert!(!session.is_logged_in());
        assert!(matches!(
            events.try_recv(),
            Ok(SessionEvent::LoginRequired { .. })
        ));
    }

    #[tokio::test]
    async fn test_replay_rejected_again_is_unauthorized() {
        let session = session_with("old", "r1");
        let transport = MockTransport::new(|req| {
            if req.url.ends_with(REFRESH_TOKEN_PATH) {
                refreshed()
            } else {
                Ok(envelope("A0230", Value::Null, ""))
            }
        });
        let client = client(transport.clone(), session);

        let result = client.call::<Value>(ApiRequest::get("/api/v1/devices")).await;

        assert_eq!(result.unwrap_err(), ApiError::Unauthorized);
        assert_eq!(transport.count(REFRESH_TOKEN_PATH), 1);
        assert_eq!(transport.count("/api/v1/devices"), 2);
    }

    #[tokio::test]
    async fn test_stale_token_replays_without_refresh() {
        let session = session_with("old", "r1");
        let shared = session.clone();
        let transport = MockTransport::new(move |req| match req.header("Authorization") {
            Some("Bearer old") => {
                // Another call refreshed while this one was in flight
                shared.tokens().set_tokens("new", "r2", false).unwrap();
                Ok(envelope("A0230", Value::Null, ""))
            }
            _ => Ok(envelope("00000", json!(42), "")),
        });
        let client = client(transport.clone(), session);

        let value: u32 = client.call(ApiRequest::get("/api/v1/devices/7")).await.unwrap();

        assert_eq!(value, 42);
        assert_eq!(transport.count(REFRESH_TOKEN_PATH), 0);
        assert_eq!(client.refresh_cycles(), 0);
        assert_eq!(transport.last().header("Authorization"), Some("Bearer new"));
    }

    #[tokio::test]
    async fn test_bearer_header_only_when_authenticated() {
        let session = session_with("tok", "r1");
        let transport = MockTransport::ok(Value::Null);
        let client = client(transport.clone(), session);

        client.call_unit(ApiRequest::get("/api/v1/users/me")).await.unwrap();
        assert_eq!(transport.last().header("authorization"), Some("Bearer tok"));
        assert_eq!(transport.last().url, "http://console.test/api/v1/users/me");

        client
            .call_unit(ApiRequest::get("/api/v1/auth/captcha").without_auth())
            .await
            .unwrap();
        assert_eq!(transport.last().header("authorization"), None);
    }

    #[tokio::test]
    async fn test_business_error_carries_message() {
        let transport =
            MockTransport::new(|_| Ok(envelope("C0001", Value::Null, "Device code already exists")));
        let client = client(transport, session_with("t", "r"));

        let err = client
            .call_unit(ApiRequest::post("/api/v1/devices"))
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "Device code already exists");
        assert!(!err.is_auth());
        assert!(matches!(err, ApiError::Business { ref code, .. } if code == "C0001"));
    }

    #[tokio::test]
    async fn test_network_failures_are_distinct() {
        let transport = MockTransport::new(|req| {
            if req.url.ends_with("/slow") {
                Err(TransportError::Timeout)
            } else {
                Err(TransportError::Connect("connection refused".to_string()))
            }
        });
        let client = client(transport, session_with("t", "r"));

        assert!(matches!(
            client.call_unit(ApiRequest::get("/down")).await,
            Err(ApiError::Network(_))
        ));
        assert_eq!(
            client.call_unit(ApiRequest::get("/slow")).await,
            Err(ApiError::Timeout)
        );
    }

    #[tokio::test]
    async fn test_non_envelope_error_status() {
        let transport = MockTransport::new(|_| {
            Ok(RawResponse {
                status: 502,
                headers: vec![("content-type".to_string(), "text/html".to_string())],
                body: b"<html>Bad Gateway</html>".to_vec(),
            })
        });
        let client = client(transport, session_with("t", "r"));

        assert_eq!(
            client.call_unit(ApiRequest::get("/api/v1/menus")).await,
            Err(ApiError::Http {
                status: 502,
                message: "<html>Bad Gateway</html>".to_string(),
            })
        );
    }

    #[tokio::test]
    async fn test_download_returns_file() {
        let transport = MockTransport::new(|_| {
            Ok(RawResponse {
                status: 200,
                headers: vec![
                    ("Content-Type".to_string(), "application/vnd.ms-excel".to_string()),
                    (
                        "Content-Disposition".to_string(),
                        "attachment; filename=users.xlsx".to_string(),
                    ),
                ],
                body: vec![1, 2, 3],
            })
        });
        let client = client(transport, session_with("t", "r"));

        let file = client
            .download(ApiRequest::get("/api/v1/users/export"))
            .await
            .unwrap();

        assert_eq!(file.file_name.as_deref(), Some("users.xlsx"));
        assert_eq!(file.content_type.as_deref(), Some("application/vnd.ms-excel"));
        assert_eq!(file.bytes, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_http_transport_sends_bearer_header() {
        use axum::{http::HeaderMap, routing::get, Json, Router};

        async fn echo(headers: HeaderMap) -> Json<Value> {
            let auth = headers
                .get("authorization")
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            Json(json!({ "code": "00000", "data": auth, "msg": "" }))
        }

        let app = Router::new().route("/api/v1/echo", get(echo));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let config = ApiConfig {
            base_url: format!("http://{}", addr),
            request_timeout_ms: 5_000,
        };
        let client = ApiClient::new(&config, session_with("abc", "r")).unwrap();

        let with_auth: Option<String> = client.call(ApiRequest::get("/api/v1/echo")).await.unwrap();
        let without_auth: Option<String> = client
            .call(ApiRequest::get("/api/v1/echo").without_auth())
            .await
            .unwrap();

        assert_eq!(with_auth.as_deref(), Some("Bearer abc"));
        assert_eq!(without_auth, None);
    }
}
