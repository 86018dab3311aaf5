//! Authentication endpoints (`/api/v1/auth`)

use serde::{Deserialize, Serialize};

use crate::http::{ApiClient, ApiRequest, ApiResult};
use crate::session::SessionEvent;

const BASE: &str = "/api/v1/auth";

/// Token exchange endpoint, called by the pipeline itself
pub const REFRESH_TOKEN_PATH: &str = "/api/v1/auth/refresh-token";

/// Credentials entered on the login form
#[derive(Debug, Clone, Default)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
    pub captcha_key: String,
    pub captcha_code: String,
    /// Keep the tokens in persistent storage
    pub remember_me: bool,
}

/// Token pair issued by login and refresh
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResult {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: String,
    #[serde(default)]
    pub token_type: String,
    #[serde(default)]
    pub expires_in: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptchaInfo {
    pub captcha_key: String,
    /// `data:image/...;base64,` URL of the captcha image
    pub captcha_base64: String,
}

pub struct AuthApi<'a> {
    client: &'a ApiClient,
}

impl<'a> AuthApi<'a> {
    pub(crate) fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    /// Sign in and store the issued tokens
    pub async fn login(&self, form: &LoginForm) -> ApiResult<LoginResult> {
        let request = ApiRequest::post(format!("{}/login", BASE))
            .form(vec![
                ("username".to_string(), form.username.clone()),
                ("password".to_string(), form.password.clone()),
                ("captchaKey".to_string(), form.captcha_key.clone()),
                ("captchaCode".to_string(), form.captcha_code.clone()),
            ])
            .without_auth();

        let result: LoginResult = self.client.call(request).await?;

        let session = self.client.session();
        session
            .tokens()
            .set_tokens(&result.access_token, &result.refresh_token, form.remember_me)?;
        session.notify(SessionEvent::LoggedIn);

        tracing::info!(username = %form.username, remember_me = form.remember_me, "Logged in");
        Ok(result)
    }

    /// Exchange a refresh token for a new token pair without storing it
    pub async fn refresh_token(&self, refresh_token: &str) -> ApiResult<LoginResult> {
        self.client
            .call(
                ApiRequest::post(REFRESH_TOKEN_PATH)
                    .query("refreshToken", refresh_token)
                    .without_auth(),
            )
            .await
    }

    /// Sign out on the server and drop all local session state.
    ///
    /// Local state is reset even when the server call fails.
    pub async fn logout(&self) -> ApiResult<()> {
        let result = self
            .client
            .call_unit(ApiRequest::delete(format!("{}/logout", BASE)))
            .await;

        if let Err(e) = &result {
            tracing::warn!(error = %e, "Server logout failed, clearing local session anyway");
        }

        let session = self.client.session();
        session.reset();
        session.notify(SessionEvent::LoggedOut);

        result
    }

    pub async fn captcha(&self) -> ApiResult<CaptchaInfo> {
        self.client
            .call(ApiRequest::get(format!("{}/captcha", BASE)).without_auth())
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::client;
    use crate::http::mock::{envelope, MockTransport};
    use crate::http::Body;
    use serde_json::{json, Value};

    fn form(remember_me: bool) -> LoginForm {
        LoginForm {
            username: "admin".to_string(),
            password: "123456".to_string(),
            captcha_key: "k1".to_string(),
            captcha_code: "abcd".to_string(),
            remember_me,
        }
    }

    #[tokio::test]
    async fn test_login_stores_tokens_and_notifies() {
        let transport = MockTransport::ok(json!({
            "accessToken": "a2", "refreshToken": "r2", "tokenType": "Bearer", "expiresIn": 7200
        }));
        let client = client(transport.clone());
        client.session().tokens().clear().unwrap();
        let mut events = client.session().subscribe();

        let result = client.auth().login(&form(true)).await.unwrap();

        assert_eq!(result.expires_in, Some(7200));
        let request = transport.last();
        assert_eq!(request.url, "http://console.test/api/v1/auth/login");
        assert_eq!(request.header("Authorization"), None);
        match request.body {
            Body::Form(fields) => {
                assert!(fields.contains(&("captchaKey".to_string(), "k1".to_string())));
                assert!(fields.contains(&("username".to_string(), "admin".to_string())));
            }
            other => panic!("expected form body, got {:?}", other),
        }

        let tokens = client.session().tokens();
        assert!(tokens.remember_me());
        assert_eq!(tokens.access_token().as_deref(), Some("a2"));
        assert_eq!(events.try_recv().unwrap(), SessionEvent::LoggedIn);
    }

    #[tokio::test]
    async fn test_failed_login_keeps_session_empty() {
        let transport =
            MockTransport::new(|_| Ok(envelope("A0210", Value::Null, "Wrong captcha")));
        let client = client(transport);
        client.session().tokens().clear().unwrap();

        let err = client.auth().login(&form(false)).await.unwrap_err();

        assert_eq!(err.to_string(), "Wrong captcha");
        assert!(!client.session().is_logged_in());
    }

    #[tokio::test]
    async fn test_logout_resets_even_on_failure() {
        let transport = MockTransport::new(|_| Ok(envelope("B0001", Value::Null, "down")));
        let client = client(transport.clone());
        let mut events = client.session().subscribe();

        assert!(client.auth().logout().await.is_err());

        assert_eq!(transport.last().method, reqwest::Method::DELETE);
        assert!(!client.session().is_logged_in());
        assert_eq!(events.try_recv().unwrap(), SessionEvent::LoggedOut);
    }

    #[tokio::test]
    async fn test_captcha_is_unauthenticated() {
        let transport = MockTransport::ok(json!({ "captchaKey": "k", "captchaBase64": "data:image/png;base64,AA==" }));
        let client = client(transport.clone());

        let captcha = client.auth().captcha().await.unwrap();

        assert_eq!(captcha.captcha_key, "k");
        assert_eq!(transport.last().header("Authorization"), None);
    }
}
