//! Result Envelope
//!
//! Every JSON response is wrapped as `{ code, data, msg }`; success is decided
//! by `code`, not by the HTTP status alone.

use serde::Deserialize;
use serde_json::Value;

/// Application-level result codes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultCode {
    Success,
    Error,
    AccessTokenInvalid,
    RefreshTokenInvalid,
    Other(String),
}

impl ResultCode {
    pub fn as_str(&self) -> &str {
        match self {
            ResultCode::Success => "00000",
            ResultCode::Error => "B0001",
            ResultCode::AccessTokenInvalid => "A0230",
            ResultCode::RefreshTokenInvalid => "A0231",
            ResultCode::Other(code) => code,
        }
    }
}

impl From<&str> for ResultCode {
    fn from(code: &str) -> Self {
        match code {
            "00000" => ResultCode::Success,
            "B0001" => ResultCode::Error,
            "A0230" => ResultCode::AccessTokenInvalid,
            "A0231" => ResultCode::RefreshTokenInvalid,
            other => ResultCode::Other(other.to_string()),
        }
    }
}

/// Response wrapper
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope {
    pub code: String,
    #[serde(default)]
    pub data: Value,
    #[serde(default)]
    pub msg: Option<String>,
}

impl Envelope {
    pub fn result_code(&self) -> ResultCode {
        ResultCode::from(self.code.as_str())
    }

    /// Server message, or `fallback` when it is missing or blank
    pub fn message_or(&self, fallback: &str) -> String {
        self.msg
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or(fallback)
            .to_string()
    }
}
