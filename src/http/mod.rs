//! Authenticated HTTP Pipeline
//!
//! ## Architecture
//!
//! - **ApiRequest**: transport-independent description of one call
//! - **Transport**: sends a prepared request (`reqwest` in production)
//! - **Envelope**: `{ code, data, msg }` result wrapper
//! - **RefreshGate**: single-flight token refresh with an ordered replay queue
//! - **ApiClient**: ties the above together with the session's credentials

mod client;
mod download;
mod envelope;
mod error;
mod refresh;
mod request;
mod transport;

#[cfg(test)]
pub(crate) mod mock;

pub use client::ApiClient;
pub use download::{parse_content_disposition, FileDownload};
pub use envelope::{Envelope, ResultCode};
pub use error::{ApiError, ApiResult};
pub use refresh::RefreshGate;
pub use request::{ApiRequest, Auth, Body};
pub use transport::{HttpTransport, PreparedRequest, RawResponse, Transport, TransportError};
