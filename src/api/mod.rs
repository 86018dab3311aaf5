//! Typed API Groups
//!
//! One group per backend resource. Each group borrows the [`ApiClient`] and
//! maps one method to one endpoint; every call goes through the
//! authenticated pipeline.
//!
//! ```ignore
//! let devices = client.devices().list(&DeviceQuery::default()).await?;
//! client.alarms().acknowledge("42", Some("on site")).await?;
//! ```

pub mod alarms;
pub mod auth;
pub mod devices;
pub mod dicts;
pub mod files;
pub mod menus;
pub mod notifications;
pub mod roles;
pub mod users;

use serde::{Deserialize, Serialize};

use crate::http::ApiClient;

pub use alarms::{AlarmMonitoringApi, AlarmRulesApi};
pub use auth::AuthApi;
pub use devices::DevicesApi;
pub use dicts::DictsApi;
pub use files::FilesApi;
pub use menus::MenusApi;
pub use notifications::NotificationsApi;
pub use roles::RolesApi;
pub use users::UsersApi;

// ============================================
// SHARED SHAPES
// ============================================

/// One page of a paged listing
#[derive(Debug, Clone, Deserialize)]
pub struct PageResult<T> {
    #[serde(default = "Vec::new")]
    pub list: Vec<T>,
    #[serde(default)]
    pub total: u64,
}

/// Paging parameters shared by every `/page` endpoint
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageQuery {
    pub page_num: u32,
    pub page_size: u32,
}

impl Default for PageQuery {
    fn default() -> Self {
        Self {
            page_num: 1,
            page_size: 10,
        }
    }
}

/// Select-box option, possibly nested
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionItem {
    pub value: serde_json::Value,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<OptionItem>>,
}

/// Comma-joined id list used by batch delete endpoints
pub(crate) fn join_ids<S: AsRef<str>>(ids: &[S]) -> String {
    ids.iter()
        .map(|id| id.as_ref())
        .collect::<Vec<_>>()
        .join(",")
}

// ============================================
// GROUP ACCESSORS
// ============================================

impl ApiClient {
    pub fn auth(&self) -> AuthApi<'_> {
        AuthApi::new(self)
    }

    pub fn users(&self) -> UsersApi<'_> {
        UsersApi::new(self)
    }

    pub fn roles(&self) -> RolesApi<'_> {
        RolesApi::new(self)
    }

    pub fn menus(&self) -> MenusApi<'_> {
        MenusApi::new(self)
    }

    pub fn devices(&self) -> DevicesApi<'_> {
        DevicesApi::new(self)
    }

    pub fn alarm_rules(&self) -> AlarmRulesApi<'_> {
        AlarmRulesApi::new(self)
    }

    pub fn alarms(&self) -> AlarmMonitoringApi<'_> {
        AlarmMonitoringApi::new(self)
    }

    pub fn notifications(&self) -> NotificationsApi<'_> {
        NotificationsApi::new(self)
    }

    pub fn dicts(&self) -> DictsApi<'_> {
        DictsApi::new(self)
    }

    pub fn files(&self) -> FilesApi<'_> {
        FilesApi::new(self)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Arc;

    use crate::http::mock::MockTransport;
    use crate::http::ApiClient;
    use crate::session::Session;

    /// Signed-in client over `transport`
    pub fn client(transport: Arc<MockTransport>) -> ApiClient {
        let session = Arc::new(Session::in_memory());
        session
            .tokens()
            .set_tokens("token", "refresh", false)
            .unwrap();
        ApiClient::with_transport("http://console.test", transport, session)
    }
}
