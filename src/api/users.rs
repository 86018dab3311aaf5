//! User endpoints (`/api/v1/users`)

use serde::{Deserialize, Serialize};

use super::{join_ids, OptionItem, PageQuery, PageResult};
use crate::http::{ApiClient, ApiRequest, ApiResult, FileDownload};

const BASE: &str = "/api/v1/users";

/// Signed-in user with roles and permissions
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    pub user_id: Option<String>,
    pub username: Option<String>,
    pub nickname: Option<String>,
    pub avatar: Option<String>,
    pub dept_id: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub perms: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPageQuery {
    #[serde(flatten)]
    pub page: PageQuery,
    pub keywords: Option<String>,
    pub status: Option<i32>,
    pub dept_id: Option<String>,
    /// Creation time range, start and end
    pub create_time: Option<[String; 2]>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPageItem {
    pub id: String,
    pub username: Option<String>,
    pub nickname: Option<String>,
    pub avatar: Option<String>,
    pub dept_name: Option<String>,
    pub email: Option<String>,
    pub gender: Option<i32>,
    pub mobile: Option<String>,
    pub role_names: Option<String>,
    pub status: Option<i32>,
    pub create_time: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserForm {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub username: Option<String>,
    pub nickname: Option<String>,
    pub avatar: Option<String>,
    pub dept_id: Option<String>,
    pub email: Option<String>,
    pub gender: Option<i32>,
    pub mobile: Option<String>,
    #[serde(default)]
    pub role_ids: Vec<i64>,
    pub status: Option<i32>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: Option<String>,
    pub username: Option<String>,
    pub nickname: Option<String>,
    pub avatar: Option<String>,
    pub gender: Option<i32>,
    pub mobile: Option<String>,
    pub email: Option<String>,
    pub dept_name: Option<String>,
    pub role_names: Option<String>,
    pub create_time: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfileForm {
    pub nickname: Option<String>,
    pub avatar: Option<String>,
    pub gender: Option<i32>,
    pub mobile: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordChangeForm {
    pub old_password: String,
    pub new_password: String,
    pub confirm_password: String,
}

pub struct UsersApi<'a> {
    client: &'a ApiClient,
}

impl<'a> UsersApi<'a> {
    pub(crate) fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    pub async fn me(&self) -> ApiResult<UserInfo> {
        self.client.call(ApiRequest::get(format!("{}/me", BASE))).await
    }

    pub async fn page(&self, query: &UserPageQuery) -> ApiResult<PageResult<UserPageItem>> {
        let request = ApiRequest::get(format!("{}/page", BASE)).query_params(query)?;
        self.client.call(request).await
    }

    pub async fn form(&self, id: &str) -> ApiResult<UserForm> {
        self.client
            .call(ApiRequest::get(format!("{}/{}/form", BASE, id)))
            .await
    }

    pub async fn create(&self, form: &UserForm) -> ApiResult<()> {
        self.client.call_unit(ApiRequest::post(BASE).json(form)?).await
    }

    pub async fn update(&self, id: &str, form: &UserForm) -> ApiResult<()> {
        self.client
            .call_unit(ApiRequest::put(format!("{}/{}", BASE, id)).json(form)?)
            .await
    }

    pub async fn delete<S: AsRef<str>>(&self, ids: &[S]) -> ApiResult<()> {
        self.client
            .call_unit(ApiRequest::delete(format!("{}/{}", BASE, join_ids(ids))))
            .await
    }

    /// Administrative password reset
    pub async fn reset_password(&self, id: &str, password: &str) -> ApiResult<()> {
        self.client
            .call_unit(
                ApiRequest::put(format!("{}/{}/password/reset", BASE, id))
                    .query("password", password),
            )
            .await
    }

    pub async fn options(&self) -> ApiResult<Vec<OptionItem>> {
        self.client
            .call(ApiRequest::get(format!("{}/options", BASE)))
            .await
    }

    pub async fn profile(&self) -> ApiResult<UserProfile> {
        self.client
            .call(ApiRequest::get(format!("{}/profile", BASE)))
            .await
    }

    pub async fn update_profile(&self, form: &UserProfileForm) -> ApiResult<()> {
        self.client
            .call_unit(ApiRequest::put(format!("{}/profile", BASE)).json(form)?)
            .await
    }

    pub async fn change_password(&self, form: &PasswordChangeForm) -> ApiResult<()> {
        self.client
            .call_unit(ApiRequest::put(format!("{}/password", BASE)).json(form)?)
            .await
    }

    /// Spreadsheet export of the users matching `query`
    pub async fn export(&self, query: &UserPageQuery) -> ApiResult<FileDownload> {
        let request = ApiRequest::get(format!("{}/export", BASE)).query_params(query)?;
        self.client.download(request).await
    }
}
