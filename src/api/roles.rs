//! Role endpoints (`/api/v1/roles`)

use serde::{Deserialize, Serialize};

use super::{join_ids, OptionItem, PageQuery, PageResult};
use crate::http::{ApiClient, ApiRequest, ApiResult};

const BASE: &str = "/api/v1/roles";

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RolePageQuery {
    #[serde(flatten)]
    pub page: PageQuery,
    pub keywords: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RolePageItem {
    pub id: Option<String>,
    pub code: Option<String>,
    pub name: Option<String>,
    pub sort: Option<i32>,
    pub status: Option<i32>,
    pub create_time: Option<String>,
    pub update_time: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleForm {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub code: Option<String>,
    pub name: Option<String>,
    pub data_scope: Option<i32>,
    pub sort: Option<i32>,
    /// 1 enabled, 0 disabled
    pub status: Option<i32>,
}

pub struct RolesApi<'a> {
    client: &'a ApiClient,
}

impl<'a> RolesApi<'a> {
    pub(crate) fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    pub async fn page(&self, query: &RolePageQuery) -> ApiResult<PageResult<RolePageItem>> {
        let request = ApiRequest::get(format!("{}/page", BASE)).query_params(query)?;
        self.client.call(request).await
    }

    pub async fn options(&self) -> ApiResult<Vec<OptionItem>> {
        self.client
            .call(ApiRequest::get(format!("{}/options", BASE)))
            .await
    }

    /// Menu ids granted to a role
    pub async fn menu_ids(&self, role_id: &str) -> ApiResult<Vec<String>> {
        let ids: Vec<serde_json::Value> = self
            .client
            .call(ApiRequest::get(format!("{}/{}/menuIds", BASE, role_id)))
            .await?;

        Ok(ids
            .into_iter()
            .map(|id| match id {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            })
            .collect())
    }

    /// Replace the menus granted to a role
    pub async fn assign_menus(&self, role_id: &str, menu_ids: &[i64]) -> ApiResult<()> {
        self.client
            .call_unit(ApiRequest::put(format!("{}/{}/menus", BASE, role_id)).json(&menu_ids)?)
            .await
    }

    pub async fn form(&self, id: &str) -> ApiResult<RoleForm> {
        self.client
            .call(ApiRequest::get(format!("{}/{}/form", BASE, id)))
            .await
    }

    pub async fn create(&self, form: &RoleForm) -> ApiResult<()> {
        self.client.call_unit(ApiRequest::post(BASE).json(form)?).await
    }

    pub async fn update(&self, id: &str, form: &RoleForm) -> ApiResult<()> {
        self.client
            .call_unit(ApiRequest::put(format!("{}/{}", BASE, id)).json(form)?)
            .await
    }

    pub async fn delete<S: AsRef<str>>(&self, ids: &[S]) -> ApiResult<()> {
        self.client
            .call_unit(ApiRequest::delete(format!("{}/{}", BASE, join_ids(ids))))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::client;
    use crate::http::mock::MockTransport;
    use crate::http::Body;
    use reqwest::Method;
    use serde_json::json;

    #[tokio::test]
    async fn test_menu_ids_accepts_numbers_and_strings() {
        let transport = MockTransport::ok(json!([1, "2", 30]));
        let client = client(transport.clone());

        let ids = client.roles().menu_ids("9").await.unwrap();

        assert_eq!(ids, vec!["1", "2", "30"]);
        assert!(transport.last().url.ends_with("/api/v1/roles/9/menuIds"));
    }

    #[tokio::test]
    async fn test_assign_menus_sends_array() {
        let transport = MockTransport::ok(json!(null));
        let client = client(transport.clone());

        client.roles().assign_menus("9", &[1, 2, 3]).await.unwrap();

        let request = transport.last();
        assert_eq!(request.method, Method::PUT);
        assert!(request.url.ends_with("/api/v1/roles/9/menus"));
        assert_eq!(request.body, Body::Json(json!([1, 2, 3])));
    }

    #[tokio::test]
    async fn test_create_posts_form() {
        let transport = MockTransport::ok(json!(null));
        let client = client(transport.clone());

        let form = RoleForm {
            code: Some("OPS".to_string()),
            name: Some("Operators".to_string()),
            status: Some(1),
            ..Default::default()
        };
        client.roles().create(&form).await.unwrap();

        let request = transport.last();
        assert_eq!(request.method, Method::POST);
        assert_eq!(request.url, "http://console.test/api/v1/roles");
        match request.body {
            Body::Json(body) => {
                assert_eq!(body["code"], "OPS");
                assert!(body.get("id").is_none());
            }
            other => panic!("expected JSON body, got {:?}", other),
        }
    }
}
