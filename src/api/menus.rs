//! Menu and route endpoints (`/api/v1/menus`)

use serde::{Deserialize, Serialize};

use super::OptionItem;
use crate::http::{ApiClient, ApiRequest, ApiResult};

const BASE: &str = "/api/v1/menus";

/// Route tree for the signed-in user
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Route {
    pub path: Option<String>,
    pub name: Option<String>,
    pub component: Option<String>,
    pub redirect: Option<String>,
    pub meta: Option<RouteMeta>,
    #[serde(default)]
    pub children: Vec<Route>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteMeta {
    pub title: Option<String>,
    pub icon: Option<String>,
    #[serde(default)]
    pub hidden: bool,
    #[serde(default)]
    pub keep_alive: bool,
    #[serde(default)]
    pub always_show: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuItem {
    pub id: Option<String>,
    pub parent_id: Option<String>,
    pub name: Option<String>,
    /// 0 directory, 1 menu, 2 button
    #[serde(rename = "type")]
    pub kind: Option<i32>,
    pub route_name: Option<String>,
    pub route_path: Option<String>,
    pub component: Option<String>,
    pub redirect: Option<String>,
    pub perm: Option<String>,
    pub icon: Option<String>,
    pub sort: Option<i32>,
    pub visible: Option<i32>,
    #[serde(default)]
    pub children: Vec<MenuItem>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuForm {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub parent_id: Option<String>,
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<i32>,
    pub route_name: Option<String>,
    pub route_path: Option<String>,
    pub component: Option<String>,
    pub redirect: Option<String>,
    pub perm: Option<String>,
    pub icon: Option<String>,
    pub sort: Option<i32>,
    #[serde(default)]
    pub visible: i32,
    pub keep_alive: Option<i32>,
    pub always_show: Option<i32>,
}

pub struct MenusApi<'a> {
    client: &'a ApiClient,
}

impl<'a> MenusApi<'a> {
    pub(crate) fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    pub async fn routes(&self) -> ApiResult<Vec<Route>> {
        self.client
            .call(ApiRequest::get(format!("{}/routes", BASE)))
            .await
    }

    /// Menu tree, optionally filtered by keyword
    pub async fn list(&self, keywords: Option<&str>) -> ApiResult<Vec<MenuItem>> {
        self.client
            .call(ApiRequest::get(BASE).query_opt("keywords", keywords))
            .await
    }

    pub async fn options(&self, only_parent: bool) -> ApiResult<Vec<OptionItem>> {
        self.client
            .call(ApiRequest::get(format!("{}/options", BASE)).query("onlyParent", only_parent))
            .await
    }

    pub async fn form(&self, id: &str) -> ApiResult<MenuForm> {
        self.client
            .call(ApiRequest::get(format!("{}/{}/form", BASE, id)))
            .await
    }

    pub async fn create(&self, form: &MenuForm) -> ApiResult<()> {
        self.client.call_unit(ApiRequest::post(BASE).json(form)?).await
    }

    pub async fn update(&self, id: &str, form: &MenuForm) -> ApiResult<()> {
        self.client
            .call_unit(ApiRequest::put(format!("{}/{}", BASE, id)).json(form)?)
            .await
    }

    pub async fn delete(&self, id: &str) -> ApiResult<()> {
        self.client
            .call_unit(ApiRequest::delete(format!("{}/{}", BASE, id)))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::client;
    use crate::http::mock::MockTransport;
    use serde_json::json;

    #[tokio::test]
    async fn test_routes_tree() {
        let transport = MockTransport::ok(json!([{
            "path": "/iot",
            "component": "Layout",
            "meta": { "title": "IoT", "alwaysShow": true },
            "children": [{ "path": "devices", "name": "Devices", "children": [] }]
        }]));
        let client = client(transport);

        let routes = client.menus().routes().await.unwrap();

        assert_eq!(routes[0].children[0].name.as_deref(), Some("Devices"));
        assert!(routes[0].meta.as_ref().unwrap().always_show);
    }

    #[tokio::test]
    async fn test_list_without_keywords() {
        let transport = MockTransport::ok(json!([{ "id": "1", "name": "System", "type": 0 }]));
        let client = client(transport.clone());

        let menus = client.menus().list(None).await.unwrap();

        assert_eq!(menus[0].kind, Some(0));
        let request = transport.last();
        assert_eq!(request.url, "http://console.test/api/v1/menus");
        assert!(request.query.is_empty());
    }

    #[tokio::test]
    async fn test_options_only_parent() {
        let transport = MockTransport::ok(json!([]));
        let client = client(transport.clone());

        client.menus().options(true).await.unwrap();

        assert_eq!(transport.last().query_value("onlyParent"), Some("true"));
    }
}
