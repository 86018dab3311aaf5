//! Dictionary endpoints (`/api/v1/dicts`)

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{join_ids, OptionItem, PageQuery, PageResult};
use crate::http::{ApiClient, ApiRequest, ApiResult};

const BASE: &str = "/api/v1/dicts";

/// Lookup entry of a dictionary, as used by select boxes and tags
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DictItemOption {
    /// Number or string, depending on the dictionary
    pub value: Value,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag_type: Option<String>,
}

impl DictItemOption {
    /// Whether `value` matches, comparing numbers and strings by text
    pub fn matches(&self, value: &str) -> bool {
        match &self.value {
            Value::String(s) => s == value,
            other => other.to_string() == value,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DictPageQuery {
    #[serde(flatten)]
    pub page: PageQuery,
    pub keywords: Option<String>,
    pub status: Option<i32>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DictPageItem {
    pub id: String,
    pub name: String,
    pub dict_code: String,
    #[serde(default)]
    pub status: i32,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DictForm {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: Option<String>,
    pub dict_code: Option<String>,
    pub status: Option<i32>,
    pub remark: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DictItemPageQuery {
    #[serde(flatten)]
    pub page: PageQuery,
    pub keywords: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DictItemPageItem {
    pub id: String,
    pub dict_code: Option<String>,
    pub value: String,
    pub label: String,
    #[serde(default)]
    pub status: i32,
    pub sort: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DictItemForm {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub dict_code: Option<String>,
    pub value: Option<String>,
    pub label: Option<String>,
    pub status: Option<i32>,
    pub sort: Option<i32>,
    /// `success`, `warning`, `info`, `primary`, `danger` or empty
    pub tag_type: Option<String>,
}

pub struct DictsApi<'a> {
    client: &'a ApiClient,
}

impl<'a> DictsApi<'a> {
    pub(crate) fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    pub async fn page(&self, query: &DictPageQuery) -> ApiResult<PageResult<DictPageItem>> {
        let request = ApiRequest::get(format!("{}/page", BASE)).query_params(query)?;
        self.client.call(request).await
    }

    pub async fn list(&self) -> ApiResult<Vec<OptionItem>> {
        self.client.call(ApiRequest::get(BASE)).await
    }

    pub async fn form(&self, id: &str) -> ApiResult<DictForm> {
        self.client
            .call(ApiRequest::get(format!("{}/{}/form", BASE, id)))
            .await
    }

    pub async fn create(&self, form: &DictForm) -> ApiResult<()> {
        self.client.call_unit(ApiRequest::post(BASE).json(form)?).await
    }

    pub async fn update(&self, id: &str, form: &DictForm) -> ApiResult<()> {
        self.client
            .call_unit(ApiRequest::put(format!("{}/{}", BASE, id)).json(form)?)
            .await
    }

    pub async fn delete<S: AsRef<str>>(&self, ids: &[S]) -> ApiResult<()> {
        self.client
            .call_unit(ApiRequest::delete(format!("{}/{}", BASE, join_ids(ids))))
            .await
    }

    pub async fn item_page(
        &self,
        dict_code: &str,
        query: &DictItemPageQuery,
    ) -> ApiResult<PageResult<DictItemPageItem>> {
        let request = ApiRequest::get(format!("{}/{}/items/page", BASE, dict_code))
            .query_params(query)?
            .query("dictCode", dict_code);
        self.client.call(request).await
    }

    /// All entries of one dictionary
    pub async fn items(&self, dict_code: &str) -> ApiResult<Vec<DictItemOption>> {
        self.client
            .call(ApiRequest::get(format!("{}/{}/items", BASE, dict_code)))
            .await
    }

    pub async fn item_form(&self, dict_code: &str, id: &str) -> ApiResult<DictItemForm> {
        self.client
            .call(ApiRequest::get(format!("{}/{}/items/{}/form", BASE, dict_code, id)))
            .await
    }

    pub async fn create_item(&self, dict_code: &str, form: &DictItemForm) -> ApiResult<()> {
        self.client
            .call_unit(ApiRequest::post(format!("{}/{}/items", BASE, dict_code)).json(form)?)
            .await
    }

    pub async fn update_item(&self, dict_code: &str, id: &str, form: &DictItemForm) -> ApiResult<()> {
        self.client
            .call_unit(
                ApiRequest::put(format!("{}/{}/items/{}", BASE, dict_code, id)).json(form)?,
            )
            .await
    }

    pub async fn delete_items<S: AsRef<str>>(&self, dict_code: &str, ids: &[S]) -> ApiResult<()> {
        self.client
            .call_unit(ApiRequest::delete(format!(
                "{}/{}/items/{}",
                BASE,
                dict_code,
                join_ids(ids)
            )))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::client;
    use crate::http::mock::MockTransport;
    use reqwest::Method;
    use serde_json::json;

    #[test]
    fn test_option_matches_numbers_and_strings() {
        let numeric: DictItemOption =
            serde_json::from_value(json!({ "value": 1, "label": "Male" })).unwrap();
        let text: DictItemOption =
            serde_json::from_value(json!({ "value": "F", "label": "Female", "tagType": "danger" }))
                .unwrap();

        assert!(numeric.matches("1"));
        assert!(!numeric.matches("2"));
        assert!(text.matches("F"));
        assert_eq!(text.tag_type.as_deref(), Some("danger"));
    }

    #[tokio::test]
    async fn test_items_path() {
        let transport = MockTransport::ok(json!([{ "value": "1", "label": "On" }]));
        let client = client(transport.clone());

        let items = client.dicts().items("device_status").await.unwrap();

        assert_eq!(items.len(), 1);
        assert!(transport.last().url.ends_with("/api/v1/dicts/device_status/items"));
    }

    #[tokio::test]
    async fn test_delete_items_joins_ids() {
        let transport = MockTransport::ok(json!(null));
        let client = client(transport.clone());

        client
            .dicts()
            .delete_items("gender", &["1", "2"])
            .await
            .unwrap();

        let request = transport.last();
        assert_eq!(request.method, Method::DELETE);
        assert!(request.url.ends_with("/api/v1/dicts/gender/items/1,2"));
    }
}
