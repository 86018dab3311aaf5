//! Notification channel endpoints (`/api/v1/notification/channels`)

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::http::{ApiClient, ApiRequest, ApiResult};

const BASE: &str = "/api/v1/notification/channels";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChannelType {
    Email,
    Sms,
    Webhook,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationChannel {
    pub channel_id: String,
    pub channel_name: String,
    pub channel_type: ChannelType,
    pub description: Option<String>,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub configuration: Map<String, Value>,
    pub recipients: Option<String>,
    pub success_rate: Option<f64>,
    /// `HEALTHY`, `WARNING` or `UNHEALTHY`
    pub health_status: Option<String>,
    pub created_by: Option<String>,
    pub created_time: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelForm {
    pub channel_name: String,
    pub channel_type: ChannelType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub configuration: Map<String, Value>,
    pub recipients: String,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelQuery {
    pub page: Option<u32>,
    pub size: Option<u32>,
    pub channel_type: Option<ChannelType>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelTestResult {
    pub success: bool,
    #[serde(default)]
    pub message: String,
    /// Delivery time in milliseconds
    pub delivery_time: Option<u64>,
}

pub struct NotificationsApi<'a> {
    client: &'a ApiClient,
}

impl<'a> NotificationsApi<'a> {
    pub(crate) fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    /// Channel listing; paged or plain depending on the backend
    pub async fn list(&self, query: &ChannelQuery) -> ApiResult<Value> {
        let request = ApiRequest::get(BASE).query_params(query)?;
        self.client.call(request).await
    }

    pub async fn create(&self, form: &ChannelForm) -> ApiResult<NotificationChannel> {
        self.client.call(ApiRequest::post(BASE).json(form)?).await
    }

    /// Partial update; only the fields present in `changes` are sent
    pub async fn update(&self, channel_id: &str, changes: &Value) -> ApiResult<NotificationChannel> {
        self.client
            .call(ApiRequest::put(format!("{}/{}", BASE, channel_id)).json(changes)?)
            .await
    }

    pub async fn delete(&self, channel_id: &str) -> ApiResult<()> {
        self.client
            .call_unit(ApiRequest::delete(format!("{}/{}", BASE, channel_id)))
            .await
    }

    /// Send a test notification through a channel
    pub async fn test(&self, channel_id: &str, message: Option<&str>) -> ApiResult<ChannelTestResult> {
        self.client
            .call(
                ApiRequest::post(format!("{}/{}/test", BASE, channel_id))
                    .json(&serde_json::json!({ "testMessage": message }))?,
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::client;
    use crate::http::mock::MockTransport;
    use crate::http::Body;
    use serde_json::json;

    #[tokio::test]
    async fn test_channel_test_call() {
        let transport = MockTransport::ok(json!({ "success": true, "message": "sent", "deliveryTime": 120 }));
        let client = client(transport.clone());

        let result = client.notifications().test("c-1", Some("ping")).await.unwrap();

        assert!(result.success);
        assert_eq!(result.delivery_time, Some(120));
        let request = transport.last();
        assert!(request.url.ends_with("/api/v1/notification/channels/c-1/test"));
        assert_eq!(request.body, Body::Json(json!({ "testMessage": "ping" })));
    }

    #[tokio::test]
    async fn test_list_filters() {
        let transport = MockTransport::ok(json!({ "content": [], "totalElements": 0 }));
        let client = client(transport.clone());

        client
            .notifications()
            .list(&ChannelQuery {
                channel_type: Some(ChannelType::Webhook),
                is_active: Some(true),
                ..Default::default()
            })
            .await
            .unwrap();

        let request = transport.last();
        assert_eq!(request.query_value("channelType"), Some("WEBHOOK"));
        assert_eq!(request.query_value("isActive"), Some("true"));
        assert_eq!(request.query_value("page"), None);
    }

    #[test]
    fn test_channel_decodes_configuration() {
        let channel: NotificationChannel = serde_json::from_value(json!({
            "channelId": "c-1",
            "channelName": "Ops mail",
            "channelType": "EMAIL",
            "isActive": true,
            "configuration": { "smtpHost": "mail.local" }
        }))
        .unwrap();

        assert_eq!(channel.channel_type, ChannelType::Email);
        assert_eq!(channel.configuration["smtpHost"], "mail.local");
    }
}
