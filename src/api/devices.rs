//! Device endpoints (`/api/v1/devices`)

use serde::{Deserialize, Serialize};

use super::join_ids;
use crate::http::{ApiClient, ApiRequest, ApiResult};

const BASE: &str = "/api/v1/devices";

/// Operational state; only these two can be set from the console
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeviceStatus {
    Active,
    Inactive,
}

impl DeviceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceStatus::Active => "ACTIVE",
            DeviceStatus::Inactive => "INACTIVE",
        }
    }
}

impl std::fmt::Display for DeviceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceQuery {
    pub keywords: Option<String>,
    pub status: Option<DeviceStatus>,
    /// `WATER_LEVEL_SENSOR` or `OTHER`
    pub device_type: Option<String>,
    pub dept_id: Option<i64>,
    pub create_time: Option<[String; 2]>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    pub device_id: String,
    pub device_name: String,
    pub device_model: Option<String>,
    pub device_type: Option<String>,
    pub device_type_text: Option<String>,
    pub dept_id: Option<serde_json::Value>,
    pub dept_name: Option<String>,
    pub location: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// Raw status string; the server may report more than the settable states
    pub status: Option<String>,
    pub last_heartbeat: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceForm {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    pub device_name: String,
    pub device_model: String,
    pub device_type: Option<String>,
    pub dept_id: String,
    pub location: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub status: Option<DeviceStatus>,
}

pub struct DevicesApi<'a> {
    client: &'a ApiClient,
}

impl<'a> DevicesApi<'a> {
    pub(crate) fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    pub async fn list(&self, query: &DeviceQuery) -> ApiResult<Vec<Device>> {
        let request = ApiRequest::get(BASE).query_params(query)?;
        self.client.call(request).await
    }

    pub async fn by_department(&self, dept_id: i64) -> ApiResult<Vec<Device>> {
        self.client
            .call(ApiRequest::get(format!("{}/department/{}", BASE, dept_id)))
            .await
    }

    pub async fn by_status(&self, status: &str) -> ApiResult<Vec<Device>> {
        self.client
            .call(ApiRequest::get(format!("{}/status/{}", BASE, status)))
            .await
    }

    pub async fn get(&self, device_id: &str) -> ApiResult<Device> {
        self.client
            .call(ApiRequest::get(format!("{}/{}", BASE, device_id)))
            .await
    }

    pub async fn create(&self, form: &DeviceForm) -> ApiResult<()> {
        self.client.call_unit(ApiRequest::post(BASE).json(form)?).await
    }

    pub async fn update(&self, device_id: &str, form: &DeviceForm) -> ApiResult<()> {
        self.client
            .call_unit(ApiRequest::put(format!("{}/{}", BASE, device_id)).json(form)?)
            .await
    }

    pub async fn delete<S: AsRef<str>>(&self, ids: &[S]) -> ApiResult<()> {
        self.client
            .call_unit(ApiRequest::delete(format!("{}/{}", BASE, join_ids(ids))))
            .await
    }

    pub async fn update_status(&self, device_id: &str, status: DeviceStatus) -> ApiResult<()> {
        self.client
            .call_unit(
                ApiRequest::patch(format!("{}/{}/status", BASE, device_id)).query("status", status),
            )
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

    #[tokio::test]
    async fn test_list_with_filters() {
        let transport = MockTransport::ok(json!([
            { "deviceId": "d-1", "deviceName": "Gauge 1", "status": "ACTIVE", "deptId": 2 }
        ]));
        let client = client(transport.clone());

        let devices = client
            .devices()
            .list(&DeviceQuery {
                status: Some(DeviceStatus::Active),
                dept_id: Some(2),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(devices[0].device_name, "Gauge 1");
        let request = transport.last();
        assert_eq!(request.query_value("status"), Some("ACTIVE"));
        assert_eq!(request.query_value("deptId"), Some("2"));
        assert_eq!(request.query_value("keywords"), None);
    }

    #[tokio::test]
    async fn test_update_status_patches() {
        let transport = MockTransport::ok(json!(null));
        let client = client(transport.clone());

        client
            .devices()
            .update_status("d-1", DeviceStatus::Inactive)
            .await
            .unwrap();

        let request = transport.last();
        assert_eq!(request.method, Method::PATCH);
        assert!(request.url.ends_with("/api/v1/devices/d-1/status"));
        assert_eq!(request.query_value("status"), Some("INACTIVE"));
    }

    #[tokio::test]
    async fn test_by_department_path() {
        let transport = MockTransport::ok(json!([]));
        let client = client(transport.clone());

        assert!(client.devices().by_department(4).await.unwrap().is_empty());
        assert!(transport.last().url.ends_with("/api/v1/devices/department/4"));
    }
}
