//! Alarm Endpoints
//!
//! Alarm rule management (`/api/v1/alarm-rules`) and live alarm monitoring
//! (`/api/v1/alarm/monitoring`). [`AlarmEvent`] is also the payload of the
//! real-time alarm channel.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::http::{ApiClient, ApiRequest, ApiResult};

const RULES_BASE: &str = "/api/v1/alarm-rules";
const MONITORING_BASE: &str = "/api/v1/alarm/monitoring";

// ============================================
// ALARM RULES
// ============================================

/// Rule-level severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleSeverity {
    Info,
    Warning,
    Critical,
    Emergency,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlarmCondition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition_id: Option<i64>,
    pub metric_name: String,
    /// One of `>`, `<`, `>=`, `<=`, `=`, `!=`
    pub operator: String,
    pub threshold_value: String,
    /// Sparkplug B data type name, e.g. `Float`
    pub data_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition_description: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAlarmRule {
    pub rule_name: String,
    pub device_id: String,
    pub description: Option<String>,
    pub is_active: Option<bool>,
    pub severity: Option<RuleSeverity>,
    pub conditions: Vec<AlarmCondition>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAlarmRule {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity: Option<RuleSeverity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conditions: Option<Vec<AlarmCondition>>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlarmRule {
    pub rule_id: i64,
    pub rule_name: String,
    pub device_id: String,
    pub description: Option<String>,
    #[serde(default)]
    pub is_active: bool,
    pub severity: Option<RuleSeverity>,
    pub created_by: Option<i64>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
    #[serde(default)]
    pub conditions: Vec<AlarmCondition>,
}

pub struct AlarmRulesApi<'a> {
    client: &'a ApiClient,
}

impl<'a> AlarmRulesApi<'a> {
    pub(crate) fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    pub async fn create(&self, rule: &CreateAlarmRule) -> ApiResult<AlarmRule> {
        self.client
            .call(ApiRequest::post(RULES_BASE).json(rule)?)
            .await
    }

    pub async fn update(&self, rule_id: i64, rule: &UpdateAlarmRule) -> ApiResult<AlarmRule> {
        self.client
            .call(ApiRequest::put(format!("{}/{}", RULES_BASE, rule_id)).json(rule)?)
            .await
    }

    pub async fn get(&self, rule_id: i64) -> ApiResult<AlarmRule> {
        self.client
            .call(ApiRequest::get(format!("{}/{}", RULES_BASE, rule_id)))
            .await
    }

    pub async fn by_device(&self, device_id: &str) -> ApiResult<Vec<AlarmRule>> {
        self.client
            .call(ApiRequest::get(format!("{}/device/{}", RULES_BASE, device_id)))
            .await
    }

    pub async fn active_by_device(&self, device_id: &str) -> ApiResult<Vec<AlarmRule>> {
        self.client
            .call(ApiRequest::get(format!(
                "{}/device/{}/active",
                RULES_BASE, device_id
            )))
            .await
    }

    pub async fn set_active(&self, rule_id: i64, is_active: bool) -> ApiResult<AlarmRule> {
        self.client
            .call(
                ApiRequest::patch(format!("{}/{}/status", RULES_BASE, rule_id))
                    .query("isActive", is_active),
            )
            .await
    }

    pub async fn delete(&self, rule_id: i64) -> ApiResult<()> {
        self.client
            .call_unit(ApiRequest::delete(format!("{}/{}", RULES_BASE, rule_id)))
            .await
    }
}

// ============================================
// ALARM MONITORING
// ============================================

/// Event-level severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "CRITICAL",
            Severity::High => "HIGH",
            Severity::Medium => "MEDIUM",
            Severity::Low => "LOW",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AlarmStatus {
    Active,
    Acknowledged,
    Resolved,
}

impl AlarmStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlarmStatus::Active => "ACTIVE",
            AlarmStatus::Acknowledged => "ACKNOWLEDGED",
            AlarmStatus::Resolved => "RESOLVED",
        }
    }
}

/// One raised alarm
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlarmEvent {
    pub id: String,
    pub rule_id: Option<String>,
    pub rule_name: Option<String>,
    pub device_id: Option<String>,
    pub device_name: Option<String>,
    pub metric_id: Option<String>,
    pub metric_name: Option<String>,
    pub severity: Severity,
    pub status: AlarmStatus,
    pub trigger_value: Option<f64>,
    pub threshold: Option<f64>,
    pub message: Option<String>,
    /// ISO-8601 creation time
    pub created_at: Option<String>,
    pub acknowledged_at: Option<String>,
    pub resolved_at: Option<String>,
    pub dept_id: Option<String>,
    pub dept_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AffectedDevice {
    pub device_id: String,
    pub device_name: Option<String>,
    #[serde(default)]
    pub alarm_count: u64,
}

/// Dashboard summary
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AlarmDashboard {
    pub total_active_alarms: u64,
    pub critical_alarms: u64,
    pub high_alarms: u64,
    pub medium_alarms: u64,
    pub low_alarms: u64,
    pub total_alarms_today: u64,
    pub resolved_alarms_today: u64,
    pub avg_resolution_time: Option<String>,
    pub top_affected_devices: Vec<AffectedDevice>,
    pub recent_alarms: Vec<AlarmEvent>,
}

/// Filters for the active alarm listing
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveAlarmQuery {
    pub dept_id: Option<String>,
    /// Severities joined with commas
    pub severity: Option<Vec<Severity>>,
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendQuery {
    /// e.g. `24h`, `7d`
    pub period: Option<String>,
    pub dept_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
struct AlarmNote<'n> {
    #[serde(skip_serializing_if = "Option::is_none")]
    note: Option<&'n str>,
}

pub struct AlarmMonitoringApi<'a> {
    client: &'a ApiClient,
}

impl<'a> AlarmMonitoringApi<'a> {
    pub(crate) fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    pub async fn active(&self, query: &ActiveAlarmQuery) -> ApiResult<Vec<AlarmEvent>> {
        let request =
            ApiRequest::get(format!("{}/active", MONITORING_BASE)).query_params(query)?;
        self.client.call(request).await
    }

    pub async fn dashboard(&self, dept_id: Option<&str>) -> ApiResult<AlarmDashboard> {
        self.client
            .call(ApiRequest::get(format!("{}/dashboard", MONITORING_BASE)).query_opt("deptId", dept_id))
            .await
    }

    /// Trend series; the shape depends on the backend version
    pub async fn trends(&self, query: &TrendQuery) -> ApiResult<Value> {
        let request =
            ApiRequest::get(format!("{}/trends", MONITORING_BASE)).query_params(query)?;
        self.client.call(request).await
    }

    pub async fn acknowledge(&self, alarm_id: &str, note: Option<&str>) -> ApiResult<()> {
        self.client
            .call_unit(
                ApiRequest::post(format!("{}/{}/acknowledge", MONITORING_BASE, alarm_id))
                    .json(&AlarmNote { note })?,
            )
            .await
    }

    pub async fn resolve(&self, alarm_id: &str, note: Option<&str>) -> ApiResult<()> {
        self.client
            .call_unit(
                ApiRequest::post(format!("{}/{}/resolve", MONITORING_BASE, alarm_id))
                    .json(&AlarmNote { note })?,
            )
            .await
    }

    pub async fn timeline(&self, alarm_id: &str) -> ApiResult<Vec<Value>> {
        self.client
            .call(ApiRequest::get(format!(
                "{}/{}/timeline",
                MONITORING_BASE, alarm_id
            )))
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

    fn alarm_json(id: &str, severity: &str) -> Value {
        json!({
            "id": id,
            "ruleName": "High water",
            "deviceId": "d-1",
            "deviceName": "Gauge 1",
            "severity": severity,
            "status": "ACTIVE",
            "triggerValue": 4.2,
            "threshold": 4.0,
            "createdAt": "2025-10-02T08:00:00Z"
        })
    }

    #[tokio::test]
    async fn test_active_joins_severities() {
        let transport = MockTransport::ok(json!([alarm_json("1", "CRITICAL")]));
        let client = client(transport.clone());

        let alarms = client
            .alarms()
            .active(&ActiveAlarmQuery {
                dept_id: Some("2".to_string()),
                severity: Some(vec![Severity::Critical, Severity::High]),
                limit: Some(20),
            })
            .await
            .unwrap();

        assert_eq!(alarms[0].severity, Severity::Critical);
        assert_eq!(alarms[0].status, AlarmStatus::Active);
        let request = transport.last();
        assert!(request.url.ends_with("/api/v1/alarm/monitoring/active"));
        assert_eq!(request.query_value("severity"), Some("CRITICAL,HIGH"));
        assert_eq!(request.query_value("limit"), Some("20"));
    }

    #[tokio::test]
    async fn test_acknowledge_sends_note() {
        let transport = MockTransport::ok(json!(null));
        let client = client(transport.clone());

        client.alarms().acknowledge("7", Some("crew on site")).await.unwrap();

        let request = transport.last();
        assert_eq!(request.method, Method::POST);
        assert!(request.url.ends_with("/api/v1/alarm/monitoring/7/acknowledge"));
        assert_eq!(request.body, Body::Json(json!({ "note": "crew on site" })));

        client.alarms().resolve("7", None).await.unwrap();
        assert_eq!(transport.last().body, Body::Json(json!({})));
    }

    #[tokio::test]
    async fn test_dashboard_tolerates_missing_fields() {
        let transport = MockTransport::ok(json!({ "totalActiveAlarms": 3, "recentAlarms": [alarm_json("1", "LOW")] }));
        let client = client(transport.clone());

        let dashboard = client.alarms().dashboard(None).await.unwrap();

        assert_eq!(dashboard.total_active_alarms, 3);
        assert_eq!(dashboard.recent_alarms.len(), 1);
        assert!(dashboard.top_affected_devices.is_empty());
        assert!(transport.last().query.is_empty());
    }

    #[tokio::test]
    async fn test_rule_status_toggle() {
        let transport = MockTransport::ok(json!({
            "ruleId": 5, "ruleName": "Overflow", "deviceId": "d-1", "isActive": false,
            "severity": "critical", "conditions": []
        }));
        let client = client(transport.clone());

        let rule = client.alarm_rules().set_active(5, false).await.unwrap();

        assert!(!rule.is_active);
        assert_eq!(rule.severity, Some(RuleSeverity::Critical));
        let request = transport.last();
        assert_eq!(request.method, Method::PATCH);
        assert!(request.url.ends_with("/api/v1/alarm-rules/5/status"));
        assert_eq!(request.query_value("isActive"), Some("false"));
    }

    #[tokio::test]
    async fn test_active_rules_by_device() {
        let transport = MockTransport::ok(json!([]));
        let client = client(transport.clone());

        client.alarm_rules().active_by_device("d-9").await.unwrap();

        assert!(transport
            .last()
            .url
            .ends_with("/api/v1/alarm-rules/device/d-9/active"));
    }
}
