//! Alarm Board
//!
//! In-memory view of the active alarms, seeded from the monitoring API and
//! kept current by alarm channel events.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use parking_lot::RwLock;
use serde_json::Value;
use std::sync::Arc;

use super::channel::AlarmChannel;
use super::listeners::Subscription;
use super::messages::{ChannelEvent, EventKind};
use crate::api::alarms::{ActiveAlarmQuery, AlarmDashboard, AlarmEvent, AlarmStatus, Severity};
use crate::http::{ApiClient, ApiResult};
use crate::session::SessionScoped;

/// Local view filter; empty lists match everything
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AlarmFilter {
    pub severities: Vec<Severity>,
    pub statuses: Vec<AlarmStatus>,
    pub device_ids: Vec<String>,
    /// Inclusive bounds on `created_at`
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl AlarmFilter {
    pub fn matches(&self, alarm: &AlarmEvent) -> bool {
        if !self.severities.is_empty() && !self.severities.contains(&alarm.severity) {
            return false;
        }
        if !self.statuses.is_empty() && !self.statuses.contains(&alarm.status) {
            return false;
        }
        if !self.device_ids.is_empty() {
            match &alarm.device_id {
                Some(id) if self.device_ids.contains(id) => {}
                _ => return false,
            }
        }

        if self.start.is_none() && self.end.is_none() {
            return true;
        }
        let Some(created) = alarm.created_at.as_deref().and_then(parse_timestamp) else {
            return false;
        };
        self.start.map_or(true, |start| created >= start) && self.end.map_or(true, |end| created <= end)
    }
}

/// Counts over the current alarm list
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AlarmSummary {
    pub total: usize,
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    pub acknowledged: usize,
    pub unacknowledged: usize,
}

#[derive(Default)]
struct BoardState {
    /// Newest first
    alarms: Vec<AlarmEvent>,
    dashboard: Option<AlarmDashboard>,
    filter: AlarmFilter,
    connected: bool,
    last_update: Option<DateTime<Utc>>,
}

impl BoardState {
    fn touch(&mut self) {
        self.last_update = Some(Utc::now());
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.alarms.iter().position(|a| a.id == id)
    }
}

/// Cloneable handle to the shared board
#[derive(Clone)]
pub struct AlarmBoard {
    inner: Arc<BoardInner>,
}

struct BoardInner {
    client: ApiClient,
    state: RwLock<BoardState>,
}

impl AlarmBoard {
    pub fn new(client: ApiClient) -> Self {
        Self {
            inner: Arc::new(BoardInner {
                client,
                state: RwLock::new(BoardState::default()),
            }),
        }
    }

    // ============================================
    // LOADING
    // ============================================

    /// Replace the list with the server's active alarms
    pub async fn load_active(&self, dept_id: Option<&str>, limit: Option<u32>) -> ApiResult<usize> {
        let query = ActiveAlarmQuery {
            dept_id: dept_id.map(str::to_string),
            severity: None,
            limit,
        };
        let alarms = self.inner.client.alarms().active(&query).await?;
        let count = alarms.len();

        let mut state = self.inner.state.write();
        state.alarms = alarms;
        state.touch();
        tracing::debug!(count, "Active alarms loaded");
        Ok(count)
    }

    pub async fn load_dashboard(&self, dept_id: Option<&str>) -> ApiResult<AlarmDashboard> {
        let dashboard = self.inner.client.alarms().dashboard(dept_id).await?;
        let mut state = self.inner.state.write();
        state.dashboard = Some(dashboard.clone());
        state.touch();
        Ok(dashboard)
    }

    // ============================================
    // LIVE UPDATES
    // ============================================

    /// Subscribe the board to the channel events it tracks
    pub fn attach(&self, channel: &AlarmChannel) -> Vec<Subscription> {
        [
            EventKind::AlarmTriggered,
            EventKind::AlarmUpdated,
            EventKind::AlarmResolved,
            EventKind::Connected,
            EventKind::Disconnected,
        ]
        .into_iter()
        .map(|kind| {
            let board = self.clone();
            channel.subscribe(kind, move |event| board.apply(event))
        })
        .collect()
    }

    pub fn apply(&self, event: &ChannelEvent) {
        match event {
            ChannelEvent::AlarmTriggered(data) => {
                let Some(alarm) = decode_alarm(data) else { return };
                let mut state = self.inner.state.write();
                if state.position(&alarm.id).is_none() {
                    tracing::info!(alarm_id = %alarm.id, severity = %alarm.severity, "Alarm triggered");
                    state.alarms.insert(0, alarm);
                    state.touch();
                }
            }
            ChannelEvent::AlarmUpdated(data) => {
                let Some(alarm) = decode_alarm(data) else { return };
                let mut state = self.inner.state.write();
                if let Some(index) = state.position(&alarm.id) {
                    state.alarms[index] = alarm;
                    state.touch();
                }
            }
            ChannelEvent::AlarmResolved(data) => {
                let Some(id) = resolved_id(data) else {
                    tracing::warn!(data = %data, "Resolved alarm without id");
                    return;
                };
                if self.remove(&id) {
                    tracing::info!(alarm_id = %id, "Alarm resolved");
                }
            }
            ChannelEvent::Connected => self.inner.state.write().connected = true,
            ChannelEvent::Disconnected { .. } => self.inner.state.write().connected = false,
            _ => {}
        }
    }

    // ============================================
    // ACTIONS
    // ============================================

    pub async fn acknowledge(&self, alarm_id: &str, note: Option<&str>) -> ApiResult<()> {
        self.inner.client.alarms().acknowledge(alarm_id, note).await?;

        let mut state = self.inner.state.write();
        if let Some(index) = state.position(alarm_id) {
            let alarm = &mut state.alarms[index];
            alarm.status = AlarmStatus::Acknowledged;
            alarm.acknowledged_at = Some(Utc::now().to_rfc3339());
            state.touch();
        }
        Ok(())
    }

    pub async fn resolve(&self, alarm_id: &str, note: Option<&str>) -> ApiResult<()> {
        self.inner.client.alarms().resolve(alarm_id, note).await?;
        self.remove(alarm_id);
        Ok(())
    }

    /// Acknowledge each id in turn, stopping at the first failure
    pub async fn acknowledge_many(&self, alarm_ids: &[String], note: Option<&str>) -> ApiResult<()> {
        for id in alarm_ids {
            self.acknowledge(id, note).await?;
        }
        Ok(())
    }

    pub async fn resolve_many(&self, alarm_ids: &[String], note: Option<&str>) -> ApiResult<()> {
        for id in alarm_ids {
            self.resolve(id, note).await?;
        }
        Ok(())
    }

    // ============================================
    // VIEWS
    // ============================================

    pub fn alarms(&self) -> Vec<AlarmEvent> {
        self.inner.state.read().alarms.clone()
    }

    pub fn get(&self, alarm_id: &str) -> Option<AlarmEvent> {
        let state = self.inner.state.read();
        state.position(alarm_id).map(|i| state.alarms[i].clone())
    }

    /// Alarms passing the current filter
    pub fn filtered(&self) -> Vec<AlarmEvent> {
        let state = self.inner.state.read();
        state
            .alarms
            .iter()
            .filter(|a| state.filter.matches(a))
            .cloned()
            .collect()
    }

    pub fn filter(&self) -> AlarmFilter {
        self.inner.state.read().filter.clone()
    }

    pub fn set_filter(&self, filter: AlarmFilter) {
        self.inner.state.write().filter = filter;
    }

    pub fn summary(&self) -> AlarmSummary {
        let state = self.inner.state.read();
        let mut summary = AlarmSummary {
            total: state.alarms.len(),
            ..Default::default()
        };

        for alarm in &state.alarms {
            match alarm.severity {
                Severity::Critical => summary.critical += 1,
                Severity::High => summary.high += 1,
                Severity::Medium => summary.medium += 1,
                Severity::Low => summary.low += 1,
            }
            if alarm.status == AlarmStatus::Acknowledged {
                summary.acknowledged += 1;
            } else {
                summary.unacknowledged += 1;
            }
        }
        summary
    }

    pub fn dashboard(&self) -> Option<AlarmDashboard> {
        self.inner.state.read().dashboard.clone()
    }

    pub fn is_connected(&self) -> bool {
        self.inner.state.read().connected
    }

    pub fn last_update(&self) -> Option<DateTime<Utc>> {
        self.inner.state.read().last_update
    }

    pub fn clear(&self) {
        *self.inner.state.write() = BoardState::default();
    }

    fn remove(&self, alarm_id: &str) -> bool {
        let mut state = self.inner.state.write();
        match state.position(alarm_id) {
            Some(index) => {
                state.alarms.remove(index);
                state.touch();
                true
            }
            None => false,
        }
    }
}

impl SessionScoped for AlarmBoard {
    fn reset(&self) {
        self.clear();
    }
}

fn decode_alarm(data: &Value) -> Option<AlarmEvent> {
    match serde_json::from_value(data.clone()) {
        Ok(alarm) => Some(alarm),
        Err(e) => {
            tracing::warn!(error = %e, "Ignoring malformed alarm payload");
            None
        }
    }
}

/// Id carried by a resolve event: a bare id or an object with `id`
fn resolved_id(data: &Value) -> Option<String> {
    let id = match data {
        Value::Object(map) => map.get("id")?,
        other => other,
    };
    match id {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// RFC 3339, or `YYYY-MM-DD HH:MM:SS` read as UTC
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .map(|naive| Utc.from_utc_datetime(&naive))
}
