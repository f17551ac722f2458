//! Alertmanager webhook payload and the enriched outbound message.
//!
//! [`AlertMessage`] mirrors the JSON Alertmanager posts to webhook receivers.
//! Every field is optional on the wire; a body that is valid JSON of the
//! right shape parses even when fields are missing.
//!
//! [`WebhookMessage`] wraps a parsed alert with the data the bot card needs:
//! resolved mention IDs, the firing/resolved split and a few header fields
//! derived from the common labels.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Sorted string key/value pairs (labels, annotations).
pub type KV = BTreeMap<String, String>;

/// Alert status reported by Alertmanager.
pub const STATUS_FIRING: &str = "firing";
/// Alert status reported by Alertmanager once an alert clears.
pub const STATUS_RESOLVED: &str = "resolved";

/// Group notification posted by Alertmanager.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AlertMessage {
    /// Payload format version.
    pub version: String,
    /// Key identifying the alert group.
    pub group_key: String,
    /// Number of alerts dropped due to `max_alerts`.
    pub truncated_alerts: u64,
    /// `firing` if at least one alert in the group is firing.
    pub status: String,
    /// Alertmanager receiver name.
    pub receiver: String,
    /// Labels the group was formed by.
    pub group_labels: KV,
    /// Labels shared by every alert in the group.
    pub common_labels: KV,
    /// Annotations shared by every alert in the group.
    pub common_annotations: KV,
    /// Link back to the Alertmanager instance.
    #[serde(rename = "externalURL")]
    pub external_url: String,
    /// Alerts in the group.
    pub alerts: Alerts,
}

/// A single alert.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Alert {
    /// `firing` or `resolved`.
    pub status: String,
    /// Identifying labels.
    pub labels: KV,
    /// Informational annotations.
    pub annotations: KV,
    /// When the alert started firing.
    pub starts_at: DateTime<Utc>,
    /// When the alert resolved; zero time while firing.
    pub ends_at: DateTime<Utc>,
    /// Link to the expression that produced the alert.
    #[serde(rename = "generatorURL")]
    pub generator_url: String,
    /// Stable alert identity.
    pub fingerprint: String,
}

/// List of alerts.
pub type Alerts = Vec<Alert>;

impl AlertMessage {
    /// Decodes an Alertmanager webhook body.
    pub fn from_slice(body: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(body)
    }

    /// Alerts currently firing.
    pub fn firing(&self) -> Alerts {
        self.with_status(STATUS_FIRING)
    }

    /// Alerts that have resolved.
    pub fn resolved(&self) -> Alerts {
        self.with_status(STATUS_RESOLVED)
    }

    fn with_status(&self, status: &str) -> Alerts {
        self.alerts.iter().filter(|a| a.status == status).cloned().collect()
    }

    /// Alert name from the group or common labels.
    pub fn alert_name(&self) -> Option<&str> {
        self.group_labels
            .get("alertname")
            .or_else(|| self.common_labels.get("alertname"))
            .map(String::as_str)
    }
}

impl Alert {
    /// `severity` label, if set.
    pub fn severity(&self) -> Option<&str> {
        self.labels.get("severity").map(String::as_str)
    }
}

/// Enriched message handed to the bot sender.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WebhookMessage {
    /// Original notification.
    #[serde(flatten)]
    pub alert_message: AlertMessage,
    /// Resolved Lark user IDs to mention.
    pub open_ids: Vec<String>,
    /// Extra key/value pairs shown on the card.
    pub meta: KV,
    /// Alerts with status `firing`.
    pub firing_alerts: Alerts,
    /// Alerts with status `resolved`.
    pub resolved_alerts: Alerts,
    /// Text prepended to the card title.
    pub title_prefix: String,
    /// Number of firing alerts.
    pub firing_num: usize,
    /// Highest severity label across firing alerts.
    pub severity: String,
    /// `send_notify` common label, passed through for card templates.
    pub send_notify: String,
    /// Per-host metadata attached by the caller.
    pub alert_hosts: BTreeMap<String, String>,
}

impl WebhookMessage {
    /// Builds the outbound envelope and derives the summary fields.
    pub fn new(alert_message: AlertMessage) -> Self {
        let firing_alerts = alert_message.firing();
        let resolved_alerts = alert_message.resolved();
        let severity = highest_severity(&alert_message, &firing_alerts);
        let title_prefix =
            alert_message.common_labels.get("title_prefix").cloned().unwrap_or_default();
        let send_notify =
            alert_message.common_labels.get("send_notify").cloned().unwrap_or_default();
        let meta = alert_message.group_labels.clone();

        Self {
            firing_num: firing_alerts.len(),
            firing_alerts,
            resolved_alerts,
            severity,
            title_prefix,
            send_notify,
            meta,
            open_ids: Vec::new(),
            alert_hosts: BTreeMap::new(),
            alert_message,
        }
    }

    /// Attaches resolved mention IDs.
    pub fn with_open_ids(mut self, open_ids: Vec<String>) -> Self {
        self.open_ids = open_ids;
        self
    }

    /// Attaches per-host metadata.
    pub fn with_alert_hosts(mut self, alert_hosts: BTreeMap<String, String>) -> Self {
        self.alert_hosts = alert_hosts;
        self
    }

    /// `true` when at least one alert is firing.
    pub fn is_firing(&self) -> bool {
        self.firing_num > 0 || self.alert_message.status == STATUS_FIRING
    }
}

fn severity_rank(severity: &str) -> u8 {
    match severity.to_ascii_lowercase().as_str() {
        "critical" | "disaster" | "page" => 4,
        "error" | "high" => 3,
        "warning" | "warn" | "average" => 2,
        "info" | "information" | "low" => 1,
        _ => 0,
    }
}

fn highest_severity(message: &AlertMessage, firing: &[Alert]) -> String {
    firing
        .iter()
        .filter_map(Alert::severity)
        .max_by_key(|s| severity_rank(s))
        .or_else(|| message.common_labels.get("severity").map(String::as_str))
        .unwrap_or_default()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAYLOAD: &str = r#"{
        "version": "4",
        "groupKey": "{}:{alertname=\"HighLoad\"}",
        "truncatedAlerts": 0,
        "status": "firing",
        "receiver": "lark",
        "groupLabels": {"alertname": "HighLoad"},
        "commonLabels": {"alertname": "HighLoad", "title_prefix": "[prod]"},
        "commonAnnotations": {},
        "externalURL": "http://alertmanager:9093",
        "alerts": [
            {
                "status": "firing",
                "labels": {"alertname": "HighLoad", "instance": "db-1", "severity": "warning"},
                "annotations": {"summary": "load is high"},
                "startsAt": "2024-05-01T10:00:00Z",
                "endsAt": "0001-01-01T00:00:00Z",
                "generatorURL": "http://prometheus/graph",
                "fingerprint": "a1"
            },
            {
                "status": "firing",
                "labels": {"alertname": "HighLoad", "instance": "db-2", "severity": "critical"},
                "annotations": {},
                "startsAt": "2024-05-01T10:01:00Z",
                "endsAt": "0001-01-01T00:00:00Z",
                "generatorURL": "",
                "fingerprint": "a2"
            },
            {
                "status": "resolved",
                "labels": {"alertname": "HighLoad", "instance": "db-3"},
                "annotations": {},
                "startsAt": "2024-05-01T09:00:00Z",
                "endsAt": "2024-05-01T09:30:00Z",
                "generatorURL": "",
                "fingerprint": "a3"
            }
        ]
    }"#;

    #[test]
    fn parses_alertmanager_payload() {
        let message = AlertMessage::from_slice(PAYLOAD.as_bytes()).unwrap();

        assert_eq!(message.version, "4");
        assert_eq!(message.external_url, "http://alertmanager:9093");
        assert_eq!(message.alerts.len(), 3);
        assert_eq!(message.alerts[0].generator_url, "http://prometheus/graph");
        assert_eq!(message.alert_name(), Some("HighLoad"));
    }

    #[test]
    fn missing_fields_default() {
        let message = AlertMessage::from_slice(b"{}").unwrap();
        assert!(message.alerts.is_empty());
        assert_eq!(message.alert_name(), None);
    }

    #[test]
    fn invalid_json_is_rejected() {
        assert!(AlertMessage::from_slice(b"not json").is_err());
        assert!(AlertMessage::from_slice(br#"{"alerts": "nope"}"#).is_err());
    }

    #[test]
    fn webhook_message_splits_and_summarises() {
        let message = WebhookMessage::new(AlertMessage::from_slice(PAYLOAD.as_bytes()).unwrap());

        assert_eq!(message.firing_num, 2);
        assert_eq!(message.firing_alerts.len(), 2);
        assert_eq!(message.resolved_alerts.len(), 1);
        assert_eq!(message.severity, "critical");
        assert_eq!(message.title_prefix, "[prod]");
        assert_eq!(message.meta.get("alertname").map(String::as_str), Some("HighLoad"));
        assert!(message.open_ids.is_empty());
        assert!(message.alert_hosts.is_empty());
        assert!(message.is_firing());
    }

    #[test]
    fn open_ids_attach() {
        let message = WebhookMessage::new(AlertMessage::default())
            .with_open_ids(vec!["ou_1".to_string(), "ou_2".to_string()]);
        assert_eq!(message.open_ids, vec!["ou_1", "ou_2"]);
        assert!(!message.is_firing());
    }
}
