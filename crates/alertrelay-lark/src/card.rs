//! Interactive card rendering for Lark custom bots.
//!
//! The card has a coloured header summarising the group, one markdown block
//! per alert (firing first), an optional hosts block and a trailing mention
//! line for every resolved user ID.

use alertrelay_core::{alert::STATUS_RESOLVED, Alert, WebhookMessage};
use serde_json::{json, Value};

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S UTC";

/// Renders `message` as a bot webhook body.
pub fn render(message: &WebhookMessage) -> Value {
    let mut elements = Vec::new();

    for alert in message.firing_alerts.iter().chain(&message.resolved_alerts) {
        elements.push(markdown(&alert_block(alert)));
    }

    if !message.alert_hosts.is_empty() {
        let hosts = message
            .alert_hosts
            .iter()
            .map(|(host, detail)| format!("- **{host}**: {detail}"))
            .collect::<Vec<_>>()
            .join("\n");
        elements.push(json!({ "tag": "hr" }));
        elements.push(markdown(&hosts));
    }

    if !message.alert_message.external_url.is_empty() {
        elements.push(json!({
            "tag": "note",
            "elements": [{
                "tag": "lark_md",
                "content": format!("[Alertmanager]({})", message.alert_message.external_url),
            }],
        }));
    }

    if !message.open_ids.is_empty() {
        elements.push(markdown(&mention_line(&message.open_ids)));
    }

    json!({
        "msg_type": "interactive",
        "card": {
            "config": { "wide_screen_mode": true },
            "header": {
                "template": header_template(message),
                "title": { "tag": "plain_text", "content": title(message) },
            },
            "elements": elements,
        },
    })
}

/// Card title: `{prefix}[{STATUS}:{firing}] {alertname}`.
pub fn title(message: &WebhookMessage) -> String {
    let status = if message.is_firing() { "FIRING" } else { "RESOLVED" };
    let name = message
        .alert_message
        .alert_name()
        .unwrap_or(message.alert_message.receiver.as_str());
    format!("{}[{status}:{}] {name}", message.title_prefix, message.firing_num)
}

/// `<at>` tags for every user ID.
pub fn mention_line(open_ids: &[String]) -> String {
    open_ids.iter().map(|id| format!("<at id={id}></at>")).collect::<Vec<_>>().join(" ")
}

fn header_template(message: &WebhookMessage) -> &'static str {
    if !message.is_firing() {
        return "green";
    }
    match message.severity.to_ascii_lowercase().as_str() {
        "critical" | "disaster" | "page" | "error" | "high" => "red",
        "warning" | "warn" | "average" => "orange",
        "info" | "information" | "low" => "blue",
        _ => "red",
    }
}

fn alert_block(alert: &Alert) -> String {
    let mut lines = Vec::new();

    let name = alert.labels.get("alertname").map(String::as_str).unwrap_or("alert");
    let mut heading = format!("**{name}**");
    if let Some(severity) = alert.severity() {
        heading.push_str(&format!(" `{severity}`"));
    }
    if alert.status == STATUS_RESOLVED {
        heading.push_str(" (resolved)");
    }
    lines.push(heading);

    for key in ["summary", "description", "message"] {
        if let Some(text) = alert.annotations.get(key) {
            lines.push(text.clone());
        }
    }

    let labels = alert
        .labels
        .iter()
        .filter(|(k, _)| k.as_str() != "alertname" && k.as_str() != "severity")
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>();
    if !labels.is_empty() {
        lines.push(format!("Labels: {}", labels.join(", ")));
    }

    lines.push(format!("Starts: {}", alert.starts_at.format(TIME_FORMAT)));
    if alert.status == STATUS_RESOLVED {
        lines.push(format!("Ends: {}", alert.ends_at.format(TIME_FORMAT)));
    }

    if !alert.generator_url.is_empty() {
        lines.push(format!("[Source]({})", alert.generator_url));
    }

    lines.join("\n")
}

fn markdown(content: &str) -> Value {
    json!({ "tag": "div", "text": { "tag": "lark_md", "content": content } })
}
