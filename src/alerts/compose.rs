//! Tier-specific alert messages: subject, plain-text and HTML bodies.

use crate::classifier::Tier;
use crate::normalize::Sequence;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What an alert is about; built from a saved (or attempted) record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub record_id: Option<String>,
    pub event: String,
    pub sequence: Sequence,
    pub tier: Tier,
    pub score: f64,
    pub timestamp: DateTime<Utc>,
    pub user_email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertMessage {
    pub subject: String,
    pub text: String,
    pub html: String,
}

fn recommendations(tier: Tier) -> &'static [&'static str] {
    match tier {
        Tier::Malicious => &[
            "Immediately isolate the affected system",
            "Disable compromised user account",
            "Review recent activity logs",
            "Conduct forensic analysis",
            "Notify security team immediately",
            "Check for lateral movement",
        ],
        Tier::Suspicious => &[
            "Monitor user activity closely",
            "Review related logs for patterns",
            "Investigate source IP/location",
            "Document findings",
            "Set up additional monitoring",
        ],
        Tier::Normal => &["No immediate action required", "Continue normal monitoring"],
    }
}

fn color(tier: Tier) -> &'static str {
    match tier {
        Tier::Malicious => "#dc2626",
        Tier::Suspicious => "#f59e0b",
        Tier::Normal => "#10b981",
    }
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

pub fn compose(alert: &Alert, dashboard_url: &str) -> AlertMessage {
    let level = alert.tier.as_str().to_uppercase();
    let subject = format!("Security Alert: {} Activity Detected", level);
    let when = alert.timestamp.format("%Y-%m-%d %H:%M:%S UTC").to_string();
    let confidence = format!("{:.1}%", alert.score * 100.0);
    let dashboard = dashboard_url.trim_end_matches('/');

    let mut text = format!(
        "{level} activity detected\n\nEvent: {}\nThreat level: {level}\nConfidence: {confidence}\nTimestamp: {when}\n",
        alert.event
    );
    if let Some(ref user) = alert.user_email {
        text.push_str(&format!("User: {}\n", user));
    }
    text.push_str(&format!("Sequence: {}\n\nRecommended actions:\n", alert.sequence));
    for r in recommendations(alert.tier) {
        text.push_str(&format!("- {}\n", r));
    }
    text.push_str(&format!("\nView alerts: {}/alerts\n", dashboard));

    let user_row = alert
        .user_email
        .as_deref()
        .map(|u| format!("<tr><th>User</th><td>{}</td></tr>", escape_html(u)))
        .unwrap_or_default();
    let actions: String = recommendations(alert.tier)
        .iter()
        .map(|r| format!("<li>{}</li>", r))
        .collect();
    let html = format!(
        concat!(
            "<!DOCTYPE html><html><body style=\"font-family:sans-serif\">",
            "<h1 style=\"color:{color}\">{level} Activity Detected</h1>",
            "<table>",
            "<tr><th>Event</th><td>{event}</td></tr>",
            "<tr><th>Threat Level</th><td>{level}</td></tr>",
            "<tr><th>Confidence</th><td>{confidence}</td></tr>",
            "<tr><th>Timestamp</th><td>{when}</td></tr>",
            "{user_row}",
            "<tr><th>Sequence</th><td><code>{sequence}</code></td></tr>",
            "</table>",
            "<h3>Recommended Actions</h3><ul>{actions}</ul>",
            "<p><a href=\"{dashboard}/alerts\">View in Dashboard</a></p>",
            "</body></html>"
        ),
        color = color(alert.tier),
        level = level,
        event = escape_html(&alert.event),
        confidence = confidence,
        when = when,
        user_row = user_row,
        sequence = escape_html(alert.sequence.as_str()),
        actions = actions,
        dashboard = escape_html(dashboard),
    );

    AlertMessage {
        subject,
        text,
        html,
    }
}
