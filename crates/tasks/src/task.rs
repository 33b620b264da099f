//! The closed set of to-do actions. Required fields are checked when a record is
//! built; a record that lacks them becomes `Unknown`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const DEFAULT_SUBJECT: &str = "Reminder";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TodoTask {
    NormalEmail {
        subject: String,
        message: String,
        recipient: String,
    },
    CalendarInvite {
        event: String,
        date: String,
        /// Minutes; `None` when absent or not numeric.
        duration: Option<i64>,
        attendees: Vec<String>,
    },
    StockAlert {
        symbol: String,
        time: String,
        email: String,
    },
    Unknown {
        text: String,
    },
}

impl TodoTask {
    pub fn from_value(value: &Value) -> Self {
        let kind = value
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or("unknown")
            .trim()
            .to_lowercase();

        let typed = match kind.as_str() {
            "normal_email" => Self::normal_email(value),
            "calendar_invite" => Self::calendar_invite(value),
            "stock_alert" => Self::stock_alert(value),
            _ => None,
        };

        typed.unwrap_or_else(|| TodoTask::Unknown {
            text: unknown_text(value),
        })
    }

    pub fn kind(&self) -> &'static str {
        match self {
            TodoTask::NormalEmail { .. } => "normal_email",
            TodoTask::CalendarInvite { .. } => "calendar_invite",
            TodoTask::StockAlert { .. } => "stock_alert",
            TodoTask::Unknown { .. } => "unknown",
        }
    }

    fn normal_email(value: &Value) -> Option<Self> {
        let recipient = ["recipient", "reciever_email", "receiver_email", "email"]
            .iter()
            .find_map(|key| text_field(value, key))?;
        Some(TodoTask::NormalEmail {
            subject: text_field(value, "subject").unwrap_or_else(|| DEFAULT_SUBJECT.to_string()),
            message: text_field(value, "message")?,
            recipient,
        })
    }

    fn calendar_invite(value: &Value) -> Option<Self> {
        let attendees = attendee_list(value.get("email")?);
        if attendees.is_empty() {
            return None;
        }
        Some(TodoTask::CalendarInvite {
            event: text_field(value, "event")?,
            date: text_field(value, "date")?,
            duration: value.get("duration").and_then(duration_minutes),
            attendees,
        })
    }

    fn stock_alert(value: &Value) -> Option<Self> {
        Some(TodoTask::StockAlert {
            symbol: text_field(value, "symbol")?,
            time: text_field(value, "time")?,
            email: text_field(value, "email")?,
        })
    }
}

/// Non-empty string, or a scalar rendered as text.
fn text_field(value: &Value, key: &str) -> Option<String> {
    match value.get(key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Accepts `"a@x.com, b@y.com"` or `["a@x.com", "b@y.com"]`.
pub fn attendee_list(value: &Value) -> Vec<String> {
    match value {
        Value::String(s) => s
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

fn duration_minutes(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
    .filter(|minutes| *minutes > 0)
}

fn unknown_text(value: &Value) -> String {
    value
        .get("text")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| value.to_string())
}
