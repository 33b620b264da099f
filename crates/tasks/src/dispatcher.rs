//! Turns free-form to-do text into typed tasks with a single oracle call and
//! performs each one in order.

use crate::services::{
    CalendarEvent, CalendarService, Mailer, OutgoingEmail, QuoteSource, ServiceError,
};
use crate::task::TodoTask;
use deskpilot_core::reply::strip_code_fences;
use deskpilot_providers::{LLMProvider, ProviderError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};

pub const STOCK_ALERT_SUBJECT: &str = "Stock Alert";

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Oracle error: {0}")]
    Oracle(#[from] ProviderError),
    #[error("Could not parse task list: {0}")]
    Parse(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TaskOutcome {
    EmailSent { recipient: String },
    EventScheduled { attendees: Vec<String>, link: Option<String> },
    AlertSent { symbol: String, price: f64 },
    Unrecognized { text: String },
    Failed { task: String, error: String },
}

impl TaskOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, TaskOutcome::Failed { .. })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DispatchReport {
    pub outcomes: Vec<TaskOutcome>,
}

impl DispatchReport {
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn failures(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_failure()).count()
    }
}

pub fn todo_prompt(todo_text: &str) -> String {
    format!(
        r#"Parse the following to-do list and extract one structured task per item.

To-do list:
{}

Rules:
- For stocks, give the ticker symbol as used by Yahoo Finance (Reliance Power is RPOWER.NS, Nvidia is NVDA).
- Give calendar dates in ISO 8601 (e.g. "2025-03-01T09:00:00"). If no time is mentioned use 09:00. If no duration is mentioned use 15 minutes.

Use exactly one of these shapes per task:
1. Email reminder: {{"type": "normal_email", "subject": "subject", "message": "message content", "recipient": "email address"}}
2. Calendar invite: {{"type": "calendar_invite", "event": "event name", "date": "date/time", "duration": "minutes", "email": "email address"}}
3. Stock alert: {{"type": "stock_alert", "symbol": "ticker", "time": "alert time", "email": "email address"}}
4. Anything else: {{"type": "unknown", "text": "the original line"}}

Return only a JSON array of these objects."#,
        todo_text
    )
}

/// Decoded task records. A single object is accepted as a one-element list.
pub fn parse_task_list(reply: &str) -> Result<Vec<Value>, DispatchError> {
    let cleaned = strip_code_fences(reply);
    let value: Value =
        serde_json::from_str(&cleaned).map_err(|e| DispatchError::Parse(e.to_string()))?;
    match value {
        Value::Array(items) => Ok(items),
        Value::Object(_) => Ok(vec![value]),
        other => Err(DispatchError::Parse(format!(
            "expected a JSON array or object, got {}",
            other
        ))),
    }
}

pub struct TaskDispatcher {
    oracle: Arc<dyn LLMProvider>,
    mailer: Arc<dyn Mailer>,
    calendar: Arc<dyn CalendarService>,
    quotes: Arc<dyn QuoteSource>,
    time_zone: String,
}

impl TaskDispatcher {
    pub fn new(
        oracle: Arc<dyn LLMProvider>,
        mailer: Arc<dyn Mailer>,
        calendar: Arc<dyn CalendarService>,
        quotes: Arc<dyn QuoteSource>,
        time_zone: impl Into<String>,
    ) -> Self {
        Self {
            oracle,
            mailer,
            calendar,
            quotes,
            time_zone: time_zone.into(),
        }
    }

    pub async fn process(&self, todo_text: &str) -> Result<DispatchReport, DispatchError> {
        if todo_text.trim().is_empty() {
            warn!("No tasks were parsed from the to-do text");
            return Ok(DispatchReport::default());
        }

        let reply = self.oracle.complete(&todo_prompt(todo_text)).await?;
        let records = parse_task_list(&reply)?;
        info!("Decoded {} to-do task(s)", records.len());

        let mut report = DispatchReport::default();
        for record in &records {
            let task = TodoTask::from_value(record);
            let outcome = self.perform(&task).await;
            if let TaskOutcome::Failed { task, error } = &outcome {
                error!("Task {} failed: {}", task, error);
            }
            report.outcomes.push(outcome);
        }
        Ok(report)
    }

    /// Never propagates: a service failure becomes `TaskOutcome::Failed`.
    pub async fn perform(&self, task: &TodoTask) -> TaskOutcome {
        let result = match task {
            TodoTask::NormalEmail {
                subject,
                message,
                recipient,
            } => self
                .mailer
                .send(&OutgoingEmail::new(recipient, subject.clone(), message.clone()))
                .await
                .map(|_| TaskOutcome::EmailSent {
                    recipient: recipient.clone(),
                }),
            TodoTask::CalendarInvite {
                event,
                date,
                duration,
                attendees,
            } => self.schedule(event, date, *duration, attendees).await,
            TodoTask::StockAlert { symbol, time, email } => {
                return self.stock_alert(task, symbol, time, email).await;
            }
            TodoTask::Unknown { text } => return unrecognized(text),
        };

        result.unwrap_or_else(|e| TaskOutcome::Failed {
            task: task.kind().to_string(),
            error: e.to_string(),
        })
    }

    async fn schedule(
        &self,
        event: &str,
        date: &str,
        duration: Option<i64>,
        attendees: &[String],
    ) -> Result<TaskOutcome, ServiceError> {
        let event = CalendarEvent::from_invite(event, date, duration, attendees, &self.time_zone)?;
        let link = self.calendar.create_event(&event).await?;
        Ok(TaskOutcome::EventScheduled {
            attendees: event.attendees,
            link,
        })
    }

    async fn stock_alert(&self, task: &TodoTask, symbol: &str, time: &str, email: &str) -> TaskOutcome {
        let quote = match self.quotes.latest(symbol).await {
            Ok(quote) => quote,
            Err(e) => {
                warn!("Could not fetch price for {} ({}): {}", symbol, time, e);
                return unrecognized(&serde_json::to_string(task).unwrap_or_else(|_| symbol.to_string()));
            }
        };

        let message = format!(
            "The stock price for {} at {} is {:.2} {}",
            quote.symbol,
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
            quote.price,
            quote.currency
        );
        match self
            .mailer
            .send(&OutgoingEmail::new(email, STOCK_ALERT_SUBJECT, message))
            .await
        {
            Ok(()) => TaskOutcome::AlertSent {
                symbol: quote.symbol,
                price: quote.price,
            },
            Err(e) => TaskOutcome::Failed {
                task: task.kind().to_string(),
                error: e.to_string(),
            },
        }
    }
}

fn unrecognized(text: &str) -> TaskOutcome {
    warn!("Cannot understand or execute task: {}", text);
    TaskOutcome::Unrecognized {
        text: text.to_string(),
    }
}
