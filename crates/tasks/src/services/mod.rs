//! Outbound services the dispatcher talks to: mail relay, calendar, quote feed.

pub mod calendar;
pub mod email;
pub mod quotes;

use thiserror::Error;

pub use calendar::{CalendarEvent, CalendarService, GoogleCalendar};
pub use email::{HttpMailer, Mailer, OutgoingEmail};
pub use quotes::{Quote, QuoteSource, YahooQuotes};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("API error: {0}")]
    Api(String),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

async fn checked(response: reqwest::Response) -> Result<reqwest::Response, ServiceError> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let text = response.text().await.unwrap_or_default();
    Err(ServiceError::Api(format!("{}: {}", status, text)))
}
