use super::{checked, ServiceError};
use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::{debug, info};

pub const DEFAULT_DURATION_MINUTES: i64 = 15;
/// One year.
pub const MAX_DURATION_MINUTES: i64 = 60 * 24 * 366;
pub const DEFAULT_TIME_ZONE: &str = "Asia/Kolkata";
pub const EVENT_DESCRIPTION: &str = "Blocking time on calendar for project event";

const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const GOOGLE_CALENDAR_URL: &str = "https://www.googleapis.com/calendar/v3";
const DATE_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

#[derive(Debug, Clone, PartialEq)]
pub struct CalendarEvent {
    pub summary: String,
    pub description: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub time_zone: String,
    pub attendees: Vec<String>,
}

impl CalendarEvent {
    pub fn from_invite(
        event: &str,
        date: &str,
        duration: Option<i64>,
        attendees: &[String],
        time_zone: &str,
    ) -> Result<Self, ServiceError> {
        let start = resolve_start(date)
            .ok_or_else(|| ServiceError::InvalidInput(format!("unrecognised event date '{}'", date)))?;
        let minutes = duration.filter(|m| *m > 0).unwrap_or(DEFAULT_DURATION_MINUTES);
        if minutes > MAX_DURATION_MINUTES {
            return Err(ServiceError::InvalidInput(format!(
                "event duration of {} minutes is out of range",
                minutes
            )));
        }
        let end = start
            .checked_add_signed(Duration::minutes(minutes))
            .ok_or_else(|| ServiceError::InvalidInput(format!("event end after '{}' is out of range", date)))?;

        Ok(Self {
            summary: event.to_string(),
            description: EVENT_DESCRIPTION.to_string(),
            start,
            end,
            time_zone: time_zone.to_string(),
            attendees: attendees.to_vec(),
        })
    }

    pub fn duration_minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }

    /// Google Calendar `events.insert` body.
    pub fn to_request_body(&self) -> Value {
        json!({
            "summary": self.summary,
            "description": self.description,
            "start": {
                "dateTime": self.start.format(DATE_TIME_FORMAT).to_string(),
                "timeZone": self.time_zone,
            },
            "end": {
                "dateTime": self.end.format(DATE_TIME_FORMAT).to_string(),
                "timeZone": self.time_zone,
            },
            "attendees": self.attendees.iter().map(|email| json!({ "email": email })).collect::<Vec<_>>(),
            "reminders": { "useDefault": true },
            "transparency": "opaque",
        })
    }
}

/// ISO date-times with or without seconds, RFC 3339 with an offset, or a bare
/// date (scheduled at 09:00).
pub fn resolve_start(date: &str) -> Option<NaiveDateTime> {
    let date = date.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(date) {
        return Some(dt.naive_local());
    }
    for format in [
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
    ] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(date, format) {
            return Some(dt);
        }
    }
    let day = NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()?;
    Some(day.and_time(NaiveTime::from_hms_opt(9, 0, 0)?))
}

#[async_trait]
pub trait CalendarService: Send + Sync {
    /// Creates the event and invites its attendees; returns a link when the
    /// service reports one.
    async fn create_event(&self, event: &CalendarEvent) -> Result<Option<String>, ServiceError>;
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expiry")]
    expires_in: u64,
}

fn default_expiry() -> u64 {
    3600
}

#[derive(Debug, Deserialize)]
struct InsertedEvent {
    #[serde(rename = "htmlLink")]
    html_link: Option<String>,
}

struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

/// Google Calendar via a stored OAuth refresh token.
pub struct GoogleCalendar {
    client: Client,
    client_id: String,
    client_secret: String,
    refresh_token: Option<String>,
    token: Mutex<Option<CachedToken>>,
}

impl GoogleCalendar {
    pub fn new(client_id: String, client_secret: String, refresh_token: Option<String>) -> Self {
        Self {
            client: Client::new(),
            client_id,
            client_secret,
            refresh_token,
            token: Mutex::new(None),
        }
    }

    async fn access_token(&self) -> Result<String, ServiceError> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            // Refresh a minute before expiry
            if token.expires_at > Instant::now() + std::time::Duration::from_secs(60) {
                return Ok(token.access_token.clone());
            }
        }

        let refresh_token = self
            .refresh_token
            .as_deref()
            .ok_or_else(|| ServiceError::Config("calendar refresh token is not set".to_string()))?;
        let params = [
            ("grant_type", "refresh_token"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("refresh_token", refresh_token),
        ];

        debug!("Refreshing calendar access token");
        let response = self.client.post(GOOGLE_TOKEN_URL).form(&params).send().await?;
        let token: TokenResponse = checked(response).await?.json().await?;

        let access_token = token.access_token.clone();
        *cached = Some(CachedToken {
            access_token: token.access_token,
            expires_at: Instant::now() + std::time::Duration::from_secs(token.expires_in),
        });
        Ok(access_token)
    }
}

#[async_trait]
impl CalendarService for GoogleCalendar {
    async fn create_event(&self, event: &CalendarEvent) -> Result<Option<String>, ServiceError> {
        let token = self.access_token().await?;
        let url = format!("{}/calendars/primary/events", GOOGLE_CALENDAR_URL);

        let response = self
            .client
            .post(&url)
            .query(&[("sendUpdates", "all")])
            .bearer_auth(token)
            .json(&event.to_request_body())
            .send()
            .await?;
        let inserted: InsertedEvent = checked(response).await?.json().await?;

        info!(
            "Event '{}' created for {}",
            event.summary,
            event.attendees.join(", ")
        );
        Ok(inserted.html_link)
    }
}
