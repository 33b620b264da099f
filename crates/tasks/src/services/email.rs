use super::{checked, ServiceError};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::json;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutgoingEmail {
    pub to: Vec<String>,
    pub subject: String,
    pub body: String,
}

impl OutgoingEmail {
    /// `to` may hold several comma-separated addresses.
    pub fn new(to: &str, subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            to: to
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
            subject: subject.into(),
            body: body.into(),
        }
    }
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), ServiceError>;
}

/// Posts `{from, to, subject, text}` to an HTTP mail relay.
pub struct HttpMailer {
    client: Client,
    endpoint: String,
    sender: String,
    token: Option<String>,
}

impl HttpMailer {
    pub fn new(endpoint: String, sender: String, token: Option<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint,
            sender,
            token,
        }
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), ServiceError> {
        if email.to.is_empty() {
            return Err(ServiceError::InvalidInput("email has no recipients".to_string()));
        }
        if self.endpoint.is_empty() {
            return Err(ServiceError::Config("mail relay endpoint is not set".to_string()));
        }

        let mut request = self.client.post(&self.endpoint).json(&json!({
            "from": self.sender,
            "to": email.to,
            "subject": email.subject,
            "text": email.body,
        }));
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        checked(request.send().await?).await?;
        info!("Email sent to {}", email.to.join(", "));
        Ok(())
    }
}
