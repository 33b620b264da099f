//! Google Gemini `generateContent` provider.

use crate::traits::*;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::debug;

pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

pub struct GeminiProvider {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl GeminiProvider {
    pub fn new(api_key: String, model: String) -> Self {
        Self::with_base_url(GEMINI_BASE_URL.to_string(), api_key, model)
    }

    pub fn with_base_url(base_url: String, api_key: String, model: String) -> Self {
        Self {
            client: Client::new(),
            base_url,
            api_key,
            model,
        }
    }
}

/// Concatenate the text parts of the first candidate.
pub(crate) fn extract_text(body: &Value) -> Result<String, ProviderError> {
    let parts = body["candidates"]
        .get(0)
        .and_then(|c| c["content"]["parts"].as_array())
        .ok_or_else(|| ProviderError::Parse("No candidates in response".to_string()))?;

    let text: String = parts
        .iter()
        .filter_map(|part| part["text"].as_str())
        .collect();

    if text.is_empty() {
        return Err(ProviderError::Parse("Candidate has no text".to_string()));
    }
    Ok(text)
}

#[async_trait]
impl LLMProvider for GeminiProvider {
    async fn complete(&self, prompt: &str) -> Result<String, ProviderError> {
        if self.api_key.is_empty() {
            return Err(ProviderError::Config("Gemini API key is not set".to_string()));
        }

        let url = format!(
            "{}/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        );
        let body = json!({
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }]
        });

        debug!("Requesting Gemini completion with model {}", self.model);
        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Http(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api(format!("{}: {}", status, text)));
        }

        let json: Value = response
            .json()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))?;

        extract_text(&json)
    }

    fn name(&self) -> &str {
        "Google Gemini"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_text_joins_parts() {
        let body = json!({
            "candidates": [{
                "content": { "parts": [{ "text": "[{\"step\": 1," }, { "text": " \"function\": \"process_tasks\"}]" }] }
            }]
        });
        assert_eq!(
            extract_text(&body).unwrap(),
            "[{\"step\": 1, \"function\": \"process_tasks\"}]"
        );
    }

    #[test]
    fn test_extract_text_blocked_prompt() {
        let body = json!({ "promptFeedback": { "blockReason": "SAFETY" } });
        assert!(extract_text(&body).is_err());
    }

    #[tokio::test]
    async fn test_missing_key_is_config_error() {
        let provider = GeminiProvider::new(String::new(), "gemini-1.5-flash".to_string());
        assert!(matches!(
            provider.complete("hello").await,
            Err(ProviderError::Config(_))
        ));
    }
}
