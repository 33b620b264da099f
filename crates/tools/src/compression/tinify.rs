//! TinyPNG / Tinify image compression.

use super::{CompressionError, Compressor, FailureKind};
use async_trait::async_trait;
use reqwest::Client;
use std::path::Path;
use tracing::debug;

pub const TINIFY_BASE_URL: &str = "https://api.tinify.com";

pub struct TinifyCompressor {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl TinifyCompressor {
    pub fn new(api_key: Option<String>) -> Self {
        Self::with_base_url(TINIFY_BASE_URL.to_string(), api_key)
    }

    pub fn with_base_url(base_url: String, api_key: Option<String>) -> Self {
        Self {
            client: Client::new(),
            base_url,
            api_key,
        }
    }
}

#[async_trait]
impl Compressor for TinifyCompressor {
    fn name(&self) -> &str {
        "tinify"
    }

    async fn compress_to(&self, source: &Path, target: &Path) -> Result<(), CompressionError> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            CompressionError::new(FailureKind::Account, "No API key provided for image compression service")
        })?;

        let bytes = tokio::fs::read(source).await?;
        let url = format!("{}/shrink", self.base_url.trim_end_matches('/'));
        debug!("Uploading {} ({} bytes) to {}", source.display(), bytes.len(), url);

        let response = self
            .client
            .post(&url)
            .basic_auth("api", Some(api_key))
            .body(bytes)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(CompressionError::from_status(status, &text));
        }

        let location = response
            .headers()
            .get(reqwest::header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| {
                CompressionError::new(FailureKind::Server, "Shrink response has no Location header")
            })?;

        let download = self
            .client
            .get(&location)
            .basic_auth("api", Some(api_key))
            .send()
            .await?;

        if !download.status().is_success() {
            let status = download.status();
            let text = download.text().await.unwrap_or_default();
            return Err(CompressionError::from_status(status, &text));
        }

        let compressed = download.bytes().await?;
        tokio::fs::write(target, &compressed).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_key_is_account_error() {
        let compressor = TinifyCompressor::new(None);
        let err = compressor
            .compress_to(Path::new("cat.png"), Path::new("cat_compressed.png"))
            .await
            .unwrap_err();
        assert_eq!(err.kind, FailureKind::Account);
    }
}
