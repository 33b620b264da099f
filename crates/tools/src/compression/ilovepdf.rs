//! iLovePDF compression: auth, start a `compress` task, upload, process, download.

use super::{CompressionError, Compressor, FailureKind};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::path::Path;
use tracing::debug;

pub const ILOVEPDF_BASE_URL: &str = "https://api.ilovepdf.com/v1";

#[derive(Debug, Deserialize)]
struct AuthResponse {
    token: String,
}

#[derive(Debug, Deserialize)]
struct StartResponse {
    server: String,
    task: String,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    server_filename: String,
}

pub struct IlovePdfCompressor {
    client: Client,
    base_url: String,
    public_key: Option<String>,
    secret_key: Option<String>,
}

impl IlovePdfCompressor {
    pub fn new(public_key: Option<String>, secret_key: Option<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: ILOVEPDF_BASE_URL.to_string(),
            public_key,
            secret_key,
        }
    }

    fn public_key(&self) -> Result<&str, CompressionError> {
        match (self.public_key.as_deref(), self.secret_key.as_deref()) {
            (Some(public), Some(_)) if !public.is_empty() => Ok(public),
            _ => Err(CompressionError::new(
                FailureKind::Account,
                "Missing API keys for PDF compression service",
            )),
        }
    }

    async fn authenticate(&self, public_key: &str) -> Result<String, CompressionError> {
        let response = self
            .client
            .post(format!("{}/auth", self.base_url))
            .json(&json!({ "public_key": public_key }))
            .send()
            .await?;
        let auth: AuthResponse = checked(response).await?.json().await?;
        Ok(auth.token)
    }
}

async fn checked(response: reqwest::Response) -> Result<reqwest::Response, CompressionError> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let text = response.text().await.unwrap_or_default();
    Err(CompressionError::from_status(status, &text))
}

#[async_trait]
impl Compressor for IlovePdfCompressor {
    fn name(&self) -> &str {
        "ilovepdf"
    }

    async fn compress_to(&self, source: &Path, target: &Path) -> Result<(), CompressionError> {
        let public_key = self.public_key()?;
        let token = self.authenticate(public_key).await?;

        let start: StartResponse = checked(
            self.client
                .get(format!("{}/start/compress", self.base_url))
                .bearer_auth(&token)
                .send()
                .await?,
        )
        .await?
        .json()
        .await?;
        let server = format!("https://{}/v1", start.server);
        debug!("Started compress task {} on {}", start.task, start.server);

        let filename = source
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "document.pdf".to_string());
        let bytes = tokio::fs::read(source).await?;
        let form = Form::new()
            .text("task", start.task.clone())
            .part("file", Part::bytes(bytes).file_name(filename.clone()));

        let upload: UploadResponse = checked(
            self.client
                .post(format!("{}/upload", server))
                .bearer_auth(&token)
                .multipart(form)
                .send()
                .await?,
        )
        .await?
        .json()
        .await?;

        checked(
            self.client
                .post(format!("{}/process", server))
                .bearer_auth(&token)
                .json(&json!({
                    "task": start.task,
                    "tool": "compress",
                    "files": [{ "server_filename": upload.server_filename, "filename": filename }],
                }))
                .send()
                .await?,
        )
        .await?;

        let compressed = checked(
            self.client
                .get(format!("{}/download/{}", server, start.task))
                .bearer_auth(&token)
                .send()
                .await?,
        )
        .await?
        .bytes()
        .await?;

        tokio::fs::write(target, &compressed).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_both_keys_required() {
        let compressor = IlovePdfCompressor::new(Some("public".to_string()), None);
        let err = compressor
            .compress_to(Path::new("a.pdf"), Path::new("a_compressed.pdf"))
            .await
            .unwrap_err();
        assert_eq!(err.kind, FailureKind::Account);
    }
}
