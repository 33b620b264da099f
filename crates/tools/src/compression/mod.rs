//! Compression back-ends and the capabilities that drive them one file at a time.

pub mod ilovepdf;
pub mod tinify;

use async_trait::async_trait;
use deskpilot_core::*;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info};

pub use ilovepdf::IlovePdfCompressor;
pub use tinify::TinifyCompressor;

pub const PDF_EXTENSIONS: &[&str] = &["pdf"];
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

/// Provider-reported failure category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Account,
    Client,
    Server,
    Connection,
    Io,
}

#[derive(Debug, Error)]
#[error("{kind:?} error: {message}")]
pub struct CompressionError {
    pub kind: FailureKind,
    pub message: String,
}

impl CompressionError {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Map an HTTP status from a compression API onto a failure category.
    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let kind = match status.as_u16() {
            401 | 402 | 403 | 429 => FailureKind::Account,
            400..=499 => FailureKind::Client,
            _ => FailureKind::Server,
        };
        Self::new(kind, format!("{}: {}", status, body))
    }
}

impl From<std::io::Error> for CompressionError {
    fn from(e: std::io::Error) -> Self {
        Self::new(FailureKind::Io, e.to_string())
    }
}

impl From<reqwest::Error> for CompressionError {
    fn from(e: reqwest::Error) -> Self {
        match e.status() {
            Some(status) => Self::from_status(status, &e.to_string()),
            None => Self::new(FailureKind::Connection, e.to_string()),
        }
    }
}

/// A remote compression service: reads `source`, writes the compressed bytes to `target`.
#[async_trait]
pub trait Compressor: Send + Sync {
    fn name(&self) -> &str;
    async fn compress_to(&self, source: &Path, target: &Path) -> Result<(), CompressionError>;
}

/// `<stem>_compressed<ext>` next to the source.
pub fn compressed_path(source: &Path) -> PathBuf {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let name = match source.extension() {
        Some(ext) => format!("{}_compressed.{}", stem, ext.to_string_lossy()),
        None => format!("{}_compressed", stem),
    };
    source.with_file_name(name)
}

pub fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| extensions.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Compress one file. `Ok(None)` is the explicit no-result: unsupported type or a
/// file that is already a compressed artefact.
pub async fn compress_file(
    compressor: &dyn Compressor,
    source: &Path,
    extensions: &[&str],
) -> Result<Option<PathBuf>, CompressionError> {
    if !has_extension(source, extensions) {
        info!("Unsupported file for {}: {}", compressor.name(), source.display());
        return Ok(None);
    }

    let already_compressed = source
        .file_stem()
        .map(|s| s.to_string_lossy().to_lowercase().contains("compressed"))
        .unwrap_or(false);
    if already_compressed {
        info!(
            "Skipping {} as filename suggests it's already compressed",
            source.display()
        );
        return Ok(None);
    }

    let target = compressed_path(source);
    compressor.compress_to(source, &target).await?;

    let original = tokio::fs::metadata(source).await?.len() as f64 / 1024.0;
    let compressed = tokio::fs::metadata(&target).await?.len() as f64 / 1024.0;
    let savings = if original > 0.0 {
        (original - compressed) / original * 100.0
    } else {
        0.0
    };
    info!(
        "Compressed {}: {:.2}KB -> {:.2}KB ({:.1}% saved)",
        source.display(),
        original,
        compressed,
        savings
    );
    Ok(Some(target))
}

/// `compress_pdf` / `compress_image`: receives one `file_path` per invocation.
pub struct CompressCapability {
    name: &'static str,
    description: &'static str,
    extensions: &'static [&'static str],
    compressor: Arc<dyn Compressor>,
}

impl CompressCapability {
    pub fn pdf(compressor: Arc<dyn Compressor>) -> Self {
        Self {
            name: COMPRESS_PDF,
            description: "Compress every PDF in the Documents folder",
            extensions: PDF_EXTENSIONS,
            compressor,
        }
    }

    pub fn image(compressor: Arc<dyn Compressor>) -> Self {
        Self {
            name: COMPRESS_IMAGE,
            description: "Compress every JPEG and PNG in the Images folder",
            extensions: IMAGE_EXTENSIONS,
            compressor,
        }
    }
}

#[async_trait]
impl Capability for CompressCapability {
    fn name(&self) -> &str {
        self.name
    }

    fn description(&self) -> &str {
        self.description
    }

    fn parameters(&self) -> &[&'static str] {
        &["file_path"]
    }

    async fn invoke(&self, args: Value) -> Result<CapabilityOutput, CapabilityError> {
        let path = args["file_path"]
            .as_str()
            .map(PathBuf::from)
            .ok_or_else(|| CapabilityError::Validation("Missing 'file_path' field".to_string()))?;

        match compress_file(self.compressor.as_ref(), &path, self.extensions).await {
            Ok(Some(target)) => Ok(CapabilityOutput::ok(json!({ "compressed": target }))),
            Ok(None) => Ok(CapabilityOutput::empty()),
            Err(e) => {
                error!("{} failed on {}: {}", self.compressor.name(), path.display(), e);
                Err(CapabilityError::Execution(e.to_string()))
            }
        }
    }
}
