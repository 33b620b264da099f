use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_CONFIG_FILE: &str = "deskpilot.yaml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LLMProvider {
    #[serde(rename = "openai")]
    OpenAI,
    #[serde(rename = "gemini")]
    Gemini,
    #[serde(rename = "local")]
    Local { base_url: String },
}

impl LLMProvider {
    pub fn base_url(&self) -> String {
        match self {
            LLMProvider::OpenAI => "https://api.openai.com/v1".to_string(),
            LLMProvider::Gemini => deskpilot_providers::gemini::GEMINI_BASE_URL.to_string(),
            LLMProvider::Local { base_url } => base_url.clone(),
        }
    }

    /// `DESKPILOT_LLM_ENDPOINT` wins over the provider's own URL.
    pub fn endpoint(&self) -> String {
        std::env::var("DESKPILOT_LLM_ENDPOINT").unwrap_or_else(|_| self.base_url())
    }

    pub fn requires_api_key(&self) -> bool {
        !matches!(self, LLMProvider::Local { .. })
    }

    pub fn api_key_var(&self) -> &'static str {
        match self {
            LLMProvider::Gemini => "GEMINI_API_KEY",
            _ => "DESKPILOT_API_KEY",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassifierKind {
    #[default]
    Llm,
    Extension,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompressionConfig {
    pub image_api_key: Option<String>,
    pub pdf_public_key: Option<String>,
    pub pdf_secret_key: Option<String>,
}

impl CompressionConfig {
    pub fn image_api_key(&self) -> Option<String> {
        secret(&self.image_api_key, "IMAGE_COMPRESSION_API_KEY")
    }

    pub fn pdf_keys(&self) -> (Option<String>, Option<String>) {
        (
            secret(&self.pdf_public_key, "PDF_COMPRESSION_API_KEY_PUBLIC"),
            secret(&self.pdf_secret_key, "PDF_COMPRESSION_API_KEY_SECRET"),
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmailConfig {
    pub endpoint: String,
    pub sender: String,
    pub token: Option<String>,
}

impl EmailConfig {
    pub fn token(&self) -> Option<String> {
        secret(&self.token, "EMAIL_RELAY_TOKEN")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalendarConfig {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: Option<String>,
    pub time_zone: String,
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            refresh_token: None,
            time_zone: deskpilot_tasks::services::calendar::DEFAULT_TIME_ZONE.to_string(),
        }
    }
}

impl CalendarConfig {
    pub fn refresh_token(&self) -> Option<String> {
        secret(&self.refresh_token, "GOOGLE_REFRESH_TOKEN")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuotesConfig {
    pub base_url: String,
}

impl Default for QuotesConfig {
    fn default() -> Self {
        Self {
            base_url: deskpilot_tasks::services::quotes::YAHOO_BASE_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub provider: LLMProvider,
    pub model: String,
    #[serde(default)]
    pub classifier: ClassifierKind,
    #[serde(default)]
    pub compression: CompressionConfig,
    #[serde(default)]
    pub email: EmailConfig,
    #[serde(default)]
    pub calendar: CalendarConfig,
    #[serde(default)]
    pub quotes: QuotesConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            provider: LLMProvider::Gemini,
            model: "gemini-2.0-flash".to_string(),
            classifier: ClassifierKind::default(),
            compression: CompressionConfig::default(),
            email: EmailConfig::default(),
            calendar: CalendarConfig::default(),
            quotes: QuotesConfig::default(),
        }
    }
}

impl Config {
    /// A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        serde_yaml::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// `DESKPILOT_LLM_MODEL` wins over the configured model.
    pub fn model(&self) -> String {
        std::env::var("DESKPILOT_LLM_MODEL").unwrap_or_else(|_| self.model.clone())
    }

    pub fn api_key(&self) -> Option<String> {
        std::env::var(self.provider.api_key_var())
            .ok()
            .filter(|key| !key.trim().is_empty())
    }

    pub fn validate(&self) -> Result<()> {
        if self.model.trim().is_empty() {
            anyhow::bail!("Model name cannot be empty");
        }
        if let LLMProvider::Local { base_url } = &self.provider {
            if base_url.trim().is_empty() {
                anyhow::bail!("Local provider needs a base_url");
            }
        }
        if self.calendar.time_zone.trim().is_empty() {
            anyhow::bail!("Calendar time zone cannot be empty");
        }
        Ok(())
    }
}

fn secret(configured: &Option<String>, var: &str) -> Option<String> {
    configured
        .clone()
        .filter(|value| !value.trim().is_empty())
        .or_else(|| std::env::var(var).ok().filter(|value| !value.trim().is_empty()))
}
