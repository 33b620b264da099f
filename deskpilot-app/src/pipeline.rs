//! Wires oracle, capabilities, compiler and engine into one request pipeline.

use crate::config::{ClassifierKind, Config, LLMProvider};
use anyhow::{Context, Result};
use deskpilot_core::compiler::{interpretation_prompt, planning_prompt};
use deskpilot_core::{
    parse_intent, CapabilityRegistry, ExecutionEngine, Intent, PlanCompiler, PlanSource, PlanStep,
    RunContext, RunReport, WorkspaceProbe,
};
use deskpilot_providers::{GeminiProvider, LLMProvider as TextOracle, OpenAICompatibleProvider};
use deskpilot_tasks::{GoogleCalendar, HttpMailer, ProcessTasksCapability, TaskDispatcher, YahooQuotes};
use deskpilot_tools::{
    CompressCapability, Compressor, CreateCategoryDirsCapability, ExtensionClassifier,
    FileClassifier, IlovePdfCompressor, IsOrganizedCapability, LlmClassifier,
    OrganizationProbe, OrganizeFilesCapability, TinifyCompressor, ValidateFolderCapability,
};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum PlannerMode {
    /// Ask the oracle for the step sequence.
    Oracle,
    /// Expand the intent without an oracle call.
    Static,
}

/// The boundary collaborators a pipeline needs.
pub struct Services {
    pub oracle: Arc<dyn TextOracle>,
    pub classifier: Arc<dyn FileClassifier>,
    pub pdf_compressor: Arc<dyn Compressor>,
    pub image_compressor: Arc<dyn Compressor>,
    pub dispatcher: Arc<TaskDispatcher>,
}

impl Services {
    pub fn from_config(config: &Config) -> Result<Self> {
        let oracle = build_oracle(config)?;

        let classifier: Arc<dyn FileClassifier> = match config.classifier {
            ClassifierKind::Llm => Arc::new(LlmClassifier::new(oracle.clone())),
            ClassifierKind::Extension => Arc::new(ExtensionClassifier),
        };

        let (pdf_public, pdf_secret) = config.compression.pdf_keys();
        let mailer = Arc::new(HttpMailer::new(
            config.email.endpoint.clone(),
            config.email.sender.clone(),
            config.email.token(),
        ));
        let calendar = Arc::new(GoogleCalendar::new(
            config.calendar.client_id.clone(),
            config.calendar.client_secret.clone(),
            config.calendar.refresh_token(),
        ));
        let quotes = Arc::new(YahooQuotes::with_base_url(config.quotes.base_url.clone()));

        Ok(Self {
            oracle: oracle.clone(),
            classifier,
            pdf_compressor: Arc::new(IlovePdfCompressor::new(pdf_public, pdf_secret)),
            image_compressor: Arc::new(TinifyCompressor::new(config.compression.image_api_key())),
            dispatcher: Arc::new(TaskDispatcher::new(
                oracle,
                mailer,
                calendar,
                quotes,
                config.calendar.time_zone.clone(),
            )),
        })
    }
}

fn build_oracle(config: &Config) -> Result<Arc<dyn TextOracle>> {
    let model = config.model();
    let api_key = config.api_key();
    if config.provider.requires_api_key() && api_key.is_none() {
        anyhow::bail!(
            "{} is not set; export it or switch to a local provider",
            config.provider.api_key_var()
        );
    }

    let oracle: Arc<dyn TextOracle> = match &config.provider {
        LLMProvider::Gemini => Arc::new(GeminiProvider::with_base_url(
            config.provider.endpoint(),
            api_key.unwrap_or_default(),
            model,
        )),
        LLMProvider::OpenAI | LLMProvider::Local { .. } => Arc::new(OpenAICompatibleProvider::new(
            config.provider.endpoint(),
            api_key,
            model,
        )),
    };
    Ok(oracle)
}

pub struct Deskpilot {
    oracle: Arc<dyn TextOracle>,
    registry: Arc<CapabilityRegistry>,
    engine: ExecutionEngine,
}

impl Deskpilot {
    pub fn new(services: Services) -> Self {
        let probe: Arc<dyn WorkspaceProbe> =
            Arc::new(OrganizationProbe::new(services.classifier.clone()));

        let mut registry = CapabilityRegistry::new();
        registry
            .register(Arc::new(ValidateFolderCapability))
            .register(Arc::new(IsOrganizedCapability::new(probe.clone())))
            .register(Arc::new(CreateCategoryDirsCapability))
            .register(Arc::new(OrganizeFilesCapability::new(services.classifier)))
            .register(Arc::new(CompressCapability::pdf(services.pdf_compressor)))
            .register(Arc::new(CompressCapability::image(services.image_compressor)))
            .register(Arc::new(ProcessTasksCapability::new(services.dispatcher)));
        let registry = Arc::new(registry);
        info!("Registered {} capabilities", registry.len());

        Self {
            oracle: services.oracle,
            engine: ExecutionEngine::new(registry.clone(), probe),
            registry,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(Services::from_config(config)?))
    }

    pub fn registry(&self) -> &CapabilityRegistry {
        &self.registry
    }

    /// One oracle call turning a free-form request into task kinds.
    pub async fn interpret(&self, request: &str) -> Result<Intent> {
        let reply = self
            .oracle
            .complete(&interpretation_prompt(request))
            .await
            .context("Failed to interpret request")?;
        Ok(parse_intent(&reply)?)
    }

    pub async fn plan(&self, intent: &Intent, folder: &Path, mode: PlannerMode) -> Result<Vec<PlanStep>> {
        let source = match mode {
            PlannerMode::Static => PlanSource::Intent(intent.clone()),
            PlannerMode::Oracle => {
                let prompt = planning_prompt(
                    intent,
                    &folder.to_string_lossy(),
                    &self.registry.descriptions(),
                );
                let reply = self
                    .oracle
                    .complete(&prompt)
                    .await
                    .context("Failed to plan request")?;
                PlanSource::Oracle {
                    intent: intent.clone(),
                    reply,
                }
            }
        };
        Ok(PlanCompiler::new(&self.registry).compile(&source)?)
    }

    pub async fn run(&self, intent: &Intent, folder: &Path, mode: PlannerMode) -> Result<RunReport> {
        let plan = self.plan(intent, folder, mode).await?;
        let steps: Vec<&str> = plan.iter().map(|s| s.operation.as_str()).collect();
        info!("Executing plan: {}", steps.join(" -> "));
        Ok(self.engine.execute(&plan, &RunContext::new(folder)).await?)
    }
}
