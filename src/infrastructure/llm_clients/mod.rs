pub mod gemini;
pub mod groq;
pub mod ollama;

use crate::application::use_cases::prompt_builder::build_instruction;
use crate::domain::error::{AppError, Result};
use crate::domain::generation::{DraftBatch, FallbackReason, GenerationRequest};
use crate::domain::llm_config::{BackendKind, BackendSettings};
use crate::infrastructure::config::AppConfig;
use crate::infrastructure::response::parse_draft_records;
use async_trait::async_trait;
use gemini::GeminiBackend;
use groq::GroqBackend;
use ollama::OllamaBackend;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const ERROR_BODY_PREVIEW: usize = 500;

/// A test case generation provider.
///
/// Adapters only implement the transport (`complete`, `list_models`); prompt
/// rendering, response parsing and the fallback record live in the provided
/// `generate` so every backend behaves the same once text comes back.
#[async_trait]
pub trait TestCaseBackend: Send + Sync {
    fn kind(&self) -> BackendKind;

    /// Sends `instruction` and returns the model's text answer.
    async fn complete(
        &self,
        instruction: &str,
        timeout: Duration,
    ) -> std::result::Result<String, FallbackReason>;

    async fn list_models(&self, timeout: Duration) -> Result<Vec<String>>;

    /// Never fails: any transport or parse problem yields a single fallback draft.
    async fn generate(&self, request: &GenerationRequest, timeout: Duration) -> DraftBatch {
        let kind = self.kind();
        let instruction = build_instruction(request);

        let raw = match self.complete(&instruction, timeout).await {
            Ok(raw) => raw,
            Err(reason) => {
                warn!(backend = %kind, ticket_id = %request.ticket_id, reason = %reason, "Backend call failed, using fallback test case");
                return DraftBatch::fallback(kind, request, reason);
            }
        };

        match parse_draft_records(&raw) {
            Ok(drafts) => {
                info!(backend = %kind, ticket_id = %request.ticket_id, count = drafts.len(), "Parsed test case drafts");
                DraftBatch::parsed(kind, drafts)
            }
            Err(reason) => {
                warn!(backend = %kind, ticket_id = %request.ticket_id, reason = %reason, "Unusable backend response, using fallback test case");
                debug!(backend = %kind, raw = %preview_text(&raw, ERROR_BODY_PREVIEW), "Raw backend response");
                DraftBatch::fallback(kind, request, reason)
            }
        }
    }
}

/// Constructs the adapter for `settings.kind`, validating its configuration first.
pub fn build_backend(settings: BackendSettings) -> Result<Arc<dyn TestCaseBackend>> {
    let backend: Arc<dyn TestCaseBackend> = match settings.kind {
        BackendKind::Groq => Arc::new(GroqBackend::new(settings)?),
        BackendKind::Ollama => Arc::new(OllamaBackend::new(settings)?),
        BackendKind::Gemini => Arc::new(GeminiBackend::new(settings)?),
    };
    Ok(backend)
}

/// Resolves a provider selector (case-insensitive) against the loaded config.
pub fn select_backend(config: &AppConfig, selector: &str) -> Result<Arc<dyn TestCaseBackend>> {
    let kind: BackendKind = selector.parse()?;
    build_backend(config.backend_settings(kind))
}

pub(crate) fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

pub(crate) fn validate_base_url(settings: &BackendSettings) -> Result<Url> {
    let url = Url::parse(&settings.base_url).map_err(|e| {
        AppError::ConfigError(format!(
            "Invalid base URL for {} provider '{}': {}",
            settings.kind, settings.base_url, e
        ))
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(AppError::ConfigError(format!(
            "Base URL for {} provider must use http or https: {}",
            settings.kind, settings.base_url
        )));
    }
    Ok(url)
}

pub(crate) fn require_model(settings: &BackendSettings) -> Result<String> {
    let model = settings.model.trim();
    if model.is_empty() {
        return Err(AppError::ConfigError(format!(
            "No model configured for {} provider",
            settings.kind
        )));
    }
    Ok(model.to_string())
}

pub(crate) fn require_api_key(settings: &BackendSettings, env_name: &str) -> Result<String> {
    settings
        .api_key()
        .map(str::to_string)
        .ok_or_else(|| AppError::ConfigError(format!("{} not found in environment variables", env_name)))
}

pub(crate) fn join_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

/// Sends the request and decodes a 2xx JSON body into `T`.
pub(crate) async fn send_json<T: DeserializeOwned>(
    request: reqwest::RequestBuilder,
) -> std::result::Result<T, FallbackReason> {
    let response = request
        .send()
        .await
        .map_err(|e| FallbackReason::Transport(e.to_string()))?;

    if !response.status().is_success() {
        let status = response.status().as_u16();
        let text = response.text().await.unwrap_or_default();
        return Err(FallbackReason::HttpStatus {
            status,
            body: preview_text(&text, ERROR_BODY_PREVIEW),
        });
    }

    response
        .json::<T>()
        .await
        .map_err(|e| FallbackReason::InvalidEnvelope(e.to_string()))
}

impl From<FallbackReason> for AppError {
    fn from(reason: FallbackReason) -> Self {
        AppError::LLMError(reason.to_string())
    }
}

fn preview_text(value: &str, limit: usize) -> String {
    let trimmed = value.trim();
    if trimmed.chars().count() <= limit {
        return trimmed.to_string();
    }
    let snippet: String = trimmed.chars().take(limit).collect();
    format!("{}...", snippet)
}
