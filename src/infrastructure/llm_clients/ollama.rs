use super::{http_client, join_url, require_model, send_json, validate_base_url, TestCaseBackend};
use crate::domain::error::Result;
use crate::domain::generation::FallbackReason;
use crate::domain::llm_config::{BackendKind, BackendSettings};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: Option<String>,
}

#[derive(Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<ModelTag>,
}

#[derive(Deserialize)]
struct ModelTag {
    name: String,
}

/// Local inference server speaking the Ollama HTTP API.
pub struct OllamaBackend {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

impl OllamaBackend {
    pub fn new(settings: BackendSettings) -> Result<Self> {
        validate_base_url(&settings)?;
        let model = require_model(&settings)?;

        Ok(Self {
            client: http_client(),
            base_url: settings.base_url,
            model,
        })
    }
}

#[async_trait]
impl TestCaseBackend for OllamaBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Ollama
    }

    async fn complete(
        &self,
        instruction: &str,
        timeout: Duration,
    ) -> std::result::Result<String, FallbackReason> {
        let url = join_url(&self.base_url, "api/generate");
        let body = GenerateRequest {
            model: &self.model,
            prompt: instruction,
            stream: false,
        };

        let json: GenerateResponse =
            send_json(self.client.post(&url).timeout(timeout).json(&body)).await?;

        json.response
            .ok_or_else(|| FallbackReason::InvalidEnvelope("missing response field".to_string()))
    }

    async fn list_models(&self, timeout: Duration) -> Result<Vec<String>> {
        let url = join_url(&self.base_url, "api/tags");
        let json: TagsResponse = send_json(self.client.get(&url).timeout(timeout)).await?;
        Ok(json.models.into_iter().map(|model| model.name).collect())
    }
}
