use super::{
    http_client, join_url, require_api_key, require_model, send_json, validate_base_url,
    TestCaseBackend,
};
use crate::domain::error::Result;
use crate::domain::generation::FallbackReason;
use crate::domain::llm_config::{BackendKind, BackendSettings};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const API_KEY_HEADER: &str = "x-goog-api-key";

#[derive(Serialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(rename = "generationConfig", skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Serialize)]
struct GeminiContent {
    parts: Vec<GeminiPart>,
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
}

#[derive(Serialize)]
struct GeminiPart {
    text: String,
}

#[derive(Serialize)]
struct GenerationConfig {
    temperature: f64,
}

#[derive(Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiCandidateContent>,
}

#[derive(Deserialize)]
struct GeminiCandidateContent {
    #[serde(default)]
    parts: Vec<GeminiCandidatePart>,
}

#[derive(Deserialize)]
struct GeminiCandidatePart {
    #[serde(default)]
    text: String,
}

#[derive(Deserialize)]
struct GeminiModelsResponse {
    models: Option<Vec<GeminiModelInfo>>,
}

#[derive(Deserialize)]
struct GeminiModelInfo {
    name: String,
}

/// Google generative-language REST backend.
pub struct GeminiBackend {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl GeminiBackend {
    pub fn new(settings: BackendSettings) -> Result<Self> {
        let api_key = require_api_key(&settings, "GEMINI_API_KEY")?;
        validate_base_url(&settings)?;
        let model = require_model(&settings)?;

        Ok(Self {
            client: http_client(),
            base_url: settings.base_url,
            model: normalize_model(&model),
            api_key,
        })
    }
}

fn normalize_model(model: &str) -> String {
    let trimmed = model.trim();
    trimmed.strip_prefix("models/").unwrap_or(trimmed).to_string()
}

/// Concatenates the text parts of the first candidate.
fn first_candidate_text(response: GeminiResponse) -> Option<String> {
    let content = response.candidates.into_iter().next()?.content?;
    let text: String = content.parts.into_iter().map(|part| part.text).collect();
    if text.trim().is_empty() {
        None
    } else {
        Some(text)
    }
}

#[async_trait]
impl TestCaseBackend for GeminiBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Gemini
    }

    async fn complete(
        &self,
        instruction: &str,
        timeout: Duration,
    ) -> std::result::Result<String, FallbackReason> {
        let url = join_url(&self.base_url, &format!("{}:generateContent", self.model));

        let body = GeminiRequest {
            contents: vec![GeminiContent {
                parts: vec![GeminiPart {
                    text: instruction.to_string(),
                }],
                role: Some("user".to_string()),
            }],
            generation_config: Some(GenerationConfig { temperature: 0.7 }),
        };

        let json: GeminiResponse = send_json(
            self.client
                .post(&url)
                .header(API_KEY_HEADER, self.api_key.as_str())
                .timeout(timeout)
                .json(&body),
        )
        .await?;

        first_candidate_text(json).ok_or_else(|| {
            FallbackReason::InvalidEnvelope("response has no candidate text".to_string())
        })
    }

    async fn list_models(&self, timeout: Duration) -> Result<Vec<String>> {
        let json: GeminiModelsResponse = send_json(
            self.client
                .get(&self.base_url)
                .header(API_KEY_HEADER, self.api_key.as_str())
                .timeout(timeout),
        )
        .await?;

        let models = json
            .models
            .unwrap_or_default()
            .into_iter()
            .map(|model| {
                model
                    .name
                    .strip_prefix("models/")
                    .unwrap_or(model.name.as_str())
                    .to_string()
            })
            .collect();

        Ok(models)
    }
}
