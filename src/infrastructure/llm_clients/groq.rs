use super::{
    http_client, join_url, require_api_key, require_model, send_json, validate_base_url,
    TestCaseBackend,
};
use crate::application::use_cases::prompt_builder::SYSTEM_PROMPT;
use crate::domain::error::{AppError, Result};
use crate::domain::generation::FallbackReason;
use crate::domain::llm_config::{BackendKind, BackendSettings};
use async_trait::async_trait;
use serde_json::json;
use std::time::Duration;

const TEMPERATURE: f32 = 0.7;
const MAX_TOKENS: u32 = 2000;

/// OpenAI-compatible chat-completion backend (Groq cloud).
pub struct GroqBackend {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl GroqBackend {
    pub fn new(settings: BackendSettings) -> Result<Self> {
        let api_key = require_api_key(&settings, "GROQ_API_KEY")?;
        validate_base_url(&settings)?;
        let model = require_model(&settings)?;

        Ok(Self {
            client: http_client(),
            base_url: settings.base_url,
            model,
            api_key,
        })
    }
}

#[async_trait]
impl TestCaseBackend for GroqBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Groq
    }

    async fn complete(
        &self,
        instruction: &str,
        timeout: Duration,
    ) -> std::result::Result<String, FallbackReason> {
        let url = join_url(&self.base_url, "chat/completions");

        let body = json!({
            "model": self.model,
            "messages": [
                {
                    "role": "system",
                    "content": SYSTEM_PROMPT
                },
                {
                    "role": "user",
                    "content": instruction
                }
            ],
            "max_tokens": MAX_TOKENS,
            "temperature": TEMPERATURE,
        });

        let json: serde_json::Value = send_json(
            self.client
                .post(&url)
                .bearer_auth(&self.api_key)
                .timeout(timeout)
                .json(&body),
        )
        .await?;

        json["choices"][0]["message"]["content"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| {
                FallbackReason::InvalidEnvelope("missing choices[0].message.content".to_string())
            })
    }

    async fn list_models(&self, timeout: Duration) -> Result<Vec<String>> {
        let url = join_url(&self.base_url, "models");

        let json: serde_json::Value = send_json(
            self.client
                .get(&url)
                .bearer_auth(&self.api_key)
                .timeout(timeout),
        )
        .await?;

        let models = json["data"]
            .as_array()
            .ok_or_else(|| {
                AppError::LLMError("Invalid response format: missing data array".to_string())
            })?
            .iter()
            .filter_map(|m| m["id"].as_str())
            .map(|id| id.to_string())
            .collect();

        Ok(models)
    }
}
