use crate::domain::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Hosted OpenAI-compatible chat-completion API.
    Groq,
    /// Local inference server.
    Ollama,
    /// Hosted generative-language REST API.
    Gemini,
}

impl BackendKind {
    pub const ALL: [BackendKind; 3] = [BackendKind::Groq, BackendKind::Ollama, BackendKind::Gemini];

    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Groq => "groq",
            BackendKind::Ollama => "ollama",
            BackendKind::Gemini => "gemini",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "groq" => Ok(BackendKind::Groq),
            "ollama" => Ok(BackendKind::Ollama),
            "gemini" => Ok(BackendKind::Gemini),
            other => Err(AppError::ConfigError(format!(
                "Unsupported provider: {} (expected one of groq, ollama, gemini)",
                other
            ))),
        }
    }
}

/// Connection values for one backend, projected from the application config.
#[derive(Debug, Clone)]
pub struct BackendSettings {
    pub kind: BackendKind,
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
}

impl BackendSettings {
    /// Returns the trimmed api key, or `None` when unset or blank.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }
}
