use crate::application::use_cases::record_formatter::FormatterDefaults;
use crate::domain::error::{AppError, Result};
use crate::domain::llm_config::{BackendKind, BackendSettings};
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_CONFIG_FILE: &str = "casegen.toml";
pub const CONFIG_FILE_ENV: &str = "CASEGEN_CONFIG";

/// String settings read from the environment (matched case-insensitively).
///
/// Their values are taken verbatim, so keys such as `12345` or a status of
/// `true` stay strings.
const STRING_ENV_KEYS: [&str; 14] = [
    "groq_api_key",
    "groq_base_url",
    "groq_model",
    "gemini_api_key",
    "gemini_base_url",
    "gemini_model",
    "ollama_base_url",
    "ollama_model",
    "default_ai_provider",
    "default_test_status",
    "default_automation_status",
    "template_path",
    "output_dir",
    "history_file",
];

/// Numeric settings read from the environment.
const NUMERIC_ENV_KEYS: [&str; 2] = ["request_timeout_secs", "health_timeout_secs"];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub groq_api_key: Option<String>,
    pub groq_base_url: String,
    pub groq_model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gemini_api_key: Option<String>,
    pub gemini_base_url: String,
    pub gemini_model: String,
    pub ollama_base_url: String,
    pub ollama_model: String,
    pub default_ai_provider: String,
    pub default_test_status: String,
    pub default_automation_status: String,
    pub request_timeout_secs: u64,
    pub health_timeout_secs: u64,
    pub template_path: PathBuf,
    pub output_dir: PathBuf,
    pub history_file: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            groq_api_key: None,
            groq_base_url: "https://api.groq.com/openai/v1".to_string(),
            groq_model: "llama3-8b-8192".to_string(),
            gemini_api_key: None,
            gemini_base_url: "https://generativelanguage.googleapis.com/v1beta/models".to_string(),
            gemini_model: "gemini-1.5-flash".to_string(),
            ollama_base_url: "http://localhost:11434".to_string(),
            ollama_model: "llama3.2".to_string(),
            default_ai_provider: "groq".to_string(),
            default_test_status: "Draft".to_string(),
            default_automation_status: "Not Automated".to_string(),
            request_timeout_secs: 60,
            health_timeout_secs: 5,
            template_path: PathBuf::from("Testcases_template.xlsx"),
            output_dir: PathBuf::from("testcases"),
            history_file: PathBuf::from("testcases/history.json"),
        }
    }
}

/// `Env` parses values into integers, floats and booleans; string settings
/// bypass that by going through a plain string map.
fn env_strings() -> Serialized<BTreeMap<String, String>> {
    let values = Env::raw()
        .only(&STRING_ENV_KEYS)
        .iter()
        .map(|(key, value)| (key.as_str().to_ascii_lowercase(), value))
        .collect();
    Serialized::defaults(values)
}

impl AppConfig {
    /// Loads `.env`, then layers defaults, the TOML config file and the environment.
    pub fn load() -> Result<Self> {
        let _ = dotenvy::dotenv();
        let config_file = std::env::var(CONFIG_FILE_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_FILE));
        Self::from_figment(Self::figment(&config_file))
    }

    pub fn figment(config_file: &Path) -> Figment {
        Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Toml::file(config_file))
            .merge(env_strings())
            .merge(Env::raw().only(&NUMERIC_ENV_KEYS))
    }

    pub fn from_figment(figment: Figment) -> Result<Self> {
        figment
            .extract::<AppConfig>()
            .map_err(|e| AppError::ConfigError(format!("Failed to load configuration: {}", e)))
    }

    pub fn default_backend(&self) -> Result<BackendKind> {
        self.default_ai_provider.parse()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    pub fn health_timeout(&self) -> Duration {
        Duration::from_secs(self.health_timeout_secs.max(1))
    }

    pub fn backend_settings(&self, kind: BackendKind) -> BackendSettings {
        let (base_url, model, api_key) = match kind {
            BackendKind::Groq => (&self.groq_base_url, &self.groq_model, self.groq_api_key.clone()),
            BackendKind::Ollama => (&self.ollama_base_url, &self.ollama_model, None),
            BackendKind::Gemini => (
                &self.gemini_base_url,
                &self.gemini_model,
                self.gemini_api_key.clone(),
            ),
        };

        BackendSettings {
            kind,
            base_url: base_url.trim().to_string(),
            model: model.trim().to_string(),
            api_key,
        }
    }

    pub fn formatter_defaults(&self) -> FormatterDefaults {
        FormatterDefaults {
            test_status: self.default_test_status.clone(),
            automation_status: self.default_automation_status.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_defaults_match_documented_values() {
        let config = AppConfig::default();
        assert_eq!(config.default_test_status, "Draft");
        assert_eq!(config.default_automation_status, "Not Automated");
        assert_eq!(config.ollama_base_url, "http://localhost:11434");
        assert_eq!(config.default_backend().unwrap(), BackendKind::Groq);
        assert!(config.groq_api_key.is_none());
    }

    #[test]
    fn test_toml_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("casegen.toml");
        fs::write(
            &path,
            "groq_api_key = \"gsk_test\"\nrequest_timeout_secs = 12\nollama_model = \"mistral\"\n",
        )
        .unwrap();

        let figment = Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Toml::file(&path));
        let config = AppConfig::from_figment(figment).unwrap();

        assert_eq!(config.groq_api_key.as_deref(), Some("gsk_test"));
        assert_eq!(config.request_timeout(), Duration::from_secs(12));
        assert_eq!(config.ollama_model, "mistral");
        assert_eq!(config.groq_model, "llama3-8b-8192");
    }

    #[test]
    fn test_backend_settings_projection() {
        let config = AppConfig {
            gemini_api_key: Some("g-key".to_string()),
            health_timeout_secs: 0,
            ..AppConfig::default()
        };

        let gemini = config.backend_settings(BackendKind::Gemini);
        assert_eq!(gemini.api_key(), Some("g-key"));
        assert_eq!(gemini.model, "gemini-1.5-flash");
        assert_eq!(config.health_timeout(), Duration::from_secs(1));

        let ollama = config.backend_settings(BackendKind::Ollama);
        assert!(ollama.api_key.is_none());
        assert_eq!(config.request_timeout(), Duration::from_secs(60));

        let defaults = config.formatter_defaults();
        assert_eq!(defaults.test_status, "Draft");
    }

    #[test]
    fn test_env_values_that_look_numeric_stay_strings() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("GROQ_API_KEY", "12345");
            jail.set_env("OLLAMA_MODEL", "007");
            jail.set_env("DEFAULT_TEST_STATUS", "true");
            jail.set_env("REQUEST_TIMEOUT_SECS", "15");
            jail.create_file("casegen.toml", "groq_model = \"mixtral\"\n")?;

            let config = AppConfig::from_figment(AppConfig::figment(Path::new("casegen.toml")))
                .map_err(|e| e.to_string())?;

            assert_eq!(config.groq_api_key.as_deref(), Some("12345"));
            assert_eq!(config.ollama_model, "007");
            assert_eq!(config.default_test_status, "true");
            assert_eq!(config.request_timeout(), Duration::from_secs(15));
            assert_eq!(config.groq_model, "mixtral");
            Ok(())
        });
    }

    #[test]
    fn test_env_overrides_config_file() {
        figment::Jail::expect_with(|jail| {
            jail.create_file("casegen.toml", "ollama_model = \"mistral\"\n")?;
            jail.set_env("OLLAMA_MODEL", "phi3");

            let config = AppConfig::from_figment(AppConfig::figment(Path::new("casegen.toml")))
                .map_err(|e| e.to_string())?;

            assert_eq!(config.ollama_model, "phi3");
            Ok(())
        });
    }
}
