//! Layered engine configuration.
//!
//! Loads defaults, then an optional file, then environment variables
//! (with `.env` support via `dotenvy`), mirroring the reference
//! `LLMConfig`/`TranslationConfig` split but merged into one
//! `EngineConfig` tree the way the teacher's fuller fork lays out
//! `LangExtractConfig`'s sub-configs.

use serde::{Deserialize, Serialize};

use crate::error::{TranslationError, TranslationResult};
use crate::state::PresetType;

/// Which backend `ProviderConfig` should target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    LmStudio,
    OpenAi,
    Gemini,
}

impl Default for ProviderKind {
    fn default() -> Self {
        Self::LmStudio
    }
}

/// Provider connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub kind: ProviderKind,
    pub base_url: String,
    pub api_key: Option<String>,
    pub root_model: String,
    pub sub_model: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            kind: ProviderKind::LmStudio,
            base_url: "http://localhost:1234/v1".to_string(),
            api_key: None,
            root_model: "auto".to_string(),
            sub_model: "auto".to_string(),
        }
    }
}

/// Repair-retry policy.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub provider_timeout_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            provider_timeout_secs: 120,
        }
    }
}

/// Top-level engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    pub preset: PresetType,
    pub source_lang: String,
    pub target_lang: String,
    pub provider: ProviderConfig,
    pub retry: RetryConfig,
    pub check_sentence: bool,
    pub check_length: bool,
    pub enable_llm_validation: bool,
    /// Whether `update_glossary` checks for a conflicting confirmed
    /// term before promoting a candidate.
    pub check_conflicts_on_promote: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            preset: PresetType::General,
            source_lang: "auto".to_string(),
            target_lang: "ko".to_string(),
            provider: ProviderConfig::default(),
            retry: RetryConfig::default(),
            check_sentence: true,
            check_length: true,
            enable_llm_validation: false,
            check_conflicts_on_promote: true,
        }
    }
}

impl EngineConfig {
    /// Layer defaults -> optional TOML/YAML file -> environment
    /// variables prefixed `RLM_`. `.env` is loaded first via
    /// `dotenvy` so `RLM_*` vars can live there too.
    pub fn load(config_path: Option<&str>) -> TranslationResult<Self> {
        let _ = dotenvy::dotenv();

        let mut builder = config::Config::builder()
            .add_source(config::Config::try_from(&Self::default()).map_err(|e| {
                TranslationError::configuration(format!("failed to seed config defaults: {e}"))
            })?);

        if let Some(path) = config_path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }

        builder = builder.add_source(config::Environment::with_prefix("RLM").separator("__"));

        let built = builder
            .build()
            .map_err(|e| TranslationError::configuration(format!("failed to build config: {e}")))?;

        built
            .try_deserialize()
            .map_err(|e| TranslationError::configuration(format!("failed to parse config: {e}")))
    }

    /// Validate cross-field invariants not expressible in the type
    /// system (e.g. an OpenAI/Gemini provider needs a key).
    pub fn validate(&self) -> TranslationResult<()> {
        match self.provider.kind {
            ProviderKind::OpenAi | ProviderKind::Gemini if self.provider.api_key.is_none() => Err(
                TranslationError::configuration(format!("{:?} provider requires an api_key", self.provider.kind)),
            ),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid_for_lm_studio() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn openai_without_key_fails_validation() {
        let mut config = EngineConfig::default();
        config.provider.kind = ProviderKind::OpenAi;
        config.provider.api_key = None;
        assert!(config.validate().is_err());
    }

    #[test]
    fn openai_with_key_passes_validation() {
        let mut config = EngineConfig::default();
        config.provider.kind = ProviderKind::OpenAi;
        config.provider.api_key = Some("sk-test".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn load_without_file_falls_back_to_defaults() {
        let config = EngineConfig::load(Some("/nonexistent/path/to/config")).unwrap();
        assert_eq!(config.retry.max_retries, 2);
        assert_eq!(config.provider.base_url, "http://localhost:1234/v1");
    }
}
