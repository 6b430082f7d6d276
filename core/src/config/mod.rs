//! Configuration management
//!
//! `consolegpt.toml` has three tables: `[openai]` for the completion provider,
//! `[speech]` for the voice modality and `[session]` for loop behaviour. Every
//! field has a default, so a missing file or a partial one is fine.
//! Environment variables override file values.

pub mod types;

pub use types::{ConfigError, Provider};

use crate::llm::LlmConfig;
use crate::modality::{ModalityKind, VoiceSettings};
use crate::session::{
    GoodbyeMatcher, GoodbyeRule, SessionParams, DEFAULT_EXIT_PHRASE, DEFAULT_GREETING,
    DEFAULT_MAX_TOKENS, DEFAULT_MODEL, DEFAULT_SYSTEM_PROMPT,
};
use crate::util::{mask_secret, validate_api_key};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Config file name searched in the working directory and the user config dir
pub const CONFIG_FILE_NAME: &str = "consolegpt.toml";

/// Completion provider and generation settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OpenAiConfig {
    pub provider: Provider,
    /// Overrides the provider's default endpoint
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub chat_model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
    pub frequency_penalty: f32,
    pub presence_penalty: f32,
    pub system_prompt: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            provider: Provider::default(),
            base_url: None,
            api_key: None,
            chat_model: DEFAULT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: 0.7,
            top_p: 1.0,
            frequency_penalty: 0.0,
            presence_penalty: 0.0,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            timeout_secs: 60,
            max_retries: 2,
        }
    }
}

/// Speech service and audio device settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SpeechConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    pub speech_recognition_language: String,
    pub speech_synthesis_voice_name: String,
    pub enable_speech_style: bool,
    pub speech_style: String,
    pub rate: String,
    pub mic_device: String,
    pub speaker_device: String,
    /// Length of each recorded utterance
    pub record_secs: u64,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            region: None,
            key: None,
            speech_recognition_language: "en-US".to_string(),
            speech_synthesis_voice_name: "en-US-JennyNeural".to_string(),
            enable_speech_style: false,
            speech_style: "chat".to_string(),
            rate: "medium".to_string(),
            mic_device: "default".to_string(),
            speaker_device: "default".to_string(),
            record_secs: 5,
        }
    }
}

/// Session loop behaviour
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SessionConfig {
    pub modality: ModalityKind,
    pub exit_phrase: String,
    pub goodbye_rule: GoodbyeRule,
    /// Empty disables the greeting
    pub greeting: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            modality: ModalityKind::default(),
            exit_phrase: DEFAULT_EXIT_PHRASE.to_string(),
            goodbye_rule: GoodbyeRule::default(),
            greeting: DEFAULT_GREETING.to_string(),
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub openai: OpenAiConfig,
    pub speech: SpeechConfig,
    pub session: SessionConfig,
}

/// Find the configuration file in standard locations
///
/// Searches `./consolegpt.toml`, then `~/.config/consolegpt/consolegpt.toml`.
pub fn find_config_file() -> Option<PathBuf> {
    let local = Path::new(CONFIG_FILE_NAME);
    if local.exists() {
        return Some(local.to_path_buf());
    }

    Config::user_config_path()
        .ok()
        .filter(|path| path.exists())
}

impl Config {
    /// Load from the first config file found, or defaults if there is none
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Io` if a file exists but cannot be read, or
    /// `ConfigError::TomlParse` if it contains invalid TOML.
    pub fn load() -> Result<Self, ConfigError> {
        match find_config_file() {
            Some(path) => Self::load_from(&path),
            None => Ok(Config::default()),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Save configuration as pretty-printed TOML, creating parent directories
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let toml_string = toml::to_string_pretty(self)?;
        fs::write(path, toml_string)?;
        Ok(())
    }

    /// Get the default user config path
    ///
    /// Returns `~/.config/consolegpt/consolegpt.toml`.
    pub fn user_config_path() -> Result<PathBuf, ConfigError> {
        let home_dir = dirs::home_dir().ok_or_else(|| {
            ConfigError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "Could not determine home directory",
            ))
        })?;
        Ok(home_dir.join(".config").join("consolegpt").join(CONFIG_FILE_NAME))
    }

    /// Apply environment variable overrides
    ///
    /// - `CONSOLEGPT_API_KEY` (falls back to `OPENAI_API_KEY`) → `openai.api_key`
    /// - `CONSOLEGPT_BASE_URL` → `openai.base_url`
    /// - `CONSOLEGPT_MODEL` → `openai.chat_model`
    /// - `CONSOLEGPT_PROVIDER` → `openai.provider`
    /// - `CONSOLEGPT_MODALITY` → `session.modality`
    /// - `AZURE_SPEECH_KEY` / `AZURE_SPEECH_REGION` → `speech.key` / `speech.region`
    ///
    /// Invalid values are reported as warnings but don't cause errors.
    pub fn apply_env_overrides(&mut self) {
        for warning in self.apply_overrides_from(|name| env::var(name).ok()) {
            eprintln!("Warning: {}", warning);
        }
    }

    /// Apply overrides from an arbitrary variable lookup, returning warnings
    pub fn apply_overrides_from<F>(&mut self, lookup: F) -> Vec<String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let mut warnings = Vec::new();

        if let Some(api_key) = get("CONSOLEGPT_API_KEY").or_else(|| get("OPENAI_API_KEY")) {
            self.openai.api_key = Some(api_key);
        }

        if let Some(base_url) = get("CONSOLEGPT_BASE_URL") {
            self.openai.base_url = Some(base_url);
        }

        if let Some(model) = get("CONSOLEGPT_MODEL") {
            self.openai.chat_model = model;
        }

        if let Some(provider) = get("CONSOLEGPT_PROVIDER") {
            match Provider::parse(&provider) {
                Some(provider) => self.openai.provider = provider,
                None => warnings.push(format!("Invalid CONSOLEGPT_PROVIDER value: {}", provider)),
            }
        }

        if let Some(modality) = get("CONSOLEGPT_MODALITY") {
            match modality.parse::<ModalityKind>() {
                Ok(kind) => self.session.modality = kind,
                Err(_) => warnings.push(format!("Invalid CONSOLEGPT_MODALITY value: {}", modality)),
            }
        }

        if let Some(key) = get("AZURE_SPEECH_KEY") {
            self.speech.key = Some(key);
        }

        if let Some(region) = get("AZURE_SPEECH_REGION") {
            self.speech.region = Some(region);
        }

        warnings
    }

    /// Reject settings the session cannot start with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.openai.max_tokens == 0 {
            return Err(ConfigError::Invalid(
                "openai.max_tokens must be greater than 0".to_string(),
            ));
        }

        if self.base_url().is_none() {
            return Err(ConfigError::Invalid(format!(
                "openai.base_url is required for provider {}",
                self.openai.provider
            )));
        }

        if self.session.modality == ModalityKind::Speech {
            let missing = |v: &Option<String>| v.as_deref().map_or(true, |s| s.trim().is_empty());
            if missing(&self.speech.region) || missing(&self.speech.key) {
                return Err(ConfigError::Invalid(
                    "speech modality requires speech.region and speech.key \
                     (or AZURE_SPEECH_REGION and AZURE_SPEECH_KEY)"
                        .to_string(),
                ));
            }
        }

        Ok(())
    }

    /// Explicit base URL, or the provider's default
    pub fn base_url(&self) -> Option<String> {
        self.openai
            .base_url
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .map(String::from)
            .or_else(|| self.openai.provider.default_base_url().map(String::from))
    }

    pub fn session_params(&self) -> SessionParams {
        SessionParams {
            model: self.openai.chat_model.clone(),
            system_prompt: self.openai.system_prompt.clone(),
            max_tokens: self.openai.max_tokens,
            temperature: self.openai.temperature,
            top_p: self.openai.top_p,
            frequency_penalty: self.openai.frequency_penalty,
            presence_penalty: self.openai.presence_penalty,
        }
    }

    pub fn llm_config(&self) -> Result<LlmConfig, ConfigError> {
        let base_url = self.base_url().ok_or_else(|| {
            ConfigError::Invalid(format!(
                "openai.base_url is required for provider {}",
                self.openai.provider
            ))
        })?;
        let api_key = match self.openai.api_key.as_deref() {
            Some(key) => {
                validate_api_key(key).map_err(|e| ConfigError::Invalid(e.to_string()))?
            }
            None => None,
        };

        Ok(LlmConfig::new(self.openai.provider.display_name(), base_url)
            .with_api_key(api_key)
            .with_timeout_secs(self.openai.timeout_secs)
            .with_max_retries(self.openai.max_retries))
    }

    pub fn goodbye_matcher(&self) -> GoodbyeMatcher {
        GoodbyeMatcher::new(self.session.exit_phrase.clone(), self.session.goodbye_rule)
    }

    pub fn voice_settings(&self) -> VoiceSettings {
        VoiceSettings {
            name: self.speech.speech_synthesis_voice_name.clone(),
            rate: self.speech.rate.clone(),
            style: self
                .speech
                .enable_speech_style
                .then(|| self.speech.speech_style.clone()),
            language: self.speech.speech_recognition_language.clone(),
        }
    }

    /// TOML rendering with secrets masked, for display
    pub fn render_masked(&self) -> Result<String, ConfigError> {
        let mut masked = self.clone();
        masked.openai.api_key = masked.openai.api_key.as_deref().map(mask_secret);
        masked.speech.key = masked.speech.key.as_deref().map(mask_secret);
        Ok(toml::to_string_pretty(&masked)?)
    }
}
