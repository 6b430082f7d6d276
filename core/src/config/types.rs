use serde::{Deserialize, Serialize};

/// LLM Provider types
///
/// Every provider speaks the OpenAI chat-completions protocol; they differ in
/// default base URL and whether an API key is needed.
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Provider {
    /// OpenAI API (GPT models)
    ///
    /// Default URL: https://api.openai.com/v1
    #[default]
    Openai,

    /// Ollama (local models)
    ///
    /// Default URL: http://localhost:11434/v1
    /// No API key required
    Ollama,

    /// OpenRouter (unified API for multiple providers)
    ///
    /// Default URL: https://openrouter.ai/api/v1
    Openrouter,

    /// Custom provider (user-specified URL)
    Custom,
}

impl Provider {
    pub fn default_base_url(&self) -> Option<&'static str> {
        match self {
            Provider::Openai => Some("https://api.openai.com/v1"),
            Provider::Ollama => Some("http://localhost:11434/v1"),
            Provider::Openrouter => Some("https://openrouter.ai/api/v1"),
            Provider::Custom => None,
        }
    }

    /// Name shown to the user when the provider fails
    pub fn display_name(&self) -> &'static str {
        match self {
            Provider::Openai => "OpenAI",
            Provider::Ollama => "Ollama",
            Provider::Openrouter => "OpenRouter",
            Provider::Custom => "Custom endpoint",
        }
    }

    /// Parse a provider string into a Provider enum variant
    pub fn parse(s: &str) -> Option<Provider> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Some(Provider::Openai),
            "ollama" => Some(Provider::Ollama),
            "openrouter" => Some(Provider::Openrouter),
            "custom" => Some(Provider::Custom),
            _ => None,
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// IO error occurred while reading/writing config file
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
    /// TOML serialization error
    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
    /// A value parsed but cannot be used
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_parse() {
        assert_eq!(Provider::parse("OpenAI"), Some(Provider::Openai));
        assert_eq!(Provider::parse(" ollama "), Some(Provider::Ollama));
        assert_eq!(Provider::parse("openrouter"), Some(Provider::Openrouter));
        assert_eq!(Provider::parse("custom"), Some(Provider::Custom));
        assert_eq!(Provider::parse("gemini"), None);
    }

    #[test]
    fn test_provider_defaults() {
        assert_eq!(Provider::Openai.default_base_url(), Some("https://api.openai.com/v1"));
        assert_eq!(Provider::Custom.default_base_url(), None);
        assert_eq!(Provider::Openai.to_string(), "OpenAI");
    }
}
