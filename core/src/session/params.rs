/// Default chat model
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";

/// Default system prompt
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant.";

/// Default output token limit
pub const DEFAULT_MAX_TOKENS: u32 = 1500;

/// Generation parameters sent with every completion request
///
/// Built once from configuration when the session starts. Ranges are the
/// provider's business and are not validated here.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionParams {
    /// Model identifier
    pub model: String,
    /// First message of every transcript
    pub system_prompt: String,
    /// Maximum tokens in each reply
    pub max_tokens: u32,
    /// Randomness (0.0 - 2.0)
    pub temperature: f32,
    /// Nucleus sampling (0.0 - 1.0)
    pub top_p: f32,
    /// Penalty for tokens by frequency so far (-2.0 - 2.0)
    pub frequency_penalty: f32,
    /// Penalty for tokens already present (-2.0 - 2.0)
    pub presence_penalty: f32,
}

impl Default for SessionParams {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: 0.7,
            top_p: 1.0,
            frequency_penalty: 0.0,
            presence_penalty: 0.0,
        }
    }
}
