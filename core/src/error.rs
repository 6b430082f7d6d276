//! Structured error types for ConsoleGPT
//!
//! Provider failures are recovered inside the session loop and turned into
//! assistant replies, so their `Display` output is the bare message that ends
//! up in the transcript. Modality failures are the only errors the loop
//! returns to its caller.

use std::time::Duration;
use thiserror::Error;

/// Failure reported by a chat completion provider
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    /// Authentication/authorization errors (401, 403)
    #[error("{message}")]
    Unauthorized { message: String },

    /// Rate limit exceeded (429)
    #[error("{message}")]
    RateLimited {
        message: String,
        retry_after: Option<Duration>,
    },

    /// Any other non-success status returned by the API
    #[error("API request failed ({status}): {message}")]
    Api { status: u16, message: String },

    /// Network/connection error, including timeouts
    #[error("{message}")]
    Network { message: String },

    /// The provider answered but the body could not be used
    #[error("malformed response: {message}")]
    MalformedResponse { message: String },

    /// The request was aborted by a shutdown signal
    #[error("request cancelled")]
    Cancelled,
}

impl ProviderError {
    /// Text placed between the parentheses of the synthesized error reply
    pub fn message(&self) -> String {
        self.to_string()
    }

    /// Check if error is retryable (transient)
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RateLimited { .. } | Self::Network { .. } => true,
            Self::Api { status, .. } => matches!(status, 500 | 502 | 503 | 504),
            Self::Unauthorized { .. } | Self::MalformedResponse { .. } | Self::Cancelled => false,
        }
    }

    /// Get suggested retry delay for retryable errors
    pub fn retry_delay(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::MalformedResponse {
                message: err.to_string(),
            }
        } else {
            Self::Network {
                message: err.to_string(),
            }
        }
    }
}

/// Failure of an input/output modality (console or speech device)
#[derive(Error, Debug)]
pub enum ModalityError {
    /// The input stream reached end-of-file
    #[error("input closed")]
    InputClosed,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Audio capture or playback failed
    #[error("audio device error: {message}")]
    Device { message: String },

    /// Speech-to-text request failed
    #[error("speech recognition failed: {message}")]
    Recognition { message: String },

    /// Text-to-speech request failed
    #[error("speech synthesis failed: {message}")]
    Synthesis { message: String },
}

/// Error returned by the session loop
#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Modality(#[from] ModalityError),

    /// Writing the transcript log failed
    #[error("failed to write transcript: {0}")]
    Transcript(std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_is_bare_message() {
        let err = ProviderError::RateLimited {
            message: "rate limited".to_string(),
            retry_after: None,
        };
        assert_eq!(err.message(), "rate limited");

        let err = ProviderError::Unauthorized {
            message: "Incorrect API key provided".to_string(),
        };
        assert_eq!(err.to_string(), "Incorrect API key provided");
    }

    #[test]
    fn test_api_error_includes_status() {
        let err = ProviderError::Api {
            status: 400,
            message: "bad request".to_string(),
        };
        assert_eq!(err.message(), "API request failed (400): bad request");
    }

    #[test]
    fn test_retryable_errors() {
        assert!(ProviderError::Network {
            message: "timeout".to_string()
        }
        .is_retryable());
        assert!(ProviderError::Api {
            status: 503,
            message: "overloaded".to_string()
        }
        .is_retryable());
        assert!(!ProviderError::Api {
            status: 404,
            message: "no such model".to_string()
        }
        .is_retryable());
        assert!(!ProviderError::Unauthorized {
            message: "bad token".to_string()
        }
        .is_retryable());
        assert!(!ProviderError::Cancelled.is_retryable());
    }

    #[test]
    fn test_retry_delay() {
        let err = ProviderError::RateLimited {
            message: "slow down".to_string(),
            retry_after: Some(Duration::from_secs(7)),
        };
        assert_eq!(err.retry_delay(), Some(Duration::from_secs(7)));
        assert_eq!(ProviderError::Cancelled.retry_delay(), None);
    }

    #[test]
    fn test_session_error_wraps_modality() {
        let err: SessionError = ModalityError::Device {
            message: "arecord missing".to_string(),
        }
        .into();
        assert_eq!(err.to_string(), "audio device error: arecord missing");
    }
}
