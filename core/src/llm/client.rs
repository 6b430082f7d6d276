//! LLM Client implementation
//!
//! Speaks the OpenAI chat-completions protocol, which OpenAI, Ollama,
//! OpenRouter and most local model servers accept.

use super::{ChatCompletion, ChatMessage, ChatRequest, ChatResponse, LlmConfig};
use crate::error::ProviderError;
use crate::session::SessionParams;
use crate::util::{sanitize_base_url, validate_api_key};
use anyhow::{Context, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use rand::Rng;
use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE, RETRY_AFTER},
    Client as HttpClient, StatusCode,
};
use std::time::Instant;
use tokio::time::{sleep, Duration};
use tokio_util::sync::CancellationToken;

const INITIAL_RETRY_DELAY: Duration = Duration::from_secs(1);

/// OpenAI-compatible chat completion client
pub struct LlmClient {
    config: LlmConfig,
    url: String,
    http_client: HttpClient,
    headers: HeaderMap,
    /// Cancellation token for aborting retries
    cancel_token: Mutex<Option<CancellationToken>>,
}

impl LlmClient {
    /// Create a new LLM client
    ///
    /// Fails if the base URL or API key cannot be used in a request.
    pub fn new(config: LlmConfig) -> Result<Self> {
        let base_url = sanitize_base_url(&config.base_url, "Base URL")?;
        let url = format!("{}/chat/completions", base_url);
        let headers = build_headers(&base_url, config.api_key.as_deref())?;

        let http_client = HttpClient::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("consolegpt/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(LlmClient {
            config,
            url,
            http_client,
            headers,
            cancel_token: Mutex::new(None),
        })
    }

    /// Abort pending retries when this token is cancelled
    pub fn set_cancel_token(&self, token: CancellationToken) {
        *self.cancel_token.lock() = Some(token);
    }

    fn current_cancel_token(&self) -> Option<CancellationToken> {
        self.cancel_token.lock().clone()
    }

    /// Get the configuration
    pub fn config(&self) -> &LlmConfig {
        &self.config
    }

    /// Full URL requests are posted to
    pub fn endpoint(&self) -> &str {
        &self.url
    }

    /// Post the request, retrying failures that [`ProviderError::is_retryable`] accepts
    ///
    /// Returns the first successful response, or the mapped error once it is
    /// not retryable or no retries remain.
    async fn send_with_retry(
        &self,
        request: &ChatRequest<'_>,
    ) -> Result<reqwest::Response, ProviderError> {
        let mut attempt = 0;
        let mut delay = INITIAL_RETRY_DELAY;

        loop {
            let token = self.current_cancel_token();
            if token.as_ref().is_some_and(|t| t.is_cancelled()) {
                return Err(ProviderError::Cancelled);
            }

            let err = match self
                .http_client
                .post(&self.url)
                .headers(self.headers.clone())
                .json(request)
                .send()
                .await
            {
                Ok(response) if response.status().is_success() => return Ok(response),
                Ok(response) => {
                    let status = response.status();
                    let retry = retry_after(response.headers());
                    let body = response.text().await.unwrap_or_default();
                    error_for_status(status, &body, retry)
                }
                Err(e) => ProviderError::from(e),
            };

            let wait = match next_wait(&err, attempt, self.config.max_retries, delay) {
                Some(wait) => wait,
                None => return Err(err),
            };
            crate::warn_log!(
                "{} request failed: {}, retrying in {:?} (attempt {}/{})",
                self.config.provider_name,
                err,
                wait,
                attempt + 1,
                self.config.max_retries
            );

            match token {
                Some(token) => {
                    tokio::select! {
                        _ = sleep(wait) => {},
                        _ = token.cancelled() => return Err(ProviderError::Cancelled),
                    }
                }
                None => sleep(wait).await,
            }

            attempt += 1;

            // Jitter: +/- 250ms
            let jitter_ms: i64 = rand::thread_rng().gen_range(-250..=250);
            let next_ms = (delay.as_millis() as i64 * 2 + jitter_ms).max(0) as u64;
            delay = Duration::from_millis(next_ms);
        }
    }
}

/// Delay before the next attempt, or `None` when `err` should be returned
fn next_wait(err: &ProviderError, attempt: u32, max_retries: u32, backoff: Duration) -> Option<Duration> {
    if !err.is_retryable() || attempt >= max_retries {
        return None;
    }
    Some(err.retry_delay().unwrap_or(backoff))
}

#[async_trait]
impl ChatCompletion for LlmClient {
    async fn generate(
        &self,
        transcript: &[ChatMessage],
        params: &SessionParams,
    ) -> Result<String, ProviderError> {
        let request = ChatRequest::new(transcript, params);
        crate::info_log!(
            "Chat request: provider={}, model={}, messages={}",
            self.config.provider_name,
            params.model,
            transcript.len()
        );

        let started = Instant::now();
        let response = self.send_with_retry(&request).await.map_err(|err| {
            crate::error_log!("Chat failed after {:?}: {}", started.elapsed(), err);
            err
        })?;

        let text = response.text().await?;
        let body: ChatResponse = serde_json::from_str(&text).map_err(|e| {
            crate::error_log!("Failed to parse chat response: {}. Raw body: {}", e, text);
            ProviderError::MalformedResponse {
                message: e.to_string(),
            }
        })?;

        match &body.usage {
            Some(usage) => crate::info_log!("Chat completed in {:?}: {}", started.elapsed(), usage),
            None => crate::info_log!("Chat completed in {:?} (no usage data)", started.elapsed()),
        }

        body.content()
            .map(str::to_string)
            .ok_or_else(|| ProviderError::MalformedResponse {
                message: "response contained no message".to_string(),
            })
    }

    fn provider_name(&self) -> &str {
        &self.config.provider_name
    }
}

/// Build headers for API requests
fn build_headers(base_url: &str, api_key: Option<&str>) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    // OpenRouter attributes traffic by these headers
    if base_url.contains("openrouter.ai") {
        headers.insert("X-Title", HeaderValue::from_static("consolegpt"));
    }

    if let Some(key) = api_key.map(validate_api_key).transpose()?.flatten() {
        headers.insert(
            AUTHORIZATION,
            format!("Bearer {}", key)
                .parse()
                .context("Invalid Authorization header")?,
        );
    }

    Ok(headers)
}

/// Parse a `Retry-After` header given in seconds
fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

/// Pull `error.message` out of an OpenAI-style error body
fn extract_error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value
        .get("error")
        .and_then(|e| e.get("message").or(Some(e)))
        .and_then(|m| m.as_str())
        .map(str::to_string)
}

/// Map a non-success status and its body to a [`ProviderError`]
pub(crate) fn error_for_status(
    status: StatusCode,
    body: &str,
    retry_after: Option<Duration>,
) -> ProviderError {
    let detail = extract_error_message(body);
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ProviderError::Unauthorized {
            message: detail.unwrap_or_else(|| "Authentication failed. Check your API key.".to_string()),
        },
        StatusCode::TOO_MANY_REQUESTS => ProviderError::RateLimited {
            message: detail.unwrap_or_else(|| "Rate limit exceeded".to_string()),
            retry_after,
        },
        status => ProviderError::Api {
            status: status.as_u16(),
            message: detail.unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("Unknown error")
                    .to_string()
            }),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> LlmConfig {
        LlmConfig::new("OpenAI", "https://api.openai.com/v1/")
            .with_api_key(Some("sk-test".to_string()))
    }

    #[test]
    fn test_endpoint_is_built_from_base_url() {
        let client = LlmClient::new(config()).unwrap();
        assert_eq!(client.endpoint(), "https://api.openai.com/v1/chat/completions");
        assert_eq!(client.provider_name(), "OpenAI");
    }

    #[test]
    fn test_invalid_base_url_is_rejected() {
        let cfg = LlmConfig::new("OpenAI", "localhost:11434");
        assert!(LlmClient::new(cfg).is_err());
    }

    #[test]
    fn test_headers_with_and_without_key() {
        let headers = build_headers("https://api.openai.com/v1", Some("sk-abc")).unwrap();
        assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Bearer sk-abc");

        let headers = build_headers("http://localhost:11434/v1", Some("none")).unwrap();
        assert!(headers.get(AUTHORIZATION).is_none());

        let headers = build_headers("https://openrouter.ai/api/v1", None).unwrap();
        assert_eq!(headers.get("X-Title").unwrap(), "consolegpt");
    }

    #[test]
    fn test_unauthorized_mapping() {
        let body = r#"{"error":{"message":"Incorrect API key provided: sk-xxx.","type":"invalid_request_error"}}"#;
        let err = error_for_status(StatusCode::UNAUTHORIZED, body, None);
        assert_eq!(
            err,
            ProviderError::Unauthorized {
                message: "Incorrect API key provided: sk-xxx.".to_string()
            }
        );
    }

    #[test]
    fn test_rate_limit_mapping_keeps_retry_after() {
        let err = error_for_status(
            StatusCode::TOO_MANY_REQUESTS,
            "not json",
            Some(Duration::from_secs(3)),
        );
        assert_eq!(err.message(), "Rate limit exceeded");
        assert_eq!(err.retry_delay(), Some(Duration::from_secs(3)));
    }

    #[test]
    fn test_other_status_mapping() {
        let err = error_for_status(
            StatusCode::NOT_FOUND,
            r#"{"error":{"message":"The model `gpt-5` does not exist"}}"#,
            None,
        );
        assert_eq!(
            err.message(),
            "API request failed (404): The model `gpt-5` does not exist"
        );

        let err = error_for_status(StatusCode::BAD_GATEWAY, "", None);
        assert_eq!(err.message(), "API request failed (502): Bad Gateway");
    }

    #[test]
    fn test_string_error_bodies() {
        // Some compatible servers return {"error": "..."}
        assert_eq!(
            extract_error_message(r#"{"error":"model not loaded"}"#),
            Some("model not loaded".to_string())
        );
        assert_eq!(extract_error_message(r#"{"detail":"x"}"#), None);
    }

    #[test]
    fn test_retry_after_header() {
        let mut headers = HeaderMap::new();
        headers.insert(RETRY_AFTER, HeaderValue::from_static("12"));
        assert_eq!(retry_after(&headers), Some(Duration::from_secs(12)));

        headers.insert(RETRY_AFTER, HeaderValue::from_static("Wed, 21 Oct 2015 07:28:00 GMT"));
        assert_eq!(retry_after(&headers), None);
    }

    #[test]
    fn test_retry_policy_follows_error_mapping() {
        let backoff = Duration::from_secs(1);

        let unavailable = error_for_status(StatusCode::SERVICE_UNAVAILABLE, "", None);
        assert_eq!(next_wait(&unavailable, 0, 2, backoff), Some(backoff));
        assert_eq!(next_wait(&unavailable, 2, 2, backoff), None);

        let limited = error_for_status(
            StatusCode::TOO_MANY_REQUESTS,
            "",
            Some(Duration::from_secs(7)),
        );
        assert_eq!(next_wait(&limited, 0, 2, backoff), Some(Duration::from_secs(7)));

        for status in [StatusCode::NOT_IMPLEMENTED, StatusCode::HTTP_VERSION_NOT_SUPPORTED] {
            let err = error_for_status(status, "", None);
            assert!(!err.is_retryable());
            assert_eq!(next_wait(&err, 0, 2, backoff), None);
        }

        let unauthorized = error_for_status(StatusCode::UNAUTHORIZED, "", None);
        assert_eq!(next_wait(&unauthorized, 0, 2, backoff), None);

        let network = ProviderError::Network {
            message: "connection reset".to_string(),
        };
        assert_eq!(next_wait(&network, 1, 2, backoff), Some(backoff));
    }

    #[tokio::test]
    async fn test_cancelled_token_short_circuits() {
        let client = LlmClient::new(config()).unwrap();
        let token = CancellationToken::new();
        token.cancel();
        client.set_cancel_token(token);

        let params = SessionParams::default();
        let transcript = vec![ChatMessage::system("sys"), ChatMessage::user("hi")];
        let result = client.generate(&transcript, &params).await;
        assert_eq!(result, Err(ProviderError::Cancelled));
    }
}
