//! Shared utility functions for the application

use anyhow::{bail, Context, Result};

/// Sanitize a string value for safe use in HTTP headers
///
/// Control characters, DEL, newlines and null bytes are rejected.
pub fn sanitize_for_header(value: &str, field_name: &str) -> Result<String> {
    if value.is_empty() {
        bail!("{} cannot be empty", field_name);
    }

    for (index, ch) in value.char_indices() {
        if ch.is_ascii_control() {
            bail!(
                "{} contains invalid character at position {} (byte value: {:#04x}). \
                Control characters, newlines, carriage returns, and null bytes are not allowed.",
                field_name,
                index,
                ch as u32
            );
        }
    }

    Ok(value.to_string())
}

/// Validate an API key can be used in an Authorization header
///
/// Returns `None` for empty keys and the conventional `none` placeholder used
/// by local endpoints that do not authenticate.
pub fn validate_api_key(api_key: &str) -> Result<Option<String>> {
    let trimmed = api_key.trim();

    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("none") {
        return Ok(None);
    }

    sanitize_for_header(trimmed, "API key")?;

    let header_value = format!("Bearer {}", trimmed);
    header_value
        .parse::<reqwest::header::HeaderValue>()
        .with_context(|| {
            format!(
                "API key results in invalid Authorization header. Key length: {} characters.",
                trimmed.len()
            )
        })?;

    Ok(Some(trimmed.to_string()))
}

/// Sanitize a base URL for API requests
///
/// Returns the trimmed URL without a trailing slash.
pub fn sanitize_base_url(url: &str, field_name: &str) -> Result<String> {
    let trimmed = url.trim();

    if trimmed.is_empty() {
        bail!("{} cannot be empty", field_name);
    }

    // Encoded separators mean the value was double-encoded somewhere
    if trimmed.contains("%2F") || trimmed.contains("%3D") || trimmed.contains("%20") {
        bail!(
            "{} appears to contain URL-encoded characters (e.g., %2F, %3D, %20). \
            Please verify the URL is not double-encoded.",
            field_name
        );
    }

    if !trimmed.starts_with("http://") && !trimmed.starts_with("https://") {
        bail!(
            "{} must start with 'http://' or 'https://'. Got: {}",
            field_name,
            trimmed
        );
    }

    Ok(trimmed.trim_end_matches('/').to_string())
}

/// Mask a secret for display, keeping the first four characters
pub fn mask_secret(secret: &str) -> String {
    let visible: String = secret.chars().take(4).collect();
    if secret.chars().count() <= 4 {
        "****".to_string()
    } else {
        format!("{}****", visible)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_for_header_rejects_newline() {
        assert!(sanitize_for_header("abc\ndef", "API key").is_err());
        assert!(sanitize_for_header("abc\0", "API key").is_err());
        assert_eq!(sanitize_for_header("sk-abc", "API key").unwrap(), "sk-abc");
    }

    #[test]
    fn test_validate_api_key() {
        assert_eq!(validate_api_key("  sk-test  ").unwrap(), Some("sk-test".to_string()));
        assert_eq!(validate_api_key("none").unwrap(), None);
        assert_eq!(validate_api_key("").unwrap(), None);
        assert!(validate_api_key("sk-\rtest").is_err());
    }

    #[test]
    fn test_sanitize_base_url() {
        assert_eq!(
            sanitize_base_url("https://api.openai.com/v1/", "Base URL").unwrap(),
            "https://api.openai.com/v1"
        );
        assert!(sanitize_base_url("api.openai.com", "Base URL").is_err());
        assert!(sanitize_base_url("https://host%2Fv1", "Base URL").is_err());
        assert!(sanitize_base_url("   ", "Base URL").is_err());
    }

    #[test]
    fn test_mask_secret() {
        assert_eq!(mask_secret("sk-1234567890"), "sk-1****");
        assert_eq!(mask_secret("abc"), "****");
    }
}
