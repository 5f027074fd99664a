use url::Url;

use crate::error::ClientError;

/// Trim, default the scheme to `https://` and check the result is an
/// absolute URL with a host.
pub fn normalize_website(input: &str) -> Result<String, ClientError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ClientError::Validation("Please enter a website".to_string()));
    }

    let candidate = if trimmed.starts_with("http") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    };

    match Url::parse(&candidate) {
        Ok(url) if url.host_str().is_some_and(|h| !h.is_empty()) => Ok(candidate),
        _ => Err(ClientError::Validation(format!(
            "Please enter a valid website URL: {}",
            trimmed
        ))),
    }
}
