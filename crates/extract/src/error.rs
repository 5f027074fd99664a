use thiserror::Error;

/// Failures of the extraction handler. Each maps to an HTTP status and an
/// error envelope message.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("{0}")]
    Validation(String),

    #[error("API key not found or error retrieving it")]
    MissingApiKey,

    #[error("{}", describe_upstream(.status, .message))]
    Upstream { status: u16, message: String },

    #[error("Request failed: {0}")]
    Transport(String),

    #[error("Failed to parse API response: {0}")]
    Parse(String),

    #[error("Invalid response format from API")]
    InvalidFormat,
}

impl ExtractError {
    pub fn status_code(&self) -> u16 {
        match self {
            ExtractError::Validation(_) => 400,
            ExtractError::Upstream { status, .. } => *status,
            _ => 500,
        }
    }
}

/// Best-effort category of a completion API failure, guessed from its text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpstreamErrorKind {
    InvalidApiKey,
    InsufficientPermissions,
    RateLimited,
    ModelAccessDenied,
    Other,
}

impl UpstreamErrorKind {
    fn hint(&self) -> Option<&'static str> {
        match self {
            UpstreamErrorKind::InvalidApiKey => Some("Invalid API key. Check the key configured for the extraction service."),
            UpstreamErrorKind::InsufficientPermissions => Some("The API key lacks the permissions required for this request."),
            UpstreamErrorKind::RateLimited => Some("Rate limit reached. Wait a moment and try again."),
            UpstreamErrorKind::ModelAccessDenied => Some("This API key does not have access to the requested model."),
            UpstreamErrorKind::Other => None,
        }
    }
}

pub fn classify_upstream_error(message: &str) -> UpstreamErrorKind {
    let message = message.to_lowercase();

    if message.contains("incorrect api key") || message.contains("invalid api key") || message.contains("invalid_api_key") {
        UpstreamErrorKind::InvalidApiKey
    } else if message.contains("insufficient permissions") || message.contains("missing scopes") {
        UpstreamErrorKind::InsufficientPermissions
    } else if message.contains("rate limit") || message.contains("rate_limit") {
        UpstreamErrorKind::RateLimited
    } else if message.contains("does not exist or you do not have access") || message.contains("model_not_found") {
        UpstreamErrorKind::ModelAccessDenied
    } else {
        UpstreamErrorKind::Other
    }
}

fn describe_upstream(status: &u16, message: &str) -> String {
    let base = format!("API Error ({}): {}", status, message);
    match classify_upstream_error(message).hint() {
        Some(hint) => format!("{} {}", hint, base),
        None => base,
    }
}
