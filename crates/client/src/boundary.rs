use async_trait::async_trait;
use extract::{ExtractRequest, ResponseEnvelope};
use tracing::debug;

use crate::error::ClientError;

/// Where extraction requests go. Only the envelope shape is known here.
#[async_trait]
pub trait ExtractionBoundary: Send + Sync {
    async fn invoke(&self, request: &ExtractRequest) -> Result<ResponseEnvelope, ClientError>;
}

/// Posts the request envelope to the extraction handler over HTTP.
#[derive(Clone)]
pub struct HttpBoundary {
    endpoint: String,
    client: reqwest::Client,
}

impl HttpBoundary {
    pub fn new(endpoint: String) -> Self {
        Self {
            endpoint,
            client: reqwest::Client::new(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ExtractionBoundary for HttpBoundary {
    async fn invoke(&self, request: &ExtractRequest) -> Result<ResponseEnvelope, ClientError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(request)
            .send()
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?;

        debug!(status = status.as_u16(), bytes = body.len(), "Extraction service answered");

        read_envelope(status, &body)
    }
}

/// Failure envelopes arrive with non-2xx statuses, so the body is read
/// first and the status only matters when the body is unreadable.
fn read_envelope(status: reqwest::StatusCode, body: &str) -> Result<ResponseEnvelope, ClientError> {
    match serde_json::from_str::<ResponseEnvelope>(body) {
        Ok(envelope) => Ok(envelope),
        Err(_) if !status.is_success() => Err(ClientError::Service(format!(
            "Error calling extraction service: HTTP {}",
            status
        ))),
        Err(e) => Err(ClientError::MalformedResponse(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn test_failure_envelope_with_error_status() {
        let envelope = read_envelope(
            StatusCode::TOO_MANY_REQUESTS,
            r#"{"success": false, "error": "Rate limit reached"}"#,
        )
        .unwrap();

        assert!(!envelope.success);
        assert_eq!(envelope.error.as_deref(), Some("Rate limit reached"));
    }

    #[test]
    fn test_unreadable_error_body() {
        let err = read_envelope(StatusCode::BAD_GATEWAY, "<html>bad gateway</html>").unwrap_err();
        assert_eq!(
            err,
            ClientError::Service("Error calling extraction service: HTTP 502 Bad Gateway".to_string())
        );
    }

    #[test]
    fn test_unreadable_success_body() {
        let err = read_envelope(StatusCode::OK, "not json").unwrap_err();
        assert!(matches!(err, ClientError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_transport_error() {
        let boundary = HttpBoundary::new("http://127.0.0.1:9/extract-info".to_string());
        let err = boundary.invoke(&ExtractRequest::default()).await.unwrap_err();

        assert!(matches!(err, ClientError::Transport(_)));
        assert!(err.to_string().starts_with("Request failed: "));
    }
}
