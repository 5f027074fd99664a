use thiserror::Error;

/// Why a single extraction failed, as shown to the user. None of these are
/// retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// Bad input, caught before any network call.
    #[error("{0}")]
    Validation(String),

    /// The boundary could not be reached.
    #[error("Request failed: {0}")]
    Transport(String),

    /// The boundary answered with a failure envelope; shown verbatim.
    #[error("{0}")]
    Service(String),

    /// The boundary answered, but not with something we can read.
    #[error("Invalid response format: {0}")]
    MalformedResponse(String),
}
