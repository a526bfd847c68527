use banana_contracts::catalog::AspectRatio;
use thiserror::Error;

/// Why a generation call produced nothing usable. Every variant is
/// recoverable; callers show a fixed message and return to idle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    #[error("API key not set (checked {checked})")]
    CredentialMissing { checked: String },

    #[error("generation request timed out after {seconds}s")]
    Timeout { seconds: u64 },

    #[error("generation request failed: {0}")]
    Network(String),

    #[error("generation service rejected the request ({status}): {body}")]
    Service { status: u16, body: String },

    #[error("generation service returned a malformed response: {0}")]
    MalformedResponse(String),

    #[error("generation service returned no {0}")]
    NoContent(&'static str),

    #[error("aspect ratio {0} is not supported by the image service")]
    UnsupportedAspectRatio(AspectRatio),
}

impl GenerationError {
    /// Short stable label for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            GenerationError::CredentialMissing { .. } => "credential_missing",
            GenerationError::Timeout { .. } => "timeout",
            GenerationError::Network(_) => "network",
            GenerationError::Service { .. } => "service",
            GenerationError::MalformedResponse(_) => "malformed_response",
            GenerationError::NoContent(_) => "no_content",
            GenerationError::UnsupportedAspectRatio(_) => "unsupported_aspect_ratio",
        }
    }
}
