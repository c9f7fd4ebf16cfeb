//! Sign-in error types.

use thiserror::Error;

use crate::traits::NetworkFailure;

/// Error type for sign-in operations.
#[derive(Error, Debug)]
pub enum SignInError {
    /// A required URL is missing or malformed; a data problem, not retryable
    #[error("No usable URL for {0}")]
    NoUrl(String),

    /// Transport-level failure
    #[error("Network error: {0}")]
    Network(#[from] NetworkFailure),

    /// The server rejected the credentials
    #[error("Validation failed: {}", message.as_deref().unwrap_or("credentials were not accepted"))]
    Validation {
        title: Option<String>,
        message: Option<String>,
    },

    /// The profile response could not be parsed
    #[error("Profile parse error: {0}")]
    ProfileParse(#[from] auth_document::ParseError),

    /// DRM activation never called back within the cutoff
    #[error("DRM activation is taking longer than expected")]
    DrmTimeout,

    /// The DRM vendor rejected the activation
    #[error("DRM activation rejected: {0}")]
    DrmRejected(String),

    /// DRM capability configured but not currently usable
    #[error("DRM support unavailable: {0}")]
    DrmUnavailable(String),

    /// Invalid state transition in the sign-in FSM
    #[error("Invalid sign-in state transition: {0}")]
    InvalidStateTransition(String),
}

impl SignInError {
    /// Returns true if retrying later could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            SignInError::Network(failure) => failure.is_transient(),
            SignInError::DrmTimeout => true,
            _ => false,
        }
    }
}

/// Result type alias using SignInError.
pub type SignInResult<T> = Result<T, SignInError>;
