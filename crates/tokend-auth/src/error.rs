//! Error types for token signing operations.
//!
//! Provides explicit error variants so callers can distinguish a signer
//! that rejected the caller from a signer that could not be reached.

use thiserror::Error;

/// Token signing error types.
///
/// Each variant maps to a specific failure mode of the signing backend.
/// The split between [`SignerError::NotAuthenticated`],
/// [`SignerError::PermissionDenied`], and the transport variants matters:
/// the HTTP layer maps them to different status codes.
#[derive(Debug, Error)]
pub enum SignerError {
    /// The signing backend rejected the caller's credentials (HTTP 401).
    #[error("Not authenticated against the signing backend: {0}")]
    NotAuthenticated(String),

    /// The caller lacks permission to use the signing key (HTTP 403).
    #[error("Access to the signing key was denied: {0}")]
    PermissionDenied(String),

    /// The RSA key is invalid or malformed.
    #[error("Invalid signing key: {0}")]
    InvalidKey(String),

    /// The claim set could not be serialized or encoded.
    #[error("Encoding claims failed: {0}")]
    Encoding(String),

    /// The remote signing endpoint returned an unexpected error.
    #[error("Signing backend returned an error: {0}")]
    Backend(String),

    /// The remote signing endpoint was unreachable.
    #[error("Signing backend unreachable: {0}")]
    Transport(#[from] reqwest::Error),
}

impl SignerError {
    /// Check if this error indicates a rejected caller rather than an
    /// unreachable backend.
    #[must_use]
    pub fn is_denied(&self) -> bool {
        matches!(
            self,
            SignerError::NotAuthenticated(_) | SignerError::PermissionDenied(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SignerError::NotAuthenticated("expired credentials".to_string());
        assert_eq!(
            err.to_string(),
            "Not authenticated against the signing backend: expired credentials"
        );

        let err = SignerError::InvalidKey("not PEM".to_string());
        assert_eq!(err.to_string(), "Invalid signing key: not PEM");
    }

    #[test]
    fn test_is_denied() {
        assert!(SignerError::NotAuthenticated("x".into()).is_denied());
        assert!(SignerError::PermissionDenied("x".into()).is_denied());
        assert!(!SignerError::Backend("x".into()).is_denied());
        assert!(!SignerError::Encoding("x".into()).is_denied());
    }
}
