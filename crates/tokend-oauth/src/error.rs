//! Error types for the token endpoint.
//!
//! Every failure surfaced to a client is rendered as an RFC 6749 error
//! document (`error` plus optional `error_description`). Internal detail is
//! logged, never echoed beyond the description the variant carries.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Errors produced while handling a token request.
#[derive(Debug, Error)]
pub enum OAuthError {
    /// The request is malformed: missing grant type, no applicable flow, or
    /// an unusable parameter value.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The client or its credentials are invalid.
    #[error("invalid client: {0}")]
    InvalidClient(String),

    /// The client was positively refused, e.g. its certificate chain did not
    /// pass verification or policy rejected it.
    #[error("access denied: {0}")]
    AccessDenied(String),

    /// This service lacks credentials or permission to call the upstream
    /// signing or token-exchange API on the client's behalf.
    #[error("not authenticated: {0}")]
    NotAuthenticated(String),

    /// An upstream dependency failed while minting a token.
    #[error("token issuance failed: {0}")]
    TokenIssuance(String),

    /// Unexpected internal failure.
    #[error("internal error: {0}")]
    Internal(String),
}

impl OAuthError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            OAuthError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            OAuthError::InvalidClient(_) | OAuthError::AccessDenied(_) => StatusCode::FORBIDDEN,
            OAuthError::NotAuthenticated(_) => StatusCode::UNAUTHORIZED,
            OAuthError::TokenIssuance(_) => StatusCode::BAD_GATEWAY,
            OAuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_code(&self) -> TokenErrorCode {
        match self {
            OAuthError::InvalidRequest(_) => TokenErrorCode::InvalidRequest,
            OAuthError::InvalidClient(_) => TokenErrorCode::InvalidClient,
            OAuthError::AccessDenied(_) => TokenErrorCode::AccessDenied,
            OAuthError::NotAuthenticated(_) => TokenErrorCode::UnauthorizedClient,
            OAuthError::TokenIssuance(_) => TokenErrorCode::TemporarilyUnavailable,
            OAuthError::Internal(_) => TokenErrorCode::ServerError,
        }
    }

    fn description(&self) -> &str {
        match self {
            OAuthError::InvalidRequest(msg)
            | OAuthError::InvalidClient(msg)
            | OAuthError::AccessDenied(msg)
            | OAuthError::NotAuthenticated(msg)
            | OAuthError::TokenIssuance(msg)
            | OAuthError::Internal(msg) => msg,
        }
    }
}

impl From<tokend_auth::SignerError> for OAuthError {
    fn from(err: tokend_auth::SignerError) -> Self {
        use tokend_auth::SignerError;
        match err {
            SignerError::NotAuthenticated(msg) => OAuthError::NotAuthenticated(msg),
            SignerError::PermissionDenied(msg) => OAuthError::AccessDenied(msg),
            other => OAuthError::TokenIssuance(other.to_string()),
        }
    }
}

impl IntoResponse for OAuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = TokenError {
            error: self.error_code(),
            error_description: Some(self.description().to_string()),
        };
        (status, Json(body)).into_response()
    }
}

/// RFC 6749 error codes this service emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TokenErrorCode {
    InvalidRequest,
    InvalidClient,
    UnauthorizedClient,
    AccessDenied,
    ServerError,
    TemporarilyUnavailable,
}

/// RFC 6749 error response body.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TokenError {
    pub error: TokenErrorCode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_description: Option<String>,
}
