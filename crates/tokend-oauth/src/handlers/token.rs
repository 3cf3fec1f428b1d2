//! Token endpoint handler.

use axum::extract::{RawForm, State};
use axum::http::HeaderMap;
use axum::Json;

use crate::error::{OAuthError, TokenError};
use crate::models::{TokenRequest, TokenResponse};
use crate::router::OAuthState;

/// OAuth2 token endpoint (`client_credentials` grant).
#[utoipa::path(
    post,
    path = "/token",
    responses(
        (status = 200, description = "Token issued", body = TokenResponse),
        (status = 400, description = "Malformed request", body = TokenError),
        (status = 401, description = "Upstream credentials missing", body = TokenError),
        (status = 403, description = "Client refused", body = TokenError),
        (status = 502, description = "Upstream issuance failure", body = TokenError),
    ),
    tag = "OAuth2"
)]
pub async fn token(
    State(state): State<OAuthState>,
    headers: HeaderMap,
    RawForm(body): RawForm,
) -> Result<Json<TokenResponse>, OAuthError> {
    let request = TokenRequest::from_form(&body, headers)?;
    let flow = state.dispatcher.select(&request).ok_or_else(|| {
        OAuthError::InvalidRequest(format!(
            "No authentication flow is applicable for grant type '{}'",
            request.grant_type()
        ))
    })?;
    tracing::debug!(flow = flow.name(), "dispatching token request");
    let response = flow.authenticate(&request).await.map_err(|err| {
        tracing::warn!(flow = flow.name(), %err, "token request failed");
        err
    })?;
    Ok(Json(response))
}
