//! OIDC discovery, JWKS and root redirect handlers.

use axum::extract::State;
use axum::response::Redirect;
use axum::Json;
use tokend_auth::JwkSet;

use crate::models::ProviderMetadata;
use crate::router::OAuthState;

/// OpenID Connect discovery document.
#[utoipa::path(
    get,
    path = "/.well-known/openid-configuration",
    tag = "discovery",
    responses(
        (status = 200, description = "Provider metadata", body = ProviderMetadata),
    )
)]
pub async fn openid_configuration(State(state): State<OAuthState>) -> Json<ProviderMetadata> {
    let issuer = state.issuer.issuer_id();
    Json(ProviderMetadata::new(
        &issuer,
        state.issuer.jwks_url(),
        state.dispatcher.grant_types(),
        state.dispatcher.authentication_methods(),
    ))
}

/// Signing keys for locally issued tokens.
#[utoipa::path(
    get,
    path = "/.well-known/jwks.json",
    tag = "discovery",
    responses(
        (status = 200, description = "JSON Web Key Set"),
    )
)]
pub async fn jwks(State(state): State<OAuthState>) -> Json<JwkSet> {
    Json(state.jwks.as_ref().clone())
}

/// Convenience redirect from the service root to the discovery document.
pub async fn root() -> Redirect {
    Redirect::temporary("/.well-known/openid-configuration")
}
