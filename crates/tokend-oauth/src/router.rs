//! Shared state and routers for the token service.

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tokend_auth::JwkSet;

use crate::flows::FlowDispatcher;
use crate::handlers;
use crate::issuer::IdTokenIssuer;

/// State shared by every handler.
#[derive(Clone)]
pub struct OAuthState {
    pub issuer: Arc<IdTokenIssuer>,
    pub dispatcher: Arc<FlowDispatcher>,
    /// Keys served at `/.well-known/jwks.json`. Empty when signing is
    /// delegated to an upstream API that hosts its own keys.
    pub jwks: Arc<JwkSet>,
}

impl OAuthState {
    pub fn new(issuer: Arc<IdTokenIssuer>, dispatcher: Arc<FlowDispatcher>, jwks: JwkSet) -> Self {
        Self {
            issuer,
            dispatcher,
            jwks: Arc::new(jwks),
        }
    }
}

/// Token endpoint and root redirect.
pub fn oauth_router(state: OAuthState) -> Router {
    Router::new()
        .route("/", get(handlers::discovery::root))
        .route("/token", post(handlers::token::token))
        .with_state(state)
}

/// Discovery endpoints, to be nested under `/.well-known`.
pub fn well_known_router(state: OAuthState) -> Router {
    Router::new()
        .route(
            "/openid-configuration",
            get(handlers::discovery::openid_configuration),
        )
        .route("/jwks.json", get(handlers::discovery::jwks))
        .with_state(state)
}
