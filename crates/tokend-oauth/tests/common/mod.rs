//! Shared fixtures for the token service integration tests.

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, Response, StatusCode};
use axum::Router;
use chrono::{TimeDelta, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde_json::{Map, Value};
use tokend_auth::test_keys::{TEST_PRIVATE_KEY, TEST_PUBLIC_KEY};
use tokend_auth::{jwk_from_rsa_pem, JwkSet, LocalKeySigner};
use tower::ServiceExt;
use url::Url;

use tokend_oauth::client::{AuthenticatedClient, CertificateClaimsPolicy, ClientPolicy};
use tokend_oauth::federation::TokenExchange;
use tokend_oauth::flows::{ClientCredentialsFlow, ClientVerification, FlowDispatcher};
use tokend_oauth::issuer::{IdTokenIssuer, IssuerOptions};
use tokend_oauth::models::{AccessToken, ClientCertificateAttributes, IdToken};
use tokend_oauth::{oauth_router, well_known_router, OAuthError, OAuthState};

pub const ISSUER_URL: &str = "https://tokens.example.com";
pub const JWKS_URL: &str = "https://tokens.example.com/.well-known/jwks.json";

/// Admits clients from a fixed allow-list, attaching certificate claims the
/// same way the default policy does.
pub struct AllowListPolicy {
    allowed: Vec<String>,
}

impl AllowListPolicy {
    pub fn new(allowed: &[&str]) -> Self {
        Self {
            allowed: allowed.iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[async_trait]
impl ClientPolicy for AllowListPolicy {
    async fn authenticate_client(
        &self,
        client_id: &str,
        attributes: &ClientCertificateAttributes,
    ) -> Result<AuthenticatedClient, OAuthError> {
        if !self.allowed.iter().any(|id| id == client_id) {
            return Err(OAuthError::AccessDenied(format!(
                "client '{client_id}' is not allowed"
            )));
        }
        CertificateClaimsPolicy
            .authenticate_client(client_id, attributes)
            .await
    }
}

/// Fake exchange backend returning deterministic tokens.
pub struct StubTokenExchange;

#[async_trait]
impl TokenExchange for StubTokenExchange {
    async fn exchange(&self, _id_token: &IdToken, scope: &str) -> Result<AccessToken, OAuthError> {
        let now = Utc::now();
        Ok(AccessToken {
            value: "federated-access-token".to_string(),
            scope: scope.to_string(),
            issue_time: now,
            expiry_time: now + TimeDelta::minutes(60),
        })
    }

    async fn impersonate(
        &self,
        _federated_token: &AccessToken,
        service_account: &str,
        scopes: &[String],
        lifetime: TimeDelta,
    ) -> Result<AccessToken, OAuthError> {
        let now = Utc::now();
        Ok(AccessToken {
            value: format!("impersonated:{service_account}"),
            scope: scopes.join(" "),
            issue_time: now,
            expiry_time: now + lifetime,
        })
    }
}

pub fn test_state(verifications: Vec<ClientVerification>, allowed: &[&str]) -> OAuthState {
    let signer = LocalKeySigner::from_rsa_pem(
        TEST_PRIVATE_KEY,
        "test-key",
        JWKS_URL.to_string(),
    )
    .unwrap();
    let issuer = Arc::new(IdTokenIssuer::new(
        IssuerOptions {
            id: Url::parse(ISSUER_URL).unwrap(),
            token_audience: None,
            token_validity: TimeDelta::minutes(5),
            clock_skew_leeway: TimeDelta::zero(),
        },
        Arc::new(signer),
    ));
    let policy = Arc::new(AllowListPolicy::new(allowed));
    let exchange = Arc::new(StubTokenExchange);
    let flows = verifications
        .into_iter()
        .map(|verification| {
            ClientCredentialsFlow::new(
                verification,
                policy.clone(),
                issuer.clone(),
                exchange.clone(),
            )
        })
        .collect();
    let jwks =
        JwkSet::new().add_key(jwk_from_rsa_pem(TEST_PUBLIC_KEY, "test-key").unwrap());
    OAuthState::new(issuer, Arc::new(FlowDispatcher::new(flows)), jwks)
}

pub fn app(state: OAuthState) -> Router {
    Router::new()
        .merge(oauth_router(state.clone()))
        .nest("/.well-known", well_known_router(state))
}

/// POSTs a form to `/token` with the given extra headers.
#[allow(dead_code)]
pub async fn post_token(
    app: Router,
    body: &str,
    headers: &[(&str, &str)],
) -> Response<Body> {
    let mut request = Request::builder()
        .method("POST")
        .uri("/token")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    for (name, value) in headers {
        request = request.header(*name, *value);
    }
    app.oneshot(request.body(Body::from(body.to_string())).unwrap())
        .await
        .unwrap()
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[allow(dead_code)]
pub async fn expect_error(response: Response<Body>, status: StatusCode, code: &str) {
    assert_eq!(response.status(), status);
    let body = body_json(response).await;
    assert_eq!(body["error"], code);
}

/// Decodes and verifies an issued ID token against the test public key.
#[allow(dead_code)]
pub fn decode_id_token(token: &str, audience: &str) -> Map<String, Value> {
    let key = DecodingKey::from_rsa_pem(TEST_PUBLIC_KEY).unwrap();
    let mut validation = Validation::new(Algorithm::RS256);
    validation.set_audience(&[audience]);
    validation.set_issuer(&[ISSUER_URL]);
    jsonwebtoken::decode::<Map<String, Value>>(token, &key, &validation)
        .unwrap()
        .claims
}
