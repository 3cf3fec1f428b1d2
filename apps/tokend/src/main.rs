//! OAuth2 token service for machine clients.
//!
//! Issues short-lived RS256 ID tokens through the `client_credentials` grant,
//! verifying clients from mTLS results an external load balancer reports in
//! request headers. Issued tokens can be exchanged for federated access
//! tokens through a workload identity pool.

mod config;
mod logging;

use std::sync::Arc;

use async_trait::async_trait;
use axum::routing::get;
use axum::{Json, Router};
use chrono::TimeDelta;
use config::{Config, PoolConfig, SignerConfig};
use tokend_auth::{jwk_from_rsa_pem, JwkSet, JwtSigner, LocalKeySigner, ServiceAccountSigner};
use tokend_oauth::client::CertificateClaimsPolicy;
use tokend_oauth::federation::{PoolOptions, TokenExchange, WorkloadIdentityPool};
use tokend_oauth::flows::{ClientCredentialsFlow, ClientVerification, FlowDispatcher};
use tokend_oauth::issuer::{IdTokenIssuer, IssuerOptions};
use tokend_oauth::models::{AccessToken, IdToken};
use tokend_oauth::{oauth_router, well_known_router, OAuthError, OAuthState};
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing::info;

#[tokio::main]
async fn main() {
    // Load configuration (fail-fast on missing required values)
    dotenvy::dotenv().ok();
    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    logging::init_logging(&config.rust_log);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        host = %config.host,
        port = config.port,
        issuer = %config.issuer_url,
        flows = ?config.auth_flows,
        "Starting tokend"
    );

    let http = match reqwest::Client::builder()
        .timeout(config.upstream_timeout)
        .build()
    {
        Ok(client) => client,
        Err(e) => {
            eprintln!("Failed to build HTTP client: {e}");
            std::process::exit(1);
        }
    };

    let issuer_id = config.issuer_url.as_str().trim_end_matches('/').to_string();
    let (signer, jwks): (Arc<dyn JwtSigner>, JwkSet) = match &config.signer {
        SignerConfig::Local {
            private_key_pem,
            public_key_pem,
            key_id,
        } => {
            let jwks_url = format!("{issuer_id}/.well-known/jwks.json");
            let signer = match LocalKeySigner::from_rsa_pem(
                private_key_pem.as_bytes(),
                key_id,
                jwks_url,
            ) {
                Ok(signer) => signer,
                Err(e) => {
                    eprintln!("Failed to load JWT_PRIVATE_KEY: {e}");
                    std::process::exit(1);
                }
            };
            let jwks = match jwk_from_rsa_pem(public_key_pem.as_bytes(), key_id) {
                Ok(jwk) => JwkSet::new().add_key(jwk),
                Err(e) => {
                    eprintln!("Failed to load JWT_PUBLIC_KEY: {e}");
                    std::process::exit(1);
                }
            };
            (Arc::new(signer), jwks)
        }
        SignerConfig::ServiceAccount {
            email,
            bearer_token,
        } => {
            let signer = ServiceAccountSigner::new(http.clone(), email, bearer_token);
            // Keys live upstream; this service publishes an empty set.
            (Arc::new(signer), JwkSet::new())
        }
    };

    let issuer = Arc::new(IdTokenIssuer::new(
        IssuerOptions {
            id: config.issuer_url.clone(),
            token_audience: config.token_audience.clone(),
            token_validity: duration(config.token_validity, "TOKEN_VALIDITY_MINS"),
            clock_skew_leeway: duration(config.clock_skew_leeway, "TOKEN_CLOCK_SKEW_SECS"),
        },
        signer,
    ));

    let exchange: Arc<dyn TokenExchange> = match &config.pool {
        Some(PoolConfig {
            project_number,
            pool_id,
            provider_id,
        }) => Arc::new(WorkloadIdentityPool::new(
            http,
            PoolOptions {
                project_number: *project_number,
                pool_id: pool_id.clone(),
                provider_id: provider_id.clone(),
            },
        )),
        None => Arc::new(FederationDisabled),
    };

    let policy = Arc::new(CertificateClaimsPolicy);
    let mut flows = Vec::new();
    for name in &config.auth_flows {
        let verification = match name.as_str() {
            "client-credentials" => ClientVerification::Direct,
            "xlb-mtls-client-credentials" => {
                ClientVerification::XlbMtls(config.mtls_headers.clone())
            }
            other => {
                eprintln!("Unknown flow in AUTH_FLOWS: '{other}'");
                std::process::exit(1);
            }
        };
        flows.push(ClientCredentialsFlow::new(
            verification,
            policy.clone(),
            issuer.clone(),
            exchange.clone(),
        ));
    }

    let state = OAuthState::new(issuer, Arc::new(FlowDispatcher::new(flows)), jwks);
    let app = Router::new()
        .merge(oauth_router(state.clone()))
        .nest("/.well-known", well_known_router(state))
        .route("/healthz", get(healthz))
        .layer(TraceLayer::new_for_http());

    let addr = format!("{}:{}", config.host, config.port);
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            eprintln!("Failed to bind {addr}: {e}");
            std::process::exit(1);
        }
    };
    info!(%addr, "Listening");

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        eprintln!("Server error: {e}");
        std::process::exit(1);
    }
    info!("Server shutdown complete");
}

/// Liveness probe.
async fn healthz() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

fn duration(value: std::time::Duration, var: &str) -> TimeDelta {
    match TimeDelta::from_std(value) {
        Ok(delta) => delta,
        Err(e) => {
            eprintln!("Invalid {var}: {e}");
            std::process::exit(1);
        }
    }
}

/// Stands in for the token-exchange backend when no workload identity pool is
/// configured. Requests that only need an ID token are unaffected.
struct FederationDisabled;

#[async_trait]
impl TokenExchange for FederationDisabled {
    async fn exchange(&self, _id_token: &IdToken, _scope: &str) -> Result<AccessToken, OAuthError> {
        Err(OAuthError::InvalidRequest(
            "Federated token exchange is not configured".to_string(),
        ))
    }

    async fn impersonate(
        &self,
        _federated_token: &AccessToken,
        _service_account: &str,
        _scopes: &[String],
        _lifetime: TimeDelta,
    ) -> Result<AccessToken, OAuthError> {
        Err(OAuthError::InvalidRequest(
            "Federated token exchange is not configured".to_string(),
        ))
    }
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => {}
            Err(e) => {
                tracing::error!("Failed to install Ctrl+C handler: {e}");
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
