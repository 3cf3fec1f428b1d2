//! Federated token exchange against a workload identity pool.
//!
//! ID tokens minted by this service are exchanged for short-lived federated
//! access tokens via the STS `token` endpoint (RFC 8693), optionally followed
//! by service-account impersonation through the IAM credentials API.

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use serde::Deserialize;

use crate::error::OAuthError;
use crate::models::{AccessToken, IdToken};

pub const TOKEN_EXCHANGE_GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:token-exchange";
pub const ACCESS_TOKEN_TYPE: &str = "urn:ietf:params:oauth:token-type:access_token";
pub const ID_TOKEN_TYPE: &str = "urn:ietf:params:oauth:token-type:id_token";

pub const STS_ENDPOINT: &str = "https://sts.googleapis.com";
pub use tokend_auth::IAM_CREDENTIALS_ENDPOINT;

/// Exchanges ID tokens for access tokens.
#[async_trait]
pub trait TokenExchange: Send + Sync {
    /// Trades `id_token` for a federated access token with `scope`.
    async fn exchange(&self, id_token: &IdToken, scope: &str) -> Result<AccessToken, OAuthError>;

    /// Impersonates `service_account` using a previously exchanged federated
    /// token, requesting `scopes` for at most `lifetime`.
    async fn impersonate(
        &self,
        federated_token: &AccessToken,
        service_account: &str,
        scopes: &[String],
        lifetime: TimeDelta,
    ) -> Result<AccessToken, OAuthError>;
}

/// Identifies the workload identity pool provider trusting this issuer.
#[derive(Debug, Clone)]
pub struct PoolOptions {
    pub project_number: u64,
    pub pool_id: String,
    pub provider_id: String,
}

impl PoolOptions {
    /// The STS audience naming the pool provider.
    pub fn audience(&self) -> String {
        format!(
            "//iam.googleapis.com/projects/{}/locations/global/workloadIdentityPools/{}/providers/{}",
            self.project_number, self.pool_id, self.provider_id
        )
    }
}

/// [`TokenExchange`] backed by the hosted STS and IAM credentials APIs.
pub struct WorkloadIdentityPool {
    http: reqwest::Client,
    options: PoolOptions,
    sts_endpoint: String,
    iam_endpoint: String,
}

#[derive(Debug, Deserialize)]
struct StsTokenResponse {
    access_token: String,
    expires_in: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImpersonationResponse {
    access_token: String,
    expire_time: DateTime<Utc>,
}

impl WorkloadIdentityPool {
    pub fn new(http: reqwest::Client, options: PoolOptions) -> Self {
        Self {
            http,
            options,
            sts_endpoint: STS_ENDPOINT.to_string(),
            iam_endpoint: IAM_CREDENTIALS_ENDPOINT.to_string(),
        }
    }

    /// Overrides the upstream endpoints, for tests.
    #[must_use]
    pub fn with_endpoints(
        mut self,
        sts_endpoint: impl Into<String>,
        iam_endpoint: impl Into<String>,
    ) -> Self {
        self.sts_endpoint = sts_endpoint.into();
        self.iam_endpoint = iam_endpoint.into();
        self
    }
}

#[async_trait]
impl TokenExchange for WorkloadIdentityPool {
    async fn exchange(&self, id_token: &IdToken, scope: &str) -> Result<AccessToken, OAuthError> {
        let audience = self.options.audience();
        tracing::debug!(%audience, scope, "exchanging ID token at the STS endpoint");
        let issue_time = Utc::now();
        let response = self
            .http
            .post(format!("{}/v1/token", self.sts_endpoint))
            .form(&[
                ("grant_type", TOKEN_EXCHANGE_GRANT_TYPE),
                ("audience", audience.as_str()),
                ("scope", scope),
                ("requested_token_type", ACCESS_TOKEN_TYPE),
                ("subject_token", id_token.value.as_str()),
                ("subject_token_type", ID_TOKEN_TYPE),
            ])
            .send()
            .await
            .map_err(|err| OAuthError::TokenIssuance(format!("STS request failed: {err}")))?;

        let response = check_status(response, "token exchange").await?;
        let body: StsTokenResponse = response
            .json()
            .await
            .map_err(|err| OAuthError::TokenIssuance(format!("malformed STS response: {err}")))?;
        let validity = TimeDelta::seconds(body.expires_in.unwrap_or(0));
        Ok(AccessToken {
            value: body.access_token,
            scope: scope.to_string(),
            issue_time,
            expiry_time: issue_time + validity,
        })
    }

    async fn impersonate(
        &self,
        federated_token: &AccessToken,
        service_account: &str,
        scopes: &[String],
        lifetime: TimeDelta,
    ) -> Result<AccessToken, OAuthError> {
        tracing::debug!(service_account, "impersonating service account");
        let issue_time = Utc::now();
        let lifetime_secs = lifetime.num_seconds().max(0);
        let response = self
            .http
            .post(format!(
                "{}/v1/projects/-/serviceAccounts/{}:generateAccessToken",
                self.iam_endpoint, service_account
            ))
            .bearer_auth(&federated_token.value)
            .json(&serde_json::json!({
                "scope": scopes,
                "lifetime": format!("{lifetime_secs}s"),
            }))
            .send()
            .await
            .map_err(|err| {
                OAuthError::TokenIssuance(format!("impersonation request failed: {err}"))
            })?;

        let response = check_status(response, "impersonation").await?;
        let body: ImpersonationResponse = response.json().await.map_err(|err| {
            OAuthError::TokenIssuance(format!("malformed impersonation response: {err}"))
        })?;
        Ok(AccessToken {
            value: body.access_token,
            scope: scopes.join(" "),
            issue_time,
            expiry_time: body.expire_time,
        })
    }
}

/// Maps upstream HTTP failures onto the service error taxonomy.
async fn check_status(
    response: reqwest::Response,
    operation: &str,
) -> Result<reqwest::Response, OAuthError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let detail = response.text().await.unwrap_or_default();
    tracing::warn!(%status, operation, detail, "upstream call rejected");
    let message = format!("{operation} rejected upstream ({status})");
    Err(match status.as_u16() {
        400 => OAuthError::InvalidRequest(message),
        401 => OAuthError::NotAuthenticated(message),
        403 => OAuthError::AccessDenied(message),
        _ => OAuthError::TokenIssuance(message),
    })
}
