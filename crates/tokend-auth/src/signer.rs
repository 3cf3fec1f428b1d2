//! JWT signing backends.
//!
//! Signing is a seam: the issuer hands a finished claim set to a
//! [`JwtSigner`] and gets back a compact JWT. Two backends exist, a
//! local RS256 key pair and a Google-managed service-account key
//! reached through the IAM-credentials `signJwt` API.

use crate::claims::TokenClaims;
use crate::error::SignerError;
use async_trait::async_trait;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::Deserialize;
use serde_json::json;

/// Default endpoint of the IAM-credentials API.
pub const IAM_CREDENTIALS_ENDPOINT: &str = "https://iamcredentials.googleapis.com";

/// A backend that signs claim sets and publishes the key material
/// needed to verify its signatures.
#[async_trait]
pub trait JwtSigner: Send + Sync {
    /// Sign the claim set, returning a compact JWT.
    async fn sign(&self, claims: &TokenClaims) -> Result<String, SignerError>;

    /// Public URL of the JWKS document that verifies tokens from this
    /// signer.
    fn jwks_url(&self) -> String;
}

/// Signer backed by a locally held RS256 key pair.
///
/// The key ID is carried in the token header so verifiers can select
/// the right key from the JWKS.
pub struct LocalKeySigner {
    encoding_key: EncodingKey,
    kid: String,
    jwks_url: String,
}

impl std::fmt::Debug for LocalKeySigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalKeySigner")
            .field("kid", &self.kid)
            .field("jwks_url", &self.jwks_url)
            .finish_non_exhaustive()
    }
}

impl LocalKeySigner {
    /// Create a signer from a PEM-encoded RSA private key.
    pub fn from_rsa_pem(
        private_key_pem: &[u8],
        kid: impl Into<String>,
        jwks_url: impl Into<String>,
    ) -> Result<Self, SignerError> {
        let encoding_key = EncodingKey::from_rsa_pem(private_key_pem)
            .map_err(|e| SignerError::InvalidKey(format!("Invalid private key: {e}")))?;

        Ok(Self {
            encoding_key,
            kid: kid.into(),
            jwks_url: jwks_url.into(),
        })
    }

    /// The key ID advertised in token headers.
    #[must_use]
    pub fn kid(&self) -> &str {
        &self.kid
    }
}

#[async_trait]
impl JwtSigner for LocalKeySigner {
    async fn sign(&self, claims: &TokenClaims) -> Result<String, SignerError> {
        let mut header = Header::new(Algorithm::RS256);
        header.kid = Some(self.kid.clone());

        encode(&header, claims, &self.encoding_key)
            .map_err(|e| SignerError::Encoding(format!("Encoding failed: {e}")))
    }

    fn jwks_url(&self) -> String {
        self.jwks_url.clone()
    }
}

/// Response shape of the IAM-credentials `signJwt` call.
#[derive(Debug, Deserialize)]
struct SignJwtResponse {
    #[serde(rename = "signedJwt")]
    signed_jwt: String,
}

/// Error body returned by Google APIs.
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// Signer that delegates to a service account's Google-managed key pair
/// via the IAM-credentials `signJwt` API.
///
/// Verification keys for the account are published by Google, so the
/// JWKS URL points there rather than at this service.
pub struct ServiceAccountSigner {
    http: reqwest::Client,
    endpoint: String,
    service_account: String,
    bearer_token: String,
}

impl ServiceAccountSigner {
    /// Create a signer for the given service-account email.
    ///
    /// `bearer_token` is the credential this service uses to call the
    /// IAM-credentials API; obtaining it is the deployment's concern.
    pub fn new(
        http: reqwest::Client,
        service_account: impl Into<String>,
        bearer_token: impl Into<String>,
    ) -> Self {
        Self {
            http,
            endpoint: IAM_CREDENTIALS_ENDPOINT.to_string(),
            service_account: service_account.into(),
            bearer_token: bearer_token.into(),
        }
    }

    /// Override the API endpoint. Intended for tests.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// The service-account email whose key signs tokens.
    #[must_use]
    pub fn service_account(&self) -> &str {
        &self.service_account
    }

    async fn read_error_message(response: reqwest::Response) -> String {
        match response.json::<ApiErrorBody>().await {
            Ok(body) => body.error.message,
            Err(_) => "no error details".to_string(),
        }
    }
}

#[async_trait]
impl JwtSigner for ServiceAccountSigner {
    async fn sign(&self, claims: &TokenClaims) -> Result<String, SignerError> {
        let payload = serde_json::to_string(claims)
            .map_err(|e| SignerError::Encoding(format!("Serializing claims failed: {e}")))?;

        let url = format!(
            "{}/v1/projects/-/serviceAccounts/{}:signJwt",
            self.endpoint, self.service_account
        );

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.bearer_token)
            .json(&json!({ "payload": payload }))
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            let body: SignJwtResponse = response.json().await?;
            return Ok(body.signed_jwt);
        }

        let message = Self::read_error_message(response).await;
        tracing::warn!(%status, service_account = %self.service_account, "signJwt call failed");
        match status.as_u16() {
            401 => Err(SignerError::NotAuthenticated(message)),
            403 => Err(SignerError::PermissionDenied(message)),
            _ => Err(SignerError::Backend(format!("{status}: {message}"))),
        }
    }

    fn jwks_url(&self) -> String {
        format!(
            "https://www.googleapis.com/service_accounts/v1/metadata/jwk/{}",
            self.service_account
        )
    }
}
