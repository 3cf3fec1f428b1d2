//! ID token construction and signing.

use std::sync::Arc;

use chrono::{TimeDelta, Utc};
use serde_json::{Map, Value};
use tokend_auth::{JwtSigner, TokenClaimsBuilder};
use url::Url;

use crate::error::OAuthError;
use crate::models::IdToken;

/// Static configuration of the token issuer.
#[derive(Debug, Clone)]
pub struct IssuerOptions {
    /// Public URL this issuer is reachable at. Claims use the URL with any
    /// trailing slash stripped.
    pub id: Url,
    /// Fixed `aud` claim; when unset, each token's audience is the client id.
    pub token_audience: Option<String>,
    pub token_validity: TimeDelta,
    /// Leeway subtracted from `iat` to form `nbf`, absorbing clock skew
    /// between this service and token consumers.
    pub clock_skew_leeway: TimeDelta,
}

/// Issues RS256-signed ID tokens through a [`JwtSigner`].
pub struct IdTokenIssuer {
    options: IssuerOptions,
    signer: Arc<dyn JwtSigner>,
}

impl IdTokenIssuer {
    pub fn new(options: IssuerOptions, signer: Arc<dyn JwtSigner>) -> Self {
        Self { options, signer }
    }

    pub fn id(&self) -> &Url {
        &self.options.id
    }

    /// The `iss` claim value: the issuer URL without a trailing slash.
    pub fn issuer_id(&self) -> String {
        self.options.id.as_str().trim_end_matches('/').to_string()
    }

    /// Where consumers find the keys that verify this issuer's signatures.
    pub fn jwks_url(&self) -> String {
        self.signer.jwks_url()
    }

    pub fn token_validity(&self) -> TimeDelta {
        self.options.token_validity
    }

    /// Audience for a token issued to `client_id`.
    pub fn token_audience<'a>(&'a self, client_id: &'a str) -> &'a str {
        self.options.token_audience.as_deref().unwrap_or(client_id)
    }

    /// Signs an ID token for `audience` carrying `extra_claims`.
    ///
    /// The registered claims are always set by the issuer; same-named entries
    /// in `extra_claims` are discarded, never honored.
    pub async fn issue(
        &self,
        audience: &str,
        extra_claims: Map<String, Value>,
    ) -> Result<IdToken, OAuthError> {
        let issue_time = Utc::now();
        let expiry_time = issue_time + self.options.token_validity;
        let claims = TokenClaimsBuilder::default()
            .claims(extra_claims)
            .issuer(self.issuer_id())
            .audience(audience)
            .issued_at(issue_time)
            .not_before(issue_time - self.options.clock_skew_leeway)
            .expires_at(expiry_time)
            .build();
        let value = self.signer.sign(&claims).await?;
        Ok(IdToken {
            value,
            issue_time,
            expiry_time,
        })
    }
}
