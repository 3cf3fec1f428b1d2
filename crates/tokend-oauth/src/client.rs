//! Client identity and the policy seam that admits clients.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::OAuthError;
use crate::models::ClientCertificateAttributes;

/// A client that passed verification and policy.
#[derive(Debug, Clone)]
pub struct AuthenticatedClient {
    pub client_id: String,
    pub authentication_time: DateTime<Utc>,
    /// Client-specific claims the policy wants embedded in the ID token.
    pub additional_claims: BTreeMap<String, String>,
}

impl AuthenticatedClient {
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            authentication_time: Utc::now(),
            additional_claims: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_claim(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.additional_claims.insert(name.into(), value.into());
        self
    }
}

/// Decides whether a verified client may obtain tokens, and which extra
/// claims its tokens carry.
#[async_trait]
pub trait ClientPolicy: Send + Sync {
    /// Admits or rejects a client. Rejections should be
    /// [`OAuthError::AccessDenied`].
    async fn authenticate_client(
        &self,
        client_id: &str,
        attributes: &ClientCertificateAttributes,
    ) -> Result<AuthenticatedClient, OAuthError>;
}

/// Default policy: admit every verified client and reflect its certificate
/// attributes as `x5_*` claims.
#[derive(Debug, Clone, Copy, Default)]
pub struct CertificateClaimsPolicy;

#[async_trait]
impl ClientPolicy for CertificateClaimsPolicy {
    async fn authenticate_client(
        &self,
        client_id: &str,
        attributes: &ClientCertificateAttributes,
    ) -> Result<AuthenticatedClient, OAuthError> {
        let mut client = AuthenticatedClient::new(client_id);
        let claims = [
            ("x5_spiffe", attributes.spiffe_id.as_deref()),
            ("x5_dnssan", attributes.dns_sans.as_deref()),
            ("x5_urisan", attributes.uri_sans.as_deref()),
            ("x5_sha256", attributes.fingerprint.as_deref()),
            ("x5_serial", attributes.serial_number.as_deref()),
        ];
        for (name, value) in claims {
            if let Some(value) = value {
                client = client.with_claim(name, value);
            }
        }
        Ok(client)
    }
}
