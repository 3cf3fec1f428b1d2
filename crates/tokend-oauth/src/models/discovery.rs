//! OpenID Connect discovery document model.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// OpenID Provider metadata served at `/.well-known/openid-configuration`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProviderMetadata {
    pub issuer: String,
    /// This provider has no interactive authorization; the token endpoint is
    /// advertised so the field is never dangling.
    pub authorization_endpoint: String,
    pub token_endpoint: String,
    pub jwks_uri: String,
    pub response_types_supported: Vec<String>,
    pub grant_types_supported: Vec<String>,
    pub subject_types_supported: Vec<String>,
    pub id_token_signing_alg_values_supported: Vec<String>,
    pub token_endpoint_auth_methods_supported: Vec<String>,
}

impl ProviderMetadata {
    pub fn new(
        issuer: &str,
        jwks_uri: String,
        grant_types: Vec<String>,
        auth_methods: Vec<String>,
    ) -> Self {
        let token_endpoint = format!("{issuer}/token");
        Self {
            issuer: issuer.to_string(),
            authorization_endpoint: token_endpoint.clone(),
            token_endpoint,
            jwks_uri,
            response_types_supported: vec!["none".to_string()],
            grant_types_supported: grant_types,
            subject_types_supported: vec!["pairwise".to_string()],
            id_token_signing_alg_values_supported: vec!["RS256".to_string()],
            token_endpoint_auth_methods_supported: auth_methods,
        }
    }
}
