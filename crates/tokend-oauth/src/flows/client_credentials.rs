//! The client-credentials authentication flow.

use std::sync::Arc;

use serde_json::{Map, Value};

use crate::client::{AuthenticatedClient, ClientPolicy};
use crate::error::OAuthError;
use crate::federation::TokenExchange;
use crate::issuer::IdTokenIssuer;
use crate::models::{
    AccessToken, ClientCertificateAttributes, IdToken, TokenRequest, TokenResponse,
    CLIENT_CREDENTIALS_GRANT_TYPE,
};
use crate::mtls::{certificate_presented, verify_client_certificate, MtlsHeaderNames};

/// Scope requested when the caller names a provider without asking for a
/// specific scope.
pub const DEFAULT_EXCHANGE_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";

/// How a flow establishes who the calling client is.
#[derive(Debug, Clone)]
pub enum ClientVerification {
    /// Trust the asserted `client_id` without transport-level proof. Only
    /// suitable behind a perimeter that authenticates callers by other means.
    Direct,
    /// Require a client certificate verified by an external load balancer and
    /// reported through trusted headers.
    XlbMtls(MtlsHeaderNames),
}

impl ClientVerification {
    pub fn flow_name(&self) -> &'static str {
        match self {
            ClientVerification::Direct => "client-credentials",
            ClientVerification::XlbMtls(_) => "xlb-mtls-client-credentials",
        }
    }

    /// Value advertised in `token_endpoint_auth_methods_supported`.
    pub fn authentication_method(&self) -> &'static str {
        match self {
            ClientVerification::Direct => "none",
            ClientVerification::XlbMtls(_) => "tls_client_auth",
        }
    }
}

/// Issues ID tokens (and optionally federated access tokens) to machine
/// clients presenting the `client_credentials` grant.
pub struct ClientCredentialsFlow {
    verification: ClientVerification,
    policy: Arc<dyn ClientPolicy>,
    issuer: Arc<IdTokenIssuer>,
    exchange: Arc<dyn TokenExchange>,
}

impl ClientCredentialsFlow {
    pub fn new(
        verification: ClientVerification,
        policy: Arc<dyn ClientPolicy>,
        issuer: Arc<IdTokenIssuer>,
        exchange: Arc<dyn TokenExchange>,
    ) -> Self {
        Self {
            verification,
            policy,
            issuer,
            exchange,
        }
    }

    pub fn name(&self) -> &'static str {
        self.verification.flow_name()
    }

    pub fn grant_type(&self) -> &'static str {
        CLIENT_CREDENTIALS_GRANT_TYPE
    }

    pub fn authentication_method(&self) -> &'static str {
        self.verification.authentication_method()
    }

    /// Cheap applicability check used by the dispatcher. Must not mutate
    /// anything or call out.
    pub fn can_authenticate(&self, request: &TokenRequest) -> bool {
        if request.non_blank_parameter("client_id").is_none() {
            tracing::warn!(flow = self.name(), "token request carries no client_id");
            return false;
        }
        match &self.verification {
            ClientVerification::Direct => true,
            ClientVerification::XlbMtls(names) => {
                if certificate_presented(request, names) {
                    true
                } else {
                    tracing::warn!(
                        flow = self.name(),
                        header = %names.cert_present,
                        "no client certificate reported; verify that mTLS is enabled on the load balancer"
                    );
                    false
                }
            }
        }
    }

    /// Runs the full flow for an applicable request.
    pub async fn authenticate(&self, request: &TokenRequest) -> Result<TokenResponse, OAuthError> {
        let client = self.verify_client(request).await.map_err(|err| match err {
            err @ OAuthError::AccessDenied(_) => err,
            err => OAuthError::InvalidClient(format!(
                "The client or its credentials are invalid: {err}"
            )),
        })?;
        tracing::info!(flow = self.name(), client_id = %client.client_id, "client authenticated");

        let id_token = self.issue_id_token(&client).await.map_err(|err| match err {
            OAuthError::TokenIssuance(msg) => OAuthError::TokenIssuance(format!(
                "Issuing an ID token for client '{}' failed: {msg}",
                client.client_id
            )),
            err => err,
        })?;

        match self.issue_access_token(request, &client, &id_token).await? {
            Some(access_token) => Ok(TokenResponse::with_access_token(&id_token, &access_token)),
            None => Ok(TokenResponse::with_id_token(&id_token)),
        }
    }

    async fn verify_client(
        &self,
        request: &TokenRequest,
    ) -> Result<AuthenticatedClient, OAuthError> {
        let client_id = request
            .non_blank_parameter("client_id")
            .ok_or_else(|| OAuthError::InvalidRequest("A client_id is required".to_string()))?;
        let attributes = match &self.verification {
            ClientVerification::Direct => ClientCertificateAttributes::default(),
            ClientVerification::XlbMtls(names) => verify_client_certificate(request, names)?,
        };
        self.policy.authenticate_client(client_id, &attributes).await
    }

    async fn issue_id_token(&self, client: &AuthenticatedClient) -> Result<IdToken, OAuthError> {
        let mut claims = Map::new();
        claims.insert("amr".to_string(), Value::String(self.name().to_string()));
        claims.insert(
            "auth_time".to_string(),
            Value::from(client.authentication_time.timestamp()),
        );
        claims.insert(
            "client_id".to_string(),
            Value::String(client.client_id.clone()),
        );
        if !client.additional_claims.is_empty() {
            let nested: Map<String, Value> = client
                .additional_claims
                .iter()
                .map(|(name, value)| (name.clone(), Value::String(value.clone())))
                .collect();
            claims.insert("client".to_string(), Value::Object(nested));
        }
        let audience = self.issuer.token_audience(&client.client_id);
        self.issuer.issue(audience, claims).await
    }

    /// Exchanges the ID token when the request asks for an access token via
    /// `scope` or `provider`, impersonating a target service account when one
    /// is named.
    async fn issue_access_token(
        &self,
        request: &TokenRequest,
        client: &AuthenticatedClient,
        id_token: &IdToken,
    ) -> Result<Option<AccessToken>, OAuthError> {
        let scope = request.non_blank_parameter("scope");
        let provider = request.non_blank_parameter("provider");
        let scope = match (scope, provider) {
            (Some(scope), _) => scope.to_string(),
            (None, Some(_)) => DEFAULT_EXCHANGE_SCOPE.to_string(),
            (None, None) => return Ok(None),
        };

        tracing::info!(
            flow = self.name(),
            client_id = %client.client_id,
            scope = %scope,
            "exchanging ID token for an access token"
        );
        let federated = self.exchange.exchange(id_token, &scope).await?;

        let target = request
            .non_blank_parameter("impersonate_service_account")
            .or_else(|| request.non_blank_parameter("service_account"))
            .filter(|value| value.contains('@'));
        let Some(service_account) = target else {
            return Ok(Some(federated));
        };

        tracing::info!(
            flow = self.name(),
            client_id = %client.client_id,
            service_account,
            "impersonating service account"
        );
        let scopes: Vec<String> = scope.split_whitespace().map(str::to_string).collect();
        let token = self
            .exchange
            .impersonate(&federated, service_account, &scopes, id_token.remaining_validity())
            .await?;
        Ok(Some(token))
    }
}
