//! Token endpoint request and response models.

use std::collections::HashMap;

use axum::http::HeaderMap;
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::OAuthError;

/// Grant type for the OAuth2 client-credentials grant (RFC 6749 §4.4).
pub const CLIENT_CREDENTIALS_GRANT_TYPE: &str = "client_credentials";

/// A parsed `POST /token` request.
///
/// Form parameters are multi-valued; whenever a single value is needed, the
/// first one wins and the rest are ignored. Unknown parameters are kept but
/// never interpreted.
#[derive(Debug, Clone)]
pub struct TokenRequest {
    grant_type: String,
    parameters: HashMap<String, Vec<String>>,
    headers: HeaderMap,
}

impl TokenRequest {
    pub fn new(
        grant_type: impl Into<String>,
        parameters: HashMap<String, Vec<String>>,
        headers: HeaderMap,
    ) -> Self {
        Self {
            grant_type: grant_type.into(),
            parameters,
            headers,
        }
    }

    /// Parses a `application/x-www-form-urlencoded` body.
    ///
    /// A missing or empty `grant_type` is rejected before any flow runs.
    pub fn from_form(body: &[u8], headers: HeaderMap) -> Result<Self, OAuthError> {
        let mut parameters: HashMap<String, Vec<String>> = HashMap::new();
        for (name, value) in url::form_urlencoded::parse(body) {
            parameters
                .entry(name.into_owned())
                .or_default()
                .push(value.into_owned());
        }
        let grant_type = parameters
            .get("grant_type")
            .and_then(|values| values.first())
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .ok_or_else(|| OAuthError::InvalidRequest("A grant type is required".to_string()))?;
        Ok(Self {
            grant_type,
            parameters,
            headers,
        })
    }

    pub fn grant_type(&self) -> &str {
        &self.grant_type
    }

    /// First value of a form parameter, if any.
    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.parameters
            .get(name)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// First value of a form parameter, treating blank values as absent.
    pub fn non_blank_parameter(&self, name: &str) -> Option<&str> {
        self.parameter(name)
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }

    /// A request header as UTF-8 text, if present and decodable.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }
}

/// A signed ID token together with its validity window.
#[derive(Debug, Clone)]
pub struct IdToken {
    pub value: String,
    pub issue_time: DateTime<Utc>,
    pub expiry_time: DateTime<Utc>,
}

impl IdToken {
    /// Validity left on the token as of now. Never negative.
    pub fn remaining_validity(&self) -> TimeDelta {
        (self.expiry_time - Utc::now()).max(TimeDelta::zero())
    }
}

/// An access token obtained through federated token exchange.
#[derive(Debug, Clone)]
pub struct AccessToken {
    pub value: String,
    pub scope: String,
    pub issue_time: DateTime<Utc>,
    pub expiry_time: DateTime<Utc>,
}

/// Successful token endpoint response (RFC 6749 §5.1).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TokenResponse {
    pub id_token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    pub token_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

impl TokenResponse {
    /// Response carrying only an ID token. `expires_in` and `scope` relate
    /// to the access token, so both stay absent here.
    pub fn with_id_token(id_token: &IdToken) -> Self {
        Self {
            id_token: id_token.value.clone(),
            access_token: None,
            token_type: "Bearer".to_string(),
            expires_in: None,
            scope: None,
        }
    }

    pub fn with_access_token(id_token: &IdToken, access_token: &AccessToken) -> Self {
        Self {
            id_token: id_token.value.clone(),
            access_token: Some(access_token.value.clone()),
            token_type: "Bearer".to_string(),
            expires_in: Some((access_token.expiry_time - access_token.issue_time).num_seconds()),
            scope: Some(access_token.scope.clone()),
        }
    }
}
