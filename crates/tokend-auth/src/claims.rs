//! JWT claim-set model.
//!
//! Tokens issued here assert a machine client's identity, not a user's,
//! so there is no `sub` claim. The registered claims follow RFC 7519
//! section 4; everything else travels in the flattened extra map.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Claim names reserved for the issuer. Caller-supplied claims under
/// these keys are discarded before signing.
pub const REGISTERED_CLAIMS: [&str; 6] = ["iss", "aud", "iat", "nbf", "exp", "jti"];

/// A complete claim set ready for signing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Principal that issued the token.
    pub iss: String,
    /// Recipient the token is intended for.
    pub aud: String,
    /// Issue time (seconds since epoch).
    pub iat: i64,
    /// Time before which the token must not be accepted.
    pub nbf: i64,
    /// Expiration time (seconds since epoch).
    pub exp: i64,
    /// Unique token identifier.
    pub jti: String,
    /// All non-registered claims.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TokenClaims {
    /// Start building a claim set.
    #[must_use]
    pub fn builder() -> TokenClaimsBuilder {
        TokenClaimsBuilder::default()
    }

    /// Look up a non-registered claim by name.
    #[must_use]
    pub fn extra(&self, name: &str) -> Option<&Value> {
        self.extra.get(name)
    }
}

/// Builder for [`TokenClaims`].
///
/// Extra claims are merged first; the registered claims set through the
/// builder always win on key collision.
#[derive(Debug, Default)]
pub struct TokenClaimsBuilder {
    iss: Option<String>,
    aud: Option<String>,
    issued_at: Option<DateTime<Utc>>,
    not_before: Option<DateTime<Utc>>,
    expires_at: Option<DateTime<Utc>>,
    jti: Option<String>,
    extra: Map<String, Value>,
}

impl TokenClaimsBuilder {
    /// Set the issuer.
    #[must_use]
    pub fn issuer(mut self, iss: impl Into<String>) -> Self {
        self.iss = Some(iss.into());
        self
    }

    /// Set the audience.
    #[must_use]
    pub fn audience(mut self, aud: impl Into<String>) -> Self {
        self.aud = Some(aud.into());
        self
    }

    /// Set the issue time.
    #[must_use]
    pub fn issued_at(mut self, at: DateTime<Utc>) -> Self {
        self.issued_at = Some(at);
        self
    }

    /// Set the not-before time.
    #[must_use]
    pub fn not_before(mut self, at: DateTime<Utc>) -> Self {
        self.not_before = Some(at);
        self
    }

    /// Set the expiration time.
    #[must_use]
    pub fn expires_at(mut self, at: DateTime<Utc>) -> Self {
        self.expires_at = Some(at);
        self
    }

    /// Set an explicit token id; a v4 UUID is generated otherwise.
    #[must_use]
    pub fn token_id(mut self, jti: impl Into<String>) -> Self {
        self.jti = Some(jti.into());
        self
    }

    /// Add a single extra claim.
    #[must_use]
    pub fn claim(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(name.into(), value.into());
        self
    }

    /// Merge a map of extra claims. Keys colliding with registered
    /// claim names are dropped.
    #[must_use]
    pub fn claims(mut self, claims: Map<String, Value>) -> Self {
        self.extra.extend(claims);
        self
    }

    /// Finalize the claim set.
    ///
    /// Missing timestamps default to "now" with a zero-length validity,
    /// which callers are expected to override; the issuer component
    /// always sets them.
    #[must_use]
    pub fn build(mut self) -> TokenClaims {
        let now = Utc::now();
        let issued_at = self.issued_at.unwrap_or(now);

        for name in REGISTERED_CLAIMS {
            self.extra.remove(name);
        }

        TokenClaims {
            iss: self.iss.unwrap_or_default(),
            aud: self.aud.unwrap_or_default(),
            iat: issued_at.timestamp(),
            nbf: self.not_before.unwrap_or(issued_at).timestamp(),
            exp: self.expires_at.unwrap_or(issued_at).timestamp(),
            jti: self.jti.unwrap_or_else(|| Uuid::new_v4().to_string()),
            extra: self.extra,
        }
    }
}
