//! JSON Web Key Set construction.
//!
//! Builds the JWKS document served alongside the discovery endpoint so
//! third parties can verify locally signed tokens.

use crate::error::SignerError;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use pkcs8::DecodePublicKey;
use rsa::traits::PublicKeyParts;
use rsa::RsaPublicKey;
use serde::{Deserialize, Serialize};

/// A single RSA signing key in JWK form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Jwk {
    /// Key type, always "RSA".
    pub kty: String,
    /// Key ID matching the `kid` token header.
    pub kid: String,
    /// Key use, always "sig".
    #[serde(rename = "use")]
    pub key_use: String,
    /// Algorithm, always "RS256".
    pub alg: String,
    /// Base64url-encoded modulus.
    pub n: String,
    /// Base64url-encoded exponent.
    pub e: String,
}

/// A JWK set as served from `/.well-known/jwks.json`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JwkSet {
    /// The keys in this set.
    pub keys: Vec<Jwk>,
}

impl JwkSet {
    /// Create an empty key set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a key to the set.
    #[must_use]
    pub fn add_key(mut self, key: Jwk) -> Self {
        self.keys.push(key);
        self
    }

    /// Find a key by its kid.
    #[must_use]
    pub fn find(&self, kid: &str) -> Option<&Jwk> {
        self.keys.iter().find(|k| k.kid == kid)
    }
}

/// Build a JWK from a PEM-encoded RSA public key.
pub fn jwk_from_rsa_pem(pem_data: &[u8], kid: &str) -> Result<Jwk, SignerError> {
    let pem_str = std::str::from_utf8(pem_data)
        .map_err(|e| SignerError::InvalidKey(format!("Invalid PEM encoding: {e}")))?;

    let public_key = RsaPublicKey::from_public_key_pem(pem_str)
        .map_err(|e| SignerError::InvalidKey(format!("Failed to parse RSA public key: {e}")))?;

    let n = URL_SAFE_NO_PAD.encode(public_key.n().to_bytes_be());
    let e = URL_SAFE_NO_PAD.encode(public_key.e().to_bytes_be());

    Ok(Jwk {
        kty: "RSA".to_string(),
        kid: kid.to_string(),
        key_use: "sig".to_string(),
        alg: "RS256".to_string(),
        n,
        e,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_keys::TEST_PUBLIC_KEY;

    #[test]
    fn test_jwk_from_valid_public_key() {
        let jwk = jwk_from_rsa_pem(TEST_PUBLIC_KEY, "key-1").unwrap();

        assert_eq!(jwk.kty, "RSA");
        assert_eq!(jwk.kid, "key-1");
        assert_eq!(jwk.key_use, "sig");
        assert_eq!(jwk.alg, "RS256");
        assert!(!jwk.n.is_empty());
        // 65537 = AQAB in base64url
        assert_eq!(jwk.e, "AQAB");
    }

    #[test]
    fn test_jwk_from_invalid_pem_fails() {
        let result = jwk_from_rsa_pem(b"garbage", "key-1");
        assert!(matches!(result.unwrap_err(), SignerError::InvalidKey(_)));
    }

    #[test]
    fn test_jwk_set_find() {
        let jwk = jwk_from_rsa_pem(TEST_PUBLIC_KEY, "key-1").unwrap();
        let set = JwkSet::new().add_key(jwk);

        assert!(set.find("key-1").is_some());
        assert!(set.find("other").is_none());
    }

    #[test]
    fn test_jwk_set_serialization() {
        let jwk = jwk_from_rsa_pem(TEST_PUBLIC_KEY, "key-1").unwrap();
        let set = JwkSet::new().add_key(jwk);

        let json = serde_json::to_value(&set).unwrap();
        assert_eq!(json["keys"][0]["use"], "sig");
        assert_eq!(json["keys"][0]["kid"], "key-1");
    }
}
