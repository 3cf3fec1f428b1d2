//! JWT signing primitives for tokend.
//!
//! This crate provides:
//! - the [`TokenClaims`] claim-set model (RFC 7519 registered claims plus
//!   a flattened extra-claims map)
//! - the [`JwtSigner`] seam with a local RS256 backend and a
//!   service-account backend (IAM-credentials `signJwt`)
//! - JWKS construction from RSA public keys
//!
//! # Example
//!
//! ```rust,ignore
//! use tokend_auth::{JwtSigner, LocalKeySigner, TokenClaims};
//!
//! let signer = LocalKeySigner::from_rsa_pem(private_key_pem, "key-1", jwks_url)?;
//! let claims = TokenClaims::builder()
//!     .issuer("https://tokend.example.com")
//!     .audience("client-1")
//!     .claim("client_id", "client-1")
//!     .build();
//! let jwt = signer.sign(&claims).await?;
//! ```

mod claims;
mod error;
mod jwks;
mod signer;

#[cfg(any(test, feature = "test-keys"))]
pub mod test_keys;

pub use claims::{TokenClaims, TokenClaimsBuilder, REGISTERED_CLAIMS};
pub use error::SignerError;
pub use jwks::{jwk_from_rsa_pem, Jwk, JwkSet};
pub use signer::{
    JwtSigner, LocalKeySigner, ServiceAccountSigner, IAM_CREDENTIALS_ENDPOINT,
};
