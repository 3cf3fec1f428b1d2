//! OAuth2 token service core.
//!
//! Machine clients obtain short-lived RS256 ID tokens through the
//! `client_credentials` grant, with client verification done either directly
//! or from mTLS results reported by an external load balancer. Issued ID
//! tokens can additionally be exchanged for federated access tokens through a
//! workload identity pool, optionally impersonating a service account.

pub mod client;
pub mod error;
pub mod federation;
pub mod flows;
pub mod handlers;
pub mod issuer;
pub mod models;
pub mod mtls;
pub mod router;

pub use error::{OAuthError, TokenError, TokenErrorCode};
pub use router::{oauth_router, well_known_router, OAuthState};
