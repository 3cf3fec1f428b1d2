//! Request, response and certificate models for the token service.

mod certificate;
mod discovery;
mod token;

pub use certificate::ClientCertificateAttributes;
pub use discovery::ProviderMetadata;
pub use token::{
    AccessToken, IdToken, TokenRequest, TokenResponse, CLIENT_CREDENTIALS_GRANT_TYPE,
};
