//! Authentication flows and their dispatcher.

mod client_credentials;
mod dispatcher;

pub use client_credentials::{ClientCredentialsFlow, ClientVerification, DEFAULT_EXCHANGE_SCOPE};
pub use dispatcher::FlowDispatcher;
