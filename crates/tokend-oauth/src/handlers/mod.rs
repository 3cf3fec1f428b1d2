//! HTTP handlers for the token service.

pub mod discovery;
pub mod token;
