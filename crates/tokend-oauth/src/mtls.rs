//! mTLS client verification from load-balancer headers.
//!
//! TLS is terminated by an external load balancer that validates the client
//! certificate chain and reports the outcome in request headers. This module
//! trusts those headers verbatim; the deployment MUST guarantee that clients
//! cannot reach the service except through the load balancer, and that the
//! load balancer strips any client-supplied copy of these headers. Nothing
//! here can verify that precondition.

use chrono::DateTime;

use crate::error::OAuthError;
use crate::models::{ClientCertificateAttributes, TokenRequest};

/// Header names the load balancer uses to report certificate verification.
#[derive(Debug, Clone)]
pub struct MtlsHeaderNames {
    pub cert_present: String,
    pub chain_verified: String,
    pub error: String,
    pub spiffe_id: String,
    pub dns_sans: String,
    pub uri_sans: String,
    pub fingerprint: String,
    pub serial_number: String,
    pub not_before: String,
    pub not_after: String,
}

impl Default for MtlsHeaderNames {
    fn default() -> Self {
        Self {
            cert_present: "X-Client-Cert-Present".to_string(),
            chain_verified: "X-Client-Cert-Chain-Verified".to_string(),
            error: "X-Client-Cert-Error".to_string(),
            spiffe_id: "X-Client-Cert-Spiffe".to_string(),
            dns_sans: "X-Client-Cert-DNSName-SANs".to_string(),
            uri_sans: "X-Client-Cert-URI-SANs".to_string(),
            fingerprint: "X-Client-Cert-Hash".to_string(),
            serial_number: "X-Client-Cert-Serial-Number".to_string(),
            not_before: "X-Client-Cert-Valid-Not-Before".to_string(),
            not_after: "X-Client-Cert-Valid-Not-After".to_string(),
        }
    }
}

fn is_true(value: Option<&str>) -> bool {
    value.is_some_and(|v| v.eq_ignore_ascii_case("true"))
}

/// Whether the load balancer saw a client certificate at all.
pub fn certificate_presented(request: &TokenRequest, names: &MtlsHeaderNames) -> bool {
    is_true(request.header(&names.cert_present))
}

/// Extracts the verified certificate attributes from the request headers.
///
/// Fails with [`OAuthError::AccessDenied`] when no certificate was presented
/// or its chain did not verify. Attribute values are taken verbatim; a
/// malformed validity timestamp is logged and treated as absent rather than
/// failing the request.
pub fn verify_client_certificate(
    request: &TokenRequest,
    names: &MtlsHeaderNames,
) -> Result<ClientCertificateAttributes, OAuthError> {
    if !certificate_presented(request, names) {
        return Err(OAuthError::AccessDenied(
            "The request did not include a client certificate".to_string(),
        ));
    }
    if !is_true(request.header(&names.chain_verified)) {
        tracing::error!(
            error = request.header(&names.error).unwrap_or("unknown"),
            fingerprint = request.header(&names.fingerprint).unwrap_or(""),
            "client certificate chain did not verify"
        );
        return Err(OAuthError::AccessDenied(
            "The client certificate did not pass verification".to_string(),
        ));
    }
    Ok(ClientCertificateAttributes {
        spiffe_id: header_value(request, &names.spiffe_id),
        dns_sans: header_value(request, &names.dns_sans),
        uri_sans: header_value(request, &names.uri_sans),
        fingerprint: header_value(request, &names.fingerprint),
        serial_number: header_value(request, &names.serial_number),
        not_before: timestamp_value(request, &names.not_before),
        not_after: timestamp_value(request, &names.not_after),
    })
}

fn header_value(request: &TokenRequest, name: &str) -> Option<String> {
    request.header(name).map(str::to_string)
}

fn timestamp_value(request: &TokenRequest, name: &str) -> Option<DateTime<chrono::FixedOffset>> {
    let raw = request.header(name)?;
    match DateTime::parse_from_rfc3339(raw) {
        Ok(ts) => Some(ts),
        Err(err) => {
            tracing::warn!(header = name, value = raw, %err, "ignoring malformed certificate timestamp");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderMap;
    use std::collections::HashMap;

    fn request_with_headers(pairs: &[(&str, &str)]) -> TokenRequest {
        let mut headers = HeaderMap::new();
        for (name, value) in pairs {
            headers.insert(
                axum::http::HeaderName::try_from(*name).unwrap(),
                value.parse().unwrap(),
            );
        }
        TokenRequest::new("client_credentials", HashMap::new(), headers)
    }

    #[test]
    fn presence_check_is_case_insensitive() {
        let names = MtlsHeaderNames::default();
        let req = request_with_headers(&[("X-Client-Cert-Present", "TRUE")]);
        assert!(certificate_presented(&req, &names));
        let req = request_with_headers(&[("X-Client-Cert-Present", "1")]);
        assert!(!certificate_presented(&req, &names));
        let req = request_with_headers(&[]);
        assert!(!certificate_presented(&req, &names));
    }

    #[test]
    fn missing_certificate_is_denied() {
        let names = MtlsHeaderNames::default();
        let err = verify_client_certificate(&request_with_headers(&[]), &names).unwrap_err();
        assert!(matches!(err, OAuthError::AccessDenied(_)));
    }

    #[test]
    fn unverified_chain_is_denied() {
        let names = MtlsHeaderNames::default();
        let req = request_with_headers(&[
            ("X-Client-Cert-Present", "true"),
            ("X-Client-Cert-Chain-Verified", "false"),
            ("X-Client-Cert-Error", "unknown issuer"),
        ]);
        let err = verify_client_certificate(&req, &names).unwrap_err();
        assert!(matches!(err, OAuthError::AccessDenied(_)));
    }

    #[test]
    fn verified_certificate_yields_attributes() {
        let names = MtlsHeaderNames::default();
        let req = request_with_headers(&[
            ("X-Client-Cert-Present", "true"),
            ("X-Client-Cert-Chain-Verified", "true"),
            ("X-Client-Cert-Spiffe", "spiffe://prod/payments"),
            ("X-Client-Cert-Hash", "Zm9v"),
            ("X-Client-Cert-Valid-Not-After", "2027-01-01T00:00:00Z"),
        ]);
        let attrs = verify_client_certificate(&req, &names).unwrap();
        assert_eq!(attrs.spiffe_id.as_deref(), Some("spiffe://prod/payments"));
        assert_eq!(attrs.fingerprint.as_deref(), Some("Zm9v"));
        assert!(attrs.not_after.is_some());
        assert!(attrs.not_before.is_none());
    }

    #[test]
    fn malformed_timestamp_is_ignored() {
        let names = MtlsHeaderNames::default();
        let req = request_with_headers(&[
            ("X-Client-Cert-Present", "true"),
            ("X-Client-Cert-Chain-Verified", "true"),
            ("X-Client-Cert-Valid-Not-Before", "yesterday"),
        ]);
        let attrs = verify_client_certificate(&req, &names).unwrap();
        assert!(attrs.not_before.is_none());
    }
}
