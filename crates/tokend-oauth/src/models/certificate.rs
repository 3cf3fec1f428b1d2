//! Client certificate attributes reported by the TLS terminator.

use chrono::{DateTime, FixedOffset};

/// Attributes of a verified client certificate.
///
/// Every field is optional: the load balancer only forwards the attributes
/// the certificate actually carries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientCertificateAttributes {
    /// SPIFFE identity from the URI SAN, if the certificate carries one.
    pub spiffe_id: Option<String>,
    /// Comma-separated DNS SANs.
    pub dns_sans: Option<String>,
    /// Comma-separated URI SANs.
    pub uri_sans: Option<String>,
    /// Base64 SHA-256 fingerprint of the leaf certificate.
    pub fingerprint: Option<String>,
    /// Serial number of the leaf certificate.
    pub serial_number: Option<String>,
    pub not_before: Option<DateTime<FixedOffset>>,
    pub not_after: Option<DateTime<FixedOffset>>,
}

impl ClientCertificateAttributes {
    /// True when no attribute was reported at all.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}
