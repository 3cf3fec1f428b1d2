//! Flow selection for incoming token requests.

use crate::flows::ClientCredentialsFlow;
use crate::models::TokenRequest;

/// Holds the enabled flows in configuration order and routes each request to
/// the first applicable one.
///
/// Selection is deterministic: it depends only on the registration order, the
/// request's grant type, and each flow's `can_authenticate` answer.
pub struct FlowDispatcher {
    flows: Vec<ClientCredentialsFlow>,
}

impl FlowDispatcher {
    pub fn new(flows: Vec<ClientCredentialsFlow>) -> Self {
        Self { flows }
    }

    pub fn flows(&self) -> &[ClientCredentialsFlow] {
        &self.flows
    }

    /// The first enabled flow that handles the request's grant type and
    /// considers the request applicable.
    pub fn select(&self, request: &TokenRequest) -> Option<&ClientCredentialsFlow> {
        self.flows
            .iter()
            .filter(|flow| flow.grant_type() == request.grant_type())
            .find(|flow| flow.can_authenticate(request))
    }

    /// Distinct grant types across the enabled flows, in registration order.
    pub fn grant_types(&self) -> Vec<String> {
        let mut grant_types = Vec::new();
        for flow in &self.flows {
            if !grant_types.iter().any(|g| g == flow.grant_type()) {
                grant_types.push(flow.grant_type().to_string());
            }
        }
        grant_types
    }

    /// Distinct client authentication methods across the enabled flows.
    pub fn authentication_methods(&self) -> Vec<String> {
        let mut methods = Vec::new();
        for flow in &self.flows {
            if !methods.iter().any(|m| m == flow.authentication_method()) {
                methods.push(flow.authentication_method().to_string());
            }
        }
        methods
    }
}
