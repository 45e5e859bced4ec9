//! # Loopback Transport Implementation
//!
//! In-process connector transport for testing and development scenarios
//! where the consent manager and the participant connectors it calls live in
//! a single process. Connector behavior is scripted per endpoint, so tests
//! can exercise every remote outcome the orchestrator has to interpret
//! (acknowledgment, explicit rejection, unreachability, latency) without
//! a network.
//!
//! Every call is also recorded per endpoint, which lets tests assert on what
//! was actually delivered (token values, data references, revocation
//! notices).

use std::{future::Future, pin::Pin, sync::Arc, task::Poll, time::Duration};

use dashmap::DashMap;
use tower::Service;

use crate::consent::{
    api::{C2pRequest, C2pResponse},
    error::ConsentError,
};

/// Scripted behavior of one loopback connector endpoint.
#[derive(Debug, Clone)]
pub enum ConnectorBehavior {
    /// Acknowledge every call
    Accept,
    /// Reject every call with the given reason
    Reject(String),
    /// Fail as if the endpoint could not be contacted
    Unreachable,
    /// Acknowledge after the given delay in milliseconds
    Delay(u64),
}

/// Loopback transport routing connector calls to scripted behaviors.
///
/// Endpoints that were never registered behave as unreachable, matching a
/// connector that is down or unknown.
#[derive(Clone, Default)]
pub struct C2pLoopback {
    /// Scripted behavior per endpoint
    connectors: Arc<DashMap<String, ConnectorBehavior>>,
    /// Calls delivered per endpoint, in arrival order
    received: Arc<DashMap<String, Vec<C2pRequest>>>,
}

impl C2pLoopback {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers or replaces the scripted behavior of an endpoint.
    pub fn register_connector(&self, endpoint: impl Into<String>, behavior: ConnectorBehavior) {
        self.connectors.insert(endpoint.into(), behavior);
    }

    /// Calls delivered to the endpoint so far, in arrival order.
    pub fn received(&self, endpoint: &str) -> Vec<C2pRequest> {
        self.received.get(endpoint).map(|calls| calls.value().clone()).unwrap_or_default()
    }
}

impl Service<C2pRequest> for C2pLoopback {
    type Response = C2pResponse;
    type Error = ConsentError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _: &mut std::task::Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: C2pRequest) -> Self::Future {
        let this = self.clone();
        Box::pin(async move {
            let endpoint = request.endpoint().to_string();
            this.received.entry(endpoint.clone()).or_default().push(request);

            let behavior = this
                .connectors
                .get(&endpoint)
                .map(|entry| entry.value().clone())
                .unwrap_or(ConnectorBehavior::Unreachable);
            match behavior {
                ConnectorBehavior::Accept => Ok(C2pResponse::Ack),
                ConnectorBehavior::Reject(reason) => Err(ConsentError::ExchangeRejected(reason)),
                ConnectorBehavior::Unreachable => {
                    Err(ConsentError::ConnectorUnreachable(endpoint))
                }
                ConnectorBehavior::Delay(ms) => {
                    tokio::time::sleep(Duration::from_millis(ms)).await;
                    Ok(C2pResponse::Ack)
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unregistered_endpoint_is_unreachable() {
        let mut loopback = C2pLoopback::new();
        let request = C2pRequest::RevocationNotice {
            endpoint: "http://nowhere/connector".to_string(),
            consent_id: "consent-1".to_string(),
        };
        assert_eq!(
            loopback.call(request).await.unwrap_err(),
            ConsentError::ConnectorUnreachable("http://nowhere/connector".to_string())
        );
    }

    #[tokio::test]
    async fn test_calls_are_recorded_per_endpoint() {
        let mut loopback = C2pLoopback::new();
        loopback.register_connector("http://consumer/connector", ConnectorBehavior::Accept);
        let request = C2pRequest::RevocationNotice {
            endpoint: "http://consumer/connector".to_string(),
            consent_id: "consent-1".to_string(),
        };
        loopback.call(request.clone()).await.unwrap();
        assert_eq!(loopback.received("http://consumer/connector"), vec![request]);
    }
}
