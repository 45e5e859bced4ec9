use std::{future::Future, pin::Pin, task::Poll};

use tower::Service;

use crate::consent::{
    api::{C2pRequest, C2pResponse},
    error::ConsentError,
};

/// Connector transport that acknowledges every call without delivering
/// anything. For tests that do not exercise the exchange path.
#[derive(Clone, Default)]
pub struct C2pNop;

impl Service<C2pRequest> for C2pNop {
    type Response = C2pResponse;
    type Error = ConsentError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _: &mut std::task::Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, _request: C2pRequest) -> Self::Future {
        Box::pin(async move { Ok(C2pResponse::Ack) })
    }
}
