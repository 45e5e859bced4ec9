//! Participant-to-Consentry (P2C) API service implementation.
//!
//! This service handles requests from provider and consumer participants:
//! drafting participant-initiated records, consulting the consents of their
//! users, issuing and verifying exchange tokens, resuming interrupted
//! exchanges after an interactive confirmation step, and discovering the
//! exchange offers available to them.
//!
//! Token verification is exposed here precisely so a remote participant can
//! self-check a token before attempting delivery, without this side having
//! to make a synchronous network call first.

use std::{future::Future, pin::Pin, task::Poll};

use tower::Service;
#[cfg(feature = "consentry_tracing")]
use tracing::info;

use crate::consent::{
    api::types::{
        ExchangeRequest, ExchangeResponse, LifecycleRequest, LifecycleResponse, NoticeRequest,
        NoticeResponse, P2cRequest, P2cResponse, TokenRequest, TokenResponse,
    },
    error::ConsentError,
};

/// P2C (Participant-to-Consentry) API Service
///
/// Coordinates the lifecycle, token, exchange and notice services to serve
/// participant requests.
#[derive(Debug, Clone)]
pub struct P2cApiService<L, T, E, N> {
    /// Consent state machine
    lifecycle: L,
    /// Exchange token issuance and verification
    token: T,
    /// Cross-participant exchange orchestrator
    exchange: E,
    /// Privacy notice resolver
    notice: N,
}

impl<L, T, E, N> P2cApiService<L, T, E, N> {
    /// Creates a new P2C API service with the provided lifecycle, token,
    /// exchange and notice services
    pub fn new(lifecycle: L, token: T, exchange: E, notice: N) -> Self {
        Self { lifecycle, token, exchange, notice }
    }
}

impl<L, T, E, N> Service<P2cRequest> for P2cApiService<L, T, E, N>
where
    L: Service<LifecycleRequest, Response = LifecycleResponse, Error = ConsentError>
        + Clone
        + Send
        + 'static,
    L::Future: Send,
    T: Service<TokenRequest, Response = TokenResponse, Error = ConsentError>
        + Clone
        + Send
        + 'static,
    T::Future: Send,
    E: Service<ExchangeRequest, Response = ExchangeResponse, Error = ConsentError>
        + Clone
        + Send
        + 'static,
    E::Future: Send,
    N: Service<NoticeRequest, Response = NoticeResponse, Error = ConsentError>
        + Clone
        + Send
        + 'static,
    N::Future: Send,
{
    type Response = P2cResponse;
    type Error = ConsentError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _: &mut std::task::Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: P2cRequest) -> Self::Future {
        let mut lifecycle = self.lifecycle.clone();
        let mut token = self.token.clone();
        let mut exchange = self.exchange.clone();
        let mut notice = self.notice.clone();
        Box::pin(async move {
            match request {
                P2cRequest::DraftConsent(intent) => {
                    #[cfg(feature = "consentry_tracing")]
                    info!(
                        "[p2c] DraftConsent: provider: {}, consumer: {}",
                        intent.data_provider, intent.data_consumer
                    );
                    match lifecycle.call(LifecycleRequest::Draft(intent)).await? {
                        LifecycleResponse::Record(record) => Ok(P2cResponse::Record(record)),
                        _ => Err(ConsentError::InternalConsentryError),
                    }
                }
                P2cRequest::GetConsent(id) => {
                    match lifecycle.call(LifecycleRequest::Get(id)).await? {
                        LifecycleResponse::Record(record) => Ok(P2cResponse::Record(record)),
                        _ => Err(ConsentError::InternalConsentryError),
                    }
                }
                P2cRequest::ListConsentsForUser(user) => {
                    match lifecycle.call(LifecycleRequest::ListByUser(user)).await? {
                        LifecycleResponse::Records(records) => Ok(P2cResponse::Records(records)),
                        _ => Err(ConsentError::InternalConsentryError),
                    }
                }
                P2cRequest::ListConsentsForPair { provider, consumer } => {
                    match lifecycle.call(LifecycleRequest::ListByPair { provider, consumer }).await?
                    {
                        LifecycleResponse::Records(records) => Ok(P2cResponse::Records(records)),
                        _ => Err(ConsentError::InternalConsentryError),
                    }
                }
                P2cRequest::IssueToken(id) => {
                    #[cfg(feature = "consentry_tracing")]
                    info!("[p2c] IssueToken: id: {}", id);
                    match token.call(TokenRequest::Issue(id)).await? {
                        TokenResponse::Issued(issued) => Ok(P2cResponse::Token(issued)),
                        _ => Err(ConsentError::InternalConsentryError),
                    }
                }
                P2cRequest::VerifyToken { id, token: presented } => {
                    #[cfg(feature = "consentry_tracing")]
                    info!("[p2c] VerifyToken: id: {}", id);
                    match token.call(TokenRequest::Verify { id, token: presented }).await? {
                        TokenResponse::Verified(valid) => Ok(P2cResponse::Verified(valid)),
                        _ => Err(ConsentError::InternalConsentryError),
                    }
                }
                P2cRequest::Resume(id) => {
                    #[cfg(feature = "consentry_tracing")]
                    info!("[p2c] Resume: id: {}", id);
                    match exchange.call(ExchangeRequest::Resume(id)).await? {
                        ExchangeResponse::Fulfilled => Ok(P2cResponse::ExchangeFulfilled),
                        _ => Err(ConsentError::InternalConsentryError),
                    }
                }
                P2cRequest::AvailableExchanges(participant) => {
                    match notice.call(NoticeRequest::ListForParticipant(participant)).await? {
                        NoticeResponse::Notices(notices) => Ok(P2cResponse::Notices(notices)),
                        _ => Err(ConsentError::InternalConsentryError),
                    }
                }
            }
        })
    }
}
