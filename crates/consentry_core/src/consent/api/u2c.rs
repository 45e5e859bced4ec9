//! User-to-Consentry (U2C) API service implementation.
//!
//! This service handles consent requests from the data subject: the
//! lifecycle actions (give, refuse, revoke, re-confirm, terminate), consent
//! and privacy-notice consultation, and the data-exchange trigger for a
//! granted consent. It is a thin router over the lifecycle, exchange and
//! notice services; all invariants live in those services.

use std::{future::Future, pin::Pin, task::Poll};

use tower::Service;
#[cfg(feature = "consentry_tracing")]
use tracing::info;

use crate::consent::{
    api::types::{
        ExchangeRequest, ExchangeResponse, LifecycleRequest, LifecycleResponse, NoticeRequest,
        NoticeResponse, U2cRequest, U2cResponse,
    },
    error::ConsentError,
};

/// U2C (User-to-Consentry) API Service
///
/// Coordinates the lifecycle, exchange and notice services to serve data
/// subject requests. A successful revocation additionally dispatches a
/// best-effort revocation notice to the counter-participant without blocking
/// the transition.
#[derive(Debug, Clone)]
pub struct U2cApiService<L, E, N> {
    /// Consent state machine
    lifecycle: L,
    /// Cross-participant exchange orchestrator
    exchange: E,
    /// Privacy notice resolver
    notice: N,
}

impl<L, E, N> U2cApiService<L, E, N> {
    /// Creates a new U2C API service with the provided lifecycle, exchange
    /// and notice services
    pub fn new(lifecycle: L, exchange: E, notice: N) -> Self {
        Self { lifecycle, exchange, notice }
    }
}

impl<L, E, N> Service<U2cRequest> for U2cApiService<L, E, N>
where
    L: Service<LifecycleRequest, Response = LifecycleResponse, Error = ConsentError>
        + Clone
        + Send
        + 'static,
    L::Future: Send,
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
    type Response = U2cResponse;
    type Error = ConsentError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _: &mut std::task::Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: U2cRequest) -> Self::Future {
        let mut lifecycle = self.lifecycle.clone();
        let mut exchange = self.exchange.clone();
        let mut notice = self.notice.clone();
        Box::pin(async move {
            match request {
                U2cRequest::GiveConsent(intent) => {
                    #[cfg(feature = "consentry_tracing")]
                    info!(
                        "[u2c] GiveConsent: provider: {}, consumer: {}",
                        intent.data_provider, intent.data_consumer
                    );
                    match lifecycle.call(LifecycleRequest::Give(intent)).await? {
                        LifecycleResponse::Record(record) => Ok(U2cResponse::Record(record)),
                        _ => Err(ConsentError::InternalConsentryError),
                    }
                }
                U2cRequest::GrantDraft(id) => {
                    #[cfg(feature = "consentry_tracing")]
                    info!("[u2c] GrantDraft: id: {}", id);
                    match lifecycle.call(LifecycleRequest::Grant(id)).await? {
                        LifecycleResponse::Record(record) => Ok(U2cResponse::Record(record)),
                        _ => Err(ConsentError::InternalConsentryError),
                    }
                }
                U2cRequest::RefuseConsent(id) => {
                    #[cfg(feature = "consentry_tracing")]
                    info!("[u2c] RefuseConsent: id: {}", id);
                    match lifecycle.call(LifecycleRequest::Refuse(id)).await? {
                        LifecycleResponse::Record(record) => Ok(U2cResponse::Record(record)),
                        _ => Err(ConsentError::InternalConsentryError),
                    }
                }
                U2cRequest::RevokeConsent(id) => {
                    #[cfg(feature = "consentry_tracing")]
                    info!("[u2c] RevokeConsent: id: {}", id);
                    match lifecycle.call(LifecycleRequest::Revoke(id)).await? {
                        LifecycleResponse::Record(record) => {
                            // Best-effort counter-participant notification;
                            // never blocks or fails the transition.
                            let revoked_id = record.id.clone();
                            tokio::spawn(async move {
                                let _ = exchange
                                    .call(ExchangeRequest::NotifyRevocation(revoked_id))
                                    .await;
                            });
                            Ok(U2cResponse::Record(record))
                        }
                        _ => Err(ConsentError::InternalConsentryError),
                    }
                }
                U2cRequest::ReConfirmConsent { id, terms_changed } => {
                    #[cfg(feature = "consentry_tracing")]
                    info!("[u2c] ReConfirmConsent: id: {}", id);
                    match lifecycle
                        .call(LifecycleRequest::ReConfirm { id, terms_changed })
                        .await?
                    {
                        LifecycleResponse::Record(record) => Ok(U2cResponse::Record(record)),
                        _ => Err(ConsentError::InternalConsentryError),
                    }
                }
                U2cRequest::TerminateConsent(id) => {
                    #[cfg(feature = "consentry_tracing")]
                    info!("[u2c] TerminateConsent: id: {}", id);
                    match lifecycle.call(LifecycleRequest::Terminate(id)).await? {
                        LifecycleResponse::Record(record) => Ok(U2cResponse::Record(record)),
                        _ => Err(ConsentError::InternalConsentryError),
                    }
                }
                U2cRequest::GetConsent(id) => {
                    match lifecycle.call(LifecycleRequest::Get(id)).await? {
                        LifecycleResponse::Record(record) => Ok(U2cResponse::Record(record)),
                        _ => Err(ConsentError::InternalConsentryError),
                    }
                }
                U2cRequest::ListConsents(user) => {
                    match lifecycle.call(LifecycleRequest::ListByUser(user)).await? {
                        LifecycleResponse::Records(records) => Ok(U2cResponse::Records(records)),
                        _ => Err(ConsentError::InternalConsentryError),
                    }
                }
                U2cRequest::GetPrivacyNotice(reference) => {
                    match notice.call(NoticeRequest::Resolve(reference)).await? {
                        NoticeResponse::Notice(resolved) => Ok(U2cResponse::Notice(resolved)),
                        _ => Err(ConsentError::InternalConsentryError),
                    }
                }
                U2cRequest::ListPrivacyNotices { provider, consumer } => {
                    match notice.call(NoticeRequest::ListByPair { provider, consumer }).await? {
                        NoticeResponse::Notices(notices) => Ok(U2cResponse::Notices(notices)),
                        _ => Err(ConsentError::InternalConsentryError),
                    }
                }
                U2cRequest::TriggerExchange(id) => {
                    #[cfg(feature = "consentry_tracing")]
                    info!("[u2c] TriggerExchange: id: {}", id);
                    match exchange.call(ExchangeRequest::Trigger(id)).await? {
                        ExchangeResponse::Fulfilled => Ok(U2cResponse::ExchangeFulfilled),
                        _ => Err(ConsentError::InternalConsentryError),
                    }
                }
                U2cRequest::RedirectTarget(id) => {
                    match exchange.call(ExchangeRequest::RedirectTarget(id)).await? {
                        ExchangeResponse::Redirect(uri) => Ok(U2cResponse::Redirect(uri)),
                        _ => Err(ConsentError::InternalConsentryError),
                    }
                }
            }
        })
    }
}
