//! Exchange orchestrator.
//!
//! Drives the asynchronous, potentially-failing handoff of data between two
//! independently-operated participant systems once a consent is granted and
//! verified. The orchestrator resolves the consumer participant's connector
//! endpoint, issues a fresh verification token, performs the outbound call
//! bounded by an explicit timeout, and interprets the remote outcome:
//!
//! - acknowledged → the exchange is fulfilled, the token is consumed, the
//!   record stays `Granted` (fulfillment is consent-level metadata, not a
//!   status change);
//! - rejected by the connector → surfaced as `ExchangeRejected`, the record
//!   remains `Granted` and retriable;
//! - timeout or transport failure → surfaced as a transient error; the token
//!   stays bound, its expiry is the cancellation boundary, and a retry
//!   re-issues a fresh token.
//!
//! The orchestrator holds no durable state: the only thing it keeps is an
//! in-memory table of in-flight attempts guarding the single-attempt
//! precondition, and no lock is held while a remote call is in flight.

use std::{future::Future, pin::Pin, sync::Arc, task::Poll, time::Duration};

use dashmap::{DashMap, Entry};
use tower::Service;
#[cfg(feature = "consentry_tracing")]
use tracing::{info, warn};

use crate::consent::{
    api::types::{
        C2pRequest, C2pResponse, ExchangeRequest, ExchangeResponse, TokenRequest, TokenResponse,
    },
    error::ConsentError,
    infrastructure::{
        directory::ParticipantDirectory,
        records::{ConsentRecord, ConsentStatus, now_millis},
        store::ConsentStore,
    },
    core::token::TokenService,
};

/// Default bound on a single outbound connector call, in milliseconds.
pub const DEFAULT_EXCHANGE_TIMEOUT_MS: u64 = 5_000;

/// One attempt at the cross-participant handoff, correlated to a consent
/// record while the connector call is in flight. Tracked in memory only.
#[derive(Debug, Clone)]
pub struct ExchangeAttempt {
    pub endpoint: String,
    pub token: Option<String>,
    pub started_at: u64,
}

/// The exchange orchestrator as a tower service, generic over the outbound
/// connector transport.
#[derive(Debug, Clone)]
pub struct ExchangeService<X> {
    records: ConsentStore,
    directory: ParticipantDirectory,
    tokens: TokenService,
    connector: X,
    /// Outbound call bound in milliseconds, disabled if set to 0
    timeout_ms: u64,
    in_flight: Arc<DashMap<String, ExchangeAttempt>>,
}

impl<X> ExchangeService<X> {
    /// Creates an exchange orchestrator over the given collaborators.
    pub fn new(
        records: ConsentStore,
        directory: ParticipantDirectory,
        tokens: TokenService,
        connector: X,
        timeout_ms: u64,
    ) -> Self {
        Self {
            records,
            directory,
            tokens,
            connector,
            timeout_ms,
            in_flight: Arc::new(DashMap::new()),
        }
    }
}

impl<X> ExchangeService<X>
where
    X: Service<C2pRequest, Response = C2pResponse, Error = ConsentError>
        + Clone
        + Send
        + 'static,
    X::Future: Send,
{
    /// Loads the record and checks the granted precondition.
    fn granted_record(&self, id: &str) -> Result<ConsentRecord, ConsentError> {
        let (record, _) = self.records.get(id)?;
        if record.status != ConsentStatus::Granted {
            return Err(ConsentError::NotGranted(id.to_string()));
        }
        Ok(record)
    }

    /// Performs the outbound connector call under the configured timeout.
    async fn deliver(&self, request: C2pRequest) -> Result<C2pResponse, ConsentError> {
        let endpoint = request.endpoint().to_string();
        let mut connector = self.connector.clone();
        if self.timeout_ms == 0 {
            connector.call(request).await
        } else {
            tokio::time::timeout(Duration::from_millis(self.timeout_ms), connector.call(request))
                .await
                .map_err(|_| ConsentError::ExchangeTimeout(endpoint))?
        }
    }

    /// The trigger/resume flow: claim the single-attempt slot, issue a fresh
    /// token, hand off to the consumer connector and interpret the outcome.
    async fn trigger(&self, id: &str) -> Result<ExchangeResponse, ConsentError> {
        let record = self.granted_record(id)?;
        let consumer = self.directory.resolve(&record.data_consumer)?;
        let endpoint = consumer.exchange_endpoint()?;

        match self.in_flight.entry(id.to_string()) {
            Entry::Occupied(_) => return Err(ConsentError::ExchangeInFlight(id.to_string())),
            Entry::Vacant(vacant) => {
                vacant.insert(ExchangeAttempt {
                    endpoint: endpoint.clone(),
                    token: None,
                    started_at: now_millis()?,
                });
            }
        }

        let outcome = self.run_exchange(&record, endpoint).await;
        self.in_flight.remove(id);
        outcome
    }

    async fn run_exchange(
        &self,
        record: &ConsentRecord,
        endpoint: String,
    ) -> Result<ExchangeResponse, ConsentError> {
        let mut tokens = self.tokens.clone();
        let TokenResponse::Issued(token) =
            tokens.call(TokenRequest::Issue(record.id.clone())).await?
        else {
            return Err(ConsentError::InternalConsentryError);
        };
        if let Some(mut attempt) = self.in_flight.get_mut(&record.id) {
            attempt.token = Some(token.value.clone());
        }

        let request = C2pRequest::DataExchange {
            endpoint,
            consent_id: record.id.clone(),
            token: token.value,
            data: record.data.clone(),
            provider_user_identifier: record.provider_user_identifier.clone(),
            consumer_user_identifier: record.consumer_user_identifier.clone(),
            data_provider: record.data_provider.clone(),
        };

        // A rejection or transport failure leaves the token bound: the
        // consent stays granted and retriable, and a delayed remote retry
        // may still redeem the token until it expires.
        match self.deliver(request).await? {
            C2pResponse::Ack => {
                tokens.call(TokenRequest::Clear(record.id.clone())).await?;
                Ok(ExchangeResponse::Fulfilled)
            }
        }
    }

    /// Resolves the URI for the interactive confirmation redirect.
    fn redirect_target(&self, id: &str) -> Result<String, ConsentError> {
        let (record, _) = self.records.get(id)?;
        let consumer = self.directory.resolve(&record.data_consumer)?;
        if consumer.dataspace_endpoint.is_empty() {
            return Err(ConsentError::MissingExchangeEndpoint(consumer.identifier));
        }
        Ok(format!("{}?consent={}", consumer.dataspace_endpoint, record.id))
    }

    /// Best-effort revocation notice to the consumer connector.
    ///
    /// Connector failures are swallowed so a withdrawal never blocks on the
    /// counter-participant being reachable.
    async fn notify_revocation(&self, id: &str) -> Result<ExchangeResponse, ConsentError> {
        let (record, _) = self.records.get(id)?;
        let consumer = self.directory.resolve(&record.data_consumer)?;
        let Some(endpoint) = consumer.endpoints.consent_export.clone() else {
            #[cfg(feature = "consentry_tracing")]
            info!(
                "[exchange] NotifyRevocation skipped, no notice endpoint for {}",
                consumer.identifier
            );
            return Ok(ExchangeResponse::RevocationNotified);
        };

        let request =
            C2pRequest::RevocationNotice { endpoint, consent_id: record.id.clone() };
        match self.deliver(request).await {
            Ok(C2pResponse::Ack) => {}
            Err(_error) => {
                #[cfg(feature = "consentry_tracing")]
                warn!("[exchange] NotifyRevocation failed for {}: {}", record.id, _error);
            }
        }
        Ok(ExchangeResponse::RevocationNotified)
    }
}

impl<X> Service<ExchangeRequest> for ExchangeService<X>
where
    X: Service<C2pRequest, Response = C2pResponse, Error = ConsentError>
        + Clone
        + Send
        + Sync
        + 'static,
    X::Future: Send,
{
    type Response = ExchangeResponse;
    type Error = ConsentError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _: &mut std::task::Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: ExchangeRequest) -> Self::Future {
        let this = self.clone();
        Box::pin(async move {
            match request {
                ExchangeRequest::Trigger(id) => {
                    #[cfg(feature = "consentry_tracing")]
                    info!("[exchange] Trigger: id: {}", id);
                    this.trigger(&id).await
                }
                ExchangeRequest::Resume(id) => {
                    #[cfg(feature = "consentry_tracing")]
                    info!("[exchange] Resume: id: {}", id);
                    // Re-entering the trigger flow is idempotent as long as
                    // no attempt is in flight.
                    this.trigger(&id).await
                }
                ExchangeRequest::RedirectTarget(id) => {
                    #[cfg(feature = "consentry_tracing")]
                    info!("[exchange] RedirectTarget: id: {}", id);
                    this.redirect_target(&id).map(ExchangeResponse::Redirect)
                }
                ExchangeRequest::NotifyRevocation(id) => {
                    #[cfg(feature = "consentry_tracing")]
                    info!("[exchange] NotifyRevocation: id: {}", id);
                    this.notify_revocation(&id).await
                }
            }
        })
    }
}
