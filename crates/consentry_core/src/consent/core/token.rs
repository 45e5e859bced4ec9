//! Exchange token service.
//!
//! Issues the short-lived, single-purpose verification token bound to one
//! granted consent record, and verifies tokens presented by a remote
//! participant. Verification never consumes the token; clearing it is a
//! separate explicit step performed by the exchange orchestrator once the
//! handoff is acknowledged, so a verification probe cannot burn a token.
//!
//! At most one token is live per record. Concurrent `Issue` calls serialize
//! through the store's conditional update; the last writer's token is
//! authoritative.

use std::{future::Future, pin::Pin, task::Poll};

use tower::Service;
#[cfg(feature = "consentry_tracing")]
use tracing::info;

use crate::consent::{
    api::types::{TokenRequest, TokenResponse},
    error::ConsentError,
    infrastructure::{
        records::{ConsentStatus, ExchangeToken, now_millis},
        store::ConsentStore,
    },
};

/// Default token validity window in milliseconds.
pub const DEFAULT_TOKEN_TTL_MS: u64 = 300_000;

/// Token issuance and verification over the consent store.
#[derive(Debug, Clone)]
pub struct TokenService {
    records: ConsentStore,
    ttl_ms: u64,
}

impl TokenService {
    /// Creates a token service with the given validity window.
    pub fn new(records: ConsentStore, ttl_ms: u64) -> Self {
        Self { records, ttl_ms }
    }

    /// Binds a fresh token to a granted record, replacing any prior one.
    fn issue(&self, id: &str) -> Result<ExchangeToken, ConsentError> {
        let (record, version) = self.records.get(id)?;
        if record.status != ConsentStatus::Granted {
            return Err(ConsentError::NotGranted(id.to_string()));
        }
        let token = ExchangeToken::mint(now_millis()?, self.ttl_ms);
        let bound = token.clone();
        self.records.update(id, version, move |r| {
            r.token = Some(bound);
            Ok(())
        })?;
        Ok(token)
    }

    /// Checks a presented token against the bound one, without consuming it.
    fn verify(&self, id: &str, presented: &str) -> Result<bool, ConsentError> {
        let (record, _) = self.records.get(id)?;
        let now = now_millis()?;
        Ok(record
            .token
            .as_ref()
            .is_some_and(|token| token.value == presented && token.is_valid_at(now)))
    }

    /// Clears the bound token after a fulfilled exchange.
    fn clear(&self, id: &str) -> Result<(), ConsentError> {
        let (_, version) = self.records.get(id)?;
        self.records.update(id, version, |r| {
            r.token = None;
            Ok(())
        })?;
        Ok(())
    }
}

impl Service<TokenRequest> for TokenService {
    type Response = TokenResponse;
    type Error = ConsentError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _: &mut std::task::Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: TokenRequest) -> Self::Future {
        let this = self.clone();
        Box::pin(async move {
            match request {
                TokenRequest::Issue(id) => {
                    #[cfg(feature = "consentry_tracing")]
                    info!("[token] Issue: id: {}", id);
                    this.issue(&id).map(TokenResponse::Issued)
                }
                TokenRequest::Verify { id, token } => {
                    #[cfg(feature = "consentry_tracing")]
                    info!("[token] Verify: id: {}", id);
                    this.verify(&id, &token).map(TokenResponse::Verified)
                }
                TokenRequest::Clear(id) => {
                    #[cfg(feature = "consentry_tracing")]
                    info!("[token] Clear: id: {}", id);
                    this.clear(&id).map(|_| TokenResponse::Cleared)
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consent::infrastructure::records::{ConsentIntent, ConsentRecord};

    fn granted_record(store: &ConsentStore) -> ConsentRecord {
        let mut record = ConsentRecord::from_intent(
            ConsentIntent { data_provider: "did:prov".to_string(), ..Default::default() },
            0,
        );
        record.status = ConsentStatus::Granted;
        store.insert(record).unwrap()
    }

    #[tokio::test]
    async fn test_issue_requires_granted() {
        let store = ConsentStore::default();
        let record = store
            .insert(ConsentRecord::from_intent(ConsentIntent::default(), 0))
            .unwrap();
        let mut tokens = TokenService::new(store, DEFAULT_TOKEN_TTL_MS);
        assert_eq!(
            tokens.call(TokenRequest::Issue(record.id.clone())).await.unwrap_err(),
            ConsentError::NotGranted(record.id)
        );
    }

    #[tokio::test]
    async fn test_second_issue_invalidates_first() {
        let store = ConsentStore::default();
        let record = granted_record(&store);
        let mut tokens = TokenService::new(store, DEFAULT_TOKEN_TTL_MS);

        let TokenResponse::Issued(first) =
            tokens.call(TokenRequest::Issue(record.id.clone())).await.unwrap()
        else {
            panic!("Expected Issued");
        };
        let TokenResponse::Issued(second) =
            tokens.call(TokenRequest::Issue(record.id.clone())).await.unwrap()
        else {
            panic!("Expected Issued");
        };
        assert_ne!(first.value, second.value);

        assert_eq!(
            tokens
                .call(TokenRequest::Verify { id: record.id.clone(), token: first.value })
                .await
                .unwrap(),
            TokenResponse::Verified(false)
        );
        assert_eq!(
            tokens
                .call(TokenRequest::Verify { id: record.id.clone(), token: second.value })
                .await
                .unwrap(),
            TokenResponse::Verified(true)
        );
    }

    #[tokio::test]
    async fn test_verify_does_not_consume() {
        let store = ConsentStore::default();
        let record = granted_record(&store);
        let mut tokens = TokenService::new(store, DEFAULT_TOKEN_TTL_MS);

        let TokenResponse::Issued(token) =
            tokens.call(TokenRequest::Issue(record.id.clone())).await.unwrap()
        else {
            panic!("Expected Issued");
        };
        for _ in 0..3 {
            assert_eq!(
                tokens
                    .call(TokenRequest::Verify {
                        id: record.id.clone(),
                        token: token.value.clone()
                    })
                    .await
                    .unwrap(),
                TokenResponse::Verified(true)
            );
        }
    }

    #[tokio::test]
    async fn test_expired_token_fails_verification() {
        let store = ConsentStore::default();
        let record = granted_record(&store);
        // Zero TTL: the token is already past its window when verified.
        let mut tokens = TokenService::new(store, 0);

        let TokenResponse::Issued(token) =
            tokens.call(TokenRequest::Issue(record.id.clone())).await.unwrap()
        else {
            panic!("Expected Issued");
        };
        assert_eq!(
            tokens
                .call(TokenRequest::Verify { id: record.id, token: token.value })
                .await
                .unwrap(),
            TokenResponse::Verified(false)
        );
    }

    #[tokio::test]
    async fn test_clear_removes_binding() {
        let store = ConsentStore::default();
        let record = granted_record(&store);
        let mut tokens = TokenService::new(store.clone(), DEFAULT_TOKEN_TTL_MS);

        let TokenResponse::Issued(token) =
            tokens.call(TokenRequest::Issue(record.id.clone())).await.unwrap()
        else {
            panic!("Expected Issued");
        };
        tokens.call(TokenRequest::Clear(record.id.clone())).await.unwrap();
        assert_eq!(
            tokens
                .call(TokenRequest::Verify { id: record.id.clone(), token: token.value })
                .await
                .unwrap(),
            TokenResponse::Verified(false)
        );
        assert!(store.get(&record.id).unwrap().0.token.is_none());
    }
}
