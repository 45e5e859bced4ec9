//! Consent lifecycle service: the state machine over consent records.
//!
//! Owns the legal transitions a record may undergo and the invariants that
//! must hold before each transition is accepted:
//!
//! ```text
//! pending → granted | refused | terminated
//! granted → revoked | terminated | expired
//! granted → pending   (re-confirm with materially changed terms)
//! ```
//!
//! `Refused`, `Revoked`, `Terminated` and `Expired` are terminal. Every
//! terminal transition clears any bound exchange token, and every write goes
//! through the store's conditional update so concurrent transitions on the
//! same record serialize instead of interleaving.
//!
//! Events are plain immutable values stamped with the current time at the
//! moment the transition commits, constructed here and nowhere else.

use std::{future::Future, pin::Pin, task::Poll};

use tower::Service;
#[cfg(feature = "consentry_tracing")]
use tracing::info;

use crate::consent::{
    api::types::{LifecycleRequest, LifecycleResponse},
    error::ConsentError,
    infrastructure::{
        records::{
            ConsentEvent, ConsentEventKind, ConsentIntent, ConsentRecord, ConsentStatus,
            now_millis,
        },
        store::{ConsentStore, NoticeStore},
    },
    validation::IntentValidator,
};

/// The consent state machine as a tower service.
///
/// Stateless between calls: all record state lives in the consent store, all
/// notice state in the notice store. Cloning yields another handle onto the
/// same stores.
#[derive(Default, Debug, Clone)]
pub struct LifecycleService {
    records: ConsentStore,
    notices: NoticeStore,
    validator: IntentValidator,
}

impl LifecycleService {
    /// Creates a lifecycle service over the given stores.
    pub fn new(records: ConsentStore, notices: NoticeStore) -> Self {
        Self { records, notices, validator: IntentValidator }
    }

    /// Validates an intent up front, including notice resolution.
    fn check_intent(&self, intent: &ConsentIntent) -> Result<(), ConsentError> {
        self.validator.validate(intent)?;
        self.notices.resolve(&intent.privacy_notice)?;
        Ok(())
    }

    /// Creates a pending record from an intent without granting it.
    fn draft(&self, intent: ConsentIntent) -> Result<ConsentRecord, ConsentError> {
        self.check_intent(&intent)?;
        let now = now_millis()?;
        self.records.insert(ConsentRecord::from_intent(intent, now))
    }

    /// Validates an intent and commits it directly as a granted record.
    fn give(&self, intent: ConsentIntent) -> Result<ConsentRecord, ConsentError> {
        self.check_intent(&intent)?;
        let now = now_millis()?;
        let mut record = ConsentRecord::from_intent(intent, now);
        record.status = ConsentStatus::Granted;
        record.events.push(ConsentEvent::stamp(ConsentEventKind::Given, now));
        record.valid_until = record.retention_window_ms().map(|w| now.saturating_add(w));
        self.records.insert(record)
    }

    /// Shared transition path: legality check against the status the caller
    /// read, then a conditional write that commits atomically or not at all.
    fn transition(
        &self,
        id: &str,
        action: &'static str,
        allowed: &[ConsentStatus],
        apply: impl FnOnce(&mut ConsentRecord, u64),
    ) -> Result<ConsentRecord, ConsentError> {
        let (record, version) = self.records.get(id)?;
        if !allowed.contains(&record.status) {
            return Err(ConsentError::InvalidTransition { from: record.status, action });
        }
        let now = now_millis()?;
        self.records.update(id, version, |r| {
            apply(r, now);
            r.updated_at = now;
            Ok(())
        })
    }

    fn grant(&self, id: &str) -> Result<ConsentRecord, ConsentError> {
        self.transition(id, "grant", &[ConsentStatus::Pending], |r, now| {
            r.status = ConsentStatus::Granted;
            r.events.push(ConsentEvent::stamp(ConsentEventKind::Given, now));
            r.valid_until = r.retention_window_ms().map(|w| now.saturating_add(w));
        })
    }

    fn refuse(&self, id: &str) -> Result<ConsentRecord, ConsentError> {
        self.transition(id, "refuse", &[ConsentStatus::Pending], |r, now| {
            r.status = ConsentStatus::Refused;
            r.events.push(ConsentEvent::stamp(ConsentEventKind::Refused, now));
            r.token = None;
        })
    }

    fn revoke(&self, id: &str) -> Result<ConsentRecord, ConsentError> {
        self.transition(id, "revoke", &[ConsentStatus::Granted], |r, now| {
            r.status = ConsentStatus::Revoked;
            r.events.push(ConsentEvent::stamp(ConsentEventKind::Revoked, now));
            r.token = None;
        })
    }

    fn re_confirm(&self, id: &str, terms_changed: bool) -> Result<ConsentRecord, ConsentError> {
        self.transition(id, "re-confirm", &[ConsentStatus::Granted], |r, now| {
            r.events.push(ConsentEvent::stamp(ConsentEventKind::ReConfirmed, now));
            if terms_changed {
                // Re-open for re-acceptance; a token may only live on a
                // granted record.
                r.status = ConsentStatus::Pending;
                r.token = None;
                r.valid_until = None;
            }
        })
    }

    fn terminate(&self, id: &str) -> Result<ConsentRecord, ConsentError> {
        self.transition(
            id,
            "terminate",
            &[ConsentStatus::Pending, ConsentStatus::Granted],
            |r, now| {
                r.status = ConsentStatus::Terminated;
                r.events.push(ConsentEvent::stamp(ConsentEventKind::Terminated, now));
                r.token = None;
            },
        )
    }

    fn expire(&self, id: &str) -> Result<ConsentRecord, ConsentError> {
        self.transition(id, "expire", &[ConsentStatus::Granted], |r, now| {
            r.status = ConsentStatus::Expired;
            r.events.push(ConsentEvent::stamp(ConsentEventKind::Expired, now));
            r.token = None;
        })
    }

}

impl Service<LifecycleRequest> for LifecycleService {
    type Response = LifecycleResponse;
    type Error = ConsentError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _: &mut std::task::Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: LifecycleRequest) -> Self::Future {
        let this = self.clone();
        Box::pin(async move {
            match request {
                LifecycleRequest::Draft(intent) => {
                    #[cfg(feature = "consentry_tracing")]
                    info!(
                        "[lifecycle] Draft: provider: {}, consumer: {}",
                        intent.data_provider, intent.data_consumer
                    );
                    this.draft(intent).map(LifecycleResponse::Record)
                }
                LifecycleRequest::Give(intent) => {
                    #[cfg(feature = "consentry_tracing")]
                    info!(
                        "[lifecycle] Give: provider: {}, consumer: {}",
                        intent.data_provider, intent.data_consumer
                    );
                    this.give(intent).map(LifecycleResponse::Record)
                }
                LifecycleRequest::Grant(id) => {
                    #[cfg(feature = "consentry_tracing")]
                    info!("[lifecycle] Grant: id: {}", id);
                    this.grant(&id).map(LifecycleResponse::Record)
                }
                LifecycleRequest::Refuse(id) => {
                    #[cfg(feature = "consentry_tracing")]
                    info!("[lifecycle] Refuse: id: {}", id);
                    this.refuse(&id).map(LifecycleResponse::Record)
                }
                LifecycleRequest::Revoke(id) => {
                    #[cfg(feature = "consentry_tracing")]
                    info!("[lifecycle] Revoke: id: {}", id);
                    this.revoke(&id).map(LifecycleResponse::Record)
                }
                LifecycleRequest::ReConfirm { id, terms_changed } => {
                    #[cfg(feature = "consentry_tracing")]
                    info!("[lifecycle] ReConfirm: id: {}, terms_changed: {}", id, terms_changed);
                    this.re_confirm(&id, terms_changed).map(LifecycleResponse::Record)
                }
                LifecycleRequest::Terminate(id) => {
                    #[cfg(feature = "consentry_tracing")]
                    info!("[lifecycle] Terminate: id: {}", id);
                    this.terminate(&id).map(LifecycleResponse::Record)
                }
                LifecycleRequest::Expire(id) => {
                    #[cfg(feature = "consentry_tracing")]
                    info!("[lifecycle] Expire: id: {}", id);
                    this.expire(&id).map(LifecycleResponse::Record)
                }
                LifecycleRequest::Get(id) => {
                    this.records.get(&id).map(|(record, _)| LifecycleResponse::Record(record))
                }
                LifecycleRequest::ListByUser(user) => {
                    Ok(LifecycleResponse::Records(this.records.list_by_user(&user)))
                }
                LifecycleRequest::ListByPair { provider, consumer } => {
                    Ok(LifecycleResponse::Records(this.records.list_by_pair(&provider, &consumer)))
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consent::infrastructure::records::{PrivacyNotice, Purpose};

    fn service_with_notice() -> LifecycleService {
        let notices = NoticeStore::default();
        notices
            .register(PrivacyNotice { id: "notice-1".to_string(), ..Default::default() })
            .unwrap();
        LifecycleService::new(ConsentStore::default(), notices)
    }

    fn intent() -> ConsentIntent {
        ConsentIntent {
            user: Some("user-1".to_string()),
            provider_user_identifier: "prov-user".to_string(),
            consumer_user_identifier: "cons-user".to_string(),
            data_provider: "did:prov".to_string(),
            data_consumer: "did:cons".to_string(),
            purposes: vec![Purpose::new("marketing", "consent")],
            data: vec!["resource-1".to_string()],
            privacy_notice: "notice-1".to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_give_grants_and_stamps_event() {
        let mut lifecycle = service_with_notice();
        let LifecycleResponse::Record(record) =
            lifecycle.call(LifecycleRequest::Give(intent())).await.unwrap()
        else {
            panic!("Expected Record");
        };
        assert_eq!(record.status, ConsentStatus::Granted);
        assert_eq!(record.events.len(), 1);
        assert_eq!(record.events[0].kind, ConsentEventKind::Given);
        assert_eq!(record.events[0].validity_duration, "0");
    }

    #[tokio::test]
    async fn test_give_requires_resolvable_notice() {
        let mut lifecycle = LifecycleService::default();
        assert_eq!(
            lifecycle.call(LifecycleRequest::Give(intent())).await.unwrap_err(),
            ConsentError::NoticeNotFound("notice-1".to_string())
        );
    }

    #[tokio::test]
    async fn test_refuse_only_from_pending() {
        let mut lifecycle = service_with_notice();
        let LifecycleResponse::Record(granted) =
            lifecycle.call(LifecycleRequest::Give(intent())).await.unwrap()
        else {
            panic!("Expected Record");
        };
        assert_eq!(
            lifecycle.call(LifecycleRequest::Refuse(granted.id)).await.unwrap_err(),
            ConsentError::InvalidTransition { from: ConsentStatus::Granted, action: "refuse" }
        );

        let LifecycleResponse::Record(draft) =
            lifecycle.call(LifecycleRequest::Draft(intent())).await.unwrap()
        else {
            panic!("Expected Record");
        };
        let LifecycleResponse::Record(refused) =
            lifecycle.call(LifecycleRequest::Refuse(draft.id)).await.unwrap()
        else {
            panic!("Expected Record");
        };
        assert_eq!(refused.status, ConsentStatus::Refused);
    }

    #[tokio::test]
    async fn test_terminal_states_reject_everything() {
        let mut lifecycle = service_with_notice();
        let LifecycleResponse::Record(record) =
            lifecycle.call(LifecycleRequest::Give(intent())).await.unwrap()
        else {
            panic!("Expected Record");
        };
        lifecycle.call(LifecycleRequest::Revoke(record.id.clone())).await.unwrap();

        for request in [
            LifecycleRequest::Revoke(record.id.clone()),
            LifecycleRequest::Terminate(record.id.clone()),
            LifecycleRequest::ReConfirm { id: record.id.clone(), terms_changed: false },
            LifecycleRequest::Expire(record.id.clone()),
            LifecycleRequest::Grant(record.id.clone()),
        ] {
            assert!(matches!(
                lifecycle.call(request).await.unwrap_err(),
                ConsentError::InvalidTransition { from: ConsentStatus::Revoked, .. }
            ));
        }
    }

    #[tokio::test]
    async fn test_re_confirm_with_changed_terms_reopens() {
        let mut lifecycle = service_with_notice();
        let LifecycleResponse::Record(record) =
            lifecycle.call(LifecycleRequest::Give(intent())).await.unwrap()
        else {
            panic!("Expected Record");
        };

        let LifecycleResponse::Record(restamped) = lifecycle
            .call(LifecycleRequest::ReConfirm { id: record.id.clone(), terms_changed: false })
            .await
            .unwrap()
        else {
            panic!("Expected Record");
        };
        assert_eq!(restamped.status, ConsentStatus::Granted);
        assert_eq!(restamped.events.last().unwrap().kind, ConsentEventKind::ReConfirmed);

        let LifecycleResponse::Record(reopened) = lifecycle
            .call(LifecycleRequest::ReConfirm { id: record.id.clone(), terms_changed: true })
            .await
            .unwrap()
        else {
            panic!("Expected Record");
        };
        assert_eq!(reopened.status, ConsentStatus::Pending);
        assert!(reopened.token.is_none());

        // Re-acceptance closes the loop.
        let LifecycleResponse::Record(regranted) =
            lifecycle.call(LifecycleRequest::Grant(record.id)).await.unwrap()
        else {
            panic!("Expected Record");
        };
        assert_eq!(regranted.status, ConsentStatus::Granted);
    }

    #[tokio::test]
    async fn test_illegal_transition_leaves_record_untouched() {
        let mut lifecycle = service_with_notice();
        let LifecycleResponse::Record(record) =
            lifecycle.call(LifecycleRequest::Draft(intent())).await.unwrap()
        else {
            panic!("Expected Record");
        };

        // Revoke is not defined from pending.
        lifecycle.call(LifecycleRequest::Revoke(record.id.clone())).await.unwrap_err();

        let LifecycleResponse::Record(after) =
            lifecycle.call(LifecycleRequest::Get(record.id.clone())).await.unwrap()
        else {
            panic!("Expected Record");
        };
        assert_eq!(after, record);
    }
}
