use tower::Service;

use super::fixtures::{CONSUMER, PROVIDER, intent_fixture, spawn_manager};
use crate::consent::{
    api::{LifecycleRequest, P2cRequest, P2cResponse, U2cRequest, U2cResponse},
    core::lifecycle::LifecycleService,
    error::ConsentError,
    infrastructure::records::{ConsentEventKind, ConsentStatus},
};

#[tokio::test]
async fn integration_give_then_revoke_is_terminal() {
    #[cfg(feature = "consentry_tracing")]
    crate::consentry_tracing::init();
    let mut bench = spawn_manager(300_000, 100);

    let record = give!(bench.u2c, intent_fixture("user-1"));
    assert_eq!(record.status, ConsentStatus::Granted);
    assert_eq!(record.events.last().unwrap().kind, ConsentEventKind::Given);

    let revoked = revoke!(bench.u2c, record.id);
    assert_eq!(revoked.status, ConsentStatus::Revoked);
    assert!(revoked.token.is_none());

    // No outbound transition from a terminal state; the exchange trigger
    // fails its precondition.
    assert_eq!(
        bench.u2c.call(U2cRequest::TriggerExchange(record.id.clone())).await.unwrap_err(),
        ConsentError::NotGranted(record.id.clone())
    );
    assert!(matches!(
        bench.u2c.call(U2cRequest::TerminateConsent(record.id)).await.unwrap_err(),
        ConsentError::InvalidTransition { from: ConsentStatus::Revoked, .. }
    ));
}

#[tokio::test]
async fn integration_draft_grant_and_refuse_paths() {
    #[cfg(feature = "consentry_tracing")]
    crate::consentry_tracing::init();
    let mut bench = spawn_manager(300_000, 100);

    // Participant drafts, subject accepts after out-of-band validation.
    let draft = draft!(bench.p2c, intent_fixture("user-1"));
    assert_eq!(draft.status, ConsentStatus::Pending);
    assert!(draft.events.is_empty());
    let granted = grant_draft!(bench.u2c, draft.id);
    assert_eq!(granted.status, ConsentStatus::Granted);

    // Participant drafts, subject declines.
    let draft = draft!(bench.p2c, intent_fixture("user-2"));
    let U2cResponse::Record(refused) =
        bench.u2c.call(U2cRequest::RefuseConsent(draft.id)).await.unwrap()
    else {
        panic!("Expected Record");
    };
    assert_eq!(refused.status, ConsentStatus::Refused);
    assert_eq!(refused.events.last().unwrap().kind, ConsentEventKind::Refused);
}

#[tokio::test]
async fn integration_re_confirm_is_idempotent_on_status() {
    #[cfg(feature = "consentry_tracing")]
    crate::consentry_tracing::init();
    let mut bench = spawn_manager(300_000, 100);

    let record = give!(bench.u2c, intent_fixture("user-1"));
    for _ in 0..2 {
        let U2cResponse::Record(reconfirmed) = bench
            .u2c
            .call(U2cRequest::ReConfirmConsent { id: record.id.clone(), terms_changed: false })
            .await
            .unwrap()
        else {
            panic!("Expected Record");
        };
        assert_eq!(reconfirmed.status, ConsentStatus::Granted);
    }

    let after = get_consent!(bench.u2c, record.id);
    // Given + two re-confirmation stamps, nothing else changed.
    assert_eq!(after.events.len(), 3);
    assert_eq!(
        after.events.iter().filter(|e| e.kind == ConsentEventKind::ReConfirmed).count(),
        2
    );
}

#[tokio::test]
async fn integration_terminate_from_both_live_states() {
    #[cfg(feature = "consentry_tracing")]
    crate::consentry_tracing::init();
    let mut bench = spawn_manager(300_000, 100);

    let granted = give!(bench.u2c, intent_fixture("user-1"));
    let U2cResponse::Record(terminated) =
        bench.u2c.call(U2cRequest::TerminateConsent(granted.id)).await.unwrap()
    else {
        panic!("Expected Record");
    };
    assert_eq!(terminated.status, ConsentStatus::Terminated);

    let pending = draft!(bench.p2c, intent_fixture("user-2"));
    let U2cResponse::Record(terminated) =
        bench.u2c.call(U2cRequest::TerminateConsent(pending.id)).await.unwrap()
    else {
        panic!("Expected Record");
    };
    assert_eq!(terminated.status, ConsentStatus::Terminated);
}

#[tokio::test]
async fn integration_illegal_transition_leaves_updated_at_unchanged() {
    #[cfg(feature = "consentry_tracing")]
    crate::consentry_tracing::init();
    let mut bench = spawn_manager(300_000, 100);

    let record = give!(bench.u2c, intent_fixture("user-1"));
    let before = get_consent!(bench.u2c, record.id);

    bench.u2c.call(U2cRequest::RefuseConsent(record.id.clone())).await.unwrap_err();
    bench.u2c.call(U2cRequest::GrantDraft(record.id.clone())).await.unwrap_err();

    let after = get_consent!(bench.u2c, record.id);
    assert_eq!(after.updated_at, before.updated_at);
    assert_eq!(after, before);
}

#[tokio::test]
async fn integration_expiry_sweep_expires_elapsed_grants() {
    #[cfg(feature = "consentry_tracing")]
    crate::consentry_tracing::init();
    let mut bench = spawn_manager(300_000, 100);

    // A one-second retention period, elapsed well in the past relative to
    // the sweep instant below.
    let mut intent = intent_fixture("user-1");
    intent.retention_period = Some("1".to_string());
    let record = give!(bench.u2c, intent);
    assert!(get_consent!(bench.u2c, record.id).valid_until.is_some());

    let sweep_at = record.updated_at + 2_000;
    let due = bench.records.due_for_expiry(sweep_at);
    assert_eq!(due, vec![record.id.clone()]);

    let mut lifecycle = LifecycleService::new(bench.records.clone(), bench.notices.clone());
    for id in due {
        lifecycle.call(LifecycleRequest::Expire(id)).await.unwrap();
    }
    assert_status!(bench.u2c, record.id, ConsentStatus::Expired);
}

#[tokio::test]
async fn integration_list_queries_by_user_and_pair() {
    #[cfg(feature = "consentry_tracing")]
    crate::consentry_tracing::init();
    let mut bench = spawn_manager(300_000, 100);

    give!(bench.u2c, intent_fixture("user-1"));
    give!(bench.u2c, intent_fixture("user-1"));
    give!(bench.u2c, intent_fixture("user-2"));

    let U2cResponse::Records(mine) =
        bench.u2c.call(U2cRequest::ListConsents("user-1".to_string())).await.unwrap()
    else {
        panic!("Expected Records");
    };
    assert_eq!(mine.len(), 2);

    let P2cResponse::Records(pair) = bench
        .p2c
        .call(P2cRequest::ListConsentsForPair {
            provider: PROVIDER.to_string(),
            consumer: CONSUMER.to_string(),
        })
        .await
        .unwrap()
    else {
        panic!("Expected Records");
    };
    assert_eq!(pair.len(), 3);
    assert_eq!(bench.records.list_by_pair(CONSUMER, PROVIDER).len(), 0);
}
