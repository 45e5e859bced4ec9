use std::time::Duration;

use tower::Service;

use super::fixtures::{intent_fixture, spawn_manager};
use crate::consent::{
    api::P2cRequest,
    error::ConsentError,
    infrastructure::records::ConsentStatus,
};

#[tokio::test]
async fn integration_granted_consent_token_lifecycle() {
    #[cfg(feature = "consentry_tracing")]
    crate::consentry_tracing::init();
    let mut bench = spawn_manager(300_000, 100);

    let record = give!(bench.u2c, intent_fixture("user-1"));
    assert_eq!(record.status, ConsentStatus::Granted);

    let token = issue_token!(bench.p2c, record.id);
    assert!(verify_token!(bench.p2c, record.id, token.value));
    assert!(!verify_token!(bench.p2c, record.id, "wrong"));

    let revoked = revoke!(bench.u2c, record.id);
    assert_eq!(revoked.status, ConsentStatus::Revoked);
    // The terminal transition cleared the token.
    assert!(!verify_token!(bench.p2c, record.id, token.value));
}

#[tokio::test]
async fn integration_only_last_issued_token_verifies() {
    #[cfg(feature = "consentry_tracing")]
    crate::consentry_tracing::init();
    let mut bench = spawn_manager(300_000, 100);

    let record = give!(bench.u2c, intent_fixture("user-1"));
    let first = issue_token!(bench.p2c, record.id);
    let second = issue_token!(bench.p2c, record.id);
    assert_ne!(first.value, second.value);

    assert!(!verify_token!(bench.p2c, record.id, first.value));
    assert!(verify_token!(bench.p2c, record.id, second.value));
}

#[tokio::test]
async fn integration_token_expires_after_ttl() {
    #[cfg(feature = "consentry_tracing")]
    crate::consentry_tracing::init();
    let mut bench = spawn_manager(1, 100);

    let record = give!(bench.u2c, intent_fixture("user-1"));
    let token = issue_token!(bench.p2c, record.id);
    tokio::time::sleep(Duration::from_millis(5)).await;
    assert!(!verify_token!(bench.p2c, record.id, token.value));
}

#[tokio::test]
async fn integration_issue_requires_granted_record() {
    #[cfg(feature = "consentry_tracing")]
    crate::consentry_tracing::init();
    let mut bench = spawn_manager(300_000, 100);

    let draft = draft!(bench.p2c, intent_fixture("user-1"));
    assert_eq!(
        bench.p2c.call(P2cRequest::IssueToken(draft.id.clone())).await.unwrap_err(),
        ConsentError::NotGranted(draft.id)
    );
    assert_eq!(
        bench.p2c.call(P2cRequest::IssueToken("missing".to_string())).await.unwrap_err(),
        ConsentError::RecordNotFound("missing".to_string())
    );
}

#[tokio::test]
async fn integration_verification_probe_does_not_consume() {
    #[cfg(feature = "consentry_tracing")]
    crate::consentry_tracing::init();
    let mut bench = spawn_manager(300_000, 100);

    let record = give!(bench.u2c, intent_fixture("user-1"));
    let token = issue_token!(bench.p2c, record.id);
    for _ in 0..5 {
        assert!(verify_token!(bench.p2c, record.id, token.value));
    }
}
