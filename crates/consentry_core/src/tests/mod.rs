
mod lifecycle;
mod token;

use tower::Service;

use fixtures::{CONSUMER, NOTICE, PROVIDER, intent_fixture, spawn_manager};

use crate::consent::{
    api::{P2cRequest, P2cResponse, U2cRequest, U2cResponse},
    error::ConsentError,
    infrastructure::records::ConsentStatus,
};

#[tokio::test]
async fn integration_init_consent_manager() {
    #[cfg(feature = "consentry_tracing")]
    crate::consentry_tracing::init();
    let mut bench = spawn_manager(300_000, 100);

    let record = give!(bench.u2c, intent_fixture("user-1"));
    assert_eq!(record.status, ConsentStatus::Granted);
    assert_eq!(record.data_provider, PROVIDER);
    assert_eq!(record.data_consumer, CONSUMER);

    let fetched = get_consent!(bench.u2c, record.id);
    assert_eq!(fetched, record);
}

#[tokio::test]
async fn integration_privacy_notice_consultation() {
    #[cfg(feature = "consentry_tracing")]
    crate::consentry_tracing::init();
    let mut bench = spawn_manager(300_000, 100);

    let U2cResponse::Notice(notice) =
        bench.u2c.call(U2cRequest::GetPrivacyNotice(NOTICE.to_string())).await.unwrap()
    else {
        panic!("Expected Notice");
    };
    assert_eq!(notice.id, NOTICE);

    let U2cResponse::Notices(notices) = bench
        .u2c
        .call(U2cRequest::ListPrivacyNotices {
            provider: PROVIDER.to_string(),
            consumer: CONSUMER.to_string(),
        })
        .await
        .unwrap()
    else {
        panic!("Expected Notices");
    };
    assert_eq!(notices.len(), 1);

    assert_eq!(
        bench.u2c.call(U2cRequest::GetPrivacyNotice("missing".to_string())).await.unwrap_err(),
        ConsentError::NoticeNotFound("missing".to_string())
    );
}

#[tokio::test]
async fn integration_available_exchanges_for_participant() {
    #[cfg(feature = "consentry_tracing")]
    crate::consentry_tracing::init();
    let mut bench = spawn_manager(300_000, 100);

    for participant in [PROVIDER, CONSUMER] {
        let P2cResponse::Notices(offers) = bench
            .p2c
            .call(P2cRequest::AvailableExchanges(participant.to_string()))
            .await
            .unwrap()
        else {
            panic!("Expected Notices");
        };
        assert_eq!(offers.len(), 1, "one live offer expected for {participant}");
    }

    // Archiving the notice withdraws the offer.
    bench.notices.archive(NOTICE, 1).unwrap();
    let P2cResponse::Notices(offers) =
        bench.p2c.call(P2cRequest::AvailableExchanges(PROVIDER.to_string())).await.unwrap()
    else {
        panic!("Expected Notices");
    };
    assert!(offers.is_empty());
}

#[tokio::test]
async fn integration_give_with_unknown_notice_is_rejected() {
    #[cfg(feature = "consentry_tracing")]
    crate::consentry_tracing::init();
    let mut bench = spawn_manager(300_000, 100);

    let mut intent = intent_fixture("user-1");
    intent.privacy_notice = "missing".to_string();
    assert_eq!(
        bench.u2c.call(U2cRequest::GiveConsent(intent)).await.unwrap_err(),
        ConsentError::NoticeNotFound("missing".to_string())
    );

    let mut intent = intent_fixture("user-1");
    intent.purposes.clear();
    assert!(matches!(
        bench.u2c.call(U2cRequest::GiveConsent(intent)).await.unwrap_err(),
        ConsentError::InvalidIntent(_)
    ));
}
