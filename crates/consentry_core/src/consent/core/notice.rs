//! Privacy notice service.
//!
//! Thin read-mostly collaborator resolving a consent's declared
//! privacy-notice reference to its content for display and audit, plus the
//! registration/archival surface that keeps notice versions immutable once
//! archived.

use std::{future::Future, pin::Pin, task::Poll};

use tower::Service;
#[cfg(feature = "consentry_tracing")]
use tracing::info;

use uuid::Uuid;

use crate::consent::{
    api::types::{NoticeRequest, NoticeResponse},
    error::ConsentError,
    infrastructure::{records::now_millis, store::NoticeStore},
};

/// Notice registration and resolution over the notice store.
#[derive(Default, Debug, Clone)]
pub struct NoticeService {
    notices: NoticeStore,
}

impl NoticeService {
    pub fn new(notices: NoticeStore) -> Self {
        Self { notices }
    }
}

impl Service<NoticeRequest> for NoticeService {
    type Response = NoticeResponse;
    type Error = ConsentError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _: &mut std::task::Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: NoticeRequest) -> Self::Future {
        let this = self.clone();
        Box::pin(async move {
            match request {
                NoticeRequest::Register(mut notice) => {
                    if notice.id.is_empty() {
                        notice.id = Uuid::new_v4().to_string();
                    }
                    #[cfg(feature = "consentry_tracing")]
                    info!("[notice] Register: id: {}", notice.id);
                    this.notices.register(notice).map(NoticeResponse::Notice)
                }
                NoticeRequest::Resolve(reference) => {
                    #[cfg(feature = "consentry_tracing")]
                    info!("[notice] Resolve: reference: {}", reference);
                    this.notices.resolve(&reference).map(NoticeResponse::Notice)
                }
                NoticeRequest::Archive(reference) => {
                    #[cfg(feature = "consentry_tracing")]
                    info!("[notice] Archive: reference: {}", reference);
                    let now = now_millis()?;
                    this.notices.archive(&reference, now).map(NoticeResponse::Notice)
                }
                NoticeRequest::ListByPair { provider, consumer } => {
                    Ok(NoticeResponse::Notices(this.notices.list_by_pair(&provider, &consumer)))
                }
                NoticeRequest::ListByContract(contract) => {
                    Ok(NoticeResponse::Notices(this.notices.list_by_contract(&contract)))
                }
                NoticeRequest::ListForParticipant(participant) => {
                    Ok(NoticeResponse::Notices(this.notices.list_for_participant(&participant)))
                }
            }
        })
    }
}
