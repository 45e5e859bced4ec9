//! Async gRPC clients for a consentry node.
//!
//! Thin wrappers over the generated tonic clients: [`UserClient`] drives the
//! user-facing consent lifecycle, [`ParticipantClient`] the participant-side
//! token and exchange surface. Both convert between the wire types and the
//! core data model at the boundary.

use consentry_core::{
    consent::infrastructure::records::{
        ConsentIntent, ConsentRecord, ExchangeToken, PrivacyNotice,
    },
    transport::grpc::proto,
};
use tonic::{Request, Status, transport::Channel};

/// Client for the user-facing (U2C) consent API.
pub struct UserClient {
    inner: proto::u2c_client::U2cClient<Channel>,
}

impl UserClient {
    /// Connects to a consentry node, e.g. `http://[::1]:50061`.
    pub async fn connect(endpoint: String) -> Result<Self, tonic::transport::Error> {
        Ok(Self { inner: proto::u2c_client::U2cClient::connect(endpoint).await? })
    }

    pub async fn give_consent(
        &mut self,
        intent: ConsentIntent,
    ) -> Result<ConsentRecord, Status> {
        Ok(self
            .inner
            .u2c_give_consent(Request::new(intent.into()))
            .await?
            .into_inner()
            .into())
    }

    pub async fn grant_draft(&mut self, id: String) -> Result<ConsentRecord, Status> {
        Ok(self
            .inner
            .u2c_grant_draft(Request::new(proto::messages::ConsentRef { id }))
            .await?
            .into_inner()
            .into())
    }

    pub async fn refuse_consent(&mut self, id: String) -> Result<ConsentRecord, Status> {
        Ok(self
            .inner
            .u2c_refuse_consent(Request::new(proto::messages::ConsentRef { id }))
            .await?
            .into_inner()
            .into())
    }

    pub async fn revoke_consent(&mut self, id: String) -> Result<ConsentRecord, Status> {
        Ok(self
            .inner
            .u2c_revoke_consent(Request::new(proto::messages::ConsentRef { id }))
            .await?
            .into_inner()
            .into())
    }

    pub async fn re_confirm_consent(
        &mut self,
        id: String,
        terms_changed: bool,
    ) -> Result<ConsentRecord, Status> {
        Ok(self
            .inner
            .u2c_re_confirm_consent(Request::new(proto::messages::ReConfirmRequest {
                id,
                terms_changed,
            }))
            .await?
            .into_inner()
            .into())
    }

    pub async fn terminate_consent(&mut self, id: String) -> Result<ConsentRecord, Status> {
        Ok(self
            .inner
            .u2c_terminate_consent(Request::new(proto::messages::ConsentRef { id }))
            .await?
            .into_inner()
            .into())
    }

    pub async fn get_consent(&mut self, id: String) -> Result<ConsentRecord, Status> {
        Ok(self
            .inner
            .u2c_get_consent(Request::new(proto::messages::ConsentRef { id }))
            .await?
            .into_inner()
            .into())
    }

    pub async fn list_consents(&mut self, user: String) -> Result<Vec<ConsentRecord>, Status> {
        Ok(self
            .inner
            .u2c_list_consents(Request::new(proto::messages::UserRef { user }))
            .await?
            .into_inner()
            .records
            .into_iter()
            .map(|record| record.into())
            .collect())
    }

    pub async fn get_privacy_notice(
        &mut self,
        reference: String,
    ) -> Result<PrivacyNotice, Status> {
        Ok(self
            .inner
            .u2c_get_privacy_notice(Request::new(proto::messages::NoticeRef { reference }))
            .await?
            .into_inner()
            .into())
    }

    pub async fn list_privacy_notices(
        &mut self,
        provider: String,
        consumer: String,
    ) -> Result<Vec<PrivacyNotice>, Status> {
        Ok(self
            .inner
            .u2c_list_privacy_notices(Request::new(proto::messages::ParticipantPair {
                provider,
                consumer,
            }))
            .await?
            .into_inner()
            .notices
            .into_iter()
            .map(|notice| notice.into())
            .collect())
    }

    pub async fn trigger_exchange(&mut self, id: String) -> Result<(), Status> {
        self.inner
            .u2c_trigger_exchange(Request::new(proto::messages::ConsentRef { id }))
            .await?;
        Ok(())
    }

    pub async fn redirect_target(&mut self, id: String) -> Result<String, Status> {
        Ok(self
            .inner
            .u2c_redirect_target(Request::new(proto::messages::ConsentRef { id }))
            .await?
            .into_inner()
            .uri)
    }
}

/// Client for the participant-facing (P2C) consent API.
pub struct ParticipantClient {
    inner: proto::p2c_client::P2cClient<Channel>,
}

impl ParticipantClient {
    /// Connects to a consentry node, e.g. `http://[::1]:50061`.
    pub async fn connect(endpoint: String) -> Result<Self, tonic::transport::Error> {
        Ok(Self { inner: proto::p2c_client::P2cClient::connect(endpoint).await? })
    }

    pub async fn draft_consent(
        &mut self,
        intent: ConsentIntent,
    ) -> Result<ConsentRecord, Status> {
        Ok(self
            .inner
            .p2c_draft_consent(Request::new(intent.into()))
            .await?
            .into_inner()
            .into())
    }

    pub async fn get_consent(&mut self, id: String) -> Result<ConsentRecord, Status> {
        Ok(self
            .inner
            .p2c_get_consent(Request::new(proto::messages::ConsentRef { id }))
            .await?
            .into_inner()
            .into())
    }

    pub async fn list_consents_for_user(
        &mut self,
        user: String,
    ) -> Result<Vec<ConsentRecord>, Status> {
        Ok(self
            .inner
            .p2c_list_consents_for_user(Request::new(proto::messages::UserRef { user }))
            .await?
            .into_inner()
            .records
            .into_iter()
            .map(|record| record.into())
            .collect())
    }

    pub async fn list_consents_for_pair(
        &mut self,
        provider: String,
        consumer: String,
    ) -> Result<Vec<ConsentRecord>, Status> {
        Ok(self
            .inner
            .p2c_list_consents_for_pair(Request::new(proto::messages::ParticipantPair {
                provider,
                consumer,
            }))
            .await?
            .into_inner()
            .records
            .into_iter()
            .map(|record| record.into())
            .collect())
    }

    pub async fn issue_token(&mut self, id: String) -> Result<ExchangeToken, Status> {
        Ok(self
            .inner
            .p2c_issue_token(Request::new(proto::messages::ConsentRef { id }))
            .await?
            .into_inner()
            .into())
    }

    pub async fn verify_token(&mut self, id: String, token: String) -> Result<bool, Status> {
        Ok(self
            .inner
            .p2c_verify_token(Request::new(proto::messages::VerifyTokenRequest { id, token }))
            .await?
            .into_inner()
            .valid)
    }

    pub async fn resume(&mut self, id: String) -> Result<(), Status> {
        self.inner.p2c_resume(Request::new(proto::messages::ConsentRef { id })).await?;
        Ok(())
    }

    pub async fn available_exchanges(
        &mut self,
        participant: String,
    ) -> Result<Vec<PrivacyNotice>, Status> {
        Ok(self
            .inner
            .p2c_available_exchanges(Request::new(proto::messages::ParticipantRef {
                participant,
            }))
            .await?
            .into_inner()
            .notices
            .into_iter()
            .map(|notice| notice.into())
            .collect())
    }
}
