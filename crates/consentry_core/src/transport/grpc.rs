//! # gRPC Transport Implementation
//!
//! This module provides the gRPC-based transport layer of the consentry
//! manager. It implements both the client side used by the exchange
//! orchestrator to reach participant connectors, and the server side that
//! exposes the U2C and P2C APIs to users and participants using Protocol
//! Buffers and the Tonic framework.
//!
//! ## Components
//!
//! - **C2pGrpc**: client service for outbound calls to participant
//!   connectors, with a cache of connected clients per endpoint
//! - **U2cHandler / P2cHandler**: server implementations routing incoming
//!   user and participant requests to the API service stacks
//! - **ConnectorHandler**: server implementation of the connector protocol,
//!   letting a participant connector (or a test stub) serve the C2P surface
//! - **Protocol Buffer Conversions**: type conversions between internal and
//!   protobuf types
//!
//! ## Error Mapping
//!
//! Internal errors map onto gRPC status codes by taxonomy: validation
//! failures become `InvalidArgument`, unknown references `NotFound`, illegal
//! transitions and unmet preconditions `FailedPrecondition`, concurrency
//! conflicts `Aborted`, connector unreachability `Unavailable` and exchange
//! timeouts `DeadlineExceeded`. Inversely, a connector answering with a
//! client-fault status is interpreted as an explicit rejection of the
//! exchange, while any other failure counts as transient unreachability.

use std::{future::Future, pin::Pin, sync::Arc, task::Poll};

use dashmap::DashMap;
use tonic::{Code, Request, Response, Status, transport::Channel};
use tower::Service;

/// Default port for the consentry gRPC services.
pub const DEFAULT_GRPC_PORT: u16 = 50061;

/// Protocol Buffer definitions and descriptor set for the consentry gRPC
/// services.
pub mod proto {
    tonic::include_proto!("consentry");
    pub mod primitives {
        tonic::include_proto!("consentry.primitives");
    }
    pub mod messages {
        tonic::include_proto!("consentry.messages");
    }

    /// Pre-compiled Protocol Buffer descriptor set for service reflection.
    pub const CONSENTRY_DESCRIPTOR_SET: &[u8] =
        include_bytes!(concat!(env!("OUT_DIR"), "/consentry_descriptor.bin"));
}

use crate::consent::{
    api::types::{
        C2pRequest, C2pResponse, P2cRequest, P2cResponse, U2cRequest, U2cResponse,
    },
    error::ConsentError,
    infrastructure::records::{
        ConsentEvent, ConsentEventKind, ConsentIntent, ConsentRecord, ConsentStatus,
        ControllerDetails, ExchangeToken, InternationalTransfers, PrivacyNotice, Purpose,
        ThirdPartyRecipient,
    },
};

/// Converts consent errors to gRPC status codes for wire transmission.
impl From<ConsentError> for Status {
    fn from(error: ConsentError) -> Self {
        let message = error.to_string();
        match error {
            ConsentError::InvalidIntent(_) | ConsentError::InvalidEventKind(_) => {
                Status::invalid_argument(message)
            }
            ConsentError::RecordNotFound(_)
            | ConsentError::NoticeNotFound(_)
            | ConsentError::ParticipantNotFound(_) => Status::not_found(message),
            ConsentError::InvalidTransition { .. }
            | ConsentError::NotGranted(_)
            | ConsentError::NoticeArchived(_)
            | ConsentError::MissingExchangeEndpoint(_)
            | ConsentError::ExchangeRejected(_) => Status::failed_precondition(message),
            ConsentError::ExchangeInFlight(_) | ConsentError::StoreConflict(_) => {
                Status::aborted(message)
            }
            ConsentError::DuplicateRecord(_) => Status::already_exists(message),
            ConsentError::ConnectorUnreachable(_) => Status::unavailable(message),
            ConsentError::ExchangeTimeout(_) => Status::deadline_exceeded(message),
            ConsentError::InternalConsentryError | ConsentError::SystemTimeError => {
                Status::internal(message)
            }
        }
    }
}

/// Interprets a connector's gRPC status: client-fault codes are an explicit
/// rejection of the exchange, everything else is transient unreachability.
fn interpret_connector_status(status: Status, endpoint: String) -> ConsentError {
    match status.code() {
        Code::InvalidArgument
        | Code::FailedPrecondition
        | Code::PermissionDenied
        | Code::NotFound
        | Code::Aborted => ConsentError::ExchangeRejected(status.message().to_string()),
        _ => ConsentError::ConnectorUnreachable(endpoint),
    }
}

// Protocol Buffer conversions

impl From<ConsentStatus> for proto::primitives::ConsentStatus {
    fn from(status: ConsentStatus) -> Self {
        match status {
            ConsentStatus::Pending => proto::primitives::ConsentStatus::Pending,
            ConsentStatus::Granted => proto::primitives::ConsentStatus::Granted,
            ConsentStatus::Refused => proto::primitives::ConsentStatus::Refused,
            ConsentStatus::Revoked => proto::primitives::ConsentStatus::Revoked,
            ConsentStatus::Terminated => proto::primitives::ConsentStatus::Terminated,
            ConsentStatus::Expired => proto::primitives::ConsentStatus::Expired,
        }
    }
}

impl From<proto::primitives::ConsentStatus> for ConsentStatus {
    fn from(status: proto::primitives::ConsentStatus) -> Self {
        match status {
            proto::primitives::ConsentStatus::Granted => ConsentStatus::Granted,
            proto::primitives::ConsentStatus::Refused => ConsentStatus::Refused,
            proto::primitives::ConsentStatus::Revoked => ConsentStatus::Revoked,
            proto::primitives::ConsentStatus::Terminated => ConsentStatus::Terminated,
            proto::primitives::ConsentStatus::Expired => ConsentStatus::Expired,
            proto::primitives::ConsentStatus::Pending
            | proto::primitives::ConsentStatus::Unspecified => ConsentStatus::Pending,
        }
    }
}

impl From<Purpose> for proto::primitives::Purpose {
    fn from(purpose: Purpose) -> Self {
        Self { purpose: purpose.purpose, legal_basis: purpose.legal_basis }
    }
}

impl From<proto::primitives::Purpose> for Purpose {
    fn from(purpose: proto::primitives::Purpose) -> Self {
        Self { purpose: purpose.purpose, legal_basis: purpose.legal_basis }
    }
}

impl From<ConsentEvent> for proto::primitives::ConsentEvent {
    fn from(event: ConsentEvent) -> Self {
        Self {
            kind: event.kind.to_string(),
            event_time: event.event_time,
            validity_duration: event.validity_duration,
            event_type: event.event_type,
        }
    }
}

impl TryFrom<proto::primitives::ConsentEvent> for ConsentEvent {
    type Error = ConsentError;

    fn try_from(event: proto::primitives::ConsentEvent) -> Result<Self, Self::Error> {
        Ok(Self {
            kind: ConsentEventKind::try_from(event.kind.as_str())?,
            event_time: event.event_time,
            validity_duration: event.validity_duration,
            event_type: event.event_type,
        })
    }
}

impl From<ExchangeToken> for proto::primitives::ExchangeToken {
    fn from(token: ExchangeToken) -> Self {
        Self { value: token.value, issued_at: token.issued_at, expires_at: token.expires_at }
    }
}

impl From<proto::primitives::ExchangeToken> for ExchangeToken {
    fn from(token: proto::primitives::ExchangeToken) -> Self {
        Self { value: token.value, issued_at: token.issued_at, expires_at: token.expires_at }
    }
}

impl From<ThirdPartyRecipient> for proto::primitives::ThirdPartyRecipient {
    fn from(recipient: ThirdPartyRecipient) -> Self {
        Self {
            name: recipient.name,
            location: recipient.location,
            nature_of_data_access: recipient.nature_of_data_access,
        }
    }
}

impl From<proto::primitives::ThirdPartyRecipient> for ThirdPartyRecipient {
    fn from(recipient: proto::primitives::ThirdPartyRecipient) -> Self {
        Self {
            name: recipient.name,
            location: recipient.location,
            nature_of_data_access: recipient.nature_of_data_access,
        }
    }
}

impl From<ControllerDetails> for proto::primitives::ControllerDetails {
    fn from(details: ControllerDetails) -> Self {
        Self {
            name: details.name,
            contact: details.contact,
            representative: details.representative.unwrap_or_default(),
            dpo_name: details.dpo_name.unwrap_or_default(),
            dpo_contact: details.dpo_contact.unwrap_or_default(),
        }
    }
}

impl From<proto::primitives::ControllerDetails> for ControllerDetails {
    fn from(details: proto::primitives::ControllerDetails) -> Self {
        Self {
            name: details.name,
            contact: details.contact,
            representative: non_empty(details.representative),
            dpo_name: non_empty(details.dpo_name),
            dpo_contact: non_empty(details.dpo_contact),
        }
    }
}

impl From<InternationalTransfers> for proto::primitives::InternationalTransfers {
    fn from(transfers: InternationalTransfers) -> Self {
        Self { countries: transfers.countries, safeguards: transfers.safeguards }
    }
}

impl From<proto::primitives::InternationalTransfers> for InternationalTransfers {
    fn from(transfers: proto::primitives::InternationalTransfers) -> Self {
        Self { countries: transfers.countries, safeguards: transfers.safeguards }
    }
}

/// Empty wire strings stand for absent optional fields.
fn non_empty(value: String) -> Option<String> {
    if value.is_empty() { None } else { Some(value) }
}

impl From<ConsentRecord> for proto::primitives::ConsentRecord {
    fn from(record: ConsentRecord) -> Self {
        Self {
            id: record.id,
            user: record.user.unwrap_or_default(),
            provider_user_identifier: record.provider_user_identifier,
            consumer_user_identifier: record.consumer_user_identifier,
            data_provider: record.data_provider,
            data_consumer: record.data_consumer,
            purposes: record.purposes.into_iter().map(|p| p.into()).collect(),
            data: record.data,
            recipients: record.recipients,
            status: proto::primitives::ConsentStatus::from(record.status).into(),
            privacy_notice: record.privacy_notice,
            contract: record.contract.unwrap_or_default(),
            withdrawal_method: record.withdrawal_method.unwrap_or_default(),
            retention_period: record.retention_period.unwrap_or_default(),
            processing_locations: record.processing_locations,
            storage_locations: record.storage_locations,
            recipient_third_parties: record
                .recipient_third_parties
                .into_iter()
                .map(|r| r.into())
                .collect(),
            pii_principal_rights: record.pii_principal_rights,
            token: record.token.map(|t| t.into()),
            events: record.events.into_iter().map(|e| e.into()).collect(),
            valid_until: record.valid_until.unwrap_or_default(),
            jsonld: record.jsonld,
            schema_version: record.schema_version,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

impl From<proto::primitives::ConsentRecord> for ConsentRecord {
    fn from(record: proto::primitives::ConsentRecord) -> Self {
        Self {
            id: record.id,
            user: non_empty(record.user),
            provider_user_identifier: record.provider_user_identifier,
            consumer_user_identifier: record.consumer_user_identifier,
            data_provider: record.data_provider,
            data_consumer: record.data_consumer,
            purposes: record.purposes.into_iter().map(|p| p.into()).collect(),
            data: record.data,
            recipients: record.recipients,
            status: proto::primitives::ConsentStatus::try_from(record.status)
                .unwrap_or_default()
                .into(),
            privacy_notice: record.privacy_notice,
            contract: non_empty(record.contract),
            withdrawal_method: non_empty(record.withdrawal_method),
            retention_period: non_empty(record.retention_period),
            processing_locations: record.processing_locations,
            storage_locations: record.storage_locations,
            recipient_third_parties: record
                .recipient_third_parties
                .into_iter()
                .map(|r| r.into())
                .collect(),
            pii_principal_rights: record.pii_principal_rights,
            token: record.token.map(|t| t.into()),
            events: record
                .events
                .into_iter()
                .filter_map(|e| ConsentEvent::try_from(e).ok())
                .collect(),
            valid_until: (record.valid_until != 0).then_some(record.valid_until),
            jsonld: record.jsonld,
            schema_version: record.schema_version,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

impl From<PrivacyNotice> for proto::primitives::PrivacyNotice {
    fn from(notice: PrivacyNotice) -> Self {
        Self {
            id: notice.id,
            title: notice.title,
            last_updated: notice.last_updated,
            data_provider: notice.data_provider,
            data_consumer: notice.data_consumer,
            contract: notice.contract.unwrap_or_default(),
            controller_details: Some(notice.controller_details.into()),
            purposes: notice.purposes.into_iter().map(|p| p.into()).collect(),
            data: notice.data,
            categories_of_data: notice.categories_of_data,
            recipients: notice.recipients,
            international_transfers: notice.international_transfers.map(|t| t.into()),
            retention_period: notice.retention_period,
            pii_principal_rights: notice.pii_principal_rights,
            withdrawal_of_consent: notice.withdrawal_of_consent,
            complaint_rights: notice.complaint_rights,
            provision_requirements: notice.provision_requirements,
            automated_decision_making: notice.automated_decision_making.unwrap_or_default(),
            archived_at: notice.archived_at.unwrap_or_default(),
            jsonld: notice.jsonld,
            schema_version: notice.schema_version,
        }
    }
}

impl From<proto::primitives::PrivacyNotice> for PrivacyNotice {
    fn from(notice: proto::primitives::PrivacyNotice) -> Self {
        Self {
            id: notice.id,
            title: notice.title,
            last_updated: notice.last_updated,
            data_provider: notice.data_provider,
            data_consumer: notice.data_consumer,
            contract: non_empty(notice.contract),
            controller_details: notice.controller_details.map(|d| d.into()).unwrap_or_default(),
            purposes: notice.purposes.into_iter().map(|p| p.into()).collect(),
            data: notice.data,
            categories_of_data: notice.categories_of_data,
            recipients: notice.recipients,
            international_transfers: notice.international_transfers.map(|t| t.into()),
            retention_period: notice.retention_period,
            pii_principal_rights: notice.pii_principal_rights,
            withdrawal_of_consent: notice.withdrawal_of_consent,
            complaint_rights: notice.complaint_rights,
            provision_requirements: notice.provision_requirements,
            automated_decision_making: non_empty(notice.automated_decision_making),
            archived_at: (notice.archived_at != 0).then_some(notice.archived_at),
            jsonld: notice.jsonld,
            schema_version: notice.schema_version,
        }
    }
}

impl From<ConsentIntent> for proto::messages::ConsentIntent {
    fn from(intent: ConsentIntent) -> Self {
        Self {
            user: intent.user.unwrap_or_default(),
            provider_user_identifier: intent.provider_user_identifier,
            consumer_user_identifier: intent.consumer_user_identifier,
            data_provider: intent.data_provider,
            data_consumer: intent.data_consumer,
            purposes: intent.purposes.into_iter().map(|p| p.into()).collect(),
            data: intent.data,
            recipients: intent.recipients,
            privacy_notice: intent.privacy_notice,
            contract: intent.contract.unwrap_or_default(),
            withdrawal_method: intent.withdrawal_method.unwrap_or_default(),
            retention_period: intent.retention_period.unwrap_or_default(),
            processing_locations: intent.processing_locations,
            storage_locations: intent.storage_locations,
            recipient_third_parties: intent
                .recipient_third_parties
                .into_iter()
                .map(|r| r.into())
                .collect(),
            pii_principal_rights: intent.pii_principal_rights,
            jsonld: intent.jsonld,
            schema_version: intent.schema_version,
        }
    }
}

impl From<proto::messages::ConsentIntent> for ConsentIntent {
    fn from(intent: proto::messages::ConsentIntent) -> Self {
        Self {
            user: non_empty(intent.user),
            provider_user_identifier: intent.provider_user_identifier,
            consumer_user_identifier: intent.consumer_user_identifier,
            data_provider: intent.data_provider,
            data_consumer: intent.data_consumer,
            purposes: intent.purposes.into_iter().map(|p| p.into()).collect(),
            data: intent.data,
            recipients: intent.recipients,
            privacy_notice: intent.privacy_notice,
            contract: non_empty(intent.contract),
            withdrawal_method: non_empty(intent.withdrawal_method),
            retention_period: non_empty(intent.retention_period),
            processing_locations: intent.processing_locations,
            storage_locations: intent.storage_locations,
            recipient_third_parties: intent
                .recipient_third_parties
                .into_iter()
                .map(|r| r.into())
                .collect(),
            pii_principal_rights: intent.pii_principal_rights,
            jsonld: intent.jsonld,
            schema_version: intent.schema_version,
        }
    }
}

/// gRPC client service for outbound connector communication.
///
/// `C2pGrpc` provides the client-side implementation for calling
/// participant connectors. It maintains a thread-safe cache of connected
/// clients per endpoint so connections are established lazily and reused
/// for subsequent requests.
#[derive(Default, Clone)]
pub struct C2pGrpc {
    /// Cache of established connector clients indexed by endpoint.
    connected_connectors: Arc<DashMap<String, proto::c2p_client::C2pClient<Channel>>>,
}

impl C2pGrpc {
    /// Establishes a new connection to a participant connector and caches it.
    async fn connect_connector(
        &self,
        endpoint: String,
    ) -> Result<proto::c2p_client::C2pClient<Channel>, ConsentError> {
        match proto::c2p_client::C2pClient::connect(endpoint.clone()).await {
            Ok(client) => {
                self.connected_connectors.insert(endpoint, client.clone());
                Ok(client)
            }
            Err(_) => Err(ConsentError::ConnectorUnreachable(endpoint)),
        }
    }

    /// Retrieves a cached client or establishes a new connection if needed.
    async fn get_client_or_connect(
        &self,
        endpoint: String,
    ) -> Result<proto::c2p_client::C2pClient<Channel>, ConsentError> {
        match self.connected_connectors.get(&endpoint).map(|c| c.to_owned()) {
            Some(client) => Ok(client),
            None => self.connect_connector(endpoint).await,
        }
    }
}

impl Service<C2pRequest> for C2pGrpc {
    type Response = C2pResponse;
    type Error = ConsentError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _: &mut std::task::Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: C2pRequest) -> Self::Future {
        let this = self.clone();
        Box::pin(async move {
            let endpoint = request.endpoint().to_string();
            let mut client = this.get_client_or_connect(endpoint.clone()).await?;
            match request {
                C2pRequest::DataExchange {
                    endpoint,
                    consent_id,
                    token,
                    data,
                    provider_user_identifier,
                    consumer_user_identifier,
                    data_provider,
                } => {
                    let proto_req = proto::messages::DataExchangeRequest {
                        endpoint: endpoint.clone(),
                        consent_id,
                        token,
                        data,
                        provider_user_identifier,
                        consumer_user_identifier,
                        data_provider,
                    };

                    client
                        .c2p_data_exchange(Request::new(proto_req))
                        .await
                        .map_err(|status| interpret_connector_status(status, endpoint))?;
                    Ok(C2pResponse::Ack)
                }
                C2pRequest::RevocationNotice { endpoint, consent_id } => {
                    let proto_req = proto::messages::RevocationNotice {
                        endpoint: endpoint.clone(),
                        consent_id,
                    };

                    client
                        .c2p_revocation_notice(Request::new(proto_req))
                        .await
                        .map_err(|status| interpret_connector_status(status, endpoint))?;
                    Ok(C2pResponse::Ack)
                }
            }
        })
    }
}

/// gRPC server handler for user-facing operations.
pub struct U2cHandler<U2cApi> {
    /// User-to-consentry service handler.
    u2c: U2cApi,
}

impl<U2cApi> U2cHandler<U2cApi> {
    /// Creates a new handler with the specified service stack.
    pub fn new(u2c: U2cApi) -> Self {
        Self { u2c }
    }
}

#[tonic::async_trait]
impl<U2cApi> proto::u2c_server::U2c for U2cHandler<U2cApi>
where
    U2cApi: Service<U2cRequest, Response = U2cResponse, Error = ConsentError>
        + Clone
        + Sync
        + Send
        + 'static,
    U2cApi::Future: Send,
{
    /// Handles consent submission from the data subject.
    async fn u2c_give_consent(
        &self,
        request: Request<proto::messages::ConsentIntent>,
    ) -> Result<Response<proto::primitives::ConsentRecord>, Status> {
        let req = request.into_inner();
        let mut u2c = self.u2c.clone();
        match u2c.call(U2cRequest::GiveConsent(req.into())).await? {
            U2cResponse::Record(record) => Ok(Response::new(record.into())),
            _ => Err(Status::internal("Internal consent API error")),
        }
    }

    /// Handles acceptance of a previously drafted record.
    async fn u2c_grant_draft(
        &self,
        request: Request<proto::messages::ConsentRef>,
    ) -> Result<Response<proto::primitives::ConsentRecord>, Status> {
        let req = request.into_inner();
        let mut u2c = self.u2c.clone();
        match u2c.call(U2cRequest::GrantDraft(req.id)).await? {
            U2cResponse::Record(record) => Ok(Response::new(record.into())),
            _ => Err(Status::internal("Internal consent API error")),
        }
    }

    /// Handles refusal of a pending consent.
    async fn u2c_refuse_consent(
        &self,
        request: Request<proto::messages::ConsentRef>,
    ) -> Result<Response<proto::primitives::ConsentRecord>, Status> {
        let req = request.into_inner();
        let mut u2c = self.u2c.clone();
        match u2c.call(U2cRequest::RefuseConsent(req.id)).await? {
            U2cResponse::Record(record) => Ok(Response::new(record.into())),
            _ => Err(Status::internal("Internal consent API error")),
        }
    }

    /// Handles withdrawal of a granted consent.
    async fn u2c_revoke_consent(
        &self,
        request: Request<proto::messages::ConsentRef>,
    ) -> Result<Response<proto::primitives::ConsentRecord>, Status> {
        let req = request.into_inner();
        let mut u2c = self.u2c.clone();
        match u2c.call(U2cRequest::RevokeConsent(req.id)).await? {
            U2cResponse::Record(record) => Ok(Response::new(record.into())),
            _ => Err(Status::internal("Internal consent API error")),
        }
    }

    /// Handles re-confirmation of a granted consent.
    async fn u2c_re_confirm_consent(
        &self,
        request: Request<proto::messages::ReConfirmRequest>,
    ) -> Result<Response<proto::primitives::ConsentRecord>, Status> {
        let req = request.into_inner();
        let mut u2c = self.u2c.clone();
        match u2c
            .call(U2cRequest::ReConfirmConsent { id: req.id, terms_changed: req.terms_changed })
            .await?
        {
            U2cResponse::Record(record) => Ok(Response::new(record.into())),
            _ => Err(Status::internal("Internal consent API error")),
        }
    }

    /// Handles contract-level termination of a consent.
    async fn u2c_terminate_consent(
        &self,
        request: Request<proto::messages::ConsentRef>,
    ) -> Result<Response<proto::primitives::ConsentRecord>, Status> {
        let req = request.into_inner();
        let mut u2c = self.u2c.clone();
        match u2c.call(U2cRequest::TerminateConsent(req.id)).await? {
            U2cResponse::Record(record) => Ok(Response::new(record.into())),
            _ => Err(Status::internal("Internal consent API error")),
        }
    }

    /// Handles single-record consultation.
    async fn u2c_get_consent(
        &self,
        request: Request<proto::messages::ConsentRef>,
    ) -> Result<Response<proto::primitives::ConsentRecord>, Status> {
        let req = request.into_inner();
        let mut u2c = self.u2c.clone();
        match u2c.call(U2cRequest::GetConsent(req.id)).await? {
            U2cResponse::Record(record) => Ok(Response::new(record.into())),
            _ => Err(Status::internal("Internal consent API error")),
        }
    }

    /// Handles listing of the user's consent records.
    async fn u2c_list_consents(
        &self,
        request: Request<proto::messages::UserRef>,
    ) -> Result<Response<proto::messages::ConsentRecordList>, Status> {
        let req = request.into_inner();
        let mut u2c = self.u2c.clone();
        match u2c.call(U2cRequest::ListConsents(req.user)).await? {
            U2cResponse::Records(records) => Ok(Response::new(proto::messages::ConsentRecordList {
                records: records.into_iter().map(|r| r.into()).collect(),
            })),
            _ => Err(Status::internal("Internal consent API error")),
        }
    }

    /// Handles privacy notice resolution for display.
    async fn u2c_get_privacy_notice(
        &self,
        request: Request<proto::messages::NoticeRef>,
    ) -> Result<Response<proto::primitives::PrivacyNotice>, Status> {
        let req = request.into_inner();
        let mut u2c = self.u2c.clone();
        match u2c.call(U2cRequest::GetPrivacyNotice(req.reference)).await? {
            U2cResponse::Notice(notice) => Ok(Response::new(notice.into())),
            _ => Err(Status::internal("Internal consent API error")),
        }
    }

    /// Handles listing of the live notices offered between a pair.
    async fn u2c_list_privacy_notices(
        &self,
        request: Request<proto::messages::ParticipantPair>,
    ) -> Result<Response<proto::messages::PrivacyNoticeList>, Status> {
        let req = request.into_inner();
        let mut u2c = self.u2c.clone();
        match u2c
            .call(U2cRequest::ListPrivacyNotices { provider: req.provider, consumer: req.consumer })
            .await?
        {
            U2cResponse::Notices(notices) => Ok(Response::new(proto::messages::PrivacyNoticeList {
                notices: notices.into_iter().map(|n| n.into()).collect(),
            })),
            _ => Err(Status::internal("Internal consent API error")),
        }
    }

    /// Handles the data-exchange trigger for a granted consent.
    async fn u2c_trigger_exchange(
        &self,
        request: Request<proto::messages::ConsentRef>,
    ) -> Result<Response<proto::messages::Ack>, Status> {
        let req = request.into_inner();
        let mut u2c = self.u2c.clone();
        match u2c.call(U2cRequest::TriggerExchange(req.id)).await? {
            U2cResponse::ExchangeFulfilled => Ok(Response::new(proto::messages::Ack {})),
            _ => Err(Status::internal("Internal consent API error")),
        }
    }

    /// Handles resolution of the interactive-confirmation redirect URI.
    async fn u2c_redirect_target(
        &self,
        request: Request<proto::messages::ConsentRef>,
    ) -> Result<Response<proto::messages::RedirectUri>, Status> {
        let req = request.into_inner();
        let mut u2c = self.u2c.clone();
        match u2c.call(U2cRequest::RedirectTarget(req.id)).await? {
            U2cResponse::Redirect(uri) => {
                Ok(Response::new(proto::messages::RedirectUri { uri }))
            }
            _ => Err(Status::internal("Internal consent API error")),
        }
    }
}

/// gRPC server handler for participant-facing operations.
pub struct P2cHandler<P2cApi> {
    /// Participant-to-consentry service handler.
    p2c: P2cApi,
}

impl<P2cApi> P2cHandler<P2cApi> {
    /// Creates a new handler with the specified service stack.
    pub fn new(p2c: P2cApi) -> Self {
        Self { p2c }
    }
}

#[tonic::async_trait]
impl<P2cApi> proto::p2c_server::P2c for P2cHandler<P2cApi>
where
    P2cApi: Service<P2cRequest, Response = P2cResponse, Error = ConsentError>
        + Clone
        + Sync
        + Send
        + 'static,
    P2cApi::Future: Send,
{
    /// Handles participant-initiated consent drafts.
    async fn p2c_draft_consent(
        &self,
        request: Request<proto::messages::ConsentIntent>,
    ) -> Result<Response<proto::primitives::ConsentRecord>, Status> {
        let req = request.into_inner();
        let mut p2c = self.p2c.clone();
        match p2c.call(P2cRequest::DraftConsent(req.into())).await? {
            P2cResponse::Record(record) => Ok(Response::new(record.into())),
            _ => Err(Status::internal("Internal consent API error")),
        }
    }

    /// Handles single-record consultation by a participant.
    async fn p2c_get_consent(
        &self,
        request: Request<proto::messages::ConsentRef>,
    ) -> Result<Response<proto::primitives::ConsentRecord>, Status> {
        let req = request.into_inner();
        let mut p2c = self.p2c.clone();
        match p2c.call(P2cRequest::GetConsent(req.id)).await? {
            P2cResponse::Record(record) => Ok(Response::new(record.into())),
            _ => Err(Status::internal("Internal consent API error")),
        }
    }

    /// Handles listing of a user's records for a participant.
    async fn p2c_list_consents_for_user(
        &self,
        request: Request<proto::messages::UserRef>,
    ) -> Result<Response<proto::messages::ConsentRecordList>, Status> {
        let req = request.into_inner();
        let mut p2c = self.p2c.clone();
        match p2c.call(P2cRequest::ListConsentsForUser(req.user)).await? {
            P2cResponse::Records(records) => Ok(Response::new(proto::messages::ConsentRecordList {
                records: records.into_iter().map(|r| r.into()).collect(),
            })),
            _ => Err(Status::internal("Internal consent API error")),
        }
    }

    /// Handles listing of the records between a participant pair.
    async fn p2c_list_consents_for_pair(
        &self,
        request: Request<proto::messages::ParticipantPair>,
    ) -> Result<Response<proto::messages::ConsentRecordList>, Status> {
        let req = request.into_inner();
        let mut p2c = self.p2c.clone();
        match p2c
            .call(P2cRequest::ListConsentsForPair {
                provider: req.provider,
                consumer: req.consumer,
            })
            .await?
        {
            P2cResponse::Records(records) => Ok(Response::new(proto::messages::ConsentRecordList {
                records: records.into_iter().map(|r| r.into()).collect(),
            })),
            _ => Err(Status::internal("Internal consent API error")),
        }
    }

    /// Handles token issuance for a granted consent.
    async fn p2c_issue_token(
        &self,
        request: Request<proto::messages::ConsentRef>,
    ) -> Result<Response<proto::primitives::ExchangeToken>, Status> {
        let req = request.into_inner();
        let mut p2c = self.p2c.clone();
        match p2c.call(P2cRequest::IssueToken(req.id)).await? {
            P2cResponse::Token(token) => Ok(Response::new(token.into())),
            _ => Err(Status::internal("Internal consent API error")),
        }
    }

    /// Handles non-consuming token verification.
    async fn p2c_verify_token(
        &self,
        request: Request<proto::messages::VerifyTokenRequest>,
    ) -> Result<Response<proto::messages::TokenVerdict>, Status> {
        let req = request.into_inner();
        let mut p2c = self.p2c.clone();
        match p2c.call(P2cRequest::VerifyToken { id: req.id, token: req.token }).await? {
            P2cResponse::Verified(valid) => {
                Ok(Response::new(proto::messages::TokenVerdict { valid }))
            }
            _ => Err(Status::internal("Internal consent API error")),
        }
    }

    /// Handles exchange resumption after an interactive confirmation step.
    async fn p2c_resume(
        &self,
        request: Request<proto::messages::ConsentRef>,
    ) -> Result<Response<proto::messages::Ack>, Status> {
        let req = request.into_inner();
        let mut p2c = self.p2c.clone();
        match p2c.call(P2cRequest::Resume(req.id)).await? {
            P2cResponse::ExchangeFulfilled => Ok(Response::new(proto::messages::Ack {})),
            _ => Err(Status::internal("Internal consent API error")),
        }
    }

    /// Handles exchange offer discovery for a participant.
    async fn p2c_available_exchanges(
        &self,
        request: Request<proto::messages::ParticipantRef>,
    ) -> Result<Response<proto::messages::PrivacyNoticeList>, Status> {
        let req = request.into_inner();
        let mut p2c = self.p2c.clone();
        match p2c.call(P2cRequest::AvailableExchanges(req.participant)).await? {
            P2cResponse::Notices(notices) => Ok(Response::new(proto::messages::PrivacyNoticeList {
                notices: notices.into_iter().map(|n| n.into()).collect(),
            })),
            _ => Err(Status::internal("Internal consent API error")),
        }
    }
}

/// gRPC server handler for the connector protocol.
///
/// Lets a participant connector implementation, or a scripted stub in tests,
/// serve the C2P surface the exchange orchestrator calls.
pub struct ConnectorHandler<Connector> {
    /// Connector service handler.
    connector: Connector,
}

impl<Connector> ConnectorHandler<Connector> {
    /// Creates a new handler with the specified connector service.
    pub fn new(connector: Connector) -> Self {
        Self { connector }
    }
}

#[tonic::async_trait]
impl<Connector> proto::c2p_server::C2p for ConnectorHandler<Connector>
where
    Connector: Service<C2pRequest, Response = C2pResponse, Error = ConsentError>
        + Clone
        + Sync
        + Send
        + 'static,
    Connector::Future: Send,
{
    /// Handles an exchange handoff delivered by a consent manager.
    async fn c2p_data_exchange(
        &self,
        request: Request<proto::messages::DataExchangeRequest>,
    ) -> Result<Response<proto::messages::Ack>, Status> {
        let req = request.into_inner();
        let mut connector = self.connector.clone();
        match connector
            .call(C2pRequest::DataExchange {
                endpoint: req.endpoint,
                consent_id: req.consent_id,
                token: req.token,
                data: req.data,
                provider_user_identifier: req.provider_user_identifier,
                consumer_user_identifier: req.consumer_user_identifier,
                data_provider: req.data_provider,
            })
            .await?
        {
            C2pResponse::Ack => Ok(Response::new(proto::messages::Ack {})),
        }
    }

    /// Handles a revocation notice delivered by a consent manager.
    async fn c2p_revocation_notice(
        &self,
        request: Request<proto::messages::RevocationNotice>,
    ) -> Result<Response<proto::messages::Ack>, Status> {
        let req = request.into_inner();
        let mut connector = self.connector.clone();
        match connector
            .call(C2pRequest::RevocationNotice {
                endpoint: req.endpoint,
                consent_id: req.consent_id,
            })
            .await?
        {
            C2pResponse::Ack => Ok(Response::new(proto::messages::Ack {})),
        }
    }
}
