//! Consent API type definitions.
//!
//! This module defines all request and response types for the consentry
//! consent manager, which mediates personal-data sharing consent between a
//! data subject, a data-providing participant and a data-consuming
//! participant inside a federated dataspace.
//!
//! The API is organized into two inbound surfaces and one outbound surface:
//!
//! ## User-to-Consentry (U2C) API
//! Lifecycle actions performed by the data subject: giving, refusing,
//! revoking, re-confirming and terminating consent, consulting privacy
//! notices, and triggering the data exchange for a granted consent.
//!
//! ## Participant-to-Consentry (P2C) API
//! Operations performed by provider/consumer participants: drafting
//! participant-initiated records, consulting consents for their users,
//! issuing and verifying exchange tokens, and resuming interrupted
//! exchanges.
//!
//! ## Consentry-to-Participant (C2P) calls
//! Outbound calls the exchange orchestrator makes against a participant
//! connector: the exchange handoff carrying the verification token, and the
//! best-effort revocation notice.
//!
//! ## Internal Service APIs
//! Request/response types for the core services:
//! - **Lifecycle**: the consent state machine and its queries
//! - **Token**: issuance, verification and consumption of exchange tokens
//! - **Exchange**: orchestration of the cross-participant handoff
//! - **Notice**: registration and resolution of privacy notices

use crate::consent::infrastructure::records::{
    ConsentIntent, ConsentRecord, ExchangeToken, PrivacyNotice,
};

/// Lifecycle service request types.
///
/// Internal API of the consent state machine. Every mutating request is
/// linearized per record through the store's conditional update; an illegal
/// transition is rejected without touching the record.
#[derive(Debug, Clone)]
pub enum LifecycleRequest {
    /// Create a pending record from a fully-populated intent without
    /// granting it.
    ///
    /// Used by participant-initiated flows where the data subject accepts
    /// later (e.g. after an out-of-band validation step).
    Draft(ConsentIntent),

    /// Validate an intent and commit it directly as a granted record.
    ///
    /// Stamps a `Given` event. Fails with `InvalidIntent` when required
    /// fields are missing and `NoticeNotFound` when the referenced privacy
    /// notice does not resolve.
    Give(ConsentIntent),

    /// Grant a previously drafted pending record.
    ///
    /// Completes the draft/validation flow and the re-acceptance flow after
    /// a material change of terms.
    Grant(String),

    /// Refuse a pending record. Allowed only from `Pending`.
    Refuse(String),

    /// Withdraw a granted consent. Allowed only from `Granted`.
    Revoke(String),

    /// Re-stamp a grant, or re-open it for re-acceptance.
    ///
    /// With `terms_changed` unset this only appends a `ReConfirmed` event;
    /// with it set, the record returns to `Pending` so the subject can
    /// re-accept the changed terms.
    ReConfirm {
        /// Record identifier
        id: String,
        /// Whether the grant's terms changed materially since acceptance
        terms_changed: bool,
    },

    /// End the consent at contract level. Allowed from `Pending` and
    /// `Granted`, as either side of the contract may end it.
    Terminate(String),

    /// System-triggered expiry once the validity window elapsed. Allowed
    /// only from `Granted`.
    Expire(String),

    /// Fetch one record by identifier.
    Get(String),

    /// All records owned by a user.
    ListByUser(String),

    /// All records between a provider and a consumer participant.
    ListByPair {
        /// Provider participant identifier
        provider: String,
        /// Consumer participant identifier
        consumer: String,
    },
}

/// Lifecycle service response types.
#[derive(Debug, Clone, PartialEq)]
pub enum LifecycleResponse {
    /// The record after the transition or lookup.
    Record(ConsentRecord),
    /// Result set of a list query, most recently updated first.
    Records(Vec<ConsentRecord>),
}

/// Token service request types.
///
/// API of the token service, which binds short-lived single-use verification
/// tokens to granted consent records.
#[derive(Debug, Clone)]
pub enum TokenRequest {
    /// Issue a fresh token bound to the record.
    ///
    /// Requires the record to be `Granted`. Overwrites any previously bound
    /// token; the last writer's token is authoritative.
    Issue(String),

    /// Check a presented token against the bound one.
    ///
    /// Non-consuming: a verification probe never burns the token, so a
    /// remote participant can self-check before attempting delivery.
    Verify {
        /// Record identifier
        id: String,
        /// Token value presented by the bearer
        token: String,
    },

    /// Clear the bound token.
    ///
    /// The explicit consumption step performed after a fulfilled exchange.
    Clear(String),
}

/// Token service response types.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenResponse {
    /// Freshly issued token now bound to the record.
    Issued(ExchangeToken),
    /// Verification verdict for a presented token.
    Verified(bool),
    /// Acknowledgment that the token was cleared.
    Cleared,
}

/// Exchange orchestrator request types.
#[derive(Debug, Clone)]
pub enum ExchangeRequest {
    /// Start the data exchange for a granted consent.
    ///
    /// Resolves the consumer participant's connector endpoint, issues a
    /// fresh token and performs the handoff call, bounded by the configured
    /// timeout.
    Trigger(String),

    /// Re-enter the trigger flow after an external confirmation step.
    ///
    /// Idempotent with `Trigger` when no attempt is in flight.
    Resume(String),

    /// Resolve the URI the counter-participant should redirect the subject
    /// to for an interactive confirmation step. Pure lookup.
    RedirectTarget(String),

    /// Best-effort notification that a consent was revoked.
    ///
    /// Failures are logged, never surfaced to the revoking caller.
    NotifyRevocation(String),
}

/// Exchange orchestrator response types.
#[derive(Debug, Clone, PartialEq)]
pub enum ExchangeResponse {
    /// The remote connector acknowledged the handoff; the token was
    /// consumed and the record stays `Granted`.
    Fulfilled,
    /// Redirect URI for the interactive confirmation step.
    Redirect(String),
    /// The revocation notice was dispatched (or skipped for a participant
    /// that declares no notice endpoint).
    RevocationNotified,
}

/// Notice service request types.
#[derive(Debug, Clone)]
pub enum NoticeRequest {
    /// Register a new privacy notice version.
    Register(PrivacyNotice),
    /// Resolve a notice reference to its content.
    Resolve(String),
    /// Freeze a notice, making it immutable from then on.
    Archive(String),
    /// Live notices offered between a participant pair.
    ListByPair {
        /// Provider participant identifier
        provider: String,
        /// Consumer participant identifier
        consumer: String,
    },
    /// Live notices attached to a contract.
    ListByContract(String),
    /// Live notices in which the participant appears on either side.
    ListForParticipant(String),
}

/// Notice service response types.
#[derive(Debug, Clone, PartialEq)]
pub enum NoticeResponse {
    /// A single resolved or freshly registered/archived notice.
    Notice(PrivacyNotice),
    /// Result set of a list query.
    Notices(Vec<PrivacyNotice>),
}

/// User-to-Consentry (U2C) request types.
///
/// These requests are initiated by the data subject (through the excluded
/// HTTP/session layer) against the consent manager.
#[derive(Debug, Clone)]
pub enum U2cRequest {
    /// Give consent from a fully-populated intent.
    GiveConsent(ConsentIntent),
    /// Grant a previously drafted record (validation/re-acceptance flow).
    GrantDraft(String),
    /// Refuse a pending consent.
    RefuseConsent(String),
    /// Withdraw a granted consent and notify the counter-participant.
    RevokeConsent(String),
    /// Re-confirm a granted consent.
    ReConfirmConsent {
        /// Record identifier
        id: String,
        /// Whether the grant's terms changed materially
        terms_changed: bool,
    },
    /// End the consent at contract level.
    TerminateConsent(String),
    /// Fetch one of the user's consent records.
    GetConsent(String),
    /// List the user's consent records.
    ListConsents(String),
    /// Resolve a privacy notice for display.
    GetPrivacyNotice(String),
    /// List the live notices offered between a participant pair.
    ListPrivacyNotices {
        /// Provider participant identifier
        provider: String,
        /// Consumer participant identifier
        consumer: String,
    },
    /// Start the data exchange for a granted consent.
    TriggerExchange(String),
    /// Resolve the interactive-confirmation redirect URI.
    RedirectTarget(String),
}

/// User-to-Consentry (U2C) response types.
#[derive(Debug, Clone, PartialEq)]
pub enum U2cResponse {
    /// The consent record after the action or lookup.
    Record(ConsentRecord),
    /// Result set of a consent list query.
    Records(Vec<ConsentRecord>),
    /// A resolved privacy notice.
    Notice(PrivacyNotice),
    /// Result set of a notice list query.
    Notices(Vec<PrivacyNotice>),
    /// The exchange handoff was acknowledged by the counter-participant.
    ExchangeFulfilled,
    /// Redirect URI for the interactive confirmation step.
    Redirect(String),
}

/// Participant-to-Consentry (P2C) request types.
///
/// These requests are initiated by provider and consumer participants.
#[derive(Debug, Clone)]
pub enum P2cRequest {
    /// Draft a participant-initiated pending record.
    DraftConsent(ConsentIntent),
    /// Fetch one consent record.
    GetConsent(String),
    /// List the consent records of one of the participant's users.
    ListConsentsForUser(String),
    /// List the consent records between a provider and a consumer.
    ListConsentsForPair {
        /// Provider participant identifier
        provider: String,
        /// Consumer participant identifier
        consumer: String,
    },
    /// Issue a fresh exchange token for a granted consent.
    IssueToken(String),
    /// Verify a presented exchange token without consuming it.
    VerifyToken {
        /// Record identifier
        id: String,
        /// Token value presented by the bearer
        token: String,
    },
    /// Resume an interrupted exchange after an external confirmation step.
    Resume(String),
    /// Exchange offers available to the participant.
    AvailableExchanges(String),
}

/// Participant-to-Consentry (P2C) response types.
#[derive(Debug, Clone, PartialEq)]
pub enum P2cResponse {
    /// The consent record after the action or lookup.
    Record(ConsentRecord),
    /// Result set of a consent list query.
    Records(Vec<ConsentRecord>),
    /// Freshly issued exchange token.
    Token(ExchangeToken),
    /// Verification verdict for a presented token.
    Verified(bool),
    /// The exchange handoff was acknowledged by the counter-participant.
    ExchangeFulfilled,
    /// Exchange offers as privacy notices.
    Notices(Vec<PrivacyNotice>),
}

/// Consentry-to-Participant (C2P) outbound request types.
///
/// Calls the exchange orchestrator performs against a participant connector.
/// The target endpoint is carried on the request itself so transports can
/// route without inspecting the consent record.
#[derive(Debug, Clone, PartialEq)]
pub enum C2pRequest {
    /// Hand the consented exchange over to the consumer connector.
    ///
    /// Carries the verification token and a reference to the consented data
    /// so the connector can redeem the consent against the provider.
    DataExchange {
        /// Connector endpoint to deliver to
        endpoint: String,
        /// Consent record identifier
        consent_id: String,
        /// Verification token bound to the record
        token: String,
        /// References to the consented data resources
        data: Vec<String>,
        /// Subject identifier on the provider side
        provider_user_identifier: String,
        /// Subject identifier on the consumer side
        consumer_user_identifier: String,
        /// Provider participant identifier
        data_provider: String,
    },

    /// Notify the connector that a consent was withdrawn.
    RevocationNotice {
        /// Connector endpoint to deliver to
        endpoint: String,
        /// Consent record identifier
        consent_id: String,
    },
}

impl C2pRequest {
    /// Connector endpoint this request must be delivered to.
    pub fn endpoint(&self) -> &str {
        match self {
            C2pRequest::DataExchange { endpoint, .. }
            | C2pRequest::RevocationNotice { endpoint, .. } => endpoint,
        }
    }
}

/// Consentry-to-Participant (C2P) response types.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum C2pResponse {
    /// The connector accepted the call.
    Ack,
}
