//! Consent record data model.
//!
//! This module defines the entities persisted by the consent manager: the
//! consent record itself, the audit events stamped at each lifecycle
//! transition, the exchange token bound to a granted record, and the privacy
//! notice a record references.
//!
//! ## Record Hierarchy
//!
//! **ConsentRecord**: the durable statement that a data subject agreed (or
//! declined) to a specific data share between a provider and a consumer
//! participant. Identified by an opaque unique id.
//!
//! **ConsentEvent**: immutable stamp appended to the record at every
//! transition, constructed by the lifecycle service at the moment the
//! transition commits rather than by ambient globals.
//!
//! **ExchangeToken**: short-lived opaque credential proving the bearer is
//! authorized to redeem one specific granted consent. At most one token is
//! live per record.
//!
//! **PrivacyNotice**: the processing-terms document a consent record points
//! at. Never mutated once archived, so the audit trail always reflects what
//! the user actually consented to.

use std::{
    fmt::Display,
    time::{SystemTime, UNIX_EPOCH},
};

use uuid::Uuid;

use crate::consent::error::ConsentError;

/// Returns the current time as milliseconds since the Unix epoch.
pub fn now_millis() -> Result<u64, ConsentError> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .map_err(|_| ConsentError::SystemTimeError)
}

/// Lifecycle status of a consent record.
///
/// `Refused`, `Revoked`, `Terminated` and `Expired` are terminal: no outbound
/// transition is defined from them.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Default)]
pub enum ConsentStatus {
    /// Awaiting the data subject's decision
    #[default]
    Pending,
    /// Consent given, exchanges may be triggered
    Granted,
    /// Declined by the data subject while pending
    Refused,
    /// Withdrawn by the data subject after a grant
    Revoked,
    /// Ended at contract level, by either party
    Terminated,
    /// Validity window elapsed
    Expired,
}

impl ConsentStatus {
    /// Returns true if no further transition is defined from this status.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Refused | Self::Revoked | Self::Terminated | Self::Expired)
    }
}

impl Display for ConsentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConsentStatus::Pending => write!(f, "pending"),
            ConsentStatus::Granted => write!(f, "granted"),
            ConsentStatus::Refused => write!(f, "refused"),
            ConsentStatus::Revoked => write!(f, "revoked"),
            ConsentStatus::Terminated => write!(f, "terminated"),
            ConsentStatus::Expired => write!(f, "expired"),
        }
    }
}

/// Kind of lifecycle event stamped on a consent record.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum ConsentEventKind {
    Given,
    Refused,
    Revoked,
    ReConfirmed,
    Terminated,
    Expired,
}

impl Display for ConsentEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConsentEventKind::Given => write!(f, "consent given"),
            ConsentEventKind::Refused => write!(f, "consent refused"),
            ConsentEventKind::Revoked => write!(f, "consent revoked"),
            ConsentEventKind::ReConfirmed => write!(f, "consent re-confirmed"),
            ConsentEventKind::Terminated => write!(f, "consent terminated"),
            ConsentEventKind::Expired => write!(f, "consent expired"),
        }
    }
}

impl TryFrom<&str> for ConsentEventKind {
    type Error = ConsentError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s {
            "consent given" => Ok(ConsentEventKind::Given),
            "consent refused" => Ok(ConsentEventKind::Refused),
            "consent revoked" => Ok(ConsentEventKind::Revoked),
            "consent re-confirmed" => Ok(ConsentEventKind::ReConfirmed),
            "consent terminated" => Ok(ConsentEventKind::Terminated),
            "consent expired" => Ok(ConsentEventKind::Expired),
            _ => Err(ConsentError::InvalidEventKind(s.to_string())),
        }
    }
}

/// Immutable audit stamp recorded at a lifecycle transition.
///
/// `validity_duration` is a data-contract attribute carried on every stamp:
/// "0" means immediate effect with no grace window. `event_type` is
/// "explicit" for all user- and participant-driven transitions.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ConsentEvent {
    pub kind: ConsentEventKind,
    /// Milliseconds since the Unix epoch at the moment the transition committed
    pub event_time: u64,
    pub validity_duration: String,
    pub event_type: String,
}

impl ConsentEvent {
    /// Stamps a new event at the given time.
    pub fn stamp(kind: ConsentEventKind, event_time: u64) -> Self {
        Self {
            kind,
            event_time,
            validity_duration: "0".to_string(),
            event_type: "explicit".to_string(),
        }
    }
}

/// A processing purpose paired with its legal basis.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct Purpose {
    pub purpose: String,
    pub legal_basis: String,
}

impl Purpose {
    pub fn new(purpose: impl Into<String>, legal_basis: impl Into<String>) -> Self {
        Self { purpose: purpose.into(), legal_basis: legal_basis.into() }
    }
}

/// Third party receiving personal data downstream of the consumer.
#[derive(Debug, Clone, Eq, PartialEq, Default)]
pub struct ThirdPartyRecipient {
    pub name: String,
    pub location: String,
    pub nature_of_data_access: String,
}

/// Short-lived opaque credential bound to one granted consent record.
///
/// A token is attached only while its record is `Granted`; it is cleared when
/// the exchange is fulfilled or the record reaches a terminal status.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ExchangeToken {
    pub value: String,
    /// Milliseconds since the Unix epoch
    pub issued_at: u64,
    /// Milliseconds since the Unix epoch
    pub expires_at: u64,
}

impl ExchangeToken {
    /// Mints a fresh single-use token valid for `ttl_ms` from `issued_at`.
    pub fn mint(issued_at: u64, ttl_ms: u64) -> Self {
        Self {
            value: Uuid::new_v4().simple().to_string(),
            issued_at,
            expires_at: issued_at.saturating_add(ttl_ms),
        }
    }

    /// Returns true if the token has not expired at the given time.
    pub fn is_valid_at(&self, now: u64) -> bool {
        now < self.expires_at
    }
}

/// Fully-populated consent intent, the input of `Give` and `Draft`.
///
/// Carries everything a record needs except its identifier, status, events
/// and token, which the lifecycle service owns.
#[derive(Debug, Clone, Eq, PartialEq, Default)]
pub struct ConsentIntent {
    /// Owning user reference; None for participant-initiated records
    pub user: Option<String>,
    pub provider_user_identifier: String,
    pub consumer_user_identifier: String,
    pub data_provider: String,
    pub data_consumer: String,
    pub purposes: Vec<Purpose>,
    pub data: Vec<String>,
    pub recipients: Vec<String>,
    pub privacy_notice: String,
    pub contract: Option<String>,
    pub withdrawal_method: Option<String>,
    /// Retention period in seconds, as a decimal string
    pub retention_period: Option<String>,
    pub processing_locations: Vec<String>,
    pub storage_locations: Vec<String>,
    pub recipient_third_parties: Vec<ThirdPartyRecipient>,
    pub pii_principal_rights: Vec<String>,
    /// Opaque self-description metadata, passed through uninterpreted
    pub jsonld: String,
    pub schema_version: String,
}

/// The central persisted entity: one consent statement between a data
/// subject and a (provider, consumer) participant pair.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ConsentRecord {
    pub id: String,
    pub user: Option<String>,
    pub provider_user_identifier: String,
    pub consumer_user_identifier: String,
    pub data_provider: String,
    pub data_consumer: String,
    pub purposes: Vec<Purpose>,
    pub data: Vec<String>,
    pub recipients: Vec<String>,
    pub status: ConsentStatus,
    pub privacy_notice: String,
    pub contract: Option<String>,
    pub withdrawal_method: Option<String>,
    pub retention_period: Option<String>,
    pub processing_locations: Vec<String>,
    pub storage_locations: Vec<String>,
    pub recipient_third_parties: Vec<ThirdPartyRecipient>,
    pub pii_principal_rights: Vec<String>,
    /// Present only while an exchange is redeemable
    pub token: Option<ExchangeToken>,
    pub events: Vec<ConsentEvent>,
    /// Millisecond timestamp after which a granted consent expires
    pub valid_until: Option<u64>,
    pub jsonld: String,
    pub schema_version: String,
    pub created_at: u64,
    pub updated_at: u64,
}

impl ConsentRecord {
    /// Builds a pending record from an intent, assigning a fresh identifier.
    pub fn from_intent(intent: ConsentIntent, now: u64) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user: intent.user,
            provider_user_identifier: intent.provider_user_identifier,
            consumer_user_identifier: intent.consumer_user_identifier,
            data_provider: intent.data_provider,
            data_consumer: intent.data_consumer,
            purposes: intent.purposes,
            data: intent.data,
            recipients: intent.recipients,
            status: ConsentStatus::Pending,
            privacy_notice: intent.privacy_notice,
            contract: intent.contract,
            withdrawal_method: intent.withdrawal_method,
            retention_period: intent.retention_period,
            processing_locations: intent.processing_locations,
            storage_locations: intent.storage_locations,
            recipient_third_parties: intent.recipient_third_parties,
            pii_principal_rights: intent.pii_principal_rights,
            token: None,
            events: Vec::new(),
            valid_until: None,
            jsonld: intent.jsonld,
            schema_version: intent.schema_version,
            created_at: now,
            updated_at: now,
        }
    }

    /// Millisecond validity window derived from the retention period, if the
    /// record declares one.
    pub fn retention_window_ms(&self) -> Option<u64> {
        self.retention_period
            .as_deref()
            .and_then(|p| p.parse::<u64>().ok())
            .map(|secs| secs.saturating_mul(1000))
    }
}

impl Display for ConsentRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "consent://{}::{}::{}::{}",
            self.id, self.data_provider, self.data_consumer, self.status
        )
    }
}

/// Identity and contact details of the PII controller.
#[derive(Debug, Clone, Eq, PartialEq, Default)]
pub struct ControllerDetails {
    pub name: String,
    pub contact: String,
    pub representative: Option<String>,
    pub dpo_name: Option<String>,
    pub dpo_contact: Option<String>,
}

/// Transfers of personal data to third countries, with their safeguards.
#[derive(Debug, Clone, Eq, PartialEq, Default)]
pub struct InternationalTransfers {
    pub countries: Vec<String>,
    pub safeguards: String,
}

/// The processing-terms document a consent record references.
///
/// A notice may be superseded by a new version but is never mutated in place
/// once archived (`archived_at` set), preserving the audit trail of what a
/// user actually consented to.
#[derive(Debug, Clone, Eq, PartialEq, Default)]
pub struct PrivacyNotice {
    pub id: String,
    pub title: String,
    pub last_updated: String,
    pub data_provider: String,
    pub data_consumer: String,
    pub contract: Option<String>,
    pub controller_details: ControllerDetails,
    pub purposes: Vec<Purpose>,
    pub data: Vec<String>,
    pub categories_of_data: Vec<String>,
    pub recipients: Vec<String>,
    pub international_transfers: Option<InternationalTransfers>,
    pub retention_period: String,
    pub pii_principal_rights: Vec<String>,
    pub withdrawal_of_consent: String,
    pub complaint_rights: String,
    pub provision_requirements: String,
    pub automated_decision_making: Option<String>,
    /// Millisecond timestamp; Some means the notice is immutable
    pub archived_at: Option<u64>,
    pub jsonld: String,
    pub schema_version: String,
}

impl PrivacyNotice {
    pub fn is_archived(&self) -> bool {
        self.archived_at.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_terminal_set() {
        assert!(!ConsentStatus::Pending.is_terminal());
        assert!(!ConsentStatus::Granted.is_terminal());
        assert!(ConsentStatus::Refused.is_terminal());
        assert!(ConsentStatus::Revoked.is_terminal());
        assert!(ConsentStatus::Terminated.is_terminal());
        assert!(ConsentStatus::Expired.is_terminal());
    }

    #[test]
    fn test_event_kind_round_trip() {
        for kind in [
            ConsentEventKind::Given,
            ConsentEventKind::Refused,
            ConsentEventKind::Revoked,
            ConsentEventKind::ReConfirmed,
            ConsentEventKind::Terminated,
            ConsentEventKind::Expired,
        ] {
            assert_eq!(ConsentEventKind::try_from(kind.to_string().as_str()).unwrap(), kind);
        }
        assert!(ConsentEventKind::try_from("consent granted").is_err());
    }

    #[test]
    fn test_event_stamp_contract_attributes() {
        let event = ConsentEvent::stamp(ConsentEventKind::Given, 42);
        assert_eq!(event.event_time, 42);
        assert_eq!(event.validity_duration, "0");
        assert_eq!(event.event_type, "explicit");
    }

    #[test]
    fn test_token_expiry_boundary() {
        let token = ExchangeToken::mint(1_000, 500);
        assert!(token.is_valid_at(1_000));
        assert!(token.is_valid_at(1_499));
        assert!(!token.is_valid_at(1_500));
        assert!(!token.is_valid_at(2_000));
    }

    #[test]
    fn test_tokens_are_unique() {
        let a = ExchangeToken::mint(0, 1);
        let b = ExchangeToken::mint(0, 1);
        assert_ne!(a.value, b.value);
    }

    #[test]
    fn test_record_from_intent_defaults() {
        let intent = ConsentIntent {
            user: Some("user-1".to_string()),
            provider_user_identifier: "prov-user".to_string(),
            consumer_user_identifier: "cons-user".to_string(),
            data_provider: "did:prov".to_string(),
            data_consumer: "did:cons".to_string(),
            purposes: vec![Purpose::new("marketing", "consent")],
            data: vec!["resource-1".to_string()],
            privacy_notice: "notice-1".to_string(),
            retention_period: Some("30".to_string()),
            ..Default::default()
        };
        let record = ConsentRecord::from_intent(intent, 7);
        assert_eq!(record.status, ConsentStatus::Pending);
        assert!(record.token.is_none());
        assert!(record.events.is_empty());
        assert_eq!(record.created_at, 7);
        assert_eq!(record.updated_at, 7);
        assert_eq!(record.retention_window_ms(), Some(30_000));
        assert!(!record.id.is_empty());
    }

    #[test]
    fn test_record_display() {
        let intent = ConsentIntent {
            data_provider: "did:prov".to_string(),
            data_consumer: "did:cons".to_string(),
            ..Default::default()
        };
        let record = ConsentRecord::from_intent(intent, 0);
        assert_eq!(
            record.to_string(),
            format!("consent://{}::did:prov::did:cons::pending", record.id)
        );
    }
}
