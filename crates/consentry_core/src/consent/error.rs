use thiserror::Error;

use crate::consent::infrastructure::records::ConsentStatus;

#[derive(Debug, Error, PartialEq)]
pub enum ConsentError {
    #[error("Consent error, internal consentry API error")]
    InternalConsentryError,

    #[error("Consent error, invalid consent intent: {0}")]
    InvalidIntent(String),

    #[error("Consent error, consent record not found (id: {0})")]
    RecordNotFound(String),

    #[error("Consent error, privacy notice not found (reference: {0})")]
    NoticeNotFound(String),

    #[error("Consent error, privacy notice is archived (reference: {0})")]
    NoticeArchived(String),

    #[error("Consent error, participant not found (identifier: {0})")]
    ParticipantNotFound(String),

    #[error("Consent error, participant declares no exchange endpoint (identifier: {0})")]
    MissingExchangeEndpoint(String),

    #[error("Consent error, {action} not allowed from status {from}")]
    InvalidTransition { from: ConsentStatus, action: &'static str },

    #[error("Consent error, consent is not granted (id: {0})")]
    NotGranted(String),

    #[error("Consent error, an exchange is already in flight (id: {0})")]
    ExchangeInFlight(String),

    #[error("Consent error, counter-participant rejected the exchange: {0}")]
    ExchangeRejected(String),

    #[error("Consent error, failed to contact participant connector (endpoint: {0})")]
    ConnectorUnreachable(String),

    #[error("Consent error, exchange timed out (endpoint: {0})")]
    ExchangeTimeout(String),

    #[error("Consent error, concurrent update conflict (id: {0})")]
    StoreConflict(String),

    #[error("Consent error, duplicate record identifier (id: {0})")]
    DuplicateRecord(String),

    #[error("Consent error, unknown consent event kind ({0})")]
    InvalidEventKind(String),

    #[error("Consent error, system time error")]
    SystemTimeError,
}

impl ConsentError {
    /// Returns true for outcomes the caller may retry with a fresh token,
    /// i.e. the transient family of the error taxonomy.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ConsentError::ConnectorUnreachable(_)
                | ConsentError::ExchangeTimeout(_)
                | ConsentError::StoreConflict(_)
        )
    }
}
