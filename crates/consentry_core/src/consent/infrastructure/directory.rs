//! Participant directory.
//!
//! Read-only collaborator of the exchange orchestrator: resolves a stable
//! participant identifier to the connector endpoints the participant has
//! declared for receiving consents and data, and to the dataspace endpoint
//! used for interactive redirect flows.

use std::sync::Arc;

use dashmap::DashMap;

use crate::consent::error::ConsentError;

/// Connector endpoints a participant declares in its self-description.
#[derive(Debug, Clone, Eq, PartialEq, Default)]
pub struct ParticipantEndpoints {
    pub data_import: Option<String>,
    pub data_export: Option<String>,
    /// Receives exchange handoffs (consent + token)
    pub consent_import: Option<String>,
    /// Receives revocation notices
    pub consent_export: Option<String>,
}

/// An organization-level actor of the dataspace, provider or consumer side.
#[derive(Debug, Clone, Eq, PartialEq, Default)]
pub struct Participant {
    /// Stable decentralized identifier
    pub identifier: String,
    pub legal_name: String,
    pub self_description_url: String,
    pub endpoints: ParticipantEndpoints,
    /// Base URI of the participant's dataspace connector, used for
    /// interactive confirmation redirects
    pub dataspace_endpoint: String,
}

impl Participant {
    /// Endpoint an exchange handoff must be delivered to.
    pub fn exchange_endpoint(&self) -> Result<String, ConsentError> {
        self.endpoints
            .consent_import
            .clone()
            .ok_or_else(|| ConsentError::MissingExchangeEndpoint(self.identifier.clone()))
    }
}

/// Thread-safe registry of known participants keyed by identifier.
#[derive(Default, Debug, Clone)]
pub struct ParticipantDirectory {
    participants: Arc<DashMap<String, Participant>>,
}

impl ParticipantDirectory {
    /// Registers or replaces a participant entry.
    pub fn register(&self, participant: Participant) {
        self.participants.insert(participant.identifier.clone(), participant);
    }

    /// Resolves a participant identifier to its directory entry.
    pub fn resolve(&self, identifier: &str) -> Result<Participant, ConsentError> {
        self.participants
            .get(identifier)
            .map(|participant| participant.value().clone())
            .ok_or_else(|| ConsentError::ParticipantNotFound(identifier.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_resolve() {
        let directory = ParticipantDirectory::default();
        directory.register(Participant {
            identifier: "did:cons".to_string(),
            legal_name: "Consumer Org".to_string(),
            endpoints: ParticipantEndpoints {
                consent_import: Some("http://consumer/consents".to_string()),
                ..Default::default()
            },
            ..Default::default()
        });

        let participant = directory.resolve("did:cons").unwrap();
        assert_eq!(participant.exchange_endpoint().unwrap(), "http://consumer/consents");
        assert_eq!(
            directory.resolve("did:unknown"),
            Err(ConsentError::ParticipantNotFound("did:unknown".to_string()))
        );
    }

    #[test]
    fn test_exchange_endpoint_requires_consent_import() {
        let participant = Participant { identifier: "did:cons".to_string(), ..Default::default() };
        assert_eq!(
            participant.exchange_endpoint(),
            Err(ConsentError::MissingExchangeEndpoint("did:cons".to_string()))
        );
    }
}
