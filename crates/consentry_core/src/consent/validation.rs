//! Consent intent validation.
//!
//! Gatekeeper in front of the lifecycle service: an intent that is missing
//! required fields is rejected before any record is created or any store
//! write happens, so malformed submissions never leave a half-populated
//! record behind.

use crate::consent::{error::ConsentError, infrastructure::records::ConsentIntent};

/// Validator for consent intents submitted through `Give` and `Draft`.
///
/// ## Validation Rules
///
/// - **Subject identifiers**: provider- and consumer-side user identifiers
///   must be non-empty
/// - **Participants**: both participant references must be non-empty
/// - **Purposes**: at least one purpose/legal-basis pair is required
/// - **Privacy notice**: the reference must be non-empty (resolution against
///   the notice store is the lifecycle service's job)
#[derive(Debug, Clone, Default)]
pub struct IntentValidator;

impl IntentValidator {
    pub fn validate(&self, intent: &ConsentIntent) -> Result<(), ConsentError> {
        if intent.provider_user_identifier.is_empty() {
            return Err(ConsentError::InvalidIntent(
                "provider user identifier must not be empty".to_string(),
            ));
        }
        if intent.consumer_user_identifier.is_empty() {
            return Err(ConsentError::InvalidIntent(
                "consumer user identifier must not be empty".to_string(),
            ));
        }
        if intent.data_provider.is_empty() || intent.data_consumer.is_empty() {
            return Err(ConsentError::InvalidIntent(
                "both participant references must be set".to_string(),
            ));
        }
        if intent.purposes.is_empty() {
            return Err(ConsentError::InvalidIntent(
                "at least one purpose is required".to_string(),
            ));
        }
        if intent.privacy_notice.is_empty() {
            return Err(ConsentError::InvalidIntent(
                "a privacy notice reference is required".to_string(),
            ));
        }
        Ok(())
    }
}
