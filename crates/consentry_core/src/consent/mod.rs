//! Consent module.
//!
//! This module provides the consent lifecycle and cross-participant
//! data-exchange orchestration of the consentry manager: a record of consent
//! moves through well-defined states, is token-verifiable by a remote
//! participant, and once granted gates an asynchronous handoff of data
//! between two independently-operated participant systems.
//!
//! ## Core Architecture
//!
//! The consent manager exposes two inbound API layers:
//!
//! ### User-to-Consentry (U2C) API
//! Primary interface for data subjects: giving, refusing, revoking,
//! re-confirming and terminating consent, consulting privacy notices, and
//! triggering the data exchange for a granted consent.
//!
//! ### Participant-to-Consentry (P2C) API
//! Interface for provider and consumer participants: drafting
//! participant-initiated records, consulting consents, issuing and verifying
//! exchange tokens, and resuming interrupted exchanges.
//!
//! ## Service Components
//!
//! ### Core Services
//! - **Lifecycle**: the consent state machine and its invariants
//! - **Token**: short-lived verification tokens bound to granted records
//! - **Exchange**: orchestration of the handoff to the counter-participant
//! - **Notice**: privacy notice registration and resolution
//!
//! ### Infrastructure
//! - **Records**: the consent data model and audit events
//! - **Store**: keyed storage with optimistic conditional updates
//! - **Directory**: read-only participant endpoint resolution
//! - **Validation**: consent intent validation in front of the lifecycle
//!
//! ## Default Service Stacks
//!
//! Pre-configured combinations are available as type aliases parameterized
//! by the outbound connector transport, and [`init_consent_manager`] wires a
//! complete manager over shared stores.
pub mod api;
pub mod core;
pub mod error;
pub mod infrastructure;
pub mod validation;

use crate::consent::{
    api::{p2c::P2cApiService, u2c::U2cApiService},
    core::{
        exchange::ExchangeService, lifecycle::LifecycleService, notice::NoticeService,
        token::TokenService,
    },
    infrastructure::{
        directory::ParticipantDirectory,
        store::{ConsentStore, NoticeStore},
    },
};

/// Standard U2C API service stack parameterized by connector transport type.
///
/// Combines the lifecycle, exchange and notice services. The generic
/// parameter `X` selects the outbound transport used to reach participant
/// connectors.
pub type U2cApiDefaultStack<X> =
    U2cApiService<LifecycleService, ExchangeService<X>, NoticeService>;

/// Standard P2C API service stack parameterized by connector transport type.
///
/// Combines the lifecycle, token, exchange and notice services with the same
/// transport parameterization as the U2C stack.
pub type P2cApiDefaultStack<X> =
    P2cApiService<LifecycleService, TokenService, ExchangeService<X>, NoticeService>;

/// Initialize a complete consent manager over shared stores.
///
/// Creates the U2C and P2C service stacks wired to a single consent store,
/// notice store and participant directory. The store handles are returned so
/// the caller can seed notices and participants and drive the expiry sweep;
/// cloning a handle yields another view onto the same state.
///
/// # Arguments
/// * `token_ttl_ms` - Validity window of issued exchange tokens
/// * `exchange_timeout_ms` - Bound on a single outbound connector call,
///   disabled if 0
/// * `connector` - Outbound transport for participant connector calls
///
/// # Returns
/// A tuple containing (U2C service, P2C service, consent store, notice
/// store, participant directory) ready for use
pub fn init_consent_manager<X>(
    token_ttl_ms: u64,
    exchange_timeout_ms: u64,
    connector: X,
) -> (U2cApiDefaultStack<X>, P2cApiDefaultStack<X>, ConsentStore, NoticeStore, ParticipantDirectory)
where
    X: tower::Service<api::C2pRequest, Response = api::C2pResponse, Error = error::ConsentError>
        + Clone
        + Send
        + 'static,
    X::Future: Send,
{
    let records = ConsentStore::default();
    let notices = NoticeStore::default();
    let directory = ParticipantDirectory::default();

    let lifecycle = LifecycleService::new(records.clone(), notices.clone());
    let token = TokenService::new(records.clone(), token_ttl_ms);
    let exchange = ExchangeService::new(
        records.clone(),
        directory.clone(),
        token.clone(),
        connector,
        exchange_timeout_ms,
    );
    let notice = NoticeService::new(notices.clone());

    let u2c_service: U2cApiDefaultStack<X> =
        U2cApiService::new(lifecycle.clone(), exchange.clone(), notice.clone());
    let p2c_service: P2cApiDefaultStack<X> =
        P2cApiService::new(lifecycle, token, exchange, notice);

    (u2c_service, p2c_service, records, notices, directory)
}
