//! Transport layer for participant connector communication.
//!
//! The exchange orchestrator is generic over a tower service carrying
//! [`C2pRequest`](crate::consent::api::C2pRequest)s to participant
//! connectors. Three implementations are provided:
//!
//! - [`grpc::C2pGrpc`]: production transport over tonic, with a cache of
//!   connected clients per endpoint
//! - [`loopback::C2pLoopback`]: in-process scripted connectors for
//!   integration tests
//! - [`nop::C2pNop`]: accept-everything connector for tests that do not
//!   exercise the exchange path

pub mod grpc;
pub mod loopback;
pub mod nop;
