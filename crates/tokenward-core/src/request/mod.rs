//! Outgoing request authorization.
//!
//! This module provides:
//! - `OutgoingRequest`: what the authenticator needs from a request
//! - `RequestParts`: a transport-neutral request that can opt out
//! - `RequestAuthenticator`: attaches the stored credential as a header

pub mod authenticator;
pub mod parts;

pub use authenticator::RequestAuthenticator;
pub use parts::{OutgoingRequest, RequestParts};
