//! Token lifecycle: extraction from login responses, storage, structural JWT
//! decoding and authentication status.
//!
//! This module provides:
//! - `TokenStateManager`: stores, reads and judges the current credential
//! - `jwt`: payload decoding and lazy expiry evaluation
//! - `extract`: the ordered strategies that find a token in a response body

pub mod extract;
pub mod jwt;
pub mod manager;

pub use extract::{extract_token, TokenPath};
pub use jwt::{decode_payload, is_jwt_shaped, Payload, PayloadDecode};
pub use manager::TokenStateManager;
