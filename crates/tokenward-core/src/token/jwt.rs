//! Structural JWT payload decoding.
//!
//! Only the middle segment of a `header.payload.signature` token is looked at.
//! Nothing here verifies a signature: the result is a client-side hint about
//! expiry, not a trust decision.

use std::string::FromUtf8Error;

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, NO_PAD};
use base64::engine::DecodePaddingMode;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

/// Decoded claims object from the middle segment
pub type Payload = Map<String, Value>;

/// base64url that tolerates both padded and unpadded segments
const SEGMENT_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    NO_PAD.with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Outcome of looking inside a stored token.
#[derive(Debug, Clone, PartialEq)]
pub enum PayloadDecode {
    /// Not three dot-delimited segments; an opaque token
    NotJwt,
    Decoded(Payload),
    /// JWT-shaped, but the middle segment is not base64url-encoded JSON
    Malformed,
}

impl PayloadDecode {
    pub fn into_payload(self) -> Option<Payload> {
        match self {
            PayloadDecode::Decoded(payload) => Some(payload),
            PayloadDecode::NotJwt | PayloadDecode::Malformed => None,
        }
    }
}

#[derive(Error, Debug)]
enum SegmentError {
    #[error("invalid base64url: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("invalid UTF-8: {0}")]
    Utf8(#[from] FromUtf8Error),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("payload is not a JSON object")]
    NotAnObject,
}

/// Exactly two dots, whatever the segments contain
pub fn is_jwt_shaped(token: &str) -> bool {
    token.split('.').count() == 3
}

pub fn decode_payload(token: &str) -> PayloadDecode {
    let mut segments = token.split('.');
    let (Some(_), Some(payload), Some(_), None) = (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) else {
        return PayloadDecode::NotJwt;
    };

    match decode_segment(payload) {
        Ok(payload) => PayloadDecode::Decoded(payload),
        Err(e) => {
            debug!(error = %e, "JWT-shaped token has an undecodable payload");
            PayloadDecode::Malformed
        }
    }
}

fn decode_segment(segment: &str) -> Result<Payload, SegmentError> {
    // Accept the standard alphabet too by folding it onto the URL-safe one
    let normalized: String = segment
        .chars()
        .map(|c| match c {
            '+' => '-',
            '/' => '_',
            other => other,
        })
        .collect();

    let bytes = SEGMENT_ENGINE.decode(normalized)?;
    let json = String::from_utf8(bytes)?;
    match serde_json::from_str(&json)? {
        Value::Object(payload) => Ok(payload),
        _ => Err(SegmentError::NotAnObject),
    }
}

/// Numeric `exp` claim in Unix seconds
pub fn expiry_claim(payload: &Payload) -> Option<f64> {
    payload.get("exp").and_then(Value::as_f64)
}

pub fn expiry_time(payload: &Payload) -> Option<DateTime<Utc>> {
    let exp = expiry_claim(payload)?;
    if !exp.is_finite() {
        return None;
    }
    let secs = exp.floor();
    let nanos = ((exp - secs) * 1e9) as u32;
    DateTime::from_timestamp(secs as i64, nanos)
}

/// Whether a stored token counts as a usable credential at `now`.
///
/// Opaque tokens and JWT-shaped tokens that cannot be decoded are accepted:
/// there is no way to tell a foreign token format from a corrupted JWT.
pub fn is_token_valid_at(token: &str, now: DateTime<Utc>) -> bool {
    if token.is_empty() {
        return false;
    }
    match decode_payload(token) {
        PayloadDecode::NotJwt | PayloadDecode::Malformed => true,
        PayloadDecode::Decoded(payload) => match expiry_claim(&payload) {
            Some(exp) => (now.timestamp() as f64) < exp,
            None => true,
        },
    }
}
