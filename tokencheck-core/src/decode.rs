//! Unverified decoding of compact JWTs.
//!
//! Nothing in this module checks a signature or touches the network. It only
//! splits `header.payload.signature`, base64url-decodes the first two segments
//! and parses them as JSON objects.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::MalformedTokenError;

/// JOSE header of a token. `alg` is mandatory; `kid` is required later for key lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecodedHeader {
    #[serde(rename = "alg")]
    pub algorithm: String,

    #[serde(rename = "kid", default, skip_serializing_if = "Option::is_none")]
    pub key_id: Option<String>,

    #[serde(rename = "typ", default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,

    /// Any other header parameters (`x5t`, `nonce`, ...).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Claims set of a token, kept as an open JSON object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DecodedPayload(Map<String, Value>);

impl DecodedPayload {
    /// The `iss` claim, if it is a string.
    pub fn issuer(&self) -> Option<&str> {
        self.0.get("iss").and_then(Value::as_str)
    }

    /// The `aud` claim as a list; a single string audience yields one element.
    pub fn audience(&self) -> Vec<&str> {
        match self.0.get("aud") {
            Some(Value::String(aud)) => vec![aud.as_str()],
            Some(Value::Array(auds)) => auds.iter().filter_map(Value::as_str).collect(),
            _ => Vec::new(),
        }
    }

    /// The `exp` claim in seconds since the epoch, if numeric.
    pub fn expiry(&self) -> Option<i64> {
        self.0.get("exp").and_then(numeric_date)
    }

    /// The `nbf` claim in seconds since the epoch, if numeric.
    pub fn not_before(&self) -> Option<i64> {
        self.0.get("nbf").and_then(numeric_date)
    }

    pub fn subject(&self) -> Option<&str> {
        self.0.get("sub").and_then(Value::as_str)
    }

    pub fn get(&self, claim: &str) -> Option<&Value> {
        self.0.get(claim)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

impl From<Map<String, Value>> for DecodedPayload {
    fn from(claims: Map<String, Value>) -> Self {
        Self(claims)
    }
}

/// JSON numeric date: integers as-is, fractional seconds truncated.
pub(crate) fn numeric_date(value: &Value) -> Option<i64> {
    value
        .as_i64()
        .or_else(|| value.as_f64().filter(|f| f.is_finite()).map(|f| f as i64))
}

/// A token split into its decoded parts, with the raw material needed for
/// signature verification.
#[derive(Debug, Clone)]
pub struct DecodedToken {
    header: DecodedHeader,
    payload: DecodedPayload,
    signing_input: String,
    signature: String,
}

impl DecodedToken {
    pub fn header(&self) -> &DecodedHeader {
        &self.header
    }

    pub fn payload(&self) -> &DecodedPayload {
        &self.payload
    }

    /// `base64url(header) "." base64url(payload)`, the bytes covered by the signature.
    pub fn signing_input(&self) -> &str {
        &self.signing_input
    }

    /// The base64url-encoded signature segment.
    pub fn signature(&self) -> &str {
        &self.signature
    }

    pub fn into_parts(self) -> (DecodedHeader, DecodedPayload) {
        (self.header, self.payload)
    }
}

/// Decode a compact JWT without verifying it.
pub fn decode(raw: &str) -> Result<DecodedToken, MalformedTokenError> {
    if raw.is_empty() {
        return Err(MalformedTokenError("token is empty".into()));
    }

    let mut segments = raw.split('.');
    let (header_b64, payload_b64, signature) =
        match (segments.next(), segments.next(), segments.next(), segments.next()) {
            (Some(h), Some(p), Some(s), None) => (h, p, s),
            _ => {
                return Err(MalformedTokenError(
                    "expected three dot-separated segments".into(),
                ))
            }
        };

    if signature.is_empty() {
        return Err(MalformedTokenError("signature segment is empty".into()));
    }

    let header: DecodedHeader = decode_segment(header_b64, "header")?;
    let payload: DecodedPayload = decode_segment(payload_b64, "payload")?;

    Ok(DecodedToken {
        header,
        payload,
        signing_input: format!("{header_b64}.{payload_b64}"),
        signature: signature.to_string(),
    })
}

fn decode_segment<T: serde::de::DeserializeOwned>(
    segment: &str,
    name: &str,
) -> Result<T, MalformedTokenError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|e| MalformedTokenError(format!("{name} is not valid base64url: {e}")))?;
    serde_json::from_slice(&bytes)
        .map_err(|e| MalformedTokenError(format!("{name} is not a valid JSON object: {e}")))
}
