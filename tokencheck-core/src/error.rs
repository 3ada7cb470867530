use serde::Serialize;

/// Reason attached to an `Invalid` verification result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The token is not a well-formed compact JWT.
    Malformed,

    /// No public key could be resolved for the token's `kid`.
    KeyUnavailable,

    /// The `alg` header is not in the configured allow-list.
    AlgorithmNotAllowed,

    /// The signature does not verify against the resolved key.
    SignatureInvalid,

    /// The `exp` claim is in the past.
    Expired,

    /// The `nbf` claim is in the future.
    NotYetValid,

    /// The `aud` claim does not name the expected audience.
    AudienceMismatch,

    /// The `iss` claim is not the trusted issuer.
    IssuerMismatch,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Malformed => "malformed",
            ErrorKind::KeyUnavailable => "key_unavailable",
            ErrorKind::AlgorithmNotAllowed => "algorithm_not_allowed",
            ErrorKind::SignatureInvalid => "signature_invalid",
            ErrorKind::Expired => "expired",
            ErrorKind::NotYetValid => "not_yet_valid",
            ErrorKind::AudienceMismatch => "audience_mismatch",
            ErrorKind::IssuerMismatch => "issuer_mismatch",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            ErrorKind::Malformed => "Malformed token",
            ErrorKind::KeyUnavailable => "Signing key unavailable",
            ErrorKind::AlgorithmNotAllowed => "Algorithm not allowed",
            ErrorKind::SignatureInvalid => "Invalid signature",
            ErrorKind::Expired => "Token expired",
            ErrorKind::NotYetValid => "Token not yet valid",
            ErrorKind::AudienceMismatch => "Audience mismatch",
            ErrorKind::IssuerMismatch => "Issuer mismatch",
        };
        f.write_str(text)
    }
}

/// The raw token could not be split and decoded into header and payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedTokenError(pub String);

impl std::fmt::Display for MalformedTokenError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Malformed token: {}", self.0)
    }
}

impl std::error::Error for MalformedTokenError {}

/// Failure to produce a key for a `kid` from the remote key set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyResolutionError {
    /// The key-set endpoint could not be reached or answered with an error status.
    Fetch(String),

    /// The key-set fetch did not complete within the configured timeout.
    Timeout,

    /// The response body is not a well-formed JSON Web Key Set.
    InvalidKeySet(String),

    /// No entry in a freshly fetched key set matches the `kid`.
    UnknownKeyId(String),
}

impl std::fmt::Display for KeyResolutionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KeyResolutionError::Fetch(msg) => write!(f, "JWKS fetch error: {msg}"),
            KeyResolutionError::Timeout => write!(f, "JWKS fetch timed out"),
            KeyResolutionError::InvalidKeySet(msg) => write!(f, "Invalid JWKS document: {msg}"),
            KeyResolutionError::UnknownKeyId(kid) => write!(f, "Unknown signing key: {kid}"),
        }
    }
}

impl std::error::Error for KeyResolutionError {}
