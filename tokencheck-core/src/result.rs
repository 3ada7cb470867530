use serde::Serialize;

use crate::decode::DecodedPayload;
use crate::error::ErrorKind;

/// Outcome of validating one token.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum VerificationResult {
    /// Every check passed; `claims` is the token payload as issued.
    Valid { claims: DecodedPayload },

    /// A check failed. `detail` is meant for logs and operators, not end users.
    Invalid { reason: ErrorKind, detail: String },
}

impl VerificationResult {
    pub fn invalid(reason: ErrorKind, detail: impl Into<String>) -> Self {
        VerificationResult::Invalid {
            reason,
            detail: detail.into(),
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, VerificationResult::Valid { .. })
    }

    pub fn claims(&self) -> Option<&DecodedPayload> {
        match self {
            VerificationResult::Valid { claims } => Some(claims),
            VerificationResult::Invalid { .. } => None,
        }
    }

    pub fn reason(&self) -> Option<ErrorKind> {
        match self {
            VerificationResult::Valid { .. } => None,
            VerificationResult::Invalid { reason, .. } => Some(*reason),
        }
    }

    /// HTTP status an API would answer with: 200 when valid, 401 otherwise.
    pub fn status_code(&self) -> u16 {
        if self.is_valid() {
            200
        } else {
            401
        }
    }
}
