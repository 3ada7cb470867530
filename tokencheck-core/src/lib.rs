pub mod config;
pub mod decode;
pub mod error;
pub mod jwks;
pub mod result;
pub mod validator;
pub mod verify;

// Re-export primary public types for convenience.
pub use config::{TrustedIssuer, VerifierConfig};
pub use decode::{decode, DecodedHeader, DecodedPayload, DecodedToken};
pub use error::{ErrorKind, KeyResolutionError, MalformedTokenError};
pub use jwks::{KeyResolver, KeySet, KeySetEntry};
pub use result::VerificationResult;
pub use validator::TokenValidator;
pub use verify::{verify, verify_at, Expected};

// Re-exported so callers can configure algorithms without depending on jsonwebtoken.
pub use jsonwebtoken::Algorithm;

pub mod prelude {
    //! Re-exports of the most commonly used types.
    pub use crate::{ErrorKind, TokenValidator, VerificationResult, VerifierConfig};
}
