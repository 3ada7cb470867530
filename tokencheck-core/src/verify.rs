//! Signature and claim checks against an already resolved key.
//!
//! Checks run in a fixed order and stop at the first failure:
//! algorithm allow-list, signature, `exp`, `nbf`, `aud`, `iss`.

use jsonwebtoken::{crypto, get_current_timestamp, Algorithm};
use serde_json::Value;

use crate::decode::{numeric_date, DecodedToken};
use crate::error::ErrorKind;
use crate::jwks::KeySetEntry;
use crate::result::VerificationResult;

/// What a token has to match to be accepted.
#[derive(Debug, Clone, Copy)]
pub struct Expected<'a> {
    pub audience: &'a str,
    /// The trusted issuer the key was resolved for; `iss` must equal it.
    pub issuer: &'a str,
    pub algorithms: &'a [Algorithm],
    pub leeway_secs: u64,
}

/// Verify `token` with `key` at the current system time.
pub fn verify(token: &DecodedToken, key: &KeySetEntry, expected: &Expected<'_>) -> VerificationResult {
    verify_at(token, key, expected, get_current_timestamp())
}

/// Verify `token` with `key` as of `now` (seconds since the Unix epoch).
pub fn verify_at(
    token: &DecodedToken,
    key: &KeySetEntry,
    expected: &Expected<'_>,
    now: u64,
) -> VerificationResult {
    match run_checks(token, key, expected, now) {
        Ok(()) => VerificationResult::Valid {
            claims: token.payload().clone(),
        },
        Err((reason, detail)) => VerificationResult::invalid(reason, detail),
    }
}

type Check = Result<(), (ErrorKind, String)>;

fn run_checks(token: &DecodedToken, key: &KeySetEntry, expected: &Expected<'_>, now: u64) -> Check {
    let algorithm = check_algorithm(&token.header().algorithm, expected.algorithms)?;
    check_signature(token, key, algorithm)?;

    let now = i64::try_from(now).unwrap_or(i64::MAX);
    let leeway = i64::try_from(expected.leeway_secs).unwrap_or(i64::MAX);
    check_expiry(token.payload().get("exp"), now, leeway)?;
    check_not_before(token.payload().get("nbf"), now, leeway)?;

    check_audience(&token.payload().audience(), expected.audience)?;
    check_issuer(token.payload().issuer(), expected.issuer)
}

pub(crate) fn check_algorithm(alg: &str, allowed: &[Algorithm]) -> Result<Algorithm, (ErrorKind, String)> {
    match alg.parse::<Algorithm>() {
        Ok(algorithm) if allowed.contains(&algorithm) => Ok(algorithm),
        _ => Err((
            ErrorKind::AlgorithmNotAllowed,
            format!("Disallowed JWT algorithm: {alg}"),
        )),
    }
}

fn check_signature(token: &DecodedToken, key: &KeySetEntry, algorithm: Algorithm) -> Check {
    if let Some(pinned) = key.algorithm() {
        if pinned != algorithm {
            return Err((
                ErrorKind::SignatureInvalid,
                format!("key '{}' is published for {pinned:?}, token uses {algorithm:?}", key.kid()),
            ));
        }
    }

    match crypto::verify(
        token.signature(),
        token.signing_input().as_bytes(),
        key.decoding_key(),
        algorithm,
    ) {
        Ok(true) => Ok(()),
        Ok(false) => Err((
            ErrorKind::SignatureInvalid,
            "signature does not match".into(),
        )),
        Err(e) => Err((
            ErrorKind::SignatureInvalid,
            format!("signature verification failed: {e}"),
        )),
    }
}

fn check_expiry(exp: Option<&Value>, now: i64, leeway: i64) -> Check {
    let Some(exp) = exp else { return Ok(()) };
    let exp = numeric_date(exp)
        .ok_or_else(|| (ErrorKind::Malformed, "'exp' claim is not a numeric date".to_string()))?;
    if exp.saturating_add(leeway) < now {
        return Err((ErrorKind::Expired, format!("token expired at {exp}")));
    }
    Ok(())
}

fn check_not_before(nbf: Option<&Value>, now: i64, leeway: i64) -> Check {
    let Some(nbf) = nbf else { return Ok(()) };
    let nbf = numeric_date(nbf)
        .ok_or_else(|| (ErrorKind::Malformed, "'nbf' claim is not a numeric date".to_string()))?;
    if nbf > now.saturating_add(leeway) {
        return Err((ErrorKind::NotYetValid, format!("token not valid before {nbf}")));
    }
    Ok(())
}

fn check_audience(audiences: &[&str], expected: &str) -> Check {
    if audiences.contains(&expected) {
        return Ok(());
    }
    let detail = if audiences.is_empty() {
        "token has no 'aud' claim".to_string()
    } else {
        format!("expected audience '{expected}', token is for {audiences:?}")
    };
    Err((ErrorKind::AudienceMismatch, detail))
}

fn check_issuer(issuer: Option<&str>, expected: &str) -> Check {
    match issuer {
        Some(iss) if iss == expected => Ok(()),
        Some(iss) => Err((
            ErrorKind::IssuerMismatch,
            format!("expected issuer '{expected}', got '{iss}'"),
        )),
        None => Err((ErrorKind::IssuerMismatch, "token has no 'iss' claim".into())),
    }
}
