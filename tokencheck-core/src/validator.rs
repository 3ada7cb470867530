use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::config::{TrustedIssuer, VerifierConfig};
use crate::decode::decode;
use crate::error::ErrorKind;
use crate::jwks::KeyResolver;
use crate::result::VerificationResult;
use crate::verify::{check_algorithm, verify, Expected};

/// Entry point for access-token validation.
///
/// Owns one [`KeyResolver`] per distinct JWKS URL among the trusted issuers,
/// so issuers publishing their keys at the same endpoint share a cache.
///
/// # Example
///
/// ```ignore
/// let validator = TokenValidator::new(VerifierConfig::for_tenant(&tenant_id, &app_id));
/// match validator.validate_access_token(&token).await {
///     VerificationResult::Valid { claims } => println!("hello {:?}", claims.subject()),
///     VerificationResult::Invalid { reason, detail } => eprintln!("{reason}: {detail}"),
/// }
/// ```
pub struct TokenValidator {
    config: VerifierConfig,
    resolvers: HashMap<String, Arc<KeyResolver>>,
}

impl TokenValidator {
    pub fn new(config: VerifierConfig) -> Self {
        let mut resolvers = HashMap::new();
        for trusted in &config.trusted_issuers {
            resolvers
                .entry(trusted.jwks_url.clone())
                .or_insert_with(|| Arc::new(KeyResolver::new(trusted.jwks_url.clone(), &config)));
        }
        Self { config, resolvers }
    }

    /// Returns the verification configuration.
    pub fn config(&self) -> &VerifierConfig {
        &self.config
    }

    /// The key resolver serving a configured issuer.
    pub fn resolver_for(&self, issuer: &str) -> Option<&Arc<KeyResolver>> {
        let trusted = self.config.trusted_issuer(issuer)?;
        self.resolvers.get(&trusted.jwks_url)
    }

    /// Validate a compact access token.
    ///
    /// 1. Decode header and payload (no network on failure)
    /// 2. Pick the trusted issuer named by the token's `iss`, or the primary one
    /// 3. Resolve the signing key by `kid` from that issuer's key set
    /// 4. Verify signature and claims, including strict `iss` equality
    ///
    /// Never fails: every problem is reported as [`VerificationResult::Invalid`].
    pub async fn validate_access_token(&self, raw: &str) -> VerificationResult {
        let result = self.run(raw).await;
        match &result {
            VerificationResult::Valid { claims } => {
                let sub = claims.subject().unwrap_or("unknown");
                debug!(sub = %sub, "JWT validated");
            }
            VerificationResult::Invalid { reason, detail } => {
                warn!(reason = reason.as_str(), error = %detail, "JWT rejected");
            }
        }
        result
    }

    async fn run(&self, raw: &str) -> VerificationResult {
        // Step 1: Decode without verifying
        let token = match decode(raw) {
            Ok(token) => token,
            Err(e) => return VerificationResult::invalid(ErrorKind::Malformed, e.0),
        };
        let header = token.header();
        debug!(alg = %header.algorithm, kid = ?header.key_id, "Decoded JWT header");

        if let Err((reason, detail)) =
            check_algorithm(&header.algorithm, &self.config.allowed_algorithms)
        {
            return VerificationResult::invalid(reason, detail);
        }

        // Step 2: The token's own `iss` only selects which trusted key set to search.
        let Some(trusted) = self.select_issuer(token.payload().issuer()) else {
            return VerificationResult::invalid(
                ErrorKind::KeyUnavailable,
                "no trusted issuer configured",
            );
        };

        // Step 3: Resolve the key
        let Some(kid) = header.key_id.as_deref() else {
            return VerificationResult::invalid(
                ErrorKind::KeyUnavailable,
                "JWT header missing 'kid' field",
            );
        };
        let Some(resolver) = self.resolvers.get(&trusted.jwks_url) else {
            return VerificationResult::invalid(
                ErrorKind::KeyUnavailable,
                format!("no key set configured for issuer '{}'", trusted.issuer),
            );
        };
        let key = match resolver.resolve_key(kid).await {
            Ok(key) => key,
            Err(e) => return VerificationResult::invalid(ErrorKind::KeyUnavailable, e.to_string()),
        };

        // Step 4: Verify against the trusted issuer, not the one the token claims.
        let expected = Expected {
            audience: &self.config.audience,
            issuer: &trusted.issuer,
            algorithms: &self.config.allowed_algorithms,
            leeway_secs: self.config.leeway_secs,
        };
        verify(&token, &key, &expected)
    }

    fn select_issuer(&self, token_issuer: Option<&str>) -> Option<&TrustedIssuer> {
        token_issuer
            .and_then(|iss| self.config.trusted_issuer(iss))
            .or_else(|| self.config.primary_issuer())
    }
}
