use jsonwebtoken::Algorithm;

/// Default authority host of the identity provider.
pub const DEFAULT_AUTHORITY: &str = "https://login.microsoftonline.com";

/// An issuer the verifier trusts, paired with the endpoint publishing its keys.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrustedIssuer {
    /// Exact value expected in the `iss` claim.
    pub issuer: String,

    /// URL of the JWKS document holding this issuer's signing keys.
    pub jwks_url: String,
}

impl TrustedIssuer {
    pub fn new(issuer: impl Into<String>, jwks_url: impl Into<String>) -> Self {
        Self {
            issuer: issuer.into(),
            jwks_url: jwks_url.into(),
        }
    }
}

/// Verification configuration: trusted issuers, audience, algorithms and key-set cache tuning.
#[derive(Clone, Debug)]
pub struct VerifierConfig {
    /// Allow-list of trusted issuers. The first entry is the primary issuer.
    pub trusted_issuers: Vec<TrustedIssuer>,

    /// Expected audience in the "aud" claim
    pub audience: String,

    /// Allowed JWT algorithms. Tokens using other algorithms are rejected.
    /// Default: RS256 only.
    pub allowed_algorithms: Vec<Algorithm>,

    /// JWKS cache TTL in seconds (default: 3600)
    pub jwks_cache_ttl_secs: u64,

    /// Upper bound for a single JWKS fetch in milliseconds (default: 5000)
    pub jwks_fetch_timeout_ms: u64,

    /// Minimum interval between forced JWKS refreshes in seconds (default: 0)
    ///
    /// With 0, every token carrying an unknown `kid` costs one request to the
    /// JWKS endpoint, so a client sending random `kid`s drives one outbound
    /// fetch per token. Services exposed to untrusted callers should set a
    /// floor with [`VerifierConfig::with_min_refresh_interval`]; keys rotated
    /// inside that window are then rejected until it elapses.
    pub jwks_min_refresh_interval_secs: u64,

    /// Clock skew tolerated on `exp` and `nbf`, in seconds (default: 0)
    pub leeway_secs: u64,
}

impl VerifierConfig {
    /// Create a config trusting a single issuer whose keys live at `jwks_url`.
    pub fn new(
        issuer: impl Into<String>,
        jwks_url: impl Into<String>,
        audience: impl Into<String>,
    ) -> Self {
        Self {
            trusted_issuers: vec![TrustedIssuer::new(issuer, jwks_url)],
            audience: audience.into(),
            allowed_algorithms: vec![Algorithm::RS256],
            jwks_cache_ttl_secs: 3600,
            jwks_fetch_timeout_ms: 5000,
            jwks_min_refresh_interval_secs: 0,
            leeway_secs: 0,
        }
    }

    /// Create a config for a directory tenant on the default authority.
    ///
    /// Trusts both the v2.0 issuer and the v1.0 (`sts.windows.net`) issuer of the
    /// tenant; both are verified against the tenant's v2.0 key set.
    pub fn for_tenant(tenant_id: &str, audience: impl Into<String>) -> Self {
        let mut config = Self::new("", "", audience);
        config.trusted_issuers = tenant_issuers(DEFAULT_AUTHORITY, tenant_id);
        config
    }

    /// Same as [`for_tenant`](Self::for_tenant) against a different authority host.
    ///
    /// Only the v2.0 issuer moves to the given authority; the v1.0 issuer is
    /// always `https://sts.windows.net/{tenant}/`.
    pub fn for_tenant_at(authority: &str, tenant_id: &str, audience: impl Into<String>) -> Self {
        let mut config = Self::new("", "", audience);
        config.trusted_issuers = tenant_issuers(authority, tenant_id);
        config
    }

    /// Trust an additional issuer, for example another versioned issuer URL of
    /// the same tenant.
    pub fn with_trusted_issuer(
        mut self,
        issuer: impl Into<String>,
        jwks_url: impl Into<String>,
    ) -> Self {
        self.trusted_issuers.push(TrustedIssuer::new(issuer, jwks_url));
        self
    }

    /// Set the JWKS cache TTL in seconds.
    pub fn with_cache_ttl(mut self, ttl_secs: u64) -> Self {
        self.jwks_cache_ttl_secs = ttl_secs;
        self
    }

    /// Set the JWKS fetch timeout in milliseconds.
    pub fn with_fetch_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.jwks_fetch_timeout_ms = timeout_ms;
        self
    }

    /// Set the minimum interval between forced JWKS refreshes.
    ///
    /// Bounds how often unknown `kid`s can trigger a fetch; stale-TTL
    /// refreshes are not affected.
    pub fn with_min_refresh_interval(mut self, interval_secs: u64) -> Self {
        self.jwks_min_refresh_interval_secs = interval_secs;
        self
    }

    /// Set the tolerated clock skew in seconds.
    pub fn with_leeway(mut self, leeway_secs: u64) -> Self {
        self.leeway_secs = leeway_secs;
        self
    }

    /// Set the allowed JWT algorithms. Empty lists will cause validation to fail.
    pub fn with_allowed_algorithms(
        mut self,
        algorithms: impl IntoIterator<Item = Algorithm>,
    ) -> Self {
        self.allowed_algorithms = algorithms.into_iter().collect();
        self
    }

    /// Convenience method to allow a single algorithm.
    pub fn with_allowed_algorithm(mut self, algorithm: Algorithm) -> Self {
        self.allowed_algorithms = vec![algorithm];
        self
    }

    /// The primary (first configured) trusted issuer.
    pub fn primary_issuer(&self) -> Option<&TrustedIssuer> {
        self.trusted_issuers.first()
    }

    /// Look up a configured issuer by exact `iss` value.
    pub fn trusted_issuer(&self, issuer: &str) -> Option<&TrustedIssuer> {
        self.trusted_issuers.iter().find(|t| t.issuer == issuer)
    }
}

fn tenant_issuers(authority: &str, tenant_id: &str) -> Vec<TrustedIssuer> {
    let authority = authority.trim_end_matches('/');
    let jwks_url = format!("{authority}/{tenant_id}/discovery/v2.0/keys");
    vec![
        TrustedIssuer::new(format!("{authority}/{tenant_id}/v2.0"), jwks_url.clone()),
        TrustedIssuer::new(format!("https://sts.windows.net/{tenant_id}/"), jwks_url),
    ]
}
