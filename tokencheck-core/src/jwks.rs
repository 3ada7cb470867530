use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use jsonwebtoken::{Algorithm, DecodingKey};
use serde::Deserialize;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::config::VerifierConfig;
use crate::error::KeyResolutionError;

/// Raw JWK structure as returned by a JWKS endpoint.
/// Unknown members (`x5c`, `x5t`, `issuer`, ...) are ignored.
#[derive(Debug, Clone, Deserialize)]
struct Jwk {
    kid: Option<String>,
    kty: String,
    #[serde(default)]
    alg: Option<String>,
    #[serde(default, rename = "use")]
    key_use: Option<String>,
    #[serde(default)]
    n: Option<String>,
    #[serde(default)]
    e: Option<String>,
    #[serde(default)]
    crv: Option<String>,
    #[serde(default)]
    x: Option<String>,
    #[serde(default)]
    y: Option<String>,
}

impl Jwk {
    fn to_decoding_key(&self) -> Result<DecodingKey, String> {
        match self.kty.as_str() {
            "RSA" => {
                let n = self.n.as_deref().ok_or("RSA key missing 'n' component")?;
                let e = self.e.as_deref().ok_or("RSA key missing 'e' component")?;
                DecodingKey::from_rsa_components(n, e)
                    .map_err(|err| format!("Failed to construct RSA decoding key: {err}"))
            }
            "EC" => {
                let crv = self.crv.as_deref().ok_or("EC key missing 'crv' component")?;
                let size =
                    ec_coordinate_len(crv).ok_or_else(|| format!("Unsupported EC curve: {crv}"))?;
                let x = self.x.as_deref().ok_or("EC key missing 'x' component")?;
                let y = self.y.as_deref().ok_or("EC key missing 'y' component")?;
                check_component_len(crv, "x", x, size)?;
                check_component_len(crv, "y", y, size)?;
                DecodingKey::from_ec_components(x, y)
                    .map_err(|err| format!("Failed to construct EC decoding key: {err}"))
            }
            "OKP" => {
                let crv = self.crv.as_deref().ok_or("OKP key missing 'crv' component")?;
                if crv != "Ed25519" {
                    return Err(format!("Unsupported OKP curve: {crv}"));
                }
                let x = self.x.as_deref().ok_or("OKP key missing 'x' component")?;
                check_component_len(crv, "x", x, 32)?;
                DecodingKey::from_ed_components(x)
                    .map_err(|err| format!("Failed to construct EdDSA decoding key: {err}"))
            }
            other => Err(format!("Unsupported key type: {other}")),
        }
    }
}

/// Byte length of one affine coordinate on the curves jsonwebtoken can verify.
fn ec_coordinate_len(crv: &str) -> Option<usize> {
    match crv {
        "P-256" => Some(32),
        "P-384" => Some(48),
        _ => None,
    }
}

fn check_component_len(crv: &str, name: &str, value: &str, expected: usize) -> Result<(), String> {
    let bytes = URL_SAFE_NO_PAD
        .decode(value)
        .map_err(|err| format!("{crv} key has invalid '{name}' encoding: {err}"))?;
    if bytes.len() != expected {
        return Err(format!(
            "{crv} key '{name}' is {} bytes, expected {expected}",
            bytes.len()
        ));
    }
    Ok(())
}

/// JWKS response envelope.
#[derive(Debug, Deserialize)]
struct JwksResponse {
    keys: Vec<Jwk>,
}

/// A verification key taken from a published key set.
///
/// Entries only come out of [`KeySet::from_json`]; there is no way to build one
/// from loose key material.
#[derive(Clone)]
pub struct KeySetEntry {
    kid: String,
    key_type: String,
    algorithm: Option<Algorithm>,
    key: DecodingKey,
}

impl KeySetEntry {
    pub fn kid(&self) -> &str {
        &self.kid
    }

    /// JWK `kty` (`RSA`, `EC`, `OKP`).
    pub fn key_type(&self) -> &str {
        &self.key_type
    }

    /// The algorithm the key set pins this key to, if it declares one.
    pub fn algorithm(&self) -> Option<Algorithm> {
        self.algorithm
    }

    pub fn decoding_key(&self) -> &DecodingKey {
        &self.key
    }
}

impl std::fmt::Debug for KeySetEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeySetEntry")
            .field("kid", &self.kid)
            .field("key_type", &self.key_type)
            .field("algorithm", &self.algorithm)
            .finish_non_exhaustive()
    }
}

/// A parsed JSON Web Key Set, indexed by `kid`.
#[derive(Clone, Debug, Default)]
pub struct KeySet {
    entries: HashMap<String, KeySetEntry>,
}

impl KeySet {
    /// Parse a JWKS document.
    ///
    /// Entries without a `kid`, marked for a use other than `sig`, or whose key
    /// material cannot be turned into a verification key are skipped.
    pub fn from_json(body: &str) -> Result<Self, KeyResolutionError> {
        let jwks: JwksResponse = serde_json::from_str(body)
            .map_err(|e| KeyResolutionError::InvalidKeySet(format!("Failed to parse JWKS: {e}")))?;

        let mut entries = HashMap::new();
        for jwk in jwks.keys {
            let Some(kid) = jwk.kid.clone() else {
                debug!(kty = %jwk.kty, "Skipping JWK without kid");
                continue;
            };
            if jwk.key_use.as_deref().is_some_and(|u| u != "sig") {
                debug!(%kid, key_use = ?jwk.key_use, "Skipping non-signing JWK");
                continue;
            }
            let algorithm = match jwk.alg.as_deref().map(str::parse::<Algorithm>) {
                None => None,
                Some(Ok(alg)) => Some(alg),
                Some(Err(_)) => {
                    debug!(%kid, alg = ?jwk.alg, "Skipping JWK with unsupported alg");
                    continue;
                }
            };
            match jwk.to_decoding_key() {
                Ok(key) => {
                    entries.insert(
                        kid.clone(),
                        KeySetEntry {
                            kid,
                            key_type: jwk.kty,
                            algorithm,
                            key,
                        },
                    );
                }
                Err(reason) => debug!(%kid, %reason, "Skipping unusable JWK"),
            }
        }

        Ok(Self { entries })
    }

    pub fn get(&self, kid: &str) -> Option<&KeySetEntry> {
        self.entries.get(kid)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn key_ids(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

/// Cached state behind the lock.
struct CacheInner {
    keys: KeySet,
    last_refresh: Option<Instant>,
    last_refresh_attempt: Option<Instant>,
    /// Number of completed fetch attempts; lets waiters detect that someone
    /// else fetched while they were queued on the refresh lock.
    attempts: u64,
    last_error: Option<KeyResolutionError>,
}

/// Resolves `kid`s to verification keys from one remote JWKS endpoint.
///
/// The key set is fetched lazily on the first miss, cached for the configured
/// TTL, and refetched when it goes stale or a `kid` is not found. Concurrent
/// misses share a single in-flight fetch.
pub struct KeyResolver {
    inner: RwLock<CacheInner>,
    jwks_url: String,
    client: reqwest::Client,
    ttl: Duration,
    fetch_timeout: Duration,
    min_refresh_interval: Duration,
    refresh_lock: Mutex<()>,
    fetches: AtomicUsize,
}

impl KeyResolver {
    /// Create a resolver for `jwks_url`, taking cache and timeout settings from `config`.
    /// No request is made until the first resolution.
    pub fn new(jwks_url: impl Into<String>, config: &VerifierConfig) -> Self {
        Self {
            inner: RwLock::new(CacheInner {
                keys: KeySet::default(),
                last_refresh: None,
                last_refresh_attempt: None,
                attempts: 0,
                last_error: None,
            }),
            jwks_url: jwks_url.into(),
            client: reqwest::Client::new(),
            ttl: Duration::from_secs(config.jwks_cache_ttl_secs),
            fetch_timeout: Duration::from_millis(config.jwks_fetch_timeout_ms),
            min_refresh_interval: Duration::from_secs(config.jwks_min_refresh_interval_secs),
            refresh_lock: Mutex::new(()),
            fetches: AtomicUsize::new(0),
        }
    }

    pub fn jwks_url(&self) -> &str {
        &self.jwks_url
    }

    /// Number of network fetches issued so far.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    /// Retrieve the key for the given `kid`.
    ///
    /// A fresh cache hit returns immediately. Otherwise the key set is fetched
    /// once (or the result of a concurrent fetch is reused) and the lookup is
    /// repeated. Still missing after that is [`KeyResolutionError::UnknownKeyId`].
    pub async fn resolve_key(&self, kid: &str) -> Result<KeySetEntry, KeyResolutionError> {
        let seen_attempts = {
            let cache = self.inner.read().await;
            if !is_stale(cache.last_refresh, self.ttl) {
                if let Some(entry) = cache.keys.get(kid) {
                    debug!(kid, "JWKS cache hit");
                    return Ok(entry.clone());
                }
            }
            cache.attempts
        };

        self.refresh(seen_attempts).await?;

        let cache = self.inner.read().await;
        cache.keys.get(kid).cloned().ok_or_else(|| {
            warn!(kid, url = %self.jwks_url, "Key id not found in JWKS");
            KeyResolutionError::UnknownKeyId(kid.to_string())
        })
    }

    /// Drop every cached key so the next resolution fetches the key set again.
    pub async fn invalidate(&self) {
        let mut cache = self.inner.write().await;
        cache.keys = KeySet::default();
        cache.last_refresh = None;
        debug!(url = %self.jwks_url, "JWKS cache invalidated");
    }

    /// Fetch the key set unless another caller finished a fetch since
    /// `seen_attempts` was read, in which case that outcome is reused.
    ///
    /// The reused fetch may have been sent before this caller saw its miss, so
    /// a key published inside that window is reported as unknown until the
    /// next refresh.
    async fn refresh(&self, seen_attempts: u64) -> Result<(), KeyResolutionError> {
        let _guard = self.refresh_lock.lock().await;

        {
            let cache = self.inner.read().await;
            if cache.attempts != seen_attempts {
                // Someone else fetched while we were queued; reuse their outcome.
                return match &cache.last_error {
                    Some(err) => Err(err.clone()),
                    None => Ok(()),
                };
            }
            if cache.last_refresh.is_some()
                && !can_attempt(cache.last_refresh_attempt, self.min_refresh_interval)
            {
                debug!(url = %self.jwks_url, "JWKS refresh throttled");
                return Ok(());
            }
        }

        let outcome = match tokio::time::timeout(self.fetch_timeout, self.fetch()).await {
            Ok(result) => result,
            Err(_) => Err(KeyResolutionError::Timeout),
        };

        // Single write: a caller cancelled before this point leaves the cache untouched.
        let now = Instant::now();
        let mut cache = self.inner.write().await;
        cache.attempts += 1;
        cache.last_refresh_attempt = Some(now);
        match outcome {
            Ok(keys) => {
                info!(url = %self.jwks_url, keys = keys.len(), "JWKS loaded");
                cache.keys = keys;
                cache.last_refresh = Some(now);
                cache.last_error = None;
                Ok(())
            }
            Err(err) => {
                warn!(url = %self.jwks_url, error = %err, "JWKS fetch failed");
                cache.last_error = Some(err.clone());
                Err(err)
            }
        }
    }

    async fn fetch(&self) -> Result<KeySet, KeyResolutionError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        debug!(url = %self.jwks_url, "Fetching JWKS");

        let response = self
            .client
            .get(&self.jwks_url)
            .send()
            .await
            .map_err(|e| KeyResolutionError::Fetch(e.to_string()))?;

        let response = response
            .error_for_status()
            .map_err(|e| KeyResolutionError::Fetch(e.to_string()))?;

        let body = response
            .text()
            .await
            .map_err(|e| KeyResolutionError::Fetch(e.to_string()))?;

        KeySet::from_json(&body)
    }
}

fn is_stale(last_refresh: Option<Instant>, ttl: Duration) -> bool {
    match last_refresh {
        None => true,
        Some(ts) => ts.elapsed() >= ttl,
    }
}

fn can_attempt(last_attempt: Option<Instant>, min_interval: Duration) -> bool {
    match last_attempt {
        None => true,
        Some(ts) => ts.elapsed() >= min_interval,
    }
}
