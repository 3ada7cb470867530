use std::path::Path;

use serde::Deserialize;
use tokencheck_core::config::DEFAULT_AUTHORITY;
use tokencheck_core::{Algorithm, VerifierConfig};

pub const ENV_TENANT_ID: &str = "TENANT_ID";
pub const ENV_APPLICATION_ID: &str = "APPLICATION_ID";
pub const ENV_ALLOWED_ALGORITHMS: &str = "ALLOWED_ALGORITHMS";
pub const ENV_CACHE_TTL: &str = "JWKS_CACHE_TTL_SECS";
pub const ENV_FETCH_TIMEOUT: &str = "JWKS_FETCH_TIMEOUT_MS";
pub const ENV_MIN_REFRESH_INTERVAL: &str = "JWKS_MIN_REFRESH_INTERVAL_SECS";
pub const ENV_CLOCK_SKEW: &str = "CLOCK_SKEW_SECS";
pub const ENV_AUTHORITY: &str = "AUTHORITY_HOST";

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    /// A required setting is absent from every source.
    Missing(&'static str),
    /// The configuration file could not be read or parsed.
    Load(String),
    /// A setting is present but its value is unusable.
    Invalid { key: &'static str, message: String },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(
                f,
                "{key} is not set. Please check your .env file or configuration."
            ),
            ConfigError::Load(msg) => write!(f, "Config load error: {msg}"),
            ConfigError::Invalid { key, message } => {
                write!(f, "Invalid value for '{key}': {message}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Contents of the optional YAML configuration file. Every key is optional;
/// environment variables take precedence.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub tenant_id: Option<String>,
    pub audience: Option<String>,
    pub allowed_algorithms: Option<Vec<String>>,
    pub cache_ttl_secs: Option<u64>,
    pub fetch_timeout_ms: Option<u64>,
    pub min_refresh_interval_secs: Option<u64>,
    pub leeway_secs: Option<u64>,
    pub authority: Option<String>,
}

impl FileConfig {
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Load(format!("{}: {e}", path.display())))?;
        Self::from_yaml_str(&content)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content).map_err(|e| ConfigError::Load(e.to_string()))
    }
}

/// Fully resolved CLI configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct CliConfig {
    pub tenant_id: String,
    pub audience: String,
    pub allowed_algorithms: Vec<Algorithm>,
    pub cache_ttl_secs: Option<u64>,
    pub fetch_timeout_ms: Option<u64>,
    pub min_refresh_interval_secs: Option<u64>,
    pub leeway_secs: Option<u64>,
    pub authority: String,
}

impl CliConfig {
    /// Load configuration.
    ///
    /// Resolution order (lowest to highest priority):
    /// 1. the YAML file at `path`, if given
    /// 2. `.env` file (loaded into process environment, never overwriting)
    /// 3. environment variables
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let file = match path {
            Some(path) => FileConfig::from_path(path)?,
            None => FileConfig::default(),
        };
        let _ = dotenvy::dotenv();
        Self::resolve(file, |key| std::env::var(key).ok())
    }

    /// Merge file values with variables looked up through `env`.
    pub fn resolve(
        file: FileConfig,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let lookup = |key: &str| env(key).filter(|v| !v.trim().is_empty());

        let tenant_id = lookup(ENV_TENANT_ID)
            .or(file.tenant_id)
            .ok_or(ConfigError::Missing(ENV_TENANT_ID))?;
        let audience = lookup(ENV_APPLICATION_ID)
            .or(file.audience)
            .ok_or(ConfigError::Missing(ENV_APPLICATION_ID))?;

        let allowed_algorithms = match lookup(ENV_ALLOWED_ALGORITHMS) {
            Some(list) => parse_algorithms(list.split(',').map(str::trim))?,
            None => match file.allowed_algorithms {
                Some(list) => parse_algorithms(list.iter().map(String::as_str))?,
                None => vec![Algorithm::RS256],
            },
        };

        Ok(Self {
            tenant_id,
            audience,
            allowed_algorithms,
            cache_ttl_secs: parse_number(&lookup, ENV_CACHE_TTL)?.or(file.cache_ttl_secs),
            fetch_timeout_ms: parse_number(&lookup, ENV_FETCH_TIMEOUT)?.or(file.fetch_timeout_ms),
            min_refresh_interval_secs: parse_number(&lookup, ENV_MIN_REFRESH_INTERVAL)?
                .or(file.min_refresh_interval_secs),
            leeway_secs: parse_number(&lookup, ENV_CLOCK_SKEW)?.or(file.leeway_secs),
            authority: lookup(ENV_AUTHORITY)
                .or(file.authority)
                .unwrap_or_else(|| DEFAULT_AUTHORITY.to_string()),
        })
    }

    /// Build the verifier configuration for this tenant.
    pub fn to_verifier_config(&self) -> VerifierConfig {
        let mut config = VerifierConfig::for_tenant_at(&self.authority, &self.tenant_id, &self.audience)
            .with_allowed_algorithms(self.allowed_algorithms.iter().copied());
        if let Some(ttl) = self.cache_ttl_secs {
            config = config.with_cache_ttl(ttl);
        }
        if let Some(timeout) = self.fetch_timeout_ms {
            config = config.with_fetch_timeout_ms(timeout);
        }
        if let Some(interval) = self.min_refresh_interval_secs {
            config = config.with_min_refresh_interval(interval);
        }
        if let Some(leeway) = self.leeway_secs {
            config = config.with_leeway(leeway);
        }
        config
    }
}

fn parse_algorithms<'a>(
    names: impl Iterator<Item = &'a str>,
) -> Result<Vec<Algorithm>, ConfigError> {
    let algorithms = names
        .filter(|name| !name.is_empty())
        .map(|name| {
            name.parse::<Algorithm>().map_err(|_| ConfigError::Invalid {
                key: ENV_ALLOWED_ALGORITHMS,
                message: format!("unknown algorithm '{name}'"),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    if algorithms.is_empty() {
        return Err(ConfigError::Invalid {
            key: ENV_ALLOWED_ALGORITHMS,
            message: "at least one algorithm is required".into(),
        });
    }
    Ok(algorithms)
}

fn parse_number(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
) -> Result<Option<u64>, ConfigError> {
    lookup(key)
        .map(|raw| {
            raw.trim().parse::<u64>().map_err(|e| ConfigError::Invalid {
                key,
                message: e.to_string(),
            })
        })
        .transpose()
}
