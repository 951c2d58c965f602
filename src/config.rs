//! Gateway configuration loaded from environment variables.
//!
//! All settings come from environment variables (or a `.env` file via
//! `dotenvy`). Missing credentials for the selected backends are fatal:
//! [`GatewayConfig::from_env`] returns a [`ConfigError`] and the process
//! must not start.

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

/// Configuration fault detected at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required setting is absent or empty.
    #[error("{0} is not set")]
    Missing(&'static str),

    /// A setting is present but cannot be parsed.
    #[error("invalid value for {key}: {value:?}")]
    Invalid {
        /// Environment variable name.
        key: &'static str,
        /// Offending value.
        value: String,
    },
}

/// Which [`crate::persistence::LedgerStore`] to run against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    /// PostgreSQL through `sqlx`.
    Postgres,
    /// In-process store; data is lost on restart.
    Memory,
}

impl FromStr for StorageBackend {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(Self::Postgres),
            "memory" => Ok(Self::Memory),
            _ => Err(()),
        }
    }
}

/// Which [`crate::generator::ImageGenerator`] to call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeneratorBackend {
    /// Replicate predictions API.
    Replicate,
    /// Stock images, no network.
    Placeholder,
}

impl FromStr for GeneratorBackend {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "replicate" => Ok(Self::Replicate),
            "placeholder" => Ok(Self::Placeholder),
            _ => Err(()),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable lines.
    Pretty,
    /// One JSON object per line.
    Json,
}

impl FromStr for LogFormat {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            _ => Err(()),
        }
    }
}

/// Connection pool settings.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection string.
    pub url: String,
    /// Maximum number of pooled connections.
    pub max_connections: u32,
    /// Connections kept open while idle.
    pub min_connections: u32,
    /// How long a query waits for a free connection before failing.
    pub acquire_timeout_secs: u64,
}

/// Replicate client settings.
#[derive(Clone)]
pub struct ReplicateSettings {
    /// API token.
    pub api_key: String,
    /// Model reference, `owner/name`.
    pub model: String,
    /// API root.
    pub base_url: String,
    /// Upper bound for one generation.
    pub timeout_secs: u64,
}

impl std::fmt::Debug for ReplicateSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplicateSettings")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl ReplicateSettings {
    /// Builds the client configuration.
    #[must_use]
    pub fn client_config(&self) -> crate::generator::ReplicateConfig {
        crate::generator::ReplicateConfig {
            api_key: self.api_key.clone(),
            model: self.model.clone(),
            base_url: self.base_url.clone(),
            timeout: Duration::from_secs(self.timeout_secs),
            poll_interval: Duration::from_secs(1),
        }
    }
}

/// Business rules of the ledger and the generation flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerRules {
    /// Credits charged per generation.
    pub generation_cost: i64,
    /// Credits granted once to a new account.
    pub signup_bonus: i64,
    /// Shortest accepted prompt, in characters.
    pub min_prompt_len: usize,
    /// Longest accepted prompt, in characters.
    pub max_prompt_len: usize,
    /// Aspect ratio sent to the generator.
    pub aspect_ratio: String,
    /// Output format sent to the generator.
    pub output_format: String,
}

impl Default for LedgerRules {
    fn default() -> Self {
        Self {
            generation_cost: 1,
            signup_bonus: 3,
            min_prompt_len: 5,
            max_prompt_len: 1000,
            aspect_ratio: "1:1".to_string(),
            output_format: "webp".to_string(),
        }
    }
}

/// Top-level gateway configuration.
///
/// Loaded once at startup via [`GatewayConfig::from_env`].
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Socket address to bind the HTTP server to (e.g. `0.0.0.0:3000`).
    pub listen_addr: SocketAddr,

    /// Selected ledger store.
    pub storage: StorageBackend,

    /// Pool settings; present when `storage` is [`StorageBackend::Postgres`].
    pub database: Option<DatabaseConfig>,

    /// Selected image generator.
    pub generator: GeneratorBackend,

    /// Client settings; present when `generator` is
    /// [`GeneratorBackend::Replicate`].
    pub replicate: Option<ReplicateSettings>,

    /// Pricing, bonus and prompt limits.
    pub rules: LedgerRules,

    /// Capacity of the EventBus broadcast channel.
    pub event_bus_capacity: usize,

    /// Log output format.
    pub log_format: LogFormat,
}

impl GatewayConfig {
    /// Loads configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv().ok()` to optionally load a `.env` file.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] when a required setting is missing or a
    /// present setting cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration through an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// See [`GatewayConfig::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let env = Env { lookup };

        let listen_addr: SocketAddr = env.parse("LISTEN_ADDR", "0.0.0.0:3000".parse().ok())?;
        let storage = env.parse("STORAGE_BACKEND", Some(StorageBackend::Postgres))?;
        let generator = env.parse("GENERATOR_BACKEND", Some(GeneratorBackend::Replicate))?;

        let database = match storage {
            StorageBackend::Postgres => Some(DatabaseConfig {
                url: env.required("DATABASE_URL")?,
                max_connections: env.parse("DATABASE_MAX_CONNECTIONS", Some(5))?,
                min_connections: env.parse("DATABASE_MIN_CONNECTIONS", Some(1))?,
                acquire_timeout_secs: env.parse("DATABASE_ACQUIRE_TIMEOUT_SECS", Some(5))?,
            }),
            StorageBackend::Memory => None,
        };

        let replicate = match generator {
            GeneratorBackend::Replicate => Some(ReplicateSettings {
                api_key: env.required("REPLICATE_API_KEY")?,
                model: env.string("REPLICATE_MODEL", "black-forest-labs/flux-1-dev"),
                base_url: env.string("REPLICATE_BASE_URL", "https://api.replicate.com"),
                timeout_secs: env.parse("REPLICATE_TIMEOUT_SECS", Some(120))?,
            }),
            GeneratorBackend::Placeholder => None,
        };

        let defaults = LedgerRules::default();
        let rules = LedgerRules {
            generation_cost: env.parse("GENERATION_COST", Some(defaults.generation_cost))?,
            signup_bonus: env.parse("SIGNUP_BONUS", Some(defaults.signup_bonus))?,
            min_prompt_len: env.parse("MIN_PROMPT_LENGTH", Some(defaults.min_prompt_len))?,
            max_prompt_len: env.parse("MAX_PROMPT_LENGTH", Some(defaults.max_prompt_len))?,
            aspect_ratio: env.string("DEFAULT_ASPECT_RATIO", &defaults.aspect_ratio),
            output_format: env.string("DEFAULT_OUTPUT_FORMAT", &defaults.output_format),
        };
        if rules.generation_cost <= 0 {
            return Err(ConfigError::Invalid {
                key: "GENERATION_COST",
                value: rules.generation_cost.to_string(),
            });
        }
        if rules.signup_bonus < 0 {
            return Err(ConfigError::Invalid {
                key: "SIGNUP_BONUS",
                value: rules.signup_bonus.to_string(),
            });
        }

        Ok(Self {
            listen_addr,
            storage,
            database,
            generator,
            replicate,
            rules,
            event_bus_capacity: env.parse("EVENT_BUS_CAPACITY", Some(1024))?,
            log_format: env.parse("LOG_FORMAT", Some(LogFormat::Pretty))?,
        })
    }
}

struct Env<F> {
    lookup: F,
}

impl<F: Fn(&str) -> Option<String>> Env<F> {
    fn get(&self, key: &str) -> Option<String> {
        (self.lookup)(key).filter(|v| !v.trim().is_empty())
    }

    fn required(&self, key: &'static str) -> Result<String, ConfigError> {
        self.get(key).ok_or(ConfigError::Missing(key))
    }

    fn string(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or_else(|| default.to_string())
    }

    /// Parses `key` as `T`; a missing key yields `default`, an unparsable
    /// one is an error rather than a silent fallback.
    fn parse<T: FromStr>(&self, key: &'static str, default: Option<T>) -> Result<T, ConfigError> {
        match self.get(key) {
            Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
                key,
                value: raw.clone(),
            }),
            None => default.ok_or(ConfigError::Missing(key)),
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(pairs: &[(&str, &str)]) -> Result<GatewayConfig, ConfigError> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        GatewayConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_require_database_and_api_key() {
        assert!(matches!(load(&[]), Err(ConfigError::Missing("DATABASE_URL"))));
        assert!(matches!(
            load(&[("DATABASE_URL", "postgres://localhost/ledger")]),
            Err(ConfigError::Missing("REPLICATE_API_KEY"))
        ));
    }

    #[test]
    fn full_production_config() {
        let Ok(config) = load(&[
            ("DATABASE_URL", "postgres://localhost/ledger"),
            ("REPLICATE_API_KEY", "r8_token"),
            ("DATABASE_MAX_CONNECTIONS", "8"),
        ]) else {
            panic!("config should load");
        };
        assert_eq!(config.storage, StorageBackend::Postgres);
        assert_eq!(config.database.map(|d| d.max_connections), Some(8));
        assert_eq!(
            config.replicate.map(|r| r.model),
            Some("black-forest-labs/flux-1-dev".to_string())
        );
        assert_eq!(config.rules, LedgerRules::default());
        assert_eq!(config.listen_addr.port(), 3000);
    }

    #[test]
    fn memory_and_placeholder_need_no_credentials() {
        let Ok(config) = load(&[
            ("STORAGE_BACKEND", "memory"),
            ("GENERATOR_BACKEND", "placeholder"),
            ("LOG_FORMAT", "json"),
        ]) else {
            panic!("config should load");
        };
        assert!(config.database.is_none());
        assert!(config.replicate.is_none());
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn unparsable_values_are_rejected() {
        let result = load(&[
            ("STORAGE_BACKEND", "memory"),
            ("GENERATOR_BACKEND", "placeholder"),
            ("SIGNUP_BONUS", "three"),
        ]);
        assert!(matches!(
            result,
            Err(ConfigError::Invalid { key: "SIGNUP_BONUS", .. })
        ));
    }

    #[test]
    fn non_positive_cost_is_rejected() {
        let result = load(&[
            ("STORAGE_BACKEND", "memory"),
            ("GENERATOR_BACKEND", "placeholder"),
            ("GENERATION_COST", "0"),
        ]);
        assert!(matches!(
            result,
            Err(ConfigError::Invalid { key: "GENERATION_COST", .. })
        ));
    }
}
