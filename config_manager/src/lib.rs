use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum ConfigurationError {
    #[error("Configuration loading error: {0}")]
    ConfigLoad(#[from] ConfigError),
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

pub type Result<T> = std::result::Result<T, ConfigurationError>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemConfig {
    /// Alchemy API configuration (token balances and base metadata)
    pub alchemy: AlchemyConfig,

    /// CoinMarketCap API configuration (secondary price/logo provider)
    pub coinmarketcap: CoinMarketCapConfig,

    /// CoinGecko API configuration (tertiary price/logo provider)
    pub coingecko: CoinGeckoConfig,

    /// LI.FI token catalog configuration (native-token metadata)
    pub lifi: LifiConfig,

    /// Wallet scan batching and retry configuration
    pub scan: ScanConfig,

    /// Holdings result cache configuration
    pub cache: CacheConfig,

    /// API server configuration
    pub api: ApiConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlchemyConfig {
    /// Alchemy API key, appended to the per-chain base URL
    pub api_key: String,

    /// Request timeout in seconds
    pub request_timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoinMarketCapConfig {
    /// CoinMarketCap Pro API key; empty disables the provider (lookups
    /// resolve to "no entry" instead of erroring)
    pub api_key: String,

    /// CoinMarketCap API base URL
    pub api_base_url: String,

    /// Request timeout in seconds
    pub request_timeout_seconds: u64,

    /// Page size for the id-map listing call
    pub map_listing_limit: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoinGeckoConfig {
    /// CoinGecko API base URL (public API needs no key)
    pub api_base_url: String,

    /// Request timeout in seconds
    pub request_timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifiConfig {
    /// LI.FI API base URL
    pub api_base_url: String,

    /// Request timeout in seconds
    pub request_timeout_seconds: u64,

    /// How long a fetched token catalog stays fresh
    pub catalog_ttl_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Chains fetched concurrently per balance-fetch batch
    pub chain_batch_size: usize,

    /// Tokens enriched concurrently per enrichment batch
    pub token_batch_size: usize,

    /// Pause between consecutive batches in milliseconds
    pub inter_batch_delay_ms: u64,

    /// Retry attempts per external call, not counting the initial attempt
    pub max_retries: u32,

    /// Base backoff delay in milliseconds (doubles per attempt)
    pub retry_base_delay_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// How long a cached holdings payload stays fresh
    pub ttl_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// API server host
    pub host: String,

    /// API server port
    pub port: u16,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            alchemy: AlchemyConfig {
                api_key: "".to_string(), // Must be set in config.toml or env
                request_timeout_seconds: 10,
            },
            coinmarketcap: CoinMarketCapConfig {
                api_key: "".to_string(), // Optional; empty skips the provider
                api_base_url: "https://pro-api.coinmarketcap.com".to_string(),
                request_timeout_seconds: 10,
                map_listing_limit: 5000,
            },
            coingecko: CoinGeckoConfig {
                api_base_url: "https://api.coingecko.com".to_string(),
                request_timeout_seconds: 10,
            },
            lifi: LifiConfig {
                api_base_url: "https://li.quest".to_string(),
                request_timeout_seconds: 10,
                catalog_ttl_seconds: 86_400, // 24 hours
            },
            scan: ScanConfig {
                chain_batch_size: 3,
                token_batch_size: 5,
                inter_batch_delay_ms: 100,
                max_retries: 2,
                retry_base_delay_ms: 1_000,
            },
            cache: CacheConfig {
                ttl_seconds: 86_400, // 24 hours
            },
            api: ApiConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
            },
        }
    }
}

impl AlchemyConfig {
    pub fn validate(&self) -> Result<()> {
        if self.api_key.is_empty() {
            return Err(ConfigurationError::InvalidValue(
                "Alchemy API key is required".to_string(),
            ));
        }

        if self.request_timeout_seconds == 0 {
            return Err(ConfigurationError::InvalidValue(
                "Alchemy request timeout must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

impl CoinMarketCapConfig {
    /// The provider runs keyless (every lookup resolves to "no entry"), so
    /// only the reachable-endpoint fields are checked here.
    pub fn validate(&self) -> Result<()> {
        if self.api_base_url.is_empty() {
            return Err(ConfigurationError::InvalidValue(
                "CoinMarketCap base URL is required".to_string(),
            ));
        }

        if self.request_timeout_seconds == 0 {
            return Err(ConfigurationError::InvalidValue(
                "CoinMarketCap request timeout must be greater than 0".to_string(),
            ));
        }

        if self.map_listing_limit == 0 {
            return Err(ConfigurationError::InvalidValue(
                "CoinMarketCap map listing limit must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

impl CoinGeckoConfig {
    pub fn validate(&self) -> Result<()> {
        if self.api_base_url.is_empty() {
            return Err(ConfigurationError::InvalidValue(
                "CoinGecko base URL is required".to_string(),
            ));
        }

        if self.request_timeout_seconds == 0 {
            return Err(ConfigurationError::InvalidValue(
                "CoinGecko request timeout must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

impl LifiConfig {
    pub fn validate(&self) -> Result<()> {
        if self.api_base_url.is_empty() {
            return Err(ConfigurationError::InvalidValue(
                "LI.FI base URL is required".to_string(),
            ));
        }

        if self.request_timeout_seconds == 0 {
            return Err(ConfigurationError::InvalidValue(
                "LI.FI request timeout must be greater than 0".to_string(),
            ));
        }

        if self.catalog_ttl_seconds == 0 {
            return Err(ConfigurationError::InvalidValue(
                "LI.FI catalog TTL must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

impl ScanConfig {
    pub fn validate(&self) -> Result<()> {
        if self.chain_batch_size == 0 {
            return Err(ConfigurationError::InvalidValue(
                "Chain batch size must be greater than 0".to_string(),
            ));
        }

        if self.token_batch_size == 0 {
            return Err(ConfigurationError::InvalidValue(
                "Token batch size must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

impl CacheConfig {
    pub fn validate(&self) -> Result<()> {
        if self.ttl_seconds == 0 {
            return Err(ConfigurationError::InvalidValue(
                "Cache TTL must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

impl SystemConfig {
    /// Load configuration from file and environment variables
    pub fn load() -> Result<Self> {
        Self::load_from_path("config.toml")
    }

    /// Load configuration from a specific file path
    pub fn load_from_path<P: AsRef<Path>>(config_path: P) -> Result<Self> {
        let mut config_builder = Config::builder()
            // Start with defaults
            .add_source(Config::try_from(&SystemConfig::default())?);

        // Add config file if it exists
        if config_path.as_ref().exists() {
            info!(
                "Loading configuration from: {}",
                config_path.as_ref().display()
            );
            config_builder = config_builder.add_source(File::from(config_path.as_ref()));
        } else {
            debug!("Config file not found, using defaults and environment variables");
        }

        // Add environment variables with prefix, e.g. HOLDINGS__ALCHEMY__API_KEY
        config_builder = config_builder.add_source(
            Environment::with_prefix("HOLDINGS")
                .try_parsing(true)
                .separator("__"),
        );

        let config = config_builder.build()?;
        let system_config: SystemConfig = config.try_deserialize()?;

        system_config.validate()?;

        Ok(system_config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        self.alchemy.validate()?;
        self.coinmarketcap.validate()?;
        self.coingecko.validate()?;
        self.lifi.validate()?;
        self.scan.validate()?;
        self.cache.validate()?;

        if self.api.port == 0 {
            return Err(ConfigurationError::InvalidValue(
                "API port cannot be 0".to_string(),
            ));
        }

        Ok(())
    }
}
