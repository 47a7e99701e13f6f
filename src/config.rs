use alloy_primitives::Address;
use serde::Deserialize;
use std::fs;
use std::str::FromStr;
use std::time::Duration;

use crate::fetcher::RetryPolicy;

pub const CONFIG_ENV: &str = "TOKEN_SCANNER_CONFIG";

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub rpc: RpcConfig,
    pub explorer: ExplorerConfig,
    pub dex: DexConfig,
    #[serde(default)]
    pub native: NativeConfig,
    pub burn: BurnConfig,
    #[serde(default)]
    pub query: QueryConfig,
    #[serde(default)]
    pub holders: HoldersConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RpcConfig {
    pub endpoint: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ExplorerConfig {
    pub api: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DexConfig {
    pub api: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct NativeConfig {
    #[serde(default = "default_native_name")]
    pub name: String,
    #[serde(default = "default_native_symbol")]
    pub symbol: String,
    #[serde(default = "default_native_decimals")]
    pub decimals: u8,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BurnConfig {
    pub addresses: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct QueryConfig {
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct HoldersConfig {
    #[serde(default = "default_holder_target")]
    pub target: usize,
    #[serde(default = "default_page_delay_ms")]
    pub page_delay_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_native_name() -> String {
    "PulseChain".to_string()
}

fn default_native_symbol() -> String {
    "PLS".to_string()
}

fn default_native_decimals() -> u8 {
    18
}

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_retry_attempts() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    1_000
}

fn default_holder_target() -> usize {
    crate::services::holders::DEFAULT_TARGET
}

fn default_page_delay_ms() -> u64 {
    1_000
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for NativeConfig {
    fn default() -> Self {
        Self {
            name: default_native_name(),
            symbol: default_native_symbol(),
            decimals: default_native_decimals(),
        }
    }
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            retry_attempts: default_retry_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

impl Default for HoldersConfig {
    fn default() -> Self {
        Self {
            target: default_holder_target(),
            page_delay_ms: default_page_delay_ms(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl QueryConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            attempts: self.retry_attempts,
            delay: Duration::from_millis(self.retry_delay_ms),
            timeout: Duration::from_millis(self.timeout_ms),
        }
    }
}

impl BurnConfig {
    /// Parsed burn addresses in configured order.
    pub fn parsed(&self) -> Result<Vec<Address>, ConfigError> {
        self.addresses
            .iter()
            .map(|raw| {
                Address::from_str(raw.trim())
                    .map_err(|_| ConfigError::Invalid(format!("bad burn address '{}'", raw)))
            })
            .collect()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("cannot parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

impl Config {
    /// Reads `$TOKEN_SCANNER_CONFIG`, falling back to `./config.toml`.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var(CONFIG_ENV).unwrap_or_else(|_| "config.toml".to_string());
        let content = fs::read_to_string(&path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.query.retry_attempts == 0 {
            return Err(ConfigError::Invalid("query.retry_attempts must be at least 1".into()));
        }
        if self.burn.addresses.is_empty() {
            return Err(ConfigError::Invalid("burn.addresses must not be empty".into()));
        }
        if self.holders.target == 0 {
            return Err(ConfigError::Invalid("holders.target must be at least 1".into()));
        }
        self.burn.parsed()?;
        Ok(())
    }
}
