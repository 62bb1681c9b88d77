//! Environment-based configuration.
//!
//! Loads a `.env` file if present, then reads process environment
//! variables. Secrets get a redacting `Debug` so they never leak through
//! error reports or startup logging.

use alloy::primitives::Address;
use bigdecimal::BigDecimal;
use eyre::{eyre, Result, WrapErr};
use std::env;
use std::fmt;
use std::net::SocketAddr;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use crate::orchestrator::BridgeSettings;

/// Main configuration for the bridge orchestrator.
#[derive(Debug, Clone)]
pub struct Config {
    pub api: ApiConfig,
    pub relay: RelayConfig,
    pub store: StoreConfig,
    pub wallets: WalletProviderConfig,
    pub bridge: BridgeConfig,
}

/// API server configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub bind: SocketAddr,
}

/// Deposit relay configuration.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub endpoint: String,
    /// Relay calls are plain round trips to a trusted service; they get a
    /// short timeout so a dead relay surfaces instead of hanging the UI.
    pub timeout_ms: u64,
}

/// Record store configuration.
#[derive(Clone)]
pub struct StoreConfig {
    pub base_url: String,
    pub api_key: Option<String>,
}

/// Custom Debug that redacts the API key.
impl fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Wallet provider endpoints.
#[derive(Debug, Clone)]
pub struct WalletProviderConfig {
    pub l1_url: String,
    pub l2_url: String,
}

/// Bridge behavior configuration.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub min_amount: BigDecimal,
    pub l1_address_prefix: String,
    pub l2_bridge_address: Address,
    pub attach_attempts: u32,
    pub attach_retry_delay_ms: u64,
}

impl BridgeConfig {
    pub fn settings(&self) -> BridgeSettings {
        BridgeSettings {
            min_amount: self.min_amount.clone(),
            l1_address_prefix: self.l1_address_prefix.clone(),
            l2_bridge_address: self.l2_bridge_address,
            attach_attempts: self.attach_attempts,
            attach_retry_delay: Duration::from_millis(self.attach_retry_delay_ms),
        }
    }
}

fn default_api_bind() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

fn default_relay_timeout_ms() -> u64 {
    5000
}

fn default_min_amount() -> BigDecimal {
    // 0.01 display units
    BigDecimal::new(1.into(), 2)
}

fn default_l1_address_prefix() -> String {
    "kas".to_string()
}

fn default_attach_attempts() -> u32 {
    3
}

fn default_attach_retry_delay_ms() -> u64 {
    2000
}

impl Config {
    /// Load configuration from the environment, reading `.env` first.
    pub fn load() -> Result<Self> {
        Self::load_from_file(".env")
    }

    /// Load from a specific `.env` file path, then the environment.
    pub fn load_from_file(path: &str) -> Result<Self> {
        if Path::new(path).exists() {
            dotenvy::from_filename(path)
                .wrap_err_with(|| format!("Failed to load .env file from {}", path))?;
        }
        Self::load_from_env()
    }

    /// Load configuration from environment variables only.
    pub fn load_from_env() -> Result<Self> {
        let api = ApiConfig {
            bind: match env::var("API_BIND") {
                Ok(raw) => raw
                    .parse()
                    .map_err(|e| eyre!("Invalid API_BIND {raw:?}: {e}"))?,
                Err(_) => default_api_bind(),
            },
        };

        let relay = RelayConfig {
            endpoint: env::var("RELAY_URL")
                .map_err(|_| eyre!("RELAY_URL environment variable is required"))?,
            timeout_ms: optional_parsed("RELAY_TIMEOUT_MS")?.unwrap_or_else(default_relay_timeout_ms),
        };

        let store = StoreConfig {
            base_url: env::var("STORE_URL")
                .map_err(|_| eyre!("STORE_URL environment variable is required"))?,
            api_key: env::var("STORE_API_KEY").ok().filter(|k| !k.is_empty()),
        };

        let wallets = WalletProviderConfig {
            l1_url: env::var("L1_WALLET_URL")
                .map_err(|_| eyre!("L1_WALLET_URL environment variable is required"))?,
            l2_url: env::var("L2_WALLET_URL")
                .map_err(|_| eyre!("L2_WALLET_URL environment variable is required"))?,
        };

        let l2_bridge_address = env::var("L2_BRIDGE_ADDRESS")
            .map_err(|_| eyre!("L2_BRIDGE_ADDRESS environment variable is required"))?;
        let bridge = BridgeConfig {
            min_amount: match env::var("MIN_BRIDGE_AMOUNT") {
                Ok(raw) => BigDecimal::from_str(&raw)
                    .map_err(|e| eyre!("Invalid MIN_BRIDGE_AMOUNT {raw:?}: {e}"))?,
                Err(_) => default_min_amount(),
            },
            l1_address_prefix: env::var("L1_ADDRESS_PREFIX")
                .unwrap_or_else(|_| default_l1_address_prefix()),
            l2_bridge_address: Address::from_str(&l2_bridge_address)
                .map_err(|e| eyre!("Invalid L2_BRIDGE_ADDRESS {l2_bridge_address:?}: {e}"))?,
            attach_attempts: optional_parsed("ATTACH_ATTEMPTS")?
                .unwrap_or_else(default_attach_attempts),
            attach_retry_delay_ms: optional_parsed("ATTACH_RETRY_DELAY_MS")?
                .unwrap_or_else(default_attach_retry_delay_ms),
        };

        Ok(Config {
            api,
            relay,
            store,
            wallets,
            bridge,
        })
    }
}

/// Read an optional env var and parse it, erroring only when set and bad.
fn optional_parsed<T: FromStr>(name: &str) -> Result<Option<T>>
where
    T::Err: fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .map(Some)
            .map_err(|e| eyre!("Invalid {name} {raw:?}: {e}")),
        Err(_) => Ok(None),
    }
}
