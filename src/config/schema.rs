//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the swap
//! client. All types derive Serde traits for deserialization from config files.

use alloy::primitives::{address, Address};
use serde::{Deserialize, Serialize};

/// Root configuration for the swap client.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    /// Target network the session must be connected to.
    pub network: NetworkConfig,

    /// Deployed factory and router addresses.
    pub contracts: ContractsConfig,

    /// Tradable tokens. The first two form the default pair.
    pub tokens: Vec<TokenRef>,

    /// Swap form behaviour (slippage, debounce, polling).
    pub swap: SwapConfig,

    /// Chain client timeouts.
    pub chain: ChainConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            network: NetworkConfig::default(),
            contracts: ContractsConfig::default(),
            tokens: default_tokens(),
            swap: SwapConfig::default(),
            chain: ChainConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

impl AppConfig {
    /// Look up a configured token by symbol (case-insensitive) or address.
    pub fn token(&self, key: &str) -> Option<&TokenRef> {
        self.tokens.iter().find(|t| {
            t.symbol.eq_ignore_ascii_case(key)
                || key.parse::<Address>().map(|a| a == t.address).unwrap_or(false)
        })
    }

    /// The default (from, to) pair: the first two configured tokens.
    pub fn default_pair(&self) -> Option<(TokenRef, TokenRef)> {
        match self.tokens.as_slice() {
            [a, b, ..] => Some((a.clone(), b.clone())),
            _ => None,
        }
    }
}

/// Target network definition, also used to ask the wallet to add the chain.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct NetworkConfig {
    /// Required chain ID (e.g., 11155111 for Sepolia).
    pub chain_id: u64,

    /// Human-readable chain name.
    pub name: String,

    /// JSON-RPC endpoint URL.
    pub rpc_url: String,

    /// Block explorer base URL.
    pub explorer_url: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            chain_id: 11_155_111,
            name: "Sepolia".to_string(),
            rpc_url: "https://ethereum-sepolia-rpc.publicnode.com".to_string(),
            explorer_url: "https://sepolia.etherscan.io".to_string(),
        }
    }
}

/// Deployed protocol contracts.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ContractsConfig {
    /// Pair factory.
    pub factory: Address,

    /// Router used for quotes, swaps and as the approval spender.
    pub router: Address,
}

impl Default for ContractsConfig {
    fn default() -> Self {
        Self {
            factory: address!("2e25CAaBC48874498cd18906D1311d6F7Db6FA1A"),
            router: address!("f5B6477D2b26B3892C92AA2B5B63DCAF79441fB8"),
        }
    }
}

/// Static token metadata. `decimals` is authoritative for all conversions.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq, Hash)]
pub struct TokenRef {
    pub address: Address,
    pub symbol: String,
    pub name: String,
    #[serde(default = "default_decimals")]
    pub decimals: u8,
}

fn default_decimals() -> u8 {
    18
}

fn default_tokens() -> Vec<TokenRef> {
    vec![
        TokenRef {
            address: address!("68409A847a7CEBf87963bDBc32edE05405AE34B6"),
            symbol: "TKA".to_string(),
            name: "Token A".to_string(),
            decimals: 18,
        },
        TokenRef {
            address: address!("f915B587F89EB71421A2E30aE986fE115dcd89DC"),
            symbol: "TKB".to_string(),
            name: "Token B".to_string(),
            decimals: 18,
        },
    ]
}

/// Swap form behaviour.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SwapConfig {
    /// Initial slippage tolerance in basis points (50 = 0.5%).
    pub default_slippage_bps: u32,

    /// Quiet period after the last amount edit before quoting, in milliseconds.
    pub quote_debounce_ms: u64,

    /// Balance refresh interval while connected, in seconds.
    pub balance_poll_secs: u64,

    /// Swap deadline offset from now, in seconds.
    pub deadline_secs: u64,

    /// Price impact (percent) above which a warning is raised.
    pub price_impact_warning_pct: f64,
}

impl Default for SwapConfig {
    fn default() -> Self {
        Self {
            default_slippage_bps: 50,
            quote_debounce_ms: 500,
            balance_poll_secs: 10,
            deadline_secs: 20 * 60,
            price_impact_warning_pct: 5.0,
        }
    }
}

/// Chain client timeouts.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ChainConfig {
    /// Read call timeout in seconds.
    pub rpc_timeout_secs: u64,

    /// Maximum wait for a write to be mined, in seconds.
    pub confirmation_timeout_secs: u64,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            rpc_timeout_secs: 10,
            confirmation_timeout_secs: 120,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}
