//! Wallet provider boundary.
//!
//! Mirrors the injected-wallet request surface (EIP-1193): account access,
//! chain switching and push notifications for account/chain changes.

use alloy::primitives::Address;
use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::broadcast;

use crate::config::NetworkConfig;

/// EIP-1193 code for a user-declined request.
pub const USER_REJECTED_CODE: i64 = 4001;

/// Code returned by `wallet_switchEthereumChain` for a chain the wallet does
/// not know about.
pub const UNRECOGNIZED_CHAIN_CODE: i64 = 4902;

/// Errors reported by a wallet provider.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum WalletError {
    /// The user declined the prompt (4001).
    #[error("User rejected the request")]
    UserRejected,

    /// The wallet has no configuration for the chain (4902).
    #[error("Unrecognized chain {0}")]
    UnrecognizedChain(u64),

    /// The provider has gone away.
    #[error("Wallet provider unavailable")]
    Unavailable,

    /// Any other provider error.
    #[error("Wallet RPC error {code}: {message}")]
    Rpc { code: i64, message: String },
}

impl WalletError {
    /// Map a raw provider error code to a typed error.
    pub fn from_code(code: i64, message: impl Into<String>, chain_id: u64) -> Self {
        match code {
            USER_REJECTED_CODE => WalletError::UserRejected,
            UNRECOGNIZED_CHAIN_CODE => WalletError::UnrecognizedChain(chain_id),
            _ => WalletError::Rpc {
                code,
                message: message.into(),
            },
        }
    }

    /// The EIP-1193 style numeric code.
    pub fn code(&self) -> i64 {
        match self {
            WalletError::UserRejected => USER_REJECTED_CODE,
            WalletError::UnrecognizedChain(_) => UNRECOGNIZED_CHAIN_CODE,
            WalletError::Unavailable => -32603,
            WalletError::Rpc { code, .. } => *code,
        }
    }
}

/// Notifications pushed by the wallet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalletEvent {
    /// Authorized account list changed; empty means the wallet locked or
    /// revoked access.
    AccountsChanged(Vec<Address>),
    /// Active chain changed.
    ChainChanged(u64),
}

/// Parameters for `wallet_addEthereumChain`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddChainParams {
    pub chain_id: u64,
    pub chain_name: String,
    pub rpc_urls: Vec<String>,
    pub block_explorer_urls: Vec<String>,
}

impl From<&NetworkConfig> for AddChainParams {
    fn from(network: &NetworkConfig) -> Self {
        Self {
            chain_id: network.chain_id,
            chain_name: network.name.clone(),
            rpc_urls: vec![network.rpc_url.clone()],
            block_explorer_urls: vec![network.explorer_url.clone()],
        }
    }
}

/// An injected wallet.
#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// Prompt for account access (`eth_requestAccounts`).
    async fn request_accounts(&self) -> Result<Vec<Address>, WalletError>;

    /// Already-authorized accounts, without prompting (`eth_accounts`).
    async fn accounts(&self) -> Result<Vec<Address>, WalletError>;

    /// Active chain ID.
    async fn chain_id(&self) -> Result<u64, WalletError>;

    /// Ask the wallet to switch chains (`wallet_switchEthereumChain`).
    async fn switch_chain(&self, chain_id: u64) -> Result<(), WalletError>;

    /// Ask the wallet to register a chain (`wallet_addEthereumChain`).
    async fn add_chain(&self, params: AddChainParams) -> Result<(), WalletError>;

    /// Subscribe to account/chain notifications. Dropping the receiver
    /// unsubscribes.
    fn subscribe(&self) -> broadcast::Receiver<WalletEvent>;
}
