//! In-process wallet backed by a local private key.
//!
//! # Security
//! - Private keys are loaded ONLY from environment variables
//! - Keys are never logged or serialized

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

use alloy::primitives::Address;
use alloy::signers::local::PrivateKeySigner;
use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::blockchain::types::{ChainError, ChainResult};
use crate::config::NetworkConfig;
use crate::session::provider::{AddChainParams, WalletError, WalletEvent, WalletProvider};

/// Environment variable name for the private key.
pub const PRIVATE_KEY_ENV_VAR: &str = "SWAP_WALLET_PRIVATE_KEY";

const EVENT_BUFFER: usize = 16;

/// Key-backed [`WalletProvider`].
///
/// The key is pre-authorized, so `accounts()` returns it until the wallet is
/// locked. Chain switching is limited to networks the wallet has been told
/// about.
#[derive(Debug)]
pub struct LocalWallet {
    /// The underlying signer (private key).
    signer: PrivateKeySigner,
    /// Known networks keyed by chain ID.
    networks: Mutex<HashMap<u64, AddChainParams>>,
    /// Active chain ID.
    active_chain: AtomicU64,
    unlocked: AtomicBool,
    events: broadcast::Sender<WalletEvent>,
}

impl LocalWallet {
    /// Create a wallet from a hex-encoded private key string, active on
    /// `network`.
    ///
    /// # Security
    /// The private key is parsed and stored securely. It is never logged.
    pub fn from_private_key(private_key_hex: &str, network: &NetworkConfig) -> ChainResult<Self> {
        // Strip 0x prefix if present
        let key_hex = private_key_hex.strip_prefix("0x").unwrap_or(private_key_hex);

        let signer: PrivateKeySigner = key_hex
            .parse()
            .map_err(|e| ChainError::Wallet(format!("Invalid private key format: {}", e)))?;

        tracing::info!(
            address = %signer.address(),
            chain_id = network.chain_id,
            "Wallet initialized"
        );

        let mut networks = HashMap::new();
        networks.insert(network.chain_id, AddChainParams::from(network));
        let (events, _) = broadcast::channel(EVENT_BUFFER);

        Ok(Self {
            signer,
            networks: Mutex::new(networks),
            active_chain: AtomicU64::new(network.chain_id),
            unlocked: AtomicBool::new(true),
            events,
        })
    }

    /// Load wallet from environment variable.
    ///
    /// Reads `SWAP_WALLET_PRIVATE_KEY` from environment.
    pub fn from_env(network: &NetworkConfig) -> ChainResult<Self> {
        let private_key = std::env::var(PRIVATE_KEY_ENV_VAR).map_err(|_| {
            ChainError::Wallet(format!(
                "Environment variable {} not set",
                PRIVATE_KEY_ENV_VAR
            ))
        })?;

        Self::from_private_key(&private_key, network)
    }

    /// Get the wallet's address.
    pub fn address(&self) -> Address {
        self.signer.address()
    }

    /// Signer for building a signing chain client.
    pub fn signer(&self) -> PrivateKeySigner {
        self.signer.clone()
    }

    /// Revoke account access; subscribers see an empty account list.
    pub fn lock(&self) {
        if self.unlocked.swap(false, Ordering::SeqCst) {
            let _ = self.events.send(WalletEvent::AccountsChanged(Vec::new()));
        }
    }

    fn is_known(&self, chain_id: u64) -> bool {
        self.networks
            .lock()
            .expect("wallet networks mutex poisoned")
            .contains_key(&chain_id)
    }
}

#[async_trait]
impl WalletProvider for LocalWallet {
    async fn request_accounts(&self) -> Result<Vec<Address>, WalletError> {
        if !self.unlocked.swap(true, Ordering::SeqCst) {
            let _ = self
                .events
                .send(WalletEvent::AccountsChanged(vec![self.address()]));
        }
        Ok(vec![self.address()])
    }

    async fn accounts(&self) -> Result<Vec<Address>, WalletError> {
        if self.unlocked.load(Ordering::SeqCst) {
            Ok(vec![self.address()])
        } else {
            Ok(Vec::new())
        }
    }

    async fn chain_id(&self) -> Result<u64, WalletError> {
        Ok(self.active_chain.load(Ordering::SeqCst))
    }

    async fn switch_chain(&self, chain_id: u64) -> Result<(), WalletError> {
        if !self.is_known(chain_id) {
            return Err(WalletError::UnrecognizedChain(chain_id));
        }
        let previous = self.active_chain.swap(chain_id, Ordering::SeqCst);
        if previous != chain_id {
            tracing::info!(from = previous, to = chain_id, "Wallet chain switched");
            let _ = self.events.send(WalletEvent::ChainChanged(chain_id));
        }
        Ok(())
    }

    async fn add_chain(&self, params: AddChainParams) -> Result<(), WalletError> {
        if params.rpc_urls.is_empty() {
            return Err(WalletError::Rpc {
                code: -32602,
                message: "rpcUrls must not be empty".to_string(),
            });
        }
        tracing::info!(chain_id = params.chain_id, name = %params.chain_name, "Wallet chain added");
        self.networks
            .lock()
            .expect("wallet networks mutex poisoned")
            .insert(params.chain_id, params);
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<WalletEvent> {
        self.events.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Well-known test private key (Anvil's first account)
    const TEST_PRIVATE_KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    fn network(chain_id: u64) -> NetworkConfig {
        NetworkConfig {
            chain_id,
            name: format!("chain-{}", chain_id),
            rpc_url: "http://localhost:8545".to_string(),
            explorer_url: "http://localhost:4000".to_string(),
        }
    }

    #[test]
    fn test_wallet_from_private_key() {
        let wallet = LocalWallet::from_private_key(TEST_PRIVATE_KEY, &network(1)).unwrap();
        // This is the corresponding address for the test key
        assert_eq!(
            wallet.address().to_string().to_lowercase(),
            "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266"
        );
    }

    #[test]
    fn test_wallet_with_0x_prefix() {
        let wallet =
            LocalWallet::from_private_key(&format!("0x{}", TEST_PRIVATE_KEY), &network(1)).unwrap();
        assert_eq!(wallet.signer().address(), wallet.address());
    }

    #[test]
    fn test_invalid_private_key() {
        let result = LocalWallet::from_private_key("invalid_key", &network(1));
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Invalid private key"));
    }

    #[tokio::test]
    async fn test_switch_unknown_chain_then_add() {
        let wallet = LocalWallet::from_private_key(TEST_PRIVATE_KEY, &network(1)).unwrap();
        let mut events = wallet.subscribe();

        assert_eq!(
            wallet.switch_chain(5).await.unwrap_err(),
            WalletError::UnrecognizedChain(5)
        );

        wallet.add_chain(AddChainParams::from(&network(5))).await.unwrap();
        wallet.switch_chain(5).await.unwrap();
        assert_eq!(wallet.chain_id().await.unwrap(), 5);
        assert_eq!(events.recv().await.unwrap(), WalletEvent::ChainChanged(5));
    }

    #[tokio::test]
    async fn test_lock_clears_accounts() {
        let wallet = LocalWallet::from_private_key(TEST_PRIVATE_KEY, &network(1)).unwrap();
        let mut events = wallet.subscribe();
        assert_eq!(wallet.accounts().await.unwrap().len(), 1);

        wallet.lock();
        assert!(wallet.accounts().await.unwrap().is_empty());
        assert_eq!(events.recv().await.unwrap(), WalletEvent::AccountsChanged(vec![]));

        let accounts = wallet.request_accounts().await.unwrap();
        assert_eq!(accounts, vec![wallet.address()]);
    }
}
