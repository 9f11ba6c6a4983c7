//! Chain client facade over the deployed token, factory, pair and router
//! contracts.
//!
//! # Responsibilities
//! - Side-effect-free reads (balances, allowances, quotes, reserves, metadata)
//! - Signed writes that return only once the transaction is mined
//! - Bound every read by the RPC timeout and every write by the confirmation
//!   timeout
//! - Surface every RPC fault or revert as a [`ChainError`]; never retry

use std::time::Duration;

use alloy::network::{Ethereum, EthereumWallet};
use alloy::primitives::{Address, U256};
use alloy::providers::{DynProvider, PendingTransactionBuilder, Provider, ProviderBuilder};
use alloy::signers::local::PrivateKeySigner;
use async_trait::async_trait;
use tokio::time::error::Elapsed;
use tokio::time::timeout;

use crate::blockchain::contracts::{IUniswapV2Factory, IUniswapV2Pair, IUniswapV2Router02, IERC20};
use crate::blockchain::types::{
    AddLiquidity, ChainError, ChainResult, ExactInSwap, ExactOutSwap, PairReserves,
    RemoveLiquidity, TxReceipt,
};
use crate::config::{AppConfig, TokenRef};

/// Typed access to the on-chain protocol.
///
/// All amounts are raw fixed-point integers in the token's own decimals.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Token balance of `account`.
    async fn balance_of(&self, token: Address, account: Address) -> ChainResult<U256>;

    /// Amount `spender` may move on behalf of `owner`.
    async fn allowance(&self, token: Address, owner: Address, spender: Address)
        -> ChainResult<U256>;

    /// Router quote for an exact input along `path`.
    async fn amounts_out(&self, amount_in: U256, path: &[Address]) -> ChainResult<Vec<U256>>;

    /// Router quote for an exact output along `path`.
    async fn amounts_in(&self, amount_out: U256, path: &[Address]) -> ChainResult<Vec<U256>>;

    /// Reserves of the pair for two tokens, or `None` if no pair exists.
    async fn pair_reserves(&self, token_a: Address, token_b: Address)
        -> ChainResult<Option<PairReserves>>;

    /// Symbol, name and decimals as reported by the token contract.
    async fn token_info(&self, token: Address) -> ChainResult<TokenRef>;

    /// Grant `spender` an allowance and wait for confirmation.
    async fn approve(&self, token: Address, spender: Address, amount: U256)
        -> ChainResult<TxReceipt>;

    /// `swapExactTokensForTokens`, waiting for confirmation.
    async fn swap_exact_in(&self, order: ExactInSwap) -> ChainResult<TxReceipt>;

    /// `swapTokensForExactTokens`, waiting for confirmation.
    async fn swap_exact_out(&self, order: ExactOutSwap) -> ChainResult<TxReceipt>;

    /// `addLiquidity`, waiting for confirmation.
    async fn add_liquidity(&self, order: AddLiquidity) -> ChainResult<TxReceipt>;

    /// `removeLiquidity`, waiting for confirmation.
    async fn remove_liquidity(&self, order: RemoveLiquidity) -> ChainResult<TxReceipt>;
}

/// JSON-RPC backed [`ChainClient`].
#[derive(Clone)]
pub struct RpcChainClient {
    provider: DynProvider,
    /// Address that signs writes, if a signer was attached.
    signer: Option<Address>,
    router: Address,
    factory: Address,
    rpc_url: String,
    rpc_timeout: Duration,
    confirmation_timeout: Duration,
}

impl RpcChainClient {
    /// Create a read-only client.
    pub fn read_only(config: &AppConfig) -> ChainResult<Self> {
        Self::build(config, None)
    }

    /// Create a client that signs writes with `signer`.
    pub fn with_signer(config: &AppConfig, signer: PrivateKeySigner) -> ChainResult<Self> {
        Self::build(config, Some(signer))
    }

    fn build(config: &AppConfig, signer: Option<PrivateKeySigner>) -> ChainResult<Self> {
        let url: url::Url = config.network.rpc_url.parse().map_err(|e| {
            ChainError::Rpc(format!("Invalid RPC URL '{}': {}", config.network.rpc_url, e))
        })?;

        let signer_address = signer.as_ref().map(|s| s.address());
        let provider = match signer {
            Some(signer) => ProviderBuilder::new()
                .wallet(EthereumWallet::from(signer))
                .connect_http(url)
                .erased(),
            None => ProviderBuilder::new().connect_http(url).erased(),
        };

        tracing::info!(
            rpc_url = %config.network.rpc_url,
            router = %config.contracts.router,
            signer = ?signer_address,
            "Chain client initialized"
        );

        Ok(Self {
            provider,
            signer: signer_address,
            router: config.contracts.router,
            factory: config.contracts.factory,
            rpc_url: config.network.rpc_url.clone(),
            rpc_timeout: Duration::from_secs(config.chain.rpc_timeout_secs),
            confirmation_timeout: Duration::from_secs(config.chain.confirmation_timeout_secs),
        })
    }

    /// Get the chain ID reported by the RPC endpoint.
    pub async fn chain_id(&self) -> ChainResult<u64> {
        match timeout(self.rpc_timeout, self.provider.get_chain_id()).await {
            Ok(Ok(id)) => Ok(id),
            Ok(Err(e)) => Err(ChainError::Rpc(format!("eth_chainId: {}", e))),
            Err(_) => Err(ChainError::Timeout(self.rpc_timeout.as_secs())),
        }
    }

    /// Router address used as swap target and approval spender.
    pub fn router(&self) -> Address {
        self.router
    }

    fn token(&self, token: Address) -> IERC20::IERC20Instance<DynProvider> {
        IERC20::new(token, self.provider.clone())
    }

    fn router_contract(&self) -> IUniswapV2Router02::IUniswapV2Router02Instance<DynProvider> {
        IUniswapV2Router02::new(self.router, self.provider.clone())
    }

    fn require_signer(&self) -> ChainResult<Address> {
        self.signer
            .ok_or_else(|| ChainError::Wallet("no signing identity attached".to_string()))
    }

    fn read<T>(
        &self,
        call: &'static str,
        result: Result<Result<T, alloy::contract::Error>, Elapsed>,
    ) -> ChainResult<T> {
        match result {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => {
                tracing::warn!(call, error = %e, "RPC call failed");
                Err(ChainError::Rpc(format!("{}: {}", call, e)))
            }
            Err(_) => {
                tracing::warn!(call, "RPC timeout");
                Err(ChainError::Timeout(self.rpc_timeout.as_secs()))
            }
        }
    }

    /// Wait for a submitted transaction to be mined and check its status.
    async fn confirm(
        &self,
        call: &'static str,
        sent: Result<Result<PendingTransactionBuilder<Ethereum>, alloy::contract::Error>, Elapsed>,
    ) -> ChainResult<TxReceipt> {
        let pending = match sent {
            Ok(Ok(pending)) => pending,
            Ok(Err(e)) => {
                tracing::warn!(call, error = %e, "Transaction submission failed");
                return Err(ChainError::Rpc(format!("{}: {}", call, e)));
            }
            Err(_) => return Err(ChainError::Timeout(self.rpc_timeout.as_secs())),
        };

        let tx_hash = *pending.tx_hash();
        tracing::info!(call, tx_hash = %tx_hash, "Transaction submitted, waiting for confirmation");

        let receipt = match timeout(self.confirmation_timeout, pending.get_receipt()).await {
            Ok(Ok(receipt)) => receipt,
            Ok(Err(e)) => return Err(ChainError::Rpc(format!("{} receipt: {}", call, e))),
            Err(_) => {
                tracing::warn!(call, tx_hash = %tx_hash, "Confirmation timed out");
                return Err(ChainError::ConfirmationTimeout(self.confirmation_timeout.as_secs()));
            }
        };

        if !receipt.status() {
            return Err(ChainError::Reverted(format!("{} {}", call, tx_hash)));
        }

        tracing::info!(
            call,
            tx_hash = %tx_hash,
            block_number = ?receipt.block_number,
            "Transaction confirmed"
        );

        Ok(TxReceipt {
            tx_hash,
            block_number: receipt.block_number,
        })
    }
}

#[async_trait]
impl ChainClient for RpcChainClient {
    async fn balance_of(&self, token: Address, account: Address) -> ChainResult<U256> {
        let contract = self.token(token);
        let result = timeout(self.rpc_timeout, contract.balanceOf(account).call()).await;
        self.read("balanceOf", result)
    }

    async fn allowance(
        &self,
        token: Address,
        owner: Address,
        spender: Address,
    ) -> ChainResult<U256> {
        let contract = self.token(token);
        let result = timeout(self.rpc_timeout, contract.allowance(owner, spender).call()).await;
        self.read("allowance", result)
    }

    async fn amounts_out(&self, amount_in: U256, path: &[Address]) -> ChainResult<Vec<U256>> {
        let router = self.router_contract();
        let result = timeout(
            self.rpc_timeout,
            router.getAmountsOut(amount_in, path.to_vec()).call(),
        )
        .await;
        self.read("getAmountsOut", result)
    }

    async fn amounts_in(&self, amount_out: U256, path: &[Address]) -> ChainResult<Vec<U256>> {
        let router = self.router_contract();
        let result = timeout(
            self.rpc_timeout,
            router.getAmountsIn(amount_out, path.to_vec()).call(),
        )
        .await;
        self.read("getAmountsIn", result)
    }

    async fn pair_reserves(
        &self,
        token_a: Address,
        token_b: Address,
    ) -> ChainResult<Option<PairReserves>> {
        let factory = IUniswapV2Factory::new(self.factory, self.provider.clone());
        let result = timeout(self.rpc_timeout, factory.getPair(token_a, token_b).call()).await;
        let pair = self.read("getPair", result)?;
        if pair.is_zero() {
            return Ok(None);
        }

        let contract = IUniswapV2Pair::new(pair, self.provider.clone());
        let result = timeout(self.rpc_timeout, contract.getReserves().call()).await;
        let reserves = self.read("getReserves", result)?;

        Ok(Some(PairReserves {
            pair,
            reserve0: U256::from(reserves.reserve0),
            reserve1: U256::from(reserves.reserve1),
            block_timestamp_last: reserves.blockTimestampLast,
        }))
    }

    async fn token_info(&self, token: Address) -> ChainResult<TokenRef> {
        let contract = self.token(token);
        let symbol = timeout(self.rpc_timeout, contract.symbol().call()).await;
        let symbol = self.read("symbol", symbol)?;
        let name = timeout(self.rpc_timeout, contract.name().call()).await;
        let name = self.read("name", name)?;
        let decimals = timeout(self.rpc_timeout, contract.decimals().call()).await;
        let decimals = self.read("decimals", decimals)?;

        Ok(TokenRef {
            address: token,
            symbol,
            name,
            decimals,
        })
    }

    async fn approve(
        &self,
        token: Address,
        spender: Address,
        amount: U256,
    ) -> ChainResult<TxReceipt> {
        self.require_signer()?;
        let contract = self.token(token);
        let call = contract.approve(spender, amount);
        let sent = timeout(self.rpc_timeout, call.send()).await;
        self.confirm("approve", sent).await
    }

    async fn swap_exact_in(&self, order: ExactInSwap) -> ChainResult<TxReceipt> {
        self.require_signer()?;
        let router = self.router_contract();
        let call = router.swapExactTokensForTokens(
            order.amount_in,
            order.amount_out_min,
            order.path,
            order.recipient,
            U256::from(order.deadline),
        );
        let sent = timeout(self.rpc_timeout, call.send()).await;
        self.confirm("swapExactTokensForTokens", sent).await
    }

    async fn swap_exact_out(&self, order: ExactOutSwap) -> ChainResult<TxReceipt> {
        self.require_signer()?;
        let router = self.router_contract();
        let call = router.swapTokensForExactTokens(
            order.amount_out,
            order.amount_in_max,
            order.path,
            order.recipient,
            U256::from(order.deadline),
        );
        let sent = timeout(self.rpc_timeout, call.send()).await;
        self.confirm("swapTokensForExactTokens", sent).await
    }

    async fn add_liquidity(&self, order: AddLiquidity) -> ChainResult<TxReceipt> {
        self.require_signer()?;
        let router = self.router_contract();
        let call = router.addLiquidity(
            order.token_a,
            order.token_b,
            order.amount_a_desired,
            order.amount_b_desired,
            order.amount_a_min,
            order.amount_b_min,
            order.recipient,
            U256::from(order.deadline),
        );
        let sent = timeout(self.rpc_timeout, call.send()).await;
        self.confirm("addLiquidity", sent).await
    }

    async fn remove_liquidity(&self, order: RemoveLiquidity) -> ChainResult<TxReceipt> {
        self.require_signer()?;
        let router = self.router_contract();
        let call = router.removeLiquidity(
            order.token_a,
            order.token_b,
            order.liquidity,
            order.amount_a_min,
            order.amount_b_min,
            order.recipient,
            U256::from(order.deadline),
        );
        let sent = timeout(self.rpc_timeout, call.send()).await;
        self.confirm("removeLiquidity", sent).await
    }
}

impl std::fmt::Debug for RpcChainClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcChainClient")
            .field("rpc_url", &self.rpc_url)
            .field("router", &self.router)
            .field("factory", &self.factory)
            .field("signer", &self.signer)
            .field("timeout_secs", &self.rpc_timeout.as_secs())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.network.rpc_url = "http://localhost:8545".to_string();
        config.network.chain_id = 31337; // Anvil default
        config.chain.rpc_timeout_secs = 1;
        config
    }

    #[tokio::test]
    async fn test_client_creation() {
        // Construction never touches the network.
        let client = RpcChainClient::read_only(&test_config()).unwrap();
        assert_eq!(client.router(), test_config().contracts.router);
        assert!(format!("{:?}", client).contains("localhost:8545"));
    }

    #[tokio::test]
    async fn test_invalid_rpc_url() {
        let mut config = test_config();
        config.network.rpc_url = "not a url".to_string();
        let err = RpcChainClient::read_only(&config).unwrap_err();
        assert!(err.to_string().contains("Invalid RPC URL"));
    }

    #[tokio::test]
    async fn test_writes_require_signer() {
        let client = RpcChainClient::read_only(&test_config()).unwrap();
        let err = client
            .approve(Address::ZERO, Address::ZERO, U256::MAX)
            .await
            .unwrap_err();
        assert!(matches!(err, ChainError::Wallet(_)));
    }
}
