//! Chain-facing types and error definitions.

use alloy::primitives::{Address, TxHash, U256};
use serde::Serialize;
use thiserror::Error;

/// Errors that can occur during chain calls.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ChainError {
    /// RPC connection or request failed.
    #[error("RPC error: {0}")]
    Rpc(String),

    /// RPC request timed out.
    #[error("RPC timeout after {0} seconds")]
    Timeout(u64),

    /// Transaction was not mined within the confirmation window.
    #[error("Transaction not confirmed after {0} seconds")]
    ConfirmationTimeout(u64),

    /// Transaction or call was reverted on-chain.
    #[error("Transaction reverted: {0}")]
    Reverted(String),

    /// Invalid private key format or signer setup error.
    #[error("Wallet error: {0}")]
    Wallet(String),
}

/// Result type for chain operations.
pub type ChainResult<T> = Result<T, ChainError>;

/// Receipt of a mined transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TxReceipt {
    pub tx_hash: TxHash,
    pub block_number: Option<u64>,
}

/// Reserves of a pair, ordered like the pair's token0/token1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PairReserves {
    pub pair: Address,
    pub reserve0: U256,
    pub reserve1: U256,
    pub block_timestamp_last: u32,
}

/// Sell an exact input amount for at least `amount_out_min`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExactInSwap {
    pub amount_in: U256,
    pub amount_out_min: U256,
    pub path: Vec<Address>,
    pub recipient: Address,
    /// Unix timestamp after which the router rejects the swap.
    pub deadline: u64,
}

/// Buy an exact output amount for at most `amount_in_max`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExactOutSwap {
    pub amount_out: U256,
    pub amount_in_max: U256,
    pub path: Vec<Address>,
    pub recipient: Address,
    pub deadline: u64,
}

/// Deposit both sides of a pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AddLiquidity {
    pub token_a: Address,
    pub token_b: Address,
    pub amount_a_desired: U256,
    pub amount_b_desired: U256,
    pub amount_a_min: U256,
    pub amount_b_min: U256,
    pub recipient: Address,
    pub deadline: u64,
}

/// Burn LP tokens for both sides of a pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoveLiquidity {
    pub token_a: Address,
    pub token_b: Address,
    pub liquidity: U256,
    pub amount_a_min: U256,
    pub amount_b_min: U256,
    pub recipient: Address,
    pub deadline: u64,
}
