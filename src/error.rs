//! Crate-wide error taxonomy.
//!
//! Session, chain and form failures all collapse into [`Error`]. The
//! orchestrator reports failed actions through [`Error::is_inline`]: quote,
//! amount and balance errors stay on the form, and everything else becomes a
//! transient notification.

use thiserror::Error;

use crate::blockchain::types::ChainError;
use crate::session::provider::WalletError;

/// Errors surfaced by the session and swap layers.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum Error {
    /// No wallet provider is installed.
    #[error("No wallet provider available")]
    WalletUnavailable,

    /// The user declined the wallet prompt.
    #[error("Request rejected by user")]
    UserRejected,

    /// Connected to a chain other than the configured one.
    #[error("Wrong network: expected chain {expected}, connected to {actual}")]
    NetworkMismatch { expected: u64, actual: u64 },

    /// Both the switch and the add-then-switch attempts failed.
    #[error("Network switch to chain {chain_id} failed: {reason}")]
    NetworkSwitchFailed { chain_id: u64, reason: String },

    /// RPC fault or on-chain revert.
    #[error("Chain call failed: {reason}")]
    ChainCallFailed { reason: String },

    /// Wallet RPC failure that is not a rejection.
    #[error("Wallet RPC error: {0}")]
    Rpc(String),

    /// No liquidity route for the requested pair/amount.
    #[error("No route for this swap")]
    QuoteUnavailable,

    /// Amount exceeds the account balance.
    #[error("Insufficient balance")]
    InsufficientBalance,

    /// Amount text is empty, zero, negative or unparseable.
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Slippage outside the accepted basis-point range.
    #[error("Invalid slippage: {0} bps")]
    InvalidSlippage(u32),

    /// A connect attempt is already waiting on the wallet.
    #[error("Connection already in progress")]
    ConnectInProgress,

    /// Another approve/swap is still waiting for confirmation.
    #[error("Another action is already in flight")]
    ActionInFlight,

    /// The router allowance does not cover the amount.
    #[error("Token approval required")]
    ApprovalRequired,

    /// No connected account.
    #[error("Wallet not connected")]
    NotConnected,

    /// From and to token are the same.
    #[error("Cannot swap a token for itself")]
    SameToken,
}

/// Result alias for session and swap operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<ChainError> for Error {
    fn from(e: ChainError) -> Self {
        Error::ChainCallFailed {
            reason: e.to_string(),
        }
    }
}

impl From<WalletError> for Error {
    fn from(e: WalletError) -> Self {
        match e {
            WalletError::UserRejected => Error::UserRejected,
            WalletError::Unavailable => Error::WalletUnavailable,
            other => Error::Rpc(other.to_string()),
        }
    }
}

impl Error {
    /// Whether the error is shown inline on the form instead of as a toast.
    pub fn is_inline(&self) -> bool {
        matches!(
            self,
            Error::QuoteUnavailable | Error::InvalidAmount(_) | Error::InsufficientBalance
        )
    }
}
