//! Blockchain integration subsystem.
//!
//! # Data Flow
//! ```text
//! Environment Variables (private key)
//!     → wallet.rs (key loading, in-process wallet provider)
//!     → client.rs (typed contract reads/writes with timeouts)
//!     → contracts.rs (ERC-20 / factory / pair / router ABI)
//! units.rs converts between user text and raw amounts at the edges.
//! ```
//!
//! # Security Constraints
//! - Private keys ONLY from environment variables
//! - Never log private keys or sensitive data
//! - All RPC calls have configurable timeouts

pub mod client;
pub mod contracts;
pub mod types;
pub mod units;
pub mod wallet;

pub use client::{ChainClient, RpcChainClient};
pub use types::{ChainError, ChainResult, ExactInSwap, PairReserves, TxReceipt};
pub use wallet::LocalWallet;
