//! Wallet session and swap orchestration for a Uniswap-V2 style DEX client.
//!
//! # Architecture Overview
//!
//! ```text
//!   WalletProvider ──▶ session::SessionManager ──▶ watch<Session>
//!                              │                   broadcast<SessionEvent>
//!                              ▼                           │
//!                       session::Notifier                  ▼
//!                                              swap::SwapOrchestrator
//!                                                          │
//!                                                          ▼
//!                                        blockchain::ChainClient (router, ERC-20)
//! ```
//!
//! `config` loads and validates the network, contract and token settings;
//! `observability` carries logging and metrics.

pub mod blockchain;
pub mod config;
pub mod error;
pub mod observability;
pub mod session;
pub mod swap;

pub use config::schema::AppConfig;
pub use error::{Error, Result};
pub use session::SessionManager;
pub use swap::SwapOrchestrator;
