//! Wallet session subsystem.
//!
//! # Data Flow
//! ```text
//! WalletProvider (injected wallet / LocalWallet)
//!     → manager.rs (connect, switch network, react to wallet events)
//!     → watch<Session>        (current account / chain / state)
//!     → broadcast<SessionEvent> (orchestrator resets and reloads)
//!     → notify.rs             (toasts for the presentation layer)
//! ```

pub mod manager;
pub mod notify;
pub mod provider;
pub mod types;

pub use manager::SessionManager;
pub use notify::Notifier;
pub use provider::{AddChainParams, WalletError, WalletEvent, WalletProvider};
pub use types::{ConnectionState, Notification, NotificationLevel, Session, SessionEvent};
