//! Session state and the events the session publishes.

use alloy::primitives::Address;
use serde::Serialize;

/// Wallet connection lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

/// Current wallet session.
///
/// `account` is set iff `state` is [`ConnectionState::Connected`]; the
/// constructors are the only way to build one.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Session {
    account: Option<Address>,
    chain_id: Option<u64>,
    state: ConnectionState,
}

impl Session {
    /// No wallet connected.
    pub fn disconnected() -> Self {
        Self::default()
    }

    /// Waiting on the wallet's authorization prompt.
    pub fn connecting() -> Self {
        Self {
            state: ConnectionState::Connecting,
            ..Self::default()
        }
    }

    /// Authorized account on a chain.
    pub fn connected(account: Address, chain_id: u64) -> Self {
        Self {
            account: Some(account),
            chain_id: Some(chain_id),
            state: ConnectionState::Connected,
        }
    }

    pub fn account(&self) -> Option<Address> {
        self.account
    }

    pub fn chain_id(&self) -> Option<u64> {
        self.chain_id
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    pub fn is_connecting(&self) -> bool {
        self.state == ConnectionState::Connecting
    }

    /// Connected and on the required chain.
    pub fn is_correct_network(&self, required_chain_id: u64) -> bool {
        self.is_connected() && self.chain_id == Some(required_chain_id)
    }

    pub(crate) fn with_account(&self, account: Address) -> Self {
        Self {
            account: Some(account),
            ..self.clone()
        }
    }

    pub(crate) fn with_chain_id(&self, chain_id: u64) -> Self {
        Self {
            chain_id: Some(chain_id),
            ..self.clone()
        }
    }
}

/// Changes other components must react to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Connected { account: Address, chain_id: u64 },
    Disconnected,
    AccountChanged { account: Address },
    /// Derived chain state (quotes, balances, allowances) is now invalid.
    ChainChanged { chain_id: u64, compatible: bool },
}

/// Severity of a user-facing notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// A transient user-facing message (toast).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
}
