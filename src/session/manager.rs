//! Wallet session lifecycle.
//!
//! # Responsibilities
//! - Connect / disconnect / silent auto-reconnect
//! - Keep the published [`Session`] consistent with what the wallet reports
//! - Switch (or add, then switch) to the required network
//! - Translate wallet push notifications into [`SessionEvent`]s
//!
//! The wallet subscription lives exactly as long as a connection: it is
//! created when a session is established and dropped on disconnect.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use alloy::primitives::Address;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

use crate::config::NetworkConfig;
use crate::error::{Error, Result};
use crate::observability::metrics;
use crate::session::notify::Notifier;
use crate::session::provider::{AddChainParams, WalletError, WalletEvent, WalletProvider};
use crate::session::types::{Session, SessionEvent};

const EVENT_BUFFER: usize = 32;

/// Owns the wallet session. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<Inner>,
}

struct Inner {
    wallet: Option<Arc<dyn WalletProvider>>,
    network: NetworkConfig,
    state: watch::Sender<Session>,
    events: broadcast::Sender<SessionEvent>,
    notifier: Notifier,
    /// Gates re-entrant `connect()` calls.
    connecting: AtomicBool,
    /// Task forwarding wallet notifications while connected.
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let Ok(listener) = self.listener.get_mut() {
            if let Some(handle) = listener.take() {
                handle.abort();
            }
        }
    }
}

/// Clears the connecting flag however `connect()` exits.
struct ConnectingGuard<'a>(&'a AtomicBool);

impl Drop for ConnectingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl SessionManager {
    /// Create a manager. `wallet` is `None` when no provider is installed.
    pub fn new(
        wallet: Option<Arc<dyn WalletProvider>>,
        network: NetworkConfig,
        notifier: Notifier,
    ) -> Self {
        let (state, _) = watch::channel(Session::disconnected());
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        Self {
            inner: Arc::new(Inner {
                wallet,
                network,
                state,
                events,
                notifier,
                connecting: AtomicBool::new(false),
                listener: Mutex::new(None),
            }),
        }
    }

    /// Snapshot of the current session.
    pub fn session(&self) -> Session {
        self.inner.state.borrow().clone()
    }

    /// Watch the session for changes.
    pub fn watch(&self) -> watch::Receiver<Session> {
        self.inner.state.subscribe()
    }

    /// Subscribe to session events published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }

    pub fn notifier(&self) -> &Notifier {
        &self.inner.notifier
    }

    /// The network the session must be on.
    pub fn network(&self) -> &NetworkConfig {
        &self.inner.network
    }

    pub fn is_connecting(&self) -> bool {
        self.inner.connecting.load(Ordering::SeqCst)
    }

    pub fn is_correct_network(&self) -> bool {
        self.session().is_correct_network(self.inner.network.chain_id)
    }

    fn wallet(&self) -> Result<Arc<dyn WalletProvider>> {
        self.inner.wallet.clone().ok_or(Error::WalletUnavailable)
    }

    /// Request wallet authorization and establish a session.
    ///
    /// A chain mismatch does not fail the connection: a warning is published
    /// and a network switch is attempted. An already-connected session is
    /// returned as is.
    pub async fn connect(&self) -> Result<Session> {
        let wallet = match self.wallet() {
            Ok(wallet) => wallet,
            Err(e) => {
                self.inner.notifier.error("No wallet found, please install one");
                return Err(e);
            }
        };
        let current = self.session();
        if current.is_connected() {
            tracing::debug!("Wallet already connected");
            return Ok(current);
        }

        if self
            .inner
            .connecting
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            tracing::debug!("Connect already in progress");
            return Err(Error::ConnectInProgress);
        }
        let _guard = ConnectingGuard(&self.inner.connecting);

        let previous = self.inner.state.send_replace(Session::connecting());

        let authorized = async {
            let accounts = wallet.request_accounts().await?;
            let account = accounts.first().copied().ok_or(WalletError::UserRejected)?;
            let chain_id = wallet.chain_id().await?;
            Ok::<_, WalletError>((account, chain_id))
        }
        .await;

        let (account, chain_id) = match authorized {
            Ok(authorized) => authorized,
            Err(e) => {
                self.inner.state.send_replace(previous);
                let err = Error::from(e);
                tracing::warn!(error = %err, "Wallet connection failed");
                self.inner
                    .notifier
                    .error(format!("Failed to connect wallet: {}", err));
                return Err(err);
            }
        };

        self.establish(wallet.as_ref(), account, chain_id);

        if chain_id != self.inner.network.chain_id {
            self.inner.notifier.warning(format!(
                "Please switch to the {} network",
                self.inner.network.name
            ));
            if let Err(e) = self.switch_network().await {
                tracing::warn!(error = %e, "Network switch after connect failed");
            }
        } else {
            self.inner.notifier.success("Wallet connected");
        }

        Ok(self.session())
    }

    /// Restore an already-authorized session at startup without prompting.
    ///
    /// Never enters the connecting state and never notifies; failures are
    /// only logged.
    pub async fn auto_reconnect(&self) -> Option<Session> {
        let wallet = self.inner.wallet.clone()?;
        let current = self.session();
        if current.is_connected() || self.is_connecting() {
            return Some(current);
        }

        let authorized = async {
            let accounts = wallet.accounts().await?;
            match accounts.first().copied() {
                Some(account) => Ok::<_, WalletError>(Some((account, wallet.chain_id().await?))),
                None => Ok(None),
            }
        }
        .await;

        match authorized {
            Ok(Some((account, chain_id))) => {
                self.establish(wallet.as_ref(), account, chain_id);
                Some(self.session())
            }
            Ok(None) => {
                tracing::debug!("No previously authorized account");
                None
            }
            Err(e) => {
                tracing::warn!(error = %e, "Auto-reconnect failed");
                None
            }
        }
    }

    /// Reset to disconnected. Purely local: wallets cannot be disconnected
    /// programmatically.
    pub fn disconnect(&self) {
        let listener = self
            .inner
            .listener
            .lock()
            .expect("session listener mutex poisoned")
            .take();
        if let Some(handle) = listener {
            handle.abort();
        }

        let previous = self.inner.state.send_replace(Session::disconnected());
        metrics::set_connected(false);

        if previous.is_connected() {
            tracing::info!(account = ?previous.account(), "Wallet disconnected");
            let _ = self.inner.events.send(SessionEvent::Disconnected);
            self.inner.notifier.success("Wallet disconnected");
        }
    }

    /// Ask the wallet to move to the required chain, registering it first if
    /// the wallet does not know it. The connection is kept on failure.
    pub async fn switch_network(&self) -> Result<()> {
        let wallet = self.wallet()?;
        let target = self.inner.network.chain_id;

        let result = match wallet.switch_chain(target).await {
            Ok(()) => Ok(()),
            Err(WalletError::UnrecognizedChain(_)) => {
                tracing::info!(chain_id = target, "Chain unknown to wallet, requesting add");
                match wallet
                    .add_chain(AddChainParams::from(&self.inner.network))
                    .await
                {
                    Ok(()) => wallet.switch_chain(target).await,
                    Err(e) => Err(e),
                }
            }
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => {
                tracing::info!(chain_id = target, "Network switched");
                self.apply_chain(target);
                Ok(())
            }
            Err(e) => {
                let err = Error::NetworkSwitchFailed {
                    chain_id: target,
                    reason: e.to_string(),
                };
                self.inner
                    .notifier
                    .error(format!("Failed to switch to {}", self.inner.network.name));
                Err(err)
            }
        }
    }

    /// React to a wallet notification.
    pub fn handle_wallet_event(&self, event: WalletEvent) {
        match event {
            WalletEvent::AccountsChanged(accounts) => match accounts.first().copied() {
                None => {
                    tracing::info!("Wallet reported no accounts");
                    self.disconnect();
                }
                Some(account) => self.apply_account(account),
            },
            WalletEvent::ChainChanged(chain_id) => self.apply_chain(chain_id),
        }
    }

    fn establish(&self, wallet: &dyn WalletProvider, account: Address, chain_id: u64) {
        // Subscribe before publishing so no notification falls in between.
        self.spawn_listener(wallet.subscribe());
        self.inner
            .state
            .send_replace(Session::connected(account, chain_id));
        metrics::set_connected(true);

        tracing::info!(
            account = %account,
            chain_id,
            required_chain_id = self.inner.network.chain_id,
            "Wallet session established"
        );
        let _ = self
            .inner
            .events
            .send(SessionEvent::Connected { account, chain_id });
    }

    fn spawn_listener(&self, mut rx: broadcast::Receiver<WalletEvent>) {
        let weak = Arc::downgrade(&self.inner);
        let handle = tokio::spawn(async move {
            loop {
                let event = match rx.recv().await {
                    Ok(event) => event,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Wallet notifications lagged");
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                };
                let Some(inner) = weak.upgrade() else { break };
                SessionManager { inner }.handle_wallet_event(event);
            }
        });

        let previous = self
            .inner
            .listener
            .lock()
            .expect("session listener mutex poisoned")
            .replace(handle);
        if let Some(previous) = previous {
            previous.abort();
        }
    }

    fn apply_account(&self, account: Address) {
        let changed = self.inner.state.send_if_modified(|session| {
            if !session.is_connected() || session.account() == Some(account) {
                return false;
            }
            *session = session.with_account(account);
            true
        });
        if !changed {
            return;
        }

        tracing::info!(account = %account, "Active account changed");
        let _ = self.inner.events.send(SessionEvent::AccountChanged { account });
        self.inner.notifier.success("Account switched");
    }

    fn apply_chain(&self, chain_id: u64) {
        let changed = self.inner.state.send_if_modified(|session| {
            if !session.is_connected() || session.chain_id() == Some(chain_id) {
                return false;
            }
            *session = session.with_chain_id(chain_id);
            true
        });
        if !changed {
            return;
        }

        let compatible = chain_id == self.inner.network.chain_id;
        tracing::info!(chain_id, compatible, "Chain changed");
        if !compatible {
            self.inner.notifier.error(format!(
                "Please switch to the {} network",
                self.inner.network.name
            ));
        }
        let _ = self
            .inner
            .events
            .send(SessionEvent::ChainChanged { chain_id, compatible });
    }
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("session", &*self.inner.state.borrow())
            .field("required_chain_id", &self.inner.network.chain_id)
            .field("has_wallet", &self.inner.wallet.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_connect_without_wallet() {
        let manager = SessionManager::new(None, NetworkConfig::default(), Notifier::new());
        let mut notes = manager.notifier().subscribe();

        assert_eq!(manager.connect().await.unwrap_err(), Error::WalletUnavailable);
        assert!(!manager.session().is_connected());
        assert!(notes.recv().await.unwrap().message.contains("No wallet"));
    }

    #[tokio::test]
    async fn test_auto_reconnect_without_wallet_is_silent() {
        let manager = SessionManager::new(None, NetworkConfig::default(), Notifier::new());
        assert!(manager.auto_reconnect().await.is_none());
        assert!(manager.switch_network().await.is_err());
    }

    #[tokio::test]
    async fn test_disconnect_when_disconnected_emits_nothing() {
        let manager = SessionManager::new(None, NetworkConfig::default(), Notifier::new());
        let mut events = manager.subscribe();
        manager.disconnect();
        assert!(events.try_recv().is_err());
    }
}
