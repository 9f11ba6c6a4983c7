//! Swap form orchestration.
//!
//! # Responsibilities
//! - Debounced quoting of the from amount against the router
//! - Allowance checks deciding whether an approval is required
//! - Balance refresh on connect, account/chain change, pair change and a timer
//! - Approve and swap actions, one at a time
//!
//! # Staleness
//! Every asynchronous result is tagged when it is requested and dropped on
//! arrival if a newer request or a session change superseded it. Quotes and
//! allowance checks carry their own generation counter; all results carry the
//! session epoch, which is bumped on connect, account change, chain change
//! and disconnect.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use alloy::primitives::{Address, U256};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval, sleep, MissedTickBehavior};

use crate::blockchain::client::ChainClient;
use crate::blockchain::types::{ChainResult, TxReceipt};
use crate::blockchain::units;
use crate::config::{AppConfig, SwapConfig, TokenRef};
use crate::error::{Error, Result};
use crate::observability::metrics;
use crate::session::{Notifier, Session, SessionEvent, SessionManager};
use crate::swap::quote;
use crate::swap::types::{
    ActionState, ApprovalDecision, QuoteResult, SwapBlocker, SwapExecution, SwapForm, SwapPhase,
    MAX_SLIPPAGE_BPS,
};

/// Drives one swap form. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct SwapOrchestrator {
    inner: Arc<Inner>,
}

struct Inner {
    chain: Arc<dyn ChainClient>,
    session: watch::Receiver<Session>,
    /// Taken by `start()`.
    session_events: Mutex<Option<broadcast::Receiver<SessionEvent>>>,
    notifier: Notifier,
    config: SwapConfig,
    router: Address,
    required_chain_id: u64,
    form: Mutex<SwapForm>,
    quote_generation: AtomicU64,
    approval_generation: AtomicU64,
    epoch: AtomicU64,
    tasks: Mutex<Tasks>,
}

#[derive(Default)]
struct Tasks {
    quote: Option<JoinHandle<()>>,
    approval: Option<JoinHandle<()>>,
    poller: Option<JoinHandle<()>>,
    events: Option<JoinHandle<()>>,
}

impl Tasks {
    fn abort_session_tasks(&mut self) {
        for handle in [self.quote.take(), self.approval.take(), self.poller.take()]
            .into_iter()
            .flatten()
        {
            handle.abort();
        }
    }

    fn abort_all(&mut self) {
        self.abort_session_tasks();
        if let Some(handle) = self.events.take() {
            handle.abort();
        }
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let Ok(tasks) = self.tasks.get_mut() {
            tasks.abort_all();
        }
    }
}

/// Returns the form to idle however an approve/swap exits.
struct ActionGuard<'a> {
    orchestrator: &'a SwapOrchestrator,
}

impl Drop for ActionGuard<'_> {
    fn drop(&mut self) {
        let mut form = self.orchestrator.form();
        form.action = ActionState::Idle;
        form.approval.in_flight = false;
    }
}

impl SwapOrchestrator {
    /// Create an orchestrator for the `from → to` pair.
    ///
    /// Nothing runs until [`start`](Self::start) is called.
    pub fn new(
        chain: Arc<dyn ChainClient>,
        session: &SessionManager,
        config: &AppConfig,
        from: TokenRef,
        to: TokenRef,
    ) -> Result<Self> {
        if from.address == to.address {
            return Err(Error::SameToken);
        }
        let slippage = config.swap.default_slippage_bps;
        if slippage == 0 || slippage > MAX_SLIPPAGE_BPS {
            return Err(Error::InvalidSlippage(slippage));
        }

        Ok(Self {
            inner: Arc::new(Inner {
                chain,
                session: session.watch(),
                session_events: Mutex::new(Some(session.subscribe())),
                notifier: session.notifier().clone(),
                config: config.swap.clone(),
                router: config.contracts.router,
                required_chain_id: config.network.chain_id,
                form: Mutex::new(SwapForm::new(from, to, slippage)),
                quote_generation: AtomicU64::new(0),
                approval_generation: AtomicU64::new(0),
                epoch: AtomicU64::new(0),
                tasks: Mutex::new(Tasks::default()),
            }),
        })
    }

    /// Start reacting to session events and, if connected, poll balances.
    pub fn start(&self) {
        let Some(mut events) = self
            .inner
            .session_events
            .lock()
            .expect("session events mutex poisoned")
            .take()
        else {
            return;
        };

        let weak = Arc::downgrade(&self.inner);
        let handle = tokio::spawn(async move {
            loop {
                let received = events.recv().await;
                let Some(orchestrator) = Self::upgrade(&weak) else {
                    break;
                };
                match received {
                    Ok(event) => orchestrator.on_session_event(event),
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        tracing::warn!(missed, "Session events lagged, reloading");
                        orchestrator.reload(true);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });
        self.tasks().events = Some(handle);

        if self.on_required_network() {
            self.start_polling();
        }
        self.rederive();
    }

    /// Stop every background task. The form keeps its last state.
    pub fn shutdown(&self) {
        self.inner.epoch.fetch_add(1, Ordering::SeqCst);
        self.tasks().abort_all();
        let mut form = self.form();
        form.quoting = false;
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Copy of the current form.
    pub fn snapshot(&self) -> SwapForm {
        self.form().clone()
    }

    pub fn phase(&self) -> SwapPhase {
        self.form().phase()
    }

    /// `Ok(())` when a swap may be submitted, else the first blocker.
    pub fn swap_readiness(&self) -> std::result::Result<(), SwapBlocker> {
        let session = self.session();
        self.form().readiness(&session, self.inner.required_chain_id)
    }

    /// Whether the approve action should be offered.
    pub fn approval_required(&self) -> bool {
        self.form().approval.required()
    }

    /// Minimum output for the current quote and slippage.
    pub fn amount_out_min(&self) -> Option<U256> {
        self.form().amount_out_min()
    }

    // ------------------------------------------------------------------
    // Form edits
    // ------------------------------------------------------------------

    /// Replace the from amount text and schedule a debounced quote.
    pub fn set_from_amount(&self, text: impl Into<String>) {
        {
            let mut form = self.form();
            form.from_amount_text = text.into();
        }
        self.rederive();
    }

    /// Fill the from amount with the full from balance.
    pub fn set_max_amount(&self) {
        let text = {
            let form = self.form();
            units::format_amount(form.from_balance, form.from_token.decimals)
        };
        self.set_from_amount(text);
    }

    /// Change the slippage tolerance. Rejects values outside `1..=5000` bps.
    pub fn set_slippage_bps(&self, slippage_bps: u32) -> Result<()> {
        if slippage_bps == 0 || slippage_bps > MAX_SLIPPAGE_BPS {
            return Err(Error::InvalidSlippage(slippage_bps));
        }
        self.form().slippage_bps = slippage_bps;
        tracing::debug!(slippage_bps, "Slippage updated");
        Ok(())
    }

    /// Exchange from and to. The old quoted output becomes the new input.
    pub fn switch_direction(&self) {
        {
            let mut form = self.form();
            form.switch_sides();
            tracing::debug!(
                from = %form.from_token.symbol,
                to = %form.to_token.symbol,
                "Swap direction switched"
            );
        }
        self.rederive();
    }

    /// Select a new pair and reload its balances.
    pub async fn select_pair(&self, from: TokenRef, to: TokenRef) -> Result<()> {
        if from.address == to.address {
            return Err(Error::SameToken);
        }
        {
            let mut form = self.form();
            form.from_token = from;
            form.to_token = to;
            form.from_balance = U256::ZERO;
            form.to_balance = U256::ZERO;
            form.clear_quote();
        }
        self.rederive();
        self.refresh_balances().await
    }

    /// Clear amounts, quote and derived state. Balances are kept.
    pub fn reset(&self) {
        {
            let mut form = self.form();
            form.from_amount_text.clear();
            form.clear_quote();
        }
        self.rederive();
    }

    // ------------------------------------------------------------------
    // Actions
    // ------------------------------------------------------------------

    /// Grant the router an unlimited allowance for the from token.
    pub async fn approve(&self) -> Result<TxReceipt> {
        let session = self.session();
        let account = session.account().ok_or(Error::NotConnected)?;
        self.ensure_network(&session)?;

        let (token, epoch) = {
            let mut form = self.form();
            if form.action != ActionState::Idle {
                return Err(Error::ActionInFlight);
            }
            form.action = ActionState::Approving;
            form.approval.in_flight = true;
            (form.from_token.clone(), self.epoch())
        };
        let _guard = ActionGuard { orchestrator: self };

        tracing::info!(
            token = %token.symbol,
            owner = %account,
            spender = %self.inner.router,
            "Submitting approval"
        );
        self.inner
            .notifier
            .info(format!("Approving {}...", token.symbol));

        match self
            .inner
            .chain
            .approve(token.address, self.inner.router, U256::MAX)
            .await
        {
            Ok(receipt) => {
                // Checks issued before the approval landed are obsolete.
                self.inner.approval_generation.fetch_add(1, Ordering::SeqCst);
                {
                    let mut form = self.form();
                    if self.epoch() == epoch && form.from_token.address == token.address {
                        form.approval.decision = ApprovalDecision::Sufficient;
                    }
                }
                metrics::record_transaction("approve", "confirmed");
                self.inner
                    .notifier
                    .success(format!("{} approved", token.symbol));
                Ok(receipt)
            }
            Err(e) => {
                metrics::record_transaction("approve", "failed");
                let err = Error::from(e);
                self.report("Approval", &err);
                Err(err)
            }
        }
    }

    /// Submit the quoted swap and wait for it to be mined.
    pub async fn swap(&self) -> Result<SwapExecution> {
        let session = self.session();
        let (order, from, to, epoch) = {
            let mut form = self.form();
            if let Err(blocker) = form.readiness(&session, self.inner.required_chain_id) {
                let err = self.blocker_error(blocker, &session);
                self.report("Swap", &err);
                return Err(err);
            }
            let amount_in = form.parsed_amount()?;
            let quoted = form.quote.ok_or(Error::QuoteUnavailable)?;
            let recipient = session.account().ok_or(Error::NotConnected)?;
            let order = quote::build_exact_in(
                &form.from_token,
                &form.to_token,
                amount_in,
                quoted.amount_out,
                form.slippage_bps,
                recipient,
                quote::deadline_from_now(self.inner.config.deadline_secs),
            );
            form.action = ActionState::Swapping;
            (
                order,
                form.from_token.clone(),
                form.to_token.clone(),
                self.epoch(),
            )
        };
        let guard = ActionGuard { orchestrator: self };

        tracing::info!(
            from = %from.symbol,
            to = %to.symbol,
            amount_in = %order.amount_in,
            amount_out_min = %order.amount_out_min,
            deadline = order.deadline,
            "Submitting swap"
        );
        self.inner.notifier.info(format!(
            "Swapping {} {} for {}...",
            units::format_amount(order.amount_in, from.decimals),
            from.symbol,
            to.symbol
        ));

        match self.inner.chain.swap_exact_in(order.clone()).await {
            Ok(receipt) => {
                if self.epoch() == epoch {
                    let mut form = self.form();
                    form.from_amount_text.clear();
                    form.clear_quote();
                }
                self.rederive();
                drop(guard);

                metrics::record_transaction("swap", "confirmed");
                self.inner
                    .notifier
                    .success(format!("Swapped {} for {}", from.symbol, to.symbol));
                if let Err(e) = self.refresh_balances().await {
                    tracing::warn!(error = %e, "Balance refresh after swap failed");
                }
                Ok(SwapExecution { order, receipt })
            }
            Err(e) => {
                drop(guard);
                metrics::record_transaction("swap", "failed");
                let err = Error::from(e);
                self.report("Swap", &err);
                Err(err)
            }
        }
    }

    /// Fetch both balances. Results from a superseded session are dropped.
    pub async fn refresh_balances(&self) -> Result<()> {
        let account = self.session().account();
        let Some(account) = account else {
            return Ok(());
        };
        let epoch = self.epoch();
        let (from, to) = {
            let form = self.form();
            (form.from_token.address, form.to_token.address)
        };

        let (from_balance, to_balance) = tokio::try_join!(
            self.inner.chain.balance_of(from, account),
            self.inner.chain.balance_of(to, account),
        )?;

        if self.epoch() != epoch {
            metrics::record_stale("balance");
            tracing::debug!(epoch, "Discarding balances from a previous session");
            return Ok(());
        }
        let mut form = self.form();
        form.apply_balance(from, from_balance);
        form.apply_balance(to, to_balance);
        Ok(())
    }

    /// Refresh balances every `balance_poll_secs` until stopped. Ticks are
    /// skipped while the session is off the required network.
    pub fn start_polling(&self) {
        let period = Duration::from_secs(self.inner.config.balance_poll_secs.max(1));
        let weak = Arc::downgrade(&self.inner);
        let handle = tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Some(orchestrator) = Self::upgrade(&weak) else {
                    break;
                };
                if !orchestrator.on_required_network() {
                    continue;
                }
                if let Err(e) = orchestrator.refresh_balances().await {
                    tracing::warn!(error = %e, "Balance refresh failed");
                }
            }
        });
        if let Some(previous) = self.tasks().poller.replace(handle) {
            previous.abort();
        }
    }

    pub fn stop_polling(&self) {
        if let Some(handle) = self.tasks().poller.take() {
            handle.abort();
        }
    }

    // ------------------------------------------------------------------
    // Session reactions
    // ------------------------------------------------------------------

    fn on_session_event(&self, event: SessionEvent) {
        match event {
            SessionEvent::Connected { .. } | SessionEvent::AccountChanged { .. } => {
                tracing::debug!(?event, "Reloading swap state for session");
                self.reload(false);
            }
            SessionEvent::ChainChanged { chain_id, compatible } => {
                tracing::info!(chain_id, compatible, "Chain changed, resetting swap form");
                self.reload(true);
            }
            SessionEvent::Disconnected => {
                tracing::debug!("Session ended, clearing swap state");
                self.invalidate(false);
                self.rederive();
            }
        }
    }

    fn reload(&self, clear_amounts: bool) {
        self.invalidate(clear_amounts);
        if self.on_required_network() {
            self.start_polling();
        }
        self.rederive();
    }

    /// Start a new epoch: cancel outstanding work and forget session data.
    fn invalidate(&self, clear_amounts: bool) {
        self.inner.epoch.fetch_add(1, Ordering::SeqCst);
        self.inner.quote_generation.fetch_add(1, Ordering::SeqCst);
        self.inner.approval_generation.fetch_add(1, Ordering::SeqCst);
        self.tasks().abort_session_tasks();

        let mut form = self.form();
        form.from_balance = U256::ZERO;
        form.to_balance = U256::ZERO;
        form.approval.decision = ApprovalDecision::Undecided;
        if clear_amounts {
            form.from_amount_text.clear();
            form.clear_quote();
        } else {
            form.quote = None;
            form.quoting = false;
        }
    }

    /// Recompute everything derived from the from amount.
    fn rederive(&self) {
        self.schedule_quote();
        self.recheck_approval();
    }

    fn schedule_quote(&self) {
        let generation = self.inner.quote_generation.fetch_add(1, Ordering::SeqCst) + 1;
        let epoch = self.epoch();

        let request = {
            let mut form = self.form();
            match form.parsed_amount() {
                Err(_) if !form.has_amount_text() => {
                    form.clear_quote();
                    None
                }
                Err(e) => {
                    form.clear_quote();
                    form.amount_error = Some(e.to_string());
                    None
                }
                Ok(amount) if amount.is_zero() => {
                    form.clear_quote();
                    None
                }
                Ok(amount) => {
                    form.amount_error = None;
                    form.quoting = true;
                    Some((amount, form.from_token.clone(), form.to_token.clone()))
                }
            }
        };

        let handle = request.map(|(amount_in, from, to)| {
            let this = self.clone();
            tokio::spawn(async move {
                this.run_quote(generation, epoch, amount_in, from, to).await;
            })
        });
        let previous = std::mem::replace(&mut self.tasks().quote, handle);
        if let Some(previous) = previous {
            previous.abort();
        }
    }

    async fn run_quote(
        &self,
        generation: u64,
        epoch: u64,
        amount_in: U256,
        from: TokenRef,
        to: TokenRef,
    ) {
        sleep(Duration::from_millis(self.inner.config.quote_debounce_ms)).await;
        if !self.is_current_quote(generation, epoch) {
            return;
        }

        tracing::debug!(
            generation,
            from = %from.symbol,
            to = %to.symbol,
            %amount_in,
            "Requesting quote"
        );
        let result = self
            .inner
            .chain
            .amounts_out(amount_in, &quote::direct_path(&from, &to))
            .await;
        self.commit_quote(generation, epoch, amount_in, &from, &to, result);
    }

    fn commit_quote(
        &self,
        generation: u64,
        epoch: u64,
        amount_in: U256,
        from: &TokenRef,
        to: &TokenRef,
        result: ChainResult<Vec<U256>>,
    ) {
        let mut form = self.form();
        if !self.is_current_quote(generation, epoch)
            || form.from_token.address != from.address
            || form.to_token.address != to.address
        {
            metrics::record_stale("quote");
            tracing::debug!(generation, "Discarding stale quote");
            return;
        }
        form.quoting = false;

        let amount_out = match result {
            Ok(amounts) => amounts.last().copied().filter(|out| !out.is_zero()),
            Err(e) => {
                tracing::info!(error = %e, from = %from.symbol, to = %to.symbol, "Quote failed");
                None
            }
        };

        match amount_out {
            Some(amount_out) => {
                let impact = quote::quote_impact_pct(from, amount_in, to, amount_out);
                form.quote = Some(QuoteResult { amount_in, amount_out });
                form.to_amount_text = units::format_amount(amount_out, to.decimals);
                form.route_available = true;
                form.price_impact_pct = impact;
                form.price_impact_warning = impact > self.inner.config.price_impact_warning_pct;
                if form.price_impact_warning {
                    tracing::warn!(impact, "High price impact");
                }
                metrics::record_quote("ok");
            }
            None => {
                form.quote = None;
                form.to_amount_text.clear();
                form.route_available = false;
                form.price_impact_pct = 0.0;
                form.price_impact_warning = false;
                metrics::record_quote("no_route");
            }
        }
    }

    fn recheck_approval(&self) {
        let generation = self.inner.approval_generation.fetch_add(1, Ordering::SeqCst) + 1;
        let epoch = self.epoch();
        let account = self.session().account();

        let request = {
            let mut form = self.form();
            let parsed = form.parsed_amount();
            let (decision, request) = match (account, parsed) {
                (None, _) => (ApprovalDecision::Undecided, None),
                (Some(_), Err(_)) if !form.has_amount_text() => {
                    (ApprovalDecision::Sufficient, None)
                }
                (Some(_), Err(_)) => (ApprovalDecision::Undecided, None),
                (Some(_), Ok(amount)) if amount.is_zero() => (ApprovalDecision::Sufficient, None),
                (Some(owner), Ok(amount)) => (
                    ApprovalDecision::Undecided,
                    Some((owner, form.from_token.address, amount)),
                ),
            };
            form.approval.decision = decision;
            request
        };

        let handle = request.map(|(owner, token, amount)| {
            let this = self.clone();
            tokio::spawn(async move {
                this.run_approval_check(generation, epoch, owner, token, amount)
                    .await;
            })
        });
        let previous = std::mem::replace(&mut self.tasks().approval, handle);
        if let Some(previous) = previous {
            previous.abort();
        }
    }

    async fn run_approval_check(
        &self,
        generation: u64,
        epoch: u64,
        owner: Address,
        token: Address,
        amount: U256,
    ) {
        let result = self
            .inner
            .chain
            .allowance(token, owner, self.inner.router)
            .await;

        let mut form = self.form();
        if self.inner.approval_generation.load(Ordering::SeqCst) != generation
            || self.epoch() != epoch
            || form.from_token.address != token
        {
            metrics::record_stale("allowance");
            return;
        }
        form.approval.decision = match result {
            Ok(allowance) if allowance < amount => ApprovalDecision::Required,
            Ok(_) => ApprovalDecision::Sufficient,
            Err(e) => {
                tracing::warn!(error = %e, %token, "Allowance check failed");
                ApprovalDecision::Undecided
            }
        };
    }

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    fn ensure_network(&self, session: &Session) -> Result<()> {
        if session.is_correct_network(self.inner.required_chain_id) {
            Ok(())
        } else {
            Err(Error::NetworkMismatch {
                expected: self.inner.required_chain_id,
                actual: session.chain_id().unwrap_or_default(),
            })
        }
    }

    /// Publish a failed action unless the form already shows it inline.
    fn report(&self, action: &str, err: &Error) {
        if err.is_inline() {
            tracing::debug!(action, error = %err, "Action blocked by form state");
            return;
        }
        self.inner
            .notifier
            .error(format!("{} failed: {}", action, err));
    }

    fn blocker_error(&self, blocker: SwapBlocker, session: &Session) -> Error {
        match blocker {
            SwapBlocker::Disconnected => Error::NotConnected,
            SwapBlocker::WrongNetwork => Error::NetworkMismatch {
                expected: self.inner.required_chain_id,
                actual: session.chain_id().unwrap_or_default(),
            },
            SwapBlocker::ActionInFlight => Error::ActionInFlight,
            SwapBlocker::NoAmount => Error::InvalidAmount("enter an amount".to_string()),
            SwapBlocker::InvalidAmount => Error::InvalidAmount(blocker.to_string()),
            SwapBlocker::InsufficientBalance => Error::InsufficientBalance,
            SwapBlocker::ApprovalRequired | SwapBlocker::ApprovalPending => Error::ApprovalRequired,
            SwapBlocker::QuotePending | SwapBlocker::NoRoute => Error::QuoteUnavailable,
        }
    }

    fn on_required_network(&self) -> bool {
        self.session()
            .is_correct_network(self.inner.required_chain_id)
    }

    fn is_current_quote(&self, generation: u64, epoch: u64) -> bool {
        self.inner.quote_generation.load(Ordering::SeqCst) == generation && self.epoch() == epoch
    }

    fn epoch(&self) -> u64 {
        self.inner.epoch.load(Ordering::SeqCst)
    }

    fn session(&self) -> Session {
        self.inner.session.borrow().clone()
    }

    fn form(&self) -> MutexGuard<'_, SwapForm> {
        self.inner.form.lock().expect("swap form mutex poisoned")
    }

    fn tasks(&self) -> MutexGuard<'_, Tasks> {
        self.inner.tasks.lock().expect("swap tasks mutex poisoned")
    }

    fn upgrade(weak: &Weak<Inner>) -> Option<Self> {
        weak.upgrade().map(|inner| Self { inner })
    }
}

impl std::fmt::Debug for SwapOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SwapOrchestrator")
            .field("router", &self.inner.router)
            .field("required_chain_id", &self.inner.required_chain_id)
            .field("epoch", &self.epoch())
            .finish()
    }
}
