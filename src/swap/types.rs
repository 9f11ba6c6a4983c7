//! Swap form state.

use alloy::primitives::U256;
use serde::Serialize;

use crate::blockchain::types::{ExactInSwap, TxReceipt};
use crate::blockchain::units;
use crate::config::TokenRef;
use crate::error::Result;
use crate::session::Session;

/// Largest accepted slippage tolerance (50%).
pub const MAX_SLIPPAGE_BPS: u32 = 5_000;

/// Outcome of the last allowance check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalDecision {
    /// No decision yet: not connected, unparseable amount, or a check pending.
    #[default]
    Undecided,
    /// Allowance is below the amount.
    Required,
    /// Allowance covers the amount (or there is nothing to approve).
    Sufficient,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ApprovalState {
    pub decision: ApprovalDecision,
    pub in_flight: bool,
}

impl ApprovalState {
    pub fn required(&self) -> bool {
        self.decision == ApprovalDecision::Required
    }
}

/// The single user action allowed at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionState {
    #[default]
    Idle,
    Approving,
    Swapping,
}

/// A committed router quote. `amount_in` is the input it was computed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QuoteResult {
    pub amount_in: U256,
    pub amount_out: U256,
}

/// Where the form is in the quote → approve → swap sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SwapPhase {
    Idle,
    Quoting,
    NoRoute,
    Quoted,
    NeedsApproval,
    Approving,
    Ready,
    Swapping,
}

/// Why the swap button is disabled, in the order the checks are made.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SwapBlocker {
    Disconnected,
    WrongNetwork,
    ActionInFlight,
    NoAmount,
    InvalidAmount,
    InsufficientBalance,
    ApprovalRequired,
    ApprovalPending,
    QuotePending,
    NoRoute,
}

impl std::fmt::Display for SwapBlocker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            SwapBlocker::Disconnected => "Connect wallet",
            SwapBlocker::WrongNetwork => "Switch to the correct network",
            SwapBlocker::ActionInFlight => "Transaction pending",
            SwapBlocker::NoAmount => "Enter an amount",
            SwapBlocker::InvalidAmount => "Invalid amount",
            SwapBlocker::InsufficientBalance => "Insufficient balance",
            SwapBlocker::ApprovalRequired => "Approval required",
            SwapBlocker::ApprovalPending => "Checking approval",
            SwapBlocker::QuotePending => "Fetching quote",
            SwapBlocker::NoRoute => "No route",
        };
        f.write_str(label)
    }
}

/// A confirmed swap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SwapExecution {
    pub order: ExactInSwap,
    pub receipt: TxReceipt,
}

/// Everything the presentation layer renders for one swap.
#[derive(Debug, Clone, Serialize)]
pub struct SwapForm {
    pub from_token: TokenRef,
    pub to_token: TokenRef,
    /// User-entered, unparsed.
    pub from_amount_text: String,
    /// Display text of the quoted output. Never user-editable.
    pub to_amount_text: String,
    pub quote: Option<QuoteResult>,
    /// A debounced quote request is pending.
    pub quoting: bool,
    /// False after the router found no route for the last request.
    pub route_available: bool,
    /// Inline parse error for the from amount.
    pub amount_error: Option<String>,
    pub price_impact_pct: f64,
    pub price_impact_warning: bool,
    pub slippage_bps: u32,
    pub from_balance: U256,
    pub to_balance: U256,
    pub approval: ApprovalState,
    pub action: ActionState,
}

impl SwapForm {
    pub fn new(from_token: TokenRef, to_token: TokenRef, slippage_bps: u32) -> Self {
        Self {
            from_token,
            to_token,
            from_amount_text: String::new(),
            to_amount_text: String::new(),
            quote: None,
            quoting: false,
            route_available: true,
            amount_error: None,
            price_impact_pct: 0.0,
            price_impact_warning: false,
            slippage_bps,
            from_balance: U256::ZERO,
            to_balance: U256::ZERO,
            approval: ApprovalState::default(),
            action: ActionState::Idle,
        }
    }

    /// The from amount in raw units of the from token.
    pub fn parsed_amount(&self) -> Result<U256> {
        units::parse_amount(&self.from_amount_text, self.from_token.decimals)
    }

    pub fn has_amount_text(&self) -> bool {
        !self.from_amount_text.trim().is_empty()
    }

    /// Minimum acceptable output for the current quote and slippage.
    pub fn amount_out_min(&self) -> Option<U256> {
        self.quote
            .map(|q| units::apply_slippage(q.amount_out, self.slippage_bps))
    }

    /// Forget the quote and everything derived from it.
    pub(crate) fn clear_quote(&mut self) {
        self.quote = None;
        self.quoting = false;
        self.to_amount_text.clear();
        self.route_available = true;
        self.amount_error = None;
        self.price_impact_pct = 0.0;
        self.price_impact_warning = false;
    }

    /// Store a balance for whichever side currently holds `token`.
    pub(crate) fn apply_balance(&mut self, token: alloy::primitives::Address, balance: U256) {
        if self.from_token.address == token {
            self.from_balance = balance;
        }
        if self.to_token.address == token {
            self.to_balance = balance;
        }
    }

    /// Exchange sides: tokens, amount texts and balances move together.
    pub(crate) fn switch_sides(&mut self) {
        std::mem::swap(&mut self.from_token, &mut self.to_token);
        std::mem::swap(&mut self.from_amount_text, &mut self.to_amount_text);
        std::mem::swap(&mut self.from_balance, &mut self.to_balance);
        self.quote = None;
        self.price_impact_pct = 0.0;
        self.price_impact_warning = false;
    }

    /// Check every swap precondition, returning the first that fails.
    pub fn readiness(
        &self,
        session: &Session,
        required_chain_id: u64,
    ) -> std::result::Result<(), SwapBlocker> {
        if !session.is_connected() {
            return Err(SwapBlocker::Disconnected);
        }
        if !session.is_correct_network(required_chain_id) {
            return Err(SwapBlocker::WrongNetwork);
        }
        if self.action != ActionState::Idle {
            return Err(SwapBlocker::ActionInFlight);
        }
        if !self.has_amount_text() {
            return Err(SwapBlocker::NoAmount);
        }
        let amount = self.parsed_amount().map_err(|_| SwapBlocker::InvalidAmount)?;
        if amount.is_zero() {
            return Err(SwapBlocker::NoAmount);
        }
        if amount > self.from_balance {
            return Err(SwapBlocker::InsufficientBalance);
        }
        match self.approval.decision {
            ApprovalDecision::Required => return Err(SwapBlocker::ApprovalRequired),
            ApprovalDecision::Undecided => return Err(SwapBlocker::ApprovalPending),
            ApprovalDecision::Sufficient => {}
        }
        if self.quoting {
            return Err(SwapBlocker::QuotePending);
        }
        match self.quote {
            Some(q) if q.amount_in == amount => Ok(()),
            Some(_) => Err(SwapBlocker::QuotePending),
            None if self.route_available => Err(SwapBlocker::QuotePending),
            None => Err(SwapBlocker::NoRoute),
        }
    }

    pub fn phase(&self) -> SwapPhase {
        match self.action {
            ActionState::Approving => return SwapPhase::Approving,
            ActionState::Swapping => return SwapPhase::Swapping,
            ActionState::Idle => {}
        }
        if !self.has_amount_text() || self.amount_error.is_some() {
            return SwapPhase::Idle;
        }
        if self.quoting {
            return SwapPhase::Quoting;
        }
        if self.quote.is_none() {
            return if self.route_available {
                SwapPhase::Idle
            } else {
                SwapPhase::NoRoute
            };
        }
        match self.approval.decision {
            ApprovalDecision::Required => SwapPhase::NeedsApproval,
            ApprovalDecision::Sufficient => SwapPhase::Ready,
            ApprovalDecision::Undecided => SwapPhase::Quoted,
        }
    }
}
